use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::{CastOutcome, VoteRepository};
use crate::error::{AppError, Result};

/// One vote per (user, video); the counter only moves when a vote lands.
pub struct VoteLedger {
    votes: Arc<dyn VoteRepository>,
}

impl VoteLedger {
    pub fn new(votes: Arc<dyn VoteRepository>) -> Self {
        Self { votes }
    }

    /// Record a vote and return the video's new vote count.
    pub async fn vote(&self, voter_id: Uuid, video_id: Uuid) -> Result<i32> {
        match self.votes.cast(voter_id, video_id).await? {
            CastOutcome::Recorded { votes_count } => {
                info!(video_id = %video_id, voter_id = %voter_id, votes_count, "Vote registered");
                Ok(votes_count)
            }
            CastOutcome::Duplicate => {
                debug!(video_id = %video_id, voter_id = %voter_id, "Duplicate vote rejected");
                Err(AppError::Conflict(
                    "You have already voted for this video".to_string(),
                ))
            }
            CastOutcome::NotVotable => Err(AppError::NotFound(
                "Video not found or not public".to_string(),
            )),
        }
    }
}
