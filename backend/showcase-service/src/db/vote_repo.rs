use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{CastOutcome, VoteRepository};
use crate::error::Result;

pub struct PgVoteRepository {
    pool: PgPool,
}

impl PgVoteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VoteRepository for PgVoteRepository {
    /// The unique constraint on `(user_id, video_id)` decides duplicates: a
    /// concurrent second insert waits on the first and then does nothing.
    /// The counter moves with `votes_count + 1` in the same transaction, and
    /// only on a public row.
    async fn cast(&self, voter_id: Uuid, video_id: Uuid) -> Result<CastOutcome> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO votes (id, user_id, video_id)
            SELECT $1, $2, v.id FROM videos v
            WHERE v.id = $3 AND v.is_public AND v.status = 'processed'
            ON CONFLICT ON CONSTRAINT unique_user_video_vote DO NOTHING
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(voter_id)
        .bind(video_id)
        .fetch_optional(&mut *tx)
        .await;

        match inserted {
            Ok(Some(_)) => {}
            Ok(None) => {
                // Either the pair already voted or the video is not votable.
                let already: bool = sqlx::query_scalar(
                    "SELECT EXISTS(SELECT 1 FROM votes WHERE user_id = $1 AND video_id = $2)",
                )
                .bind(voter_id)
                .bind(video_id)
                .fetch_one(&mut *tx)
                .await?;
                tx.rollback().await?;
                return Ok(if already {
                    CastOutcome::Duplicate
                } else {
                    CastOutcome::NotVotable
                });
            }
            Err(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
                tx.rollback().await?;
                return Ok(CastOutcome::NotVotable);
            }
            Err(e) => return Err(e.into()),
        }

        let votes_count: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE videos SET votes_count = votes_count + 1
            WHERE id = $1 AND is_public
            RETURNING votes_count
            "#,
        )
        .bind(video_id)
        .fetch_optional(&mut *tx)
        .await?;

        match votes_count {
            Some(votes_count) => {
                tx.commit().await?;
                Ok(CastOutcome::Recorded { votes_count })
            }
            None => {
                tx.rollback().await?;
                Ok(CastOutcome::NotVotable)
            }
        }
    }
}
