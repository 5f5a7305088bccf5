//! Application state shared by every handler

use crypto_core::JwtService;
use sqlx::PgPool;
use std::sync::Arc;

use crate::db::{
    MemoryStore, PgUserRepository, PgVideoRepository, PgVoteRepository, UserRepository,
    VideoRepository, VoteRepository,
};
use crate::services::{AuthService, JobQueue, RankingService, VideoService, VoteLedger};
use crate::storage::BlobStore;

/// The three record stores, behind their traits
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub videos: Arc<dyn VideoRepository>,
    pub votes: Arc<dyn VoteRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            videos: Arc::new(PgVideoRepository::new(pool.clone())),
            votes: Arc::new(PgVoteRepository::new(pool)),
        }
    }

    /// All three traits served by one in-process store.
    pub fn memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            users: store.clone(),
            videos: store.clone(),
            votes: store,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub videos: Arc<VideoService>,
    pub votes: Arc<VoteLedger>,
    pub ranking: Arc<RankingService>,
}

impl AppState {
    pub fn new(
        repos: &Repositories,
        blobs: Arc<dyn BlobStore>,
        queue: Arc<dyn JobQueue>,
        jwt: Arc<JwtService>,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            auth: Arc::new(AuthService::new(repos.users.clone(), jwt)),
            videos: Arc::new(VideoService::new(
                repos.videos.clone(),
                blobs.clone(),
                queue,
                max_upload_bytes,
            )),
            votes: Arc::new(VoteLedger::new(repos.votes.clone())),
            ranking: Arc::new(RankingService::new(repos.videos.clone(), blobs)),
        }
    }
}
