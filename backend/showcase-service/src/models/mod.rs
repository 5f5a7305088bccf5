/// Data models for showcase-service
///
/// - Video: lifecycle status and the transition function
/// - User: account profile and auth payloads
/// - Vote: ballots, ranking rows and pagination
pub mod user;
pub mod video;
pub mod vote;

pub use user::{LoginRequest, NewUser, SignupRequest, User};
pub use video::{NewVideo, TransitionError, Video, VideoEvent, VideoStatus};
pub use vote::{Pagination, PublicVideo, RankingEntry, RankingQuery};
