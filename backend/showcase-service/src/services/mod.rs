/// Business logic layer
///
/// - [`auth`]: signup, login, bearer token resolution
/// - [`videos`]: upload acceptance and owner operations
/// - [`job_queue`] / [`worker`]: asynchronous processing
/// - [`prober`] / [`transcoder`]: media inspection and rendering
/// - [`votes`]: the vote ledger
/// - [`ranking`]: public listing and rankings
pub mod auth;
pub mod job_queue;
pub mod prober;
pub mod ranking;
pub mod transcoder;
pub mod videos;
pub mod votes;
pub mod worker;

pub use auth::AuthService;
pub use job_queue::{create_job_queue, ChannelJobQueue, JobQueue, ProcessingJob};
pub use prober::{FfprobeProber, InvalidMedia, MediaProber, VideoMetadata};
pub use ranking::RankingService;
pub use transcoder::{BrandingAssets, FfmpegTranscoder, PipelineError, Transcoder};
pub use videos::{UploadForm, VideoService};
pub use votes::VoteLedger;
pub use worker::{spawn_workers, JobOutcome, VideoProcessor};
