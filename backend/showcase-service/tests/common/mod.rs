//! Shared fixtures for integration tests
//!
//! Everything runs against the in-memory record store and a temporary blob
//! directory. Media tools are replaced by fakes so tests never shell out.
#![allow(dead_code)]

use actix_web::test::TestRequest;
use async_trait::async_trait;
use bytes::Bytes;
use showcase_service::db::VideoRepository;
use showcase_service::error::Result as AppResult;
use showcase_service::models::{
    NewVideo, Pagination, PublicVideo, RankingEntry, SignupRequest, Video, VideoStatus,
};
use showcase_service::services::job_queue::{JobReceiver, ProcessingJob};
use showcase_service::services::prober::{InvalidMedia, MediaProber, VideoMetadata};
use showcase_service::services::transcoder::{
    PipelineError, RenderedAsset, Transcoder, INTRO_SECS, MAX_CLIP_SECS, OUTRO_SECS,
};
use showcase_service::services::{create_job_queue, JobOutcome, UploadForm, VideoProcessor};
use showcase_service::storage::LocalBlobStore;
use showcase_service::{AppState, Repositories};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

pub const TEST_SECRET: &[u8] = b"integration-test-secret-0123456789";
pub const TEST_MAX_UPLOAD: usize = 1024 * 1024;
pub const BOUNDARY: &str = "----showcase-test-boundary";

/// What the fake prober reports for every file
#[derive(Debug, Clone)]
pub enum ProbeBehavior {
    Accept { duration_seconds: f64 },
    Reject(InvalidMedia),
    Panic,
}

pub struct FakeProber {
    pub behavior: ProbeBehavior,
    pub calls: Arc<AtomicUsize>,
}

#[async_trait]
impl MediaProber for FakeProber {
    async fn probe(&self, path: &Path) -> Result<VideoMetadata, InvalidMedia> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if tokio::fs::metadata(path).await.is_err() {
            return Err(InvalidMedia::Unreadable(path.display().to_string()));
        }
        match &self.behavior {
            ProbeBehavior::Accept { duration_seconds } => Ok(VideoMetadata {
                duration_seconds: *duration_seconds,
                width: 1920,
                height: 1080,
                codec: "h264".to_string(),
            }),
            ProbeBehavior::Reject(reason) => Err(reason.clone()),
            ProbeBehavior::Panic => panic!("prober blew up"),
        }
    }
}

/// Copies the source to the output and reports the branded duration.
pub struct CopyTranscoder {
    pub calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Transcoder for CopyTranscoder {
    async fn transcode(
        &self,
        source: &Path,
        source_secs: f64,
        output: &Path,
    ) -> Result<RenderedAsset, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::fs::copy(source, output)
            .await
            .map_err(|e| PipelineError::Storage(e.to_string()))?;
        Ok(RenderedAsset {
            path: output.to_path_buf(),
            duration_seconds: source_secs.min(MAX_CLIP_SECS) + INTRO_SECS + OUTRO_SECS,
        })
    }
}

/// Wraps a video repository and fails selected calls on demand.
pub struct FlakyVideos {
    pub inner: Arc<dyn VideoRepository>,
    pub fail_next_find: AtomicBool,
    pub fail_mark_processed: AtomicBool,
}

impl FlakyVideos {
    pub fn new(inner: Arc<dyn VideoRepository>) -> Self {
        Self {
            inner,
            fail_next_find: AtomicBool::new(false),
            fail_mark_processed: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl VideoRepository for FlakyVideos {
    async fn create(&self, video: NewVideo) -> AppResult<Video> {
        self.inner.create(video).await
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Video>> {
        if self.fail_next_find.swap(false, Ordering::SeqCst) {
            return Err(sqlx::Error::PoolTimedOut.into());
        }
        self.inner.find_by_id(id).await
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> AppResult<Vec<Video>> {
        self.inner.list_by_owner(owner_id).await
    }

    async fn list_by_status(&self, status: VideoStatus) -> AppResult<Vec<Video>> {
        self.inner.list_by_status(status).await
    }

    async fn claim_for_processing(&self, id: Uuid) -> AppResult<bool> {
        self.inner.claim_for_processing(id).await
    }

    async fn mark_processed(
        &self,
        id: Uuid,
        storage_key: &str,
        duration_seconds: i32,
    ) -> AppResult<bool> {
        if self.fail_mark_processed.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolTimedOut.into());
        }
        self.inner.mark_processed(id, storage_key, duration_seconds).await
    }

    async fn mark_failed(&self, id: Uuid, reason: &str) -> AppResult<bool> {
        self.inner.mark_failed(id, reason).await
    }

    async fn publish(&self, id: Uuid) -> AppResult<bool> {
        self.inner.publish(id).await
    }

    async fn delete_unpublished(&self, id: Uuid) -> AppResult<bool> {
        self.inner.delete_unpublished(id).await
    }

    async fn list_public(&self, page: Pagination) -> AppResult<Vec<PublicVideo>> {
        self.inner.list_public(page).await
    }

    async fn rankings(&self, city: Option<&str>, page: Pagination) -> AppResult<Vec<RankingEntry>> {
        self.inner.rankings(city, page).await
    }
}

pub struct TestContext {
    pub state: AppState,
    pub repos: Repositories,
    pub blobs: Arc<LocalBlobStore>,
    pub receiver: JobReceiver,
    pub processor: VideoProcessor,
    pub probe_calls: Arc<AtomicUsize>,
    pub transcode_calls: Arc<AtomicUsize>,
    _dir: TempDir,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_probe(ProbeBehavior::Accept {
            duration_seconds: 42.0,
        })
        .await
    }

    pub async fn with_probe(behavior: ProbeBehavior) -> Self {
        Self::build(behavior, 64).await
    }

    pub async fn with_queue_capacity(capacity: usize) -> Self {
        Self::build(
            ProbeBehavior::Accept {
                duration_seconds: 42.0,
            },
            capacity,
        )
        .await
    }

    async fn build(behavior: ProbeBehavior, queue_capacity: usize) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let blobs = Arc::new(LocalBlobStore::open(dir.path()).await.unwrap());
        let repos = Repositories::memory();
        let (queue, receiver) = create_job_queue(queue_capacity);
        let jwt = crypto_core::JwtService::new(TEST_SECRET, chrono::Duration::minutes(60)).unwrap();

        let probe_calls = Arc::new(AtomicUsize::new(0));
        let transcode_calls = Arc::new(AtomicUsize::new(0));
        let processor = VideoProcessor::new(
            repos.videos.clone(),
            blobs.clone(),
            Arc::new(FakeProber {
                behavior,
                calls: probe_calls.clone(),
            }),
            Arc::new(CopyTranscoder {
                calls: transcode_calls.clone(),
            }),
        );

        let state = AppState::new(
            &repos,
            blobs.clone(),
            Arc::new(queue),
            Arc::new(jwt),
            TEST_MAX_UPLOAD,
        );

        Self {
            state,
            repos,
            blobs,
            receiver,
            processor,
            probe_calls,
            transcode_calls,
            _dir: dir,
        }
    }

    /// A processor over `videos` sharing this context's blobs and fakes.
    pub fn processor_over(&self, videos: Arc<dyn VideoRepository>) -> VideoProcessor {
        VideoProcessor::new(
            videos,
            self.blobs.clone(),
            Arc::new(FakeProber {
                behavior: ProbeBehavior::Accept {
                    duration_seconds: 42.0,
                },
                calls: self.probe_calls.clone(),
            }),
            Arc::new(CopyTranscoder {
                calls: self.transcode_calls.clone(),
            }),
        )
    }

    /// Jobs waiting in the queue, without running them.
    pub async fn take_jobs(&self) -> Vec<ProcessingJob> {
        let mut jobs = Vec::new();
        let mut receiver = self.receiver.lock().await;
        while let Ok(job) = receiver.try_recv() {
            jobs.push(job);
        }
        jobs
    }

    /// Run every queued job to completion, in order.
    pub async fn run_pending_jobs(&self) -> Vec<JobOutcome> {
        let mut outcomes = Vec::new();
        for job in self.take_jobs().await {
            outcomes.push(self.processor.process(job).await);
        }
        outcomes
    }

    /// Register a user through the service and return its id and a token.
    pub async fn register(&self, email: &str, city: &str) -> (Uuid, String) {
        let user = self
            .state
            .auth
            .signup(signup_request(email, city))
            .await
            .unwrap();
        let issued = self
            .state
            .auth
            .login(showcase_service::models::LoginRequest {
                email: email.to_string(),
                password: "Str0ngPass!".to_string(),
            })
            .await
            .unwrap();
        (user.id, issued.access_token)
    }

    /// Upload through the service and run the worker; returns the video id.
    pub async fn processed_video(&self, owner_id: Uuid, title: &str) -> Uuid {
        let video = self
            .state
            .videos
            .accept_upload(
                owner_id,
                UploadForm {
                    title: title.to_string(),
                    filename: Some("clip.mp4".to_string()),
                    content_type: Some("video/mp4".to_string()),
                    bytes: Bytes::from_static(b"not really an mp4"),
                },
            )
            .await
            .unwrap();
        self.run_pending_jobs().await;
        video.id
    }

    pub async fn public_video(&self, owner_id: Uuid, title: &str) -> Uuid {
        let id = self.processed_video(owner_id, title).await;
        self.state.videos.publish(owner_id, id).await.unwrap();
        id
    }

    pub fn blob_exists(&self, key: &str) -> bool {
        self.blobs.root().join(key).exists()
    }
}

pub fn signup_request(email: &str, city: &str) -> SignupRequest {
    SignupRequest {
        first_name: "Ana".to_string(),
        last_name: "Rojas".to_string(),
        email: email.to_string(),
        password1: "Str0ngPass!".to_string(),
        password2: "Str0ngPass!".to_string(),
        city: city.to_string(),
        country: "Colombia".to_string(),
    }
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

/// Hand-built multipart body with a `title` field and a `video_file` part.
pub fn multipart_body(title: &str, content_type: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\n{title}\r\n",
            b = BOUNDARY,
            title = title
        )
        .as_bytes(),
    );
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"video_file\"; filename=\"clip.mp4\"\r\nContent-Type: {ct}\r\n\r\n",
            b = BOUNDARY,
            ct = content_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn upload_request(token: &str, title: &str, content_type: &str, bytes: &[u8]) -> TestRequest {
    TestRequest::post()
        .uri("/api/videos/upload")
        .insert_header(bearer(token))
        .insert_header((
            "Content-Type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        ))
        .set_payload(multipart_body(title, content_type, bytes))
}
