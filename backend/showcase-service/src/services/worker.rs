/// Video processing worker
///
/// For each job:
/// 1. Skip unless the video is still `uploaded` (duplicate deliveries end here)
/// 2. Claim it (`uploaded -> processing`, conditional update)
/// 3. Probe the raw upload, render it, store the rendered asset
/// 4. `processing -> processed` with the new storage key, or `processing -> failed`
///
/// Failures, including panics, are contained to the job that caused them.
/// Only the delivery that won the claim may record `failed`; an error before
/// the claim leaves the row alone for whoever owns it.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::db::VideoRepository;
use crate::error::Result;
use crate::models::{Video, VideoStatus};
use crate::services::job_queue::{next_job, JobReceiver, ProcessingJob};
use crate::services::prober::{InvalidMedia, MediaProber};
use crate::services::transcoder::{PipelineError, Transcoder};
use crate::storage::{BlobStore, Namespace};

const INTERNAL_FAILURE_REASON: &str = "Internal processing error";

#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// The video no longer exists
    Missing,
    /// Another delivery already claimed or finished it
    Skipped(VideoStatus),
    Processed {
        storage_key: String,
        duration_seconds: i32,
    },
    Failed {
        reason: String,
    },
    /// The job itself broke (store error or panic); logged and contained
    Errored(String),
}

#[derive(Debug, thiserror::Error)]
enum JobFailure {
    #[error(transparent)]
    Media(#[from] InvalidMedia),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

#[derive(Clone)]
pub struct VideoProcessor {
    videos: Arc<dyn VideoRepository>,
    blobs: Arc<dyn BlobStore>,
    prober: Arc<dyn MediaProber>,
    transcoder: Arc<dyn Transcoder>,
}

impl VideoProcessor {
    pub fn new(
        videos: Arc<dyn VideoRepository>,
        blobs: Arc<dyn BlobStore>,
        prober: Arc<dyn MediaProber>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        Self {
            videos,
            blobs,
            prober,
            transcoder,
        }
    }

    /// Run one job in its own task so a panic cannot take the worker down.
    pub async fn process(&self, job: ProcessingJob) -> JobOutcome {
        let video_id = job.video_id;
        let claimed = Arc::new(AtomicBool::new(false));
        let this = self.clone();
        let flag = claimed.clone();
        let handle = tokio::spawn(async move { this.handle(&job, &flag).await });

        let outcome = match handle.await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                error!(video_id = %video_id, error = %e, "Processing job errored");
                self.fail_after_error(video_id, &claimed).await;
                JobOutcome::Errored(e.to_string())
            }
            Err(e) => {
                error!(video_id = %video_id, error = %e, "Processing job panicked");
                self.fail_after_error(video_id, &claimed).await;
                JobOutcome::Errored(e.to_string())
            }
        };

        match &outcome {
            JobOutcome::Processed { duration_seconds, .. } => {
                info!(video_id = %video_id, duration_seconds, "Video processed")
            }
            JobOutcome::Failed { reason } => {
                warn!(video_id = %video_id, reason = %reason, "Video failed processing")
            }
            JobOutcome::Skipped(status) => {
                debug!(video_id = %video_id, status = %status, "Skipping job, video already claimed")
            }
            JobOutcome::Missing => debug!(video_id = %video_id, "Skipping job, video is gone"),
            JobOutcome::Errored(_) => {}
        }
        outcome
    }

    async fn handle(&self, job: &ProcessingJob, claimed: &AtomicBool) -> Result<JobOutcome> {
        let video = match self.videos.find_by_id(job.video_id).await? {
            Some(video) => video,
            None => return Ok(JobOutcome::Missing),
        };
        if video.status != VideoStatus::Uploaded {
            return Ok(JobOutcome::Skipped(video.status));
        }

        if !self.videos.claim_for_processing(video.id).await? {
            // Lost the race to another delivery.
            return Ok(match self.videos.find_by_id(video.id).await? {
                Some(current) => JobOutcome::Skipped(current.status),
                None => JobOutcome::Missing,
            });
        }
        claimed.store(true, Ordering::Release);
        if job.source_key != video.storage_key {
            warn!(
                video_id = %video.id,
                job_key = %job.source_key,
                stored_key = %video.storage_key,
                "Job source key differs from record, using record"
            );
        }

        match self.render(&video).await {
            Ok((storage_key, duration_seconds)) => {
                let swapped = match self
                    .videos
                    .mark_processed(video.id, &storage_key, duration_seconds)
                    .await
                {
                    Ok(swapped) => swapped,
                    Err(e) => {
                        // Nothing references the render yet.
                        self.blobs.delete(&storage_key).await;
                        return Err(e);
                    }
                };
                if !swapped {
                    // Deleted by its owner mid-render; the asset must not linger.
                    self.blobs.delete(&storage_key).await;
                    return Ok(JobOutcome::Missing);
                }
                if storage_key != video.storage_key {
                    self.blobs.delete(&video.storage_key).await;
                }
                Ok(JobOutcome::Processed {
                    storage_key,
                    duration_seconds,
                })
            }
            Err(failure) => {
                // The raw upload is kept for diagnosis.
                let reason = failure.to_string();
                self.videos.mark_failed(video.id, &reason).await?;
                Ok(JobOutcome::Failed { reason })
            }
        }
    }

    /// Probe, render into scratch space, then copy into `processed/`.
    async fn render(&self, video: &Video) -> std::result::Result<(String, i32), JobFailure> {
        let source = self
            .blobs
            .path_of(&video.storage_key)
            .map_err(|e| PipelineError::Storage(e.to_string()))?;
        let metadata = self.prober.probe(&source).await?;

        let scratch_key = format!("{}/{}.mp4", Namespace::Temp.as_str(), video.id);
        let scratch = self
            .blobs
            .path_of(&scratch_key)
            .map_err(|e| PipelineError::Storage(e.to_string()))?;

        let stored = match self
            .transcoder
            .transcode(&source, metadata.duration_seconds, &scratch)
            .await
        {
            Ok(asset) => self
                .blobs
                .save_file(&asset.path, &format!("{}.mp4", video.id), Namespace::Processed)
                .await
                .map_err(|e| PipelineError::Storage(e.to_string())),
            Err(e) => Err(e),
        };
        self.blobs.delete(&scratch_key).await;

        let storage_key = stored?;
        Ok((storage_key, metadata.duration_seconds.trunc() as i32))
    }

    async fn fail_after_error(&self, video_id: Uuid, claimed: &AtomicBool) {
        if !claimed.load(Ordering::Acquire) {
            warn!(video_id = %video_id, "Job broke before claiming the video, status left as is");
            return;
        }
        if let Err(e) = self
            .videos
            .mark_failed(video_id, INTERNAL_FAILURE_REASON)
            .await
        {
            error!(video_id = %video_id, error = %e, "Could not record failed status");
        }
    }
}

/// Spawn `count` workers sharing one receiver.
pub fn spawn_workers(
    processor: VideoProcessor,
    receiver: JobReceiver,
    count: usize,
) -> Vec<JoinHandle<()>> {
    (0..count)
        .map(|worker_id| {
            let processor = processor.clone();
            let receiver = receiver.clone();
            tokio::spawn(run_worker(worker_id, processor, receiver))
        })
        .collect()
}

/// Consume jobs one at a time until the queue closes.
pub async fn run_worker(worker_id: usize, processor: VideoProcessor, receiver: JobReceiver) {
    info!(worker_id, "Video processor worker started");

    while let Some(job) = next_job(&receiver).await {
        debug!(worker_id, video_id = %job.video_id, "Processing job received");
        processor.process(job).await;
    }

    info!(worker_id, "Video processor worker stopped (channel closed)");
}
