/// Background job queue for asynchronous video processing
///
/// Jobs travel over a bounded MPSC channel; any number of workers share the
/// receiving end. Request handlers never wait on the channel: a full buffer
/// leaves the video in `uploaded`. The channel itself is at-most-once, so
/// startup runs [`requeue_pending`] to redeliver every video still sitting in
/// `uploaded`.
/// Duplicates are harmless: a worker only proceeds after winning the
/// conditional claim on the video row.
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::VideoRepository;
use crate::error::Result;
use crate::models::VideoStatus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingJob {
    pub video_id: Uuid,
    pub source_key: String,
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("job queue is closed")]
    Closed,
    #[error("job queue is full")]
    Full,
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Hand the job over without waiting.
    fn try_enqueue(&self, job: ProcessingJob) -> std::result::Result<(), QueueError>;
    /// Wait for room in the buffer.
    async fn enqueue(&self, job: ProcessingJob) -> std::result::Result<(), QueueError>;
}

/// Receiving half, shared by every worker task
pub type JobReceiver = Arc<Mutex<mpsc::Receiver<ProcessingJob>>>;

#[derive(Debug, Clone)]
pub struct ChannelJobQueue {
    sender: mpsc::Sender<ProcessingJob>,
}

/// Create a new job queue with the given buffer capacity.
pub fn create_job_queue(capacity: usize) -> (ChannelJobQueue, JobReceiver) {
    let (sender, receiver) = mpsc::channel(capacity);
    (ChannelJobQueue { sender }, Arc::new(Mutex::new(receiver)))
}

#[async_trait]
impl JobQueue for ChannelJobQueue {
    fn try_enqueue(&self, job: ProcessingJob) -> std::result::Result<(), QueueError> {
        self.sender.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => QueueError::Full,
            mpsc::error::TrySendError::Closed(_) => QueueError::Closed,
        })
    }

    async fn enqueue(&self, job: ProcessingJob) -> std::result::Result<(), QueueError> {
        self.sender.send(job).await.map_err(|_| QueueError::Closed)
    }
}

/// Pull the next job, or `None` once every sender is gone.
pub async fn next_job(receiver: &JobReceiver) -> Option<ProcessingJob> {
    receiver.lock().await.recv().await
}

/// Enqueue a job for every video still waiting to be claimed, waiting for
/// room as workers drain the buffer.
pub async fn requeue_pending(videos: &dyn VideoRepository, queue: &dyn JobQueue) -> Result<usize> {
    let pending = videos.list_by_status(VideoStatus::Uploaded).await?;
    let mut requeued = 0;

    for video in pending {
        let job = ProcessingJob {
            video_id: video.id,
            source_key: video.storage_key,
        };
        if let Err(e) = queue.enqueue(job).await {
            warn!(video_id = %video.id, error = %e, "Could not redeliver pending video");
            break;
        }
        requeued += 1;
    }

    if requeued > 0 {
        info!(count = requeued, "Redelivered pending processing jobs");
    }
    Ok(requeued)
}
