/// Metadata probing and acceptance policy for uploaded clips
///
/// `ffprobe -v quiet -print_format json -show_format -show_streams` is run
/// under a timeout; every way it can go wrong ends up as [`InvalidMedia`].
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

pub const MIN_DURATION_SECS: f64 = 20.0;
pub const MAX_DURATION_SECS: f64 = 60.0;
pub const MIN_HEIGHT: u32 = 1080;
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq)]
pub struct VideoMetadata {
    pub duration_seconds: f64,
    pub width: u32,
    pub height: u32,
    pub codec: String,
}

/// Rejection reasons. All of them mean the file is not acceptable.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidMedia {
    #[error("Unable to process video file")]
    Unreadable(String),
    #[error("No video stream found in file")]
    NoVideoStream,
    #[error(
        "Video duration must be between {} and {} seconds (current: {:.1}s)",
        MIN_DURATION_SECS,
        MAX_DURATION_SECS,
        .0
    )]
    DurationOutOfRange(f64),
    #[error("Video resolution must be at least {}p (current: {}p)", MIN_HEIGHT, .0)]
    ResolutionTooLow(u32),
    #[error("Video validation timeout")]
    Timeout,
    #[error("Unable to parse video metadata")]
    MalformedOutput(String),
}

#[async_trait]
pub trait MediaProber: Send + Sync {
    /// Inspect `path` and apply the acceptance policy.
    async fn probe(&self, path: &Path) -> Result<VideoMetadata, InvalidMedia>;
}

/// Pull duration, dimensions and codec out of ffprobe's JSON.
pub fn parse_ffprobe_output(stdout: &[u8]) -> Result<VideoMetadata, InvalidMedia> {
    let json: Value = serde_json::from_slice(stdout)
        .map_err(|e| InvalidMedia::MalformedOutput(e.to_string()))?;

    let stream = json["streams"]
        .as_array()
        .and_then(|streams| {
            streams
                .iter()
                .find(|s| s["codec_type"].as_str() == Some("video"))
        })
        .ok_or(InvalidMedia::NoVideoStream)?;

    let width = dimension(&stream["width"]).ok_or_else(|| {
        InvalidMedia::MalformedOutput("video stream has no width".to_string())
    })?;
    let height = dimension(&stream["height"]).ok_or_else(|| {
        InvalidMedia::MalformedOutput("video stream has no height".to_string())
    })?;

    // Containers usually carry the duration; raw streams only on the stream.
    let duration_seconds = seconds(&json["format"]["duration"])
        .or_else(|| seconds(&stream["duration"]))
        .ok_or_else(|| InvalidMedia::MalformedOutput("missing duration".to_string()))?;

    Ok(VideoMetadata {
        duration_seconds,
        width,
        height,
        codec: stream["codec_name"].as_str().unwrap_or("unknown").to_string(),
    })
}

/// Acceptance bounds: duration in [20, 60] seconds, height at least 1080.
pub fn check_acceptance(metadata: VideoMetadata) -> Result<VideoMetadata, InvalidMedia> {
    let duration = metadata.duration_seconds;
    if !(MIN_DURATION_SECS..=MAX_DURATION_SECS).contains(&duration) {
        return Err(InvalidMedia::DurationOutOfRange(duration));
    }
    if metadata.height < MIN_HEIGHT {
        return Err(InvalidMedia::ResolutionTooLow(metadata.height));
    }
    Ok(metadata)
}

fn dimension(value: &Value) -> Option<u32> {
    value
        .as_u64()
        .and_then(|v| u32::try_from(v).ok())
        .filter(|v| *v > 0)
}

/// ffprobe prints durations as strings; tolerate numbers too.
fn seconds(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }?;
    (parsed.is_finite() && parsed >= 0.0).then_some(parsed)
}

/// [`MediaProber`] backed by the `ffprobe` binary
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    binary: PathBuf,
    timeout: Duration,
}

impl FfprobeProber {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }
}

impl Default for FfprobeProber {
    fn default() -> Self {
        Self::new("ffprobe", DEFAULT_PROBE_TIMEOUT)
    }
}

#[async_trait]
impl MediaProber for FfprobeProber {
    async fn probe(&self, path: &Path) -> Result<VideoMetadata, InvalidMedia> {
        let output = Command::new(&self.binary)
            .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, output).await {
            Err(_) => {
                warn!(path = %path.display(), timeout_secs = self.timeout.as_secs(), "ffprobe timed out");
                return Err(InvalidMedia::Timeout);
            }
            Ok(Err(e)) => {
                warn!(path = %path.display(), error = %e, "ffprobe could not be started");
                return Err(InvalidMedia::Unreadable(e.to_string()));
            }
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            return Err(InvalidMedia::Unreadable(format!(
                "ffprobe exited with {}",
                output.status
            )));
        }

        let metadata = parse_ffprobe_output(&output.stdout)?;
        debug!(
            path = %path.display(),
            duration = metadata.duration_seconds,
            width = metadata.width,
            height = metadata.height,
            codec = %metadata.codec,
            "Probed video"
        );
        check_acceptance(metadata)
    }
}
