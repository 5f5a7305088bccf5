/// Rendering of an accepted clip into the publishable asset
///
/// Output layout (all video, no audio, 1080x1920 @ 30fps):
///
/// ```text
/// | intro card | xfade | source clip (<= 30s, watermark mid third) | xfade | outro card |
/// ```
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

pub const OUTPUT_WIDTH: u32 = 1080;
pub const OUTPUT_HEIGHT: u32 = 1920;
pub const OUTPUT_FPS: u32 = 30;
pub const INTRO_SECS: f64 = 2.5;
pub const OUTRO_SECS: f64 = 2.5;
pub const CROSSFADE_SECS: f64 = 0.5;
pub const MAX_CLIP_SECS: f64 = 30.0;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("failed to start ffmpeg: {0}")]
    Spawn(String),
    #[error("ffmpeg exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("ffmpeg reported success but produced no output")]
    MissingOutput,
    #[error("source clip has unusable duration {0}")]
    InvalidDuration(f64),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Timeline of one render
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositionPlan {
    /// Seconds of the source that make it into the render
    pub clip_secs: f64,
    /// Start of the intro -> clip cross-fade
    pub clip_fade_offset: f64,
    /// Start of the clip -> outro cross-fade
    pub outro_fade_offset: f64,
    /// Watermark window, relative to the clip's own timeline
    pub watermark_start: f64,
    pub watermark_end: f64,
    pub total_secs: f64,
}

impl CompositionPlan {
    pub fn for_source(source_secs: f64) -> Result<Self, PipelineError> {
        // The clip must outlast both fades or xfade has nothing to blend.
        if !source_secs.is_finite() || source_secs <= 2.0 * CROSSFADE_SECS {
            return Err(PipelineError::InvalidDuration(source_secs));
        }

        let clip_secs = source_secs.min(MAX_CLIP_SECS);
        let clip_fade_offset = INTRO_SECS - CROSSFADE_SECS;
        let outro_fade_offset = clip_fade_offset + clip_secs - CROSSFADE_SECS;

        Ok(Self {
            clip_secs,
            clip_fade_offset,
            outro_fade_offset,
            watermark_start: clip_secs / 3.0,
            watermark_end: clip_secs * 2.0 / 3.0,
            total_secs: INTRO_SECS + clip_secs + OUTRO_SECS - 2.0 * CROSSFADE_SECS,
        })
    }
}

/// Optional image assets; missing ones fall back to generated cards.
#[derive(Debug, Clone, Default)]
pub struct BrandingAssets {
    pub intro_image: Option<PathBuf>,
    pub outro_image: Option<PathBuf>,
    pub watermark_image: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedAsset {
    pub path: PathBuf,
    pub duration_seconds: f64,
}

#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Render `source` (whose probed duration is `source_secs`) into `output`.
    async fn transcode(
        &self,
        source: &Path,
        source_secs: f64,
        output: &Path,
    ) -> Result<RenderedAsset, PipelineError>;
}

#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    binary: PathBuf,
    branding: BrandingAssets,
}

impl FfmpegTranscoder {
    pub fn new(binary: impl Into<PathBuf>, branding: BrandingAssets) -> Self {
        Self {
            binary: binary.into(),
            branding,
        }
    }
}

fn fmt_secs(secs: f64) -> String {
    format!("{:.3}", secs)
}

/// Normalize any input to the canonical frame: fit, pad, square pixels.
fn normalize_filter() -> String {
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,\
         pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color=black,setsar=1,fps={fps},format=yuv420p,settb=AVTB",
        w = OUTPUT_WIDTH,
        h = OUTPUT_HEIGHT,
        fps = OUTPUT_FPS
    )
}

/// Input arguments for a branded card: the image looped, or a plain color.
fn card_input(image: Option<&Path>, secs: f64, color: &str) -> Vec<String> {
    match image {
        Some(path) => vec![
            "-loop".into(),
            "1".into(),
            "-t".into(),
            fmt_secs(secs),
            "-i".into(),
            path.display().to_string(),
        ],
        None => vec![
            "-f".into(),
            "lavfi".into(),
            "-t".into(),
            fmt_secs(secs),
            "-i".into(),
            format!(
                "color=c={}:s={}x{}:r={}",
                color, OUTPUT_WIDTH, OUTPUT_HEIGHT, OUTPUT_FPS
            ),
        ],
    }
}

/// Full ffmpeg argument vector for one render.
pub fn build_ffmpeg_args(
    plan: &CompositionPlan,
    branding: &BrandingAssets,
    source: &Path,
    output: &Path,
) -> Vec<String> {
    let mut args: Vec<String> = vec!["-hide_banner".into(), "-nostdin".into(), "-y".into()];

    // 0: intro, 1: source, 2: outro, 3: watermark (optional)
    args.extend(card_input(branding.intro_image.as_deref(), INTRO_SECS, "black"));
    args.extend([
        "-t".into(),
        fmt_secs(plan.clip_secs),
        "-i".into(),
        source.display().to_string(),
    ]);
    args.extend(card_input(branding.outro_image.as_deref(), OUTRO_SECS, "black"));
    if let Some(watermark) = &branding.watermark_image {
        args.extend(["-i".into(), watermark.display().to_string()]);
    }

    let normalize = normalize_filter();
    let enable = format!(
        "enable='between(t,{},{})'",
        fmt_secs(plan.watermark_start),
        fmt_secs(plan.watermark_end)
    );
    let watermark = match &branding.watermark_image {
        Some(_) => format!(
            "[3:v]scale=iw*0.25:-1[wm];[clip0][wm]overlay=W-w-48:H-h-96:{}[clip]",
            enable
        ),
        None => format!(
            "[clip0]drawbox=x=iw-320:y=ih-220:w=272:h=124:color=white@0.35:t=fill:{}[clip]",
            enable
        ),
    };

    let graph = [
        format!("[0:v]{normalize}[intro]"),
        format!(
            "[1:v]{normalize},trim=duration={},setpts=PTS-STARTPTS[clip0]",
            fmt_secs(plan.clip_secs)
        ),
        watermark,
        format!("[2:v]{normalize}[outro]"),
        format!(
            "[intro][clip]xfade=transition=fade:duration={}:offset={}[head]",
            fmt_secs(CROSSFADE_SECS),
            fmt_secs(plan.clip_fade_offset)
        ),
        format!(
            "[head][outro]xfade=transition=fade:duration={}:offset={}[vout]",
            fmt_secs(CROSSFADE_SECS),
            fmt_secs(plan.outro_fade_offset)
        ),
    ]
    .join(";");

    args.extend([
        "-filter_complex".into(),
        graph,
        "-map".into(),
        "[vout]".into(),
        "-an".into(),
        "-c:v".into(),
        "libx264".into(),
        "-preset".into(),
        "veryfast".into(),
        "-crf".into(),
        "23".into(),
        "-pix_fmt".into(),
        "yuv420p".into(),
        "-movflags".into(),
        "+faststart".into(),
        output.display().to_string(),
    ]);
    args
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(
        &self,
        source: &Path,
        source_secs: f64,
        output: &Path,
    ) -> Result<RenderedAsset, PipelineError> {
        let plan = CompositionPlan::for_source(source_secs)?;
        let args = build_ffmpeg_args(&plan, &self.branding, source, output);
        debug!(source = %source.display(), ?plan, "Starting ffmpeg render");

        let result = Command::new(&self.binary)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| PipelineError::Spawn(e.to_string()))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            // The tail of ffmpeg's log is where the actual error is.
            let tail: String = stderr
                .lines()
                .rev()
                .take(5)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect::<Vec<_>>()
                .join(" | ");
            return Err(PipelineError::Failed {
                status: result.status.to_string(),
                stderr: tail,
            });
        }

        match tokio::fs::metadata(output).await {
            Ok(meta) if meta.len() > 0 => {}
            _ => return Err(PipelineError::MissingOutput),
        }

        info!(output = %output.display(), duration = plan.total_secs, "Render finished");
        Ok(RenderedAsset {
            path: output.to_path_buf(),
            duration_seconds: plan.total_secs,
        })
    }
}
