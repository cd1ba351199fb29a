//! Audio trimming and lyric video rendering through ffmpeg.

use crate::process;
use async_trait::async_trait;
use lyriclip_core::request::parse_color;
use lyriclip_core::{
    AudioTrimmer, CoreError, RenderConfig, RenderOptions, SynthesisJob, TimedLine, TimedLyrics,
    VideoSynthesizer,
};
use std::fmt::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Average glyph advance as a fraction of the font size
const GLYPH_WIDTH_RATIO: f64 = 0.6;
/// Fraction of the frame the text may span
const FRAME_FILL: f64 = 0.9;

/// Cuts a window out of the downloaded audio and re-encodes it as mp3.
#[derive(Debug, Clone)]
pub struct FfmpegTrimmer {
    program: String,
}

impl FfmpegTrimmer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl AudioTrimmer for FfmpegTrimmer {
    async fn trim(&self, input: &Path, output: &Path, start: f64, end: f64) -> Result<bool, CoreError> {
        info!("Trimming {} to {}s..{}s", input.display(), start, end);
        process::run(&self.program, &trim_args(input, output, start, end)).await?;
        Ok(tokio::fs::try_exists(output).await?)
    }
}

fn trim_args(input: &Path, output: &Path, start: f64, end: f64) -> Vec<String> {
    vec![
        "-y".into(),
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-i".into(),
        input.to_string_lossy().into_owned(),
        "-ss".into(),
        start.to_string(),
        "-to".into(),
        end.to_string(),
        "-vn".into(),
        "-codec:a".into(),
        "libmp3lame".into(),
        "-q:a".into(),
        "2".into(),
        output.to_string_lossy().into_owned(),
    ]
}

/// Renders each lyric line as centred text on a solid background.
#[derive(Debug, Clone)]
pub struct FfmpegRenderer {
    program: String,
    width: u32,
    height: u32,
    fps: u32,
    text_color: String,
    font_file: Option<PathBuf>,
}

impl FfmpegRenderer {
    pub fn new(program: impl Into<String>, config: &RenderConfig) -> Self {
        Self {
            program: program.into(),
            width: config.width,
            height: config.height,
            fps: config.fps,
            text_color: config.text_color.clone(),
            font_file: config.font_file.clone(),
        }
    }

    /// Build the `-filter_complex` graph for a lyric window.
    fn filter_graph(&self, lyrics: &TimedLyrics, options: &RenderOptions) -> Result<String, CoreError> {
        let text_color = ffmpeg_color(&self.text_color)?;
        let mut filters = Vec::new();

        let lines = lyrics.lines();
        for line in lines.iter().filter(|l| !l.text.is_empty()) {
            let enable = match next_offset(lines, line.offset) {
                Some(next) => format!("gte(t,{})*lt(t,{next})", line.offset),
                None => format!("gte(t,{})", line.offset),
            };
            let size = fitted_font_size(&line.text, options.font_size, self.width, self.height);

            let mut filter = format!(
                "drawtext=text={}:expansion=none:fontsize={size}:fontcolor={text_color}:x=(w-text_w)/2:y=(h-text_h)/2",
                escape_filter_value(&line.text)
            );
            if let Some(font) = &self.font_file {
                let _ = write!(filter, ":fontfile={}", escape_filter_value(&font.to_string_lossy()));
            }
            let _ = write!(filter, ":enable='{enable}'");
            filters.push(filter);
        }

        if options.intensity > 1 {
            let small_w = (self.width / options.intensity).max(1);
            let small_h = (self.height / options.intensity).max(1);
            filters.push(format!("scale={small_w}:{small_h}:flags=neighbor"));
            filters.push(format!("scale={}:{}:flags=neighbor", self.width, self.height));
        }

        if filters.is_empty() {
            filters.push("null".into());
        }
        Ok(format!("[0:v]{}[v]", filters.join(",")))
    }

    fn render_args(&self, job: &SynthesisJob<'_>, graph: String) -> Result<Vec<String>, CoreError> {
        let background = ffmpeg_color(&job.options.background_color)?;
        Ok(vec![
            "-y".into(),
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-f".into(),
            "lavfi".into(),
            "-i".into(),
            format!("color=c={background}:s={}x{}:r={}", self.width, self.height, self.fps),
            "-i".into(),
            job.audio.to_string_lossy().into_owned(),
            "-filter_complex".into(),
            graph,
            "-map".into(),
            "[v]".into(),
            "-map".into(),
            "1:a".into(),
            "-c:v".into(),
            "libx264".into(),
            "-preset".into(),
            "veryfast".into(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            "-c:a".into(),
            "aac".into(),
            "-b:a".into(),
            "192k".into(),
            "-shortest".into(),
            job.output.to_string_lossy().into_owned(),
        ])
    }
}

#[async_trait]
impl VideoSynthesizer for FfmpegRenderer {
    async fn synthesize(&self, job: &SynthesisJob<'_>) -> Result<(), CoreError> {
        let content = tokio::fs::read_to_string(job.lyrics).await?;
        let lyrics: TimedLyrics = serde_json::from_str(&content)?;
        debug!("Rendering {} lyric lines", lyrics.len());

        let graph = self.filter_graph(&lyrics, job.options)?;
        let args = self.render_args(job, graph)?;
        info!("Rendering video to {}", job.output.display());
        process::run(&self.program, &args).await?;
        Ok(())
    }
}

/// Earliest offset after `offset` anywhere in `lines`. Lines may be out of
/// order, so the following line is not necessarily the next one shown.
fn next_offset(lines: &[TimedLine], offset: f64) -> Option<f64> {
    lines
        .iter()
        .map(|l| l.offset)
        .filter(|&o| o > offset)
        .min_by(f64::total_cmp)
}

/// `#RRGGBB[AA]` to ffmpeg's `0xRRGGBBAA`
fn ffmpeg_color(hex: &str) -> Result<String, CoreError> {
    let (r, g, b, a) = parse_color(hex).ok_or_else(|| CoreError::ConfigInvalid {
        message: format!("{hex:?} is not a hex color"),
    })?;
    Ok(format!("0x{r:02X}{g:02X}{b:02X}{a:02X}"))
}

/// Largest font size at which `text` fits on one line of the frame, capped
/// at `max`.
fn fitted_font_size(text: &str, max: u32, width: u32, height: u32) -> u32 {
    let chars = u32::try_from(text.chars().count().max(1)).unwrap_or(u32::MAX);
    let by_width = f64::from(width) * FRAME_FILL / (f64::from(chars) * GLYPH_WIDTH_RATIO);
    let by_height = f64::from(height) * FRAME_FILL;
    let fitted = by_width.min(by_height).floor();

    // Bounded by the frame size above, so it fits in u32
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let fitted = fitted as u32;
    fitted.clamp(1, max.max(1))
}

/// Escape a drawtext option value for use inside a filter graph.
///
/// The value is unescaped twice by ffmpeg: once by the option parser
/// (`\`, `'`, `:`) and once by the graph parser (`\`, `'`, `[`, `]`, `,`, `;`).
fn escape_filter_value(value: &str) -> String {
    let escape = |input: &str, special: &[char]| {
        let mut out = String::with_capacity(input.len());
        for c in input.chars() {
            if special.contains(&c) {
                out.push('\\');
            }
            out.push(c);
        }
        out
    };
    let option_level = escape(value, &['\\', '\'', ':']);
    escape(&option_level, &['\\', '\'', '[', ']', ',', ';'])
}
