//! External-tool implementations of the generator's media stages.

pub mod ffmpeg;
pub mod process;
pub mod remove;
pub mod ytdlp;

pub use ffmpeg::{FfmpegRenderer, FfmpegTrimmer};
pub use remove::FsRemover;
pub use ytdlp::{VideoResult, YtDlp, DEFAULT_SEARCH_LIMIT};
