pub mod artifact;
pub mod clock;
pub mod config;
pub mod error;
pub mod history;
pub mod lrc;
pub mod media;
pub mod orchestrator;
pub mod paths;
pub mod provider;
pub mod request;
pub mod resolver;
pub mod window;

pub use artifact::{GenerationArtifact, NameReservations, Reservation};
pub use clock::parse_clock_time;
pub use config::{
    Config, LoggingConfig, LyricsConfig, RenderConfig, ServerConfig, StorageConfig,
    TimeoutsConfig, ToolsConfig,
};

pub use error::{CoreError, GenerateError, Stage, ValidationError};
pub use history::{HistoryRecord, HistoryRecorder, HistoryStore, NewHistoryRecord};
pub use lrc::{TimedLine, TimedLyrics};
pub use media::{
    AudioAcquirer, AudioTrimmer, PendingDownload, SynthesisJob, TempFileRemover, TransientFile,
    VideoSynthesizer,
};
pub use orchestrator::{Collaborators, Generator, StageTimeouts};
pub use paths::{config_dir, CONFIG_DIR_NAME, CONFIG_FILE_NAME, HISTORY_DB_FILE_NAME};
pub use provider::{LyricRecord, LyricsSource};
pub use request::{
    AudioStrategy, GenerationPlan, GenerationRequest, LyricsStrategy, RenderOptions,
};
pub use resolver::LyricsResolver;
pub use window::Window;
