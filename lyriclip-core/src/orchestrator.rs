//! Generation pipeline: lyrics → window → audio → trim → video → history.

use crate::artifact::{GenerationArtifact, NameReservations};
use crate::error::{CoreError, GenerateError, Stage};
use crate::history::{HistoryRecord, HistoryRecorder, NewHistoryRecord};
use crate::lrc::TimedLyrics;
use crate::media::{
    AudioAcquirer, AudioTrimmer, PendingDownload, SynthesisJob, TempFileRemover, TransientFile,
    VideoSynthesizer,
};
use crate::provider::LyricsSource;
use crate::request::{AudioStrategy, GenerationPlan};
use crate::resolver::LyricsResolver;
use chrono::{Local, Utc};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Upper bounds for the stages that call out to slow collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTimeouts {
    pub lyrics: Duration,
    pub download: Duration,
    pub trim: Duration,
    pub render: Duration,
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            lyrics: Duration::from_secs(60),
            download: Duration::from_secs(300),
            trim: Duration::from_secs(120),
            render: Duration::from_secs(600),
        }
    }
}

/// The external services a [`Generator`] drives.
#[derive(Clone)]
pub struct Collaborators {
    pub lyrics: Arc<dyn LyricsSource>,
    pub audio: Arc<dyn AudioAcquirer>,
    pub trimmer: Arc<dyn AudioTrimmer>,
    pub renderer: Arc<dyn VideoSynthesizer>,
    pub remover: Arc<dyn TempFileRemover>,
    pub history: Arc<dyn HistoryRecorder>,
}

/// Runs generation requests end to end.
///
/// Stages run strictly in sequence and are never retried. Cancellation is
/// only observed between stages, so a collaborator call is never abandoned
/// halfway through.
pub struct Generator {
    collaborators: Collaborators,
    output_dir: PathBuf,
    timeouts: StageTimeouts,
    names: NameReservations,
}

impl Generator {
    pub fn new(collaborators: Collaborators, output_dir: impl Into<PathBuf>, timeouts: StageTimeouts) -> Self {
        Self {
            collaborators,
            output_dir: output_dir.into(),
            timeouts,
            names: NameReservations::new(),
        }
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// All completed generations, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the history store cannot be read.
    pub async fn list_history(&self) -> Result<Vec<HistoryRecord>, CoreError> {
        self.collaborators.history.list_all().await
    }

    /// Run one generation.
    ///
    /// On success the lyric window, trimmed audio and video all exist under
    /// the output directory. On failure, artifacts written by earlier stages
    /// are left in place; the transient download is always removed.
    ///
    /// # Errors
    ///
    /// Returns a [`GenerateError`] tagged with the failing stage.
    pub async fn generate(
        &self,
        plan: &GenerationPlan,
        cancel: &CancellationToken,
    ) -> Result<GenerationArtifact, GenerateError> {
        let reservation = self.names.reserve(&self.output_dir, &plan.song, &Local::now());
        let artifact = reservation.artifact();
        info!(
            "Generating {} for {} - {} ({}s..{}s)",
            artifact.base_name,
            plan.artist,
            plan.song,
            plan.window.start(),
            plan.window.end()
        );

        checkpoint(cancel, Stage::Lyrics)?;
        let lyrics = self.resolve_lyrics(plan).await?;

        checkpoint(cancel, Stage::Window)?;
        self.write_window(&lyrics, plan, artifact).await?;

        checkpoint(cancel, Stage::Audio)?;
        self.prepare_audio(plan, artifact).await?;

        checkpoint(cancel, Stage::Video)?;
        self.synthesize(plan, artifact).await?;

        self.record_history(plan, artifact).await;

        info!("Generated {}", artifact.video_path.display());
        Ok(artifact.clone())
    }

    async fn resolve_lyrics(&self, plan: &GenerationPlan) -> Result<TimedLyrics, GenerateError> {
        let resolver = LyricsResolver::new(self.collaborators.lyrics.as_ref());

        match bounded(self.timeouts.lyrics, resolver.resolve(&plan.lyrics)).await {
            Ok(Some(lyrics)) => {
                debug!("Resolved {} timed lines", lyrics.len());
                Ok(lyrics)
            }
            Ok(None) => Err(GenerateError::LyricsNotFound),
            Err(reason) => Err(GenerateError::LyricsUnavailable { reason }),
        }
    }

    /// Slice the lyrics to the requested window and persist the result.
    async fn write_window(
        &self,
        lyrics: &TimedLyrics,
        plan: &GenerationPlan,
        artifact: &GenerationArtifact,
    ) -> Result<(), GenerateError> {
        let window = lyrics.slice(plan.window);
        if window.is_empty() {
            return Err(GenerateError::EmptyWindow {
                start: plan.window.start(),
                end: plan.window.end(),
            });
        }
        debug!("{} lines fall inside the window", window.len());

        let write = async {
            tokio::fs::create_dir_all(&self.output_dir).await?;
            let json = serde_json::to_vec(&window)?;
            tokio::fs::write(&artifact.lyrics_path, json).await?;
            Ok::<_, CoreError>(())
        };
        write.await.map_err(|e| GenerateError::WindowWrite {
            reason: format!("failed to write {}: {e}", artifact.lyrics_path.display()),
        })
    }

    /// Download the audio, then trim it into the durable audio artifact.
    ///
    /// The download is held in a [`TransientFile`] for the duration of the
    /// trim, so it is removed whether trimming succeeds, fails or times out.
    /// Partial output from a failed or timed-out download is swept by a
    /// [`PendingDownload`].
    async fn prepare_audio(
        &self,
        plan: &GenerationPlan,
        artifact: &GenerationArtifact,
    ) -> Result<(), GenerateError> {
        let out_name = artifact.transient_audio_name();
        let audio = self.collaborators.audio.as_ref();
        let _pending = PendingDownload::new(audio, &out_name);

        let acquire = match &plan.audio {
            AudioStrategy::Locator(locator) => {
                info!("Downloading audio from locator: {}", locator);
                audio.acquire_by_locator(locator, &out_name)
            }
            AudioStrategy::Search(query) => {
                info!("Downloading audio by search: {}", query);
                audio.acquire(query, &out_name)
            }
        };

        let downloaded = match bounded(self.timeouts.download, acquire).await {
            Ok(Some(path)) => path,
            Ok(None) => {
                return Err(GenerateError::Acquisition {
                    reason: "no audio file was downloaded".into(),
                })
            }
            Err(reason) => return Err(GenerateError::Acquisition { reason }),
        };
        let transient = TransientFile::new(downloaded, Arc::clone(&self.collaborators.remover));

        let trimmed = bounded(
            self.timeouts.trim,
            self.collaborators.trimmer.trim(
                transient.path(),
                &artifact.audio_path,
                plan.window.start(),
                plan.window.end(),
            ),
        )
        .await;
        drop(transient);

        match trimmed {
            Ok(true) => Ok(()),
            Ok(false) => Err(GenerateError::Trim {
                reason: "trimmer produced no output".into(),
            }),
            Err(reason) => Err(GenerateError::Trim { reason }),
        }
    }

    async fn synthesize(
        &self,
        plan: &GenerationPlan,
        artifact: &GenerationArtifact,
    ) -> Result<(), GenerateError> {
        let job = SynthesisJob {
            audio: &artifact.audio_path,
            lyrics: &artifact.lyrics_path,
            output: &artifact.video_path,
            options: &plan.render,
        };

        bounded(self.timeouts.render, self.collaborators.renderer.synthesize(&job))
            .await
            .map_err(|reason| GenerateError::Synthesis { reason })
    }

    /// Best-effort: a failed append is logged and otherwise ignored.
    async fn record_history(&self, plan: &GenerationPlan, artifact: &GenerationArtifact) {
        let record = NewHistoryRecord {
            song: plan.song.clone(),
            artist: plan.artist.clone(),
            filename: artifact.video_file_name(),
            created_at: Utc::now(),
        };

        match self.collaborators.history.append(record).await {
            Ok(id) => debug!("Recorded generation as history entry {}", id),
            Err(e) => warn!("Failed to record generation history (non-fatal): {}", e),
        }
    }
}

fn checkpoint(cancel: &CancellationToken, next: Stage) -> Result<(), GenerateError> {
    if cancel.is_cancelled() {
        info!("Generation cancelled before the {} stage", next);
        return Err(GenerateError::Cancelled { stage: next });
    }
    Ok(())
}

/// Await a collaborator call with a deadline, flattening both failure kinds
/// into a message.
async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, String>
where
    F: Future<Output = Result<T, CoreError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("timed out after {}s", limit.as_secs())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryStore;
    use crate::provider::LyricRecord;
    use crate::request::{GenerationRequest, LyricsStrategy, RenderOptions};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    const DOCUMENT: &str = "[00:01.50]Hello\n\n[00:03.00]World\n[bad line]";

    #[derive(Clone, Copy, Default, PartialEq)]
    enum LyricsBehavior {
        #[default]
        Answer,
        Fail,
        Hang,
    }

    #[derive(Default)]
    struct FakeLyrics {
        records: Vec<LyricRecord>,
        behavior: LyricsBehavior,
        calls: Mutex<usize>,
    }

    impl FakeLyrics {
        async fn respond(&self) -> Result<(), CoreError> {
            *self.calls.lock().unwrap() += 1;
            match self.behavior {
                LyricsBehavior::Answer => Ok(()),
                LyricsBehavior::Fail => Err(CoreError::LyricsSourceFailed {
                    source_name: "fake".into(),
                    reason: "status 503".into(),
                }),
                LyricsBehavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(())
                }
            }
        }
    }

    #[async_trait]
    impl LyricsSource for FakeLyrics {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn search(&self, _query: &str) -> Result<Vec<LyricRecord>, CoreError> {
            self.respond().await?;
            Ok(self.records.clone())
        }

        async fn get(&self, id: i64) -> Result<Option<LyricRecord>, CoreError> {
            self.respond().await?;
            Ok(self.records.iter().find(|r| r.id == id).cloned())
        }
    }

    #[derive(Clone, Copy, PartialEq)]
    enum AudioBehavior {
        Download,
        Nothing,
        Hang,
        /// Leaves a partial file behind, then stalls
        PartialThenHang,
    }

    struct FakeAudio {
        dir: PathBuf,
        behavior: AudioBehavior,
        calls: Mutex<Vec<String>>,
        downloaded: Mutex<Option<PathBuf>>,
    }

    impl FakeAudio {
        async fn fetch(&self, what: String, out_name: &str) -> Result<Option<PathBuf>, CoreError> {
            self.calls.lock().unwrap().push(what);
            match self.behavior {
                AudioBehavior::Download => {
                    let path = self.dir.join(format!("{out_name}.mp3"));
                    std::fs::write(&path, b"full song")?;
                    *self.downloaded.lock().unwrap() = Some(path.clone());
                    Ok(Some(path))
                }
                AudioBehavior::Nothing => Ok(None),
                AudioBehavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(None)
                }
                AudioBehavior::PartialThenHang => {
                    std::fs::write(self.dir.join(format!("{out_name}.webm.part")), b"half a song")?;
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(None)
                }
            }
        }

        fn temp_files(&self) -> Vec<PathBuf> {
            std::fs::read_dir(&self.dir)
                .unwrap()
                .map(|e| e.unwrap().path())
                .collect()
        }
    }

    #[async_trait]
    impl AudioAcquirer for FakeAudio {
        async fn acquire(&self, query: &str, out_name: &str) -> Result<Option<PathBuf>, CoreError> {
            self.fetch(format!("search:{query}"), out_name).await
        }

        async fn acquire_by_locator(
            &self,
            locator: &str,
            out_name: &str,
        ) -> Result<Option<PathBuf>, CoreError> {
            self.fetch(format!("locator:{locator}"), out_name).await
        }

        fn discard(&self, out_name: &str) {
            let prefix = format!("{out_name}.");
            for path in self.temp_files() {
                let name = path.file_name().unwrap().to_string_lossy().into_owned();
                if name.starts_with(&prefix) {
                    std::fs::remove_file(path).unwrap();
                }
            }
        }
    }

    #[derive(Clone, Copy, PartialEq)]
    enum TrimBehavior {
        Succeed,
        Fail,
        Hang,
    }

    struct FakeTrimmer {
        behavior: TrimBehavior,
        window: Mutex<Option<(f64, f64)>>,
        input_existed: Mutex<bool>,
    }

    #[async_trait]
    impl AudioTrimmer for FakeTrimmer {
        async fn trim(&self, input: &Path, output: &Path, start: f64, end: f64) -> Result<bool, CoreError> {
            *self.window.lock().unwrap() = Some((start, end));
            *self.input_existed.lock().unwrap() = input.exists();
            match self.behavior {
                TrimBehavior::Succeed => {
                    std::fs::write(output, b"clip")?;
                    Ok(true)
                }
                TrimBehavior::Fail => Ok(false),
                TrimBehavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(true)
                }
            }
        }
    }

    #[derive(Clone, Copy, PartialEq)]
    enum RenderBehavior {
        Succeed,
        Fail,
        Hang,
    }

    struct FakeRenderer {
        behavior: RenderBehavior,
        options: Mutex<Option<RenderOptions>>,
        lyrics_json: Mutex<Option<String>>,
    }

    #[async_trait]
    impl VideoSynthesizer for FakeRenderer {
        async fn synthesize(&self, job: &SynthesisJob<'_>) -> Result<(), CoreError> {
            *self.options.lock().unwrap() = Some(job.options.clone());
            *self.lyrics_json.lock().unwrap() = Some(std::fs::read_to_string(job.lyrics)?);
            assert!(job.audio.exists());
            match self.behavior {
                RenderBehavior::Succeed => {}
                RenderBehavior::Fail => {
                    return Err(CoreError::CommandFailed {
                        program: "renderer".into(),
                        status: "exit status: 1".into(),
                        stderr: "font missing".into(),
                    });
                }
                RenderBehavior::Hang => tokio::time::sleep(Duration::from_secs(3600)).await,
            }
            std::fs::write(job.output, b"video")?;
            Ok(())
        }
    }

    struct DeletingRemover;

    impl TempFileRemover for DeletingRemover {
        fn remove(&self, path: &Path) {
            let _ = std::fs::remove_file(path);
        }
    }

    struct BrokenHistory;

    #[async_trait]
    impl HistoryRecorder for BrokenHistory {
        async fn append(&self, _record: NewHistoryRecord) -> crate::error::Result<i64> {
            Err(CoreError::IoError(std::io::Error::other("database unreachable")))
        }

        async fn list_all(&self) -> crate::error::Result<Vec<HistoryRecord>> {
            Err(CoreError::IoError(std::io::Error::other("database unreachable")))
        }
    }

    struct Harness {
        _dir: TempDir,
        output_dir: PathBuf,
        lyrics: Arc<FakeLyrics>,
        audio: Arc<FakeAudio>,
        trimmer: Arc<FakeTrimmer>,
        renderer: Arc<FakeRenderer>,
        history: Arc<dyn HistoryRecorder>,
        generator: Generator,
    }

    struct Setup {
        records: Vec<LyricRecord>,
        lyrics: LyricsBehavior,
        audio: AudioBehavior,
        trim: TrimBehavior,
        render: RenderBehavior,
        history: Option<Arc<dyn HistoryRecorder>>,
    }

    impl Default for Setup {
        fn default() -> Self {
            Self {
                records: vec![LyricRecord {
                    id: 7,
                    track_name: "Apple".into(),
                    artist_name: "Charli xcx".into(),
                    synced_lyrics: Some(DOCUMENT.into()),
                    ..Default::default()
                }],
                lyrics: LyricsBehavior::Answer,
                audio: AudioBehavior::Download,
                trim: TrimBehavior::Succeed,
                render: RenderBehavior::Succeed,
                history: None,
            }
        }
    }

    async fn harness(setup: Setup) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("out");
        let temp_dir = dir.path().join("tmp");
        std::fs::create_dir_all(&temp_dir).unwrap();

        let lyrics = Arc::new(FakeLyrics {
            records: setup.records,
            behavior: setup.lyrics,
            ..Default::default()
        });
        let audio = Arc::new(FakeAudio {
            dir: temp_dir,
            behavior: setup.audio,
            calls: Mutex::default(),
            downloaded: Mutex::default(),
        });
        let trimmer = Arc::new(FakeTrimmer {
            behavior: setup.trim,
            window: Mutex::default(),
            input_existed: Mutex::default(),
        });
        let renderer = Arc::new(FakeRenderer {
            behavior: setup.render,
            options: Mutex::default(),
            lyrics_json: Mutex::default(),
        });
        let history = match setup.history {
            Some(history) => history,
            None => Arc::new(HistoryStore::open_in_memory().await.unwrap()),
        };

        let collaborators = Collaborators {
            lyrics: lyrics.clone(),
            audio: audio.clone(),
            trimmer: trimmer.clone(),
            renderer: renderer.clone(),
            remover: Arc::new(DeletingRemover),
            history: history.clone(),
        };
        let generator = Generator::new(collaborators, &output_dir, StageTimeouts::default());

        Harness {
            _dir: dir,
            output_dir,
            lyrics,
            audio,
            trimmer,
            renderer,
            history,
            generator,
        }
    }

    fn plan(start: &str, end: &str) -> GenerationPlan {
        GenerationRequest {
            song: "Apple".into(),
            artist: "Charli xcx".into(),
            start_time: start.into(),
            end_time: end.into(),
            ..Default::default()
        }
        .into_plan(&RenderOptions::default())
        .unwrap()
    }

    impl Harness {
        fn downloaded(&self) -> Option<PathBuf> {
            self.audio.downloaded.lock().unwrap().clone()
        }

        fn audio_calls(&self) -> Vec<String> {
            self.audio.calls.lock().unwrap().clone()
        }
    }

    #[tokio::test]
    async fn test_successful_generation() {
        let h = harness(Setup::default()).await;
        let artifact = h
            .generator
            .generate(&plan("00:01", "00:02"), &CancellationToken::new())
            .await
            .unwrap();

        assert!(artifact.base_name.starts_with("Apple_"));
        assert_eq!(artifact.video_path.parent(), Some(h.output_dir.as_path()));
        assert!(artifact.lyrics_path.exists());
        assert!(artifact.audio_path.exists());
        assert!(artifact.video_path.exists());

        let json = std::fs::read_to_string(&artifact.lyrics_path).unwrap();
        assert_eq!(json, r#"[{"start":0.5,"text":"Hello"}]"#);
        assert_eq!(
            h.renderer.lyrics_json.lock().unwrap().as_deref(),
            Some(json.as_str())
        );
        assert_eq!(
            *h.renderer.options.lock().unwrap(),
            Some(RenderOptions::default())
        );

        // Trim gets the un-rebased window
        assert_eq!(*h.trimmer.window.lock().unwrap(), Some((1.0, 2.0)));
        assert!(*h.trimmer.input_existed.lock().unwrap());
        assert!(!h.downloaded().unwrap().exists());

        assert_eq!(h.audio_calls(), ["search:Charli xcx - Apple audio"]);

        let history = h.generator.list_history().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].song, "Apple");
        assert_eq!(history[0].filename, artifact.video_file_name());
    }

    #[tokio::test]
    async fn test_lyrics_not_found_stops_before_audio() {
        let h = harness(Setup {
            records: vec![],
            ..Default::default()
        })
        .await;
        let err = h
            .generator
            .generate(&plan("00:01", "00:02"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, GenerateError::LyricsNotFound));
        assert!(h.audio_calls().is_empty());
    }

    #[tokio::test]
    async fn test_lyrics_source_failure_is_lyrics_stage_error() {
        let h = harness(Setup {
            lyrics: LyricsBehavior::Fail,
            ..Default::default()
        })
        .await;
        let err = h
            .generator
            .generate(&plan("00:01", "00:02"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Stage::Lyrics);
        match err {
            GenerateError::LyricsUnavailable { reason } => assert!(reason.contains("status 503")),
            other => panic!("unexpected error: {other}"),
        }
        assert!(h.audio_calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lyrics_timeout_is_lyrics_stage_error() {
        let h = harness(Setup {
            lyrics: LyricsBehavior::Hang,
            ..Default::default()
        })
        .await;
        let err = h
            .generator
            .generate(&plan("00:01", "00:02"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Stage::Lyrics);
        match err {
            GenerateError::LyricsUnavailable { reason } => assert_eq!(reason, "timed out after 60s"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(h.audio_calls().is_empty());
    }

    #[tokio::test]
    async fn test_window_write_failure_is_window_stage_error() {
        let h = harness(Setup::default()).await;
        // A plain file where the output directory should be
        std::fs::write(&h.output_dir, b"not a directory").unwrap();

        let err = h
            .generator
            .generate(&plan("00:01", "00:02"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, GenerateError::WindowWrite { .. }));
        assert_eq!(err.stage(), Stage::Window);
        assert!(!err.is_client_error());
        assert!(h.audio_calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_window_is_distinct_from_not_found() {
        let h = harness(Setup::default()).await;
        let err = h
            .generator
            .generate(&plan("00:05", "00:06"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Stage::Window);
        match err {
            GenerateError::EmptyWindow { start, end } => assert_eq!((start, end), (5.0, 6.0)),
            other => panic!("unexpected error: {other}"),
        }
        assert!(h.audio_calls().is_empty());
    }

    #[tokio::test]
    async fn test_document_takes_priority_over_lookup() {
        let h = harness(Setup::default()).await;
        let mut plan = GenerationRequest {
            song: "Apple".into(),
            artist: "Charli xcx".into(),
            start_time: "00:00".into(),
            end_time: "00:10".into(),
            lyrics_id: Some(7),
            manual_lrc: Some("[00:04.00]Pasted".into()),
            ..Default::default()
        }
        .into_plan(&RenderOptions::default())
        .unwrap();
        assert!(matches!(plan.lyrics, LyricsStrategy::Document(_)));
        plan.audio = AudioStrategy::Locator("abc123".into());

        let artifact = h
            .generator
            .generate(&plan, &CancellationToken::new())
            .await
            .unwrap();

        let json = std::fs::read_to_string(&artifact.lyrics_path).unwrap();
        assert_eq!(json, r#"[{"start":4.0,"text":"Pasted"}]"#);
        assert_eq!(*h.lyrics.calls.lock().unwrap(), 0);
        assert_eq!(h.audio_calls(), ["locator:abc123"]);
    }

    #[tokio::test]
    async fn test_missing_download_is_acquisition_error() {
        let h = harness(Setup {
            audio: AudioBehavior::Nothing,
            ..Default::default()
        })
        .await;
        let err = h
            .generator
            .generate(&plan("00:01", "00:02"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, GenerateError::Acquisition { .. }));
        assert!(h.trimmer.window.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_trim_failure_still_removes_download() {
        let h = harness(Setup {
            trim: TrimBehavior::Fail,
            ..Default::default()
        })
        .await;
        let err = h
            .generator
            .generate(&plan("00:01", "00:02"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, GenerateError::Trim { .. }));
        assert_eq!(err.stage(), Stage::Audio);
        let downloaded = h.downloaded().unwrap();
        assert!(!downloaded.exists());
        assert!(h.renderer.options.lock().unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_trim_timeout_removes_download() {
        let h = harness(Setup {
            trim: TrimBehavior::Hang,
            ..Default::default()
        })
        .await;
        let err = h
            .generator
            .generate(&plan("00:01", "00:02"), &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            GenerateError::Trim { reason } => assert!(reason.contains("timed out")),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!h.downloaded().unwrap().exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_download_timeout_is_acquisition_error() {
        let h = harness(Setup {
            audio: AudioBehavior::Hang,
            ..Default::default()
        })
        .await;
        let err = h
            .generator
            .generate(&plan("00:01", "00:02"), &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            GenerateError::Acquisition { reason } => assert_eq!(reason, "timed out after 300s"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_download_timeout_discards_partial_output() {
        let h = harness(Setup {
            audio: AudioBehavior::PartialThenHang,
            ..Default::default()
        })
        .await;
        let err = h
            .generator
            .generate(&plan("00:01", "00:02"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, GenerateError::Acquisition { .. }));
        assert!(h.audio.temp_files().is_empty());
        assert!(h.trimmer.window.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_temp_dir_empty_after_success() {
        let h = harness(Setup::default()).await;
        h.generator
            .generate(&plan("00:01", "00:02"), &CancellationToken::new())
            .await
            .unwrap();

        assert!(h.audio.temp_files().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_render_timeout_is_synthesis_error() {
        let h = harness(Setup {
            render: RenderBehavior::Hang,
            ..Default::default()
        })
        .await;
        let err = h
            .generator
            .generate(&plan("00:01", "00:02"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Stage::Video);
        match err {
            GenerateError::Synthesis { reason } => assert_eq!(reason, "timed out after 600s"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(h.history.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_synthesis_failure_leaves_earlier_artifacts() {
        let h = harness(Setup {
            render: RenderBehavior::Fail,
            ..Default::default()
        })
        .await;
        let err = h
            .generator
            .generate(&plan("00:01", "00:02"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, GenerateError::Synthesis { .. }));
        assert_eq!(err.stage(), Stage::Video);
        assert!(!h.downloaded().unwrap().exists());

        let leftovers: Vec<_> = std::fs::read_dir(&h.output_dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(leftovers.len(), 2);
        assert!(h.history.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_history_failure_is_not_fatal() {
        let h = harness(Setup {
            history: Some(Arc::new(BrokenHistory)),
            ..Default::default()
        })
        .await;
        let artifact = h
            .generator
            .generate(&plan("00:01", "00:02"), &CancellationToken::new())
            .await
            .unwrap();

        assert!(artifact.video_path.exists());
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let h = harness(Setup::default()).await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = h
            .generator
            .generate(&plan("00:01", "00:02"), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GenerateError::Cancelled {
                stage: Stage::Lyrics
            }
        ));
        assert_eq!(*h.lyrics.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_back_to_back_generations_get_distinct_names() {
        let h = harness(Setup::default()).await;
        let cancel = CancellationToken::new();
        let first = h.generator.generate(&plan("00:01", "00:02"), &cancel).await.unwrap();
        let second = h.generator.generate(&plan("00:01", "00:02"), &cancel).await.unwrap();

        assert_ne!(first.base_name, second.base_name);
        assert!(first.video_path.exists());
        assert!(second.video_path.exists());
        assert_eq!(h.generator.list_history().await.unwrap().len(), 2);
    }
}
