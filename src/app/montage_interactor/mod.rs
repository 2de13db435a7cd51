// Montage interactor - Orchestrates the probe → analyze → select → plan → build → encode pipeline

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config_initialization::MontageConfig;
use crate::domain::errors::DomainError;
use crate::domain::model::*;
use crate::domain::rules::SpecValidator;
use crate::engine::{BuiltGraph, EncodeCommand, EncoderChoice, EngineVersion, GraphBuilder, ProgressCallback};
use crate::error::{ErrorKind, MontageError, MontageResult};
use crate::planner::{
    AuxiliaryAssets, EffectPlan, EffectPlanner, FeasibilityWarning, SegmentSelector, Selection, SourceProfile,
};
use crate::ports::*;
use crate::probe::{EnergyAnalyzer, MediaProber};
use crate::utils::RunWorkspace;

const FILTER_SCRIPT_NAME: &str = "filter_graph.txt";

/// Pipeline state of one montage run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MontageState {
    Idle,
    Probed,
    Analyzed,
    Selected,
    Planned,
    GraphBuilt,
    Encoding,
    Done,
    Failed { kind: ErrorKind, message: String },
}

impl fmt::Display for MontageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MontageState::Failed { kind, message } => write!(f, "Failed({}: {})", kind, message),
            other => write!(f, "{:?}", other),
        }
    }
}

/// State machine tracking a run; every transition is recorded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MontageRun {
    state: MontageState,
    history: Vec<MontageState>,
}

impl Default for MontageRun {
    fn default() -> Self {
        Self {
            state: MontageState::Idle,
            history: vec![MontageState::Idle],
        }
    }
}

impl MontageRun {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &MontageState {
        &self.state
    }

    pub fn history(&self) -> &[MontageState] {
        &self.history
    }

    fn advance(&mut self, next: MontageState) {
        debug!(from = %self.state, to = %next, "Pipeline transition");
        self.state = next.clone();
        self.history.push(next);
    }

    /// Move to `Failed`, keeping the originating error
    fn fail(&mut self, err: &MontageError) {
        let failed = MontageState::Failed {
            kind: err.kind(),
            message: err.to_string(),
        };
        error!(stage = %self.state, kind = %err.kind(), "Montage failed: {}", err);
        self.advance(failed);
    }
}

/// What to build: one or more sources and an output specification
#[derive(Debug, Clone)]
pub struct MontageRequest {
    pub sources: Vec<PathBuf>,
    pub spec: OutputSpec,
}

/// Everything computed before encoding
#[derive(Debug, Clone)]
pub struct PreparedMontage {
    pub sources: Vec<MediaAsset>,
    /// Duration category of each source, in source order
    pub categories: Vec<DurationCategory>,
    pub selection: Selection,
    pub plan: EffectPlan,
    pub built: BuiltGraph,
}

/// Output of a dry run
#[derive(Debug, Clone)]
pub struct PlanPreview {
    pub prepared: PreparedMontage,
    pub filter_complex: String,
    pub debug_dump: String,
    /// Encoder arguments, with the script path as it would be written
    pub command: Vec<String>,
}

/// Summary of a finished montage
#[derive(Debug, Clone, Serialize)]
pub struct MontageReport {
    pub output_path: PathBuf,
    pub duration: f64,
    pub segments: Vec<Segment>,
    pub warning: Option<FeasibilityWarning>,
    pub encoder: EncoderChoice,
    /// The hardware encoder failed and the software encoder was used instead
    pub fell_back: bool,
    pub elapsed: Duration,
    pub diagnostics: Vec<String>,
}

/// Interactor for the montage use case
pub struct MontageInteractor {
    prober: MediaProber,
    analyzer: EnergyAnalyzer,
    encode_port: Arc<dyn EncodePort>,
    config: MontageConfig,
    encoder: EncoderChoice,
    engine_version: Option<EngineVersion>,
}

impl MontageInteractor {
    /// Create new montage interactor with injected ports
    pub fn new(
        probe_port: Arc<dyn ProbePort>,
        audio_port: Arc<dyn AudioPort>,
        encode_port: Arc<dyn EncodePort>,
        config: MontageConfig,
        encoder: EncoderChoice,
    ) -> Self {
        Self {
            prober: MediaProber::new(probe_port),
            analyzer: EnergyAnalyzer::new(audio_port, config.sample_rate, config.analysis_window),
            encode_port,
            config,
            encoder,
            engine_version: None,
        }
    }

    /// Target a known engine release when building command lines
    pub fn with_engine_version(mut self, version: Option<EngineVersion>) -> Self {
        self.engine_version = version;
        self
    }

    pub fn encoder(&self) -> EncoderChoice {
        self.encoder
    }

    /// Build the montage end to end
    pub async fn execute(
        &self,
        request: &MontageRequest,
        progress: &dyn ProgressCallback,
        cancel: watch::Receiver<bool>,
    ) -> MontageResult<MontageReport> {
        let mut run = MontageRun::new();
        self.execute_tracked(request, progress, cancel, &mut run).await
    }

    /// Same as [`execute`](Self::execute), recording transitions into `run`
    pub async fn execute_tracked(
        &self,
        request: &MontageRequest,
        progress: &dyn ProgressCallback,
        cancel: watch::Receiver<bool>,
        run: &mut MontageRun,
    ) -> MontageResult<MontageReport> {
        let result = self.run_pipeline(request, progress, cancel, run).await;
        match &result {
            Ok(report) => {
                run.advance(MontageState::Done);
                info!(
                    output = %report.output_path.display(),
                    duration = report.duration,
                    encoder = %report.encoder,
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    "Montage completed"
                );
            }
            Err(err) => run.fail(err),
        }
        result
    }

    /// Run every stage except encoding and return what would be executed
    pub async fn plan(&self, request: &MontageRequest, cancel: watch::Receiver<bool>) -> MontageResult<PlanPreview> {
        let mut run = MontageRun::new();
        let prepared = match self.prepare(request, &mut run, &cancel).await {
            Ok(prepared) => prepared,
            Err(err) => {
                run.fail(&err);
                return Err(err);
            }
        };
        let graph = &prepared.built.graph;
        let command = self
            .command(&prepared, Path::new(FILTER_SCRIPT_NAME), &request.spec.output_path, self.encoder)
            .build_args();
        Ok(PlanPreview {
            filter_complex: graph.to_filter_complex(),
            debug_dump: graph.debug_dump(),
            command,
            prepared,
        })
    }

    async fn run_pipeline(
        &self,
        request: &MontageRequest,
        progress: &dyn ProgressCallback,
        cancel: watch::Receiver<bool>,
        run: &mut MontageRun,
    ) -> MontageResult<MontageReport> {
        let prepared = self.prepare(request, run, &cancel).await?;
        let spec = &request.spec;

        let workspace = RunWorkspace::create(self.config.work_dir.as_deref())?;
        let filter_complex = prepared.built.graph.to_filter_complex();
        let script = workspace.write(FILTER_SCRIPT_NAME, &filter_complex)?;
        if let Some(log_path) = &self.config.debug_filter_log {
            self.write_debug_log(log_path, &prepared, &filter_complex)?;
        }
        if let Some(parent) = spec.output_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        run.advance(MontageState::Encoding);
        let (outcome, encoder, fell_back) = self
            .encode_with_fallback(&prepared, &script, &spec.output_path, progress, cancel)
            .await?;

        Ok(MontageReport {
            output_path: spec.output_path.clone(),
            duration: prepared.plan.total_duration(),
            segments: prepared.selection.segments.clone(),
            warning: prepared.selection.warning.clone(),
            encoder,
            fell_back,
            elapsed: outcome.elapsed,
            diagnostics: outcome.diagnostics,
        })
    }

    /// Probe → analyze → select → plan → build, stopping between stages once cancelled
    async fn prepare(
        &self,
        request: &MontageRequest,
        run: &mut MontageRun,
        cancel: &watch::Receiver<bool>,
    ) -> MontageResult<PreparedMontage> {
        let spec = &request.spec;
        SpecValidator::validate(spec)?;

        let mut sources = Vec::with_capacity(request.sources.len());
        for path in &request.sources {
            check_cancelled(cancel)?;
            sources.push(self.prober.probe_as(path, MediaKind::Video).await?);
        }
        SpecValidator::validate_against_sources(spec, &sources).map_err(|e| match e {
            DomainError::OutOfRange(message) => MontageError::plan(message),
            other => MontageError::Config(other),
        })?;
        SpecValidator::validate_sources(&sources, self.config.strict_duration)?;
        let categories: Vec<DurationCategory> = sources
            .iter()
            .map(|source| DurationCategory::categorize(source.duration))
            .collect();
        for (source, category) in sources.iter().zip(&categories) {
            if *category == DurationCategory::Invalid {
                warn!(
                    source = %source.path.display(),
                    duration = source.duration,
                    "Source duration is outside the supported categories (30-3600 seconds)"
                );
            } else {
                debug!(source = %source.path.display(), category = %category, "Source categorized");
            }
        }
        let aux = self.probe_auxiliary(spec).await?;
        run.advance(MontageState::Probed);

        let mut profiles = Vec::with_capacity(sources.len());
        for source in &sources {
            check_cancelled(cancel)?;
            profiles.push(self.analyzer.analyze(source, cancel.clone()).await?);
        }
        run.advance(MontageState::Analyzed);
        check_cancelled(cancel)?;

        let offered: Vec<SourceProfile> = sources
            .iter()
            .zip(&profiles)
            .map(|(asset, profile)| SourceProfile { asset, profile })
            .collect();
        let selection =
            SegmentSelector::select_many(&offered, spec.bucket, spec.segment_duration, spec.total_duration)?;
        run.advance(MontageState::Selected);
        check_cancelled(cancel)?;

        let plan =
            EffectPlanner::new(self.config.fps, self.config.seed).plan(&selection.segments, &sources, spec, &aux)?;
        run.advance(MontageState::Planned);

        let built = GraphBuilder::new(self.config.font_file.clone()).build(&plan)?;
        run.advance(MontageState::GraphBuilt);
        check_cancelled(cancel)?;

        Ok(PreparedMontage {
            sources,
            categories,
            selection,
            plan,
            built,
        })
    }

    async fn probe_auxiliary(&self, spec: &OutputSpec) -> MontageResult<AuxiliaryAssets> {
        let mut aux = AuxiliaryAssets::default();
        if let Some(logo) = &spec.logo {
            aux.logo = Some(self.prober.probe_as(&logo.path, MediaKind::Image).await?);
        }
        if let Some(thumbnail) = &spec.thumbnail {
            aux.thumbnail = Some(self.prober.probe_as(&thumbnail.path, MediaKind::Image).await?);
        }
        if let Some(video) = &spec.intro.video {
            aux.intro_video = Some(self.prober.probe_as(&video.path, MediaKind::Video).await?);
        }
        if let Some(audio) = &spec.intro.audio {
            aux.intro_audio = Some(self.prober.probe_as(&audio.path, MediaKind::Audio).await?);
        }
        Ok(aux)
    }

    fn command(&self, prepared: &PreparedMontage, script: &Path, output: &Path, encoder: EncoderChoice) -> EncodeCommand {
        let graph = &prepared.built.graph;
        EncodeCommand::new(prepared.built.inputs.clone(), script, output)
            .map_video(graph.video_out.clone())
            .map_audio(graph.audio_out.clone())
            .encoder(encoder)
            .fps(prepared.plan.fps)
            .duration(prepared.plan.total_duration())
            .engine_version(self.engine_version)
    }

    /// Encode, retrying once in software when a hardware encoder fails
    async fn encode_with_fallback(
        &self,
        prepared: &PreparedMontage,
        script: &Path,
        output: &Path,
        progress: &dyn ProgressCallback,
        cancel: watch::Receiver<bool>,
    ) -> MontageResult<(EncodeOutcome, EncoderChoice, bool)> {
        let first = self.encode_once(prepared, script, output, self.encoder, progress, cancel.clone()).await;
        match first {
            Ok(outcome) => Ok((outcome, self.encoder, false)),
            Err(DomainError::ExternalFailure { exit_code, diagnostics }) if self.encoder.is_hardware() => {
                warn!(
                    encoder = %self.encoder,
                    exit_code = ?exit_code,
                    "Hardware encoder failed, retrying with {}",
                    EncoderChoice::Software
                );
                debug!("Hardware encoder diagnostics:\n{}", diagnostics);
                let outcome = self
                    .encode_once(prepared, script, output, EncoderChoice::Software, progress, cancel)
                    .await
                    .map_err(MontageError::from_encode)?;
                Ok((outcome, EncoderChoice::Software, true))
            }
            Err(err) => Err(MontageError::from_encode(err)),
        }
    }

    async fn encode_once(
        &self,
        prepared: &PreparedMontage,
        script: &Path,
        output: &Path,
        encoder: EncoderChoice,
        progress: &dyn ProgressCallback,
        cancel: watch::Receiver<bool>,
    ) -> Result<EncodeOutcome, DomainError> {
        let request = EncodeRequest {
            args: self.command(prepared, script, output, encoder).build_args(),
            expected_duration: prepared.plan.total_duration(),
            timeout: self.config.encode_timeout,
        };
        info!(encoder = %encoder, inputs = prepared.built.inputs.len(), "Encoding montage");
        let started = Instant::now();
        let outcome = self.encode_port.encode(&request, progress, cancel).await?;
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, "Encoder finished");
        Ok(outcome)
    }

    fn write_debug_log(&self, path: &Path, prepared: &PreparedMontage, filter_complex: &str) -> MontageResult<()> {
        let sources: Vec<String> = prepared.sources.iter().map(|s| s.path.display().to_string()).collect();
        let contents = format!(
            "# {}\n{}\n\n{}\n",
            sources.join(", "),
            filter_complex,
            prepared.built.graph.debug_dump()
        );
        std::fs::write(path, contents)?;
        info!(path = %path.display(), "Filter graph written to debug log");
        Ok(())
    }
}

fn check_cancelled(cancel: &watch::Receiver<bool>) -> MontageResult<()> {
    if *cancel.borrow() {
        info!("Cancellation requested, stopping before the next stage");
        return Err(MontageError::Cancelled {
            reason: "cancelled by user".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::NoOpProgressCallback;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FakeProbe {
        reports: HashMap<PathBuf, ProbeReport>,
    }

    #[async_trait]
    impl ProbePort for FakeProbe {
        async fn probe(&self, path: &Path) -> Result<ProbeReport, DomainError> {
            self.reports
                .get(path)
                .cloned()
                .ok_or_else(|| DomainError::FileNotFound(path.display().to_string()))
        }
    }

    struct FakeAudio;

    #[async_trait]
    impl AudioPort for FakeAudio {
        async fn decode_mono(
            &self,
            _path: &Path,
            sample_rate: u32,
            sink: &mut PcmSink<'_>,
            _cancel: watch::Receiver<bool>,
        ) -> Result<u64, DomainError> {
            // 120 s of audio, loud between 40 s and 60 s
            let mut total = 0u64;
            for second in 0..120u32 {
                let level = if (40..60).contains(&second) { 0.9 } else { 0.1 };
                let chunk = vec![level; sample_rate as usize];
                sink(&chunk);
                total += chunk.len() as u64;
            }
            Ok(total)
        }
    }

    /// Decoder that runs until cancelled
    struct StalledAudio;

    #[async_trait]
    impl AudioPort for StalledAudio {
        async fn decode_mono(
            &self,
            _path: &Path,
            _sample_rate: u32,
            _sink: &mut PcmSink<'_>,
            mut cancel: watch::Receiver<bool>,
        ) -> Result<u64, DomainError> {
            tokio::select! {
                _ = cancel.changed() => {
                    Err(DomainError::Cancelled("cancelled by user".to_string()))
                }
                _ = tokio::time::sleep(Duration::from_secs(30)) => Ok(0),
            }
        }
    }

    /// Decoder that finishes normally while an interrupt arrives
    struct InterruptedAudio {
        interrupt: watch::Sender<bool>,
    }

    #[async_trait]
    impl AudioPort for InterruptedAudio {
        async fn decode_mono(
            &self,
            path: &Path,
            sample_rate: u32,
            sink: &mut PcmSink<'_>,
            cancel: watch::Receiver<bool>,
        ) -> Result<u64, DomainError> {
            let _ = self.interrupt.send(true);
            FakeAudio.decode_mono(path, sample_rate, sink, cancel).await
        }
    }

    #[derive(Default)]
    struct FakeEncoder {
        fail_codecs: Vec<&'static str>,
        /// Interrupt arrives while the encoder runs
        interrupted: bool,
        calls: Mutex<Vec<Vec<String>>>,
    }

    #[async_trait]
    impl EncodePort for FakeEncoder {
        async fn encode(
            &self,
            request: &EncodeRequest,
            _progress: &dyn ProgressCallback,
            cancel: watch::Receiver<bool>,
        ) -> Result<EncodeOutcome, DomainError> {
            self.calls.lock().unwrap().push(request.args.clone());
            if self.interrupted || *cancel.borrow() {
                return Err(DomainError::Cancelled("cancelled by user".to_string()));
            }
            if self.fail_codecs.iter().any(|c| request.args.iter().any(|a| a == c)) {
                return Err(DomainError::ExternalFailure {
                    exit_code: Some(1),
                    diagnostics: "Error initializing output stream 0:0".to_string(),
                });
            }
            Ok(EncodeOutcome {
                elapsed: Duration::from_millis(5),
                diagnostics: Vec::new(),
            })
        }

        async fn list_encoders(&self) -> Result<String, DomainError> {
            Ok(String::new())
        }

        async fn engine_version(&self) -> Result<String, DomainError> {
            Ok("ffmpeg version 7.1".to_string())
        }
    }

    fn video(path: &str, duration: f64, has_audio: bool) -> ProbeReport {
        ProbeReport {
            path: path.into(),
            duration: Some(duration),
            width: Some(1920),
            height: Some(1080),
            has_video: true,
            has_audio,
            is_still_image: false,
            format_name: "mov,mp4".to_string(),
        }
    }

    fn still(path: &str) -> ProbeReport {
        ProbeReport {
            path: path.into(),
            duration: None,
            width: Some(600),
            height: Some(200),
            has_video: true,
            has_audio: false,
            is_still_image: true,
            format_name: "png_pipe".to_string(),
        }
    }

    fn reports() -> HashMap<PathBuf, ProbeReport> {
        HashMap::from([
            (PathBuf::from("talk.mp4"), video("talk.mp4", 120.0, true)),
            (PathBuf::from("broll.mp4"), video("broll.mp4", 240.0, false)),
            (PathBuf::from("clip_a.mp4"), video("clip_a.mp4", 45.0, true)),
            (PathBuf::from("clip_b.mp4"), video("clip_b.mp4", 50.0, true)),
            (PathBuf::from("teaser.mp4"), video("teaser.mp4", 20.0, true)),
            (PathBuf::from("logo.png"), still("logo.png")),
        ])
    }

    fn config(work_dir: &Path) -> MontageConfig {
        MontageConfig {
            work_dir: Some(work_dir.to_path_buf()),
            seed: Some(3),
            ..MontageConfig::default()
        }
    }

    fn interactor(encoder: EncoderChoice, fake: Arc<FakeEncoder>, work_dir: &Path) -> MontageInteractor {
        with_audio(Arc::new(FakeAudio), encoder, fake, work_dir)
    }

    fn with_audio(
        audio: Arc<dyn AudioPort>,
        encoder: EncoderChoice,
        fake: Arc<FakeEncoder>,
        work_dir: &Path,
    ) -> MontageInteractor {
        MontageInteractor::new(
            Arc::new(FakeProbe { reports: reports() }),
            audio,
            fake,
            config(work_dir),
            encoder,
        )
    }

    fn running() -> watch::Receiver<bool> {
        watch::channel(false).1
    }

    fn request(total: f64) -> MontageRequest {
        let mut spec = OutputSpec::new("out.mp4", TargetFormat::InstagramReel, total);
        spec.segment_duration = 5.0;
        spec.bucket = SegmentBucket::Few;
        spec.logo = Some(LogoSpec {
            path: "logo.png".into(),
            width_fraction: 0.3,
            position: 0.2,
        });
        MontageRequest {
            sources: vec!["talk.mp4".into()],
            spec,
        }
    }

    #[tokio::test]
    async fn test_pipeline_reaches_done() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeEncoder::default());
        let montage = interactor(EncoderChoice::Software, fake.clone(), dir.path());
        let (_tx, rx) = watch::channel(false);
        let mut run = MontageRun::new();

        let report = montage
            .execute_tracked(&request(20.0), &NoOpProgressCallback, rx, &mut run)
            .await
            .unwrap();

        assert_eq!(
            run.history(),
            &[
                MontageState::Idle,
                MontageState::Probed,
                MontageState::Analyzed,
                MontageState::Selected,
                MontageState::Planned,
                MontageState::GraphBuilt,
                MontageState::Encoding,
                MontageState::Done,
            ]
        );
        assert_eq!(report.segments.iter().map(|s| s.duration_ms).sum::<u64>(), 20_000);
        assert!(report.segments.iter().any(|s| s.start_ms >= 35_000 && s.start_ms < 60_000));
        assert!(!report.fell_back);
        assert_eq!(fake.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_hardware_failure_falls_back_to_software() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeEncoder {
            fail_codecs: vec!["h264_nvenc"],
            ..FakeEncoder::default()
        });
        let montage = interactor(EncoderChoice::Nvenc, fake.clone(), dir.path());
        let (_tx, rx) = watch::channel(false);

        let report = montage.execute(&request(20.0), &NoOpProgressCallback, rx).await.unwrap();
        assert!(report.fell_back);
        assert_eq!(report.encoder, EncoderChoice::Software);
        let calls = fake.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert!(calls[1].iter().any(|a| a == "libx264"));
    }

    #[tokio::test]
    async fn test_software_failure_surfaces_diagnostics() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeEncoder {
            fail_codecs: vec!["libx264"],
            ..FakeEncoder::default()
        });
        let montage = interactor(EncoderChoice::Software, fake, dir.path());
        let (_tx, rx) = watch::channel(false);
        let mut run = MontageRun::new();

        let err = montage
            .execute_tracked(&request(20.0), &NoOpProgressCallback, rx, &mut run)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encode);
        match run.state() {
            MontageState::Failed { kind, message } => {
                assert_eq!(*kind, ErrorKind::Encode);
                assert!(message.contains("Error initializing output stream 0:0"));
            }
            other => panic!("expected failed state, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancellation_is_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeEncoder {
            interrupted: true,
            ..FakeEncoder::default()
        });
        let montage = interactor(EncoderChoice::Nvenc, fake.clone(), dir.path());

        let err = montage
            .execute(&request(20.0), &NoOpProgressCallback, running())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert_eq!(fake.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_never_encodes() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeEncoder::default());
        let montage = interactor(EncoderChoice::Software, fake.clone(), dir.path());
        let (_tx, rx) = watch::channel(true);

        let mut run = MontageRun::new();
        let err = montage
            .execute_tracked(&request(20.0), &NoOpProgressCallback, rx, &mut run)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert!(fake.calls.lock().unwrap().is_empty());
        assert!(!run.history().contains(&MontageState::Probed));
    }

    #[tokio::test]
    async fn test_total_longer_than_source_is_plan_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut request = request(60.0);
        request.spec.total_duration = 90.0;
        let reports = HashMap::from([(PathBuf::from("talk.mp4"), video("talk.mp4", 45.0, true))]);
        request.spec.logo = None;
        let montage = MontageInteractor::new(
            Arc::new(FakeProbe { reports }),
            Arc::new(FakeAudio),
            Arc::new(FakeEncoder::default()),
            MontageConfig {
                work_dir: Some(dir.path().to_path_buf()),
                ..MontageConfig::default()
            },
            EncoderChoice::Software,
        );
        let err = montage.plan(&request, running()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Plan);
    }

    #[tokio::test]
    async fn test_missing_source_is_probe_error() {
        let dir = tempfile::tempdir().unwrap();
        let montage = interactor(EncoderChoice::Software, Arc::new(FakeEncoder::default()), dir.path());
        let mut request = request(20.0);
        request.sources = vec!["missing.mp4".into()];
        let err = montage.plan(&request, running()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Probe);
    }

    #[tokio::test]
    async fn test_dry_run_previews_command() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeEncoder::default());
        let montage = interactor(EncoderChoice::Software, fake.clone(), dir.path());

        let preview = montage.plan(&request(20.0), running()).await.unwrap();
        assert!(preview.filter_complex.contains("[vout]"));
        assert!(preview.command.iter().any(|a| a == FILTER_SCRIPT_NAME));
        assert!(preview.command.iter().any(|a| a == "-filter_complex_script"));
        assert!(preview.debug_dump.contains("logo overlay"));
        assert!(fake.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_known_engine_release_uses_option_file_syntax() {
        let dir = tempfile::tempdir().unwrap();
        let montage = interactor(EncoderChoice::Software, Arc::new(FakeEncoder::default()), dir.path())
            .with_engine_version(Some(EngineVersion { major: 7, minor: 1 }));

        let preview = montage.plan(&request(20.0), running()).await.unwrap();
        let flag = preview.command.iter().position(|a| a == "-/filter_complex").unwrap();
        assert_eq!(preview.command[flag + 1], FILTER_SCRIPT_NAME);
    }

    #[tokio::test]
    async fn test_cancel_during_analysis_stops_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeEncoder::default());
        let montage = with_audio(Arc::new(StalledAudio), EncoderChoice::Software, fake.clone(), dir.path());
        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let _ = tx.send(true);
        });

        let started = Instant::now();
        let mut run = MontageRun::new();
        let err = montage
            .execute_tracked(&request(20.0), &NoOpProgressCallback, rx, &mut run)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(fake.calls.lock().unwrap().is_empty());
        assert!(!run.history().contains(&MontageState::Analyzed));
        assert!(!run.history().contains(&MontageState::Encoding));
        assert!(matches!(
            run.state(),
            MontageState::Failed {
                kind: ErrorKind::Cancelled,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_interrupt_between_stages_skips_selection() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeEncoder::default());
        let (tx, rx) = watch::channel(false);
        let montage = with_audio(
            Arc::new(InterruptedAudio { interrupt: tx }),
            EncoderChoice::Software,
            fake.clone(),
            dir.path(),
        );

        let mut run = MontageRun::new();
        let err = montage
            .execute_tracked(&request(20.0), &NoOpProgressCallback, rx, &mut run)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert!(run.history().contains(&MontageState::Analyzed));
        assert!(!run.history().contains(&MontageState::Selected));
        assert!(fake.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_segments_drawn_from_every_source() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeEncoder::default());
        let montage = interactor(EncoderChoice::Software, fake.clone(), dir.path());
        let mut request = request(30.0);
        request.sources = vec!["talk.mp4".into(), "broll.mp4".into()];

        let report = montage
            .execute(&request, &NoOpProgressCallback, running())
            .await
            .unwrap();

        assert_eq!(report.segments.iter().map(|s| s.duration_ms).sum::<u64>(), 30_000);
        for source in ["talk.mp4", "broll.mp4"] {
            assert!(report.segments.iter().any(|s| s.source == Path::new(source)));
        }
        let args = &fake.calls.lock().unwrap()[0];
        assert!(args.iter().any(|a| a == "talk.mp4"));
        assert!(args.iter().any(|a| a == "broll.mp4"));
    }

    #[tokio::test]
    async fn test_two_short_sources_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let montage = interactor(EncoderChoice::Software, Arc::new(FakeEncoder::default()), dir.path());
        let mut request = request(20.0);
        request.sources = vec!["clip_a.mp4".into(), "clip_b.mp4".into()];

        let err = montage.plan(&request, running()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.to_string().contains("At least 3 short videos are required"));
    }

    #[tokio::test]
    async fn test_strict_duration_rejects_uncategorized_source() {
        let dir = tempfile::tempdir().unwrap();
        let mut request = request(10.0);
        request.sources = vec!["teaser.mp4".into()];

        let lenient = interactor(EncoderChoice::Software, Arc::new(FakeEncoder::default()), dir.path());
        assert!(lenient.plan(&request, running()).await.is_ok());

        let strict = MontageInteractor::new(
            Arc::new(FakeProbe { reports: reports() }),
            Arc::new(FakeAudio),
            Arc::new(FakeEncoder::default()),
            MontageConfig {
                strict_duration: true,
                ..config(dir.path())
            },
            EncoderChoice::Software,
        );
        let err = strict.plan(&request, running()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.to_string().contains("Acceptable ranges: 30-3600 seconds"));
    }
}
