//! End-to-end planning through the public API: select, plan, build and
//! assemble the encode command without running the engine.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use montagex_cli::app::container::{resolve_encoder, resolve_engine_version, AppContainer, DefaultAppContainer};
use montagex_cli::domain::model::*;
use montagex_cli::engine::{
    EncodeCommand, EncoderChoice, EngineVersion, GraphBuilder, HardwareAcceleration, ProgressCallback, VIDEO_OUT,
};
use montagex_cli::planner::{AuxiliaryAssets, EffectPlanner, SegmentSelector};
use montagex_cli::ports::*;
use montagex_cli::{DomainError, MontageConfig};

fn source(has_audio: bool) -> MediaAsset {
    MediaAsset::new("talk.mp4", MediaKind::Video, 300.0, 1920, 1080, has_audio).unwrap()
}

#[test]
fn test_silent_source_with_prefix() {
    let source = source(false);
    let profile = EnergyProfile::flat(source.duration, 1.0).unwrap();
    let selection = SegmentSelector::select(&profile, SegmentBucket::Few, 5.0, 30.0, &source).unwrap();
    assert_eq!(selection.segments.len(), 6);
    assert_eq!(selection.total_ms(), 30_000);
    assert!(selection.warning.is_none());

    let mut spec = OutputSpec::new("out.mp4", TargetFormat::Tiktok, 30.0);
    spec.thumbnail = Some(ThumbnailSpec {
        path: "cover.png".into(),
        duration: 2.0,
        scale_mode: ScaleMode::Fit,
    });
    spec.intro.video = Some(IntroVideoSpec {
        path: "intro.mp4".into(),
        max_length: 5.0,
    });
    let aux = AuxiliaryAssets {
        thumbnail: Some(MediaAsset::new("cover.png", MediaKind::Image, 0.0, 1280, 720, false).unwrap()),
        intro_video: Some(MediaAsset::new("intro.mp4", MediaKind::Video, 12.0, 1280, 720, true).unwrap()),
        ..AuxiliaryAssets::default()
    };

    let plan = EffectPlanner::new(30, Some(1))
        .plan(&selection.segments, std::slice::from_ref(&source), &spec, &aux)
        .unwrap();
    assert!((plan.total_duration() - 37.0).abs() < 1e-9);
    assert!(!plan.has_audio());

    let built = GraphBuilder::default().build(&plan).unwrap();
    assert_eq!(built.inputs.len(), 8);
    assert_eq!(built.inputs[7].duration, Some(5.0));
    assert!(built.graph.audio_out.is_none());
    let script = built.graph.to_filter_complex();
    assert!(script.contains("[pre0][pre1][seg0]"));
    assert!(script.contains("concat=n=8:v=1:a=0[base]"));
    assert!(script.ends_with("[vout]"));

    let args = EncodeCommand::new(built.inputs.clone(), "filter_graph.txt", "out.mp4")
        .map_video(VIDEO_OUT)
        .map_audio(built.graph.audio_out.clone())
        .encoder(EncoderChoice::Software)
        .fps(plan.fps)
        .duration(plan.total_duration())
        .build_args();
    assert!(args.iter().any(|a| a == "-filter_complex_script"));
    assert!(args.iter().any(|a| a == "libx264"));
    assert!(!args.iter().any(|a| a == "-c:a"));
    assert_eq!(args.last().map(String::as_str), Some("out.mp4"));
}

#[test]
fn test_seeded_random_pan_is_reproducible() {
    let source = source(true);
    let samples = (0..300)
        .map(|i| EnergySample {
            timestamp: i as f64,
            score: if (100..130).contains(&i) { 1.0 } else { 0.1 },
        })
        .collect();
    let profile = EnergyProfile::new(samples, 1.0, 300.0).unwrap();
    let selection = SegmentSelector::select(&profile, SegmentBucket::Some, 4.0, 40.0, &source).unwrap();

    let mut spec = OutputSpec::new("out.mp4", TargetFormat::InstagramSquare, 40.0);
    spec.pan.enabled = true;
    spec.pan.strategy = PanStrategy::Random;

    let plan = |seed| {
        EffectPlanner::new(30, Some(seed))
            .plan(&selection.segments, std::slice::from_ref(&source), &spec, &AuxiliaryAssets::default())
            .unwrap()
    };
    let first = plan(11);
    assert_eq!(first, plan(11));
    assert!(first.segments.iter().all(|s| s.motion.is_some()));

    let built = GraphBuilder::default().build(&first).unwrap();
    assert!(built.graph.to_filter_complex().contains("zoompan="));
    assert_eq!(built.graph.audio_out.as_deref(), Some("aout"));
}

struct ListingEncoder {
    listing: &'static str,
    banner: &'static str,
    calls: AtomicUsize,
}

#[async_trait]
impl EncodePort for ListingEncoder {
    async fn encode(
        &self,
        _request: &EncodeRequest,
        _progress: &dyn ProgressCallback,
        _cancel: watch::Receiver<bool>,
    ) -> Result<EncodeOutcome, DomainError> {
        Err(DomainError::InternalError("not used".to_string()))
    }

    async fn list_encoders(&self) -> Result<String, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.listing.to_string())
    }

    async fn engine_version(&self) -> Result<String, DomainError> {
        Ok(self.banner.to_string())
    }
}

struct NoProbe;

#[async_trait]
impl ProbePort for NoProbe {
    async fn probe(&self, path: &Path) -> Result<ProbeReport, DomainError> {
        Err(DomainError::FileNotFound(path.display().to_string()))
    }
}

struct NoAudio;

#[async_trait]
impl AudioPort for NoAudio {
    async fn decode_mono(
        &self,
        _path: &Path,
        _sample_rate: u32,
        _sink: &mut PcmSink<'_>,
        _cancel: watch::Receiver<bool>,
    ) -> Result<u64, DomainError> {
        Ok(0)
    }
}

#[tokio::test]
async fn test_encoder_resolution() {
    let port = ListingEncoder {
        listing: " V....D libx264  H.264\n V....D h264_nvenc  NVIDIA NVENC H.264 encoder\n",
        banner: "",
        calls: AtomicUsize::new(0),
    };
    assert_eq!(resolve_encoder(&port, HardwareAcceleration::Off).await, EncoderChoice::Software);
    assert_eq!(port.calls.load(Ordering::SeqCst), 0);
    assert_eq!(resolve_encoder(&port, HardwareAcceleration::Auto).await, EncoderChoice::Nvenc);
    assert_eq!(port.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_container_wires_interactors() {
    let encode_port = Arc::new(ListingEncoder {
        listing: "",
        banner: "",
        calls: AtomicUsize::new(0),
    });
    let container = DefaultAppContainer::with_ports(
        Arc::new(NoProbe),
        Arc::new(NoAudio),
        encode_port,
        MontageConfig::default(),
        EncoderChoice::Software,
        None,
    );
    assert_eq!(container.montage_interactor().encoder(), EncoderChoice::Software);

    let err = container
        .inspect_interactor()
        .inspect(Path::new("missing.mp4"), 3, watch::channel(false).1)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), montagex_cli::ErrorKind::Probe);
}

#[tokio::test]
async fn test_engine_version_resolution() {
    let release = ListingEncoder {
        listing: "",
        banner: "ffmpeg version n7.0.2 Copyright (c) 2000-2024 the FFmpeg developers\nbuilt with gcc 13\n",
        calls: AtomicUsize::new(0),
    };
    assert_eq!(
        resolve_engine_version(&release).await,
        Some(EngineVersion { major: 7, minor: 0 })
    );

    let snapshot = ListingEncoder {
        listing: "",
        banner: "ffmpeg version N-113110-g6b5c4b2 Copyright (c) 2000-2024\n",
        calls: AtomicUsize::new(0),
    };
    assert_eq!(resolve_engine_version(&snapshot).await, None);
}
