use std::sync::Arc;

use tracing::{info, warn};

use crate::adapters::{FFmpegAdapter, FFmpegAudioAdapter, FFprobeAdapter};
use crate::app::{inspect_interactor::InspectInteractor, montage_interactor::MontageInteractor};
use crate::config_initialization::MontageConfig;
use crate::engine::{EncoderChoice, EngineVersion, HardwareAcceleration};
use crate::ports::{AudioPort, EncodePort, ProbePort};

pub trait AppContainer: Send + Sync {
    fn montage_interactor(&self) -> Arc<MontageInteractor>;
    fn inspect_interactor(&self) -> Arc<InspectInteractor>;
}

pub struct DefaultAppContainer {
    montage_interactor: Arc<MontageInteractor>,
    inspect_interactor: Arc<InspectInteractor>,
    encoder: EncoderChoice,
}

impl DefaultAppContainer {
    /// Wire the engine adapters and resolve the encoder once
    pub async fn initialize(config: MontageConfig) -> Self {
        let probe_port: Arc<dyn ProbePort> = Arc::new(FFprobeAdapter::new(config.ffprobe.clone()));
        let audio_port: Arc<dyn AudioPort> = Arc::new(FFmpegAudioAdapter::new(config.ffmpeg.clone()));
        let encode_port: Arc<dyn EncodePort> = Arc::new(FFmpegAdapter::new(config.ffmpeg.clone()));

        let encoder = resolve_encoder(encode_port.as_ref(), config.hardware_acceleration).await;
        let version = resolve_engine_version(encode_port.as_ref()).await;
        Self::with_ports(probe_port, audio_port, encode_port, config, encoder, version)
    }

    /// Wire arbitrary port implementations
    pub fn with_ports(
        probe_port: Arc<dyn ProbePort>,
        audio_port: Arc<dyn AudioPort>,
        encode_port: Arc<dyn EncodePort>,
        config: MontageConfig,
        encoder: EncoderChoice,
        version: Option<EngineVersion>,
    ) -> Self {
        let inspect_interactor = Arc::new(InspectInteractor::new(
            Arc::clone(&probe_port),
            Arc::clone(&audio_port),
            config.sample_rate,
            config.analysis_window,
        ));
        let montage_interactor = Arc::new(
            MontageInteractor::new(probe_port, audio_port, encode_port, config, encoder).with_engine_version(version),
        );

        Self {
            montage_interactor,
            inspect_interactor,
            encoder,
        }
    }

    pub fn encoder(&self) -> EncoderChoice {
        self.encoder
    }
}

/// Capability detection: ask the engine which encoders it has
pub async fn resolve_encoder(port: &dyn EncodePort, preference: HardwareAcceleration) -> EncoderChoice {
    if preference == HardwareAcceleration::Off {
        info!("Hardware acceleration disabled, using software encoder");
        return EncoderChoice::Software;
    }
    match port.list_encoders().await {
        Ok(listing) => EncoderChoice::detect(&listing, std::env::consts::OS, preference),
        Err(e) => {
            warn!("Could not list encoders ({}), using software encoder", e);
            EncoderChoice::Software
        }
    }
}

/// Read the engine release so the command line can use its current option syntax
pub async fn resolve_engine_version(port: &dyn EncodePort) -> Option<EngineVersion> {
    match port.engine_version().await {
        Ok(banner) => {
            let version = EngineVersion::parse(&banner);
            match version {
                Some(v) => info!(version = %v, "Engine version detected"),
                None => warn!("Unrecognized engine version banner, using legacy options"),
            }
            version
        }
        Err(e) => {
            warn!("Could not read engine version ({}), using legacy options", e);
            None
        }
    }
}

impl AppContainer for DefaultAppContainer {
    fn montage_interactor(&self) -> Arc<MontageInteractor> {
        Arc::clone(&self.montage_interactor)
    }

    fn inspect_interactor(&self) -> Arc<InspectInteractor> {
        Arc::clone(&self.inspect_interactor)
    }
}
