// Adapters - External system implementations

pub mod audio_ffmpeg;
pub mod exec_ffmpeg;
pub mod probe_ffprobe;
pub mod toml_config;

// Re-export adapters
pub use audio_ffmpeg::FFmpegAudioAdapter;
pub use exec_ffmpeg::FFmpegAdapter;
pub use probe_ffprobe::FFprobeAdapter;
pub use toml_config::TomlConfigAdapter;
