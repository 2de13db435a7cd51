//! Rendering engine module
//!
//! Turns an effect plan into a filter graph and an encoder command line, and
//! tracks the encoder's progress while it runs.

pub mod builder;
pub mod command;
pub mod encoder;
pub mod graph;
pub mod progress;

pub use builder::{BuiltGraph, GraphBuilder, AUDIO_OUT, VIDEO_OUT};
pub use command::{EncodeCommand, EngineVersion, InputSpec};
pub use encoder::{EncoderChoice, HardwareAcceleration};
pub use graph::{Filter, FilterGraph, FilterStage, StreamRef};
pub use progress::{
    ConsoleProgressCallback, JsonProgressCallback, NoOpProgressCallback, ProgressCallback, ProgressParser,
    ProgressUpdate,
};
