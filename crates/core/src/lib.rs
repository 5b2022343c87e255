//! Core library for the canvas audio visualiser.
//!
//! Styles such as bar graphs and oscilloscopes are drawn onto a host-owned
//! 2D surface from analyser snapshots. The library never talks to a window
//! system directly: the host provides a [`Surface`], an analyser and a
//! [`FrameHost`] that drives the animation loop. Headless implementations of
//! each are included for tests and offline rendering.

pub mod analysis;
pub mod audio;
pub mod bands;
pub mod config;
pub mod error;
pub mod math;
pub mod render;
pub mod styles;
pub mod timeline;
pub mod visualiser;

pub use analysis::FftAnalyser;
pub use audio::{
    AnalyserSource, AnalysisContext, FftSize, SampleSource, SharedAnalyser, SnapshotAnalyser,
    ToneSource,
};
pub use config::{AspectRatio, FillColor, VisualiserConfig};
pub use error::{Result, VisualiserError};
pub use render::{
    ComputedStyle, ContainerBox, DrawContext, Fill, LinearGradient, PixelSurface,
    RecordingSurface, Surface, SurfaceSize,
};
pub use styles::{BarGraph, BlockGraph, FrequencyCurve, Oscilloscope, Style};
pub use timeline::{FrameHost, HeadlessHost, Wake, WakeHandler};
pub use visualiser::{CallbackKey, Frame, Visualiser, VisualiserEvent};
