use std::cell::RefCell;
use std::f32::consts::PI;
use std::fmt;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};

use crate::{FftAnalyser, Result, VisualiserError};

/// Sample rate used when nothing else is specified.
pub const DEFAULT_SAMPLE_RATE: f32 = 44_100.0;

/// Transform sizes an analyser accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum FftSize {
    S16,
    S32,
    S64,
    S128,
    S256,
    S512,
    S1024,
    S2048,
    S4096,
    S8192,
    S16384,
    S32768,
}

impl FftSize {
    pub const ALL: [FftSize; 12] = [
        FftSize::S16,
        FftSize::S32,
        FftSize::S64,
        FftSize::S128,
        FftSize::S256,
        FftSize::S512,
        FftSize::S1024,
        FftSize::S2048,
        FftSize::S4096,
        FftSize::S8192,
        FftSize::S16384,
        FftSize::S32768,
    ];

    /// Number of samples in the analysis window.
    pub fn window_size(self) -> usize {
        16 << (self as usize)
    }

    /// Number of frequency bins, half the window.
    pub fn bin_count(self) -> usize {
        self.window_size() / 2
    }
}

impl TryFrom<u32> for FftSize {
    type Error = VisualiserError;

    fn try_from(value: u32) -> Result<Self> {
        FftSize::ALL
            .into_iter()
            .find(|size| size.window_size() as u32 == value)
            .ok_or(VisualiserError::InvalidFftSize(value))
    }
}

impl From<FftSize> for u32 {
    fn from(value: FftSize) -> Self {
        value.window_size() as u32
    }
}

impl fmt::Display for FftSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.window_size())
    }
}

/// An audio analysis node the visualiser pulls snapshots from.
///
/// Implementations are owned by the caller and shared with the visualiser,
/// which only ever borrows them for the duration of a frame.
pub trait AnalyserSource {
    fn fft_size(&self) -> FftSize;

    fn set_fft_size(&mut self, size: FftSize);

    fn frequency_bin_count(&self) -> usize {
        self.fft_size().bin_count()
    }

    fn sample_rate(&self) -> f32;

    /// Fills `out` with byte magnitudes, one per bin, up to `out.len()`.
    fn byte_frequency_data(&mut self, out: &mut [u8]);

    /// Fills `out` with byte waveform samples centred at 128.
    fn byte_time_domain_data(&mut self, out: &mut [u8]);
}

/// Shared handle to any analyser.
pub type SharedAnalyser = Rc<RefCell<dyn AnalyserSource>>;

/// Analyser that replays byte snapshots handed to it.
///
/// Snapshots shorter than the requested buffer are padded with silence
/// (0 for frequency data, 128 for time-domain data).
#[derive(Debug, Clone)]
pub struct SnapshotAnalyser {
    fft_size: FftSize,
    sample_rate: f32,
    frequency: Vec<u8>,
    time_domain: Vec<u8>,
}

impl SnapshotAnalyser {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            fft_size: FftSize::S2048,
            sample_rate,
            frequency: Vec::new(),
            time_domain: Vec::new(),
        }
    }

    pub fn set_frequency_data(&mut self, data: impl Into<Vec<u8>>) {
        self.frequency = data.into();
    }

    pub fn set_time_domain_data(&mut self, data: impl Into<Vec<u8>>) {
        self.time_domain = data.into();
    }

    /// Fills the frequency snapshot with `value` in every bin, whatever
    /// transform size is requested later.
    pub fn fill_frequency(&mut self, value: u8) {
        self.frequency = vec![value; FftSize::S32768.bin_count()];
    }

    /// Fills the time-domain snapshot with `value` in every sample, whatever
    /// transform size is requested later.
    pub fn fill_time_domain(&mut self, value: u8) {
        self.time_domain = vec![value; FftSize::S32768.window_size()];
    }
}

impl Default for SnapshotAnalyser {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}

impl AnalyserSource for SnapshotAnalyser {
    fn fft_size(&self) -> FftSize {
        self.fft_size
    }

    fn set_fft_size(&mut self, size: FftSize) {
        self.fft_size = size;
    }

    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn byte_frequency_data(&mut self, out: &mut [u8]) {
        copy_padded(&self.frequency, out, 0);
    }

    fn byte_time_domain_data(&mut self, out: &mut [u8]) {
        copy_padded(&self.time_domain, out, 128);
    }
}

fn copy_padded(src: &[u8], out: &mut [u8], pad: u8) {
    let count = src.len().min(out.len());
    out[..count].copy_from_slice(&src[..count]);
    out[count..].fill(pad);
}

/// Anything that can produce mono samples in `[-1, 1]`.
pub trait SampleSource {
    /// Writes up to `out.len()` samples and returns how many were written.
    /// Returning fewer signals the source has run dry.
    fn read(&mut self, out: &mut [f32]) -> usize;
}

/// Endless sine wave.
#[derive(Debug, Clone)]
pub struct ToneSource {
    frequency: f32,
    amplitude: f32,
    sample_rate: f32,
    phase: f32,
}

impl ToneSource {
    pub fn new(frequency: f32, amplitude: f32, sample_rate: f32) -> Self {
        Self {
            frequency,
            amplitude: amplitude.clamp(0.0, 1.0),
            sample_rate,
            phase: 0.0,
        }
    }
}

impl SampleSource for ToneSource {
    fn read(&mut self, out: &mut [f32]) -> usize {
        let increment = self.frequency / self.sample_rate;
        for sample in out.iter_mut() {
            *sample = self.amplitude * (2.0 * PI * self.phase).sin();
            self.phase = (self.phase + increment).fract();
        }
        out.len()
    }
}

/// Owns the sample rate of a signal graph, creates analysers on it and mixes
/// connected sources into every analyser it has created.
pub struct AnalysisContext {
    sample_rate: f32,
    analysers: Vec<Weak<RefCell<FftAnalyser>>>,
    sources: Vec<Box<dyn SampleSource>>,
    mix: Vec<f32>,
    scratch: Vec<f32>,
}

impl AnalysisContext {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            analysers: Vec::new(),
            sources: Vec::new(),
            mix: Vec::new(),
            scratch: Vec::new(),
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Creates an analyser that receives everything this context plays.
    ///
    /// The context keeps only a weak reference; dropping every handle
    /// disconnects the analyser.
    pub fn create_analyser(&mut self) -> Rc<RefCell<FftAnalyser>> {
        let analyser = Rc::new(RefCell::new(FftAnalyser::new(self.sample_rate)));
        self.analysers.push(Rc::downgrade(&analyser));
        analyser
    }

    /// Connects a source whose output is mixed into every analyser.
    pub fn connect(&mut self, source: impl SampleSource + 'static) {
        self.sources.push(Box::new(source));
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn analyser_count(&self) -> usize {
        self.analysers
            .iter()
            .filter(|analyser| analyser.strong_count() > 0)
            .count()
    }

    /// Pulls `frames` samples from every connected source, sums them and
    /// feeds the mix to the analysers. Sources that run dry are disconnected.
    pub fn pump(&mut self, frames: usize) {
        if frames == 0 {
            return;
        }

        self.mix.clear();
        self.mix.resize(frames, 0.0);
        self.scratch.resize(frames, 0.0);

        let mix = &mut self.mix;
        let scratch = &mut self.scratch;
        self.sources.retain_mut(|source| {
            let written = source.read(&mut scratch[..frames]);
            for (out, sample) in mix.iter_mut().zip(&scratch[..written]) {
                *out += *sample;
            }
            written == frames
        });

        for sample in self.mix.iter_mut() {
            *sample = sample.clamp(-1.0, 1.0);
        }

        let mix = std::mem::take(&mut self.mix);
        self.push_samples(&mix);
        self.mix = mix;
    }

    /// Feeds samples straight to every live analyser.
    pub fn push_samples(&mut self, samples: &[f32]) {
        if samples.is_empty() {
            return;
        }

        self.analysers.retain(|analyser| match analyser.upgrade() {
            Some(analyser) => {
                analyser.borrow_mut().push_samples(samples);
                true
            }
            None => false,
        });
    }
}

impl Default for AnalysisContext {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}

impl fmt::Debug for AnalysisContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisContext")
            .field("sample_rate", &self.sample_rate)
            .field("analysers", &self.analysers.len())
            .field("sources", &self.sources.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Finite(usize);

    impl SampleSource for Finite {
        fn read(&mut self, out: &mut [f32]) -> usize {
            let n = self.0.min(out.len());
            out[..n].fill(0.5);
            self.0 -= n;
            n
        }
    }

    #[test]
    fn fft_size_accepts_only_powers_of_two() {
        assert_eq!(FftSize::try_from(2048).unwrap(), FftSize::S2048);
        assert_eq!(FftSize::S16.window_size(), 16);
        assert_eq!(FftSize::S32768.window_size(), 32768);
        assert!(matches!(
            FftSize::try_from(1000),
            Err(VisualiserError::InvalidFftSize(1000))
        ));
        assert!(FftSize::try_from(65536).is_err());
    }

    #[test]
    fn fft_size_deserialises_from_number() {
        let size: FftSize = serde_json::from_str("512").unwrap();
        assert_eq!(size, FftSize::S512);
        assert!(serde_json::from_str::<FftSize>("500").is_err());
        assert_eq!(serde_json::to_string(&FftSize::S64).unwrap(), "64");
    }

    #[test]
    fn snapshot_pads_short_buffers() {
        let mut analyser = SnapshotAnalyser::default();
        analyser.set_time_domain_data(vec![10, 20]);
        let mut out = [0u8; 4];
        analyser.byte_time_domain_data(&mut out);
        assert_eq!(out, [10, 20, 128, 128]);
    }

    #[test]
    fn context_drops_released_analysers() {
        let mut context = AnalysisContext::new(8_000.0);
        let kept = context.create_analyser();
        drop(context.create_analyser());
        context.push_samples(&[0.25; 16]);
        assert_eq!(context.analyser_count(), 1);
        assert_eq!(kept.borrow().buffered_samples(), 16);
    }

    #[test]
    fn pump_disconnects_dry_sources() {
        let mut context = AnalysisContext::new(8_000.0);
        let _analyser = context.create_analyser();
        context.connect(Finite(10));
        context.connect(ToneSource::new(440.0, 0.5, 8_000.0));
        context.pump(8);
        assert_eq!(context.source_count(), 2);
        context.pump(8);
        assert_eq!(context.source_count(), 1);
    }
}
