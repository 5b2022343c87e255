use std::{collections::VecDeque, f32::consts::PI, fmt, sync::Arc};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};

use crate::{AnalyserSource, FftSize};

const DEFAULT_MIN_DECIBELS: f32 = -100.0;
const DEFAULT_MAX_DECIBELS: f32 = -30.0;
const DEFAULT_SMOOTHING: f32 = 0.8;
const BLACKMAN_ALPHA: f32 = 0.16;

/// FFT analyser with the byte output conventions of a browser analyser node.
///
/// Samples are pushed in as they are produced and only the most recent
/// window is kept. Frequency snapshots are Blackman-windowed, smoothed over
/// time and mapped from `[min_decibels, max_decibels]` onto `0..=255`.
pub struct FftAnalyser {
    sample_rate: f32,
    fft_size: FftSize,
    min_decibels: f32,
    max_decibels: f32,
    smoothing: f32,
    history: VecDeque<f32>,
    smoothed: Vec<f32>,
    fft_planner: RealFftPlanner<f32>,
    fft: Option<FftResources>,
}

impl FftAnalyser {
    pub fn new(sample_rate: f32) -> Self {
        let fft_size = FftSize::S2048;
        Self {
            sample_rate,
            fft_size,
            min_decibels: DEFAULT_MIN_DECIBELS,
            max_decibels: DEFAULT_MAX_DECIBELS,
            smoothing: DEFAULT_SMOOTHING,
            history: VecDeque::with_capacity(FftSize::S32768.window_size()),
            smoothed: vec![0.0; fft_size.bin_count()],
            fft_planner: RealFftPlanner::new(),
            fft: None,
        }
    }

    /// Sets the decibel range mapped onto the byte scale. Ignored unless
    /// `min < max`.
    pub fn set_decibel_range(&mut self, min: f32, max: f32) {
        if min < max {
            self.min_decibels = min;
            self.max_decibels = max;
        }
    }

    /// Sets the smoothing time constant, clamped to `0.0..=1.0`.
    pub fn set_smoothing(&mut self, smoothing: f32) {
        self.smoothing = smoothing.clamp(0.0, 1.0);
    }

    /// Appends samples, keeping at most the largest possible window.
    pub fn push_samples(&mut self, samples: &[f32]) {
        let capacity = FftSize::S32768.window_size();
        let skip = samples.len().saturating_sub(capacity);
        for &sample in &samples[skip..] {
            if self.history.len() == capacity {
                self.history.pop_front();
            }
            self.history.push_back(sample);
        }
    }

    pub fn buffered_samples(&self) -> usize {
        self.history.len()
    }

    /// Copies the latest window into `out`, zero padding the front when
    /// fewer samples have been seen.
    fn latest_window(&self, out: &mut [f32]) {
        let len = out.len();
        let available = self.history.len().min(len);
        let pad = len - available;
        out[..pad].fill(0.0);
        for (slot, sample) in out[pad..]
            .iter_mut()
            .zip(self.history.iter().skip(self.history.len() - available))
        {
            *slot = *sample;
        }
    }

    fn update_spectrum(&mut self) {
        let size = self.fft_size.window_size();
        let bins = self.fft_size.bin_count();
        let mut window = vec![0.0; size];
        self.latest_window(&mut window);

        let fft = prepare_fft(&mut self.fft, &mut self.fft_planner, size);
        for (index, (slot, sample)) in fft.input.iter_mut().zip(&window).enumerate() {
            *slot = sample * blackman_value(index, size);
        }

        if fft
            .plan
            .process_with_scratch(&mut fft.input, &mut fft.spectrum, &mut fft.scratch)
            .is_err()
        {
            tracing::warn!(size, "fft failed, keeping previous spectrum");
            return;
        }

        if self.smoothed.len() != bins {
            self.smoothed = vec![0.0; bins];
        }

        let scale = 1.0 / size as f32;
        let smoothing = self.smoothing;
        for (smoothed, bin) in self.smoothed.iter_mut().zip(&fft.spectrum) {
            let magnitude = bin.norm() * scale;
            *smoothed = smoothing * *smoothed + (1.0 - smoothing) * magnitude;
        }
    }

    fn to_byte(&self, magnitude: f32) -> u8 {
        if magnitude <= 0.0 {
            return 0;
        }
        let decibels = 20.0 * magnitude.log10();
        let range = self.max_decibels - self.min_decibels;
        let scaled = 255.0 * (decibels - self.min_decibels) / range;
        scaled.clamp(0.0, 255.0) as u8
    }
}

impl AnalyserSource for FftAnalyser {
    fn fft_size(&self) -> FftSize {
        self.fft_size
    }

    fn set_fft_size(&mut self, size: FftSize) {
        if size != self.fft_size {
            self.fft_size = size;
            self.smoothed = vec![0.0; size.bin_count()];
        }
    }

    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn byte_frequency_data(&mut self, out: &mut [u8]) {
        self.update_spectrum();
        let count = out.len().min(self.smoothed.len());
        for (slot, magnitude) in out[..count].iter_mut().zip(&self.smoothed) {
            *slot = self.to_byte(*magnitude);
        }
        out[count..].fill(0);
    }

    fn byte_time_domain_data(&mut self, out: &mut [u8]) {
        let mut window = vec![0.0; out.len()];
        self.latest_window(&mut window);
        for (slot, sample) in out.iter_mut().zip(window) {
            *slot = (128.0 * (1.0 + sample)).clamp(0.0, 255.0) as u8;
        }
    }
}

struct FftResources {
    size: usize,
    plan: Arc<dyn RealToComplex<f32>>,
    scratch: Vec<Complex32>,
    spectrum: Vec<Complex32>,
    input: Vec<f32>,
}

impl fmt::Debug for FftAnalyser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FftAnalyser")
            .field("sample_rate", &self.sample_rate)
            .field("fft_size", &self.fft_size)
            .field("min_decibels", &self.min_decibels)
            .field("max_decibels", &self.max_decibels)
            .field("smoothing", &self.smoothing)
            .field("history", &self.history.len())
            .finish()
    }
}

impl fmt::Debug for FftResources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FftResources")
            .field("size", &self.size)
            .finish()
    }
}

fn prepare_fft<'a>(
    slot: &'a mut Option<FftResources>,
    planner: &mut RealFftPlanner<f32>,
    size: usize,
) -> &'a mut FftResources {
    let resources = slot.take().filter(|fft| fft.size == size).unwrap_or_else(|| {
        let plan = planner.plan_fft_forward(size);
        FftResources {
            size,
            scratch: plan.make_scratch_vec(),
            spectrum: plan.make_output_vec(),
            input: plan.make_input_vec(),
            plan,
        }
    });
    slot.insert(resources)
}

fn blackman_value(index: usize, len: usize) -> f32 {
    if len <= 1 {
        return 1.0;
    }

    let a0 = 0.5 * (1.0 - BLACKMAN_ALPHA);
    let a1 = 0.5;
    let a2 = 0.5 * BLACKMAN_ALPHA;
    let phase = 2.0 * PI * index as f32 / len as f32;
    a0 - a1 * phase.cos() + a2 * (2.0 * phase).cos()
}
