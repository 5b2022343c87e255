use serde::{Deserialize, Serialize};

use super::{default_line_width, Style};
use crate::math::TIME_DOMAIN_CENTER;
use crate::visualiser::Frame;
use crate::FftSize;

/// The raw waveform as a single polyline, silence on the vertical centre.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Oscilloscope {
    #[serde(default = "default_line_width")]
    pub line_width: f64,
}

impl Default for Oscilloscope {
    fn default() -> Self {
        Self {
            line_width: default_line_width(),
        }
    }
}

impl Style for Oscilloscope {
    fn name(&self) -> &'static str {
        "oscilloscope"
    }

    fn preferred_fft_size(&self) -> FftSize {
        FftSize::S2048
    }

    fn draw(&mut self, frame: &mut Frame<'_>) -> bool {
        if !frame.has_context() {
            return false;
        }
        let Some(samples) = frame.time_domain_data().map(<[u8]>::to_vec) else {
            return false;
        };

        frame.prepare();
        let stroke = frame.foreground_fill();
        let size = frame.size();
        let Some(context) = frame.context() else {
            return false;
        };

        let (width, height) = (size.width_f(), size.height_f());
        let step = width / samples.len().max(1) as f64;
        let center = f64::from(TIME_DOMAIN_CENTER);

        context.set_line_width(self.line_width);
        context.set_stroke_style(stroke);
        context.begin_path();
        for (index, sample) in samples.iter().enumerate() {
            let x = index as f64 * step;
            let y = f64::from(*sample) / center * height / 2.0;
            if index == 0 {
                context.move_to(x, y);
            } else {
                context.line_to(x, y);
            }
        }
        context.line_to(width, height / 2.0);
        context.stroke();
        true
    }
}
