use serde::{Deserialize, Serialize};

use super::{bar_height, default_column_count, default_line_width, Style};
use crate::config::FillColor;
use crate::render::Fill;
use crate::visualiser::{Frame, DEFAULT_FOREGROUND_COLOR};

/// A continuous outline through the band heights, optionally filled
/// underneath.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrequencyCurve {
    #[serde(default = "default_column_count")]
    pub column_count: usize,
    #[serde(default = "default_line_width")]
    pub line_width: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<FillColor>,
}

impl Default for FrequencyCurve {
    fn default() -> Self {
        Self {
            column_count: default_column_count(),
            line_width: default_line_width(),
            fill_color: None,
        }
    }
}

impl Style for FrequencyCurve {
    fn name(&self) -> &'static str {
        "frequency-curve"
    }

    fn draw(&mut self, frame: &mut Frame<'_>) -> bool {
        if !frame.has_context() {
            return false;
        }
        let columns = self.column_count.max(1);
        let Some(averages) = frame.frequency_averages(columns) else {
            return false;
        };

        frame.prepare();
        let stroke = frame.foreground_fill();
        let under = self.fill_color.as_ref().map(|spec| {
            frame
                .fill_for(spec)
                .unwrap_or_else(|| Fill::color(DEFAULT_FOREGROUND_COLOR))
        });
        let size = frame.size();
        let Some(context) = frame.context() else {
            return false;
        };

        let (width, height) = (size.width_f(), size.height_f());
        let column_width = width / columns as f64;

        context.set_line_width(self.line_width);
        context.set_stroke_style(stroke);
        context.begin_path();
        context.move_to(0.0, height);
        for (index, value) in averages.into_iter().enumerate() {
            let x = (index as f64 + 0.5) * column_width;
            context.line_to(x, height - bar_height(value, height));
        }
        context.line_to(width, height);
        context.stroke();

        if let Some(fill) = under {
            context.set_fill_style(fill);
            context.close_path();
            context.fill();
        }
        true
    }
}
