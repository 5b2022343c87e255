use serde::{Deserialize, Serialize};

use super::{bar_height, default_column_count, Style};
use crate::visualiser::Frame;

pub const DEFAULT_BAR_GAP: f64 = 2.0;

fn default_gap() -> f64 {
    DEFAULT_BAR_GAP
}

/// One filled bar per frequency band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarGraph {
    #[serde(default = "default_column_count")]
    pub column_count: usize,
    /// Horizontal space after each bar, in pixels.
    #[serde(default = "default_gap")]
    pub gap: f64,
}

impl Default for BarGraph {
    fn default() -> Self {
        Self {
            column_count: default_column_count(),
            gap: DEFAULT_BAR_GAP,
        }
    }
}

impl BarGraph {
    pub fn new(column_count: usize) -> Self {
        Self {
            column_count,
            ..Self::default()
        }
    }
}

impl Style for BarGraph {
    fn name(&self) -> &'static str {
        "bar-graph"
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
        let fill = frame.foreground_fill();
        let size = frame.size();
        let Some(context) = frame.context() else {
            return false;
        };

        let height = size.height_f();
        let bar_width = (size.width_f() - columns as f64 * self.gap) / columns as f64;

        context.set_fill_style(fill);
        let mut x = 0.0;
        for value in averages {
            let bar = bar_height(value, height);
            context.fill_rect(x, height - bar, bar_width, bar);
            x += bar_width + self.gap;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_with_defaults() {
        let graph: BarGraph = serde_json::from_str(r#"{ "columnCount": 8 }"#).unwrap();
        assert_eq!(graph, BarGraph { column_count: 8, gap: 2.0 });
    }
}
