use serde::{Deserialize, Serialize};

use super::{bar_height, default_column_count, Style};
use crate::config::FillColor;
use crate::render::Fill;
use crate::visualiser::Frame;

pub const DEFAULT_ROW_COUNT: usize = 32;
pub const DEFAULT_BLOCK_GAP: f64 = 4.0;

fn default_row_count() -> usize {
    DEFAULT_ROW_COUNT
}

fn default_gap() -> f64 {
    DEFAULT_BLOCK_GAP
}

/// Frequency bands drawn as stacks of discrete blocks.
///
/// With a list of foreground colours the surface height is split into one
/// zone per colour, top to bottom, and each block takes the colour of the
/// zone its centre falls in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockGraph {
    #[serde(default = "default_column_count")]
    pub column_count: usize,
    #[serde(default = "default_row_count")]
    pub row_count: usize,
    /// Space between columns and between stacked blocks.
    #[serde(default = "default_gap")]
    pub gap: f64,
}

impl Default for BlockGraph {
    fn default() -> Self {
        Self {
            column_count: default_column_count(),
            row_count: DEFAULT_ROW_COUNT,
            gap: DEFAULT_BLOCK_GAP,
        }
    }
}

impl BlockGraph {
    pub fn new(column_count: usize, row_count: usize) -> Self {
        Self {
            column_count,
            row_count,
            ..Self::default()
        }
    }
}

impl Style for BlockGraph {
    fn name(&self) -> &'static str {
        "block-graph"
    }

    fn draw(&mut self, frame: &mut Frame<'_>) -> bool {
        if !frame.has_context() {
            return false;
        }
        let columns = self.column_count.max(1);
        let rows = self.row_count.max(1);
        let Some(averages) = frame.frequency_averages(columns) else {
            return false;
        };

        frame.prepare();
        let color = frame.foreground_color();
        let fill = frame.foreground_fill();
        let size = frame.size();
        let Some(context) = frame.context() else {
            return false;
        };

        let (width, height) = (size.width_f(), size.height_f());
        let gap = self.gap;
        let bar_width = (width - (columns - 1) as f64 * gap) / columns as f64;
        let block_height = (height - rows as f64 * gap) / rows as f64;
        if block_height <= 0.0 || bar_width <= 0.0 {
            // background only
            return true;
        }

        let zones = match &color {
            FillColor::List(colors) if colors.len() > 1 => Some(colors.as_slice()),
            _ => None,
        };
        if zones.is_none() {
            context.set_fill_style(fill);
        }

        let mut x = 0.0;
        for value in averages {
            let mut remaining = bar_height(value, height);
            let mut y = height - block_height;

            while remaining >= block_height {
                if let Some(colors) = zones {
                    let centre = (y + block_height / 2.0) / height;
                    let zone = ((centre * colors.len() as f64).floor().max(0.0) as usize)
                        .min(colors.len() - 1);
                    context.set_fill_style(Fill::color(colors[zone].as_str()));
                }
                context.fill_rect(x, y, bar_width, block_height);
                y -= block_height + gap;
                remaining -= block_height + gap;
            }

            x += bar_width + gap;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::audio::SnapshotAnalyser;
    use crate::render::{DrawCommand, RecordingSurface};
    use crate::{HeadlessHost, SharedAnalyser, Visualiser, VisualiserConfig};
    use std::time::Duration;

    fn run(graph: BlockGraph, value: u8, color: Option<FillColor>) -> Vec<DrawCommand> {
        let mut snapshot = SnapshotAnalyser::new(44_100.0);
        snapshot.fill_frequency(value);
        let analyser: SharedAnalyser = Rc::new(RefCell::new(snapshot));
        let host = Rc::new(HeadlessHost::new());
        let config = VisualiserConfig {
            fps: Some(10.0),
            color,
            ..Default::default()
        };
        let mut vis = Visualiser::new(
            graph,
            Some(analyser),
            Some(RecordingSurface::new(100, 100)),
            host.clone(),
            config,
        );
        host.advance(Duration::from_millis(250), &mut vis);
        vis.surface_mut().unwrap().take_commands()
    }

    fn blocks(commands: &[DrawCommand]) -> Vec<(f64, f64)> {
        commands
            .iter()
            .skip(3)
            .filter_map(|command| match command {
                DrawCommand::FillRect { x, y, .. } => Some((*x, *y)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn stacks_blocks_bottom_up() {
        let graph = BlockGraph { column_count: 1, row_count: 4, gap: 4.0 };
        let commands = run(graph, 255, None);
        // block height (100 - 16) / 4 = 21, bar 99 tall fits four blocks
        let ys: Vec<f64> = blocks(&commands).into_iter().map(|(_, y)| y).collect();
        assert_eq!(ys, vec![79.0, 54.0, 29.0, 4.0]);
    }

    #[test]
    fn silence_draws_no_blocks() {
        let commands = run(BlockGraph::new(4, 8), 0, None);
        assert!(blocks(&commands).is_empty());
    }

    #[test]
    fn colours_blocks_by_zone() {
        let graph = BlockGraph { column_count: 1, row_count: 4, gap: 4.0 };
        let commands = run(graph, 255, Some(FillColor::list(["red", "blue"])));
        let fills: Vec<&DrawCommand> = commands
            .iter()
            .skip(3)
            .filter(|command| matches!(command, DrawCommand::SetFillStyle(_)))
            .collect();
        assert_eq!(
            fills,
            vec![
                &DrawCommand::SetFillStyle(Fill::color("blue")),
                &DrawCommand::SetFillStyle(Fill::color("blue")),
                &DrawCommand::SetFillStyle(Fill::color("red")),
                &DrawCommand::SetFillStyle(Fill::color("red")),
            ]
        );
    }
}
