use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use approx::assert_relative_eq;
use canvas_visualiser_core::render::DrawCommand;
use canvas_visualiser_core::{
    BarGraph, BlockGraph, ComputedStyle, Fill, FillColor, HeadlessHost, Oscilloscope, RecordingSurface,
    SnapshotAnalyser, Style, Visualiser, VisualiserConfig,
};

/// Runs `style` against a snapshot analyser for one throttled frame slot and
/// returns the frames counted with the commands recorded.
fn run<St: Style>(
    style: St,
    analyser: SnapshotAnalyser,
    surface: RecordingSurface,
    config: VisualiserConfig,
) -> (u64, Vec<DrawCommand>) {
    let host = Rc::new(HeadlessHost::new());
    let config = VisualiserConfig {
        fps: Some(10.0),
        ..config
    };
    let mut vis = Visualiser::new(
        style,
        Some(Rc::new(RefCell::new(analyser))),
        Some(surface),
        host.clone(),
        config,
    );
    host.advance(Duration::from_millis(250), &mut vis);
    (vis.frames_drawn(), vis.surface_mut().unwrap().take_commands())
}

fn one_frame<St: Style>(
    style: St,
    analyser: SnapshotAnalyser,
    surface: RecordingSurface,
    config: VisualiserConfig,
) -> Vec<DrawCommand> {
    let (frames, commands) = run(style, analyser, surface, config);
    assert_eq!(frames, 1);
    commands
}

fn rects(commands: &[DrawCommand]) -> Vec<(f64, f64, f64, f64)> {
    commands
        .iter()
        .filter_map(|command| match command {
            DrawCommand::FillRect { x, y, width, height } => Some((*x, *y, *width, *height)),
            _ => None,
        })
        .collect()
}

#[test]
fn full_scale_bars_are_equal_and_at_the_padding_line() {
    let mut analyser = SnapshotAnalyser::new(44_100.0);
    analyser.fill_frequency(255);
    let commands = one_frame(
        BarGraph::new(4),
        analyser,
        RecordingSurface::new(400, 200),
        VisualiserConfig::default(),
    );

    let rects = rects(&commands);
    // background first, then one rect per band
    assert_eq!(rects.len(), 5);
    assert_eq!(rects[0], (0.0, 0.0, 400.0, 200.0));

    let bars = &rects[1..];
    for (index, (x, y, width, height)) in bars.iter().enumerate() {
        assert_relative_eq!(*x, index as f64 * 100.0);
        assert_relative_eq!(*width, 98.0);
        assert_relative_eq!(*height, 198.0, epsilon = 1e-3);
        assert_relative_eq!(*y + *height, 200.0, epsilon = 1e-9);
    }
}

#[test]
fn silent_oscilloscope_is_a_flat_centre_line() {
    let mut analyser = SnapshotAnalyser::new(44_100.0);
    analyser.fill_time_domain(128);
    let commands = one_frame(
        Oscilloscope::default(),
        analyser,
        RecordingSurface::new(512, 100),
        VisualiserConfig::default(),
    );

    let points: Vec<(f64, f64)> = commands
        .iter()
        .filter_map(|command| match command {
            DrawCommand::MoveTo { x, y } | DrawCommand::LineTo { x, y } => Some((*x, *y)),
            _ => None,
        })
        .collect();

    // one point per sample in the 2048 window plus the closing edge point
    assert_eq!(points.len(), 2049);
    assert_eq!(points[0], (0.0, 50.0));
    assert_eq!(points[points.len() - 1], (512.0, 50.0));
    assert!(points.iter().all(|&(_, y)| y == 50.0));
    assert!(points.windows(2).all(|pair| pair[1].0 > pair[0].0));
    assert_eq!(commands.last(), Some(&DrawCommand::Stroke));
}

#[test]
fn colour_list_becomes_vertical_gradient() {
    let mut analyser = SnapshotAnalyser::new(44_100.0);
    analyser.fill_frequency(255);
    let config = VisualiserConfig {
        color: Some(FillColor::list(["#f00", "#0f0", "#00f"])),
        ..Default::default()
    };
    let commands = one_frame(BarGraph::new(2), analyser, RecordingSurface::new(300, 100), config);

    let Some(DrawCommand::SetFillStyle(Fill::Gradient(gradient))) = commands.get(3) else {
        panic!("expected a gradient foreground, got {:?}", commands.get(3));
    };
    assert_eq!((gradient.x0, gradient.y0, gradient.x1, gradient.y1), (150.0, 0.0, 150.0, 100.0));
    let stops: Vec<(f64, &str)> = gradient
        .stops
        .iter()
        .map(|stop| (stop.offset, stop.color.as_str()))
        .collect();
    assert_eq!(stops, vec![(0.0, "#f00"), (0.5, "#0f0"), (1.0, "#00f")]);
}

#[test]
fn colours_fall_back_to_computed_style_then_defaults() {
    let mut analyser = SnapshotAnalyser::new(44_100.0);
    analyser.fill_frequency(255);
    let styled = RecordingSurface::new(100, 100).with_computed_style(ComputedStyle {
        color: Some("rgb(10, 20, 30)".into()),
        background_color: Some(String::new()),
    });
    let config = VisualiserConfig::default();
    let commands = one_frame(BarGraph::new(1), analyser.clone(), styled, config);
    assert_eq!(commands[1], DrawCommand::SetFillStyle(Fill::color("white")));
    assert_eq!(commands[3], DrawCommand::SetFillStyle(Fill::color("rgb(10, 20, 30)")));

    let plain = RecordingSurface::new(100, 100);
    let commands = one_frame(BarGraph::new(1), analyser, plain, VisualiserConfig::default());
    assert_eq!(commands[1], DrawCommand::SetFillStyle(Fill::color("white")));
    assert_eq!(commands[3], DrawCommand::SetFillStyle(Fill::color("black")));
}

#[test]
fn missing_context_draws_nothing() {
    let mut analyser = SnapshotAnalyser::new(44_100.0);
    analyser.fill_frequency(255);
    let (frames, commands) = run(
        BarGraph::default(),
        analyser,
        RecordingSurface::new(100, 100).without_context(),
        VisualiserConfig::default(),
    );
    assert_eq!(frames, 0);
    assert!(commands.is_empty());
}

#[test]
fn degenerate_block_graph_still_counts_its_background() {
    let mut analyser = SnapshotAnalyser::new(44_100.0);
    analyser.fill_frequency(255);
    // 32 rows of 4px gaps leave no room for a block in 100px
    let (frames, commands) = run(
        BlockGraph::default(),
        analyser,
        RecordingSurface::new(100, 100),
        VisualiserConfig::default(),
    );
    assert_eq!(frames, 1);
    assert_eq!(rects(&commands), vec![(0.0, 0.0, 100.0, 100.0)]);
}
