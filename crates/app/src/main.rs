use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use canvas_visualiser_core::timeline::DEFAULT_REFRESH_INTERVAL;
use canvas_visualiser_core::{
    AnalysisContext, BarGraph, BlockGraph, FrequencyCurve, HeadlessHost, Oscilloscope,
    PixelSurface, Style, ToneSource, Visualiser, VisualiserConfig,
};
use clap::{Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

const SAMPLE_RATE: f32 = 44_100.0;

fn main() -> canvas_visualiser_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render(args) => run_render(&args),
    }
}

fn run_render(args: &RenderArgs) -> canvas_visualiser_core::Result<()> {
    let config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    tracing::info!(style = ?args.style, frames = args.frames, tone = args.tone, "rendering");

    let preview = match args.style {
        StyleKind::Bars => render(config.style::<BarGraph>()?, args, config.visualiser),
        StyleKind::Blocks => render(config.style::<BlockGraph>()?, args, config.visualiser),
        StyleKind::Curve => render(config.style::<FrequencyCurve>()?, args, config.visualiser),
        StyleKind::Oscilloscope => {
            render(config.style::<Oscilloscope>()?, args, config.visualiser)
        }
    };

    println!("{preview}");
    Ok(())
}

/// Plays a tone into `style` on a software surface until `args.frames`
/// frames have been drawn, then returns an ASCII preview of the last one.
fn render<St: Style>(style: St, args: &RenderArgs, mut config: VisualiserConfig) -> String {
    if args.fps.is_some() {
        config.fps = args.fps;
    }

    let host = Rc::new(HeadlessHost::new());
    let mut context = AnalysisContext::new(SAMPLE_RATE);
    let analyser = context.create_analyser();
    context.connect(ToneSource::new(args.tone, args.amplitude, SAMPLE_RATE));

    let surface = PixelSurface::new(args.width, args.height)
        .with_container(f64::from(args.width), f64::from(args.height));
    let mut visualiser =
        Visualiser::new(style, Some(analyser), Some(surface), host.clone(), config);

    let step = DEFAULT_REFRESH_INTERVAL;
    let samples_per_step = (f64::from(SAMPLE_RATE) * step.as_secs_f64()).ceil() as usize;
    // generous cap so a throttled loop still reaches the requested count
    let deadline = Duration::from_secs(1) + step * (args.frames as u32).saturating_mul(8);

    while visualiser.frames_drawn() < args.frames && host.now() < deadline {
        context.pump(samples_per_step);
        host.advance(step, &mut visualiser);
    }
    tracing::info!(
        frames = visualiser.frames_drawn(),
        elapsed = ?host.now(),
        "finished rendering"
    );

    visualiser.stop();
    visualiser
        .surface()
        .map(|surface| surface.to_ascii(args.columns, args.rows))
        .unwrap_or_default()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

/// JSON file given with `--config`.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct AppConfig {
    visualiser: VisualiserConfig,
    /// Parameters of the selected style, e.g. `{ "columnCount": 16 }`.
    style: Option<serde_json::Value>,
}

impl AppConfig {
    fn load(path: &Path) -> canvas_visualiser_core::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.visualiser.validate()?;
        Ok(config)
    }

    fn style<St: DeserializeOwned + Default>(&self) -> canvas_visualiser_core::Result<St> {
        match &self.style {
            Some(value) => Ok(serde_json::from_value(value.clone())?),
            None => Ok(St::default()),
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless canvas audio visualiser", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a test tone with one of the visual styles and print a preview.
    Render(RenderArgs),
}

#[derive(clap::Args, Debug)]
struct RenderArgs {
    /// Visual style to draw.
    #[arg(short, long, value_enum, default_value_t = StyleKind::Bars)]
    style: StyleKind,
    /// Number of frames to draw before printing.
    #[arg(long, default_value_t = 30)]
    frames: u64,
    /// Frame rate cap. Overrides the config file.
    #[arg(long)]
    fps: Option<f64>,
    /// Surface container width in pixels.
    #[arg(long, default_value_t = 640)]
    width: u32,
    /// Surface container height in pixels.
    #[arg(long, default_value_t = 360)]
    height: u32,
    /// Frequency of the test tone in Hz.
    #[arg(long, default_value_t = 440.0)]
    tone: f32,
    /// Amplitude of the test tone, 0 to 1.
    #[arg(long, default_value_t = 0.8)]
    amplitude: f32,
    /// Preview width in characters.
    #[arg(long, default_value_t = 80)]
    columns: usize,
    /// Preview height in characters.
    #[arg(long, default_value_t = 24)]
    rows: usize,
    /// Optional JSON file with `visualiser` and `style` sections.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum StyleKind {
    Bars,
    Blocks,
    Curve,
    Oscilloscope,
}
