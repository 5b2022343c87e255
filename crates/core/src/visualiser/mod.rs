//! The shared visualiser core.
//!
//! [`Visualiser`] owns the animation loop, surface sizing, colour resolution
//! and callback registration. What actually gets painted is delegated to a
//! [`Style`].

mod callbacks;
mod frame;
mod sizing;

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, error, warn};

pub use callbacks::{CallbackKey, CallbackRegistry, VisualiserCallback, VisualiserEvent};
pub use frame::{
    resolve_fill, vertical_span, Frame, DEFAULT_BACKGROUND_COLOR, DEFAULT_FOREGROUND_COLOR,
};
pub use sizing::fit_to_container;

use crate::audio::{AnalysisContext, SharedAnalyser};
use crate::config::{
    frame_delay, AspectRatio, FillColor, VisualiserConfig, MAX_FRAMES_PER_SECOND,
};
use crate::math::MAX_FREQUENCY;
use crate::render::{ComputedStyle, DrawContext, Surface, SurfaceSize};
use crate::styles::Style;
use crate::timeline::{FrameHost, FrameRequestId, TimerId, Wake, WakeHandler};
use crate::{FftSize, Result, VisualiserError};

/// Runs before the style paints, with the frame's sample buffer if one has
/// been pulled.
pub type BeforeDrawHook = Box<dyn FnMut(&mut dyn DrawContext, SurfaceSize, Option<&[u8]>)>;

/// Runs right after the background has been painted.
pub type BackgroundHook = Box<dyn FnMut(&mut dyn DrawContext, SurfaceSize)>;

#[derive(Default)]
pub(crate) struct Hooks {
    pub(crate) before_draw: Option<BeforeDrawHook>,
    pub(crate) modify_background: Option<BackgroundHook>,
}

#[derive(Debug, Default)]
pub(crate) struct PaintState {
    pub(crate) background_color: Option<FillColor>,
    pub(crate) color: Option<FillColor>,
    // outer None: not queried this frame
    pub(crate) style_cache: Option<Option<ComputedStyle>>,
}

/// A visual style bound to an analyser, a surface and a frame host.
///
/// The loop is driven by the host: it calls [`WakeHandler::handle_wake`]
/// whenever a frame or timer requested by the visualiser comes due.
/// Construction schedules the first frame after a short settle delay.
pub struct Visualiser<St: Style, S: Surface> {
    style: St,
    surface: Option<S>,
    analyser: Option<SharedAnalyser>,
    host: Rc<dyn FrameHost>,
    aspect_ratio: AspectRatio,
    frame_delay: Option<Duration>,
    fft_size: FftSize,
    max_frequency: f32,
    paint: PaintState,
    callbacks: CallbackRegistry,
    hooks: Hooks,
    active: bool,
    pending_frame: Option<FrameRequestId>,
    pending_throttle: Option<TimerId>,
    pending_reset: Option<TimerId>,
    frames_drawn: u64,
}

impl<St: Style, S: Surface> Visualiser<St, S> {
    /// Binds `style` to its sources.
    ///
    /// A missing analyser or surface is logged and the visualiser is still
    /// built; frames then draw nothing. Invalid configuration values are
    /// logged and replaced by their defaults.
    pub fn new(
        style: St,
        analyser: Option<SharedAnalyser>,
        surface: Option<S>,
        host: Rc<dyn FrameHost>,
        config: VisualiserConfig,
    ) -> Self {
        if analyser.is_none() {
            error!(style = style.name(), "visualiser created without an analyser");
        }
        if surface.is_none() {
            error!(style = style.name(), "visualiser created without a surface");
        }

        let aspect_ratio = match config.aspect_ratio.map(|ratio| ratio.validate().map(|_| ratio)) {
            Some(Ok(ratio)) => ratio,
            Some(Err(err)) => {
                warn!(%err, "ignoring configured aspect ratio");
                AspectRatio::default()
            }
            None => AspectRatio::default(),
        };

        let frame_delay = config.fps.and_then(|fps| match frame_delay(fps) {
            Ok(delay) => Some(delay),
            Err(err) => {
                warn!(%err, "ignoring configured frame rate");
                None
            }
        });

        let max_frequency = match config.max_frequency {
            Some(max) if max.is_finite() && max > 0.0 => max,
            Some(max) => {
                warn!(max, "ignoring configured max frequency");
                MAX_FREQUENCY
            }
            None => MAX_FREQUENCY,
        };

        let paint = PaintState {
            background_color: normalized_or_warn(config.background_color, "background color"),
            color: normalized_or_warn(config.color, "color"),
            style_cache: None,
        };

        let fft_size = config.fft_size.unwrap_or_else(|| style.preferred_fft_size());

        let mut visualiser = Self {
            style,
            surface,
            analyser,
            host,
            aspect_ratio,
            frame_delay,
            fft_size,
            max_frequency,
            paint,
            callbacks: CallbackRegistry::new(),
            hooks: Hooks::default(),
            active: true,
            pending_frame: None,
            pending_throttle: None,
            pending_reset: None,
            frames_drawn: 0,
        };
        visualiser.reset();
        visualiser
    }

    /// Builds a visualiser that owns its surface and taps a fresh analyser
    /// from `context`.
    pub fn autonomous(
        style: St,
        context: &mut AnalysisContext,
        host: Rc<dyn FrameHost>,
        config: VisualiserConfig,
    ) -> Self
    where
        S: Default,
    {
        let analyser: SharedAnalyser = context.create_analyser();
        Self::new(style, Some(analyser), Some(S::default()), host, config)
    }

    /// Sizes the surface to the largest box of the configured aspect ratio
    /// that fits its container, scaled by the device pixel ratio.
    ///
    /// Does nothing when there is no surface or it has no container.
    pub fn resize(&mut self) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        let Some(container) = surface.container_box() else {
            debug!("surface has no container, skipping resize");
            return;
        };

        let dpr = self.host.device_pixel_ratio();
        let size = fit_to_container(container, self.aspect_ratio, dpr);
        debug!(width = size.width, height = size.height, "resized surface");
        surface.set_size(size);
    }

    /// One turn of the animation loop: draws a frame and schedules the next.
    ///
    /// Does nothing, and schedules nothing, while the loop is inactive.
    pub fn start(&mut self) {
        if !self.active {
            debug!("animation inactive, not drawing");
            return;
        }

        self.draw_frame();
        self.paint.style_cache = None;

        self.cancel_frame();
        self.cancel_throttle();
        match self.frame_delay {
            Some(delay) => self.pending_throttle = Some(self.host.set_timeout(delay)),
            None => self.request_frame(),
        }
    }

    /// Halts the loop and cancels any pending frame or reset.
    pub fn stop(&mut self) {
        self.active = false;
        self.cancel_frame();
        self.cancel_throttle();
        self.cancel_reset();
    }

    /// Stops, then after twice the frame delay reactivates the loop,
    /// requests a frame and resizes.
    pub fn reset(&mut self) {
        self.stop();
        let delay = self
            .frame_delay
            .unwrap_or_else(min_frame_delay)
            .saturating_mul(2);
        debug!(?delay, "scheduling reset");
        self.pending_reset = Some(self.host.set_timeout(delay));
    }

    /// Registers `callback` for the event called `event`.
    ///
    /// A named `key` replaces an earlier callback registered under the same
    /// name. Unknown or empty event names are logged and rejected.
    pub fn on<F>(&mut self, event: &str, key: Option<&str>, callback: F) -> Result<CallbackKey>
    where
        F: FnMut(&mut dyn DrawContext, Option<&[u8]>) + 'static,
    {
        let result = event
            .parse::<VisualiserEvent>()
            .and_then(|event| self.callbacks.register(event, key, Box::new(callback)));
        if let Err(err) = &result {
            warn!(%err, "failed to add callback");
        }
        result
    }

    /// Caps the frame rate. Rates above 60 are clamped.
    pub fn set_fps(&mut self, fps: f64) -> Result<()> {
        let delay = frame_delay(fps).map_err(|err| {
            warn!(%err, "rejected frame rate");
            err
        })?;
        self.frame_delay = Some(delay);
        Ok(())
    }

    /// Removes the frame rate cap.
    pub fn clear_fps(&mut self) {
        self.frame_delay = None;
    }

    /// Changes the aspect ratio and resizes the surface to match.
    pub fn set_aspect_ratio(&mut self, width: f64, height: f64) -> Result<()> {
        let ratio = AspectRatio::new(width, height).map_err(|err| {
            warn!(%err, "rejected aspect ratio");
            err
        })?;
        self.aspect_ratio = ratio;
        self.resize();
        Ok(())
    }

    /// Sets the background fill. `None` falls back to the surface's style.
    pub fn set_background_color(&mut self, color: Option<FillColor>) -> Result<()> {
        self.paint.background_color = normalize_fill(color)?;
        Ok(())
    }

    /// Sets the foreground fill. `None` falls back to the surface's style.
    pub fn set_color(&mut self, color: Option<FillColor>) -> Result<()> {
        self.paint.color = normalize_fill(color)?;
        Ok(())
    }

    /// Transform size requested from the analyser on the next pull.
    pub fn set_fft_size(&mut self, fft_size: FftSize) {
        self.fft_size = fft_size;
    }

    pub fn set_max_frequency(&mut self, max_frequency: f32) -> Result<()> {
        if !(max_frequency.is_finite() && max_frequency > 0.0) {
            let err = VisualiserError::msg(format!(
                "max frequency must be positive, got {max_frequency}"
            ));
            warn!(%err, "rejected max frequency");
            return Err(err);
        }
        self.max_frequency = max_frequency;
        Ok(())
    }

    pub fn set_before_draw<F>(&mut self, hook: Option<F>)
    where
        F: FnMut(&mut dyn DrawContext, SurfaceSize, Option<&[u8]>) + 'static,
    {
        self.hooks.before_draw = hook.map(|hook| Box::new(hook) as BeforeDrawHook);
    }

    pub fn set_modify_background<F>(&mut self, hook: Option<F>)
    where
        F: FnMut(&mut dyn DrawContext, SurfaceSize) + 'static,
    {
        self.hooks.modify_background = hook.map(|hook| Box::new(hook) as BackgroundHook);
    }

    pub fn style(&self) -> &St {
        &self.style
    }

    pub fn style_mut(&mut self) -> &mut St {
        &mut self.style
    }

    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    pub fn surface_mut(&mut self) -> Option<&mut S> {
        self.surface.as_mut()
    }

    pub fn analyser(&self) -> Option<&SharedAnalyser> {
        self.analyser.as_ref()
    }

    pub fn callbacks(&self) -> &CallbackRegistry {
        &self.callbacks
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Minimum delay between frames, if a frame rate was set.
    pub fn frame_delay(&self) -> Option<Duration> {
        self.frame_delay
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.aspect_ratio
    }

    pub fn fft_size(&self) -> FftSize {
        self.fft_size
    }

    pub fn max_frequency(&self) -> f32 {
        self.max_frequency
    }

    pub fn background_color(&self) -> Option<&FillColor> {
        self.paint.background_color.as_ref()
    }

    pub fn color(&self) -> Option<&FillColor> {
        self.paint.color.as_ref()
    }

    /// Frames drawn since construction.
    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    fn draw_frame(&mut self) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };

        let mut frame = Frame::new(
            &mut *surface,
            self.analyser.as_ref(),
            &mut self.paint,
            &mut self.hooks,
            &mut self.callbacks,
            self.fft_size,
            self.max_frequency,
        );
        let painted = self.style.draw(&mut frame);
        let data = frame.into_data();
        if !painted {
            return;
        }

        if let Some(context) = surface.context() {
            self.callbacks
                .fire(VisualiserEvent::FrameDrawn, context, data.as_deref());
        }
        self.frames_drawn += 1;
    }

    fn request_frame(&mut self) {
        self.cancel_frame();
        self.pending_frame = Some(self.host.request_animation_frame());
    }

    fn cancel_frame(&mut self) {
        if let Some(id) = self.pending_frame.take() {
            self.host.cancel_animation_frame(id);
        }
    }

    fn cancel_throttle(&mut self) {
        if let Some(id) = self.pending_throttle.take() {
            self.host.clear_timeout(id);
        }
    }

    fn cancel_reset(&mut self) {
        if let Some(id) = self.pending_reset.take() {
            self.host.clear_timeout(id);
        }
    }
}

impl<St: Style, S: Surface> WakeHandler for Visualiser<St, S> {
    fn handle_wake(&mut self, wake: Wake) {
        match wake {
            Wake::AnimationFrame(id) if self.pending_frame == Some(id) => {
                self.pending_frame = None;
                self.start();
            }
            Wake::Timer(id) if self.pending_throttle == Some(id) => {
                self.pending_throttle = None;
                self.request_frame();
            }
            Wake::Timer(id) if self.pending_reset == Some(id) => {
                self.pending_reset = None;
                self.active = true;
                self.request_frame();
                self.resize();
            }
            stale => debug!(?stale, "ignoring stale wake-up"),
        }
    }
}

impl<St: Style, S: Surface> Drop for Visualiser<St, S> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<St: Style + fmt::Debug, S: Surface> fmt::Debug for Visualiser<St, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Visualiser")
            .field("style", &self.style)
            .field("has_surface", &self.surface.is_some())
            .field("has_analyser", &self.analyser.is_some())
            .field("aspect_ratio", &self.aspect_ratio)
            .field("frame_delay", &self.frame_delay)
            .field("fft_size", &self.fft_size)
            .field("active", &self.active)
            .field("callbacks", &self.callbacks)
            .field("frames_drawn", &self.frames_drawn)
            .finish()
    }
}

fn min_frame_delay() -> Duration {
    Duration::from_secs_f64(1.0 / MAX_FRAMES_PER_SECOND)
}

fn normalize_fill(color: Option<FillColor>) -> Result<Option<FillColor>> {
    color
        .map(FillColor::normalized)
        .transpose()
        .map_err(|err| {
            warn!(%err, "rejected fill");
            err
        })
}

fn normalized_or_warn(color: Option<FillColor>, what: &str) -> Option<FillColor> {
    match color.map(FillColor::normalized) {
        Some(Ok(color)) => Some(color),
        Some(Err(err)) => {
            warn!(%err, "ignoring configured {what}");
            None
        }
        None => None,
    }
}
