use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{FftSize, Result, VisualiserError};

/// Highest frame rate a visualiser will run at.
pub const MAX_FRAMES_PER_SECOND: f64 = 60.0;

pub const DEFAULT_ASPECT_RATIO: AspectRatio = AspectRatio {
    width: 16.0,
    height: 9.0,
};

/// Width to height proportion the surface is sized to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AspectRatio {
    pub width: f64,
    pub height: f64,
}

impl AspectRatio {
    pub fn new(width: f64, height: f64) -> Result<Self> {
        let ratio = Self { width, height };
        ratio.validate()?;
        Ok(ratio)
    }

    pub fn validate(&self) -> Result<()> {
        let valid = |side: f64| side.is_finite() && side > 0.0;
        if valid(self.width) && valid(self.height) {
            Ok(())
        } else {
            Err(VisualiserError::InvalidAspectRatio {
                width: self.width,
                height: self.height,
            })
        }
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        DEFAULT_ASPECT_RATIO
    }
}

/// A fill given either as one CSS colour or as a list of colours painted as
/// a top-to-bottom gradient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FillColor {
    Solid(String),
    List(Vec<String>),
}

impl FillColor {
    pub fn solid(color: impl Into<String>) -> Self {
        Self::Solid(color.into())
    }

    pub fn list<I, S>(colors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(colors.into_iter().map(Into::into).collect())
    }

    /// Collapses single-entry lists into a solid colour and rejects empty
    /// lists.
    pub fn normalized(self) -> Result<Self> {
        match self {
            Self::List(mut colors) => match colors.len() {
                0 => Err(VisualiserError::EmptyColorList),
                1 => Ok(Self::Solid(colors.remove(0))),
                _ => Ok(Self::List(colors)),
            },
            solid => Ok(solid),
        }
    }

    /// The colours in paint order.
    pub fn colors(&self) -> &[String] {
        match self {
            Self::Solid(color) => std::slice::from_ref(color),
            Self::List(colors) => colors,
        }
    }
}

impl From<&str> for FillColor {
    fn from(value: &str) -> Self {
        Self::solid(value)
    }
}

impl From<Vec<&str>> for FillColor {
    fn from(value: Vec<&str>) -> Self {
        Self::list(value)
    }
}

/// Settings shared by every visual style. Everything is optional; missing
/// values fall back to the defaults documented on each field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VisualiserConfig {
    /// Target frame rate. Unset runs at the display refresh rate; values
    /// above 60 are clamped.
    pub fps: Option<f64>,
    /// Defaults to 16:9.
    pub aspect_ratio: Option<AspectRatio>,
    /// Defaults to the surface's computed background colour, then white.
    pub background_color: Option<FillColor>,
    /// Defaults to the surface's computed colour, then black.
    pub color: Option<FillColor>,
    /// Defaults to the style's preferred transform size.
    pub fft_size: Option<FftSize>,
    /// Upper bound of the frequency styles, clamped to Nyquist.
    pub max_frequency: Option<f32>,
}

impl VisualiserConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Checks every set field, returning the first problem found.
    pub fn validate(&self) -> Result<()> {
        if let Some(fps) = self.fps {
            frame_delay(fps)?;
        }
        if let Some(ratio) = &self.aspect_ratio {
            ratio.validate()?;
        }
        for fill in [&self.background_color, &self.color].into_iter().flatten() {
            fill.clone().normalized()?;
        }
        if let Some(max) = self.max_frequency {
            if !(max.is_finite() && max > 0.0) {
                return Err(VisualiserError::msg(format!(
                    "max frequency must be positive, got {max}"
                )));
            }
        }
        Ok(())
    }
}

/// Minimum delay between frames for the requested rate, in milliseconds.
pub fn frame_delay_ms(fps: f64) -> Result<f64> {
    if !(fps.is_finite() && fps > 0.0) {
        return Err(VisualiserError::InvalidFrameRate(fps));
    }

    Ok(1000.0 / fps.min(MAX_FRAMES_PER_SECOND))
}

/// [`frame_delay_ms`] as a [`Duration`]. Rates so small that the delay does
/// not fit in a `Duration` are rejected.
pub fn frame_delay(fps: f64) -> Result<Duration> {
    let ms = frame_delay_ms(fps)?;
    Duration::try_from_secs_f64(ms / 1000.0).map_err(|_| VisualiserError::InvalidFrameRate(fps))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn parses_camel_case_json() {
        let config = VisualiserConfig::from_json(
            r##"{
                "fps": 30,
                "aspectRatio": { "width": 4, "height": 3 },
                "backgroundColor": ["#000", "navy"],
                "color": "lime",
                "fftSize": 4096
            }"##,
        )
        .unwrap();

        assert_eq!(config.fps, Some(30.0));
        assert_eq!(config.aspect_ratio, Some(AspectRatio { width: 4.0, height: 3.0 }));
        assert_eq!(config.background_color, Some(FillColor::list(["#000", "navy"])));
        assert_eq!(config.color, Some(FillColor::solid("lime")));
        assert_eq!(config.fft_size, Some(FftSize::S4096));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_bad_fft_size_in_json() {
        assert!(VisualiserConfig::from_json(r#"{ "fftSize": 1000 }"#).is_err());
    }

    #[test]
    fn frame_delay_is_clamped() {
        assert_relative_eq!(frame_delay_ms(10.0).unwrap(), 100.0);
        assert_relative_eq!(frame_delay_ms(60.0).unwrap(), 1000.0 / 60.0);
        assert_relative_eq!(frame_delay_ms(240.0).unwrap(), 1000.0 / 60.0);
        assert!(frame_delay_ms(0.0).is_err());
        assert!(frame_delay_ms(f64::NAN).is_err());
    }

    #[test]
    fn tiny_frame_rates_are_rejected_not_overflowed() {
        assert_eq!(frame_delay(10.0).unwrap(), Duration::from_millis(100));
        assert!(matches!(frame_delay(1e-30), Err(VisualiserError::InvalidFrameRate(_))));
        assert!(frame_delay(1e-19).is_ok());

        let config = VisualiserConfig {
            fps: Some(1e-30),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn normalizes_fill_lists() {
        assert_eq!(
            FillColor::list(["red"]).normalized().unwrap(),
            FillColor::solid("red")
        );
        assert!(matches!(
            FillColor::List(Vec::new()).normalized(),
            Err(VisualiserError::EmptyColorList)
        ));
        let gradient = FillColor::list(["red", "blue"]);
        assert_eq!(gradient.clone().normalized().unwrap(), gradient);
    }

    #[test]
    fn validates_aspect_ratio() {
        assert!(AspectRatio::new(16.0, 9.0).is_ok());
        assert!(AspectRatio::new(0.0, 9.0).is_err());
        assert!(AspectRatio::new(4.0, -3.0).is_err());
    }
}
