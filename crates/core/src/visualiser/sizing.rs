use crate::config::AspectRatio;
use crate::render::{ContainerBox, SurfaceSize};

/// Largest surface with `aspect` proportions that fits inside `container`,
/// in device pixels.
///
/// Fits to the container width unless that would overflow its height, in
/// which case it fits to the height. Dimensions are floored so the result
/// never exceeds the container on the constrained axis.
pub fn fit_to_container(
    container: ContainerBox,
    aspect: AspectRatio,
    device_pixel_ratio: f64,
) -> SurfaceSize {
    let dpr = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
        device_pixel_ratio
    } else {
        1.0
    };
    let max_width = sanitize(container.width);
    let max_height = sanitize(container.height);
    let height_per_width = aspect.height / aspect.width;
    let width_per_height = aspect.width / aspect.height;

    let (width, height) = if max_width * height_per_width > max_height {
        (max_height * width_per_height, max_height)
    } else {
        (max_width, max_width * height_per_width)
    };

    SurfaceSize::new(to_pixels(width * dpr), to_pixels(height * dpr))
}

fn sanitize(length: f64) -> f64 {
    if length.is_finite() {
        length.max(0.0)
    } else {
        0.0
    }
}

fn to_pixels(length: f64) -> u32 {
    // tolerate float noise just below a whole pixel
    (length + 1e-9).floor().clamp(0.0, f64::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(width: f64, height: f64) -> ContainerBox {
        ContainerBox { width, height }
    }

    #[test]
    fn fits_to_width_in_tall_container() {
        let size = fit_to_container(container(1600.0, 2000.0), AspectRatio::default(), 1.0);
        assert_eq!(size, SurfaceSize::new(1600, 900));
    }

    #[test]
    fn fits_to_height_in_wide_container() {
        let size = fit_to_container(container(4000.0, 900.0), AspectRatio::default(), 1.0);
        assert_eq!(size, SurfaceSize::new(1600, 900));
    }

    #[test]
    fn scales_by_device_pixel_ratio() {
        let ratio = AspectRatio::new(4.0, 3.0).unwrap();
        let size = fit_to_container(container(800.0, 800.0), ratio, 2.0);
        assert_eq!(size, SurfaceSize::new(1600, 1200));
    }

    #[test]
    fn respects_ratio_and_bounds_for_many_containers() {
        let ratio = AspectRatio::new(21.0, 9.0).unwrap();
        for (w, h) in [(333.0, 777.0), (1234.5, 321.0), (10.0, 10.0), (1919.0, 1079.0)] {
            for dpr in [1.0, 1.5, 3.0] {
                let size = fit_to_container(container(w, h), ratio, dpr);
                assert!(f64::from(size.width) <= w * dpr + 1e-6);
                assert!(f64::from(size.height) <= h * dpr + 1e-6);
                let expected_height = f64::from(size.width) * 9.0 / 21.0;
                assert!((f64::from(size.height) - expected_height).abs() <= 2.0);
            }
        }
    }

    #[test]
    fn degenerate_container_yields_empty_surface() {
        let size = fit_to_container(container(f64::NAN, -5.0), AspectRatio::default(), 1.0);
        assert_eq!(size, SurfaceSize::new(0, 0));
    }
}
