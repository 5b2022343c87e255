//! Pitch-space and loudness helpers shared by the frequency styles.

/// The lowest frequency any visualiser displays.
pub const MIN_FREQUENCY: f32 = 20.0;

/// Default upper bound for frequency styles. Energy above roughly 12 kHz is
/// low enough that including it flattens the right side of the graph.
pub const MAX_FREQUENCY: f32 = 12_000.0;

/// Largest value produced by a byte frequency snapshot.
pub const MAX_FREQUENCY_DATA_VALUE: f32 = 255.0;

/// Inputs below this are treated as this when converting to decibels.
pub const MIN_FREQUENCY_DATA_VALUE: f32 = 1.0;

/// Byte value of a silent time-domain sample.
pub const TIME_DOMAIN_CENTER: f32 = 128.0;

/// Heights are multiplied by this so a full-scale band never touches the top
/// edge of the surface.
pub const CANVAS_PADDING_TOP_RATIO: f32 = 0.99;

const STEPS_PER_OCTAVE: f32 = 12.0;

/// Number of semitone steps between [`MIN_FREQUENCY`] and `frequency`.
pub fn steps(frequency: f32) -> f32 {
    (frequency / MIN_FREQUENCY).log2() * STEPS_PER_OCTAVE
}

/// Inverse of [`steps`].
pub fn steps_to_frequency(steps: f32) -> f32 {
    MIN_FREQUENCY * 2f32.powf(steps / STEPS_PER_OCTAVE)
}

/// Arithmetic mean of a byte slice, `0.0` when empty.
pub fn average(values: &[u8]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }

    let sum: u32 = values.iter().map(|&v| u32::from(v)).sum();
    sum as f32 / values.len() as f32
}

/// Converts a byte magnitude to `log10(v / 255)`, which is zero at full scale
/// and negative below it.
pub fn frequency_data_to_decibel(value: f32) -> f32 {
    let value = value.clamp(MIN_FREQUENCY_DATA_VALUE, MAX_FREQUENCY_DATA_VALUE);
    (value / MAX_FREQUENCY_DATA_VALUE).log10()
}

/// Share of the surface height a band of magnitude `value` should occupy.
///
/// The decibel value is inverted into a distance from the top edge; the
/// height is what remains below that point, so 255 fills the surface and
/// anything a decade or more below full scale collapses to nothing.
pub fn height_proportion(value: f32) -> f32 {
    let distance_from_top = -frequency_data_to_decibel(value);
    (1.0 - distance_from_top).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn steps_round_trip() {
        for freq in [20.0, 55.0, 440.0, 12_000.0] {
            assert_relative_eq!(steps_to_frequency(steps(freq)), freq, max_relative = 1e-4);
        }
        assert_relative_eq!(steps(40.0), 12.0, epsilon = 1e-4);
        assert_eq!(steps(MIN_FREQUENCY), 0.0);
    }

    #[test]
    fn average_handles_empty() {
        assert_eq!(average(&[]), 0.0);
        assert_eq!(average(&[0, 255]), 127.5);
    }

    #[test]
    fn decibel_clamps_low_inputs() {
        assert_eq!(frequency_data_to_decibel(255.0), 0.0);
        assert_eq!(frequency_data_to_decibel(0.0), frequency_data_to_decibel(1.0));
        assert!(frequency_data_to_decibel(100.0) < 0.0);
    }

    #[test]
    fn height_proportion_is_monotonic() {
        assert_eq!(height_proportion(255.0), 1.0);
        assert_eq!(height_proportion(0.0), 0.0);
        assert!(height_proportion(200.0) > height_proportion(100.0));
        assert!(height_proportion(25.5) < 1e-5);
        assert_eq!(height_proportion(10.0), 0.0);
    }
}
