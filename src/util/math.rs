//! Numeric helpers shared by the decoder and the engines.

/// Clamps a score into `[0, 1]`, mapping NaN to zero.
pub(crate) fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Returns the index and value of the largest finite element.
///
/// NaN entries are skipped; ties keep the lowest index.
pub(crate) fn argmax(values: impl IntoIterator<Item = f32>) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, value) in values.into_iter().enumerate() {
        if value.is_nan() {
            continue;
        }
        match best {
            Some((_, current)) if value <= current => {}
            _ => best = Some((idx, value)),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::{argmax, clamp_unit};

    #[test]
    fn clamp_unit_maps_to_range() {
        assert_eq!(clamp_unit(1.7), 1.0);
        assert_eq!(clamp_unit(-0.2), 0.0);
        assert_eq!(clamp_unit(f32::NAN), 0.0);
        assert!((clamp_unit(0.42) - 0.42).abs() < 1e-6);
    }

    #[test]
    fn argmax_prefers_first_of_ties_and_skips_nan() {
        assert_eq!(argmax([0.1, 0.9, 0.9, 0.3]), Some((1, 0.9)));
        assert_eq!(argmax([f32::NAN, 0.2]), Some((1, 0.2)));
        assert_eq!(argmax(std::iter::empty()), None);
    }
}
