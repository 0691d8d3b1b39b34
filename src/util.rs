/// Arithmetic mean of a set of millisecond durations.
pub fn mean_ms(data: &[u64]) -> Option<f64> {
    match data.len() {
        0 => None,
        count => Some(data.iter().map(|&v| v as f64).sum::<f64>() / count as f64),
    }
}

/// Population standard deviation of a set of millisecond durations.
pub fn std_dev_ms(data: &[u64]) -> Option<f64> {
    let data_mean = mean_ms(data)?;
    let variance = data
        .iter()
        .map(|&value| {
            let diff = data_mean - value as f64;

            diff * diff
        })
        .sum::<f64>()
        / data.len() as f64;

    Some(variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean_ms(&[10, 20, 30, 15, 22]), Some(19.4));
        assert_eq!(mean_ms(&[12_000, 8_000]), Some(10_000.0));
    }

    #[test]
    fn test_mean_single_value() {
        assert_eq!(mean_ms(&[42]), Some(42.0));
    }

    #[test]
    fn test_mean_empty_slice() {
        assert_eq!(mean_ms(&[]), None);
    }

    #[test]
    fn test_std_dev() {
        assert_eq!(std_dev_ms(&[100, 120, 90, 102, 94]), Some(10.322790320451151));
        assert_eq!(std_dev_ms(&[15, 7, 55]), Some(20.997354330698162));
    }

    #[test]
    fn test_std_dev_single_value() {
        assert_eq!(std_dev_ms(&[42]), Some(0.0));
    }

    #[test]
    fn test_std_dev_empty_slice() {
        assert_eq!(std_dev_ms(&[]), None);
    }

    #[test]
    fn test_std_dev_identical_laps() {
        assert_eq!(std_dev_ms(&[5_000, 5_000, 5_000]), Some(0.0));
    }
}
