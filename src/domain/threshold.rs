use crate::error::InputDataError;

/// Strictly increasing threshold sequence (meters in buffer mode, seconds in
/// isochrone mode). Input order does not matter; values are sorted on
/// construction and ties are rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct Thresholds(Vec<f64>);

impl Thresholds {
    pub fn new(values: impl IntoIterator<Item = f64>) -> Result<Self, InputDataError> {
        let values = sorted_unique(values.into_iter().collect())?;
        if values.is_empty() {
            return Err(InputDataError::NoThresholds);
        }
        Ok(Self(values))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn largest(&self) -> f64 {
        self.0[self.0.len() - 1]
    }
}

/// Sort thresholds ascending, rejecting non-positive, non-finite and repeated
/// values. An empty input stays empty.
pub(crate) fn sorted_unique(mut values: Vec<f64>) -> Result<Vec<f64>, InputDataError> {
    if let Some(&bad) = values.iter().find(|t| !t.is_finite() || **t <= 0.0) {
        return Err(InputDataError::InvalidThreshold(bad));
    }
    values.sort_by(f64::total_cmp);
    if let Some(pair) = values.windows(2).find(|pair| pair[0] == pair[1]) {
        return Err(InputDataError::DuplicateThreshold(pair[0]));
    }
    Ok(values)
}

/// Hashable key for a threshold value.
pub(crate) fn threshold_key(threshold: f64) -> u64 {
    threshold.to_bits()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_sorted() {
        let thresholds = Thresholds::new([1200.0, 600.0, 900.0]).unwrap();
        assert_eq!(thresholds.as_slice(), &[600.0, 900.0, 1200.0]);
        assert_eq!(thresholds.largest(), 1200.0);
    }

    #[test]
    fn test_thresholds_reject_ties() {
        assert_eq!(
            Thresholds::new([600.0, 900.0, 600.0]),
            Err(InputDataError::DuplicateThreshold(600.0))
        );
    }

    #[test]
    fn test_thresholds_reject_bad_values() {
        assert_eq!(Thresholds::new([]), Err(InputDataError::NoThresholds));
        assert_eq!(
            Thresholds::new([10.0, -5.0]),
            Err(InputDataError::InvalidThreshold(-5.0))
        );
        assert!(matches!(
            Thresholds::new([f64::NAN]),
            Err(InputDataError::InvalidThreshold(_))
        ));
    }
}
