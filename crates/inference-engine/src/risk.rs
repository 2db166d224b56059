//! Risk Banding

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ordinal risk category derived from the disease probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    /// p < 0.25
    #[serde(rename = "Low Risk")]
    Low,
    /// 0.25 <= p < 0.50
    #[serde(rename = "Moderate Risk")]
    Moderate,
    /// 0.50 <= p < 0.75
    #[serde(rename = "High Risk")]
    High,
    /// p >= 0.75
    #[serde(rename = "Very High Risk")]
    VeryHigh,
}

impl RiskLevel {
    /// All levels, lowest first
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::Low,
        RiskLevel::Moderate,
        RiskLevel::High,
        RiskLevel::VeryHigh,
    ];

    /// Band a probability.
    ///
    /// Bands are half-open except the top one, which includes 1.0. The input is
    /// clamped to [0, 1]; NaN bands as `Low`.
    pub fn from_probability(probability: f64) -> Self {
        let p = if probability.is_nan() {
            0.0
        } else {
            probability.clamp(0.0, 1.0)
        };

        if p < 0.25 {
            RiskLevel::Low
        } else if p < 0.50 {
            RiskLevel::Moderate
        } else if p < 0.75 {
            RiskLevel::High
        } else {
            RiskLevel::VeryHigh
        }
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low Risk",
            RiskLevel::Moderate => "Moderate Risk",
            RiskLevel::High => "High Risk",
            RiskLevel::VeryHigh => "Very High Risk",
        }
    }

    /// Get recommended next step
    pub fn advice(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Keep up a heart-healthy lifestyle and routine checkups",
            RiskLevel::Moderate => "Discuss your risk factors with your doctor at your next visit",
            RiskLevel::High => "Schedule a consultation with your doctor soon",
            RiskLevel::VeryHigh => "Seek medical advice promptly",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RiskLevel::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown risk level '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_band_boundaries() {
        assert_eq!(RiskLevel::from_probability(0.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_probability(0.24999), RiskLevel::Low);
        assert_eq!(RiskLevel::from_probability(0.25), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_probability(0.4999), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_probability(0.5), RiskLevel::High);
        assert_eq!(RiskLevel::from_probability(0.7499), RiskLevel::High);
        assert_eq!(RiskLevel::from_probability(0.75), RiskLevel::VeryHigh);
        assert_eq!(RiskLevel::from_probability(1.0), RiskLevel::VeryHigh);
    }

    #[test]
    fn test_out_of_range_clamped() {
        assert_eq!(RiskLevel::from_probability(-0.3), RiskLevel::Low);
        assert_eq!(RiskLevel::from_probability(1.7), RiskLevel::VeryHigh);
        assert_eq!(RiskLevel::from_probability(f64::NAN), RiskLevel::Low);
    }

    #[test]
    fn test_labels_round_trip() {
        for level in RiskLevel::ALL {
            assert_eq!(level.as_str().parse::<RiskLevel>().unwrap(), level);
            assert_eq!(
                serde_json::to_string(&level).unwrap(),
                format!("\"{}\"", level.as_str())
            );
        }
        assert!("Extreme Risk".parse::<RiskLevel>().is_err());
    }

    proptest! {
        #[test]
        fn prop_band_monotonic(a in 0.0f64..=1.0, b in 0.0f64..=1.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(RiskLevel::from_probability(lo) <= RiskLevel::from_probability(hi));
        }

        #[test]
        fn prop_band_matches_table(p in 0.0f64..=1.0) {
            let expected = match p {
                p if p < 0.25 => RiskLevel::Low,
                p if p < 0.50 => RiskLevel::Moderate,
                p if p < 0.75 => RiskLevel::High,
                _ => RiskLevel::VeryHigh,
            };
            prop_assert_eq!(RiskLevel::from_probability(p), expected);
        }
    }
}
