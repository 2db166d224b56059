//! Feature Vector Assembly

use crate::input::ClinicalInput;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Number of features in the vector (the 13-column Cleveland layout)
pub const FEATURE_DIMENSION: usize = 13;

/// Column names, in vector order
pub const FEATURE_NAMES: [&str; FEATURE_DIMENSION] = [
    "age", "sex", "cp", "trestbps", "chol", "fbs", "restecg", "thalach", "exang", "oldpeak",
    "slope", "ca", "thal",
];

/// Feature vector for risk inference
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Raw feature values, ordered as [`FEATURE_NAMES`]
    pub values: [f64; FEATURE_DIMENSION],
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self {
            values: [0.0; FEATURE_DIMENSION],
        }
    }
}

impl FeatureVector {
    /// Assemble the vector from clinical input.
    ///
    /// Slope, CA and Thal are not collected from users and stay at zero.
    pub fn from_input(input: &ClinicalInput) -> Self {
        let mut values = [0.0; FEATURE_DIMENSION];
        let mut idx = 0;

        values[idx] = input.age as f64; idx += 1;
        values[idx] = flag_value(&input.sex); idx += 1;
        values[idx] = input.cp as f64; idx += 1;
        values[idx] = input.trestbps as f64; idx += 1;
        values[idx] = input.chol as f64; idx += 1;
        values[idx] = flag_value(&input.fbs); idx += 1;
        values[idx] = input.restecg as f64; idx += 1;
        values[idx] = input.thalach as f64; idx += 1;
        values[idx] = flag_value(&input.exang); idx += 1;
        values[idx] = input.oldpeak;

        debug!("Assembled feature vector: {:?}", values);

        Self { values }
    }

    /// Look up a feature by column name
    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| self.values[i])
    }

    /// Values as f32, for model runtimes that take single precision
    pub fn to_f32(&self) -> Vec<f32> {
        self.values.iter().map(|v| *v as f32).collect()
    }
}

/// Flag coding: the literal "1" is true, anything else is false
pub fn flag_value(code: &str) -> f64 {
    if code == "1" {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_input() -> ClinicalInput {
        ClinicalInput {
            age: 55,
            sex: "1".to_string(),
            cp: 2,
            trestbps: 130,
            chol: 250,
            fbs: "0".to_string(),
            restecg: 0,
            thalach: 150,
            exang: "0".to_string(),
            oldpeak: 1.5,
        }
    }

    #[test]
    fn test_vector_layout() {
        let features = FeatureVector::from_input(&sample_input());
        assert_eq!(
            features.values,
            [55.0, 1.0, 2.0, 130.0, 250.0, 0.0, 0.0, 150.0, 0.0, 1.5, 0.0, 0.0, 0.0]
        );
        assert_eq!(features.get("thalach"), Some(150.0));
        assert_eq!(features.get("unknown"), None);
    }

    #[test]
    fn test_flag_positions() {
        let mut input = sample_input();
        input.sex = "0".to_string();
        input.fbs = "1".to_string();
        input.exang = "1".to_string();

        let features = FeatureVector::from_input(&input);
        assert_eq!(features.values[1], 0.0);
        assert_eq!(features.values[5], 1.0);
        assert_eq!(features.values[8], 1.0);
    }

    #[test]
    fn test_flag_only_literal_one() {
        assert_eq!(flag_value("1"), 1.0);
        for other in ["0", "", "true", "yes", " 1", "01", "male"] {
            assert_eq!(flag_value(other), 0.0, "{other:?} should be false");
        }
    }

    proptest! {
        #[test]
        fn prop_trailing_slots_zero(
            age in 0i64..150,
            sex in "[0-9a-z]{0,3}",
            chol in 0i64..700,
            oldpeak in 0.0f64..10.0,
        ) {
            let input = ClinicalInput { age, sex: sex.clone(), chol, oldpeak, ..sample_input() };
            let features = FeatureVector::from_input(&input);
            prop_assert_eq!(&features.values[10..], &[0.0, 0.0, 0.0]);
            prop_assert_eq!(features.values[1], if sex == "1" { 1.0 } else { 0.0 });
        }
    }
}
