//! Feature Engineering Engine
//!
//! Turns clinical measurements, submitted through a validated form or a raw
//! JSON payload, into the fixed-order numeric vector the risk classifier expects.

mod error;
mod features;
mod input;

pub use error::FeatureError;
pub use features::{flag_value, FeatureVector, FEATURE_DIMENSION, FEATURE_NAMES};
pub use input::{ApiPayload, ClinicalInput};
