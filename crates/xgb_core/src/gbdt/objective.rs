//! Learning objectives
//!
//! Names follow the `xgboost` objective strings so hyperparameters passed to a
//! training container keep their meaning.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Probabilities are clamped away from 0 and 1 before taking a logit.
const PROB_EPS: f64 = 1e-7;

/// Minimum hessian for logistic losses so leaf weights stay bounded.
const MIN_HESSIAN: f64 = 1e-16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Objective {
    /// Squared error regression, identity output
    #[default]
    SquaredError,
    /// Logistic regression on targets in [0, 1], sigmoid output
    Logistic,
    /// Binary classification on {0, 1} labels, sigmoid output
    BinaryLogistic,
}

impl Objective {
    pub const ALL: [Objective; 3] = [
        Objective::SquaredError,
        Objective::Logistic,
        Objective::BinaryLogistic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Objective::SquaredError => "reg:squarederror",
            Objective::Logistic => "reg:logistic",
            Objective::BinaryLogistic => "binary:logistic",
        }
    }

    /// Map a raw margin to the output space
    pub fn transform(&self, margin: f64) -> f64 {
        match self {
            Objective::SquaredError => margin,
            Objective::Logistic | Objective::BinaryLogistic => sigmoid(margin),
        }
    }

    /// First and second order gradient of the loss at `margin`
    pub fn gradient(&self, margin: f64, label: f64) -> (f64, f64) {
        match self {
            Objective::SquaredError => (margin - label, 1.0),
            Objective::Logistic | Objective::BinaryLogistic => {
                let p = sigmoid(margin);
                (p - label, (p * (1.0 - p)).max(MIN_HESSIAN))
            }
        }
    }

    /// Initial margin from the label mean
    pub fn base_margin(&self, label_mean: f64) -> f64 {
        match self {
            Objective::SquaredError => label_mean,
            Objective::Logistic | Objective::BinaryLogistic => {
                let p = label_mean.clamp(PROB_EPS, 1.0 - PROB_EPS);
                (p / (1.0 - p)).ln()
            }
        }
    }

    /// Check a label is admissible for this objective
    pub fn check_label(&self, label: f64) -> Result<(), String> {
        match self {
            Objective::SquaredError => Ok(()),
            Objective::Logistic if (0.0..=1.0).contains(&label) => Ok(()),
            Objective::BinaryLogistic if label == 0.0 || label == 1.0 => Ok(()),
            Objective::Logistic => Err(format!("label {label} outside [0, 1] for {self}")),
            Objective::BinaryLogistic => Err(format!("label {label} is not 0 or 1 for {self}")),
        }
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Objective {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Objective::ALL
            .into_iter()
            .find(|objective| objective.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = Objective::ALL.iter().map(|o| o.as_str()).collect();
                format!("unknown objective '{s}', expected one of: {}", known.join(", "))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_objectives() {
        for objective in Objective::ALL {
            assert_eq!(objective.as_str().parse::<Objective>(), Ok(objective));
        }
        assert!("multi:softmax".parse::<Objective>().is_err());
    }

    #[test]
    fn test_squared_error_gradient() {
        assert_eq!(Objective::SquaredError.gradient(3.0, 1.0), (2.0, 1.0));
        assert_eq!(Objective::SquaredError.transform(-4.0), -4.0);
    }

    #[test]
    fn test_logistic_base_margin_round_trips_through_sigmoid() {
        let margin = Objective::Logistic.base_margin(0.25);
        assert!((Objective::Logistic.transform(margin) - 0.25).abs() < 1e-12);

        // Degenerate means stay finite
        assert!(Objective::BinaryLogistic.base_margin(0.0).is_finite());
        assert!(Objective::BinaryLogistic.base_margin(1.0).is_finite());
    }

    #[test]
    fn test_label_checks() {
        assert!(Objective::SquaredError.check_label(-12.0).is_ok());
        assert!(Objective::Logistic.check_label(0.4).is_ok());
        assert!(Objective::Logistic.check_label(1.4).is_err());
        assert!(Objective::BinaryLogistic.check_label(1.0).is_ok());
        assert!(Objective::BinaryLogistic.check_label(0.5).is_err());
    }
}
