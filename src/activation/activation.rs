use serde::{Serialize, Deserialize};
use std::fmt;
use std::str::FromStr;

use crate::error::NnError;

/// Slope of `ReLU` for negative inputs.
pub const RELU_LEAK: f64 = 0.01;

/// Element-wise nonlinearity shared by every layer of a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationFunction {
    Sigmoid,
    /// Leaky ReLU with slope [`RELU_LEAK`] below zero.
    ReLU,
    Tanh,
    Sin,
}

impl ActivationFunction {
    pub fn function(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            ActivationFunction::ReLU => if x > 0.0 { x } else { RELU_LEAK * x },
            ActivationFunction::Tanh => x.tanh(),
            ActivationFunction::Sin => x.sin(),
        }
    }

    /// Derivative expressed through the activated value `y = function(x)`,
    /// which is what backprop has at hand.
    pub fn derivative(&self, y: f64) -> f64 {
        match self {
            ActivationFunction::Sigmoid => y * (1.0 - y),
            ActivationFunction::ReLU => if y >= 0.0 { 1.0 } else { RELU_LEAK },
            ActivationFunction::Tanh => 1.0 - y * y,
            ActivationFunction::Sin => y.asin().cos(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            ActivationFunction::Sigmoid => "sigmoid",
            ActivationFunction::ReLU => "relu",
            ActivationFunction::Tanh => "tanh",
            ActivationFunction::Sin => "sin",
        }
    }
}

impl fmt::Display for ActivationFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ActivationFunction {
    type Err = NnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sigmoid" => Ok(ActivationFunction::Sigmoid),
            "relu" => Ok(ActivationFunction::ReLU),
            "tanh" => Ok(ActivationFunction::Tanh),
            "sin" => Ok(ActivationFunction::Sin),
            _ => Err(NnError::UnknownActivation(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-12;

    fn numeric_slope(act: ActivationFunction, x: f64) -> f64 {
        let h = 1e-6;
        (act.function(x + h) - act.function(x - h)) / (2.0 * h)
    }

    #[test]
    fn sigmoid_at_zero() {
        let act = ActivationFunction::Sigmoid;
        assert!((act.function(0.0) - 0.5).abs() < EPSILON);
        assert!((act.derivative(0.5) - 0.25).abs() < EPSILON);
    }

    #[test]
    fn relu_leaks_below_zero() {
        let act = ActivationFunction::ReLU;
        assert_eq!(act.function(3.0), 3.0);
        assert!((act.function(-2.0) + 0.02).abs() < EPSILON);
        assert_eq!(act.derivative(act.function(3.0)), 1.0);
        assert_eq!(act.derivative(act.function(-2.0)), RELU_LEAK);
    }

    #[test]
    fn derivatives_match_slopes_of_the_functions() {
        for act in [
            ActivationFunction::Sigmoid,
            ActivationFunction::ReLU,
            ActivationFunction::Tanh,
            ActivationFunction::Sin,
        ] {
            for x in [-1.2, -0.3, 0.4, 1.1] {
                let analytic = act.derivative(act.function(x));
                assert!(
                    (analytic - numeric_slope(act, x)).abs() < 1e-6,
                    "{act} at {x}: {analytic} vs {}",
                    numeric_slope(act, x)
                );
            }
        }
    }

    #[test]
    fn parses_known_selectors() {
        assert_eq!("Sigmoid".parse::<ActivationFunction>().unwrap(), ActivationFunction::Sigmoid);
        assert_eq!(" relu ".parse::<ActivationFunction>().unwrap(), ActivationFunction::ReLU);
        assert_eq!(ActivationFunction::Tanh.to_string(), "tanh");
    }

    #[test]
    fn rejects_unknown_selector() {
        match "softplus".parse::<ActivationFunction>() {
            Err(NnError::UnknownActivation(name)) => assert_eq!(name, "softplus"),
            other => panic!("expected UnknownActivation, got {other:?}"),
        }
    }

    #[test]
    fn serializes_as_lowercase_name() {
        let json = serde_json::to_string(&ActivationFunction::ReLU).unwrap();
        assert_eq!(json, "\"relu\"");
        let back: ActivationFunction = serde_json::from_str("\"sin\"").unwrap();
        assert_eq!(back, ActivationFunction::Sin);
    }
}
