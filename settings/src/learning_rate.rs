use std::fmt;

use crate::{ConfigErr, Result, raw::RawLearningRate};

/// Markers accepted in place of a numeric learning rate.
const SECOND_ORDER_MARKERS: [&str; 3] = ["second_order", "second-order", "newton"];

/// How the coordinator turns an aggregated gradient into the next model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LearningRate {
    /// Plain gradient descent with a fixed positive step.
    Fixed(f64),
    /// Newton's method, participants must also ship their Hessians.
    SecondOrder,
}

impl fmt::Display for LearningRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(eta) => write!(f, "{eta}"),
            Self::SecondOrder => f.write_str("second_order"),
        }
    }
}

impl TryFrom<RawLearningRate> for LearningRate {
    type Error = ConfigErr;

    fn try_from(value: RawLearningRate) -> Result<Self> {
        match value {
            RawLearningRate::Number(eta) if eta.is_finite() && eta > 0. => Ok(Self::Fixed(eta)),
            RawLearningRate::Number(eta) => Err(ConfigErr::InvalidLearningRate(eta.to_string())),
            RawLearningRate::Marker(marker) => {
                let normalized = marker.trim().to_ascii_lowercase();

                if SECOND_ORDER_MARKERS.contains(&normalized.as_str()) {
                    return Ok(Self::SecondOrder);
                }

                // Numbers written as strings are still numbers.
                match normalized.parse::<f64>() {
                    Ok(eta) => Self::try_from(RawLearningRate::Number(eta)),
                    Err(_) => Err(ConfigErr::InvalidLearningRate(format!("\"{marker}\""))),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers() {
        for marker in ["second_order", "Newton", " second-order "] {
            let lr = LearningRate::try_from(RawLearningRate::Marker(marker.into())).unwrap();
            assert_eq!(lr, LearningRate::SecondOrder);
        }
    }

    #[test]
    fn numeric_string() {
        let lr = LearningRate::try_from(RawLearningRate::Marker("0.5".into())).unwrap();
        assert_eq!(lr, LearningRate::Fixed(0.5));
    }

    #[test]
    fn rejects_non_positive() {
        for eta in [0., -1., f64::NAN, f64::INFINITY] {
            assert!(LearningRate::try_from(RawLearningRate::Number(eta)).is_err());
        }

        assert!(LearningRate::try_from(RawLearningRate::Marker("fast".into())).is_err());
    }

    #[test]
    fn displays_as_written_in_configuration() {
        assert_eq!(LearningRate::Fixed(0.25).to_string(), "0.25");
        assert_eq!(LearningRate::SecondOrder.to_string(), "second_order");

        let lr = LearningRate::try_from(RawLearningRate::Marker(LearningRate::SecondOrder.to_string()));
        assert_eq!(lr.unwrap(), LearningRate::SecondOrder);
    }
}
