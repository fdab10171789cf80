use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sign {
    Positive,
    Negative,
}

/// Value with an explicit sign, used for sign-aware threshold comparisons.
///
/// Zero counts as positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignedValue {
    pub sign: Sign,
    pub magnitude: f64,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid signed value {0:?}")]
pub struct SignedValueError(pub String);

impl SignedValue {
    pub fn from_f64(value: f64) -> Self {
        let sign = if value < 0.0 { Sign::Negative } else { Sign::Positive };
        Self { sign, magnitude: value.abs() }
    }

    pub fn value(&self) -> f64 {
        match self.sign {
            Sign::Positive => self.magnitude,
            Sign::Negative => -self.magnitude,
        }
    }

    /// `other` has the same sign and a strictly larger magnitude.
    pub fn exceeded_by(&self, other: SignedValue) -> bool {
        self.sign == other.sign && other.magnitude > self.magnitude
    }
}

impl FromStr for SignedValue {
    type Err = SignedValueError;

    /// Accepts `+1.5`, `-2`, `1.5` (unsigned = positive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (sign, rest) = match trimmed.chars().next() {
            Some('-') => (Sign::Negative, &trimmed[1..]),
            Some('+') => (Sign::Positive, &trimmed[1..]),
            _ => (Sign::Positive, trimmed),
        };
        let magnitude: f64 = rest
            .trim()
            .parse()
            .map_err(|_| SignedValueError(s.to_string()))?;
        if !magnitude.is_finite() || magnitude < 0.0 {
            return Err(SignedValueError(s.to_string()));
        }
        Ok(Self { sign, magnitude })
    }
}

impl fmt::Display for SignedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.sign {
            Sign::Positive => '+',
            Sign::Negative => '-',
        };
        write!(f, "{prefix}{:.2}", self.magnitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prefixed_thresholds() {
        let t: SignedValue = "+1.5".parse().unwrap();
        assert_eq!(t, SignedValue { sign: Sign::Positive, magnitude: 1.5 });
        let t: SignedValue = " -2 ".parse().unwrap();
        assert_eq!(t, SignedValue { sign: Sign::Negative, magnitude: 2.0 });
        let t: SignedValue = "0.75".parse().unwrap();
        assert_eq!(t.sign, Sign::Positive);
        assert!("--1".parse::<SignedValue>().is_err());
        assert!("abc".parse::<SignedValue>().is_err());
    }

    #[test]
    fn comparison_is_sign_aware() {
        let pos: SignedValue = "+1.0".parse().unwrap();
        let neg: SignedValue = "-1.0".parse().unwrap();
        assert!(pos.exceeded_by(SignedValue::from_f64(1.5)));
        assert!(!pos.exceeded_by(SignedValue::from_f64(-1.5)));
        assert!(neg.exceeded_by(SignedValue::from_f64(-1.5)));
        assert!(!neg.exceeded_by(SignedValue::from_f64(1.5)));
        assert!(!neg.exceeded_by(SignedValue::from_f64(-1.0)));
    }

    #[test]
    fn zero_is_positive() {
        assert_eq!(SignedValue::from_f64(0.0).sign, Sign::Positive);
        assert_eq!(SignedValue::from_f64(-0.0).sign, Sign::Positive);
    }
}
