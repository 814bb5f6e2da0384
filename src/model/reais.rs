//! Display formatting for amounts in Brazilian reais.

use std::fmt;
use std::fmt::{Display, Formatter};

/// Formats an `f64` as an amount in reais, e.g. `R$ 1.234,56` or `R$ -0,50`.
///
/// Only the display form uses `.` for thousands and `,` for decimals. The wrapped number is never
/// altered.
///
/// ```
/// # use drive_ledger::model::Reais;
/// assert_eq!(Reais(1234.5).to_string(), "R$ 1.234,50");
/// assert_eq!(Reais(-1234567.891).to_string(), "R$ -1.234.567,89");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Reais(pub f64);

impl Display for Reais {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let grouped = format_num::format_num!(",.2", self.0.abs());
        let sign = if self.0 < 0.0 && grouped.chars().any(|c| ('1'..='9').contains(&c)) {
            "-"
        } else {
            ""
        };
        let swapped: String = grouped
            .chars()
            .map(|c| match c {
                ',' => '.',
                '.' => ',',
                other => other,
            })
            .collect();
        write!(f, "R$ {sign}{swapped}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_amount() {
        assert_eq!(Reais(150.0).to_string(), "R$ 150,00");
    }

    #[test]
    fn test_zero() {
        assert_eq!(Reais(0.0).to_string(), "R$ 0,00");
    }

    #[test]
    fn test_thousands() {
        assert_eq!(Reais(1000.0).to_string(), "R$ 1.000,00");
        assert_eq!(Reais(1234567.8).to_string(), "R$ 1.234.567,80");
    }

    #[test]
    fn test_negative() {
        assert_eq!(Reais(-75.5).to_string(), "R$ -75,50");
        assert_eq!(Reais(-60000.0).to_string(), "R$ -60.000,00");
    }

    #[test]
    fn test_negative_rounding_to_zero_has_no_sign() {
        assert_eq!(Reais(-0.001).to_string(), "R$ 0,00");
    }

    #[test]
    fn test_rounding() {
        assert_eq!(Reais(0.125 + 0.001).to_string(), "R$ 0,13");
    }
}
