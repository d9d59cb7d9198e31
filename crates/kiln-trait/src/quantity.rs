//! Kubernetes resource quantity parsing
//!
//! Accepts the same grammar as the API server: an optional sign, a decimal
//! number, then a binary SI suffix (`Ki`..`Ei`), a decimal SI suffix
//! (`n`, `u`, `m`, `k`, `M`..`E`), or a decimal exponent (`e3`, `E-2`).
//! Values are tracked in milli-units, rounded up in magnitude.

use std::str::FromStr;

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

/// Maximum number of significant digits accepted before overflow checks
const MAX_DIGITS: usize = 30;

/// Errors produced while parsing a quantity
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum QuantityError {
    /// Input was empty
    #[error("quantity is empty")]
    Empty,

    /// The numeric part is malformed
    #[error("invalid number in quantity '{0}'")]
    InvalidNumber(String),

    /// The suffix is not a recognised unit or exponent
    #[error("unknown suffix '{suffix}' in quantity '{quantity}'")]
    InvalidSuffix {
        /// Full input
        quantity: String,
        /// Offending suffix
        suffix: String,
    },

    /// The value does not fit the supported range
    #[error("quantity '{0}' is out of range")]
    OutOfRange(String),
}

/// A validated resource quantity
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedQuantity {
    raw: String,
    milli_value: i128,
}

impl ParsedQuantity {
    /// Value in thousandths of a unit (e.g., "500m" -> 500, "1" -> 1000)
    pub fn milli_value(&self) -> i128 {
        self.milli_value
    }

    /// The quantity as written, for embedding in a resource list
    pub fn to_quantity(&self) -> Quantity {
        Quantity(self.raw.clone())
    }
}

impl FromStr for ParsedQuantity {
    type Err = QuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_quantity(s)
    }
}

impl std::fmt::Display for ParsedQuantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// How the suffix scales the number
enum Scale {
    Binary(u32),
    Decimal(i32),
}

/// Parse a Kubernetes quantity string.
pub fn parse_quantity(input: &str) -> Result<ParsedQuantity, QuantityError> {
    if input.is_empty() {
        return Err(QuantityError::Empty);
    }

    let (negative, unsigned) = match input.as_bytes()[0] {
        b'-' => (true, &input[1..]),
        b'+' => (false, &input[1..]),
        _ => (false, input),
    };

    let number_len = unsigned
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(unsigned.len());
    let (number, suffix) = unsigned.split_at(number_len);

    let (mantissa, fraction_digits) = parse_decimal(number)
        .ok_or_else(|| QuantityError::InvalidNumber(input.to_string()))?;

    let scale = parse_suffix(suffix).ok_or_else(|| QuantityError::InvalidSuffix {
        quantity: input.to_string(),
        suffix: suffix.to_string(),
    })?;

    let out_of_range = || QuantityError::OutOfRange(input.to_string());
    let magnitude = match scale {
        Scale::Binary(shift) => {
            let numerator = mantissa
                .checked_mul(1000)
                .and_then(|v| v.checked_mul(1i128.checked_shl(shift)?))
                .ok_or_else(out_of_range)?;
            let divisor = 10i128.checked_pow(fraction_digits).ok_or_else(out_of_range)?;
            ceil_div(numerator, divisor)
        }
        Scale::Decimal(exponent) => {
            // three extra decimal places for milli-units
            let shift = i64::from(exponent) + 3 - i64::from(fraction_digits);
            if shift >= 0 {
                let factor = u32::try_from(shift)
                    .ok()
                    .and_then(|s| 10i128.checked_pow(s))
                    .ok_or_else(out_of_range)?;
                mantissa.checked_mul(factor).ok_or_else(out_of_range)?
            } else {
                match u32::try_from(-shift).ok().and_then(|s| 10i128.checked_pow(s)) {
                    Some(divisor) => ceil_div(mantissa, divisor),
                    // smaller than any representable milli-unit
                    None => i128::from(mantissa > 0),
                }
            }
        }
    };

    Ok(ParsedQuantity {
        raw: input.to_string(),
        milli_value: if negative { -magnitude } else { magnitude },
    })
}

/// Split "12.50" into (1250, 2). Requires at least one digit and at most one dot.
fn parse_decimal(number: &str) -> Option<(i128, u32)> {
    let (integer, fraction) = match number.split_once('.') {
        Some((i, f)) => (i, f),
        None => (number, ""),
    };
    if fraction.contains('.') || (integer.is_empty() && fraction.is_empty()) {
        return None;
    }
    let digits = format!("{integer}{fraction}");
    if digits.len() > MAX_DIGITS {
        return None;
    }
    let mantissa = digits.parse::<i128>().ok()?;
    Some((mantissa, fraction.len() as u32))
}

fn parse_suffix(suffix: &str) -> Option<Scale> {
    let binary = |shift| Some(Scale::Binary(shift));
    let decimal = |exp| Some(Scale::Decimal(exp));
    match suffix {
        "Ki" => binary(10),
        "Mi" => binary(20),
        "Gi" => binary(30),
        "Ti" => binary(40),
        "Pi" => binary(50),
        "Ei" => binary(60),
        "n" => decimal(-9),
        "u" => decimal(-6),
        "m" => decimal(-3),
        "" => decimal(0),
        "k" => decimal(3),
        "M" => decimal(6),
        "G" => decimal(9),
        "T" => decimal(12),
        "P" => decimal(15),
        "E" => decimal(18),
        _ => {
            let exponent = suffix
                .strip_prefix('e')
                .or_else(|| suffix.strip_prefix('E'))?;
            let valid = !exponent.is_empty()
                && exponent
                    .trim_start_matches(['+', '-'])
                    .chars()
                    .all(|c| c.is_ascii_digit());
            if !valid {
                return None;
            }
            let exponent = exponent.parse::<i32>().ok()?;
            Some(Scale::Decimal(exponent))
        }
    }
}

fn ceil_div(numerator: i128, divisor: i128) -> i128 {
    let quotient = numerator / divisor;
    if numerator % divisor == 0 {
        quotient
    } else {
        quotient + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MI: i128 = 1024 * 1024 * 1000;

    #[test]
    fn test_millicpu() {
        let q = parse_quantity("500m").unwrap();
        assert_eq!(q.milli_value(), 500);
    }

    #[test]
    fn test_binary_memory() {
        let q = parse_quantity("256Mi").unwrap();
        assert_eq!(q.milli_value(), 256 * MI);
        assert_eq!(q.to_quantity(), Quantity("256Mi".to_string()));
    }

    #[test]
    fn test_plain_and_fractional() {
        assert_eq!(parse_quantity("2").unwrap().milli_value(), 2000);
        assert_eq!(parse_quantity("0.5").unwrap().milli_value(), 500);
        assert_eq!(parse_quantity(".25").unwrap().milli_value(), 250);
        assert_eq!(parse_quantity("1.5Gi").unwrap().milli_value(), 1536 * MI);
    }

    #[test]
    fn test_decimal_suffixes() {
        assert_eq!(parse_quantity("1k").unwrap().milli_value(), 1_000_000);
        assert_eq!(parse_quantity("128M").unwrap().milli_value(), 128_000_000_000);
        assert_eq!(parse_quantity("1G").unwrap().milli_value(), 1_000_000_000_000);
    }

    #[test]
    fn test_exponent_notation() {
        assert_eq!(parse_quantity("1e3").unwrap().milli_value(), 1_000_000);
        assert_eq!(parse_quantity("15E-1").unwrap().milli_value(), 1500);
    }

    #[test]
    fn test_sub_milli_rounds_up() {
        assert_eq!(parse_quantity("0.1m").unwrap().milli_value(), 1);
        assert_eq!(parse_quantity("1n").unwrap().milli_value(), 1);
    }

    #[test]
    fn test_signs() {
        assert_eq!(parse_quantity("-1").unwrap().milli_value(), -1000);
        assert_eq!(parse_quantity("+100m").unwrap().milli_value(), 100);
    }

    #[test]
    fn test_rejects_malformed() {
        assert_eq!(parse_quantity(""), Err(QuantityError::Empty));
        assert!(matches!(
            parse_quantity("not-a-number"),
            Err(QuantityError::InvalidNumber(_))
        ));
        assert!(matches!(
            parse_quantity("1.2.3"),
            Err(QuantityError::InvalidNumber(_))
        ));
        assert!(matches!(
            parse_quantity("10Qi"),
            Err(QuantityError::InvalidSuffix { .. })
        ));
        assert!(matches!(
            parse_quantity("1e"),
            Err(QuantityError::InvalidSuffix { .. })
        ));
        assert!(matches!(
            parse_quantity("1 Gi"),
            Err(QuantityError::InvalidSuffix { .. })
        ));
    }

    #[test]
    fn test_out_of_range() {
        assert!(matches!(
            parse_quantity("1e40"),
            Err(QuantityError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_from_str_and_display() {
        let q: ParsedQuantity = "750m".parse().unwrap();
        assert_eq!(q.to_string(), "750m");
    }
}
