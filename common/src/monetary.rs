//! Monetary types for the ATM ledger.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::fmt;

use crate::LedgerError;

/// Number of fractional digits every balance and amount is held at.
pub const MONEY_SCALE: u32 = 2;

/// Quantize to exactly two fractional digits, rounding half away from zero.
///
/// The result always carries scale 2, so `250` becomes `250.00`.
pub fn quantize(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// Number of fractional digits a parsed literal keeps before quantizing.
///
/// Half-up rounding to [`MONEY_SCALE`] places depends only on the first digit
/// past it, so one more is enough. Anything nonzero beyond that is folded into
/// a single trailing `1`, which keeps the sign and the rounding direction.
const PARSE_SCALE: usize = MONEY_SCALE as usize + 1;

/// Integer digits in `Decimal::MAX`.
const MAX_INTEGER_DIGITS: i64 = 29;

/// An amount of money supplied as strictly positive, held quantized to two
/// places.
///
/// This is the only amount type the ledger accepts for credits and debits, so
/// a value of this type has already passed every amount validation rule. A
/// positive input below half a cent quantizes to `0.00` and is still accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Amount(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl Amount {
    /// Accept `value` if it is greater than zero, then quantize it.
    pub fn new(value: Decimal) -> Result<Self, LedgerError> {
        if value > Decimal::ZERO {
            Ok(Self(quantize(value)))
        } else {
            Err(LedgerError::NonPositiveAmount(value))
        }
    }

    /// Parse a textual amount.
    ///
    /// Accepts plain (`"12.5"`, `".5"`, `"+3"`) and scientific (`"1e3"`,
    /// `"2.5E-1"`) notation with surrounding whitespace. Anything that is not a
    /// decimal literal is `NonNumericAmount`; a literal that does not fit the
    /// decimal range is `AmountOutOfRange`.
    pub fn parse(raw: &str) -> Result<Self, LedgerError> {
        let literal = DecimalLiteral::split(raw.trim())
            .ok_or_else(|| LedgerError::NonNumericAmount(raw.to_string()))?;

        let value = literal
            .to_decimal()
            .ok_or_else(|| LedgerError::AmountOutOfRange(raw.to_string()))?;

        Self::new(value)
    }

    /// Get the quantized decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

/// Syntactic pieces of a decimal literal.
struct DecimalLiteral<'a> {
    negative: bool,
    integer: &'a str,
    fraction: &'a str,
    exponent: Option<&'a str>,
}

impl<'a> DecimalLiteral<'a> {
    fn split(s: &'a str) -> Option<Self> {
        let (negative, unsigned) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };

        let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
            Some(pos) => (&unsigned[..pos], Some(&unsigned[pos + 1..])),
            None => (unsigned, None),
        };
        let (integer, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));

        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if (integer.is_empty() && fraction.is_empty()) || !all_digits(integer) || !all_digits(fraction) {
            return None;
        }
        if let Some(exp) = exponent {
            let digits = exp.strip_prefix(['+', '-']).unwrap_or(exp);
            if digits.is_empty() || !all_digits(digits) {
                return None;
            }
        }

        Some(Self {
            negative,
            integer,
            fraction,
            exponent,
        })
    }

    /// Convert to a `Decimal` without any intermediate rounding.
    ///
    /// The exponent is applied by moving the decimal point in the digit
    /// string, and fractional digits past [`PARSE_SCALE`] collapse into a
    /// sticky digit. `None` means the integer part does not fit.
    fn to_decimal(&self) -> Option<Decimal> {
        let exponent: i64 = match self.exponent {
            Some(exp) => exp.parse().ok()?,
            None => 0,
        };

        let digits = format!("{}{}", self.integer, self.fraction);
        let significant = digits.trim_start_matches('0');
        if significant.is_empty() {
            return Some(Decimal::ZERO);
        }

        // Position of the decimal point within `significant`.
        let leading_zeros = (digits.len() - significant.len()) as i64;
        let point = (self.integer.len() as i64)
            .checked_add(exponent)?
            .checked_sub(leading_zeros)?;
        if point > MAX_INTEGER_DIGITS {
            return None;
        }

        let mut canonical = String::new();
        if self.negative {
            canonical.push('-');
        }

        let fraction_start = if point > 0 {
            let point = point as usize;
            let whole = &significant[..point.min(significant.len())];
            canonical.push_str(whole);
            canonical.extend(std::iter::repeat('0').take(point - whole.len()));
            whole.len()
        } else {
            canonical.push('0');
            0
        };

        let pad = usize::try_from(point.min(0).unsigned_abs()).unwrap_or(usize::MAX);
        let rest = &significant[fraction_start..];
        let mut fraction = String::with_capacity(PARSE_SCALE + 1);
        let sticky = if pad >= PARSE_SCALE {
            fraction.push_str(&"0".repeat(PARSE_SCALE));
            !rest.is_empty()
        } else if rest.is_empty() {
            false
        } else {
            fraction.push_str(&"0".repeat(pad));
            let kept = rest.len().min(PARSE_SCALE - pad);
            fraction.push_str(&rest[..kept]);
            rest[kept..].bytes().any(|b| b != b'0')
        };
        if sticky {
            fraction.push('1');
        }
        if !fraction.is_empty() {
            canonical.push('.');
            canonical.push_str(&fraction);
        }

        Decimal::from_str_exact(&canonical).ok()
    }
}
