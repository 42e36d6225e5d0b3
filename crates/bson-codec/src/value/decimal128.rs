//! IEEE 754-2008 decimal128 in the binary integer decimal (BID) encoding.
//!
//! Only the conversions to and from strings are implemented; arithmetic
//! is out of scope.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

const EXPONENT_BIAS: i32 = 6176;
const EXPONENT_MIN: i32 = -6176;
const EXPONENT_MAX: i32 = 6111;
const MAX_DIGITS: usize = 34;
const MAX_COEFFICIENT: u128 = 9_999_999_999_999_999_999_999_999_999_999_999;

const COMBINATION_INFINITY: u64 = 0x1e;
const COMBINATION_NAN: u64 = 0x1f;
const INFINITY_HIGH: u64 = 0x7800_0000_0000_0000;
const NAN_HIGH: u64 = 0x7c00_0000_0000_0000;
const COEFFICIENT_HIGH_MASK: u64 = 0x0001_ffff_ffff_ffff;

/// A 128-bit decimal, stored as its 16 little-endian wire bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Decimal128 {
    bytes: [u8; 16],
}

enum Decoded {
    NaN,
    Infinity { negative: bool },
    Finite { negative: bool, exponent: i32, coefficient: u128 },
}

impl Decimal128 {
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self { bytes }
    }

    pub const fn bytes(&self) -> [u8; 16] {
        self.bytes
    }

    pub fn nan() -> Self {
        Self::from_halves(NAN_HIGH, 0)
    }

    pub fn infinity(negative: bool) -> Self {
        Self::from_halves(INFINITY_HIGH | (u64::from(negative) << 63), 0)
    }

    pub fn is_nan(&self) -> bool {
        matches!(self.decode(), Decoded::NaN)
    }

    pub fn is_infinite(&self) -> bool {
        matches!(self.decode(), Decoded::Infinity { .. })
    }

    fn from_halves(high: u64, low: u64) -> Self {
        let mut bytes = [0u8; 16];
        bytes[0..8].copy_from_slice(&low.to_le_bytes());
        bytes[8..16].copy_from_slice(&high.to_le_bytes());
        Self { bytes }
    }

    fn halves(&self) -> (u64, u64) {
        let mut low = [0u8; 8];
        let mut high = [0u8; 8];
        low.copy_from_slice(&self.bytes[0..8]);
        high.copy_from_slice(&self.bytes[8..16]);
        (u64::from_le_bytes(high), u64::from_le_bytes(low))
    }

    fn decode(&self) -> Decoded {
        let (high, low) = self.halves();
        let negative = high >> 63 == 1;
        let combination = (high >> 58) & 0x1f;
        if combination == COMBINATION_NAN {
            return Decoded::NaN;
        }
        if combination == COMBINATION_INFINITY {
            return Decoded::Infinity { negative };
        }
        let (biased, coefficient) = if combination >> 3 == 3 {
            // Implied 0b100 coefficient prefix always exceeds the maximum.
            ((high >> 47) & 0x3fff, 0)
        } else {
            let coefficient = (u128::from(high & COEFFICIENT_HIGH_MASK) << 64) | u128::from(low);
            ((high >> 49) & 0x3fff, coefficient)
        };
        let coefficient = if coefficient > MAX_COEFFICIENT { 0 } else { coefficient };
        Decoded::Finite {
            negative,
            exponent: biased as i32 - EXPONENT_BIAS,
            coefficient,
        }
    }

    fn encode(negative: bool, exponent: i32, coefficient: u128) -> Self {
        let biased = (exponent + EXPONENT_BIAS) as u64;
        let high = (u64::from(negative) << 63) | (biased << 49) | (coefficient >> 64) as u64;
        Self::from_halves(high, coefficient as u64)
    }
}

impl fmt::Display for Decimal128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (negative, exponent, coefficient) = match self.decode() {
            Decoded::NaN => return f.write_str("NaN"),
            Decoded::Infinity { negative } => {
                return f.write_str(if negative { "-Infinity" } else { "Infinity" })
            }
            Decoded::Finite {
                negative,
                exponent,
                coefficient,
            } => (negative, exponent, coefficient),
        };
        if negative {
            f.write_str("-")?;
        }
        let digits = coefficient.to_string();
        let adjusted = exponent + digits.len() as i32 - 1;
        if exponent > 0 || adjusted < -6 {
            f.write_str(&digits[..1])?;
            if digits.len() > 1 {
                write!(f, ".{}", &digits[1..])?;
            }
            let sign = if adjusted < 0 { '-' } else { '+' };
            return write!(f, "E{sign}{}", adjusted.abs());
        }
        if exponent == 0 {
            return f.write_str(&digits);
        }
        let point = digits.len() as i32 + exponent;
        if point > 0 {
            let (whole, frac) = digits.split_at(point as usize);
            write!(f, "{whole}.{frac}")
        } else {
            write!(f, "0.{}{digits}", "0".repeat((-point) as usize))
        }
    }
}

impl fmt::Debug for Decimal128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Decimal128({self})")
    }
}

impl FromStr for Decimal128 {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::malformed(format!("cannot parse {s:?} as Decimal128"));

        let (negative, body) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };
        if body.eq_ignore_ascii_case("inf") || body.eq_ignore_ascii_case("infinity") {
            return Ok(Self::infinity(negative));
        }
        if body.eq_ignore_ascii_case("nan") {
            return Ok(Self::nan());
        }

        let (mantissa, exp_part) = match body.find(['e', 'E']) {
            Some(i) => (&body[..i], Some(&body[i + 1..])),
            None => (body, None),
        };
        let mut exponent: i32 = match exp_part {
            Some(e) => {
                let digits = e.strip_prefix(['+', '-']).unwrap_or(e);
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid());
                }
                e.parse::<i64>()
                    .map_err(|_| invalid())?
                    .clamp(-100_000, 100_000) as i32
            }
            None => 0,
        };

        let (whole, frac) = match mantissa.split_once('.') {
            Some((w, f)) => (w, f),
            None => (mantissa, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if !whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        exponent -= frac.len() as i32;

        let mut digits: Vec<u8> = whole
            .bytes()
            .chain(frac.bytes())
            .skip_while(|&b| b == b'0')
            .map(|b| b - b'0')
            .collect();

        while digits.len() > MAX_DIGITS && digits.last() == Some(&0) {
            digits.pop();
            exponent += 1;
        }
        if digits.len() > MAX_DIGITS {
            return Err(Error::malformed(format!(
                "{s:?} has more than {MAX_DIGITS} significant digits"
            )));
        }

        let mut coefficient = digits.iter().fold(0u128, |acc, &d| acc * 10 + u128::from(d));

        if coefficient == 0 {
            exponent = exponent.clamp(EXPONENT_MIN, EXPONENT_MAX);
            return Ok(Self::encode(negative, exponent, 0));
        }
        while exponent > EXPONENT_MAX && digits.len() < MAX_DIGITS {
            digits.push(0);
            coefficient *= 10;
            exponent -= 1;
        }
        if exponent > EXPONENT_MAX {
            return Err(Error::malformed(format!("{s:?} overflows Decimal128")));
        }
        while exponent < EXPONENT_MIN {
            if coefficient % 10 != 0 {
                return Err(Error::malformed(format!("{s:?} underflows Decimal128")));
            }
            coefficient /= 10;
            exponent += 1;
        }
        Ok(Self::encode(negative, exponent, coefficient))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(s: &str) -> String {
        s.parse::<Decimal128>().unwrap().to_string()
    }

    #[test]
    fn plain_notation() {
        assert_eq!(roundtrip("0"), "0");
        assert_eq!(roundtrip("-0"), "-0");
        assert_eq!(roundtrip("1"), "1");
        assert_eq!(roundtrip("12.34"), "12.34");
        assert_eq!(roundtrip("0.001"), "0.001");
        assert_eq!(roundtrip("-1.50"), "-1.50");
        assert_eq!(roundtrip("0.000001"), "0.000001");
    }

    #[test]
    fn scientific_notation() {
        assert_eq!(roundtrip("1E+3"), "1E+3");
        assert_eq!(roundtrip("0.0000001"), "1E-7");
        assert_eq!(roundtrip("1.23E-10"), "1.23E-10");
        assert_eq!(roundtrip("1000"), "1000");
    }

    #[test]
    fn specials() {
        assert_eq!(roundtrip("NaN"), "NaN");
        assert_eq!(roundtrip("Infinity"), "Infinity");
        assert_eq!(roundtrip("-inf"), "-Infinity");
        assert!(Decimal128::nan().is_nan());
        assert!(Decimal128::infinity(true).is_infinite());
    }

    #[test]
    fn wire_layout_of_one() {
        let one: Decimal128 = "1".parse().unwrap();
        let mut expected = [0u8; 16];
        expected[0] = 1;
        expected[14] = 0x40;
        expected[15] = 0x30;
        assert_eq!(one.bytes(), expected);
    }

    #[test]
    fn max_digits() {
        let s = "9999999999999999999999999999999999";
        assert_eq!(roundtrip(s), s);
        assert!("99999999999999999999999999999999999".parse::<Decimal128>().is_err());
        // Trailing zeros beyond the precision fold into the exponent.
        assert_eq!(
            roundtrip("10000000000000000000000000000000000"),
            "1.000000000000000000000000000000000E+34"
        );
    }

    #[test]
    fn rejects_garbage() {
        for s in ["", ".", "1..2", "abc", "1e", "--1", "1e+-2"] {
            assert!(s.parse::<Decimal128>().is_err(), "{s}");
        }
    }
}
