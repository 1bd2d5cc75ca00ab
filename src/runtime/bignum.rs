//! Arbitrary precision decimal numbers
//!
//! A `BigDecimal` is an integer mantissa scaled by a power of ten:
//! `mantissa * 10^-scale`. Addition, subtraction and multiplication are exact;
//! division rounds half away from zero to [`DIV_SCALE`] fractional digits.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use num_bigint::{BigInt, Sign};
use num_traits::{Signed, ToPrimitive, Zero};

use crate::error::{Error, Result};

/// Fractional digits kept by division
pub const DIV_SCALE: u32 = 50;

/// Arbitrary precision decimal value
#[derive(Debug, Clone)]
pub struct BigDecimal {
    mantissa: BigInt,
    scale: u32,
}

fn pow10(n: u32) -> BigInt {
    BigInt::from(10u32).pow(n)
}

impl BigDecimal {
    /// Build from raw parts; the result is normalized
    pub fn new(mantissa: BigInt, scale: u32) -> Self {
        BigDecimal { mantissa, scale }.normalized()
    }

    /// Zero
    pub fn zero() -> Self {
        BigDecimal {
            mantissa: BigInt::zero(),
            scale: 0,
        }
    }

    /// Convert a float through its shortest decimal representation
    pub fn from_f64(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(Error::InvalidBigNumber(value.to_string()));
        }
        format!("{}", value).parse()
    }

    /// Nearest float; very large magnitudes become infinite
    pub fn to_f64(&self) -> f64 {
        self.to_string().parse().unwrap_or(f64::NAN)
    }

    /// Whether the value is zero
    pub fn is_zero(&self) -> bool {
        self.mantissa.is_zero()
    }

    /// Whether the value has no fractional part
    pub fn is_integer(&self) -> bool {
        self.scale == 0
    }

    /// Truncated integer value, if it fits in an `i64`
    pub fn to_i64(&self) -> Option<i64> {
        (&self.mantissa / pow10(self.scale)).to_i64()
    }

    fn normalized(mut self) -> Self {
        if self.mantissa.is_zero() {
            self.scale = 0;
            return self;
        }
        let ten = BigInt::from(10u32);
        while self.scale > 0 && (&self.mantissa % &ten).is_zero() {
            self.mantissa /= &ten;
            self.scale -= 1;
        }
        self
    }

    /// Mantissas of both operands rescaled to a common scale
    fn aligned(&self, other: &BigDecimal) -> (BigInt, BigInt, u32) {
        match self.scale.cmp(&other.scale) {
            Ordering::Equal => (self.mantissa.clone(), other.mantissa.clone(), self.scale),
            Ordering::Less => (
                &self.mantissa * pow10(other.scale - self.scale),
                other.mantissa.clone(),
                other.scale,
            ),
            Ordering::Greater => (
                self.mantissa.clone(),
                &other.mantissa * pow10(self.scale - other.scale),
                self.scale,
            ),
        }
    }

    /// Exact sum
    pub fn add(&self, other: &BigDecimal) -> BigDecimal {
        let (a, b, scale) = self.aligned(other);
        BigDecimal::new(a + b, scale)
    }

    /// Exact difference
    pub fn sub(&self, other: &BigDecimal) -> BigDecimal {
        let (a, b, scale) = self.aligned(other);
        BigDecimal::new(a - b, scale)
    }

    /// Exact product
    pub fn mul(&self, other: &BigDecimal) -> BigDecimal {
        BigDecimal::new(&self.mantissa * &other.mantissa, self.scale + other.scale)
    }

    /// Quotient rounded to [`DIV_SCALE`] fractional digits
    pub fn div(&self, other: &BigDecimal) -> Result<BigDecimal> {
        if other.is_zero() {
            return Err(Error::DivisionByZero);
        }
        // (a / 10^sa) / (b / 10^sb) scaled by 10^(DIV_SCALE + 1) for the rounding digit
        let numerator = &self.mantissa * pow10(other.scale + DIV_SCALE + 1);
        let denominator = &other.mantissa * pow10(self.scale);
        let q = numerator / denominator;
        let five = BigInt::from(5u32);
        let biased = if q.is_negative() { q - five } else { q + five };
        let rounded = biased / BigInt::from(10u32);
        Ok(BigDecimal::new(rounded, DIV_SCALE))
    }

    /// Remainder of truncated division, sign follows the dividend
    pub fn rem(&self, other: &BigDecimal) -> Result<BigDecimal> {
        if other.is_zero() {
            return Err(Error::DivisionByZero);
        }
        let (a, b, scale) = self.aligned(other);
        Ok(BigDecimal::new(a % b, scale))
    }

    /// Negation
    pub fn neg(&self) -> BigDecimal {
        BigDecimal {
            mantissa: -self.mantissa.clone(),
            scale: self.scale,
        }
    }

    /// Absolute value
    pub fn abs(&self) -> BigDecimal {
        BigDecimal {
            mantissa: self.mantissa.abs(),
            scale: self.scale,
        }
    }

    /// Sign as -1, 0 or 1
    pub fn signum(&self) -> i32 {
        match self.mantissa.sign() {
            Sign::Minus => -1,
            Sign::NoSign => 0,
            Sign::Plus => 1,
        }
    }

    /// Integer part, rounding toward zero
    pub fn trunc(&self) -> BigDecimal {
        BigDecimal::new(&self.mantissa / pow10(self.scale), 0)
    }

    /// Largest integer not above the value
    pub fn floor(&self) -> BigDecimal {
        if self.signum() < 0 && !self.is_integer() {
            self.trunc().sub(&BigDecimal::new(BigInt::from(1u32), 0))
        } else {
            self.trunc()
        }
    }

    /// Smallest integer not below the value
    pub fn ceil(&self) -> BigDecimal {
        if self.signum() > 0 && !self.is_integer() {
            self.trunc().add(&BigDecimal::new(BigInt::from(1u32), 0))
        } else {
            self.trunc()
        }
    }

    /// Nearest integer, halves away from zero
    pub fn round(&self) -> BigDecimal {
        let half = BigDecimal::new(BigInt::from(5u32), 1);
        if self.signum() < 0 {
            self.sub(&half).trunc()
        } else {
            self.add(&half).trunc()
        }
    }

    /// Exact integer power
    pub fn pow(&self, exponent: u32) -> BigDecimal {
        BigDecimal::new(self.mantissa.pow(exponent), self.scale * exponent)
    }
}

impl FromStr for BigDecimal {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        let invalid = || Error::InvalidBigNumber(text.to_string());
        let s = text.trim();

        let (negative, body) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };

        let (number, exponent) = match body.find(['e', 'E']) {
            Some(idx) => {
                let exp: i64 = body[idx + 1..].parse().map_err(|_| invalid())?;
                (&body[..idx], exp)
            }
            None => (body, 0),
        };

        let (int_part, frac_part) = match number.split_once('.') {
            Some((i, f)) => (i, f),
            None => (number, ""),
        };

        let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if (int_part.is_empty() && frac_part.is_empty()) || !all_digits(int_part) || !all_digits(frac_part)
        {
            return Err(invalid());
        }

        let digits = format!("{}{}", int_part, frac_part);
        let mut mantissa = BigInt::from_str(&digits).map_err(|_| invalid())?;
        if negative {
            mantissa = -mantissa;
        }

        let scale = frac_part.len() as i64 - exponent;
        if scale >= 0 {
            let scale = u32::try_from(scale).map_err(|_| invalid())?;
            Ok(BigDecimal::new(mantissa, scale))
        } else {
            let shift = u32::try_from(-scale).map_err(|_| invalid())?;
            Ok(BigDecimal::new(mantissa * pow10(shift), 0))
        }
    }
}

impl fmt::Display for BigDecimal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let digits = self.mantissa.abs().to_string();
        let sign = if self.mantissa.is_negative() { "-" } else { "" };
        let scale = self.scale as usize;
        if scale == 0 {
            return write!(f, "{}{}", sign, digits);
        }
        let padded = if digits.len() <= scale {
            format!("{}{}", "0".repeat(scale - digits.len() + 1), digits)
        } else {
            digits
        };
        let split = padded.len() - scale;
        write!(f, "{}{}.{}", sign, &padded[..split], &padded[split..])
    }
}

impl PartialEq for BigDecimal {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for BigDecimal {}

impl PartialOrd for BigDecimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BigDecimal {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b, _) = self.aligned(other);
        a.cmp(&b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big(s: &str) -> BigDecimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(big("123.4500").to_string(), "123.45");
        assert_eq!(big("-0.001").to_string(), "-0.001");
        assert_eq!(big("1.5e3").to_string(), "1500");
        assert_eq!(big("25e-3").to_string(), "0.025");
        assert_eq!(big("0.000").to_string(), "0");
        assert!("12x".parse::<BigDecimal>().is_err());
        assert!(".".parse::<BigDecimal>().is_err());
        assert!("".parse::<BigDecimal>().is_err());
    }

    #[test]
    fn test_exact_arithmetic() {
        // 0.1 + 0.2 is exact here, unlike f64
        assert_eq!(big("0.1").add(&big("0.2")), big("0.3"));
        assert_eq!(
            big("99999999999999999999").add(&big("1")).to_string(),
            "100000000000000000000"
        );
        assert_eq!(big("1.5").sub(&big("2.25")).to_string(), "-0.75");
        assert_eq!(big("1.5").mul(&big("-4")).to_string(), "-6");
    }

    #[test]
    fn test_division() {
        assert_eq!(big("1").div(&big("4")).unwrap().to_string(), "0.25");
        let third = big("1").div(&big("3")).unwrap().to_string();
        assert_eq!(third.len(), 2 + DIV_SCALE as usize);
        assert!(third.starts_with("0.3333"));
        let two_thirds = big("2").div(&big("3")).unwrap().to_string();
        assert!(two_thirds.ends_with('7'));
        assert!(matches!(big("1").div(&big("0")), Err(Error::DivisionByZero)));
    }

    #[test]
    fn test_remainder_and_ordering() {
        assert_eq!(big("7.5").rem(&big("2")).unwrap().to_string(), "1.5");
        assert_eq!(big("-7").rem(&big("2")).unwrap().to_string(), "-1");
        assert!(big("1.01") > big("1.009"));
        assert_eq!(big("2.50"), big("2.5"));
    }

    #[test]
    fn test_float_conversion() {
        assert_eq!(BigDecimal::from_f64(0.5).unwrap().to_string(), "0.5");
        assert_eq!(big("2.25").to_f64(), 2.25);
        assert!(BigDecimal::from_f64(f64::NAN).is_err());
    }

    #[test]
    fn test_rounding() {
        assert_eq!(big("2.5").round().to_string(), "3");
        assert_eq!(big("-2.5").round().to_string(), "-3");
        assert_eq!(big("-2.1").floor().to_string(), "-3");
        assert_eq!(big("2.1").ceil().to_string(), "3");
        assert_eq!(big("-2.9").trunc().to_string(), "-2");
        assert_eq!(big("1.5").pow(2).to_string(), "2.25");
    }
}
