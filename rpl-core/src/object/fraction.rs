//! Exact rational numbers.
//!
//! Always reduced, denominator always positive. Construction canonicalizes;
//! arithmetic keeps the invariant.

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, Zero};
use rpl_types::ErrorKind;

use crate::error::SimpleResult;

/// A reduced fraction with positive denominator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fraction {
    num: BigInt,
    den: BigInt,
}

impl Fraction {
    /// Build a reduced fraction. Fails on a zero denominator.
    pub fn new(num: BigInt, den: BigInt) -> SimpleResult<Fraction> {
        if den.is_zero() {
            return Err(ErrorKind::DivideByZero);
        }
        let mut num = num;
        let mut den = den;
        if den.is_negative() {
            num = -num;
            den = -den;
        }
        let gcd = num.gcd(&den);
        if !gcd.is_one() && !gcd.is_zero() {
            num /= &gcd;
            den /= &gcd;
        }
        if num.is_zero() {
            den = BigInt::one();
        }
        Ok(Fraction { num, den })
    }

    /// A whole number as a fraction.
    pub fn from_int(value: BigInt) -> Fraction {
        Fraction {
            num: value,
            den: BigInt::one(),
        }
    }

    /// Numerator, sign included.
    pub fn numerator(&self) -> &BigInt {
        &self.num
    }

    /// Denominator, always positive.
    pub fn denominator(&self) -> &BigInt {
        &self.den
    }

    /// True when the denominator is one.
    pub fn is_integral(&self) -> bool {
        self.den.is_one()
    }

    /// True for zero.
    pub fn is_zero(&self) -> bool {
        self.num.is_zero()
    }

    /// True for negative values.
    pub fn is_negative(&self) -> bool {
        self.num.is_negative()
    }

    /// Sum.
    pub fn add(&self, other: &Fraction) -> SimpleResult<Fraction> {
        Fraction::new(
            &self.num * &other.den + &other.num * &self.den,
            &self.den * &other.den,
        )
    }

    /// Difference.
    pub fn sub(&self, other: &Fraction) -> SimpleResult<Fraction> {
        Fraction::new(
            &self.num * &other.den - &other.num * &self.den,
            &self.den * &other.den,
        )
    }

    /// Product.
    pub fn mul(&self, other: &Fraction) -> SimpleResult<Fraction> {
        Fraction::new(&self.num * &other.num, &self.den * &other.den)
    }

    /// Quotient; fails when `other` is zero.
    pub fn div(&self, other: &Fraction) -> SimpleResult<Fraction> {
        if other.num.is_zero() {
            return Err(ErrorKind::DivideByZero);
        }
        Fraction::new(&self.num * &other.den, &self.den * &other.num)
    }

    /// Negation.
    pub fn neg(&self) -> Fraction {
        Fraction {
            num: -&self.num,
            den: self.den.clone(),
        }
    }

    /// Multiplicative inverse; fails on zero.
    pub fn inv(&self) -> SimpleResult<Fraction> {
        if self.num.is_zero() {
            return Err(ErrorKind::DivideByZero);
        }
        Fraction::new(self.den.clone(), self.num.clone())
    }

    /// Integer power, negative exponents allowed.
    pub fn pow(&self, exponent: i64) -> SimpleResult<Fraction> {
        if exponent == 0 {
            return Ok(Fraction::from_int(BigInt::one()));
        }
        let base = if exponent < 0 { self.inv()? } else { self.clone() };
        let exp = exponent.unsigned_abs() as u32;
        Ok(Fraction {
            num: base.num.pow(exp),
            den: base.den.pow(exp),
        })
    }

    /// Approximate value as a hardware double.
    pub fn to_f64(&self) -> f64 {
        use num_traits::ToPrimitive;
        self.num.to_f64().unwrap_or(f64::NAN) / self.den.to_f64().unwrap_or(f64::NAN)
    }

    /// Euclidean comparison without conversion loss.
    pub fn cmp(&self, other: &Fraction) -> core::cmp::Ordering {
        (&self.num * &other.den).cmp(&(&other.num * &self.den))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frac(n: i64, d: i64) -> Fraction {
        Fraction::new(BigInt::from(n), BigInt::from(d)).unwrap()
    }

    #[test]
    fn construction_reduces_and_fixes_sign() {
        let f = frac(4, -6);
        assert_eq!(f.numerator(), &BigInt::from(-2));
        assert_eq!(f.denominator(), &BigInt::from(3));
    }

    #[test]
    fn zero_denominator_is_rejected() {
        assert_eq!(
            Fraction::new(BigInt::from(1), BigInt::from(0)),
            Err(ErrorKind::DivideByZero)
        );
    }

    #[test]
    fn product_with_inverse_is_exactly_one() {
        let f = frac(22, 7);
        let product = f.mul(&f.inv().unwrap()).unwrap();
        assert!(product.is_integral());
        assert_eq!(product.numerator(), &BigInt::from(1));
    }

    #[test]
    fn negative_power_inverts() {
        let f = frac(2, 3);
        let p = f.pow(-2).unwrap();
        assert_eq!(p.numerator(), &BigInt::from(9));
        assert_eq!(p.denominator(), &BigInt::from(4));
    }
}
