//! Per-operation bundles.
//!
//! One unit struct per operator; each implements the family fast paths
//! of [`ArithOp`]. Everything exact stays exact: complex and range
//! paths recurse through [`apply`] so integer components keep integer
//! results.

use bigdecimal::{BigDecimal, RoundingMode};
use num_bigint::BigInt;
use num_integer::{Integer, Roots};
use num_traits::{Signed, ToPrimitive, Zero};
use rpl_types::{ErrorKind, Id};

use super::{
    apply, complex_parts, decimal_sqrt, from_radians, minmax, round_dec, to_f64,
    ArithOp,
};
use crate::error::SimpleResult;
use crate::object::{Fraction, Value};
use crate::settings::Settings;

/// Guarded machine multiply: decline when the operand widths alone
/// prove the product cannot fit, then let the checked multiply catch
/// the borderline cases.
fn guarded_mul(a: i64, b: i64) -> Option<i64> {
    let bits = |v: i64| 64 - v.unsigned_abs().leading_zeros();
    if bits(a) + bits(b) > 64 {
        return None;
    }
    a.checked_mul(b)
}

/// Binary exponentiation over machine integers with overflow
/// detection.
fn integer_pow(base: i64, exponent: u64) -> Option<i64> {
    let mut result: i64 = 1;
    let mut base = base;
    let mut exponent = exponent;
    while exponent > 0 {
        if exponent & 1 == 1 {
            result = guarded_mul(result, base)?;
        }
        exponent >>= 1;
        if exponent > 0 {
            base = guarded_mul(base, base)?;
        }
    }
    Some(result)
}

/// Exact decimal integer power with precision-bounded intermediates.
fn decimal_powi(s: &Settings, x: &BigDecimal, n: i64) -> SimpleResult<Value> {
    if n == 0 {
        return Ok(Value::Int(1));
    }
    if x.is_zero() && n < 0 {
        return Err(ErrorKind::DivideByZero);
    }
    let guard = (s.precision + 8) as u64;
    let mut result = BigDecimal::from(1);
    let mut base = x.clone();
    let mut exponent = n.unsigned_abs();
    while exponent > 0 {
        if exponent & 1 == 1 {
            result = (&result * &base).with_prec(guard);
        }
        exponent >>= 1;
        if exponent > 0 {
            base = (&base * &base).with_prec(guard);
        }
    }
    if n < 0 {
        result = (BigDecimal::from(1) / &result).with_prec(guard);
    }
    Ok(Value::Dec(round_dec(s, result)))
}

/// Complex multiply over rectangular parts, exact component recursion.
fn complex_mul(s: &Settings, a: (&Value, &Value), b: (&Value, &Value)) -> SimpleResult<(Value, Value)> {
    let ac = apply::<MulOp>(s, a.0.clone(), b.0.clone())?;
    let bd = apply::<MulOp>(s, a.1.clone(), b.1.clone())?;
    let ad = apply::<MulOp>(s, a.0.clone(), b.1.clone())?;
    let bc = apply::<MulOp>(s, a.1.clone(), b.0.clone())?;
    Ok((
        apply::<SubOp>(s, ac, bd)?,
        apply::<AddOp>(s, ad, bc)?,
    ))
}

fn rect(re: Value, im: Value) -> Value {
    Value::Complex {
        re: Box::new(re),
        im: Box::new(im),
        polar: false,
    }
}

fn polar(modulus: Value, arg: Value) -> Value {
    Value::Complex {
        re: Box::new(modulus),
        im: Box::new(arg),
        polar: true,
    }
}

fn polar_parts(v: &Value) -> Option<(&Value, &Value)> {
    match v {
        Value::Complex {
            re, im, polar: true,
        } => Some((re, im)),
        _ => None,
    }
}

/// Uncertain σ for sums and differences: `√(σx² + σy²)`.
fn sigma_sum(s: &Settings, sx: &Value, sy: &Value) -> SimpleResult<Value> {
    let sx2 = apply::<MulOp>(s, sx.clone(), sx.clone())?;
    let sy2 = apply::<MulOp>(s, sy.clone(), sy.clone())?;
    let sum = apply::<AddOp>(s, sx2, sy2)?;
    super::real_sqrt(s, &sum)
}

// === addition ===========================================================

/// `+`
pub struct AddOp;

impl ArithOp for AddOp {
    const ID: Id = Id::Add;

    fn integer(x: i64, y: i64) -> Option<Value> {
        x.checked_add(y).map(Value::Int)
    }

    fn based(x: u64, y: u64, mask: u64) -> SimpleResult<u64> {
        Ok(x.wrapping_add(y) & mask)
    }

    fn bignum(_s: &Settings, x: &BigInt, y: &BigInt) -> SimpleResult<Value> {
        Ok(Value::Big(x + y))
    }

    fn fraction(_s: &Settings, x: &Fraction, y: &Fraction) -> SimpleResult<Option<Value>> {
        Ok(Some(Value::Frac(x.add(y)?)))
    }

    fn complex(s: &Settings, x: &Value, y: &Value) -> SimpleResult<Option<Value>> {
        let (xr, xi) = complex_parts(x)?;
        let (yr, yi) = complex_parts(y)?;
        Ok(Some(rect(
            apply::<AddOp>(s, xr, yr)?,
            apply::<AddOp>(s, xi, yi)?,
        )))
    }

    fn range(
        s: &Settings,
        x: (&Value, &Value),
        y: (&Value, &Value),
    ) -> SimpleResult<Option<(Value, Value)>> {
        Ok(Some((
            apply::<AddOp>(s, x.0.clone(), y.0.clone())?,
            apply::<AddOp>(s, x.1.clone(), y.1.clone())?,
        )))
    }

    fn uncertain(
        s: &Settings,
        x: (&Value, &Value),
        y: (&Value, &Value),
    ) -> SimpleResult<Option<(Value, Value)>> {
        let mean = apply::<AddOp>(s, x.0.clone(), y.0.clone())?;
        Ok(Some((mean, sigma_sum(s, x.1, y.1)?)))
    }

    fn decimal(s: &Settings, x: &BigDecimal, y: &BigDecimal) -> SimpleResult<Value> {
        Ok(Value::Dec(round_dec(s, x + y)))
    }

    fn hwfloat(_s: &Settings, x: f32, y: f32) -> f32 {
        x + y
    }

    fn hwdouble(_s: &Settings, x: f64, y: f64) -> f64 {
        x + y
    }
}

// === subtraction ========================================================

/// `-`
pub struct SubOp;

impl ArithOp for SubOp {
    const ID: Id = Id::Sub;

    fn integer(x: i64, y: i64) -> Option<Value> {
        x.checked_sub(y).map(Value::Int)
    }

    fn based(x: u64, y: u64, mask: u64) -> SimpleResult<u64> {
        Ok(x.wrapping_sub(y) & mask)
    }

    fn bignum(_s: &Settings, x: &BigInt, y: &BigInt) -> SimpleResult<Value> {
        Ok(Value::Big(x - y))
    }

    fn fraction(_s: &Settings, x: &Fraction, y: &Fraction) -> SimpleResult<Option<Value>> {
        Ok(Some(Value::Frac(x.sub(y)?)))
    }

    fn complex(s: &Settings, x: &Value, y: &Value) -> SimpleResult<Option<Value>> {
        let (xr, xi) = complex_parts(x)?;
        let (yr, yi) = complex_parts(y)?;
        Ok(Some(rect(
            apply::<SubOp>(s, xr, yr)?,
            apply::<SubOp>(s, xi, yi)?,
        )))
    }

    fn range(
        s: &Settings,
        x: (&Value, &Value),
        y: (&Value, &Value),
    ) -> SimpleResult<Option<(Value, Value)>> {
        Ok(Some((
            apply::<SubOp>(s, x.0.clone(), y.1.clone())?,
            apply::<SubOp>(s, x.1.clone(), y.0.clone())?,
        )))
    }

    fn uncertain(
        s: &Settings,
        x: (&Value, &Value),
        y: (&Value, &Value),
    ) -> SimpleResult<Option<(Value, Value)>> {
        let mean = apply::<SubOp>(s, x.0.clone(), y.0.clone())?;
        Ok(Some((mean, sigma_sum(s, x.1, y.1)?)))
    }

    fn decimal(s: &Settings, x: &BigDecimal, y: &BigDecimal) -> SimpleResult<Value> {
        Ok(Value::Dec(round_dec(s, x - y)))
    }

    fn hwfloat(_s: &Settings, x: f32, y: f32) -> f32 {
        x - y
    }

    fn hwdouble(_s: &Settings, x: f64, y: f64) -> f64 {
        x - y
    }
}

// === multiplication =====================================================

/// `*`
pub struct MulOp;

impl ArithOp for MulOp {
    const ID: Id = Id::Mul;

    fn integer(x: i64, y: i64) -> Option<Value> {
        guarded_mul(x, y).map(Value::Int)
    }

    fn based(x: u64, y: u64, mask: u64) -> SimpleResult<u64> {
        Ok(x.wrapping_mul(y) & mask)
    }

    fn bignum(_s: &Settings, x: &BigInt, y: &BigInt) -> SimpleResult<Value> {
        Ok(Value::Big(x * y))
    }

    fn fraction(_s: &Settings, x: &Fraction, y: &Fraction) -> SimpleResult<Option<Value>> {
        Ok(Some(Value::Frac(x.mul(y)?)))
    }

    fn complex(s: &Settings, x: &Value, y: &Value) -> SimpleResult<Option<Value>> {
        // Polar products stay polar: moduli multiply, arguments add.
        if let (Some((xm, xa)), Some((ym, ya))) = (polar_parts(x), polar_parts(y)) {
            return Ok(Some(polar(
                apply::<MulOp>(s, xm.clone(), ym.clone())?,
                apply::<AddOp>(s, xa.clone(), ya.clone())?,
            )));
        }
        let (xr, xi) = complex_parts(x)?;
        let (yr, yi) = complex_parts(y)?;
        let (re, im) = complex_mul(s, (&xr, &xi), (&yr, &yi))?;
        Ok(Some(rect(re, im)))
    }

    fn range(
        s: &Settings,
        x: (&Value, &Value),
        y: (&Value, &Value),
    ) -> SimpleResult<Option<(Value, Value)>> {
        let candidates = vec![
            apply::<MulOp>(s, x.0.clone(), y.0.clone())?,
            apply::<MulOp>(s, x.0.clone(), y.1.clone())?,
            apply::<MulOp>(s, x.1.clone(), y.0.clone())?,
            apply::<MulOp>(s, x.1.clone(), y.1.clone())?,
        ];
        Ok(Some(minmax(candidates)?))
    }

    fn uncertain(
        s: &Settings,
        x: (&Value, &Value),
        y: (&Value, &Value),
    ) -> SimpleResult<Option<(Value, Value)>> {
        // σ = √((σx·my)² + (σy·mx)²), the linear propagation for a
        // product, robust at zero means.
        let mean = apply::<MulOp>(s, x.0.clone(), y.0.clone())?;
        let a = apply::<MulOp>(s, x.1.clone(), y.0.clone())?;
        let b = apply::<MulOp>(s, y.1.clone(), x.0.clone())?;
        Ok(Some((mean, sigma_sum(s, &a, &b)?)))
    }

    fn decimal(s: &Settings, x: &BigDecimal, y: &BigDecimal) -> SimpleResult<Value> {
        Ok(Value::Dec(round_dec(s, x * y)))
    }

    fn hwfloat(_s: &Settings, x: f32, y: f32) -> f32 {
        x * y
    }

    fn hwdouble(_s: &Settings, x: f64, y: f64) -> f64 {
        x * y
    }
}

// === division ===========================================================

/// `/`
pub struct DivOp;

impl ArithOp for DivOp {
    const ID: Id = Id::Div;

    fn integer(x: i64, y: i64) -> Option<Value> {
        // Exact quotients only; everything else becomes a fraction.
        if y != 0 && x % y == 0 {
            x.checked_div(y).map(Value::Int)
        } else {
            None
        }
    }

    fn based(x: u64, y: u64, mask: u64) -> SimpleResult<u64> {
        if y == 0 {
            return Err(ErrorKind::DivideByZero);
        }
        Ok((x / y) & mask)
    }

    fn bignum(_s: &Settings, x: &BigInt, y: &BigInt) -> SimpleResult<Value> {
        if y.is_zero() {
            return Err(ErrorKind::DivideByZero);
        }
        if (x % y).is_zero() {
            Ok(Value::Big(x / y))
        } else {
            Ok(Value::Frac(Fraction::new(x.clone(), y.clone())?))
        }
    }

    fn fraction(_s: &Settings, x: &Fraction, y: &Fraction) -> SimpleResult<Option<Value>> {
        Ok(Some(Value::Frac(x.div(y)?)))
    }

    fn complex(s: &Settings, x: &Value, y: &Value) -> SimpleResult<Option<Value>> {
        if let (Some((xm, xa)), Some((ym, ya))) = (polar_parts(x), polar_parts(y)) {
            return Ok(Some(polar(
                apply::<DivOp>(s, xm.clone(), ym.clone())?,
                apply::<SubOp>(s, xa.clone(), ya.clone())?,
            )));
        }
        let (xr, xi) = complex_parts(x)?;
        let (yr, yi) = complex_parts(y)?;
        // (a+bi)/(c+di) = ((ac+bd) + (bc-ad)i) / (c²+d²)
        let c2 = apply::<MulOp>(s, yr.clone(), yr.clone())?;
        let d2 = apply::<MulOp>(s, yi.clone(), yi.clone())?;
        let denom = apply::<AddOp>(s, c2, d2)?;
        if denom.is_zero() {
            return Err(ErrorKind::DivideByZero);
        }
        let ac = apply::<MulOp>(s, xr.clone(), yr.clone())?;
        let bd = apply::<MulOp>(s, xi.clone(), yi.clone())?;
        let bc = apply::<MulOp>(s, xi, yr)?;
        let ad = apply::<MulOp>(s, xr, yi)?;
        let re = apply::<DivOp>(s, apply::<AddOp>(s, ac, bd)?, denom.clone())?;
        let im = apply::<DivOp>(s, apply::<SubOp>(s, bc, ad)?, denom)?;
        Ok(Some(rect(re, im)))
    }

    fn range(
        s: &Settings,
        x: (&Value, &Value),
        y: (&Value, &Value),
    ) -> SimpleResult<Option<(Value, Value)>> {
        // A divisor interval straddling zero has no finite image.
        let lo_neg = y.0.is_negative() || y.0.is_zero();
        let hi_pos = !y.1.is_negative();
        if lo_neg && hi_pos {
            return Err(ErrorKind::DivideByZero);
        }
        let candidates = vec![
            apply::<DivOp>(s, x.0.clone(), y.0.clone())?,
            apply::<DivOp>(s, x.0.clone(), y.1.clone())?,
            apply::<DivOp>(s, x.1.clone(), y.0.clone())?,
            apply::<DivOp>(s, x.1.clone(), y.1.clone())?,
        ];
        Ok(Some(minmax(candidates)?))
    }

    fn uncertain(
        s: &Settings,
        x: (&Value, &Value),
        y: (&Value, &Value),
    ) -> SimpleResult<Option<(Value, Value)>> {
        // σ = √((σx/my)² + (σy·mx/my²)²)
        let mean = apply::<DivOp>(s, x.0.clone(), y.0.clone())?;
        let a = apply::<DivOp>(s, x.1.clone(), y.0.clone())?;
        let my2 = apply::<MulOp>(s, y.0.clone(), y.0.clone())?;
        let b = apply::<DivOp>(s, apply::<MulOp>(s, y.1.clone(), x.0.clone())?, my2)?;
        Ok(Some((mean, sigma_sum(s, &a, &b)?)))
    }

    fn decimal(s: &Settings, x: &BigDecimal, y: &BigDecimal) -> SimpleResult<Value> {
        if y.is_zero() {
            return Err(ErrorKind::DivideByZero);
        }
        Ok(Value::Dec(round_dec(s, x / y)))
    }

    fn hwfloat(_s: &Settings, x: f32, y: f32) -> f32 {
        x / y
    }

    fn hwdouble(_s: &Settings, x: f64, y: f64) -> f64 {
        x / y
    }
}

// === euclidean modulus ==================================================

/// `mod`, result in `[0, |y|)`.
pub struct ModOp;

impl ArithOp for ModOp {
    const ID: Id = Id::Mod;

    fn integer(x: i64, y: i64) -> Option<Value> {
        x.checked_rem_euclid(y).map(Value::Int)
    }

    fn based(x: u64, y: u64, mask: u64) -> SimpleResult<u64> {
        if y == 0 {
            return Err(ErrorKind::DivideByZero);
        }
        Ok((x % y) & mask)
    }

    fn bignum(_s: &Settings, x: &BigInt, y: &BigInt) -> SimpleResult<Value> {
        if y.is_zero() {
            return Err(ErrorKind::DivideByZero);
        }
        Ok(Value::Big(x.mod_floor(&y.abs())))
    }

    fn fraction(_s: &Settings, x: &Fraction, y: &Fraction) -> SimpleResult<Option<Value>> {
        if y.is_zero() {
            return Err(ErrorKind::DivideByZero);
        }
        // r = x - |y|·⌊x/|y|⌋
        let ay = if y.is_negative() { y.neg() } else { y.clone() };
        let q = x.div(&ay)?;
        let floor = q.numerator().div_floor(q.denominator());
        let whole = Fraction::from_int(floor);
        Ok(Some(Value::Frac(x.sub(&ay.mul(&whole)?)?)))
    }

    fn complex(_s: &Settings, _x: &Value, _y: &Value) -> SimpleResult<Option<Value>> {
        Ok(None)
    }

    fn range(
        _s: &Settings,
        _x: (&Value, &Value),
        _y: (&Value, &Value),
    ) -> SimpleResult<Option<(Value, Value)>> {
        Ok(None)
    }

    fn uncertain(
        _s: &Settings,
        _x: (&Value, &Value),
        _y: (&Value, &Value),
    ) -> SimpleResult<Option<(Value, Value)>> {
        Ok(None)
    }

    fn decimal(s: &Settings, x: &BigDecimal, y: &BigDecimal) -> SimpleResult<Value> {
        if y.is_zero() {
            return Err(ErrorKind::DivideByZero);
        }
        let ay = y.abs();
        let q = (x / &ay).with_scale_round(0, RoundingMode::Floor);
        Ok(Value::Dec(round_dec(s, x - ay * q)))
    }

    fn hwfloat(_s: &Settings, x: f32, y: f32) -> f32 {
        x.rem_euclid(y)
    }

    fn hwdouble(_s: &Settings, x: f64, y: f64) -> f64 {
        x.rem_euclid(y)
    }
}

// === truncating remainder ===============================================

/// `rem`, result keeps the sign of `x`.
pub struct RemOp;

impl ArithOp for RemOp {
    const ID: Id = Id::Rem;

    fn integer(x: i64, y: i64) -> Option<Value> {
        x.checked_rem(y).map(Value::Int)
    }

    fn based(x: u64, y: u64, mask: u64) -> SimpleResult<u64> {
        if y == 0 {
            return Err(ErrorKind::DivideByZero);
        }
        Ok((x % y) & mask)
    }

    fn bignum(_s: &Settings, x: &BigInt, y: &BigInt) -> SimpleResult<Value> {
        if y.is_zero() {
            return Err(ErrorKind::DivideByZero);
        }
        Ok(Value::Big(x % y))
    }

    fn fraction(_s: &Settings, x: &Fraction, y: &Fraction) -> SimpleResult<Option<Value>> {
        if y.is_zero() {
            return Err(ErrorKind::DivideByZero);
        }
        // r = x - y·trunc(x/y)
        let q = x.div(y)?;
        let trunc = q.numerator().div_rem(q.denominator()).0;
        let whole = Fraction::from_int(trunc);
        Ok(Some(Value::Frac(x.sub(&y.mul(&whole)?)?)))
    }

    fn complex(_s: &Settings, _x: &Value, _y: &Value) -> SimpleResult<Option<Value>> {
        Ok(None)
    }

    fn range(
        _s: &Settings,
        _x: (&Value, &Value),
        _y: (&Value, &Value),
    ) -> SimpleResult<Option<(Value, Value)>> {
        Ok(None)
    }

    fn uncertain(
        _s: &Settings,
        _x: (&Value, &Value),
        _y: (&Value, &Value),
    ) -> SimpleResult<Option<(Value, Value)>> {
        Ok(None)
    }

    fn decimal(s: &Settings, x: &BigDecimal, y: &BigDecimal) -> SimpleResult<Value> {
        if y.is_zero() {
            return Err(ErrorKind::DivideByZero);
        }
        let q = (x / y).with_scale_round(0, RoundingMode::Down);
        Ok(Value::Dec(round_dec(s, x - y * q)))
    }

    fn hwfloat(_s: &Settings, x: f32, y: f32) -> f32 {
        x % y
    }

    fn hwdouble(_s: &Settings, x: f64, y: f64) -> f64 {
        x % y
    }
}

// === exponentiation =====================================================

/// `^`
pub struct PowOp;

impl ArithOp for PowOp {
    const ID: Id = Id::Pow;

    fn integer(x: i64, y: i64) -> Option<Value> {
        if y < 0 {
            return None;
        }
        integer_pow(x, y as u64).map(Value::Int)
    }

    fn based(x: u64, y: u64, mask: u64) -> SimpleResult<u64> {
        let mut result: u64 = 1;
        let mut base = x & mask;
        let mut exponent = y;
        while exponent > 0 {
            if exponent & 1 == 1 {
                result = result.wrapping_mul(base) & mask;
            }
            exponent >>= 1;
            base = base.wrapping_mul(base) & mask;
        }
        Ok(result)
    }

    fn bignum(_s: &Settings, x: &BigInt, y: &BigInt) -> SimpleResult<Value> {
        match y.to_i64() {
            Some(n) if n >= 0 => {
                let exp = u32::try_from(n).map_err(|_| ErrorKind::Value)?;
                Ok(Value::Big(x.pow(exp)))
            }
            Some(n) => {
                // Negative exponent: compute for |n| then invert.
                let exp = u32::try_from(-n).map_err(|_| ErrorKind::Value)?;
                Ok(Value::Frac(Fraction::new(
                    BigInt::from(1),
                    x.pow(exp),
                )?))
            }
            None => Err(ErrorKind::Value),
        }
    }

    fn fraction(_s: &Settings, x: &Fraction, y: &Fraction) -> SimpleResult<Option<Value>> {
        if !y.is_integral() {
            return Ok(None);
        }
        match y.numerator().to_i64() {
            Some(n) => Ok(Some(Value::Frac(x.pow(n)?))),
            None => Err(ErrorKind::Value),
        }
    }

    fn complex(s: &Settings, x: &Value, y: &Value) -> SimpleResult<Option<Value>> {
        // Integer exponents stay exact through binary multiplication.
        if let Some(n) = y.as_i64() {
            if let Some((m, a)) = polar_parts(x) {
                return Ok(Some(polar(
                    apply::<PowOp>(s, m.clone(), Value::Int(n))?,
                    apply::<MulOp>(s, a.clone(), Value::Int(n))?,
                )));
            }
            let (xr, xi) = complex_parts(x)?;
            let negative = n < 0;
            let mut exponent = n.unsigned_abs();
            let mut result = (Value::Int(1), Value::Int(0));
            let mut base = (xr, xi);
            while exponent > 0 {
                if exponent & 1 == 1 {
                    result = complex_mul(s, (&result.0, &result.1), (&base.0, &base.1))?;
                }
                exponent >>= 1;
                if exponent > 0 {
                    base = complex_mul(s, (&base.0, &base.1), (&base.0, &base.1))?;
                }
            }
            let powered = rect(result.0, result.1);
            if negative {
                return DivOp::complex(s, &Value::Int(1), &powered);
            }
            return Ok(Some(powered));
        }
        // exp(y·ln x) through the hardware path.
        let (xr, xi) = complex_parts(x)?;
        let (yr, yi) = complex_parts(y)?;
        let (a, b) = (to_f64(&xr)?, to_f64(&xi)?);
        let (c, d) = (to_f64(&yr)?, to_f64(&yi)?);
        let ln_mod = libm::log(libm::hypot(a, b));
        let arg = libm::atan2(b, a);
        // (c+di)(ln|x| + i·arg)
        let e_re = c * ln_mod - d * arg;
        let e_im = c * arg + d * ln_mod;
        let scale = libm::exp(e_re);
        Ok(Some(rect(
            Value::F64(scale * libm::cos(e_im)),
            Value::F64(scale * libm::sin(e_im)),
        )))
    }

    fn range(
        s: &Settings,
        x: (&Value, &Value),
        y: (&Value, &Value),
    ) -> SimpleResult<Option<(Value, Value)>> {
        if y.0 != y.1 {
            return Ok(None);
        }
        let exponent = y.0;
        let lo_p = apply::<PowOp>(s, x.0.clone(), exponent.clone())?;
        let hi_p = apply::<PowOp>(s, x.1.clone(), exponent.clone())?;
        if let Some(n) = exponent.as_i64() {
            if n >= 0 && n % 2 == 0 && x.0.is_negative() && !x.1.is_negative() {
                // The interval straddles zero under an even power.
                let (_, hi) = minmax(vec![lo_p, hi_p])?;
                return Ok(Some((Value::Int(0), hi)));
            }
        }
        Ok(Some(minmax(vec![lo_p, hi_p])?))
    }

    fn uncertain(
        s: &Settings,
        x: (&Value, &Value),
        y: (&Value, &Value),
    ) -> SimpleResult<Option<(Value, Value)>> {
        if !y.1.is_zero() {
            return Ok(None);
        }
        // σ = |y·mean^(y-1)|·σx
        let mean = apply::<PowOp>(s, x.0.clone(), y.0.clone())?;
        let lower = apply::<SubOp>(s, y.0.clone(), Value::Int(1))?;
        let deriv = apply::<MulOp>(
            s,
            y.0.clone(),
            apply::<PowOp>(s, x.0.clone(), lower)?,
        )?;
        let sigma = apply::<MulOp>(s, deriv, x.1.clone())?;
        let sigma = if sigma.is_negative() {
            apply::<MulOp>(s, sigma, Value::Int(-1))?
        } else {
            sigma
        };
        Ok(Some((mean, sigma)))
    }

    fn decimal(s: &Settings, x: &BigDecimal, y: &BigDecimal) -> SimpleResult<Value> {
        if y.is_integer() {
            if let Some(n) = y.to_i64() {
                return decimal_powi(s, x, n);
            }
            return Err(ErrorKind::Value);
        }
        let xf = x.to_f64().ok_or(ErrorKind::Overflow)?;
        let yf = y.to_f64().ok_or(ErrorKind::Overflow)?;
        if xf < 0.0 {
            // Negative base with fractional exponent lands in ℂ.
            return PowOp::complex(s, &Value::F64(xf), &Value::F64(yf))?
                .ok_or(ErrorKind::UndefinedOperation);
        }
        let r = libm::pow(xf, yf);
        if !r.is_finite() {
            return Err(ErrorKind::Overflow);
        }
        let d = BigDecimal::try_from(r).map_err(|_| ErrorKind::Overflow)?;
        Ok(Value::Dec(round_dec(s, d)))
    }

    fn hwfloat(_s: &Settings, x: f32, y: f32) -> f32 {
        libm::powf(x, y)
    }

    fn hwdouble(_s: &Settings, x: f64, y: f64) -> f64 {
        libm::pow(x, y)
    }
}

// === hypotenuse =========================================================

/// `hypot`
pub struct HypotOp;

impl ArithOp for HypotOp {
    const ID: Id = Id::Hypot;

    fn integer(_x: i64, _y: i64) -> Option<Value> {
        // Promote so perfect squares are detected on the bignum path.
        None
    }

    fn based(_x: u64, _y: u64, _mask: u64) -> SimpleResult<u64> {
        Err(ErrorKind::Type)
    }

    fn bignum(s: &Settings, x: &BigInt, y: &BigInt) -> SimpleResult<Value> {
        let sum = x * x + y * y;
        let root = sum.sqrt();
        if &root * &root == sum {
            return Ok(Value::Big(root));
        }
        decimal_sqrt(s, &BigDecimal::from(sum))
    }

    fn fraction(s: &Settings, x: &Fraction, y: &Fraction) -> SimpleResult<Option<Value>> {
        let sum = x.mul(x)?.add(&y.mul(y)?)?;
        super::real_sqrt(s, &Value::Frac(sum).canonical()).map(Some)
    }

    fn complex(_s: &Settings, _x: &Value, _y: &Value) -> SimpleResult<Option<Value>> {
        Ok(None)
    }

    fn range(
        _s: &Settings,
        _x: (&Value, &Value),
        _y: (&Value, &Value),
    ) -> SimpleResult<Option<(Value, Value)>> {
        Ok(None)
    }

    fn uncertain(
        _s: &Settings,
        _x: (&Value, &Value),
        _y: (&Value, &Value),
    ) -> SimpleResult<Option<(Value, Value)>> {
        Ok(None)
    }

    fn decimal(s: &Settings, x: &BigDecimal, y: &BigDecimal) -> SimpleResult<Value> {
        decimal_sqrt(s, &round_dec(s, x * x + y * y))
    }

    fn hwfloat(_s: &Settings, x: f32, y: f32) -> f32 {
        libm::hypotf(x, y)
    }

    fn hwdouble(_s: &Settings, x: f64, y: f64) -> f64 {
        libm::hypot(x, y)
    }
}

// === two-argument arc tangent ===========================================

/// `atan2`, result in the current angle mode.
pub struct Atan2Op;

impl Atan2Op {
    fn angle(s: &Settings, y: f64, x: f64) -> f64 {
        from_radians(s, libm::atan2(y, x))
    }
}

impl ArithOp for Atan2Op {
    const ID: Id = Id::Atan2;

    fn integer(_x: i64, _y: i64) -> Option<Value> {
        None
    }

    fn based(_x: u64, _y: u64, _mask: u64) -> SimpleResult<u64> {
        Err(ErrorKind::Type)
    }

    fn bignum(s: &Settings, x: &BigInt, y: &BigInt) -> SimpleResult<Value> {
        let xf = x.to_f64().ok_or(ErrorKind::Overflow)?;
        let yf = y.to_f64().ok_or(ErrorKind::Overflow)?;
        let a = Self::angle(s, xf, yf);
        let d = BigDecimal::try_from(a).map_err(|_| ErrorKind::Value)?;
        Ok(Value::Dec(round_dec(s, d)))
    }

    fn fraction(s: &Settings, x: &Fraction, y: &Fraction) -> SimpleResult<Option<Value>> {
        let a = Self::angle(s, x.to_f64(), y.to_f64());
        let d = BigDecimal::try_from(a).map_err(|_| ErrorKind::Value)?;
        Ok(Some(Value::Dec(round_dec(s, d))))
    }

    fn complex(_s: &Settings, _x: &Value, _y: &Value) -> SimpleResult<Option<Value>> {
        Ok(None)
    }

    fn range(
        _s: &Settings,
        _x: (&Value, &Value),
        _y: (&Value, &Value),
    ) -> SimpleResult<Option<(Value, Value)>> {
        Ok(None)
    }

    fn uncertain(
        _s: &Settings,
        _x: (&Value, &Value),
        _y: (&Value, &Value),
    ) -> SimpleResult<Option<(Value, Value)>> {
        Ok(None)
    }

    fn decimal(s: &Settings, x: &BigDecimal, y: &BigDecimal) -> SimpleResult<Value> {
        let a = Self::angle(
            s,
            x.to_f64().ok_or(ErrorKind::Overflow)?,
            y.to_f64().ok_or(ErrorKind::Overflow)?,
        );
        let d = BigDecimal::try_from(a).map_err(|_| ErrorKind::Value)?;
        Ok(Value::Dec(round_dec(s, d)))
    }

    fn hwfloat(s: &Settings, x: f32, y: f32) -> f32 {
        Self::angle(s, x as f64, y as f64) as f32
    }

    fn hwdouble(s: &Settings, x: f64, y: f64) -> f64 {
        Self::angle(s, x, y)
    }
}
