//! The unified arithmetic dispatcher.
//!
//! Every binary operation is one generic [`apply`] parameterized by a
//! per-op bundle ([`ArithOp`]): family fast paths that decline by
//! returning `None`, forcing promotion along the lattice
//!
//! ```text
//! based ─┐
//! integer ── bignum ── fraction ── decimal ── hwfloat/hwdouble
//!                                    ├── complex
//!                                    └── range/uncertain
//! ```
//!
//! Non-numeric operands (units, lists, arrays, text, symbolic values,
//! infinities) are handled before any promotion; the shared
//! auto-simplification law table runs when the setting is enabled.

mod ops;
#[cfg(test)]
mod tests;

pub use ops::{AddOp, Atan2Op, DivOp, HypotOp, ModOp, MulOp, PowOp, RemOp, SubOp};

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_integer::Roots;
use num_traits::ToPrimitive;
use rpl_types::{ErrorKind, Id, Word};

use crate::error::SimpleResult;
use crate::expr;
use crate::object::{Fraction, RangeForm, Value};
use crate::settings::{AngleMode, Settings};
use crate::units;

/// Per-operation bundle of family fast paths.
///
/// Each hook may decline (`None`) to request promotion to the next
/// family; the decimal and hardware leaves always produce an answer or
/// an error.
pub trait ArithOp {
    /// The command id of this operation.
    const ID: Id;

    /// Machine-integer fast path; decline on overflow instead of
    /// wrapping.
    fn integer(x: i64, y: i64) -> Option<Value>;

    /// Based integers always wrap within the word-size mask.
    fn based(x: Word, y: Word, mask: Word) -> SimpleResult<Word>;

    /// Big-integer path.
    fn bignum(s: &Settings, x: &BigInt, y: &BigInt) -> SimpleResult<Value>;

    /// Fraction path; decline to fall through to decimal.
    fn fraction(s: &Settings, x: &Fraction, y: &Fraction) -> SimpleResult<Option<Value>>;

    /// Complex path over rectangular or polar operands; decline when
    /// the operation has no complex meaning.
    fn complex(s: &Settings, x: &Value, y: &Value) -> SimpleResult<Option<Value>>;

    /// Interval path over `(lo, hi)` endpoint pairs.
    fn range(s: &Settings, x: (&Value, &Value), y: (&Value, &Value))
        -> SimpleResult<Option<(Value, Value)>>;

    /// Uncertain path over `(mean, sigma)` pairs.
    fn uncertain(
        s: &Settings,
        x: (&Value, &Value),
        y: (&Value, &Value),
    ) -> SimpleResult<Option<(Value, Value)>>;

    /// Decimal leaf.
    fn decimal(s: &Settings, x: &BigDecimal, y: &BigDecimal) -> SimpleResult<Value>;

    /// Hardware float leaf.
    fn hwfloat(s: &Settings, x: f32, y: f32) -> f32;

    /// Hardware double leaf.
    fn hwdouble(s: &Settings, x: f64, y: f64) -> f64;
}

/// Apply a binary operation to two decoded values.
pub fn apply<Op: ArithOp>(s: &Settings, x: Value, y: Value) -> SimpleResult<Value> {
    // Tags are transparent to arithmetic.
    let x = strip_tag(x);
    let y = strip_tag(y);

    if x.is_infinite() || y.is_infinite() {
        return infinities(Op::ID, &x, &y);
    }

    // Containers, text and units come before any symbolic or numeric
    // treatment; element-wise recursion re-enters `apply`.
    if let Some(v) = non_numeric::<Op>(s, &x, &y)? {
        return Ok(v);
    }

    // Symbolic operands build expressions, after the law table has had
    // its chance.
    if symbolic_operand(&x) || symbolic_operand(&y) {
        if s.auto_simplify {
            if let Some(v) = optimize(Op::ID, s, &x, &y)? {
                return Ok(v);
            }
        }
        // The imaginary unit is numeric when the other side is.
        if let Some((x, y)) = imaginary_to_complex(&x, &y) {
            return numeric::<Op>(s, x, y);
        }
        return Ok(expr::binary(Op::ID, x, y));
    }

    if s.auto_simplify {
        if let Some(v) = optimize(Op::ID, s, &x, &y)? {
            return Ok(v);
        }
    }

    numeric::<Op>(s, x, y)
}

fn strip_tag(v: Value) -> Value {
    match v {
        Value::Tagged { value, .. } => strip_tag(*value),
        other => other,
    }
}

fn symbolic_operand(v: &Value) -> bool {
    matches!(
        v,
        Value::Sym(_) | Value::Expr(_) | Value::Const { .. } | Value::Cmd(Id::ImaginaryUnit)
    )
}

fn imaginary_to_complex(x: &Value, y: &Value) -> Option<(Value, Value)> {
    let lift = |v: &Value| -> Option<Value> {
        match v {
            Value::Cmd(Id::ImaginaryUnit) => Some(Value::Complex {
                re: Box::new(Value::Int(0)),
                im: Box::new(Value::Int(1)),
                polar: false,
            }),
            other if other.is_real() || other.id().is_complex() => Some(other.clone()),
            _ => None,
        }
    };
    match (lift(x), lift(y)) {
        (Some(a), Some(b)) => Some((a, b)),
        _ => None,
    }
}

// === auto-simplification law table ======================================

/// The shared simplification table. `None` means no rule applied.
/// Errors surface the `0^0` policy.
pub fn optimize(op: Id, s: &Settings, x: &Value, y: &Value) -> SimpleResult<Option<Value>> {
    let based = matches!(x, Value::Based { .. }) || matches!(y, Value::Based { .. });
    if based {
        return Ok(None);
    }
    let imaginary =
        |v: &Value| matches!(v, Value::Cmd(Id::ImaginaryUnit));
    Ok(match op {
        Id::Add => {
            if x.is_zero() {
                Some(y.clone())
            } else if y.is_zero() {
                Some(x.clone())
            } else {
                None
            }
        }
        Id::Sub => {
            if y.is_zero() {
                Some(x.clone())
            } else if x == y {
                Some(Value::Int(0))
            } else if x.is_zero() && y.is_symbolic() {
                Some(expr::unary(Id::Neg, y.clone()))
            } else {
                None
            }
        }
        Id::Mul => {
            if imaginary(x) && imaginary(y) {
                Some(Value::Int(-1))
            } else if x.is_zero() || y.is_zero() {
                Some(Value::Int(0))
            } else if x.is_one() {
                Some(y.clone())
            } else if y.is_one() {
                Some(x.clone())
            } else if x == y && x.is_symbolic() {
                Some(expr::binary(Id::Pow, x.clone(), Value::Int(2)))
            } else {
                None
            }
        }
        Id::Div => {
            if x.is_zero() && !y.is_zero() {
                Some(Value::Int(0))
            } else if y.is_one() {
                Some(x.clone())
            } else if x == y && !x.is_zero() {
                Some(Value::Int(1))
            } else if x.is_one() && y.is_symbolic() {
                Some(expr::binary(Id::Pow, y.clone(), Value::Int(-1)))
            } else {
                None
            }
        }
        Id::Pow => {
            if y.is_zero() {
                if x.is_zero() {
                    if s.zero_power_zero_is_one {
                        Some(Value::Int(1))
                    } else {
                        return Err(ErrorKind::UndefinedOperation);
                    }
                } else {
                    Some(Value::Int(1))
                }
            } else if y.is_one() {
                Some(x.clone())
            } else {
                None
            }
        }
        _ => None,
    })
}

// === infinity arithmetic ================================================

fn sign_of(v: &Value) -> i8 {
    if matches!(v, Value::Cmd(Id::NegInfinity)) || v.is_negative() {
        -1
    } else {
        1
    }
}

fn infinity(sign: i8) -> Value {
    if sign < 0 {
        Value::Cmd(Id::NegInfinity)
    } else {
        Value::Cmd(Id::Infinity)
    }
}

fn infinities(op: Id, x: &Value, y: &Value) -> SimpleResult<Value> {
    let undef = matches!(x, Value::Cmd(Id::Undefined)) || matches!(y, Value::Cmd(Id::Undefined));
    if undef {
        return Ok(Value::Cmd(Id::Undefined));
    }
    let xi = x.is_infinite();
    let yi = y.is_infinite();
    match op {
        Id::Add => match (xi, yi) {
            (true, true) if sign_of(x) == sign_of(y) => Ok(infinity(sign_of(x))),
            (true, true) => Err(ErrorKind::UndefinedOperation),
            (true, false) => Ok(infinity(sign_of(x))),
            _ => Ok(infinity(sign_of(y))),
        },
        Id::Sub => match (xi, yi) {
            (true, true) if sign_of(x) != sign_of(y) => Ok(infinity(sign_of(x))),
            (true, true) => Err(ErrorKind::UndefinedOperation),
            (true, false) => Ok(infinity(sign_of(x))),
            _ => Ok(infinity(-sign_of(y))),
        },
        Id::Mul => {
            if (xi && y.is_zero()) || (yi && x.is_zero()) {
                Err(ErrorKind::UndefinedOperation)
            } else {
                Ok(infinity(sign_of(x) * sign_of(y)))
            }
        }
        Id::Div => match (xi, yi) {
            (true, true) => Err(ErrorKind::UndefinedOperation),
            (true, false) => Ok(infinity(sign_of(x) * sign_of(y))),
            _ => Ok(Value::Int(0)),
        },
        Id::Pow => {
            if xi {
                // ∞^y: grows for positive exponents, vanishes for negative.
                if y.is_zero() {
                    Err(ErrorKind::UndefinedOperation)
                } else if y.is_negative() {
                    Ok(Value::Int(0))
                } else {
                    Ok(infinity(if sign_of(x) < 0 { -1 } else { 1 }))
                }
            } else if x.is_zero() {
                Err(ErrorKind::UndefinedOperation)
            } else {
                Ok(infinity(1))
            }
        }
        _ => Err(ErrorKind::UndefinedOperation),
    }
}

// === non-numeric handling ===============================================

fn non_numeric<Op: ArithOp>(s: &Settings, x: &Value, y: &Value) -> SimpleResult<Option<Value>> {
    match (x, y) {
        // Text: concatenation and repetition.
        (Value::Text(a), Value::Text(b)) if Op::ID == Id::Add => {
            Ok(Some(Value::Text(format!("{a}{b}"))))
        }
        (Value::Text(t), n) | (n, Value::Text(t))
            if Op::ID == Id::Mul && n.as_i64().is_some() =>
        {
            let count = n.as_i64().unwrap_or(0);
            if count < 0 {
                return Err(ErrorKind::Value);
            }
            Ok(Some(Value::Text(t.repeat(count as usize))))
        }
        (Value::Text(_), _) | (_, Value::Text(_)) => Err(ErrorKind::Type),

        // Lists concatenate on add and operate element-wise otherwise.
        (Value::List(a), Value::List(b)) if Op::ID == Id::Add => {
            let mut out = a.clone();
            out.extend(b.iter().cloned());
            Ok(Some(Value::List(out)))
        }
        (Value::List(a), b) if Op::ID == Id::Add => {
            let mut out = a.clone();
            out.push(b.clone());
            Ok(Some(Value::List(out)))
        }
        (a, Value::List(b)) if Op::ID == Id::Add => {
            let mut out = vec![a.clone()];
            out.extend(b.iter().cloned());
            Ok(Some(Value::List(out)))
        }
        (Value::List(a), Value::List(b)) => {
            if a.len() != b.len() {
                return Err(ErrorKind::Value);
            }
            let items = a
                .iter()
                .zip(b)
                .map(|(xa, yb)| apply::<Op>(s, xa.clone(), yb.clone()))
                .collect::<SimpleResult<Vec<_>>>()?;
            Ok(Some(Value::List(items)))
        }
        (Value::List(a), b) => {
            let items = a
                .iter()
                .map(|xa| apply::<Op>(s, xa.clone(), b.clone()))
                .collect::<SimpleResult<Vec<_>>>()?;
            Ok(Some(Value::List(items)))
        }
        (a, Value::List(b)) => {
            let items = b
                .iter()
                .map(|yb| apply::<Op>(s, a.clone(), yb.clone()))
                .collect::<SimpleResult<Vec<_>>>()?;
            Ok(Some(Value::List(items)))
        }

        // Arrays: element-wise, matrix product, matrix power.
        (Value::Array(_), _) | (_, Value::Array(_)) => array_op::<Op>(s, x, y).map(Some),

        // Units, unless the other side stays symbolic.
        (Value::Unit { .. }, other) | (other, Value::Unit { .. })
            if !symbolic_operand(other) =>
        {
            units::unit_arith::<Op>(s, x, y).map(Some)
        }

        _ => Ok(None),
    }
}

fn array_op<Op: ArithOp>(s: &Settings, x: &Value, y: &Value) -> SimpleResult<Value> {
    match (x, y) {
        (Value::Array(a), Value::Array(b)) => {
            if Op::ID == Id::Mul {
                if let (Some(ma), Some(mb)) = (matrix_of(a), matrix_of(b)) {
                    return matmul(s, &ma, &mb);
                }
            }
            if a.len() != b.len() {
                return Err(ErrorKind::Value);
            }
            let items = a
                .iter()
                .zip(b)
                .map(|(xa, yb)| apply::<Op>(s, xa.clone(), yb.clone()))
                .collect::<SimpleResult<Vec<_>>>()?;
            Ok(Value::Array(items))
        }
        (Value::Array(a), b) => {
            if Op::ID == Id::Pow {
                if let (Some(m), Some(n)) = (matrix_of(a), b.as_i64()) {
                    return matpow(s, &m, n);
                }
            }
            let items = a
                .iter()
                .map(|xa| apply::<Op>(s, xa.clone(), b.clone()))
                .collect::<SimpleResult<Vec<_>>>()?;
            Ok(Value::Array(items))
        }
        (a, Value::Array(b)) => {
            let items = b
                .iter()
                .map(|yb| apply::<Op>(s, a.clone(), yb.clone()))
                .collect::<SimpleResult<Vec<_>>>()?;
            Ok(Value::Array(items))
        }
        _ => Err(ErrorKind::Internal),
    }
}

/// Rows of a rectangular matrix, `None` for vectors or ragged arrays.
fn matrix_of(items: &[Value]) -> Option<Vec<Vec<Value>>> {
    let rows: Option<Vec<Vec<Value>>> = items
        .iter()
        .map(|row| match row {
            Value::Array(cells) => Some(cells.clone()),
            _ => None,
        })
        .collect();
    let rows = rows?;
    let width = rows.first()?.len();
    if width > 0 && rows.iter().all(|r| r.len() == width) {
        Some(rows)
    } else {
        None
    }
}

fn matmul(s: &Settings, a: &[Vec<Value>], b: &[Vec<Value>]) -> SimpleResult<Value> {
    let inner = a.first().map(Vec::len).unwrap_or(0);
    if inner != b.len() {
        return Err(ErrorKind::Value);
    }
    let width = b.first().map(Vec::len).unwrap_or(0);
    let mut rows = Vec::with_capacity(a.len());
    for row in a {
        let mut cells = Vec::with_capacity(width);
        for col in 0..width {
            let mut acc = Value::Int(0);
            for (k, cell) in row.iter().enumerate() {
                let product = apply::<MulOp>(s, cell.clone(), b[k][col].clone())?;
                acc = apply::<AddOp>(s, acc, product)?;
            }
            cells.push(acc);
        }
        rows.push(Value::Array(cells));
    }
    Ok(Value::Array(rows))
}

fn matpow(s: &Settings, m: &[Vec<Value>], n: i64) -> SimpleResult<Value> {
    if m.len() != m.first().map(Vec::len).unwrap_or(0) {
        return Err(ErrorKind::Value);
    }
    if !(0..=64).contains(&n) {
        return Err(ErrorKind::Value);
    }
    let size = m.len();
    let mut result: Vec<Vec<Value>> = (0..size)
        .map(|i| {
            (0..size)
                .map(|j| Value::Int((i == j) as i64))
                .collect()
        })
        .collect();
    for _ in 0..n {
        let lhs = Value::Array(result.into_iter().map(Value::Array).collect());
        let rhs = Value::Array(m.iter().cloned().map(Value::Array).collect());
        let Value::Array(rows) = matmul_values(s, lhs, rhs)? else {
            return Err(ErrorKind::Internal);
        };
        result = rows
            .into_iter()
            .map(|row| match row {
                Value::Array(cells) => cells,
                _ => vec![],
            })
            .collect();
    }
    Ok(Value::Array(result.into_iter().map(Value::Array).collect()))
}

fn matmul_values(s: &Settings, a: Value, b: Value) -> SimpleResult<Value> {
    let (Value::Array(a), Value::Array(b)) = (a, b) else {
        return Err(ErrorKind::Internal);
    };
    let (Some(ma), Some(mb)) = (matrix_of(&a), matrix_of(&b)) else {
        return Err(ErrorKind::Internal);
    };
    matmul(s, &ma, &mb)
}

// === numeric promotion ladder ===========================================

fn numeric<Op: ArithOp>(s: &Settings, x: Value, y: Value) -> SimpleResult<Value> {
    // Based integers keep bit-pattern semantics, always wrap, and
    // report their own zero divisors.
    if matches!(x, Value::Based { .. }) || matches!(y, Value::Based { .. }) {
        return based_op::<Op>(s, &x, &y);
    }

    // Division and remainders meet zero denominators here, before any
    // family is chosen.
    if y.is_zero() {
        match Op::ID {
            Id::Div => return zero_divide(s, &x),
            Id::Mod | Id::Rem => return Err(ErrorKind::DivideByZero),
            _ => {}
        }
    }

    // Complex joins before the real lattice collapses.
    if x.id().is_complex() || y.id().is_complex() {
        return match Op::complex(s, &x, &y)? {
            Some(v) => Ok(v.canonical()),
            None => Err(ErrorKind::UndefinedOperation),
        };
    }

    // Ranges and uncertain values.
    if x.id().is_range() || y.id().is_range() {
        return range_op::<Op>(s, &x, &y);
    }

    // Hardware floats cap the lattice.
    if matches!(x, Value::F64(_)) || matches!(y, Value::F64(_)) {
        let (xf, yf) = (to_f64(&x)?, to_f64(&y)?);
        let r = Op::hwdouble(s, xf, yf);
        return hw_result::<Op>(s, r, &x, &y, true);
    }
    if matches!(x, Value::F32(_)) || matches!(y, Value::F32(_)) {
        let (xf, yf) = (to_f64(&x)? as f32, to_f64(&y)? as f32);
        let r = Op::hwfloat(s, xf, yf);
        return hw_result::<Op>(s, r as f64, &x, &y, false);
    }

    // Decimal leaf.
    if matches!(x, Value::Dec(_)) || matches!(y, Value::Dec(_)) {
        let xd = x.to_decimal().ok_or(ErrorKind::Type)?;
        let yd = y.to_decimal().ok_or(ErrorKind::Type)?;
        return Ok(Op::decimal(s, &xd, &yd)?.canonical());
    }

    // Fractions.
    if matches!(x, Value::Frac(_)) || matches!(y, Value::Frac(_)) {
        let xf = as_fraction(&x).ok_or(ErrorKind::Type)?;
        let yf = as_fraction(&y).ok_or(ErrorKind::Type)?;
        match Op::fraction(s, &xf, &yf)? {
            Some(v) => return Ok(v.canonical()),
            None => {
                let xd = x.to_decimal().ok_or(ErrorKind::Type)?;
                let yd = y.to_decimal().ok_or(ErrorKind::Type)?;
                return Ok(Op::decimal(s, &xd, &yd)?.canonical());
            }
        }
    }

    // Machine integers, promoting to bignum on decline.
    if let (Value::Int(xi), Value::Int(yi)) = (&x, &y) {
        if let Some(v) = Op::integer(*xi, *yi) {
            return Ok(v.canonical());
        }
    }
    let xb = x.as_bigint().ok_or(ErrorKind::Type)?;
    let yb = y.as_bigint().ok_or(ErrorKind::Type)?;
    Ok(Op::bignum(s, &xb, &yb)?.canonical())
}

fn based_op<Op: ArithOp>(s: &Settings, x: &Value, y: &Value) -> SimpleResult<Value> {
    let mask = s.word_mask();
    let bits = |v: &Value| -> SimpleResult<u64> {
        match v {
            Value::Based { value, .. } => Ok(*value & mask),
            Value::Int(i) => Ok((*i as u64) & mask),
            Value::Big(b) => {
                let low = b.to_u64().or_else(|| b.to_i64().map(|i| i as u64));
                low.map(|w| w & mask).ok_or(ErrorKind::Value)
            }
            _ => Err(ErrorKind::Type),
        }
    };
    let base = match (x, y) {
        (Value::Based { base, .. }, _) => *base,
        (_, Value::Based { base, .. }) => *base,
        _ => s.base,
    };
    let r = Op::based(bits(x)?, bits(y)?, mask)?;
    Ok(Value::Based {
        value: r & mask,
        base,
        wordsize: s.word_size,
    })
}

fn range_op<Op: ArithOp>(s: &Settings, x: &Value, y: &Value) -> SimpleResult<Value> {
    let uncertain = matches!(x, Value::Uncertain { .. }) || matches!(y, Value::Uncertain { .. });
    if uncertain {
        let (xm, xs) = uncertain_parts(s, x)?;
        let (ym, ys) = uncertain_parts(s, y)?;
        match Op::uncertain(s, (&xm, &xs), (&ym, &ys))? {
            Some((mean, sigma)) => Ok(Value::Uncertain {
                mean: Box::new(mean.canonical()),
                sigma: Box::new(sigma.canonical()),
            }),
            None => Err(ErrorKind::UndefinedOperation),
        }
    } else {
        let form = range_form(x).or_else(|| range_form(y)).unwrap_or(RangeForm::Interval);
        let (xl, xh) = range_parts(x)?;
        let (yl, yh) = range_parts(y)?;
        match Op::range(s, (&xl, &xh), (&yl, &yh))? {
            Some((lo, hi)) => Ok(Value::Range {
                lo: Box::new(lo.canonical()),
                hi: Box::new(hi.canonical()),
                form,
            }),
            None => Err(ErrorKind::UndefinedOperation),
        }
    }
}

fn range_form(v: &Value) -> Option<RangeForm> {
    match v {
        Value::Range { form, .. } => Some(*form),
        _ => None,
    }
}

fn range_parts(v: &Value) -> SimpleResult<(Value, Value)> {
    match v {
        Value::Range { lo, hi, .. } => Ok(((**lo).clone(), (**hi).clone())),
        scalar if scalar.is_real() => Ok((scalar.clone(), scalar.clone())),
        _ => Err(ErrorKind::Type),
    }
}

fn uncertain_parts(s: &Settings, v: &Value) -> SimpleResult<(Value, Value)> {
    match v {
        Value::Uncertain { mean, sigma } => Ok(((**mean).clone(), (**sigma).clone())),
        Value::Range { lo, hi, .. } => {
            // Interval → mean ± half-width.
            let sum = apply::<AddOp>(s, (**lo).clone(), (**hi).clone())?;
            let mean = apply::<DivOp>(s, sum, Value::Int(2))?;
            let width = apply::<SubOp>(s, (**hi).clone(), (**lo).clone())?;
            let sigma = apply::<DivOp>(s, width, Value::Int(2))?;
            Ok((mean, sigma))
        }
        scalar if scalar.is_real() => Ok((scalar.clone(), Value::Int(0))),
        _ => Err(ErrorKind::Type),
    }
}

fn hw_result<Op: ArithOp>(
    s: &Settings,
    r: f64,
    x: &Value,
    y: &Value,
    double: bool,
) -> SimpleResult<Value> {
    if r.is_finite() {
        return Ok(if double {
            Value::F64(r)
        } else {
            Value::F32(r as f32)
        });
    }
    if r.is_nan() {
        return Err(ErrorKind::UndefinedOperation);
    }
    // Overflowed leaf: retry in decimal when both operands convert,
    // otherwise surface the signed infinity.
    if let (Some(xd), Some(yd)) = (x.to_decimal(), y.to_decimal()) {
        if let Ok(v) = Op::decimal(s, &xd, &yd) {
            return Ok(v.canonical());
        }
    }
    if s.infinity_result {
        Ok(infinity(if r < 0.0 { -1 } else { 1 }))
    } else {
        Err(ErrorKind::Overflow)
    }
}

// === shared numeric helpers =============================================

/// Hardware-double view, failing on non-real operands.
pub(crate) fn to_f64(v: &Value) -> SimpleResult<f64> {
    v.to_f64().ok_or(ErrorKind::Type)
}

/// Fraction view of an exact real.
pub(crate) fn as_fraction(v: &Value) -> Option<Fraction> {
    match v {
        Value::Int(i) => Some(Fraction::from_int(BigInt::from(*i))),
        Value::Big(b) => Some(Fraction::from_int(b.clone())),
        Value::Frac(f) => Some(f.clone()),
        _ => None,
    }
}

/// Division of `x` by zero: a signed infinity or an error, by settings.
pub(crate) fn zero_divide(s: &Settings, x: &Value) -> SimpleResult<Value> {
    if x.is_zero() {
        return Err(ErrorKind::UndefinedOperation);
    }
    if s.infinity_result {
        Ok(infinity(if x.is_negative() { -1 } else { 1 }))
    } else {
        Err(ErrorKind::DivideByZero)
    }
}

/// Real square root across families: exact for perfect squares,
/// decimal otherwise. Negative inputs are a value error; the caller
/// promotes to complex.
pub(crate) fn real_sqrt(s: &Settings, v: &Value) -> SimpleResult<Value> {
    if v.is_negative() {
        return Err(ErrorKind::Value);
    }
    match v {
        Value::Int(_) | Value::Big(_) => {
            let big = v.as_bigint().ok_or(ErrorKind::Type)?;
            let root = big.sqrt();
            if &root * &root == big {
                return Ok(Value::Big(root).canonical());
            }
            let d = v.to_decimal().ok_or(ErrorKind::Type)?;
            decimal_sqrt(s, &d)
        }
        Value::Frac(f) => {
            let num = f.numerator().sqrt();
            let den = f.denominator().sqrt();
            if &num * &num == *f.numerator() && &den * &den == *f.denominator() {
                return Ok(Value::Frac(Fraction::new(num, den)?).canonical());
            }
            let d = v.to_decimal().ok_or(ErrorKind::Type)?;
            decimal_sqrt(s, &d)
        }
        Value::Dec(d) => decimal_sqrt(s, d),
        Value::F32(f) => Ok(Value::F32(libm::sqrtf(*f))),
        Value::F64(f) => Ok(Value::F64(libm::sqrt(*f))),
        _ => Err(ErrorKind::Type),
    }
}

pub(crate) fn decimal_sqrt(s: &Settings, d: &BigDecimal) -> SimpleResult<Value> {
    let root = d.sqrt().ok_or(ErrorKind::Value)?;
    Ok(Value::Dec(round_dec(s, root)).canonical())
}

/// Round a decimal to the active precision.
pub(crate) fn round_dec(s: &Settings, d: BigDecimal) -> BigDecimal {
    d.with_prec(s.precision as u64)
}

/// Convert an angle value in the current mode to radians.
pub(crate) fn to_radians(s: &Settings, v: f64) -> f64 {
    match s.angle_mode {
        AngleMode::Degrees => v * core::f64::consts::PI / 180.0,
        AngleMode::Radians => v,
        AngleMode::Grads => v * core::f64::consts::PI / 200.0,
    }
}

/// Convert radians to the current angle mode.
pub(crate) fn from_radians(s: &Settings, v: f64) -> f64 {
    match s.angle_mode {
        AngleMode::Degrees => v * 180.0 / core::f64::consts::PI,
        AngleMode::Radians => v,
        AngleMode::Grads => v * 200.0 / core::f64::consts::PI,
    }
}

/// Rectangular parts of a complex or real operand.
pub(crate) fn complex_parts(v: &Value) -> SimpleResult<(Value, Value)> {
    match v {
        Value::Complex {
            re, im, polar: false,
        } => Ok(((**re).clone(), (**im).clone())),
        Value::Complex {
            re: modulus,
            im: arg,
            polar: true,
        } => {
            let m = to_f64(modulus)?;
            let a = to_f64(arg)? * core::f64::consts::PI;
            Ok((Value::F64(m * libm::cos(a)), Value::F64(m * libm::sin(a))))
        }
        scalar if scalar.is_real() => Ok((scalar.clone(), Value::Int(0))),
        _ => Err(ErrorKind::Type),
    }
}

/// Minimum and maximum of a set of candidate endpoint values.
pub(crate) fn minmax(candidates: Vec<Value>) -> SimpleResult<(Value, Value)> {
    let mut lo: Option<Value> = None;
    let mut hi: Option<Value> = None;
    for c in candidates {
        let lower = match &lo {
            Some(current) => {
                c.cmp_real(current).ok_or(ErrorKind::Type)? == core::cmp::Ordering::Less
            }
            None => true,
        };
        if lower {
            lo = Some(c.clone());
        }
        let higher = match &hi {
            Some(current) => {
                c.cmp_real(current).ok_or(ErrorKind::Type)? == core::cmp::Ordering::Greater
            }
            None => true,
        };
        if higher {
            hi = Some(c);
        }
    }
    match (lo, hi) {
        (Some(lo), Some(hi)) => Ok((lo, hi)),
        _ => Err(ErrorKind::Value),
    }
}
