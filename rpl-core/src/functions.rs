//! Unary algebraic functions.
//!
//! One entry point dispatching on the value family, promoting the way
//! the binary dispatcher does: exact where the family allows, decimal
//! through the external numeric routines otherwise, complex when a
//! real input leaves the real domain (`√-1`, `ln -2`).

use bigdecimal::BigDecimal;
use num_traits::ToPrimitive;
use rpl_types::{ErrorKind, Id};

use crate::arith::{self, apply, AddOp, DivOp, HypotOp, MulOp, PowOp, SubOp};
use crate::error::SimpleResult;
use crate::expr;
use crate::object::Value;
use crate::settings::Settings;
use crate::units;

/// Apply a unary function to a decoded value.
pub fn apply_unary(s: &Settings, id: Id, v: Value) -> SimpleResult<Value> {
    let v = match v {
        Value::Tagged { value, .. } => *value,
        other => other,
    };

    match &v {
        // Containers map element-wise.
        Value::List(items) => {
            let items = items
                .iter()
                .map(|item| apply_unary(s, id, item.clone()))
                .collect::<SimpleResult<Vec<_>>>()?;
            return Ok(Value::List(items));
        }
        Value::Array(items) => {
            let items = items
                .iter()
                .map(|item| apply_unary(s, id, item.clone()))
                .collect::<SimpleResult<Vec<_>>>()?;
            return Ok(Value::Array(items));
        }
        // Symbolic operands defer.
        Value::Sym(_) | Value::Expr(_) | Value::Const { .. } => {
            return Ok(expr::unary(id, v));
        }
        Value::Unit { .. } => return units::unit_unary(s, id, &v),
        Value::Cmd(Id::Infinity) | Value::Cmd(Id::NegInfinity) | Value::Cmd(Id::Undefined) => {
            return infinite_unary(id, &v);
        }
        Value::Complex { .. } => return complex_unary(s, id, &v),
        Value::Range { .. } | Value::Uncertain { .. } => return range_unary(s, id, &v),
        _ => {}
    }

    if !v.is_real() {
        return Err(ErrorKind::Type);
    }

    match id {
        Id::Neg => negate(s, v),
        Id::Abs => {
            if v.is_negative() {
                negate(s, v)
            } else {
                Ok(v)
            }
        }
        Id::Inv => apply::<DivOp>(s, Value::Int(1), v),
        Id::Sq => apply::<MulOp>(s, v.clone(), v),
        Id::Sqrt => {
            if v.is_negative() {
                // √(-x) = (0, √x)
                let root = arith::real_sqrt(s, &negate(s, v)?)?;
                Ok(Value::Complex {
                    re: Box::new(Value::Int(0)),
                    im: Box::new(root),
                    polar: false,
                })
            } else {
                arith::real_sqrt(s, &v)
            }
        }
        Id::Exp => transcendental(s, &v, libm::exp, libm::expf),
        Id::Ln => {
            if v.is_zero() {
                return if s.infinity_result {
                    Ok(Value::Cmd(Id::NegInfinity))
                } else {
                    Err(ErrorKind::Value)
                };
            }
            if v.is_negative() {
                // ln(-x) = ln x + iπ
                let ln = apply_unary(s, Id::Ln, negate(s, v)?)?;
                return Ok(Value::Complex {
                    re: Box::new(ln),
                    im: Box::new(Value::F64(core::f64::consts::PI)),
                    polar: false,
                });
            }
            transcendental(s, &v, libm::log, libm::logf)
        }
        Id::Sin => angle_fn(s, &v, libm::sin),
        Id::Cos => angle_fn(s, &v, libm::cos),
        Id::Tan => angle_fn(s, &v, libm::tan),
        _ => Err(ErrorKind::Type),
    }
}

fn negate(s: &Settings, v: Value) -> SimpleResult<Value> {
    match v {
        Value::Int(i) => match i.checked_neg() {
            Some(n) => Ok(Value::Int(n)),
            None => Ok(Value::Big(-num_bigint::BigInt::from(i))),
        },
        Value::Based {
            value,
            base,
            wordsize,
        } => Ok(Value::Based {
            value: value.wrapping_neg() & s.word_mask(),
            base,
            wordsize,
        }),
        Value::Big(b) => Ok(Value::Big(-b).canonical()),
        Value::Frac(f) => Ok(Value::Frac(f.neg())),
        Value::Dec(d) => Ok(Value::Dec(-d)),
        Value::F32(f) => Ok(Value::F32(-f)),
        Value::F64(f) => Ok(Value::F64(-f)),
        _ => Err(ErrorKind::Type),
    }
}

/// Decimal-or-hardware path for the transcendental leaves.
fn transcendental(
    s: &Settings,
    v: &Value,
    f64_op: fn(f64) -> f64,
    f32_op: fn(f32) -> f32,
) -> SimpleResult<Value> {
    match v {
        Value::F32(f) => Ok(Value::F32(f32_op(*f))),
        Value::F64(f) => Ok(Value::F64(f64_op(*f))),
        _ => {
            let x = v.to_f64().ok_or(ErrorKind::Type)?;
            let r = f64_op(x);
            if !r.is_finite() {
                return Err(ErrorKind::Overflow);
            }
            let d = BigDecimal::try_from(r).map_err(|_| ErrorKind::Overflow)?;
            Ok(Value::Dec(arith::round_dec(s, d)).canonical())
        }
    }
}

fn angle_fn(s: &Settings, v: &Value, f: fn(f64) -> f64) -> SimpleResult<Value> {
    match v {
        Value::F32(x) => Ok(Value::F32(f(arith::to_radians(s, *x as f64)) as f32)),
        Value::F64(x) => Ok(Value::F64(f(arith::to_radians(s, *x)))),
        _ => {
            let x = v.to_f64().ok_or(ErrorKind::Type)?;
            let r = f(arith::to_radians(s, x));
            let d = BigDecimal::try_from(r).map_err(|_| ErrorKind::Value)?;
            Ok(Value::Dec(arith::round_dec(s, d)).canonical())
        }
    }
}

fn infinite_unary(id: Id, v: &Value) -> SimpleResult<Value> {
    match (id, v) {
        (_, Value::Cmd(Id::Undefined)) => Ok(Value::Cmd(Id::Undefined)),
        (Id::Neg, Value::Cmd(Id::Infinity)) => Ok(Value::Cmd(Id::NegInfinity)),
        (Id::Neg, Value::Cmd(Id::NegInfinity)) => Ok(Value::Cmd(Id::Infinity)),
        (Id::Abs | Id::Sq, _) => Ok(Value::Cmd(Id::Infinity)),
        (Id::Inv, _) => Ok(Value::Int(0)),
        (Id::Exp, Value::Cmd(Id::Infinity)) => Ok(Value::Cmd(Id::Infinity)),
        (Id::Exp, Value::Cmd(Id::NegInfinity)) => Ok(Value::Int(0)),
        (Id::Ln | Id::Sqrt, Value::Cmd(Id::Infinity)) => Ok(Value::Cmd(Id::Infinity)),
        _ => Err(ErrorKind::UndefinedOperation),
    }
}

fn complex_unary(s: &Settings, id: Id, z: &Value) -> SimpleResult<Value> {
    let (re, im) = arith::complex_parts(z)?;
    match id {
        Id::Neg => Ok(Value::Complex {
            re: Box::new(apply::<MulOp>(s, Value::Int(-1), re)?),
            im: Box::new(apply::<MulOp>(s, Value::Int(-1), im)?),
            polar: false,
        }),
        Id::Abs => apply::<HypotOp>(s, re, im),
        Id::Sq => apply::<MulOp>(s, z.clone(), z.clone()),
        Id::Inv => apply::<DivOp>(s, Value::Int(1), z.clone()),
        Id::Sqrt => {
            // Exact half-angle form: √z = (√((m+a)/2), sign(b)·√((m−a)/2))
            let m = apply::<HypotOp>(s, re.clone(), im.clone())?;
            let re_sq = apply::<DivOp>(s, apply::<AddOp>(s, m.clone(), re.clone())?, Value::Int(2))?;
            let im_sq = apply::<DivOp>(s, apply::<SubOp>(s, m, re)?, Value::Int(2))?;
            let new_re = arith::real_sqrt(s, &re_sq)?;
            let mut new_im = arith::real_sqrt(s, &im_sq)?;
            if im.is_negative() {
                new_im = apply::<MulOp>(s, Value::Int(-1), new_im)?;
            }
            Ok(Value::Complex {
                re: Box::new(new_re),
                im: Box::new(new_im),
                polar: false,
            })
        }
        Id::Exp => {
            // e^(a+bi) = e^a·(cos b, sin b)
            let a = arith::to_f64(&re)?;
            let b = arith::to_f64(&im)?;
            let scale = libm::exp(a);
            Ok(Value::Complex {
                re: Box::new(Value::F64(scale * libm::cos(b))),
                im: Box::new(Value::F64(scale * libm::sin(b))),
                polar: false,
            })
        }
        Id::Ln => {
            let a = arith::to_f64(&re)?;
            let b = arith::to_f64(&im)?;
            Ok(Value::Complex {
                re: Box::new(Value::F64(libm::log(libm::hypot(a, b)))),
                im: Box::new(Value::F64(libm::atan2(b, a))),
                polar: false,
            })
        }
        Id::Sin | Id::Cos | Id::Tan => {
            let a = arith::to_f64(&re)?;
            let b = arith::to_f64(&im)?;
            let (sr, si) = match id {
                Id::Sin => (
                    libm::sin(a) * libm::cosh(b),
                    libm::cos(a) * libm::sinh(b),
                ),
                Id::Cos => (
                    libm::cos(a) * libm::cosh(b),
                    -libm::sin(a) * libm::sinh(b),
                ),
                _ => {
                    let denom = libm::cos(2.0 * a) + libm::cosh(2.0 * b);
                    (
                        libm::sin(2.0 * a) / denom,
                        libm::sinh(2.0 * b) / denom,
                    )
                }
            };
            Ok(Value::Complex {
                re: Box::new(Value::F64(sr)),
                im: Box::new(Value::F64(si)),
                polar: false,
            })
        }
        _ => Err(ErrorKind::Type),
    }
}

fn range_unary(s: &Settings, id: Id, v: &Value) -> SimpleResult<Value> {
    match v {
        Value::Uncertain { mean, sigma } => {
            // Linear propagation: f(m) ± |f'(m)|·σ through a hardware
            // derivative.
            let m = arith::to_f64(mean)?;
            let d = match id {
                Id::Neg => 1.0,
                Id::Abs => 1.0,
                Id::Sq => 2.0 * m,
                Id::Sqrt => 0.5 / libm::sqrt(m),
                Id::Inv => 1.0 / (m * m),
                Id::Exp => libm::exp(m),
                Id::Ln => 1.0 / m,
                _ => return Err(ErrorKind::UndefinedOperation),
            };
            let mean = apply_unary(s, id, (**mean).clone())?;
            let factor = BigDecimal::try_from(d.abs()).map_err(|_| ErrorKind::Value)?;
            let sigma = apply::<MulOp>(s, Value::Dec(factor), (**sigma).clone())?;
            Ok(Value::Uncertain {
                mean: Box::new(mean.canonical()),
                sigma: Box::new(sigma.canonical()),
            })
        }
        Value::Range { lo, hi, form } => {
            let a = apply_unary(s, id, (**lo).clone())?;
            let b = apply_unary(s, id, (**hi).clone())?;
            match id {
                // Monotonic maps keep endpoint order or reverse it.
                Id::Neg | Id::Sqrt | Id::Exp | Id::Ln => {
                    let (lo, hi) = arith::minmax(vec![a, b])?;
                    Ok(Value::Range {
                        lo: Box::new(lo),
                        hi: Box::new(hi),
                        form: *form,
                    })
                }
                Id::Abs | Id::Sq => {
                    let straddles = lo.is_negative() && !hi.is_negative();
                    let (low, high) = arith::minmax(vec![a, b])?;
                    let low = if straddles { Value::Int(0) } else { low };
                    Ok(Value::Range {
                        lo: Box::new(low),
                        hi: Box::new(high),
                        form: *form,
                    })
                }
                Id::Inv => {
                    if lo.is_negative() != hi.is_negative() {
                        return Err(ErrorKind::DivideByZero);
                    }
                    let (lo, hi) = arith::minmax(vec![a, b])?;
                    Ok(Value::Range {
                        lo: Box::new(lo),
                        hi: Box::new(hi),
                        form: *form,
                    })
                }
                _ => Err(ErrorKind::UndefinedOperation),
            }
        }
        _ => Err(ErrorKind::Type),
    }
}

/// Apply a binary arithmetic command by id; the command table routes
/// through this.
pub fn apply_binary(s: &Settings, id: Id, x: Value, y: Value) -> SimpleResult<Value> {
    match id {
        Id::Add => apply::<AddOp>(s, x, y),
        Id::Sub => apply::<SubOp>(s, x, y),
        Id::Mul => apply::<MulOp>(s, x, y),
        Id::Div => apply::<DivOp>(s, x, y),
        Id::Mod => apply::<arith::ModOp>(s, x, y),
        Id::Rem => apply::<arith::RemOp>(s, x, y),
        Id::Pow => apply::<PowOp>(s, x, y),
        Id::Hypot => apply::<HypotOp>(s, x, y),
        Id::Atan2 => apply::<arith::Atan2Op>(s, x, y),
        _ => Err(ErrorKind::Type),
    }
}

/// Logical operations over based integers (plain integers are masked
/// in).
pub fn apply_logical(s: &Settings, id: Id, x: Value, y: Option<Value>) -> SimpleResult<Value> {
    let mask = s.word_mask();
    let bits = |v: &Value| -> SimpleResult<(u64, u8)> {
        match v {
            Value::Based { value, base, .. } => Ok((*value & mask, *base)),
            Value::Int(i) => Ok(((*i as u64) & mask, s.base)),
            Value::Big(b) => b
                .to_u64()
                .map(|w| (w & mask, s.base))
                .ok_or(ErrorKind::Value),
            _ => Err(ErrorKind::Type),
        }
    };
    let (xv, base) = bits(&x)?;
    let value = match id {
        Id::BitNot => !xv & mask,
        Id::ShiftLeft => (xv << 1) & mask,
        Id::ShiftRight => xv >> 1,
        _ => {
            let (yv, _) = bits(y.as_ref().ok_or(ErrorKind::TooFewArguments)?)?;
            match id {
                Id::And => xv & yv,
                Id::Or => xv | yv,
                Id::Xor => xv ^ yv,
                _ => return Err(ErrorKind::Type),
            }
        }
    };
    Ok(Value::Based {
        value: value & mask,
        base,
        wordsize: s.word_size,
    })
}
