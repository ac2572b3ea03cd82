//! Units: expressions, dimensions, conversion and the constant table.
//!
//! A unit expression is an ordinary postfix expression over unit
//! symbols, integer exponents, `*`, `/` and `^`. Conversion resolves
//! symbols through the unit table (SI prefixes included) into a scale
//! and a dimension vector; multiplication and division combine
//! expressions symbolically and only merge like factors.
//!
//! Scales are exact rationals with a separate power of π so the angle
//! units convert exactly among themselves.

use num_bigint::BigInt;
use rpl_types::{ErrorKind, Id};
use std::collections::BTreeMap;

use crate::arith::{self, apply, AddOp, ArithOp, DivOp, MulOp, SubOp};
use crate::error::SimpleResult;
use crate::object::{Fraction, Value};
use crate::settings::Settings;

/// Base dimensions: metre, kilogram, second, ampere, kelvin, mole,
/// candela, radian, day-number.
pub const DIMS: usize = 9;

/// Exponents over the base dimensions.
pub type Dims = [i32; DIMS];

const DIMLESS: Dims = [0; DIMS];

fn dim(index: usize) -> Dims {
    let mut d = DIMLESS;
    d[index] = 1;
    d
}

/// An exact scale: `fraction · π^pi`.
#[derive(Debug, Clone, PartialEq)]
pub struct Scale {
    frac: Fraction,
    pi: i32,
}

impl Scale {
    fn one() -> Scale {
        Scale {
            frac: Fraction::from_int(BigInt::from(1)),
            pi: 0,
        }
    }

    fn ratio(num: i64, den: i64) -> Scale {
        Scale {
            frac: Fraction::new(BigInt::from(num), BigInt::from(den))
                .expect("static scale"),
            pi: 0,
        }
    }

    fn pi_ratio(num: i64, den: i64) -> Scale {
        Scale {
            frac: Fraction::new(BigInt::from(num), BigInt::from(den))
                .expect("static scale"),
            pi: 1,
        }
    }

    fn mul(&self, other: &Scale) -> SimpleResult<Scale> {
        Ok(Scale {
            frac: self.frac.mul(&other.frac)?,
            pi: self.pi + other.pi,
        })
    }

    fn div(&self, other: &Scale) -> SimpleResult<Scale> {
        Ok(Scale {
            frac: self.frac.div(&other.frac)?,
            pi: self.pi - other.pi,
        })
    }

    fn pow(&self, n: i32) -> SimpleResult<Scale> {
        Ok(Scale {
            frac: self.frac.pow(n as i64)?,
            pi: self.pi * n,
        })
    }

    /// Multiply a value by this scale, exactly when the π power is
    /// zero.
    fn apply_to(&self, s: &Settings, value: Value) -> SimpleResult<Value> {
        let scaled = apply::<MulOp>(s, value, Value::Frac(self.frac.clone()).canonical())?;
        if self.pi == 0 {
            return Ok(scaled);
        }
        let pi = libm::pow(core::f64::consts::PI, self.pi as f64);
        let pi = bigdecimal::BigDecimal::try_from(pi).map_err(|_| ErrorKind::Value)?;
        apply::<MulOp>(s, scaled, Value::Dec(pi))
    }
}

struct UnitDef {
    name: &'static str,
    scale: Scale,
    dims: Dims,
}

fn unit_table() -> Vec<UnitDef> {
    let m = dim(0);
    let kg = dim(1);
    let s = dim(2);
    let rad = dim(7);
    let date = dim(8);
    let mul = |a: Dims, b: Dims| {
        let mut out = DIMLESS;
        for i in 0..DIMS {
            out[i] = a[i] + b[i];
        }
        out
    };
    let inv = |a: Dims| {
        let mut out = DIMLESS;
        for i in 0..DIMS {
            out[i] = -a[i];
        }
        out
    };
    let accel = {
        let mut d = m;
        d[2] = -2;
        d
    };
    let force = mul(kg, accel);
    let energy = mul(force, m);
    vec![
        UnitDef { name: "m", scale: Scale::one(), dims: m },
        UnitDef { name: "g", scale: Scale::ratio(1, 1000), dims: kg },
        UnitDef { name: "s", scale: Scale::one(), dims: s },
        UnitDef { name: "A", scale: Scale::one(), dims: dim(3) },
        UnitDef { name: "K", scale: Scale::one(), dims: dim(4) },
        UnitDef { name: "mol", scale: Scale::one(), dims: dim(5) },
        UnitDef { name: "cd", scale: Scale::one(), dims: dim(6) },
        UnitDef { name: "rad", scale: Scale::one(), dims: rad },
        UnitDef { name: "deg", scale: Scale::pi_ratio(1, 180), dims: rad },
        UnitDef { name: "°", scale: Scale::pi_ratio(1, 180), dims: rad },
        UnitDef { name: "grad", scale: Scale::pi_ratio(1, 200), dims: rad },
        UnitDef { name: "in", scale: Scale::ratio(254, 10_000), dims: m },
        UnitDef { name: "ft", scale: Scale::ratio(3048, 10_000), dims: m },
        UnitDef { name: "yd", scale: Scale::ratio(9144, 10_000), dims: m },
        UnitDef { name: "mi", scale: Scale::ratio(1_609_344, 1000), dims: m },
        UnitDef { name: "L", scale: Scale::ratio(1, 1000), dims: mul(m, mul(m, m)) },
        UnitDef { name: "min", scale: Scale::ratio(60, 1), dims: s },
        UnitDef { name: "h", scale: Scale::ratio(3600, 1), dims: s },
        UnitDef { name: "d", scale: Scale::ratio(86_400, 1), dims: s },
        UnitDef { name: "yr", scale: Scale::ratio(31_557_600, 1), dims: s },
        UnitDef { name: "Hz", scale: Scale::one(), dims: inv(s) },
        UnitDef { name: "N", scale: Scale::ratio(1000, 1), dims: force },
        UnitDef { name: "J", scale: Scale::ratio(1000, 1), dims: energy },
        UnitDef { name: "W", scale: Scale::ratio(1000, 1), dims: mul(energy, inv(s)) },
        UnitDef { name: "Pa", scale: Scale::ratio(1000, 1), dims: mul(force, inv(mul(m, m))) },
        UnitDef { name: "%", scale: Scale::ratio(1, 100), dims: DIMLESS },
        UnitDef { name: "date", scale: Scale::one(), dims: date },
    ]
}

/// SI prefixes recognized in front of any table unit.
const PREFIXES: &[(&str, i64, i64)] = &[
    ("T", 1_000_000_000_000, 1),
    ("G", 1_000_000_000, 1),
    ("M", 1_000_000, 1),
    ("k", 1000, 1),
    ("h", 100, 1),
    ("da", 10, 1),
    ("d", 1, 10),
    ("c", 1, 100),
    ("m", 1, 1000),
    ("µ", 1, 1_000_000),
    ("u", 1, 1_000_000),
    ("n", 1, 1_000_000_000),
    ("p", 1, 1_000_000_000_000),
];

/// The default SI prefix cycle stepped by the unit-prefix key; a
/// `UnitPrefixCycle` text variable overrides it.
pub const SI_PREFIX_CYCLE: &[&str] = &["", "k", "M", "G", "m", "µ", "n"];

/// Resolve a unit symbol, prefix included, to its scale and dimensions.
fn resolve_symbol(name: &str) -> SimpleResult<(Scale, Dims)> {
    let table = unit_table();
    if let Some(def) = table.iter().find(|def| def.name == name) {
        return Ok((def.scale.clone(), def.dims));
    }
    for (prefix, num, den) in PREFIXES {
        if let Some(rest) = name.strip_prefix(prefix) {
            if !rest.is_empty() {
                if let Some(def) = table.iter().find(|def| def.name == rest) {
                    let scale = Scale::ratio(*num, *den).mul(&def.scale)?;
                    return Ok((scale, def.dims));
                }
            }
        }
    }
    Err(ErrorKind::InvalidUnit)
}

// === unit expressions ====================================================

/// Signed exponents per unit symbol, the canonical factored form.
pub type Factors = BTreeMap<String, i32>;

/// Factor a unit expression's postfix tokens.
pub fn factors_of(tokens: &[Value]) -> SimpleResult<Factors> {
    // Walk the postfix body with a stack of factor maps.
    let mut stack: Vec<Factors> = Vec::new();
    for token in tokens {
        match token {
            Value::Sym(name) => {
                let mut f = Factors::new();
                f.insert(name.clone(), 1);
                stack.push(f);
            }
            Value::Int(_) | Value::Frac(_) => {
                // Numeric exponent operand, held until `^`.
                let mut f = Factors::new();
                f.insert(String::new(), exponent_of(token)?);
                stack.push(f);
            }
            Value::Cmd(Id::Mul) => {
                let b = stack.pop().ok_or(ErrorKind::InvalidUnit)?;
                let a = stack.pop().ok_or(ErrorKind::InvalidUnit)?;
                stack.push(merge(a, b, 1));
            }
            Value::Cmd(Id::Div) => {
                let b = stack.pop().ok_or(ErrorKind::InvalidUnit)?;
                let a = stack.pop().ok_or(ErrorKind::InvalidUnit)?;
                stack.push(merge(a, b, -1));
            }
            Value::Cmd(Id::Pow) => {
                let exp = stack.pop().ok_or(ErrorKind::InvalidUnit)?;
                let base = stack.pop().ok_or(ErrorKind::InvalidUnit)?;
                let n = *exp.get("").ok_or(ErrorKind::InvalidUnit)?;
                let mut out = Factors::new();
                for (name, e) in base {
                    out.insert(name, e * n);
                }
                stack.push(out);
            }
            _ => return Err(ErrorKind::InvalidUnit),
        }
    }
    let factors = stack.pop().ok_or(ErrorKind::InvalidUnit)?;
    if !stack.is_empty() {
        return Err(ErrorKind::InvalidUnit);
    }
    Ok(factors
        .into_iter()
        .filter(|(name, e)| !name.is_empty() && *e != 0)
        .collect())
}

fn exponent_of(v: &Value) -> SimpleResult<i32> {
    v.as_i64()
        .and_then(|n| i32::try_from(n).ok())
        .ok_or(ErrorKind::InvalidUnit)
}

fn merge(mut a: Factors, b: Factors, sign: i32) -> Factors {
    for (name, e) in b {
        *a.entry(name).or_insert(0) += sign * e;
    }
    a.retain(|_, e| *e != 0);
    a
}

/// Rebuild a canonical postfix unit expression from factors.
pub fn expr_of(factors: &Factors) -> Value {
    let mut positive: Vec<(&String, i32)> = Vec::new();
    let mut negative: Vec<(&String, i32)> = Vec::new();
    for (name, &e) in factors {
        if e > 0 {
            positive.push((name, e));
        } else if e < 0 {
            negative.push((name, -e));
        }
    }
    let product = |parts: &[(&String, i32)]| -> Option<Value> {
        let mut acc: Option<Value> = None;
        for (name, e) in parts {
            let factor = if *e == 1 {
                Value::Sym((*name).clone())
            } else {
                crate::expr::binary(Id::Pow, Value::Sym((*name).clone()), Value::Int(*e as i64))
            };
            acc = Some(match acc {
                Some(prev) => crate::expr::binary(Id::Mul, prev, factor),
                None => factor,
            });
        }
        acc
    };
    let num = product(&positive);
    let den = product(&negative);
    let expr = match (num, den) {
        (Some(n), Some(d)) => crate::expr::binary(Id::Div, n, d),
        (Some(n), None) => n,
        (None, Some(d)) => crate::expr::binary(Id::Div, Value::Int(1), d),
        (None, None) => Value::Int(1),
    };
    crate::expr::quote(expr)
}

/// Resolve a factored unit to total scale and dimensions.
pub fn resolve(factors: &Factors) -> SimpleResult<(Scale, Dims)> {
    let mut scale = Scale::one();
    let mut dims = DIMLESS;
    for (name, &e) in factors {
        let (s, d) = resolve_symbol(name)?;
        scale = scale.mul(&s.pow(e)?)?;
        for i in 0..DIMS {
            dims[i] += d[i] * e;
        }
    }
    Ok((scale, dims))
}

fn unit_parts(v: &Value) -> SimpleResult<(Value, Factors)> {
    match v {
        Value::Unit { value, unit } => {
            let tokens = match &**unit {
                Value::Expr(tokens) => tokens.clone(),
                Value::Sym(name) => vec![Value::Sym(name.clone())],
                _ => return Err(ErrorKind::InvalidUnit),
            };
            Ok(((**value).clone(), factors_of(&tokens)?))
        }
        plain if plain.is_real() => Ok((plain.clone(), Factors::new())),
        _ => Err(ErrorKind::Type),
    }
}

fn with_unit(value: Value, factors: &Factors) -> Value {
    if factors.is_empty() {
        return value.canonical();
    }
    Value::Unit {
        value: Box::new(value.canonical()),
        unit: Box::new(expr_of(factors)),
    }
}

/// Convert `value` from `from` factors into `to` factors.
pub fn convert_value(
    s: &Settings,
    value: Value,
    from: &Factors,
    to: &Factors,
) -> SimpleResult<Value> {
    let (from_scale, from_dims) = resolve(from)?;
    let (to_scale, to_dims) = resolve(to)?;
    if from_dims != to_dims {
        return Err(ErrorKind::InconsistentUnits);
    }
    from_scale.div(&to_scale)?.apply_to(s, value)
}

// === arithmetic hook =====================================================

const DATE_DIM: usize = 8;

/// Binary arithmetic where at least one operand carries a unit.
pub fn unit_arith<Op: ArithOp>(s: &Settings, x: &Value, y: &Value) -> SimpleResult<Value> {
    let (xv, xf) = unit_parts(x)?;
    let (yv, yf) = unit_parts(y)?;
    match Op::ID {
        Id::Add | Id::Sub | Id::Hypot | Id::Mod | Id::Rem => {
            let (_, xd) = resolve(&xf)?;
            let (_, yd) = resolve(&yf)?;
            if xd[DATE_DIM] != 0 || yd[DATE_DIM] != 0 {
                return date_arith::<Op>(s, (xv, &xf, xd), (yv, &yf, yd));
            }
            if xf.is_empty() && !yf.is_empty() {
                return Err(ErrorKind::InconsistentUnits);
            }
            let yv = convert_value(s, yv, &yf, &xf)?;
            let value = apply_op::<Op>(s, xv, yv)?;
            Ok(with_unit(value, &xf))
        }
        Id::Mul => {
            let value = apply_op::<Op>(s, xv, yv)?;
            Ok(with_unit(value, &merge(xf, yf, 1)))
        }
        Id::Div => {
            let value = apply_op::<Op>(s, xv, yv)?;
            Ok(with_unit(value, &merge(xf, yf, -1)))
        }
        Id::Pow => {
            if !yf.is_empty() {
                return Err(ErrorKind::InvalidUnit);
            }
            let n = yv.as_i64().ok_or(ErrorKind::InvalidUnit)?;
            let n32 = i32::try_from(n).map_err(|_| ErrorKind::InvalidUnit)?;
            let value = apply_op::<Op>(s, xv, yv)?;
            let factors: Factors = xf
                .into_iter()
                .map(|(name, e)| (name, e * n32))
                .collect();
            Ok(with_unit(value, &factors))
        }
        Id::Atan2 => {
            let yv = convert_value(s, yv, &yf, &xf)?;
            apply_op::<Op>(s, xv, yv)
        }
        _ => Err(ErrorKind::Type),
    }
}

fn apply_op<Op: ArithOp>(s: &Settings, x: Value, y: Value) -> SimpleResult<Value> {
    apply::<Op>(s, x, y)
}

/// Dates and date-deltas: `date - date` is days between, `date ± n`
/// shifts by days or any duration.
fn date_arith<Op: ArithOp>(
    s: &Settings,
    x: (Value, &Factors, Dims),
    y: (Value, &Factors, Dims),
) -> SimpleResult<Value> {
    let (xv, xf, xd) = x;
    let (yv, yf, yd) = y;
    let x_is_date = xd[DATE_DIM] != 0;
    let y_is_date = yd[DATE_DIM] != 0;
    let day_factors: Factors = [("d".to_owned(), 1)].into_iter().collect();
    match (Op::ID, x_is_date, y_is_date) {
        (Id::Sub, true, true) => {
            // Days between two dates.
            let days = apply::<SubOp>(s, xv, yv)?;
            Ok(with_unit(days, &day_factors))
        }
        (Id::Add, true, false) | (Id::Sub, true, false) => {
            // Shift a date by a duration (converted to days) or a bare
            // number of days.
            let days = if yf.is_empty() {
                yv
            } else {
                convert_value(s, yv, yf, &day_factors)?
            };
            let shifted = if Op::ID == Id::Add {
                apply::<AddOp>(s, xv, days)?
            } else {
                apply::<SubOp>(s, xv, days)?
            };
            Ok(with_unit(shifted, xf))
        }
        (Id::Add, false, true) => {
            let days = if xf.is_empty() {
                xv
            } else {
                convert_value(s, xv, xf, &day_factors)?
            };
            let shifted = apply::<AddOp>(s, days, yv)?;
            Ok(with_unit(shifted, yf))
        }
        _ => Err(ErrorKind::InconsistentUnits),
    }
}

/// Unary functions over unit values.
pub fn unit_unary(s: &Settings, id: Id, v: &Value) -> SimpleResult<Value> {
    let (value, factors) = unit_parts(v)?;
    match id {
        Id::Neg | Id::Abs => {
            let value = crate::functions::apply_unary(s, id, value)?;
            Ok(with_unit(value, &factors))
        }
        Id::Inv => {
            let value = apply::<DivOp>(s, Value::Int(1), value)?;
            let inverted: Factors = factors.into_iter().map(|(n, e)| (n, -e)).collect();
            Ok(with_unit(value, &inverted))
        }
        Id::Sq => {
            let value = apply::<MulOp>(s, value.clone(), value)?;
            let squared: Factors = factors.into_iter().map(|(n, e)| (n, e * 2)).collect();
            Ok(with_unit(value, &squared))
        }
        Id::Sqrt => {
            if factors.values().any(|e| e % 2 != 0) {
                return Err(ErrorKind::InvalidUnit);
            }
            let value = arith::real_sqrt(s, &value)?;
            let halved: Factors = factors.into_iter().map(|(n, e)| (n, e / 2)).collect();
            Ok(with_unit(value, &halved))
        }
        _ => Err(ErrorKind::InvalidUnit),
    }
}

// === constants ===========================================================

/// Built-in constant lookup for `Ⓒname` references and the constant
/// menu.
pub fn constant(name: &str) -> Option<Value> {
    let dec = |digits: &str| -> Value {
        use std::str::FromStr;
        Value::Dec(bigdecimal::BigDecimal::from_str(digits).expect("static constant"))
    };
    match name {
        "π" | "pi" => Some(dec("3.14159265358979323846264338327950")),
        "e" => Some(dec("2.71828182845904523536028747135266")),
        "ⅈ" | "i" => Some(Value::Complex {
            re: Box::new(Value::Int(0)),
            im: Box::new(Value::Int(1)),
            polar: false,
        }),
        "c" => Some(Value::Unit {
            value: Box::new(Value::Int(299_792_458)),
            unit: Box::new(expr_of(
                &[("m".to_owned(), 1), ("s".to_owned(), -1)].into_iter().collect(),
            )),
        }),
        "g" => Some(Value::Unit {
            value: Box::new(dec("9.80665")),
            unit: Box::new(expr_of(
                &[("m".to_owned(), 1), ("s".to_owned(), -2)].into_iter().collect(),
            )),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpl_types::Id;

    fn unit(value: Value, spec: &[(&str, i32)]) -> Value {
        let factors: Factors = spec
            .iter()
            .map(|(n, e)| ((*n).to_owned(), *e))
            .collect();
        with_unit(value, &factors)
    }

    #[test]
    fn metre_plus_foot_converts_exactly() {
        let s = Settings::default();
        let x = unit(Value::Int(1), &[("m", 1)]);
        let y = unit(Value::Int(1), &[("ft", 1)]);
        let sum = unit_arith::<crate::arith::AddOp>(&s, &x, &y).unwrap();
        let Value::Unit { value, .. } = sum else {
            panic!("expected unit result");
        };
        // 1 + 3048/10000 = 1.3048 exactly, as a fraction.
        let expected = Value::Frac(
            Fraction::new(BigInt::from(13_048), BigInt::from(10_000)).unwrap(),
        )
        .canonical();
        assert_eq!(*value, expected);
    }

    #[test]
    fn metre_plus_second_is_inconsistent() {
        let s = Settings::default();
        let x = unit(Value::Int(1), &[("m", 1)]);
        let y = unit(Value::Int(1), &[("s", 1)]);
        assert_eq!(
            unit_arith::<crate::arith::AddOp>(&s, &x, &y),
            Err(ErrorKind::InconsistentUnits)
        );
    }

    #[test]
    fn multiplication_merges_like_factors() {
        let s = Settings::default();
        let x = unit(Value::Int(2), &[("m", 1)]);
        let y = unit(Value::Int(3), &[("m", 1)]);
        let product = unit_arith::<crate::arith::MulOp>(&s, &x, &y).unwrap();
        let Value::Unit { value, unit: u } = product else {
            panic!("expected unit result");
        };
        assert_eq!(*value, Value::Int(6));
        let Value::Expr(tokens) = *u else {
            panic!("expected unit expression");
        };
        assert_eq!(factors_of(&tokens).unwrap(), {
            let mut f = Factors::new();
            f.insert("m".to_owned(), 2);
            f
        });
    }

    #[test]
    fn division_cancels_units_entirely() {
        let s = Settings::default();
        let x = unit(Value::Int(6), &[("m", 1)]);
        let y = unit(Value::Int(2), &[("m", 1)]);
        let q = unit_arith::<crate::arith::DivOp>(&s, &x, &y).unwrap();
        assert_eq!(q, Value::Int(3));
    }

    #[test]
    fn round_trip_conversion_is_identity() {
        let s = Settings::default();
        let metres: Factors = [("m".to_owned(), 1)].into_iter().collect();
        let feet: Factors = [("ft".to_owned(), 1)].into_iter().collect();
        let x = Value::Int(7);
        let there = convert_value(&s, x.clone(), &metres, &feet).unwrap();
        let back = convert_value(&s, there, &feet, &metres).unwrap();
        assert_eq!(back, x);
    }

    #[test]
    fn prefixes_resolve_through_the_table() {
        let (scale, dims) = resolve_symbol("km").unwrap();
        assert_eq!(dims, dim(0));
        assert_eq!(scale, Scale::ratio(1000, 1));
        let (scale, _) = resolve_symbol("kg").unwrap();
        assert_eq!(scale, Scale::one());
    }

    #[test]
    fn date_difference_is_days() {
        let s = Settings::default();
        let d1 = unit(Value::Int(1000), &[("date", 1)]);
        let d2 = unit(Value::Int(990), &[("date", 1)]);
        let diff = unit_arith::<crate::arith::SubOp>(&s, &d1, &d2).unwrap();
        let Value::Unit { value, .. } = diff else {
            panic!("expected unit result");
        };
        assert_eq!(*value, Value::Int(10));
    }

    #[test]
    fn angle_units_convert_exactly_between_each_other() {
        let s = Settings::default();
        let degs: Factors = [("deg".to_owned(), 1)].into_iter().collect();
        let grads: Factors = [("grad".to_owned(), 1)].into_iter().collect();
        // 90° = 100 grads, exactly: the π factors cancel.
        let converted = convert_value(&s, Value::Int(90), &degs, &grads).unwrap();
        assert_eq!(converted, Value::Int(100));
    }

    #[test]
    fn unknown_units_are_rejected() {
        assert_eq!(resolve_symbol("xyzzy"), Err(ErrorKind::InvalidUnit));
    }

    #[test]
    fn sqrt_halves_even_exponents() {
        let s = Settings::default();
        let area = unit(Value::Int(9), &[("m", 2)]);
        let side = unit_unary(&s, Id::Sqrt, &area).unwrap();
        assert_eq!(side, unit(Value::Int(3), &[("m", 1)]));
    }
}
