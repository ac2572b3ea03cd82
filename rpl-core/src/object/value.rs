//! Decoded object view.
//!
//! Byte records are the storage of record; computation happens on this
//! closed sum type and results are encoded back into the heap. The
//! variants map one-to-one onto id families, with the sign and
//! small/big splits folded into the payloads and restored by the
//! encoder during canonicalization.

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};
use rpl_types::Id;

use super::fraction::Fraction;

/// Presentation form of an interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeForm {
    /// `lo…hi`.
    Interval,
    /// `centre±delta`.
    Delta,
    /// `centre±percent%`.
    Percent,
}

/// Which library a named reference points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstClass {
    /// Built-in physical/mathematical constants.
    Constant,
    /// Library equations.
    Equation,
    /// Library items.
    Library,
}

impl ConstClass {
    /// The id this class encodes as.
    pub const fn id(self) -> Id {
        match self {
            ConstClass::Constant => Id::Constant,
            ConstClass::Equation => Id::Equation,
            ConstClass::Library => Id::Library,
        }
    }
}

/// A decoded object.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Machine integer.
    Int(i64),
    /// Based integer, already masked to `wordsize` bits.
    Based {
        /// Bit pattern.
        value: u64,
        /// Display base: 2, 8, 10 or 16.
        base: u8,
        /// Word size the mask was taken from.
        wordsize: u8,
    },
    /// Big integer; canonicalization guarantees it does not fit `i64`.
    Big(BigInt),
    /// Reduced fraction.
    Frac(Fraction),
    /// Arbitrary-precision decimal, normalized.
    Dec(BigDecimal),
    /// Hardware 32-bit float.
    F32(f32),
    /// Hardware 64-bit float.
    F64(f64),
    /// Complex number; `polar` stores (modulus, argument/π).
    Complex {
        /// Real part, or modulus in polar form.
        re: Box<Value>,
        /// Imaginary part, or argument in π units in polar form.
        im: Box<Value>,
        /// Presentation and payload form.
        polar: bool,
    },
    /// Interval, stored as endpoints whatever the presentation form.
    Range {
        /// Lower endpoint.
        lo: Box<Value>,
        /// Upper endpoint.
        hi: Box<Value>,
        /// Presentation form.
        form: RangeForm,
    },
    /// Mean and standard deviation.
    Uncertain {
        /// Mean.
        mean: Box<Value>,
        /// Standard deviation.
        sigma: Box<Value>,
    },
    /// Value attached to a unit expression.
    Unit {
        /// Magnitude.
        value: Box<Value>,
        /// Unit expression, postfix tokens of symbols and exponents.
        unit: Box<Value>,
    },
    /// Identifier.
    Sym(String),
    /// Text string.
    Text(String),
    /// List of objects.
    List(Vec<Value>),
    /// Vector or matrix.
    Array(Vec<Value>),
    /// Symbolic expression in postfix order.
    Expr(Vec<Value>),
    /// Program delimited by guillemets.
    Prog(Vec<Value>),
    /// Inline block.
    Block(Vec<Value>),
    /// Labelled value.
    Tagged {
        /// Label text.
        label: String,
        /// The value carrying the tag.
        value: Box<Value>,
    },
    /// Raster graphic.
    Grob {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
        /// 16-bpp when true, 1-bpp otherwise.
        color: bool,
        /// Row-padded pixel data.
        pixels: Vec<u8>,
    },
    /// Named reference into a constant/equation/library table.
    Const {
        /// Which table.
        class: ConstClass,
        /// Entry name.
        name: String,
    },
    /// Function application marker inside an expression body.
    Call {
        /// Function name.
        name: String,
        /// Number of arguments already on the stack.
        argc: u32,
    },
    /// Tag-only record: command opcode or nullary constant.
    Cmd(Id),
}

impl Value {
    /// The id this value encodes as.
    pub fn id(&self) -> Id {
        match self {
            Value::Int(i) if *i < 0 => Id::NegInteger,
            Value::Int(_) => Id::Integer,
            Value::Based { .. } => Id::BasedInteger,
            Value::Big(b) if b.is_negative() => Id::NegBignum,
            Value::Big(_) => Id::Bignum,
            Value::Frac(f) => {
                let small = f.numerator().magnitude().to_u64().is_some()
                    && f.denominator().magnitude().to_u64().is_some();
                match (small, f.is_negative()) {
                    (true, false) => Id::Fraction,
                    (true, true) => Id::NegFraction,
                    (false, false) => Id::BigFraction,
                    (false, true) => Id::NegBigFraction,
                }
            }
            Value::Dec(d) => {
                if d.sign() == num_bigint::Sign::Minus {
                    Id::NegDecimal
                } else {
                    Id::Decimal
                }
            }
            Value::F32(_) => Id::HwFloat,
            Value::F64(_) => Id::HwDouble,
            Value::Complex { polar: false, .. } => Id::Rectangular,
            Value::Complex { polar: true, .. } => Id::Polar,
            Value::Range { form, .. } => match form {
                RangeForm::Interval => Id::Range,
                RangeForm::Delta => Id::DeltaRange,
                RangeForm::Percent => Id::PercentRange,
            },
            Value::Uncertain { .. } => Id::Uncertain,
            Value::Unit { .. } => Id::Unit,
            Value::Sym(_) => Id::Symbol,
            Value::Text(_) => Id::Text,
            Value::List(_) => Id::List,
            Value::Array(_) => Id::Array,
            Value::Expr(_) => Id::Expression,
            Value::Prog(_) => Id::Program,
            Value::Block(_) => Id::Block,
            Value::Tagged { .. } => Id::Tagged,
            Value::Grob { color: false, .. } => Id::Grob,
            Value::Grob { color: true, .. } => Id::Pixmap,
            Value::Const { class, .. } => class.id(),
            Value::Call { .. } => Id::Call,
            Value::Cmd(id) => *id,
        }
    }

    /// Canonical form: big integers that fit the machine word become
    /// integers, integral fractions collapse, decimals lose trailing
    /// zeros. Containers canonicalize their children.
    pub fn canonical(self) -> Value {
        match self {
            Value::Big(b) => match b.to_i64() {
                Some(i) => Value::Int(i),
                None => Value::Big(b),
            },
            Value::Frac(f) => {
                if f.is_integral() {
                    Value::Big(f.numerator().clone()).canonical()
                } else {
                    Value::Frac(f)
                }
            }
            Value::Dec(d) => Value::Dec(d.normalized()),
            Value::Complex { re, im, polar } => Value::Complex {
                re: Box::new(re.canonical()),
                im: Box::new(im.canonical()),
                polar,
            },
            Value::Range { lo, hi, form } => Value::Range {
                lo: Box::new(lo.canonical()),
                hi: Box::new(hi.canonical()),
                form,
            },
            Value::Uncertain { mean, sigma } => Value::Uncertain {
                mean: Box::new(mean.canonical()),
                sigma: Box::new(sigma.canonical()),
            },
            Value::Unit { value, unit } => Value::Unit {
                value: Box::new(value.canonical()),
                unit,
            },
            Value::Tagged { label, value } => Value::Tagged {
                label,
                value: Box::new(value.canonical()),
            },
            Value::List(v) => Value::List(v.into_iter().map(Value::canonical).collect()),
            Value::Array(v) => Value::Array(v.into_iter().map(Value::canonical).collect()),
            Value::Expr(v) => Value::Expr(v.into_iter().map(Value::canonical).collect()),
            Value::Prog(v) => Value::Prog(v.into_iter().map(Value::canonical).collect()),
            Value::Block(v) => Value::Block(v.into_iter().map(Value::canonical).collect()),
            other => other,
        }
    }

    /// Big-integer view of an exact integer value.
    pub fn as_bigint(&self) -> Option<BigInt> {
        match self {
            Value::Int(i) => Some(BigInt::from(*i)),
            Value::Big(b) => Some(b.clone()),
            Value::Based { value, .. } => Some(BigInt::from(*value)),
            _ => None,
        }
    }

    /// Machine-integer view, `None` when out of range or inexact.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Big(b) => b.to_i64(),
            Value::Based { value, .. } => i64::try_from(*value).ok(),
            Value::Dec(d) => {
                if d.is_integer() {
                    d.to_i64()
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Approximate hardware-double view of a real scalar.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Based { value, .. } => Some(*value as f64),
            Value::Big(b) => b.to_f64(),
            Value::Frac(f) => Some(f.to_f64()),
            Value::Dec(d) => d.to_f64(),
            Value::F32(f) => Some(*f as f64),
            Value::F64(f) => Some(*f),
            Value::Cmd(Id::Infinity) => Some(f64::INFINITY),
            Value::Cmd(Id::NegInfinity) => Some(f64::NEG_INFINITY),
            _ => None,
        }
    }

    /// Decimal view of a real scalar.
    pub fn to_decimal(&self) -> Option<BigDecimal> {
        match self {
            Value::Int(i) => Some(BigDecimal::from(*i)),
            Value::Based { value, .. } => Some(BigDecimal::from(*value)),
            Value::Big(b) => Some(BigDecimal::from(b.clone())),
            Value::Frac(_) | Value::F32(_) | Value::F64(_) => {
                let f = self.to_f64()?;
                BigDecimal::try_from(f).ok()
            }
            Value::Dec(d) => Some(d.clone()),
            _ => None,
        }
    }

    /// True for the exact number zero of any real family.
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Int(i) => *i == 0,
            Value::Based { value, .. } => *value == 0,
            Value::Big(b) => b.is_zero(),
            Value::Frac(f) => f.is_zero(),
            Value::Dec(d) => d.is_zero(),
            Value::F32(f) => *f == 0.0,
            Value::F64(f) => *f == 0.0,
            _ => false,
        }
    }

    /// True for the exact number one of any real family.
    pub fn is_one(&self) -> bool {
        match self {
            Value::Int(i) => *i == 1,
            Value::Big(_) => false,
            Value::Frac(_) => false,
            Value::Dec(d) => d == &BigDecimal::from(1),
            Value::F32(f) => *f == 1.0,
            Value::F64(f) => *f == 1.0,
            _ => false,
        }
    }

    /// True for negative real scalars.
    pub fn is_negative(&self) -> bool {
        match self {
            Value::Int(i) => *i < 0,
            Value::Big(b) => b.is_negative(),
            Value::Frac(f) => f.is_negative(),
            Value::Dec(d) => d.sign() == num_bigint::Sign::Minus,
            Value::F32(f) => *f < 0.0,
            Value::F64(f) => *f < 0.0,
            Value::Cmd(Id::NegInfinity) => true,
            _ => false,
        }
    }

    /// Family predicate: any real scalar, based included.
    pub fn is_real(&self) -> bool {
        self.id().is_real()
    }

    /// Family predicate: symbol, expression or named constant.
    pub fn is_symbolic(&self) -> bool {
        self.id().is_symbolic()
    }

    /// Family predicate: usable inside an expression.
    pub fn is_algebraic(&self) -> bool {
        self.id().is_algebraic()
    }

    /// Signed infinity or undefined marker.
    pub fn is_infinite(&self) -> bool {
        matches!(
            self,
            Value::Cmd(Id::Infinity) | Value::Cmd(Id::NegInfinity) | Value::Cmd(Id::Undefined)
        )
    }

    /// Compare two real scalars numerically.
    pub fn cmp_real(&self, other: &Value) -> Option<core::cmp::Ordering> {
        use core::cmp::Ordering;
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Cmd(Id::Infinity), Value::Cmd(Id::Infinity)) => Some(Ordering::Equal),
            (Value::Cmd(Id::NegInfinity), Value::Cmd(Id::NegInfinity)) => Some(Ordering::Equal),
            (Value::Cmd(Id::Infinity), _) => Some(Ordering::Greater),
            (_, Value::Cmd(Id::Infinity)) => Some(Ordering::Less),
            (Value::Cmd(Id::NegInfinity), _) => Some(Ordering::Less),
            (_, Value::Cmd(Id::NegInfinity)) => Some(Ordering::Greater),
            (a, b) if a.is_real() && b.is_real() => {
                if let (Some(da), Some(db)) = (exact(a), exact(b)) {
                    Some(da.cmp(&db))
                } else {
                    a.to_f64()?.partial_cmp(&b.to_f64()?)
                }
            }
            _ => None,
        }
    }
}

/// Exact fraction view for comparison purposes.
fn exact(v: &Value) -> Option<Fraction> {
    match v {
        Value::Int(i) => Some(Fraction::from_int(BigInt::from(*i))),
        Value::Big(b) => Some(Fraction::from_int(b.clone())),
        Value::Frac(f) => Some(f.clone()),
        Value::Dec(d) => {
            let (mantissa, scale) = d.as_bigint_and_exponent();
            let ten = BigInt::from(10);
            if scale >= 0 {
                Fraction::new(mantissa, ten.pow(scale.unsigned_abs() as u32)).ok()
            } else {
                Some(Fraction::from_int(
                    mantissa * ten.pow(scale.unsigned_abs() as u32),
                ))
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_demotes_small_bignums() {
        let v = Value::Big(BigInt::from(42)).canonical();
        assert_eq!(v, Value::Int(42));
        let big = BigInt::from(u64::MAX) * 4u8;
        assert!(matches!(Value::Big(big).canonical(), Value::Big(_)));
    }

    #[test]
    fn canonical_collapses_integral_fractions() {
        let f = Fraction::new(BigInt::from(8), BigInt::from(4)).unwrap();
        assert_eq!(Value::Frac(f).canonical(), Value::Int(2));
    }

    #[test]
    fn ids_follow_sign() {
        assert_eq!(Value::Int(5).id(), Id::Integer);
        assert_eq!(Value::Int(-5).id(), Id::NegInteger);
        assert_eq!(
            Value::Dec(BigDecimal::try_from(-2.5).unwrap()).id(),
            Id::NegDecimal
        );
    }

    #[test]
    fn exact_comparison_spans_families() {
        use core::cmp::Ordering;
        let half = Value::Frac(Fraction::new(BigInt::from(1), BigInt::from(2)).unwrap());
        let dec = Value::Dec(BigDecimal::try_from(0.5).unwrap());
        assert_eq!(half.cmp_real(&dec), Some(Ordering::Equal));
        assert_eq!(Value::Int(1).cmp_real(&dec), Some(Ordering::Greater));
    }
}
