use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use rpl_types::{ErrorKind, Id};
use std::str::FromStr;
use test_case::test_case;

use super::{apply, AddOp, Atan2Op, DivOp, HypotOp, ModOp, MulOp, PowOp, RemOp, SubOp};
use crate::object::{Fraction, RangeForm, Value};
use crate::settings::{AngleMode, Settings};

fn s() -> Settings {
    Settings::default()
}

fn frac(n: i64, d: i64) -> Value {
    Value::Frac(Fraction::new(BigInt::from(n), BigInt::from(d)).unwrap())
}

fn dec(text: &str) -> Value {
    Value::Dec(BigDecimal::from_str(text).unwrap())
}

#[test]
fn integer_fast_path_stays_exact() {
    assert_eq!(apply::<AddOp>(&s(), Value::Int(2), Value::Int(3)), Ok(Value::Int(5)));
    assert_eq!(apply::<MulOp>(&s(), Value::Int(-4), Value::Int(6)), Ok(Value::Int(-24)));
}

#[test]
fn integer_overflow_promotes_to_bignum() {
    let r = apply::<AddOp>(&s(), Value::Int(i64::MAX), Value::Int(1)).unwrap();
    assert_eq!(r, Value::Big(BigInt::from(i64::MAX) + 1));
    let r = apply::<MulOp>(&s(), Value::Int(i64::MAX), Value::Int(2)).unwrap();
    assert_eq!(r, Value::Big(BigInt::from(i64::MAX) * 2));
}

#[test]
fn division_produces_exact_fractions() {
    assert_eq!(apply::<DivOp>(&s(), Value::Int(6), Value::Int(3)), Ok(Value::Int(2)));
    assert_eq!(apply::<DivOp>(&s(), Value::Int(1), Value::Int(2)), Ok(frac(1, 2)));
    assert_eq!(apply::<DivOp>(&s(), frac(1, 2), frac(1, 4)), Ok(Value::Int(2)));
}

#[test]
fn mixed_families_join_upward() {
    // int + fraction → fraction
    assert_eq!(apply::<AddOp>(&s(), Value::Int(1), frac(1, 2)), Ok(frac(3, 2)));
    // fraction + decimal → decimal
    assert_eq!(apply::<AddOp>(&s(), frac(1, 2), dec("0.5")), Ok(dec("1")));
    // decimal + hardware double → hardware double
    assert_eq!(
        apply::<AddOp>(&s(), dec("1.5"), Value::F64(0.5)),
        Ok(Value::F64(2.0))
    );
    // hardware float pairs stay hardware float
    assert_eq!(
        apply::<AddOp>(&s(), Value::F32(1.5), Value::F32(0.5)),
        Ok(Value::F32(2.0))
    );
}

#[test_case(7, 3, 1 ; "positive operands")]
#[test_case(-7, 3, 2 ; "negative dividend stays in range")]
#[test_case(7, -3, 1 ; "negative divisor stays in range")]
#[test_case(-7, -3, 2 ; "both negative")]
fn euclidean_mod(x: i64, y: i64, expected: i64) {
    assert_eq!(
        apply::<ModOp>(&s(), Value::Int(x), Value::Int(y)),
        Ok(Value::Int(expected))
    );
}

#[test_case(7, 3, 1 ; "positive operands")]
#[test_case(-7, 3, -1 ; "rem keeps dividend sign")]
#[test_case(7, -3, 1 ; "divisor sign ignored")]
fn truncating_rem(x: i64, y: i64, expected: i64) {
    assert_eq!(
        apply::<RemOp>(&s(), Value::Int(x), Value::Int(y)),
        Ok(Value::Int(expected))
    );
}

#[test]
fn mod_and_rem_reject_complex_operands() {
    let z = Value::Complex {
        re: Box::new(Value::Int(1)),
        im: Box::new(Value::Int(1)),
        polar: false,
    };
    assert_eq!(
        apply::<ModOp>(&s(), z.clone(), Value::Int(2)),
        Err(ErrorKind::UndefinedOperation)
    );
    assert_eq!(
        apply::<RemOp>(&s(), Value::Int(2), z),
        Err(ErrorKind::UndefinedOperation)
    );
}

#[test]
fn pow_with_negative_exponent_inverts() {
    assert_eq!(
        apply::<PowOp>(&s(), Value::Int(2), Value::Int(-3)),
        Ok(frac(1, 8))
    );
    assert_eq!(
        apply::<PowOp>(&s(), frac(2, 3), Value::Int(-2)),
        Ok(frac(9, 4))
    );
}

#[test]
fn pow_overflow_promotes() {
    let r = apply::<PowOp>(&s(), Value::Int(2), Value::Int(64)).unwrap();
    assert_eq!(r, Value::Big(BigInt::from(2).pow(64)));
}

#[test]
fn complex_arithmetic_is_componentwise_and_exact() {
    let a = Value::Complex {
        re: Box::new(Value::Int(1)),
        im: Box::new(Value::Int(2)),
        polar: false,
    };
    let b = Value::Complex {
        re: Box::new(Value::Int(3)),
        im: Box::new(Value::Int(-1)),
        polar: false,
    };
    assert_eq!(
        apply::<AddOp>(&s(), a.clone(), b.clone()).unwrap(),
        Value::Complex {
            re: Box::new(Value::Int(4)),
            im: Box::new(Value::Int(1)),
            polar: false,
        }
    );
    // (1+2i)(3-i) = 5+5i
    assert_eq!(
        apply::<MulOp>(&s(), a.clone(), b).unwrap(),
        Value::Complex {
            re: Box::new(Value::Int(5)),
            im: Box::new(Value::Int(5)),
            polar: false,
        }
    );
    // Promotion from a real operand.
    assert_eq!(
        apply::<AddOp>(&s(), a, Value::Int(1)).unwrap(),
        Value::Complex {
            re: Box::new(Value::Int(2)),
            im: Box::new(Value::Int(2)),
            polar: false,
        }
    );
}

#[test]
fn polar_products_multiply_moduli_and_add_arguments() {
    let a = Value::Complex {
        re: Box::new(Value::Int(2)),
        im: Box::new(frac(1, 4)),
        polar: true,
    };
    let b = Value::Complex {
        re: Box::new(Value::Int(3)),
        im: Box::new(frac(1, 4)),
        polar: true,
    };
    assert_eq!(
        apply::<MulOp>(&s(), a, b).unwrap(),
        Value::Complex {
            re: Box::new(Value::Int(6)),
            im: Box::new(frac(1, 2)),
            polar: true,
        }
    );
}

#[test]
fn interval_subtraction_crosses_endpoints() {
    let x = Value::Range {
        lo: Box::new(Value::Int(2)),
        hi: Box::new(Value::Int(4)),
        form: RangeForm::Interval,
    };
    let y = Value::Range {
        lo: Box::new(Value::Int(1)),
        hi: Box::new(Value::Int(3)),
        form: RangeForm::Interval,
    };
    assert_eq!(
        apply::<SubOp>(&s(), x, y).unwrap(),
        Value::Range {
            lo: Box::new(Value::Int(-1)),
            hi: Box::new(Value::Int(3)),
            form: RangeForm::Interval,
        }
    );
}

#[test]
fn interval_multiplication_uses_minmax_of_products() {
    let x = Value::Range {
        lo: Box::new(Value::Int(-2)),
        hi: Box::new(Value::Int(3)),
        form: RangeForm::Interval,
    };
    let y = Value::Range {
        lo: Box::new(Value::Int(-1)),
        hi: Box::new(Value::Int(4)),
        form: RangeForm::Interval,
    };
    assert_eq!(
        apply::<MulOp>(&s(), x, y).unwrap(),
        Value::Range {
            lo: Box::new(Value::Int(-8)),
            hi: Box::new(Value::Int(12)),
            form: RangeForm::Interval,
        }
    );
}

#[test]
fn division_by_an_interval_containing_zero_fails() {
    let x = Value::Range {
        lo: Box::new(Value::Int(1)),
        hi: Box::new(Value::Int(2)),
        form: RangeForm::Interval,
    };
    let y = Value::Range {
        lo: Box::new(Value::Int(-1)),
        hi: Box::new(Value::Int(1)),
        form: RangeForm::Interval,
    };
    assert_eq!(apply::<DivOp>(&s(), x, y), Err(ErrorKind::DivideByZero));
}

#[test]
fn infinity_table() {
    let inf = Value::Cmd(Id::Infinity);
    let ninf = Value::Cmd(Id::NegInfinity);
    assert_eq!(apply::<AddOp>(&s(), inf.clone(), inf.clone()), Ok(inf.clone()));
    assert_eq!(
        apply::<SubOp>(&s(), inf.clone(), inf.clone()),
        Err(ErrorKind::UndefinedOperation)
    );
    assert_eq!(
        apply::<MulOp>(&s(), inf.clone(), Value::Int(0)),
        Err(ErrorKind::UndefinedOperation)
    );
    assert_eq!(
        apply::<DivOp>(&s(), inf.clone(), inf.clone()),
        Err(ErrorKind::UndefinedOperation)
    );
    assert_eq!(apply::<DivOp>(&s(), Value::Int(5), inf.clone()), Ok(Value::Int(0)));
    assert_eq!(
        apply::<DivOp>(&s(), inf.clone(), Value::Int(-2)),
        Ok(ninf.clone())
    );
    assert_eq!(apply::<MulOp>(&s(), ninf.clone(), Value::Int(-1)), Ok(inf));
}

#[test]
fn auto_simplification_laws() {
    let x = Value::Sym("x".into());
    assert_eq!(
        apply::<AddOp>(&s(), Value::Int(0), x.clone()),
        Ok(x.clone())
    );
    assert_eq!(apply::<SubOp>(&s(), x.clone(), x.clone()), Ok(Value::Int(0)));
    assert_eq!(
        apply::<MulOp>(&s(), x.clone(), Value::Int(0)),
        Ok(Value::Int(0))
    );
    assert_eq!(
        apply::<MulOp>(&s(), x.clone(), x.clone()),
        Ok(Value::Expr(vec![
            x.clone(),
            Value::Int(2),
            Value::Cmd(Id::Pow)
        ]))
    );
    assert_eq!(
        apply::<MulOp>(
            &s(),
            Value::Cmd(Id::ImaginaryUnit),
            Value::Cmd(Id::ImaginaryUnit)
        ),
        Ok(Value::Int(-1))
    );
    assert_eq!(apply::<DivOp>(&s(), x.clone(), x.clone()), Ok(Value::Int(1)));
    assert_eq!(
        apply::<PowOp>(&s(), x.clone(), Value::Int(1)),
        Ok(x.clone())
    );

    // Disabled, the same inputs build expressions instead.
    let mut plain = Settings::default();
    plain.auto_simplify = false;
    assert_eq!(
        apply::<AddOp>(&plain, Value::Int(0), x.clone()),
        Ok(Value::Expr(vec![
            Value::Int(0),
            x.clone(),
            Value::Cmd(Id::Add)
        ]))
    );
}

#[test]
fn based_integers_ignore_simplification() {
    let zero = Value::Based {
        value: 0,
        base: 16,
        wordsize: 64,
    };
    let x = Value::Based {
        value: 5,
        base: 16,
        wordsize: 64,
    };
    // `0 + x` stays on the based path, not the law table.
    assert_eq!(
        apply::<AddOp>(&s(), zero, x),
        Ok(Value::Based {
            value: 5,
            base: 16,
            wordsize: 64,
        })
    );
}

#[test]
fn hypot_is_exact_for_pythagorean_triples() {
    assert_eq!(
        apply::<HypotOp>(&s(), Value::Int(3), Value::Int(4)),
        Ok(Value::Int(5))
    );
    assert_eq!(
        apply::<HypotOp>(&s(), Value::F64(3.0), Value::F64(4.0)),
        Ok(Value::F64(5.0))
    );
}

#[test]
fn atan2_respects_the_angle_mode() {
    let mut settings = Settings::default();
    settings.angle_mode = AngleMode::Degrees;
    let r = apply::<Atan2Op>(&settings, Value::Int(1), Value::Int(1)).unwrap();
    let Value::Dec(d) = r else { panic!("expected decimal") };
    let diff = (d - BigDecimal::from(45)).abs();
    assert!(diff < BigDecimal::from_str("1e-10").unwrap());

    settings.angle_mode = AngleMode::Radians;
    let r = apply::<Atan2Op>(&settings, Value::Int(1), Value::Int(1)).unwrap();
    let Value::Dec(d) = r else { panic!("expected decimal") };
    let quarter_pi = BigDecimal::from_str("0.78539816339744830962").unwrap();
    assert!((d - quarter_pi).abs() < BigDecimal::from_str("1e-10").unwrap());
}

#[test]
fn tagged_operands_are_transparent() {
    let tagged = Value::Tagged {
        label: "price".into(),
        value: Box::new(Value::Int(10)),
    };
    assert_eq!(apply::<AddOp>(&s(), tagged, Value::Int(5)), Ok(Value::Int(15)));
}

#[test]
fn text_and_numbers_do_not_mix() {
    assert_eq!(
        apply::<AddOp>(&s(), Value::Text("a".into()), Value::Int(1)),
        Err(ErrorKind::Type)
    );
}
