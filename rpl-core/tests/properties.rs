//! Universal invariants and quantified properties.

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use quickcheck::{Arbitrary, Gen, TestResult};
use quickcheck_macros::quickcheck;
use rpl_core::arith::{apply, optimize, AddOp, DivOp, MulOp, PowOp, SubOp};
use rpl_core::object::{Fraction, RangeForm, Value};
use rpl_core::parse::parse_one;
use rpl_core::prelude::*;
use rpl_core::render::{render, RenderMode};

/// Generator for scalar objects the text round-trip covers.
#[derive(Debug, Clone)]
struct ScalarValue(Value);

impl Arbitrary for ScalarValue {
    fn arbitrary(g: &mut Gen) -> ScalarValue {
        let value = match u8::arbitrary(g) % 8 {
            0 => Value::Int(i64::arbitrary(g)),
            1 => Value::Big(BigInt::from(i64::arbitrary(g)) * BigInt::from(i64::arbitrary(g))),
            2 => {
                let den = i64::arbitrary(g).clamp(1, i64::MAX);
                Value::Frac(
                    Fraction::new(BigInt::from(i64::arbitrary(g)), BigInt::from(den))
                        .expect("nonzero denominator"),
                )
            }
            3 => Value::Dec(BigDecimal::new(
                BigInt::from(i64::arbitrary(g)),
                (i8::arbitrary(g) % 12) as i64,
            )),
            4 => Value::Based {
                value: u64::arbitrary(g),
                base: *g.choose(&[2u8, 8, 10, 16]).expect("non-empty"),
                wordsize: 64,
            },
            5 => Value::Complex {
                re: Box::new(Value::Int(i32::arbitrary(g) as i64)),
                im: Box::new(Value::Int(i32::arbitrary(g) as i64)),
                polar: false,
            },
            6 => {
                let a = i32::arbitrary(g) as i64;
                let b = i32::arbitrary(g) as i64;
                Value::Range {
                    lo: Box::new(Value::Int(a.min(b))),
                    hi: Box::new(Value::Int(a.max(b))),
                    form: RangeForm::Interval,
                }
            }
            _ => Value::Text(
                String::arbitrary(g)
                    .chars()
                    .filter(|c| *c != '"' && !c.is_control())
                    .collect(),
            ),
        };
        ScalarValue(value.canonical())
    }
}

#[quickcheck]
fn parse_render_round_trip(value: ScalarValue) -> bool {
    let settings = Settings::default();
    let text = render(&value.0, &settings, RenderMode::Single);
    match parse_one(&text, &settings) {
        Ok(back) => back.canonical() == value.0,
        Err(_) => false,
    }
}

#[quickcheck]
fn integer_fast_path_matches_bignum_path(x: i64, y: i64) -> bool {
    let settings = Settings::default();
    for op in 0..3 {
        let fast = match op {
            0 => apply::<AddOp>(&settings, Value::Int(x), Value::Int(y)),
            1 => apply::<SubOp>(&settings, Value::Int(x), Value::Int(y)),
            _ => apply::<MulOp>(&settings, Value::Int(x), Value::Int(y)),
        };
        let big_x = Value::Big(BigInt::from(x) * 2 - BigInt::from(x));
        let big_y = Value::Big(BigInt::from(y) * 2 - BigInt::from(y));
        let slow = match op {
            0 => apply::<AddOp>(&settings, big_x, big_y),
            1 => apply::<SubOp>(&settings, big_x, big_y),
            _ => apply::<MulOp>(&settings, big_x, big_y),
        };
        if fast != slow {
            return false;
        }
    }
    true
}

#[quickcheck]
fn simplification_is_idempotent(x: i32, symbolic: bool) -> bool {
    let settings = Settings::default();
    let x = if symbolic {
        Value::Sym("x".into())
    } else {
        Value::Int(x as i64)
    };
    for op in [Id::Add, Id::Sub, Id::Mul, Id::Div, Id::Pow] {
        for (a, b) in [
            (Value::Int(0), x.clone()),
            (x.clone(), Value::Int(0)),
            (Value::Int(1), x.clone()),
            (x.clone(), Value::Int(1)),
            (x.clone(), x.clone()),
        ] {
            let Ok(Some(once)) = optimize(op, &settings, &a, &b) else {
                continue;
            };
            // Re-simplifying the result against the neutral operand
            // must not change it further.
            let again = match op {
                Id::Add => optimize(op, &settings, &once, &Value::Int(0)),
                Id::Sub => optimize(op, &settings, &once, &Value::Int(0)),
                Id::Mul => optimize(op, &settings, &once, &Value::Int(1)),
                Id::Div => optimize(op, &settings, &once, &Value::Int(1)),
                _ => optimize(op, &settings, &once, &Value::Int(1)),
            };
            match again {
                Ok(Some(twice)) => {
                    if twice != once {
                        return false;
                    }
                }
                Ok(None) | Err(_) => {}
            }
        }
    }
    true
}

#[quickcheck]
fn gc_at_every_allocation_is_transparent(values: Vec<i32>) -> TestResult {
    if values.is_empty() || values.len() > 12 {
        return TestResult::discard();
    }
    let src: String = values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
        + &" +".repeat(values.len() - 1);

    let run = |collect: bool| -> Vec<Value> {
        let mut rt = Runtime::default();
        let objects = rpl_core::parse::parse_source(&src, &rt.settings).expect("parse");
        for obj in objects {
            let ptr = rt.alloc_value(&obj).expect("alloc");
            if collect {
                let pin = rt.pin(ptr);
                rt.gc();
                let ptr = rt.pinned(&pin);
                rt.enter_object(&mut NullHost, ptr).expect("eval");
                rt.unpin(pin);
                rt.gc();
            } else {
                rt.enter_object(&mut NullHost, ptr).expect("eval");
            }
        }
        rt.stack()
            .iter()
            .map(|p| rt.decode(*p).expect("decode"))
            .collect()
    };

    TestResult::from_bool(run(false) == run(true))
}

#[quickcheck]
fn fraction_times_inverse_is_exactly_one(n: i64, d: i64) -> TestResult {
    if n == 0 || d == 0 {
        return TestResult::discard();
    }
    let settings = Settings::default();
    let f = Value::Frac(
        Fraction::new(BigInt::from(n), BigInt::from(d)).expect("nonzero"),
    )
    .canonical();
    let inv = apply::<DivOp>(&settings, Value::Int(1), f.clone()).expect("invert");
    let product = apply::<MulOp>(&settings, f, inv).expect("multiply");
    TestResult::from_bool(product == Value::Int(1))
}

#[quickcheck]
fn decimal_times_inverse_is_one_at_precision(n: u32) -> TestResult {
    if n == 0 {
        return TestResult::discard();
    }
    let settings = Settings::default();
    let x = Value::Dec(BigDecimal::from(n));
    let inv = apply::<DivOp>(&settings, Value::Int(1), x.clone()).expect("invert");
    let product = apply::<MulOp>(&settings, x, inv).expect("multiply");
    let as_dec = match product {
        Value::Int(1) => return TestResult::passed(),
        Value::Dec(d) => d,
        other => panic!("unexpected product {other:?}"),
    };
    // Equal to one within an ulp of the active precision.
    let diff = (as_dec - BigDecimal::from(1)).abs();
    let ulp = BigDecimal::new(BigInt::from(1), settings.precision as i64 - 1);
    TestResult::from_bool(diff <= ulp)
}

#[quickcheck]
fn complex_abs_squared_is_sum_of_squares(re: i16, im: i16) -> bool {
    let settings = Settings::default();
    let z = Value::Complex {
        re: Box::new(Value::Int(re as i64)),
        im: Box::new(Value::Int(im as i64)),
        polar: false,
    };
    let abs = rpl_core::functions::apply_unary(&settings, Id::Abs, z).expect("abs");
    let square = apply::<MulOp>(&settings, abs.clone(), abs).expect("square");
    let expected = (re as i64) * (re as i64) + (im as i64) * (im as i64);
    match square.canonical() {
        Value::Int(v) => v == expected,
        Value::Dec(d) => {
            // The root is correct to the active precision; squaring
            // doubles the relative error, far inside this bound.
            let diff = (d - BigDecimal::from(expected)).abs();
            diff <= BigDecimal::new(BigInt::from(1), 10)
        }
        _ => false,
    }
}

#[quickcheck]
fn integer_pow_satisfies_the_recurrence(x: i8, n: u8) -> TestResult {
    let n = (n % 12) as i64;
    if n == 0 {
        return TestResult::discard();
    }
    let settings = Settings::default();
    let x = Value::Int(x as i64);
    let pow_n = apply::<PowOp>(&settings, x.clone(), Value::Int(n)).expect("x^n");
    let pow_n1 = apply::<PowOp>(&settings, x.clone(), Value::Int(n - 1)).expect("x^(n-1)");
    let recomposed = apply::<MulOp>(&settings, x, pow_n1).expect("x·x^(n-1)");
    TestResult::from_bool(pow_n == recomposed)
}

#[quickcheck]
fn unit_conversion_round_trips(value: i32) -> bool {
    let settings = Settings::default();
    let metres: rpl_core::units::Factors =
        [("m".to_owned(), 1)].into_iter().collect();
    let feet: rpl_core::units::Factors =
        [("ft".to_owned(), 1)].into_iter().collect();
    let x = Value::Int(value as i64);
    let Ok(there) = rpl_core::units::convert_value(&settings, x.clone(), &metres, &feet) else {
        return false;
    };
    let Ok(back) = rpl_core::units::convert_value(&settings, there, &feet, &metres) else {
        return false;
    };
    back == x
}
