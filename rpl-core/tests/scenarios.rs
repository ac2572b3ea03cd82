//! End-to-end scenarios through the command-line entry point.

use bigdecimal::BigDecimal;
use rpl_core::prelude::*;
use rpl_core::render::{render, RenderMode};
use rpl_core::{object::Value, parse};
use std::str::FromStr;

fn enter(rt: &mut Runtime, src: &str) -> Result<ProgramState, RuntimeError> {
    let objects = parse::parse_source(src, &rt.settings).expect("parse");
    let mut last = ProgramState::Done;
    for obj in objects {
        let ptr = rt.alloc_value(&obj).expect("alloc");
        last = rt.enter_object(&mut NullHost, ptr)?;
    }
    Ok(last)
}

fn top(rt: &Runtime) -> Value {
    let ptr = *rt.stack().last().expect("stack value");
    rt.decode(ptr).expect("decode")
}

fn top_text(rt: &Runtime) -> String {
    render(&top(rt), &rt.settings, RenderMode::Single)
}

#[test]
fn bignum_overflow() {
    // 2^63 + 2^63 = 2^64, printed in full.
    let mut rt = Runtime::default();
    enter(&mut rt, "2 63 ^ 2 63 ^ +").unwrap();
    assert_eq!(top_text(&rt), "18446744073709551616");
}

#[test]
fn unit_dimensional_check() {
    let mut rt = Runtime::default();
    enter(&mut rt, "1_m 1_s").unwrap();
    assert_eq!(rt.depth(), 2);

    let err = enter(&mut rt, "+").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InconsistentUnits);
    // Stack unchanged by the failing command.
    assert_eq!(rt.depth(), 2);
    assert_eq!(top_text(&rt), "1_s");

    // The banner clears on the next key; the UI reads the slot once.
    assert!(rt.error.is_set());
    rt.error.take();
    assert!(!rt.error.is_set());
}

#[test]
fn auto_simplification_during_eval() {
    let mut rt = Runtime::default();
    enter(&mut rt, "'(x+0)*1+(x-x)' eval").unwrap();
    assert_eq!(top(&rt), Value::Sym("x".into()));
    assert_eq!(top_text(&rt), "x");
}

#[test]
fn complex_promotion_on_sqrt_of_negative() {
    let mut rt = Runtime::default();
    enter(&mut rt, "-1 sqrt").unwrap();
    assert_eq!(
        top(&rt),
        Value::Complex {
            re: Box::new(Value::Int(0)),
            im: Box::new(Value::Int(1)),
            polar: false,
        }
    );
}

#[test]
fn division_by_zero_yields_signed_infinities() {
    let mut rt = Runtime::default();
    enter(&mut rt, "1 0 /").unwrap();
    assert_eq!(top(&rt), Value::Cmd(Id::Infinity));
    assert_eq!(top_text(&rt), "∞");

    enter(&mut rt, "-1 0 /").unwrap();
    assert_eq!(top(&rt), Value::Cmd(Id::NegInfinity));
    assert_eq!(top_text(&rt), "-∞");

    // With the infinity setting off it is an error instead.
    let mut strict = Runtime::default();
    strict.settings.infinity_result = false;
    let err = enter(&mut strict, "1 0 /").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DivideByZero);
}

#[test]
fn range_arithmetic() {
    let mut rt = Runtime::default();
    enter(&mut rt, "2…4 1…3 +").unwrap();
    assert_eq!(top_text(&rt), "3…7");

    // (2±0.1)·(3±0.1): mean 6, σ = √(0.3² + 0.2²).
    let mut rt = Runtime::default();
    enter(&mut rt, "2σ0.1 3σ0.1 *").unwrap();
    let Value::Uncertain { mean, sigma } = top(&rt) else {
        panic!("expected uncertain result");
    };
    assert_eq!(*mean, Value::Int(6));
    let sigma = match *sigma {
        Value::Dec(d) => d,
        other => panic!("expected decimal sigma, got {other:?}"),
    };
    let expected = BigDecimal::from_str("0.13")
        .unwrap()
        .sqrt()
        .unwrap();
    let diff = (sigma - expected).abs();
    assert!(diff < BigDecimal::from_str("1e-20").unwrap());
}

#[test]
fn based_arithmetic_wraps_at_word_size() {
    let mut rt = Runtime::default();
    rt.settings.word_size = 8;
    enter(&mut rt, "#FFh #1h +").unwrap();
    assert_eq!(
        top(&rt),
        Value::Based {
            value: 0,
            base: 16,
            wordsize: 8,
        }
    );
}

#[test]
fn interactive_directory_session() {
    let mut rt = Runtime::default();
    enter(&mut rt, "42 'x' sto 'geo' crdir 7 'x' sto x").unwrap();
    // Inner binding shadows the outer one.
    assert_eq!(top(&rt), Value::Int(7));
    assert_eq!(rt.dirs().path(), "HOME/geo");

    enter(&mut rt, "drop updir x").unwrap();
    assert_eq!(top(&rt), Value::Int(42));
    assert_eq!(rt.dirs().path(), "HOME");
}

#[test]
fn symbolic_differentiation_through_the_command() {
    let mut rt = Runtime::default();
    enter(&mut rt, "'x^2+3*x' 'x' deriv").unwrap();
    assert_eq!(top_text(&rt), "'2·x+3'");
}

#[test]
fn unit_conversion_commands() {
    let mut rt = Runtime::default();
    enter(&mut rt, "2_h 1_min convert").unwrap();
    assert_eq!(top_text(&rt), "120_min");

    let mut rt = Runtime::default();
    enter(&mut rt, "3_km ubase").unwrap();
    assert_eq!(top_text(&rt), "3000_m");
}

#[test]
fn text_and_list_operations() {
    let mut rt = Runtime::default();
    enter(&mut rt, "\"ab\" \"cd\" +").unwrap();
    assert_eq!(top(&rt), Value::Text("abcd".into()));

    enter(&mut rt, "drop { 1 2 } { 3 } +").unwrap();
    assert_eq!(
        top(&rt),
        Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
    );

    enter(&mut rt, "drop \"ab\" 3 *").unwrap();
    assert_eq!(top(&rt), Value::Text("ababab".into()));
}

#[test]
fn matrix_multiplication() {
    let mut rt = Runtime::default();
    enter(&mut rt, "[[1 2][3 4]] [[5 6][7 8]] *").unwrap();
    assert_eq!(
        top(&rt),
        Value::Array(vec![
            Value::Array(vec![Value::Int(19), Value::Int(22)]),
            Value::Array(vec![Value::Int(43), Value::Int(50)]),
        ])
    );
}

#[test]
fn get_and_put_report_index_errors() {
    let mut rt = Runtime::default();
    enter(&mut rt, "{ 10 20 30 } 2 get").unwrap();
    assert_eq!(top(&rt), Value::Int(20));

    let err = enter(&mut rt, "drop { 10 } 5 get").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IndexOutOfBounds);
}

#[test]
fn zero_power_zero_follows_the_setting() {
    let mut rt = Runtime::default();
    enter(&mut rt, "0 0 ^").unwrap();
    assert_eq!(top(&rt), Value::Int(1));

    let mut strict = Runtime::default();
    strict.settings.zero_power_zero_is_one = false;
    let err = enter(&mut strict, "0 0 ^").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UndefinedOperation);
}
