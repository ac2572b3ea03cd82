use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use rpl_types::Id;
use std::str::FromStr;

use super::{render, render_expression, RenderMode};
use crate::object::{Fraction, RangeForm, Value};
use crate::parse::parse_one;
use crate::settings::{DisplayMode, Settings};

fn round_trip(v: Value) {
    let settings = Settings::default();
    let v = v.canonical();
    let text = render(&v, &settings, RenderMode::Single);
    let back = parse_one(&text, &settings)
        .unwrap_or_else(|e| panic!("reparse of {text:?} failed: {e}"));
    assert_eq!(back.canonical(), v, "via {text:?}");
}

#[test]
fn scalars_round_trip() {
    round_trip(Value::Int(42));
    round_trip(Value::Int(-17));
    round_trip(Value::Big(BigInt::from_str("340282366920938463463374607431768211456").unwrap()));
    round_trip(Value::Frac(
        Fraction::new(BigInt::from(-3), BigInt::from(4)).unwrap(),
    ));
    round_trip(Value::Dec(BigDecimal::from_str("2.5").unwrap()));
    round_trip(Value::Dec(BigDecimal::from_str("3").unwrap()));
    round_trip(Value::F32(1.5));
    round_trip(Value::F64(-0.25));
    round_trip(Value::Based {
        value: 0xbeef,
        base: 16,
        wordsize: 64,
    });
    round_trip(Value::Based {
        value: 0b1010,
        base: 2,
        wordsize: 64,
    });
}

#[test]
fn composites_round_trip() {
    round_trip(Value::Complex {
        re: Box::new(Value::Int(1)),
        im: Box::new(Value::Int(-2)),
        polar: false,
    });
    round_trip(Value::Range {
        lo: Box::new(Value::Int(2)),
        hi: Box::new(Value::Int(4)),
        form: RangeForm::Interval,
    });
    round_trip(Value::Range {
        lo: Box::new(Value::Int(2)),
        hi: Box::new(Value::Int(4)),
        form: RangeForm::Delta,
    });
    round_trip(Value::Uncertain {
        mean: Box::new(Value::Int(2)),
        sigma: Box::new(Value::Dec(BigDecimal::from_str("0.1").unwrap())),
    });
    round_trip(Value::Unit {
        value: Box::new(Value::Int(9)),
        unit: Box::new(Value::Expr(vec![
            Value::Sym("m".into()),
            Value::Sym("s".into()),
            Value::Cmd(Id::Div),
        ])),
    });
    round_trip(Value::Text("hello world".into()));
    round_trip(Value::List(vec![
        Value::Int(1),
        Value::Text("two".into()),
        Value::Sym("three".into()),
    ]));
    round_trip(Value::Array(vec![
        Value::Array(vec![Value::Int(1), Value::Int(2)]),
        Value::Array(vec![Value::Int(3), Value::Int(4)]),
    ]));
    round_trip(Value::Prog(vec![
        Value::Cmd(Id::Dup),
        Value::Cmd(Id::Mul),
    ]));
    round_trip(Value::Tagged {
        label: "answer".into(),
        value: Box::new(Value::Int(42)),
    });
    round_trip(Value::Grob {
        width: 8,
        height: 2,
        color: false,
        pixels: vec![0xaa, 0x55],
    });
}

#[test]
fn expressions_round_trip() {
    round_trip(Value::Expr(vec![Value::Sym("x".into())]));
    round_trip(Value::Expr(vec![
        Value::Int(1),
        Value::Int(2),
        Value::Int(3),
        Value::Cmd(Id::Mul),
        Value::Cmd(Id::Add),
    ]));
    round_trip(Value::Expr(vec![
        Value::Int(1),
        Value::Int(2),
        Value::Cmd(Id::Add),
        Value::Int(3),
        Value::Cmd(Id::Mul),
    ]));
    round_trip(Value::Expr(vec![
        Value::Sym("x".into()),
        Value::Cmd(Id::Sin),
    ]));
    round_trip(Value::Expr(vec![
        Value::Int(2),
        Value::Int(3),
        Value::Int(2),
        Value::Cmd(Id::Pow),
        Value::Cmd(Id::Pow),
    ]));
    round_trip(Value::Expr(vec![
        Value::Sym("x".into()),
        Value::Int(2),
        Value::Call {
            name: "f".into(),
            argc: 2,
        },
    ]));
}

#[test]
fn expression_text_uses_minimal_parentheses() {
    let settings = Settings::default();
    let sum_times = vec![
        Value::Int(1),
        Value::Int(2),
        Value::Cmd(Id::Add),
        Value::Int(3),
        Value::Cmd(Id::Mul),
    ];
    assert_eq!(render_expression(&sum_times, &settings), "(1+2)·3");

    let times_sum = vec![
        Value::Int(1),
        Value::Int(2),
        Value::Int(3),
        Value::Cmd(Id::Mul),
        Value::Cmd(Id::Add),
    ];
    assert_eq!(render_expression(&times_sum, &settings), "1+2·3");
}

#[test]
fn based_bases_render_with_suffixes() {
    let settings = Settings::default();
    let hex = Value::Based {
        value: 0x1a,
        base: 16,
        wordsize: 64,
    };
    assert_eq!(render(&hex, &settings, RenderMode::Single), "#1Ah");
    let bin = Value::Based {
        value: 5,
        base: 2,
        wordsize: 64,
    };
    assert_eq!(render(&bin, &settings, RenderMode::Single), "#101b");
}

#[test]
fn delta_form_renders_center_and_half_width() {
    let settings = Settings::default();
    let delta = Value::Range {
        lo: Box::new(Value::Int(2)),
        hi: Box::new(Value::Int(4)),
        form: RangeForm::Delta,
    };
    assert_eq!(render(&delta, &settings, RenderMode::Single), "3±1");
    let interval = Value::Range {
        lo: Box::new(Value::Int(2)),
        hi: Box::new(Value::Int(4)),
        form: RangeForm::Interval,
    };
    assert_eq!(render(&interval, &settings, RenderMode::Single), "2…4");
}

#[test]
fn separators_group_integer_digits() {
    let mut settings = Settings::default();
    settings.thousands_separator = Some('\u{202F}');
    let text = render(&Value::Int(1_234_567), &settings, RenderMode::Single);
    assert_eq!(text, "1\u{202F}234\u{202F}567");
    // And strip back off on parse.
    assert_eq!(parse_one(&text, &settings).unwrap(), Value::Int(1_234_567));
}

#[test]
fn fix_mode_pads_decimals() {
    let mut settings = Settings::default();
    settings.display = DisplayMode::Fix(2);
    let v = Value::Dec(BigDecimal::from_str("3.14159").unwrap());
    assert_eq!(render(&v, &settings, RenderMode::Single), "3.14");
}

#[test]
fn multiline_programs_indent() {
    let settings = Settings::default();
    let prog = Value::Prog(vec![Value::Int(1), Value::Int(2), Value::Cmd(Id::Add)]);
    let text = render(&prog, &settings, RenderMode::Multi);
    assert_eq!(text, "«\n  1\n  2\n  +\n»");
    // Single-line keeps everything on one row.
    let single = render(&prog, &settings, RenderMode::Single);
    assert_eq!(single, "« 1 2 + »");
}
