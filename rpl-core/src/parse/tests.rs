use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use rpl_types::Id;
use std::str::FromStr;

use super::{parse_one, parse_source, ParseError};
use crate::object::{ConstClass, Fraction, RangeForm, Value};
use crate::settings::Settings;

fn one(src: &str) -> Value {
    parse_one(src, &Settings::default()).expect(src)
}

fn all(src: &str) -> Vec<Value> {
    parse_source(src, &Settings::default()).expect(src)
}

#[test]
fn integers_and_signs() {
    assert_eq!(one("42"), Value::Int(42));
    assert_eq!(one("-17"), Value::Int(-17));
    assert_eq!(one("0"), Value::Int(0));
}

#[test]
fn overflowing_literals_promote_to_bignum() {
    let v = one("18446744073709551616");
    assert_eq!(
        v,
        Value::Big(BigInt::from_str("18446744073709551616").unwrap())
    );
}

#[test]
fn decimals_and_exponents() {
    assert_eq!(
        one("2.5"),
        Value::Dec(BigDecimal::from_str("2.5").unwrap())
    );
    assert_eq!(
        one("1.5e3"),
        Value::Dec(BigDecimal::from_str("1500").unwrap().normalized())
    );
    assert_eq!(
        one("-0.25"),
        Value::Dec(BigDecimal::from_str("-0.25").unwrap())
    );
}

#[test]
fn hardware_float_suffixes() {
    assert_eq!(one("3.5f"), Value::F32(3.5));
    assert_eq!(one("3.5d"), Value::F64(3.5));
    assert_eq!(one("2f"), Value::F32(2.0));
}

#[rstest::rstest]
#[case("#1Ah", 0x1a, 16)]
#[case("#777o", 0o777, 8)]
#[case("#1010b", 0b1010, 2)]
#[case("#99d", 99, 10)]
// A bare based literal uses the settings base.
#[case("#FF", 0xff, 16)]
fn based_literals(#[case] src: &str, #[case] value: u64, #[case] base: u8) {
    assert_eq!(
        one(src),
        Value::Based {
            value,
            base,
            wordsize: 64,
        }
    );
}

#[test]
fn fraction_literals() {
    assert_eq!(
        one("3/4"),
        Value::Frac(Fraction::new(BigInt::from(3), BigInt::from(4)).unwrap())
    );
    // Reduction happens at construction.
    assert_eq!(one("4/2"), Value::Int(2));
}

#[test]
fn complex_literals() {
    let rect = Value::Complex {
        re: Box::new(Value::Int(1)),
        im: Box::new(Value::Int(2)),
        polar: false,
    };
    assert_eq!(one("(1,2)"), rect.clone());
    assert_eq!(one("1+2ⅈ"), rect);
    assert_eq!(
        one("3-4ⅈ"),
        Value::Complex {
            re: Box::new(Value::Int(3)),
            im: Box::new(Value::Int(-4)),
            polar: false,
        }
    );
    assert_eq!(
        one("2ⅈ"),
        Value::Complex {
            re: Box::new(Value::Int(0)),
            im: Box::new(Value::Int(2)),
            polar: false,
        }
    );
}

#[test]
fn polar_literal_converts_to_pi_units() {
    // 90 degrees is π/2, stored as 1/2 in π units.
    let v = one("(1∠90)");
    let Value::Complex { re, im, polar: true } = v else {
        panic!("expected polar complex");
    };
    assert_eq!(*re, Value::Int(1));
    assert_eq!(
        *im,
        Value::Frac(Fraction::new(BigInt::from(1), BigInt::from(2)).unwrap())
    );
}

#[test]
fn unit_literals() {
    let v = one("9.81_m/s^2");
    let Value::Unit { value, unit } = v else {
        panic!("expected unit");
    };
    assert_eq!(*value, Value::Dec(BigDecimal::from_str("9.81").unwrap()));
    let Value::Expr(tokens) = *unit else {
        panic!("expected unit expression");
    };
    assert_eq!(
        tokens,
        vec![
            Value::Sym("m".into()),
            Value::Sym("s".into()),
            Value::Int(2),
            Value::Cmd(Id::Pow),
            Value::Cmd(Id::Div),
        ]
    );
}

#[test]
fn range_literals() {
    assert_eq!(
        one("2…4"),
        Value::Range {
            lo: Box::new(Value::Int(2)),
            hi: Box::new(Value::Int(4)),
            form: RangeForm::Interval,
        }
    );
    // `3±1` stores endpoints with the delta presentation.
    assert_eq!(
        one("3±1"),
        Value::Range {
            lo: Box::new(Value::Int(2)),
            hi: Box::new(Value::Int(4)),
            form: RangeForm::Delta,
        }
    );
    // `100±5%` is 95…105.
    assert_eq!(
        one("100±5%"),
        Value::Range {
            lo: Box::new(Value::Int(95)),
            hi: Box::new(Value::Int(105)),
            form: RangeForm::Percent,
        }
    );
    assert_eq!(
        one("2σ0.1"),
        Value::Uncertain {
            mean: Box::new(Value::Int(2)),
            sigma: Box::new(Value::Dec(BigDecimal::from_str("0.1").unwrap())),
        }
    );
}

#[test]
fn text_lists_arrays_programs() {
    assert_eq!(one("\"hello\""), Value::Text("hello".into()));
    assert_eq!(
        one("{ 1 2 3 }"),
        Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
    );
    assert_eq!(
        one("[[1 2][3 4]]"),
        Value::Array(vec![
            Value::Array(vec![Value::Int(1), Value::Int(2)]),
            Value::Array(vec![Value::Int(3), Value::Int(4)]),
        ])
    );
    assert_eq!(
        one("« dup * »"),
        Value::Prog(vec![Value::Cmd(Id::Dup), Value::Cmd(Id::Mul)])
    );
    // ASCII guillemet spelling.
    assert_eq!(
        one("<< dup >>"),
        Value::Prog(vec![Value::Cmd(Id::Dup)])
    );
}

#[test]
fn tagged_values() {
    assert_eq!(
        one(":answer:42"),
        Value::Tagged {
            label: "answer".into(),
            value: Box::new(Value::Int(42)),
        }
    );
}

#[test]
fn constant_markers() {
    assert_eq!(
        one("Ⓒc"),
        Value::Const {
            class: ConstClass::Constant,
            name: "c".into(),
        }
    );
    assert_eq!(
        one("π"),
        Value::Const {
            class: ConstClass::Constant,
            name: "π".into(),
        }
    );
}

#[test]
fn commands_are_case_insensitive() {
    assert_eq!(one("dup"), Value::Cmd(Id::Dup));
    assert_eq!(one("DUP"), Value::Cmd(Id::Dup));
    assert_eq!(one("Dup"), Value::Cmd(Id::Dup));
}

#[test]
fn quoted_names_become_expressions() {
    assert_eq!(one("'a'"), Value::Expr(vec![Value::Sym("a".into())]));
}

#[test]
fn expression_precedence_and_associativity() {
    // 1+2*3 parses the product first.
    assert_eq!(
        one("'1+2*3'"),
        Value::Expr(vec![
            Value::Int(1),
            Value::Int(2),
            Value::Int(3),
            Value::Cmd(Id::Mul),
            Value::Cmd(Id::Add),
        ])
    );
    // Parentheses override.
    assert_eq!(
        one("'(1+2)*3'"),
        Value::Expr(vec![
            Value::Int(1),
            Value::Int(2),
            Value::Cmd(Id::Add),
            Value::Int(3),
            Value::Cmd(Id::Mul),
        ])
    );
    // `^` associates right.
    assert_eq!(
        one("'2^3^2'"),
        Value::Expr(vec![
            Value::Int(2),
            Value::Int(3),
            Value::Int(2),
            Value::Cmd(Id::Pow),
            Value::Cmd(Id::Pow),
        ])
    );
}

#[test]
fn expression_functions_and_calls() {
    assert_eq!(
        one("'sin(x)'"),
        Value::Expr(vec![Value::Sym("x".into()), Value::Cmd(Id::Sin)])
    );
    assert_eq!(
        one("'f(x;2)'"),
        Value::Expr(vec![
            Value::Sym("x".into()),
            Value::Int(2),
            Value::Call {
                name: "f".into(),
                argc: 2,
            },
        ])
    );
    assert_eq!(
        one("'√(x)'"),
        Value::Expr(vec![Value::Sym("x".into()), Value::Cmd(Id::Sqrt)])
    );
}

#[test]
fn word_operators_parse_infix_with_boundaries() {
    assert_eq!(
        one("'x mod 3'"),
        Value::Expr(vec![
            Value::Sym("x".into()),
            Value::Int(3),
            Value::Cmd(Id::Mod),
        ])
    );
    assert_eq!(
        one("'a or b'"),
        Value::Expr(vec![
            Value::Sym("a".into()),
            Value::Sym("b".into()),
            Value::Cmd(Id::Or),
        ])
    );
    // `order` is a name, not `or` + `der`.
    assert_eq!(
        one("'a+order'"),
        Value::Expr(vec![
            Value::Sym("a".into()),
            Value::Sym("order".into()),
            Value::Cmd(Id::Add),
        ])
    );
}

#[test]
fn unary_minus_folds_into_literals() {
    assert_eq!(
        one("'-x'"),
        Value::Expr(vec![Value::Sym("x".into()), Value::Cmd(Id::Neg)])
    );
    assert_eq!(one("'-2'"), Value::Expr(vec![Value::Int(-2)]));
}

#[test]
fn top_level_assignment() {
    assert_eq!(
        one("a=3"),
        Value::Expr(vec![
            Value::Sym("a".into()),
            Value::Int(3),
            Value::Cmd(Id::Equal),
        ])
    );
}

#[test]
fn derivative_and_integral_forms() {
    assert_eq!(
        one("∂x(x^2)"),
        Value::Expr(vec![
            Value::Sym("x".into()),
            Value::Int(2),
            Value::Cmd(Id::Pow),
            Value::Sym("x".into()),
            Value::Cmd(Id::Differentiate),
        ])
    );
    assert_eq!(
        one("∫x(x)"),
        Value::Expr(vec![
            Value::Sym("x".into()),
            Value::Sym("x".into()),
            Value::Cmd(Id::Integrate),
        ])
    );
}

#[test]
fn comments_are_skipped() {
    assert_eq!(all("1 @ a comment @ 2"), vec![Value::Int(1), Value::Int(2)]);
    assert_eq!(all("1 @ to end of line\n2"), vec![Value::Int(1), Value::Int(2)]);
}

#[test]
fn grob_literal() {
    let v = one("GROB 8 2 AA55");
    assert_eq!(
        v,
        Value::Grob {
            width: 8,
            height: 2,
            color: false,
            pixels: vec![0xaa, 0x55],
        }
    );
}

#[test]
fn cosmetic_separators_are_stripped() {
    let mut settings = Settings::default();
    settings.thousands_separator = Some('\u{202F}');
    assert_eq!(
        parse_one("1\u{202F}234\u{202F}567", &settings).unwrap(),
        Value::Int(1_234_567)
    );
}

#[test]
fn errors_carry_byte_offsets() {
    let err = parse_one("\"unterminated", &Settings::default()).unwrap_err();
    assert_eq!(err, ParseError { offset: 1 });

    let err = parse_source("{ 1 2", &Settings::default()).unwrap_err();
    assert!(err.offset >= 5);

    assert!(parse_source("« 1", &Settings::default()).is_err());
}

#[test]
fn infinity_and_undefined_parse() {
    assert_eq!(one("∞"), Value::Cmd(Id::Infinity));
    assert_eq!(one("-∞"), Value::Cmd(Id::NegInfinity));
    assert_eq!(one("?"), Value::Cmd(Id::Undefined));
}

#[test]
fn multiple_objects_parse_in_sequence() {
    assert_eq!(
        all("2 3 + dup"),
        vec![
            Value::Int(2),
            Value::Int(3),
            Value::Cmd(Id::Add),
            Value::Cmd(Id::Dup),
        ]
    );
}
