//! Byte-record codec.
//!
//! Every object is `LEB128 tag` + payload; payload sizes are always
//! recoverable from the payload itself, so a record can be walked
//! without a side table. The encoder canonicalizes before writing; the
//! decoder trusts nothing and reports `Internal` on malformed bytes.

use bigdecimal::BigDecimal;
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{Signed, Zero};
use rpl_types::{leb128, ErrorKind, Id};

use super::value::{ConstClass, RangeForm, Value};
use super::Fraction;
use crate::error::SimpleResult;

/// Serialize a value, canonicalizing on the way out.
pub fn encode(value: &Value, out: &mut Vec<u8>) {
    let id = value.id();
    leb128::write_unsigned(out, id as u64);
    match value {
        Value::Int(i) => leb128::write_unsigned(out, i.unsigned_abs()),
        Value::Based {
            value,
            base,
            wordsize,
        } => {
            out.push(*base);
            out.push(*wordsize);
            leb128::write_unsigned(out, *value);
        }
        Value::Big(b) => write_magnitude(out, b.magnitude()),
        Value::Frac(f) => {
            encode(&int_value(f.numerator().abs()), out);
            encode(&int_value(f.denominator().clone()), out);
        }
        Value::Dec(d) => {
            let (mantissa, scale) = d.normalized().as_bigint_and_exponent();
            leb128::write_signed(out, -scale);
            write_magnitude(out, mantissa.magnitude());
        }
        Value::F32(f) => out.extend_from_slice(&f.to_le_bytes()),
        Value::F64(f) => out.extend_from_slice(&f.to_le_bytes()),
        Value::Complex { re, im, .. } => {
            encode(re, out);
            encode(im, out);
        }
        Value::Range { lo, hi, .. } => {
            encode(lo, out);
            encode(hi, out);
        }
        Value::Uncertain { mean, sigma } => {
            encode(mean, out);
            encode(sigma, out);
        }
        Value::Unit { value, unit } => {
            encode(value, out);
            encode(unit, out);
        }
        Value::Sym(s) | Value::Text(s) => {
            leb128::write_unsigned(out, s.len() as u64);
            out.extend_from_slice(s.as_bytes());
        }
        Value::List(items)
        | Value::Array(items)
        | Value::Expr(items)
        | Value::Prog(items)
        | Value::Block(items) => {
            let mut body = Vec::new();
            for item in items {
                encode(item, &mut body);
            }
            leb128::write_unsigned(out, body.len() as u64);
            out.extend_from_slice(&body);
        }
        Value::Tagged { label, value } => {
            leb128::write_unsigned(out, label.len() as u64);
            out.extend_from_slice(label.as_bytes());
            encode(value, out);
        }
        Value::Grob {
            width,
            height,
            pixels,
            ..
        } => {
            leb128::write_unsigned(out, *width as u64);
            leb128::write_unsigned(out, *height as u64);
            out.extend_from_slice(pixels);
        }
        Value::Const { name, .. } => {
            leb128::write_unsigned(out, name.len() as u64);
            out.extend_from_slice(name.as_bytes());
        }
        Value::Call { name, argc } => {
            leb128::write_unsigned(out, name.len() as u64);
            out.extend_from_slice(name.as_bytes());
            leb128::write_unsigned(out, *argc as u64);
        }
        Value::Cmd(_) => {}
    }
}

/// Decode the object at `at`, returning the value and its total size.
pub fn decode(heap: &[u8], at: usize) -> SimpleResult<(Value, usize)> {
    let bytes = heap.get(at..).ok_or(ErrorKind::Internal)?;
    let (raw, tag_len) = leb128::read_unsigned(bytes).ok_or(ErrorKind::Internal)?;
    let id = u8::try_from(raw)
        .ok()
        .and_then(|b| Id::try_from(b).ok())
        .ok_or(ErrorKind::Internal)?;
    let body = &bytes[tag_len..];
    let (value, body_len) = decode_body(id, body, heap, at + tag_len)?;
    Ok((value, tag_len + body_len))
}

fn decode_body(
    id: Id,
    body: &[u8],
    heap: &[u8],
    body_at: usize,
) -> SimpleResult<(Value, usize)> {
    Ok(match id {
        Id::Integer | Id::NegInteger => {
            let (mag, n) = leb128::read_unsigned(body).ok_or(ErrorKind::Internal)?;
            let value = if id == Id::NegInteger {
                match i64::try_from(mag) {
                    Ok(m) => Value::Int(-m),
                    Err(_) if mag == 1u64 << 63 => Value::Int(i64::MIN),
                    Err(_) => Value::Big(-BigInt::from(mag)),
                }
            } else {
                match i64::try_from(mag) {
                    Ok(m) => Value::Int(m),
                    Err(_) => Value::Big(BigInt::from(mag)),
                }
            };
            (value, n)
        }
        Id::BasedInteger => {
            let base = *body.first().ok_or(ErrorKind::Internal)?;
            let wordsize = *body.get(1).ok_or(ErrorKind::Internal)?;
            let (value, n) = leb128::read_unsigned(&body[2..]).ok_or(ErrorKind::Internal)?;
            (
                Value::Based {
                    value,
                    base,
                    wordsize,
                },
                2 + n,
            )
        }
        Id::Bignum | Id::NegBignum => {
            let (mag, n) = read_magnitude(body)?;
            let sign = if id == Id::NegBignum {
                Sign::Minus
            } else {
                Sign::Plus
            };
            (
                Value::Big(BigInt::from_biguint(sign, mag)).canonical(),
                n,
            )
        }
        Id::Fraction | Id::NegFraction | Id::BigFraction | Id::NegBigFraction => {
            let (num, num_len) = decode(heap, body_at)?;
            let (den, den_len) = decode(heap, body_at + num_len)?;
            let mut num = num.as_bigint().ok_or(ErrorKind::Internal)?;
            let den = den.as_bigint().ok_or(ErrorKind::Internal)?;
            if matches!(id, Id::NegFraction | Id::NegBigFraction) {
                num = -num;
            }
            let frac = Fraction::new(num, den).map_err(|_| ErrorKind::Internal)?;
            (Value::Frac(frac), num_len + den_len)
        }
        Id::Decimal | Id::NegDecimal => {
            let (exponent, exp_len) = leb128::read_signed(body).ok_or(ErrorKind::Internal)?;
            let (mag, mag_len) = read_magnitude(&body[exp_len..])?;
            let sign = if id == Id::NegDecimal {
                Sign::Minus
            } else {
                Sign::Plus
            };
            let mantissa = BigInt::from_biguint(sign, mag);
            (
                Value::Dec(BigDecimal::new(mantissa, -exponent)),
                exp_len + mag_len,
            )
        }
        Id::HwFloat => {
            let raw: [u8; 4] = body
                .get(..4)
                .and_then(|b| b.try_into().ok())
                .ok_or(ErrorKind::Internal)?;
            (Value::F32(f32::from_le_bytes(raw)), 4)
        }
        Id::HwDouble => {
            let raw: [u8; 8] = body
                .get(..8)
                .and_then(|b| b.try_into().ok())
                .ok_or(ErrorKind::Internal)?;
            (Value::F64(f64::from_le_bytes(raw)), 8)
        }
        Id::Rectangular | Id::Polar => {
            let (re, re_len) = decode(heap, body_at)?;
            let (im, im_len) = decode(heap, body_at + re_len)?;
            (
                Value::Complex {
                    re: Box::new(re),
                    im: Box::new(im),
                    polar: id == Id::Polar,
                },
                re_len + im_len,
            )
        }
        Id::Range | Id::DeltaRange | Id::PercentRange => {
            let (lo, lo_len) = decode(heap, body_at)?;
            let (hi, hi_len) = decode(heap, body_at + lo_len)?;
            let form = match id {
                Id::DeltaRange => RangeForm::Delta,
                Id::PercentRange => RangeForm::Percent,
                _ => RangeForm::Interval,
            };
            (
                Value::Range {
                    lo: Box::new(lo),
                    hi: Box::new(hi),
                    form,
                },
                lo_len + hi_len,
            )
        }
        Id::Uncertain => {
            let (mean, mean_len) = decode(heap, body_at)?;
            let (sigma, sigma_len) = decode(heap, body_at + mean_len)?;
            (
                Value::Uncertain {
                    mean: Box::new(mean),
                    sigma: Box::new(sigma),
                },
                mean_len + sigma_len,
            )
        }
        Id::Unit => {
            let (value, value_len) = decode(heap, body_at)?;
            let (unit, unit_len) = decode(heap, body_at + value_len)?;
            (
                Value::Unit {
                    value: Box::new(value),
                    unit: Box::new(unit),
                },
                value_len + unit_len,
            )
        }
        Id::Symbol | Id::Text => {
            let (s, n) = read_string(body)?;
            let value = if id == Id::Symbol {
                Value::Sym(s)
            } else {
                Value::Text(s)
            };
            (value, n)
        }
        Id::List | Id::Array | Id::Expression | Id::Program | Id::Block => {
            let (body_len, len_len) = leb128::read_unsigned(body).ok_or(ErrorKind::Internal)?;
            let body_len = body_len as usize;
            let mut items = Vec::new();
            let mut offset = 0usize;
            while offset < body_len {
                let (item, item_len) = decode(heap, body_at + len_len + offset)?;
                items.push(item);
                offset += item_len;
            }
            if offset != body_len {
                return Err(ErrorKind::Internal);
            }
            let value = match id {
                Id::List => Value::List(items),
                Id::Array => Value::Array(items),
                Id::Expression => Value::Expr(items),
                Id::Program => Value::Prog(items),
                _ => Value::Block(items),
            };
            (value, len_len + body_len)
        }
        Id::Tagged => {
            let (label, label_len) = read_string(body)?;
            let (value, value_len) = decode(heap, body_at + label_len)?;
            (
                Value::Tagged {
                    label,
                    value: Box::new(value),
                },
                label_len + value_len,
            )
        }
        Id::Grob | Id::Pixmap => {
            let (width, w_len) = leb128::read_unsigned(body).ok_or(ErrorKind::Internal)?;
            let (height, h_len) =
                leb128::read_unsigned(&body[w_len..]).ok_or(ErrorKind::Internal)?;
            let color = id == Id::Pixmap;
            let row = row_bytes(width as u32, color);
            let pixel_len = row * height as usize;
            let pixels = body
                .get(w_len + h_len..w_len + h_len + pixel_len)
                .ok_or(ErrorKind::Internal)?
                .to_vec();
            (
                Value::Grob {
                    width: width as u32,
                    height: height as u32,
                    color,
                    pixels,
                },
                w_len + h_len + pixel_len,
            )
        }
        Id::Constant | Id::Equation | Id::Library => {
            let (name, n) = read_string(body)?;
            let class = match id {
                Id::Equation => ConstClass::Equation,
                Id::Library => ConstClass::Library,
                _ => ConstClass::Constant,
            };
            (Value::Const { class, name }, n)
        }
        Id::Call => {
            let (name, name_len) = read_string(body)?;
            let (argc, argc_len) =
                leb128::read_unsigned(&body[name_len..]).ok_or(ErrorKind::Internal)?;
            (
                Value::Call {
                    name,
                    argc: argc as u32,
                },
                name_len + argc_len,
            )
        }
        _ => (Value::Cmd(id), 0),
    })
}

/// Total byte size of the object at `at`, without building a value.
pub fn object_size(heap: &[u8], at: usize) -> SimpleResult<usize> {
    // Container walks stay cheap because bodies carry byte lengths; the
    // recursive families (fraction, complex, unit…) are shallow.
    let bytes = heap.get(at..).ok_or(ErrorKind::Internal)?;
    let (raw, tag_len) = leb128::read_unsigned(bytes).ok_or(ErrorKind::Internal)?;
    let id = u8::try_from(raw)
        .ok()
        .and_then(|b| Id::try_from(b).ok())
        .ok_or(ErrorKind::Internal)?;
    let body = &bytes[tag_len..];
    let body_len = match id {
        Id::Integer | Id::NegInteger => varint_len(body)?,
        Id::BasedInteger => 2 + varint_len(body.get(2..).ok_or(ErrorKind::Internal)?)?,
        Id::Bignum | Id::NegBignum | Id::Symbol | Id::Text | Id::Constant | Id::Equation
        | Id::Library => counted_len(body)?,
        Id::Fraction | Id::NegFraction | Id::BigFraction | Id::NegBigFraction
        | Id::Rectangular | Id::Polar | Id::Range | Id::DeltaRange | Id::PercentRange
        | Id::Uncertain | Id::Unit => {
            let first = object_size(heap, at + tag_len)?;
            let second = object_size(heap, at + tag_len + first)?;
            first + second
        }
        Id::Decimal | Id::NegDecimal => {
            let exp_len = varint_len(body)?;
            exp_len + counted_len(&body[exp_len..])?
        }
        Id::HwFloat => 4,
        Id::HwDouble => 8,
        Id::List | Id::Array | Id::Expression | Id::Program | Id::Block => counted_len(body)?,
        Id::Tagged => {
            let label_len = counted_len(body)?;
            label_len + object_size(heap, at + tag_len + label_len)?
        }
        Id::Grob | Id::Pixmap => {
            let (width, w_len) = leb128::read_unsigned(body).ok_or(ErrorKind::Internal)?;
            let (height, h_len) =
                leb128::read_unsigned(&body[w_len..]).ok_or(ErrorKind::Internal)?;
            w_len + h_len + row_bytes(width as u32, id == Id::Pixmap) * height as usize
        }
        Id::Call => {
            let name_len = counted_len(body)?;
            name_len + varint_len(&body[name_len..])?
        }
        _ => 0,
    };
    if tag_len + body_len > bytes.len() {
        return Err(ErrorKind::Internal);
    }
    Ok(tag_len + body_len)
}

/// The tag of the object at `at`.
pub fn tag_at(heap: &[u8], at: usize) -> SimpleResult<Id> {
    let bytes = heap.get(at..).ok_or(ErrorKind::Internal)?;
    let (raw, _) = leb128::read_unsigned(bytes).ok_or(ErrorKind::Internal)?;
    u8::try_from(raw)
        .ok()
        .and_then(|b| Id::try_from(b).ok())
        .ok_or(ErrorKind::Internal)
}

/// Bytes per raster row, 1-bpp packed or 16-bpp.
pub fn row_bytes(width: u32, color: bool) -> usize {
    if color {
        2 * width as usize
    } else {
        (width as usize + 7) / 8
    }
}

fn varint_len(body: &[u8]) -> SimpleResult<usize> {
    leb128::read_unsigned(body)
        .map(|(_, n)| n)
        .ok_or(ErrorKind::Internal)
}

fn counted_len(body: &[u8]) -> SimpleResult<usize> {
    let (count, n) = leb128::read_unsigned(body).ok_or(ErrorKind::Internal)?;
    Ok(n + count as usize)
}

fn read_string(body: &[u8]) -> SimpleResult<(String, usize)> {
    let (len, n) = leb128::read_unsigned(body).ok_or(ErrorKind::Internal)?;
    let len = len as usize;
    let raw = body.get(n..n + len).ok_or(ErrorKind::Internal)?;
    let s = core::str::from_utf8(raw).map_err(|_| ErrorKind::Internal)?;
    Ok((s.to_owned(), n + len))
}

fn write_magnitude(out: &mut Vec<u8>, mag: &BigUint) {
    let bytes = mag.to_bytes_be();
    // Zero encodes as an empty magnitude.
    let bytes: &[u8] = if mag.is_zero() { &[] } else { &bytes };
    leb128::write_unsigned(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}

fn read_magnitude(body: &[u8]) -> SimpleResult<(BigUint, usize)> {
    let (len, n) = leb128::read_unsigned(body).ok_or(ErrorKind::Internal)?;
    let len = len as usize;
    let raw = body.get(n..n + len).ok_or(ErrorKind::Internal)?;
    Ok((BigUint::from_bytes_be(raw), n + len))
}

fn int_value(big: BigInt) -> Value {
    Value::Big(big).canonical()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(value: Value) {
        let canonical = value.canonical();
        let mut buf = Vec::new();
        encode(&canonical, &mut buf);
        let (decoded, len) = decode(&buf, 0).expect("decode");
        assert_eq!(len, buf.len());
        assert_eq!(decoded, canonical);
        assert_eq!(object_size(&buf, 0).expect("size"), buf.len());
    }

    #[test]
    fn scalars_round_trip() {
        round_trip(Value::Int(0));
        round_trip(Value::Int(-12345));
        round_trip(Value::Int(i64::MAX));
        round_trip(Value::Big(BigInt::from(u64::MAX) * 37u8));
        round_trip(Value::Frac(
            Fraction::new(BigInt::from(-22), BigInt::from(7)).unwrap(),
        ));
        round_trip(Value::Dec(BigDecimal::try_from(3.25).unwrap()));
        round_trip(Value::F32(1.5));
        round_trip(Value::F64(-2.25e300));
        round_trip(Value::Based {
            value: 0xbeef,
            base: 16,
            wordsize: 32,
        });
    }

    #[test]
    fn composites_round_trip() {
        round_trip(Value::Complex {
            re: Box::new(Value::Int(0)),
            im: Box::new(Value::Int(1)),
            polar: false,
        });
        round_trip(Value::Range {
            lo: Box::new(Value::Int(2)),
            hi: Box::new(Value::Int(4)),
            form: RangeForm::Interval,
        });
        round_trip(Value::List(vec![
            Value::Int(1),
            Value::Text("abc".into()),
            Value::Sym("x".into()),
        ]));
        round_trip(Value::Prog(vec![
            Value::Int(2),
            Value::Int(3),
            Value::Cmd(Id::Add),
        ]));
        round_trip(Value::Tagged {
            label: "answer".into(),
            value: Box::new(Value::Int(42)),
        });
        round_trip(Value::Unit {
            value: Box::new(Value::Int(9)),
            unit: Box::new(Value::Expr(vec![Value::Sym("m".into())])),
        });
    }

    #[test]
    fn grob_round_trip_and_row_padding() {
        round_trip(Value::Grob {
            width: 10,
            height: 3,
            color: false,
            pixels: vec![0u8; 2 * 3],
        });
        assert_eq!(row_bytes(10, false), 2);
        assert_eq!(row_bytes(10, true), 20);
    }

    #[test]
    fn malformed_bytes_are_internal_errors() {
        assert_eq!(decode(&[0xff], 0), Err(ErrorKind::Internal));
        // Truncated text payload.
        let mut buf = Vec::new();
        encode(&Value::Text("hello".into()), &mut buf);
        assert!(decode(&buf[..buf.len() - 1], 0).is_err());
    }

    #[test]
    fn nested_container_sizes_match() {
        let value = Value::List(vec![
            Value::List(vec![Value::Int(1), Value::Int(2)]),
            Value::Complex {
                re: Box::new(Value::Int(3)),
                im: Box::new(Value::Int(4)),
                polar: true,
            },
        ]);
        round_trip(value);
    }
}
