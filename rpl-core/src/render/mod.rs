//! The textual renderer.
//!
//! Accumulates UTF-8 into a caller-provided buffer, in single-line or
//! multi-line mode. Output re-parses to the same object under the same
//! settings, which is the renderer's contract with the parser and the
//! backbone of the stack-view cache.

#[cfg(test)]
mod tests;

use bigdecimal::BigDecimal;
use itertools::Itertools;
use num_traits::ToPrimitive;
use rpl_types::{Id, Precedence};

use crate::object::{ConstClass, RangeForm, Value};
use crate::settings::{AngleMode, DisplayMode, Settings};

/// Rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// Everything on one line.
    #[default]
    Single,
    /// Programs and containers spread over indented lines.
    Multi,
}

/// Render target: a growable text buffer with indentation state.
#[derive(Debug)]
pub struct Renderer<'a> {
    out: &'a mut String,
    settings: &'a Settings,
    mode: RenderMode,
    indent: usize,
}

impl<'a> Renderer<'a> {
    /// Renderer writing into `out`.
    pub fn new(out: &'a mut String, settings: &'a Settings, mode: RenderMode) -> Renderer<'a> {
        Renderer {
            out,
            settings,
            mode,
            indent: 0,
        }
    }

    fn push(&mut self, s: &str) {
        self.out.push_str(s);
    }

    fn newline(&mut self) {
        if self.mode == RenderMode::Multi {
            self.out.push('\n');
            for _ in 0..self.indent {
                self.out.push_str("  ");
            }
        } else {
            self.out.push(' ');
        }
    }

    /// Render one object.
    pub fn value(&mut self, v: &Value) {
        match v {
            Value::Int(i) => self.integer(&i.to_string()),
            Value::Big(b) => self.integer(&b.to_string()),
            Value::Based { value, base, .. } => self.based(*value, *base),
            Value::Frac(f) => {
                self.integer(&f.numerator().to_string());
                self.push("/");
                self.integer(&f.denominator().to_string());
            }
            Value::Dec(d) => {
                let text = self.decimal(d);
                self.push(&text);
            }
            Value::F32(f) => {
                let text = format!("{}", f);
                self.push(&hw_digits(&text));
                self.push("f");
            }
            Value::F64(f) => {
                let text = format!("{}", f);
                self.push(&hw_digits(&text));
                self.push("d");
            }
            Value::Complex { re, im, polar } => {
                self.push("(");
                self.value(re);
                if *polar {
                    self.push("∠");
                    let arg = self.pi_units_to_angle(im);
                    self.push(&arg);
                } else {
                    self.push(",");
                    self.value(im);
                }
                self.push(")");
            }
            Value::Range { lo, hi, form } => self.range(lo, hi, *form),
            Value::Uncertain { mean, sigma } => {
                self.value(mean);
                self.push("σ");
                self.value(sigma);
            }
            Value::Unit { value, unit } => {
                self.value(value);
                self.push("_");
                let text = render_unit(unit);
                self.push(&text);
            }
            Value::Sym(name) => self.push(name),
            Value::Text(s) => {
                self.push("\"");
                self.push(s);
                self.push("\"");
            }
            Value::List(items) => self.sequence("{", "}", items),
            Value::Array(items) => self.sequence("[", "]", items),
            Value::Prog(items) | Value::Block(items) => {
                self.push("«");
                self.indent += 1;
                for item in items {
                    self.newline();
                    self.value(item);
                }
                self.indent -= 1;
                self.newline();
                self.push("»");
            }
            Value::Expr(tokens) => {
                self.push("'");
                let text = render_expression(tokens, self.settings);
                self.push(&text);
                self.push("'");
            }
            Value::Tagged { label, value } => {
                self.push(":");
                self.push(label);
                self.push(":");
                self.value(value);
            }
            Value::Grob {
                width,
                height,
                color,
                pixels,
            } => {
                self.push(if *color { "PIXM " } else { "GROB " });
                self.push(&width.to_string());
                self.push(" ");
                self.push(&height.to_string());
                self.push(" ");
                for byte in pixels {
                    self.push(&format!("{byte:02X}"));
                }
            }
            Value::Const { class, name } => {
                match class {
                    ConstClass::Constant if name == "π" => {
                        self.push("π");
                        return;
                    }
                    ConstClass::Constant => self.push("Ⓒ"),
                    ConstClass::Equation => self.push("Ⓔ"),
                    ConstClass::Library => self.push("Ⓛ"),
                }
                self.push(name);
            }
            Value::Call { name, argc } => {
                // Only meaningful inside expressions; render a marker
                // form when met standalone.
                self.push(name);
                self.push("(");
                self.push(&format!("…{argc}"));
                self.push(")");
            }
            Value::Cmd(id) => self.push(id.name()),
        }
    }

    fn sequence(&mut self, open: &str, close: &str, items: &[Value]) {
        self.push(open);
        for item in items {
            self.push(" ");
            self.value(item);
        }
        self.push(" ");
        self.push(close);
    }

    fn integer(&mut self, digits: &str) {
        match self.settings.thousands_separator {
            Some(sep) => self.push(&group_digits(digits, sep)),
            None => self.push(digits),
        }
    }

    fn based(&mut self, value: u64, base: u8) {
        self.push("#");
        let digits = match base {
            2 => format!("{value:b}"),
            8 => format!("{value:o}"),
            10 => format!("{value}"),
            _ => format!("{value:X}"),
        };
        self.push(&digits);
        self.push(match base {
            2 => "b",
            8 => "o",
            10 => "d",
            _ => "h",
        });
    }

    fn decimal(&self, d: &BigDecimal) -> String {
        let d = d.normalized();
        match self.settings.display {
            DisplayMode::Std => std_decimal(&d),
            DisplayMode::Fix(digits) => {
                let rounded = d.with_scale(digits as i64);
                let text = rounded.to_string();
                if text.contains('.') {
                    text
                } else {
                    format!("{text}.0")
                }
            }
            DisplayMode::Sci(digits) | DisplayMode::Eng(digits) => {
                sci_decimal(&d, digits, matches!(self.settings.display, DisplayMode::Eng(_)))
            }
        }
    }

    fn range(&mut self, lo: &Value, hi: &Value, form: RangeForm) {
        match form {
            RangeForm::Interval => {
                self.value(lo);
                self.push("…");
                self.value(hi);
            }
            RangeForm::Delta | RangeForm::Percent => {
                // Endpoints back to centre ± half-width for display.
                let s = self.settings;
                let center_delta = (|| -> crate::error::SimpleResult<(Value, Value)> {
                    use crate::arith::{apply, AddOp, DivOp, MulOp, SubOp};
                    let sum = apply::<AddOp>(s, lo.clone(), hi.clone())?;
                    let center = apply::<DivOp>(s, sum, Value::Int(2))?;
                    let width = apply::<SubOp>(s, hi.clone(), lo.clone())?;
                    let half = apply::<DivOp>(s, width, Value::Int(2))?;
                    if form == RangeForm::Percent && !center.is_zero() {
                        let pct =
                            apply::<DivOp>(s, apply::<MulOp>(s, half, Value::Int(100))?, center.clone())?;
                        return Ok((center, pct));
                    }
                    Ok((center, half))
                })();
                match center_delta {
                    Ok((center, delta)) => {
                        self.value(&center);
                        self.push("±");
                        self.value(&delta);
                        if form == RangeForm::Percent {
                            self.push("%");
                        }
                    }
                    Err(_) => {
                        self.value(lo);
                        self.push("…");
                        self.value(hi);
                    }
                }
            }
        }
    }

    fn pi_units_to_angle(&self, arg: &Value) -> String {
        use crate::arith::{apply, MulOp};
        let s = self.settings;
        let scaled = match s.angle_mode {
            AngleMode::Degrees => apply::<MulOp>(s, arg.clone(), Value::Int(180)),
            AngleMode::Grads => apply::<MulOp>(s, arg.clone(), Value::Int(200)),
            AngleMode::Radians => {
                let pi = BigDecimal::try_from(core::f64::consts::PI).expect("finite");
                apply::<MulOp>(s, arg.clone(), Value::Dec(pi))
            }
        };
        let mut out = String::new();
        let mut r = Renderer::new(&mut out, s, RenderMode::Single);
        match scaled {
            Ok(v) => r.value(&v.canonical()),
            Err(_) => r.value(arg),
        }
        out
    }
}

/// Render a value to a fresh string.
pub fn render(v: &Value, settings: &Settings, mode: RenderMode) -> String {
    let mut out = String::new();
    Renderer::new(&mut out, settings, mode).value(v);
    out
}

fn group_digits(digits: &str, sep: char) -> String {
    let (sign, body) = match digits.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", digits),
    };
    let mut grouped = String::with_capacity(body.len() + body.len() / 3 + 1);
    let chars: Vec<char> = body.chars().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            grouped.push(sep);
        }
        grouped.push(*c);
    }
    format!("{sign}{grouped}")
}

fn hw_digits(text: &str) -> String {
    // `{}` formatting of a whole float gives `3`; keep a decimal point
    // so the suffix parse stays in the float family.
    if text.contains('.') || text.contains('e') || text.contains("inf") || text.contains("NaN") {
        text.to_owned()
    } else {
        format!("{text}.0")
    }
}

fn std_decimal(d: &BigDecimal) -> String {
    let text = d.to_string();
    if text.contains('.') || text.contains('e') || text.contains('E') {
        text
    } else {
        format!("{text}.0")
    }
}

fn sci_decimal(d: &BigDecimal, digits: u8, engineering: bool) -> String {
    let f = d.to_f64().unwrap_or(0.0);
    if f == 0.0 {
        return format!("0.{}e0", "0".repeat(digits as usize));
    }
    let mut exponent = f.abs().log10().floor() as i32;
    if engineering {
        exponent -= exponent.rem_euclid(3);
    }
    let mantissa = f / libm::pow(10.0, exponent as f64);
    format!("{:.*}e{}", digits as usize, mantissa, exponent)
}

/// Render a unit expression compactly, no quotes, no spaces.
pub fn render_unit(unit: &Value) -> String {
    match unit {
        Value::Expr(tokens) => render_unit_tokens(tokens),
        Value::Sym(name) => name.clone(),
        other => render(other, &Settings::default(), RenderMode::Single),
    }
}

fn render_unit_tokens(tokens: &[Value]) -> String {
    let mut stack: Vec<String> = Vec::new();
    for token in tokens {
        match token {
            Value::Sym(name) => stack.push(name.clone()),
            Value::Int(i) => stack.push(i.to_string()),
            Value::Cmd(Id::Mul) => {
                if let (Some(b), Some(a)) = (stack.pop(), stack.pop()) {
                    stack.push(format!("{a}*{b}"));
                }
            }
            Value::Cmd(Id::Div) => {
                if let (Some(b), Some(a)) = (stack.pop(), stack.pop()) {
                    stack.push(format!("{a}/{b}"));
                }
            }
            Value::Cmd(Id::Pow) => {
                if let (Some(b), Some(a)) = (stack.pop(), stack.pop()) {
                    stack.push(format!("{a}^{b}"));
                }
            }
            _ => {}
        }
    }
    stack.pop().unwrap_or_default()
}

/// Render an expression body as infix text with minimal parentheses.
pub fn render_expression(tokens: &[Value], settings: &Settings) -> String {
    fn pop(stack: &mut Vec<(String, Precedence)>) -> (String, Precedence) {
        stack.pop().unwrap_or((String::new(), Precedence::Atom))
    }
    let mut stack: Vec<(String, Precedence)> = Vec::new();
    for token in tokens {
        match token {
            Value::Cmd(id) if id.is_infix() || *id == Id::Equal => {
                let (y, yp) = pop(&mut stack);
                let (x, xp) = pop(&mut stack);
                let prec = id.precedence();
                // Left operand needs parentheses below the operator;
                // the right one also at equal precedence (left
                // associativity). `^` associates the other way.
                let right_assoc = *id == Id::Pow;
                let x = parenthesize(x, xp, prec, right_assoc);
                let y = parenthesize_right(y, yp, prec, right_assoc);
                // Word operators keep spaces around them; glyph
                // operators join tightly.
                let text = match id {
                    Id::Mul => format!("{x}·{y}"),
                    Id::Mod | Id::Rem | Id::And | Id::Or | Id::Xor => {
                        format!("{x} {} {y}", id.name())
                    }
                    other => format!("{x}{}{y}", other.name()),
                };
                stack.push((text, prec));
            }
            Value::Cmd(id)
                if matches!(id.arity(), rpl_types::Arity::Fixed(1)) && id.is_command() =>
            {
                let (x, _) = pop(&mut stack);
                let text = if *id == Id::Neg {
                    format!("-({x})")
                } else {
                    format!("{}({x})", id.name())
                };
                stack.push((text, Precedence::Function));
            }
            Value::Cmd(id) if *id == Id::Differentiate || *id == Id::Integrate => {
                let (var, _) = pop(&mut stack);
                let (body, _) = pop(&mut stack);
                let glyph = if *id == Id::Differentiate { "∂" } else { "∫" };
                let var = var.trim_matches('\'');
                stack.push((format!("{glyph}{var}({body})"), Precedence::Function));
            }
            Value::Call { name, argc } => {
                let n = *argc as usize;
                let mut args = Vec::with_capacity(n);
                for _ in 0..n {
                    args.push(pop(&mut stack).0);
                }
                args.reverse();
                stack.push((
                    format!("{name}({})", args.join(";")),
                    Precedence::Function,
                ));
            }
            Value::Sym(name) => stack.push((name.clone(), Precedence::Atom)),
            operand => {
                let text = render(operand, settings, RenderMode::Single);
                let prec = if operand.is_negative() {
                    Precedence::Unary
                } else {
                    Precedence::Atom
                };
                stack.push((text, prec));
            }
        }
    }
    stack.into_iter().map(|(text, _)| text).join(" ")
}

fn parenthesize(text: String, inner: Precedence, outer: Precedence, right_assoc: bool) -> String {
    let needs = if right_assoc {
        inner <= outer && inner != Precedence::Atom && inner != Precedence::Function
    } else {
        inner < outer
    };
    if needs {
        format!("({text})")
    } else {
        text
    }
}

fn parenthesize_right(
    text: String,
    inner: Precedence,
    outer: Precedence,
    right_assoc: bool,
) -> String {
    let needs = if right_assoc {
        inner < outer
    } else {
        inner <= outer && inner != Precedence::Atom && inner != Precedence::Function
    };
    if needs {
        format!("({text})")
    } else {
        text
    }
}

