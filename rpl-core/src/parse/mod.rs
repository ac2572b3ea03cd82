//! The source parser.
//!
//! Dispatches on the first code point of each object, with a
//! precedence context for expression bodies and post-parse stitching
//! for the composite literal forms (complex, polar, unit, ranges,
//! fractions, assignment). Parsers are pure: on failure the cursor
//! stays at the offending byte so the UI can anchor the diagnostic.

#[cfg(test)]
mod tests;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use rpl_types::{Id, Precedence};
use std::str::FromStr;
use strum::IntoEnumIterator;

use crate::object::{ConstClass, RangeForm, Value};
use crate::settings::Settings;

/// Syntax error with the byte offset of the offending code point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("syntax error at byte {offset}")]
pub struct ParseError {
    /// Byte offset into the source text.
    pub offset: usize,
}

/// Parse a whole command line into a sequence of objects.
pub fn parse_source(src: &str, settings: &Settings) -> Result<Vec<Value>, ParseError> {
    let mut p = Parser::new(src, settings);
    let mut objects = Vec::new();
    loop {
        p.skip_whitespace();
        if p.at_end() {
            return Ok(objects);
        }
        let value = p.object()?;
        objects.push(value);
    }
}

/// Parse exactly one object, failing on trailing garbage.
pub fn parse_one(src: &str, settings: &Settings) -> Result<Value, ParseError> {
    let mut objects = parse_source(src, settings)?;
    match objects.len() {
        1 => Ok(objects.remove(0)),
        _ => Err(ParseError { offset: src.len() }),
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    settings: &'a Settings,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str, settings: &'a Settings) -> Parser<'a> {
        Parser {
            src,
            pos: 0,
            settings,
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn eat_str(&mut self, s: &str) -> bool {
        if self.rest().starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn error<T>(&self) -> Result<T, ParseError> {
        Err(ParseError { offset: self.pos })
    }

    fn skip_whitespace(&mut self) {
        loop {
            while matches!(self.peek(), Some(c) if c.is_whitespace()) {
                self.bump();
            }
            // `@ … @` comments are skipped like whitespace; an
            // unterminated comment runs to the end of the line.
            if self.peek() == Some('@') {
                self.bump();
                while let Some(c) = self.bump() {
                    if c == '@' || c == '\n' {
                        break;
                    }
                }
                continue;
            }
            return;
        }
    }

    // === dispatcher =====================================================

    fn object(&mut self) -> Result<Value, ParseError> {
        let c = match self.peek() {
            Some(c) => c,
            None => return self.error(),
        };
        let value = match c {
            '0'..='9' | '.' => self.number_with_stitch()?,
            '-' | '+' if self.second_is_digit() => self.number_with_stitch()?,
            '#' => self.based()?,
            '"' => self.text()?,
            '\'' => self.quoted()?,
            '{' => self.list()?,
            '[' => self.array()?,
            '«' => self.program("«", "»")?,
            '(' => self.complex()?,
            ':' => self.tagged()?,
            'Ⓒ' => self.marker(ConstClass::Constant)?,
            'Ⓔ' => self.marker(ConstClass::Equation)?,
            'Ⓛ' => self.marker(ConstClass::Library)?,
            _ if self.rest().starts_with("<<") => self.program("<<", ">>")?,
            _ => self.word()?,
        };
        Ok(value)
    }

    fn second_is_digit(&self) -> bool {
        let mut chars = self.rest().chars();
        chars.next();
        matches!(chars.next(), Some(c) if c.is_ascii_digit())
    }

    // === numbers ========================================================

    fn digits(&mut self, out: &mut String) {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                out.push(c);
                self.bump();
            } else if Some(c) == self.settings.thousands_separator {
                // Cosmetic separators vanish on commit.
                self.bump();
            } else {
                break;
            }
        }
    }

    /// Plain number: integer, decimal, or hardware float by suffix.
    fn number(&mut self) -> Result<Value, ParseError> {
        let start = self.pos;
        let mut text = String::new();
        if self.eat('-') {
            text.push('-');
        } else {
            self.eat('+');
        }
        self.digits(&mut text);
        let mut is_decimal = false;
        if self.peek() == Some('.') {
            self.bump();
            is_decimal = true;
            text.push('.');
            self.digits(&mut text);
        }
        if text.is_empty() || text == "-" || text == "." || text == "-." {
            self.pos = start;
            return self.error();
        }
        if matches!(self.peek(), Some('e' | 'E')) && self.exponent_follows() {
            self.bump();
            is_decimal = true;
            text.push('e');
            if self.eat('-') {
                text.push('-');
            } else {
                self.eat('+');
            }
            self.digits(&mut text);
        }
        // `f`/`d` suffix downgrades to hardware floats.
        if self.eat('f') {
            return match text.parse::<f32>() {
                Ok(f) => Ok(Value::F32(f)),
                Err(_) => self.error(),
            };
        }
        if self.eat('d') {
            return match text.parse::<f64>() {
                Ok(f) => Ok(Value::F64(f)),
                Err(_) => self.error(),
            };
        }
        if is_decimal {
            return match BigDecimal::from_str(&text) {
                Ok(d) => Ok(Value::Dec(d.normalized())),
                Err(_) => self.error(),
            };
        }
        // Integer; literals that overflow the machine word promote to
        // bignum silently.
        match text.parse::<i64>() {
            Ok(i) => Ok(Value::Int(i)),
            Err(_) => match BigInt::from_str(&text) {
                Ok(b) => Ok(Value::Big(b)),
                Err(_) => self.error(),
            },
        }
    }

    fn exponent_follows(&self) -> bool {
        let mut chars = self.rest().chars();
        chars.next();
        match chars.next() {
            Some(c) if c.is_ascii_digit() => true,
            Some('+' | '-') => matches!(chars.next(), Some(c) if c.is_ascii_digit()),
            _ => false,
        }
    }

    /// A number followed by its composite stitches: fraction bar,
    /// imaginary marker, polar angle, unit underscore, range forms.
    fn number_with_stitch(&mut self) -> Result<Value, ParseError> {
        let first = self.number()?;

        // `3/4` with no spaces is a fraction literal.
        if self.peek() == Some('/') && self.second_is_digit() {
            self.bump();
            let den = self.number()?;
            if let (Some(n), Some(d)) = (first.as_bigint(), den.as_bigint()) {
                let frac = crate::object::Fraction::new(n, d).map_err(|_| ParseError {
                    offset: self.pos,
                })?;
                return Ok(Value::Frac(frac).canonical());
            }
            return self.error();
        }

        // Pure imaginary: `2ⅈ`.
        if self.eat('ⅈ') {
            return Ok(Value::Complex {
                re: Box::new(Value::Int(0)),
                im: Box::new(first),
                polar: false,
            });
        }

        // Rectangular complex: `3+2ⅈ` / `3-2ⅈ`.
        if matches!(self.peek(), Some('+' | '-')) {
            let mark = self.pos;
            let negative = self.peek() == Some('-');
            self.bump();
            if let Ok(im) = self.number() {
                if self.eat('ⅈ') {
                    let im = if negative { negate_literal(im) } else { im };
                    return Ok(Value::Complex {
                        re: Box::new(first),
                        im: Box::new(im),
                        polar: false,
                    });
                }
            }
            self.pos = mark;
            return Ok(first);
        }

        // Polar complex: `2∠30`.
        if self.eat('∠') {
            let arg = self.number()?;
            return Ok(Value::Complex {
                re: Box::new(first),
                im: Box::new(self.angle_to_pi_units(arg)),
                polar: true,
            });
        }

        // Unit: `1_m/s` or a non-breaking space marker.
        if self.eat('_') || self.eat('\u{00A0}') {
            let unit = self.unit_expr()?;
            return Ok(Value::Unit {
                value: Box::new(first),
                unit: Box::new(unit),
            });
        }

        // Interval: `2…4` (or the ASCII spelling `..`).
        if self.eat('…') || self.eat_str("..") {
            let hi = self.number()?;
            return Ok(Value::Range {
                lo: Box::new(first),
                hi: Box::new(hi),
                form: RangeForm::Interval,
            });
        }

        // Delta / percent ranges: `3±0.5`, `3±5%`.
        if self.eat('±') {
            let delta = self.number()?;
            let form = if self.eat('%') {
                RangeForm::Percent
            } else {
                RangeForm::Delta
            };
            return self
                .delta_range(first, delta, form)
                .map_err(|_| ParseError { offset: self.pos });
        }

        // Uncertain: `2σ0.1`.
        if self.eat('σ') {
            let sigma = self.number()?;
            return Ok(Value::Uncertain {
                mean: Box::new(first),
                sigma: Box::new(sigma),
            });
        }

        Ok(first)
    }

    /// Store delta and percent forms as endpoint intervals.
    fn delta_range(
        &self,
        center: Value,
        delta: Value,
        form: RangeForm,
    ) -> crate::error::SimpleResult<Value> {
        use crate::arith::{apply, AddOp, DivOp, MulOp, SubOp};
        let s = self.settings;
        let half = match form {
            RangeForm::Percent => {
                let scaled = apply::<MulOp>(s, center.clone(), delta)?;
                apply::<DivOp>(s, scaled, Value::Int(100))?
            }
            _ => delta,
        };
        let abs_half = if half.is_negative() {
            apply::<MulOp>(s, half, Value::Int(-1))?
        } else {
            half
        };
        let lo = apply::<SubOp>(s, center.clone(), abs_half.clone())?;
        let hi = apply::<AddOp>(s, center, abs_half)?;
        Ok(Value::Range {
            lo: Box::new(lo.canonical()),
            hi: Box::new(hi.canonical()),
            form,
        })
    }

    /// Convert a parsed polar argument in the current angle mode to π
    /// units.
    fn angle_to_pi_units(&self, arg: Value) -> Value {
        use crate::arith::{apply, DivOp, MulOp};
        use crate::settings::AngleMode;
        let s = self.settings;
        let result = match s.angle_mode {
            AngleMode::Degrees => apply::<DivOp>(s, arg, Value::Int(180)),
            AngleMode::Grads => apply::<DivOp>(s, arg, Value::Int(200)),
            AngleMode::Radians => {
                let pi = BigDecimal::from_str("3.14159265358979323846264338327950")
                    .expect("static constant");
                apply::<DivOp>(s, arg, Value::Dec(pi))
            }
        };
        result.unwrap_or(Value::Int(0))
    }

    // === based integers =================================================

    fn based(&mut self) -> Result<Value, ParseError> {
        // `#1Ah`, `#777o`, `#1010b`, `#123d`, or `#1A` in the current
        // base.
        if !self.eat('#') {
            return self.error();
        }
        let start = self.pos;
        let mut text = String::new();
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric()) {
            text.push(self.bump().expect("peeked"));
        }
        if text.is_empty() {
            return self.error();
        }
        let (digits, base) = match text.chars().last() {
            Some('h') => (&text[..text.len() - 1], 16),
            Some('o') => (&text[..text.len() - 1], 8),
            Some('b') if text.len() > 1 && text[..text.len() - 1].chars().all(|c| c == '0' || c == '1') => {
                (&text[..text.len() - 1], 2)
            }
            Some('d') => (&text[..text.len() - 1], 10),
            _ => (text.as_str(), self.settings.base as u32),
        };
        let value = match u64::from_str_radix(digits, base) {
            Ok(v) => v,
            Err(_) => {
                self.pos = start;
                return self.error();
            }
        };
        Ok(Value::Based {
            value: value & self.settings.word_mask(),
            base: base as u8,
            wordsize: self.settings.word_size,
        })
    }

    // === text and symbols ===============================================

    fn text(&mut self) -> Result<Value, ParseError> {
        self.bump();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '"' {
                let s = self.src[start..self.pos].to_owned();
                self.bump();
                return Ok(Value::Text(s));
            }
            self.bump();
        }
        // Unterminated string.
        self.pos = start;
        self.error()
    }

    fn name(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '°' || c == '%' || c == 'µ' {
                self.bump();
            } else {
                break;
            }
        }
        if self.pos == start {
            return self.error();
        }
        Ok(self.src[start..self.pos].to_owned())
    }

    /// Symbol or command fallback for bare words.
    fn word(&mut self) -> Result<Value, ParseError> {
        if self.eat('?') {
            return Ok(Value::Cmd(Id::Undefined));
        }
        if self.eat('∞') {
            return Ok(Value::Cmd(Id::Infinity));
        }
        if self.eat_str("-∞") {
            return Ok(Value::Cmd(Id::NegInfinity));
        }
        if self.eat('ⅈ') {
            return Ok(Value::Cmd(Id::ImaginaryUnit));
        }
        if self.eat('π') {
            return Ok(Value::Const {
                class: ConstClass::Constant,
                name: "π".to_owned(),
            });
        }
        if self.eat('∂') {
            return self.derivative_form(Id::Differentiate);
        }
        if self.eat('∫') {
            return self.derivative_form(Id::Integrate);
        }

        // Operator glyphs standing alone are commands.
        if let Some(c) = self.peek() {
            if let Some(id) = operator_command(c) {
                self.bump();
                return Ok(Value::Cmd(id));
            }
        }

        let word = self.name()?;
        // `GROB w h hex` and `PIXM w h hex` raster literals.
        if word.eq_ignore_ascii_case("grob") {
            return self.grob(false);
        }
        if word.eq_ignore_ascii_case("pixm") {
            return self.grob(true);
        }
        if let Some(id) = command_named(&word) {
            return Ok(Value::Cmd(id));
        }
        // Top-level assignment: `name=value`.
        if self.peek() == Some('=') {
            self.bump();
            self.skip_whitespace();
            let value = self.object()?;
            let mut tokens = vec![Value::Sym(word)];
            tokens.extend(crate::expr::tokens_of(value));
            tokens.push(Value::Cmd(Id::Equal));
            return Ok(Value::Expr(tokens));
        }
        Ok(Value::Sym(word))
    }

    /// `∂name(expr)` and `∫name(expr)`.
    fn derivative_form(&mut self, op: Id) -> Result<Value, ParseError> {
        let var = self.name()?;
        if !self.eat('(') {
            return self.error();
        }
        let body = self.expression(Precedence::Assignment as i16)?;
        if !self.eat(')') {
            return self.error();
        }
        let mut tokens = body;
        tokens.push(Value::Sym(var));
        tokens.push(Value::Cmd(op));
        Ok(Value::Expr(tokens))
    }

    fn grob(&mut self, color: bool) -> Result<Value, ParseError> {
        self.skip_whitespace();
        let width = match self.number()? {
            Value::Int(w) if w >= 0 => w as u32,
            _ => return self.error(),
        };
        self.skip_whitespace();
        let height = match self.number()? {
            Value::Int(h) if h >= 0 => h as u32,
            _ => return self.error(),
        };
        self.skip_whitespace();
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_hexdigit()) {
            self.bump();
        }
        let hex = &self.src[start..self.pos];
        let expected = crate::object::row_bytes(width, color) * height as usize;
        if hex.len() != expected * 2 {
            self.pos = start;
            return self.error();
        }
        let pixels = (0..expected)
            .map(|i| u8::from_str_radix(&hex[2 * i..2 * i + 2], 16))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ParseError { offset: start })?;
        Ok(Value::Grob {
            width,
            height,
            color,
            pixels,
        })
    }

    // === containers =====================================================

    fn list(&mut self) -> Result<Value, ParseError> {
        self.bump();
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            if self.eat('}') {
                return Ok(Value::List(items));
            }
            if self.at_end() {
                return self.error();
            }
            items.push(self.object()?);
        }
    }

    fn array(&mut self) -> Result<Value, ParseError> {
        self.bump();
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            if self.eat(']') {
                return Ok(Value::Array(items));
            }
            if self.at_end() {
                return self.error();
            }
            if self.peek() == Some('[') {
                items.push(self.array()?);
            } else {
                items.push(self.object()?);
            }
        }
    }

    fn program(&mut self, open: &str, close: &str) -> Result<Value, ParseError> {
        if !self.eat_str(open) {
            return self.error();
        }
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            if self.eat_str(close) {
                return Ok(Value::Prog(items));
            }
            if self.at_end() {
                return self.error();
            }
            items.push(self.object()?);
        }
    }

    fn tagged(&mut self) -> Result<Value, ParseError> {
        self.bump();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == ':' {
                let label = self.src[start..self.pos].to_owned();
                self.bump();
                self.skip_whitespace();
                let value = self.object()?;
                return Ok(Value::Tagged {
                    label,
                    value: Box::new(value),
                });
            }
            self.bump();
        }
        self.pos = start;
        self.error()
    }

    fn marker(&mut self, class: ConstClass) -> Result<Value, ParseError> {
        self.bump();
        let name = self.name()?;
        Ok(Value::Const { class, name })
    }

    /// `(re,im)` rectangular or `(mod∠arg)` polar complex literal.
    fn complex(&mut self) -> Result<Value, ParseError> {
        self.bump();
        self.skip_whitespace();
        let first = self.number()?;
        self.skip_whitespace();
        if self.eat('∠') {
            self.skip_whitespace();
            let arg = self.number()?;
            self.skip_whitespace();
            if !self.eat(')') {
                return self.error();
            }
            return Ok(Value::Complex {
                re: Box::new(first),
                im: Box::new(self.angle_to_pi_units(arg)),
                polar: true,
            });
        }
        if !(self.eat(',') || self.eat(';')) {
            return self.error();
        }
        self.skip_whitespace();
        let im = self.number()?;
        self.skip_whitespace();
        if !self.eat(')') {
            return self.error();
        }
        Ok(Value::Complex {
            re: Box::new(first),
            im: Box::new(im),
            polar: false,
        })
    }

    // === unit expressions ===============================================

    /// Restricted grammar after `_`: names, `*`/`·`, `/`, `^int`,
    /// parentheses.
    fn unit_expr(&mut self) -> Result<Value, ParseError> {
        let tokens = self.unit_term()?;
        let mut tokens = tokens;
        loop {
            if self.eat('*') || self.eat('·') {
                let rhs = self.unit_term()?;
                tokens.extend(rhs);
                tokens.push(Value::Cmd(Id::Mul));
            } else if self.eat('/') {
                let rhs = self.unit_term()?;
                tokens.extend(rhs);
                tokens.push(Value::Cmd(Id::Div));
            } else {
                return Ok(Value::Expr(tokens));
            }
        }
    }

    fn unit_term(&mut self) -> Result<Vec<Value>, ParseError> {
        if self.eat('(') {
            let inner = self.unit_expr()?;
            if !self.eat(')') {
                return self.error();
            }
            return Ok(crate::expr::tokens_of(inner));
        }
        let name = self.name()?;
        let mut tokens = vec![Value::Sym(name)];
        if self.eat('^') {
            let negative = self.eat('-');
            let exp = self.name()?;
            let n: i64 = exp.parse().map_err(|_| ParseError { offset: self.pos })?;
            tokens.push(Value::Int(if negative { -n } else { n }));
            tokens.push(Value::Cmd(Id::Pow));
        }
        Ok(tokens)
    }

    // === expressions ====================================================

    /// `'…'` quoted algebraic.
    fn quoted(&mut self) -> Result<Value, ParseError> {
        self.bump();
        self.skip_whitespace();
        let tokens = self.expression(Precedence::Assignment as i16)?;
        self.skip_whitespace();
        if !self.eat('\'') {
            return self.error();
        }
        // Quoting defers: even a single name becomes an expression that
        // pushes itself, while a bare name resolves.
        Ok(Value::Expr(tokens))
    }

    /// Precedence-climbing infix parser producing postfix tokens.
    /// A positive context is the minimum precedence a sub-expression
    /// must bind at.
    fn expression(&mut self, min_prec: i16) -> Result<Vec<Value>, ParseError> {
        let mut tokens = self.operand()?;
        loop {
            self.skip_whitespace();
            let Some((op, len)) = self.peek_infix() else {
                return Ok(tokens);
            };
            let prec = op.precedence() as i16;
            if prec < min_prec {
                return Ok(tokens);
            }
            self.pos += len;
            // `^` is right-associative; the rest associate left.
            let next_min = if op == Id::Pow { prec } else { prec + 1 };
            self.skip_whitespace();
            let rhs = self.expression(next_min)?;
            tokens.extend(rhs);
            tokens.push(Value::Cmd(op));
        }
    }

    fn peek_infix(&self) -> Option<(Id, usize)> {
        let c = self.peek()?;
        if let Some(id) = match c {
            '+' => Some(Id::Add),
            '-' => Some(Id::Sub),
            '*' | '×' | '·' => Some(Id::Mul),
            '/' | '÷' => Some(Id::Div),
            '^' => Some(Id::Pow),
            '=' => Some(Id::Equal),
            _ => None,
        } {
            return Some((id, c.len_utf8()));
        }
        // Word operators need a boundary after the keyword.
        for (word, id) in [
            ("mod", Id::Mod),
            ("rem", Id::Rem),
            ("and", Id::And),
            ("xor", Id::Xor),
            ("or", Id::Or),
        ] {
            if let Some(after) = self.rest().strip_prefix(word) {
                let boundary = after
                    .chars()
                    .next()
                    .map(|c| !c.is_alphanumeric() && c != '_')
                    .unwrap_or(true);
                if boundary {
                    return Some((id, word.len()));
                }
            }
        }
        None
    }

    fn operand(&mut self) -> Result<Vec<Value>, ParseError> {
        self.skip_whitespace();
        let c = match self.peek() {
            Some(c) => c,
            None => return self.error(),
        };
        match c {
            '(' => {
                self.bump();
                let inner = self.expression(Precedence::Assignment as i16)?;
                self.skip_whitespace();
                if !self.eat(')') {
                    return self.error();
                }
                Ok(inner)
            }
            '-' => {
                self.bump();
                let mut inner = self.operand()?;
                // Fold the sign into numeric literals.
                if inner.len() == 1 {
                    if let Some(lit) = inner.pop() {
                        match lit {
                            v @ (Value::Int(_)
                            | Value::Big(_)
                            | Value::Dec(_)
                            | Value::F32(_)
                            | Value::F64(_)) => return Ok(vec![negate_literal(v)]),
                            other => inner.push(other),
                        }
                    }
                }
                inner.push(Value::Cmd(Id::Neg));
                Ok(inner)
            }
            '0'..='9' | '.' => {
                let v = self.number_with_stitch()?;
                Ok(crate::expr::tokens_of(v))
            }
            '\'' => {
                // Nested quotes flatten.
                let v = self.quoted()?;
                Ok(crate::expr::tokens_of(v))
            }
            'π' => {
                self.bump();
                Ok(vec![Value::Const {
                    class: ConstClass::Constant,
                    name: "π".to_owned(),
                }])
            }
            'ⅈ' => {
                self.bump();
                Ok(vec![Value::Cmd(Id::ImaginaryUnit)])
            }
            '∞' => {
                self.bump();
                Ok(vec![Value::Cmd(Id::Infinity)])
            }
            '√' => {
                self.bump();
                let inner = self.operand()?;
                let mut tokens = inner;
                tokens.push(Value::Cmd(Id::Sqrt));
                Ok(tokens)
            }
            'Ⓒ' | 'Ⓔ' | 'Ⓛ' => {
                let class = match c {
                    'Ⓔ' => ConstClass::Equation,
                    'Ⓛ' => ConstClass::Library,
                    _ => ConstClass::Constant,
                };
                let v = self.marker(class)?;
                Ok(vec![v])
            }
            _ => {
                let word = self.name()?;
                self.skip_whitespace();
                // Function application: `name(a;b)` or whitespace-free
                // `name(`.
                if self.peek() == Some('(') {
                    self.bump();
                    let mut args = Vec::new();
                    loop {
                        let arg = self.expression(Precedence::Assignment as i16)?;
                        args.push(arg);
                        self.skip_whitespace();
                        if self.eat(';') || self.eat(',') {
                            continue;
                        }
                        if self.eat(')') {
                            break;
                        }
                        return self.error();
                    }
                    let argc = args.len() as u32;
                    let mut tokens = Vec::new();
                    for arg in args {
                        tokens.extend(arg);
                    }
                    if argc == 1 {
                        if let Some(id) = crate::cmd::builtin_function(&word) {
                            tokens.push(Value::Cmd(id));
                            return Ok(tokens);
                        }
                    }
                    tokens.push(Value::Call { name: word, argc });
                    return Ok(tokens);
                }
                Ok(vec![Value::Sym(word)])
            }
        }
    }

}

fn negate_literal(v: Value) -> Value {
    match v {
        Value::Int(i) => Value::Int(-i),
        Value::Big(b) => Value::Big(-b).canonical(),
        Value::Dec(d) => Value::Dec(-d),
        Value::F32(f) => Value::F32(-f),
        Value::F64(f) => Value::F64(-f),
        other => other,
    }
}

/// Single-character operator commands at the top level.
fn operator_command(c: char) -> Option<Id> {
    match c {
        '+' => Some(Id::Add),
        '-' => Some(Id::Sub),
        '*' | '×' | '·' => Some(Id::Mul),
        '/' | '÷' => Some(Id::Div),
        '^' => Some(Id::Pow),
        '√' => Some(Id::Sqrt),
        '=' => Some(Id::Equal),
        _ => None,
    }
}

/// Case-insensitive command lookup over the id manifest.
pub fn command_named(word: &str) -> Option<Id> {
    Id::iter().find(|id| {
        let name = id.name();
        !name.is_empty() && name.eq_ignore_ascii_case(word)
    })
}
