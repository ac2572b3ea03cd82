//! The symbolic expression engine.
//!
//! Expressions are postfix token lists, so the evaluator walks them
//! like programs and construction is concatenation. Symbolic rewrites
//! (∂/∂x and ∫dx) convert the postfix body to a small tree, apply the
//! per-operator rule, and rebuild through the arithmetic layer so the
//! auto-simplification table runs on every combination.

use rpl_types::{Arity, ErrorKind, Id};

use crate::arith::{self, AddOp, DivOp, MulOp, PowOp, SubOp};
use crate::error::SimpleResult;
use crate::object::Value;
use crate::settings::Settings;

/// Postfix tokens of a value: expressions flatten, everything else is a
/// single operand.
pub fn tokens_of(value: Value) -> Vec<Value> {
    match value {
        Value::Expr(tokens) => tokens,
        other => vec![other],
    }
}

/// Build `x op y` as an expression, flattening operand expressions.
pub fn binary(op: Id, x: Value, y: Value) -> Value {
    let mut tokens = tokens_of(x);
    tokens.extend(tokens_of(y));
    tokens.push(Value::Cmd(op));
    Value::Expr(tokens)
}

/// Build `op x` as an expression.
pub fn unary(op: Id, x: Value) -> Value {
    let mut tokens = tokens_of(x);
    tokens.push(Value::Cmd(op));
    Value::Expr(tokens)
}

/// Build an application of `op` to any number of operand expressions.
pub fn make(op: Id, args: Vec<Value>) -> Value {
    let mut tokens = Vec::new();
    for arg in args {
        tokens.extend(tokens_of(arg));
    }
    tokens.push(Value::Cmd(op));
    Value::Expr(tokens)
}

/// Wrap a single operand as an expression when it is not one already.
pub fn quote(value: Value) -> Value {
    match value {
        expr @ Value::Expr(_) => expr,
        other => Value::Expr(vec![other]),
    }
}

// === tree view ==========================================================

/// Structured view of a postfix body, used by the rewrite rules.
#[derive(Debug, Clone)]
enum Node {
    Leaf(Value),
    Unary(Id, Box<Node>),
    Binary(Id, Box<Node>, Box<Node>),
    Call(String, Vec<Node>),
}

fn to_tree(tokens: &[Value]) -> SimpleResult<Node> {
    let mut stack: Vec<Node> = Vec::new();
    for token in tokens {
        match token {
            Value::Cmd(id) if id.is_command() => match id.arity() {
                Arity::Fixed(1) => {
                    let x = stack.pop().ok_or(ErrorKind::Internal)?;
                    stack.push(Node::Unary(*id, Box::new(x)));
                }
                Arity::Fixed(2) => {
                    let y = stack.pop().ok_or(ErrorKind::Internal)?;
                    let x = stack.pop().ok_or(ErrorKind::Internal)?;
                    stack.push(Node::Binary(*id, Box::new(x), Box::new(y)));
                }
                _ => return Err(ErrorKind::Type),
            },
            Value::Call { name, argc } => {
                let n = *argc as usize;
                if stack.len() < n {
                    return Err(ErrorKind::Internal);
                }
                let args = stack.split_off(stack.len() - n);
                stack.push(Node::Call(name.clone(), args));
            }
            other => stack.push(Node::Leaf(other.clone())),
        }
    }
    if stack.len() == 1 {
        Ok(stack.pop().expect("checked length"))
    } else {
        Err(ErrorKind::Internal)
    }
}

fn from_tree(s: &Settings, node: &Node) -> SimpleResult<Value> {
    match node {
        Node::Leaf(v) => Ok(v.clone()),
        Node::Unary(id, x) => {
            let x = from_tree(s, x)?;
            crate::functions::apply_unary(s, *id, x)
        }
        Node::Binary(id, x, y) => {
            let x = from_tree(s, x)?;
            let y = from_tree(s, y)?;
            combine(s, *id, x, y)
        }
        Node::Call(name, args) => {
            let mut tokens = Vec::new();
            for arg in args {
                tokens.extend(tokens_of(from_tree(s, arg)?));
            }
            tokens.push(Value::Call {
                name: name.clone(),
                argc: args.len() as u32,
            });
            Ok(Value::Expr(tokens))
        }
    }
}

fn combine(s: &Settings, op: Id, x: Value, y: Value) -> SimpleResult<Value> {
    match op {
        Id::Add => arith::apply::<AddOp>(s, x, y),
        Id::Sub => arith::apply::<SubOp>(s, x, y),
        Id::Mul => arith::apply::<MulOp>(s, x, y),
        Id::Div => arith::apply::<DivOp>(s, x, y),
        Id::Pow => arith::apply::<PowOp>(s, x, y),
        _ => Ok(binary(op, x, y)),
    }
}

fn depends_on(node: &Node, var: &str) -> bool {
    match node {
        Node::Leaf(Value::Sym(name)) => name == var,
        Node::Leaf(Value::Expr(tokens)) => tokens
            .iter()
            .any(|t| matches!(t, Value::Sym(name) if name == var)),
        Node::Leaf(_) => false,
        Node::Unary(_, x) => depends_on(x, var),
        Node::Binary(_, x, y) => depends_on(x, var) || depends_on(y, var),
        Node::Call(_, args) => args.iter().any(|a| depends_on(a, var)),
    }
}

// === symbolic differentiation ===========================================

/// `∂ expr / ∂ var`, rebuilt through the arithmetic layer.
pub fn differentiate(s: &Settings, tokens: &[Value], var: &str) -> SimpleResult<Value> {
    let tree = to_tree(tokens)?;
    derive(s, &tree, var)
}

fn derive(s: &Settings, node: &Node, var: &str) -> SimpleResult<Value> {
    match node {
        Node::Leaf(Value::Sym(name)) if name == var => Ok(Value::Int(1)),
        Node::Leaf(_) => Ok(Value::Int(0)),
        Node::Unary(id, u) => {
            let du = derive(s, u, var)?;
            let uv = from_tree(s, u)?;
            let outer = match id {
                Id::Neg => combine(s, Id::Mul, Value::Int(-1), du)?,
                Id::Inv => {
                    // -u'/u²
                    let u2 = combine(s, Id::Pow, uv, Value::Int(2))?;
                    let q = combine(s, Id::Div, du, u2)?;
                    combine(s, Id::Mul, Value::Int(-1), q)?
                }
                Id::Sq => {
                    let two_u = combine(s, Id::Mul, Value::Int(2), uv)?;
                    combine(s, Id::Mul, two_u, du)?
                }
                Id::Sqrt => {
                    let root = unary(Id::Sqrt, uv);
                    let denom = combine(s, Id::Mul, Value::Int(2), root)?;
                    combine(s, Id::Div, du, denom)?
                }
                Id::Exp => combine(s, Id::Mul, unary(Id::Exp, uv), du)?,
                Id::Ln => combine(s, Id::Div, du, uv)?,
                Id::Sin => combine(s, Id::Mul, unary(Id::Cos, uv), du)?,
                Id::Cos => {
                    let sin = unary(Id::Sin, uv);
                    let neg = combine(s, Id::Mul, Value::Int(-1), sin)?;
                    combine(s, Id::Mul, neg, du)?
                }
                Id::Tan => {
                    // u'/cos²u
                    let cos2 = combine(s, Id::Pow, unary(Id::Cos, uv), Value::Int(2))?;
                    combine(s, Id::Div, du, cos2)?
                }
                _ => return Err(ErrorKind::Value),
            };
            Ok(outer)
        }
        Node::Binary(id, u, v) => {
            let du = derive(s, u, var)?;
            let dv = derive(s, v, var)?;
            let uv = from_tree(s, u)?;
            let vv = from_tree(s, v)?;
            match id {
                Id::Add => combine(s, Id::Add, du, dv),
                Id::Sub => combine(s, Id::Sub, du, dv),
                Id::Mul => {
                    let a = combine(s, Id::Mul, du, vv)?;
                    let b = combine(s, Id::Mul, uv, dv)?;
                    combine(s, Id::Add, a, b)
                }
                Id::Div => {
                    let a = combine(s, Id::Mul, du, vv.clone())?;
                    let b = combine(s, Id::Mul, uv, dv)?;
                    let num = combine(s, Id::Sub, a, b)?;
                    let den = combine(s, Id::Pow, vv, Value::Int(2))?;
                    combine(s, Id::Div, num, den)
                }
                Id::Pow if !depends_on(v, var) => {
                    // n·u^(n-1)·u'
                    let n_less = combine(s, Id::Sub, vv.clone(), Value::Int(1))?;
                    let powered = combine(s, Id::Pow, uv, n_less)?;
                    let scaled = combine(s, Id::Mul, vv, powered)?;
                    combine(s, Id::Mul, scaled, du)
                }
                Id::Pow => {
                    // u^v·(v'·ln u + v·u'/u)
                    let ln_u = unary(Id::Ln, uv.clone());
                    let a = combine(s, Id::Mul, dv, ln_u)?;
                    let b = combine(s, Id::Div, combine(s, Id::Mul, vv, du)?, uv.clone())?;
                    let inner = combine(s, Id::Add, a, b)?;
                    let whole = from_tree(s, node)?;
                    combine(s, Id::Mul, whole, inner)
                }
                _ => Err(ErrorKind::Value),
            }
        }
        Node::Call(..) => Err(ErrorKind::Value),
    }
}

// === symbolic integration ===============================================

/// `∫ expr d var` for the closed-form patterns the engine knows; a
/// value error otherwise.
pub fn integrate(s: &Settings, tokens: &[Value], var: &str) -> SimpleResult<Value> {
    let tree = to_tree(tokens)?;
    primitive(s, &tree, var)
}

fn primitive(s: &Settings, node: &Node, var: &str) -> SimpleResult<Value> {
    let x = Value::Sym(var.to_owned());
    if !depends_on(node, var) {
        // ∫ c dx = c·x
        let c = from_tree(s, node)?;
        return combine(s, Id::Mul, c, x);
    }
    match node {
        Node::Leaf(Value::Sym(name)) if name == var => {
            // x²/2
            let sq = combine(s, Id::Pow, x, Value::Int(2))?;
            combine(s, Id::Div, sq, Value::Int(2))
        }
        Node::Unary(id, u) => {
            let Node::Leaf(Value::Sym(inner)) = &**u else {
                return Err(ErrorKind::Value);
            };
            if inner != var {
                return Err(ErrorKind::Value);
            }
            match id {
                Id::Sin => {
                    let cos = unary(Id::Cos, x);
                    combine(s, Id::Mul, Value::Int(-1), cos)
                }
                Id::Cos => Ok(unary(Id::Sin, x)),
                Id::Exp => Ok(unary(Id::Exp, x)),
                Id::Inv => Ok(unary(Id::Ln, x)),
                Id::Sqrt => {
                    // (2/3)·x^(3/2)
                    let p = combine(
                        s,
                        Id::Pow,
                        x,
                        crate::object::Value::Frac(crate::object::Fraction::new(
                            3.into(),
                            2.into(),
                        )?),
                    )?;
                    combine(
                        s,
                        Id::Mul,
                        Value::Frac(crate::object::Fraction::new(2.into(), 3.into())?),
                        p,
                    )
                }
                _ => Err(ErrorKind::Value),
            }
        }
        Node::Binary(Id::Add, u, v) => {
            let a = primitive(s, u, var)?;
            let b = primitive(s, v, var)?;
            combine(s, Id::Add, a, b)
        }
        Node::Binary(Id::Sub, u, v) => {
            let a = primitive(s, u, var)?;
            let b = primitive(s, v, var)?;
            combine(s, Id::Sub, a, b)
        }
        Node::Binary(Id::Mul, u, v) if !depends_on(u, var) => {
            let c = from_tree(s, u)?;
            let f = primitive(s, v, var)?;
            combine(s, Id::Mul, c, f)
        }
        Node::Binary(Id::Mul, u, v) if !depends_on(v, var) => {
            let c = from_tree(s, v)?;
            let f = primitive(s, u, var)?;
            combine(s, Id::Mul, c, f)
        }
        Node::Binary(Id::Div, u, v) if !depends_on(v, var) => {
            let c = from_tree(s, v)?;
            let f = primitive(s, u, var)?;
            combine(s, Id::Div, f, c)
        }
        Node::Binary(Id::Pow, u, v)
            if matches!(&**u, Node::Leaf(Value::Sym(name)) if name == var)
                && !depends_on(v, var) =>
        {
            // xⁿ → xⁿ⁺¹/(n+1), except n = -1 → ln x
            let n = from_tree(s, v)?;
            if n == Value::Int(-1) {
                return Ok(unary(Id::Ln, x));
            }
            let n1 = combine(s, Id::Add, n, Value::Int(1))?;
            let p = combine(s, Id::Pow, x, n1.clone())?;
            combine(s, Id::Div, p, n1)
        }
        _ => Err(ErrorKind::Value),
    }
}
