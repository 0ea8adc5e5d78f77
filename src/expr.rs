//! Expression parsing and positional evaluation
//!
//! This module provides the expression machinery the model and parameter
//! layers are built on: a nom-based parser producing a small AST, a fixed
//! vocabulary of reserved function names, and [`ParsedFunction`], which binds
//! an expression to an ordered list of variable names and evaluates it against
//! a values vector in the same order.

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, multispace0, one_of},
    combinator::recognize,
    multi::many0,
    number::complete::double,
    sequence::{pair, preceded},
    IResult, Parser,
};
use thiserror::Error;

/// Single-character placeholder tokens, one per supported independent
/// variable. These substitute for user variable names in canonical expression
/// text so the names can never collide with parameters or reserved functions.
pub const DUMMY_VARS: [&str; 5] = ["'", "@", "`", "~", "#"];

/// Reserved function names understood by the evaluator. Parameter and
/// variable names may shadow these as plain identifiers; the names only act
/// as functions when followed by an argument list.
pub const FUNCTION_NAMES: [&str; 24] = [
    "sin", "cos", "tan", "asin", "acos", "atan", "sinh", "cosh", "tanh", "exp", "ln", "log",
    "log10", "sqrt", "abs", "sign", "step", "ceil", "floor", "round", "min", "max", "atan2", "mod",
];

/// Error that can occur during expression parsing
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("Failed to parse expression: {message}")]
    ParseError { message: String },

    #[error("Unknown identifier: {name}")]
    UnknownIdentifier { name: String },

    #[error("Undefined function: {name}")]
    UndefinedFunction { name: String },

    #[error("{name}() takes {expected} argument(s), got {got}")]
    WrongArity {
        name: String,
        expected: usize,
        got: usize,
    },
}

/// Result type for expression parsing
type ExprResult<T> = Result<T, ExpressionError>;

/// Expression AST node
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Constant number
    Number(f64),

    /// Variable reference
    Variable(String),

    /// Unary operations
    Unary(UnaryOp, Box<Expression>),

    /// Binary operations
    Binary(BinaryOp, Box<Expression>, Box<Expression>),

    /// Function call
    Function(String, Vec<Expression>),
}

/// Unary operations
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    /// Negation (-)
    Neg,
}

/// Binary operations
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOp {
    /// Addition (+)
    Add,

    /// Subtraction (-)
    Sub,

    /// Multiplication (*)
    Mul,

    /// Division (/)
    Div,

    /// Power (^)
    Pow,
}

impl Expression {
    /// Parse an expression from a string.
    ///
    /// Syntax errors are reported here; identifier resolution happens when the
    /// expression is bound to a name list (see [`ParsedFunction::parse`]).
    pub fn parse(input: &str) -> ExprResult<Self> {
        match expr_parser(input.trim()) {
            Ok((remainder, expr)) => {
                if remainder.trim().is_empty() {
                    Ok(expr)
                } else {
                    Err(ExpressionError::ParseError {
                        message: format!("Unexpected trailing characters: '{}'", remainder),
                    })
                }
            }
            Err(e) => Err(ExpressionError::ParseError {
                message: format!("{:?}", e),
            }),
        }
    }

    /// Evaluate against ordered (name, value) bindings.
    ///
    /// Arithmetic is IEEE: division by zero and domain errors produce
    /// inf/NaN rather than failing, so non-finite results propagate to the
    /// caller's evaluation flag. Assumes [`validate`](Self::validate) passed;
    /// an unbound variable evaluates to NaN.
    pub fn evaluate(&self, names: &[String], values: &[f64]) -> f64 {
        match self {
            Self::Number(n) => *n,

            Self::Variable(name) => names
                .iter()
                .position(|n| n == name)
                .and_then(|i| values.get(i).copied())
                .unwrap_or(f64::NAN),

            Self::Unary(op, expr) => {
                let value = expr.evaluate(names, values);
                match op {
                    UnaryOp::Neg => -value,
                }
            }

            Self::Binary(op, left, right) => {
                let lhs = left.evaluate(names, values);
                let rhs = right.evaluate(names, values);
                match op {
                    BinaryOp::Add => lhs + rhs,
                    BinaryOp::Sub => lhs - rhs,
                    BinaryOp::Mul => lhs * rhs,
                    BinaryOp::Div => lhs / rhs,
                    BinaryOp::Pow => lhs.powf(rhs),
                }
            }

            Self::Function(name, args) => {
                let a: Vec<f64> = args.iter().map(|e| e.evaluate(names, values)).collect();
                apply_function(name, &a)
            }
        }
    }

    /// Check every identifier against the reserved-function vocabulary and the
    /// supplied variable names.
    ///
    /// Function calls must name a reserved function with an acceptable
    /// argument count; bare identifiers must appear in `names`. This mirrors
    /// parse-time unknown-identifier rejection, so binding a malformed or
    /// dangling expression fails up front instead of at evaluation.
    pub fn validate(&self, names: &[String]) -> ExprResult<()> {
        match self {
            Self::Number(_) => Ok(()),

            Self::Variable(name) => {
                if names.iter().any(|n| n == name) {
                    Ok(())
                } else {
                    Err(ExpressionError::UnknownIdentifier { name: name.clone() })
                }
            }

            Self::Unary(_, expr) => expr.validate(names),

            Self::Binary(_, left, right) => {
                left.validate(names)?;
                right.validate(names)
            }

            Self::Function(name, args) => {
                let arity = function_arity(name).ok_or_else(|| {
                    ExpressionError::UndefinedFunction { name: name.clone() }
                })?;
                match arity {
                    Arity::Exact(n) if args.len() != n => {
                        return Err(ExpressionError::WrongArity {
                            name: name.clone(),
                            expected: n,
                            got: args.len(),
                        })
                    }
                    Arity::AtLeast(n) if args.len() < n => {
                        return Err(ExpressionError::WrongArity {
                            name: name.clone(),
                            expected: n,
                            got: args.len(),
                        })
                    }
                    _ => {}
                }
                for arg in args {
                    arg.validate(names)?;
                }
                Ok(())
            }
        }
    }

    /// Find all variable names used in the expression
    pub fn variables(&self) -> Vec<String> {
        let mut vars = Vec::new();
        self.collect_variables(&mut vars);
        vars.sort();
        vars.dedup();
        vars
    }

    /// Recursively collect all variable names used in the expression
    fn collect_variables(&self, vars: &mut Vec<String>) {
        match self {
            Self::Number(_) => {}

            Self::Variable(name) => {
                vars.push(name.clone());
            }

            Self::Unary(_, expr) => {
                expr.collect_variables(vars);
            }

            Self::Binary(_, left, right) => {
                left.collect_variables(vars);
                right.collect_variables(vars);
            }

            Self::Function(_, args) => {
                for arg in args {
                    arg.collect_variables(vars);
                }
            }
        }
    }
}

/// Argument-count contract of a reserved function
enum Arity {
    Exact(usize),
    AtLeast(usize),
}

fn function_arity(name: &str) -> Option<Arity> {
    match name {
        "sin" | "cos" | "tan" | "asin" | "acos" | "atan" | "sinh" | "cosh" | "tanh" | "exp"
        | "ln" | "log" | "log10" | "sqrt" | "abs" | "sign" | "step" | "ceil" | "floor"
        | "round" => Some(Arity::Exact(1)),
        "atan2" | "mod" => Some(Arity::Exact(2)),
        "min" | "max" => Some(Arity::AtLeast(2)),
        _ => None,
    }
}

fn apply_function(name: &str, args: &[f64]) -> f64 {
    match name {
        "sin" => args[0].sin(),
        "cos" => args[0].cos(),
        "tan" => args[0].tan(),
        "asin" => args[0].asin(),
        "acos" => args[0].acos(),
        "atan" => args[0].atan(),
        "sinh" => args[0].sinh(),
        "cosh" => args[0].cosh(),
        "tanh" => args[0].tanh(),
        "exp" => args[0].exp(),
        "ln" | "log" => args[0].ln(),
        "log10" => args[0].log10(),
        "sqrt" => args[0].sqrt(),
        "abs" => args[0].abs(),
        "sign" => {
            if args[0] > 0.0 {
                1.0
            } else if args[0] < 0.0 {
                -1.0
            } else {
                0.0
            }
        }
        "step" => {
            if args[0] < 0.0 {
                0.0
            } else {
                1.0
            }
        }
        "ceil" => args[0].ceil(),
        "floor" => args[0].floor(),
        "round" => args[0].round(),
        "min" => args.iter().fold(f64::INFINITY, |a, &b| a.min(b)),
        "max" => args.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b)),
        "atan2" => args[0].atan2(args[1]),
        "mod" => args[0] % args[1],
        _ => f64::NAN,
    }
}

/// Replaces `old_name` with `new_name` throughout `expression`, guarding
/// against collisions with sibling names that contain `old_name` as a
/// substring. Colliding siblings are placeholder-ized with unused dummy
/// tokens before the rename and restored afterward. Returns `None` when the
/// dummy supply runs out.
pub(crate) fn replace_name(
    expression: &str,
    old_name: &str,
    new_name: &str,
    siblings: &[String],
) -> Option<String> {
    let mut replacements: std::collections::BTreeMap<String, String> =
        std::collections::BTreeMap::new();
    let mut expr = replace_in(
        expression.to_string(),
        old_name,
        new_name,
        &mut replacements,
        siblings,
    )?;
    // restore placeholder-ized sibling names
    for (key, original) in &replacements {
        if key == new_name {
            continue;
        }
        expr = expr.replace(key.as_str(), original);
    }
    Some(expr)
}

fn replace_in(
    mut expression: String,
    old_name: &str,
    new_name: &str,
    replacements: &mut std::collections::BTreeMap<String, String>,
    siblings: &[String],
) -> Option<String> {
    if replacements.values().any(|v| v == old_name) {
        return Some(expression);
    }
    for next in siblings {
        if next == old_name || next == new_name {
            continue;
        }
        if next.contains(old_name) {
            // move the colliding sibling out of the way first
            let mut k = 0;
            for (j, d) in DUMMY_VARS.iter().enumerate() {
                if *d == new_name {
                    k = j + 1;
                    break;
                }
            }
            if k >= DUMMY_VARS.len() {
                return None;
            }
            expression = replace_in(expression, next, DUMMY_VARS[k], replacements, siblings)?;
        }
    }
    let expression = expression.replace(old_name, new_name);
    replacements.insert(new_name.to_string(), old_name.to_string());
    Some(expression)
}

/// An expression bound to an ordered list of variable names.
///
/// The counterpart of a compiled multi-variable function: `evaluate` takes a
/// values vector positionally matching the name list given at parse time.
#[derive(Debug, Clone)]
pub struct ParsedFunction {
    ast: Expression,
    names: Vec<String>,
}

impl ParsedFunction {
    /// Parse `text` and bind it to `names`.
    ///
    /// Fails on syntax errors, unknown identifiers (anything that is neither
    /// a bound name nor a reserved function call) and wrong function arity.
    pub fn parse(text: &str, names: &[String]) -> ExprResult<Self> {
        let ast = Expression::parse(text)?;
        ast.validate(names)?;
        Ok(Self {
            ast,
            names: names.to_vec(),
        })
    }

    /// Evaluate against a values vector ordered like the bound name list.
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.ast.evaluate(&self.names, values)
    }

    /// The bound variable names, in positional order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Names actually referenced by the expression.
    pub fn referenced(&self) -> Vec<String> {
        self.ast.variables()
    }
}

// Parser functions using nom

/// Parse an identifier: a normal name, or one of the single-character
/// placeholder tokens (which canonical expression text uses as variables).
fn identifier(input: &str) -> IResult<&str, String> {
    let named = recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ));
    let placeholder = recognize(one_of("'@`~#"));

    let mut parser = alt((named, placeholder));
    let (input, matched) = parser.parse(input)?;
    Ok((input, matched.to_string()))
}

/// Parse a comma-separated list of expressions (for function arguments)
fn args_list(input: &str) -> IResult<&str, Vec<Expression>> {
    let (input, first) = expr_parser(input)?;
    let mut res = vec![first];

    let mut remainder = input;
    loop {
        let mut comma_parser = preceded(
            multispace0::<&str, nom::error::Error<&str>>,
            char::<&str, nom::error::Error<&str>>(','),
        );
        match comma_parser.parse(remainder) {
            Ok((after_comma, _)) => match expr_parser(after_comma) {
                Ok((after_expr, expr)) => {
                    res.push(expr);
                    remainder = after_expr;
                }
                Err(_) => break,
            },
            Err(_) => break,
        }
    }

    Ok((remainder, res))
}

/// Parse a function call
fn function_call(input: &str) -> IResult<&str, Expression> {
    let (input, name) = identifier(input)?;
    let (input, _) = multispace0::<&str, nom::error::Error<&str>>.parse(input)?;
    let (input, _) = char::<&str, nom::error::Error<&str>>('(').parse(input)?;
    let (input, _) = multispace0::<&str, nom::error::Error<&str>>.parse(input)?;

    // Empty argument list
    if let Ok((input, _)) = char::<&str, nom::error::Error<&str>>(')').parse(input) {
        return Ok((input, Expression::Function(name, vec![])));
    }

    let (input, args) = args_list(input)?;
    let (input, _) = multispace0::<&str, nom::error::Error<&str>>.parse(input)?;
    let (input, _) = char::<&str, nom::error::Error<&str>>(')').parse(input)?;

    Ok((input, Expression::Function(name, args)))
}

/// Parse a number
fn number(input: &str) -> IResult<&str, Expression> {
    let (input, num) = double(input)?;
    Ok((input, Expression::Number(num)))
}

/// Parse a variable reference
fn variable(input: &str) -> IResult<&str, Expression> {
    let (input, var_name) = identifier(input)?;
    Ok((input, Expression::Variable(var_name)))
}

/// Parse a parenthesized expression
fn parens(input: &str) -> IResult<&str, Expression> {
    let (input, _) = char::<&str, nom::error::Error<&str>>('(').parse(input)?;
    let (input, _) = multispace0::<&str, nom::error::Error<&str>>.parse(input)?;
    let (input, expr) = expr_parser(input)?;
    let (input, _) = multispace0::<&str, nom::error::Error<&str>>.parse(input)?;
    let (input, _) = char::<&str, nom::error::Error<&str>>(')').parse(input)?;
    Ok((input, expr))
}

/// Parse a primary expression (function call, variable, number, or
/// parenthesized expression). Function calls are tried before bare variables
/// so an identifier followed by `(` binds as a call; identifiers are tried
/// before numbers because the number parser would lex the leading `inf` of a
/// name like `info` as a float.
fn primary(input: &str) -> IResult<&str, Expression> {
    if let Ok(result) = function_call(input) {
        return Ok(result);
    }
    if let Ok(result) = variable(input) {
        return Ok(result);
    }
    if let Ok(result) = number(input) {
        return Ok(result);
    }
    parens(input)
}

/// Parse a unary expression (-expr)
fn unary(input: &str) -> IResult<&str, Expression> {
    let (input, _) = multispace0::<&str, nom::error::Error<&str>>.parse(input)?;

    let mut neg_parser = preceded(char('-'), primary);
    match neg_parser.parse(input) {
        Ok((remaining, expr)) => Ok((remaining, Expression::Unary(UnaryOp::Neg, Box::new(expr)))),
        Err(_) => primary(input),
    }
}

/// Parse a power expression; `^` is right-associative.
fn power(input: &str) -> IResult<&str, Expression> {
    let (input, left) = unary(input)?;
    let (after_space, _) = multispace0::<&str, nom::error::Error<&str>>.parse(input)?;

    match char::<&str, nom::error::Error<&str>>('^').parse(after_space) {
        Ok((after_op, _)) => {
            let (after_right, right) = power(after_op)?;
            Ok((
                after_right,
                Expression::Binary(BinaryOp::Pow, Box::new(left), Box::new(right)),
            ))
        }
        Err(_) => Ok((input, left)),
    }
}

/// Parse a multiplicative expression; `*` and `/` fold left-associatively.
fn term(input: &str) -> IResult<&str, Expression> {
    let (mut input, mut acc) = power(input)?;

    loop {
        let (after_space, _) = multispace0::<&str, nom::error::Error<&str>>.parse(input)?;
        let op = match one_of::<&str, &str, nom::error::Error<&str>>("*/").parse(after_space) {
            Ok((after_op, c)) => Some((after_op, c)),
            Err(_) => None,
        };
        match op {
            Some((after_op, c)) => {
                let (rest, rhs) = power(after_op)?;
                let bin_op = if c == '*' { BinaryOp::Mul } else { BinaryOp::Div };
                acc = Expression::Binary(bin_op, Box::new(acc), Box::new(rhs));
                input = rest;
            }
            None => return Ok((input, acc)),
        }
    }
}

/// Parse an additive expression; `+` and `-` fold left-associatively.
fn expr_parser(input: &str) -> IResult<&str, Expression> {
    let (input, _) = multispace0::<&str, nom::error::Error<&str>>.parse(input)?;
    let (mut input, mut acc) = term(input)?;

    loop {
        let (after_space, _) = multispace0::<&str, nom::error::Error<&str>>.parse(input)?;
        let op = match one_of::<&str, &str, nom::error::Error<&str>>("+-").parse(after_space) {
            Ok((after_op, c)) => Some((after_op, c)),
            Err(_) => None,
        };
        match op {
            Some((after_op, c)) => {
                let (rest, rhs) = term(after_op)?;
                let bin_op = if c == '+' { BinaryOp::Add } else { BinaryOp::Sub };
                acc = Expression::Binary(bin_op, Box::new(acc), Box::new(rhs));
                input = rest;
            }
            None => return Ok((input, acc)),
        }
    }
}
