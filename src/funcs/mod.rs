//! The template function library.
//!
//! A [`Registry`] maps function names to native implementations and is
//! bound into every evaluation. It is constructed once at process start
//! and passed explicitly into [`Engine::new`](crate::template::Engine::new);
//! there is no global mutable state.
//!
//! Functions receive already-resolved argument values and return one
//! value. Arity or argument-type mismatch is an [`Error::Execution`].

use crate::value::{Number, Value};
use crate::{Error, Result};
use std::collections::HashMap;

/// A native template function over resolved values.
pub type NativeFn = fn(&[Value]) -> Result<Value>;

/// An immutable registry of named template functions.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: HashMap<&'static str, NativeFn>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry populated with the built-in function library.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut reg = Self::new();

        // Integer step functions.
        reg.register("inc", fn_inc);
        reg.register("dec", fn_dec);

        // Floating-point arithmetic, IEEE-754 semantics throughout.
        reg.register("add", fn_add);
        reg.register("sub", fn_sub);
        reg.register("div", fn_div);
        reg.register("mul", fn_mul);
        reg.register("mod", fn_mod);

        reg.register("sin", fn_sin);
        reg.register("cos", fn_cos);
        reg.register("tan", fn_tan);

        reg.register("abs", fn_abs);
        reg.register("floor", fn_floor);
        reg.register("ceil", fn_ceil);

        // String utilities.
        reg.register("join", fn_join);
        reg.register("trim", fn_trim);
        reg.register("trim_prefix", fn_trim_prefix);
        reg.register("trim_suffix", fn_trim_suffix);
        reg.register("has_prefix", fn_has_prefix);
        reg.register("has_suffix", fn_has_suffix);
        reg.register("upper", fn_upper);
        reg.register("lower", fn_lower);
        reg.register("title", fn_title);

        // Logic, comparison, and collection helpers.
        reg.register("and", fn_and);
        reg.register("or", fn_or);
        reg.register("not", fn_not);
        reg.register("eq", fn_eq);
        reg.register("ne", fn_ne);
        reg.register("lt", fn_lt);
        reg.register("le", fn_le);
        reg.register("gt", fn_gt);
        reg.register("ge", fn_ge);
        reg.register("len", fn_len);
        reg.register("index", fn_index);

        reg
    }

    /// Registers a function under a name, replacing any previous entry.
    pub fn register(&mut self, name: &'static str, func: NativeFn) {
        self.entries.insert(name, func);
    }

    /// Looks up a function by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<NativeFn> {
        self.entries.get(name).copied()
    }

    /// Returns whether the registry knows the name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}

// ============================================================================
// Argument helpers
// ============================================================================

fn expect_arity(name: &str, args: &[Value], n: usize) -> Result<()> {
    if args.len() == n {
        Ok(())
    } else {
        Err(Error::Execution(format!(
            "{name}: expected {n} argument(s), got {}",
            args.len()
        )))
    }
}

/// Integer parameters accept `i64` values and integral floats; nothing
/// else is coerced.
fn int_arg(name: &str, args: &[Value], idx: usize) -> Result<i64> {
    match &args[idx] {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| type_error(name, idx, "an integer", &args[idx])),
        other => Err(type_error(name, idx, "an integer", other)),
    }
}

fn float_arg(name: &str, args: &[Value], idx: usize) -> Result<f64> {
    match &args[idx] {
        Value::Number(n) => Ok(n.as_f64()),
        other => Err(type_error(name, idx, "a number", other)),
    }
}

fn str_arg<'a>(name: &str, args: &'a [Value], idx: usize) -> Result<&'a str> {
    args[idx]
        .as_str()
        .ok_or_else(|| type_error(name, idx, "a string", &args[idx]))
}

fn type_error(name: &str, idx: usize, want: &str, got: &Value) -> Error {
    Error::Execution(format!(
        "{name}: argument {} must be {want}, got {}",
        idx + 1,
        got.type_name()
    ))
}

// ============================================================================
// Builtins
// ============================================================================

fn fn_inc(args: &[Value]) -> Result<Value> {
    expect_arity("inc", args, 1)?;
    Ok(Value::from(int_arg("inc", args, 0)?.wrapping_add(1)))
}

fn fn_dec(args: &[Value]) -> Result<Value> {
    expect_arity("dec", args, 1)?;
    Ok(Value::from(int_arg("dec", args, 0)?.wrapping_sub(1)))
}

fn fn_add(args: &[Value]) -> Result<Value> {
    expect_arity("add", args, 2)?;
    Ok(Value::from(float_arg("add", args, 0)? + float_arg("add", args, 1)?))
}

fn fn_sub(args: &[Value]) -> Result<Value> {
    expect_arity("sub", args, 2)?;
    Ok(Value::from(float_arg("sub", args, 0)? - float_arg("sub", args, 1)?))
}

fn fn_div(args: &[Value]) -> Result<Value> {
    expect_arity("div", args, 2)?;
    // Division by zero follows IEEE-754: ±infinity or NaN.
    Ok(Value::from(float_arg("div", args, 0)? / float_arg("div", args, 1)?))
}

fn fn_mul(args: &[Value]) -> Result<Value> {
    expect_arity("mul", args, 2)?;
    Ok(Value::from(float_arg("mul", args, 0)? * float_arg("mul", args, 1)?))
}

fn fn_mod(args: &[Value]) -> Result<Value> {
    expect_arity("mod", args, 2)?;
    let a = int_arg("mod", args, 0)?;
    let b = int_arg("mod", args, 1)?;
    if b == 0 {
        return Err(Error::Execution("mod: division by zero".to_string()));
    }
    Ok(Value::from(a % b))
}

fn fn_sin(args: &[Value]) -> Result<Value> {
    expect_arity("sin", args, 1)?;
    Ok(Value::from(float_arg("sin", args, 0)?.sin()))
}

fn fn_cos(args: &[Value]) -> Result<Value> {
    expect_arity("cos", args, 1)?;
    Ok(Value::from(float_arg("cos", args, 0)?.cos()))
}

fn fn_tan(args: &[Value]) -> Result<Value> {
    expect_arity("tan", args, 1)?;
    Ok(Value::from(float_arg("tan", args, 0)?.tan()))
}

fn fn_abs(args: &[Value]) -> Result<Value> {
    expect_arity("abs", args, 1)?;
    Ok(Value::from(float_arg("abs", args, 0)?.abs()))
}

fn fn_floor(args: &[Value]) -> Result<Value> {
    expect_arity("floor", args, 1)?;
    Ok(Value::from(float_arg("floor", args, 0)?.floor()))
}

fn fn_ceil(args: &[Value]) -> Result<Value> {
    expect_arity("ceil", args, 1)?;
    Ok(Value::from(float_arg("ceil", args, 0)?.ceil()))
}

/// Joins the scalar elements of a sequence with a separator.
///
/// Strings join verbatim; other scalars take their default string form.
/// Nested sequences or mappings cannot be joined.
fn fn_join(args: &[Value]) -> Result<Value> {
    expect_arity("join", args, 2)?;
    let sep = str_arg("join", args, 0)?;
    let Some(items) = args[1].as_seq() else {
        return Err(type_error("join", 1, "a sequence", &args[1]));
    };
    let mut parts = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Seq(_) | Value::Map(_) => {
                return Err(Error::Execution(format!(
                    "join: cannot join a {} element",
                    item.type_name()
                )));
            },
            scalar => parts.push(scalar.to_string()),
        }
    }
    Ok(Value::from(parts.join(sep)))
}

fn fn_trim(args: &[Value]) -> Result<Value> {
    expect_arity("trim", args, 1)?;
    Ok(Value::from(str_arg("trim", args, 0)?.trim()))
}

fn fn_trim_prefix(args: &[Value]) -> Result<Value> {
    expect_arity("trim_prefix", args, 2)?;
    let s = str_arg("trim_prefix", args, 0)?;
    let p = str_arg("trim_prefix", args, 1)?;
    Ok(Value::from(s.strip_prefix(p).unwrap_or(s)))
}

fn fn_trim_suffix(args: &[Value]) -> Result<Value> {
    expect_arity("trim_suffix", args, 2)?;
    let s = str_arg("trim_suffix", args, 0)?;
    let p = str_arg("trim_suffix", args, 1)?;
    Ok(Value::from(s.strip_suffix(p).unwrap_or(s)))
}

fn fn_has_prefix(args: &[Value]) -> Result<Value> {
    expect_arity("has_prefix", args, 2)?;
    let s = str_arg("has_prefix", args, 0)?;
    let p = str_arg("has_prefix", args, 1)?;
    Ok(Value::Bool(s.starts_with(p)))
}

fn fn_has_suffix(args: &[Value]) -> Result<Value> {
    expect_arity("has_suffix", args, 2)?;
    let s = str_arg("has_suffix", args, 0)?;
    let p = str_arg("has_suffix", args, 1)?;
    Ok(Value::Bool(s.ends_with(p)))
}

fn fn_upper(args: &[Value]) -> Result<Value> {
    expect_arity("upper", args, 1)?;
    Ok(Value::from(str_arg("upper", args, 0)?.to_uppercase()))
}

fn fn_lower(args: &[Value]) -> Result<Value> {
    expect_arity("lower", args, 1)?;
    Ok(Value::from(str_arg("lower", args, 0)?.to_lowercase()))
}

/// Maps every character to upper case.
///
/// Not word-capitalization: `title "abc def"` is `"ABC DEF"`.
fn fn_title(args: &[Value]) -> Result<Value> {
    expect_arity("title", args, 1)?;
    Ok(Value::from(str_arg("title", args, 0)?.to_uppercase()))
}

/// Returns the first falsy argument, or the last argument.
fn fn_and(args: &[Value]) -> Result<Value> {
    if args.is_empty() {
        return Err(Error::Execution("and: expected at least 1 argument".to_string()));
    }
    for arg in args {
        if !arg.is_truthy() {
            return Ok(arg.clone());
        }
    }
    Ok(args[args.len() - 1].clone())
}

/// Returns the first truthy argument, or the last argument.
fn fn_or(args: &[Value]) -> Result<Value> {
    if args.is_empty() {
        return Err(Error::Execution("or: expected at least 1 argument".to_string()));
    }
    for arg in args {
        if arg.is_truthy() {
            return Ok(arg.clone());
        }
    }
    Ok(args[args.len() - 1].clone())
}

fn fn_not(args: &[Value]) -> Result<Value> {
    expect_arity("not", args, 1)?;
    Ok(Value::Bool(!args[0].is_truthy()))
}

/// Scalar equality: numbers compare across int/float, strings and bools
/// compare by value. Collections are not comparable.
fn loose_eq(name: &str, a: &Value, b: &Value) -> Result<bool> {
    match (a, b) {
        (Value::Null, Value::Null) => Ok(true),
        (Value::Bool(x), Value::Bool(y)) => Ok(x == y),
        (Value::Number(x), Value::Number(y)) => Ok(match (x, y) {
            (Number::Int(i), Number::Int(j)) => i == j,
            #[allow(clippy::float_cmp)]
            _ => x.as_f64() == y.as_f64(),
        }),
        (Value::String(x), Value::String(y)) => Ok(x == y),
        (Value::Seq(_) | Value::Map(_), _) | (_, Value::Seq(_) | Value::Map(_)) => {
            Err(Error::Execution(format!(
                "{name}: cannot compare {} with {}",
                a.type_name(),
                b.type_name()
            )))
        },
        _ => Ok(false),
    }
}

/// `eq a b [c ...]`: true if `a` equals any of the remaining arguments.
fn fn_eq(args: &[Value]) -> Result<Value> {
    if args.len() < 2 {
        return Err(Error::Execution("eq: expected at least 2 arguments".to_string()));
    }
    for other in &args[1..] {
        if loose_eq("eq", &args[0], other)? {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

fn fn_ne(args: &[Value]) -> Result<Value> {
    expect_arity("ne", args, 2)?;
    Ok(Value::Bool(!loose_eq("ne", &args[0], &args[1])?))
}

fn ordering(name: &str, args: &[Value]) -> Result<std::cmp::Ordering> {
    expect_arity(name, args, 2)?;
    match (&args[0], &args[1]) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .ok_or_else(|| Error::Execution(format!("{name}: cannot order NaN"))),
        (Value::String(x), Value::String(y)) => Ok(x.cmp(y)),
        (a, b) => Err(Error::Execution(format!(
            "{name}: cannot order {} and {}",
            a.type_name(),
            b.type_name()
        ))),
    }
}

fn fn_lt(args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(ordering("lt", args)?.is_lt()))
}

fn fn_le(args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(ordering("le", args)?.is_le()))
}

fn fn_gt(args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(ordering("gt", args)?.is_gt()))
}

fn fn_ge(args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(ordering("ge", args)?.is_ge()))
}

#[allow(clippy::cast_possible_wrap)]
fn fn_len(args: &[Value]) -> Result<Value> {
    expect_arity("len", args, 1)?;
    let n = match &args[0] {
        Value::String(s) => s.chars().count(),
        Value::Seq(s) => s.len(),
        Value::Map(m) => m.len(),
        other => return Err(type_error("len", 0, "a string or collection", other)),
    };
    Ok(Value::from(n as i64))
}

/// `index base key [key ...]`: descends a sequence by integer indices or
/// a mapping by string keys.
fn fn_index(args: &[Value]) -> Result<Value> {
    if args.len() < 2 {
        return Err(Error::Execution("index: expected at least 2 arguments".to_string()));
    }
    let mut current = &args[0];
    for key in &args[1..] {
        current = match (current, key) {
            (Value::Seq(items), Value::Number(n)) => {
                let idx = n.as_i64().ok_or_else(|| {
                    Error::Execution("index: sequence index must be an integer".to_string())
                })?;
                usize::try_from(idx)
                    .ok()
                    .and_then(|i| items.get(i))
                    .ok_or_else(|| {
                        Error::Execution(format!(
                            "index: {idx} out of range for sequence of length {}",
                            items.len()
                        ))
                    })?
            },
            (Value::Map(entries), Value::String(k)) => entries.get(k).ok_or_else(|| {
                Error::Execution(format!("index: key {k:?} not found"))
            })?,
            (base, key) => {
                return Err(Error::Execution(format!(
                    "index: cannot index {} with {}",
                    base.type_name(),
                    key.type_name()
                )));
            },
        };
    }
    Ok(current.clone())
}
