//! Template executor.
//!
//! Walks the parsed tree against a render context: the current scope (a
//! borrowed [`Value`]), the compiled-template namespace, and the function
//! registry. The scope only narrows (entering a `range` iteration or a
//! `with` block rebinds it) and the underlying value tree is never
//! mutated.

use super::Mode;
use super::escape::escape_html;
use super::parser::{Branch, Command, Node, Operand, Pipeline};
use crate::funcs::Registry;
use crate::value::Value;
use crate::{Error, Result};
use std::collections::HashMap;

pub(crate) struct Executor<'a> {
    pub registry: &'a Registry,
    pub mode: Mode,
    /// Templates registered on the engine (includes and their defines).
    pub namespace: &'a HashMap<String, Vec<Node>>,
    /// Templates defined inside the entry source itself.
    pub entry_defines: &'a HashMap<String, Vec<Node>>,
    /// Bound on nested `template` invocations.
    pub max_depth: usize,
}

impl Executor<'_> {
    pub fn render(&self, nodes: &[Node], root: &Value) -> Result<String> {
        let mut out = String::with_capacity(2048);
        self.walk(nodes, root, 0, &mut out)?;
        Ok(out)
    }

    fn walk(&self, nodes: &[Node], dot: &Value, depth: usize, out: &mut String) -> Result<()> {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Action(pipe) => {
                    let value = self.eval_pipeline(pipe, dot)?;
                    self.write_value(&value, out);
                },
                Node::If(branch) => {
                    if self.eval_pipeline(&branch.pipe, dot)?.is_truthy() {
                        self.walk(&branch.body, dot, depth, out)?;
                    } else {
                        self.walk(&branch.els, dot, depth, out)?;
                    }
                },
                Node::With(branch) => {
                    let value = self.eval_pipeline(&branch.pipe, dot)?;
                    if value.is_truthy() {
                        self.walk(&branch.body, &value, depth, out)?;
                    } else {
                        self.walk(&branch.els, dot, depth, out)?;
                    }
                },
                Node::Range(branch) => self.exec_range(branch, dot, depth, out)?,
                Node::Include { name, pipe } => {
                    self.exec_include(name, pipe.as_ref(), dot, depth, out)?;
                },
            }
        }
        Ok(())
    }

    fn exec_range(
        &self,
        branch: &Branch,
        dot: &Value,
        depth: usize,
        out: &mut String,
    ) -> Result<()> {
        let value = self.eval_pipeline(&branch.pipe, dot)?;
        match &value {
            Value::Seq(items) if !items.is_empty() => {
                for item in items {
                    self.walk(&branch.body, item, depth, out)?;
                }
                Ok(())
            },
            Value::Map(entries) if !entries.is_empty() => {
                // BTreeMap iteration visits keys in sorted order.
                for item in entries.values() {
                    self.walk(&branch.body, item, depth, out)?;
                }
                Ok(())
            },
            Value::Seq(_) | Value::Map(_) | Value::Null => {
                self.walk(&branch.els, dot, depth, out)
            },
            other => Err(Error::Execution(format!(
                "range over {}, want sequence or mapping",
                other.type_name()
            ))),
        }
    }

    fn exec_include(
        &self,
        name: &str,
        pipe: Option<&Pipeline>,
        dot: &Value,
        depth: usize,
        out: &mut String,
    ) -> Result<()> {
        let body = self
            .entry_defines
            .get(name)
            .or_else(|| self.namespace.get(name))
            .ok_or_else(|| Error::Execution(format!("no template named {name:?}")))?;
        if depth >= self.max_depth {
            return Err(Error::Execution(format!(
                "template invocation depth exceeded {} at {name:?}",
                self.max_depth
            )));
        }
        let scope = match pipe {
            Some(pipe) => self.eval_pipeline(pipe, dot)?,
            None => Value::Null,
        };
        self.walk(body, &scope, depth + 1, out)
    }

    fn write_value(&self, value: &Value, out: &mut String) {
        match self.mode {
            Mode::Text => {
                use std::fmt::Write;
                let _ = write!(out, "{value}");
            },
            Mode::Html => out.push_str(&escape_html(&value.to_string())),
        }
    }

    fn eval_pipeline(&self, pipe: &Pipeline, dot: &Value) -> Result<Value> {
        let mut piped: Option<Value> = None;
        for cmd in &pipe.cmds {
            piped = Some(self.eval_command(cmd, dot, piped)?);
        }
        piped.ok_or_else(|| Error::Execution("empty pipeline".to_string()))
    }

    fn eval_command(&self, cmd: &Command, dot: &Value, piped: Option<Value>) -> Result<Value> {
        if let Some(Operand::Name(name)) = cmd.ops.first() {
            let func = self
                .registry
                .get(name)
                .ok_or_else(|| Error::Execution(format!("unknown function: {name}")))?;
            let mut args = Vec::with_capacity(cmd.ops.len());
            for op in &cmd.ops[1..] {
                args.push(self.eval_operand(op, dot)?);
            }
            // A piped value becomes the call's final argument.
            if let Some(value) = piped {
                args.push(value);
            }
            return func(&args);
        }

        if cmd.ops.len() != 1 {
            return Err(Error::Execution(
                "a command with arguments must start with a function name".to_string(),
            ));
        }
        if piped.is_some() {
            return Err(Error::Execution(
                "cannot pipe a value into a non-function".to_string(),
            ));
        }
        self.eval_operand(&cmd.ops[0], dot)
    }

    fn eval_operand(&self, op: &Operand, dot: &Value) -> Result<Value> {
        match op {
            Operand::Field(segs) => lookup(dot, segs),
            Operand::Str(s) => Ok(Value::String(s.clone())),
            Operand::Int(i) => Ok(Value::from(*i)),
            Operand::Float(f) => Ok(Value::from(*f)),
            Operand::Bool(b) => Ok(Value::Bool(*b)),
            Operand::Paren(pipe) => self.eval_pipeline(pipe, dot),
            Operand::Name(name) => Err(Error::Execution(format!(
                "function `{name}` cannot be used as a value"
            ))),
        }
    }
}

/// Strict dotted-path descent from the current scope.
///
/// A mapping that lacks the requested key is a [`Error::MissingKey`],
/// never an empty substitution. Descending into a non-mapping is an
/// execution error.
fn lookup(dot: &Value, segs: &[String]) -> Result<Value> {
    let mut current = dot;
    for (i, seg) in segs.iter().enumerate() {
        match current {
            Value::Map(entries) => {
                current = entries.get(seg).ok_or_else(|| Error::MissingKey {
                    path: dotted(&segs[..=i]),
                })?;
            },
            other => {
                return Err(Error::Execution(format!(
                    "cannot resolve {} in a {} value",
                    dotted(&segs[..=i]),
                    other.type_name()
                )));
            },
        }
    }
    Ok(current.clone())
}

fn dotted(segs: &[String]) -> String {
    format!(".{}", segs.join("."))
}
