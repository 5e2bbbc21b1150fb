//! Template parser.
//!
//! Consumes the token stream from [`lexer`](super::lexer) and produces the
//! executable syntax tree. Block structure (`if`/`range`/`with` … `end`)
//! is resolved here; `define` blocks are lifted out of the body and
//! returned separately for namespace registration.

use super::lexer::{Token, lex};
use crate::{Error, Result};

/// An executable template node.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    /// A literal text run, emitted verbatim.
    Text(String),
    /// `{{ pipeline }}`: evaluate and write the result.
    Action(Pipeline),
    /// `{{if pipeline}} … {{else}} … {{end}}`
    If(Branch),
    /// `{{range pipeline}} … {{else}} … {{end}}`
    Range(Branch),
    /// `{{with pipeline}} … {{else}} … {{end}}`
    With(Branch),
    /// `{{template "name" pipeline?}}`
    Include {
        name: String,
        pipe: Option<Pipeline>,
    },
}

/// A guarded block with an optional else arm.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Branch {
    pub pipe: Pipeline,
    pub body: Vec<Node>,
    pub els: Vec<Node>,
}

/// Commands piped left to right; each piped command receives the previous
/// command's value as its final argument.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Pipeline {
    pub cmds: Vec<Command>,
}

/// A function name with arguments, or a single operand.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Command {
    pub ops: Vec<Operand>,
}

/// One term of a command.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Operand {
    /// Dotted descent from the current scope; empty means the scope
    /// itself.
    Field(Vec<String>),
    /// A function name (valid only at the head of a command).
    Name(String),
    /// String literal.
    Str(String),
    /// Integer literal.
    Int(i64),
    /// Float literal.
    Float(f64),
    /// Boolean literal.
    Bool(bool),
    /// A parenthesized pipeline.
    Paren(Pipeline),
}

/// A parsed source file: the template body plus any `define`d templates.
#[derive(Debug, Clone, Default)]
pub(crate) struct Parsed {
    pub body: Vec<Node>,
    pub defines: Vec<(String, Vec<Node>)>,
}

const KEYWORDS: &[&str] = &["if", "else", "end", "range", "with", "template", "define"];

/// Parses template source into a [`Parsed`] tree.
pub(crate) fn parse(source: &str) -> Result<Parsed> {
    let tokens = lex(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        defines: Vec::new(),
    };
    let (body, term) = parser.parse_nodes(true)?;
    match term {
        Term::Eof => Ok(Parsed {
            body,
            defines: parser.defines,
        }),
        Term::End => Err(Error::Parse("unexpected {{end}}".to_string())),
        Term::Else | Term::ElseIf(_) => Err(Error::Parse("unexpected {{else}}".to_string())),
    }
}

/// How a node sequence ended.
enum Term {
    Eof,
    End,
    Else,
    ElseIf(Pipeline),
}

/// What closes the pipeline currently being parsed.
#[derive(Clone, Copy, PartialEq)]
enum Closer {
    Action,
    Paren,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    defines: Vec<(String, Vec<Node>)>,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect_action_end(&mut self, what: &str) -> Result<()> {
        match self.next() {
            Some(Token::ActionEnd) => Ok(()),
            other => Err(Error::Parse(format!(
                "expected `}}}}` after {what}, found {}",
                describe(other.as_ref())
            ))),
        }
    }

    /// Parses nodes until end-of-input or a block terminator action.
    fn parse_nodes(&mut self, top_level: bool) -> Result<(Vec<Node>, Term)> {
        let mut nodes = Vec::new();
        loop {
            let Some(token) = self.next() else {
                return Ok((nodes, Term::Eof));
            };
            match token {
                Token::Text(t) => nodes.push(Node::Text(t)),
                Token::Ident(kw) if kw == "end" => {
                    self.expect_action_end("{{end}}")?;
                    return Ok((nodes, Term::End));
                },
                Token::Ident(kw) if kw == "else" => {
                    if matches!(self.peek(), Some(Token::Ident(next)) if next == "if") {
                        self.pos += 1;
                        let pipe = self.parse_pipeline(Closer::Action)?;
                        return Ok((nodes, Term::ElseIf(pipe)));
                    }
                    self.expect_action_end("{{else}}")?;
                    return Ok((nodes, Term::Else));
                },
                Token::Ident(kw) if kw == "if" => {
                    nodes.push(self.parse_branch("if")?);
                },
                Token::Ident(kw) if kw == "range" => {
                    nodes.push(self.parse_branch("range")?);
                },
                Token::Ident(kw) if kw == "with" => {
                    nodes.push(self.parse_branch("with")?);
                },
                Token::Ident(kw) if kw == "template" => {
                    nodes.push(self.parse_include()?);
                },
                Token::Ident(kw) if kw == "define" => {
                    if !top_level {
                        return Err(Error::Parse(
                            "define is only allowed at the top level".to_string(),
                        ));
                    }
                    self.parse_define()?;
                },
                _ => {
                    // An expression action; the token we already consumed
                    // is its first term.
                    self.pos -= 1;
                    let pipe = self.parse_pipeline(Closer::Action)?;
                    nodes.push(Node::Action(pipe));
                },
            }
        }
    }

    /// Parses the remainder of an `if`/`range`/`with` block, the keyword
    /// having been consumed.
    fn parse_branch(&mut self, kind: &'static str) -> Result<Node> {
        let pipe = self.parse_pipeline(Closer::Action)?;
        let (body, els) = self.finish_branch(kind)?;
        let branch = Branch { pipe, body, els };
        Ok(match kind {
            "if" => Node::If(branch),
            "range" => Node::Range(branch),
            _ => Node::With(branch),
        })
    }

    /// Parses a block body and its optional else arm through `{{end}}`.
    fn finish_branch(&mut self, kind: &'static str) -> Result<(Vec<Node>, Vec<Node>)> {
        let (body, term) = self.parse_nodes(false)?;
        match term {
            Term::End => Ok((body, Vec::new())),
            Term::Else => {
                let (els, term) = self.parse_nodes(false)?;
                match term {
                    Term::End => Ok((body, els)),
                    _ => Err(Error::Parse(format!("unclosed {{{{else}}}} in {kind}"))),
                }
            },
            Term::ElseIf(pipe) if kind == "if" => {
                // `{{else if}}` nests: the chain shares one `{{end}}`.
                let (nested_body, nested_els) = self.finish_branch(kind)?;
                let nested = Node::If(Branch {
                    pipe,
                    body: nested_body,
                    els: nested_els,
                });
                Ok((body, vec![nested]))
            },
            Term::ElseIf(_) => Err(Error::Parse(format!(
                "else if is not allowed in a {kind} block"
            ))),
            Term::Eof => Err(Error::Parse(format!("unclosed {{{{{kind}}}}} block"))),
        }
    }

    fn parse_include(&mut self) -> Result<Node> {
        let name = match self.next() {
            Some(Token::Str(name)) => name,
            other => {
                return Err(Error::Parse(format!(
                    "template invocation needs a quoted name, found {}",
                    describe(other.as_ref())
                )));
            },
        };
        let pipe = if matches!(self.peek(), Some(Token::ActionEnd)) {
            self.pos += 1;
            None
        } else {
            Some(self.parse_pipeline(Closer::Action)?)
        };
        Ok(Node::Include { name, pipe })
    }

    fn parse_define(&mut self) -> Result<()> {
        let name = match self.next() {
            Some(Token::Str(name)) => name,
            other => {
                return Err(Error::Parse(format!(
                    "define needs a quoted name, found {}",
                    describe(other.as_ref())
                )));
            },
        };
        self.expect_action_end("define")?;
        let (body, term) = self.parse_nodes(false)?;
        match term {
            Term::End => {
                self.defines.push((name, body));
                Ok(())
            },
            _ => Err(Error::Parse(format!("unclosed define {name:?}"))),
        }
    }

    fn parse_pipeline(&mut self, closer: Closer) -> Result<Pipeline> {
        let mut cmds = Vec::new();
        loop {
            cmds.push(self.parse_command()?);
            match self.next() {
                Some(Token::Pipe) => {},
                Some(Token::ActionEnd) if closer == Closer::Action => break,
                Some(Token::RParen) if closer == Closer::Paren => break,
                other => {
                    return Err(Error::Parse(format!(
                        "expected `|` or end of pipeline, found {}",
                        describe(other.as_ref())
                    )));
                },
            }
        }
        Ok(Pipeline { cmds })
    }

    fn parse_command(&mut self) -> Result<Command> {
        let mut ops = Vec::new();
        loop {
            match self.peek() {
                Some(Token::Field(_)) => {
                    if let Some(Token::Field(segs)) = self.next() {
                        ops.push(Operand::Field(segs));
                    }
                },
                Some(Token::Str(_)) => {
                    if let Some(Token::Str(s)) = self.next() {
                        ops.push(Operand::Str(s));
                    }
                },
                Some(Token::Int(i)) => {
                    ops.push(Operand::Int(*i));
                    self.pos += 1;
                },
                Some(Token::Float(f)) => {
                    ops.push(Operand::Float(*f));
                    self.pos += 1;
                },
                Some(Token::Bool(b)) => {
                    ops.push(Operand::Bool(*b));
                    self.pos += 1;
                },
                Some(Token::Ident(name)) => {
                    if KEYWORDS.contains(&name.as_str()) {
                        return Err(Error::Parse(format!(
                            "unexpected keyword `{name}` in pipeline"
                        )));
                    }
                    if !ops.is_empty() {
                        return Err(Error::Parse(format!(
                            "function name `{name}` must start a command"
                        )));
                    }
                    ops.push(Operand::Name(name.clone()));
                    self.pos += 1;
                },
                Some(Token::LParen) => {
                    self.pos += 1;
                    ops.push(Operand::Paren(self.parse_pipeline(Closer::Paren)?));
                },
                _ => break,
            }
        }
        if ops.is_empty() {
            return Err(Error::Parse("empty command in pipeline".to_string()));
        }
        Ok(Command { ops })
    }
}

fn describe(token: Option<&Token>) -> String {
    token.map_or_else(|| "end of template".to_string(), |t| format!("{t:?}"))
}
