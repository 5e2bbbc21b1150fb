//! Template tokenizer.
//!
//! Splits template source into literal text runs and the tokens of
//! `{{ … }}` actions. Trim markers (`{{-` and `-}}`) strip whitespace from
//! the adjacent literal text; comment actions (`{{/* … */}}`) produce no
//! tokens at all.

use crate::{Error, Result};

/// A lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A literal text run between actions.
    Text(String),
    /// A field path: `.a.b` yields `["a", "b"]`, bare `.` yields `[]`.
    Field(Vec<String>),
    /// An identifier (keyword or function name).
    Ident(String),
    /// A double-quoted string literal.
    Str(String),
    /// An integer literal.
    Int(i64),
    /// A float literal.
    Float(f64),
    /// A boolean literal.
    Bool(bool),
    /// `|`
    Pipe,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `}}` closing an action.
    ActionEnd,
}

/// Tokenizes template source.
///
/// # Errors
///
/// Returns [`Error::Parse`] on unclosed actions, unterminated strings or
/// comments, and unexpected characters inside an action.
pub fn lex(source: &str) -> Result<Vec<Token>> {
    Lexer {
        src: source,
        pos: 0,
        tokens: Vec::new(),
        trim_leading: false,
    }
    .run()
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    tokens: Vec<Token>,
    /// Set by a `-}}` marker: strip leading whitespace from the next text
    /// run.
    trim_leading: bool,
}

impl Lexer<'_> {
    fn run(mut self) -> Result<Vec<Token>> {
        loop {
            let Some(off) = self.rest().find("{{") else {
                self.emit_text(self.src.len(), false);
                break;
            };
            let open = self.pos + off;

            // `{{-` followed by whitespace trims the preceding text run.
            let after_delim = &self.src[open + 2..];
            let trim_trailing = after_delim.starts_with('-')
                && after_delim[1..].starts_with(|c: char| c.is_whitespace());

            self.emit_text(open, trim_trailing);
            self.pos = open + if trim_trailing { 3 } else { 2 };
            self.lex_action()?;
        }
        Ok(self.tokens)
    }

    fn rest(&self) -> &str {
        &self.src[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.rest().chars().next() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    /// A short snippet of upcoming source, for error messages.
    fn context(&self) -> String {
        let rest = self.rest();
        let end = rest
            .char_indices()
            .take(24)
            .last()
            .map_or(0, |(i, c)| i + c.len_utf8());
        if rest.len() > end {
            format!("{}...", &rest[..end])
        } else {
            rest.to_string()
        }
    }

    fn err(&self, msg: &str) -> Error {
        Error::Parse(format!("{msg} near `{}`", self.context()))
    }

    fn emit_text(&mut self, end: usize, trim_trailing: bool) {
        let mut text = &self.src[self.pos..end];
        if self.trim_leading {
            text = text.trim_start();
            self.trim_leading = false;
        }
        if trim_trailing {
            text = text.trim_end();
        }
        if !text.is_empty() {
            self.tokens.push(Token::Text(text.to_string()));
        }
        self.pos = end;
    }

    fn lex_action(&mut self) -> Result<()> {
        if self.rest().trim_start().starts_with("/*") {
            return self.lex_comment();
        }

        loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.is_empty() {
                return Err(Error::Parse("unclosed action, missing `}}`".to_string()));
            }
            if rest.starts_with("-}}") {
                self.trim_leading = true;
                self.pos += 3;
                self.tokens.push(Token::ActionEnd);
                return Ok(());
            }
            if rest.starts_with("}}") {
                self.pos += 2;
                self.tokens.push(Token::ActionEnd);
                return Ok(());
            }

            let c = rest.chars().next().unwrap_or_default();
            match c {
                '|' => {
                    self.pos += 1;
                    self.tokens.push(Token::Pipe);
                },
                '(' => {
                    self.pos += 1;
                    self.tokens.push(Token::LParen);
                },
                ')' => {
                    self.pos += 1;
                    self.tokens.push(Token::RParen);
                },
                '"' => self.lex_string()?,
                '.' => self.lex_field(),
                c if c.is_ascii_digit() => self.lex_number()?,
                '-' if rest[1..].starts_with(|d: char| d.is_ascii_digit()) => {
                    self.lex_number()?;
                },
                c if is_ident_start(c) => self.lex_ident(),
                _ => return Err(self.err("unexpected character in action")),
            }
        }
    }

    fn lex_comment(&mut self) -> Result<()> {
        self.skip_whitespace();
        // Skip past `/*`.
        self.pos += 2;
        let Some(end) = self.rest().find("*/") else {
            return Err(Error::Parse("unterminated comment".to_string()));
        };
        self.pos += end + 2;
        self.skip_whitespace();
        if self.rest().starts_with("-}}") {
            self.trim_leading = true;
            self.pos += 3;
        } else if self.rest().starts_with("}}") {
            self.pos += 2;
        } else {
            return Err(self.err("a comment must span the whole action"));
        }
        Ok(())
    }

    fn lex_string(&mut self) -> Result<()> {
        // Opening quote.
        self.pos += 1;
        let mut out = String::new();
        let mut chars = self.rest().char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '"' => {
                    self.pos += i + 1;
                    self.tokens.push(Token::Str(out));
                    return Ok(());
                },
                '\\' => match chars.next() {
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 't')) => out.push('\t'),
                    Some((_, 'r')) => out.push('\r'),
                    Some((_, '"')) => out.push('"'),
                    Some((_, '\\')) => out.push('\\'),
                    Some((_, other)) => {
                        return Err(Error::Parse(format!(
                            "unknown escape `\\{other}` in string literal"
                        )));
                    },
                    None => break,
                },
                c => out.push(c),
            }
        }
        Err(Error::Parse("unterminated string literal".to_string()))
    }

    fn lex_field(&mut self) {
        // Consume the leading dot.
        self.pos += 1;
        let mut segs = Vec::new();
        loop {
            let seg: String = self
                .rest()
                .chars()
                .take_while(|c| is_ident_char(*c))
                .collect();
            if seg.is_empty() {
                break;
            }
            self.pos += seg.len();
            segs.push(seg);
            if self.rest().starts_with('.') {
                self.pos += 1;
            } else {
                break;
            }
        }
        self.tokens.push(Token::Field(segs));
    }

    fn lex_number(&mut self) -> Result<()> {
        let rest = self.rest();
        let mut end = 0;
        let mut prev_exp = false;
        for (i, c) in rest.char_indices() {
            let ok = c.is_ascii_digit()
                || c == '.'
                || c == 'e'
                || c == 'E'
                || (i == 0 && c == '-')
                || (prev_exp && (c == '+' || c == '-'));
            if !ok {
                break;
            }
            prev_exp = c == 'e' || c == 'E';
            end = i + c.len_utf8();
        }
        let lit = &rest[..end];
        let token = lit.parse::<i64>().map_or_else(
            |_| lit.parse::<f64>().map(Token::Float),
            |i| Ok(Token::Int(i)),
        );
        match token {
            Ok(t) => {
                self.pos += end;
                self.tokens.push(t);
                Ok(())
            },
            Err(_) => Err(self.err("malformed number literal")),
        }
    }

    fn lex_ident(&mut self) {
        let ident: String = self
            .rest()
            .chars()
            .take_while(|c| is_ident_char(*c))
            .collect();
        self.pos += ident.len();
        self.tokens.push(match ident.as_str() {
            "true" => Token::Bool(true),
            "false" => Token::Bool(false),
            _ => Token::Ident(ident),
        });
    }
}

const fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

const fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text() {
        let tokens = lex("hello world").unwrap();
        assert_eq!(tokens, vec![Token::Text("hello world".to_string())]);
    }

    #[test]
    fn test_simple_field_action() {
        let tokens = lex("Hello, {{.name}}!").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Text("Hello, ".to_string()),
                Token::Field(vec!["name".to_string()]),
                Token::ActionEnd,
                Token::Text("!".to_string()),
            ]
        );
    }

    #[test]
    fn test_bare_dot() {
        let tokens = lex("{{.}}").unwrap();
        assert_eq!(tokens, vec![Token::Field(vec![]), Token::ActionEnd]);
    }

    #[test]
    fn test_nested_field() {
        let tokens = lex("{{.a.b.c}}").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Field(vec!["a".to_string(), "b".to_string(), "c".to_string()]),
                Token::ActionEnd,
            ]
        );
    }

    #[test]
    fn test_pipeline_tokens() {
        let tokens = lex("{{ .x | upper }}").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Field(vec!["x".to_string()]),
                Token::Pipe,
                Token::Ident("upper".to_string()),
                Token::ActionEnd,
            ]
        );
    }

    #[test]
    fn test_literals() {
        let tokens = lex(r#"{{ add 2 -3.5 "s" true }}"#).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("add".to_string()),
                Token::Int(2),
                Token::Float(-3.5),
                Token::Str("s".to_string()),
                Token::Bool(true),
                Token::ActionEnd,
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        let tokens = lex(r#"{{ "a\nb\"c" }}"#).unwrap();
        assert_eq!(
            tokens,
            vec![Token::Str("a\nb\"c".to_string()), Token::ActionEnd]
        );
    }

    #[test]
    fn test_trim_markers() {
        let tokens = lex("a  {{- .x -}}  b").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Text("a".to_string()),
                Token::Field(vec!["x".to_string()]),
                Token::ActionEnd,
                Token::Text("b".to_string()),
            ]
        );
    }

    #[test]
    fn test_negative_number_is_not_trim() {
        let tokens = lex("{{-3}}").unwrap();
        assert_eq!(tokens, vec![Token::Int(-3), Token::ActionEnd]);
    }

    #[test]
    fn test_comment_emits_nothing() {
        let tokens = lex("a{{/* note */}}b").unwrap();
        assert_eq!(
            tokens,
            vec![Token::Text("a".to_string()), Token::Text("b".to_string())]
        );
    }

    #[test]
    fn test_unclosed_action() {
        let err = lex("{{ .x ").unwrap_err();
        assert!(err.to_string().contains("unclosed action"));
    }

    #[test]
    fn test_unterminated_string() {
        let err = lex(r#"{{ "abc }}"#).unwrap_err();
        assert!(err.to_string().contains("unterminated string"));
    }

    #[test]
    fn test_unexpected_character() {
        let err = lex("{{ @ }}").unwrap_err();
        assert!(err.to_string().contains("unexpected character"));
    }
}
