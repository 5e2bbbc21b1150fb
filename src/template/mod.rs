//! The template evaluation engine.
//!
//! [`Engine`] compiles template source into an executable form and renders
//! it against a decoded [`Value`] tree with the function registry bound
//! in. One engine serves both presentation modes; [`Mode`] is selected at
//! construction and only affects how substituted values are written.
//!
//! Named sub-templates are registered with [`Engine::add_template`]
//! (include files and their `{{define}}` blocks). The entry template is
//! compiled by [`Engine::compile`] and executed anonymously; it never
//! enters the name namespace, so it cannot collide with any registered
//! name.
//!
//! ## Template syntax
//!
//! - `{{.field.path}}`: dotted descent from the current scope; bare
//!   `{{.}}` is the scope itself. A key absent from a mapping is a hard
//!   render error.
//! - `{{ func arg ... }}` and pipelines `{{ .x | upper | trim }}`.
//! - `{{if pipeline}} … {{else if pipeline}} … {{else}} … {{end}}`
//! - `{{range pipeline}} … {{else}} … {{end}}`: iterates a sequence, or
//!   a mapping in sorted key order, rebinding the scope to each element.
//! - `{{with pipeline}} … {{else}} … {{end}}`
//! - `{{template "name" pipeline?}}`: invokes a registered template.
//! - `{{define "name"}} … {{end}}`, comments `{{/* … */}}`, and trim
//!   markers `{{- … -}}`.

mod escape;
mod exec;
mod lexer;
mod parser;

use crate::funcs::Registry;
use crate::value::Value;
use crate::{Error, Result};
use exec::Executor;
use parser::{Node, parse};
use std::collections::HashMap;

/// Default bound on nested `{{template}}` invocations.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Output mode for substituted values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Emit resolved values verbatim.
    #[default]
    Text,
    /// Escape resolved values for safe embedding in HTML.
    Html,
}

/// An entry template compiled by [`Engine::compile`].
///
/// Holds the executable body plus any templates `define`d inside the
/// entry source.
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    body: Vec<Node>,
    defines: HashMap<String, Vec<Node>>,
}

/// The template evaluation engine for one render session.
#[derive(Debug, Clone)]
pub struct Engine {
    registry: Registry,
    mode: Mode,
    max_depth: usize,
    templates: HashMap<String, Vec<Node>>,
}

impl Engine {
    /// Creates an engine with the given function registry and output mode.
    #[must_use]
    pub fn new(registry: Registry, mode: Mode) -> Self {
        Self {
            registry,
            mode,
            max_depth: DEFAULT_MAX_DEPTH,
            templates: HashMap::new(),
        }
    }

    /// Overrides the bound on nested template invocations.
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Returns the engine's output mode.
    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Parses a sub-template source and registers it under `name`, along
    /// with any `{{define}}` blocks it contains.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] on malformed syntax or when a name is
    /// already registered, since every named template must stay uniquely
    /// addressable within one render session.
    pub fn add_template(&mut self, name: &str, source: &str) -> Result<()> {
        let parsed = parse(source)?;
        self.insert(name.to_string(), parsed.body)?;
        for (define_name, body) in parsed.defines {
            self.insert(define_name, body)?;
        }
        Ok(())
    }

    fn insert(&mut self, name: String, body: Vec<Node>) -> Result<()> {
        if self.templates.contains_key(&name) {
            return Err(Error::Parse(format!("template {name:?} is already defined")));
        }
        self.templates.insert(name, body);
        Ok(())
    }

    /// Compiles the entry template.
    ///
    /// The entry stays outside the name namespace; its `{{define}}` blocks
    /// must not collide with registered names.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] on malformed syntax or duplicate names.
    pub fn compile(&self, source: &str) -> Result<CompiledTemplate> {
        let parsed = parse(source)?;
        let mut defines = HashMap::new();
        for (name, body) in parsed.defines {
            if self.templates.contains_key(&name) || defines.contains_key(&name) {
                return Err(Error::Parse(format!("template {name:?} is already defined")));
            }
            defines.insert(name, body);
        }
        Ok(CompiledTemplate {
            body: parsed.body,
            defines,
        })
    }

    /// Executes a compiled template against the root value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingKey`] for an unresolved variable path and
    /// [`Error::Execution`] for function misuse, unknown templates, or
    /// depth exhaustion.
    pub fn render(&self, template: &CompiledTemplate, root: &Value) -> Result<String> {
        Executor {
            registry: &self.registry,
            mode: self.mode,
            namespace: &self.templates,
            entry_defines: &template.defines,
            max_depth: self.max_depth,
        }
        .render(&template.body, root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Format, decode};

    fn engine(mode: Mode) -> Engine {
        Engine::new(Registry::with_builtins(), mode)
    }

    fn render(mode: Mode, source: &str, vars_json: &str) -> Result<String> {
        let vars = decode(vars_json.as_bytes(), Format::Json)?;
        let eng = engine(mode);
        let tpl = eng.compile(source)?;
        eng.render(&tpl, &vars)
    }

    #[test]
    fn test_literal_round_trip() {
        let source = "no actions here, just text\nwith lines";
        let got = render(Mode::Text, source, "{}").unwrap();
        assert_eq!(got, source);
    }

    #[test]
    fn test_variable_substitution() {
        let got = render(Mode::Text, "Hello, {{.name}}!", r#"{"name":"World"}"#).unwrap();
        assert_eq!(got, "Hello, World!");
    }

    #[test]
    fn test_missing_key_is_fatal() {
        let err = render(Mode::Text, "{{.missing}}", "{}").unwrap_err();
        assert!(matches!(err, Error::MissingKey { .. }));
    }

    #[test]
    fn test_range_over_sequence() {
        let got = render(
            Mode::Text,
            "{{range .items}}{{.}},{{end}}",
            r#"{"items":[1,2,3]}"#,
        )
        .unwrap();
        assert_eq!(got, "1,2,3,");
    }

    #[test]
    fn test_range_over_mapping_sorted() {
        let got = render(
            Mode::Text,
            "{{range .m}}{{.}};{{end}}",
            r#"{"m":{"b":2,"a":1,"c":3}}"#,
        )
        .unwrap();
        assert_eq!(got, "1;2;3;");
    }

    #[test]
    fn test_range_else_on_empty() {
        let got = render(
            Mode::Text,
            "{{range .items}}x{{else}}none{{end}}",
            r#"{"items":[]}"#,
        )
        .unwrap();
        assert_eq!(got, "none");
    }

    #[test]
    fn test_range_over_scalar_errors() {
        let err = render(Mode::Text, "{{range .x}}{{end}}", r#"{"x":1}"#).unwrap_err();
        assert!(err.to_string().contains("range over number"));
    }

    #[test]
    fn test_if_else() {
        let got = render(
            Mode::Text,
            "{{if .on}}yes{{else}}no{{end}}",
            r#"{"on":true}"#,
        )
        .unwrap();
        assert_eq!(got, "yes");

        let got = render(
            Mode::Text,
            "{{if .on}}yes{{else}}no{{end}}",
            r#"{"on":false}"#,
        )
        .unwrap();
        assert_eq!(got, "no");
    }

    #[test]
    fn test_else_if() {
        let source = "{{if eq .n 1}}one{{else if eq .n 2}}two{{else}}many{{end}}";
        assert_eq!(render(Mode::Text, source, r#"{"n":2}"#).unwrap(), "two");
        assert_eq!(render(Mode::Text, source, r#"{"n":9}"#).unwrap(), "many");
    }

    #[test]
    fn test_with_rebinds_scope() {
        let got = render(
            Mode::Text,
            "{{with .user}}{{.name}}{{end}}",
            r#"{"user":{"name":"Ann"}}"#,
        )
        .unwrap();
        assert_eq!(got, "Ann");
    }

    #[test]
    fn test_pipeline() {
        let got = render(Mode::Text, "{{ .word | upper }}", r#"{"word":"loud"}"#).unwrap();
        assert_eq!(got, "LOUD");
    }

    #[test]
    fn test_function_call_with_fields() {
        let got = render(Mode::Text, "{{ add .x .y }}", r#"{"x":2,"y":3}"#).unwrap();
        assert_eq!(got, "5");
    }

    #[test]
    fn test_html_mode_escapes_values() {
        let got = render(
            Mode::Html,
            "<p>{{.note}}</p>",
            r#"{"note":"<script>"}"#,
        )
        .unwrap();
        assert_eq!(got, "<p>&lt;script&gt;</p>");
    }

    #[test]
    fn test_text_mode_does_not_escape() {
        let got = render(
            Mode::Text,
            "<p>{{.note}}</p>",
            r#"{"note":"<script>"}"#,
        )
        .unwrap();
        assert_eq!(got, "<p><script></p>");
    }

    #[test]
    fn test_html_mode_escapes_attribute_position() {
        let got = render(
            Mode::Html,
            r#"<a title="{{.t}}">x</a>"#,
            r#"{"t":"a\"b"}"#,
        )
        .unwrap();
        assert_eq!(got, r#"<a title="a&quot;b">x</a>"#);
    }

    #[test]
    fn test_named_template_invocation() {
        let vars = decode(br#"{"user":"Ann"}"#, Format::Json).unwrap();
        let mut eng = engine(Mode::Text);
        eng.add_template("greet", "Hi {{.}}").unwrap();
        let tpl = eng.compile(r#"{{template "greet" .user}}"#).unwrap();
        assert_eq!(eng.render(&tpl, &vars).unwrap(), "Hi Ann");
    }

    #[test]
    fn test_define_in_entry() {
        let got = render(
            Mode::Text,
            r#"{{define "shout"}}{{. | upper}}{{end}}{{template "shout" .w}}"#,
            r#"{"w":"hey"}"#,
        )
        .unwrap();
        assert_eq!(got, "HEY");
    }

    #[test]
    fn test_unknown_template_errors() {
        let err = render(Mode::Text, r#"{{template "nope"}}"#, "{}").unwrap_err();
        assert!(err.to_string().contains("no template named"));
    }

    #[test]
    fn test_duplicate_template_name_rejected() {
        let mut eng = engine(Mode::Text);
        eng.add_template("a", "one").unwrap();
        let err = eng.add_template("a", "two").unwrap_err();
        assert!(err.to_string().contains("already defined"));
    }

    #[test]
    fn test_entry_define_cannot_shadow_include() {
        let mut eng = engine(Mode::Text);
        eng.add_template("greet", "Hi").unwrap();
        let err = eng
            .compile(r#"{{define "greet"}}Yo{{end}}x"#)
            .unwrap_err();
        assert!(err.to_string().contains("already defined"));
    }

    #[test]
    fn test_recursive_template_hits_depth_guard() {
        let mut eng = engine(Mode::Text);
        eng.add_template("loop", r#"{{template "loop"}}"#).unwrap();
        let tpl = eng.compile(r#"{{template "loop"}}"#).unwrap();
        let err = eng.render(&tpl, &Value::Null).unwrap_err();
        assert!(err.to_string().contains("depth exceeded"));
    }

    #[test]
    fn test_template_without_pipeline_gets_null_scope() {
        let mut eng = engine(Mode::Text);
        eng.add_template("probe", "[{{.}}]").unwrap();
        let tpl = eng.compile(r#"{{template "probe"}}"#).unwrap();
        assert_eq!(eng.render(&tpl, &Value::from("root")).unwrap(), "[]");
    }

    #[test]
    fn test_trim_markers() {
        let got = render(
            Mode::Text,
            "a\n  {{- .x }}\n",
            r#"{"x":"b"}"#,
        )
        .unwrap();
        assert_eq!(got, "ab\n");
    }

    #[test]
    fn test_comment() {
        let got = render(Mode::Text, "a{{/* ignored */}}b", "{}").unwrap();
        assert_eq!(got, "ab");
    }

    #[test]
    fn test_nested_path() {
        let got = render(
            Mode::Text,
            "{{.server.host}}:{{.server.port}}",
            r#"{"server":{"host":"localhost","port":8080}}"#,
        )
        .unwrap();
        assert_eq!(got, "localhost:8080");
    }

    #[test]
    fn test_unknown_function_errors() {
        let err = render(Mode::Text, "{{ frobnicate 1 }}", "{}").unwrap_err();
        assert!(err.to_string().contains("unknown function"));
    }
}
