//! The render driver.
//!
//! Orchestrates one end-to-end render: registers include templates into
//! the engine's namespace, compiles the entry template, executes it with
//! the root value, and delivers the bytes to the output sink. Any failure
//! from decoding, parsing, or execution aborts the whole render; there is
//! no partial-output recovery.

use crate::funcs::Registry;
use crate::template::{Engine, Mode};
use crate::value::Value;
use crate::{Error, Result};
use std::io::Write;
use tracing::debug;

/// Drives one template render from sources to sink.
#[derive(Debug, Clone)]
pub struct Renderer {
    engine: Engine,
}

impl Renderer {
    /// Creates a renderer with the built-in function library and the
    /// given output mode.
    #[must_use]
    pub fn new(mode: Mode) -> Self {
        Self {
            engine: Engine::new(Registry::with_builtins(), mode),
        }
    }

    /// Creates a renderer around a pre-configured engine.
    #[must_use]
    pub const fn with_engine(engine: Engine) -> Self {
        Self { engine }
    }

    /// Registers an include template under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] on malformed syntax or a duplicate name.
    pub fn add_include(&mut self, name: &str, source: &str) -> Result<()> {
        debug!(name, "registering include template");
        self.engine.add_template(name, source)
    }

    /// Compiles and executes the entry template against the root value.
    ///
    /// # Errors
    ///
    /// Propagates [`Error::Parse`], [`Error::MissingKey`], and
    /// [`Error::Execution`] from compilation and execution.
    pub fn render(&self, entry: &str, root: &Value) -> Result<String> {
        debug!(bytes = entry.len(), "compiling entry template");
        let compiled = self.engine.compile(entry)?;
        debug!("executing entry template");
        self.engine.render(&compiled, root)
    }

    /// Renders and writes the result to `sink` in one write-all call.
    ///
    /// `sink_name` labels the sink in io errors (a path, or `<stdout>`).
    ///
    /// # Errors
    ///
    /// Render failures propagate unchanged; write failures surface as
    /// [`Error::Io`].
    pub fn render_to(
        &self,
        entry: &str,
        root: &Value,
        sink: &mut dyn Write,
        sink_name: &str,
    ) -> Result<()> {
        let output = self.render(entry, root)?;
        debug!(bytes = output.len(), sink = sink_name, "writing output");
        sink.write_all(output.as_bytes())
            .and_then(|()| sink.flush())
            .map_err(|e| Error::Io {
                path: sink_name.to_string(),
                source: e,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Format, decode};

    #[test]
    fn test_render_with_include() {
        let vars = decode(br#"{"user":"Ann"}"#, Format::Json).unwrap();
        let mut renderer = Renderer::new(Mode::Text);
        renderer.add_include("greet", "Hi {{.}}").unwrap();
        let got = renderer
            .render(r#"{{template "greet" .user}}"#, &vars)
            .unwrap();
        assert_eq!(got, "Hi Ann");
    }

    #[test]
    fn test_render_to_sink() {
        let vars = decode(br#"{"n":1}"#, Format::Json).unwrap();
        let renderer = Renderer::new(Mode::Text);
        let mut sink = Vec::new();
        renderer
            .render_to("n={{.n}}", &vars, &mut sink, "<memory>")
            .unwrap();
        assert_eq!(sink, b"n=1");
    }

    #[test]
    fn test_failed_render_writes_nothing() {
        let vars = decode(b"{}", Format::Json).unwrap();
        let renderer = Renderer::new(Mode::Text);
        let mut sink = Vec::new();
        let err = renderer
            .render_to("before {{.missing}} after", &vars, &mut sink, "<memory>")
            .unwrap_err();
        assert!(matches!(err, Error::MissingKey { .. }));
        assert!(sink.is_empty());
    }
}
