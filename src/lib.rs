//! # Stencil
//!
//! A command-line template renderer.
//!
//! Stencil renders a template document against a structured variables
//! document (JSON, YAML, or TOML), substituting dotted-path variable
//! references and applying a small library of helper functions.
//!
//! ## Features
//!
//! - One evaluation engine with two output modes (plain text, HTML-escaping)
//! - Strict key lookup: an unresolved variable path is a render error,
//!   never a silent empty substitution
//! - `{{if}}`/`{{range}}`/`{{with}}` blocks, pipelines, named sub-templates
//! - Format-agnostic variables ingestion with extension-based detection
//!
//! ## Example
//!
//! ```rust
//! use stencil::funcs::Registry;
//! use stencil::template::{Engine, Mode};
//! use stencil::value::{Format, decode};
//!
//! let vars = decode(br#"{"name": "World"}"#, Format::Json)?;
//! let engine = Engine::new(Registry::with_builtins(), Mode::Text);
//! let tpl = engine.compile("Hello, {{.name}}!")?;
//! assert_eq!(engine.render(&tpl, &vars)?, "Hello, World!");
//! # Ok::<(), stencil::Error>(())
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

use thiserror::Error as ThisError;

// Module declarations
pub mod cli;
pub mod config;
pub mod funcs;
pub mod input;
pub mod logging;
pub mod render;
pub mod template;
pub mod value;

// Re-exports for convenience
pub use config::StencilConfig;
pub use funcs::Registry;
pub use render::Renderer;
pub use template::{CompiledTemplate, Engine, Mode};
pub use value::{Format, Value, decode};

/// Error type for stencil operations.
///
/// Uses `thiserror` for automatic `Display` and `Error` trait
/// implementations. Every error is fatal at the point it is detected; the
/// binary reports one diagnostic line and exits non-zero.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `Usage` | Missing or contradictory command-line arguments |
/// | `FormatDetection` | Variables format is ambiguous or unsupported |
/// | `Io` | A file or stream cannot be read or written |
/// | `Decode` | The variables document fails to parse |
/// | `Parse` | Template syntax is malformed |
/// | `MissingKey` | A variable path is absent from the value tree |
/// | `Execution` | Function misuse, type mismatch, unknown template |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Missing or contradictory command-line arguments.
    ///
    /// Raised when:
    /// - Both the template and the variables source are stdin
    /// - Variables come from stdin without `--vars-format`
    #[error("usage: {0}")]
    Usage(String),

    /// The variables format could not be determined.
    ///
    /// Raised when:
    /// - `--vars-format` names an unsupported format
    /// - The variables file extension is missing or unrecognized
    #[error("format detection: {0}")]
    FormatDetection(String),

    /// A file or stream could not be read or written.
    #[error("io: {path}: {source}")]
    Io {
        /// The path (or `<stdin>`/`<stdout>`) involved.
        path: String,
        /// The underlying io error.
        source: std::io::Error,
    },

    /// The variables document failed to parse.
    #[error("decode {format}: {message}")]
    Decode {
        /// The declared or detected format.
        format: value::Format,
        /// The underlying decoder's message.
        message: String,
    },

    /// Template syntax is malformed.
    ///
    /// The message identifies the offending fragment.
    #[error("template parse: {0}")]
    Parse(String),

    /// A variable path is absent from the value tree.
    ///
    /// Strict key lookup: this is a hard render failure, never a silent
    /// empty substitution.
    #[error("missing key: {path}")]
    MissingKey {
        /// The full dotted path that failed to resolve.
        path: String,
    },

    /// Template execution failed.
    ///
    /// Raised when:
    /// - A function receives the wrong number or type of arguments
    /// - A named template is not registered
    /// - Nested template invocations exceed the depth limit
    #[error("execution: {0}")]
    Execution(String),
}

/// Result type alias for stencil operations.
pub type Result<T> = std::result::Result<T, Error>;
