//! Command-line interface.
//!
//! Stencil takes a template source and a variables source (either may be
//! `-` for stdin, but not both), renders, and writes the result to stdout
//! or `--output`.
//!
//! # Example Usage
//!
//! ```bash
//! # Render a template with JSON variables
//! stencil page.tmpl vars.json
//!
//! # Variables from stdin, format given explicitly
//! cat vars.yaml | stencil page.tmpl - --vars-format yaml
//!
//! # HTML mode with an include defining named templates
//! stencil --html -i partials.tmpl page.tmpl vars.toml -o page.html
//! ```

use crate::config::StencilConfig;
use crate::funcs::Registry;
use crate::input;
use crate::render::Renderer;
use crate::template::{Engine, Mode};
use crate::value::{Format, decode};
use crate::{Error, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Stencil - render a template against a structured variables document.
#[derive(Debug, Parser)]
#[command(name = "stencil")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Main template file, or `-` for stdin.
    #[arg(value_name = "TEMPLATE")]
    pub template: String,

    /// Variables file (json, yaml, or toml), or `-` for stdin.
    #[arg(value_name = "VARS_FILE")]
    pub vars: String,

    /// Include additional template files, registered by file stem before
    /// the main template compiles (useful for defining templates and
    /// invoking them from the main template).
    #[arg(short = 'i', long = "include", value_name = "TEMPLATE")]
    pub includes: Vec<PathBuf>,

    /// Explicitly specify the variables format (supported: json, yaml,
    /// toml); overrides file-extension detection.
    #[arg(
        short = 'f',
        long = "vars-format",
        value_name = "FORMAT",
        env = "STENCIL_VARS_FORMAT"
    )]
    pub vars_format: Option<String>,

    /// Write the result to a file instead of stdout.
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// HTML mode: escape substituted values for markup output.
    #[arg(short = 'H', long = "html")]
    pub html: bool,

    /// Enable verbose output.
    #[arg(long)]
    pub verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Runs one render for the parsed command line.
///
/// # Errors
///
/// Returns the first error from any pipeline stage: usage validation,
/// format detection, input reading, variables decoding, template
/// compilation, execution, or the final write.
pub fn run(cli: &Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => StencilConfig::load_from_file(path)?,
        None => StencilConfig::load_default(),
    };

    if cli.template == input::STDIN && cli.vars == input::STDIN {
        return Err(Error::Usage(
            "only one of TEMPLATE or VARS_FILE can read stdin".to_string(),
        ));
    }

    let format = resolve_format(cli.vars_format.as_deref(), &config, &cli.vars)?;
    let mode = if cli.html || config.html {
        Mode::Html
    } else {
        Mode::Text
    };
    debug!(%format, ?mode, "starting render");

    let entry = input::source_to_utf8(&cli.template, input::read_source(&cli.template)?)?;
    let vars_bytes = input::read_source(&cli.vars)?;
    debug!(bytes = vars_bytes.len(), %format, "decoding variables");
    let root = decode(&vars_bytes, format)?;

    let engine =
        Engine::new(Registry::with_builtins(), mode).with_max_depth(config.max_template_depth);
    let mut renderer = Renderer::with_engine(engine);
    for path in &cli.includes {
        let name = include_name(path)?;
        let path_str = path.to_str().ok_or_else(|| {
            Error::Usage(format!("include path is not valid utf-8: {}", path.display()))
        })?;
        let source = input::source_to_utf8(path_str, input::read_source(path_str)?)?;
        renderer.add_include(&name, &source)?;
    }

    let (mut sink, sink_name) = input::open_output(cli.output.as_deref())?;
    renderer.render_to(&entry, &root, &mut sink, &sink_name)
}

/// Resolves the variables format.
///
/// The `--vars-format` flag always wins; the config-file default comes
/// next; otherwise detection runs off the vars file extension. Stdin
/// variables need an explicit format.
fn resolve_format(
    flag: Option<&str>,
    config: &StencilConfig,
    vars_path: &str,
) -> Result<Format> {
    if let Some(name) = flag {
        return Format::from_str(name);
    }
    if let Some(format) = config.vars_format {
        return Ok(format);
    }
    if vars_path == input::STDIN {
        return Err(Error::Usage(
            "--vars-format is required when reading variables from stdin".to_string(),
        ));
    }
    Format::from_path(Path::new(vars_path))
}

/// Derives the template name for an include file: its file stem, so
/// `partials/greet.tmpl` registers `greet`.
fn include_name(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            Error::Usage(format!(
                "include file has no usable template name: {}",
                path.display()
            ))
        })
}
