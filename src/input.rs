//! Input and output plumbing.
//!
//! Reads template and variables sources from files or stdin (`-`), and
//! opens the output sink (a created/truncated file, or stdout).

use crate::{Error, Result};
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

/// The pseudo-path selecting a standard stream.
pub const STDIN: &str = "-";

/// Reads a source completely into memory.
///
/// `-` reads stdin to EOF; anything else is a file path.
///
/// # Errors
///
/// Returns [`Error::Io`] carrying the path on any read failure.
pub fn read_source(path: &str) -> Result<Vec<u8>> {
    if path == STDIN {
        let mut buf = Vec::new();
        io::stdin()
            .read_to_end(&mut buf)
            .map_err(|e| Error::Io {
                path: "<stdin>".to_string(),
                source: e,
            })?;
        Ok(buf)
    } else {
        fs::read(path).map_err(|e| Error::Io {
            path: path.to_string(),
            source: e,
        })
    }
}

/// Decodes source bytes as UTF-8 template text.
///
/// # Errors
///
/// Returns [`Error::Parse`] naming the source when it is not valid UTF-8.
pub fn source_to_utf8(name: &str, bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes)
        .map_err(|e| Error::Parse(format!("{name}: template is not valid utf-8: {e}")))
}

/// Opens the output sink: a created/truncated file, or stdout when no
/// path is given. Returns the sink and its display name for io errors.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be created.
pub fn open_output(path: Option<&Path>) -> Result<(Box<dyn Write>, String)> {
    match path {
        Some(path) => {
            let file = fs::File::create(path).map_err(|e| Error::Io {
                path: path.display().to_string(),
                source: e,
            })?;
            Ok((Box::new(file), path.display().to_string()))
        },
        None => Ok((Box::new(io::stdout()), "<stdout>".to_string())),
    }
}
