//! Configuration management.
//!
//! Stencil reads optional defaults from a `config.toml` in the platform
//! config directory. Command-line flags always override file values; a
//! missing default-location file silently falls back to built-in
//! defaults, while an explicitly requested file that fails to load is an
//! error.

use crate::template::DEFAULT_MAX_DEPTH;
use crate::value::Format;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

/// Main configuration for stencil.
#[derive(Debug, Clone)]
pub struct StencilConfig {
    /// Default variables format when neither the flag nor the file
    /// extension decides it.
    pub vars_format: Option<Format>,
    /// Default to HTML output mode.
    pub html: bool,
    /// Bound on nested `{{template}}` invocations.
    pub max_template_depth: usize,
}

impl Default for StencilConfig {
    fn default() -> Self {
        Self {
            vars_format: None,
            html: false,
            max_template_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    /// Default variables format.
    vars_format: Option<String>,
    /// Default output mode.
    html: Option<bool>,
    /// Template invocation depth bound.
    max_template_depth: Option<usize>,
}

impl StencilConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or names an
    /// unknown format.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        let file: ConfigFile = toml::from_str(&contents).map_err(|e| Error::Decode {
            format: Format::Toml,
            message: format!("{}: {e}", path.display()),
        })?;

        Self::from_config_file(file)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the platform config dir first, then the XDG-style
    /// `~/.config/stencil/` path for Unix compatibility. Returns default
    /// configuration if no config file is found or a found file does not
    /// load.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let platform_config = base_dirs.config_dir().join("stencil").join("config.toml");
        if platform_config.exists() {
            if let Ok(config) = Self::load_from_file(&platform_config) {
                return config;
            }
        }

        let xdg_config = base_dirs
            .home_dir()
            .join(".config")
            .join("stencil")
            .join("config.toml");
        if xdg_config.exists() {
            if let Ok(config) = Self::load_from_file(&xdg_config) {
                return config;
            }
        }

        Self::default()
    }

    /// Converts a `ConfigFile` to a `StencilConfig`.
    fn from_config_file(file: ConfigFile) -> Result<Self> {
        let mut config = Self::default();

        if let Some(format) = file.vars_format {
            config.vars_format = Some(Format::from_str(&format)?);
        }
        if let Some(html) = file.html {
            config.html = html;
        }
        if let Some(depth) = file.max_template_depth {
            config.max_template_depth = depth;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StencilConfig::new();
        assert!(config.vars_format.is_none());
        assert!(!config.html);
        assert_eq!(config.max_template_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "vars_format = \"yaml\"\nhtml = true\nmax_template_depth = 8\n")
            .unwrap();

        let config = StencilConfig::load_from_file(&path).unwrap();
        assert_eq!(config.vars_format, Some(Format::Yaml));
        assert!(config.html);
        assert_eq!(config.max_template_depth, 8);
    }

    #[test]
    fn test_load_from_file_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "html = true\n").unwrap();

        let config = StencilConfig::load_from_file(&path).unwrap();
        assert!(config.html);
        assert!(config.vars_format.is_none());
        assert_eq!(config.max_template_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_load_from_file_bad_format_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "vars_format = \"csv\"\n").unwrap();

        assert!(StencilConfig::load_from_file(&path).is_err());
    }

    #[test]
    fn test_load_from_missing_file_errors() {
        assert!(StencilConfig::load_from_file(Path::new("/no/such/config.toml")).is_err());
    }
}
