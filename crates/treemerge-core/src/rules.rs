//! Rule file loading.
//!
//! The rule file uses shell-style `KEY="VALUE"` lines so existing
//! `.clean_files` files keep working:
//!
//! ```text
//! # comment
//! SUGGESTED_ACCESS="644"
//! TRICKY_LETTERS=":*?\"<>|$ "
//! TRICKY_LETTER_SUBSTITUTE="_"
//! TMP_FILES=".tmp,.bak,.~,.swp"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ConfigError;

/// File name looked up in the working directory when the requested rule
/// file does not exist.
pub const DEFAULT_RULES_FILE: &str = ".clean_files";

/// Rules consumed by the cleanup, sanitize and permission passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Mode bits every file is normalized to.
    pub permissions: u32,
    /// Characters that are replaced in file names.
    pub tricky_chars: Vec<char>,
    /// Replacement for each tricky character.
    pub substitute: String,
    /// Suffixes that mark temporary files (matched case-insensitively).
    pub temp_extensions: Vec<String>,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            permissions: 0o644,
            tricky_chars: vec![':', '*', '?', '"', '<', '>', '|', '$', ' '],
            substitute: "_".to_string(),
            temp_extensions: [".tmp", ".bak", ".~", ".swp", ".ds_store", ".old"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl RuleConfig {
    /// Load rules from `requested`, falling back to `./.clean_files` and then
    /// to the built-in defaults.
    pub fn load(requested: &Path) -> Result<Self, ConfigError> {
        match Self::resolve_path(requested) {
            Some(path) => {
                info!(path = %path.display(), "Loading rules");
                Self::from_file(&path)
            }
            None => {
                warn!(
                    path = %requested.display(),
                    "Rule file not found, using built-in defaults"
                );
                Ok(Self::default())
            }
        }
    }

    /// Find the rule file to use, if any.
    pub fn resolve_path(requested: &Path) -> Option<PathBuf> {
        let expanded = expand_home(requested);
        if expanded.is_file() {
            return Some(expanded);
        }

        let local = std::env::current_dir().ok()?.join(DEFAULT_RULES_FILE);
        local.is_file().then_some(local)
    }

    /// Read and parse a rule file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Parse rule file text. `origin` is only used for error messages.
    pub fn parse(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let mut rules = Self::default();

        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                debug!(line = index + 1, "Ignoring rule line without '='");
                continue;
            };

            let key = key.trim();
            let value = unquote(value.trim());
            let invalid = |message: String| ConfigError::InvalidValue {
                path: origin.to_path_buf(),
                line: index + 1,
                key: key.to_string(),
                message,
            };

            match key {
                "SUGGESTED_ACCESS" => {
                    rules.permissions = parse_mode(value).map_err(invalid)?;
                }
                "TRICKY_LETTERS" => {
                    let mut chars: Vec<char> = value.chars().filter(|c| *c != ' ').collect();
                    if value.contains(' ') {
                        chars.push(' ');
                    }
                    rules.tricky_chars = chars;
                }
                "TRICKY_LETTER_SUBSTITUTE" => {
                    if value.contains(['/', '\\', '\0']) {
                        return Err(invalid(format!(
                            "substitute '{}' would split the file name",
                            value.escape_default()
                        )));
                    }
                    if rules.tricky_chars.iter().any(|c| value.contains(*c)) {
                        return Err(invalid(format!(
                            "substitute '{value}' contains a tricky character"
                        )));
                    }
                    rules.substitute = value.to_string();
                }
                "TMP_FILES" => {
                    rules.temp_extensions = value
                        .split(',')
                        .map(|ext| ext.trim().to_lowercase())
                        .filter(|ext| !ext.is_empty())
                        .collect();
                }
                other => debug!(key = other, "Ignoring unknown rule key"),
            }
        }

        Ok(rules)
    }

    /// Whether a file name ends in one of the temporary suffixes.
    pub fn is_temp_name(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.temp_extensions
            .iter()
            .any(|ext| lower.ends_with(&ext.to_lowercase()))
    }

    /// Whether a file name contains any tricky character.
    pub fn has_tricky_chars(&self, name: &str) -> bool {
        name.chars().any(|c| self.tricky_chars.contains(&c))
    }

    /// Replace every tricky character in `name` with the substitute.
    pub fn sanitize_name(&self, name: &str) -> String {
        let mut out = String::with_capacity(name.len());
        for c in name.chars() {
            if self.tricky_chars.contains(&c) {
                out.push_str(&self.substitute);
            } else {
                out.push(c);
            }
        }
        out
    }
}

fn unquote(value: &str) -> &str {
    value.trim_matches(|c| c == '"' || c == '\'')
}

fn parse_mode(value: &str) -> Result<u32, String> {
    let digits = value
        .strip_prefix("0o")
        .or_else(|| value.strip_prefix("0O"))
        .unwrap_or(value);
    let mode = u32::from_str_radix(digits, 8).map_err(|e| format!("'{value}': {e}"))?;
    if mode > 0o7777 {
        return Err(format!("'{value}' is not a permission mode"));
    }
    Ok(mode)
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}
