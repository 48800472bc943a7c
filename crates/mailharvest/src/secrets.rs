//! Secret lookup from configuration.
//!
//! A secret can be given in three ways, tried in this order:
//!
//! 1. **Direct value** in the config file (`accessToken`)
//! 2. **File reference**, e.g. a mounted Docker secret (`accessTokenFile`)
//! 3. **Env var reference** (`accessTokenEnvVar`)

use std::fs;

use secrecy::SecretString;

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No secret source provided (need one of: direct value, file path, or env var name)")]
    NoSourceProvided,

    #[error("Failed to read secret from file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable '{name}' not set")]
    EnvVarNotSet { name: String },

    #[error("Environment variable '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String },

    #[error("Secret from {origin} is empty")]
    Empty { origin: String },
}

/// The configured places a single secret may come from.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecretSources<'a> {
    pub direct: Option<&'a str>,
    pub file: Option<&'a str>,
    pub env_var: Option<&'a str>,
}

impl<'a> SecretSources<'a> {
    /// Resolves the first configured source. Surrounding whitespace is trimmed.
    pub fn resolve(&self) -> Result<SecretString, SecretError> {
        if let Some(value) = self.direct.filter(|v| !v.is_empty()) {
            return Ok(SecretString::from(value.to_string()));
        }

        if let Some(path) = self.file.filter(|p| !p.is_empty()) {
            let expanded = expand_home(path);
            let content = fs::read_to_string(&expanded).map_err(|e| SecretError::FileReadError {
                path: expanded.clone(),
                source: e,
            })?;
            return non_empty(content.trim(), || format!("file '{}'", expanded));
        }

        if let Some(name) = self.env_var.filter(|n| !n.is_empty()) {
            return match std::env::var(name) {
                Ok(value) => non_empty(value.trim(), || format!("env var '{}'", name)),
                Err(std::env::VarError::NotPresent) => Err(SecretError::EnvVarNotSet {
                    name: name.to_string(),
                }),
                Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
                    name: name.to_string(),
                }),
            };
        }

        Err(SecretError::NoSourceProvided)
    }

    /// Like [`resolve`](Self::resolve), but an unset env var or a missing
    /// source yields `None`.
    pub fn resolve_optional(&self) -> Result<Option<SecretString>, SecretError> {
        match self.resolve() {
            Ok(secret) => Ok(Some(secret)),
            Err(SecretError::NoSourceProvided) | Err(SecretError::EnvVarNotSet { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn non_empty(value: &str, origin: impl FnOnce() -> String) -> Result<SecretString, SecretError> {
    if value.is_empty() {
        return Err(SecretError::Empty { origin: origin() });
    }
    Ok(SecretString::from(value.to_string()))
}

/// Expands a leading `~` or `~/` to the user's home directory.
pub(crate) fn expand_home(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            let home = home.to_string_lossy();
            return path.replacen('~', &home, 1);
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sources<'a>(
        direct: Option<&'a str>,
        file: Option<&'a str>,
        env_var: Option<&'a str>,
    ) -> SecretSources<'a> {
        SecretSources {
            direct,
            file,
            env_var,
        }
    }

    // Tests that modify environment variables must run serially
    #[test]
    #[serial]
    fn test_direct_value_takes_priority() {
        std::env::set_var("MH_TEST_SECRET_1", "env_value");
        let secret = sources(Some("direct"), None, Some("MH_TEST_SECRET_1"))
            .resolve()
            .unwrap();
        assert_eq!(secret.expose_secret(), "direct");
        std::env::remove_var("MH_TEST_SECRET_1");
    }

    #[test]
    #[serial]
    fn test_file_takes_priority_over_env() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "file_value").unwrap();
        std::env::set_var("MH_TEST_SECRET_2", "env_value");

        let path = temp_file.path().to_str().unwrap();
        let secret = sources(None, Some(path), Some("MH_TEST_SECRET_2"))
            .resolve()
            .unwrap();
        assert_eq!(secret.expose_secret(), "file_value");
        std::env::remove_var("MH_TEST_SECRET_2");
    }

    #[test]
    #[serial]
    fn test_env_var_is_trimmed() {
        std::env::set_var("MH_TEST_SECRET_3", "  ya29.token\n");
        let secret = sources(None, None, Some("MH_TEST_SECRET_3"))
            .resolve()
            .unwrap();
        assert_eq!(secret.expose_secret(), "ya29.token");
        std::env::remove_var("MH_TEST_SECRET_3");
    }

    #[test]
    #[serial]
    fn test_unset_env_var_is_optional() {
        std::env::remove_var("MH_TEST_SECRET_4");
        let src = sources(None, None, Some("MH_TEST_SECRET_4"));
        assert!(matches!(src.resolve(), Err(SecretError::EnvVarNotSet { .. })));
        assert!(src.resolve_optional().unwrap().is_none());
    }

    #[test]
    fn test_no_source() {
        let src = sources(Some(""), None, None);
        assert!(matches!(src.resolve(), Err(SecretError::NoSourceProvided)));
    }

    #[test]
    fn test_missing_file_is_an_error_even_when_optional() {
        let src = sources(None, Some("/nonexistent/secret"), None);
        assert!(matches!(
            src.resolve_optional(),
            Err(SecretError::FileReadError { .. })
        ));
    }

    #[test]
    fn test_blank_file_rejected() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "   ").unwrap();
        let path = temp_file.path().to_str().unwrap();
        assert!(matches!(
            sources(None, Some(path), None).resolve(),
            Err(SecretError::Empty { .. })
        ));
    }

    #[test]
    fn test_expand_home_leaves_plain_paths() {
        assert_eq!(expand_home("/run/secrets/token"), "/run/secrets/token");
        assert_eq!(expand_home("relative/~file"), "relative/~file");
    }
}
