//! Configuration for the in-memory IdP.
//!
//! [`IdpConfig`] is the immutable runtime configuration handed to the
//! metadata builder and the SSO handler. It is produced by
//! [`IdpConfigBuilder`], which fills in a generated signing certificate and
//! the default SAML response when none are supplied.
//!
//! With the `server` feature the standalone binary additionally reads
//! [`IdpSettings`] from a TOML file, with support for environment variable
//! interpolation using `${VAR_NAME}` syntax.
//!
//! # Example
//!
//! ```toml
//! [idp]
//! entity_id = "https://idp.test"
//! port = 8080
//! signing_certificate_path = "${FIXTURES}/idp.pem"
//!
//! [observability.logging]
//! level = "debug"
//! format = "json"
//! ```

mod idp;
mod observability;
#[cfg(feature = "server")]
mod settings;

pub use idp::*;
pub use observability::*;
#[cfg(feature = "server")]
pub use settings::*;

/// Configuration errors.
#[cfg(feature = "server")]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

#[cfg(feature = "server")]
static ENV_VAR_PATTERN: once_cell::sync::Lazy<regex::Regex> =
    once_cell::sync::Lazy::new(|| {
        regex::Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid")
    });

/// Expand environment variables in the format `${VAR_NAME}`.
/// Variables after a `#` on the same line are left alone.
#[cfg(feature = "server")]
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut result = String::with_capacity(input.len());

    for line in input.lines() {
        let comment_pos = line.find('#');
        let mut last_end = 0;

        for cap in ENV_VAR_PATTERN.captures_iter(line) {
            let Some(whole) = cap.get(0) else { continue };

            if let Some(pos) = comment_pos
                && whole.start() >= pos
            {
                continue;
            }

            result.push_str(&line[last_end..whole.start()]);

            let var_name = &cap[1];
            let value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
            result.push_str(&value);

            last_end = whole.end();
        }

        result.push_str(&line[last_end..]);
        result.push('\n');
    }

    if !input.ends_with('\n') && result.ends_with('\n') {
        result.pop();
    }

    Ok(result)
}
