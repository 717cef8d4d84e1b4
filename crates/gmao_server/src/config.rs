//! TOML configuration for the HTTP service.
//!
//! Every section and key is optional. Values are resolved in this order,
//! highest priority first: CLI overrides, config file, compiled defaults.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
pub const DEFAULT_DB_PATH: &str = "gmao.sqlite3";
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const SESSION_TTL_HOURS_MAX: i64 = 720;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML in `{path}`: {message}")]
    Parse { path: String, message: String },
    #[error("invalid config value for `{field}`: {message}")]
    Invalid { field: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    pub server: HttpSection,
    pub database: DatabaseSection,
    pub logging: LoggingSection,
    pub auth: AuthSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    pub bind: String,
    pub request_timeout_secs: u64,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub path: PathBuf,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DB_PATH),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    pub dir: PathBuf,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: gmao_core::default_log_level().to_string(),
            dir: PathBuf::from(DEFAULT_LOG_DIR),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    pub session_ttl_hours: i64,
    pub bootstrap_admin_email: Option<String>,
    pub bootstrap_admin_password: Option<String>,
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            session_ttl_hours: gmao_core::service::auth_service::DEFAULT_SESSION_TTL_HOURS,
            bootstrap_admin_email: None,
            bootstrap_admin_password: None,
        }
    }
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub bind: Option<String>,
    pub db_path: Option<PathBuf>,
}

impl ServerConfig {
    /// Loads `path` when given, otherwise starts from defaults, then applies
    /// overrides and validates the result.
    pub fn load(path: Option<&Path>, overrides: &CliOverrides) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let content =
                    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                        path: path.to_path_buf(),
                        source,
                    })?;
                Self::parse(&content, &path.display().to_string())?
            }
            None => Self::default(),
        };
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config = Self::parse(content, "<string>")?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides(&mut self, overrides: &CliOverrides) {
        if let Some(bind) = &overrides.bind {
            self.server.bind = bind.clone();
        }
        if let Some(db_path) = &overrides.db_path {
            self.database.path = db_path.clone();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        if self.server.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "server.request_timeout_secs",
                message: "must be greater than 0".to_string(),
            });
        }
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                field: "database.path",
                message: "must not be empty".to_string(),
            });
        }
        if !(1..=SESSION_TTL_HOURS_MAX).contains(&self.auth.session_ttl_hours) {
            return Err(ConfigError::Invalid {
                field: "auth.session_ttl_hours",
                message: format!("must be between 1 and {SESSION_TTL_HOURS_MAX}"),
            });
        }
        if self.auth.bootstrap_admin_email.is_some() != self.auth.bootstrap_admin_password.is_some()
        {
            return Err(ConfigError::Invalid {
                field: "auth.bootstrap_admin_password",
                message: "bootstrap admin needs both an email and a password".to_string(),
            });
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .bind
            .parse()
            .map_err(|err: std::net::AddrParseError| ConfigError::Invalid {
                field: "server.bind",
                message: err.to_string(),
            })
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.auth.session_ttl_hours)
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.server.request_timeout_secs)
    }

    pub fn logging_config(&self) -> gmao_core::LoggingConfig {
        gmao_core::LoggingConfig::new(self.logging.level.clone(), self.logging.dir.clone())
    }

    fn parse(content: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|err| ConfigError::Parse {
            path: origin.to_string(),
            message: err.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{CliOverrides, ConfigError, ServerConfig, DEFAULT_BIND};
    use std::io::Write;
    use std::path::PathBuf;

    #[test]
    fn empty_file_yields_defaults() {
        let config = ServerConfig::from_toml("").unwrap();
        assert_eq!(config.server.bind, DEFAULT_BIND);
        assert_eq!(config.auth.session_ttl_hours, 12);
        assert_eq!(config.database.path, PathBuf::from("gmao.sqlite3"));
    }

    #[test]
    fn sections_override_defaults() {
        let config = ServerConfig::from_toml(
            r#"
            [server]
            bind = "0.0.0.0:9000"

            [auth]
            session_ttl_hours = 48
            bootstrap_admin_email = "admin@mine.dz"
            bootstrap_admin_password = "change-me-now"
            "#,
        )
        .unwrap();
        assert_eq!(config.bind_addr().unwrap().port(), 9000);
        assert_eq!(config.session_ttl(), chrono::Duration::hours(48));
        assert_eq!(config.server.request_timeout_secs, 30);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let bad_bind = ServerConfig::from_toml("[server]\nbind = \"localhost\"").unwrap_err();
        assert!(matches!(
            bad_bind,
            ConfigError::Invalid {
                field: "server.bind",
                ..
            }
        ));

        let bad_ttl = ServerConfig::from_toml("[auth]\nsession_ttl_hours = 0").unwrap_err();
        assert!(matches!(
            bad_ttl,
            ConfigError::Invalid {
                field: "auth.session_ttl_hours",
                ..
            }
        ));

        let half_admin =
            ServerConfig::from_toml("[auth]\nbootstrap_admin_email = \"a@b.c\"").unwrap_err();
        assert!(matches!(half_admin, ConfigError::Invalid { .. }));

        let not_toml = ServerConfig::from_toml("[server").unwrap_err();
        assert!(matches!(not_toml, ConfigError::Parse { .. }));
    }

    #[test]
    fn cli_overrides_win_over_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[database]\npath = \"from-file.sqlite3\"").unwrap();

        let config = ServerConfig::load(
            Some(file.path()),
            &CliOverrides {
                bind: Some("127.0.0.1:9999".to_string()),
                db_path: Some(PathBuf::from("from-cli.sqlite3")),
            },
        )
        .unwrap();
        assert_eq!(config.database.path, PathBuf::from("from-cli.sqlite3"));
        assert_eq!(config.server.bind, "127.0.0.1:9999");
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = ServerConfig::load(
            Some(std::path::Path::new("/nonexistent/gmao.toml")),
            &CliOverrides::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
