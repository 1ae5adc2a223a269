// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! From a file (or string) to a validated [`EcuConfig`].
//!
//! The text first has its `${VAR}` and `${VAR:default}` placeholders filled
//! in, is then deserialized according to its extension, and finally gets
//! the `ECU_*` overrides applied on top:
//!
//! | variable            | setting                         |
//! |---------------------|---------------------------------|
//! | `ECU_HOST`          | TCP host (switches to TCP)      |
//! | `ECU_PORT`          | TCP port                        |
//! | `ECU_DEVICE`        | serial device (switches to RTU) |
//! | `ECU_BAUD_RATE`     | serial speed                    |
//! | `ECU_UNIT_ID`       | unit id                         |
//! | `ECU_TIMEOUT_MS`    | response timeout                |
//! | `ECU_RETRIES`       | attempts per read               |
//! | `ECU_LOG_LEVEL`     | log level                       |
//! | `ECU_LOG_FORMAT`    | text, compact or json           |
//! | `ECU_OUTPUT_FORMAT` | text or json                    |

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::schema::{ConnectionOverrides, EcuConfig};

/// Where variable values come from; the process environment unless replaced.
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

// =============================================================================
// ConfigLoader
// =============================================================================

/// Reads configuration files and layers the environment over them.
///
/// ```no_run
/// use ecu_config::loader::ConfigLoader;
///
/// let config = ConfigLoader::new().load("ecu.yaml").unwrap();
/// ```
#[derive(Clone)]
pub struct ConfigLoader {
    prefix: String,
    use_environment: bool,
    lookup: EnvLookup,
}

impl ConfigLoader {
    /// `ECU_` prefix, process environment.
    pub fn new() -> Self {
        Self {
            prefix: "ECU".to_string(),
            use_environment: true,
            lookup: Arc::new(|name| std::env::var(name).ok()),
        }
    }

    /// Override variables become `{prefix}_HOST` and so on.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// With `false`, placeholders stay as written and no overrides apply.
    pub fn with_env_vars(mut self, enabled: bool) -> Self {
        self.use_environment = enabled;
        self
    }

    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.lookup = Arc::new(lookup);
        self
    }

    /// [`parse`](Self::parse) followed by validation.
    pub fn load(&self, path: impl AsRef<Path>) -> ConfigResult<EcuConfig> {
        let config = self.parse(path)?;
        config.validate()?;
        info!(connection = %config.connection, "Configuration loaded");
        Ok(config)
    }

    /// Same as [`load`](Self::load) for text already in memory.
    pub fn load_from_str(&self, content: &str, format: ConfigFormat) -> ConfigResult<EcuConfig> {
        let mut config = format.deserialize(&self.substitute(content))?;
        self.apply_env_overrides(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads `path` and applies the environment, leaving validation to the
    /// caller so that command-line flags can still be layered on.
    pub fn parse(&self, path: impl AsRef<Path>) -> ConfigResult<EcuConfig> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }
        let format = ConfigFormat::from_path(path)?;
        debug!(path = %path.display(), ?format, "Reading configuration");

        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        let mut config = format.deserialize(&self.substitute(&text)).map_err(|e| match e {
            ConfigError::Serialization { message } => ConfigError::parse(path, message),
            other => other,
        })?;
        self.apply_env_overrides(&mut config)?;
        Ok(config)
    }

    /// Built-in defaults plus the environment. The result has no host unless
    /// the environment supplies one, so it is not validated here.
    pub fn defaults(&self) -> ConfigResult<EcuConfig> {
        let mut config = EcuConfig::default();
        self.apply_env_overrides(&mut config)?;
        Ok(config)
    }

    /// Fills `${NAME}` and `${NAME:fallback}`. A name with no value and no
    /// fallback, or a `${` that is never closed, is left untouched.
    fn substitute(&self, text: &str) -> String {
        if !self.use_environment {
            return text.to_string();
        }

        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(open) = rest.find("${") {
            out.push_str(&rest[..open]);
            let after = &rest[open + 2..];
            let Some(close) = after.find('}') else {
                out.push_str(&rest[open..]);
                return out;
            };

            let body = &after[..close];
            let (name, fallback) = match body.split_once(':') {
                Some((name, fallback)) => (name, Some(fallback)),
                None => (body, None),
            };
            match (self.lookup)(name) {
                Some(value) => out.push_str(&value),
                None => match fallback {
                    Some(fallback) => out.push_str(fallback),
                    None => {
                        warn!(variable = name, "Placeholder has no value");
                        out.push_str(&rest[open..open + close + 3]);
                    }
                },
            }
            rest = &after[close + 1..];
        }
        out.push_str(rest);
        out
    }

    fn lookup(&self, suffix: &str) -> Option<(String, String)> {
        let name = format!("{}_{suffix}", self.prefix);
        (self.lookup)(&name).map(|value| (name, value))
    }

    fn lookup_parsed<T: FromStr>(&self, suffix: &str, expected: &str) -> ConfigResult<Option<T>> {
        let Some((name, value)) = self.lookup(suffix) else {
            return Ok(None);
        };
        value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::invalid_env_var(name, expected))
    }

    fn apply_env_overrides(&self, config: &mut EcuConfig) -> ConfigResult<()> {
        if !self.use_environment {
            return Ok(());
        }

        let overrides = ConnectionOverrides {
            host: self.lookup("HOST").map(|(_, host)| host),
            port: self.lookup_parsed("PORT", "expected a port number")?,
            device: self.lookup("DEVICE").map(|(_, device)| device),
            baud_rate: self.lookup_parsed("BAUD_RATE", "expected a baud rate")?,
            unit_id: self.lookup_parsed("UNIT_ID", "expected a unit id from 1 to 247")?,
            timeout: self
                .lookup_parsed("TIMEOUT_MS", "expected milliseconds")?
                .map(Duration::from_millis),
            retries: self.lookup_parsed("RETRIES", "expected a count")?,
        };
        if !overrides.is_empty() {
            debug!(?overrides, "Environment overrides connection settings");
            overrides.apply(&mut config.connection);
        }

        if let Some(level) = self.lookup_parsed("LOG_LEVEL", "expected trace, debug, info, warn or error")? {
            config.logging.level = level;
        }
        if let Some(format) = self.lookup_parsed("LOG_FORMAT", "expected text, compact or json")? {
            config.logging.format = format;
        }
        if let Some(format) = self.lookup_parsed("OUTPUT_FORMAT", "expected text or json")? {
            config.output.format = format;
        }
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConfigLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigLoader")
            .field("prefix", &self.prefix)
            .field("use_environment", &self.use_environment)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// ConfigFormat
// =============================================================================

/// File syntax, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
    Json,
}

impl ConfigFormat {
    /// `.yaml`/`.yml`, `.toml` or `.json`, in any case.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "toml" => Ok(Self::Toml),
            "json" => Ok(Self::Json),
            "" => Err(ConfigError::unsupported_format("(no extension)")),
            other => Err(ConfigError::unsupported_format(other)),
        }
    }

    /// YAML goes through the `config` crate; TOML and JSON use their own
    /// deserializers directly.
    fn deserialize(self, text: &str) -> ConfigResult<EcuConfig> {
        let malformed = |e: &dyn fmt::Display| ConfigError::serialization(e.to_string());
        match self {
            Self::Yaml => config::Config::builder()
                .add_source(config::File::from_str(text, config::FileFormat::Yaml))
                .build()
                .and_then(|built| built.try_deserialize())
                .map_err(|e| malformed(&e)),
            Self::Toml => toml::from_str(text).map_err(|e| malformed(&e)),
            Self::Json => serde_json::from_str(text).map_err(|e| malformed(&e)),
        }
    }
}

/// [`ConfigLoader::load`] with the process environment.
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<EcuConfig> {
    ConfigLoader::new().load(path)
}

/// [`ConfigLoader::load_from_str`] with the process environment.
pub fn load_config_str(content: &str, format: ConfigFormat) -> ConfigResult<EcuConfig> {
    ConfigLoader::new().load_from_str(content, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{LogFormat, LogLevel, OutputFormat};
    use ecu_modbus::ConnectionConfig;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn isolated(vars: &[(&str, &str)]) -> ConfigLoader {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ConfigLoader::new().with_env_lookup(move |name| vars.get(name).cloned())
    }

    const TEST_YAML: &str = r#"
connection:
  type: tcp
  host: 192.168.1.50
  port: 1502
  unit_id: 3
  timeout: 500ms
logging:
  level: debug
output:
  format: json
"#;

    #[test]
    fn test_load_yaml() {
        let mut file = NamedTempFile::with_suffix(".yaml").unwrap();
        file.write_all(TEST_YAML.as_bytes()).unwrap();

        let config = isolated(&[]).load(file.path()).unwrap();

        let ConnectionConfig::Tcp(tcp) = &config.connection else {
            panic!("expected tcp");
        };
        assert_eq!(tcp.host, "192.168.1.50");
        assert_eq!(tcp.port, 1502);
        assert_eq!(tcp.unit_id, 3);
        assert_eq!(tcp.timeout, Duration::from_millis(500));
        assert_eq!(tcp.retries, 3);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.output.format, OutputFormat::Json);
    }

    #[test]
    fn test_load_toml_rtu() {
        let toml = r#"
[connection]
type = "rtu"
device = "/dev/ttyUSB0"
baud_rate = 9600
parity = "even"
"#;
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        file.write_all(toml.as_bytes()).unwrap();

        let config = isolated(&[]).load(file.path()).unwrap();

        let ConnectionConfig::Rtu(rtu) = &config.connection else {
            panic!("expected rtu");
        };
        assert_eq!(rtu.device, "/dev/ttyUSB0");
        assert_eq!(rtu.baud_rate, 9600);
        assert_eq!(rtu.parity, ecu_modbus::Parity::Even);
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_parse_error_names_the_file() {
        let mut file = NamedTempFile::with_suffix(".json").unwrap();
        file.write_all(b"{ \"connection\": ").unwrap();

        let result = isolated(&[]).load(file.path());
        assert!(matches!(result, Err(ConfigError::Parse { ref path, .. }) if path == file.path()));
    }

    #[test]
    fn test_config_format_from_path() {
        assert_eq!(ConfigFormat::from_path(Path::new("ecu.yml")).unwrap(), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("ecu.toml")).unwrap(), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("ecu.JSON")).unwrap(), ConfigFormat::Json);
        assert!(ConfigFormat::from_path(Path::new("ecu.ini")).is_err());
        assert!(ConfigFormat::from_path(Path::new("ecu")).is_err());
    }

    #[test]
    fn test_env_placeholder_resolution() {
        let loader = isolated(&[("ECU_TEST_HOST", "10.1.1.1")]);

        assert_eq!(loader.substitute("host: ${ECU_TEST_HOST}"), "host: 10.1.1.1");
        assert_eq!(loader.substitute("port: ${ECU_TEST_PORT:1502}"), "port: 1502");
        assert_eq!(loader.substitute("x: ${MISSING}"), "x: ${MISSING}");
        assert_eq!(loader.substitute("x: ${open"), "x: ${open");
    }

    #[test]
    fn test_env_overrides() {
        let loader = isolated(&[
            ("ECU_HOST", "ecu.local"),
            ("ECU_UNIT_ID", "9"),
            ("ECU_TIMEOUT_MS", "750"),
            ("ECU_RETRIES", "5"),
            ("ECU_LOG_LEVEL", "trace"),
        ]);
        let config = loader.load_from_str("{}", ConfigFormat::Json).unwrap();

        assert!(config.connection.to_string().starts_with("ecu.local:502, TCP"));
        assert_eq!(config.connection.unit_id(), 9);
        assert_eq!(config.connection.timeout(), Duration::from_millis(750));
        assert_eq!(config.connection.retries(), 5);
        assert_eq!(config.logging.level, LogLevel::Trace);
    }

    #[test]
    fn test_invalid_env_override() {
        let loader = isolated(&[("ECU_HOST", "ecu.local"), ("ECU_PORT", "http")]);
        let result = loader.load_from_str("{}", ConfigFormat::Json);

        assert!(matches!(result, Err(ConfigError::InvalidEnvVar { ref name, .. }) if name == "ECU_PORT"));
    }

    #[test]
    fn test_env_vars_disabled() {
        let loader = isolated(&[("ECU_HOST", "ecu.local")]).with_env_vars(false);
        let config = loader.defaults().unwrap();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_custom_prefix() {
        let loader = ConfigLoader::new()
            .with_env_prefix("APS")
            .with_env_lookup(|name| (name == "APS_HOST").then(|| "aps".to_string()));

        assert!(loader.defaults().unwrap().connection.to_string().starts_with("aps:502"));
    }

    #[test]
    fn test_placeholders_left_alone_when_disabled() {
        let loader = isolated(&[("X", "1")]).with_env_vars(false);
        assert_eq!(loader.substitute("a: ${X}"), "a: ${X}");
    }

    #[test]
    fn test_file_not_found() {
        let result = isolated(&[]).load("/nonexistent/path/ecu.yaml");
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }
}
