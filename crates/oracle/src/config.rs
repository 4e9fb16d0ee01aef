//! Configuration management for the RelationNFT oracle.
//!
//! Configuration is read from a TOML file. Values may reference environment
//! variables with `${VAR_NAME}`; placeholders inside comments are left alone.

use alloy::primitives::Address;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Network configuration
    pub network: NetworkConfig,

    /// Contract addresses
    pub contracts: ContractsConfig,

    /// Oracle wallet
    pub oracle: OracleConfig,

    /// Metadata pinning service
    pub pinning: PinningConfig,

    /// Metadata document settings
    #[serde(default)]
    pub metadata: MetadataConfig,

    /// HTTP server
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Ethereum RPC URL
    pub rpc_url: String,

    /// Chain ID (e.g., 8453 for Base)
    pub chain_id: u64,
}

/// Contract addresses configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractsConfig {
    /// RelationNFT contract address
    pub relation_nft: Address,
}

/// Oracle wallet configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Private key of the oracle account (hex, optional 0x prefix)
    pub private_key: String,
}

impl std::fmt::Debug for OracleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleConfig")
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Pinning service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinningConfig {
    /// `pinJSONToIPFS` endpoint
    #[serde(default = "default_pinning_api_url")]
    pub api_url: String,

    /// API key
    pub api_key: String,

    /// Secret API key
    pub secret_api_key: String,

    /// Request timeout in seconds
    #[serde(default = "default_pinning_timeout_secs")]
    pub timeout_secs: u64,
}

/// Metadata document configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataConfig {
    /// Base URL of the placeholder image service
    #[serde(default = "default_image_base_url")]
    pub image_base_url: String,

    /// Platform name used in descriptions
    #[serde(default = "default_platform")]
    pub platform: String,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_pinning_api_url() -> String {
    "https://api.pinata.cloud/pinning/pinJSONToIPFS".to_string()
}

fn default_pinning_timeout_secs() -> u64 {
    30
}

fn default_image_base_url() -> String {
    "https://via.placeholder.com".to_string()
}

fn default_platform() -> String {
    "Farcaster".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            image_base_url: default_image_base_url(),
            platform: default_platform(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl ServerConfig {
    /// `host:port` bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Config {
    /// Load configuration from a TOML file, expanding `${VAR_NAME}` first.
    ///
    /// ```no_run
    /// # use relationnft_oracle::config::Config;
    /// let config = Config::from_file("relationnft.toml")?;
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let expanded = expand_env_vars(&contents)?;

        let config: Config = toml::from_str(&expanded)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a TOML string (no environment expansion).
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config: Config = toml::from_str(toml).context("Failed to parse TOML configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.network.rpc_url.trim().is_empty() {
            anyhow::bail!("Network RPC URL cannot be empty");
        }
        if self.network.chain_id == 0 {
            anyhow::bail!("Chain ID must be non-zero");
        }

        if self.contracts.relation_nft.is_zero() {
            anyhow::bail!("Contracts relation_nft must be a non-zero address");
        }

        let key = self.oracle.private_key.trim().trim_start_matches("0x");
        if key.len() != 64 {
            anyhow::bail!(
                "Oracle private_key must be 64 hex characters (got {})",
                key.len()
            );
        }
        if !key.chars().all(|c| c.is_ascii_hexdigit()) {
            anyhow::bail!("Oracle private_key must be a valid hex string");
        }

        if self.pinning.api_url.trim().is_empty() {
            anyhow::bail!("Pinning api_url cannot be empty");
        }
        if self.pinning.api_key.trim().is_empty() || self.pinning.secret_api_key.trim().is_empty()
        {
            anyhow::bail!("Pinning api_key and secret_api_key must be set");
        }
        if self.pinning.timeout_secs == 0 {
            anyhow::bail!("Pinning timeout_secs must be > 0");
        }

        if self.metadata.image_base_url.trim().is_empty() {
            anyhow::bail!("Metadata image_base_url cannot be empty");
        }

        if self.server.host.trim().is_empty() {
            anyhow::bail!("Server host cannot be empty");
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            anyhow::bail!(
                "Logging level must be one of: {} (got '{}')",
                valid_levels.join(", "),
                self.logging.level
            );
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            anyhow::bail!(
                "Logging format must be one of: {} (got '{}')",
                valid_formats.join(", "),
                self.logging.format
            );
        }

        Ok(())
    }

    /// Oracle private key with a `0x` prefix.
    pub fn oracle_private_key_with_prefix(&self) -> String {
        let key = self.oracle.private_key.trim().trim_start_matches("0x");
        format!("0x{}", key)
    }
}

/// Replace `${VAR_NAME}` placeholders with environment values.
///
/// Expansion stops at a `#` that starts a comment; a `#` inside a quoted
/// string does not. A referenced variable that is unset is an error.
fn expand_env_vars(input: &str) -> Result<String> {
    let mut result = String::with_capacity(input.len());

    for (line_no, line) in input.split_inclusive('\n').enumerate() {
        let (code, comment) = split_comment(line);
        let mut rest = code;

        while let Some(start) = rest.find("${") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after.find('}').with_context(|| {
                format!(
                    "Unclosed environment variable placeholder on line {}",
                    line_no + 1
                )
            })?;

            let name = &after[..end];
            if name.is_empty() {
                anyhow::bail!("Empty environment variable name on line {}", line_no + 1);
            }
            let value = std::env::var(name).with_context(|| {
                format!(
                    "Environment variable '{}' is not set (referenced on line {})",
                    name,
                    line_no + 1
                )
            })?;
            result.push_str(&value);
            rest = &after[end + 1..];
        }

        result.push_str(rest);
        result.push_str(comment);
    }

    Ok(result)
}

/// Split a line at the first `#` outside single or double quotes.
fn split_comment(line: &str) -> (&str, &str) {
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (idx, ch) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, ch) {
            (Some('"'), '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (None, '"') | (None, '\'') => quote = Some(ch),
            (None, '#') => return line.split_at(idx),
            _ => {}
        }
    }

    (line, "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const KEY: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

    fn sample_toml(private_key: &str) -> String {
        format!(
            r#"
[network]
rpc_url = "http://localhost:8545"
chain_id = 8453

[contracts]
relation_nft = "0x1111111111111111111111111111111111111111"

[oracle]
private_key = "{}"

[pinning]
api_key = "pinata-key"
secret_api_key = "pinata-secret"
"#,
            private_key
        )
    }

    #[test]
    fn test_default_values() {
        let config = Config::from_toml_str(&sample_toml(KEY)).unwrap();

        assert_eq!(config.network.chain_id, 8453);
        assert_eq!(
            config.pinning.api_url,
            "https://api.pinata.cloud/pinning/pinJSONToIPFS"
        );
        assert_eq!(config.pinning.timeout_secs, 30);
        assert_eq!(config.metadata.image_base_url, "https://via.placeholder.com");
        assert_eq!(config.metadata.platform, "Farcaster");
        assert_eq!(config.server.bind_addr(), "0.0.0.0:3000");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_validation_empty_rpc_url() {
        let toml = sample_toml(KEY).replace("http://localhost:8545", "");
        let err = Config::from_toml_str(&toml).unwrap_err();
        assert!(err.to_string().contains("RPC URL"));
    }

    #[test]
    fn test_validation_zero_contract_address() {
        let toml = sample_toml(KEY).replace(
            "0x1111111111111111111111111111111111111111",
            "0x0000000000000000000000000000000000000000",
        );
        let err = Config::from_toml_str(&toml).unwrap_err();
        assert!(err.to_string().contains("relation_nft"));
    }

    #[test]
    fn test_validation_invalid_private_key() {
        let err = Config::from_toml_str(&sample_toml("invalid")).unwrap_err();
        assert!(err.to_string().contains("private_key"));

        let not_hex = "z".repeat(64);
        let err = Config::from_toml_str(&sample_toml(&not_hex)).unwrap_err();
        assert!(err.to_string().contains("valid hex"));
    }

    #[test]
    fn test_validation_missing_pinning_credentials() {
        let toml = sample_toml(KEY).replace("pinata-secret", "");
        let err = Config::from_toml_str(&toml).unwrap_err();
        assert!(err.to_string().contains("secret_api_key"));
    }

    #[test]
    fn test_validation_logging_format() {
        let toml = format!("{}\n[logging]\nformat = \"xml\"\n", sample_toml(KEY));
        let err = Config::from_toml_str(&toml).unwrap_err();
        assert!(err.to_string().contains("Logging format"));
    }

    #[test]
    fn test_private_key_with_prefix() {
        let config = Config::from_toml_str(&sample_toml(&format!("0x{}", KEY))).unwrap();
        assert_eq!(config.oracle_private_key_with_prefix(), format!("0x{}", KEY));
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let config = Config::from_toml_str(&sample_toml(KEY)).unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains(KEY));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("RNFT_TEST_VAR1", "foo");
        std::env::set_var("RNFT_TEST_VAR2", "bar");

        let result = expand_env_vars("${RNFT_TEST_VAR1} and ${RNFT_TEST_VAR2}").unwrap();
        assert_eq!(result, "foo and bar");

        let result = expand_env_vars("no variables here").unwrap();
        assert_eq!(result, "no variables here");

        std::env::remove_var("RNFT_TEST_VAR1");
        std::env::remove_var("RNFT_TEST_VAR2");
    }

    #[test]
    fn test_expand_env_vars_errors() {
        let err = expand_env_vars("value = \"${RNFT_UNDEFINED_12345}\"").unwrap_err();
        assert!(err.to_string().contains("RNFT_UNDEFINED_12345"));

        let err = expand_env_vars("value = \"${}\"").unwrap_err();
        assert!(err.to_string().contains("Empty"));

        let err = expand_env_vars("value = \"${UNCLOSED").unwrap_err();
        assert!(err.to_string().contains("Unclosed"));
    }

    #[test]
    fn test_expand_env_vars_ignores_comments() {
        std::env::set_var("RNFT_TEST_KEY", "secret");

        let input = r#"
# Example: private_key = "${ORACLE_PRIVATE_KEY}"
key = "${RNFT_TEST_KEY}"  # or use ${OTHER_VAR}
url = "https://example.com/#${RNFT_TEST_KEY}"
"#;
        let result = expand_env_vars(input).unwrap();

        assert!(result.contains("key = \"secret\""));
        assert!(result.contains("https://example.com/#secret"));
        assert!(result.contains("${ORACLE_PRIVATE_KEY}"));
        assert!(result.contains("${OTHER_VAR}"));

        std::env::remove_var("RNFT_TEST_KEY");
    }

    #[test]
    fn test_split_comment_respects_quotes() {
        assert_eq!(split_comment("a = 1 # c"), ("a = 1 ", "# c"));
        assert_eq!(split_comment("a = '#x' # c"), ("a = '#x' ", "# c"));
        assert_eq!(split_comment(r##"a = "\"#" # c"##), (r##"a = "\"#" "##, "# c"));
        assert_eq!(split_comment("a = 1"), ("a = 1", ""));
    }

    #[test]
    fn test_from_file_with_env_vars() {
        std::env::set_var("RNFT_TEST_ORACLE_KEY", KEY);
        std::env::set_var("RNFT_TEST_RPC", "https://base.example.com");

        let contents = sample_toml("${RNFT_TEST_ORACLE_KEY}")
            .replace("http://localhost:8545", "${RNFT_TEST_RPC}");
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.network.rpc_url, "https://base.example.com");
        assert_eq!(config.oracle.private_key, KEY);

        std::env::remove_var("RNFT_TEST_ORACLE_KEY");
        std::env::remove_var("RNFT_TEST_RPC");
    }

    #[test]
    fn test_from_file_missing() {
        let err = Config::from_file("/nonexistent/relationnft.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
