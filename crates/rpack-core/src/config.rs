use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration (loaded from rpack.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RpackConfig {
    pub workspace: WorkspaceConfig,
    pub secret: SecretConfig,
    pub archive: ArchiveConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Root directory under which all node/task state lives
    pub root: PathBuf,
    /// Name of the local node (scopes the directory tree)
    pub node_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretConfig {
    /// Minimum generated secret length in bytes
    pub min_len: usize,
    /// Maximum generated secret length in bytes
    pub max_len: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// zstd compression level applied to the packed archive
    pub zstd_level: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("~/.local/share/rpack"),
            node_name: "node".into(),
        }
    }
}

impl Default for SecretConfig {
    fn default() -> Self {
        Self {
            min_len: 16,
            max_len: 1024,
        }
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self { zstd_level: 3 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[workspace]
root = "/var/lib/rpack"
node_name = "worker-7"

[secret]
min_len = 32
max_len = 256

[archive]
zstd_level = 9

[logging]
level = "debug"
format = "json"
"#;
        let config: RpackConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.workspace.root, PathBuf::from("/var/lib/rpack"));
        assert_eq!(config.workspace.node_name, "worker-7");
        assert_eq!(config.secret.min_len, 32);
        assert_eq!(config.secret.max_len, 256);
        assert_eq!(config.archive.zstd_level, 9);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_parse_defaults() {
        let config: RpackConfig = toml::from_str("").unwrap();

        assert_eq!(config.secret.min_len, 16);
        assert_eq!(config.secret.max_len, 1024);
        assert_eq!(config.archive.zstd_level, 3);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "text");
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r#"
[secret]
max_len = 64
"#;
        let config: RpackConfig = toml::from_str(toml_str).unwrap();

        // Overridden
        assert_eq!(config.secret.max_len, 64);
        // Defaults
        assert_eq!(config.secret.min_len, 16);
        assert_eq!(config.workspace.node_name, "node");
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = RpackConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: RpackConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.workspace.root, parsed.workspace.root);
        assert_eq!(config.secret.min_len, parsed.secret.min_len);
        assert_eq!(config.archive.zstd_level, parsed.archive.zstd_level);
    }
}
