use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::address::Chain;
use crate::{API_BASE_ENV, DEFAULT_API_BASE, DEFAULT_NOTICE_DEBOUNCE_MS, DEFAULT_SESSION_EXPIRED_CODE};

/// Default config file path.
pub const CONFIG_PATH: &str = "config.toml";

/// Top-level application config deserialized from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub account: AccountConfig,
}

/// Backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Envelope code treated as "credential no longer valid".
    #[serde(default = "default_session_expired_code")]
    pub session_expired_code: i64,
    /// Debounce window for the session-expired notice, in milliseconds.
    #[serde(default = "default_notice_debounce_ms")]
    pub notice_debounce_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Location of the persisted key-value file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot username used to build deep links, without the leading `@`.
    #[serde(default)]
    pub bot_name: Option<String>,
}

/// Account credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Chain of the login key: `evm` or `solana`.
    #[serde(default = "default_account_chain")]
    pub chain: Chain,
    /// EVM: hex private key (0x optional). Solana: base58 secret key or a
    /// `solana-keygen` JSON byte array.
    #[serde(default)]
    pub private_key: Option<String>,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            chain: default_account_chain(),
            private_key: None,
        }
    }
}

fn default_account_chain() -> Chain {
    Chain::Evm
}

fn default_base_url() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_session_expired_code() -> i64 {
    DEFAULT_SESSION_EXPIRED_CODE
}

fn default_notice_debounce_ms() -> u64 {
    DEFAULT_NOTICE_DEBOUNCE_MS
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("monitor-storage.json")
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            session_expired_code: default_session_expired_code(),
            notice_debounce_ms: default_notice_debounce_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

impl AppConfig {
    /// Load config from the given TOML file path.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Load config if the file exists, otherwise fall back to defaults.
    /// `MONITOR_API_BASE` overrides the configured base URL in both cases.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            Self::load(path)?
        } else {
            Self::default()
        };
        if let Ok(base) = std::env::var(API_BASE_ENV) {
            if !base.trim().is_empty() {
                config.api.base_url = base.trim().to_string();
            }
        }
        Ok(config)
    }

    /// Write config to the given TOML file path.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("failed to serialize config")?;
        std::fs::write(path, contents)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.api.base_url, DEFAULT_API_BASE);
        assert_eq!(config.api.session_expired_code, 501);
        assert_eq!(config.api.notice_debounce_ms, 2_000);
        assert_eq!(config.storage.path, PathBuf::from("monitor-storage.json"));
        assert!(config.telegram.bot_name.is_none());
        assert!(config.account.private_key.is_none());
        assert_eq!(config.account.chain, Chain::Evm);
    }

    #[test]
    fn account_chain_names() {
        let config: AppConfig = toml::from_str("[account]\nchain = \"solana\"").unwrap();
        assert_eq!(config.account.chain, Chain::Solana);
        let config: AppConfig = toml::from_str("[account]\nchain = \"eip155\"").unwrap();
        assert_eq!(config.account.chain, Chain::Evm);
        assert!(toml::from_str::<AppConfig>("[account]\nchain = \"btc\"").is_err());
    }

    #[test]
    fn partial_sections_fill_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [api]
            base_url = "http://localhost:8080"
            session_expired_code = 401

            [telegram]
            bot_name = "AlertBot"
            "#,
        )
        .unwrap();
        assert_eq!(config.api.base_url, "http://localhost:8080");
        assert_eq!(config.api.session_expired_code, 401);
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.telegram.bot_name.as_deref(), Some("AlertBot"));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = AppConfig::default();
        config.account.private_key = Some("0xabc".to_string());
        config.account.chain = Chain::Solana;
        config.api.notice_debounce_ms = 500;
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.account.private_key.as_deref(), Some("0xabc"));
        assert_eq!(loaded.account.chain, Chain::Solana);
        assert_eq!(loaded.api.notice_debounce_ms, 500);
    }

    #[test]
    fn missing_file_is_an_error_for_load() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppConfig::load(&dir.path().join("nope.toml")).is_err());
    }
}
