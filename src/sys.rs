use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api;
use crate::http::{ApiClient, ApiResult};
use crate::storage::{LANG_KEY, SYS_CONFIG_KEY, Storage};
use crate::types::SysConfig;

/// Interface language.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    #[default]
    En,
    Cn,
}

impl Lang {
    pub const ALL: [Lang; 2] = [Lang::En, Lang::Cn];

    pub fn code(self) -> &'static str {
        match self {
            Lang::En => "en",
            Lang::Cn => "cn",
        }
    }

    /// Name shown in the language picker.
    pub fn label(self) -> &'static str {
        match self {
            Lang::En => "English",
            Lang::Cn => "繁體中文",
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Lang {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Lang::ALL
            .into_iter()
            .find(|l| l.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unsupported language {s}"))
    }
}

/// Backend system configuration, cached in storage between runs, plus the
/// user's language preference.
pub struct SysStore {
    storage: Arc<Storage>,
    config: RwLock<Option<SysConfig>>,
}

impl SysStore {
    pub fn new(storage: Arc<Storage>) -> Self {
        let config = storage.get::<SysConfig>(SYS_CONFIG_KEY);
        Self {
            storage,
            config: RwLock::new(config),
        }
    }

    /// Last known config, possibly from a previous run.
    pub fn config(&self) -> Option<SysConfig> {
        self.config.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Re-fetch `/sys/info`. An empty response keeps the cached value.
    pub async fn refresh(&self, client: &ApiClient) -> ApiResult<Option<SysConfig>> {
        let Some(config) = api::get_sys_config(client).await? else {
            debug!("sys config response was empty, keeping cache");
            return Ok(self.config());
        };
        if let Err(e) = self.storage.set(SYS_CONFIG_KEY, &config) {
            tracing::warn!("failed to cache sys config: {e:#}");
        }
        *self.config.write().unwrap_or_else(|e| e.into_inner()) = Some(config.clone());
        Ok(Some(config))
    }

    pub fn lang(&self) -> Lang {
        self.storage.get::<Lang>(LANG_KEY).unwrap_or_default()
    }

    pub fn set_lang(&self, lang: Lang) -> Result<()> {
        self.storage.set(LANG_KEY, &lang)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ArticleSource;

    #[test]
    fn lang_round_trips_through_storage() {
        let storage = Arc::new(Storage::in_memory());
        let sys = SysStore::new(storage.clone());
        assert_eq!(sys.lang(), Lang::En);

        sys.set_lang(Lang::Cn).unwrap();
        assert_eq!(sys.lang(), Lang::Cn);
        assert_eq!(storage.get::<String>(LANG_KEY).as_deref(), Some("cn"));
    }

    #[test]
    fn lang_parsing() {
        assert_eq!("CN".parse::<Lang>().unwrap(), Lang::Cn);
        assert_eq!(" en ".parse::<Lang>().unwrap(), Lang::En);
        assert!("fr".parse::<Lang>().is_err());
        assert_eq!(Lang::Cn.label(), "繁體中文");
    }

    #[test]
    fn restores_cached_config() {
        let storage = Arc::new(Storage::in_memory());
        let cached = SysConfig {
            article_sources: vec![ArticleSource::Binance],
            tags: vec!["meme".into()],
            ..Default::default()
        };
        storage.set(SYS_CONFIG_KEY, &cached).unwrap();

        let sys = SysStore::new(storage);
        assert_eq!(sys.config(), Some(cached));
    }

    #[test]
    fn empty_without_cache() {
        let sys = SysStore::new(Arc::new(Storage::in_memory()));
        assert_eq!(sys.config(), None);
    }
}
