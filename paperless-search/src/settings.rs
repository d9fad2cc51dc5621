//! Plugin settings
//!
//! Settings live in the host's key/value configuration store. They are read
//! through [`ConfigSource`] and written through [`ConfigSink`], one key per
//! field, using the names in [`SettingKey`].
//!
//! A key that is absent from the store takes its default. A key that is
//! present is always honored, including `false`, `0` and `""`, unless it is
//! out of range: then it is logged and the default is kept.
//!
//! Changing settings at runtime goes through `PaperlessSearch::apply_settings`,
//! which uses [`SettingsChange`] to decide which side effects to run.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};
use tracing::warn;

use crate::{
    DEFAULT_DOWNLOAD_PATH, DEFAULT_INSTANCE_URL, Result,
    auth::{Credentials, Secret},
    config::{
        DEFAULT_CACHE_LENGTH_MINUTES, DEFAULT_PAGE_SIZE, DEFAULT_QUERY_DELAY_MS,
        DEFAULT_RESULT_LIMIT, MAX_CACHE_LENGTH_MINUTES, MAX_PAGE_SIZE,
    },
    error::PaperlessError,
};

/// Read access to the host's configuration store.
pub trait ConfigSource {
    fn read_string(&self, key: &str) -> Option<String>;
    fn read_bool(&self, key: &str) -> Option<bool>;
    fn read_int(&self, key: &str) -> Option<i64>;
}

/// Write access to the host's configuration store.
pub trait ConfigSink {
    fn write(&mut self, key: &str, value: &SettingValue);
}

/// Which document fields, besides the title, contribute to the filter string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterToggles {
    pub tags: bool,
    pub document_type: bool,
    pub correspondent: bool,
    pub body: bool,
}

impl Default for FilterToggles {
    fn default() -> Self {
        Self {
            tags: true,
            document_type: true,
            correspondent: true,
            body: false,
        }
    }
}

/// Names of the persisted settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum SettingKey {
    InstanceUrl,
    ApiToken,
    Username,
    Password,
    DownloadPath,
    FilterByTags,
    FilterByType,
    FilterByCorrespondent,
    FilterByBody,
    CacheResults,
    CacheLength,
    AutoCache,
    PageSize,
    ResultLimit,
    QueryDelay,
}

/// Storage type of a setting
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingKind {
    String,
    Bool,
    Int,
}

impl SettingKey {
    pub fn kind(self) -> SettingKind {
        match self {
            Self::InstanceUrl
            | Self::ApiToken
            | Self::Username
            | Self::Password
            | Self::DownloadPath => SettingKind::String,
            Self::FilterByTags
            | Self::FilterByType
            | Self::FilterByCorrespondent
            | Self::FilterByBody
            | Self::CacheResults
            | Self::AutoCache => SettingKind::Bool,
            Self::CacheLength | Self::PageSize | Self::ResultLimit | Self::QueryDelay => {
                SettingKind::Int
            }
        }
    }

    /// True for keys holding credentials, which are masked when displayed.
    pub fn is_secret(self) -> bool {
        matches!(self, Self::ApiToken | Self::Password)
    }
}

/// A typed setting value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    String(String),
}

impl SettingValue {
    /// Parses user input (e.g. from a command line) for a setting of the given kind.
    pub fn parse(kind: SettingKind, text: &str) -> Result<Self> {
        match kind {
            SettingKind::String => Ok(Self::String(text.to_string())),
            SettingKind::Bool => match text.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(Self::Bool(true)),
                "false" | "no" | "off" | "0" => Ok(Self::Bool(false)),
                other => Err(PaperlessError::Config {
                    message: format!("expected a boolean, got '{other}'"),
                }),
            },
            SettingKind::Int => text
                .trim()
                .parse::<i64>()
                .map(Self::Int)
                .map_err(|e| PaperlessError::Config {
                    message: format!("expected an integer, got '{text}': {e}"),
                }),
        }
    }
}

impl std::fmt::Display for SettingValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

/// All plugin settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Base url of the Paperless instance
    pub instance_url: String,
    /// Api token. When set, it is used instead of username/password.
    pub api_token: Secret,
    pub username: String,
    pub password: Secret,
    /// Directory for downloaded documents. `~` is expanded.
    pub download_path: String,
    pub filters: FilterToggles,
    /// Keep a snapshot of enriched documents between queries
    pub cache_results: bool,
    /// Snapshot lifetime and background refresh period, in minutes
    pub cache_length: u32,
    /// Refresh the snapshot periodically in the background
    pub auto_cache: bool,
    /// Records requested per page
    pub page_size: u32,
    /// Maximum number of items returned for one query
    pub result_limit: usize,
    /// Typing delay before a triggered query that needs the network, in milliseconds
    pub query_delay: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            instance_url: DEFAULT_INSTANCE_URL.to_string(),
            api_token: Secret::default(),
            username: String::new(),
            password: Secret::default(),
            download_path: DEFAULT_DOWNLOAD_PATH.to_string(),
            filters: FilterToggles::default(),
            cache_results: true,
            cache_length: DEFAULT_CACHE_LENGTH_MINUTES,
            auto_cache: false,
            page_size: DEFAULT_PAGE_SIZE,
            result_limit: DEFAULT_RESULT_LIMIT,
            query_delay: DEFAULT_QUERY_DELAY_MS,
        }
    }
}

impl Settings {
    /// Reads settings from the host store. Keys that are not set, or hold an
    /// invalid value, keep their defaults.
    pub fn load(source: &dyn ConfigSource) -> Self {
        let mut settings = Self::default();
        for key in SettingKey::iter() {
            let name: &'static str = key.into();
            let value = match key.kind() {
                SettingKind::String => source.read_string(name).map(SettingValue::String),
                SettingKind::Bool => source.read_bool(name).map(SettingValue::Bool),
                SettingKind::Int => source.read_int(name).map(SettingValue::Int),
            };
            if let Some(value) = value
                && let Err(e) = settings.set(key, value)
            {
                warn!("ignoring stored setting: {e}");
            }
        }
        settings
    }

    /// Writes every setting to the host store.
    pub fn save(&self, sink: &mut dyn ConfigSink) {
        for key in SettingKey::iter() {
            sink.write(key.into(), &self.get(key));
        }
    }

    pub fn get(&self, key: SettingKey) -> SettingValue {
        use SettingValue::{Bool, Int, String as Str};
        match key {
            SettingKey::InstanceUrl => Str(self.instance_url.clone()),
            SettingKey::ApiToken => Str(self.api_token.expose().to_string()),
            SettingKey::Username => Str(self.username.clone()),
            SettingKey::Password => Str(self.password.expose().to_string()),
            SettingKey::DownloadPath => Str(self.download_path.clone()),
            SettingKey::FilterByTags => Bool(self.filters.tags),
            SettingKey::FilterByType => Bool(self.filters.document_type),
            SettingKey::FilterByCorrespondent => Bool(self.filters.correspondent),
            SettingKey::FilterByBody => Bool(self.filters.body),
            SettingKey::CacheResults => Bool(self.cache_results),
            SettingKey::CacheLength => Int(i64::from(self.cache_length)),
            SettingKey::AutoCache => Bool(self.auto_cache),
            SettingKey::PageSize => Int(i64::from(self.page_size)),
            SettingKey::ResultLimit => Int(i64::try_from(self.result_limit).unwrap_or(i64::MAX)),
            SettingKey::QueryDelay => Int(i64::try_from(self.query_delay).unwrap_or(i64::MAX)),
        }
    }

    /// Sets one field. Fails if the value has the wrong kind or is out of range.
    pub fn set(&mut self, key: SettingKey, value: SettingValue) -> Result<()> {
        use SettingValue::{Bool, Int, String as Str};
        match (key, value) {
            (SettingKey::InstanceUrl, Str(s)) => self.instance_url = s.trim_end_matches('/').to_string(),
            (SettingKey::ApiToken, Str(s)) => self.api_token = Secret::new(s),
            (SettingKey::Username, Str(s)) => self.username = s,
            (SettingKey::Password, Str(s)) => self.password = Secret::new(s),
            (SettingKey::DownloadPath, Str(s)) => self.download_path = s,
            (SettingKey::FilterByTags, Bool(b)) => self.filters.tags = b,
            (SettingKey::FilterByType, Bool(b)) => self.filters.document_type = b,
            (SettingKey::FilterByCorrespondent, Bool(b)) => self.filters.correspondent = b,
            (SettingKey::FilterByBody, Bool(b)) => self.filters.body = b,
            (SettingKey::CacheResults, Bool(b)) => self.cache_results = b,
            (SettingKey::AutoCache, Bool(b)) => self.auto_cache = b,
            (SettingKey::CacheLength, Int(i)) => {
                self.cache_length = int_in_range(key, i, 1, MAX_CACHE_LENGTH_MINUTES)?;
            }
            (SettingKey::PageSize, Int(i)) => {
                self.page_size = int_in_range(key, i, 1, i64::from(MAX_PAGE_SIZE))?;
            }
            (SettingKey::ResultLimit, Int(i)) => self.result_limit = int_in_range(key, i, 1, 10_000)?,
            (SettingKey::QueryDelay, Int(i)) => self.query_delay = int_in_range(key, i, 0, 10_000)?,
            (key, value) => {
                return Err(PaperlessError::Config {
                    message: format!("{key} expects a {:?} value, got {value:?}", key.kind()),
                });
            }
        }
        Ok(())
    }

    /// Checks settings that cannot be validated field by field.
    pub fn validate(&self) -> Result<()> {
        if !(self.instance_url.starts_with("http://") || self.instance_url.starts_with("https://"))
        {
            return Err(PaperlessError::Config {
                message: format!(
                    "instance_url must start with http:// or https://, got '{}'",
                    self.instance_url
                ),
            });
        }
        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::from_parts(&self.api_token, &self.username, &self.password)
    }

    /// Download directory with `~` and environment variables expanded.
    pub fn download_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::full(&self.download_path).map_or_else(
            |_| shellexpand::tilde(&self.download_path).into_owned(),
            std::borrow::Cow::into_owned,
        ))
    }

    pub fn cache_length(&self) -> std::time::Duration {
        std::time::Duration::from_secs(u64::from(self.cache_length) * 60)
    }

    /// True if the background refresher should be running.
    pub fn scheduler_enabled(&self) -> bool {
        self.cache_results && self.auto_cache
    }
}

fn int_in_range<T: TryFrom<i64>>(key: SettingKey, value: i64, min: i64, max: i64) -> Result<T> {
    if value < min || value > max {
        return Err(PaperlessError::Config {
            message: format!("{key} must be between {min} and {max}, got {value}"),
        });
    }
    T::try_from(value).map_err(|_| PaperlessError::Config {
        message: format!("{key} out of range: {value}"),
    })
}

/// What changed between two settings, in terms of the side effects it requires.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SettingsChange {
    /// Instance url or credentials changed: the http client must be rebuilt
    pub connection: bool,
    /// Filter toggles changed: filter strings must be rebuilt
    pub filters: bool,
    /// Caching was turned off: the snapshot and its file must be dropped
    pub cache_disabled: bool,
    /// Snapshot lifetime changed: the current snapshot expires now
    pub cache_length: bool,
    /// The scheduler must be stopped, and restarted if still enabled
    pub scheduler: bool,
}

impl SettingsChange {
    pub fn between(old: &Settings, new: &Settings) -> Self {
        let connection = old.instance_url != new.instance_url || old.credentials() != new.credentials();
        Self {
            connection,
            filters: old.filters != new.filters,
            cache_disabled: old.cache_results && !new.cache_results,
            cache_length: old.cache_length != new.cache_length,
            scheduler: old.scheduler_enabled() != new.scheduler_enabled()
                || (new.scheduler_enabled() && old.cache_length != new.cache_length),
        }
    }

    /// True if the published snapshot no longer reflects the settings.
    pub fn invalidates_snapshot(&self) -> bool {
        self.connection || self.filters || self.cache_length || self.cache_disabled
    }
}
