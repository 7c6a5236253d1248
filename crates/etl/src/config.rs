#![forbid(unsafe_code)]

use crate::error::ConfigError;
use bi_core::JobCategory;
use bi_core::ids::BranchName;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

const BUILDJSON_BASE: &str = "https://secure.pub.build.mozilla.org/builddata/buildjson";

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EtlConfig {
    pub storage_dir: PathBuf,
    pub buildapi: BuildapiUrls,
    pub http: HttpConfig,
    /// Lifetime of the per-feed dedup set.
    pub cache_ttl_secs: u64,
    /// Attempts a queued job gets before it is discarded.
    pub max_resolve_attempts: u32,
    /// Queue entries examined per drain.
    pub drain_limit: usize,
    pub repositories: Vec<RepositoryConfig>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BuildapiUrls {
    pub pending_url: String,
    pub running_url: String,
    pub builds4h_url: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RepositoryConfig {
    pub name: String,
    pub url: String,
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from(".bi_etl"),
            buildapi: BuildapiUrls::default(),
            http: HttpConfig::default(),
            cache_ttl_secs: 4 * 60 * 60,
            max_resolve_attempts: 5,
            drain_limit: 100,
            repositories: vec![RepositoryConfig {
                name: "mozilla-central".to_string(),
                url: "https://hg.mozilla.org/mozilla-central".to_string(),
            }],
        }
    }
}

impl Default for BuildapiUrls {
    fn default() -> Self {
        Self {
            pending_url: format!("{BUILDJSON_BASE}/builds-pending.js"),
            running_url: format!("{BUILDJSON_BASE}/builds-running.js"),
            builds4h_url: format!("{BUILDJSON_BASE}/builds-4hr.js"),
        }
    }
}

impl BuildapiUrls {
    pub fn url(&self, category: JobCategory) -> &str {
        match category {
            JobCategory::Pending => &self.pending_url,
            JobCategory::Running => &self.running_url,
            JobCategory::Completed => &self.builds4h_url,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            request_timeout_secs: 60,
            user_agent: concat!("bi_etl/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl EtlConfig {
    /// Reads `path` when given, otherwise starts from defaults. Missing keys
    /// keep their defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                toml::from_str(&data).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            None => Self::default(),
        };
        Ok(config)
    }

    /// Applies `BI_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(env_var)
    }

    /// Applies `BI_*` overrides from `lookup`; blank values count as unset.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(dir) = lookup("BI_STORAGE_DIR") {
            self.storage_dir = PathBuf::from(dir);
        }
        if let Some(url) = lookup("BI_PENDING_URL") {
            self.buildapi.pending_url = url;
        }
        if let Some(url) = lookup("BI_RUNNING_URL") {
            self.buildapi.running_url = url;
        }
        if let Some(url) = lookup("BI_BUILDS4H_URL") {
            self.buildapi.builds4h_url = url;
        }
        if let Some(raw) = lookup("BI_CACHE_TTL_SECS") {
            self.cache_ttl_secs = parse_number("BI_CACHE_TTL_SECS", &raw)?;
        }
        if let Some(raw) = lookup("BI_MAX_RESOLVE_ATTEMPTS") {
            self.max_resolve_attempts = parse_number("BI_MAX_RESOLVE_ATTEMPTS", &raw)?;
        }
        if let Some(raw) = lookup("BI_DRAIN_LIMIT") {
            self.drain_limit = parse_number("BI_DRAIN_LIMIT", &raw)?;
        }
        if let Some(raw) = lookup("BI_HTTP_CONNECT_TIMEOUT_SECS") {
            self.http.connect_timeout_secs = parse_number("BI_HTTP_CONNECT_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = lookup("BI_HTTP_REQUEST_TIMEOUT_SECS") {
            self.http.request_timeout_secs = parse_number("BI_HTTP_REQUEST_TIMEOUT_SECS", &raw)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_resolve_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_resolve_attempts must be at least 1".to_string(),
            ));
        }
        for category in JobCategory::ALL {
            if self.buildapi.url(category).trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "buildapi url for {category} must not be empty"
                )));
            }
        }
        for repository in &self.repositories {
            BranchName::try_new(repository.name.as_str()).map_err(|_| {
                ConfigError::Invalid(format!("invalid repository name {:?}", repository.name))
            })?;
            if repository.url.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "repository {} has an empty url",
                    repository.name
                )));
            }
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

fn parse_number<T: FromStr>(name: &str, raw: &str) -> Result<T, ConfigError> {
    raw.parse()
        .map_err(|_| ConfigError::Invalid(format!("{name}={raw:?} is not a valid number")))
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_are_valid() {
        let config = EtlConfig::load(None).expect("defaults");
        config.validate().expect("valid");
        assert_eq!(config.max_resolve_attempts, 5);
        assert!(config.buildapi.pending_url.ends_with("builds-pending.js"));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bi_etl.toml");
        fs::write(
            &path,
            r#"
storage_dir = "/var/lib/bi_etl"
drain_limit = 7

[buildapi]
pending_url = "file:///srv/builds-pending.json"

[[repositories]]
name = "try"
url = "https://hg.mozilla.org/try/"
"#,
        )
        .expect("write config");

        let config = EtlConfig::load(Some(&path)).expect("load");
        assert_eq!(config.storage_dir, PathBuf::from("/var/lib/bi_etl"));
        assert_eq!(config.drain_limit, 7);
        assert_eq!(config.buildapi.pending_url, "file:///srv/builds-pending.json");
        assert!(config.buildapi.running_url.ends_with("builds-running.js"));
        assert_eq!(config.repositories.len(), 1);
        assert_eq!(config.repositories[0].name, "try");
        assert_eq!(config.http.connect_timeout_secs, 10);
    }

    #[test]
    fn unreadable_and_malformed_files_are_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("absent.toml");
        assert!(matches!(
            EtlConfig::load(Some(&missing)),
            Err(ConfigError::Io { .. })
        ));

        let broken = dir.path().join("broken.toml");
        fs::write(&broken, "drain_limit = \"lots\"").expect("write config");
        assert!(matches!(
            EtlConfig::load(Some(&broken)),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn overrides_replace_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("BI_STORAGE_DIR", "/tmp/bi"),
            ("BI_BUILDS4H_URL", "file:///tmp/builds4h.json"),
            ("BI_MAX_RESOLVE_ATTEMPTS", "9"),
        ]);
        let mut config = EtlConfig::default();
        config
            .apply_overrides(|name| env.get(name).map(|v| v.to_string()))
            .expect("overrides");
        assert_eq!(config.storage_dir, PathBuf::from("/tmp/bi"));
        assert_eq!(config.buildapi.url(JobCategory::Completed), "file:///tmp/builds4h.json");
        assert_eq!(config.max_resolve_attempts, 9);
        assert_eq!(config.drain_limit, 100);
    }

    #[test]
    fn non_numeric_override_is_rejected() {
        let mut config = EtlConfig::default();
        let err = config
            .apply_overrides(|name| (name == "BI_DRAIN_LIMIT").then(|| "many".to_string()))
            .expect_err("invalid number");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn zero_attempt_budget_is_invalid() {
        let config = EtlConfig {
            max_resolve_attempts: 0,
            ..EtlConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
