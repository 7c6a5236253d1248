#![forbid(unsafe_code)]

use crate::config::{BuildapiUrls, HttpConfig};
use crate::error::FetchError;
use bi_core::JobCategory;
use serde_json::Value as JsonValue;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Loads JSON documents from `http(s)://` urls, `file://` urls or bare paths.
#[derive(Clone, Debug)]
pub struct Fetcher {
    client: reqwest::blocking::Client,
}

impl Fetcher {
    pub fn new(http: &HttpConfig) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(http.connect_timeout())
            .timeout(http.request_timeout())
            .user_agent(http.user_agent.as_str())
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client })
    }

    pub fn fetch_json(&self, url: &str) -> Result<JsonValue, FetchError> {
        let url = url.trim();
        if let Some(path) = url.strip_prefix("file://") {
            return read_json_file(Path::new(path), url);
        }
        if url.starts_with("http://") || url.starts_with("https://") {
            return self.get_json(url);
        }
        if url.is_empty() || url.contains("://") {
            return Err(FetchError::UnsupportedUrl(url.to_string()));
        }
        read_json_file(Path::new(url), url)
    }

    fn get_json(&self, url: &str) -> Result<JsonValue, FetchError> {
        debug!(%url, "GET");
        let http_err = |source| FetchError::Http {
            url: url.to_string(),
            source,
        };
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(http_err)?;
        let body = response.bytes().map_err(http_err)?;
        serde_json::from_slice(&body).map_err(|source| FetchError::Json {
            url: url.to_string(),
            source,
        })
    }
}

fn read_json_file(path: &Path, url: &str) -> Result<JsonValue, FetchError> {
    debug!(path = %path.display(), "reading document");
    let data = fs::read(path).map_err(|source| FetchError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&data).map_err(|source| FetchError::Json {
        url: url.to_string(),
        source,
    })
}

/// Where the raw document for a buildapi feed comes from.
pub trait JobSource {
    fn fetch(&self, category: JobCategory) -> Result<JsonValue, FetchError>;
}

pub struct BuildapiSource {
    fetcher: Fetcher,
    urls: BuildapiUrls,
}

impl BuildapiSource {
    pub fn new(fetcher: Fetcher, urls: BuildapiUrls) -> Self {
        Self { fetcher, urls }
    }

    pub fn url(&self, category: JobCategory) -> &str {
        self.urls.url(category)
    }
}

impl JobSource for BuildapiSource {
    fn fetch(&self, category: JobCategory) -> Result<JsonValue, FetchError> {
        self.fetcher.fetch_json(self.url(category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher() -> Fetcher {
        Fetcher::new(&HttpConfig::default()).expect("client")
    }

    #[test]
    fn reads_file_urls_and_bare_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("doc.json");
        fs::write(&path, r#"{"pending": {}}"#).expect("write");

        let by_url = fetcher()
            .fetch_json(&format!("file://{}", path.display()))
            .expect("file url");
        let by_path = fetcher()
            .fetch_json(&path.display().to_string())
            .expect("bare path");
        assert_eq!(by_url, by_path);
        assert!(by_url.get("pending").is_some());
    }

    #[test]
    fn missing_file_and_bad_json_are_distinct_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("absent.json");
        assert!(matches!(
            fetcher().fetch_json(&missing.display().to_string()),
            Err(FetchError::Io { .. })
        ));

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{not json").expect("write");
        assert!(matches!(
            fetcher().fetch_json(&broken.display().to_string()),
            Err(FetchError::Json { .. })
        ));
    }

    #[test]
    fn unknown_schemes_are_rejected() {
        assert!(matches!(
            fetcher().fetch_json("ftp://example.org/builds.json"),
            Err(FetchError::UnsupportedUrl(_))
        ));
        assert!(matches!(
            fetcher().fetch_json("   "),
            Err(FetchError::UnsupportedUrl(_))
        ));
    }
}
