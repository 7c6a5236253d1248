#![forbid(unsafe_code)]
#![allow(dead_code)]

use bi_core::Push;
use bi_core::ids::BranchName;
use bi_etl::{
    BuildapiSource, BuildapiUrls, FetchError, Fetcher, HttpConfig, IngestOptions, Ingestor,
    MemoryCache, PushSource, parse_pushlog, pushlog_url,
};
use bi_storage::{RepositoryRow, SqliteStore};
use serde_json::Value as JsonValue;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const CENTRAL: &str = "mozilla-central";
pub const CENTRAL_URL: &str = "https://hg.mozilla.org/mozilla-central";
pub const MISSING_REVISION: &str = "222222222222b344655ed7be9a408d2970a736c4";

pub type TestIngestor = Ingestor<BuildapiSource, StaticPushSource, MemoryCache>;

pub fn sample_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("sample_data")
        .join(name)
}

pub fn sample_url(name: &str) -> String {
    format!("file://{}", sample_path(name).display())
}

pub fn load_sample(name: &str) -> JsonValue {
    let data = std::fs::read(sample_path(name)).expect("read sample");
    serde_json::from_slice(&data).expect("sample json")
}

/// Feed urls pointing at sample documents; absent feeds point at a file that does not exist.
pub fn sample_urls(pending: Option<&str>, running: Option<&str>, builds4h: Option<&str>) -> BuildapiUrls {
    let url = |name: Option<&str>| sample_url(name.unwrap_or("absent.json"));
    BuildapiUrls {
        pending_url: url(pending),
        running_url: url(running),
        builds4h_url: url(builds4h),
    }
}

/// Serves pushlog documents by url and remembers every url asked for.
/// Unknown urls fail like an unreachable server.
#[derive(Default)]
pub struct StaticPushSource {
    responses: HashMap<String, JsonValue>,
    requested: RefCell<Vec<String>>,
}

impl StaticPushSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, url: impl Into<String>, document: JsonValue) -> Self {
        self.responses.insert(url.into(), document);
        self
    }

    /// The missing-revision push, answered for both the full and the short revision.
    pub fn with_missing_push() -> Self {
        let document = load_sample("pushlog-missing1.json");
        Self::new()
            .with_response(pushlog_url(CENTRAL_URL, MISSING_REVISION), document.clone())
            .with_response(pushlog_url(CENTRAL_URL, &MISSING_REVISION[..12]), document)
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.borrow().clone()
    }
}

impl PushSource for StaticPushSource {
    fn fetch_pushes(&self, repository: &RepositoryRow, revision: &str) -> Result<Vec<Push>, FetchError> {
        let url = pushlog_url(&repository.url, revision);
        self.requested.borrow_mut().push(url.clone());
        let Some(document) = self.responses.get(&url) else {
            return Err(FetchError::Io {
                path: PathBuf::from(&url),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        };
        let name = BranchName::try_new(repository.name.as_str())
            .map_err(|_| FetchError::InvalidRepository(repository.name.clone()))?;
        parse_pushlog(&name, document).map_err(|source| FetchError::Json { url, source })
    }
}

pub fn central() -> BranchName {
    BranchName::try_new(CENTRAL).expect("branch")
}

/// Registers mozilla-central and stores its 10 sample pushes (19 changesets).
pub fn seed_store(store: &mut SqliteStore) {
    store
        .repository_upsert(&central(), CENTRAL_URL)
        .expect("repository");
    let pushes = parse_pushlog(&central(), &load_sample("resultset_data.json")).expect("pushlog");
    assert_eq!(pushes.len(), 10);
    for push in &pushes {
        store.push_insert(push).expect("push");
    }
}

pub fn seeded_store(dir: &Path) -> SqliteStore {
    let mut store = SqliteStore::open(dir).expect("open store");
    seed_store(&mut store);
    store
}

pub fn ingestor(dir: &Path, urls: BuildapiUrls, pushes: StaticPushSource) -> TestIngestor {
    ingestor_with(dir, urls, pushes, IngestOptions::default())
}

pub fn ingestor_with(
    dir: &Path,
    urls: BuildapiUrls,
    pushes: StaticPushSource,
    options: IngestOptions,
) -> TestIngestor {
    let fetcher = Fetcher::new(&HttpConfig::default()).expect("client");
    Ingestor::new(
        seeded_store(dir),
        BuildapiSource::new(fetcher, urls),
        pushes,
        MemoryCache::new(),
        options,
    )
}
