//! Durable state: one JSON blob, read whole and replaced whole.
//!
//! No store here serializes concurrent read-modify-write cycles. Two check
//! runs that overlap between load and save can both send the same stage.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde_json::{Value, json};

use crate::error::StateStoreError;
use crate::http_client::http_client;

const GIST_API: &str = "https://api.github.com/gists";
const DEFAULT_GIST_FILE: &str = "match_state.json";
const DEFAULT_STATE_PATH: &str = "match_state.json";

pub trait StateStore {
    /// `Ok(None)` when nothing has been stored yet.
    fn load(&self) -> Result<Option<String>, StateStoreError>;
    fn save(&self, contents: &str) -> Result<(), StateStoreError>;
}

#[derive(Debug, Clone)]
pub enum StoreConfig {
    Gist {
        gist_id: String,
        token: String,
        file_name: String,
    },
    File {
        path: PathBuf,
    },
}

impl StoreConfig {
    /// A gist when `GIST_ID` and `GH_TOKEN` are both set, otherwise a local file.
    pub fn from_env() -> Self {
        let var = |key: &str| {
            env::var(key)
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        match (var("GIST_ID"), var("GH_TOKEN")) {
            (Some(gist_id), Some(token)) => StoreConfig::Gist {
                gist_id,
                token,
                file_name: var("GIST_FILE").unwrap_or_else(|| DEFAULT_GIST_FILE.to_string()),
            },
            _ => StoreConfig::File {
                path: PathBuf::from(
                    var("STATE_PATH").unwrap_or_else(|| DEFAULT_STATE_PATH.to_string()),
                ),
            },
        }
    }

    pub fn build(self) -> Box<dyn StateStore> {
        match self {
            StoreConfig::Gist {
                gist_id,
                token,
                file_name,
            } => Box::new(GistStore::new(gist_id, token, file_name)),
            StoreConfig::File { path } => Box::new(FileStore::new(path)),
        }
    }
}

/// One file inside a GitHub gist.
#[derive(Debug, Clone)]
pub struct GistStore {
    gist_id: String,
    token: String,
    file_name: String,
}

impl GistStore {
    pub fn new(gist_id: String, token: String, file_name: String) -> Self {
        Self {
            gist_id,
            token,
            file_name,
        }
    }

    fn url(&self) -> String {
        format!("{GIST_API}/{}", self.gist_id)
    }
}

impl StateStore for GistStore {
    fn load(&self) -> Result<Option<String>, StateStoreError> {
        let resp = http_client()?
            .get(self.url())
            .header(AUTHORIZATION, format!("token {}", self.token))
            .header(ACCEPT, "application/vnd.github+json")
            .send()?;
        let status = resp.status();
        let body = resp.text()?;
        if !status.is_success() {
            return Err(StateStoreError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let root: Value = serde_json::from_str(&body)?;
        Ok(root
            .get("files")
            .and_then(|files| files.get(&self.file_name))
            .and_then(|file| file.get("content"))
            .and_then(|content| content.as_str())
            .map(|content| content.to_string()))
    }

    fn save(&self, contents: &str) -> Result<(), StateStoreError> {
        let mut files = serde_json::Map::new();
        files.insert(self.file_name.clone(), json!({ "content": contents }));
        let payload = json!({ "files": files });
        let resp = http_client()?
            .patch(self.url())
            .header(AUTHORIZATION, format!("token {}", self.token))
            .header(ACCEPT, "application/vnd.github+json")
            .json(&payload)
            .send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(StateStoreError::Status {
                status: status.as_u16(),
                body: resp.text().unwrap_or_default(),
            });
        }
        Ok(())
    }
}

/// Local JSON file, replaced atomically through a temp file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for FileStore {
    fn load(&self) -> Result<Option<String>, StateStoreError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, contents: &str) -> Result<(), StateStoreError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// In-process store, for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    contents: Mutex<Option<String>>,
    saves: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            contents: Mutex::new(Some(contents.into())),
            saves: Mutex::new(0),
        }
    }

    pub fn contents(&self) -> Option<String> {
        self.contents.lock().ok().and_then(|c| c.clone())
    }

    /// Number of successful `save` calls.
    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|n| *n).unwrap_or(0)
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Result<Option<String>, StateStoreError> {
        self.contents
            .lock()
            .map(|c| c.clone())
            .map_err(|_| StateStoreError::Unavailable("memory store poisoned".to_string()))
    }

    fn save(&self, contents: &str) -> Result<(), StateStoreError> {
        let mut guard = self
            .contents
            .lock()
            .map_err(|_| StateStoreError::Unavailable("memory store poisoned".to_string()))?;
        *guard = Some(contents.to_string());
        if let Ok(mut saves) = self.saves.lock() {
            *saves += 1;
        }
        Ok(())
    }
}
