//! Flat-file JSON storage for identities, credentials, registries and
//! introduction records.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use vlei_core::{Credential, Identity, IntroductionRecord, Registry};
use vlei_credentials::CredentialGraph;

/// Collection file names.
const IDENTITIES_FILE: &str = "identities.json";
const CREDENTIALS_FILE: &str = "credentials.json";
const REGISTRIES_FILE: &str = "registries.json";
const CONNECTIONS_FILE: &str = "connections.json";

const ALL_FILES: [&str; 4] = [
    IDENTITIES_FILE,
    CREDENTIALS_FILE,
    REGISTRIES_FILE,
    CONNECTIONS_FILE,
];

/// Upsert-by-key collections, each a pretty-printed JSON array. Writes are
/// last-write-wins; the lock only serializes writers inside this process.
pub struct Storage {
    data_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl Storage {
    /// Open or create the data directory.
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("creating data directory {}", path.display()))?;
        Ok(Self {
            data_dir: path.to_path_buf(),
            write_lock: Mutex::new(()),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn load<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>> {
        let path = self.data_dir.join(file);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let contents =
            std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
    }

    fn store<T: Serialize>(&self, file: &str, items: &[T]) -> Result<()> {
        let path = self.data_dir.join(file);
        let contents = serde_json::to_string_pretty(items)?;
        std::fs::write(&path, contents).with_context(|| format!("writing {}", path.display()))
    }

    fn upsert<T, F>(&self, file: &str, item: &T, key: F) -> Result<()>
    where
        T: Serialize + DeserializeOwned + Clone,
        F: Fn(&T) -> &str,
    {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("storage write lock poisoned"))?;
        let mut items: Vec<T> = self.load(file)?;
        match items.iter().position(|existing| key(existing) == key(item)) {
            Some(index) => items[index] = item.clone(),
            None => items.push(item.clone()),
        }
        self.store(file, &items)
    }

    pub fn save_identity(&self, identity: &Identity) -> Result<()> {
        self.upsert(IDENTITIES_FILE, identity, |i| &i.alias)?;
        tracing::debug!(alias = %identity.alias, prefix = %identity.prefix, "identity saved");
        Ok(())
    }

    pub fn save_credential(&self, credential: &Credential) -> Result<()> {
        self.upsert(CREDENTIALS_FILE, credential, |c| &c.said)?;
        tracing::debug!(said = %credential.said, kind = %credential.credential_type, "credential saved");
        Ok(())
    }

    pub fn save_registry(&self, registry: &Registry) -> Result<()> {
        self.upsert(REGISTRIES_FILE, registry, |r| &r.identifier)
    }

    pub fn save_introduction(&self, record: &IntroductionRecord) -> Result<()> {
        self.upsert(CONNECTIONS_FILE, record, |r| &r.alias)
    }

    pub fn identities(&self) -> Result<Vec<Identity>> {
        self.load(IDENTITIES_FILE)
    }

    pub fn credentials(&self) -> Result<Vec<Credential>> {
        self.load(CREDENTIALS_FILE)
    }

    pub fn registries(&self) -> Result<Vec<Registry>> {
        self.load(REGISTRIES_FILE)
    }

    pub fn introductions(&self) -> Result<Vec<IntroductionRecord>> {
        self.load(CONNECTIONS_FILE)
    }

    pub fn identity(&self, alias: &str) -> Result<Option<Identity>> {
        Ok(self.identities()?.into_iter().find(|i| i.alias == alias))
    }

    pub fn credential(&self, said: &str) -> Result<Option<Credential>> {
        Ok(self.credentials()?.into_iter().find(|c| c.said == said))
    }

    /// Load everything into a verification view.
    pub fn graph(&self) -> Result<CredentialGraph> {
        Ok(CredentialGraph::new(self.identities()?, self.credentials()?))
    }

    /// Delete every collection file.
    pub fn clear_all(&self) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("storage write lock poisoned"))?;
        for file in ALL_FILES {
            let path = self.data_dir.join(file);
            if path.exists() {
                std::fs::remove_file(&path)
                    .with_context(|| format!("removing {}", path.display()))?;
            }
        }
        tracing::info!(data_dir = %self.data_dir.display(), "storage cleared");
        Ok(())
    }
}
