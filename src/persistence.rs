use {
    crate::{error::PersistenceError, types::Product},
    serde::{Deserialize, Serialize},
    std::{
        fs,
        io::Write,
        path::{Path, PathBuf},
        sync::Mutex,
    },
    tempfile::NamedTempFile,
};

/// Snapshot of the product identity mapping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub products: Vec<Product>,
    pub timestamp: i64,
}

/// JSON file holding the product identity mapping.
///
/// Writes go to a temporary file in the same directory which is then renamed
/// over the cache, so readers see either the old mapping or the new one.
pub struct ProductStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ProductStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted mapping; a missing file is an empty mapping.
    pub fn load(&self) -> Result<Vec<Product>, PersistenceError> {
        if !self.path.exists() {
            log::info!("No existing product cache found: {}", self.path.display());
            return Ok(Vec::new());
        }

        let json = fs::read_to_string(&self.path).map_err(|e| PersistenceError::io(&self.path, e))?;
        let snapshot: ProductSnapshot = serde_json::from_str(&json)?;

        log::info!(
            "Loaded {} products from {}",
            snapshot.products.len(),
            self.path.display()
        );
        Ok(snapshot.products)
    }

    /// Replace the persisted mapping, all or nothing.
    pub fn save(&self, products: &[Product]) -> Result<(), PersistenceError> {
        let snapshot = ProductSnapshot {
            products: products.to_vec(),
            timestamp: chrono::Utc::now().timestamp(),
        };
        let json = serde_json::to_string_pretty(&snapshot)?;

        let _guard = self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| PersistenceError::io(&dir, e))?;
        tmp.write_all(json.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| PersistenceError::io(tmp.path(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| PersistenceError::io(&self.path, e.error))?;

        log::debug!("Saved {} products to {}", products.len(), self.path.display());
        Ok(())
    }
}

/// Build the tracked product list from configuration and the persisted cache.
///
/// Configuration decides which products are tracked and in which order; the
/// cache only contributes resolved identities. Cached entries for another
/// locale are ignored because SKUs differ per store.
pub fn merge_tracked(configured: &[String], locale: &str, persisted: Vec<Product>) -> Vec<Product> {
    configured
        .iter()
        .map(|watch| {
            persisted
                .iter()
                .find(|p| p.watch.eq_ignore_ascii_case(watch) && p.locale == locale)
                .cloned()
                .unwrap_or_else(|| Product::new(watch, locale))
        })
        .collect()
}
