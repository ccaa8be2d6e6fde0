use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{OnceLock, RwLock};

use crate::errors::GenerationError;

#[derive(Debug, Clone)]
enum AssetEntry {
    Lines(Vec<String>),
    Missing,
}

/// Cached reader for the bundled word lists and place tables.
///
/// Missing files are remembered as missing so callers can fall back to
/// `fake` data without hitting the filesystem again.
#[derive(Debug)]
pub struct AssetsLoader {
    root: PathBuf,
    cache: RwLock<BTreeMap<String, AssetEntry>>,
}

impl AssetsLoader {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            cache: RwLock::new(BTreeMap::new()),
        }
    }

    /// Non-empty, trimmed lines of an asset. `#` starts a comment line.
    pub fn load_lines(&self, relative: &str) -> Result<Vec<String>, GenerationError> {
        if let Some(entry) = self.cached(relative) {
            return Ok(entry);
        }

        let path = self.root.join(relative);
        let entry = Self::read_lines(&path)?;

        let mut cache = self
            .cache
            .write()
            .map_err(|_| GenerationError::Asset("asset cache poisoned".to_string()))?;
        let values = match &entry {
            AssetEntry::Lines(values) => values.clone(),
            AssetEntry::Missing => Vec::new(),
        };
        cache.insert(relative.to_string(), entry);
        Ok(values)
    }

    /// Rows of a `|`-separated table; every row must have `columns` fields.
    pub fn load_table(
        &self,
        relative: &str,
        columns: usize,
    ) -> Result<Vec<Vec<String>>, GenerationError> {
        self.load_lines(relative)?
            .into_iter()
            .enumerate()
            .map(|(index, line)| {
                let fields: Vec<String> = line.split('|').map(|f| f.trim().to_string()).collect();
                if fields.len() != columns {
                    return Err(GenerationError::Asset(format!(
                        "{relative}: row {} has {} fields, expected {columns}",
                        index + 1,
                        fields.len()
                    )));
                }
                Ok(fields)
            })
            .collect()
    }

    pub fn asset_missing(&self, relative: &str) -> bool {
        let cache = self.cache.read().ok();
        if let Some(cache) = cache
            && let Some(AssetEntry::Missing) = cache.get(relative)
        {
            return true;
        }
        false
    }

    fn cached(&self, relative: &str) -> Option<Vec<String>> {
        let cache = self.cache.read().ok()?;
        match cache.get(relative)? {
            AssetEntry::Lines(values) => Some(values.clone()),
            AssetEntry::Missing => Some(Vec::new()),
        }
    }

    fn read_lines(path: &Path) -> Result<AssetEntry, GenerationError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(AssetEntry::Missing);
            }
            Err(err) => {
                return Err(GenerationError::Asset(format!(
                    "failed to read asset {}: {}",
                    path.display(),
                    err
                )));
            }
        };

        Ok(AssetEntry::Lines(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string)
                .collect(),
        ))
    }
}

pub fn assets_loader() -> &'static AssetsLoader {
    static LOADER: OnceLock<AssetsLoader> = OnceLock::new();
    LOADER.get_or_init(|| {
        let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets");
        AssetsLoader::new(root)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_name_lists_load() {
        let names = assets_loader()
            .load_lines("en_US/first_names_female.txt")
            .expect("load names");
        assert!(!names.is_empty());
        assert!(names.iter().all(|name| !name.starts_with('#')));
    }

    #[test]
    fn missing_asset_is_remembered() {
        let loader = AssetsLoader::new(std::env::temp_dir().join("fauxtree-no-assets"));
        assert!(loader.load_lines("nope.txt").expect("missing ok").is_empty());
        assert!(loader.asset_missing("nope.txt"));
    }

    #[test]
    fn place_tables_have_three_columns() {
        for country in ["US", "DE", "BR"] {
            let rows = assets_loader()
                .load_table(&format!("places/{country}.txt"), 3)
                .expect("place table");
            assert!(rows.len() >= 20, "{country} has {} rows", rows.len());
        }
    }
}
