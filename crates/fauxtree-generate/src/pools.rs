//! Finite resource pools: places shared by events and media claimed once.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use fauxtree_core::{Handle, MediaCategory, Place, PlaceType, Tone};
use rand::{Rng, RngCore};
use sha2::{Digest, Sha256};
use tracing::debug;
use walkdir::WalkDir;

use crate::errors::{GenerationError, PoolExhausted};
use crate::factory::EntityFactory;
use crate::locale::Locale;

const IMAGE_EXTENSIONS: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
];

/// One image file available for claiming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAsset {
    pub path: PathBuf,
    pub checksum: String,
    pub mime_type: String,
    pub category: MediaCategory,
    pub tone: Tone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaQuery {
    pub category: MediaCategory,
    pub tone: Tone,
}

impl MediaQuery {
    pub fn new(category: MediaCategory, tone: Tone) -> Self {
        Self { category, tone }
    }

    pub fn matches(&self, asset: &MediaAsset) -> bool {
        asset.category == self.category && asset.tone == self.tone
    }

    /// Key used for report counters, e.g. `people/color`.
    pub fn label(&self) -> String {
        format!("{}/{}", self.category.folder(), self.tone.folder())
    }
}

/// Unclaimed media, sorted by path.
#[derive(Debug, Clone, Default)]
pub struct MediaPool {
    items: Vec<MediaAsset>,
}

impl MediaPool {
    pub fn new(mut items: Vec<MediaAsset>) -> Self {
        items.sort_by(|a, b| a.path.cmp(&b.path));
        Self { items }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Scan a `{people|family|wedding}/{color|grayscale}/*` tree.
    ///
    /// Files outside that layout or without an image extension are skipped.
    pub fn scan(root: &Path) -> Result<Self, GenerationError> {
        if !root.is_dir() {
            return Err(GenerationError::InvalidConfig(format!(
                "media directory {} does not exist",
                root.display()
            )));
        }

        let mut items = Vec::new();
        for entry in WalkDir::new(root).min_depth(3).max_depth(3) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let Some(mime_type) = image_mime_type(path) else {
                continue;
            };
            let Some((category, tone)) = classify(root, path) else {
                continue;
            };
            let bytes = fs::read(path)?;
            items.push(MediaAsset {
                path: path.to_path_buf(),
                checksum: hex::encode(Sha256::digest(&bytes)),
                mime_type: mime_type.to_string(),
                category,
                tone,
            });
        }

        debug!(root = %root.display(), items = items.len(), "media pool scanned");
        Ok(Self::new(items))
    }

    /// Remove and return one item matching `predicate`, chosen uniformly.
    pub fn claim<P>(&mut self, predicate: P, rng: &mut dyn RngCore) -> Option<MediaAsset>
    where
        P: Fn(&MediaAsset) -> bool,
    {
        let matches: Vec<usize> = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| predicate(item))
            .map(|(index, _)| index)
            .collect();
        if matches.is_empty() {
            return None;
        }
        let pick = matches[rng.random_range(0..matches.len())];
        Some(self.items.remove(pick))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Remaining items per `category/tone`.
    pub fn inventory(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for item in &self.items {
            *counts
                .entry(MediaQuery::new(item.category, item.tone).label())
                .or_insert(0) += 1;
        }
        counts
    }
}

fn image_mime_type(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, mime)| *mime)
}

fn classify(root: &Path, path: &Path) -> Option<(MediaCategory, Tone)> {
    let relative = path.strip_prefix(root).ok()?;
    let mut parts = relative.components().map(|c| c.as_os_str().to_str());
    let category = MediaCategory::from_folder(parts.next()??)?;
    let tone = Tone::from_folder(parts.next()??)?;
    Some((category, tone))
}

/// Place records seeded up front; picks reuse them freely.
#[derive(Debug, Clone, Default)]
pub struct PlacePool {
    places: Vec<Handle>,
}

impl PlacePool {
    /// Mint `count` places through the locale. The caller stores the records.
    pub fn seed(
        locale: &dyn Locale,
        count: u32,
        rng: &mut dyn RngCore,
    ) -> (Self, Vec<Place>) {
        let mut records = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let seed = locale.place(rng);
            let place_type = PlaceType::ALL[rng.random_range(0..PlaceType::ALL.len())];
            records.push(EntityFactory::place(rng, seed, place_type));
        }
        let places = records.iter().map(|place| place.handle.clone()).collect();
        (Self { places }, records)
    }

    pub fn pick(&self, rng: &mut dyn RngCore) -> Option<Handle> {
        if self.places.is_empty() {
            return None;
        }
        Some(self.places[rng.random_range(0..self.places.len())].clone())
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }
}

/// The builder's only access to the pools.
#[derive(Debug, Clone, Default)]
pub struct Resources {
    places: PlacePool,
    media: MediaPool,
}

impl Resources {
    pub fn new(media: MediaPool) -> Self {
        Self {
            places: PlacePool::default(),
            media,
        }
    }

    /// Seed the place pool and hand back the records to store.
    pub fn seed_places(
        &mut self,
        locale: &dyn Locale,
        count: u32,
        rng: &mut dyn RngCore,
    ) -> Vec<Place> {
        let (pool, records) = PlacePool::seed(locale, count, rng);
        self.places = pool;
        records
    }

    pub fn pick_place(&self, rng: &mut dyn RngCore) -> Option<Handle> {
        self.places.pick(rng)
    }

    pub fn claim_media(
        &mut self,
        query: MediaQuery,
        rng: &mut dyn RngCore,
    ) -> Result<MediaAsset, PoolExhausted> {
        self.media
            .claim(|asset| query.matches(asset), rng)
            .ok_or_else(|| PoolExhausted {
                pool: "media",
                wanted: query.label(),
            })
    }

    pub fn places(&self) -> &PlacePool {
        &self.places
    }

    pub fn media(&self) -> &MediaPool {
        &self.media
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn asset(path: &str, category: MediaCategory, tone: Tone) -> MediaAsset {
        MediaAsset {
            path: PathBuf::from(path),
            checksum: path.to_string(),
            mime_type: "image/jpeg".to_string(),
            category,
            tone,
        }
    }

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("fauxtree_pool_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    #[test]
    fn claim_removes_item_and_never_returns_it() {
        let mut pool = MediaPool::new(vec![
            asset("b.jpg", MediaCategory::PersonPortrait, Tone::Color),
            asset("a.jpg", MediaCategory::PersonPortrait, Tone::Color),
            asset("c.jpg", MediaCategory::FamilyPortrait, Tone::Grayscale),
        ]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let query = MediaQuery::new(MediaCategory::PersonPortrait, Tone::Color);

        let first = pool.claim(|a| query.matches(a), &mut rng).expect("first");
        let second = pool.claim(|a| query.matches(a), &mut rng).expect("second");
        assert_ne!(first.path, second.path);
        assert!(pool.claim(|a| query.matches(a), &mut rng).is_none());
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn exhausted_claim_reports_the_query() {
        let mut resources = Resources::new(MediaPool::empty());
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let err = resources
            .claim_media(
                MediaQuery::new(MediaCategory::WeddingPortrait, Tone::Color),
                &mut rng,
            )
            .expect_err("empty pool");
        assert_eq!(err.to_string(), "media pool has no wedding/color left");
    }

    #[test]
    fn scan_reads_partitioned_tree() {
        let root = temp_dir();
        for (folder, name, bytes) in [
            ("people/color", "p1.jpg", b"one".as_slice()),
            ("people/grayscale", "p2.PNG", b"two".as_slice()),
            ("wedding/color", "w1.jpeg", b"three".as_slice()),
            ("wedding/color", "readme.txt", b"skip".as_slice()),
            ("other/color", "x.jpg", b"skip".as_slice()),
        ] {
            let dir = root.join(folder);
            fs::create_dir_all(&dir).expect("mkdir");
            fs::write(dir.join(name), bytes).expect("write");
        }

        let pool = MediaPool::scan(&root).expect("scan");
        assert_eq!(pool.len(), 3);
        let inventory = pool.inventory();
        assert_eq!(inventory.get("people/color"), Some(&1));
        assert_eq!(inventory.get("people/grayscale"), Some(&1));
        assert_eq!(inventory.get("wedding/color"), Some(&1));
        let png = pool
            .items
            .iter()
            .find(|item| item.mime_type == "image/png")
            .expect("png item");
        assert_eq!(png.checksum, hex::encode(Sha256::digest(b"two")));

        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn scan_rejects_missing_directory() {
        let missing = std::env::temp_dir().join(format!("fauxtree_none_{}", uuid::Uuid::new_v4()));
        assert!(matches!(
            MediaPool::scan(&missing),
            Err(GenerationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn empty_place_pool_picks_nothing() {
        let pool = PlacePool::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert!(pool.pick(&mut rng).is_none());
    }
}
