use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::Datelike;
use fauxtree_core::{GraphRules, StoreStats, Tone};
use serde::{Deserialize, Serialize};

use crate::errors::GenerationError;
use crate::locale::LocaleKey;

/// Inclusive integer range used for years, ages and lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Band {
    pub min: i32,
    pub max: i32,
}

impl Band {
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    pub fn validate(&self, what: &str) -> Result<(), GenerationError> {
        if self.min > self.max {
            return Err(GenerationError::range(what, self.min as i64, self.max as i64));
        }
        Ok(())
    }
}

/// Year cutoffs deciding whether a photo of that year is color or grayscale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EraThresholds {
    /// Years strictly after this get color photos.
    pub color_after: i32,
    /// Years strictly after this (and not color) get grayscale photos.
    pub grayscale_after: i32,
}

impl EraThresholds {
    pub const fn new(color_after: i32, grayscale_after: i32) -> Self {
        Self {
            color_after,
            grayscale_after,
        }
    }

    /// Tone of a photo taken in `year`, or `None` before photography.
    pub fn tone_for(&self, year: i32) -> Option<Tone> {
        if year > self.color_after {
            Some(Tone::Color)
        } else if year > self.grayscale_after {
            Some(Tone::Grayscale)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Eras {
    /// Person portraits, keyed by birth year.
    pub portrait: EraThresholds,
    /// Family portraits, keyed by marriage year.
    pub family: EraThresholds,
    /// Wedding portraits, keyed by marriage year.
    pub wedding: EraThresholds,
}

impl Default for Eras {
    fn default() -> Self {
        Self {
            portrait: EraThresholds::new(1940, 1860),
            family: EraThresholds::new(1950, 1880),
            wedding: EraThresholds::new(1880, 1880),
        }
    }
}

/// Optional layers of the generated tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Features {
    pub places: bool,
    pub media: bool,
    pub notes: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            places: true,
            media: true,
            notes: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Gramps,
    Json,
    Csv,
}

impl ExportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gramps => "gramps",
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = GenerationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "gramps" | "xml" => Ok(Self::Gramps),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(GenerationError::InvalidConfig(format!(
                "unknown export format '{other}'"
            ))),
        }
    }
}

/// Options for the generation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateOptions {
    /// Directory where run artifacts are written.
    pub out_dir: PathBuf,
    /// Seed for every random draw of the run.
    pub seed: u64,
    /// Locale used for names and note text (`en_US`, `de_DE`, `pt_BR`).
    pub locale: String,
    /// Country whose places seed the place pool.
    pub country_code: String,
    /// Maximum number of ancestor generations above the anchor person.
    pub max_generations: u32,
    /// Upper bound of the sibling draw per family.
    pub max_siblings: u32,
    pub prob_unmarried: f64,
    pub prob_person_note: f64,
    pub prob_event_note: f64,
    /// Chance that a person is born (or dies) away from the family place.
    pub prob_relocated: f64,
    pub num_places: u32,
    pub anchor_birth_years: Band,
    /// Parent age at the birth of the child a family is created for.
    pub parent_age: Band,
    pub death_age: Band,
    pub age_of_majority: i32,
    /// Years between consecutive sibling births.
    pub sibling_spacing: Band,
    /// Siblings are never born closer than this to the anchor child.
    pub anchor_spacing: i32,
    /// Years after the mother's birth during which children may be born.
    pub fertility_span: i32,
    /// Note length in characters.
    pub note_length: Band,
    pub eras: Eras,
    /// Year deciding whether siblings are still alive. Defaults to now.
    pub current_year: Option<i32>,
    /// Root of the `{category}/{tone}/*` image tree.
    pub media_dir: Option<PathBuf>,
    pub format: ExportFormat,
    pub features: Features,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("out"),
            seed: 42,
            locale: LocaleKey::EnUs.as_str().to_string(),
            country_code: "US".to_string(),
            max_generations: 6,
            max_siblings: 9,
            prob_unmarried: 0.05,
            prob_person_note: 0.5,
            prob_event_note: 0.5,
            prob_relocated: 0.2,
            num_places: 50,
            anchor_birth_years: Band::new(1970, 2000),
            parent_age: Band::new(20, 40),
            death_age: Band::new(55, 90),
            age_of_majority: 18,
            sibling_spacing: Band::new(2, 6),
            anchor_spacing: 2,
            fertility_span: 40,
            note_length: Band::new(200, 2000),
            eras: Eras::default(),
            current_year: None,
            media_dir: None,
            format: ExportFormat::Gramps,
            features: Features::default(),
        }
    }
}

impl GenerateOptions {
    /// Reject configurations under which the builder could be asked to draw
    /// from an empty range.
    pub fn validate(&self) -> Result<(), GenerationError> {
        for (name, value) in [
            ("prob_unmarried", self.prob_unmarried),
            ("prob_person_note", self.prob_person_note),
            ("prob_event_note", self.prob_event_note),
            ("prob_relocated", self.prob_relocated),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(GenerationError::InvalidConfig(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }

        self.anchor_birth_years.validate("anchor_birth_years")?;
        self.parent_age.validate("parent_age")?;
        self.death_age.validate("death_age")?;
        self.sibling_spacing.validate("sibling_spacing")?;
        self.note_length.validate("note_length")?;

        if self.note_length.min < 0 {
            return Err(GenerationError::range(
                "note_length",
                self.note_length.min as i64,
                self.note_length.max as i64,
            ));
        }
        if self.sibling_spacing.min < 1 {
            return Err(GenerationError::range(
                "sibling_spacing",
                self.sibling_spacing.min as i64,
                self.sibling_spacing.max as i64,
            ));
        }
        // Marriage is drawn from [parent birth + majority, child birth - 1],
        // which is empty unless parents are older than the age of majority.
        if self.parent_age.min <= self.age_of_majority {
            return Err(GenerationError::range(
                "parent_age above age_of_majority",
                self.age_of_majority as i64 + 1,
                self.parent_age.min as i64,
            ));
        }
        if self.parent_age.max > self.fertility_span {
            return Err(GenerationError::range(
                "parent_age within fertility_span",
                self.parent_age.max as i64,
                self.fertility_span as i64,
            ));
        }
        if LocaleKey::parse(&self.locale).is_none() {
            return Err(GenerationError::InvalidConfig(format!(
                "unsupported locale '{}'",
                self.locale
            )));
        }
        if self.country_code.trim().is_empty() {
            return Err(GenerationError::InvalidConfig(
                "country_code must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn locale_key(&self) -> Result<LocaleKey, GenerationError> {
        LocaleKey::parse(&self.locale).ok_or_else(|| {
            GenerationError::InvalidConfig(format!("unsupported locale '{}'", self.locale))
        })
    }

    pub fn resolved_current_year(&self) -> i32 {
        self.current_year
            .unwrap_or_else(|| chrono::Utc::now().year())
    }

    pub fn graph_rules(&self) -> GraphRules {
        GraphRules {
            age_of_majority: self.age_of_majority,
            fertility_span: self.fertility_span,
        }
    }
}

/// Report for a generation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationReport {
    pub run_id: String,
    pub seed: u64,
    pub locale: String,
    pub format: Option<ExportFormat>,
    pub anchor: Option<String>,
    pub records: StoreStats,
    /// Ancestor generations actually reached above the anchor.
    pub generations: u64,
    pub families_expanded: u64,
    pub siblings: u64,
    pub unmarried: u64,
    pub relocations: u64,
    pub media_claimed: BTreeMap<String, u64>,
    pub pool_misses: BTreeMap<String, u64>,
    pub media_pool_remaining: u64,
    pub transactions: u64,
    pub artifacts: Vec<String>,
    pub bytes_written: u64,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl GenerationReport {
    pub fn new(run_id: String, options: &GenerateOptions) -> Self {
        Self {
            run_id,
            seed: options.seed,
            locale: options.locale.clone(),
            format: Some(options.format),
            ..Self::default()
        }
    }

    pub fn record_error(&mut self, message: String) {
        self.errors.push(message);
    }
}
