use std::path::{Path, PathBuf};

use clap::Args;
use fauxtree_generate::{ExportFormat, GenerateOptions};

use crate::CliError;

/// Load options from a TOML file. Keys left out keep their defaults.
pub fn load_options(path: Option<&Path>) -> Result<GenerateOptions, CliError> {
    match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            parse_options(&content)
        }
        None => Ok(GenerateOptions::default()),
    }
}

pub fn parse_options(content: &str) -> Result<GenerateOptions, CliError> {
    Ok(toml::from_str(content)?)
}

/// The default configuration as TOML.
pub fn render_default() -> Result<String, CliError> {
    Ok(toml::to_string_pretty(&GenerateOptions::default())?)
}

/// Command-line overrides applied on top of the configuration file.
#[derive(Args, Debug, Default)]
pub struct Overrides {
    /// Seed for all random draws.
    #[arg(long)]
    pub seed: Option<u64>,
    /// Locale for names and notes (en_US, de_DE, pt_BR).
    #[arg(long)]
    pub locale: Option<String>,
    /// Country code for the place pool.
    #[arg(long = "country")]
    pub country_code: Option<String>,
    #[arg(long)]
    pub max_generations: Option<u32>,
    #[arg(long)]
    pub max_siblings: Option<u32>,
    /// Root of the `{people|family|wedding}/{color|grayscale}` image tree.
    #[arg(long)]
    pub media_dir: Option<PathBuf>,
    /// Output directory for runs.
    #[arg(long = "out")]
    pub out_dir: Option<PathBuf>,
    /// Export format: gramps, json or csv.
    #[arg(long)]
    pub format: Option<String>,
    #[arg(long, default_value_t = false)]
    pub no_places: bool,
    #[arg(long, default_value_t = false)]
    pub no_media: bool,
    #[arg(long, default_value_t = false)]
    pub no_notes: bool,
}

impl Overrides {
    pub fn apply(self, options: &mut GenerateOptions) -> Result<(), CliError> {
        if let Some(seed) = self.seed {
            options.seed = seed;
        }
        if let Some(locale) = self.locale {
            options.locale = locale;
        }
        if let Some(country_code) = self.country_code {
            options.country_code = country_code;
        }
        if let Some(max_generations) = self.max_generations {
            options.max_generations = max_generations;
        }
        if let Some(max_siblings) = self.max_siblings {
            options.max_siblings = max_siblings;
        }
        if let Some(media_dir) = self.media_dir {
            options.media_dir = Some(media_dir);
        }
        if let Some(out_dir) = self.out_dir {
            options.out_dir = out_dir;
        }
        if let Some(format) = self.format {
            options.format = format.parse::<ExportFormat>()?;
        }
        options.features.places &= !self.no_places;
        options.features.media &= !self.no_media;
        options.features.notes &= !self.no_notes;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fauxtree_generate::Band;

    #[test]
    fn partial_toml_keeps_defaults() {
        let options = parse_options(
            r#"
seed = 99
locale = "pt_BR"
country_code = "BR"

[death_age]
min = 60
max = 85

[features]
media = false
"#,
        )
        .expect("parse config");
        assert_eq!(options.seed, 99);
        assert_eq!(options.locale, "pt_BR");
        assert_eq!(options.death_age, Band::new(60, 85));
        assert!(!options.features.media);
        assert!(options.features.notes);
        assert_eq!(options.max_generations, 6);
    }

    #[test]
    fn default_config_round_trips() {
        let rendered = render_default().expect("render");
        let parsed = parse_options(&rendered).expect("parse rendered");
        let defaults = GenerateOptions::default();
        assert_eq!(parsed.seed, defaults.seed);
        assert_eq!(parsed.anchor_birth_years, defaults.anchor_birth_years);
        assert_eq!(parsed.eras, defaults.eras);
        assert_eq!(parsed.format, defaults.format);
        assert!(parsed.media_dir.is_none());
    }

    #[test]
    fn overrides_replace_config_values() {
        let mut options = GenerateOptions::default();
        Overrides {
            seed: Some(5),
            format: Some("csv".to_string()),
            no_notes: true,
            ..Overrides::default()
        }
        .apply(&mut options)
        .expect("apply overrides");
        assert_eq!(options.seed, 5);
        assert_eq!(options.format, ExportFormat::Csv);
        assert!(!options.features.notes);
        assert!(options.features.places);
    }

    #[test]
    fn unknown_format_is_rejected() {
        let mut options = GenerateOptions::default();
        let result = Overrides {
            format: Some("gedcom".to_string()),
            ..Overrides::default()
        }
        .apply(&mut options);
        assert!(matches!(result, Err(CliError::Generation(_))));
    }

    #[test]
    fn mistyped_value_fails() {
        assert!(matches!(
            parse_options("seed = \"abc\""),
            Err(CliError::Config(_))
        ));
    }
}
