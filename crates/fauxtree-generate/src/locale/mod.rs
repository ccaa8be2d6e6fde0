//! Locale-specific text: given names, surnames, places and note bodies.

mod keys;

pub use keys::LocaleKey;

use fake::Fake;
use fauxtree_core::Gender;
use rand::{Rng, RngCore};

use crate::assets::AssetsLoader;
use crate::errors::GenerationError;
use crate::primitives;

/// Raw place data before it becomes a store record.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceSeed {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Text collaborator of the tree builder.
pub trait Locale {
    fn first_name(&self, gender: Gender, rng: &mut dyn RngCore) -> String;

    fn surname(&self, rng: &mut dyn RngCore) -> String;

    /// A place in the configured country.
    fn place(&self, rng: &mut dyn RngCore) -> PlaceSeed;

    /// Note body of exactly `chars` characters.
    fn note_text(&self, chars: usize, rng: &mut dyn RngCore) -> String;

    fn calendar_day(&self, year: i32, rng: &mut dyn RngCore) -> (u32, u32) {
        primitives::random_calendar_day(rng, year)
    }
}

/// [`Locale`] backed by bundled first-name and place assets, with `fake`
/// supplying surnames, note text and whatever the assets do not cover.
#[derive(Debug, Clone)]
pub struct FakerLocale {
    key: LocaleKey,
    male_names: Vec<String>,
    female_names: Vec<String>,
    places: Vec<PlaceSeed>,
}

impl FakerLocale {
    pub fn load(
        key: LocaleKey,
        country_code: &str,
        loader: &AssetsLoader,
    ) -> Result<Self, GenerationError> {
        let male_names = loader.load_lines(&format!("{key}/first_names_male.txt"))?;
        let female_names = loader.load_lines(&format!("{key}/first_names_female.txt"))?;

        let country = country_code.trim().to_ascii_uppercase();
        let places = loader
            .load_table(&format!("places/{country}.txt"), 3)?
            .into_iter()
            .map(|row| parse_place(&country, &row))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            key,
            male_names,
            female_names,
            places,
        })
    }

    fn fake_first_name(&self, rng: &mut dyn RngCore) -> String {
        match self.key {
            LocaleKey::EnUs => fake::faker::name::en::FirstName().fake_with_rng(rng),
            LocaleKey::DeDe => fake::faker::name::de_de::FirstName().fake_with_rng(rng),
            LocaleKey::PtBr => fake::faker::name::pt_br::FirstName().fake_with_rng(rng),
        }
    }

    fn fake_city(&self, rng: &mut dyn RngCore) -> String {
        match self.key {
            LocaleKey::EnUs => fake::faker::address::en::CityName().fake_with_rng(rng),
            LocaleKey::DeDe => fake::faker::address::de_de::CityName().fake_with_rng(rng),
            LocaleKey::PtBr => fake::faker::address::pt_br::CityName().fake_with_rng(rng),
        }
    }
}

impl Locale for FakerLocale {
    fn first_name(&self, gender: Gender, rng: &mut dyn RngCore) -> String {
        let names = match gender {
            Gender::Male => &self.male_names,
            Gender::Female => &self.female_names,
        };
        if names.is_empty() {
            return self.fake_first_name(rng);
        }
        names[rng.random_range(0..names.len())].clone()
    }

    fn surname(&self, rng: &mut dyn RngCore) -> String {
        match self.key {
            LocaleKey::EnUs => fake::faker::name::en::LastName().fake_with_rng(rng),
            LocaleKey::DeDe => fake::faker::name::de_de::LastName().fake_with_rng(rng),
            LocaleKey::PtBr => fake::faker::name::pt_br::LastName().fake_with_rng(rng),
        }
    }

    fn place(&self, rng: &mut dyn RngCore) -> PlaceSeed {
        if self.places.is_empty() {
            return PlaceSeed {
                name: self.fake_city(rng),
                latitude: round_coordinate(rng.random_range(-60.0..70.0)),
                longitude: round_coordinate(rng.random_range(-180.0..180.0)),
            };
        }
        self.places[rng.random_range(0..self.places.len())].clone()
    }

    fn note_text(&self, chars: usize, rng: &mut dyn RngCore) -> String {
        let mut text = String::new();
        while text.chars().count() < chars {
            if !text.is_empty() {
                text.push(' ');
            }
            let sentence: String = fake::faker::lorem::en::Sentence(4..12).fake_with_rng(rng);
            text.push_str(&sentence);
        }
        text.chars().take(chars).collect()
    }
}

fn parse_place(country: &str, row: &[String]) -> Result<PlaceSeed, GenerationError> {
    let coordinate = |value: &str| {
        value.parse::<f64>().map_err(|err| {
            GenerationError::Asset(format!(
                "places/{country}.txt: bad coordinate '{value}' for {}: {err}",
                row[0]
            ))
        })
    };
    Ok(PlaceSeed {
        name: row[0].clone(),
        latitude: coordinate(&row[1])?,
        longitude: coordinate(&row[2])?,
    })
}

fn round_coordinate(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
