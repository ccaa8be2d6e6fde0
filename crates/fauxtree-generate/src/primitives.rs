//! Random draws used by the tree builder.
//!
//! Every function takes the run's RNG explicitly; nothing here keeps state.

use chrono::{Datelike, NaiveDate};
use fauxtree_core::{Gender, Handle};
use rand::{Rng, RngCore};

use crate::errors::GenerationError;
use crate::model::Band;

/// True with probability `p`.
pub fn random_bool(rng: &mut dyn RngCore, p: f64) -> Result<bool, GenerationError> {
    if !(0.0..=1.0).contains(&p) {
        return Err(GenerationError::InvalidConfig(format!(
            "probability must be within [0, 1], got {p}"
        )));
    }
    Ok(rng.random_bool(p))
}

/// Uniform age within an inclusive band.
pub fn random_age(rng: &mut dyn RngCore, band: Band) -> Result<i32, GenerationError> {
    if band.min > band.max || band.min < 0 {
        return Err(GenerationError::range("age", band.min as i64, band.max as i64));
    }
    Ok(rng.random_range(band.min..=band.max))
}

/// Uniform year in `[min, max]`; `what` names the draw in the error.
pub fn random_year(
    rng: &mut dyn RngCore,
    what: &str,
    min: i32,
    max: i32,
) -> Result<i32, GenerationError> {
    if min > max {
        return Err(GenerationError::range(what, min as i64, max as i64));
    }
    Ok(rng.random_range(min..=max))
}

/// A valid `(month, day)` for `year`.
pub fn random_calendar_day(rng: &mut dyn RngCore, year: i32) -> (u32, u32) {
    let month = rng.random_range(1..=12);
    let day = rng.random_range(1..=days_in_month(year, month));
    (month, day)
}

pub fn random_gender(rng: &mut dyn RngCore) -> Gender {
    if rng.random_bool(0.5) {
        Gender::Male
    } else {
        Gender::Female
    }
}

/// UUIDv4 handle built from RNG bytes so seeded runs repeat exactly.
pub fn random_handle(rng: &mut dyn RngCore) -> Handle {
    let mut bytes = [0_u8; 16];
    rng.fill_bytes(&mut bytes);
    let uuid = uuid::Builder::from_random_bytes(bytes).into_uuid();
    Handle::new(uuid.to_string())
}

/// Probability of expanding ancestors at `depth`: falls linearly from 1 at
/// depth 0 to 0 at `max_depth`.
pub fn generation_decay(depth: u32, max_depth: u32) -> f64 {
    if max_depth == 0 || depth >= max_depth {
        return 0.0;
    }
    1.0 - depth as f64 / max_depth as f64
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}
