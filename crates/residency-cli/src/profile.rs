//! Per-person travel profile stored as JSON.
//!
//! ```json
//! {
//!   "person_name": "Omer",
//!   "buffer_days": 12,
//!   "restricted_country": "Turkey",
//!   "travel_history": [
//!     { "country": "Turkey", "start": "2025-01-01", "end": "2025-06-15" }
//!   ]
//! }
//! ```
//!
//! Records whose `country` matches `restricted_country` (ignoring case) count
//! toward the limit; every other country is treated alike.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use residency_engine::{Country, History, Interval};
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_BUFFER_DAYS: u32 = 12;
pub const DEFAULT_RESTRICTED_COUNTRY: &str = "Turkey";

#[derive(Debug, Deserialize)]
struct ProfileFile {
    person_name: Option<String>,
    #[serde(default = "default_buffer_days")]
    buffer_days: u32,
    #[serde(default = "default_restricted_country")]
    restricted_country: String,
    #[serde(default)]
    travel_history: Vec<TravelRecord>,
}

#[derive(Debug, Deserialize)]
struct TravelRecord {
    country: String,
    start: NaiveDate,
    end: NaiveDate,
}

fn default_buffer_days() -> u32 {
    DEFAULT_BUFFER_DAYS
}

fn default_restricted_country() -> String {
    DEFAULT_RESTRICTED_COUNTRY.to_string()
}

/// A loaded profile with its history mapped onto restricted/other intervals.
#[derive(Debug)]
pub struct Profile {
    pub person_name: String,
    pub buffer_days: u32,
    pub restricted_country: String,
    pub history: History,
}

impl Profile {
    /// Display name for a location.
    pub fn location_label(&self, country: Country) -> String {
        match country {
            Country::Restricted => self.restricted_country.clone(),
            Country::Other => format!("outside {}", self.restricted_country),
        }
    }
}

pub fn load_profile(path: &Path) -> Result<Profile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read profile: {}", path.display()))?;
    let fallback_name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("unknown");
    let profile = parse_profile(&content, fallback_name)
        .with_context(|| format!("Invalid profile: {}", path.display()))?;

    tracing::debug!(
        path = %path.display(),
        person = %profile.person_name,
        intervals = profile.history.len(),
        "loaded profile"
    );
    Ok(profile)
}

/// Parse profile JSON. `fallback_name` is used when `person_name` is absent.
pub fn parse_profile(json: &str, fallback_name: &str) -> Result<Profile> {
    let file: ProfileFile = serde_json::from_str(json).context("Failed to parse profile JSON")?;

    let intervals = file
        .travel_history
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let country = if record.country.eq_ignore_ascii_case(&file.restricted_country) {
                Country::Restricted
            } else {
                Country::Other
            };
            Interval::new(country, record.start, record.end).with_context(|| {
                format!("travel_history[{}] ({})", index, record.country)
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Profile {
        person_name: file
            .person_name
            .unwrap_or_else(|| fallback_name.to_string()),
        buffer_days: file.buffer_days,
        restricted_country: file.restricted_country,
        history: History::new(intervals),
    })
}
