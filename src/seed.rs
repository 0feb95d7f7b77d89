//! Sample catalogue loader used by the `seed` subcommand.

use serde_json::Value;
use std::path::Path;
use tracing::info;

use crate::core::{AppError, AppResult};
use crate::models::Hotel;
use crate::services::hotel_service::hotel_from_input;
use crate::storage::Database;

/// Hotels shipped with the binary.
pub const SAMPLE_HOTELS: &str = include_str!("../data/sample_hotels.json");

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub removed: usize,
    pub inserted: usize,
    pub skipped: usize,
}

/// Parse a JSON array of hotel documents.
pub fn parse_hotels(raw: &str) -> AppResult<Vec<Hotel>> {
    let docs: Vec<Value> = serde_json::from_str(raw)
        .map_err(|e| AppError::validation(format!("seed file is not a JSON array: {e}")))?;
    docs.into_iter().map(hotel_from_input).collect()
}

pub async fn load_file(path: &Path) -> anyhow::Result<Vec<Hotel>> {
    let raw = tokio::fs::read_to_string(path).await?;
    Ok(parse_hotels(&raw)?)
}

/// Insert `hotels`; names already present are skipped unless `replace` clears the catalogue first.
pub async fn seed_hotels(db: &Database, hotels: Vec<Hotel>, replace: bool) -> AppResult<SeedReport> {
    let mut report = SeedReport::default();
    if replace {
        for hotel in db.hotels.list().await? {
            if db.hotels.delete(&hotel.id).await? {
                report.removed += 1;
            }
        }
    }

    for hotel in hotels {
        let name = hotel.name.to_lowercase();
        if db.hotels.find_one(|h| h.name.to_lowercase() == name).await?.is_some() {
            report.skipped += 1;
            continue;
        }
        db.hotels.insert(&hotel).await?;
        info!(hotel_id = %hotel.id, name = %hotel.name, "hotel seeded");
        report.inserted += 1;
    }
    Ok(report)
}
