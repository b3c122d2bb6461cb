//! Loads star catalogs from CSV files.
//!
//! Headers are trimmed and lowercased before deserialization so catalogs
//! with inconsistent header casing parse the same way. Rows missing any of
//! the coordinates or the source id are skipped, matching how the catalogs
//! are produced (stars without a Gaia cross-match have empty fields).

use crate::star::{Star, StarColor, StarInstance, STAR_RADIUS};
use anyhow::{anyhow, Result};
use glam::Vec3;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

/// World-units-per-parsec applied when placing stars in the scene.
pub const DEFAULT_WORLD_SCALE: f32 = 100.0;

#[derive(Debug, Deserialize)]
struct RawRecord {
    source_id: Option<u64>,
    x: Option<f64>,
    y: Option<f64>,
    z: Option<f64>,
    stellar_radius: Option<f64>,
    /// BP-RP color index; the catalog column is named "colour".
    colour: Option<f64>,
    temperature: Option<f64>,
    lifestage: Option<String>,
}

/// A loaded star catalog with raw-coordinate bounds.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub stars: Vec<Star>,
    pub min: Vec3,
    pub max: Vec3,
}

impl Catalog {
    /// Load a catalog from a CSV file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| anyhow!("failed to open catalog {}: {}", path.display(), e))?;
        let catalog = Self::from_reader(file)?;
        log::info!(
            "Loaded catalog {}: {} stars",
            path.display(),
            catalog.stars.len()
        );
        Ok(catalog)
    }

    /// Parse catalog CSV from any reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let normalized: csv::StringRecord = rdr
            .headers()?
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();
        rdr.set_headers(normalized);

        let mut stars = Vec::new();
        let mut skipped = 0usize;
        for result in rdr.deserialize::<RawRecord>() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    log::warn!("skipping malformed catalog row: {}", e);
                    skipped += 1;
                    continue;
                }
            };
            let (Some(source_id), Some(x), Some(y), Some(z)) =
                (record.source_id, record.x, record.y, record.z)
            else {
                skipped += 1;
                continue;
            };
            let bp_rp = record.colour.map(|v| v as f32);
            let temperature = record.temperature.map(|v| v as f32);
            stars.push(Star {
                source_id,
                position: Vec3::new(x as f32, y as f32, z as f32),
                stellar_radius: record.stellar_radius.map(|v| v as f32),
                bp_rp,
                temperature,
                lifestage: record.lifestage,
                color: StarColor::classify(bp_rp, temperature),
            });
        }

        if skipped > 0 {
            log::info!("skipped {} incomplete catalog rows", skipped);
        }

        let (min, max) = bounds(&stars);
        Ok(Self { stars, min, max })
    }

    /// Centroid of the raw-coordinate bounding box.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) / 2.0
    }

    /// Scene position of star `i`: centered on the bounds and scaled.
    pub fn world_position(&self, index: usize, scale: f32) -> Vec3 {
        (self.stars[index].position - self.center()) * scale
    }

    /// Per-star render/picking instances at the given world scale.
    pub fn instances(&self, scale: f32) -> Vec<StarInstance> {
        let center = self.center();
        self.stars
            .iter()
            .map(|star| {
                StarInstance::new((star.position - center) * scale, STAR_RADIUS, star.color.rgb())
            })
            .collect()
    }
}

fn bounds(stars: &[Star]) -> (Vec3, Vec3) {
    let mut min = Vec3::splat(f32::INFINITY);
    let mut max = Vec3::splat(f32::NEG_INFINITY);
    for star in stars {
        min = min.min(star.position);
        max = max.max(star.position);
    }
    if stars.is_empty() {
        (Vec3::ZERO, Vec3::ZERO)
    } else {
        (min, max)
    }
}
