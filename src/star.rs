//! Star records and GPU-compatible star instances.
//!
//! A `Star` is one catalog row; `StarInstance` is the per-star data the
//! renderer uploads for billboard drawing. Color classification follows the
//! Gaia BP-RP color index with an effective-temperature fallback.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Display radius of every star sphere, in world units.
pub const STAR_RADIUS: f32 = 50.0;
/// Glow halo extent as a multiple of the core radius.
pub const GLOW_SCALE: f32 = 1.8;

/// Color class bucketed from BP-RP (preferred) or effective temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StarColor {
    Blue,
    White,
    Yellow,
    Orange,
    Red,
}

impl StarColor {
    /// Bucket a star by BP-RP color index, falling back to effective
    /// temperature in Kelvin, defaulting to white when both are missing.
    pub fn classify(bp_rp: Option<f32>, temperature: Option<f32>) -> Self {
        if let Some(bp_rp) = bp_rp {
            return if bp_rp < 0.0 {
                StarColor::Blue
            } else if bp_rp < 0.8 {
                StarColor::White
            } else if bp_rp < 1.5 {
                StarColor::Yellow
            } else if bp_rp < 2.5 {
                StarColor::Orange
            } else {
                StarColor::Red
            };
        }
        if let Some(teff) = temperature {
            return if teff > 10000.0 {
                StarColor::Blue
            } else if teff > 7500.0 {
                StarColor::White
            } else if teff > 5500.0 {
                StarColor::Yellow
            } else if teff > 4000.0 {
                StarColor::Orange
            } else {
                StarColor::Red
            };
        }
        StarColor::White
    }

    /// Linear RGB in [0,1].
    pub fn rgb(self) -> [f32; 3] {
        match self {
            // 0xaabfff
            StarColor::Blue => [0.667, 0.749, 1.0],
            // 0xffffff
            StarColor::White => [1.0, 1.0, 1.0],
            // 0xffd2a1
            StarColor::Yellow => [1.0, 0.824, 0.631],
            // 0xffcc6f
            StarColor::Orange => [1.0, 0.8, 0.435],
            // 0xff6f6f
            StarColor::Red => [1.0, 0.435, 0.435],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            StarColor::Blue => "Blue",
            StarColor::White => "White",
            StarColor::Yellow => "Yellow",
            StarColor::Orange => "Orange",
            StarColor::Red => "Red",
        }
    }
}

/// One star from the catalog, in raw catalog coordinates.
#[derive(Debug, Clone)]
pub struct Star {
    pub source_id: u64,
    /// Raw catalog position (parsecs relative to the host exoplanet).
    pub position: Vec3,
    pub stellar_radius: Option<f32>,
    /// BP-RP color index, when present.
    pub bp_rp: Option<f32>,
    /// Effective temperature in Kelvin, when present.
    pub temperature: Option<f32>,
    pub lifestage: Option<String>,
    pub color: StarColor,
}

impl Star {
    /// One-line property summary for the hover tooltip.
    pub fn tooltip(&self) -> String {
        fn field<T: std::fmt::Display>(value: &Option<T>) -> String {
            value
                .as_ref()
                .map_or_else(|| "N/A".to_string(), |v| v.to_string())
        }
        format!(
            "Gaia {} | radius {} | {} | temp {} K | {}",
            self.source_id,
            field(&self.stellar_radius),
            self.color.name(),
            field(&self.temperature),
            field(&self.lifestage),
        )
    }
}

/// Per-instance vertex data for the star billboard pipeline (32 bytes).
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct StarInstance {
    pub position: [f32; 3],
    pub radius: f32,
    pub color: [f32; 3],
    pub _pad: f32,
}

impl StarInstance {
    pub fn new(position: Vec3, radius: f32, color: [f32; 3]) -> Self {
        Self {
            position: position.to_array(),
            radius,
            color,
            _pad: 0.0,
        }
    }

    pub fn center(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }
}
