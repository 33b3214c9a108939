use std::cmp::Ordering;

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GridError;
use crate::metrics::compute_metrics;

/// A 2D ranking matrix, row-major, aligned with the flattened grid lattice.
///
/// `0` means no data was collected for the cell, `1..=20` is an observed
/// search position and anything above 20 means "not in the top 20".
pub type RankingMatrix = Vec<Vec<u32>>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

/// Largest accepted points-per-side; bounds the `size * size` lattice.
pub const MAX_GRID_SIZE: u32 = 101;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridConfig {
    pub center: GeoPoint,
    /// Points per side. Odd sizes put a point exactly on `center`.
    pub size: u32,
    pub spacing_km: f64,
}

impl GridConfig {
    pub fn new(center: GeoPoint, size: u32, spacing_km: f64) -> Self {
        Self {
            center,
            size,
            spacing_km,
        }
    }

    /// Reject configurations that would yield an empty lattice or NaN points.
    pub fn validate(&self) -> Result<(), GridError> {
        if self.size == 0 {
            return Err(GridError::config("size must be at least 1"));
        }
        if self.size > MAX_GRID_SIZE {
            return Err(GridError::config(format!(
                "size must be at most {MAX_GRID_SIZE}, got {}",
                self.size
            )));
        }
        if !self.spacing_km.is_finite() || self.spacing_km <= 0.0 {
            return Err(GridError::config(format!(
                "spacing must be a positive number of km, got {}",
                self.spacing_km
            )));
        }
        if !self.center.is_finite() {
            return Err(GridError::config(format!(
                "center must have finite coordinates, got ({}, {})",
                self.center.lat, self.center.lng
            )));
        }
        Ok(())
    }

    pub fn point_count(&self) -> usize {
        let n = self.size as usize;
        n * n
    }
}

/// A lattice point paired with the ranking observed there.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankedPoint {
    pub row: usize,
    pub col: usize,
    pub point: GeoPoint,
    pub rank: u32,
}

/// Percentage of ranked (non-zero) cells falling into each band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RankDistribution {
    pub top3: f64,
    pub top4_to7: f64,
    pub top8_to10: f64,
    pub top11_to15: f64,
    pub top16_to20: f64,
    pub unranked: f64,
}

/// Summary of a ranking matrix.
///
/// Stored records written before the extended fields existed only carry
/// `agr`, `atgr` and `solv`; everything else defaults to zero on read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Metrics {
    /// Average Grid Ranking, values above 20 clamped to 21.
    pub agr: f64,
    /// Average Top Grid Ranking over values <= 20.
    pub atgr: f64,
    /// Share of Local Voice: rounded percentage of cells in the top 3.
    pub solv: f64,
    pub average_rank: f64,
    pub top20_average_rank: f64,
    /// Legacy field. Carries the top-10 meaning; prefer the explicit fields below.
    pub visibility_percentage: f64,
    pub top3_visibility_pct: f64,
    pub top10_visibility_pct: f64,
    pub found_visibility_pct: f64,
    pub top_three_count: u32,
    pub top_ten_count: u32,
    pub not_ranked_count: u32,
    pub no_data_count: u32,
    pub total_rankings: u32,
    pub distribution: RankDistribution,
}

impl Metrics {
    /// Copy with averages and percentages rounded to two decimals for display.
    pub fn rounded(&self) -> Self {
        let r = |v: f64| (v * 100.0).round() / 100.0;
        Self {
            agr: r(self.agr),
            atgr: r(self.atgr),
            solv: r(self.solv),
            average_rank: r(self.average_rank),
            top20_average_rank: r(self.top20_average_rank),
            visibility_percentage: r(self.visibility_percentage),
            top3_visibility_pct: r(self.top3_visibility_pct),
            top10_visibility_pct: r(self.top10_visibility_pct),
            found_visibility_pct: r(self.found_visibility_pct),
            distribution: RankDistribution {
                top3: r(self.distribution.top3),
                top4_to7: r(self.distribution.top4_to7),
                top8_to10: r(self.distribution.top8_to10),
                top11_to15: r(self.distribution.top11_to15),
                top16_to20: r(self.distribution.top16_to20),
                unranked: r(self.distribution.unranked),
            },
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessInfo {
    pub name: String,
    pub address: String,
    pub location: GeoPoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_id: Option<String>,
}

/// Grid size as found in stored records: either `7` or `"7x7"`.
///
/// The form read is the form written back, so existing data keeps its shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GridSize {
    Points(u32),
    Label(String),
}

impl GridSize {
    pub fn label(size: u32) -> Self {
        GridSize::Label(format!("{size}x{size}"))
    }

    pub fn points_per_side(&self) -> Result<u32, GridError> {
        match self {
            GridSize::Points(n) => Ok(*n),
            GridSize::Label(label) => parse_size_label(label),
        }
    }
}

impl std::fmt::Display for GridSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GridSize::Points(n) => write!(f, "{n}x{n}"),
            GridSize::Label(label) => write!(f, "{label}"),
        }
    }
}

fn parse_size_label(label: &str) -> Result<u32, GridError> {
    let bad = || GridError::GridSizeLabel(label.to_string());
    let trimmed = label.trim();
    match trimmed.split_once(['x', 'X']) {
        Some((rows, cols)) => {
            let rows: u32 = rows.trim().parse().map_err(|_| bad())?;
            let cols: u32 = cols.trim().parse().map_err(|_| bad())?;
            if rows != cols {
                return Err(bad());
            }
            Ok(rows)
        }
        None => trimmed.parse().map_err(|_| bad()),
    }
}

/// A completed grid run as persisted by the repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridResult {
    pub id: Uuid,
    pub business_info: BusinessInfo,
    pub search_term: String,
    pub created_at: String,
    pub grid_size: GridSize,
    pub grid_data: RankingMatrix,
    pub metrics: Metrics,
    #[serde(default)]
    pub google_region: String,
    #[serde(default)]
    pub distance_km: f64,
}

/// Everything the caller supplies when saving a run; id, timestamp and
/// metrics are filled in on save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGridResult {
    pub business_info: BusinessInfo,
    pub search_term: String,
    pub grid_size: GridSize,
    pub grid_data: RankingMatrix,
    pub google_region: String,
    pub distance_km: f64,
}

impl NewGridResult {
    /// Grid configuration this run was sampled with, centred on the business.
    pub fn grid_config(&self) -> Result<GridConfig, GridError> {
        let size = self.grid_size.points_per_side()?;
        Ok(GridConfig::new(
            self.business_info.location,
            size,
            self.distance_km,
        ))
    }
}

impl GridResult {
    /// Backfill metrics on records stored before the extended fields existed.
    pub fn migrate(&mut self) {
        let has_cells = self.grid_data.iter().any(|row| !row.is_empty());
        if has_cells && self.metrics.total_rankings == 0 && self.metrics.no_data_count == 0 {
            self.metrics = compute_metrics(&self.grid_data);
        }
    }

    /// Order two runs by the instant they were created, then by id.
    ///
    /// Offsets are normalised, so `Z` and `+00:00` stamps interleave
    /// correctly. Unparseable stamps sort before parseable ones and fall
    /// back to plain string order among themselves.
    pub fn cmp_chronological(&self, other: &Self) -> Ordering {
        let parse = |raw: &str| DateTime::parse_from_rfc3339(raw).ok();
        let by_time = match (parse(&self.created_at), parse(&other.created_at)) {
            (Some(a), Some(b)) => a.cmp(&b),
            (None, None) => self.created_at.cmp(&other.created_at),
            (a, b) => a.is_some().cmp(&b.is_some()),
        };
        by_time.then_with(|| self.id.cmp(&other.id))
    }

    pub fn grid_config(&self) -> Result<GridConfig, GridError> {
        let size = self.grid_size.points_per_side()?;
        Ok(GridConfig::new(
            self.business_info.location,
            size,
            self.distance_km,
        ))
    }
}
