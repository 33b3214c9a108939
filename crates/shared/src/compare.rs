//! Cross-run analytics: competitor standings on one grid and metric trends
//! across repeated runs of the same keyword.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::metrics::compute_metrics;
use crate::models::{GridResult, Metrics, RankingMatrix};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Competitor {
    pub name: String,
    pub grid_data: RankingMatrix,
    /// The business the dashboard is tracking; deltas are relative to it.
    #[serde(default)]
    pub tracked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorStanding {
    /// 1-based, best AGR first.
    pub position: usize,
    pub name: String,
    pub tracked: bool,
    pub metrics: Metrics,
    /// This competitor's AGR minus the tracked business's AGR.
    pub agr_delta: Option<f64>,
}

fn compare_standings(a: &(String, bool, Metrics), b: &(String, bool, Metrics)) -> Ordering {
    let (a_name, _, a) = a;
    let (b_name, _, b) = b;
    // Competitors without any ranked cell sort last
    (a.total_rankings == 0)
        .cmp(&(b.total_rankings == 0))
        .then_with(|| a.agr.partial_cmp(&b.agr).unwrap_or(Ordering::Equal))
        .then_with(|| b.solv.partial_cmp(&a.solv).unwrap_or(Ordering::Equal))
        .then_with(|| a_name.cmp(b_name))
}

/// Rank competitors on the same grid by AGR, lower is better.
pub fn compare_competitors(competitors: &[Competitor]) -> Vec<CompetitorStanding> {
    let mut scored: Vec<(String, bool, Metrics)> = competitors
        .iter()
        .map(|c| (c.name.clone(), c.tracked, compute_metrics(&c.grid_data)))
        .collect();
    scored.sort_by(compare_standings);

    let tracked_agr = scored
        .iter()
        .find(|(_, tracked, _)| *tracked)
        .map(|(_, _, m)| m.agr);

    scored
        .into_iter()
        .enumerate()
        .map(|(i, (name, tracked, metrics))| CompetitorStanding {
            position: i + 1,
            agr_delta: tracked_agr.map(|t| metrics.agr - t),
            name,
            tracked,
            metrics,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub result_id: Uuid,
    pub created_at: String,
    pub agr: f64,
    pub atgr: f64,
    pub solv: f64,
    /// AGR change from the previous run; negative means rankings improved.
    pub agr_change: Option<f64>,
}

fn same_term(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Metric history for one search term, oldest run first.
///
/// `business_name` narrows the history to one business when several are
/// tracked under the same keyword.
pub fn keyword_trend(
    results: &[GridResult],
    search_term: &str,
    business_name: Option<&str>,
) -> Vec<TrendPoint> {
    let mut runs: Vec<&GridResult> = results
        .iter()
        .filter(|r| same_term(&r.search_term, search_term))
        .filter(|r| business_name.map_or(true, |name| r.business_info.name == name))
        .collect();
    runs.sort_by(|a, b| a.cmp_chronological(b));

    let mut previous_agr: Option<f64> = None;
    runs.into_iter()
        .map(|r| {
            let point = TrendPoint {
                result_id: r.id,
                created_at: r.created_at.clone(),
                agr: r.metrics.agr,
                atgr: r.metrics.atgr,
                solv: r.metrics.solv,
                agr_change: previous_agr.map(|prev| r.metrics.agr - prev),
            };
            previous_agr = Some(r.metrics.agr);
            point
        })
        .collect()
}
