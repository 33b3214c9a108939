use crate::models::{Metrics, RankDistribution};
use crate::rank::{RankBand, MAX_TRACKED_RANK, UNRANKED_CLAMP};

fn mean(sum: u64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    }
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * part as f64 / total as f64
    }
}

/// Reduce a ranking matrix to its summary metrics.
///
/// Zero cells mean no data was collected: they are left out of every average
/// and percentage and only show up in `no_data_count` and `not_ranked_count`.
/// An empty matrix, or one with only zero cells, yields zeroed metrics.
pub fn compute_metrics(matrix: &[Vec<u32>]) -> Metrics {
    let mut values = Vec::new();
    let mut no_data = 0usize;
    for &v in matrix.iter().flatten() {
        if v == 0 {
            no_data += 1;
        } else {
            values.push(v);
        }
    }
    let total = values.len();

    let clamped_sum: u64 = values.iter().map(|&v| v.min(UNRANKED_CLAMP) as u64).sum();
    let agr = mean(clamped_sum, total);

    let found: Vec<u32> = values
        .iter()
        .copied()
        .filter(|&v| v <= MAX_TRACKED_RANK)
        .collect();
    let found_sum: u64 = found.iter().map(|&v| v as u64).sum();
    let atgr = mean(found_sum, found.len());

    let top_three = values.iter().filter(|&&v| v <= 3).count();
    let top_ten = values.iter().filter(|&&v| v <= 10).count();
    let unranked = total - found.len();

    let top3_pct = percent(top_three, total);
    let top10_pct = percent(top_ten, total);

    Metrics {
        agr,
        atgr,
        solv: top3_pct.round(),
        average_rank: agr,
        top20_average_rank: atgr,
        visibility_percentage: top10_pct,
        top3_visibility_pct: top3_pct,
        top10_visibility_pct: top10_pct,
        found_visibility_pct: percent(found.len(), total),
        top_three_count: top_three as u32,
        top_ten_count: top_ten as u32,
        not_ranked_count: (unranked + no_data) as u32,
        no_data_count: no_data as u32,
        total_rankings: total as u32,
        distribution: distribution(&values),
    }
}

/// Share of ranked (non-zero) values in each band, in percent.
pub fn distribution(values: &[u32]) -> RankDistribution {
    let mut counts = [0usize; RankBand::ALL.len()];
    for &v in values {
        counts[RankBand::of(v) as usize] += 1;
    }
    let total = values.len();
    let pct = |band: RankBand| percent(counts[band as usize], total);

    RankDistribution {
        top3: pct(RankBand::Top3),
        top4_to7: pct(RankBand::Top4To7),
        top8_to10: pct(RankBand::Top8To10),
        top11_to15: pct(RankBand::Top11To15),
        top16_to20: pct(RankBand::Top16To20),
        unranked: pct(RankBand::Unranked),
    }
}
