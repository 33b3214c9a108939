use serde::{Deserialize, Serialize};

/// Highest rank position that counts as "found".
pub const MAX_TRACKED_RANK: u32 = 20;

/// Value unranked positions are clamped to when averaging.
pub const UNRANKED_CLAMP: u32 = MAX_TRACKED_RANK + 1;

/// Gray used for cells where no data was collected at all.
pub const NO_DATA_COLOR: &str = "#9E9E9E";

const RANK_ICON_DIR: &str = "/images/rank-icons";

/// Severity bucket for a rank, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RankBand {
    Top3,
    Top4To7,
    Top8To10,
    Top11To15,
    Top16To20,
    Unranked,
}

impl RankBand {
    pub const ALL: [RankBand; 6] = [
        RankBand::Top3,
        RankBand::Top4To7,
        RankBand::Top8To10,
        RankBand::Top11To15,
        RankBand::Top16To20,
        RankBand::Unranked,
    ];

    /// `0` (no data) and anything past 20 are both unranked.
    pub fn of(rank: u32) -> Self {
        match rank {
            1..=3 => RankBand::Top3,
            4..=7 => RankBand::Top4To7,
            8..=10 => RankBand::Top8To10,
            11..=15 => RankBand::Top11To15,
            16..=20 => RankBand::Top16To20,
            _ => RankBand::Unranked,
        }
    }
}

impl std::fmt::Display for RankBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RankBand::Top3 => "Top 3",
            RankBand::Top4To7 => "4-7",
            RankBand::Top8To10 => "8-10",
            RankBand::Top11To15 => "11-15",
            RankBand::Top16To20 => "16-20",
            RankBand::Unranked => "20+",
        };
        write!(f, "{name}")
    }
}

/// Color scheme. Map markers and exported canvases disagree on the top-3
/// green, so both are kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Palette {
    #[default]
    Map,
    Export,
}

impl Palette {
    pub fn color(self, band: RankBand) -> &'static str {
        match (self, band) {
            (Palette::Map, RankBand::Top3) => "#059669",
            (Palette::Export, RankBand::Top3) => "#1b5e20",
            (_, RankBand::Top4To7) => "#10b981",
            (_, RankBand::Top8To10) => "#f59e0b",
            (_, RankBand::Top11To15) => "#f97316",
            (_, RankBand::Top16To20) | (_, RankBand::Unranked) => "#ef4444",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankClass {
    pub band: RankBand,
    pub color: &'static str,
    pub label: String,
    pub icon_path: String,
}

pub fn classify(rank: u32, palette: Palette) -> RankClass {
    let band = RankBand::of(rank);
    RankClass {
        band,
        color: palette.color(band),
        label: rank_label(rank),
        icon_path: rank_icon_path(rank),
    }
}

/// Like the band color, but gray for cells with no data instead of the
/// unranked red.
pub fn cell_color(rank: u32, palette: Palette) -> &'static str {
    if rank == 0 {
        NO_DATA_COLOR
    } else {
        palette.color(RankBand::of(rank))
    }
}

pub fn rank_label(rank: u32) -> String {
    if rank > MAX_TRACKED_RANK {
        "20+".to_string()
    } else {
        rank.to_string()
    }
}

pub fn rank_icon_path(rank: u32) -> String {
    match rank {
        1..=MAX_TRACKED_RANK => format!("{RANK_ICON_DIR}/{rank}.png"),
        _ => format!("{RANK_ICON_DIR}/X.png"),
    }
}
