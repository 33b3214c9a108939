use std::sync::Arc;

use async_graphql::{Context, Enum, InputObject, Object, SimpleObject, ID};
use geogrid_shared::{
    compare::{self, Competitor, CompetitorStanding, TrendPoint},
    export, grid,
    metrics::compute_metrics,
    models::{
        self, BusinessInfo, GeoPoint, GridConfig, GridSize, Metrics, NewGridResult,
        RankDistribution, RankingMatrix,
    },
    rank::{self, Palette, RankBand, RankClass},
};

use crate::retry::RetryPolicy;
use crate::storage::{RepositoryError, Storage};

#[derive(Enum, Copy, Clone, Eq, PartialEq)]
pub enum GqlPalette {
    Map,
    Export,
}

impl From<GqlPalette> for Palette {
    fn from(p: GqlPalette) -> Self {
        match p {
            GqlPalette::Map => Palette::Map,
            GqlPalette::Export => Palette::Export,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq)]
pub enum GqlRankBand {
    #[graphql(name = "TOP3")]
    Top3,
    #[graphql(name = "TOP4_TO7")]
    Top4To7,
    #[graphql(name = "TOP8_TO10")]
    Top8To10,
    #[graphql(name = "TOP11_TO15")]
    Top11To15,
    #[graphql(name = "TOP16_TO20")]
    Top16To20,
    Unranked,
}

impl From<RankBand> for GqlRankBand {
    fn from(b: RankBand) -> Self {
        match b {
            RankBand::Top3 => GqlRankBand::Top3,
            RankBand::Top4To7 => GqlRankBand::Top4To7,
            RankBand::Top8To10 => GqlRankBand::Top8To10,
            RankBand::Top11To15 => GqlRankBand::Top11To15,
            RankBand::Top16To20 => GqlRankBand::Top16To20,
            RankBand::Unranked => GqlRankBand::Unranked,
        }
    }
}

// GraphQL output types

#[derive(SimpleObject, Clone)]
pub struct GqlGeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl From<GeoPoint> for GqlGeoPoint {
    fn from(p: GeoPoint) -> Self {
        GqlGeoPoint { lat: p.lat, lng: p.lng }
    }
}

#[derive(SimpleObject)]
pub struct GqlRankClass {
    pub band: GqlRankBand,
    pub color: String,
    pub label: String,
    pub icon_path: String,
}

impl From<RankClass> for GqlRankClass {
    fn from(c: RankClass) -> Self {
        GqlRankClass {
            band: c.band.into(),
            color: c.color.to_string(),
            label: c.label,
            icon_path: c.icon_path,
        }
    }
}

#[derive(SimpleObject)]
pub struct GqlGridCell {
    pub row: i32,
    pub col: i32,
    pub lat: f64,
    pub lng: f64,
    pub rank: i32,
    pub band: GqlRankBand,
    pub color: String,
    pub label: String,
    pub icon_path: String,
}

#[derive(SimpleObject)]
pub struct GqlRankDistribution {
    pub top3: f64,
    pub top4_to7: f64,
    pub top8_to10: f64,
    pub top11_to15: f64,
    pub top16_to20: f64,
    pub unranked: f64,
}

impl From<RankDistribution> for GqlRankDistribution {
    fn from(d: RankDistribution) -> Self {
        GqlRankDistribution {
            top3: d.top3,
            top4_to7: d.top4_to7,
            top8_to10: d.top8_to10,
            top11_to15: d.top11_to15,
            top16_to20: d.top16_to20,
            unranked: d.unranked,
        }
    }
}

#[derive(SimpleObject)]
pub struct GqlMetrics {
    pub agr: f64,
    pub atgr: f64,
    pub solv: f64,
    pub average_rank: f64,
    pub top20_average_rank: f64,
    /// Same as top10VisibilityPct; kept for older dashboards.
    pub visibility_percentage: f64,
    pub top3_visibility_pct: f64,
    pub top10_visibility_pct: f64,
    pub found_visibility_pct: f64,
    pub top_three_count: u32,
    pub top_ten_count: u32,
    pub not_ranked_count: u32,
    pub no_data_count: u32,
    pub total_rankings: u32,
    pub distribution: GqlRankDistribution,
}

impl From<Metrics> for GqlMetrics {
    fn from(m: Metrics) -> Self {
        GqlMetrics {
            agr: m.agr,
            atgr: m.atgr,
            solv: m.solv,
            average_rank: m.average_rank,
            top20_average_rank: m.top20_average_rank,
            visibility_percentage: m.visibility_percentage,
            top3_visibility_pct: m.top3_visibility_pct,
            top10_visibility_pct: m.top10_visibility_pct,
            found_visibility_pct: m.found_visibility_pct,
            top_three_count: m.top_three_count,
            top_ten_count: m.top_ten_count,
            not_ranked_count: m.not_ranked_count,
            no_data_count: m.no_data_count,
            total_rankings: m.total_rankings,
            distribution: m.distribution.into(),
        }
    }
}

#[derive(SimpleObject)]
pub struct GqlBusinessInfo {
    pub name: String,
    pub address: String,
    pub location: GqlGeoPoint,
    pub category: Option<String>,
    pub place_id: Option<String>,
}

#[derive(SimpleObject)]
pub struct GqlGridResult {
    pub id: ID,
    pub business_info: GqlBusinessInfo,
    pub search_term: String,
    pub created_at: String,
    pub grid_size: String,
    pub grid_data: Vec<Vec<i32>>,
    pub metrics: GqlMetrics,
    pub google_region: String,
    pub distance_km: f64,
}

impl From<models::GridResult> for GqlGridResult {
    fn from(r: models::GridResult) -> Self {
        GqlGridResult {
            id: ID(r.id.to_string()),
            business_info: GqlBusinessInfo {
                name: r.business_info.name,
                address: r.business_info.address,
                location: r.business_info.location.into(),
                category: r.business_info.category,
                place_id: r.business_info.place_id,
            },
            search_term: r.search_term,
            created_at: r.created_at,
            grid_size: r.grid_size.to_string(),
            grid_data: from_matrix(&r.grid_data),
            metrics: r.metrics.into(),
            google_region: r.google_region,
            distance_km: r.distance_km,
        }
    }
}

#[derive(SimpleObject)]
pub struct GqlCompetitorStanding {
    pub position: u32,
    pub name: String,
    pub tracked: bool,
    pub metrics: GqlMetrics,
    pub agr_delta: Option<f64>,
}

impl From<CompetitorStanding> for GqlCompetitorStanding {
    fn from(s: CompetitorStanding) -> Self {
        GqlCompetitorStanding {
            position: s.position as u32,
            name: s.name,
            tracked: s.tracked,
            metrics: s.metrics.into(),
            agr_delta: s.agr_delta,
        }
    }
}

#[derive(SimpleObject)]
pub struct GqlTrendPoint {
    pub result_id: ID,
    pub created_at: String,
    pub agr: f64,
    pub atgr: f64,
    pub solv: f64,
    pub agr_change: Option<f64>,
}

impl From<TrendPoint> for GqlTrendPoint {
    fn from(t: TrendPoint) -> Self {
        GqlTrendPoint {
            result_id: ID(t.result_id.to_string()),
            created_at: t.created_at,
            agr: t.agr,
            atgr: t.atgr,
            solv: t.solv,
            agr_change: t.agr_change,
        }
    }
}

#[derive(SimpleObject)]
pub struct GqlStats {
    pub total_results: u64,
    pub db_size_bytes: u64,
}

// Input types

#[derive(InputObject)]
pub struct GeoPointInput {
    pub lat: f64,
    pub lng: f64,
}

impl From<GeoPointInput> for GeoPoint {
    fn from(p: GeoPointInput) -> Self {
        GeoPoint::new(p.lat, p.lng)
    }
}

#[derive(InputObject)]
pub struct GridConfigInput {
    pub center: GeoPointInput,
    pub size: i32,
    pub spacing_km: f64,
}

impl TryFrom<GridConfigInput> for GridConfig {
    type Error = async_graphql::Error;

    fn try_from(input: GridConfigInput) -> Result<Self, Self::Error> {
        let size = u32::try_from(input.size).map_err(|_| {
            async_graphql::Error::new(format!("grid size must be positive, got {}", input.size))
        })?;
        Ok(GridConfig::new(input.center.into(), size, input.spacing_km))
    }
}

#[derive(InputObject)]
pub struct BusinessInfoInput {
    pub name: String,
    pub address: String,
    pub location: GeoPointInput,
    pub category: Option<String>,
    pub place_id: Option<String>,
}

#[derive(InputObject)]
pub struct SaveGridResultInput {
    pub business_info: BusinessInfoInput,
    pub search_term: String,
    /// Either a bare count (`"7"`) or a label (`"7x7"`); stored as given.
    pub grid_size: String,
    pub grid_data: Vec<Vec<i32>>,
    pub google_region: Option<String>,
    pub distance_km: f64,
}

#[derive(InputObject)]
pub struct CompetitorInput {
    pub name: String,
    pub grid_data: Vec<Vec<i32>>,
    pub tracked: Option<bool>,
}

/// Engine and repository errors surface to clients as their message.
fn gql_error(err: impl std::fmt::Display) -> async_graphql::Error {
    async_graphql::Error::new(err.to_string())
}

fn to_matrix(data: Vec<Vec<i32>>) -> async_graphql::Result<RankingMatrix> {
    data.into_iter()
        .map(|row| {
            row.into_iter()
                .map(|v| {
                    u32::try_from(v).map_err(|_| {
                        async_graphql::Error::new(format!("rank must not be negative, got {v}"))
                    })
                })
                .collect::<async_graphql::Result<Vec<u32>>>()
        })
        .collect()
}

fn from_matrix(matrix: &[Vec<u32>]) -> Vec<Vec<i32>> {
    matrix
        .iter()
        .map(|row| row.iter().map(|&v| v.min(i32::MAX as u32) as i32).collect())
        .collect()
}

fn to_rank(rank: i32) -> async_graphql::Result<u32> {
    u32::try_from(rank)
        .map_err(|_| async_graphql::Error::new(format!("rank must not be negative, got {rank}")))
}

fn parse_grid_size(raw: &str) -> GridSize {
    match raw.trim().parse::<u32>() {
        Ok(n) => GridSize::Points(n),
        Err(_) => GridSize::Label(raw.trim().to_string()),
    }
}

// Query root

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Lattice points around a center, row-major from the south-west.
    async fn grid_points(&self, config: GridConfigInput) -> async_graphql::Result<Vec<GqlGeoPoint>> {
        let config = GridConfig::try_from(config)?;
        let points = grid::generate_grid(&config).map_err(gql_error)?;
        Ok(points.into_iter().map(GqlGeoPoint::from).collect())
    }

    /// Lattice points paired with their rankings and marker styling.
    async fn ranked_grid(
        &self,
        config: GridConfigInput,
        grid_data: Vec<Vec<i32>>,
        palette: Option<GqlPalette>,
    ) -> async_graphql::Result<Vec<GqlGridCell>> {
        let config = GridConfig::try_from(config)?;
        let matrix = to_matrix(grid_data)?;
        let palette: Palette = palette.map(Palette::from).unwrap_or_default();

        grid::check_matrix_shape(&matrix, config.size).map_err(gql_error)?;
        let points = grid::generate_grid(&config).map_err(gql_error)?;
        let ranked = grid::zip_with_matrix(&points, &matrix, config.size).map_err(gql_error)?;

        Ok(ranked
            .into_iter()
            .map(|cell| {
                let class = rank::classify(cell.rank, palette);
                GqlGridCell {
                    row: cell.row as i32,
                    col: cell.col as i32,
                    lat: cell.point.lat,
                    lng: cell.point.lng,
                    rank: cell.rank.min(i32::MAX as u32) as i32,
                    band: class.band.into(),
                    color: rank::cell_color(cell.rank, palette).to_string(),
                    label: class.label,
                    icon_path: class.icon_path,
                }
            })
            .collect())
    }

    async fn classify_rank(
        &self,
        rank: i32,
        palette: Option<GqlPalette>,
    ) -> async_graphql::Result<GqlRankClass> {
        let palette: Palette = palette.map(Palette::from).unwrap_or_default();
        Ok(rank::classify(to_rank(rank)?, palette).into())
    }

    async fn compute_metrics(&self, grid_data: Vec<Vec<i32>>) -> async_graphql::Result<GqlMetrics> {
        let matrix = to_matrix(grid_data)?;
        Ok(compute_metrics(&matrix).into())
    }

    async fn compare_competitors(
        &self,
        competitors: Vec<CompetitorInput>,
    ) -> async_graphql::Result<Vec<GqlCompetitorStanding>> {
        let competitors = competitors
            .into_iter()
            .map(|c| -> async_graphql::Result<Competitor> {
                Ok(Competitor {
                    name: c.name,
                    grid_data: to_matrix(c.grid_data)?,
                    tracked: c.tracked.unwrap_or(false),
                })
            })
            .collect::<async_graphql::Result<Vec<_>>>()?;

        Ok(compare::compare_competitors(&competitors)
            .into_iter()
            .map(GqlCompetitorStanding::from)
            .collect())
    }

    async fn grid_results(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<GqlGridResult>> {
        let storage = ctx.data::<Arc<Storage>>()?;
        let retry = ctx.data::<RetryPolicy>()?;
        let results = retry
            .run(move || async move { storage.get_all() })
            .await
            .map_err(gql_error)?;
        Ok(results.into_iter().map(GqlGridResult::from).collect())
    }

    async fn grid_result(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<Option<GqlGridResult>> {
        let storage = ctx.data::<Arc<Storage>>()?;
        let retry = ctx.data::<RetryPolicy>()?;
        let id = id.as_str();
        let result = retry
            .run(move || async move { storage.get_by_id(id) })
            .await
            .map_err(gql_error)?;
        Ok(result.map(GqlGridResult::from))
    }

    /// CSV of a stored run. `spacingKm` overrides the stored point spacing.
    async fn export_csv(
        &self,
        ctx: &Context<'_>,
        id: ID,
        spacing_km: Option<f64>,
    ) -> async_graphql::Result<String> {
        let storage = ctx.data::<Arc<Storage>>()?;
        let retry = ctx.data::<RetryPolicy>()?;
        let id = id.as_str();
        let result = retry
            .run(move || async move { storage.get_by_id(id) })
            .await
            .map_err(gql_error)?
            .ok_or_else(|| async_graphql::Error::new("Grid result not found"))?;

        let mut config = result.grid_config().map_err(gql_error)?;
        if let Some(spacing) = spacing_km {
            config.spacing_km = spacing;
        }
        export::grid_csv(&config, &result.grid_data).map_err(gql_error)
    }

    async fn keyword_trend(
        &self,
        ctx: &Context<'_>,
        search_term: String,
        business_name: Option<String>,
    ) -> async_graphql::Result<Vec<GqlTrendPoint>> {
        let storage = ctx.data::<Arc<Storage>>()?;
        let retry = ctx.data::<RetryPolicy>()?;
        let results = retry
            .run(move || async move { storage.get_all() })
            .await
            .map_err(gql_error)?;

        Ok(
            compare::keyword_trend(&results, &search_term, business_name.as_deref())
                .into_iter()
                .map(GqlTrendPoint::from)
                .collect(),
        )
    }

    async fn stats(&self, ctx: &Context<'_>) -> async_graphql::Result<GqlStats> {
        let storage = ctx.data::<Arc<Storage>>()?;
        let retry = ctx.data::<RetryPolicy>()?;
        let (total_results, db_size_bytes) = retry
            .run(move || async move {
                Ok::<_, RepositoryError>((storage.count()?, storage.db_size_bytes()?))
            })
            .await
            .map_err(gql_error)?;
        Ok(GqlStats {
            total_results,
            db_size_bytes,
        })
    }
}

// Mutation root

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Validate a finished run, compute its metrics and persist it.
    async fn save_grid_result(
        &self,
        ctx: &Context<'_>,
        input: SaveGridResultInput,
    ) -> async_graphql::Result<GqlGridResult> {
        let storage = ctx.data::<Arc<Storage>>()?;
        let retry = ctx.data::<RetryPolicy>()?;

        let new_result = NewGridResult {
            business_info: BusinessInfo {
                name: input.business_info.name,
                address: input.business_info.address,
                location: input.business_info.location.into(),
                category: input.business_info.category,
                place_id: input.business_info.place_id,
            },
            search_term: input.search_term,
            grid_size: parse_grid_size(&input.grid_size),
            grid_data: to_matrix(input.grid_data)?,
            google_region: input.google_region.unwrap_or_default(),
            distance_km: input.distance_km,
        };

        let config = new_result.grid_config().map_err(gql_error)?;
        config.validate().map_err(gql_error)?;
        grid::check_matrix_shape(&new_result.grid_data, config.size).map_err(gql_error)?;

        let metrics = compute_metrics(&new_result.grid_data);
        let (input, metrics) = (&new_result, &metrics);
        let saved = retry
            .run(move || async move { storage.save(input, metrics) })
            .await
            .map_err(gql_error)?;

        tracing::info!(
            id = %saved.id,
            business = %saved.business_info.name,
            search_term = %saved.search_term,
            agr = saved.metrics.agr,
            solv = saved.metrics.solv,
            "saved grid result"
        );
        Ok(GqlGridResult::from(saved))
    }

    async fn delete_grid_result(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<bool> {
        let storage = ctx.data::<Arc<Storage>>()?;
        let retry = ctx.data::<RetryPolicy>()?;
        let id = id.as_str();
        let removed = retry
            .run(move || async move { storage.delete(id) })
            .await
            .map_err(gql_error)?;
        if removed {
            tracing::info!(id, "deleted grid result");
        }
        Ok(removed)
    }
}

pub type Schema = async_graphql::Schema<QueryRoot, MutationRoot, async_graphql::EmptySubscription>;

pub fn build_schema(storage: Arc<Storage>, retry: RetryPolicy) -> Schema {
    async_graphql::Schema::build(QueryRoot, MutationRoot, async_graphql::EmptySubscription)
        .data(storage)
        .data(retry)
        .finish()
}
