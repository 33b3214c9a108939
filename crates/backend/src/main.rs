mod config;
mod graphql;
mod retry;
mod storage;

use std::path::Path;

use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::http::HeaderValue;
use axum::{extract::State, response::Html, routing::get, Router};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use config::Config;
use graphql::Schema;

async fn graphql_handler(State(schema): State<Schema>, req: GraphQLRequest) -> GraphQLResponse {
    schema.execute(req.into_inner()).await.into()
}

async fn graphiql() -> Html<String> {
    Html(
        async_graphql::http::GraphiQLSource::build()
            .endpoint("/graphql")
            .finish(),
    )
}

/// Static file router with a fixed cache policy.
fn cached_static_router(dir: &Path, cache_header: &'static str) -> Router {
    let layer = SetResponseHeaderLayer::overriding(
        axum::http::header::CACHE_CONTROL,
        HeaderValue::from_static(cache_header),
    );
    Router::new()
        .fallback_service(ServeDir::new(dir))
        .layer(layer)
}

const CACHE_1DAY: &str = "public, max-age=86400, must-revalidate";

/// Build the full application router.
fn build_app(schema: Schema, rank_icons_dir: &Path) -> Router {
    Router::new()
        .route("/graphql", get(graphiql).post(graphql_handler))
        .route("/", get(serve_index))
        .with_state(schema)
        .nest(
            "/images/rank-icons",
            cached_static_router(rank_icons_dir, CACHE_1DAY),
        )
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("geogrid_backend=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let storage = storage::Storage::open(&config.db_path)?;
    let results = storage.count()?;
    tracing::info!(
        db_path = %config.db_path.display(),
        results,
        "grid result store ready"
    );

    let schema = graphql::build_schema(storage, config.retry);
    let app = build_app(schema, &config.rank_icons_dir);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "server listening, GraphiQL at /graphql");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn serve_index() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html>
<head><title>Geogrid Rank Tracker</title></head>
<body>
<h1>Geogrid Rank Tracker</h1>
<p>Visit <a href="/graphql">GraphiQL</a> to explore the API.</p>
</body>
</html>"#,
    )
}
