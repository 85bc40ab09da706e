use crate::catalog::{CatalogController, CatalogFetch};
use crate::config::Config;
use crate::details::DetailsController;
use crate::error::FailureKind;
use crate::favorites::FavoritesStore;
use crate::theme::ThemeStore;
use crate::ticket::Settled;
use crate::tmdb::{Movie, TmdbApi, TmdbClient};
use crate::views::{CatalogView, DetailsView, MovieCard};
use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

const MAX_BODY_BYTES: usize = 64 * 1024;

/// Lock order when more than one is needed: catalog, details, favorites.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Mutex<CatalogController>>,
    pub details: Arc<Mutex<DetailsController>>,
    pub favorites: Arc<Mutex<FavoritesStore>>,
    pub theme: Arc<Mutex<ThemeStore>>,
}

impl AppState {
    /// Loads genres and the first popular page before returning.
    pub async fn init(
        tmdb: Arc<dyn TmdbApi>,
        favorites: FavoritesStore,
        theme: ThemeStore,
    ) -> Self {
        let mut catalog = CatalogController::init(tmdb.clone()).await;
        let fetch = catalog.refresh();
        catalog.settle(fetch).await;

        Self {
            catalog: Arc::new(Mutex::new(catalog)),
            details: Arc::new(Mutex::new(DetailsController::new(tmdb))),
            favorites: Arc::new(Mutex::new(favorites)),
            theme: Arc::new(Mutex::new(theme)),
        }
    }

    pub async fn flush(&self) -> Result<()> {
        self.favorites.lock().await.flush()?;
        self.theme.lock().await.flush()?;
        Ok(())
    }
}

pub async fn run_server(config: Config) -> Result<()> {
    let tmdb: Arc<dyn TmdbApi> = Arc::new(TmdbClient::from_config(&config)?);
    let favorites = FavoritesStore::open(config.favorites_path())?;
    let theme = ThemeStore::open(config.theme_path())?;
    info!("Using data directory {:?}", config.data_dir);

    let state = AppState::init(tmdb, favorites, theme).await;
    let app = build_router(state.clone());

    info!("Listening on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.flush().await?;
    info!("Stores flushed, bye");
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/catalog", get(catalog_view))
        .route("/catalog/query", post(set_query))
        .route("/catalog/genre", post(set_genre))
        .route("/catalog/page", post(set_page))
        .route("/movie/:id", get(movie_details))
        .route("/favorites", get(list_favorites).post(add_favorite))
        .route("/favorites/:id", axum::routing::delete(remove_favorite))
        .route("/favorites/:id/toggle", post(toggle_favorite))
        .route("/theme", get(current_theme))
        .route("/theme/toggle", post(toggle_theme))
        .fallback(not_found)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "not found")
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn store_failure(err: anyhow::Error) -> Response {
    error!("Local store write failed: {:#}", err);
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "could not persist change")
}

#[derive(Deserialize)]
struct QueryBody {
    query: String,
}

#[derive(Deserialize)]
struct GenreBody {
    genre_id: Option<i32>,
}

#[derive(Deserialize)]
struct PageBody {
    page: i64,
}

async fn catalog_view(State(state): State<AppState>) -> Json<CatalogView> {
    let catalog = state.catalog.lock().await;
    let favorites = state.favorites.lock().await;
    Json(CatalogView::build(&catalog, &favorites, None))
}

async fn set_query(
    State(state): State<AppState>,
    Json(body): Json<QueryBody>,
) -> Json<CatalogView> {
    let fetch = state.catalog.lock().await.set_query(&body.query);
    settle_catalog(&state, fetch).await
}

async fn set_genre(
    State(state): State<AppState>,
    Json(body): Json<GenreBody>,
) -> Json<CatalogView> {
    let fetch = state.catalog.lock().await.set_genre(body.genre_id);
    settle_catalog(&state, fetch).await
}

async fn set_page(
    State(state): State<AppState>,
    Json(body): Json<PageBody>,
) -> Json<CatalogView> {
    let fetch = state.catalog.lock().await.set_page(body.page);
    match fetch {
        Some(fetch) => settle_catalog(&state, fetch).await,
        None => catalog_view(State(state)).await,
    }
}

/// Runs the fetch without holding the catalog lock so a newer request can be
/// issued meanwhile; `apply` drops this one if that happened.
async fn settle_catalog(state: &AppState, fetch: CatalogFetch) -> Json<CatalogView> {
    let response = fetch.run().await;
    let mut catalog = state.catalog.lock().await;
    let error = match catalog.apply(response) {
        Settled::Failed(kind) => Some(kind),
        Settled::Applied | Settled::Stale => None,
    };
    let favorites = state.favorites.lock().await;
    Json(CatalogView::build(&catalog, &favorites, error))
}

async fn movie_details(State(state): State<AppState>, Path(id): Path<i32>) -> Response {
    let fetch = state.details.lock().await.load(id);
    let response = fetch.run().await;

    let mut details = state.details.lock().await;
    match details.apply(response) {
        Settled::Applied | Settled::Stale => {}
        Settled::Failed(FailureKind::NotFound) => {
            return error_response(StatusCode::NOT_FOUND, "movie not found")
        }
        Settled::Failed(_) => {
            return error_response(StatusCode::BAD_GATEWAY, "could not load movie")
        }
    }

    match details.aggregate().filter(|a| a.movie.id == id) {
        Some(aggregate) => {
            let favorite = state.favorites.lock().await.contains(id);
            Json(DetailsView::build(aggregate, favorite)).into_response()
        }
        // Superseded by a load for another movie that has not finished yet.
        None => (
            StatusCode::ACCEPTED,
            Json(json!({ "movie_id": id, "loading": true })),
        )
            .into_response(),
    }
}

async fn list_favorites(State(state): State<AppState>) -> Json<Vec<MovieCard>> {
    let favorites = state.favorites.lock().await;
    Json(
        favorites
            .entries()
            .iter()
            .map(|e| MovieCard::new(&e.movie, true))
            .collect(),
    )
}

async fn add_favorite(State(state): State<AppState>, Json(movie): Json<Movie>) -> Response {
    let id = movie.id;
    match state.favorites.lock().await.add(movie) {
        Ok(true) => (
            StatusCode::CREATED,
            Json(json!({ "id": id, "favorite": true })),
        )
            .into_response(),
        Ok(false) => Json(json!({ "id": id, "favorite": true })).into_response(),
        Err(e) => store_failure(e),
    }
}

async fn remove_favorite(State(state): State<AppState>, Path(id): Path<i32>) -> Response {
    match state.favorites.lock().await.remove(id) {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => error_response(StatusCode::NOT_FOUND, "not a favorite"),
        Err(e) => store_failure(e),
    }
}

/// Favorites the movie using whatever snapshot is on screen: the catalog
/// results, or the loaded details page and its similar strip.
async fn toggle_favorite(State(state): State<AppState>, Path(id): Path<i32>) -> Response {
    let snapshot = find_snapshot(&state, id).await;
    let mut favorites = state.favorites.lock().await;
    let snapshot = match snapshot.or_else(|| favorites.get(id).map(|e| e.movie.clone())) {
        Some(movie) => movie,
        None => return error_response(StatusCode::NOT_FOUND, "movie is not on screen"),
    };
    match favorites.toggle(snapshot) {
        Ok(favorite) => Json(json!({ "id": id, "favorite": favorite })).into_response(),
        Err(e) => store_failure(e),
    }
}

async fn find_snapshot(state: &AppState, id: i32) -> Option<Movie> {
    let from_catalog = state
        .catalog
        .lock()
        .await
        .state()
        .results
        .iter()
        .find(|m| m.id == id)
        .cloned();
    if from_catalog.is_some() {
        return from_catalog;
    }
    let details = state.details.lock().await;
    let aggregate = details.aggregate()?;
    if aggregate.movie.id == id {
        return Some(aggregate.movie.summary());
    }
    aggregate.similar.iter().find(|m| m.id == id).cloned()
}

async fn current_theme(State(state): State<AppState>) -> Response {
    let theme = state.theme.lock().await.theme();
    Json(json!({ "theme": theme })).into_response()
}

async fn toggle_theme(State(state): State<AppState>) -> Response {
    match state.theme.lock().await.toggle() {
        Ok(theme) => Json(json!({ "theme": theme })).into_response(),
        Err(e) => store_failure(e),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        term.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
