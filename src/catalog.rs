//! Search / genre / pagination state behind the catalog page.
//!
//! Every state change that needs new data hands back a [`CatalogFetch`]. The
//! caller runs it (without holding the controller) and passes the resulting
//! [`CatalogResponse`] to [`CatalogController::apply`], which drops responses
//! overtaken by a later request.
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::FailureKind;
use crate::ticket::{Settled, Ticket, TicketCounter};
use crate::tmdb::{Genre, Movie, TmdbApi};

/// TMDB refuses to serve pages past 500.
pub const MAX_TOTAL_PAGES: u32 = 500;

/// `discover/movie` gives the browser no page count, so genre browsing
/// pretends the full 500 pages exist. A stand-in, not a real bound.
pub const GENRE_TOTAL_PAGES_POLICY: u32 = MAX_TOTAL_PAGES;

const PAGE_WINDOW_RADIUS: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchMode {
    Search { query: String, page: u32 },
    Genre { genre_id: i32, page: u32 },
    Popular { page: u32 },
}

impl FetchMode {
    fn for_state(state: &CatalogState) -> Self {
        if !state.query.trim().is_empty() {
            FetchMode::Search {
                query: state.query.clone(),
                page: state.page,
            }
        } else if let Some(genre_id) = state.selected_genre {
            FetchMode::Genre {
                genre_id,
                page: state.page,
            }
        } else {
            FetchMode::Popular { page: state.page }
        }
    }
}

#[derive(Debug, Clone)]
pub struct CatalogState {
    pub query: String,
    pub selected_genre: Option<i32>,
    pub page: u32,
    pub total_pages: u32,
    pub results: Vec<Movie>,
    pub loading: bool,
}

impl Default for CatalogState {
    fn default() -> Self {
        Self {
            query: String::new(),
            selected_genre: None,
            page: 1,
            total_pages: 1,
            results: Vec::new(),
            loading: false,
        }
    }
}

impl CatalogState {
    /// Up to five page numbers centred on the current page.
    pub fn page_window(&self) -> Vec<u32> {
        let start = self.page.saturating_sub(PAGE_WINDOW_RADIUS).max(1);
        let end = (self.page + PAGE_WINDOW_RADIUS).min(self.total_pages);
        (start..=end).collect()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// A listing as the controller sees it: results plus a page count.
#[derive(Debug, Clone)]
pub struct Listing {
    pub results: Vec<Movie>,
    pub total_pages: u32,
}

pub struct CatalogFetch {
    ticket: Ticket,
    mode: FetchMode,
    api: Arc<dyn TmdbApi>,
}

impl CatalogFetch {
    pub fn mode(&self) -> &FetchMode {
        &self.mode
    }

    pub async fn run(self) -> CatalogResponse {
        let result = fetch_listing(self.api.as_ref(), &self.mode).await;
        CatalogResponse {
            ticket: self.ticket,
            mode: self.mode,
            result,
        }
    }
}

async fn fetch_listing(api: &dyn TmdbApi, mode: &FetchMode) -> Result<Listing> {
    match mode {
        FetchMode::Search { query, page } => {
            let data = api.search_movies(query, *page).await?;
            Ok(Listing {
                results: data.results,
                total_pages: data.total_pages,
            })
        }
        FetchMode::Genre { genre_id, page } => {
            let results = api.discover_by_genre(*genre_id, *page).await?;
            Ok(Listing {
                results,
                total_pages: GENRE_TOTAL_PAGES_POLICY,
            })
        }
        FetchMode::Popular { page } => {
            let data = api.popular_movies(*page).await?;
            Ok(Listing {
                results: data.results,
                total_pages: data.total_pages,
            })
        }
    }
}

pub struct CatalogResponse {
    pub ticket: Ticket,
    pub mode: FetchMode,
    pub result: Result<Listing>,
}

pub struct CatalogController {
    api: Arc<dyn TmdbApi>,
    state: CatalogState,
    genres: Vec<Genre>,
    genres_loaded: bool,
    tickets: TicketCounter,
}

impl CatalogController {
    pub fn new(api: Arc<dyn TmdbApi>) -> Self {
        Self {
            api,
            state: CatalogState::default(),
            genres: Vec::new(),
            genres_loaded: false,
            tickets: TicketCounter::default(),
        }
    }

    /// Builds the controller and loads the genre list.
    pub async fn init(api: Arc<dyn TmdbApi>) -> Self {
        let mut controller = Self::new(api);
        controller.load_genres().await;
        controller
    }

    /// Fetches genres once per controller; failures leave the list empty.
    pub async fn load_genres(&mut self) {
        if self.genres_loaded {
            return;
        }
        match self.api.genres().await {
            Ok(genres) => {
                info!("Loaded {} genres", genres.len());
                self.genres = genres;
                self.genres_loaded = true;
            }
            Err(e) => warn!("Error fetching genres: {:#}", e),
        }
    }

    pub fn state(&self) -> &CatalogState {
        &self.state
    }

    pub fn genres(&self) -> &[Genre] {
        &self.genres
    }

    pub fn set_query(&mut self, text: &str) -> CatalogFetch {
        self.state.query = text.to_string();
        self.state.selected_genre = None;
        self.state.page = 1;
        self.issue()
    }

    /// `None` selects the unfiltered "All" listing.
    pub fn set_genre(&mut self, genre_id: Option<i32>) -> CatalogFetch {
        self.state.selected_genre = genre_id;
        self.state.query.clear();
        self.state.page = 1;
        self.issue()
    }

    /// Out-of-range pages change nothing and return `None`.
    pub fn set_page(&mut self, page: i64) -> Option<CatalogFetch> {
        if page < 1 || page > i64::from(self.state.total_pages) {
            debug!(page, total = self.state.total_pages, "Ignoring out-of-range page");
            return None;
        }
        self.state.page = page as u32;
        Some(self.issue())
    }

    /// Refetches the current filter state.
    pub fn refresh(&mut self) -> CatalogFetch {
        self.issue()
    }

    fn issue(&mut self) -> CatalogFetch {
        self.state.loading = true;
        let ticket = self.tickets.issue();
        let mode = FetchMode::for_state(&self.state);
        debug!(ticket = ticket.value(), ?mode, "Issuing catalog fetch");
        CatalogFetch {
            ticket,
            mode,
            api: Arc::clone(&self.api),
        }
    }

    pub fn apply(&mut self, response: CatalogResponse) -> Settled {
        if !self.tickets.is_current(response.ticket) {
            debug!(
                ticket = response.ticket.value(),
                mode = ?response.mode,
                "Discarding stale catalog response"
            );
            return Settled::Stale;
        }
        self.state.loading = false;
        match response.result {
            Ok(listing) => {
                self.state.results = listing.results;
                self.state.total_pages = listing.total_pages.clamp(1, MAX_TOTAL_PAGES);
                self.state.page = self.state.page.min(self.state.total_pages);
                Settled::Applied
            }
            Err(e) => {
                warn!("Error fetching movies ({:?}): {:#}", response.mode, e);
                Settled::Failed(FailureKind::classify(&e))
            }
        }
    }

    /// Runs `fetch` and applies it in one step.
    pub async fn settle(&mut self, fetch: CatalogFetch) -> Settled {
        let response = fetch.run().await;
        self.apply(response)
    }
}
