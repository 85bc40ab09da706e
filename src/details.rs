//! Aggregation behind the movie details page.
use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::FailureKind;
use crate::ticket::{Settled, Ticket, TicketCounter};
use crate::tmdb::{CastMember, Credits, Movie, MovieDetails, MoviePage, TmdbApi, Videos};

pub const CAST_LIMIT: usize = 8;
pub const SIMILAR_LIMIT: usize = 6;

/// Everything the details page shows. Only ever built from four complete
/// responses.
#[derive(Debug, Clone, Serialize)]
pub struct DetailsAggregate {
    pub movie: MovieDetails,
    pub trailer_key: Option<String>,
    pub cast: Vec<CastMember>,
    pub similar: Vec<Movie>,
}

impl DetailsAggregate {
    pub fn assemble(
        movie: MovieDetails,
        videos: Videos,
        credits: Credits,
        similar: MoviePage,
    ) -> Self {
        let trailer_key = select_trailer(&videos);
        let cast = credits.cast.into_iter().take(CAST_LIMIT).collect();
        let similar = similar.results.into_iter().take(SIMILAR_LIMIT).collect();
        Self {
            movie,
            trailer_key,
            cast,
            similar,
        }
    }
}

fn select_trailer(videos: &Videos) -> Option<String> {
    videos
        .results
        .iter()
        .find(|v| v.video_type == "Trailer")
        .map(|v| v.key.clone())
}

pub struct DetailsFetch {
    ticket: Ticket,
    movie_id: i32,
    api: Arc<dyn TmdbApi>,
}

impl DetailsFetch {
    pub async fn run(self) -> DetailsResponse {
        let result = fetch_aggregate(self.api.as_ref(), self.movie_id).await;
        DetailsResponse {
            ticket: self.ticket,
            movie_id: self.movie_id,
            result,
        }
    }
}

async fn fetch_aggregate(api: &dyn TmdbApi, id: i32) -> Result<DetailsAggregate> {
    let (details, videos, credits, similar) = tokio::try_join!(
        api.movie_details(id),
        api.movie_videos(id),
        api.movie_credits(id),
        api.similar_movies(id),
    )?;
    Ok(DetailsAggregate::assemble(details, videos, credits, similar))
}

pub struct DetailsResponse {
    pub ticket: Ticket,
    pub movie_id: i32,
    pub result: Result<DetailsAggregate>,
}

pub struct DetailsController {
    api: Arc<dyn TmdbApi>,
    movie_id: Option<i32>,
    aggregate: Option<DetailsAggregate>,
    loading: bool,
    tickets: TicketCounter,
}

impl DetailsController {
    pub fn new(api: Arc<dyn TmdbApi>) -> Self {
        Self {
            api,
            movie_id: None,
            aggregate: None,
            loading: false,
            tickets: TicketCounter::default(),
        }
    }

    pub fn movie_id(&self) -> Option<i32> {
        self.movie_id
    }

    pub fn aggregate(&self) -> Option<&DetailsAggregate> {
        self.aggregate.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Switches to `id` and drops whatever was shown before.
    pub fn load(&mut self, id: i32) -> DetailsFetch {
        self.movie_id = Some(id);
        self.aggregate = None;
        self.loading = true;
        let ticket = self.tickets.issue();
        debug!(ticket = ticket.value(), movie_id = id, "Issuing details fetch");
        DetailsFetch {
            ticket,
            movie_id: id,
            api: Arc::clone(&self.api),
        }
    }

    pub fn apply(&mut self, response: DetailsResponse) -> Settled {
        if !self.tickets.is_current(response.ticket) {
            debug!(
                ticket = response.ticket.value(),
                movie_id = response.movie_id,
                "Discarding stale details response"
            );
            return Settled::Stale;
        }
        self.loading = false;
        match response.result {
            Ok(aggregate) => {
                info!(
                    "Loaded details for '{}' ({})",
                    aggregate.movie.title, response.movie_id
                );
                self.aggregate = Some(aggregate);
                Settled::Applied
            }
            Err(e) => {
                warn!("Error fetching details for {}: {:#}", response.movie_id, e);
                Settled::Failed(FailureKind::classify(&e))
            }
        }
    }

    pub async fn settle(&mut self, fetch: DetailsFetch) -> Settled {
        let response = fetch.run().await;
        self.apply(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{cast_member, movie, video, Call, FakeTmdb};

    fn controller(fake: FakeTmdb) -> (DetailsController, Arc<FakeTmdb>) {
        let fake = Arc::new(fake);
        let api: Arc<dyn TmdbApi> = fake.clone();
        (DetailsController::new(api), fake)
    }

    #[tokio::test]
    async fn picks_first_trailer_key() {
        let (mut details, _fake) = controller(FakeTmdb {
            videos: vec![
                video("teaser1", "Teaser"),
                video("abc123", "Trailer"),
                video("later", "Trailer"),
            ],
            ..FakeTmdb::default()
        });

        let fetch = details.load(603);
        assert_eq!(details.settle(fetch).await, Settled::Applied);

        let aggregate = details.aggregate().unwrap();
        assert_eq!(aggregate.trailer_key.as_deref(), Some("abc123"));
        assert_eq!(aggregate.movie.id, 603);
    }

    #[tokio::test]
    async fn no_trailer_when_none_listed() {
        let (mut details, _fake) = controller(FakeTmdb {
            videos: vec![video("clip", "Clip")],
            ..FakeTmdb::default()
        });

        let fetch = details.load(603);
        details.settle(fetch).await;
        assert_eq!(details.aggregate().unwrap().trailer_key, None);
    }

    #[tokio::test]
    async fn trims_cast_and_similar_in_order() {
        let (mut details, fake) = controller(FakeTmdb {
            cast: (1..=12).map(cast_member).collect(),
            similar: (1..=10).map(|i| movie(i, &format!("Similar {i}"))).collect(),
            ..FakeTmdb::default()
        });

        let fetch = details.load(603);
        details.settle(fetch).await;

        let aggregate = details.aggregate().unwrap();
        let cast_ids: Vec<i32> = aggregate.cast.iter().map(|c| c.id).collect();
        assert_eq!(cast_ids, (1..=8).collect::<Vec<_>>());
        let similar_ids: Vec<i32> = aggregate.similar.iter().map(|m| m.id).collect();
        assert_eq!(similar_ids, (1..=6).collect::<Vec<_>>());

        let mut calls = fake.calls();
        calls.sort_by_key(|c| format!("{c:?}"));
        assert_eq!(
            calls,
            vec![
                Call::Credits(603),
                Call::Details(603),
                Call::Similar(603),
                Call::Videos(603),
            ]
        );
    }

    #[tokio::test]
    async fn one_failed_fetch_publishes_nothing() {
        let (mut details, _fake) = controller(FakeTmdb::failing(&["credits"]));

        let fetch = details.load(603);
        let settled = details.settle(fetch).await;

        assert_eq!(settled, Settled::Failed(FailureKind::Network));
        assert!(details.aggregate().is_none());
        assert!(!details.is_loading());
        assert_eq!(details.movie_id(), Some(603));
    }

    #[tokio::test]
    async fn unknown_movie_reports_not_found() {
        let mut fake = FakeTmdb::default();
        fake.missing_movies.insert(42);
        let (mut details, _fake) = controller(fake);

        let fetch = details.load(42);
        assert_eq!(
            details.settle(fetch).await,
            Settled::Failed(FailureKind::NotFound)
        );
    }

    #[tokio::test]
    async fn superseded_load_is_discarded() {
        let (mut details, _fake) = controller(FakeTmdb::default());

        let first = details.load(603);
        let second = details.load(604);

        let second_response = second.run().await;
        let first_response = first.run().await;
        assert_eq!(details.apply(second_response), Settled::Applied);
        assert_eq!(details.apply(first_response), Settled::Stale);

        assert_eq!(details.aggregate().unwrap().movie.id, 604);
        assert_eq!(details.movie_id(), Some(604));
    }

    #[tokio::test]
    async fn new_load_hides_previous_aggregate() {
        let (mut details, _fake) = controller(FakeTmdb::default());

        let fetch = details.load(603);
        details.settle(fetch).await;
        assert!(details.aggregate().is_some());

        let pending = details.load(604);
        assert!(details.aggregate().is_none());
        assert!(details.is_loading());

        let latest = details.load(605);
        drop(pending);
        details.settle(latest).await;
        assert_eq!(details.aggregate().unwrap().movie.id, 605);
    }
}
