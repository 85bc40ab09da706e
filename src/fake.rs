//! Recording `TmdbApi` double for controller tests.
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;

use crate::error::TmdbError;
use crate::tmdb::{
    CastMember, Credits, Genre, Movie, MovieDetails, MoviePage, TmdbApi, Video, Videos,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Popular(u32),
    Search(String, u32),
    Details(i32),
    Videos(i32),
    Credits(i32),
    Similar(i32),
    Genres,
    Discover(i32, u32),
}

pub struct FakeTmdb {
    pub calls: Mutex<Vec<Call>>,
    pub popular_total_pages: u32,
    pub search_total_pages: u32,
    pub genres: Vec<Genre>,
    pub videos: Vec<Video>,
    pub cast: Vec<CastMember>,
    pub similar: Vec<Movie>,
    /// Endpoint names ("popular", "search", "details", ...) that fail.
    pub failing: HashSet<&'static str>,
    pub missing_movies: HashSet<i32>,
}

impl Default for FakeTmdb {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            popular_total_pages: 40_000,
            search_total_pages: 20,
            genres: vec![
                Genre { id: 28, name: "Action".to_string() },
                Genre { id: 35, name: "Comedy".to_string() },
            ],
            videos: Vec::new(),
            cast: Vec::new(),
            similar: Vec::new(),
            failing: HashSet::new(),
            missing_movies: HashSet::new(),
        }
    }
}

impl FakeTmdb {
    pub fn failing(endpoints: &[&'static str]) -> Self {
        Self {
            failing: endpoints.iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, endpoint: &'static str, call: Call) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if self.failing.contains(endpoint) {
            anyhow::bail!("{endpoint} is down");
        }
        Ok(())
    }
}

pub fn movie(id: i32, title: &str) -> Movie {
    Movie {
        id,
        title: title.to_string(),
        poster_path: Some(format!("/poster-{id}.jpg")),
        overview: format!("Overview of {title}"),
        release_date: Some("2021-06-01".to_string()),
        vote_average: 6.5,
        genre_ids: Vec::new(),
    }
}

pub fn cast_member(id: i32) -> CastMember {
    CastMember {
        id,
        name: format!("Actor {id}"),
        character: Some(format!("Role {id}")),
        profile_path: None,
    }
}

pub fn video(key: &str, video_type: &str) -> Video {
    Video {
        key: key.to_string(),
        site: "YouTube".to_string(),
        video_type: video_type.to_string(),
        name: format!("{video_type} {key}"),
    }
}

fn page_of(label: &str, page: u32, total_pages: u32) -> MoviePage {
    let base = page as i32 * 100;
    MoviePage {
        page,
        results: vec![
            movie(base + 1, &format!("{label} p{page} #1")),
            movie(base + 2, &format!("{label} p{page} #2")),
        ],
        total_pages,
        total_results: total_pages * 2,
    }
}

#[async_trait]
impl TmdbApi for FakeTmdb {
    async fn popular_movies(&self, page: u32) -> Result<MoviePage> {
        self.record("popular", Call::Popular(page))?;
        Ok(page_of("popular", page, self.popular_total_pages))
    }

    async fn search_movies(&self, query: &str, page: u32) -> Result<MoviePage> {
        self.record("search", Call::Search(query.to_string(), page))?;
        Ok(page_of(query, page, self.search_total_pages))
    }

    async fn movie_details(&self, id: i32) -> Result<MovieDetails> {
        self.record("details", Call::Details(id))?;
        if self.missing_movies.contains(&id) {
            return Err(TmdbError::NotFound {
                path: format!("movie/{id}"),
            }
            .into());
        }
        Ok(MovieDetails {
            id,
            title: format!("Movie {id}"),
            poster_path: Some(format!("/poster-{id}.jpg")),
            backdrop_path: None,
            overview: "Details overview".to_string(),
            release_date: Some("1999-03-31".to_string()),
            runtime: Some(136),
            vote_average: 8.21,
            genres: vec![Genre { id: 28, name: "Action".to_string() }],
            tagline: None,
        })
    }

    async fn movie_videos(&self, id: i32) -> Result<Videos> {
        self.record("videos", Call::Videos(id))?;
        Ok(Videos {
            results: self.videos.clone(),
        })
    }

    async fn movie_credits(&self, id: i32) -> Result<Credits> {
        self.record("credits", Call::Credits(id))?;
        Ok(Credits {
            cast: self.cast.clone(),
        })
    }

    async fn similar_movies(&self, id: i32) -> Result<MoviePage> {
        self.record("similar", Call::Similar(id))?;
        Ok(MoviePage {
            page: 1,
            results: self.similar.clone(),
            total_pages: 1,
            total_results: self.similar.len() as u32,
        })
    }

    async fn genres(&self) -> Result<Vec<Genre>> {
        self.record("genres", Call::Genres)?;
        Ok(self.genres.clone())
    }

    async fn discover_by_genre(&self, genre_id: i32, page: u32) -> Result<Vec<Movie>> {
        self.record("discover", Call::Discover(genre_id, page))?;
        Ok(page_of(&format!("genre {genre_id}"), page, 0).results)
    }
}
