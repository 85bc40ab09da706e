use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::Config;
use crate::error::TmdbError;

pub const TMDB_BASE: &str = "https://api.themoviedb.org/3";

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    base_url: String,
    api_key: String,
}

/// One method per TMDB endpoint the browser uses. Responses are passed through
/// as returned; nothing is cached or retried.
#[async_trait]
pub trait TmdbApi: Send + Sync {
    async fn popular_movies(&self, page: u32) -> Result<MoviePage>;
    async fn search_movies(&self, query: &str, page: u32) -> Result<MoviePage>;
    async fn movie_details(&self, id: i32) -> Result<MovieDetails>;
    async fn movie_videos(&self, id: i32) -> Result<Videos>;
    async fn movie_credits(&self, id: i32) -> Result<Credits>;
    async fn similar_movies(&self, id: i32) -> Result<MoviePage>;
    async fn genres(&self) -> Result<Vec<Genre>>;
    /// Discover results carry no usable page count for the browser, so only the
    /// bare list is returned.
    async fn discover_by_genre(&self, genre_id: i32, page: u32) -> Result<Vec<Movie>>;
}

/// List item shape shared by popular, search, discover and similar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: i32,
    pub title: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub vote_average: f32,
    #[serde(default)]
    pub genre_ids: Vec<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoviePage {
    #[serde(default)]
    pub page: u32,
    pub results: Vec<Movie>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genre {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieDetails {
    pub id: i32,
    pub title: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub vote_average: f32,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub tagline: Option<String>,
}

impl MovieDetails {
    /// List-shaped snapshot, used when favoriting from the details page.
    pub fn summary(&self) -> Movie {
        Movie {
            id: self.id,
            title: self.title.clone(),
            poster_path: self.poster_path.clone(),
            overview: self.overview.clone(),
            release_date: self.release_date.clone(),
            vote_average: self.vote_average,
            genre_ids: self.genres.iter().map(|g| g.id).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Videos {
    #[serde(default)]
    pub results: Vec<Video>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub key: String,
    #[serde(default)]
    pub site: String,
    #[serde(rename = "type")]
    pub video_type: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credits {
    #[serde(default)]
    pub cast: Vec<CastMember>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastMember {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub character: Option<String>,
    #[serde(default)]
    pub profile_path: Option<String>,
}

#[derive(Deserialize)]
struct GenreList {
    genres: Vec<Genre>,
}

impl TmdbClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let user_agent = format!("cineview/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent)
            .build()
            .context("Failed to build TMDB HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.tmdb_base_url, &config.tmdb_api_key)
    }

    /// `query` is the already-encoded query string without the credential.
    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &str) -> Result<T> {
        let url = if query.is_empty() {
            format!("{}/{path}?api_key={}", self.base_url, self.api_key)
        } else {
            format!("{}/{path}?{query}&api_key={}", self.base_url, self.api_key)
        };
        debug!(path, query, "TMDB request");

        let res = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| TmdbError::Network {
                path: path.to_string(),
                source: source.without_url(),
            })?;
        let status = res.status();
        let text = res.text().await.map_err(|source| TmdbError::Network {
            path: path.to_string(),
            source: source.without_url(),
        })?;
        if status == StatusCode::NOT_FOUND {
            return Err(TmdbError::NotFound {
                path: path.to_string(),
            }
            .into());
        }
        if !status.is_success() {
            return Err(TmdbError::Api {
                path: path.to_string(),
                status,
                body: text,
            }
            .into());
        }
        let parsed = serde_json::from_str(&text).map_err(|source| TmdbError::Decode {
            path: path.to_string(),
            source,
        })?;
        Ok(parsed)
    }
}

#[async_trait]
impl TmdbApi for TmdbClient {
    async fn popular_movies(&self, page: u32) -> Result<MoviePage> {
        self.get_json("movie/popular", &format!("page={page}")).await
    }

    async fn search_movies(&self, query: &str, page: u32) -> Result<MoviePage> {
        let q = format!("query={}&page={page}", urlencoding::encode(query));
        self.get_json("search/movie", &q).await
    }

    async fn movie_details(&self, id: i32) -> Result<MovieDetails> {
        self.get_json(&format!("movie/{id}"), "").await
    }

    async fn movie_videos(&self, id: i32) -> Result<Videos> {
        self.get_json(&format!("movie/{id}/videos"), "").await
    }

    async fn movie_credits(&self, id: i32) -> Result<Credits> {
        self.get_json(&format!("movie/{id}/credits"), "").await
    }

    async fn similar_movies(&self, id: i32) -> Result<MoviePage> {
        self.get_json(&format!("movie/{id}/similar"), "").await
    }

    async fn genres(&self) -> Result<Vec<Genre>> {
        let data: GenreList = self.get_json("genre/movie/list", "").await?;
        Ok(data.genres)
    }

    async fn discover_by_genre(&self, genre_id: i32, page: u32) -> Result<Vec<Movie>> {
        let q = format!("with_genres={genre_id}&page={page}");
        let data: MoviePage = self.get_json("discover/movie", &q).await?;
        Ok(data.results)
    }
}
