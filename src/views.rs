//! JSON view models handed to clients of the page surface.
use serde::Serialize;

use crate::catalog::CatalogController;
use crate::details::DetailsAggregate;
use crate::error::FailureKind;
use crate::favorites::FavoritesStore;
use crate::images::{poster_url, profile_url, trailer_embed_url, PosterSize};
use crate::tmdb::{CastMember, Movie};

#[derive(Debug, Serialize)]
pub struct MovieCard {
    pub id: i32,
    pub title: String,
    pub poster_url: String,
    pub rating: String,
    pub release_date: Option<String>,
    pub favorite: bool,
}

impl MovieCard {
    pub fn new(movie: &Movie, favorite: bool) -> Self {
        Self {
            id: movie.id,
            title: movie.title.clone(),
            poster_url: poster_url(movie.poster_path.as_deref(), PosterSize::W500),
            rating: format_rating(movie.vote_average),
            release_date: movie.release_date.clone(),
            favorite,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GenreChip {
    /// `None` is the "All" chip.
    pub id: Option<i32>,
    pub name: String,
    pub selected: bool,
}

#[derive(Debug, Serialize)]
pub struct CatalogView {
    pub query: String,
    pub selected_genre: Option<i32>,
    pub page: u32,
    pub total_pages: u32,
    pub loading: bool,
    pub pages: Vec<u32>,
    pub has_prev: bool,
    pub has_next: bool,
    pub genres: Vec<GenreChip>,
    pub results: Vec<MovieCard>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FailureKind>,
}

impl CatalogView {
    pub fn build(
        catalog: &CatalogController,
        favorites: &FavoritesStore,
        error: Option<FailureKind>,
    ) -> Self {
        let state = catalog.state();
        let mut genres = vec![GenreChip {
            id: None,
            name: "All".to_string(),
            selected: state.selected_genre.is_none(),
        }];
        genres.extend(catalog.genres().iter().map(|g| GenreChip {
            id: Some(g.id),
            name: g.name.clone(),
            selected: state.selected_genre == Some(g.id),
        }));

        Self {
            query: state.query.clone(),
            selected_genre: state.selected_genre,
            page: state.page,
            total_pages: state.total_pages,
            loading: state.loading,
            pages: state.page_window(),
            has_prev: state.has_prev(),
            has_next: state.has_next(),
            genres,
            results: state
                .results
                .iter()
                .map(|m| MovieCard::new(m, favorites.contains(m.id)))
                .collect(),
            error,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CastCard {
    pub id: i32,
    pub name: String,
    pub character: Option<String>,
    pub profile_url: String,
}

impl From<&CastMember> for CastCard {
    fn from(c: &CastMember) -> Self {
        Self {
            id: c.id,
            name: c.name.clone(),
            character: c.character.clone(),
            profile_url: profile_url(c.profile_path.as_deref()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SimilarCard {
    pub id: i32,
    pub title: String,
    pub poster_url: String,
}

#[derive(Debug, Serialize)]
pub struct DetailsView {
    pub id: i32,
    pub title: String,
    pub tagline: Option<String>,
    pub poster_url: String,
    pub release_date: Option<String>,
    pub runtime: Option<u32>,
    pub overview: String,
    pub rating: String,
    pub genres: Vec<String>,
    pub trailer_url: Option<String>,
    pub cast: Vec<CastCard>,
    pub similar: Vec<SimilarCard>,
    pub favorite: bool,
}

impl DetailsView {
    pub fn build(aggregate: &DetailsAggregate, favorite: bool) -> Self {
        let movie = &aggregate.movie;
        Self {
            id: movie.id,
            title: movie.title.clone(),
            tagline: movie.tagline.clone().filter(|t| !t.is_empty()),
            poster_url: poster_url(movie.poster_path.as_deref(), PosterSize::W500),
            release_date: movie.release_date.clone(),
            runtime: movie.runtime,
            overview: movie.overview.clone(),
            rating: format_rating(movie.vote_average),
            genres: movie.genres.iter().map(|g| g.name.clone()).collect(),
            trailer_url: aggregate.trailer_key.as_deref().map(trailer_embed_url),
            cast: aggregate.cast.iter().map(CastCard::from).collect(),
            similar: aggregate
                .similar
                .iter()
                .map(|m| SimilarCard {
                    id: m.id,
                    title: m.title.clone(),
                    poster_url: poster_url(m.poster_path.as_deref(), PosterSize::W342),
                })
                .collect(),
            favorite,
        }
    }
}

fn format_rating(vote_average: f32) -> String {
    format!("{:.1}", vote_average)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::movie;

    #[test]
    fn ratings_have_one_decimal() {
        assert_eq!(format_rating(8.219), "8.2");
        assert_eq!(format_rating(7.0), "7.0");
        assert_eq!(format_rating(0.0), "0.0");
    }

    #[test]
    fn card_without_poster_uses_placeholder() {
        let mut m = movie(7, "Seven");
        m.poster_path = None;
        let card = MovieCard::new(&m, true);
        assert_eq!(
            card.poster_url,
            "https://via.placeholder.com/300x450?text=No+Image"
        );
        assert!(card.favorite);
    }
}
