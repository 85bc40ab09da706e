const IMAGE_BASE: &str = "https://image.tmdb.org/t/p";
const YOUTUBE_EMBED: &str = "https://www.youtube.com/embed";

const PROFILE_PLACEHOLDER: &str = "https://via.placeholder.com/185x278?text=No+Image";

/// TMDB size tiers used for posters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PosterSize {
    /// Thumbnails in the similar-movies strip.
    W342,
    /// Catalog cards, favorites and the details header.
    W500,
}

impl PosterSize {
    fn tier(self) -> &'static str {
        match self {
            PosterSize::W342 => "w342",
            PosterSize::W500 => "w500",
        }
    }

    fn placeholder(self) -> &'static str {
        match self {
            PosterSize::W342 => "https://via.placeholder.com/342x513?text=No+Image",
            PosterSize::W500 => "https://via.placeholder.com/300x450?text=No+Image",
        }
    }
}

pub fn poster_url(path: Option<&str>, size: PosterSize) -> String {
    match non_empty(path) {
        Some(p) => format!("{IMAGE_BASE}/{}{p}", size.tier()),
        None => size.placeholder().to_string(),
    }
}

pub fn profile_url(path: Option<&str>) -> String {
    match non_empty(path) {
        Some(p) => format!("{IMAGE_BASE}/w185{p}"),
        None => PROFILE_PLACEHOLDER.to_string(),
    }
}

pub fn trailer_embed_url(key: &str) -> String {
    format!("{YOUTUBE_EMBED}/{key}")
}

fn non_empty(path: Option<&str>) -> Option<&str> {
    path.filter(|p| !p.is_empty())
}
