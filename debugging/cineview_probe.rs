//! Hit the TMDB endpoints the browser uses and print what comes back.
//! Usage:
//!   cargo run --bin cineview_probe -- popular [page]
//!   cargo run --bin cineview_probe -- search <query> [page]
//!   cargo run --bin cineview_probe -- genre <genre_id> [page]
//!   cargo run --bin cineview_probe -- genres
//!   cargo run --bin cineview_probe -- movie <tmdb_id>
//! Requires TMDB_API_KEY in the environment (.env supported).

use anyhow::{Context, Result};
use cineview::details::DetailsController;
use cineview::ticket::Settled;
use cineview::tmdb::{TmdbApi, TmdbClient, TMDB_BASE};
use cineview::views::DetailsView;
use dotenvy::dotenv;
use serde::Serialize;
use std::env;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Command {
    Popular,
    Search,
    Genre,
    Genres,
    Movie,
}

impl FromStr for Command {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "popular" => Ok(Command::Popular),
            "search" => Ok(Command::Search),
            "genre" => Ok(Command::Genre),
            "genres" => Ok(Command::Genres),
            "movie" => Ok(Command::Movie),
            _ => Err(anyhow::anyhow!(
                "command must be one of popular, search, genre, genres, movie"
            )),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        usage();
    }

    let command = Command::from_str(&args[1])?;
    let api_key = env::var("TMDB_API_KEY").context("TMDB_API_KEY not set")?;
    let base_url = env::var("TMDB_BASE_URL").unwrap_or_else(|_| TMDB_BASE.to_string());
    let client = TmdbClient::new(base_url, api_key)?;

    match command {
        Command::Popular => {
            let page = page_arg(&args, 2)?;
            print(&client.popular_movies(page).await?)?;
        }
        Command::Search => {
            let query = args.get(2).context("missing search query")?;
            let page = page_arg(&args, 3)?;
            print(&client.search_movies(query, page).await?)?;
        }
        Command::Genre => {
            let genre_id: i32 = args
                .get(2)
                .context("missing genre id")?
                .parse()
                .context("genre id must be an integer")?;
            let page = page_arg(&args, 3)?;
            print(&client.discover_by_genre(genre_id, page).await?)?;
        }
        Command::Genres => print(&client.genres().await?)?,
        Command::Movie => {
            let id: i32 = args
                .get(2)
                .context("missing tmdb id")?
                .parse()
                .context("tmdb_id must be an integer")?;
            let mut details = DetailsController::new(Arc::new(client));
            let fetch = details.load(id);
            if let Settled::Failed(kind) = details.settle(fetch).await {
                anyhow::bail!("loading movie {id} failed: {kind:?}");
            }
            let aggregate = details.aggregate().context("no details loaded")?;
            print(&DetailsView::build(aggregate, false))?;
        }
    }

    Ok(())
}

fn usage() -> ! {
    eprintln!("Usage: cargo run --bin cineview_probe -- popular [page]");
    eprintln!("       cargo run --bin cineview_probe -- search <query> [page]");
    eprintln!("       cargo run --bin cineview_probe -- genre <genre_id> [page]");
    eprintln!("       cargo run --bin cineview_probe -- genres");
    eprintln!("       cargo run --bin cineview_probe -- movie <tmdb_id>");
    std::process::exit(1);
}

fn page_arg(args: &[String], index: usize) -> Result<u32> {
    let Some(raw) = args.get(index) else {
        return Ok(1);
    };
    let page: u32 = raw.parse().context("page must be a positive integer")?;
    anyhow::ensure!(page >= 1, "page must be a positive integer");
    Ok(page)
}

fn print<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn page_defaults_to_one() {
        assert_eq!(page_arg(&args(&["probe", "popular"]), 2).unwrap(), 1);
        assert_eq!(page_arg(&args(&["probe", "popular", "7"]), 2).unwrap(), 7);
    }

    #[test]
    fn page_zero_and_garbage_are_rejected() {
        assert!(page_arg(&args(&["probe", "popular", "0"]), 2).is_err());
        assert!(page_arg(&args(&["probe", "popular", "-2"]), 2).is_err());
        assert!(page_arg(&args(&["probe", "search", "x", "two"]), 3).is_err());
    }
}
