//! Persisted favorites, keyed by TMDB movie id.
//!
//! The store is opened once at startup, mutated through `&mut self` and
//! written back to disk after every change. `flush` writes it once more at shutdown.
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::tmdb::Movie;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoriteEntry {
    #[serde(flatten)]
    pub movie: Movie,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct FavoritesStore {
    path: PathBuf,
    entries: Vec<FavoriteEntry>,
}

impl FavoritesStore {
    /// Loads favorites from `path`. A missing file is an empty store; an
    /// unreadable one is logged and replaced on the next write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<Vec<FavoriteEntry>>(&raw) {
                Ok(entries) => dedupe(entries),
                Err(e) => {
                    warn!("Ignoring unreadable favorites file {:?}: {}", path, e);
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read favorites from {path:?}"))
            }
        };
        info!("Loaded {} favorites from {:?}", entries.len(), path);
        Ok(Self { path, entries })
    }

    pub fn contains(&self, id: i32) -> bool {
        self.entries.iter().any(|e| e.movie.id == id)
    }

    pub fn get(&self, id: i32) -> Option<&FavoriteEntry> {
        self.entries.iter().find(|e| e.movie.id == id)
    }

    /// In the order they were added.
    pub fn entries(&self) -> &[FavoriteEntry] {
        &self.entries
    }

    /// Returns `false` when the movie was already a favorite.
    pub fn add(&mut self, movie: Movie) -> Result<bool> {
        if self.contains(movie.id) {
            return Ok(false);
        }
        info!("Adding favorite '{}' ({})", movie.title, movie.id);
        self.entries.push(FavoriteEntry {
            movie,
            added_at: Utc::now(),
        });
        self.save()?;
        Ok(true)
    }

    /// Returns `false` when there was nothing to remove.
    pub fn remove(&mut self, id: i32) -> Result<bool> {
        let before = self.entries.len();
        self.entries.retain(|e| e.movie.id != id);
        if self.entries.len() == before {
            return Ok(false);
        }
        info!("Removed favorite {}", id);
        self.save()?;
        Ok(true)
    }

    /// Returns whether the movie is a favorite afterwards.
    pub fn toggle(&mut self, movie: Movie) -> Result<bool> {
        if self.contains(movie.id) {
            self.remove(movie.id)?;
            Ok(false)
        } else {
            self.add(movie)?;
            Ok(true)
        }
    }

    pub fn flush(&self) -> Result<()> {
        self.save()
    }

    fn save(&self) -> Result<()> {
        let body = serde_json::to_string_pretty(&self.entries)?;
        write_atomically(&self.path, &body)
            .with_context(|| format!("Failed to write favorites to {:?}", self.path))
    }
}

fn dedupe(entries: Vec<FavoriteEntry>) -> Vec<FavoriteEntry> {
    let mut seen = std::collections::HashSet::new();
    entries
        .into_iter()
        .filter(|e| seen.insert(e.movie.id))
        .collect()
}

/// Writes through a sibling temp file so a crash never leaves half a document.
pub(crate) fn write_atomically(path: &Path, body: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, body)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(id: i32, title: &str) -> Movie {
        Movie {
            id,
            title: title.to_string(),
            poster_path: Some(format!("/{id}.jpg")),
            overview: String::new(),
            release_date: Some("2020-01-01".to_string()),
            vote_average: 7.5,
            genre_ids: vec![28],
        }
    }

    #[test]
    fn add_is_unique_per_movie_id() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FavoritesStore::open(dir.path().join("favorites.json")).unwrap();

        assert!(store.add(movie(1, "One")).unwrap());
        assert!(!store.add(movie(1, "One again")).unwrap());
        assert_eq!(store.entries().len(), 1);
        assert_eq!(store.entries()[0].movie.title, "One");
    }

    #[test]
    fn remove_and_toggle() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FavoritesStore::open(dir.path().join("favorites.json")).unwrap();

        assert!(!store.remove(5).unwrap());
        assert!(store.toggle(movie(5, "Five")).unwrap());
        assert!(store.contains(5));
        assert!(!store.toggle(movie(5, "Five")).unwrap());
        assert!(!store.contains(5));
    }

    #[test]
    fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("favorites.json");
        {
            let mut store = FavoritesStore::open(&path).unwrap();
            store.add(movie(2, "Two")).unwrap();
            store.add(movie(3, "Three")).unwrap();
            store.remove(2).unwrap();
            store.flush().unwrap();
        }

        let store = FavoritesStore::open(&path).unwrap();
        assert!(store.contains(3));
        assert!(!store.contains(2));
        assert_eq!(store.get(3).unwrap().movie, movie(3, "Three"));
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("favorites.json");
        fs::write(&path, "{ not json").unwrap();

        let store = FavoritesStore::open(&path).unwrap();
        assert!(store.entries().is_empty());
    }

    #[test]
    fn duplicate_ids_on_disk_collapse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("favorites.json");
        let entry = FavoriteEntry {
            movie: movie(9, "Nine"),
            added_at: Utc::now(),
        };
        let doubled = vec![entry.clone(), entry];
        fs::write(&path, serde_json::to_string(&doubled).unwrap()).unwrap();

        let store = FavoritesStore::open(&path).unwrap();
        assert_eq!(store.entries().len(), 1);
    }
}
