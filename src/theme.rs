use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::favorites::write_atomically;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ThemeFile {
    theme: Theme,
}

/// Persisted light/dark preference. Defaults to light.
#[derive(Debug)]
pub struct ThemeStore {
    path: PathBuf,
    theme: Theme,
}

impl ThemeStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let theme = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<ThemeFile>(&raw) {
                Ok(file) => file.theme,
                Err(e) => {
                    warn!("Ignoring unreadable theme file {:?}: {}", path, e);
                    Theme::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Theme::default(),
            Err(e) => return Err(e).with_context(|| format!("Failed to read theme from {path:?}")),
        };
        Ok(Self { path, theme })
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn toggle(&mut self) -> Result<Theme> {
        self.theme = self.theme.toggled();
        info!("Theme switched to {:?}", self.theme);
        self.save()?;
        Ok(self.theme)
    }

    pub fn flush(&self) -> Result<()> {
        self.save()
    }

    fn save(&self) -> Result<()> {
        let body = serde_json::to_string(&ThemeFile { theme: self.theme })?;
        write_atomically(&self.path, &body)
            .with_context(|| format!("Failed to write theme to {:?}", self.path))
    }
}
