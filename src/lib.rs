pub mod app;
pub mod catalog;
pub mod config;
pub mod details;
pub mod error;
pub mod favorites;
pub mod images;
pub mod theme;
pub mod ticket;
pub mod tmdb;
pub mod views;

#[cfg(test)]
mod fake;
