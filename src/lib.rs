//! animek - A client for anime scraper REST APIs.
//!
//! The upstream API answers in several incompatible JSON shapes. This crate
//! fetches it and normalizes every response into fixed view models:
//! - Anime listings, search results, details and genres
//! - Episodes with their streaming servers and resolved streaming content
//! - Batch downloads, resolved through a cascade of fallback strategies

pub mod batch;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod logging;
pub mod normalize;
pub mod service;
pub mod transport;
