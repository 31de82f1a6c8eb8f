//! Offline-first paging data layer for a product catalog.
//!
//! - [`reachability`] tracks whether the network path is usable
//! - [`cache`] keeps pages in memory and on disk
//! - [`catalog`] fetches pages, writing through to the cache and falling back to it offline
//! - [`paging`] accumulates pages with a growing limit and notifies observers

pub mod app;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod paging;
pub mod reachability;
