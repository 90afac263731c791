//! Penna: a blog content store with a read-through cache in front of it.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub(crate) mod util;
