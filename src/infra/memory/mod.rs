//! In-process stores used for demos, tests, and running without Postgres.

mod articles;
mod seed;
mod statuses;

pub use articles::MemoryContentStore;
pub use seed::seed_demo_content;
pub use statuses::MemoryStatusStore;
