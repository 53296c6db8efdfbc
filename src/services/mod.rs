//! Application services sitting between the HTTP handlers and the store.

mod news;

pub use news::*;
