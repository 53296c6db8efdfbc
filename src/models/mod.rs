//! Data models for the news backend.
//!
//! Field names serialize in camelCase to match the frontend's `INews` shape.

mod article;

pub use article::*;
