//! Dashboard data models.

pub mod build;
pub mod github;
pub mod repository;
