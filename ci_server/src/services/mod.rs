//! Sync services — GitHub client, status mapping, sync engine, scheduler.

pub mod error;
pub mod github_service;
pub mod scheduler;
pub mod status_mapper;
pub mod sync_service;

#[cfg(test)]
pub mod test_support;
