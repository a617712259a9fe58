//! Storage vocabulary shared by the queue and admissions repositories.

use std::sync::{Mutex, MutexGuard};

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists: {0}")]
    Conflict(String),
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Result of a write guarded by an expected prior state.
///
/// Stores report `Rejected` with the state they actually found, leaving the record untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guarded<T, S> {
    Applied(T),
    Rejected(S),
    Missing,
}

pub(crate) fn lock<'a, T>(
    mutex: &'a Mutex<T>,
    name: &str,
) -> Result<MutexGuard<'a, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable(format!("{name} lock poisoned")))
}
