//! Persistence seam for per-user settings and readings.
//!
//! The engine only talks to [`Store`]. [`MemoryStore`] keeps everything in
//! process and is what the CLI and the tests run against.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::settings::{GlucoseReading, Settings};

/// Filter for reading queries. Results are always newest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadingQuery {
    /// Only readings at or after this instant.
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl ReadingQuery {
    pub fn since(at: DateTime<Utc>) -> Self {
        Self {
            since: Some(at),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn admits(&self, r: &GlucoseReading) -> bool {
        self.since.is_none_or(|since| r.timestamp >= since)
    }
}

pub trait Store: Send + Sync {
    /// `Ok(None)` when the user has never been seen.
    fn settings(&self, user: &str) -> Result<Option<Settings>, StoreError>;

    /// Replace the user's settings wholesale, creating the user if needed.
    fn save_settings(&self, user: &str, settings: Settings) -> Result<(), StoreError>;

    fn append_reading(&self, user: &str, reading: GlucoseReading) -> Result<(), StoreError>;

    /// Newest first. Unknown users have no readings.
    fn readings(&self, user: &str, query: &ReadingQuery) -> Result<Vec<GlucoseReading>, StoreError>;

    /// Remove the newest reading taken exactly at `at`.
    fn delete_reading(&self, user: &str, at: DateTime<Utc>) -> Result<GlucoseReading, StoreError>;

    /// Lock serializing read-modify-write cycles on one user's record.
    fn record_lock(&self, user: &str) -> Result<Arc<Mutex<()>>, StoreError>;
}

#[derive(Debug, Default)]
struct UserRecord {
    settings: Settings,
    /// Sorted newest first.
    readings: Vec<GlucoseReading>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, UserRecord>>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_count(&self) -> usize {
        self.users.read().map(|u| u.len()).unwrap_or(0)
    }
}

impl Store for MemoryStore {
    fn settings(&self, user: &str) -> Result<Option<Settings>, StoreError> {
        let users = self.users.read().map_err(|_| StoreError::Poisoned)?;
        Ok(users.get(user).map(|r| r.settings.clone()))
    }

    fn save_settings(&self, user: &str, settings: Settings) -> Result<(), StoreError> {
        let mut users = self.users.write().map_err(|_| StoreError::Poisoned)?;
        users.entry(user.to_owned()).or_default().settings = settings;
        Ok(())
    }

    fn append_reading(&self, user: &str, reading: GlucoseReading) -> Result<(), StoreError> {
        let mut users = self.users.write().map_err(|_| StoreError::Poisoned)?;
        let record = users
            .get_mut(user)
            .ok_or_else(|| StoreError::UserNotFound(user.to_owned()))?;
        let pos = record
            .readings
            .partition_point(|r| r.timestamp > reading.timestamp);
        record.readings.insert(pos, reading);
        Ok(())
    }

    fn readings(&self, user: &str, query: &ReadingQuery) -> Result<Vec<GlucoseReading>, StoreError> {
        let users = self.users.read().map_err(|_| StoreError::Poisoned)?;
        let Some(record) = users.get(user) else {
            return Ok(Vec::new());
        };
        let it = record.readings.iter().filter(|r| query.admits(r)).cloned();
        Ok(match query.limit {
            Some(n) => it.take(n).collect(),
            None => it.collect(),
        })
    }

    fn delete_reading(&self, user: &str, at: DateTime<Utc>) -> Result<GlucoseReading, StoreError> {
        let mut users = self.users.write().map_err(|_| StoreError::Poisoned)?;
        let record = users
            .get_mut(user)
            .ok_or_else(|| StoreError::UserNotFound(user.to_owned()))?;
        let pos = record
            .readings
            .iter()
            .position(|r| r.timestamp == at)
            .ok_or(StoreError::ReadingNotFound(at))?;
        Ok(record.readings.remove(pos))
    }

    fn record_lock(&self, user: &str) -> Result<Arc<Mutex<()>>, StoreError> {
        let mut locks = self.locks.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(Arc::clone(locks.entry(user.to_owned()).or_default()))
    }
}
