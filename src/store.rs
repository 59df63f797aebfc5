//! Storage seams for the mock backend.
//!
//! Services hold `Arc<dyn ...>` handles to these traits and never own the
//! underlying maps, so a real database can replace the in-memory versions
//! without touching business logic.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::AcademyResult;
use crate::models::{Course, ProgressRecord};

/// Read-only source of course structures.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn courses(&self) -> AcademyResult<Vec<Course>>;
    async fn course(&self, course_id: &str) -> AcademyResult<Option<Course>>;
}

/// Per-(user, course) progress records, replaced wholesale on save.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn load(&self, user_id: &str, course_id: &str) -> AcademyResult<Option<ProgressRecord>>;
    async fn save(&self, record: &ProgressRecord) -> AcademyResult<()>;
}

/// String key-value store holding serialized blobs.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> AcademyResult<Option<String>>;
    async fn set(&self, key: &str, value: String) -> AcademyResult<()>;
    async fn remove(&self, key: &str) -> AcademyResult<()>;
}

#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> AcademyResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> AcademyResult<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> AcademyResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// Progress records serialized as JSON blobs, one key per (user, course).
pub struct KvProgressStore {
    kv: Arc<dyn KeyValueStore>,
}

impl KvProgressStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    fn key(user_id: &str, course_id: &str) -> String {
        format!("progress:{user_id}:{course_id}")
    }
}

#[async_trait]
impl ProgressStore for KvProgressStore {
    async fn load(&self, user_id: &str, course_id: &str) -> AcademyResult<Option<ProgressRecord>> {
        match self.kv.get(&Self::key(user_id, course_id)).await? {
            Some(blob) => Ok(Some(serde_json::from_str(&blob)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, record: &ProgressRecord) -> AcademyResult<()> {
        let blob = serde_json::to_string(record)?;
        self.kv
            .set(&Self::key(&record.user_id, &record.course_id), blob)
            .await
    }
}

/// Artificial delay standing in for a network round trip.
#[derive(Debug, Clone, Copy, Default)]
pub struct Latency(pub Duration);

impl Latency {
    pub const NONE: Latency = Latency(Duration::ZERO);

    pub async fn simulate(&self) {
        if !self.0.is_zero() {
            tracing::debug!(ms = self.0.as_millis() as u64, "simulating backend latency");
            tokio::time::sleep(self.0).await;
        }
    }
}
