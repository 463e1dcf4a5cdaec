//! In-memory stand-ins for the object store and the queue broker

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use bytes::Bytes;
use futures_util::stream;
use metrics_exporter_prometheus::PrometheusBuilder;

use video_job_gateway::{
    app_state::AppState,
    models::video::JobMessage,
    routes,
    services::{
        correlation::CorrelationStore,
        queue::{JobProducer, MessageBroker, QueueError},
        storage::{ObjectStore, ObjectStream, StorageError},
    },
};

pub const JOB_TOPIC: &str = "video-creation-requests";

/// Object store backed by a map.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, Bytes>>,
    pub upload_calls: AtomicUsize,
    pub fail_uploads: AtomicBool,
}

impl MemoryObjectStore {
    pub fn put(&self, key: &str, data: &'static [u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), Bytes::from_static(data));
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn uploads(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload(&self, key: &str, data: Bytes, _content_type: &str) -> Result<(), StorageError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(StorageError::Status {
                key: key.to_string(),
                status: 503,
            });
        }
        self.objects.lock().unwrap().insert(key.to_string(), data);
        Ok(())
    }

    async fn download_stream(&self, key: &str) -> Result<ObjectStream, StorageError> {
        let data = self
            .objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        // Two chunks, to exercise streaming.
        let mid = data.len() / 2;
        let chunks = vec![
            Ok::<_, StorageError>(data.slice(..mid)),
            Ok(data.slice(mid..)),
        ];
        Ok(Box::pin(stream::iter(chunks)))
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.objects.lock().unwrap().contains_key(key))
    }
}

/// Broker that records topic creations and published messages.
#[derive(Default)]
pub struct MemoryBroker {
    topics: Mutex<HashSet<String>>,
    messages: Mutex<Vec<(String, String)>>,
    pub create_calls: AtomicUsize,
    pub fail_publish: AtomicBool,
}

impl MemoryBroker {
    pub fn creates(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn published(&self) -> Vec<(String, String)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn published_jobs(&self) -> Vec<JobMessage> {
        self.published()
            .iter()
            .map(|(_, payload)| serde_json::from_str(payload).unwrap())
            .collect()
    }
}

#[async_trait]
impl MessageBroker for MemoryBroker {
    async fn topic_exists(&self, topic: &str) -> Result<bool, QueueError> {
        Ok(self.topics.lock().unwrap().contains(topic))
    }

    async fn create_topic(&self, topic: &str) -> Result<(), QueueError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.topics.lock().unwrap().insert(topic.to_string());
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: &str) -> Result<String, QueueError> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(QueueError::Redis(redis::RedisError::from((
                redis::ErrorKind::IoError,
                "broker unavailable",
            ))));
        }
        let mut messages = self.messages.lock().unwrap();
        messages.push((topic.to_string(), payload.to_string()));
        Ok(format!("{}-0", messages.len()))
    }

    async fn health_check(&self) -> Result<(), QueueError> {
        Ok(())
    }
}

/// Application state wired to in-memory collaborators.
pub struct Harness {
    pub state: AppState,
    pub store: Arc<CorrelationStore>,
    pub storage: Arc<MemoryObjectStore>,
    pub broker: Arc<MemoryBroker>,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(CorrelationStore::new());
        let storage = Arc::new(MemoryObjectStore::default());
        let broker = Arc::new(MemoryBroker::default());
        let producer = JobProducer::new(broker.clone(), JOB_TOPIC);
        let state = AppState::new(store.clone(), storage.clone(), producer, 20);
        Self {
            state,
            store,
            storage,
            broker,
        }
    }

    pub fn router(&self) -> Router {
        let prometheus = Arc::new(PrometheusBuilder::new().build_recorder().handle());
        routes::router(self.state.clone(), prometheus, 50 * 1024 * 1024)
    }
}
