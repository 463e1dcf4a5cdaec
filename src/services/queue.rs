use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashSet;
use redis::aio::MultiplexedConnection;
use redis::streams::{StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;

use crate::models::video::JobMessage;

/// Stream entry field carrying the JSON message body.
const PAYLOAD_FIELD: &str = "payload";

/// Publishing side of the message broker.
#[async_trait]
pub trait MessageBroker: Send + Sync {
    async fn topic_exists(&self, topic: &str) -> Result<bool, QueueError>;

    /// Create `topic`. Must succeed if the topic already exists.
    async fn create_topic(&self, topic: &str) -> Result<(), QueueError>;

    /// Append `payload` to `topic`, returning the broker-assigned message id.
    async fn publish(&self, topic: &str, payload: &str) -> Result<String, QueueError>;

    async fn health_check(&self) -> Result<(), QueueError>;
}

/// One message handed to a consumer, identified for acknowledgement.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub id: String,
    pub payload: Vec<u8>,
}

/// Consuming side of the message broker.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Wait for the next batch of messages. An empty batch means nothing arrived in time.
    async fn poll(&self) -> Result<Vec<Delivery>, QueueError>;

    /// Advance the consumer past the given messages.
    async fn ack(&self, ids: &[String]) -> Result<(), QueueError>;
}

/// Redis streams broker. Each topic is a stream; creating a topic creates the
/// consumer group that reads it.
pub struct RedisBroker {
    client: redis::Client,
    consumer_group: String,
}

impl RedisBroker {
    pub fn new(redis_url: &str, consumer_group: &str) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url).map_err(QueueError::Redis)?;
        Ok(Self {
            client,
            consumer_group: consumer_group.to_string(),
        })
    }
}

/// `XGROUP CREATE ... MKSTREAM`, treating an existing group as success.
async fn ensure_group(
    conn: &mut MultiplexedConnection,
    stream: &str,
    group: &str,
) -> Result<(), QueueError> {
    match conn
        .xgroup_create_mkstream::<_, _, _, ()>(stream, group, "0")
        .await
    {
        Ok(()) => Ok(()),
        Err(e) if e.code() == Some("BUSYGROUP") => Ok(()),
        Err(e) => Err(QueueError::Redis(e)),
    }
}

#[async_trait]
impl MessageBroker for RedisBroker {
    async fn topic_exists(&self, topic: &str) -> Result<bool, QueueError> {
        let mut conn = self.client.get_multiplexed_async_connection().await.map_err(QueueError::Redis)?;
        let exists: bool = conn.exists(topic).await.map_err(QueueError::Redis)?;
        Ok(exists)
    }

    async fn create_topic(&self, topic: &str) -> Result<(), QueueError> {
        let mut conn = self.client.get_multiplexed_async_connection().await.map_err(QueueError::Redis)?;
        ensure_group(&mut conn, topic, &self.consumer_group).await
    }

    async fn publish(&self, topic: &str, payload: &str) -> Result<String, QueueError> {
        let mut conn = self.client.get_multiplexed_async_connection().await.map_err(QueueError::Redis)?;
        let id: String = conn
            .xadd(topic, "*", &[(PAYLOAD_FIELD, payload)])
            .await
            .map_err(QueueError::Redis)?;
        Ok(id)
    }

    async fn health_check(&self) -> Result<(), QueueError> {
        let mut conn = self.client.get_multiplexed_async_connection().await.map_err(QueueError::Redis)?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(QueueError::Redis)?;
        Ok(())
    }
}

/// Publishes job messages, making sure the job topic exists first.
pub struct JobProducer {
    broker: Arc<dyn MessageBroker>,
    topic: String,
    known_topics: DashSet<String>,
}

impl JobProducer {
    pub fn new(broker: Arc<dyn MessageBroker>, topic: impl Into<String>) -> Self {
        Self {
            broker,
            topic: topic.into(),
            known_topics: DashSet::new(),
        }
    }

    pub fn broker(&self) -> &Arc<dyn MessageBroker> {
        &self.broker
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Create `topic` if the broker lacks it. Known topics are cached after the
    /// first successful check.
    pub async fn ensure_topic(&self, topic: &str) -> Result<(), QueueError> {
        if self.known_topics.contains(topic) {
            return Ok(());
        }

        if !self.broker.topic_exists(topic).await? {
            tracing::info!(topic, "Topic does not exist, creating");
            self.broker.create_topic(topic).await?;
            tracing::info!(topic, "Topic created");
        }

        self.known_topics.insert(topic.to_string());
        Ok(())
    }

    /// Publish a job to the configured job topic.
    pub async fn publish(&self, job: &JobMessage) -> Result<String, QueueError> {
        self.ensure_topic(&self.topic).await?;

        let payload = serde_json::to_string(job).map_err(QueueError::Serialize)?;
        let message_id = self.broker.publish(&self.topic, &payload).await?;

        tracing::info!(
            correlation_id = %job.correlation_id,
            topic = %self.topic,
            message_id = %message_id,
            image_count = job.claim_check.image_files.len(),
            "Job message published"
        );
        Ok(message_id)
    }
}

/// Reads the result stream through a consumer group.
pub struct RedisResultSource {
    conn: MultiplexedConnection,
    stream: String,
    group: String,
    consumer: String,
    batch_size: usize,
    block: Duration,
}

impl RedisResultSource {
    /// Connect and make sure the consumer group exists on the result stream.
    pub async fn connect(
        redis_url: &str,
        stream: &str,
        group: &str,
        consumer: &str,
        batch_size: usize,
        block: Duration,
    ) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url).map_err(QueueError::Redis)?;
        let mut conn = client.get_multiplexed_async_connection().await.map_err(QueueError::Redis)?;
        ensure_group(&mut conn, stream, group).await?;

        Ok(Self {
            conn,
            stream: stream.to_string(),
            group: group.to_string(),
            consumer: consumer.to_string(),
            batch_size: batch_size.max(1),
            block,
        })
    }
}

#[async_trait]
impl MessageSource for RedisResultSource {
    async fn poll(&self) -> Result<Vec<Delivery>, QueueError> {
        let mut conn = self.conn.clone();
        let options = StreamReadOptions::default()
            .group(&self.group, &self.consumer)
            .count(self.batch_size)
            .block(self.block.as_millis() as usize);

        let reply: Option<StreamReadReply> = conn
            .xread_options(&[&self.stream], &[">"], &options)
            .await
            .map_err(QueueError::Redis)?;

        let deliveries = reply
            .into_iter()
            .flat_map(|reply| reply.keys)
            .flat_map(|key| key.ids)
            .map(|entry| {
                // Entries without a readable payload field are passed on empty and
                // rejected as malformed downstream.
                let payload: Vec<u8> = entry.get(PAYLOAD_FIELD).unwrap_or_default();
                Delivery {
                    id: entry.id,
                    payload,
                }
            })
            .collect();
        Ok(deliveries)
    }

    async fn ack(&self, ids: &[String]) -> Result<(), QueueError> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        conn.xack::<_, _, _, ()>(&self.stream, &self.group, ids)
            .await
            .map_err(QueueError::Redis)?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
