use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Redis connection string for the job and result streams
    pub redis_url: String,

    /// Bucket holding uploaded attachments and rendered results
    pub s3_bucket: String,

    /// S3-compatible endpoint URL (MinIO, R2, AWS)
    pub s3_endpoint: String,

    #[serde(default = "default_s3_region")]
    pub s3_region: String,

    /// Access key ID
    pub s3_access_key: String,

    /// Secret access key
    pub s3_secret_key: String,

    /// Use path-style bucket addressing (required by MinIO)
    #[serde(default = "default_true")]
    pub s3_path_style: bool,

    /// Stream that workers consume jobs from
    #[serde(default = "default_job_topic")]
    pub job_topic: String,

    /// Consumer group created on the job stream for the worker pool
    #[serde(default = "default_job_consumer_group")]
    pub job_consumer_group: String,

    /// Stream that workers publish results to
    #[serde(default = "default_result_topic")]
    pub result_topic: String,

    /// Consumer group this gateway reads results through
    #[serde(default = "default_result_consumer_group")]
    pub result_consumer_group: String,

    /// Consumer name within the result group; one per gateway instance
    #[serde(default = "default_consumer_name")]
    pub consumer_name: String,

    #[serde(default = "default_result_batch_size")]
    pub result_batch_size: usize,

    /// How long a single result read blocks waiting for new entries
    #[serde(default = "default_result_block_ms")]
    pub result_block_ms: u64,

    /// How long a finished job stays queryable
    #[serde(default = "default_result_retention_secs")]
    pub result_retention_secs: u64,

    #[serde(default = "default_eviction_interval_secs")]
    pub eviction_interval_secs: u64,

    /// Upper bound on a submission body, attachments included
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    #[serde(default = "default_max_image_files")]
    pub max_image_files: usize,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_s3_region() -> String {
    "us-east-1".to_string()
}

fn default_true() -> bool {
    true
}

fn default_job_topic() -> String {
    "video-creation-requests".to_string()
}

fn default_job_consumer_group() -> String {
    "video-workers".to_string()
}

fn default_result_topic() -> String {
    "video-creation-responses".to_string()
}

fn default_result_consumer_group() -> String {
    "video-gateway".to_string()
}

fn default_consumer_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "video-gateway".to_string())
}

fn default_result_batch_size() -> usize {
    32
}

fn default_result_block_ms() -> u64 {
    5000
}

fn default_result_retention_secs() -> u64 {
    3600
}

fn default_eviction_interval_secs() -> u64 {
    60
}

fn default_max_upload_bytes() -> usize {
    200 * 1024 * 1024
}

fn default_max_image_files() -> usize {
    20
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    pub fn result_retention(&self) -> Duration {
        Duration::from_secs(self.result_retention_secs)
    }

    pub fn eviction_interval(&self) -> Duration {
        Duration::from_secs(self.eviction_interval_secs.max(1))
    }

    pub fn result_block(&self) -> Duration {
        Duration::from_millis(self.result_block_ms)
    }
}
