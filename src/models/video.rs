use bytes::Bytes;
use garde::Validate;
use serde::{Deserialize, Serialize};

use super::job::CorrelationId;

/// Output frame size, serialized as `[width, height]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct VideoSize(
    #[garde(range(min = 1, max = 7680))] pub u32,
    #[garde(range(min = 1, max = 7680))] pub u32,
);

impl Default for VideoSize {
    fn default() -> Self {
        Self(120, 120)
    }
}

/// Vertical placement of caption text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextPosition {
    Top,
    Center,
    Bottom,
}

/// Caption styling. Only the keys below are recognised; anything else is rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TextConfig {
    #[garde(length(min = 1, max = 100))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,

    #[garde(range(min = 1, max = 512))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<u32>,

    #[garde(ascii, length(min = 1, max = 32))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    #[garde(ascii, length(min = 1, max = 32))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_color: Option<String>,

    #[garde(range(max = 64))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<u32>,

    #[garde(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<TextPosition>,
}

/// One caption with optional timing, in seconds from the start of the video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct TextSegment {
    #[garde(length(min = 1, max = 500))]
    pub text: String,

    #[garde(range(min = 0.0))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<f64>,

    #[garde(range(min = 0.0))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<f64>,
}

/// Rendering parameters forwarded to the worker alongside the claim check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JobParameters {
    #[garde(dive)]
    #[serde(default)]
    pub video_size: VideoSize,

    #[garde(range(min = 0.001, max = 3600.0))]
    pub duration: f64,

    #[garde(range(min = 1, max = 120))]
    pub fps: u32,

    #[garde(dive)]
    #[serde(default)]
    pub text_data: Vec<TextSegment>,

    #[garde(dive)]
    #[serde(default)]
    pub text_config: TextConfig,
}

impl JobParameters {
    /// Run field rules plus the cross-field caption timing check.
    pub fn check(&self) -> Result<(), String> {
        self.validate().map_err(|report| report.to_string())?;

        for (idx, segment) in self.text_data.iter().enumerate() {
            if let (Some(start), Some(end)) = (segment.start, segment.end) {
                if end < start {
                    return Err(format!("text_data[{idx}]: end must not precede start"));
                }
            }
        }
        Ok(())
    }
}

/// A binary attachment received with a submission, held in memory until uploaded.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// The attachments of one submission, grouped by role.
#[derive(Debug, Clone, Default)]
pub struct UploadedFiles {
    pub speech: Option<UploadedFile>,
    pub music: Option<UploadedFile>,
    pub images: Vec<UploadedFile>,
}

/// Object-store keys standing in for the uploaded attachments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimCheckManifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speech_file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub music_file: Option<String>,

    pub image_files: Vec<String>,
}

/// Job payload published on the request topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobMessage {
    pub correlation_id: CorrelationId,

    #[serde(flatten)]
    pub claim_check: ClaimCheckManifest,

    #[serde(flatten)]
    pub parameters: JobParameters,
}

impl JobMessage {
    pub fn new(
        correlation_id: CorrelationId,
        claim_check: ClaimCheckManifest,
        parameters: JobParameters,
    ) -> Self {
        Self {
            correlation_id,
            claim_check,
            parameters,
        }
    }
}
