//! Request fixtures: attachment bytes and multipart bodies

#![allow(dead_code)]

use bytes::Bytes;
use video_job_gateway::models::video::{
    JobParameters, TextConfig, TextSegment, UploadedFile, UploadedFiles, VideoSize,
};

/// Enough of a PNG header for format sniffing.
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01";

/// Enough of a JPEG header for format sniffing.
pub const JPEG_BYTES: &[u8] = b"\xff\xd8\xff\xe0\0\x10JFIF\0";

pub const MP3_BYTES: &[u8] = b"ID3\x04\0\0\0\0\0\0";

pub const BOUNDARY: &str = "----video-gateway-test-boundary";

pub fn image(name: &str) -> UploadedFile {
    UploadedFile {
        file_name: name.to_string(),
        content_type: Some("image/png".to_string()),
        data: Bytes::from_static(PNG_BYTES),
    }
}

pub fn audio(name: &str) -> UploadedFile {
    UploadedFile {
        file_name: name.to_string(),
        content_type: Some("audio/mpeg".to_string()),
        data: Bytes::from_static(MP3_BYTES),
    }
}

pub fn images(names: &[&str]) -> UploadedFiles {
    UploadedFiles {
        images: names.iter().map(|name| image(name)).collect(),
        ..UploadedFiles::default()
    }
}

pub fn parameters() -> JobParameters {
    JobParameters {
        video_size: VideoSize(1280, 720),
        duration: 60.0,
        fps: 24,
        text_data: vec![TextSegment {
            text: "Test".to_string(),
            start: Some(0.0),
            end: Some(3.0),
        }],
        text_config: TextConfig {
            font: Some("Verdana".to_string()),
            ..TextConfig::default()
        },
    }
}

/// Hand-built `multipart/form-data` body.
#[derive(Default)]
pub struct MultipartBody {
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// The standard fields of a valid submission, without attachments.
    pub fn with_valid_fields(self) -> Self {
        self.text("fps", "24")
            .text("duration", "60")
            .text("video_size", "[1280, 720]")
            .text("text_data", r#"[{"text":"Hello","start":0,"end":2}]"#)
            .text("text_config", r#"{"font":"Arial","color":"white"}"#)
    }

    /// Returns the `Content-Type` header value and the encoded body.
    pub fn finish(mut self) -> (String, Vec<u8>) {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        (
            format!("multipart/form-data; boundary={BOUNDARY}"),
            self.body,
        )
    }
}
