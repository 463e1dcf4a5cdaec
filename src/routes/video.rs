use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::models::submission::{JobStatusResponse, SubmitResponse};
use crate::models::video::{JobParameters, UploadedFile, UploadedFiles, VideoSize};
use crate::services::status::{self, JobView};
use crate::services::submission::{self, SubmitError};

/// Raw text fields of a submission, before parsing.
#[derive(Default)]
struct FormFields {
    text_data: Option<String>,
    video_size: Option<String>,
    text_config: Option<String>,
    fps: Option<String>,
    duration: Option<String>,
}

impl FormFields {
    fn into_parameters(self) -> Result<JobParameters, ApiError> {
        let text_data = match self.text_data.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => serde_json::from_str(raw)
                .map_err(|e| bad_request(format!("Invalid JSON in text_data: {e}")))?,
            _ => Vec::new(),
        };

        let video_size = match self.video_size.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => serde_json::from_str::<VideoSize>(raw).map_err(|_| {
                bad_request("Invalid or missing video_size. Provide as [width, height]")
            })?,
            _ => VideoSize::default(),
        };

        let text_config = match self.text_config.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => serde_json::from_str(raw)
                .map_err(|e| bad_request(format!("Invalid text_config: {e}")))?,
            _ => Default::default(),
        };

        let fps = self
            .fps
            .as_deref()
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .ok_or_else(|| bad_request("Invalid or missing fps. Provide a valid integer"))?;

        let duration = self
            .duration
            .as_deref()
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|d| d.is_finite())
            .ok_or_else(|| bad_request("Invalid or missing duration. Provide a valid number"))?;

        Ok(JobParameters {
            video_size,
            duration,
            fps,
            text_data,
            text_config,
        })
    }
}

fn bad_request(message: impl Into<String>) -> ApiError {
    ApiError::BadRequest(message.into())
}

/// Drain the multipart body into text fields and attachments.
async fn read_form(mut multipart: Multipart) -> Result<(FormFields, UploadedFiles), ApiError> {
    let mut fields = FormFields::default();
    let mut files = UploadedFiles::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Malformed multipart body: {e}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match name.as_str() {
            "speech_file" | "music_file" | "image_files" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let data: Bytes = field
                    .bytes()
                    .await
                    .map_err(|e| bad_request(format!("Failed to read {name}: {e}")))?;
                let file = UploadedFile {
                    file_name,
                    content_type,
                    data,
                };
                match name.as_str() {
                    "speech_file" if files.speech.is_some() => {
                        return Err(bad_request("Only one speech_file is allowed"))
                    }
                    "speech_file" => files.speech = Some(file),
                    "music_file" if files.music.is_some() => {
                        return Err(bad_request("Only one music_file is allowed"))
                    }
                    "music_file" => files.music = Some(file),
                    _ => files.images.push(file),
                }
            }
            "text_data" | "video_size" | "text_config" | "fps" | "duration" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| bad_request(format!("Failed to read {name}: {e}")))?;
                let slot = match name.as_str() {
                    "text_data" => &mut fields.text_data,
                    "video_size" => &mut fields.video_size,
                    "text_config" => &mut fields.text_config,
                    "fps" => &mut fields.fps,
                    _ => &mut fields.duration,
                };
                *slot = Some(value);
            }
            other => {
                tracing::debug!(field = other, "Ignoring unknown multipart field");
            }
        }
    }

    Ok((fields, files))
}

/// POST /v1/video-creation: Submit a video creation job.
pub async fn submit_video(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let result = async {
        let (fields, files) = read_form(multipart).await?;
        let parameters = fields.into_parameters()?;
        let correlation_id = submission::submit_job(&state, parameters, files).await?;
        Ok::<_, ApiError>(correlation_id)
    }
    .await;

    match result {
        Ok(correlation_id) => Ok((
            StatusCode::ACCEPTED,
            Json(SubmitResponse::accepted(correlation_id)),
        )),
        Err(e) => {
            let reason = match &e {
                ApiError::Submit(submit) => submit.reason(),
                _ => "validation",
            };
            metrics::counter!("video_jobs_rejected_total", "reason" => reason).increment(1);
            if let ApiError::BadRequest(message)
            | ApiError::Submit(SubmitError::Validation(_, message)) = &e
            {
                tracing::warn!(error = %message, "Rejected video creation request");
            }
            Err(e)
        }
    }
}

/// GET /v1/video-creation/{correlation_id}: Report status or stream the finished video.
pub async fn get_video(
    State(state): State<AppState>,
    Path(correlation_id): Path<String>,
) -> Result<Response, ApiError> {
    tracing::debug!(correlation_id = %correlation_id, "Fetching video status");

    let view = status::resolve_job(&state.correlations, state.storage.as_ref(), &correlation_id).await?;

    match view {
        JobView::Pending(request) => {
            Ok((StatusCode::OK, Json(JobStatusResponse::from(&request))).into_response())
        }
        JobView::Ready { result_key, body } => {
            tracing::info!(correlation_id = %correlation_id, result_key = %result_key, "Streaming finished video");
            let disposition = HeaderValue::from_str(&format!(
                "attachment; filename=\"{}\"",
                result_key.replace(['"', '\\'], "_")
            ))
            .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

            Ok((
                [
                    (
                        header::CONTENT_TYPE,
                        HeaderValue::from_static("application/octet-stream"),
                    ),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                Body::from_stream(body),
            )
                .into_response())
        }
    }
}
