//! Meter reading routes.
//!
//! OCR extraction currently returns a fixed reading; the routes exist so the
//! ocr and upload tiers have live traffic to govern. Both take a multipart
//! form with the photo in an `image` field.

use axum::{
    Router,
    body::Bytes,
    extract::{
        DefaultBodyLimit, Multipart,
        multipart::{MultipartError, MultipartRejection},
    },
    response::Json,
    routing::post,
};
use chrono::Utc;
use tracing::debug;
use utoipa::ToSchema;

use super::app_state::AppState;
use super::error::ApiError;
use crate::models::{ExtractionResult, MeterReadingConfidence, MeterReadingData, UploadReceipt};

/// Largest accepted meter photo.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

const IMAGE_FIELD: &str = "image";

/// Multipart form carrying a meter photo.
#[derive(Debug, ToSchema)]
pub struct MeterImageForm {
    /// Image file (`image/*`)
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
}

/// Create the meter router
pub fn meter_router() -> Router<AppState> {
    Router::new()
        .route("/extract-meter-reading", post(extract_meter_reading))
        .route("/upload", post(upload_image))
        // Form framing on top of the largest photo
        .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + 64 * 1024))
}

struct MeterImage {
    file_name: Option<String>,
    content_type: String,
    bytes: Bytes,
}

fn multipart_error(err: MultipartError) -> ApiError {
    ApiError::new(err.status(), err.body_text())
}

/// Pull the `image` field out of the form, skipping any other fields.
async fn read_image(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<MeterImage, ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::new(e.status(), e.body_text()))?;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        if !content_type.starts_with("image/") {
            return Err(ApiError::bad_request("File must be an image"));
        }
        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;
        if bytes.is_empty() {
            return Err(ApiError::bad_request("Image is empty"));
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(ApiError::bad_request("File size must be less than 10MB"));
        }

        return Ok(MeterImage {
            file_name,
            content_type,
            bytes,
        });
    }

    Err(ApiError::bad_request("Missing image field"))
}

/// POST /meter/extract-meter-reading - Read values off a meter photo
#[utoipa::path(
    post,
    path = "/meter/extract-meter-reading",
    tag = "Meter",
    request_body(content = MeterImageForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Reading extracted", body = ExtractionResult),
        (status = 400, description = "Missing or non-image file"),
        (status = 413, description = "Image larger than 10MB"),
        (status = 429, description = "OCR rate limit exceeded")
    )
)]
pub async fn extract_meter_reading(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ExtractionResult>, ApiError> {
    let image = read_image(multipart).await?;
    debug!(
        "Extracting meter reading from {} byte {} image",
        image.bytes.len(),
        image.content_type
    );

    Ok(Json(ExtractionResult {
        data: MeterReadingData {
            serial_number: "ABC123XYZ".to_string(),
            kwh: "1450.5".to_string(),
            kvah: "1823.2".to_string(),
            max_demand_kw: "85.6".to_string(),
            demand_kva: "92.1".to_string(),
        },
        confidence: MeterReadingConfidence {
            serial_number: 95.0,
            kwh: 98.5,
            kvah: 97.2,
            max_demand_kw: 94.8,
            demand_kva: 96.3,
        },
        timestamp: Utc::now().to_rfc3339(),
        processed: true,
    }))
}

/// POST /meter/upload - Accept a meter photo for later processing
#[utoipa::path(
    post,
    path = "/meter/upload",
    tag = "Meter",
    request_body(content = MeterImageForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Image received", body = UploadReceipt),
        (status = 400, description = "Missing or non-image file"),
        (status = 413, description = "Image larger than 10MB"),
        (status = 429, description = "Upload rate limit exceeded")
    )
)]
pub async fn upload_image(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadReceipt>, ApiError> {
    let image = read_image(multipart).await?;

    Ok(Json(UploadReceipt {
        upload_id: uuid::Uuid::new_v4().to_string(),
        file_name: image.file_name,
        content_type: image.content_type,
        bytes_received: image.bytes.len(),
        received_at: Utc::now().to_rfc3339(),
    }))
}
