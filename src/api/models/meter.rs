//! Meter reading and export payloads served by the collaborator routes.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Values read off a meter face.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MeterReadingData {
    pub serial_number: String,
    pub kwh: String,
    pub kvah: String,
    pub max_demand_kw: String,
    pub demand_kva: String,
}

/// Per-field confidence, in percent.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MeterReadingConfidence {
    pub serial_number: f32,
    pub kwh: f32,
    pub kvah: f32,
    pub max_demand_kw: f32,
    pub demand_kva: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExtractionResult {
    pub data: MeterReadingData,
    pub confidence: MeterReadingConfidence,
    pub timestamp: String,
    pub processed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadReceipt {
    pub upload_id: String,
    /// File name sent by the client, if any
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes_received: usize,
    pub received_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Excel,
    Pdf,
}

impl ExportFormat {
    /// File extension of the produced export.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Excel => "xlsx",
            ExportFormat::Pdf => "pdf",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExportState {
    Queued,
    Processing,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExportJob {
    pub export_id: String,
    pub format: ExportFormat,
    pub status: ExportState,
    pub created_at: String,
    pub completed_at: Option<String>,
    /// Name of the produced file once completed
    pub file_name: Option<String>,
}
