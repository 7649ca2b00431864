// Data models for the API

pub mod meter;
pub mod rate_limit;

pub use meter::{
    ExportFormat, ExportJob, ExportState, ExtractionResult, MeterReadingConfidence,
    MeterReadingData, UploadReceipt,
};
pub use rate_limit::{
    ClientIdentity, IdentitySource, RateLimitDecision, RateLimitPolicy, RateLimitStats, Tier,
    TierStats, UnknownTier, counter_key,
};
