use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// A malformed activity record was rejected at the ingestion boundary.
    #[error("invalid activity record: {0}")]
    Validation(String),

    /// A static lookup table lacks an expected entry.
    #[error("missing benchmark data for {age_bucket}/{domain}/{skill}")]
    Configuration {
        age_bucket: String,
        domain: String,
        skill: String,
    },
}
