//! Harness error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("scenario `{scenario}` step {step}: slot `{slot}` was never assigned")]
    UnknownSlot {
        scenario: String,
        step: usize,
        slot: String,
    },
    #[error(
        "scenario `{scenario}` step {step}: write of {len} bytes at offset {offset} \
         does not fit slot `{slot}`"
    )]
    WriteOutOfReach {
        scenario: String,
        step: usize,
        slot: String,
        offset: usize,
        len: usize,
    },
    #[error("no scenario matches filter `{0}`")]
    EmptySelection(String),
}
