use serde::{Deserialize, Serialize};

pub type MessageId = u64;

pub const CORRELATIONS_SCHEMA_VERSION: u32 = 1;

/// One submitted opinion. `word` is optional on the wire; records without it
/// are skipped by the consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: MessageId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word: Option<String>,
}

/// Mirror entry for one live cluster: its representative and occurrence count.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Correlation {
    pub word: String,
    pub weight: u64,
}

impl Correlation {
    pub fn new(word: impl Into<String>, weight: u64) -> Self {
        Self {
            word: word.into(),
            weight,
        }
    }
}
