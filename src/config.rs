//! Column mapping between visit fields and input CSV headers.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Maps the logical visit fields to the header names of the input CSV.
///
/// Stored as a plain JSON object on disk; omitted keys keep their defaults:
/// ```json
/// {
///   "customer_id": "会員ID",
///   "checkin": "入室日時",
///   "stay": "滞在時間"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    pub customer_id: String,
    pub checkin: String,
    /// Optional in the data; rows without it derive checkout from the stay.
    pub checkout: String,
    pub stay: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            customer_id: "customer_id".to_string(),
            checkin: "checkin".to_string(),
            checkout: "checkout".to_string(),
            stay: "stay".to_string(),
        }
    }
}

impl ColumnConfig {
    /// Loads the mapping from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read column config '{path}'"))?;
        let config: ColumnConfig = serde_json::from_str(&content)
            .with_context(|| format!("invalid column config '{path}'"))?;
        Ok(config)
    }

    /// Loads `path` when given, otherwise the defaults.
    pub fn load_or_default(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}
