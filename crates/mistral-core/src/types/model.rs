use serde::{Deserialize, Serialize};

/// Model list response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelList {
    /// Object type
    #[serde(default)]
    pub object: String,
    /// Available models
    pub data: Vec<ModelCard>,
}

/// A model entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCard {
    /// Model identifier
    pub id: String,
    /// Object type
    #[serde(default)]
    pub object: String,
    /// Creation timestamp
    #[serde(default)]
    pub created: u64,
    /// Owner
    #[serde(default)]
    pub owned_by: String,
    /// Human-readable description
    #[serde(default)]
    pub description: Option<String>,
    /// Context window in tokens
    #[serde(default)]
    pub max_context_length: Option<u32>,
    /// Alternative identifiers
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Capability flags as reported by the vendor
    #[serde(default)]
    pub capabilities: Option<serde_json::Value>,
}

/// Result of deleting a fine-tuned model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedModel {
    /// Deleted model identifier
    pub id: String,
    /// Object type
    #[serde(default)]
    pub object: String,
    /// Whether the model was deleted
    pub deleted: bool,
}
