use thiserror::Error;

/// Result alias used by the reconstruction components.
pub type ConvertResult<T> = Result<T, ConvertError>;

/// Fatal conditions raised while reconstructing a rig from asset records.
///
/// Degenerate polygons and unresolved bone parents are not errors; they are
/// reported as [`crate::convert::ValidationIssue`]s instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConvertError {
    #[error("{context}: vertex count mismatch (expected {expected}, mesh has {actual})")]
    VertexCountMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("node '{id}' has type {actual}, expected {expected}")]
    InvalidNodeType {
        id: String,
        expected: &'static str,
        actual: String,
    },

    #[error("malformed bone record '{id}': {reason}")]
    MalformedBoneRecord { id: String, reason: String },

    #[error("malformed weight record for joint '{bone}': {reason}")]
    MalformedWeightRecord { bone: String, reason: String },

    #[error("malformed UV set '{id}': {reason}")]
    MalformedUvRecord { id: String, reason: String },

    #[error("malformed geometry '{id}': {reason}")]
    MalformedGeometryRecord { id: String, reason: String },

    #[error("asset record not found: {0}")]
    MissingRecord(String),

    #[error("invalid asset url '{0}'")]
    InvalidUrl(String),

    #[error("invalid conversion options: {0}")]
    InvalidOptions(String),
}
