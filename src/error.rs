/*!
 * Defines the [IcebergError] and [Result] types used throughout the crate.
*/

use thiserror::Error;

/// Error type returned by every fallible operation in this crate.
#[derive(Error, Debug)]
pub enum IcebergError {
    /// A path contained a traversal segment (`..`) or an encoded equivalent.
    #[error("path traversal rejected: {0}")]
    PathTraversal(String),
    /// Root metadata declared a `format-version` this crate does not understand.
    #[error("unsupported format version: {0}")]
    UnsupportedFormatVersion(i32),
    /// A required field was absent while parsing metadata.
    #[error("missing required field: {0}")]
    MissingRequiredField(String),
    /// `version-hint.text` did not contain a parseable version or path.
    #[error("invalid version hint: {0}")]
    InvalidVersionHint(String),
    /// A manifest entry carried a `status` outside `{0,1,2}`.
    #[error("invalid manifest entry status: {0}")]
    InvalidStatus(i32),
    /// A root metadata invariant from the data model was violated.
    #[error("broken metadata invariant: {0}")]
    BrokenSchemaInvariant(String),
    /// A schema change was rejected as not backward compatible.
    #[error("incompatible schema change: {0}")]
    SchemaIncompatible(String),
    /// A partition spec change was rejected as not compatible.
    #[error("incompatible partition spec change: {0}")]
    PartitionSpecIncompatible(String),
    /// A transform tag could not be recognized.
    #[error("unsupported transform: {0}")]
    UnsupportedTransform(String),
    /// A transform's parameter (bucket count, truncate width) was invalid.
    #[error("invalid transform argument: {0}")]
    InvalidTransformArg(String),
    /// v2→v3 upgrade was attempted on a table already at v3.
    #[error("table is already at the target format version")]
    AlreadyTargetVersion,
    /// v2→v3 upgrade was attempted on a table below v2.
    #[error("unsupported source format version for upgrade: {0}")]
    InvalidSourceVersion(i32),
    /// An attempt was made to move a table to a lower format version.
    #[error("downgrading the table format version is not allowed")]
    DowngradeNotAllowed,
    /// More than one deletion vector referenced the same data file in one snapshot.
    #[error("too many deletion vectors for data file: {0}")]
    TooManyDeletionVectors(String),
    /// A shredded-stat field id collided with a pre-existing statistics key.
    #[error("statistics field id collision: {0}")]
    StatsFieldIdCollision(i32),
    /// A commit's requirements were not satisfied against current metadata.
    #[error("commit conflict: {0}")]
    CommitConflict(String),
    /// The storage backend reported a failure.
    #[error("storage backend unavailable: {0}")]
    StorageUnavailable(String),
    /// `createNamespace` was called on an existing namespace.
    #[error("namespace already exists: {0}")]
    NamespaceAlreadyExists(String),
    /// `dropNamespace` was called on a namespace with live children.
    #[error("namespace is not empty: {0}")]
    NamespaceNotEmpty(String),
    /// `createTable` was called on an existing table identifier.
    #[error("table already exists: {0}")]
    TableAlreadyExists(String),
    /// A table identifier did not resolve to a stored table.
    #[error("table not found: {0}")]
    TableNotFound(String),
    /// A v3 position-delete file was added without the deletion-vector fields.
    #[error("v3 position delete file must be a deletion vector: {0}")]
    InvalidV3PositionDelete(String),
    /// Escape hatch for conditions with no dedicated variant.
    #[error("{0}")]
    Message(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, IcebergError>;

impl From<serde_json::Error> for IcebergError {
    fn from(err: serde_json::Error) -> Self {
        IcebergError::Message(err.to_string())
    }
}

impl From<object_store::Error> for IcebergError {
    fn from(err: object_store::Error) -> Self {
        IcebergError::StorageUnavailable(err.to_string())
    }
}

impl From<apache_avro::Error> for IcebergError {
    fn from(err: apache_avro::Error) -> Self {
        IcebergError::Message(err.to_string())
    }
}
