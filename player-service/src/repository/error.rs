//! Repository error types
//!
//! Structured errors for store operations. Every error records which
//! operation failed and, where one applies, the entity it was about.
//!
//! # Example
//!
//! ```rust
//! use player_service::repository::{RepositoryError, RepositoryErrorKind};
//!
//! let error = RepositoryError::not_found("Player", "player_123");
//! assert!(matches!(error.kind, RepositoryErrorKind::NotFound));
//! assert!(error.entity_id.is_some());
//! ```

use std::fmt;

/// The repository operation being performed when an error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryOperation {
    /// Listing a filtered page
    List,
    /// Counting filtered records
    Count,
    /// Fetching one record by id
    Get,
    /// Inserting a record
    Create,
    /// Partially updating a record
    Update,
    /// Deleting a record
    Delete,
    /// Linking children to a parent
    Connect,
    /// Unlinking children from a parent
    Disconnect,
    /// Setting a parent's exact child set
    Replace,
    /// Loading a to-one related record
    FindRelated,
}

impl fmt::Display for RepositoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List => write!(f, "list"),
            Self::Count => write!(f, "count"),
            Self::Get => write!(f, "get"),
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
            Self::Connect => write!(f, "connect"),
            Self::Disconnect => write!(f, "disconnect"),
            Self::Replace => write!(f, "replace"),
            Self::FindRelated => write!(f, "find_related"),
        }
    }
}

/// The category of repository error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryErrorKind {
    /// The referenced entity does not exist
    NotFound,
    /// A to-one relation that was asked for is not set
    RelationUnset,
    /// Filter or sort is malformed
    InvalidQuery,
    /// Caller-supplied identifier is already taken
    AlreadyExists,
    /// Other store constraint rejected the write
    ConstraintViolation,
    /// Input value outside its permitted domain
    ValidationFailed,
    /// Write lost a race against a concurrent modification
    ConcurrencyConflict,
    /// Could not reach the store
    ConnectionFailed,
    /// Store did not answer in time
    Timeout,
    /// Any other store failure
    DatabaseError,
}

impl fmt::Display for RepositoryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::RelationUnset => write!(f, "relation_unset"),
            Self::InvalidQuery => write!(f, "invalid_query"),
            Self::AlreadyExists => write!(f, "already_exists"),
            Self::ConstraintViolation => write!(f, "constraint_violation"),
            Self::ValidationFailed => write!(f, "validation_failed"),
            Self::ConcurrencyConflict => write!(f, "concurrency_conflict"),
            Self::ConnectionFailed => write!(f, "connection_failed"),
            Self::Timeout => write!(f, "timeout"),
            Self::DatabaseError => write!(f, "database_error"),
        }
    }
}

/// A structured error from a repository operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryError {
    /// The operation that failed
    pub operation: RepositoryOperation,
    /// The category of error
    pub kind: RepositoryErrorKind,
    /// Human-readable message
    pub message: String,
    /// Entity type involved, e.g. "Player"
    pub entity_type: Option<String>,
    /// Entity identifier involved
    pub entity_id: Option<String>,
}

impl RepositoryError {
    /// Create a new repository error
    pub fn new(
        operation: RepositoryOperation,
        kind: RepositoryErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            entity_type: None,
            entity_id: None,
        }
    }

    /// The entity with the given id does not exist
    pub fn not_found(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self::new(
            RepositoryOperation::Get,
            RepositoryErrorKind::NotFound,
            "Entity not found",
        )
        .with_entity(entity_type, entity_id)
    }

    /// None of the requested children exist
    pub fn no_children_matched(operation: RepositoryOperation, child_type: &str) -> Self {
        Self {
            operation,
            kind: RepositoryErrorKind::NotFound,
            message: format!("No matching {} records", child_type),
            entity_type: Some(child_type.to_string()),
            entity_id: None,
        }
    }

    /// The requested to-one relation is empty
    pub fn relation_unset(owner_type: &str, owner_id: &str, relation: &str) -> Self {
        Self::new(
            RepositoryOperation::FindRelated,
            RepositoryErrorKind::RelationUnset,
            format!("{} has no {}", owner_type, relation),
        )
        .with_entity(owner_type, owner_id)
    }

    /// The caller-supplied identifier is taken
    pub fn already_exists(entity_type: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self::new(
            RepositoryOperation::Create,
            RepositoryErrorKind::AlreadyExists,
            "Entity already exists",
        )
        .with_entity(entity_type, identifier)
    }

    /// Input failed validation
    pub fn validation_failed(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::ValidationFailed, message)
    }

    /// The write raced with another modification of a record that still exists
    pub fn concurrency_conflict(
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        Self::new(
            RepositoryOperation::Update,
            RepositoryErrorKind::ConcurrencyConflict,
            "Record was modified concurrently",
        )
        .with_entity(entity_type, entity_id)
    }

    /// Generic store failure
    pub fn database_error(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::DatabaseError, message)
    }

    /// Classify a driver error raised during `operation`
    pub fn from_sqlx(operation: RepositoryOperation, err: sqlx::Error) -> Self {
        use sqlx::error::ErrorKind;
        use sqlx::Error as E;

        let kind = match &err {
            E::RowNotFound => RepositoryErrorKind::NotFound,
            E::PoolTimedOut => RepositoryErrorKind::Timeout,
            E::PoolClosed | E::Io(_) | E::Tls(_) => RepositoryErrorKind::ConnectionFailed,
            E::Database(db) => {
                if is_busy_code(db.code().as_deref()) {
                    RepositoryErrorKind::ConcurrencyConflict
                } else {
                    match db.kind() {
                        ErrorKind::UniqueViolation => RepositoryErrorKind::AlreadyExists,
                        ErrorKind::ForeignKeyViolation
                        | ErrorKind::NotNullViolation
                        | ErrorKind::CheckViolation => RepositoryErrorKind::ConstraintViolation,
                        _ => RepositoryErrorKind::DatabaseError,
                    }
                }
            }
            _ => RepositoryErrorKind::DatabaseError,
        };

        Self::new(operation, kind, err.to_string())
    }

    /// Attach the entity this error concerns
    #[must_use]
    pub fn with_entity(
        mut self,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Override the operation
    #[must_use]
    pub fn with_operation(mut self, operation: RepositoryOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Whether retrying the same call could succeed
    pub fn is_retriable(&self) -> bool {
        matches!(
            self.kind,
            RepositoryErrorKind::ConnectionFailed | RepositoryErrorKind::Timeout
        )
    }
}

/// SQLITE_BUSY (5) and SQLITE_LOCKED (6), including their extended codes
fn is_busy_code(code: Option<&str>) -> bool {
    code.and_then(|c| c.parse::<i32>().ok())
        .map(|c| matches!(c & 0xff, 5 | 6))
        .unwrap_or(false)
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Repository {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        if let (Some(ref entity_type), Some(ref entity_id)) = (&self.entity_type, &self.entity_id) {
            write!(f, " [{}: {}]", entity_type, entity_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for RepositoryError {}

/// Result alias for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;
