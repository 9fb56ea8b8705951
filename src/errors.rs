// src/errors.rs

use sqlx::error::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    // Constraint violations at DML time. SQLite does not report constraint
    // names, so the violating table/operation supplies the context.
    #[error("Referential constraint violated on '{table}': {source}")]
    ReferentialConstraint {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Unique constraint violated on '{table}': {source}")]
    UniqueConstraint {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Not-null constraint violated on '{table}': {source}")]
    NotNullConstraint {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    // Migration engine errors
    #[error("Migration ordering error: {0}")]
    MigrationOrdering(String),

    #[error("Migration '{id}' failed: {detail}")]
    MigrationFailed { id: String, detail: String },

    #[error("Migration '{id}' cannot be reverted: {detail}")]
    IrreversibleDown { id: String, detail: String },

    // Design-time schema errors
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Schema validation failed:\n{}", .0.join("\n"))]
    SchemaValidation(Vec<String>),

    // Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Wrap a sqlx error from a DML statement against `table`, promoting
    /// constraint violations to their structured variants.
    pub fn from_dml(table: &str, err: sqlx::Error) -> Self {
        // A delete blocked by ON DELETE RESTRICT raises SQLITE_CONSTRAINT_TRIGGER
        // (extended code 1811) rather than SQLITE_CONSTRAINT_FOREIGNKEY, and sqlx
        // does not classify it as a foreign key violation. Both carry the same
        // "FOREIGN KEY constraint failed" message, so match on that as well.
        let (kind, referential) = match &err {
            sqlx::Error::Database(db) => (
                Some(db.kind()),
                matches!(db.kind(), ErrorKind::ForeignKeyViolation)
                    || db.message().contains("FOREIGN KEY constraint failed"),
            ),
            _ => (None, false),
        };
        if referential {
            return AppError::ReferentialConstraint {
                table: table.to_string(),
                source: err,
            };
        }
        match kind {
            Some(ErrorKind::UniqueViolation) => AppError::UniqueConstraint {
                table: table.to_string(),
                source: err,
            },
            Some(ErrorKind::NotNullViolation) => AppError::NotNullConstraint {
                table: table.to_string(),
                source: err,
            },
            _ => AppError::Database(err),
        }
    }

    pub fn is_referential(&self) -> bool {
        matches!(self, AppError::ReferentialConstraint { .. })
    }

    pub fn is_unique(&self) -> bool {
        matches!(self, AppError::UniqueConstraint { .. })
    }
}

// Convenience alias
pub type AppResult<T> = Result<T, AppError>;
