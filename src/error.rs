//! Error types for local account operations.

use crate::AccountKind;
use thiserror::Error;

/// Result type alias using [`AccountError`].
pub type Result<T> = std::result::Result<T, AccountError>;

/// Errors that can occur while reading or writing local accounts.
///
/// Operations on [`LocalUser`](crate::LocalUser) and
/// [`LocalGroup`](crate::LocalGroup) never hand these to their caller; they
/// are logged at the operation boundary and turned into a `bool` or `Option`.
/// Provider implementations and the factory return them directly.
#[derive(Debug, Error)]
pub enum AccountError {
    /// The account could not be resolved from every source.
    #[error("{kind} not found: {name}")]
    NotFound {
        /// User or group
        kind: AccountKind,
        /// Name that was looked up
        name: String,
    },

    /// The record was removed earlier and rejects further mutation.
    #[error("{kind} already deleted: {name}")]
    AlreadyDeleted {
        /// User or group
        kind: AccountKind,
        /// Name of the removed account
        name: String,
    },

    /// An account with this name already exists.
    #[error("{kind} already exists: {name}")]
    AlreadyExists {
        /// User or group
        kind: AccountKind,
        /// Conflicting name
        name: String,
    },

    /// Input was refused before any provider call.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The provider cannot run on this machine.
    #[error("account provider not available: {0}")]
    ProviderUnavailable(String),

    /// Operation is not supported by this provider.
    #[error("operation not supported by provider: {0}")]
    NotSupported(String),

    /// Provider operation failed with context.
    #[error("{provider}: {operation} {account}: {source}")]
    Provider {
        /// Provider name
        provider: String,
        /// Operation name (commit-entry, save-principal, rename, ...)
        operation: String,
        /// Account name
        account: String,
        /// Underlying error
        #[source]
        source: Box<AccountError>,
    },

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Command execution failed.
    #[error("command execution failed: {0}")]
    CommandFailed(String),

    /// Other error (catch-all).
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AccountError {
    /// Wraps an underlying error with the provider, operation and account
    /// that caused it.
    ///
    /// # Example
    ///
    /// ```
    /// use localacct::AccountError;
    ///
    /// let err = AccountError::CommandFailed("exit code 1".to_string());
    /// let wrapped = AccountError::provider_op("windows", "commit-entry", "alice", err);
    ///
    /// assert_eq!(
    ///     wrapped.to_string(),
    ///     "windows: commit-entry alice: command execution failed: exit code 1"
    /// );
    /// ```
    pub fn provider_op(
        provider: impl Into<String>,
        operation: impl Into<String>,
        account: impl Into<String>,
        err: AccountError,
    ) -> Self {
        Self::Provider {
            provider: provider.into(),
            operation: operation.into(),
            account: account.into(),
            source: Box::new(err),
        }
    }

    /// Shorthand for [`AccountError::NotFound`].
    pub fn not_found(kind: AccountKind, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Adds provider context to hard failures. Soft failures pass through
    /// unchanged so they keep their warning-level treatment.
    pub(crate) fn in_provider(self, provider: &str, operation: &str, account: &str) -> Self {
        if self.is_soft() {
            self
        } else {
            Self::provider_op(provider, operation, account, self)
        }
    }

    /// Returns true for failures that are expected in normal use and are
    /// logged as warnings rather than errors.
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::AlreadyDeleted { .. }
                | Self::AlreadyExists { .. }
                | Self::Rejected(_)
        )
    }
}

/// Logs a failed operation at the severity its error calls for.
///
/// `action` reads as a verb phrase: "set parameter of", "rename", ...
pub(crate) fn log_failure(err: &AccountError, action: &str, kind: AccountKind, name: &str) {
    if err.is_soft() {
        tracing::warn!(account = name, "Cannot {} {}: {}", action, kind, err);
    } else {
        tracing::error!(account = name, error = ?err, "Failed to {} {}: {}", action, kind, err);
    }
}
