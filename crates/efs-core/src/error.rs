//! Error types for the provisioner.
//!
//! Every failure the engine can surface is an [`EfsError`]. A resource that
//! exists but is not yet available is never an error: the poller keeps
//! waiting on it instead.

use std::fmt;

/// Errors that can occur while provisioning or reconciling filesystems.
#[derive(Debug, thiserror::Error)]
pub enum EfsError {
    /// A provider API call failed.
    #[error("Provider error in {operation}: {message}")]
    Provider {
        /// The provider operation that failed.
        operation: String,
        /// Description of the failure.
        message: String,
    },

    /// A declared spec or configuration value is malformed.
    #[error("Validation error: {message}")]
    Validation {
        /// Description of why the input is invalid.
        message: String,
    },

    /// No filesystem matched the creation token where exactly one was expected.
    #[error("Filesystem not found: {token}")]
    FilesystemNotFound {
        /// The creation token that was looked up.
        token: String,
    },

    /// More than one filesystem shares a creation token.
    #[error("Ambiguous filesystem: {count} filesystems match creation token {token}")]
    AmbiguousFilesystem {
        /// The creation token that was looked up.
        token: String,
        /// How many filesystems the provider returned.
        count: usize,
    },

    /// The store of record failed.
    #[error("Store error: {message}")]
    Store {
        /// Description of the store failure.
        message: String,
    },

    /// A declared resource could not be found in the store of record.
    #[error("Declared resource not found: {namespace}/{name}")]
    StoreObjectNotFound {
        /// Namespace of the missing object.
        namespace: String,
        /// Name of the missing object.
        name: String,
    },

    /// A bounded poll ran out of attempts before the resource became available.
    #[error("{resource} did not become available after {attempts} attempts")]
    AttemptsExhausted {
        /// Human readable resource label.
        resource: String,
        /// Attempts made.
        attempts: u32,
    },

    /// Convergence was cancelled by the caller.
    #[error("Convergence cancelled: {resource}")]
    Cancelled {
        /// Human readable resource label.
        resource: String,
    },

    /// A mount target task failed.
    #[error("Mount target in subnet {subnet} failed: {source}")]
    MountTarget {
        /// Subnet the failing task was responsible for.
        subnet: String,
        /// The underlying failure.
        #[source]
        source: Box<EfsError>,
    },

    /// Configuration could not be loaded.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected internal failure, e.g. a panicked task.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl EfsError {
    /// Creates a new `Provider` error.
    #[must_use]
    pub fn provider(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Creates a new `Validation` error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a new `FilesystemNotFound` error.
    #[must_use]
    pub fn filesystem_not_found(token: impl Into<String>) -> Self {
        Self::FilesystemNotFound {
            token: token.into(),
        }
    }

    /// Creates a new `AmbiguousFilesystem` error.
    #[must_use]
    pub fn ambiguous(token: impl Into<String>, count: usize) -> Self {
        Self::AmbiguousFilesystem {
            token: token.into(),
            count,
        }
    }

    /// Creates a new `Store` error.
    #[must_use]
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Creates a new `StoreObjectNotFound` error.
    #[must_use]
    pub fn store_object_not_found(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::StoreObjectNotFound {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Creates a new `AttemptsExhausted` error.
    #[must_use]
    pub fn attempts_exhausted(resource: impl Into<String>, attempts: u32) -> Self {
        Self::AttemptsExhausted {
            resource: resource.into(),
            attempts,
        }
    }

    /// Creates a new `Cancelled` error.
    #[must_use]
    pub fn cancelled(resource: impl Into<String>) -> Self {
        Self::Cancelled {
            resource: resource.into(),
        }
    }

    /// Wraps a failure with the subnet whose mount target task produced it.
    #[must_use]
    pub fn mount_target(subnet: impl Into<String>, source: EfsError) -> Self {
        Self::MountTarget {
            subnet: subnet.into(),
            source: Box::new(source),
        }
    }

    /// Creates a new `Config` error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a validation error.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Returns `true` if this error, or the error it wraps, is a cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.category() == ErrorCategory::Cancelled
    }

    /// Returns `true` if zero or several filesystems matched a creation token.
    #[must_use]
    pub fn is_ambiguous(&self) -> bool {
        self.category() == ErrorCategory::Ambiguous
    }

    /// Returns the error category for logging purposes.
    ///
    /// Mount target failures report the category of the error they wrap.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Provider { .. } => ErrorCategory::Provider,
            Self::Validation { .. } | Self::Config { .. } => ErrorCategory::Validation,
            Self::FilesystemNotFound { .. } | Self::AmbiguousFilesystem { .. } => {
                ErrorCategory::Ambiguous
            }
            Self::Store { .. } | Self::StoreObjectNotFound { .. } => ErrorCategory::Store,
            Self::AttemptsExhausted { .. } => ErrorCategory::Convergence,
            Self::Cancelled { .. } => ErrorCategory::Cancelled,
            Self::MountTarget { source, .. } => source.category(),
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of provisioner errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network or API failure at the provider.
    Provider,
    /// Malformed declared spec or configuration.
    Validation,
    /// Zero or multiple matches where exactly one was expected.
    Ambiguous,
    /// Store of record failure.
    Store,
    /// A bounded poll gave up.
    Convergence,
    /// Work was cancelled by the caller.
    Cancelled,
    /// Internal error.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provider => write!(f, "provider"),
            Self::Validation => write!(f, "validation"),
            Self::Ambiguous => write!(f, "ambiguous"),
            Self::Store => write!(f, "store"),
            Self::Convergence => write!(f, "convergence"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
