//! Error types.
//!
//! Host calls report a raw [`jvmtiError`]; [`ErrorKind`] is the coarse
//! classification the rest of the agent branches on. Only [`AgentError`]
//! aborts an attach; everything else is logged and the agent carries on.

use std::path::PathBuf;

use thiserror::Error;

use crate::sys::jni;
use crate::sys::jvmti::jvmtiError;

/// How a host status code should be treated.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    Ok,
    /// The feature is not supported by this host build. Triggers fallbacks.
    NotAvailable,
    AllocationFailure,
    /// Wrong phase, detached thread, dead thread or disposed environment.
    InvalidState,
    Unknown,
}

impl ErrorKind {
    pub fn of(err: jvmtiError) -> Self {
        match err {
            jvmtiError::NONE => ErrorKind::Ok,
            jvmtiError::NOT_AVAILABLE => ErrorKind::NotAvailable,
            jvmtiError::OUT_OF_MEMORY => ErrorKind::AllocationFailure,
            jvmtiError::UNATTACHED_THREAD
            | jvmtiError::WRONG_PHASE
            | jvmtiError::INVALID_ENVIRONMENT
            | jvmtiError::THREAD_NOT_ALIVE => ErrorKind::InvalidState,
            _ => ErrorKind::Unknown,
        }
    }
}

/// Failures that abort the attach sequence.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AgentError {
    #[error("Error creating jvmti environment (GetEnv returned {0})")]
    EnvironmentUnavailable(jni::jint),

    #[error("Failed to attach JNIEnv (AttachCurrentThread returned {0})")]
    AttachFailed(jni::jint),
}

/// Malformed agent options.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown option `{0}`")]
    UnknownKey(String),

    #[error("option `{0}` needs a value")]
    MissingValue(String),

    #[error("option `{0}` takes no value")]
    UnexpectedValue(String),
}

/// A failed step of the companion hand-off.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompanionError {
    #[error("Failed to add {path} to the bootstrap class path: {err:?}")]
    Bootstrap { path: PathBuf, err: jvmtiError },

    #[error("Failed to find {0} class.")]
    ClassNotFound(String),

    #[error("Failed to find {class}.{method} method.")]
    MethodNotFound { class: String, method: String },

    #[error("{class}.{method} threw an exception")]
    InitThrew { class: String, method: String },
}

/// A failed step while starting the agent thread.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ThreadError {
    #[error("Failed to find Thread class.")]
    ClassNotFound,

    #[error("Failed to find Thread.<init> method.")]
    ConstructorNotFound,

    #[error("Failed to create new Thread object.")]
    AllocationFailed,

    #[error("RunAgentThread failed: {0:?}")]
    Run(jvmtiError),
}
