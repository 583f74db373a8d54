//! Convenience re-exports.

pub use crate::env::{JavaVm, JniEnv, Jvmti, JvmtiBuffer, JvmtiString, LocalRef};
pub use crate::error::{AgentError, CompanionError, ConfigError, ErrorKind, ThreadError};
pub use crate::events::{Event, EventHookRegistry, EventKind, EventMode, Hook, DEFAULT_HOOKS};
pub use crate::heap::{HeapTally, HeapWalk};
pub use crate::loge;
pub use crate::sys::{jni, jvmti};
