//! Raw FFI definitions for the JNI and JVMTI function tables.
//!
//! Nothing here is safe to call directly; go through [`crate::env`].

pub mod jni;
pub mod jvmti;
