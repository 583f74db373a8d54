//! # pcall-agent
//!
//! An attach-time JVMTI agent for JVM and ART processes. Once attached it
//! logs class loads, method entries and VM allocations as they happen, takes
//! one snapshot of loaded classes, live threads and heap objects, and then
//! hands control to a companion dex/jar.
//!
//! ## Attaching
//!
//! ```bash
//! # Android
//! adb shell cmd activity attach-agent <process> /data/local/tmp/libpcall_agent.so=no_heap
//! # HotSpot
//! jcmd <pid> JVMTI.agent_load ./libpcall_agent.so "heap_class=java/lang/String"
//! ```
//!
//! The text after `=` is parsed by [`config::AgentOptions`].
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    Agent_OnAttach                        │
//! │                 attach::attach / run                     │
//! ├─────────────────────────────────────────────────────────┤
//! │  capabilities · events · snapshot · extensions · heap   │
//! │           agent_thread · companion · config             │
//! ├─────────────────────────────────────────────────────────┤
//! │     env: Jvmti, JniEnv, JavaVm + scoped host buffers     │
//! ├─────────────────────────────────────────────────────────┤
//! │                 sys: raw JNI / JVMTI ABI                 │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! [`mangle`] stands apart: it computes JNI symbol names and needs no host.
//!
//! ## Logging
//!
//! Every record is an ERROR-level `tracing` event with target `pcall`,
//! emitted through [`loge!`]. See [`logging::init`].

pub mod sys;

pub mod env;
pub mod error;
pub mod jni_wrapper;
pub mod jvmti_wrapper;
pub mod logging;
pub mod mangle;
pub mod prelude;
pub mod vm;

pub mod agent_thread;
pub mod attach;
pub mod capabilities;
pub mod companion;
pub mod config;
pub mod events;
pub mod extensions;
pub mod heap;
pub mod snapshot;

use std::borrow::Cow;
use std::ffi::{c_void, CStr};
use std::os::raw::c_char;

use crate::sys::jni;
use crate::vm::JavaVm;

/// Entry point the host calls when the agent is attached to a live VM.
///
/// # Safety
/// Called by the host with a valid `JavaVM*` and a NUL-terminated (or null)
/// options string.
#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "system" fn Agent_OnAttach(
    vm: *mut jni::JavaVM,
    options: *mut c_char,
    _reserved: *mut c_void,
) -> jni::jint {
    let options = if options.is_null() {
        Cow::Borrowed("")
    } else {
        CStr::from_ptr(options).to_string_lossy()
    };
    attach::attach(&JavaVm::from_raw(vm), &options)
}
