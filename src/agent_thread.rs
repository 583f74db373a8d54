//! The agent's own background thread.
//!
//! The host only runs agent threads on a `java.lang.Thread` the agent
//! allocates itself. The body does nothing beyond announcing that it ran.

use std::ffi::c_void;
use std::ptr;

use crate::error::ThreadError;
use crate::jni_wrapper::{JniEnv, LocalRef};
use crate::jvmti_wrapper::Jvmti;
use crate::loge;
use crate::sys::jni;
use crate::sys::jvmti::{self, jvmtiEnv};

/// Allocates a `java.lang.Thread` and starts the agent thread on it at normal
/// priority.
pub fn start_agent_thread(jvmti: &Jvmti, jni: &JniEnv) -> Result<(), ThreadError> {
    let thread = allocate_java_thread(jni)?;
    jvmti
        .run_agent_thread(thread.get(), agent_thread_main, ptr::null(), jvmti::JVMTI_THREAD_NORM_PRIORITY)
        .map_err(ThreadError::Run)
}

/// `new Thread()`, as a local reference.
pub fn allocate_java_thread(jni: &JniEnv) -> Result<LocalRef<'_>, ThreadError> {
    let fail = |err: ThreadError| {
        jni.clear_pending_exception();
        err
    };

    let class = jni
        .find_class("java/lang/Thread")
        .map(|cls| LocalRef::new(jni, cls))
        .ok_or_else(|| fail(ThreadError::ClassNotFound))?;
    let ctor = jni
        .get_method_id(class.get(), "<init>", "()V")
        .ok_or_else(|| fail(ThreadError::ConstructorNotFound))?;
    let thread = jni
        .new_object(class.get(), ctor, &[])
        .ok_or_else(|| fail(ThreadError::AllocationFailed))?;

    Ok(LocalRef::new(jni, thread))
}

unsafe extern "system" fn agent_thread_main(_jvmti: *mut jvmtiEnv, _jni: *mut jni::JNIEnv, _arg: *mut c_void) {
    loge!("Agent thread running");
}
