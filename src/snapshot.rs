//! One-shot enumeration of loaded classes and live threads.
//!
//! Each element's local reference is deleted as soon as it has been logged;
//! the host's local reference table is small and the arrays are not.

use crate::jni_wrapper::{JniEnv, LocalRef};
use crate::jvmti_wrapper::Jvmti;
use crate::loge;
use crate::sys::jni;

/// Loader id reported for the bootstrap loader or a loader that cannot be resolved.
pub const UNKNOWN_LOADER: jni::jint = -1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDescriptor {
    pub signature: String,
    pub loader_id: jni::jint,
}

/// Signature and loader id of `klass`, or `None` if the signature is unavailable.
pub fn describe_class(jvmti: &Jvmti, jni: &JniEnv, klass: jni::jclass) -> Option<ClassDescriptor> {
    let signature = jvmti.check(jvmti.get_class_signature(klass), "Failed to get class signature")?;
    let signature = signature.to_str_lossy()?.into_owned();
    Some(ClassDescriptor {
        signature,
        loader_id: class_loader_id(jvmti, jni, klass),
    })
}

/// The loader's object hash code, or [`UNKNOWN_LOADER`].
pub fn class_loader_id(jvmti: &Jvmti, jni: &JniEnv, klass: jni::jclass) -> jni::jint {
    let Some(loader) = jvmti.check(jvmti.get_class_loader(klass), "Failed to get class loader") else {
        return UNKNOWN_LOADER;
    };
    let loader = LocalRef::new(jni, loader);
    if loader.is_null() {
        return UNKNOWN_LOADER;
    }
    jvmti
        .check(jvmti.get_object_hash_code(loader.get()), "Failed to get class loader hash")
        .unwrap_or(UNKNOWN_LOADER)
}

/// Logs one `Loaded class` record per loaded class. Returns the number logged.
pub fn dump_loaded_classes(jvmti: &Jvmti, jni: &JniEnv) -> usize {
    let Some(classes) = jvmti.check(jvmti.get_loaded_classes(), "Failed to get loaded classes") else {
        return 0;
    };

    let mut logged = 0;
    for &klass in classes.as_slice() {
        let klass = LocalRef::new(jni, klass);
        if let Some(class) = describe_class(jvmti, jni, klass.get()) {
            loge!("Loaded class {} (loader {})", class.signature, class.loader_id);
            logged += 1;
        }
    }
    logged
}

/// Logs one `Found thread` record per live thread. Returns the number logged.
pub fn dump_live_threads(jvmti: &Jvmti, jni: &JniEnv) -> usize {
    let Some(threads) = jvmti.check(jvmti.get_all_threads(), "Failed to get all threads") else {
        return 0;
    };

    let mut logged = 0;
    for &thread in threads.as_slice() {
        let thread = LocalRef::new(jni, thread);
        let Some(info) = jvmti.check(jvmti.get_thread_info(thread.get()), "Failed to get thread info") else {
            continue;
        };
        let _group = LocalRef::new(jni, info.thread_group);
        let _loader = LocalRef::new(jni, info.context_class_loader);

        if let Some(name) = info.name.to_str_lossy() {
            loge!("Found thread {}", name);
            logged += 1;
        }
    }
    logged
}
