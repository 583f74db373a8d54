//! Hand-off to the companion dex/jar.
//!
//! The archive is appended to the bootstrap class path, then the companion
//! class's static no-argument initializer is called. Everything after attach
//! (heap mutation hooks and the like) lives on that side.

use std::path::{Path, PathBuf};

use crate::error::CompanionError;
use crate::jni_wrapper::{JniEnv, LocalRef};
use crate::jvmti_wrapper::Jvmti;

pub const DEFAULT_ARCHIVE: &str = "pcall.dex.jar";
pub const DEFAULT_CLASS: &str = "com/johnsoft/pcalla/Finder";
pub const DEFAULT_INIT_METHOD: &str = "init";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanionConfig {
    pub archive: PathBuf,
    /// Internal name, `a/b/C`.
    pub class_name: String,
    pub init_method: String,
}

impl Default for CompanionConfig {
    /// The archive next to the agent library, or a bare file name if the
    /// library's location cannot be determined.
    fn default() -> Self {
        let archive = match agent_directory() {
            Some(dir) => dir.join(DEFAULT_ARCHIVE),
            None => PathBuf::from(DEFAULT_ARCHIVE),
        };
        CompanionConfig {
            archive,
            class_name: DEFAULT_CLASS.to_string(),
            init_method: DEFAULT_INIT_METHOD.to_string(),
        }
    }
}

/// Directory holding the shared object this code was loaded from.
#[cfg(unix)]
pub fn agent_directory() -> Option<PathBuf> {
    use std::ffi::{CStr, OsStr};
    use std::os::unix::ffi::OsStrExt;

    let mut info: libc::Dl_info = unsafe { std::mem::zeroed() };
    let addr = agent_directory as *const libc::c_void;
    if unsafe { libc::dladdr(addr, &mut info) } == 0 || info.dli_fname.is_null() {
        return None;
    }
    let file = unsafe { CStr::from_ptr(info.dli_fname) };
    Path::new(OsStr::from_bytes(file.to_bytes()))
        .parent()
        .map(Path::to_path_buf)
}

#[cfg(not(unix))]
pub fn agent_directory() -> Option<PathBuf> {
    None
}

/// Registers the archive and calls `<class_name>.<init_method>()V`.
///
/// Stops at the first failing step. A pending exception left by a failed
/// lookup or thrown by the initializer is described and cleared.
pub fn hand_off(jvmti: &Jvmti, jni: &JniEnv, config: &CompanionConfig) -> Result<(), CompanionError> {
    let archive = config.archive.to_string_lossy();
    jvmti
        .add_to_bootstrap_class_loader_search(&archive)
        .map_err(|err| CompanionError::Bootstrap {
            path: config.archive.clone(),
            err,
        })?;

    let class = jni
        .find_class(&config.class_name)
        .map(|cls| LocalRef::new(jni, cls))
        .ok_or_else(|| {
            jni.clear_pending_exception();
            CompanionError::ClassNotFound(config.class_name.clone())
        })?;

    let init = jni
        .get_static_method_id(class.get(), &config.init_method, "()V")
        .ok_or_else(|| {
            jni.clear_pending_exception();
            CompanionError::MethodNotFound {
                class: config.class_name.clone(),
                method: config.init_method.clone(),
            }
        })?;

    jni.call_static_void_method(class.get(), init, &[]);
    if jni.clear_pending_exception() {
        return Err(CompanionError::InitThrew {
            class: config.class_name.clone(),
            method: config.init_method.clone(),
        });
    }
    Ok(())
}
