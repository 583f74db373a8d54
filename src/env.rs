//! Wrappers over the three host handles.
//!
//! - [`JavaVm`]: the process handle; produces the other two.
//! - [`Jvmti`]: the JVMTI environment. Host-allocated results come back as
//!   [`JvmtiBuffer`] / [`JvmtiString`] and are deallocated on drop.
//! - [`JniEnv`]: the calling thread's JNI environment. Local references are
//!   held in [`LocalRef`] and deleted on drop.
//!
//! ```rust,ignore
//! let vm = unsafe { JavaVm::from_raw(raw_vm) };
//! let jvmti = vm.jvmti()?;
//! let jni = vm.attach_current_thread()?;
//!
//! let classes = jvmti.get_loaded_classes().unwrap_or_else(..);
//! for &klass in classes.as_slice() {
//!     let klass = LocalRef::new(&jni, klass);
//!     if let Ok(sig) = jvmti.get_class_signature(klass.get()) {
//!         loge!("{}", sig);
//!     }
//! }
//! // every signature, every class reference and the array are released here
//! ```
//!
//! A host call that fails comes back as `Err(jvmtiError)`; pass it to
//! [`Jvmti::check`] or [`Jvmti::check_error`] to log it in the agent's format.

pub use crate::jni_wrapper::{JniEnv, LocalRef};
pub use crate::jvmti_wrapper::{
    ExtensionFunction, ExtensionFunctions, Jvmti, JvmtiBuffer, JvmtiString, ThreadInfo,
};
pub use crate::vm::JavaVm;
