//! Environment bootstrap: the JVMTI environment and the calling thread's JNI
//! environment, both obtained from the `JavaVM` the host passes to the agent.

use std::ffi::c_void;
use std::ptr;

use crate::error::AgentError;
use crate::jni_wrapper::JniEnv;
use crate::jvmti_wrapper::Jvmti;
use crate::loge;
use crate::sys::{jni, jvmti};

/// The host process handle.
pub struct JavaVm {
    vm: *mut jni::JavaVM,
}

impl JavaVm {
    /// # Safety
    /// `vm` must be the `JavaVM*` handed to the agent by the host.
    pub unsafe fn from_raw(vm: *mut jni::JavaVM) -> Self {
        JavaVm { vm }
    }

    pub fn raw(&self) -> *mut jni::JavaVM {
        self.vm
    }

    fn get_env(&self, version: jni::jint) -> Result<*mut c_void, jni::jint> {
        let mut env_ptr: *mut c_void = ptr::null_mut();

        unsafe {
            let get_env_fn = (**self.vm).GetEnv.ok_or(jni::JNI_ERR)?;
            let res = get_env_fn(self.vm, &mut env_ptr, version);
            if res != jni::JNI_OK {
                return Err(res);
            }
        }

        Ok(env_ptr)
    }

    /// The JVMTI environment at version 1.2. Lives as long as the process.
    pub fn jvmti(&self) -> Result<Jvmti, AgentError> {
        let env = self
            .get_env(jvmti::JVMTI_VERSION_1_2)
            .map_err(AgentError::EnvironmentUnavailable)?;
        Ok(unsafe { Jvmti::from_raw(env as *mut jvmti::jvmtiEnv) })
    }

    /// The calling thread's JNI environment, attaching the thread if needed.
    pub fn attach_current_thread(&self) -> Result<JniEnv, AgentError> {
        match self.get_env(jni::JNI_VERSION_1_6) {
            Ok(env) => return Ok(unsafe { JniEnv::from_raw(env as *mut jni::JNIEnv) }),
            Err(jni::JNI_EDETACHED) => loge!("JNIEnv not attached"),
            Err(code) => return Err(AgentError::AttachFailed(code)),
        }

        let mut env_ptr: *mut c_void = ptr::null_mut();

        unsafe {
            let attach_fn = (**self.vm).AttachCurrentThread.ok_or(AgentError::AttachFailed(jni::JNI_ERR))?;
            let res = attach_fn(self.vm, &mut env_ptr, ptr::null_mut());
            if res != jni::JNI_OK {
                return Err(AgentError::AttachFailed(res));
            }
            Ok(JniEnv::from_raw(env_ptr as *mut jni::JNIEnv))
        }
    }
}
