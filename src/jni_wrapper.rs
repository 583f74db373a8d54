//! Wrapper around the calling thread's JNI environment.
//!
//! Only the handful of calls the agent makes are wrapped. Lookups return
//! `Option` (null from the host becomes `None`); an empty function-table slot
//! is treated the same as a failed lookup.

use crate::sys::jni;
use std::ffi::CString;

/// Safe wrapper around a JNI environment pointer.
///
/// A `JniEnv` is tied to the thread it was obtained on. The raw pointer keeps
/// it `!Send`.
pub struct JniEnv {
    env: *mut jni::JNIEnv,
}

impl JniEnv {
    /// Creates a JniEnv wrapper from a raw pointer.
    ///
    /// # Safety
    ///
    /// The caller must ensure the pointer is valid and comes from the current thread.
    pub unsafe fn from_raw(env: *mut jni::JNIEnv) -> Self {
        JniEnv { env }
    }

    /// Returns the raw JNI environment pointer.
    pub fn raw(&self) -> *mut jni::JNIEnv {
        self.env
    }

    fn table(&self) -> &jni::JNINativeInterface_ {
        unsafe { &**self.env }
    }

    // =========================================================================
    // Classes and methods
    // =========================================================================

    /// Finds a class by its internal name (`java/lang/Thread`).
    ///
    /// On failure the host leaves a pending exception.
    pub fn find_class(&self, name: &str) -> Option<jni::jclass> {
        let name = CString::new(name).ok()?;
        let find_class_fn = self.table().FindClass?;
        let cls = unsafe { find_class_fn(self.env, name.as_ptr()) };
        (!cls.is_null()).then_some(cls)
    }

    pub fn get_method_id(&self, cls: jni::jclass, name: &str, sig: &str) -> Option<jni::jmethodID> {
        let get_method_id_fn = self.table().GetMethodID?;
        lookup_method(self.env, get_method_id_fn, cls, name, sig)
    }

    pub fn get_static_method_id(&self, cls: jni::jclass, name: &str, sig: &str) -> Option<jni::jmethodID> {
        let get_static_method_id_fn = self.table().GetStaticMethodID?;
        lookup_method(self.env, get_static_method_id_fn, cls, name, sig)
    }

    // =========================================================================
    // Objects and calls
    // =========================================================================

    /// Constructs an object. The result is a local reference.
    pub fn new_object(&self, cls: jni::jclass, ctor: jni::jmethodID, args: &[jni::jvalue]) -> Option<jni::jobject> {
        let new_object_fn = self.table().NewObjectA?;
        let obj = unsafe { new_object_fn(self.env, cls, ctor, args.as_ptr()) };
        (!obj.is_null()).then_some(obj)
    }

    pub fn call_static_void_method(&self, cls: jni::jclass, method: jni::jmethodID, args: &[jni::jvalue]) {
        if let Some(call_fn) = self.table().CallStaticVoidMethodA {
            unsafe { call_fn(self.env, cls, method, args.as_ptr()) }
        }
    }

    // =========================================================================
    // Exceptions
    // =========================================================================

    pub fn exception_check(&self) -> bool {
        match self.table().ExceptionCheck {
            Some(check_fn) => unsafe { check_fn(self.env) != jni::JNI_FALSE },
            None => false,
        }
    }

    pub fn exception_describe(&self) {
        if let Some(describe_fn) = self.table().ExceptionDescribe {
            unsafe { describe_fn(self.env) }
        }
    }

    pub fn exception_clear(&self) {
        if let Some(clear_fn) = self.table().ExceptionClear {
            unsafe { clear_fn(self.env) }
        }
    }

    /// Describes and clears a pending exception. Returns whether there was one.
    pub fn clear_pending_exception(&self) -> bool {
        if !self.exception_check() {
            return false;
        }
        self.exception_describe();
        self.exception_clear();
        true
    }

    // =========================================================================
    // References
    // =========================================================================

    /// Deletes a local reference.
    pub fn delete_local_ref(&self, obj: jni::jobject) {
        if let Some(delete_fn) = self.table().DeleteLocalRef {
            unsafe { delete_fn(self.env, obj) }
        }
    }
}

fn lookup_method(
    env: *mut jni::JNIEnv,
    lookup_fn: jni::GetMethodIDFn,
    cls: jni::jclass,
    name: &str,
    sig: &str,
) -> Option<jni::jmethodID> {
    let name = CString::new(name).ok()?;
    let sig = CString::new(sig).ok()?;
    let mid = unsafe { lookup_fn(env, cls, name.as_ptr(), sig.as_ptr()) };
    (!mid.is_null()).then_some(mid)
}

/// A guard that deletes a local reference when dropped.
///
/// Null references are allowed and never deleted.
///
/// ```rust,ignore
/// let class = LocalRef::new(&env, env.find_class("java/lang/Thread")?);
/// // class is deleted when it goes out of scope
/// ```
pub struct LocalRef<'a> {
    env: &'a JniEnv,
    obj: jni::jobject,
}

impl<'a> LocalRef<'a> {
    pub fn new(env: &'a JniEnv, obj: jni::jobject) -> Self {
        LocalRef { env, obj }
    }

    /// Returns the underlying jobject.
    pub fn get(&self) -> jni::jobject {
        self.obj
    }

    pub fn is_null(&self) -> bool {
        self.obj.is_null()
    }
}

impl Drop for LocalRef<'_> {
    fn drop(&mut self) {
        if !self.obj.is_null() {
            self.env.delete_local_ref(self.obj);
        }
    }
}
