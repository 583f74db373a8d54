// pcall-agent/src/jvmti_wrapper.rs
use crate::loge;
use crate::sys::jni;
use crate::sys::jvmti::{self, jvmtiError};
use std::borrow::Cow;
use std::ffi::{CStr, CString};
use std::fmt;
use std::os::raw::{c_char, c_void};
use std::ptr;

// Resolves a function-table slot; an empty slot reads as NOT_AVAILABLE.
macro_rules! jvmti_fn {
    ($env:expr, $name:ident) => {
        match (*(*$env).functions).$name {
            Some(f) => f,
            None => return Err(jvmtiError::NOT_AVAILABLE),
        }
    };
}

fn status(err: jvmtiError) -> Result<(), jvmtiError> {
    if err == jvmtiError::NONE {
        Ok(())
    } else {
        Err(err)
    }
}

/// A wrapper around the raw JVMTI environment pointer.
///
/// Every method returns the host status as `Err(jvmtiError)`; memory the host
/// allocates on our behalf comes back inside a [`JvmtiBuffer`] or
/// [`JvmtiString`] and is handed back to `Deallocate` when that guard drops.
pub struct Jvmti {
    env: *mut jvmti::jvmtiEnv,
}

impl Jvmti {
    /// Create a Jvmti wrapper from a raw jvmtiEnv pointer
    ///
    /// # Safety
    /// The caller must ensure the pointer is valid for the duration of use.
    pub unsafe fn from_raw(env: *mut jvmti::jvmtiEnv) -> Self {
        Jvmti { env }
    }

    /// Get the raw jvmtiEnv pointer
    pub fn raw(&self) -> *mut jvmti::jvmtiEnv {
        self.env
    }

    /// Logs a failed host call.
    ///
    /// Returns `false` without logging on `NONE`. Otherwise emits one record
    /// `JVMTI error: <code>(<name>) <context>` and returns `true`. The name falls
    /// back to `Unknown` when the host cannot resolve it.
    pub fn check_error(&self, err: jvmtiError, context: &str) -> bool {
        if err == jvmtiError::NONE {
            return false;
        }
        let name = self.error_name(err).ok();
        let name = name
            .as_ref()
            .and_then(|n| n.to_str_lossy())
            .unwrap_or(Cow::Borrowed("Unknown"));
        loge!("JVMTI error: {}({}) {}", err.code(), name, context);
        true
    }

    /// Feeds a wrapped call's result through [`Jvmti::check_error`].
    pub fn check<T>(&self, result: Result<T, jvmtiError>, context: &str) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.check_error(err, context);
                None
            }
        }
    }

    pub fn error_name(&self, err: jvmtiError) -> Result<JvmtiString<'_>, jvmtiError> {
        let mut name_ptr: *mut c_char = ptr::null_mut();

        unsafe {
            let get_error_name_fn = jvmti_fn!(self.env, GetErrorName);
            let err = get_error_name_fn(self.env, err, &mut name_ptr);
            let name = JvmtiString::adopt(self, name_ptr);
            status(err)?;
            Ok(name)
        }
    }

    /// Hands host memory back. Null is accepted and ignored.
    pub fn deallocate(&self, mem: *mut u8) -> Result<(), jvmtiError> {
        if mem.is_null() {
            return Ok(());
        }
        unsafe {
            let deallocate_fn = jvmti_fn!(self.env, Deallocate);
            status(deallocate_fn(self.env, mem))
        }
    }

    // =========================================================================
    // Capabilities
    // =========================================================================

    pub fn get_potential_capabilities(&self) -> Result<jvmti::jvmtiCapabilities, jvmtiError> {
        let mut caps = jvmti::jvmtiCapabilities::default();

        unsafe {
            let get_potential_fn = jvmti_fn!(self.env, GetPotentialCapabilities);
            status(get_potential_fn(self.env, &mut caps))?;
        }

        Ok(caps)
    }

    pub fn add_capabilities(&self, caps: &jvmti::jvmtiCapabilities) -> Result<(), jvmtiError> {
        unsafe {
            let add_caps_fn = jvmti_fn!(self.env, AddCapabilities);
            status(add_caps_fn(self.env, caps))
        }
    }

    // =========================================================================
    // Events
    // =========================================================================

    pub fn set_event_callbacks(&self, callbacks: &jvmti::jvmtiEventCallbacks) -> Result<(), jvmtiError> {
        unsafe {
            let set_callbacks_fn = jvmti_fn!(self.env, SetEventCallbacks);
            let size = std::mem::size_of::<jvmti::jvmtiEventCallbacks>() as jni::jint;
            status(set_callbacks_fn(self.env, callbacks, size))
        }
    }

    /// `thread` may be null, meaning all threads.
    pub fn set_event_notification_mode(
        &self,
        mode: jni::jint,
        event_type: u32,
        thread: jni::jthread,
    ) -> Result<(), jvmtiError> {
        unsafe {
            let set_mode_fn = jvmti_fn!(self.env, SetEventNotificationMode);
            status(set_mode_fn(self.env, mode, event_type, thread))
        }
    }

    // =========================================================================
    // Classes and objects
    // =========================================================================

    /// Every class the host has loaded, as local references the caller must delete.
    pub fn get_loaded_classes(&self) -> Result<JvmtiBuffer<'_, jni::jclass>, jvmtiError> {
        let mut count: jni::jint = 0;
        let mut classes_ptr: *mut jni::jclass = ptr::null_mut();

        unsafe {
            let get_loaded_classes_fn = jvmti_fn!(self.env, GetLoadedClasses);
            let err = get_loaded_classes_fn(self.env, &mut count, &mut classes_ptr);
            let classes = JvmtiBuffer::adopt(self, classes_ptr, count);
            status(err)?;
            Ok(classes)
        }
    }

    /// The class's JVM type signature. The generic signature is not requested.
    pub fn get_class_signature(&self, klass: jni::jclass) -> Result<JvmtiString<'_>, jvmtiError> {
        let mut sig_ptr: *mut c_char = ptr::null_mut();

        unsafe {
            let get_class_sig_fn = jvmti_fn!(self.env, GetClassSignature);
            let err = get_class_sig_fn(self.env, klass, &mut sig_ptr, ptr::null_mut());
            let signature = JvmtiString::adopt(self, sig_ptr);
            status(err)?;
            Ok(signature)
        }
    }

    /// Null for the bootstrap loader; otherwise a local reference.
    pub fn get_class_loader(&self, klass: jni::jclass) -> Result<jni::jobject, jvmtiError> {
        let mut loader: jni::jobject = ptr::null_mut();

        unsafe {
            let get_class_loader_fn = jvmti_fn!(self.env, GetClassLoader);
            status(get_class_loader_fn(self.env, klass, &mut loader))?;
        }

        Ok(loader)
    }

    pub fn get_object_hash_code(&self, object: jni::jobject) -> Result<jni::jint, jvmtiError> {
        let mut hash: jni::jint = 0;

        unsafe {
            let get_hash_fn = jvmti_fn!(self.env, GetObjectHashCode);
            status(get_hash_fn(self.env, object, &mut hash))?;
        }

        Ok(hash)
    }

    /// Method name and signature. The generic signature is not requested.
    pub fn get_method_name(
        &self,
        method: jni::jmethodID,
    ) -> Result<(JvmtiString<'_>, JvmtiString<'_>), jvmtiError> {
        let mut name_ptr: *mut c_char = ptr::null_mut();
        let mut sig_ptr: *mut c_char = ptr::null_mut();

        unsafe {
            let get_method_name_fn = jvmti_fn!(self.env, GetMethodName);
            let err = get_method_name_fn(self.env, method, &mut name_ptr, &mut sig_ptr, ptr::null_mut());
            let name = JvmtiString::adopt(self, name_ptr);
            let signature = JvmtiString::adopt(self, sig_ptr);
            status(err)?;
            Ok((name, signature))
        }
    }

    // =========================================================================
    // Threads
    // =========================================================================

    /// Every live thread, as local references the caller must delete.
    pub fn get_all_threads(&self) -> Result<JvmtiBuffer<'_, jni::jthread>, jvmtiError> {
        let mut count: jni::jint = 0;
        let mut threads_ptr: *mut jni::jthread = ptr::null_mut();

        unsafe {
            let get_all_threads_fn = jvmti_fn!(self.env, GetAllThreads);
            let err = get_all_threads_fn(self.env, &mut count, &mut threads_ptr);
            let threads = JvmtiBuffer::adopt(self, threads_ptr, count);
            status(err)?;
            Ok(threads)
        }
    }

    pub fn get_thread_info(&self, thread: jni::jthread) -> Result<ThreadInfo<'_>, jvmtiError> {
        let mut info = jvmti::jvmtiThreadInfo::default();

        unsafe {
            let get_thread_info_fn = jvmti_fn!(self.env, GetThreadInfo);
            let err = get_thread_info_fn(self.env, thread, &mut info);
            let name = JvmtiString::adopt(self, info.name);
            status(err)?;
            Ok(ThreadInfo {
                name,
                priority: info.priority,
                is_daemon: info.is_daemon != jni::JNI_FALSE,
                thread_group: info.thread_group,
                context_class_loader: info.context_class_loader,
            })
        }
    }

    pub fn run_agent_thread(
        &self,
        thread: jni::jthread,
        proc_: jvmti::jvmtiStartFunction,
        arg: *const c_void,
        priority: jni::jint,
    ) -> Result<(), jvmtiError> {
        unsafe {
            let run_agent_thread_fn = jvmti_fn!(self.env, RunAgentThread);
            status(run_agent_thread_fn(self.env, thread, proc_, arg, priority))
        }
    }

    // =========================================================================
    // Heap
    // =========================================================================

    pub fn iterate_through_heap(
        &self,
        heap_filter: jni::jint,
        klass: jni::jclass,
        callbacks: &jvmti::jvmtiHeapCallbacks,
        user_data: *const c_void,
    ) -> Result<(), jvmtiError> {
        unsafe {
            let iterate_fn = jvmti_fn!(self.env, IterateThroughHeap);
            status(iterate_fn(self.env, heap_filter, klass, callbacks, user_data))
        }
    }

    // =========================================================================
    // Extensions
    // =========================================================================

    /// Enumerates the host's extension functions.
    ///
    /// Every nested allocation is adopted up front, so entries that are never
    /// visited are still released when the returned iterator drops.
    pub fn get_extension_functions(&self) -> Result<ExtensionFunctions<'_>, jvmtiError> {
        let mut count: jni::jint = 0;
        let mut infos_ptr: *mut jvmti::jvmtiExtensionFunctionInfo = ptr::null_mut();

        unsafe {
            let get_extensions_fn = jvmti_fn!(self.env, GetExtensionFunctions);
            let err = get_extensions_fn(self.env, &mut count, &mut infos_ptr);
            let array = JvmtiBuffer::adopt(self, infos_ptr, count);
            status(err)?;

            let entries: Vec<_> = array
                .as_slice()
                .iter()
                .map(|info| ExtensionFunction::adopt(self, info))
                .collect();

            Ok(ExtensionFunctions {
                entries: entries.into_iter(),
                _array: array,
            })
        }
    }

    // =========================================================================
    // Class loader search
    // =========================================================================

    pub fn add_to_bootstrap_class_loader_search(&self, segment: &str) -> Result<(), jvmtiError> {
        let segment = CString::new(segment).map_err(|_| jvmtiError::ILLEGAL_ARGUMENT)?;

        unsafe {
            let add_fn = jvmti_fn!(self.env, AddToBootstrapClassLoaderSearch);
            status(add_fn(self.env, segment.as_ptr()))
        }
    }
}

// =============================================================================
// Scoped host allocations
// =============================================================================

/// An array allocated by the host, released with `Deallocate` on drop.
pub struct JvmtiBuffer<'a, T> {
    jvmti: &'a Jvmti,
    ptr: *mut T,
    len: usize,
}

impl<'a, T> JvmtiBuffer<'a, T> {
    /// Takes ownership of `len` elements at `ptr`. Null is allowed.
    ///
    /// # Safety
    /// `ptr` must be null or a live host allocation holding `len` elements,
    /// not owned by any other guard.
    pub unsafe fn adopt(jvmti: &'a Jvmti, ptr: *mut T, len: jni::jint) -> Self {
        JvmtiBuffer {
            jvmti,
            ptr,
            len: usize::try_from(len).unwrap_or(0),
        }
    }

    pub fn as_slice(&self) -> &[T] {
        if self.ptr.is_null() {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Drop for JvmtiBuffer<'_, T> {
    fn drop(&mut self) {
        release(self.jvmti, self.ptr as *mut u8);
    }
}

/// A NUL-terminated string allocated by the host, released on drop.
pub struct JvmtiString<'a> {
    jvmti: &'a Jvmti,
    ptr: *mut c_char,
}

impl<'a> JvmtiString<'a> {
    /// # Safety
    /// `ptr` must be null or a live, NUL-terminated host allocation not owned
    /// by any other guard.
    pub unsafe fn adopt(jvmti: &'a Jvmti, ptr: *mut c_char) -> Self {
        JvmtiString { jvmti, ptr }
    }

    pub fn is_null(&self) -> bool {
        self.ptr.is_null()
    }

    pub fn as_c_str(&self) -> Option<&CStr> {
        if self.ptr.is_null() {
            None
        } else {
            Some(unsafe { CStr::from_ptr(self.ptr) })
        }
    }

    pub fn to_str_lossy(&self) -> Option<Cow<'_, str>> {
        self.as_c_str().map(CStr::to_string_lossy)
    }
}

impl fmt::Display for JvmtiString<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_str_lossy() {
            Some(s) => f.write_str(&s),
            None => Ok(()),
        }
    }
}

impl Drop for JvmtiString<'_> {
    fn drop(&mut self) {
        release(self.jvmti, self.ptr as *mut u8);
    }
}

// Guard release path. Logs directly: check_error allocates a name buffer.
fn release(jvmti: &Jvmti, mem: *mut u8) {
    if let Err(err) = jvmti.deallocate(mem) {
        loge!("JVMTI error: {} Deallocate failed", err.code());
    }
}

// =============================================================================
// Descriptors
// =============================================================================

/// `jvmtiThreadInfo` with its name adopted.
///
/// `thread_group` and `context_class_loader` are local references owned by
/// the caller.
pub struct ThreadInfo<'a> {
    pub name: JvmtiString<'a>,
    pub priority: jni::jint,
    pub is_daemon: bool,
    pub thread_group: jni::jobject,
    pub context_class_loader: jni::jobject,
}

/// One extension function with every nested host buffer adopted.
pub struct ExtensionFunction<'a> {
    func: *mut c_void,
    id: JvmtiString<'a>,
    short_description: JvmtiString<'a>,
    // Dropped before `params`, which holds the name pointers.
    param_names: Vec<JvmtiString<'a>>,
    params: JvmtiBuffer<'a, jvmti::jvmtiParamInfo>,
    errors: JvmtiBuffer<'a, jvmtiError>,
}

impl<'a> ExtensionFunction<'a> {
    unsafe fn adopt(jvmti: &'a Jvmti, info: &jvmti::jvmtiExtensionFunctionInfo) -> Self {
        let params = JvmtiBuffer::adopt(jvmti, info.params, info.param_count);
        let param_names = params
            .as_slice()
            .iter()
            .map(|p| JvmtiString::adopt(jvmti, p.name))
            .collect();

        ExtensionFunction {
            func: info.func,
            id: JvmtiString::adopt(jvmti, info.id),
            short_description: JvmtiString::adopt(jvmti, info.short_description),
            param_names,
            params,
            errors: JvmtiBuffer::adopt(jvmti, info.errors, info.error_count),
        }
    }

    /// The raw entry point; its real type depends on [`ExtensionFunction::id`].
    pub fn func(&self) -> *mut c_void {
        self.func
    }

    pub fn id(&self) -> Option<&CStr> {
        self.id.as_c_str()
    }

    pub fn short_description(&self) -> &JvmtiString<'a> {
        &self.short_description
    }

    pub fn param_names(&self) -> impl Iterator<Item = &JvmtiString<'a>> {
        self.param_names.iter()
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    pub fn errors(&self) -> &[jvmtiError] {
        self.errors.as_slice()
    }
}

/// The result of `GetExtensionFunctions`.
///
/// Each descriptor's buffers are released as soon as the caller drops it;
/// the outer array is released last.
pub struct ExtensionFunctions<'a> {
    entries: std::vec::IntoIter<ExtensionFunction<'a>>,
    _array: JvmtiBuffer<'a, jvmti::jvmtiExtensionFunctionInfo>,
}

impl<'a> Iterator for ExtensionFunctions<'a> {
    type Item = ExtensionFunction<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl ExactSizeIterator for ExtensionFunctions<'_> {}
