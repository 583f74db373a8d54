//! A simulated host for driving the agent's FFI code in tests.
//!
//! `FakeHost` owns a JVMTI function table, a JNI function table and a JavaVM
//! table, each reachable from the env pointer handed to the agent. Every
//! buffer it gives out goes through a counting allocator and every object
//! handle it gives out is tracked as a local reference, so tests can assert
//! that the agent released exactly what it obtained.

#![allow(dead_code)]

use std::alloc::{self, Layout};
use std::cell::{Cell, Ref, RefCell};
use std::collections::HashMap;
use std::ffi::{c_void, CStr};
use std::io;
use std::mem;
use std::os::raw::c_char;
use std::ptr;
use std::sync::{Arc, Mutex};

use pcall_agent::env::{JavaVm, JniEnv, Jvmti};
use pcall_agent::sys::jni::{
    self, jboolean, jclass, jint, jlong, jmethodID, jobject, jthread, jvalue, JNIEnv, JNIInvokeInterface_,
    JNINativeInterface_, JavaVM,
};
use pcall_agent::sys::jvmti::{
    self, jvmtiCapabilities, jvmtiEnv, jvmtiError, jvmtiEventCallbacks, jvmtiExtensionFunctionInfo,
    jvmtiHeapCallbacks, jvmtiHeapCallbacksExt, jvmtiInterface_1_, jvmtiParamInfo, jvmtiStartFunction,
    jvmtiThreadInfo,
};
use tracing_subscriber::fmt::MakeWriter;

const CLASS_BASE: usize = 0x1_0000;
const THREAD_BASE: usize = 0x2_0000;
const LOADER_BASE: usize = 0x3_0000;
const GROUP_BASE: usize = 0x4_0000;
const CONTEXT_LOADER_BASE: usize = 0x5_0000;
const JNI_CLASS_BASE: usize = 0x6_0000;
const OBJECT_BASE: usize = 0x7_0000;
const METHOD_BASE: usize = 0x8_0000;
const JNI_METHOD: usize = 0x9_0000;

// =============================================================================
// Configuration
// =============================================================================

pub struct FakeClass {
    pub signature: String,
    /// Hash of the defining loader; `None` for the bootstrap loader.
    pub loader_hash: Option<jint>,
}

impl FakeClass {
    pub fn boot(signature: &str) -> Self {
        FakeClass { signature: signature.to_string(), loader_hash: None }
    }

    pub fn with_loader(signature: &str, hash: jint) -> Self {
        FakeClass { signature: signature.to_string(), loader_hash: Some(hash) }
    }
}

pub struct FakeExtension {
    pub id: String,
    pub description: String,
    pub params: Vec<String>,
    pub errors: Vec<jvmtiError>,
    pub func: *mut c_void,
}

impl FakeExtension {
    pub fn named(id: &str, params: usize, errors: usize) -> Self {
        FakeExtension {
            id: id.to_string(),
            description: format!("{} description", id),
            params: (0..params).map(|i| format!("param{}", i)).collect(),
            errors: vec![jvmtiError::ILLEGAL_ARGUMENT; errors],
            func: ptr::null_mut(),
        }
    }

    /// ART's heap iteration extension, backed by [`fake_iterate_through_heap_ext`].
    pub fn heap_iteration() -> Self {
        FakeExtension {
            func: fake_iterate_through_heap_ext as *mut c_void,
            ..FakeExtension::named("com.android.art.heap.iterate_through_heap_ext", 4, 3)
        }
    }
}

pub struct HostConfig {
    pub classes: Vec<FakeClass>,
    pub threads: Vec<String>,
    /// `(name, signature)`; addressed through [`FakeHost::method`]. `None`
    /// comes back as a null string.
    pub methods: Vec<(Option<String>, Option<String>)>,
    pub extensions: Vec<FakeExtension>,
    /// `(class_tag, size)` per object.
    pub heap_objects: Vec<(jlong, jlong)>,
    /// Returned by `IterateThroughHeap` instead of walking, unless `NONE`.
    pub standard_heap: jvmtiError,
    pub jvmti_get_env: jint,
    pub jni_get_env: jint,
    pub attach_status: jint,
    /// Whether `GetErrorName` resolves names.
    pub error_names: bool,
    pub potential_capabilities: jvmtiCapabilities,
    pub add_capabilities: jvmtiError,
    pub notification_status: jvmtiError,
    pub bootstrap_status: jvmtiError,
    /// Classes `FindClass` knows.
    pub jni_classes: Vec<String>,
    /// Method names `GetMethodID` / `GetStaticMethodID` do not find.
    pub missing_methods: Vec<String>,
    pub init_throws: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        HostConfig {
            classes: Vec::new(),
            threads: Vec::new(),
            methods: Vec::new(),
            extensions: Vec::new(),
            heap_objects: Vec::new(),
            standard_heap: jvmtiError::NONE,
            jvmti_get_env: jni::JNI_OK,
            jni_get_env: jni::JNI_OK,
            attach_status: jni::JNI_OK,
            error_names: true,
            potential_capabilities: jvmtiCapabilities::from_words([0x0fff_ffff, 0x7, 0, 0]),
            add_capabilities: jvmtiError::NONE,
            notification_status: jvmtiError::NONE,
            bootstrap_status: jvmtiError::NONE,
            jni_classes: vec!["java/lang/Thread".to_string(), "com/johnsoft/pcalla/Finder".to_string()],
            missing_methods: Vec::new(),
            init_throws: false,
        }
    }
}

// =============================================================================
// Recorded calls
// =============================================================================

#[derive(Default)]
pub struct Calls {
    pub callbacks: Option<jvmtiEventCallbacks>,
    pub notification_modes: Vec<(jint, u32)>,
    pub added_capabilities: Option<jvmtiCapabilities>,
    /// `(heap_filter, klass)` per `IterateThroughHeap` call.
    pub standard_heap_walks: Vec<(jint, usize)>,
    /// `(heap_filter, klass_was_null)` per extension call.
    pub extension_heap_walks: Vec<(jint, bool)>,
    pub agent_threads: Vec<jint>,
    pub bootstrap_segments: Vec<String>,
    pub static_calls: usize,
    pub described_exceptions: usize,
    pub attached: bool,
}

#[derive(Default)]
struct Allocs {
    live: HashMap<usize, Layout>,
    total: usize,
    bad_frees: usize,
}

// =============================================================================
// Host
// =============================================================================

#[repr(C)]
struct JvmtiSlot {
    env: jvmtiEnv,
    host: *const Inner,
}

#[repr(C)]
struct JniSlot {
    env: JNIEnv,
    host: *const Inner,
}

#[repr(C)]
struct VmSlot {
    vm: JavaVM,
    host: *const Inner,
}

struct Inner {
    jvmti_table: jvmtiInterface_1_,
    jni_table: JNINativeInterface_,
    vm_table: JNIInvokeInterface_,
    jvmti_slot: JvmtiSlot,
    jni_slot: JniSlot,
    vm_slot: VmSlot,
    config: HostConfig,
    allocs: RefCell<Allocs>,
    refs: RefCell<HashMap<usize, usize>>,
    bad_deletes: Cell<usize>,
    next_object: Cell<usize>,
    pending_exception: Cell<bool>,
    calls: RefCell<Calls>,
}

pub struct FakeHost {
    inner: Box<Inner>,
}

impl FakeHost {
    pub fn new(config: HostConfig) -> Self {
        let mut inner = Box::new(Inner {
            jvmti_table: jvmti_table(),
            jni_table: jni_table(),
            vm_table: vm_table(),
            jvmti_slot: JvmtiSlot { env: jvmtiEnv { functions: ptr::null() }, host: ptr::null() },
            jni_slot: JniSlot { env: ptr::null(), host: ptr::null() },
            vm_slot: VmSlot { vm: ptr::null(), host: ptr::null() },
            config,
            allocs: RefCell::default(),
            refs: RefCell::default(),
            bad_deletes: Cell::new(0),
            next_object: Cell::new(0),
            pending_exception: Cell::new(false),
            calls: RefCell::default(),
        });

        let base: *mut Inner = &mut *inner;
        unsafe {
            (*base).jvmti_slot.env.functions = ptr::addr_of!((*base).jvmti_table);
            (*base).jvmti_slot.host = base;
            (*base).jni_slot.env = ptr::addr_of!((*base).jni_table);
            (*base).jni_slot.host = base;
            (*base).vm_slot.vm = ptr::addr_of!((*base).vm_table);
            (*base).vm_slot.host = base;
        }
        FakeHost { inner }
    }

    pub fn raw_jvmti(&self) -> *mut jvmtiEnv {
        self.inner.jvmti_env()
    }

    pub fn raw_jni(&self) -> *mut JNIEnv {
        self.inner.jni_env()
    }

    pub fn raw_vm(&self) -> *mut JavaVM {
        ptr::addr_of!(self.inner.vm_slot) as *mut JavaVM
    }

    pub fn jvmti(&self) -> Jvmti {
        unsafe { Jvmti::from_raw(self.raw_jvmti()) }
    }

    pub fn jni(&self) -> JniEnv {
        unsafe { JniEnv::from_raw(self.raw_jni()) }
    }

    pub fn vm(&self) -> JavaVm {
        unsafe { JavaVm::from_raw(self.raw_vm()) }
    }

    /// The `i`th configured class, as the host would pass it to a callback.
    pub fn class(&self, i: usize) -> jclass {
        handle(CLASS_BASE + i)
    }

    /// The `i`th configured method.
    pub fn method(&self, i: usize) -> jmethodID {
        handle(METHOD_BASE + i)
    }

    /// A host-owned object handle, not tracked as a local reference.
    pub fn object(&self, id: usize) -> jobject {
        handle(OBJECT_BASE + 0x8000 + id)
    }

    pub fn outstanding_allocations(&self) -> usize {
        self.inner.allocs.borrow().live.len()
    }

    pub fn total_allocations(&self) -> usize {
        self.inner.allocs.borrow().total
    }

    pub fn bad_frees(&self) -> usize {
        self.inner.allocs.borrow().bad_frees
    }

    pub fn live_local_refs(&self) -> usize {
        self.inner.refs.borrow().values().sum()
    }

    pub fn bad_deletes(&self) -> usize {
        self.inner.bad_deletes.get()
    }

    pub fn pending_exception(&self) -> bool {
        self.inner.pending_exception.get()
    }

    pub fn calls(&self) -> Ref<'_, Calls> {
        self.inner.calls.borrow()
    }

    /// The callback table most recently installed with `SetEventCallbacks`.
    pub fn installed_callbacks(&self) -> jvmtiEventCallbacks {
        self.calls().callbacks.unwrap_or_default()
    }
}

impl Drop for FakeHost {
    fn drop(&mut self) {
        for (addr, layout) in self.inner.allocs.borrow_mut().live.drain() {
            unsafe { alloc::dealloc(addr as *mut u8, layout) };
        }
    }
}

impl Inner {
    fn jvmti_env(&self) -> *mut jvmtiEnv {
        ptr::addr_of!(self.jvmti_slot) as *mut jvmtiEnv
    }

    fn jni_env(&self) -> *mut JNIEnv {
        ptr::addr_of!(self.jni_slot) as *mut JNIEnv
    }

    fn alloc_bytes(&self, size: usize) -> *mut u8 {
        let layout = match Layout::from_size_align(size.max(1), 8) {
            Ok(layout) => layout,
            Err(_) => return ptr::null_mut(),
        };
        let mem = unsafe { alloc::alloc_zeroed(layout) };
        let mut allocs = self.allocs.borrow_mut();
        allocs.live.insert(mem as usize, layout);
        allocs.total += 1;
        mem
    }

    fn alloc_string(&self, s: &str) -> *mut c_char {
        let mem = self.alloc_bytes(s.len() + 1);
        unsafe { ptr::copy_nonoverlapping(s.as_ptr(), mem, s.len()) };
        mem as *mut c_char
    }

    fn alloc_array<T: Copy>(&self, items: &[T]) -> *mut T {
        let mem = self.alloc_bytes(mem::size_of_val(items)) as *mut T;
        unsafe { ptr::copy_nonoverlapping(items.as_ptr(), mem, items.len()) };
        mem
    }

    fn free(&self, mem: *mut u8) -> jvmtiError {
        let mut allocs = self.allocs.borrow_mut();
        match allocs.live.remove(&(mem as usize)) {
            Some(layout) => {
                unsafe { alloc::dealloc(mem, layout) };
                jvmtiError::NONE
            }
            None => {
                allocs.bad_frees += 1;
                jvmtiError::ILLEGAL_ARGUMENT
            }
        }
    }

    fn new_local(&self, value: usize) -> jobject {
        *self.refs.borrow_mut().entry(value).or_default() += 1;
        handle(value)
    }

    fn delete_local(&self, obj: jobject) {
        let mut refs = self.refs.borrow_mut();
        match refs.get_mut(&(obj as usize)) {
            Some(count) if *count > 0 => {
                *count -= 1;
                if *count == 0 {
                    refs.remove(&(obj as usize));
                }
            }
            _ => self.bad_deletes.set(self.bad_deletes.get() + 1),
        }
    }

    fn class_index(&self, klass: jclass) -> Option<usize> {
        index_in(klass, CLASS_BASE, self.config.classes.len())
    }

    fn walk(&self, mut visit: impl FnMut(jlong, jlong, *mut jlong) -> jint) {
        for &(class_tag, size) in &self.config.heap_objects {
            let mut tag: jlong = 0;
            if visit(class_tag, size, &mut tag) & jvmti::JVMTI_VISIT_ABORT != 0 {
                break;
            }
        }
    }
}

fn handle(value: usize) -> jobject {
    value as *mut c_void
}

fn index_in(obj: jobject, base: usize, len: usize) -> Option<usize> {
    let value = obj as usize;
    (value >= base && value < base + len).then(|| value - base)
}

unsafe fn host<'a>(env: *mut jvmtiEnv) -> &'a Inner {
    &*(*(env as *const JvmtiSlot)).host
}

unsafe fn jni_host<'a>(env: *mut JNIEnv) -> &'a Inner {
    &*(*(env as *const JniSlot)).host
}

unsafe fn vm_host<'a>(vm: *mut JavaVM) -> &'a Inner {
    &*(*(vm as *const VmSlot)).host
}

// =============================================================================
// JVMTI
// =============================================================================

fn jvmti_table() -> jvmtiInterface_1_ {
    let mut table = jvmtiInterface_1_::default();
    table.SetEventNotificationMode = Some(set_event_notification_mode);
    table.GetAllThreads = Some(get_all_threads);
    table.GetThreadInfo = Some(get_thread_info);
    table.RunAgentThread = Some(run_agent_thread);
    table.Deallocate = Some(deallocate);
    table.GetClassSignature = Some(get_class_signature);
    table.GetClassLoader = Some(get_class_loader);
    table.GetObjectHashCode = Some(get_object_hash_code);
    table.GetMethodName = Some(get_method_name);
    table.GetLoadedClasses = Some(get_loaded_classes);
    table.IterateThroughHeap = Some(iterate_through_heap);
    table.SetEventCallbacks = Some(set_event_callbacks);
    table.GetExtensionFunctions = Some(get_extension_functions);
    table.GetErrorName = Some(get_error_name);
    table.GetPotentialCapabilities = Some(get_potential_capabilities);
    table.AddCapabilities = Some(add_capabilities);
    table.AddToBootstrapClassLoaderSearch = Some(add_to_bootstrap_class_loader_search);
    table
}

unsafe extern "system" fn get_error_name(env: *mut jvmtiEnv, error: jvmtiError, name_ptr: *mut *mut c_char) -> jvmtiError {
    let host = host(env);
    if !host.config.error_names {
        return jvmtiError::ILLEGAL_ARGUMENT;
    }
    let name = match error {
        jvmtiError::INVALID_CLASS => "JVMTI_ERROR_INVALID_CLASS",
        jvmtiError::NOT_AVAILABLE => "JVMTI_ERROR_NOT_AVAILABLE",
        jvmtiError::OUT_OF_MEMORY => "JVMTI_ERROR_OUT_OF_MEMORY",
        jvmtiError::WRONG_PHASE => "JVMTI_ERROR_WRONG_PHASE",
        _ => "JVMTI_ERROR_INTERNAL",
    };
    *name_ptr = host.alloc_string(name);
    jvmtiError::NONE
}

unsafe extern "system" fn deallocate(env: *mut jvmtiEnv, mem: *mut u8) -> jvmtiError {
    host(env).free(mem)
}

unsafe extern "system" fn get_potential_capabilities(env: *mut jvmtiEnv, caps: *mut jvmtiCapabilities) -> jvmtiError {
    *caps = host(env).config.potential_capabilities;
    jvmtiError::NONE
}

unsafe extern "system" fn add_capabilities(env: *mut jvmtiEnv, caps: *const jvmtiCapabilities) -> jvmtiError {
    let host = host(env);
    host.calls.borrow_mut().added_capabilities = Some(*caps);
    host.config.add_capabilities
}

unsafe extern "system" fn set_event_callbacks(
    env: *mut jvmtiEnv,
    callbacks: *const jvmtiEventCallbacks,
    size: jint,
) -> jvmtiError {
    if size as usize != mem::size_of::<jvmtiEventCallbacks>() {
        return jvmtiError::ILLEGAL_ARGUMENT;
    }
    host(env).calls.borrow_mut().callbacks = Some(*callbacks);
    jvmtiError::NONE
}

unsafe extern "system" fn set_event_notification_mode(
    env: *mut jvmtiEnv,
    mode: jint,
    event_type: u32,
    _thread: jthread,
) -> jvmtiError {
    let host = host(env);
    host.calls.borrow_mut().notification_modes.push((mode, event_type));
    host.config.notification_status
}

unsafe extern "system" fn get_loaded_classes(
    env: *mut jvmtiEnv,
    count_ptr: *mut jint,
    classes_ptr: *mut *mut jclass,
) -> jvmtiError {
    let host = host(env);
    let classes: Vec<jclass> = (0..host.config.classes.len()).map(|i| host.new_local(CLASS_BASE + i)).collect();
    *count_ptr = classes.len() as jint;
    *classes_ptr = host.alloc_array(&classes);
    jvmtiError::NONE
}

unsafe extern "system" fn get_class_signature(
    env: *mut jvmtiEnv,
    klass: jclass,
    sig_ptr: *mut *mut c_char,
    generic_ptr: *mut *mut c_char,
) -> jvmtiError {
    let host = host(env);
    let Some(i) = host.class_index(klass) else {
        return jvmtiError::INVALID_CLASS;
    };
    if !sig_ptr.is_null() {
        *sig_ptr = host.alloc_string(&host.config.classes[i].signature);
    }
    if !generic_ptr.is_null() {
        *generic_ptr = ptr::null_mut();
    }
    jvmtiError::NONE
}

unsafe extern "system" fn get_class_loader(env: *mut jvmtiEnv, klass: jclass, loader_ptr: *mut jobject) -> jvmtiError {
    let host = host(env);
    let Some(i) = host.class_index(klass) else {
        return jvmtiError::INVALID_CLASS;
    };
    *loader_ptr = match host.config.classes[i].loader_hash {
        Some(_) => host.new_local(LOADER_BASE + i),
        None => ptr::null_mut(),
    };
    jvmtiError::NONE
}

unsafe extern "system" fn get_object_hash_code(env: *mut jvmtiEnv, object: jobject, hash_ptr: *mut jint) -> jvmtiError {
    let host = host(env);
    if object.is_null() {
        return jvmtiError::INVALID_OBJECT;
    }
    *hash_ptr = match index_in(object, LOADER_BASE, host.config.classes.len()) {
        Some(i) => host.config.classes[i].loader_hash.unwrap_or(0),
        None => (object as usize & 0xffff) as jint,
    };
    jvmtiError::NONE
}

unsafe extern "system" fn get_method_name(
    env: *mut jvmtiEnv,
    method: jmethodID,
    name_ptr: *mut *mut c_char,
    sig_ptr: *mut *mut c_char,
    generic_ptr: *mut *mut c_char,
) -> jvmtiError {
    let host = host(env);
    let Some(i) = index_in(method, METHOD_BASE, host.config.methods.len()) else {
        return jvmtiError::INVALID_METHODID;
    };
    let (name, sig) = &host.config.methods[i];
    if !name_ptr.is_null() {
        *name_ptr = match name {
            Some(name) => host.alloc_string(name),
            None => ptr::null_mut(),
        };
    }
    if !sig_ptr.is_null() {
        *sig_ptr = match sig {
            Some(sig) => host.alloc_string(sig),
            None => ptr::null_mut(),
        };
    }
    if !generic_ptr.is_null() {
        *generic_ptr = ptr::null_mut();
    }
    jvmtiError::NONE
}

unsafe extern "system" fn get_all_threads(
    env: *mut jvmtiEnv,
    count_ptr: *mut jint,
    threads_ptr: *mut *mut jthread,
) -> jvmtiError {
    let host = host(env);
    let threads: Vec<jthread> = (0..host.config.threads.len()).map(|i| host.new_local(THREAD_BASE + i)).collect();
    *count_ptr = threads.len() as jint;
    *threads_ptr = host.alloc_array(&threads);
    jvmtiError::NONE
}

unsafe extern "system" fn get_thread_info(env: *mut jvmtiEnv, thread: jthread, info: *mut jvmtiThreadInfo) -> jvmtiError {
    let host = host(env);
    let Some(i) = index_in(thread, THREAD_BASE, host.config.threads.len()) else {
        return jvmtiError::INVALID_THREAD;
    };
    *info = jvmtiThreadInfo {
        name: host.alloc_string(&host.config.threads[i]),
        priority: jvmti::JVMTI_THREAD_NORM_PRIORITY,
        is_daemon: jni::JNI_FALSE,
        thread_group: host.new_local(GROUP_BASE + i),
        context_class_loader: host.new_local(CONTEXT_LOADER_BASE + i),
    };
    jvmtiError::NONE
}

unsafe extern "system" fn run_agent_thread(
    env: *mut jvmtiEnv,
    _thread: jthread,
    proc_: jvmtiStartFunction,
    arg: *const c_void,
    priority: jint,
) -> jvmtiError {
    let host = host(env);
    host.calls.borrow_mut().agent_threads.push(priority);
    // Runs inline; the body only logs.
    proc_(env, host.jni_env(), arg as *mut c_void);
    jvmtiError::NONE
}

unsafe extern "system" fn iterate_through_heap(
    env: *mut jvmtiEnv,
    heap_filter: jint,
    klass: jclass,
    callbacks: *const jvmtiHeapCallbacks,
    user_data: *const c_void,
) -> jvmtiError {
    let host = host(env);
    host.calls.borrow_mut().standard_heap_walks.push((heap_filter, klass as usize));
    if host.config.standard_heap != jvmtiError::NONE {
        return host.config.standard_heap;
    }
    if let Some(callback) = (*callbacks).heap_iteration_callback {
        host.walk(|class_tag, size, tag| callback(class_tag, size, tag, -1, user_data as *mut c_void));
    }
    jvmtiError::NONE
}

/// Stand-in for ART's `iterate_through_heap_ext`.
pub unsafe extern "system" fn fake_iterate_through_heap_ext(
    env: *mut jvmtiEnv,
    heap_filter: jint,
    klass: jclass,
    callbacks: *const jvmtiHeapCallbacksExt,
    user_data: *const c_void,
) -> jvmtiError {
    let host = host(env);
    host.calls.borrow_mut().extension_heap_walks.push((heap_filter, klass.is_null()));
    if let Some(callback) = (*callbacks).heap_iteration_callback {
        host.walk(|class_tag, size, tag| callback(class_tag, size, tag, -1, user_data as *mut c_void, 1));
    }
    jvmtiError::NONE
}

unsafe extern "system" fn get_extension_functions(
    env: *mut jvmtiEnv,
    count_ptr: *mut jint,
    extensions_ptr: *mut *mut jvmtiExtensionFunctionInfo,
) -> jvmtiError {
    let host = host(env);
    let infos: Vec<jvmtiExtensionFunctionInfo> = host
        .config
        .extensions
        .iter()
        .map(|ext| {
            let params: Vec<jvmtiParamInfo> = ext
                .params
                .iter()
                .map(|name| jvmtiParamInfo {
                    name: host.alloc_string(name),
                    kind: 0,
                    base_type: 0,
                    null_ok: 0 as jboolean,
                })
                .collect();
            jvmtiExtensionFunctionInfo {
                func: ext.func,
                id: host.alloc_string(&ext.id),
                short_description: host.alloc_string(&ext.description),
                param_count: params.len() as jint,
                params: if params.is_empty() { ptr::null_mut() } else { host.alloc_array(&params) },
                error_count: ext.errors.len() as jint,
                errors: if ext.errors.is_empty() { ptr::null_mut() } else { host.alloc_array(&ext.errors) },
            }
        })
        .collect();
    *count_ptr = infos.len() as jint;
    *extensions_ptr = host.alloc_array(&infos);
    jvmtiError::NONE
}

unsafe extern "system" fn add_to_bootstrap_class_loader_search(env: *mut jvmtiEnv, segment: *const c_char) -> jvmtiError {
    let host = host(env);
    let segment = CStr::from_ptr(segment).to_string_lossy().into_owned();
    host.calls.borrow_mut().bootstrap_segments.push(segment);
    host.config.bootstrap_status
}

// =============================================================================
// JNI
// =============================================================================

fn jni_table() -> JNINativeInterface_ {
    let mut table = JNINativeInterface_::default();
    table.FindClass = Some(find_class);
    table.ExceptionDescribe = Some(exception_describe);
    table.ExceptionClear = Some(exception_clear);
    table.DeleteLocalRef = Some(delete_local_ref);
    table.NewObjectA = Some(new_object_a);
    table.GetMethodID = Some(get_method_id);
    table.GetStaticMethodID = Some(get_method_id);
    table.CallStaticVoidMethodA = Some(call_static_void_method_a);
    table.ExceptionCheck = Some(exception_check);
    table
}

unsafe extern "system" fn find_class(env: *mut JNIEnv, name: *const c_char) -> jclass {
    let host = jni_host(env);
    let name = CStr::from_ptr(name).to_string_lossy();
    match host.config.jni_classes.iter().position(|c| *c == name) {
        Some(i) => host.new_local(JNI_CLASS_BASE + i),
        None => {
            host.pending_exception.set(true);
            ptr::null_mut()
        }
    }
}

unsafe extern "system" fn get_method_id(
    env: *mut JNIEnv,
    _clazz: jclass,
    name: *const c_char,
    _sig: *const c_char,
) -> jmethodID {
    let host = jni_host(env);
    let name = CStr::from_ptr(name).to_string_lossy();
    if host.config.missing_methods.iter().any(|m| *m == name) {
        host.pending_exception.set(true);
        return ptr::null_mut();
    }
    handle(JNI_METHOD)
}

unsafe extern "system" fn new_object_a(
    env: *mut JNIEnv,
    _clazz: jclass,
    _ctor: jmethodID,
    _args: *const jvalue,
) -> jobject {
    let host = jni_host(env);
    let id = host.next_object.get();
    host.next_object.set(id + 1);
    host.new_local(OBJECT_BASE + id)
}

unsafe extern "system" fn call_static_void_method_a(
    env: *mut JNIEnv,
    _clazz: jclass,
    _method: jmethodID,
    _args: *const jvalue,
) {
    let host = jni_host(env);
    host.calls.borrow_mut().static_calls += 1;
    if host.config.init_throws {
        host.pending_exception.set(true);
    }
}

unsafe extern "system" fn exception_check(env: *mut JNIEnv) -> jboolean {
    jni_host(env).pending_exception.get() as jboolean
}

unsafe extern "system" fn exception_describe(env: *mut JNIEnv) {
    jni_host(env).calls.borrow_mut().described_exceptions += 1;
}

unsafe extern "system" fn exception_clear(env: *mut JNIEnv) {
    jni_host(env).pending_exception.set(false);
}

unsafe extern "system" fn delete_local_ref(env: *mut JNIEnv, obj: jobject) {
    jni_host(env).delete_local(obj);
}

// =============================================================================
// JavaVM
// =============================================================================

fn vm_table() -> JNIInvokeInterface_ {
    JNIInvokeInterface_ {
        GetEnv: Some(get_env),
        AttachCurrentThread: Some(attach_current_thread),
        ..Default::default()
    }
}

unsafe extern "system" fn get_env(vm: *mut JavaVM, penv: *mut *mut c_void, version: jint) -> jint {
    let host = vm_host(vm);
    match version {
        jvmti::JVMTI_VERSION_1_2 => {
            if host.config.jvmti_get_env == jni::JNI_OK {
                *penv = host.jvmti_env() as *mut c_void;
            }
            host.config.jvmti_get_env
        }
        jni::JNI_VERSION_1_6 => {
            let status = if host.calls.borrow().attached { jni::JNI_OK } else { host.config.jni_get_env };
            if status == jni::JNI_OK {
                *penv = host.jni_env() as *mut c_void;
            }
            status
        }
        _ => jni::JNI_EVERSION,
    }
}

unsafe extern "system" fn attach_current_thread(vm: *mut JavaVM, penv: *mut *mut c_void, _args: *mut c_void) -> jint {
    let host = vm_host(vm);
    if host.config.attach_status == jni::JNI_OK {
        *penv = host.jni_env() as *mut c_void;
        host.calls.borrow_mut().attached = true;
    }
    host.config.attach_status
}

// =============================================================================
// Log capture
// =============================================================================

/// In-memory sink for a scoped `tracing` subscriber.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

pub struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

impl io::Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = CaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        CaptureWriter(self.0.clone())
    }
}

impl LogCapture {
    pub fn lines(&self) -> Vec<String> {
        let bytes = self.0.lock().unwrap();
        String::from_utf8_lossy(&bytes).lines().map(str::to_string).collect()
    }
}

/// Runs `f` with every record on this thread captured.
pub fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, Vec<String>) {
    let capture = LogCapture::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(capture.clone())
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .without_time()
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, capture.lines())
}

/// Lines containing `needle`.
pub fn count(lines: &[String], needle: &str) -> usize {
    lines.iter().filter(|l| l.contains(needle)).count()
}
