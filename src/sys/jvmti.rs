// pcall-agent/src/sys/jvmti.rs
//
// JVMTI (JVM Tool Interface) bindings used by the agent.
//
// Layouts follow jvmti.h (JVMTI 1.2 and later). As with the JNI table, only
// the function slots the agent calls are typed; the rest are opaque so the
// offsets stay correct. Slot numbers in comments are the 1-based positions
// used by the JVMTI specification.

#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]

use crate::sys::jni::{jboolean, jclass, jint, jlong, jmethodID, jobject, jthread, JNIEnv};
use std::os::raw::{c_char, c_uchar, c_void};

// --- Versions ---
pub const JVMTI_VERSION_1_2: jint = 0x30010200;

// --- Events ---
pub const JVMTI_EVENT_CLASS_FILE_LOAD_HOOK: u32 = 54;
pub const JVMTI_EVENT_CLASS_LOAD: u32 = 55;
pub const JVMTI_EVENT_CLASS_PREPARE: u32 = 56;
pub const JVMTI_EVENT_SINGLE_STEP: u32 = 60;
pub const JVMTI_EVENT_METHOD_ENTRY: u32 = 65;
pub const JVMTI_EVENT_METHOD_EXIT: u32 = 66;
pub const JVMTI_EVENT_VM_OBJECT_ALLOC: u32 = 84;

pub const JVMTI_ENABLE: jint = 1;
pub const JVMTI_DISABLE: jint = 0;

// --- Threads ---
pub const JVMTI_THREAD_MIN_PRIORITY: jint = 1;
pub const JVMTI_THREAD_NORM_PRIORITY: jint = 5;
pub const JVMTI_THREAD_MAX_PRIORITY: jint = 10;

// --- Heap visit control ---
pub const JVMTI_VISIT_OBJECTS: jint = 0x100;
pub const JVMTI_VISIT_ABORT: jint = 0x8000;

// --- Error Codes ---

/// A raw `jvmtiError`.
///
/// Kept as a transparent integer rather than a Rust enum: the host may hand
/// back any code, including vendor-specific ones.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct jvmtiError(pub u32);

impl jvmtiError {
    pub const NONE: jvmtiError = jvmtiError(0);
    pub const INVALID_THREAD: jvmtiError = jvmtiError(10);
    pub const THREAD_NOT_ALIVE: jvmtiError = jvmtiError(15);
    pub const INVALID_OBJECT: jvmtiError = jvmtiError(20);
    pub const INVALID_CLASS: jvmtiError = jvmtiError(21);
    pub const INVALID_METHODID: jvmtiError = jvmtiError(23);
    pub const NOT_AVAILABLE: jvmtiError = jvmtiError(98);
    pub const MUST_POSSESS_CAPABILITY: jvmtiError = jvmtiError(99);
    pub const NULL_POINTER: jvmtiError = jvmtiError(100);
    pub const ABSENT_INFORMATION: jvmtiError = jvmtiError(101);
    pub const INVALID_EVENT_TYPE: jvmtiError = jvmtiError(102);
    pub const ILLEGAL_ARGUMENT: jvmtiError = jvmtiError(103);
    pub const OUT_OF_MEMORY: jvmtiError = jvmtiError(110);
    pub const ACCESS_DENIED: jvmtiError = jvmtiError(111);
    pub const WRONG_PHASE: jvmtiError = jvmtiError(112);
    pub const INTERNAL: jvmtiError = jvmtiError(113);
    pub const UNATTACHED_THREAD: jvmtiError = jvmtiError(115);
    pub const INVALID_ENVIRONMENT: jvmtiError = jvmtiError(116);

    pub fn code(self) -> u32 {
        self.0
    }
}

// --- Capabilities ---

/// The 128-bit `jvmtiCapabilities` bitfield.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct jvmtiCapabilities {
    bits: [u32; 4],
}

impl jvmtiCapabilities {
    pub const fn from_words(bits: [u32; 4]) -> Self {
        Self { bits }
    }

    pub fn words(&self) -> [u32; 4] {
        self.bits
    }

    /// Number of capabilities set.
    pub fn count(&self) -> u32 {
        self.bits.iter().map(|w| w.count_ones()).sum()
    }

    // [0]
    pub fn can_tag_objects(&self) -> bool {
        self.bits[0] & 1 != 0
    }
}

// --- Structures ---

#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct jvmtiThreadInfo {
    pub name: *mut c_char,
    pub priority: jint,
    pub is_daemon: jboolean,
    pub thread_group: jobject,
    pub context_class_loader: jobject,
}

impl Default for jvmtiThreadInfo {
    fn default() -> Self {
        Self {
            name: std::ptr::null_mut(),
            priority: 0,
            is_daemon: 0,
            thread_group: std::ptr::null_mut(),
            context_class_loader: std::ptr::null_mut(),
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct jvmtiParamInfo {
    pub name: *mut c_char,
    pub kind: jint,
    pub base_type: jint,
    pub null_ok: jboolean,
}

#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct jvmtiExtensionFunctionInfo {
    pub func: *mut c_void,
    pub id: *mut c_char,
    pub short_description: *mut c_char,
    pub param_count: jint,
    pub params: *mut jvmtiParamInfo,
    pub error_count: jint,
    pub errors: *mut jvmtiError,
}

/// Agent thread entry point passed to `RunAgentThread`.
pub type jvmtiStartFunction =
    unsafe extern "system" fn(jvmti_env: *mut jvmtiEnv, jni_env: *mut JNIEnv, arg: *mut c_void);

/// Placeholder type for callback slots the agent never fills.
pub type jvmtiReservedCallback = unsafe extern "system" fn();

// --- Heap iteration ---

pub type jvmtiHeapIterationCallback = unsafe extern "system" fn(
    class_tag: jlong,
    size: jlong,
    tag_ptr: *mut jlong,
    length: jint,
    user_data: *mut c_void,
) -> jint;

/// ART's `iterate_through_heap_ext` callback: the standard one plus a heap id.
pub type jvmtiHeapIterationCallbackExt = unsafe extern "system" fn(
    class_tag: jlong,
    size: jlong,
    tag_ptr: *mut jlong,
    length: jint,
    user_data: *mut c_void,
    heap_id: jint,
) -> jint;

#[repr(C)]
#[derive(Copy, Clone, Debug, Default)]
pub struct jvmtiHeapCallbacks {
    pub heap_iteration_callback: Option<jvmtiHeapIterationCallback>,
    pub heap_reference_callback: Option<jvmtiReservedCallback>,
    pub primitive_field_callback: Option<jvmtiReservedCallback>,
    pub array_primitive_value_callback: Option<jvmtiReservedCallback>,
    pub string_primitive_value_callback: Option<jvmtiReservedCallback>,
    pub reserved: [Option<jvmtiReservedCallback>; 11],
}

/// Same layout as [`jvmtiHeapCallbacks`], with the extension's iteration callback.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default)]
pub struct jvmtiHeapCallbacksExt {
    pub heap_iteration_callback: Option<jvmtiHeapIterationCallbackExt>,
    pub heap_reference_callback: Option<jvmtiReservedCallback>,
    pub primitive_field_callback: Option<jvmtiReservedCallback>,
    pub array_primitive_value_callback: Option<jvmtiReservedCallback>,
    pub string_primitive_value_callback: Option<jvmtiReservedCallback>,
    pub reserved: [Option<jvmtiReservedCallback>; 11],
}

// =========================================================================
// FUNCTION TYPEDEFS: INTERFACE
// =========================================================================

// Variadic in jvmti.h; no extra arguments are ever passed, so the fixed prototype is call-compatible.
pub type JvmtiSetEventNotificationModeFn = unsafe extern "system" fn(env: *mut jvmtiEnv, mode: jint, event_type: u32, event_thread: jthread) -> jvmtiError;
pub type JvmtiGetAllThreadsFn = unsafe extern "system" fn(env: *mut jvmtiEnv, threads_count_ptr: *mut jint, threads_ptr: *mut *mut jthread) -> jvmtiError;
pub type JvmtiGetThreadInfoFn = unsafe extern "system" fn(env: *mut jvmtiEnv, thread: jthread, info_ptr: *mut jvmtiThreadInfo) -> jvmtiError;
pub type JvmtiRunAgentThreadFn = unsafe extern "system" fn(env: *mut jvmtiEnv, thread: jthread, proc_: jvmtiStartFunction, arg: *const c_void, priority: jint) -> jvmtiError;
pub type JvmtiDeallocateFn = unsafe extern "system" fn(env: *mut jvmtiEnv, mem: *mut c_uchar) -> jvmtiError;
pub type JvmtiGetClassSignatureFn = unsafe extern "system" fn(env: *mut jvmtiEnv, klass: jclass, signature_ptr: *mut *mut c_char, generic_ptr: *mut *mut c_char) -> jvmtiError;
pub type JvmtiGetClassLoaderFn = unsafe extern "system" fn(env: *mut jvmtiEnv, klass: jclass, classloader_ptr: *mut jobject) -> jvmtiError;
pub type JvmtiGetObjectHashCodeFn = unsafe extern "system" fn(env: *mut jvmtiEnv, object: jobject, hash_code_ptr: *mut jint) -> jvmtiError;
pub type JvmtiGetMethodNameFn = unsafe extern "system" fn(env: *mut jvmtiEnv, method: jmethodID, name_ptr: *mut *mut c_char, signature_ptr: *mut *mut c_char, generic_ptr: *mut *mut c_char) -> jvmtiError;
pub type JvmtiGetLoadedClassesFn = unsafe extern "system" fn(env: *mut jvmtiEnv, class_count_ptr: *mut jint, classes_ptr: *mut *mut jclass) -> jvmtiError;
pub type JvmtiIterateThroughHeapFn = unsafe extern "system" fn(env: *mut jvmtiEnv, heap_filter: jint, klass: jclass, callbacks: *const jvmtiHeapCallbacks, user_data: *const c_void) -> jvmtiError;
pub type JvmtiSetEventCallbacksFn = unsafe extern "system" fn(env: *mut jvmtiEnv, callbacks: *const jvmtiEventCallbacks, size_of_callbacks: jint) -> jvmtiError;
pub type JvmtiGetExtensionFunctionsFn = unsafe extern "system" fn(env: *mut jvmtiEnv, extension_count_ptr: *mut jint, extensions: *mut *mut jvmtiExtensionFunctionInfo) -> jvmtiError;
pub type JvmtiGetErrorNameFn = unsafe extern "system" fn(env: *mut jvmtiEnv, error: jvmtiError, name_ptr: *mut *mut c_char) -> jvmtiError;
pub type JvmtiGetPotentialCapabilitiesFn = unsafe extern "system" fn(env: *mut jvmtiEnv, capabilities_ptr: *mut jvmtiCapabilities) -> jvmtiError;
pub type JvmtiAddCapabilitiesFn = unsafe extern "system" fn(env: *mut jvmtiEnv, capabilities_ptr: *const jvmtiCapabilities) -> jvmtiError;
pub type JvmtiAddToBootstrapClassLoaderSearchFn = unsafe extern "system" fn(env: *mut jvmtiEnv, segment: *const c_char) -> jvmtiError;

/// ART's `com.android.art.heap.iterate_through_heap_ext`.
///
/// Same shape as `IterateThroughHeap`; the difference is the callback struct,
/// whose iteration callback also receives the heap id.
pub type IterateThroughHeapExt = unsafe extern "system" fn(
    env: *mut jvmtiEnv,
    heap_filter: jint,
    klass: jclass,
    callbacks: *const jvmtiHeapCallbacksExt,
    user_data: *const c_void,
) -> jvmtiError;

#[repr(C)]
pub struct jvmtiInterface_1_ {
    /*   1: RESERVED */
    pub reserved1: *mut c_void,
    /*   2: Set Event Notification Mode */
    pub SetEventNotificationMode: Option<JvmtiSetEventNotificationModeFn>,
    /*   3: Get All Modules */
    _slot_3: [*mut c_void; 1],
    /*   4: Get All Threads */
    pub GetAllThreads: Option<JvmtiGetAllThreadsFn>,
    /*   5-8: Suspend / Resume / Stop / Interrupt Thread */
    _slots_5_8: [*mut c_void; 4],
    /*   9: Get Thread Info */
    pub GetThreadInfo: Option<JvmtiGetThreadInfoFn>,
    /*  10-11: Owned / Contended Monitor Info */
    _slots_10_11: [*mut c_void; 2],
    /*  12: Run Agent Thread */
    pub RunAgentThread: Option<JvmtiRunAgentThreadFn>,
    /*  13-46: thread groups, frames, locals, raw monitors, breakpoints, watches, Allocate */
    _slots_13_46: [*mut c_void; 34],
    /*  47: Deallocate */
    pub Deallocate: Option<JvmtiDeallocateFn>,
    /*  48: Get Class Signature */
    pub GetClassSignature: Option<JvmtiGetClassSignatureFn>,
    /*  49-56: class status .. Is Array Class */
    _slots_49_56: [*mut c_void; 8],
    /*  57: Get Class Loader */
    pub GetClassLoader: Option<JvmtiGetClassLoaderFn>,
    /*  58: Get Object Hash Code */
    pub GetObjectHashCode: Option<JvmtiGetObjectHashCodeFn>,
    /*  59-63: monitor usage, fields */
    _slots_59_63: [*mut c_void; 5],
    /*  64: Get Method Name (and Signature) */
    pub GetMethodName: Option<JvmtiGetMethodNameFn>,
    /*  65-77: method details */
    _slots_65_77: [*mut c_void; 13],
    /*  78: Get Loaded Classes */
    pub GetLoadedClasses: Option<JvmtiGetLoadedClassesFn>,
    /*  79-115: class loader classes .. Follow References */
    _slots_79_115: [*mut c_void; 37],
    /* 116: Iterate Through Heap */
    pub IterateThroughHeap: Option<JvmtiIterateThroughHeapFn>,
    /* 117-121: reserved, virtual threads, JNI function table */
    _slots_117_121: [*mut c_void; 5],
    /* 122: Set Event Callbacks */
    pub SetEventCallbacks: Option<JvmtiSetEventCallbacksFn>,
    /* 123: Generate Events */
    _slot_123: [*mut c_void; 1],
    /* 124: Get Extension Functions */
    pub GetExtensionFunctions: Option<JvmtiGetExtensionFunctionsFn>,
    /* 125-127: extension events, Dispose Environment */
    _slots_125_127: [*mut c_void; 3],
    /* 128: Get Error Name */
    pub GetErrorName: Option<JvmtiGetErrorNameFn>,
    /* 129-139: locations, properties, phase, timers */
    _slots_129_139: [*mut c_void; 11],
    /* 140: Get Potential Capabilities */
    pub GetPotentialCapabilities: Option<JvmtiGetPotentialCapabilitiesFn>,
    /* 141: RESERVED */
    _slot_141: [*mut c_void; 1],
    /* 142: Add Capabilities */
    pub AddCapabilities: Option<JvmtiAddCapabilitiesFn>,
    /* 143-148: relinquish, processors, class versions, constant pool, env storage */
    _slots_143_148: [*mut c_void; 6],
    /* 149: Add To Bootstrap Class Loader Search */
    pub AddToBootstrapClassLoaderSearch: Option<JvmtiAddToBootstrapClassLoaderSearchFn>,
    /* 150-156: verbose flag .. Set Heap Sampling Interval */
    _slots_150_156: [*mut c_void; 7],
}

impl Default for jvmtiInterface_1_ {
    fn default() -> Self {
        // All-null is a valid value for every slot.
        unsafe { std::mem::zeroed() }
    }
}

#[repr(C)]
pub struct jvmtiEnv {
    pub functions: *const jvmtiInterface_1_,
}

// =========================================================================
// FUNCTION TYPEDEFS: EVENT CALLBACKS
// =========================================================================

pub type JvmtiClassFileLoadHookFn = unsafe extern "system" fn(
    jvmti_env: *mut jvmtiEnv,
    jni_env: *mut JNIEnv,
    class_being_redefined: jclass,
    loader: jobject,
    name: *const c_char,
    protection_domain: jobject,
    class_data_len: jint,
    class_data: *const c_uchar,
    new_class_data_len: *mut jint,
    new_class_data: *mut *mut c_uchar,
);

pub type JvmtiClassLoadFn = unsafe extern "system" fn(
    jvmti_env: *mut jvmtiEnv,
    jni_env: *mut JNIEnv,
    thread: jthread,
    klass: jclass,
);

pub type JvmtiClassPrepareFn = JvmtiClassLoadFn;

pub type JvmtiSingleStepFn = unsafe extern "system" fn(
    jvmti_env: *mut jvmtiEnv,
    jni_env: *mut JNIEnv,
    thread: jthread,
    method: jmethodID,
    location: jlocation,
);

pub type JvmtiMethodEntryFn = unsafe extern "system" fn(
    jvmti_env: *mut jvmtiEnv,
    jni_env: *mut JNIEnv,
    thread: jthread,
    method: jmethodID,
);

pub type JvmtiMethodExitFn = unsafe extern "system" fn(
    jvmti_env: *mut jvmtiEnv,
    jni_env: *mut JNIEnv,
    thread: jthread,
    method: jmethodID,
    was_popped_by_exception: jboolean,
    return_value: crate::sys::jni::jvalue,
);

pub type JvmtiVMObjectAllocFn = unsafe extern "system" fn(
    jvmti_env: *mut jvmtiEnv,
    jni_env: *mut JNIEnv,
    thread: jthread,
    object: jobject,
    object_klass: jclass,
    size: jlong,
);

pub type jlocation = jlong;

/// `jvmtiEventCallbacks`, slot for slot with jvmti.h (events 50-86).
#[repr(C)]
#[derive(Copy, Clone, Default, Debug)]
pub struct jvmtiEventCallbacks {
    pub VMInit: Option<jvmtiReservedCallback>,
    pub VMDeath: Option<jvmtiReservedCallback>,
    pub ThreadStart: Option<jvmtiReservedCallback>,
    pub ThreadEnd: Option<jvmtiReservedCallback>,
    pub ClassFileLoadHook: Option<JvmtiClassFileLoadHookFn>,
    pub ClassLoad: Option<JvmtiClassLoadFn>,
    pub ClassPrepare: Option<JvmtiClassPrepareFn>,
    pub VMStart: Option<jvmtiReservedCallback>,
    pub Exception: Option<jvmtiReservedCallback>,
    pub ExceptionCatch: Option<jvmtiReservedCallback>,
    pub SingleStep: Option<JvmtiSingleStepFn>,
    pub FramePop: Option<jvmtiReservedCallback>,
    pub Breakpoint: Option<jvmtiReservedCallback>,
    pub FieldAccess: Option<jvmtiReservedCallback>,
    pub FieldModification: Option<jvmtiReservedCallback>,
    pub MethodEntry: Option<JvmtiMethodEntryFn>,
    pub MethodExit: Option<JvmtiMethodExitFn>,
    pub NativeMethodBind: Option<jvmtiReservedCallback>,
    pub CompiledMethodLoad: Option<jvmtiReservedCallback>,
    pub CompiledMethodUnload: Option<jvmtiReservedCallback>,
    pub DynamicCodeGenerated: Option<jvmtiReservedCallback>,
    pub DataDumpRequest: Option<jvmtiReservedCallback>,
    pub reserved72: Option<jvmtiReservedCallback>,
    pub MonitorWait: Option<jvmtiReservedCallback>,
    pub MonitorWaited: Option<jvmtiReservedCallback>,
    pub MonitorContendedEnter: Option<jvmtiReservedCallback>,
    pub MonitorContendedEntered: Option<jvmtiReservedCallback>,
    pub reserved77: Option<jvmtiReservedCallback>,
    pub reserved78: Option<jvmtiReservedCallback>,
    pub reserved79: Option<jvmtiReservedCallback>,
    pub ResourceExhausted: Option<jvmtiReservedCallback>,
    pub GarbageCollectionStart: Option<jvmtiReservedCallback>,
    pub GarbageCollectionFinish: Option<jvmtiReservedCallback>,
    pub ObjectFree: Option<jvmtiReservedCallback>,
    pub VMObjectAlloc: Option<JvmtiVMObjectAllocFn>,
    pub reserved85: Option<jvmtiReservedCallback>,
    pub SampledObjectAlloc: Option<jvmtiReservedCallback>,
}
