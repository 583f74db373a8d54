// pcall-agent/src/sys/jni.rs
//
// JNI (Java Native Interface) bindings used by the agent.
//
// Only the vtable slots the agent calls are typed; every other slot is kept as
// an opaque pointer so the struct layout still matches jni.h exactly. Slot
// numbers below are zero-based indices into JNINativeInterface_.
//
// Typed slots are `Option<fn>` so a partially populated table (as produced by
// the test host) is representable; `None` has the same ABI as a null pointer.

#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]

use std::ffi::c_void;
use std::os::raw::c_char;

// =============================================================================
// Primitive Types
// =============================================================================

pub type jint = i32;
pub type jlong = i64;
pub type jbyte = i8;
pub type jboolean = u8;
pub type jchar = u16;
pub type jshort = i16;
pub type jfloat = f32;
pub type jdouble = f64;
pub type jsize = jint;

// =============================================================================
// Reference Types (opaque pointers)
// =============================================================================

pub type jobject = *mut c_void;
pub type jclass = jobject;
pub type jstring = jobject;
pub type jthread = jobject;
pub type jthrowable = jobject;

pub type jmethodID = *mut c_void;
pub type jfieldID = *mut c_void;

#[repr(C)]
#[derive(Copy, Clone)]
pub union jvalue {
    pub z: jboolean,
    pub b: jbyte,
    pub c: jchar,
    pub s: jshort,
    pub i: jint,
    pub j: jlong,
    pub f: jfloat,
    pub d: jdouble,
    pub l: jobject,
}

// =============================================================================
// Constants
// =============================================================================

pub const JNI_OK: jint = 0;
pub const JNI_ERR: jint = -1;
pub const JNI_EDETACHED: jint = -2;
pub const JNI_EVERSION: jint = -3;
pub const JNI_ENOMEM: jint = -4;

pub const JNI_TRUE: jboolean = 1;
pub const JNI_FALSE: jboolean = 0;

// ART only goes up to 1.6 for GetEnv.
pub const JNI_VERSION_1_6: jint = 0x00010006;

// =============================================================================
// JNINativeInterface_ - the JNIEnv function table
// =============================================================================

pub type FindClassFn = unsafe extern "system" fn(env: *mut JNIEnv, name: *const c_char) -> jclass;
pub type ExceptionDescribeFn = unsafe extern "system" fn(env: *mut JNIEnv);
pub type ExceptionClearFn = unsafe extern "system" fn(env: *mut JNIEnv);
pub type DeleteLocalRefFn = unsafe extern "system" fn(env: *mut JNIEnv, obj: jobject);
pub type NewObjectAFn = unsafe extern "system" fn(
    env: *mut JNIEnv,
    clazz: jclass,
    method_id: jmethodID,
    args: *const jvalue,
) -> jobject;
pub type GetMethodIDFn = unsafe extern "system" fn(
    env: *mut JNIEnv,
    clazz: jclass,
    name: *const c_char,
    sig: *const c_char,
) -> jmethodID;
pub type CallStaticVoidMethodAFn = unsafe extern "system" fn(
    env: *mut JNIEnv,
    clazz: jclass,
    method_id: jmethodID,
    args: *const jvalue,
);
pub type ExceptionCheckFn = unsafe extern "system" fn(env: *mut JNIEnv) -> jboolean;

#[repr(C)]
pub struct JNINativeInterface_ {
    //   0-3: reserved
    pub reserved: [*mut c_void; 4],
    //   4-5: GetVersion, DefineClass
    _slots_4_5: [*mut c_void; 2],
    //   6: FindClass
    pub FindClass: Option<FindClassFn>,
    //   7-15: reflection, superclass, Throw*, ExceptionOccurred
    _slots_7_15: [*mut c_void; 9],
    //  16: ExceptionDescribe
    pub ExceptionDescribe: Option<ExceptionDescribeFn>,
    //  17: ExceptionClear
    pub ExceptionClear: Option<ExceptionClearFn>,
    //  18-22: FatalError, local frames, global refs
    _slots_18_22: [*mut c_void; 5],
    //  23: DeleteLocalRef
    pub DeleteLocalRef: Option<DeleteLocalRefFn>,
    //  24-29: IsSameObject .. NewObjectV
    _slots_24_29: [*mut c_void; 6],
    //  30: NewObjectA
    pub NewObjectA: Option<NewObjectAFn>,
    //  31-32: GetObjectClass, IsInstanceOf
    _slots_31_32: [*mut c_void; 2],
    //  33: GetMethodID
    pub GetMethodID: Option<GetMethodIDFn>,
    //  34-112: Call<Type>Method*, CallNonvirtual*, instance fields
    _slots_34_112: [*mut c_void; 79],
    // 113: GetStaticMethodID
    pub GetStaticMethodID: Option<GetMethodIDFn>,
    // 114-142: CallStatic<Type>Method* up to CallStaticVoidMethodV
    _slots_114_142: [*mut c_void; 29],
    // 143: CallStaticVoidMethodA
    pub CallStaticVoidMethodA: Option<CallStaticVoidMethodAFn>,
    // 144-227: static fields, strings, arrays, natives, monitors, ...
    _slots_144_227: [*mut c_void; 84],
    // 228: ExceptionCheck (JNI 1.2)
    pub ExceptionCheck: Option<ExceptionCheckFn>,
    // 229-235: direct buffers, ref types, modules, virtual threads
    _slots_229_235: [*mut c_void; 7],
}

impl Default for JNINativeInterface_ {
    fn default() -> Self {
        // All-null is a valid value for every slot.
        unsafe { std::mem::zeroed() }
    }
}

/// In C, `JNIEnv` is the vtable pointer itself:
/// `typedef const struct JNINativeInterface_ *JNIEnv;`
pub type JNIEnv = *const JNINativeInterface_;

// =============================================================================
// JNIInvokeInterface_ - the JavaVM function table
// =============================================================================

pub type AttachCurrentThreadFn =
    unsafe extern "system" fn(vm: *mut JavaVM, penv: *mut *mut c_void, args: *mut c_void) -> jint;
pub type GetEnvFn =
    unsafe extern "system" fn(vm: *mut JavaVM, penv: *mut *mut c_void, version: jint) -> jint;
pub type DestroyJavaVMFn = unsafe extern "system" fn(vm: *mut JavaVM) -> jint;

#[repr(C)]
#[derive(Default)]
pub struct JNIInvokeInterface_ {
    pub reserved0: Option<unsafe extern "system" fn()>,
    pub reserved1: Option<unsafe extern "system" fn()>,
    pub reserved2: Option<unsafe extern "system" fn()>,

    pub DestroyJavaVM: Option<DestroyJavaVMFn>,
    pub AttachCurrentThread: Option<AttachCurrentThreadFn>,
    pub DetachCurrentThread: Option<DestroyJavaVMFn>,
    pub GetEnv: Option<GetEnvFn>,
    pub AttachCurrentThreadAsDaemon: Option<AttachCurrentThreadFn>,
}

/// `typedef const struct JNIInvokeInterface_ *JavaVM;`
pub type JavaVM = *const JNIInvokeInterface_;
