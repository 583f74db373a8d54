//! Event hooks: the callback table, per-kind notification state, and the
//! handlers themselves.
//!
//! Every host callback goes through a stateless trampoline that turns its raw
//! arguments into an [`Event`] and hands it to [`handle_event`]. Handlers only
//! read metadata from the host and log one line; all host buffers they obtain
//! are scoped guards.

use std::borrow::Cow;
use std::ffi::CStr;
use std::os::raw::{c_char, c_uchar};
use std::ptr;

use crate::jvmti_wrapper::{Jvmti, JvmtiString};
use crate::loge;
use crate::sys::jni;
use crate::sys::jvmti::{self, jvmtiEnv};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    ClassLoad,
    ClassPrepare,
    ClassFileLoadHook,
    MethodEntry,
    MethodExit,
    SingleStep,
    VmObjectAlloc,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        EventKind::ClassLoad,
        EventKind::ClassPrepare,
        EventKind::ClassFileLoadHook,
        EventKind::MethodEntry,
        EventKind::MethodExit,
        EventKind::SingleStep,
        EventKind::VmObjectAlloc,
    ];

    /// The event number from jvmti.h.
    pub fn raw(self) -> u32 {
        match self {
            EventKind::ClassLoad => jvmti::JVMTI_EVENT_CLASS_LOAD,
            EventKind::ClassPrepare => jvmti::JVMTI_EVENT_CLASS_PREPARE,
            EventKind::ClassFileLoadHook => jvmti::JVMTI_EVENT_CLASS_FILE_LOAD_HOOK,
            EventKind::MethodEntry => jvmti::JVMTI_EVENT_METHOD_ENTRY,
            EventKind::MethodExit => jvmti::JVMTI_EVENT_METHOD_EXIT,
            EventKind::SingleStep => jvmti::JVMTI_EVENT_SINGLE_STEP,
            EventKind::VmObjectAlloc => jvmti::JVMTI_EVENT_VM_OBJECT_ALLOC,
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    fn bind(self, callbacks: &mut jvmti::jvmtiEventCallbacks) {
        match self {
            EventKind::ClassLoad => callbacks.ClassLoad = Some(trampoline_class_load),
            EventKind::ClassPrepare => callbacks.ClassPrepare = Some(trampoline_class_prepare),
            EventKind::ClassFileLoadHook => callbacks.ClassFileLoadHook = Some(trampoline_class_file_load_hook),
            EventKind::MethodEntry => callbacks.MethodEntry = Some(trampoline_method_entry),
            EventKind::MethodExit => callbacks.MethodExit = Some(trampoline_method_exit),
            EventKind::SingleStep => callbacks.SingleStep = Some(trampoline_single_step),
            EventKind::VmObjectAlloc => callbacks.VMObjectAlloc = Some(trampoline_vm_object_alloc),
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum EventMode {
    #[default]
    Disabled,
    Enabled,
}

impl EventMode {
    fn raw(self) -> jni::jint {
        match self {
            EventMode::Disabled => jvmti::JVMTI_DISABLE,
            EventMode::Enabled => jvmti::JVMTI_ENABLE,
        }
    }
}

/// One row of the declarative hook table.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Hook {
    pub kind: EventKind,
    pub mode: EventMode,
}

impl Hook {
    pub const fn enabled(kind: EventKind) -> Self {
        Hook { kind, mode: EventMode::Enabled }
    }

    pub const fn disabled(kind: EventKind) -> Self {
        Hook { kind, mode: EventMode::Disabled }
    }
}

/// Method exit and single step fire far too often to log; they are installed
/// but kept off.
pub const DEFAULT_HOOKS: &[Hook] = &[
    Hook::enabled(EventKind::ClassLoad),
    Hook::enabled(EventKind::MethodEntry),
    Hook::enabled(EventKind::VmObjectAlloc),
    Hook::enabled(EventKind::ClassFileLoadHook),
    Hook::enabled(EventKind::ClassPrepare),
    Hook::disabled(EventKind::MethodExit),
    Hook::disabled(EventKind::SingleStep),
];

/// Tracks which event kinds the agent has switched on.
#[derive(Debug, Default)]
pub struct EventHookRegistry {
    modes: [EventMode; EventKind::ALL.len()],
}

impl EventHookRegistry {
    /// Builds one callback table from `hooks` and installs it in a single call.
    /// Returns `true` on error.
    pub fn install_callbacks(&self, jvmti: &Jvmti, hooks: &[Hook]) -> bool {
        let mut callbacks = jvmti::jvmtiEventCallbacks::default();
        for hook in hooks {
            hook.kind.bind(&mut callbacks);
        }
        jvmti
            .check(jvmti.set_event_callbacks(&callbacks), "Failed to set event callbacks")
            .is_none()
    }

    /// Switches notification for `kind` on every thread. The tracked mode only
    /// changes if the host accepts. Returns `true` on error.
    pub fn set_mode(&mut self, jvmti: &Jvmti, mode: EventMode, kind: EventKind) -> bool {
        let result = jvmti.set_event_notification_mode(mode.raw(), kind.raw(), ptr::null_mut());
        let context = format!("Failed to set notification mode {:?} for {:?}", mode, kind);
        if jvmti.check(result, &context).is_none() {
            return true;
        }
        self.modes[kind.index()] = mode;
        false
    }

    pub fn mode(&self, kind: EventKind) -> EventMode {
        self.modes[kind.index()]
    }

    /// Installs `hooks` and then applies each hook's mode.
    pub fn apply(&mut self, jvmti: &Jvmti, hooks: &[Hook]) {
        self.install_callbacks(jvmti, hooks);
        for hook in hooks {
            self.set_mode(jvmti, hook.mode, hook.kind);
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// A host callback's arguments, minus the ones the handlers ignore.
#[derive(Debug, Copy, Clone)]
pub enum Event {
    ClassLoad { klass: jni::jclass },
    ClassPrepare { klass: jni::jclass },
    /// `name` belongs to the host and may be null.
    ClassFileLoad { name: *const c_char },
    MethodEntry { method: jni::jmethodID },
    MethodExit { method: jni::jmethodID },
    SingleStep { method: jni::jmethodID, location: jvmti::jlocation },
    VmObjectAlloc { object: jni::jobject, klass: jni::jclass, size: jni::jlong },
}

/// Logs one line for `event`. Null fields are left out of the line; if there
/// is nothing left to say, nothing is logged.
pub fn handle_event(jvmti: &Jvmti, event: &Event) {
    match *event {
        Event::ClassLoad { klass } => {
            if let Some(sig) = class_signature(jvmti, klass) {
                loge!("OnClassLoad: {}", sig);
            }
        }
        Event::ClassPrepare { klass } => {
            if let Some(sig) = class_signature(jvmti, klass) {
                loge!("OnClassPrepare: {}", sig);
            }
        }
        Event::ClassFileLoad { name } => {
            if !name.is_null() {
                let name = unsafe { CStr::from_ptr(name) }.to_string_lossy();
                loge!("OnClassFileLoaded: {}", name);
            }
        }
        Event::MethodEntry { method } => {
            if let Some(text) = method_text(jvmti, method) {
                loge!("OnMethodEntry: {}", text);
            }
        }
        Event::MethodExit { method } => {
            if let Some(text) = method_text(jvmti, method) {
                loge!("OnMethodExit: {}", text);
            }
        }
        Event::SingleStep { method, location } => {
            if let Some(text) = method_text(jvmti, method) {
                loge!("OnSingleStep: {} {}", text, location);
            }
        }
        Event::VmObjectAlloc { object, klass, size } => {
            let Some(sig) = class_signature(jvmti, klass) else {
                return;
            };
            match jvmti.check(jvmti.get_object_hash_code(object), "Failed to get object hash code") {
                Some(hash) => loge!("OnVMObjectAlloc: {}@{} ({} bytes)", sig, hash, size),
                None => loge!("OnVMObjectAlloc: {} ({} bytes)", sig, size),
            }
        }
    }
}

fn class_signature(jvmti: &Jvmti, klass: jni::jclass) -> Option<JvmtiString<'_>> {
    jvmti
        .check(jvmti.get_class_signature(klass), "Failed to get class signature")
        .filter(|sig| !sig.is_null())
}

// `<name>, <signature>`; a field the host leaves null is left out.
fn method_text(jvmti: &Jvmti, method: jni::jmethodID) -> Option<String> {
    let (name, sig) = jvmti.check(jvmti.get_method_name(method), "Failed to get method name")?;
    let name: Option<Cow<'_, str>> = name.to_str_lossy();
    Some(match (name, sig.to_str_lossy()) {
        (Some(name), Some(sig)) => format!("{}, {}", name, sig),
        (Some(name), None) => name.into_owned(),
        (None, Some(sig)) => sig.into_owned(),
        (None, None) => String::new(),
    })
}

// =============================================================================
// Trampolines
// =============================================================================

unsafe extern "system" fn trampoline_class_load(
    jvmti_env: *mut jvmtiEnv,
    _jni: *mut jni::JNIEnv,
    _thread: jni::jthread,
    klass: jni::jclass,
) {
    handle_event(&Jvmti::from_raw(jvmti_env), &Event::ClassLoad { klass });
}

unsafe extern "system" fn trampoline_class_prepare(
    jvmti_env: *mut jvmtiEnv,
    _jni: *mut jni::JNIEnv,
    _thread: jni::jthread,
    klass: jni::jclass,
) {
    handle_event(&Jvmti::from_raw(jvmti_env), &Event::ClassPrepare { klass });
}

#[allow(clippy::too_many_arguments)]
unsafe extern "system" fn trampoline_class_file_load_hook(
    jvmti_env: *mut jvmtiEnv,
    _jni: *mut jni::JNIEnv,
    _class_being_redefined: jni::jclass,
    _loader: jni::jobject,
    name: *const c_char,
    _protection_domain: jni::jobject,
    _class_data_len: jni::jint,
    _class_data: *const c_uchar,
    _new_class_data_len: *mut jni::jint,
    _new_class_data: *mut *mut c_uchar,
) {
    handle_event(&Jvmti::from_raw(jvmti_env), &Event::ClassFileLoad { name });
}

unsafe extern "system" fn trampoline_method_entry(
    jvmti_env: *mut jvmtiEnv,
    _jni: *mut jni::JNIEnv,
    _thread: jni::jthread,
    method: jni::jmethodID,
) {
    handle_event(&Jvmti::from_raw(jvmti_env), &Event::MethodEntry { method });
}

unsafe extern "system" fn trampoline_method_exit(
    jvmti_env: *mut jvmtiEnv,
    _jni: *mut jni::JNIEnv,
    _thread: jni::jthread,
    method: jni::jmethodID,
    _was_popped: jni::jboolean,
    _ret_val: jni::jvalue,
) {
    handle_event(&Jvmti::from_raw(jvmti_env), &Event::MethodExit { method });
}

unsafe extern "system" fn trampoline_single_step(
    jvmti_env: *mut jvmtiEnv,
    _jni: *mut jni::JNIEnv,
    _thread: jni::jthread,
    method: jni::jmethodID,
    location: jvmti::jlocation,
) {
    handle_event(&Jvmti::from_raw(jvmti_env), &Event::SingleStep { method, location });
}

unsafe extern "system" fn trampoline_vm_object_alloc(
    jvmti_env: *mut jvmtiEnv,
    _jni: *mut jni::JNIEnv,
    _thread: jni::jthread,
    object: jni::jobject,
    klass: jni::jclass,
    size: jni::jlong,
) {
    handle_event(&Jvmti::from_raw(jvmti_env), &Event::VmObjectAlloc { object, klass, size });
}
