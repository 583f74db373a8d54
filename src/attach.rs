//! The attach sequence.

use crate::agent_thread;
use crate::capabilities;
use crate::companion;
use crate::config::AgentOptions;
use crate::error::{AgentError, CompanionError};
use crate::events::{EventHookRegistry, DEFAULT_HOOKS};
use crate::extensions::{self, Discovery};
use crate::heap::{self, HeapWalk};
use crate::jni_wrapper::{JniEnv, LocalRef};
use crate::jvmti_wrapper::Jvmti;
use crate::logging;
use crate::loge;
use crate::snapshot;
use crate::sys::jni;
use crate::vm::JavaVm;

/// What one attach did, step by step.
#[derive(Debug)]
pub struct AttachReport {
    pub capabilities_granted: bool,
    pub agent_thread_started: bool,
    pub classes_logged: usize,
    pub threads_logged: usize,
    pub discovery: Discovery,
    /// `None` when the walk was turned off or its filter class was not found.
    pub heap: Option<HeapWalk>,
    /// `None` when the hand-off was turned off.
    pub companion: Option<Result<(), CompanionError>>,
}

/// Runs the whole sequence for the raw options string.
///
/// Bad options are logged and the defaults used. Returns `JNI_OK`, or
/// `JNI_ERR` if the JVMTI environment or the calling thread's JNI environment
/// could not be obtained.
pub fn attach(vm: &JavaVm, options: &str) -> jni::jint {
    let parsed = AgentOptions::parse(options);
    let opts = parsed.as_ref().cloned().unwrap_or_default();
    logging::init(opts.log_filter.as_deref(), opts.log_file.as_deref());
    if let Err(err) = &parsed {
        loge!("Ignoring agent options {:?}: {}", options, err);
    }

    match run(vm, &opts) {
        Ok(_) => jni::JNI_OK,
        Err(err) => {
            loge!("{}", err);
            jni::JNI_ERR
        }
    }
}

/// The attach sequence proper, for already parsed options.
pub fn run(vm: &JavaVm, opts: &AgentOptions) -> Result<AttachReport, AgentError> {
    let jvmti = vm.jvmti()?;
    let capabilities_granted = capabilities::negotiate_all(&jvmti);
    let jni = vm.attach_current_thread()?;

    let mut registry = EventHookRegistry::default();
    registry.apply(&jvmti, DEFAULT_HOOKS);

    let agent_thread_started = match agent_thread::start_agent_thread(&jvmti, &jni) {
        Ok(()) => true,
        Err(err) => {
            loge!("{}", err);
            false
        }
    };

    let classes_logged = snapshot::dump_loaded_classes(&jvmti, &jni);
    let threads_logged = snapshot::dump_live_threads(&jvmti, &jni);
    let discovery = extensions::discover(&jvmti);

    let heap = if opts.skip_heap {
        None
    } else {
        walk_heap(&jvmti, &jni, opts.heap_class.as_deref(), &discovery)
    };

    let companion = (!opts.skip_companion).then(|| {
        let result = companion::hand_off(&jvmti, &jni, &opts.companion_config());
        if let Err(err) = &result {
            loge!("{}", err);
        }
        result
    });

    Ok(AttachReport {
        capabilities_granted,
        agent_thread_started,
        classes_logged,
        threads_logged,
        discovery,
        heap,
        companion,
    })
}

fn walk_heap(jvmti: &Jvmti, jni: &JniEnv, heap_class: Option<&str>, discovery: &Discovery) -> Option<HeapWalk> {
    let filter = match heap_class {
        None => LocalRef::new(jni, std::ptr::null_mut()),
        Some(name) => match jni.find_class(name) {
            Some(cls) => LocalRef::new(jni, cls),
            None => {
                jni.clear_pending_exception();
                loge!("Heap filter class {} not found, skipping heap walk", name);
                return None;
            }
        },
    };

    let walk = heap::iterate_heap(jvmti, filter.get(), discovery.iterate_through_heap_ext);
    if let HeapWalk::Standard(tally) | HeapWalk::Extension(tally) = walk {
        loge!("Heap walk visited {} objects, {} bytes", tally.objects, tally.bytes);
    }
    Some(walk)
}
