//! Discovery of host extension functions by id.
//!
//! The only one the agent uses is ART's heap iteration extension, which stands
//! in for `IterateThroughHeap` on hosts that do not implement it.

use std::mem;

use crate::jvmti_wrapper::Jvmti;
use crate::loge;
use crate::sys::jvmti::IterateThroughHeapExt;

pub const HEAP_ITERATION_EXTENSION_ID: &str = "com.android.art.heap.iterate_through_heap_ext";

#[derive(Debug, Default, Clone, Copy)]
pub struct Discovery {
    /// Descriptors enumerated, matching or not.
    pub functions_seen: usize,
    pub iterate_through_heap_ext: Option<IterateThroughHeapExt>,
}

/// Walks every extension function the host registers.
///
/// Each descriptor is released before the next one is looked at. A host that
/// does not register the heap extension is logged; that is not a failure.
pub fn discover(jvmti: &Jvmti) -> Discovery {
    let mut discovery = Discovery::default();
    let Some(functions) = jvmti.check(jvmti.get_extension_functions(), "Failed to get extension functions") else {
        return discovery;
    };

    for function in functions {
        discovery.functions_seen += 1;

        let is_heap_ext = function
            .id()
            .is_some_and(|id| id.to_bytes() == HEAP_ITERATION_EXTENSION_ID.as_bytes());
        if !is_heap_ext || function.func().is_null() {
            continue;
        }

        // The id fixes the signature.
        discovery.iterate_through_heap_ext =
            Some(unsafe { mem::transmute::<*mut std::ffi::c_void, IterateThroughHeapExt>(function.func()) });
        loge!(
            "Found extension {} ({} params): {}",
            HEAP_ITERATION_EXTENSION_ID,
            function.param_count(),
            function.short_description()
        );
    }

    if discovery.iterate_through_heap_ext.is_none() {
        loge!(
            "Extension {} not found among {} extension functions",
            HEAP_ITERATION_EXTENSION_ID,
            discovery.functions_seen
        );
    }
    discovery
}
