//! Heap walking.
//!
//! Prefers the standard `IterateThroughHeap`. When the host reports it as not
//! available the walk goes through the discovered ART extension instead, with
//! heap filter `0` and no class filter.

use std::ffi::c_void;
use std::ptr;

use crate::error::ErrorKind;
use crate::extensions::HEAP_ITERATION_EXTENSION_ID;
use crate::jvmti_wrapper::Jvmti;
use crate::loge;
use crate::sys::jni::{jclass, jint, jlong};
use crate::sys::jvmti::{self, jvmtiError, IterateThroughHeapExt};

/// Objects seen during one walk.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HeapTally {
    pub objects: u64,
    pub bytes: u64,
}

impl HeapTally {
    fn record(&mut self, size: jlong) {
        self.objects += 1;
        self.bytes += u64::try_from(size).unwrap_or(0);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapWalk {
    Standard(HeapTally),
    Extension(HeapTally),
    /// Standard entry point unavailable and no extension discovered.
    Skipped,
    Failed(jvmtiError),
}

/// Walks the heap once, optionally restricted to instances of `filter_class`
/// (null for all objects). The extension path ignores the class filter.
pub fn iterate_heap(jvmti: &Jvmti, filter_class: jclass, ext: Option<IterateThroughHeapExt>) -> HeapWalk {
    let mut tally = HeapTally::default();
    let user_data = &mut tally as *mut HeapTally as *const c_void;

    let callbacks = jvmti::jvmtiHeapCallbacks {
        heap_iteration_callback: Some(heap_iteration_callback),
        ..Default::default()
    };

    let err = match jvmti.iterate_through_heap(0, filter_class, &callbacks, user_data) {
        Ok(()) => return HeapWalk::Standard(tally),
        Err(err) => err,
    };

    if ErrorKind::of(err) != ErrorKind::NotAvailable {
        jvmti.check_error(err, "Failed to iterate through heap");
        return HeapWalk::Failed(err);
    }

    let Some(iterate_ext) = ext else {
        loge!("IterateThroughHeap not available and {} not found, skipping heap walk", HEAP_ITERATION_EXTENSION_ID);
        return HeapWalk::Skipped;
    };

    loge!("IterateThroughHeap not available, using {}", HEAP_ITERATION_EXTENSION_ID);
    let callbacks = jvmti::jvmtiHeapCallbacksExt {
        heap_iteration_callback: Some(heap_iteration_callback_ext),
        ..Default::default()
    };
    let err = unsafe { iterate_ext(jvmti.raw(), 0, ptr::null_mut(), &callbacks, user_data) };
    if jvmti.check_error(err, "Failed to iterate through heap with extension") {
        return HeapWalk::Failed(err);
    }
    HeapWalk::Extension(tally)
}

unsafe extern "system" fn heap_iteration_callback(
    class_tag: jlong,
    size: jlong,
    _tag_ptr: *mut jlong,
    _length: jint,
    user_data: *mut c_void,
) -> jint {
    loge!("heapIterationCallback: {}, {}", class_tag, size);
    if let Some(tally) = (user_data as *mut HeapTally).as_mut() {
        tally.record(size);
    }
    jvmti::JVMTI_VISIT_OBJECTS
}

unsafe extern "system" fn heap_iteration_callback_ext(
    class_tag: jlong,
    size: jlong,
    tag_ptr: *mut jlong,
    length: jint,
    user_data: *mut c_void,
    _heap_id: jint,
) -> jint {
    heap_iteration_callback(class_tag, size, tag_ptr, length, user_data)
}
