//! Temporary heap slots for values that are built here and then moved into a map.

use std::alloc::Layout;

use facet_core::{PtrMut, PtrUninit};

/// Uninitialized storage for one value of a known layout.
///
/// Dropping a `Scratch` frees the memory without dropping the value: by then the value has
/// either been moved out (map insert) or was never written.
pub(crate) struct Scratch {
    ptr: *mut u8,
    layout: Layout,
}

impl Scratch {
    pub(crate) fn new(layout: Layout) -> Self {
        let ptr = if layout.size() == 0 {
            core::ptr::NonNull::dangling().as_ptr()
        } else {
            // SAFETY: layout.size() > 0
            let ptr = unsafe { std::alloc::alloc(layout) };
            if ptr.is_null() {
                std::alloc::handle_alloc_error(layout);
            }
            ptr
        };
        Self { ptr, layout }
    }

    pub(crate) fn uninit(&self) -> PtrUninit {
        PtrUninit::new(self.ptr)
    }

    pub(crate) fn ptr(&self) -> PtrMut {
        PtrMut::new(self.ptr)
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        if self.layout.size() > 0 {
            // SAFETY: allocated in `new` with this layout
            unsafe { std::alloc::dealloc(self.ptr, self.layout) };
        }
    }
}
