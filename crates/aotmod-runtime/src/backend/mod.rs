//! Execution backend capability
//!
//! The binder never talks to a concrete backend. It asks an
//! [`ExecutionBackend`] for a [`BackendView`], a consistent snapshot of the
//! backend's native symbol space and declared fields, and does every lookup
//! of one bind through that view.

mod dylib;
mod table;

use std::ffi::c_void;
use std::fmt;

use aotmod_artifact::FieldDescriptor;

pub use dylib::{DylibBackend, DylibError};
pub use table::SymbolTableBackend;

/// Native address of a compiled kernel entry point.
///
/// Never null. The address stays valid only while the backend that resolved
/// it is alive.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryPoint(usize);

impl EntryPoint {
    /// Wrap a native address; `None` for null.
    pub fn new(addr: usize) -> Option<Self> {
        if addr == 0 {
            None
        } else {
            Some(EntryPoint(addr))
        }
    }

    pub fn from_ptr(ptr: *const c_void) -> Option<Self> {
        Self::new(ptr as usize)
    }

    pub fn addr(self) -> usize {
        self.0
    }

    pub fn as_ptr(self) -> *const c_void {
        self.0 as *const c_void
    }

    /// Reinterpret the entry point as a function pointer.
    ///
    /// # Safety
    /// `F` must be a function pointer type matching the kernel's native
    /// calling convention and signature, and the backend that resolved this
    /// entry point must still be alive when the function is called.
    pub unsafe fn cast<F: Copy>(self) -> F {
        debug_assert_eq!(std::mem::size_of::<F>(), std::mem::size_of::<usize>());
        std::mem::transmute_copy(&self.0)
    }
}

impl fmt::Debug for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryPoint({:#x})", self.0)
    }
}

/// Read-only lookups into a backend.
pub trait BackendView {
    /// Resolve a native symbol to its entry point.
    fn resolve_symbol(&self, name: &str) -> Option<EntryPoint>;

    /// The backend's existing declaration of a field, if it has one.
    fn describe_declared_field(&self, name: &str) -> Option<FieldDescriptor>;
}

/// A live, initialized execution backend.
pub trait ExecutionBackend: Send + Sync {
    /// Backend name (for diagnostics)
    fn name(&self) -> &str;

    /// Architecture the backend executes, if it checks one.
    fn target_arch(&self) -> Option<&str> {
        None
    }

    /// Snapshot of the backend's symbols and fields.
    ///
    /// Lookups through one view are mutually consistent: no concurrent
    /// definition becomes visible halfway through.
    fn view(&self) -> Box<dyn BackendView + '_>;
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn double_it(x: i32) -> i32 {
        x * 2
    }

    #[test]
    fn test_null_is_rejected() {
        assert!(EntryPoint::new(0).is_none());
        assert!(EntryPoint::from_ptr(std::ptr::null()).is_none());
    }

    #[test]
    fn test_cast_round_trips_function_pointer() {
        let entry = EntryPoint::new(double_it as usize).unwrap();
        let f: extern "C" fn(i32) -> i32 = unsafe { entry.cast() };
        assert_eq!(f(21), 42);
    }

    #[test]
    fn test_debug_is_hex() {
        let entry = EntryPoint::new(0x1000).unwrap();
        assert_eq!(format!("{entry:?}"), "EntryPoint(0x1000)");
    }
}
