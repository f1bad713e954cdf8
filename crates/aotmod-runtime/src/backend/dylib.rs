//! Shared-library backend
//!
//! Resolves kernel entry points from shared libraries (`.so`, `.dylib`)
//! opened with `dlopen`, and optionally from the running process itself.
//! Libraries are searched in the order they were opened.

#[cfg(unix)]
use std::ffi::{CStr, CString};
use std::path::Path;

use aotmod_artifact::FieldDescriptor;
use log::debug;
use parking_lot::{RwLock, RwLockReadGuard};
use rustc_hash::FxHashMap;
use thiserror::Error;

use super::{BackendView, EntryPoint, ExecutionBackend};

/// Errors that can occur while opening a library
#[derive(Debug, Error)]
pub enum DylibError {
    /// Library file not found or could not be loaded
    #[error("library not found: {path}: {reason}")]
    NotFound { path: String, reason: String },

    /// Invalid path encoding
    #[error("invalid UTF-8 in path: {0}")]
    InvalidPath(String),

    /// Platform-specific error
    #[error("platform error: {0}")]
    PlatformError(String),
}

/// Backend resolving symbols through the platform dynamic loader.
pub struct DylibBackend {
    name: String,
    target_arch: Option<String>,
    libraries: Vec<Library>,
    fields: RwLock<FxHashMap<String, FieldDescriptor>>,
}

struct DylibView<'a> {
    libraries: &'a [Library],
    fields: RwLockReadGuard<'a, FxHashMap<String, FieldDescriptor>>,
}

impl BackendView for DylibView<'_> {
    fn resolve_symbol(&self, name: &str) -> Option<EntryPoint> {
        self.libraries.iter().find_map(|lib| lib.symbol(name))
    }

    fn describe_declared_field(&self, name: &str) -> Option<FieldDescriptor> {
        self.fields.get(name).cloned()
    }
}

impl DylibBackend {
    /// Backend with no libraries, targeting the host architecture.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target_arch: Some(std::env::consts::ARCH.to_string()),
            libraries: Vec::new(),
            fields: RwLock::new(FxHashMap::default()),
        }
    }

    /// Backend that resolves symbols already loaded into this process.
    pub fn with_process_symbols(name: impl Into<String>) -> Result<Self, DylibError> {
        let mut backend = Self::new(name);
        backend.libraries.push(Library::this_process()?);
        Ok(backend)
    }

    /// Open a shared library and append it to the search order.
    pub fn open_library(&mut self, path: impl AsRef<Path>) -> Result<(), DylibError> {
        let library = Library::open(path.as_ref())?;
        debug!("backend {}: opened {}", self.name, library.path);
        self.libraries.push(library);
        Ok(())
    }

    /// Declare or replace a field. Returns the previous declaration.
    pub fn declare_field(&self, field: FieldDescriptor) -> Option<FieldDescriptor> {
        self.fields.write().insert(field.name.clone(), field)
    }

    /// Paths of the opened libraries, in search order.
    pub fn library_paths(&self) -> impl Iterator<Item = &str> {
        self.libraries.iter().map(|lib| lib.path.as_str())
    }
}

impl ExecutionBackend for DylibBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn target_arch(&self) -> Option<&str> {
        self.target_arch.as_deref()
    }

    fn view(&self) -> Box<dyn BackendView + '_> {
        Box::new(DylibView {
            libraries: &self.libraries,
            fields: self.fields.read(),
        })
    }
}

/// An open dynamic library handle
struct Library {
    handle: LibraryHandle,
    path: String,
}

impl Library {
    fn open(path: &Path) -> Result<Self, DylibError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| DylibError::InvalidPath(format!("{:?}", path)))?;

        Ok(Library {
            handle: LibraryHandle::load(Some(path_str))?,
            path: path_str.to_string(),
        })
    }

    fn this_process() -> Result<Self, DylibError> {
        Ok(Library {
            handle: LibraryHandle::load(None)?,
            path: "<process>".to_string(),
        })
    }

    fn symbol(&self, name: &str) -> Option<EntryPoint> {
        self.handle.symbol(name)
    }
}

#[cfg(unix)]
type LibraryHandle = UnixLibrary;

#[cfg(not(unix))]
type LibraryHandle = UnsupportedLibrary;

#[cfg(unix)]
struct UnixLibrary {
    handle: *mut std::ffi::c_void,
}

#[cfg(unix)]
impl UnixLibrary {
    /// `None` opens the main program, whose global scope covers everything
    /// already loaded into the process.
    fn load(path: Option<&str>) -> Result<Self, DylibError> {
        let c_path = path
            .map(CString::new)
            .transpose()
            .map_err(|e| DylibError::PlatformError(format!("invalid path: {}", e)))?;
        let path_ptr = c_path.as_ref().map_or(std::ptr::null(), |p| p.as_ptr());

        // RTLD_NOW: resolve all symbols immediately
        // RTLD_LOCAL: keep this library's symbols out of later lookups
        let handle = unsafe { libc::dlopen(path_ptr, libc::RTLD_NOW | libc::RTLD_LOCAL) };

        if handle.is_null() {
            return Err(DylibError::NotFound {
                path: path.unwrap_or("<process>").to_string(),
                reason: last_dl_error(),
            });
        }

        Ok(UnixLibrary { handle })
    }

    fn symbol(&self, name: &str) -> Option<EntryPoint> {
        let c_name = CString::new(name).ok()?;
        let symbol = unsafe { libc::dlsym(self.handle, c_name.as_ptr()) };
        EntryPoint::from_ptr(symbol as *const std::ffi::c_void)
    }
}

#[cfg(unix)]
fn last_dl_error() -> String {
    unsafe {
        let err_ptr = libc::dlerror();
        if err_ptr.is_null() {
            "unknown error".to_string()
        } else {
            CStr::from_ptr(err_ptr).to_string_lossy().into_owned()
        }
    }
}

#[cfg(unix)]
impl Drop for UnixLibrary {
    fn drop(&mut self) {
        unsafe {
            libc::dlclose(self.handle);
        }
    }
}

// Safety: the handle is only passed to dlsym/dlclose, which are thread-safe.
#[cfg(unix)]
unsafe impl Send for UnixLibrary {}
#[cfg(unix)]
unsafe impl Sync for UnixLibrary {}

#[cfg(not(unix))]
struct UnsupportedLibrary;

#[cfg(not(unix))]
impl UnsupportedLibrary {
    fn load(_path: Option<&str>) -> Result<Self, DylibError> {
        Err(DylibError::PlatformError(
            "shared-library backends are only supported on unix".to_string(),
        ))
    }

    fn symbol(&self, _name: &str) -> Option<EntryPoint> {
        None
    }
}
