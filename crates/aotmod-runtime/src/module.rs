//! Bound AOT modules
//!
//! An `AotModule` is only ever produced by a successful bind. Every kernel it
//! holds has a resolved entry point and every field passed the backend check,
//! so lookups are plain table reads.

use aotmod_artifact::{FieldDescriptor, ModuleMetadata, TypeTag};
use rustc_hash::FxHashMap;

use crate::backend::EntryPoint;
use crate::registry::{BackendId, BackendRegistry};

/// A kernel with its resolved entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelHandle {
    name: String,
    entry_symbol: String,
    entry: EntryPoint,
    argument_signature: Vec<TypeTag>,
}

impl KernelHandle {
    pub(crate) fn new(
        name: String,
        entry_symbol: String,
        entry: EntryPoint,
        argument_signature: Vec<TypeTag>,
    ) -> Self {
        Self {
            name,
            entry_symbol,
            entry,
            argument_signature,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entry_symbol(&self) -> &str {
        &self.entry_symbol
    }

    pub fn entry(&self) -> EntryPoint {
        self.entry
    }

    pub fn argument_signature(&self) -> &[TypeTag] {
        &self.argument_signature
    }

    pub fn arity(&self) -> usize {
        self.argument_signature.len()
    }
}

/// A field bound into the module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldHandle {
    descriptor: FieldDescriptor,
}

impl FieldHandle {
    pub(crate) fn new(descriptor: FieldDescriptor) -> Self {
        Self { descriptor }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn element_type(&self) -> TypeTag {
        self.descriptor.element_type
    }

    pub fn shape(&self) -> &[u64] {
        &self.descriptor.shape
    }

    pub fn element_count(&self) -> Option<u64> {
        self.descriptor.element_count()
    }

    /// `None` only for descriptors that never went through validation.
    pub fn size_bytes(&self) -> Option<u64> {
        self.descriptor.size_bytes()
    }

    pub fn descriptor(&self) -> &FieldDescriptor {
        &self.descriptor
    }
}

/// A loaded module bound against one backend.
///
/// Owns its metadata. Refers to the backend only by [`BackendId`]; the
/// backend must outlive any use of the entry points handed out here.
#[derive(Debug)]
pub struct AotModule {
    metadata: ModuleMetadata,
    backend: BackendId,
    backend_name: String,
    kernels: Vec<KernelHandle>,
    fields: Vec<FieldHandle>,
    kernel_index: FxHashMap<String, usize>,
    field_index: FxHashMap<String, usize>,
}

impl AotModule {
    pub(crate) fn new(
        metadata: ModuleMetadata,
        backend: BackendId,
        backend_name: String,
        kernels: Vec<KernelHandle>,
        fields: Vec<FieldHandle>,
    ) -> Self {
        let kernel_index = kernels
            .iter()
            .enumerate()
            .map(|(i, k)| (k.name.clone(), i))
            .collect();
        let field_index = fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name().to_string(), i))
            .collect();

        Self {
            metadata,
            backend,
            backend_name,
            kernels,
            fields,
            kernel_index,
            field_index,
        }
    }

    /// Look up a kernel by name; `None` when the module has no such kernel.
    pub fn get_kernel(&self, name: &str) -> Option<&KernelHandle> {
        self.kernel_index.get(name).map(|&i| &self.kernels[i])
    }

    /// Look up a field by name; `None` when the module has no such field.
    pub fn get_field(&self, name: &str) -> Option<&FieldHandle> {
        self.field_index.get(name).map(|&i| &self.fields[i])
    }

    /// Kernels in declaration order.
    pub fn kernels(&self) -> &[KernelHandle] {
        &self.kernels
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldHandle] {
        &self.fields
    }

    pub fn kernel_names(&self) -> impl Iterator<Item = &str> {
        self.kernels.iter().map(|k| k.name())
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name())
    }

    pub fn metadata(&self) -> &ModuleMetadata {
        &self.metadata
    }

    pub fn format_version(&self) -> u32 {
        self.metadata.format_version
    }

    pub fn target_arch(&self) -> Option<&str> {
        self.metadata.target_arch.as_deref()
    }

    /// Handle of the backend this module was bound against.
    pub fn backend(&self) -> BackendId {
        self.backend
    }

    /// Name the backend had at bind time.
    pub fn backend_name(&self) -> &str {
        &self.backend_name
    }

    /// Whether the backend is still registered.
    ///
    /// Check this before invoking entry points if the backend may have been
    /// torn down; the module itself does not prevent teardown.
    pub fn is_backend_live(&self, registry: &BackendRegistry) -> bool {
        registry.contains(self.backend)
    }
}
