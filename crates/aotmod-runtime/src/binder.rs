//! Module binder
//!
//! Turns validated metadata into an [`AotModule`] against one backend:
//! 1. Check the module's target arch against the backend's
//! 2. Take a single backend view for the whole bind
//! 3. Resolve every kernel entry symbol (first miss fails the bind)
//! 4. Check every field against the backend's declaration of the same name
//!
//! Nothing is published until all steps pass, so a caller gets either a
//! complete module or an error.

use aotmod_artifact::ModuleMetadata;
use log::debug;

use crate::backend::{BackendView, ExecutionBackend};
use crate::error::{LoadError, LoadResult};
use crate::module::{AotModule, FieldHandle, KernelHandle};
use crate::options::LoaderOptions;
use crate::registry::{BackendId, BackendRegistry};

/// Bind `metadata` against the registered backend `backend` with default options.
pub fn bind(
    metadata: ModuleMetadata,
    backend: BackendId,
    registry: &BackendRegistry,
) -> LoadResult<AotModule> {
    bind_with(metadata, backend, registry, &LoaderOptions::default())
}

/// Bind `metadata` against the registered backend `backend`.
///
/// The registry stays read-locked for the whole bind, so the backend cannot
/// be unregistered halfway through.
pub fn bind_with(
    metadata: ModuleMetadata,
    backend: BackendId,
    registry: &BackendRegistry,
    options: &LoaderOptions,
) -> LoadResult<AotModule> {
    registry
        .with_backend(backend, |live| bind_to(metadata, backend, live, options))
        .unwrap_or(Err(LoadError::BackendUnavailable(backend)))
}

fn bind_to(
    metadata: ModuleMetadata,
    id: BackendId,
    backend: &dyn ExecutionBackend,
    options: &LoaderOptions,
) -> LoadResult<AotModule> {
    check_target(&metadata, backend)?;

    let view = backend.view();
    let kernels = resolve_kernels(&metadata, view.as_ref())?;
    let fields = check_fields(&metadata, view.as_ref(), options)?;
    drop(view);

    debug!(
        "bound {} kernel(s) and {} field(s) against backend `{}`",
        kernels.len(),
        fields.len(),
        backend.name()
    );

    Ok(AotModule::new(
        metadata,
        id,
        backend.name().to_string(),
        kernels,
        fields,
    ))
}

fn check_target(metadata: &ModuleMetadata, backend: &dyn ExecutionBackend) -> LoadResult<()> {
    match (metadata.target_arch.as_deref(), backend.target_arch()) {
        (Some(module), Some(host)) if module != host => Err(LoadError::TargetMismatch {
            module: module.to_string(),
            backend: host.to_string(),
        }),
        _ => Ok(()),
    }
}

fn resolve_kernels(
    metadata: &ModuleMetadata,
    view: &dyn BackendView,
) -> LoadResult<Vec<KernelHandle>> {
    let mut kernels = Vec::with_capacity(metadata.kernels.len());
    for kernel in &metadata.kernels {
        let entry = view.resolve_symbol(&kernel.entry_symbol).ok_or_else(|| {
            LoadError::UnresolvedSymbol {
                kernel: kernel.name.clone(),
                symbol: kernel.entry_symbol.clone(),
            }
        })?;
        debug!(
            "kernel `{}` -> `{}` at {:?}",
            kernel.name, kernel.entry_symbol, entry
        );
        kernels.push(KernelHandle::new(
            kernel.name.clone(),
            kernel.entry_symbol.clone(),
            entry,
            kernel.argument_signature.clone(),
        ));
    }
    Ok(kernels)
}

fn check_fields(
    metadata: &ModuleMetadata,
    view: &dyn BackendView,
    options: &LoaderOptions,
) -> LoadResult<Vec<FieldHandle>> {
    let mut fields = Vec::with_capacity(metadata.fields.len());
    for field in &metadata.fields {
        match view.describe_declared_field(&field.name) {
            Some(declared) if !declared.layout_matches(field) => {
                return Err(LoadError::field_mismatch(field, Some(&declared)));
            }
            None if options.require_declared_fields => {
                return Err(LoadError::field_mismatch(field, None));
            }
            _ => {}
        }
        fields.push(FieldHandle::new(field.clone()));
    }
    Ok(fields)
}
