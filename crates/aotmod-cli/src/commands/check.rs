//! `aotmod check`: load an artifact against shared libraries.

use std::path::{Path, PathBuf};

use aotmod_runtime::{
    BackendRegistry, DylibBackend, LoadConfig, LoaderOptions, ModuleLoader,
};
use anyhow::Context;
use log::debug;

pub fn execute(
    artifact: &Path,
    libs: &[PathBuf],
    process: bool,
    config: Option<&Path>,
) -> anyhow::Result<()> {
    let options = match config {
        Some(path) => LoaderOptions::from_file(path)
            .with_context(|| format!("cannot use loader options {}", path.display()))?,
        None => LoaderOptions::default(),
    };

    let mut backend = if process {
        DylibBackend::with_process_symbols("aotmod-check")?
    } else {
        DylibBackend::new("aotmod-check")
    };
    for lib in libs {
        debug!("opening {}", lib.display());
        backend
            .open_library(lib)
            .with_context(|| format!("cannot open library {}", lib.display()))?;
    }

    let registry = BackendRegistry::new();
    let id = registry.register(Box::new(backend));

    let module = ModuleLoader::new(&registry)
        .with_options(options)
        .load(LoadConfig::new(artifact, id))
        .map_err(|e| {
            let kind = e.kind();
            anyhow::Error::new(e).context(format!(
                "{} failed to load ({:?})",
                artifact.display(),
                kind
            ))
        })?;

    println!(
        "ok: {} kernel(s), {} field(s) bound",
        module.kernels().len(),
        module.fields().len()
    );
    for kernel in module.kernels() {
        println!("  {} -> {:?}", kernel.name(), kernel.entry());
    }
    Ok(())
}
