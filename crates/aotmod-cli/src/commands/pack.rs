//! `aotmod pack`: write an artifact directory from a metadata document.

use std::path::Path;

use aotmod_artifact::format::MetadataRecord;
use aotmod_artifact::{ArtifactWriter, ModuleMetadata};
use anyhow::Context;

pub fn execute(metadata_path: &Path, output: &Path, checksum: bool) -> anyhow::Result<()> {
    let bytes = std::fs::read(metadata_path)
        .with_context(|| format!("cannot read {}", metadata_path.display()))?;
    let record: MetadataRecord = serde_json::from_slice(&bytes)
        .with_context(|| format!("{} is not a metadata document", metadata_path.display()))?;
    let metadata = ModuleMetadata::from_record(record)
        .with_context(|| format!("{} has invalid descriptors", metadata_path.display()))?;

    ArtifactWriter::new()
        .write_checksum(checksum)
        .write(output, &metadata)?;

    println!(
        "wrote {} (format version {}, {} kernel(s), {} field(s))",
        output.display(),
        metadata.format_version,
        metadata.kernels.len(),
        metadata.fields.len()
    );
    Ok(())
}
