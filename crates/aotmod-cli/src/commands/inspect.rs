//! `aotmod inspect`: print what an artifact declares.

use std::path::Path;

use aotmod_artifact::{read_artifact, ModuleMetadata};
use anyhow::Context;

pub fn execute(artifact: &Path) -> anyhow::Result<()> {
    let metadata = read_artifact(artifact)
        .with_context(|| format!("cannot read artifact {}", artifact.display()))?;
    print!("{}", render(&metadata));
    Ok(())
}

pub fn render(metadata: &ModuleMetadata) -> String {
    let mut out = String::new();
    out.push_str(&format!("format version: {}\n", metadata.format_version));
    out.push_str(&format!(
        "target arch:    {}\n",
        metadata.target_arch.as_deref().unwrap_or("(any)")
    ));

    out.push_str(&format!("kernels ({}):\n", metadata.kernels.len()));
    for kernel in &metadata.kernels {
        let args: Vec<&str> = kernel.argument_signature.iter().map(|t| t.as_str()).collect();
        out.push_str(&format!(
            "  {}({}) -> {}\n",
            kernel.name,
            args.join(", "),
            kernel.entry_symbol
        ));
    }

    out.push_str(&format!("fields ({}):\n", metadata.fields.len()));
    for field in &metadata.fields {
        let dims: Vec<String> = field.shape.iter().map(|d| d.to_string()).collect();
        let size = match field.size_bytes() {
            Some(bytes) => format!("{bytes} bytes"),
            None => "size overflows u64".to_string(),
        };
        out.push_str(&format!(
            "  {}: {}[{}] ({})\n",
            field.name,
            field.element_type,
            dims.join(", "),
            size
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use aotmod_artifact::{FieldDescriptor, KernelDescriptor, TypeTag};

    #[test]
    fn test_render() {
        let metadata = ModuleMetadata::new(2)
            .with_kernel(KernelDescriptor::new(
                "add",
                "k_add_sym",
                vec![TypeTag::I32, TypeTag::I32],
            ))
            .with_field(FieldDescriptor::new("x", TypeTag::F32, vec![4, 2]));

        let text = render(&metadata);
        assert!(text.contains("format version: 2"));
        assert!(text.contains("target arch:    (any)"));
        assert!(text.contains("  add(i32, i32) -> k_add_sym"));
        assert!(text.contains("  x: f32[4, 2] (32 bytes)"));
    }

    #[test]
    fn test_render_oversized_field() {
        let metadata = ModuleMetadata::new(1).with_field(FieldDescriptor::new(
            "big",
            TypeTag::F64,
            vec![1 << 32, 1 << 32],
        ));
        let text = render(&metadata);
        assert!(text.contains("  big: f64[4294967296, 4294967296] (size overflows u64)"));
    }
}
