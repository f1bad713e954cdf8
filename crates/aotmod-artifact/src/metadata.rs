//! Kernel and field descriptors
//!
//! `ModuleMetadata` is the validated, backend-agnostic description of an AOT
//! module. Kernel names are unique, field names are unique, and declaration
//! order is kept as written by the compiler.

use std::collections::HashSet;

use crate::error::CorruptReason;
use crate::format::{FieldRecord, KernelRecord, MetadataRecord};
use crate::types::TypeTag;

/// Validated description of an AOT module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleMetadata {
    pub format_version: u32,

    /// Target architecture the kernels were compiled for, if recorded
    pub target_arch: Option<String>,

    pub kernels: Vec<KernelDescriptor>,
    pub fields: Vec<FieldDescriptor>,
}

/// A compiled kernel declared by the module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelDescriptor {
    pub name: String,

    /// Native symbol the backend must resolve for this kernel
    pub entry_symbol: String,

    pub argument_signature: Vec<TypeTag>,
}

/// A data field declared by the module.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldDescriptor {
    pub name: String,
    pub element_type: TypeTag,

    /// Dimensions, outermost first; empty for a scalar field
    pub shape: Vec<u64>,
}

impl KernelDescriptor {
    pub fn new(
        name: impl Into<String>,
        entry_symbol: impl Into<String>,
        argument_signature: Vec<TypeTag>,
    ) -> Self {
        Self {
            name: name.into(),
            entry_symbol: entry_symbol.into(),
            argument_signature,
        }
    }

    fn from_record(record: KernelRecord) -> Result<Self, CorruptReason> {
        let mut argument_signature = Vec::with_capacity(record.args.len());
        for (index, arg) in record.args.iter().enumerate() {
            let tag = arg.parse::<TypeTag>().map_err(|source| CorruptReason::UnknownTypeTag {
                owner: format!("kernel `{}` argument {}", record.name, index),
                source,
            })?;
            argument_signature.push(tag);
        }

        Ok(Self {
            name: record.name,
            entry_symbol: record.entry_symbol,
            argument_signature,
        })
    }

    fn to_record(&self) -> KernelRecord {
        KernelRecord {
            name: self.name.clone(),
            entry_symbol: self.entry_symbol.clone(),
            args: self
                .argument_signature
                .iter()
                .map(|tag| tag.as_str().to_string())
                .collect(),
        }
    }
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, element_type: TypeTag, shape: Vec<u64>) -> Self {
        Self {
            name: name.into(),
            element_type,
            shape,
        }
    }

    /// Number of elements (1 for a scalar field); `None` on overflow.
    pub fn element_count(&self) -> Option<u64> {
        self.shape
            .iter()
            .try_fold(1u64, |count, &dim| count.checked_mul(dim))
    }

    /// Total buffer size in bytes; `None` on overflow.
    pub fn size_bytes(&self) -> Option<u64> {
        self.element_count()?
            .checked_mul(self.element_type.size_bytes() as u64)
    }

    /// Same element type and shape as `other`; names are not compared.
    pub fn layout_matches(&self, other: &FieldDescriptor) -> bool {
        self.element_type == other.element_type && self.shape == other.shape
    }

    fn from_record(record: FieldRecord) -> Result<Self, CorruptReason> {
        let element_type = record
            .dtype
            .parse::<TypeTag>()
            .map_err(|source| CorruptReason::UnknownTypeTag {
                owner: format!("field `{}`", record.name),
                source,
            })?;

        let mut shape = Vec::with_capacity(record.shape.len());
        for (axis, &dim) in record.shape.iter().enumerate() {
            if dim < 0 {
                return Err(CorruptReason::NegativeDimension {
                    field: record.name,
                    axis,
                    value: dim,
                });
            }
            shape.push(dim as u64);
        }

        Ok(Self {
            name: record.name,
            element_type,
            shape,
        })
    }

    fn to_record(&self) -> FieldRecord {
        FieldRecord {
            name: self.name.clone(),
            dtype: self.element_type.as_str().to_string(),
            // `validate` rejects dimensions that do not fit.
            shape: self
                .shape
                .iter()
                .map(|&d| i64::try_from(d).unwrap_or(i64::MAX))
                .collect(),
        }
    }
}

impl ModuleMetadata {
    /// Empty metadata for the given format version.
    pub fn new(format_version: u32) -> Self {
        Self {
            format_version,
            target_arch: None,
            kernels: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn with_target_arch(mut self, arch: impl Into<String>) -> Self {
        self.target_arch = Some(arch.into());
        self
    }

    pub fn with_kernel(mut self, kernel: KernelDescriptor) -> Self {
        self.kernels.push(kernel);
        self
    }

    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Convert and validate a parsed `metadata.json` record.
    pub fn from_record(record: MetadataRecord) -> Result<Self, CorruptReason> {
        let kernels = record
            .kernels
            .into_iter()
            .map(KernelDescriptor::from_record)
            .collect::<Result<Vec<_>, _>>()?;
        let fields = record
            .fields
            .into_iter()
            .map(FieldDescriptor::from_record)
            .collect::<Result<Vec<_>, _>>()?;

        let metadata = Self {
            format_version: record.format_version,
            target_arch: record.arch,
            kernels,
            fields,
        };
        metadata.validate()?;
        Ok(metadata)
    }

    /// Serializable form of this metadata.
    pub fn to_record(&self) -> MetadataRecord {
        MetadataRecord {
            format_version: self.format_version,
            arch: self.target_arch.clone(),
            kernels: self.kernels.iter().map(KernelDescriptor::to_record).collect(),
            fields: self.fields.iter().map(FieldDescriptor::to_record).collect(),
        }
    }

    /// Check name uniqueness, non-empty names/symbols, and that every field
    /// has an encodable shape and a byte size that fits in `u64`.
    pub fn validate(&self) -> Result<(), CorruptReason> {
        let mut seen = HashSet::new();
        for kernel in &self.kernels {
            if kernel.name.is_empty() {
                return Err(CorruptReason::EmptyName("kernel"));
            }
            if kernel.entry_symbol.is_empty() {
                return Err(CorruptReason::EmptyEntrySymbol(kernel.name.clone()));
            }
            if !seen.insert(kernel.name.as_str()) {
                return Err(CorruptReason::DuplicateKernel(kernel.name.clone()));
            }
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.is_empty() {
                return Err(CorruptReason::EmptyName("field"));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(CorruptReason::DuplicateField(field.name.clone()));
            }
            if let Some((axis, &value)) = field
                .shape
                .iter()
                .enumerate()
                .find(|&(_, &dim)| dim > i64::MAX as u64)
            {
                return Err(CorruptReason::DimensionTooLarge {
                    field: field.name.clone(),
                    axis,
                    value,
                });
            }
            if field.size_bytes().is_none() {
                return Err(CorruptReason::SizeOverflow(field.name.clone()));
            }
        }

        Ok(())
    }

    pub fn kernel(&self, name: &str) -> Option<&KernelDescriptor> {
        self.kernels.iter().find(|k| k.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}
