//! In-process symbol table backend
//!
//! Holds entry points registered directly by the host (kernels linked into
//! the process) and the fields it has already declared.

use aotmod_artifact::FieldDescriptor;
use parking_lot::{RwLock, RwLockReadGuard};
use rustc_hash::FxHashMap;

use super::{BackendView, EntryPoint, ExecutionBackend};

#[derive(Default)]
struct SymbolTable {
    symbols: FxHashMap<String, EntryPoint>,
    fields: FxHashMap<String, FieldDescriptor>,
}

/// Backend whose symbol space is a table the host fills in.
pub struct SymbolTableBackend {
    name: String,
    target_arch: Option<String>,
    table: RwLock<SymbolTable>,
}

/// Holds the table's read lock for the life of the view.
struct TableView<'a>(RwLockReadGuard<'a, SymbolTable>);

impl BackendView for TableView<'_> {
    fn resolve_symbol(&self, name: &str) -> Option<EntryPoint> {
        self.0.symbols.get(name).copied()
    }

    fn describe_declared_field(&self, name: &str) -> Option<FieldDescriptor> {
        self.0.fields.get(name).cloned()
    }
}

impl SymbolTableBackend {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target_arch: None,
            table: RwLock::new(SymbolTable::default()),
        }
    }

    pub fn with_target_arch(mut self, arch: impl Into<String>) -> Self {
        self.target_arch = Some(arch.into());
        self
    }

    /// Define or replace a symbol. Returns the previous entry point.
    pub fn define_symbol(&self, name: impl Into<String>, entry: EntryPoint) -> Option<EntryPoint> {
        self.table.write().symbols.insert(name.into(), entry)
    }

    pub fn remove_symbol(&self, name: &str) -> Option<EntryPoint> {
        self.table.write().symbols.remove(name)
    }

    /// Declare or replace a field. Returns the previous declaration.
    pub fn declare_field(&self, field: FieldDescriptor) -> Option<FieldDescriptor> {
        self.table.write().fields.insert(field.name.clone(), field)
    }

    pub fn symbol_count(&self) -> usize {
        self.table.read().symbols.len()
    }
}

impl ExecutionBackend for SymbolTableBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn target_arch(&self) -> Option<&str> {
        self.target_arch.as_deref()
    }

    fn view(&self) -> Box<dyn BackendView + '_> {
        Box::new(TableView(self.table.read()))
    }
}

impl std::fmt::Debug for SymbolTableBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let table = self.table.read();
        f.debug_struct("SymbolTableBackend")
            .field("name", &self.name)
            .field("target_arch", &self.target_arch)
            .field("symbols", &table.symbols.len())
            .field("fields", &table.fields.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aotmod_artifact::TypeTag;

    fn entry(addr: usize) -> EntryPoint {
        EntryPoint::new(addr).unwrap()
    }

    #[test]
    fn test_define_and_resolve() {
        let backend = SymbolTableBackend::new("host");
        assert_eq!(backend.define_symbol("k_add", entry(0x10)), None);
        assert_eq!(backend.define_symbol("k_add", entry(0x20)), Some(entry(0x10)));

        let view = backend.view();
        assert_eq!(view.resolve_symbol("k_add"), Some(entry(0x20)));
        assert_eq!(view.resolve_symbol("k_sub"), None);
    }

    #[test]
    fn test_remove_symbol() {
        let backend = SymbolTableBackend::new("host");
        backend.define_symbol("k", entry(0x10));
        assert_eq!(backend.remove_symbol("k"), Some(entry(0x10)));
        assert_eq!(backend.symbol_count(), 0);
    }

    #[test]
    fn test_declared_fields() {
        let backend = SymbolTableBackend::new("host");
        backend.declare_field(FieldDescriptor::new("x", TypeTag::F32, vec![8]));

        let view = backend.view();
        let declared = view.describe_declared_field("x").unwrap();
        assert_eq!(declared.shape, vec![8]);
        assert!(view.describe_declared_field("y").is_none());
    }

    #[test]
    fn test_view_is_a_snapshot() {
        let backend = SymbolTableBackend::new("host");
        backend.define_symbol("k", entry(0x10));

        let view = backend.view();
        // Writers block while a view is alive.
        assert!(backend.table.try_write().is_none());
        drop(view);
        assert!(backend.table.try_write().is_some());
    }

    #[test]
    fn test_target_arch() {
        assert_eq!(SymbolTableBackend::new("a").target_arch(), None);
        assert_eq!(
            SymbolTableBackend::new("b").with_target_arch("aarch64").target_arch(),
            Some("aarch64")
        );
    }
}
