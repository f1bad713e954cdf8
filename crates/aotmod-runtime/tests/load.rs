//! Integration tests for loading AOT modules
//!
//! Writes artifact directories to disk, registers backends, and checks the
//! whole read → bind pipeline, including failure atomicity and concurrent
//! loads against a shared backend.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use aotmod_artifact::{write_artifact, METADATA_FILE, VERSION_FILE};
use aotmod_runtime::{
    bind, load, AotModule, BackendRegistry, BackendView, EntryPoint, ErrorKind,
    ExecutionBackend, FieldDescriptor, KernelDescriptor, LoadConfig, LoadError, LoaderOptions,
    ModuleLoader, ModuleMetadata, SymbolTableBackend, TypeTag,
};

extern "C" fn k_add(a: i32, b: i32) -> i32 {
    a + b
}

extern "C" fn k_mul(a: i32, b: i32) -> i32 {
    a * b
}

extern "C" fn k_fill(buf: *mut f32, len: usize, value: f32) {
    let slice = unsafe { std::slice::from_raw_parts_mut(buf, len) };
    slice.fill(value);
}

type BinaryFn = extern "C" fn(i32, i32) -> i32;
type FillFn = extern "C" fn(*mut f32, usize, f32);

fn entry(addr: usize) -> EntryPoint {
    EntryPoint::new(addr).unwrap()
}

fn host_backend() -> SymbolTableBackend {
    let backend = SymbolTableBackend::new("host");
    backend.define_symbol("k_add_sym", entry(k_add as usize));
    backend.define_symbol("k_mul_sym", entry(k_mul as usize));
    backend.define_symbol("k_fill_sym", entry(k_fill as usize));
    backend
}

fn arith_module() -> ModuleMetadata {
    ModuleMetadata::new(2)
        .with_kernel(KernelDescriptor::new(
            "add",
            "k_add_sym",
            vec![TypeTag::I32, TypeTag::I32],
        ))
        .with_kernel(KernelDescriptor::new(
            "mul",
            "k_mul_sym",
            vec![TypeTag::I32, TypeTag::I32],
        ))
        .with_kernel(KernelDescriptor::new(
            "fill",
            "k_fill_sym",
            vec![TypeTag::U64, TypeTag::U64, TypeTag::F32],
        ))
        .with_field(FieldDescriptor::new("pixels", TypeTag::F32, vec![32, 32]))
        .with_field(FieldDescriptor::new("frame", TypeTag::I32, vec![]))
}

fn names(module: &AotModule) -> (Vec<String>, Vec<String>) {
    (
        module.kernel_names().map(str::to_string).collect(),
        module.field_names().map(str::to_string).collect(),
    )
}

#[test]
fn test_load_exposes_every_declared_kernel_and_field() {
    let temp = tempfile::tempdir().unwrap();
    let metadata = arith_module();
    write_artifact(temp.path(), &metadata).unwrap();

    let registry = BackendRegistry::new();
    let id = registry.register(Box::new(host_backend()));

    let module = load(LoadConfig::new(temp.path(), id), &registry).unwrap();

    for kernel in &metadata.kernels {
        let handle = module.get_kernel(&kernel.name).unwrap();
        assert_eq!(handle.argument_signature(), kernel.argument_signature.as_slice());
    }
    for field in &metadata.fields {
        let handle = module.get_field(&field.name).unwrap();
        assert_eq!(handle.descriptor(), field);
    }
    assert_eq!(module.format_version(), 2);
    assert_eq!(module.metadata(), &metadata);
}

#[test]
fn test_add_kernel_scenario() {
    let temp = tempfile::tempdir().unwrap();
    write_artifact(
        temp.path(),
        &ModuleMetadata::new(1).with_kernel(KernelDescriptor::new(
            "add",
            "k_add_sym",
            vec![TypeTag::I32, TypeTag::I32],
        )),
    )
    .unwrap();

    let backend = SymbolTableBackend::new("host");
    backend.define_symbol("k_add_sym", entry(k_add as usize));
    let registry = BackendRegistry::new();
    let id = registry.register(Box::new(backend));

    let module = load(LoadConfig::new(temp.path(), id), &registry).unwrap();

    let add = module.get_kernel("add").expect("add should be bound");
    let f: BinaryFn = unsafe { add.entry().cast() };
    assert_eq!(f(40, 2), 42);

    assert!(module.get_kernel("sub").is_none());
    assert!(module.get_field("sub").is_none());
}

#[test]
fn test_bound_kernel_runs_against_live_buffer() {
    let temp = tempfile::tempdir().unwrap();
    write_artifact(temp.path(), &arith_module()).unwrap();

    let registry = BackendRegistry::new();
    let id = registry.register(Box::new(host_backend()));
    let module = load(LoadConfig::new(temp.path(), id), &registry).unwrap();

    let field = module.get_field("pixels").unwrap();
    let mut buffer = vec![0.0f32; field.element_count().unwrap() as usize];

    let fill: FillFn = unsafe { module.get_kernel("fill").unwrap().entry().cast() };
    fill(buffer.as_mut_ptr(), buffer.len(), 0.5);

    assert_eq!(buffer.len(), 1024);
    assert!(buffer.iter().all(|&v| v == 0.5));
}

#[test]
fn test_unsupported_version_scenario() {
    let temp = tempfile::tempdir().unwrap();
    fs::write(temp.path().join(VERSION_FILE), "99").unwrap();
    fs::write(temp.path().join(METADATA_FILE), r#"{"format_version": 99}"#).unwrap();

    let registry = BackendRegistry::new();
    let id = registry.register(Box::new(host_backend()));

    let err = load(LoadConfig::new(temp.path(), id), &registry).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
}

#[test]
fn test_unresolved_symbol_yields_no_module() {
    let temp = tempfile::tempdir().unwrap();
    write_artifact(temp.path(), &arith_module()).unwrap();

    let backend = host_backend();
    backend.remove_symbol("k_fill_sym");
    let registry = BackendRegistry::new();
    let id = registry.register(Box::new(backend));

    let result = load(LoadConfig::new(temp.path(), id), &registry);
    match result {
        Err(LoadError::UnresolvedSymbol { kernel, symbol }) => {
            assert_eq!(kernel, "fill");
            assert_eq!(symbol, "k_fill_sym");
        }
        other => panic!("Expected UnresolvedSymbol, got {other:?}"),
    }
}

#[test]
fn test_field_mismatch_against_declared_field() {
    let temp = tempfile::tempdir().unwrap();
    write_artifact(temp.path(), &arith_module()).unwrap();

    let backend = host_backend();
    backend.declare_field(FieldDescriptor::new("pixels", TypeTag::F32, vec![64, 16]));
    let registry = BackendRegistry::new();
    let id = registry.register(Box::new(backend));

    let err = load(LoadConfig::new(temp.path(), id), &registry).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FieldMismatch);
    assert!(err.to_string().contains("f32[32, 32]"));
    assert!(err.to_string().contains("f32[64, 16]"));
}

#[test]
fn test_loading_twice_is_idempotent() {
    let temp = tempfile::tempdir().unwrap();
    write_artifact(temp.path(), &arith_module()).unwrap();

    let registry = BackendRegistry::new();
    let id = registry.register(Box::new(host_backend()));

    let first = load(LoadConfig::new(temp.path(), id), &registry).unwrap();
    let second = load(LoadConfig::new(temp.path(), id), &registry).unwrap();

    assert_eq!(names(&first), names(&second));
    assert_eq!(first.kernels(), second.kernels());
    assert_eq!(first.fields(), second.fields());
}

#[test]
fn test_bind_same_metadata_twice() {
    let registry = BackendRegistry::new();
    let id = registry.register(Box::new(host_backend()));
    let metadata = arith_module();

    let a = bind(metadata.clone(), id, &registry).unwrap();
    let b = bind(metadata, id, &registry).unwrap();

    drop(a);
    assert!(b.get_kernel("mul").is_some());
}

#[test]
fn test_lookups_survive_backend_teardown() {
    let temp = tempfile::tempdir().unwrap();
    write_artifact(temp.path(), &arith_module()).unwrap();

    let registry = BackendRegistry::new();
    let id = registry.register(Box::new(host_backend()));
    let module = load(LoadConfig::new(temp.path(), id), &registry).unwrap();
    assert!(module.is_backend_live(&registry));

    let backend = registry.unregister(id).unwrap();
    drop(backend);

    // Lookups still answer from the module's own tables.
    assert!(module.get_kernel("add").is_some());
    assert!(!module.is_backend_live(&registry));

    let err = load(LoadConfig::new(temp.path(), id), &registry).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Backend);
}

#[test]
fn test_options_narrow_versions() {
    let temp = tempfile::tempdir().unwrap();
    write_artifact(temp.path(), &arith_module()).unwrap();

    let registry = BackendRegistry::new();
    let id = registry.register(Box::new(host_backend()));
    let options = LoaderOptions::from_toml_str("min_format_version = 3").unwrap();

    let err = ModuleLoader::new(&registry)
        .with_options(options)
        .load(LoadConfig::new(temp.path(), id))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
}

#[test]
fn test_concurrent_loads_share_one_backend() {
    let temp = tempfile::tempdir().unwrap();
    let dirs: Vec<_> = (0..4)
        .map(|i| {
            let dir = temp.path().join(format!("module-{i}"));
            write_artifact(&dir, &arith_module()).unwrap();
            dir
        })
        .collect();

    let registry = BackendRegistry::new();
    let id = registry.register(Box::new(host_backend()));

    let modules: Vec<AotModule> = std::thread::scope(|scope| {
        let handles: Vec<_> = dirs
            .iter()
            .map(|dir| {
                let registry = &registry;
                scope.spawn(move || load(LoadConfig::new(dir.as_path(), id), registry).unwrap())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let expected = names(&modules[0]);
    for module in &modules {
        assert_eq!(names(module), expected);
        assert_eq!(module.kernels(), modules[0].kernels());
    }
}

#[test]
fn test_concurrent_definitions_never_leak_into_a_bind() {
    let registry = BackendRegistry::new();
    let backend = Arc::new(host_backend());
    let id = registry.register(Box::new(SharedTable(Arc::clone(&backend))));
    let metadata = arith_module();

    std::thread::scope(|scope| {
        scope.spawn(|| {
            for _ in 0..200 {
                backend.remove_symbol("k_mul_sym");
                backend.define_symbol("k_mul_sym", entry(k_mul as usize));
            }
        });

        for _ in 0..200 {
            // Every bind either sees the symbol or fails cleanly.
            match bind(metadata.clone(), id, &registry) {
                Ok(module) => {
                    let mul: BinaryFn = unsafe { module.get_kernel("mul").unwrap().entry().cast() };
                    assert_eq!(mul(6, 7), 42);
                }
                Err(e) => assert_eq!(e.kind(), ErrorKind::UnresolvedSymbol),
            }
        }
    });
}

/// Lets a test keep writing to a backend after handing it to the registry.
struct SharedTable(Arc<SymbolTableBackend>);

impl ExecutionBackend for SharedTable {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn view(&self) -> Box<dyn BackendView + '_> {
        self.0.view()
    }
}

#[cfg(unix)]
#[test]
fn test_dylib_backend_resolves_process_symbols() {
    use aotmod_runtime::DylibBackend;

    let temp = tempfile::tempdir().unwrap();
    write_artifact(
        temp.path(),
        &ModuleMetadata::new(1)
            .with_target_arch(std::env::consts::ARCH)
            .with_kernel(KernelDescriptor::new("length", "strlen", vec![TypeTag::U64])),
    )
    .unwrap();

    let registry = BackendRegistry::new();
    let id = registry.register(Box::new(DylibBackend::with_process_symbols("process").unwrap()));

    let module = load(LoadConfig::new(temp.path(), id), &registry).unwrap();
    let strlen: extern "C" fn(*const std::ffi::c_char) -> usize =
        unsafe { module.get_kernel("length").unwrap().entry().cast() };
    let text = b"kernel\0";
    assert_eq!(strlen(text.as_ptr().cast()), 6);
}

#[test]
fn test_missing_artifact_is_io() {
    let registry = BackendRegistry::new();
    let id = registry.register(Box::new(host_backend()));

    let err = load(
        LoadConfig::new(Path::new("/definitely/not/an/artifact"), id),
        &registry,
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}
