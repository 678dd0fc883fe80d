use super::*;
use pg_core::Program;
use tempfile::tempdir;

#[test]
fn open_creates_root_dir_and_empty_collections() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("metadata");
    let store = Store::open(&root).unwrap();
    assert!(root.exists());
    assert!(store.programs.is_empty());
    assert!(store.runs.is_empty());
}

#[test]
fn reopen_reloads_prior_writes() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("metadata");
    let program = Program::builder().name("demo").build();
    {
        let store = Store::open(&root).unwrap();
        store.programs.put(program.clone()).unwrap();
    }
    let store = Store::open(&root).unwrap();
    assert_eq!(store.programs.get(program.id.as_uuid()).map(|p| p.name), Some("demo".to_string()));
}
