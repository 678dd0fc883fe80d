use super::*;
use serde::{Deserialize, Serialize};
use tempfile::tempdir;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Widget {
    id: Uuid,
    name: String,
}

impl HasId for Widget {
    fn id(&self) -> Uuid {
        self.id
    }
}

#[test]
fn load_on_missing_file_is_empty() {
    let dir = tempdir().unwrap();
    let c: Collection<Widget> = Collection::load(dir.path(), "widgets").unwrap();
    assert!(c.is_empty());
}

#[test]
fn put_then_get_roundtrips() {
    let dir = tempdir().unwrap();
    let c: Collection<Widget> = Collection::load(dir.path(), "widgets").unwrap();
    let w = Widget { id: Uuid::new_v4(), name: "a".into() };
    c.put(w.clone()).unwrap();
    assert_eq!(c.get(w.id), Some(w));
}

#[test]
fn persisted_file_reloads_with_same_contents() {
    let dir = tempdir().unwrap();
    let w1 = Widget { id: Uuid::new_v4(), name: "a".into() };
    let w2 = Widget { id: Uuid::new_v4(), name: "b".into() };
    {
        let c: Collection<Widget> = Collection::load(dir.path(), "widgets").unwrap();
        c.put(w1.clone()).unwrap();
        c.put(w2.clone()).unwrap();
    }
    let c: Collection<Widget> = Collection::load(dir.path(), "widgets").unwrap();
    assert_eq!(c.len(), 2);
    assert_eq!(c.get(w1.id), Some(w1));
    assert_eq!(c.get(w2.id), Some(w2));
}

#[test]
fn list_preserves_insertion_order() {
    let dir = tempdir().unwrap();
    let c: Collection<Widget> = Collection::load(dir.path(), "widgets").unwrap();
    let w1 = Widget { id: Uuid::new_v4(), name: "first".into() };
    let w2 = Widget { id: Uuid::new_v4(), name: "second".into() };
    c.put(w1.clone()).unwrap();
    c.put(w2.clone()).unwrap();
    let names: Vec<_> = c.list().into_iter().map(|w| w.name).collect();
    assert_eq!(names, vec!["first", "second"]);
}

#[test]
fn update_mutates_in_place_and_persists() {
    let dir = tempdir().unwrap();
    let c: Collection<Widget> = Collection::load(dir.path(), "widgets").unwrap();
    let w = Widget { id: Uuid::new_v4(), name: "a".into() };
    c.put(w.clone()).unwrap();
    let updated = c.update(w.id, |item| item.name = "b".into()).unwrap();
    assert_eq!(updated.unwrap().name, "b");
    assert_eq!(c.get(w.id).unwrap().name, "b");
}

#[test]
fn update_on_missing_id_returns_none() {
    let dir = tempdir().unwrap();
    let c: Collection<Widget> = Collection::load(dir.path(), "widgets").unwrap();
    let result = c.update(Uuid::new_v4(), |item| item.name = "b".into()).unwrap();
    assert!(result.is_none());
}

#[test]
fn remove_deletes_and_persists() {
    let dir = tempdir().unwrap();
    let c: Collection<Widget> = Collection::load(dir.path(), "widgets").unwrap();
    let w = Widget { id: Uuid::new_v4(), name: "a".into() };
    c.put(w.clone()).unwrap();
    let removed = c.remove(w.id).unwrap();
    assert!(removed.is_some());
    assert!(c.get(w.id).is_none());
    assert_eq!(c.len(), 0);
}

#[test]
fn list_filter_applies_predicate() {
    let dir = tempdir().unwrap();
    let c: Collection<Widget> = Collection::load(dir.path(), "widgets").unwrap();
    c.put(Widget { id: Uuid::new_v4(), name: "keep".into() }).unwrap();
    c.put(Widget { id: Uuid::new_v4(), name: "drop".into() }).unwrap();
    let kept = c.list_filter(|w| w.name == "keep");
    assert_eq!(kept.len(), 1);
}
