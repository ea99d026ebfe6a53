use epictree_core::testing::StaticRecordFetcher;
use epictree_core::{assemble, BatchLimit, Edge, Forest, Node, NodeId, RawRecord, WorkItemType};
use epictree_snapshot::{
    FileSnapshotStore, InMemorySnapshotStore, SnapshotError, SnapshotHandle, SnapshotStore,
};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

fn node(id: u32, work_item_type: WorkItemType, parent: Option<u32>, children: &[u32]) -> Node {
    Node {
        id: NodeId(id),
        title: format!("Item {}", id),
        description: Some(format!("<div>Details of {}</div>", id)),
        acceptance_criteria: None,
        work_item_type,
        tags: vec!["web".to_string(), "q3".to_string()],
        parent: parent.map(NodeId),
        children: children.iter().copied().map(NodeId).collect(),
    }
}

fn sample_forest() -> Forest {
    Forest::from_nodes(vec![
        node(1, WorkItemType::Epic, None, &[2, 3]),
        node(2, WorkItemType::Feature, Some(1), &[4]),
        node(4, WorkItemType::Story, Some(2), &[]),
        node(3, WorkItemType::Other("Bug".to_string()), Some(1), &[]),
        node(9, WorkItemType::Epic, None, &[]),
    ])
}

#[tokio::test]
async fn test_file_round_trip_preserves_everything() {
    let dir = tempdir().unwrap();
    let store = FileSnapshotStore::new(dir.path().join("WorkItems.json"));
    let forest = sample_forest();

    let handle = store.save(&forest).await.unwrap();
    assert_eq!(handle, store.handle());
    assert!(store.exists(&handle).await.unwrap());

    let loaded = store.load(&handle).await.unwrap();
    assert_eq!(loaded, forest);
    assert_eq!(loaded.ids(), forest.ids());
    assert_eq!(loaded.get(NodeId(1)).unwrap().children, vec![NodeId(2), NodeId(3)]);
    assert_eq!(loaded.get(NodeId(9)).unwrap().parent, None);
}

#[tokio::test]
async fn test_file_round_trip_empty_forest() {
    let dir = tempdir().unwrap();
    let store = FileSnapshotStore::new(dir.path().join("empty.json"));

    let handle = store.save(&Forest::default()).await.unwrap();
    let loaded = store.load(&handle).await.unwrap();

    assert!(loaded.is_empty());
    let raw = std::fs::read_to_string(dir.path().join("empty.json")).unwrap();
    assert_eq!(raw.trim(), "[]");
}

#[tokio::test]
async fn test_file_snapshot_format() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("WorkItems.json");
    let store = FileSnapshotStore::new(&path);

    store.save(&sample_forest()).await.unwrap();
    let raw = std::fs::read_to_string(&path).unwrap();

    assert!(raw.trim_start().starts_with('['));
    assert!(raw.contains("\"type\": \"Epic\""));
    assert!(raw.contains("\"type\": \"User Story\""));
    assert!(raw.contains("\"acceptanceCriteria\": null"));
    assert!(raw.contains("\"parent\": null"));
    // Pretty printed
    assert!(raw.lines().count() > 5);
}

#[tokio::test]
async fn test_file_save_replaces_previous_and_cleans_up() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("WorkItems.json");
    let store = FileSnapshotStore::new(&path);

    store.save(&sample_forest()).await.unwrap();
    let handle = store.save(&Forest::default()).await.unwrap();

    assert!(store.load(&handle).await.unwrap().is_empty());
    let names: Vec<String> = std::fs::read_dir(path.parent().unwrap())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["WorkItems.json".to_string()]);
}

#[tokio::test]
async fn test_file_load_rejects_inconsistent_snapshot() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(
        &path,
        r#"[
            {"id": 1, "title": "Root", "description": null, "acceptanceCriteria": null,
             "type": "Epic", "tags": [], "parent": null, "children": [2]}
        ]"#,
    )
    .unwrap();

    let store = FileSnapshotStore::new(&path);
    let result = store.load(&SnapshotHandle::from(path.as_path())).await;

    assert!(matches!(result, Err(SnapshotError::Inconsistent { .. })));
}

#[tokio::test]
async fn test_file_load_rejects_parent_cycle() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cycle.json");
    std::fs::write(
        &path,
        r#"[
            {"id": 1, "title": "A", "description": null, "acceptanceCriteria": null,
             "type": "Epic", "tags": [], "parent": 2, "children": [2]},
            {"id": 2, "title": "B", "description": null, "acceptanceCriteria": null,
             "type": "Feature", "tags": [], "parent": 1, "children": [1]}
        ]"#,
    )
    .unwrap();

    let store = FileSnapshotStore::new(&path);
    let result = store.load(&store.handle()).await;

    assert!(matches!(result, Err(SnapshotError::Inconsistent { .. })));
}

#[tokio::test]
async fn test_file_load_rejects_garbage() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("garbage.json");
    std::fs::write(&path, "{ not json").unwrap();

    let store = FileSnapshotStore::new(&path);
    let result = store.load(&store.handle()).await;

    assert!(matches!(result, Err(SnapshotError::Serialization(_))));
}

#[tokio::test]
async fn test_memory_round_trip() {
    let store = InMemorySnapshotStore::new();
    let forest = sample_forest();

    let handle = store.save(&forest).await.unwrap();
    assert_eq!(store.load(&handle).await.unwrap(), forest);

    let empty = store.save(&Forest::default()).await.unwrap();
    assert!(store.load(&empty).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_memory_missing_and_inconsistent() {
    let store = InMemorySnapshotStore::new();
    let unknown = SnapshotHandle::from("snapshot:unknown");
    assert!(matches!(store.load(&unknown).await, Err(SnapshotError::NotFound(_))));

    let handle = SnapshotHandle::from("snapshot:broken");
    store
        .insert_raw(
            handle.clone(),
            br#"[{"id": 2, "title": "Orphan", "description": null, "acceptanceCriteria": null,
                 "type": "Feature", "parent": 1}]"#
                .to_vec(),
        )
        .await;

    assert!(matches!(
        store.load(&handle).await,
        Err(SnapshotError::Inconsistent { .. })
    ));
}

#[tokio::test]
async fn test_assembled_forest_round_trips_with_spelled_out_types() {
    let fetcher = StaticRecordFetcher::with_records([
        RawRecord::new(NodeId(1), "Root", WorkItemType::Other("Epic".to_string())),
        RawRecord::new(NodeId(2), "Child", WorkItemType::Other("user story".to_string())),
    ]);
    let assembly = assemble(&[Edge::root(1), Edge::child(1, 2)], &fetcher, BatchLimit::default())
        .await
        .unwrap();

    let store = InMemorySnapshotStore::new();
    let handle = store.save(&assembly.forest).await.unwrap();
    let loaded = store.load(&handle).await.unwrap();

    assert_eq!(loaded, assembly.forest);
    assert_eq!(loaded.get(NodeId(1)).unwrap().work_item_type, WorkItemType::Epic);
    assert_eq!(loaded.get(NodeId(2)).unwrap().work_item_type, WorkItemType::Story);
}

#[tokio::test]
async fn test_stores_are_usable_as_trait_objects() {
    let dir = tempdir().unwrap();
    let stores: Vec<Box<dyn SnapshotStore>> = vec![
        Box::new(FileSnapshotStore::new(dir.path().join("a.json"))),
        Box::new(InMemorySnapshotStore::new()),
    ];

    for store in &stores {
        let handle = store.save(&sample_forest()).await.unwrap();
        assert_eq!(store.load(&handle).await.unwrap().len(), 5);
    }
}
