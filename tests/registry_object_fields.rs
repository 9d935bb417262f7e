use rich_readme::{
    AutoSync, Document, DocumentSnapshot, IdAllocator, IdCollision, ObjectFieldRegistry, ObjectId,
    ObjectIdPair, RegistryConfig,
};
use std::ops::RangeInclusive;

/// Always proposes the same id.
#[derive(Debug)]
struct Fixed(i32);

impl IdAllocator for Fixed {
    fn next_candidate(&mut self, _range: &RangeInclusive<i32>) -> ObjectId {
        ObjectId(self.0)
    }
}

fn pair(id: i32, object: &str) -> ObjectIdPair<String> {
    ObjectIdPair {
        id: ObjectId(id),
        display_name: object.to_string(),
        object: Some(object.to_string()),
    }
}

fn document_with(rich_text: &str, pairs: Vec<ObjectIdPair<String>>) -> Document<String> {
    Document::from_snapshot(DocumentSnapshot {
        rich_text: rich_text.to_string(),
        text_area_object_fields: Vec::new(),
        object_id_pairs: pairs,
    })
}

#[test]
fn test_same_object_gets_same_id_until_clear() {
    let mut registry = ObjectFieldRegistry::<String>::new();
    let camera = "Main Camera".to_string();
    let first = registry.get_id_from_object(&camera);
    assert_eq!(registry.get_id_from_object(&camera), first);
    assert_eq!(registry.pairs()[0].display_name, "Main Camera");

    registry.clear();
    assert!(registry.is_empty());
    assert!(!registry.contains_id(first));
}

#[test]
fn test_distinct_objects_get_distinct_ids() {
    let mut registry = ObjectFieldRegistry::<String>::new();
    let ids: Vec<ObjectId> = (0..200)
        .map(|n| registry.get_id_from_object(&format!("object-{n}")))
        .collect();
    let mut unique = ids.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), ids.len());
}

#[test]
fn test_colliding_registration_keeps_first_pair() {
    let mut registry = ObjectFieldRegistry::<String>::with_allocator(
        Box::new(Fixed(5)),
        RegistryConfig::default(),
    );
    let id = registry.get_id_from_object(&"first".to_string());
    assert_eq!(id, ObjectId(5));

    let collision = registry.add_object_id_pair(Some("second".to_string()), id, "second");
    assert_eq!(collision, Err(IdCollision::IdTaken { id }));
    assert_eq!(registry.len(), 1);
    assert_eq!(
        registry.get_object_from_id(id, AutoSync::Disabled),
        Some("first".to_string())
    );
}

#[test]
fn test_allocation_skips_taken_ids() {
    let mut registry = ObjectFieldRegistry::<String>::with_allocator(
        Box::new(Fixed(5)),
        RegistryConfig {
            id_range: 5..=7,
            max_allocation_attempts: 3,
        },
    );
    assert_eq!(registry.get_id_from_object(&"a".to_string()), ObjectId(5));
    assert_eq!(registry.get_id_from_object(&"b".to_string()), ObjectId(6));
    assert_eq!(registry.get_id_from_object(&"c".to_string()), ObjectId(7));
}

#[test]
fn test_scenario_c_placeholder_resolves_both_ways() {
    let document = document_with(r#"See <o="0000007"></o>."#, vec![pair(7, "X")]);
    let mut registry = ObjectFieldRegistry::new();
    assert!(document.discover_object_fields(&mut registry).is_empty());

    assert_eq!(
        registry.get_object_from_id(ObjectId(7), AutoSync::Disabled),
        Some("X".to_string())
    );
    assert_eq!(registry.get_id_from_object(&"X".to_string()), ObjectId(7));
}

#[test]
fn test_lookup_miss_rebuilds_from_open_documents() {
    let document = document_with(r#"<o="0000007"></o>"#, vec![pair(7, "X")]);
    let mut registry = ObjectFieldRegistry::new();

    assert_eq!(registry.get_object_from_id(ObjectId(7), AutoSync::Disabled), None);
    assert_eq!(
        document.resolve_object_field(ObjectId(7), &mut registry, &[&document]),
        Some("X".to_string())
    );
    assert!(registry.contains_id(ObjectId(7)));
}

#[test]
fn test_unresolvable_id_is_flagged_missing() {
    let document = document_with(r#"<o="0000008"></o>"#, Vec::new());
    let mut registry = ObjectFieldRegistry::new();

    assert_eq!(document.missing_object_fields(&registry), vec![ObjectId(8)]);
    assert_eq!(
        document.resolve_object_field(ObjectId(8), &mut registry, &[&document]),
        None
    );
    assert!(registry.is_missing(ObjectId(8)));
}

#[test]
fn test_rebuild_reports_cross_document_collisions() {
    let first = document_with(r#"<o="0000003"></o>"#, vec![pair(3, "Cube")]);
    let second = document_with(r#"<o="0000003"></o>"#, vec![pair(3, "Sphere")]);
    let mut registry = ObjectFieldRegistry::new();

    let collisions = registry.rebuild([&first, &second]);
    assert_eq!(collisions, vec![IdCollision::IdTaken { id: ObjectId(3) }]);
    assert_eq!(registry.len(), 1);
    assert_eq!(
        registry.get_object_from_id(ObjectId(3), AutoSync::Disabled),
        Some("Cube".to_string())
    );
}

#[test]
fn test_rebuild_ignores_unreferenced_pairs() {
    let document = document_with("no fields here", vec![pair(3, "Cube")]);
    let mut registry = ObjectFieldRegistry::new();
    assert!(registry.rebuild([&document]).is_empty());
    assert!(registry.is_empty());
}

#[test]
fn test_resync_restores_lookup_from_pairs() {
    let mut registry = ObjectFieldRegistry::<String>::new();
    registry
        .add_object_id_pair(Some("Lamp".to_string()), ObjectId(11), "Lamp")
        .unwrap();
    registry.resync();
    assert_eq!(registry.get_id_from_object(&"Lamp".to_string()), ObjectId(11));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_resolve_falls_back_to_own_document() {
    let document = document_with(r#"see <o="0000007"></o>"#, vec![pair(7, "X")]);
    let mut registry = ObjectFieldRegistry::new();
    assert_eq!(
        document.resolve_object_field(ObjectId(7), &mut registry, &[]),
        Some("X".to_string())
    );
    assert!(!registry.is_missing(ObjectId(7)));
}
