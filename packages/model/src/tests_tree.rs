use crate::*;

fn id(n: u32) -> ComponentId {
    ComponentId(n)
}

fn sample_tree() -> Component {
    Component::new(id(1), ComponentType::Column)
        .with_child(
            Component::new(id(2), ComponentType::Row)
                .with_child(Component::new(id(3), ComponentType::Text).with_text("a"))
                .with_child(Component::new(id(4), ComponentType::Text).with_text("b")),
        )
        .with_child(Component::new(id(5), ComponentType::Button))
}

fn chain(depth: usize) -> Component {
    let mut node = Component::new(id(depth as u32), ComponentType::Container);
    for n in (1..depth).rev() {
        node = Component::new(id(n as u32), ComponentType::Container).with_child(node);
    }
    node
}

#[test]
fn test_preorder_visits_parents_before_children() {
    let tree = sample_tree();
    let ids: Vec<u32> = tree.iter().map(|c| c.id.get()).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_preorder_is_restartable_from_a_clone() {
    let tree = sample_tree();
    let mut walk = tree.iter();
    walk.next();
    let snapshot = walk.clone();

    let rest: Vec<u32> = walk.map(|c| c.id.get()).collect();
    let again: Vec<u32> = snapshot.map(|c| c.id.get()).collect();
    assert_eq!(rest, again);
    assert_eq!(rest, vec![2, 3, 4, 5]);
}

#[test]
fn test_depth_starts_at_one() {
    let tree = sample_tree();
    let depths: Vec<usize> = tree.iter_with_depth().map(|(d, _)| d).collect();
    assert_eq!(depths, vec![1, 2, 3, 3, 2]);
}

#[test]
fn test_find_and_parent_index() {
    let mut tree = sample_tree();
    assert_eq!(tree.find(id(4)).and_then(|c| c.text.as_deref()), Some("b"));
    assert!(tree.find(id(99)).is_none());

    let index = ParentIndex::build(&tree);
    assert_eq!(index.parent_of(id(4)), Some(id(2)));
    assert_eq!(index.parent_of(id(1)), None);
    assert_eq!(index.ancestors(id(3)), vec![id(2), id(1)]);

    if let Some(button) = tree.find_mut(id(5)) {
        button.text = Some("go".into());
    }
    assert_eq!(tree.find(id(5)).and_then(|c| c.text.as_deref()), Some("go"));
}

#[test]
fn test_component_type_tags() {
    assert_eq!(ComponentType::Container.tag(), 0);
    assert_eq!(ComponentType::Text.tag(), 4);
    assert_eq!(ComponentType::Conditional.tag(), 25);
    assert_eq!(ComponentType::from_tag(24), Some(ComponentType::ForEach));
    assert_eq!(ComponentType::from_tag(26), None);
    assert_eq!(ComponentType::from_tag(ComponentType::MAX_BUILTIN_TAG), None);
    assert_eq!(ComponentType::from_tag(32), None);
    assert_eq!(ComponentType::from_tag(127), None);

    let ext = ComponentType::from_tag(200).expect("extension tag");
    assert!(ext.is_extension());
    assert_eq!(ext.tag(), 200);
    assert!(ExtensionId::new(12).is_none());
    assert_eq!(ComponentType::from_name("ListItem"), Some(ComponentType::ListItem));
}

#[test]
fn test_event_type_from_property() {
    assert_eq!(EventType::from_property("onClick"), Some(EventType::Click));
    assert_eq!(EventType::from_property("onChange"), Some(EventType::TextChange));
    assert_eq!(EventType::from_property("onSwipe"), Some(EventType::Custom));
    assert_eq!(EventType::from_property("online"), None);
    assert_eq!(EventType::from_property("width"), None);
}

#[test]
fn test_validate_tree_stats() {
    let stats = validate_tree(&sample_tree(), &Limits::default()).expect("valid tree");
    assert_eq!(stats.node_count, 5);
    assert_eq!(stats.max_depth, 3);
    assert_eq!(stats.text_bytes, 2);
}

#[test]
fn test_validate_rejects_duplicate_and_zero_ids() {
    let dup = Component::new(id(1), ComponentType::Row)
        .with_child(Component::new(id(2), ComponentType::Text))
        .with_child(Component::new(id(2), ComponentType::Text));
    assert_eq!(
        validate_tree(&dup, &Limits::default()),
        Err(StructuralError::DuplicateId { id: id(2) })
    );

    let zero = Component::new(id(1), ComponentType::Row)
        .with_child(Component::new(ComponentId::INVALID, ComponentType::Text));
    assert!(matches!(
        validate_tree(&zero, &Limits::default()),
        Err(StructuralError::ZeroId { depth: 2 })
    ));
}

#[test]
fn test_depth_1001_exceeds_default_limit() {
    let tree = chain(1001);
    match validate_tree(&tree, &Limits::default()) {
        Err(StructuralError::ResourceLimit(err)) => {
            assert_eq!(err.kind, LimitKind::Depth);
            assert_eq!(err.actual, 1001);
            assert_eq!(err.max, 1000);
        }
        other => panic!("expected depth limit, got {:?}", other),
    }

    assert!(validate_tree(&chain(1000), &Limits::default()).is_ok());
}

#[test]
fn test_component_count_and_string_limits() {
    let limits = Limits {
        max_components: 3,
        max_string_length: 4,
        ..Limits::default()
    };
    assert!(matches!(
        validate_tree(&sample_tree(), &limits),
        Err(StructuralError::ResourceLimit(ResourceLimitExceeded {
            kind: LimitKind::ComponentCount,
            ..
        }))
    ));

    let long_text = Component::new(id(1), ComponentType::Text).with_text("hello");
    assert!(matches!(
        validate_tree(&long_text, &Limits { max_string_length: 4, ..Limits::default() }),
        Err(StructuralError::ResourceLimit(ResourceLimitExceeded {
            kind: LimitKind::StringLength,
            ..
        }))
    ));
}

#[test]
fn test_capped_style_array_is_rejected() {
    let mut style = Style::default();
    style.shadows = vec![Shadow::default(); STYLE_ARRAY_CAP + 1];
    let tree = Component::new(id(7), ComponentType::Container).with_style(style);

    assert_eq!(
        validate_tree(&tree, &Limits::default()),
        Err(StructuralError::CapExceeded {
            component: id(7),
            field: "shadows",
            count: 9,
            cap: 8,
        })
    );
}

struct ChartHandler;

impl ComponentHandler for ChartHandler {
    fn name(&self) -> &str {
        "Chart"
    }
}

#[test]
fn test_registry_reports_unhandled_extensions() {
    let chart = ExtensionId::new(130).expect("extension id");
    let map = ExtensionId::new(131).expect("extension id");
    let tree = Component::new(id(1), ComponentType::Column)
        .with_child(Component::new(id(2), ComponentType::Extension(chart)))
        .with_child(Component::new(id(3), ComponentType::Extension(map)));

    let mut registry = HandlerRegistry::new();
    registry.register(chart, Box::new(ChartHandler));

    assert!(registry.has_handler(ComponentType::Text));
    assert!(registry.has_handler(ComponentType::Extension(chart)));
    assert!(!registry.has_handler(ComponentType::Extension(map)));
    assert_eq!(registry.lookup_name("Chart"), Some(ComponentType::Extension(chart)));

    let warnings = registry.unhandled_extensions(&tree);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].component_id, Some(id(3)));
    assert_eq!(warnings[0].code, WarningCode::UnhandledExtension);
}
