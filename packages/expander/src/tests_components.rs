use crate::identity::path_hash;
use crate::{compile, compile_with_registry, CompileError, ExpandOptions, Expansion};
use kir_model::{
    Component, ComponentHandler, ComponentType, ExtensionId, HandlerRegistry, Spacing,
};

fn expand(source: &str) -> Expansion {
    compile(source, ExpandOptions::default()).expect("Failed to expand")
}

fn expand_err(source: &str) -> CompileError {
    compile(source, ExpandOptions::default()).expect_err("expansion should fail")
}

fn texts(node: &Component) -> Vec<&str> {
    node.iter().filter_map(|c| c.text.as_deref()).collect()
}

#[test]
fn test_plain_elements() {
    let expansion = expand(
        r#"
        App {
            Column {
                padding = 8
                Text { text = "Hello" }
            }
        }
    "#,
    );

    let root = &expansion.tree;
    assert_eq!(root.kind, ComponentType::Container);
    let column = &root.children()[0];
    assert_eq!(column.kind, ComponentType::Column);
    assert_eq!(
        column.style.as_ref().expect("style").padding,
        Spacing::uniform(8.0)
    );
    assert_eq!(column.children()[0].text.as_deref(), Some("Hello"));
    assert!(expansion.manifest.is_empty());
    assert!(expansion.warnings.is_empty());
}

#[test]
fn test_component_params_and_defaults() {
    let expansion = expand(
        r#"
        component Card(title = "Untitled") {
            Column { Text { text = title } }
        }
        App { Card(title = "Hello") Card() }
    "#,
    );

    let cards = expansion.tree.children();
    assert_eq!(cards.len(), 2);
    assert!(cards.iter().all(|c| c.kind == ComponentType::Column));
    assert_eq!(texts(&cards[0]), vec!["Hello"]);
    assert_eq!(texts(&cards[1]), vec!["Untitled"]);
    assert_ne!(cards[0].id, cards[1].id);
}

#[test]
fn test_default_and_named_slots() {
    let expansion = expand(
        r#"
        component Card(title = "Untitled") {
            Column {
                Text { text = title }
                slot
                slot footer { Text { text = "default footer" } }
            }
        }
        App {
            Card(title = "A") {
                Text { text = "body" }
                insert footer { Text { text = "custom footer" } }
            }
            Card(title = "B")
        }
    "#,
    );

    let cards = expansion.tree.children();
    assert_eq!(texts(&cards[0]), vec!["A", "body", "custom footer"]);
    assert_eq!(texts(&cards[1]), vec!["B", "default footer"]);
}

#[test]
fn test_slot_content_uses_caller_scope() {
    let expansion = expand(
        r#"
        const title = "outer"
        component Card(title = "inner") { Column { Text { text = title } slot } }
        App { Card { Text { text = title } } }
    "#,
    );
    assert_eq!(texts(&expansion.tree), vec!["inner", "outer"]);
}

#[test]
fn test_nested_instances_in_slots_are_not_recursion() {
    let expansion = expand(
        r#"
        component Card { Column { slot } }
        App { Card { Card { Text { text = "deep" } } } }
    "#,
    );
    let outer = &expansion.tree.children()[0];
    let inner = &outer.children()[0];
    assert_eq!(inner.kind, ComponentType::Column);
    assert_eq!(texts(inner), vec!["deep"]);
}

#[test]
fn test_inheritance_merges_properties_and_fills_slot() {
    let expansion = expand(
        r#"
        component Card(title = "Untitled") {
            Column { padding = 8; Text { text = title }; slot }
        }
        component FancyCard(accent = #ff00ff) extends Card {
            background = accent
            Text { text = "fancy" }
        }
        App { FancyCard(title = "Hi") }
    "#,
    );

    let card = &expansion.tree.children()[0];
    assert_eq!(card.kind, ComponentType::Column);
    let style = card.style.as_ref().expect("style");
    assert_eq!(style.padding, Spacing::uniform(8.0));
    assert_eq!(
        style.background,
        kir_model::Color::Solid(kir_model::Rgba::opaque(255, 0, 255))
    );
    assert_eq!(texts(card), vec!["Hi", "fancy"]);
}

#[test]
fn test_multi_level_inheritance() {
    let expansion = expand(
        r#"
        component Base { Row { gap = 4; slot } }
        component Middle extends Base { Text { text = "m" } }
        component Top extends Middle { Text { text = "t" } }
        App { Top }
    "#,
    );
    let top = &expansion.tree.children()[0];
    assert_eq!(top.kind, ComponentType::Row);
    assert_eq!(texts(top), vec!["m", "t"]);
}

#[test]
fn test_circular_inheritance() {
    let err = expand_err(
        r#"
        component A extends B { }
        component B extends A { }
        App { A }
    "#,
    );
    match err {
        CompileError::CircularInheritance { chain, .. } => {
            assert_eq!(chain, vec!["A", "B", "A"]);
        }
        other => panic!("expected circular inheritance, got {:?}", other),
    }
}

#[test]
fn test_recursive_component() {
    let err = expand_err(
        r#"
        component Loop { Column { Loop } }
        App { Loop }
    "#,
    );
    match err {
        CompileError::RecursiveComponent {
            component,
            call_stack,
            ..
        } => {
            assert_eq!(component, "Loop");
            assert_eq!(call_stack, vec!["Loop", "Loop"]);
        }
        other => panic!("expected recursive component, got {:?}", other),
    }
}

#[test]
fn test_indirect_recursion() {
    let err = expand_err(
        r#"
        component A { Column { B } }
        component B { Row { A } }
        App { A }
    "#,
    );
    assert!(matches!(
        err,
        CompileError::RecursiveComponent { ref call_stack, .. } if call_stack == &["A", "B", "A"]
    ));
}

#[test]
fn test_unresolved_reference_has_location() {
    let err = expand_err("App {\n    Missing\n}");
    match err {
        CompileError::UnresolvedReference { name, location, .. } => {
            assert_eq!(name, "Missing");
            assert_eq!(location.line, 2);
            assert_eq!(location.column, 5);
            assert_eq!(location.to_string(), "<input>:2:5");
        }
        other => panic!("expected unresolved reference, got {:?}", other),
    }
}

#[test]
fn test_file_name_in_locations() {
    let options = ExpandOptions {
        file_name: "app.kry".to_string(),
        ..ExpandOptions::default()
    };
    let err = compile("App { Missing }", options).expect_err("should fail");
    assert_eq!(
        err.location().map(ToString::to_string).as_deref(),
        Some("app.kry:1:7")
    );
}

#[test]
fn test_unknown_slots() {
    let named = expand_err(
        r#"
        component Card { Column { } }
        App { Card { insert footer { Text { } } } }
    "#,
    );
    assert!(matches!(
        named,
        CompileError::UnknownSlot { ref component, ref slot, .. } if component == "Card" && slot == "footer"
    ));

    let default = expand_err(
        r#"
        component Card { Column { } }
        App { Card { Text { } } }
    "#,
    );
    assert!(matches!(default, CompileError::UnknownSlot { ref slot, .. } if slot == "default"));
}

#[test]
fn test_component_needs_single_root() {
    let err = expand_err(
        r#"
        component Pair { Text { } Text { } }
        App { Pair }
    "#,
    );
    assert!(matches!(err, CompileError::InvalidComponent { ref name, .. } if name == "Pair"));
}

#[test]
fn test_root_handling() {
    let multiple = expand(r#"Text { text = "a" } Text { text = "b" }"#);
    assert_eq!(multiple.tree.kind, ComponentType::Container);
    assert_eq!(texts(&multiple.tree), vec!["a", "b"]);

    assert!(matches!(expand_err("const x = 1"), CompileError::MissingRoot));

    let single = expand(r#"Column { Text { text = "only" } }"#);
    assert_eq!(single.tree.kind, ComponentType::Column);
}

#[test]
fn test_ids_are_unique_and_nonzero() {
    let expansion = expand(
        r#"
        component Item(label = "") { Row { Text { text = label } } }
        App { Column { Item(label = "a") Item(label = "b") Item(label = "c") } }
    "#,
    );
    let mut ids: Vec<u32> = expansion.tree.iter().map(|c| c.id.get()).collect();
    assert!(ids.iter().all(|id| *id != 0));
    let total = ids.len();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), total);
}

#[test]
fn test_ids_survive_unrelated_edits() {
    let before = expand(r#"App { Column { Text { text = "a" } Button { text = "b" } } }"#);
    let after = expand(
        r#"App { Column { Image { } Text { text = "a changed" } Button { text = "b" } Row { } } }"#,
    );

    let find = |tree: &Component, kind| {
        tree.iter()
            .find(|c| c.kind == kind)
            .map(|c| c.id)
            .expect("node of kind")
    };
    assert_eq!(find(&before.tree, ComponentType::Text), find(&after.tree, ComponentType::Text));
    assert_eq!(
        find(&before.tree, ComponentType::Button),
        find(&after.tree, ComponentType::Button)
    );
    assert_eq!(before.tree.id, after.tree.id);
}

#[test]
fn test_explicit_id_is_position_independent() {
    let a = expand(r#"App { Column { Text { id = "title"; text = "x" } } }"#);
    let b = expand(r#"App { Row { Column { Text { id = "title"; text = "x" } } } }"#);

    let id_of = |tree: &Component| {
        tree.iter()
            .find(|c| c.kind == ComponentType::Text)
            .map(|c| c.id.get())
            .expect("text")
    };
    assert_eq!(id_of(&a.tree), id_of(&b.tree));
    assert_eq!(id_of(&a.tree), path_hash("#title"));
}

struct Chart;

impl ComponentHandler for Chart {
    fn name(&self) -> &str {
        "Chart"
    }
}

#[test]
fn test_extension_elements_resolve_through_registry() {
    let mut registry = HandlerRegistry::new();
    let chart_id = ExtensionId::new(200).expect("extension id");
    registry.register(chart_id, Box::new(Chart));

    let expansion =
        compile_with_registry("App { Chart { title = \"sales\" } }", ExpandOptions::default(), &registry)
            .expect("Failed to expand");
    let chart = &expansion.tree.children()[0];
    assert_eq!(chart.kind, ComponentType::Extension(chart_id));
    assert_eq!(chart.custom_data.as_deref(), Some(r#"{"title":"sales"}"#));
    assert!(expansion.warnings.is_empty());

    assert!(matches!(
        expand_err("App { Chart { } }"),
        CompileError::UnresolvedReference { ref name, .. } if name == "Chart"
    ));
}
