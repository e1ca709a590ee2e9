use crate::{compile, parse_constant, CompileError, ExpandOptions, Expansion, Value};
use kir_model::{
    BindingKind, Component, ComponentType, EventHandler, EventType, LimitKind, Limits,
    ResourceLimitExceeded, VarValue, VariableId,
};
use std::collections::BTreeMap;

fn expand(source: &str) -> Expansion {
    compile(source, ExpandOptions::default()).expect("Failed to expand")
}

fn expand_err(source: &str) -> CompileError {
    compile(source, ExpandOptions::default()).expect_err("expansion should fail")
}

fn texts(node: &Component) -> Vec<&str> {
    node.iter().filter_map(|c| c.text.as_deref()).collect()
}

fn first_of(tree: &Component, kind: ComponentType) -> &Component {
    tree.iter()
        .find(|c| c.kind == kind)
        .unwrap_or_else(|| panic!("no {:?} in tree", kind))
}

const COUNTER: &str = r#"
App {
    state count: int = 0
    Column {
        Text { text = "Count: {count}" }
        Button { text = "+"; onClick = increment() }
        Button { text = "-"; onClick = decrement(1) }
    }
}
"#;

#[test]
fn test_counter_manifest() {
    let expansion = expand(COUNTER);
    let manifest = &expansion.manifest;

    assert_eq!(manifest.variables.len(), 1);
    let count = &manifest.variables[0];
    assert_eq!(count.id, VariableId(1));
    assert_eq!(count.name, "count");
    assert_eq!(count.value, VarValue::Int(0));
    assert_eq!(count.version, 0);
    assert_eq!(count.binding_count, 1);
    assert!(count
        .source_location
        .as_deref()
        .is_some_and(|loc| loc.starts_with("<input>:3:")));

    assert_eq!(manifest.bindings.len(), 1);
    let binding = &manifest.bindings[0];
    assert_eq!(binding.kind, BindingKind::Text);
    assert_eq!(binding.variable_id, VariableId(1));
    assert_eq!(binding.expression.as_deref(), Some("\"Count: {count}\""));

    let text = first_of(&expansion.tree, ComponentType::Text);
    assert_eq!(binding.component_id, text.id);
    assert_eq!(text.text.as_deref(), Some("Count: 0"));
}

#[test]
fn test_event_handlers() {
    let expansion = expand(COUNTER);
    let buttons: Vec<&Component> = expansion
        .tree
        .iter()
        .filter(|c| c.kind == ComponentType::Button)
        .collect();
    assert_eq!(buttons[0].events, vec![EventHandler::new(EventType::Click, "increment")]);
    assert_eq!(
        buttons[1].events,
        vec![EventHandler::new(EventType::Click, "decrement").with_data("1")]
    );
}

#[test]
fn test_attribute_bindings() {
    let expansion = expand(
        r#"
        App {
            state shown = true
            state size = 14
            Text { visible = shown; fontSize = size; text = "x" }
        }
    "#,
    );
    let manifest = &expansion.manifest;
    assert_eq!(manifest.bindings.len(), 2);
    assert!(manifest.bindings.iter().all(|b| b.kind == BindingKind::Attribute));
    let updates: Vec<_> = manifest
        .bindings
        .iter()
        .map(|b| b.update_code.as_deref())
        .collect();
    assert_eq!(updates, vec![Some("visible"), Some("fontSize")]);

    let text = first_of(&expansion.tree, ComponentType::Text);
    let style = text.style.as_ref().expect("style");
    assert!(style.visible);
    assert_eq!(style.font.size, 14.0);
}

#[test]
fn test_static_if_uses_constants() {
    let source = r#"
        const theme = "dark"
        App { static if theme == "dark" { Text { text = "dark" } } else { Text { text = "light" } } }
    "#;
    assert_eq!(texts(&expand(source).tree), vec!["dark"]);

    let mut constants = BTreeMap::new();
    constants.insert("theme".to_string(), Value::String("light".into()));
    let options = ExpandOptions {
        constants,
        ..ExpandOptions::default()
    };
    let overridden = compile(source, options).expect("Failed to expand");
    assert_eq!(texts(&overridden.tree), vec!["light"]);
    assert!(overridden.manifest.is_empty());
}

#[test]
fn test_static_if_rejects_runtime_state() {
    let err = expand_err(
        r#"
        App {
            state count = 0
            static if count > 5 { Text { } }
        }
    "#,
    );
    assert!(matches!(
        err,
        CompileError::NonStaticCondition { ref name, .. } if name == "count"
    ));

    let undefined = expand_err("App { static if mystery { Text { } } }");
    assert!(matches!(
        undefined,
        CompileError::NonStaticCondition { ref name, .. } if name == "mystery"
    ));
}

#[test]
fn test_static_if_sees_component_params() {
    let expansion = expand(
        r#"
        component Badge(big = false) {
            Row { static if big { Text { text = "BIG" } } else { Text { text = "small" } } }
        }
        App { Badge(big = true) Badge() }
    "#,
    );
    assert_eq!(texts(&expansion.tree), vec!["BIG", "small"]);
}

#[test]
fn test_static_for() {
    let expansion = expand(
        r#"
        const tabs = ["Home", "About"]
        App { Row { static for tab in tabs { Text { text = tab } } } }
    "#,
    );
    let row = first_of(&expansion.tree, ComponentType::Row);
    assert_eq!(texts(row), vec!["Home", "About"]);
    assert_ne!(row.children()[0].id, row.children()[1].id);
    assert!(expansion.manifest.is_empty());
}

#[test]
fn test_static_for_edge_cases() {
    let undefined = expand("App { Row { static for x in nothing { Text { } } } }");
    assert_eq!(first_of(&undefined.tree, ComponentType::Row).children().len(), 0);

    let empty = expand("const items = []\nApp { Row { static for x in items { Text { } } } }");
    assert_eq!(first_of(&empty.tree, ComponentType::Row).children().len(), 0);

    let range = expand(r#"App { Row { static for i in 3 { Text { text = "{i}" } } } }"#);
    assert_eq!(texts(&range.tree), vec!["0", "1", "2"]);

    let runtime = expand_err(
        r#"
        App {
            state items = ["a"]
            static for x in items { Text { } }
        }
    "#,
    );
    assert!(matches!(
        runtime,
        CompileError::NonStaticCondition { ref name, .. } if name == "items"
    ));
}

#[test]
fn test_numeric_loop_count_is_capped() {
    for source in [
        "App { Row { static for i in 100000000000 { Text { } } } }",
        "App { Row { for i in 100000000000 { Text { } } } }",
    ] {
        let err = expand_err(source);
        assert!(err.is_resource_limit(), "{}: {:?}", source, err);
        assert!(matches!(
            err,
            CompileError::ResourceLimit(ResourceLimitExceeded {
                kind: LimitKind::ComponentCount,
                ..
            })
        ));
    }
}

fn nested_columns(levels: usize) -> String {
    format!("App {{ {}{} }}", "Column { ".repeat(levels), "} ".repeat(levels))
}

#[test]
fn test_deep_nesting_is_a_resource_limit() {
    let err = expand_err(&nested_columns(1001));
    assert!(err.is_resource_limit(), "{:?}", err);
    assert!(matches!(
        err,
        CompileError::ResourceLimit(ResourceLimitExceeded {
            kind: LimitKind::Depth,
            max: 1000,
            ..
        })
    ));

    // App plus 999 Columns is exactly the default depth
    let deepest = expand(&nested_columns(999));
    assert_eq!(deepest.tree.iter().count(), 1000);
}

#[test]
fn test_component_instances_count_toward_depth() {
    let options = ExpandOptions {
        limits: Limits {
            max_depth: 3,
            ..Limits::default()
        },
        ..ExpandOptions::default()
    };
    // Three blocks deep at most in source, four nodes deep once expanded
    let source = r#"
        component Inner { Row { Text { } } }
        component Outer { Column { Inner } }
        App { Outer }
    "#;
    let err = compile(source, options).expect_err("four levels exceed three");
    assert!(matches!(
        err,
        CompileError::ResourceLimit(ResourceLimitExceeded {
            kind: LimitKind::Depth,
            ..
        })
    ));
}

#[test]
fn test_loop_keys_keep_ids_stable() {
    let before = expand(
        r#"
        const tabs = ["Home", "About"]
        App { Row { static for tab in tabs { Text { text = tab } } } }
    "#,
    );
    let after = expand(
        r#"
        const tabs = ["Intro", "Home", "About"]
        App { Row { static for tab in tabs { Text { text = tab } } } }
    "#,
    );

    let id_of = |tree: &Component, label: &str| {
        tree.iter()
            .find(|c| c.text.as_deref() == Some(label))
            .map(|c| c.id)
            .expect("labelled node")
    };
    assert_eq!(id_of(&before.tree, "Home"), id_of(&after.tree, "Home"));
    assert_eq!(id_of(&before.tree, "About"), id_of(&after.tree, "About"));
}

#[test]
fn test_runtime_if() {
    let expansion = expand(
        r#"
        App {
            state count = 0
            Column {
                if count > 5 { Text { text = "big" } } else { Text { text = "small" } }
            }
        }
    "#,
    );

    let wrapper = first_of(&expansion.tree, ComponentType::Conditional);
    assert_eq!(texts(wrapper), vec!["small"]);
    let custom: serde_json::Value =
        serde_json::from_str(wrapper.custom_data.as_deref().expect("templates")).expect("json");
    assert_eq!(custom["then"], "Text { text = \"big\" }");
    assert_eq!(custom["else"], "Text { text = \"small\" }");

    let manifest = &expansion.manifest;
    let conditional = manifest.conditional_for(wrapper.id).expect("conditional");
    assert_eq!(conditional.condition, "count > 5");
    assert!(!conditional.last_result);
    assert!(!conditional.suspended);
    assert_eq!(conditional.dependencies, vec![VariableId(1)]);

    assert_eq!(manifest.bindings.len(), 1);
    assert_eq!(manifest.bindings[0].kind, BindingKind::Conditional);
    assert_eq!(manifest.bindings[0].component_id, wrapper.id);
}

#[test]
fn test_runtime_for() {
    let expansion = expand(
        r#"
        App {
            state todos = ["a", "b"]
            Column { for todo in todos { Text { text = todo } } }
        }
    "#,
    );

    let manifest = &expansion.manifest;
    assert_eq!(
        manifest.variables[0].value,
        VarValue::Opaque(r#"["a","b"]"#.to_string())
    );

    let wrapper = first_of(&expansion.tree, ComponentType::ForEach);
    assert_eq!(texts(wrapper), vec!["a", "b"]);

    let for_loop = manifest.loop_for(wrapper.id).expect("loop");
    assert_eq!(for_loop.collection_expr.as_deref(), Some("todos"));
    assert_eq!(for_loop.collection_var, Some(VariableId(1)));
    assert_eq!(for_loop.item_template.as_deref(), Some("Text { text = todo }"));
    let child_ids: Vec<_> = wrapper.children().iter().map(|c| c.id).collect();
    assert_eq!(for_loop.children, child_ids);

    // Loop items are constants inside each iteration
    assert_eq!(manifest.bindings.len(), 1);
    assert_eq!(manifest.bindings[0].kind, BindingKind::Loop);

    let undefined = expand_err("App { for x in nowhere { Text { } } }");
    assert!(matches!(
        undefined,
        CompileError::UnresolvedReference { ref name, .. } if name == "nowhere"
    ));
}

#[test]
fn test_component_state_is_per_instance() {
    let expansion = expand(
        r#"
        component Counter { Column { state n = 0; Text { text = "{n}" } } }
        App { Row { Counter Counter } }
    "#,
    );
    let names: Vec<_> = expansion
        .manifest
        .variables
        .iter()
        .map(|v| (v.id, v.name.as_str()))
        .collect();
    assert_eq!(
        names,
        vec![(VariableId(1), "Counter.n"), (VariableId(2), "Counter#2.n")]
    );

    let bound: Vec<_> = expansion
        .manifest
        .bindings
        .iter()
        .map(|b| b.variable_id)
        .collect();
    assert_eq!(bound, vec![VariableId(1), VariableId(2)]);
}

#[test]
fn test_state_errors() {
    let mismatch = expand_err(r#"App { state n: int = "x" }"#);
    assert!(matches!(
        mismatch,
        CompileError::InvalidProperty { ref name, .. } if name == "n"
    ));

    let duplicate = expand_err("App { state a = 1\n state a = 2 }");
    assert!(matches!(duplicate, CompileError::State { ref name, .. } if name == "a"));
}

#[test]
fn test_parse_constant() {
    assert_eq!(parse_constant("dark").expect("constant"), Value::String("dark".into()));
    assert_eq!(parse_constant("42").expect("constant"), Value::Number(42.0));
    assert_eq!(
        parse_constant("\"two words\"").expect("constant"),
        Value::String("two words".into())
    );
    assert_eq!(
        parse_constant("[1, 2]").expect("constant"),
        Value::Array(vec![Value::Number(1.0), Value::Number(2.0)])
    );
    assert!(parse_constant("1 +").is_err());
}
