use crate::*;

fn counter_manifest() -> ReactiveManifest {
    let mut manifest = ReactiveManifest::new();
    let count = manifest
        .add_variable("count", VarValue::Int(0), Some("app.kry:2:5".into()))
        .expect("declare count");
    manifest
        .add_binding(
            ComponentBinding::new(ComponentId(10), count, BindingKind::Text)
                .with_expression("Count: {count}"),
        )
        .expect("bind count");
    manifest
}

fn tree_with(ids: &[u32]) -> Component {
    let mut root = Component::new(ComponentId(ids[0]), ComponentType::Column);
    for &n in &ids[1..] {
        root.push_child(Component::new(ComponentId(n), ComponentType::Text));
    }
    root
}

#[test]
fn test_counter_variable_identity() {
    let mut manifest = counter_manifest();
    let var = manifest.variable_by_name("count").expect("count exists");
    assert_eq!(var.id, VariableId(1));
    assert_eq!(var.var_type(), VarType::Int);
    assert_eq!(var.value, VarValue::Int(0));
    assert_eq!(var.version, 0);
    assert_eq!(var.binding_count, 1);
    assert_eq!(manifest.bindings[0].kind, BindingKind::Text);

    assert_eq!(manifest.set_value(VariableId(1), VarValue::Int(5)), Ok(true));
    let var = manifest.variable(VariableId(1)).expect("count exists");
    assert_eq!(var.value, VarValue::Int(5));
    assert_eq!(var.version, 1);
    assert_eq!(manifest.bindings[0].variable_id, VariableId(1));
    assert_eq!(manifest.bindings[0].component_id, ComponentId(10));
}

#[test]
fn test_set_same_value_keeps_version() {
    let mut manifest = counter_manifest();
    assert_eq!(manifest.set_value(VariableId(1), VarValue::Int(0)), Ok(false));
    assert_eq!(manifest.variable(VariableId(1)).map(|v| v.version), Some(0));
}

#[test]
fn test_set_value_type_mismatch() {
    let mut manifest = counter_manifest();
    assert_eq!(
        manifest.set_value(VariableId(1), VarValue::String("5".into())),
        Err(ManifestError::TypeMismatch {
            id: VariableId(1),
            expected: VarType::Int,
            found: VarType::String,
        })
    );
    assert_eq!(
        manifest.set_value(VariableId(9), VarValue::Int(1)),
        Err(ManifestError::UnknownVariable(VariableId(9)))
    );
}

#[test]
fn test_duplicate_variable_name_is_rejected() {
    let mut manifest = counter_manifest();
    assert_eq!(
        manifest.add_variable("count", VarValue::Int(1), None),
        Err(ManifestError::DuplicateName("count".into()))
    );
}

#[test]
fn test_reconcile_preserves_live_state() {
    let mut live = counter_manifest();
    live.set_value(VariableId(1), VarValue::Int(5)).expect("set");

    let fresh = counter_manifest();
    let report = live.reconcile(fresh, &tree_with(&[1, 10]));

    assert_eq!(report.preserved, vec![VariableId(1)]);
    let var = live.variable(VariableId(1)).expect("count survives");
    assert_eq!(var.value, VarValue::Int(5));
    assert_eq!(var.version, 1);
    assert_eq!(var.binding_count, 1);
    assert_eq!(report.dropped_bindings, 0);
}

#[test]
fn test_reconcile_follows_renumbered_variable_by_name() {
    let mut live = ReactiveManifest::new();
    live.add_variable("flag", VarValue::Bool(false), None).expect("flag");
    live.add_variable("count", VarValue::Int(0), None).expect("count");
    live.set_value(VariableId(2), VarValue::Int(7)).expect("set");

    let mut fresh = ReactiveManifest::new();
    fresh.add_variable("count", VarValue::Int(0), None).expect("count");

    let report = live.reconcile(fresh, &tree_with(&[1]));
    assert_eq!(report.removed, vec!["flag".to_string()]);
    let count = live.variable_by_name("count").expect("count survives");
    assert_eq!(count.id, VariableId(2));
    assert_eq!(count.value, VarValue::Int(7));
    assert_eq!(report.id_remap, vec![(VariableId(1), VariableId(2))]);
}

#[test]
fn test_reconcile_keeps_ids_when_declaration_inserted_above() {
    let mut live = counter_manifest();
    live.set_value(VariableId(1), VarValue::Int(7)).expect("set");

    // `label` is declared first, so the fresh expansion numbers it 1 and `count` 2.
    let mut fresh = ReactiveManifest::new();
    let label = fresh
        .add_variable("label", VarValue::String("Total".into()), None)
        .expect("label");
    let count = fresh.add_variable("count", VarValue::Int(0), None).expect("count");
    fresh
        .add_binding(ComponentBinding::new(ComponentId(10), count, BindingKind::Text))
        .expect("bind count");
    fresh
        .add_binding(ComponentBinding::new(ComponentId(11), label, BindingKind::Text))
        .expect("bind label");
    fresh.add_conditional(ReactiveConditional {
        component_id: ComponentId(11),
        condition: "count > 5".into(),
        last_result: true,
        suspended: false,
        dependencies: vec![count],
    });

    let report = live.reconcile(fresh, &tree_with(&[1, 10, 11]));

    let count = live.variable(VariableId(1)).expect("count keeps its id");
    assert_eq!(count.name, "count");
    assert_eq!(count.value, VarValue::Int(7));
    let label = live.variable(VariableId(2)).expect("label moved off the live id");
    assert_eq!(label.name, "label");

    assert_eq!(report.preserved, vec![VariableId(1)]);
    assert_eq!(report.added, vec![VariableId(2)]);
    assert_eq!(
        report.id_remap,
        vec![(VariableId(1), VariableId(2)), (VariableId(2), VariableId(1))]
    );

    assert_eq!(live.bindings[0].variable_id, VariableId(1));
    assert_eq!(live.bindings[1].variable_id, VariableId(2));
    assert_eq!(live.conditionals[0].dependencies, vec![VariableId(1)]);
    assert_eq!(live.variable(VariableId(1)).map(|v| v.binding_count), Some(1));
    assert_eq!(report.dropped_bindings, 0);
}

#[test]
fn test_reconcile_resets_on_type_change() {
    let mut live = counter_manifest();
    live.set_value(VariableId(1), VarValue::Int(3)).expect("set");

    let mut fresh = ReactiveManifest::new();
    fresh
        .add_variable("count", VarValue::String("zero".into()), None)
        .expect("count");
    fresh.add_variable("label", VarValue::String("x".into()), None).expect("label");

    let report = live.reconcile(fresh, &tree_with(&[1]));
    assert_eq!(report.reset, vec![VariableId(1)]);
    assert_eq!(report.added, vec![VariableId(2)]);
    let count = live.variable(VariableId(1)).expect("count");
    assert_eq!(count.value, VarValue::String("zero".into()));
    assert_eq!(count.version, 2);
}

#[test]
fn test_reconcile_drops_bindings_to_missing_components() {
    let mut live = counter_manifest();
    let fresh = counter_manifest();
    let report = live.reconcile(fresh, &tree_with(&[1, 11]));
    assert_eq!(report.dropped_bindings, 1);
    assert!(live.bindings.is_empty());
    assert_eq!(live.variable(VariableId(1)).map(|v| v.binding_count), Some(0));
}

#[test]
fn test_reconcile_resumes_suspended_conditional() {
    let cond = |last_result, suspended| ReactiveConditional {
        component_id: ComponentId(20),
        condition: "count > 5".into(),
        last_result,
        suspended,
        dependencies: vec![VariableId(1)],
    };
    let mut live = counter_manifest();
    live.add_conditional(cond(true, true));

    let mut fresh = counter_manifest();
    fresh.add_conditional(cond(false, false));

    let report = live.reconcile(fresh, &tree_with(&[1, 10, 20]));
    assert_eq!(report.resumed_conditionals, vec![ComponentId(20)]);
    let merged = live.conditional_for(ComponentId(20)).expect("conditional");
    assert!(merged.last_result);
    assert!(merged.suspended);
}

#[test]
fn test_reconcile_loop_diff() {
    let for_loop = |children: &[u32]| ReactiveForLoop {
        parent_id: ComponentId(30),
        collection_expr: Some("todos".into()),
        collection_var: None,
        item_template: None,
        children: children.iter().map(|&n| ComponentId(n)).collect(),
    };
    let mut live = ReactiveManifest::new();
    live.add_loop(for_loop(&[31, 32, 33]));
    let mut fresh = ReactiveManifest::new();
    fresh.add_loop(for_loop(&[32, 34, 31]));

    let report = live.reconcile(fresh, &tree_with(&[30, 31, 32, 34]));
    assert_eq!(report.loops.len(), 1);
    let diff = &report.loops[0];
    assert_eq!(diff.reused, vec![ComponentId(32), ComponentId(31)]);
    assert_eq!(diff.created, vec![ComponentId(34)]);
    assert_eq!(diff.removed, vec![ComponentId(33)]);
    assert_eq!(live.loop_for(ComponentId(30)).map(|l| l.children.len()), Some(3));
}

#[test]
fn test_summary_lists_variables() {
    let summary = counter_manifest().summary();
    assert!(summary.contains("1 variables, 1 bindings"));
    assert!(summary.contains("count: Int = 0"));
}
