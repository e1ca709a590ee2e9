/// Determinism tests - ensure expansion is deterministic and reproducible
///
/// These tests validate that:
/// - Same input produces identical trees and manifests across runs
/// - Component ids depend only on source structure
/// - Variable ids follow declaration order
use kir_expander::{compile, ExpandOptions, Expansion};
use kir_model::{Component, ComponentId};

fn expand_many(source: &str) -> Vec<Expansion> {
    (0..10)
        .map(|_| compile(source, ExpandOptions::default()).expect("Failed to expand"))
        .collect()
}

fn ids(tree: &Component) -> Vec<ComponentId> {
    tree.iter().map(|node| node.id).collect()
}

#[test]
fn test_expansion_determinism_simple_tree() {
    let source = r#"
        App {
            Column {
                padding = 8
                Text { text = "Hello" }
                Row { Text { text = "World" } }
            }
        }
    "#;

    let results = expand_many(source);
    for i in 1..results.len() {
        assert_eq!(
            results[0], results[i],
            "Expansion {} differs from expansion 0",
            i
        );
    }
}

#[test]
fn test_expansion_determinism_with_components_and_slots() {
    let source = r#"
        component Card(title = "Untitled") {
            Column {
                Text { text = title }
                slot
                slot footer { Text { text = "footer" } }
            }
        }
        component FancyCard extends Card { background = #ff00ff }
        App {
            Row {
                Card(title = "A") { Text { text = "body" } }
                FancyCard(title = "B") { insert footer { Button { text = "ok" } } }
            }
        }
    "#;

    let results = expand_many(source);
    for i in 1..results.len() {
        assert_eq!(
            ids(&results[0].tree),
            ids(&results[i].tree),
            "Component ids of expansion {} differ (ids must depend only on structure)",
            i
        );
        assert_eq!(results[0].tree, results[i].tree);
    }
}

#[test]
fn test_expansion_determinism_with_state_and_loops() {
    let source = r#"
        const tabs = ["Home", "About", "Contact"]
        App {
            state count: int = 0
            state todos = ["a", "b"]
            Column {
                Text { text = "Count: {count}" }
                Button { text = "+"; onClick = increment() }
                static for tab in tabs { Text { text = tab } }
                if count > 5 { Text { text = "big" } }
                for todo in todos { Text { text = todo } }
            }
        }
    "#;

    let results = expand_many(source);
    for i in 1..results.len() {
        assert_eq!(
            results[0].manifest, results[i].manifest,
            "Manifest {} differs from manifest 0 (variable ids follow declaration order)",
            i
        );
        assert_eq!(results[0].tree, results[i].tree);
    }
}

#[test]
fn test_expansion_json_is_byte_identical() {
    let source = r#"
        App {
            Column {
                Text { variant = "primary"; tags = ["x", "y"]; size = 3; text = "t" }
            }
        }
    "#;

    let dumps: Vec<String> = expand_many(source)
        .iter()
        .map(|expansion| serde_json::to_string(&expansion.tree).expect("serialize tree"))
        .collect();
    for i in 1..dumps.len() {
        assert_eq!(dumps[0], dumps[i], "JSON dump {} differs", i);
    }
}
