use crate::{compile, CompileError, ExpandOptions};
use kir_model::*;

fn single(body: &str) -> Component {
    let source = format!("App {{ Text {{ {} }} }}", body);
    let expansion = compile(&source, ExpandOptions::default()).expect("Failed to expand");
    expansion.tree.children()[0].clone()
}

fn single_err(body: &str) -> CompileError {
    let source = format!("App {{ Text {{ {} }} }}", body);
    compile(&source, ExpandOptions::default()).expect_err("expansion should fail")
}

fn style(component: &Component) -> &Style {
    component.style.as_deref().expect("style")
}

#[test]
fn test_color_forms() {
    let node = single("background = #3366ff; color = red; borderColor = rgba(0, 0, 0, 0.5)");
    let s = style(&node);
    assert_eq!(s.background, Color::Solid(Rgba::opaque(0x33, 0x66, 0xff)));
    assert_eq!(s.font.color, Color::Solid(Rgba::opaque(255, 0, 0)));
    assert_eq!(s.border.color, Color::Solid(Rgba::new(0, 0, 0, 128)));

    let vars = single("background = var(3); color = gradient(1)");
    assert_eq!(style(&vars).background, Color::Variable(3));
    assert_eq!(style(&vars).font.color, Color::Gradient(1));
}

#[test]
fn test_dimensions_and_spacing() {
    let node = single("width = 50%; height = 120; margin = [4, 8]; padding = [1, 2, 3, 4]");
    let s = style(&node);
    assert_eq!(s.width, Dimension::percent(50.0));
    assert_eq!(s.height, Dimension::px(120.0));
    assert_eq!(s.margin, Spacing::symmetric(4.0, 8.0));
    assert_eq!(
        s.padding,
        Spacing {
            top: 1.0,
            right: 2.0,
            bottom: 3.0,
            left: 4.0
        }
    );

    let auto = single("width = auto; height = 1fr");
    assert!(style(&auto).width.is_auto());
    assert_eq!(style(&auto).height, Dimension::flex(1.0));
}

#[test]
fn test_typography_and_visibility() {
    let node = single(
        "fontSize = 18; fontWeight = bold; fontFamily = \"Inter\"; italic = true; \
         textAlign = center; opacity = 0.5; visible = false; zIndex = 3",
    );
    let s = style(&node);
    assert_eq!(s.font.size, 18.0);
    assert_eq!(s.font.weight, 700);
    assert_eq!(s.font.family.as_deref(), Some("Inter"));
    assert!(s.font.italic);
    assert_eq!(s.font.align, TextAlign::Center);
    assert_eq!(s.opacity, 0.5);
    assert!(!s.visible);
    assert_eq!(s.z_index, 3);
}

#[test]
fn test_layout_properties() {
    let node = single("direction = row; gap = 12; justify = spaceBetween; align = center; grow = 1; wrap = true");
    let layout = node.layout.expect("layout");
    assert_eq!(layout.direction, Direction::Row);
    assert_eq!(layout.gap, 12.0);
    assert_eq!(layout.main_axis, Alignment::SpaceBetween);
    assert_eq!(layout.cross_axis, Alignment::Center);
    assert_eq!(layout.grow, 1.0);
    assert!(layout.wrap);
    assert!(node.style.is_none());
}

#[test]
fn test_effects() {
    let node = single(
        "animation = animation(\"pulse\", 1000, easeInOut, infinite); \
         transition = transition(\"opacity\", 200); \
         shadow = shadow(0, 2, 4, #00000040); \
         filter = [blur(4), grayscale(1)]",
    );
    let s = style(&node);
    assert_eq!(s.animations.len(), 1);
    assert_eq!(s.animations[0].name, "pulse");
    assert_eq!(s.animations[0].duration_ms, 1000.0);
    assert_eq!(s.animations[0].easing, Easing::EaseInOut);
    assert_eq!(s.animations[0].iteration_count, INFINITE_ITERATIONS);
    assert_eq!(s.transitions[0].property, "opacity");
    assert_eq!(s.transitions[0].duration_ms, 200.0);
    assert_eq!(s.shadows[0].blur, 4.0);
    assert_eq!(s.shadows[0].color, Color::Solid(Rgba::new(0, 0, 0, 0x40)));
    assert_eq!(
        s.filters,
        vec![
            Filter { kind: FilterKind::Blur, value: 4.0 },
            Filter { kind: FilterKind::Grayscale, value: 1.0 },
        ]
    );
}

#[test]
fn test_capped_arrays_are_enforced() {
    let filters = vec!["blur(1)"; STYLE_ARRAY_CAP + 1].join(", ");
    let err = single_err(&format!("filter = [{}]", filters));
    assert!(matches!(
        err,
        CompileError::CapExceeded { field: "filters", cap: STYLE_ARRAY_CAP, .. }
    ));

    let at_cap = vec!["blur(1)"; STYLE_ARRAY_CAP].join(", ");
    let node = single(&format!("filter = [{}]", at_cap));
    assert_eq!(style(&node).filters.len(), STYLE_ARRAY_CAP);
}

#[test]
fn test_pseudo_and_breakpoint_blocks() {
    let node = single(
        "@hover { background = #eeeeee; opacity = 0.9 } \
         @breakpoint(0, 600px) { width = 100%; visible = false }",
    );
    let s = style(&node);
    assert_eq!(s.pseudo_styles.len(), 1);
    let hover = &s.pseudo_styles[0];
    assert_eq!(hover.state, PseudoState::Hover);
    assert_eq!(hover.background, Some(Color::Solid(Rgba::opaque(0xee, 0xee, 0xee))));
    assert_eq!(hover.opacity, Some(0.9));

    assert_eq!(s.breakpoints.len(), 1);
    let bp = &s.breakpoints[0];
    assert_eq!(bp.max_width, 600.0);
    assert_eq!(bp.width, Some(Dimension::percent(100.0)));
    assert!(bp.hidden);

    let unknown = single_err("@wiggle { opacity = 1 }");
    assert!(matches!(unknown, CompileError::InvalidProperty { .. }));
}

#[test]
fn test_unknown_properties_become_custom_data() {
    let node = single("variant = \"primary\"; tags = [\"a\", 2]; text = \"x\"");
    let custom: serde_json::Value =
        serde_json::from_str(node.custom_data.as_deref().expect("custom data")).expect("json");
    assert_eq!(custom, serde_json::json!({ "tags": ["a", 2], "variant": "primary" }));
}

#[test]
fn test_invalid_values() {
    assert!(matches!(
        single_err("opacity = 2"),
        CompileError::InvalidProperty { ref name, .. } if name == "opacity"
    ));
    assert!(matches!(
        single_err("direction = diagonal"),
        CompileError::InvalidProperty { ref name, .. } if name == "direction"
    ));
    assert!(matches!(
        single_err("text = titel"),
        CompileError::UnresolvedReference { ref name, .. } if name == "titel"
    ));
    assert!(matches!(
        single_err("text = \"hi {nme}\""),
        CompileError::UnresolvedReference { ref name, .. } if name == "nme"
    ));
    assert!(matches!(
        single_err("width = \"wide\""),
        CompileError::InvalidProperty { ref name, .. } if name == "width"
    ));
}

#[test]
fn test_expressions_fold() {
    let node = single("width = 10px * 2 + 5px; text = \"n=\" + (1 + 2); gap = 3");
    assert_eq!(style(&node).width, Dimension::px(25.0));
    assert_eq!(node.text.as_deref(), Some("n=3"));
}
