use crate::ast::*;
use crate::{parse, parse_expression, ParseError, Parser};

const COUNTER: &str = r#"
const theme = "dark"
const tabs = ["Home", "About"]

component Card(title = "Untitled", elevated = false) {
    Column {
        padding = 8
        Text { text = title }
        slot
        slot footer { Text { text = "default footer" } }
    }
}

component FancyCard(accent = #ff00ff) extends Card {
    background = accent
}

App {
    state count: int = 0
    Column {
        Text { text = "Count: {count}" }
        Button { text = "+"; onClick = increment() }
        static if theme == "dark" { Text { text = "dark" } } else { Text { text = "light" } }
        static for tab in tabs { Text { text = tab } }
        if count > 5 { Text { text = "big" } }
        Card(title = "Hello") {
            Text { text = "body" }
            insert footer { Text { text = "f" } }
        }
        @hover { background = #eeeeee; opacity = 0.9 }
        @breakpoint(0, 600px) { width = 100% }
    }
}
"#;

fn first_element(block: &Block) -> &Element {
    block
        .items
        .iter()
        .find_map(|item| match item {
            Item::Element(e) => Some(e),
            _ => None,
        })
        .expect("block has an element")
}

#[test]
fn test_parse_document_sections() {
    let doc = parse(COUNTER).expect("Failed to parse");
    assert_eq!(doc.consts.len(), 2);
    assert_eq!(doc.components.len(), 2);
    assert_eq!(doc.roots.len(), 1);
    assert_eq!(doc.roots[0].name, "App");
}

#[test]
fn test_parse_component_params_and_extends() {
    let doc = parse(COUNTER).expect("Failed to parse");
    let card = doc.component("Card").expect("Card");
    let names: Vec<_> = card.params.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["title", "elevated"]);
    assert!(card.extends.is_none());

    let fancy = doc.component("FancyCard").expect("FancyCard");
    assert_eq!(fancy.extends.as_deref(), Some("Card"));
    assert!(matches!(
        fancy.params[0].default,
        Some(Expression::Color { ref hex, .. }) if hex == "ff00ff"
    ));
    assert_eq!(fancy.body.properties().count(), 1);
}

#[test]
fn test_parse_slots() {
    let doc = parse(COUNTER).expect("Failed to parse");
    let card = doc.component("Card").expect("Card");
    let column = first_element(&card.body);
    let slots: Vec<&SlotDecl> = column
        .body
        .items
        .iter()
        .filter_map(|item| match item {
            Item::Slot(s) => Some(s),
            _ => None,
        })
        .collect();
    assert_eq!(slots.len(), 2);
    assert_eq!(slots[0].name, None);
    assert!(slots[0].fallback.is_none());
    assert_eq!(slots[1].name.as_deref(), Some("footer"));
    assert!(slots[1].fallback.is_some());
}

#[test]
fn test_parse_state_and_directives() {
    let doc = parse(COUNTER).expect("Failed to parse");
    let app = &doc.roots[0];
    let state = app.body.states().next().expect("state");
    assert_eq!(state.name, "count");
    assert_eq!(state.type_name.as_deref(), Some("int"));

    let column = first_element(&app.body);
    let ifs: Vec<&IfBlock> = column
        .body
        .items
        .iter()
        .filter_map(|item| match item {
            Item::If(i) => Some(i),
            _ => None,
        })
        .collect();
    assert_eq!(ifs.len(), 2);
    assert!(ifs[0].is_static);
    assert!(ifs[0].else_block.is_some());
    assert!(!ifs[1].is_static);

    let static_for = column
        .body
        .items
        .iter()
        .find_map(|item| match item {
            Item::For(f) => Some(f),
            _ => None,
        })
        .expect("for");
    assert!(static_for.is_static);
    assert_eq!(static_for.item, "tab");
    assert_eq!(static_for.template, "Text { text = tab }");
}

#[test]
fn test_parse_instance_args_and_inserts() {
    let doc = parse(COUNTER).expect("Failed to parse");
    let column = first_element(&doc.roots[0].body);
    let card = column
        .body
        .items
        .iter()
        .find_map(|item| match item {
            Item::Element(e) if e.name == "Card" => Some(e),
            _ => None,
        })
        .expect("Card instance");
    assert_eq!(card.args.len(), 1);
    assert_eq!(card.args[0].name, "title");
    assert!(card
        .body
        .items
        .iter()
        .any(|item| matches!(item, Item::Insert(i) if i.slot == "footer")));
}

#[test]
fn test_parse_pseudo_and_breakpoint() {
    let doc = parse(COUNTER).expect("Failed to parse");
    let column = first_element(&doc.roots[0].body);
    let pseudo = column
        .body
        .items
        .iter()
        .find_map(|item| match item {
            Item::Pseudo(p) => Some(p),
            _ => None,
        })
        .expect("pseudo block");
    assert_eq!(pseudo.state, "hover");
    assert_eq!(pseudo.properties.len(), 2);

    let breakpoint = column
        .body
        .items
        .iter()
        .find_map(|item| match item {
            Item::Breakpoint(b) => Some(b),
            _ => None,
        })
        .expect("breakpoint block");
    assert!(matches!(
        breakpoint.max,
        Expression::Dimension { value, unit: Unit::Px, .. } if value == 600.0
    ));
}

#[test]
fn test_template_string_interpolation() {
    let expr = parse_expression(r#""Count: {count + 1}!""#).expect("expression");
    match expr {
        Expression::Template { parts, .. } => {
            assert_eq!(parts.len(), 3);
            assert_eq!(parts[0], TemplatePart::Literal("Count: ".into()));
            assert!(matches!(
                &parts[1],
                TemplatePart::Expression(Expression::Binary { operator: BinaryOp::Add, .. })
            ));
            assert_eq!(parts[2], TemplatePart::Literal("!".into()));
        }
        other => panic!("expected template, got {:?}", other),
    }

    let plain = parse_expression(r#""a \{b\} c""#).expect("expression");
    assert!(matches!(plain, Expression::Literal { ref value, .. } if value == "a {b} c"));
}

#[test]
fn test_interpolation_spans_are_absolute() {
    let source = r#"Text { text = "hi {name}" }"#;
    let doc = parse(source).expect("Failed to parse");
    let prop = doc.roots[0].body.properties().next().expect("property");
    let Expression::Template { parts, .. } = &prop.value else {
        panic!("expected template");
    };
    let TemplatePart::Expression(inner) = &parts[1] else {
        panic!("expected interpolation");
    };
    let span = inner.span();
    assert_eq!(&source[span.start..span.end], "name");
}

#[test]
fn test_operator_precedence() {
    let expr = parse_expression("a || b && c == 1 + 2 * 3").expect("expression");
    let Expression::Binary { operator, right, .. } = expr else {
        panic!("expected binary");
    };
    assert_eq!(operator, BinaryOp::Or);
    let Expression::Binary { operator, .. } = *right else {
        panic!("expected binary");
    };
    assert_eq!(operator, BinaryOp::And);

    assert_eq!(
        parse_expression("!ready && -x < 3")
            .expect("expression")
            .free_variables(),
        vec!["ready", "x"]
    );
}

#[test]
fn test_member_and_call_expressions() {
    let expr = parse_expression("theme.colors.primary").expect("expression");
    assert!(matches!(expr, Expression::Member { ref property, .. } if property == "primary"));

    let call = parse_expression("rgba(255, 0, 0, 0.5)").expect("expression");
    assert!(matches!(call, Expression::Call { ref function, ref arguments, .. }
        if function == "rgba" && arguments.len() == 4));
}

#[test]
fn test_errors_carry_spans() {
    let err = parse("App { text = }").expect_err("should fail");
    assert!(matches!(err, ParseError::UnexpectedToken { .. }));
    assert_eq!(err.span().start, 13);

    let eof = parse("App { Column {").expect_err("should fail");
    assert!(matches!(eof, ParseError::UnexpectedEof { .. }));

    let lex = parse("App { text = $ }").expect_err("should fail");
    assert_eq!(lex, ParseError::LexerError { span: Span::new(13, 14) });

    let unclosed = parse(r#"Text { text = "a {b" }"#).expect_err("should fail");
    assert!(matches!(unclosed, ParseError::InvalidSyntax { .. }));
}

#[cfg(feature = "pretty-errors")]
#[test]
fn test_pretty_report_mentions_file() {
    let source = "App { text = }";
    let err = parse(source).expect_err("should fail");
    let report = err.report("app.kry", source);
    assert!(report.contains("app.kry"));
    assert!(report.contains("expected expression"));
}

#[test]
fn test_expression_display_is_reparseable() {
    for source in [
        "count > 5",
        "(a + b) * 2",
        "!ready && user.name == \"x\"",
        "rgba(255, 0, 0, 0.5)",
        "[1, 2px, 50%, #fff]",
        "\"Count: {count}\"",
    ] {
        let expr = parse_expression(source).expect("expression");
        let rendered = expr.to_string();
        let again = parse_expression(&rendered).expect("rendered expression parses");
        assert_eq!(rendered, again.to_string(), "unstable rendering of {}", source);
    }
    assert_eq!(
        parse_expression("count > 5").expect("expression").to_string(),
        "count > 5"
    );
}

#[test]
fn test_if_branches_keep_source() {
    let doc = parse("App { if on { Text { text = \"yes\" } } else { Text { text = \"no\" } } }")
        .expect("Failed to parse");
    let Item::If(block) = &doc.roots[0].body.items[0] else {
        panic!("expected if");
    };
    assert_eq!(block.then_template, "Text { text = \"yes\" }");
    assert_eq!(block.else_template.as_deref(), Some("Text { text = \"no\" }"));
}

fn nested_columns(levels: usize) -> String {
    format!("App {{ {}{} }}", "Column { ".repeat(levels), "} ".repeat(levels))
}

#[test]
fn test_nesting_cap_counts_blocks() {
    // App plus three Columns is four open blocks
    let source = nested_columns(3);
    Parser::new(&source)
        .expect("tokenize")
        .with_max_depth(4)
        .parse_document()
        .expect("four blocks fit");

    let err = Parser::new(&source)
        .expect("tokenize")
        .with_max_depth(3)
        .parse_document()
        .expect_err("should fail");
    assert!(matches!(err, ParseError::NestingTooDeep { depth: 4, max: 3, .. }));
}

#[test]
fn test_leaf_properties_do_not_count_as_blocks() {
    let source = "App { Column { text = (1 + 2) } }";
    Parser::new(source)
        .expect("tokenize")
        .with_max_depth(2)
        .parse_document()
        .expect("expression nesting is counted apart from blocks");
}

#[test]
fn test_nested_expressions_are_capped() {
    let source = format!("{}1{}", "(".repeat(40), ")".repeat(40));
    let err = Parser::new(&source)
        .expect("tokenize")
        .with_max_depth(16)
        .parse_expression()
        .expect_err("should fail");
    assert!(matches!(err, ParseError::NestingTooDeep { max: 16, .. }));

    let negations = format!("{}1", "-".repeat(40));
    let err = Parser::new(&negations)
        .expect("tokenize")
        .with_max_depth(16)
        .parse_expression()
        .expect_err("should fail");
    assert!(matches!(err, ParseError::NestingTooDeep { .. }));
}
