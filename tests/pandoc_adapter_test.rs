//! End-to-end tests with a Pandoc adapter written in YAML

use std::path::PathBuf;

use serde_json::json;
use treenorm::{AdapterDefinition, Engine, NormalizedNode};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn pandoc(engine: &Engine) -> AdapterDefinition {
    engine.load_adapter_file(fixture("pandoc.yaml")).unwrap()
}

fn labels(nodes: &[NormalizedNode]) -> Vec<&str> {
    nodes.iter().map(|n| n.label.as_str()).collect()
}

fn document_tree() -> NormalizedNode {
    let engine = Engine::new();
    let adapter = pandoc(&engine);
    let document = treenorm::runtime::load_document(fixture("pandoc_document.json")).unwrap();
    engine.materialize_root(&adapter, &document).unwrap()
}

#[test]
fn test_document_root() {
    let tree = document_tree();

    assert_eq!(tree.node_type.as_deref(), Some("Pandoc"));
    assert_eq!(tree.label, "Pandoc Document");
    assert_eq!(tree.icon.as_deref(), Some("📄"));
    assert_eq!(
        tree.children.iter().filter_map(|c| c.node_type.as_deref()).collect::<Vec<_>>(),
        vec!["Header", "Para", "BulletList", "CodeBlock", "OrderedList"]
    );
}

#[test]
fn test_whitespace_nodes_are_dropped() {
    let tree = document_tree();

    for node in tree.descendants() {
        let node_type = node.node_type.as_deref().unwrap_or_default();
        assert!(!["Space", "SoftBreak", "LineBreak"].contains(&node_type));
    }
}

#[test]
fn test_header() {
    let tree = document_tree();
    let header = &tree.children[0];

    assert_eq!(header.label, "Test Header");
    assert_eq!(header.icon.as_deref(), Some("H"));
    assert_eq!(header.extra["level"], json!(1));
    assert_eq!(labels(&header.children), vec!["Test", "Header"]);
    assert!(header.children.iter().all(|c| c.children.is_empty()));
}

#[test]
fn test_paragraph() {
    let tree = document_tree();
    let para = &tree.children[1];

    assert_eq!(para.label, "This text continues");
    assert_eq!(labels(&para.children), vec!["This", "Strong", "text", "continues"]);
    assert_eq!(labels(&para.children[1].children), vec!["bold"]);
}

#[test]
fn test_lists_synthesize_list_items() {
    let tree = document_tree();

    let bullets = &tree.children[2];
    assert_eq!(bullets.label, "Bullet List");
    assert_eq!(labels(&bullets.children), vec!["Item 1", "Item 2"]);
    for item in &bullets.children {
        assert_eq!(item.node_type.as_deref(), Some("ListItem"));
        assert_eq!(item.icon.as_deref(), Some("›"));
        assert_eq!(item.children[0].node_type.as_deref(), Some("Plain"));
    }

    let ordered = &tree.children[4];
    assert_eq!(ordered.label, "Ordered List");
    assert_eq!(labels(&ordered.children), vec!["One"]);
}

#[test]
fn test_code_block() {
    let tree = document_tree();
    let code = &tree.children[3];

    assert_eq!(code.label, "CodeBlock(rust)");
    assert!(code.children.is_empty());
}

#[test]
fn test_single_nodes() {
    let engine = Engine::new();
    let adapter = pandoc(&engine);

    let code = engine
        .materialize_root(&adapter, &json!({"t": "CodeBlock", "c": [["", [], []], "plain"]}))
        .unwrap();
    assert_eq!(code.label, "CodeBlock(text)");

    let para = engine.materialize_root(&adapter, &json!({"t": "Para"})).unwrap();
    assert_eq!(para.label, "Paragraph");

    let long = "word ".repeat(20);
    let para = engine
        .materialize_root(&adapter, &json!({"t": "Para", "c": [{"t": "Str", "c": long.trim()}]}))
        .unwrap();
    assert_eq!(para.label.chars().count(), 60);
    assert!(para.label.ends_with('…'));

    let unknown = engine.materialize_root(&adapter, &json!({"t": "Div", "c": []})).unwrap();
    assert_eq!(unknown.label, "Div");
    assert_eq!(unknown.icon, None);
}
