//! Markup documents: element names, class attributes and inline code.

use std::collections::BTreeSet;

use tree_sitter::{Node, Tree};

use crate::parser::for_each_node;

/// Facts extracted from one markup document.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MarkupFacts {
    /// Whitespace-separated tokens of every `class` attribute.
    pub class_tokens: BTreeSet<String>,
    /// Every element name, lower-cased.
    pub tags: BTreeSet<String>,
    /// Bodies of inline `<script>` elements.
    pub scripts: Vec<String>,
    /// Bodies of inline `<style>` elements.
    pub styles: Vec<String>,
    /// Values of `on*` event-handler attributes.
    pub handlers: Vec<String>,
}

pub fn markup_facts(tree: &Tree, source: &str) -> MarkupFacts {
    let bytes = source.as_bytes();
    let mut facts = MarkupFacts::default();

    for_each_node(tree.root_node(), |node| match node.kind() {
        "tag_name" => {
            let in_open_tag = node
                .parent()
                .is_some_and(|p| matches!(p.kind(), "start_tag" | "self_closing_tag"));
            if in_open_tag {
                if let Ok(name) = node.utf8_text(bytes) {
                    facts.tags.insert(name.to_ascii_lowercase());
                }
            }
        }
        "attribute" => {
            let Some(name) = named_child(node, "attribute_name")
                .and_then(|n| n.utf8_text(bytes).ok())
                .map(str::to_ascii_lowercase)
            else {
                return;
            };
            let value = attribute_value(node, bytes).unwrap_or_default();
            if name == "class" {
                facts
                    .class_tokens
                    .extend(value.split_whitespace().map(str::to_string));
            } else if name.starts_with("on") && !value.is_empty() {
                facts.handlers.push(value.to_string());
            }
        }
        "script_element" => {
            if let Some(body) = named_child(node, "raw_text").and_then(|n| n.utf8_text(bytes).ok()) {
                facts.scripts.push(body.to_string());
            }
        }
        "style_element" => {
            if let Some(body) = named_child(node, "raw_text").and_then(|n| n.utf8_text(bytes).ok()) {
                facts.styles.push(body.to_string());
            }
        }
        _ => {}
    });

    facts
}

fn named_child<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node.named_children(&mut cursor).find(|c| c.kind() == kind);
    found
}

/// Unquoted values are direct `attribute_value` children; quoted ones sit
/// inside a `quoted_attribute_value`.
fn attribute_value<'s>(attribute: Node<'_>, bytes: &'s [u8]) -> Option<&'s str> {
    let value = named_child(attribute, "attribute_value").or_else(|| {
        named_child(attribute, "quoted_attribute_value")
            .and_then(|q| named_child(q, "attribute_value"))
    })?;
    value.utf8_text(bytes).ok()
}
