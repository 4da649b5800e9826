//! Lint engine: a small tree-sitter rule set over scripts.
//!
//! | rule            | severity |
//! |-----------------|----------|
//! | `parse-error`   | error    |
//! | `no-var`        | error    |
//! | `no-with`       | error    |
//! | `eqeqeq`        | warning  |
//! | `no-new-object` | warning  |
//! | `prefer-const`  | warning  |
//! | `prefer-arrow-callback` | warning |
//!
//! A tree with syntax errors only yields its `parse-error`.

use common::wisdom::js_suggestion;
use common::{Diagnostic, Severity};
use tree_sitter::{Node, Tree};

use crate::parser::{first_syntax_error, for_each_node};

struct Finding {
    line: u32,
    rule_id: &'static str,
    severity: Severity,
    message: String,
}

/// Lints one parsed script.
pub fn lint(tree: &Tree, source: &str, file: &str) -> Vec<Diagnostic> {
    let root = tree.root_node();
    let mut findings = Vec::new();

    if root.has_error() {
        if let Some(err) = first_syntax_error(root, source) {
            findings.push(Finding {
                line: err.line,
                rule_id: "parse-error",
                severity: Severity::Error,
                message: err.message,
            });
        }
    } else {
        for_each_node(root, |node| {
            if let Some(finding) = check_node(node, source) {
                findings.push(finding);
            }
            if node.kind() == "lexical_declaration" {
                findings.extend(never_reassigned(node, source));
            }
        });
    }

    findings
        .into_iter()
        .map(|f| Diagnostic {
            file: file.to_string(),
            line: f.line,
            suggestion: js_suggestion(Some(f.rule_id), &f.message).to_string(),
            message: f.message,
            rule_id: f.rule_id.to_string(),
            severity: f.severity,
        })
        .collect()
}

fn check_node(node: Node<'_>, source: &str) -> Option<Finding> {
    let line = (node.start_position().row + 1) as u32;
    match node.kind() {
        "variable_declaration" => Some(Finding {
            line,
            rule_id: "no-var",
            severity: Severity::Error,
            message: "Unexpected var, use let or const instead.".to_string(),
        }),
        "with_statement" => Some(Finding {
            line,
            rule_id: "no-with",
            severity: Severity::Error,
            message: "Unexpected use of 'with' statement.".to_string(),
        }),
        "binary_expression" => {
            let op = node.child_by_field_name("operator")?;
            let expected = match op.kind() {
                "==" => "===",
                "!=" => "!==",
                _ => return None,
            };
            Some(Finding {
                line: (op.start_position().row + 1) as u32,
                rule_id: "eqeqeq",
                severity: Severity::Warning,
                message: format!("Expected '{expected}' and instead saw '{}'.", op.kind()),
            })
        }
        "new_expression" => {
            let ctor = node.child_by_field_name("constructor")?;
            let is_object = ctor.kind() == "identifier"
                && ctor.utf8_text(source.as_bytes()).ok() == Some("Object");
            is_object.then(|| Finding {
                line,
                rule_id: "no-new-object",
                severity: Severity::Warning,
                message: "The object literal notation {} is preferable.".to_string(),
            })
        }
        "function_expression" if is_plain_callback(node, source) => Some(Finding {
            line,
            rule_id: "prefer-arrow-callback",
            severity: Severity::Warning,
            message: "Unexpected function expression.".to_string(),
        }),
        _ => None,
    }
}

/// `prefer-const`: initialised `let` bindings with no later write in the
/// enclosing scope. Destructuring declarators are not checked.
fn never_reassigned(decl: Node<'_>, source: &str) -> Vec<Finding> {
    let bytes = source.as_bytes();
    let is_let = decl
        .child(0)
        .is_some_and(|kw| kw.utf8_text(bytes).ok() == Some("let"));
    let Some(scope) = decl.parent().filter(|_| is_let) else {
        return Vec::new();
    };

    let mut cursor = decl.walk();
    decl.named_children(&mut cursor)
        .filter(|d| d.kind() == "variable_declarator" && d.child_by_field_name("value").is_some())
        .filter_map(|d| {
            let name = d.child_by_field_name("name")?;
            if name.kind() != "identifier" {
                return None;
            }
            let name = name.utf8_text(bytes).ok()?;
            (!is_written(scope, name, bytes)).then(|| Finding {
                line: (d.start_position().row + 1) as u32,
                rule_id: "prefer-const",
                severity: Severity::Warning,
                message: format!("'{name}' is never reassigned. Use 'const' instead."),
            })
        })
        .collect()
}

/// Any assignment, compound assignment or `++`/`--` targeting `name` below `scope`.
fn is_written(scope: Node<'_>, name: &str, bytes: &[u8]) -> bool {
    let mut written = false;
    for_each_node(scope, |node| {
        if written {
            return;
        }
        let target = match node.kind() {
            "assignment_expression" | "augmented_assignment_expression" => {
                node.child_by_field_name("left")
            }
            "update_expression" => node.child_by_field_name("argument"),
            _ => None,
        };
        if let Some(target) = target {
            written = mentions(target, name, bytes);
        }
    });
    written
}

fn mentions(node: Node<'_>, name: &str, bytes: &[u8]) -> bool {
    let mut found = false;
    for_each_node(node, |n| {
        if matches!(n.kind(), "identifier" | "shorthand_property_identifier_pattern")
            && n.utf8_text(bytes).ok() == Some(name)
        {
            found = true;
        }
    });
    found
}

/// `prefer-arrow-callback`: a `function` expression passed straight to a
/// call that uses neither `this`, `arguments` nor its own name.
fn is_plain_callback(func: Node<'_>, source: &str) -> bool {
    let in_call = func
        .parent()
        .filter(|p| p.kind() == "arguments")
        .and_then(|args| args.parent())
        .is_some_and(|call| call.kind() == "call_expression");
    if !in_call {
        return false;
    }
    let Some(body) = func.child_by_field_name("body") else {
        return false;
    };
    let bytes = source.as_bytes();
    let own_name = func
        .child_by_field_name("name")
        .and_then(|n| n.utf8_text(bytes).ok());

    let mut needs_function = false;
    for_each_node(body, |n| {
        match n.kind() {
            "this" | "super" | "meta_property" => needs_function = true,
            "identifier" => {
                let text = n.utf8_text(bytes).ok();
                if text == Some("arguments") || (own_name.is_some() && text == own_name) {
                    needs_function = true;
                }
            }
            _ => {}
        }
    });
    !needs_function
}
