//! Pure text transforms behind both patches and in-place fixes.
//!
//! Neither function touches the filesystem: they take one snapshot of a
//! file's text and return the rewritten text.

use std::collections::BTreeSet;

use anatomist::stylesheet::{rule_spans, selector_required_classes, split_selector_list};
use common::Symbol;
use tree_sitter::Tree;

use crate::safe_edit::{splice, EditTarget};

/// Rewritten stylesheet plus what happened to its rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripOutcome {
    pub content: String,
    /// Rules whose whole selector list referenced removed classes.
    pub removed_rules: usize,
    /// Rules that kept some of their selectors.
    pub rewritten_rules: usize,
}

impl StripOutcome {
    pub fn changed(&self) -> bool {
        self.removed_rules + self.rewritten_rules > 0
    }
}

/// Strips every selector that requires one of `classes` from a stylesheet.
///
/// A rule whose selectors all go is removed together with its own line's
/// indentation and trailing newline; otherwise its selector list is rewritten
/// to the survivors. Rules the parser had to recover inside are left alone.
pub fn strip_classes(tree: &Tree, source: &str, classes: &BTreeSet<String>) -> StripOutcome {
    let mut edits = Vec::new();
    let mut removed_rules = 0;
    let mut rewritten_rules = 0;

    for rule in rule_spans(tree) {
        if rule.has_error {
            continue;
        }
        let Some(list) = source.get(rule.selectors.clone()) else {
            continue;
        };
        let parts = split_selector_list(list);
        let kept: Vec<&str> = parts
            .iter()
            .map(|range| &list[range.clone()])
            .filter(|selector| {
                !selector_required_classes(selector)
                    .iter()
                    .any(|c| classes.contains(c))
            })
            .collect();

        if kept.len() == parts.len() {
            continue;
        }
        if kept.is_empty() {
            let (start, end) = widen_to_lines(source, rule.start, rule.end);
            edits.push(EditTarget::removal(list.trim(), start, end));
            removed_rules += 1;
        } else {
            let separator = list_separator(list, &parts);
            let rewritten = kept
                .iter()
                .map(|s| s.trim())
                .collect::<Vec<_>>()
                .join(&separator);
            edits.push(EditTarget {
                label: list.trim().to_string(),
                start: rule.selectors.start,
                end: rule.selectors.end,
                replacement: rewritten,
            });
            rewritten_rules += 1;
        }
    }

    let (content, _) = splice(source, &edits);
    StripOutcome {
        content,
        removed_rules,
        rewritten_rules,
    }
}

/// The comma plus whatever whitespace followed the first comma of `list`.
fn list_separator(list: &str, parts: &[std::ops::Range<usize>]) -> String {
    match parts.get(1) {
        Some(second) => {
            let after = &list[second.clone()];
            let gap = &after[..after.len() - after.trim_start().len()];
            format!(",{gap}")
        }
        None => ", ".to_string(),
    }
}

/// Extends `[start, end)` over leading indentation and the trailing newline
/// when the span sits alone on its lines.
fn widen_to_lines(source: &str, start: usize, end: usize) -> (usize, usize) {
    let bytes = source.as_bytes();

    let mut line_start = start;
    while line_start > 0 && matches!(bytes[line_start - 1], b' ' | b'\t') {
        line_start -= 1;
    }
    if line_start > 0 && bytes[line_start - 1] != b'\n' {
        return (start, end);
    }

    let mut line_end = end;
    while line_end < bytes.len() && matches!(bytes[line_end], b' ' | b'\t' | b'\r') {
        line_end += 1;
    }
    match bytes.get(line_end) {
        Some(b'\n') => (line_start, line_end + 1),
        None => (line_start, line_end),
        Some(_) => (start, end),
    }
}

/// Replaces each function's span with a commented copy under a removal
/// banner. Functions without a span are skipped.
pub fn comment_out_functions(source: &str, functions: &[&Symbol], iso: &str) -> (String, usize) {
    let mut edits = Vec::with_capacity(functions.len());
    for function in functions {
        let Some(span) = function.span else {
            tracing::warn!(symbol = %function.name, "function has no source span; left in place");
            continue;
        };
        let (start, end) = (span.start_byte as usize, span.end_byte as usize);
        let Some(original) = source.get(start..end) else {
            tracing::warn!(symbol = %function.name, start, end, "span outside file; left in place");
            continue;
        };
        edits.push(EditTarget {
            label: function.name.clone(),
            start,
            end,
            replacement: removal_block(&function.name, original, indent_before(source, start), iso),
        });
    }
    splice(source, &edits)
}

/// Whitespace between the start of the line and `offset`, if that is all
/// there is.
fn indent_before(source: &str, offset: usize) -> &str {
    let line_start = source[..offset].rfind('\n').map_or(0, |i| i + 1);
    let prefix = &source[line_start..offset];
    if prefix.chars().all(|c| c == ' ' || c == '\t') {
        prefix
    } else {
        ""
    }
}

/// Banner, marker line and the original text with every line commented.
///
/// The first line is placed where the span started; later lines are
/// re-indented to the same column.
pub fn removal_block(name: &str, original: &str, indent: &str, iso: &str) -> String {
    let mut lines = vec![
        format!("/* DEADWATCHER REMOVED FUNCTION: {name} - {iso} */"),
        "// ORIGINAL (kept commented):".to_string(),
    ];
    for (i, line) in original.split('\n').enumerate() {
        let line = if i == 0 {
            line
        } else {
            line.strip_prefix(indent).unwrap_or(line)
        };
        lines.push(format!("// {line}").trim_end().to_string());
    }
    let mut block = lines.join(&format!("\n{indent}"));
    block.push('\n');
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use anatomist::ParserHost;
    use common::SourceSpan;

    const ISO: &str = "2024-05-01T10:00:00.000Z";

    fn strip(css: &str, classes: &[&str]) -> StripOutcome {
        let mut host = ParserHost::new().unwrap();
        let tree = host.parse_stylesheet(css).unwrap();
        let set: BTreeSet<String> = classes.iter().map(|c| c.to_string()).collect();
        strip_classes(&tree, css, &set)
    }

    #[test]
    fn test_whole_rule_removed_with_its_line() {
        let out = strip(".foo {}\n.bar { color: red; }\n.baz {}\n", &["bar"]);
        assert_eq!(out.content, ".foo {}\n.baz {}\n");
        assert_eq!(out.removed_rules, 1);
    }

    #[test]
    fn test_selector_list_rewritten() {
        let out = strip(".foo, .bar:hover, .baz { margin: 0; }\n", &["bar"]);
        assert_eq!(out.content, ".foo, .baz { margin: 0; }\n");
        assert_eq!(out.rewritten_rules, 1);
    }

    #[test]
    fn test_multiline_separator_preserved() {
        let out = strip(".a,\n.b,\n.c { x: 1; }\n", &["a"]);
        assert_eq!(out.content, ".b,\n.c { x: 1; }\n");
    }

    #[test]
    fn test_nested_rule_in_media_removed() {
        let css = "@media (max-width: 600px) {\n  .bar { display: none; }\n  .keep { display: block; }\n}\n";
        let out = strip(css, &["bar"]);
        assert_eq!(
            out.content,
            "@media (max-width: 600px) {\n  .keep { display: block; }\n}\n"
        );
    }

    #[test]
    fn test_negated_class_is_not_required() {
        let out = strip("li:not(.bar) { x: 1; }\n", &["bar"]);
        assert!(!out.changed());
    }

    #[test]
    fn test_commas_inside_functions_do_not_split() {
        let out = strip(":is(.a, .b) .bar, .c { x: 1; }\n", &["bar"]);
        assert_eq!(out.content, ".c { x: 1; }\n");
    }

    #[test]
    fn test_prefix_class_untouched() {
        let out = strip(".bar-large { x: 1; }\n", &["bar"]);
        assert!(!out.changed());
    }

    fn function(name: &str, source: &str) -> Symbol {
        let start = source.find(&format!("function {name}")).unwrap();
        let end = start + source[start..].find('}').unwrap() + 1;
        Symbol::js_function(
            name,
            "app.js",
            SourceSpan {
                start_byte: start as u32,
                end_byte: end as u32,
                start_line: 1,
                end_line: 1,
            },
        )
    }

    #[test]
    fn test_comment_out_banner() {
        let src = "function helper() {\n  return 1;\n}\nrun();\n";
        let helper = function("helper", src);
        let (out, applied) = comment_out_functions(src, &[&helper], ISO);
        assert_eq!(applied, 1);
        assert_eq!(
            out,
            "/* DEADWATCHER REMOVED FUNCTION: helper - 2024-05-01T10:00:00.000Z */\n\
             // ORIGINAL (kept commented):\n\
             // function helper() {\n\
             //   return 1;\n\
             // }\n\nrun();\n"
        );
    }

    #[test]
    fn test_multiple_functions_one_snapshot() {
        let src = "function a() {}\nfunction b() {}\nfunction c() {}\n";
        let (a, c) = (function("a", src), function("c", src));
        let (out, applied) = comment_out_functions(src, &[&a, &c], ISO);
        assert_eq!(applied, 2);
        assert!(out.contains("// function a() {}"));
        assert!(out.contains("\nfunction b() {}\n"));
        assert!(out.contains("// function c() {}"));
    }

    #[test]
    fn test_indented_function_stays_in_column() {
        let block = removal_block("f", "function f() {\n    x();\n  }", "  ", ISO);
        let lines: Vec<&str> = block.lines().collect();
        assert_eq!(lines[1], "  // ORIGINAL (kept commented):");
        assert_eq!(lines[3], "  //   x();");
        assert_eq!(lines[4], "  // }");
    }
}
