//! Stylesheet rules and the class names their selectors define.
//!
//! Class names are read from selector *text*, not from selector nodes, so the
//! same functions serve detection here and selector rewriting in the reaper.

use std::collections::BTreeSet;
use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;
use tree_sitter::{Node, Tree};

use crate::parser::for_each_node;

/// `.name` tokens, CSS escapes included (`.sm\:p-4`, `.\31 0`).
static CLASS_TOKEN: OnceLock<Regex> = OnceLock::new();
/// `[class="a b"]`, `[class~=a]`, `[CLASS*='x' i]`.
static CLASS_ATTRIBUTE: OnceLock<Regex> = OnceLock::new();

fn class_token_re() -> &'static Regex {
    CLASS_TOKEN.get_or_init(|| {
        Regex::new(r"\.((?:[A-Za-z0-9_-]|[^\x00-\x7F]|\\(?:[0-9A-Fa-f]{1,6}\s?|.))+)")
            .expect("class token regex is a hardcoded literal")
    })
}

fn class_attribute_re() -> &'static Regex {
    CLASS_ATTRIBUTE.get_or_init(|| {
        Regex::new(
            r#"\[\s*(?i:class)\s*[~|^$*]?=\s*(?:"([^"]*)"|'([^']*)'|([^\s\]]+))\s*(?:[iIsS]\s*)?\]"#,
        )
        .expect("class attribute regex is a hardcoded literal")
    })
}

/// A rule set and the byte range of its selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSpan {
    pub start: usize,
    pub end: usize,
    pub selectors: Range<usize>,
    /// The parser had to recover inside this rule.
    pub has_error: bool,
}

/// Every `rule_set` in document order, including those nested in
/// `@media` / `@supports` blocks.
pub fn rule_spans(tree: &Tree) -> Vec<RuleSpan> {
    let mut rules = Vec::new();
    for_each_node(tree.root_node(), |node| {
        if node.kind() != "rule_set" {
            return;
        }
        if let Some(selectors) = child_of_kind(node, "selectors") {
            rules.push(RuleSpan {
                start: node.start_byte(),
                end: node.end_byte(),
                selectors: selectors.start_byte()..selectors.end_byte(),
                has_error: node.has_error(),
            });
        }
    });
    rules
}

fn child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node.named_children(&mut cursor).find(|c| c.kind() == kind);
    found
}

/// Class names defined by a whole stylesheet.
pub fn defined_classes(tree: &Tree, source: &str) -> BTreeSet<String> {
    let mut classes = BTreeSet::new();
    for rule in rule_spans(tree) {
        if let Some(text) = source.get(rule.selectors.clone()) {
            classes.extend(selector_defined_classes(text));
        }
    }
    classes
}

/// Class names a selector (or selector list) defines: `.name` tokens plus
/// values of `[class…="…"]` attribute selectors.
pub fn selector_defined_classes(selector: &str) -> Vec<String> {
    collect_classes(selector, false)
}

/// Class names an element must carry for `selector` to match it.
///
/// Like [`selector_defined_classes`] but ignores classes under `:not(...)`,
/// whose absence makes the selector match more, not less.
pub fn selector_required_classes(selector: &str) -> Vec<String> {
    collect_classes(selector, true)
}

fn collect_classes(selector: &str, skip_negations: bool) -> Vec<String> {
    let mut classes = Vec::new();

    for caps in class_attribute_re().captures_iter(selector) {
        if skip_negations && inside_negation(selector, caps.get(0).map_or(0, |m| m.start())) {
            continue;
        }
        let value = caps
            .get(1)
            .or_else(|| caps.get(2))
            .or_else(|| caps.get(3))
            .map_or("", |m| m.as_str());
        classes.extend(value.split_whitespace().map(str::to_string));
    }

    let masked = mask_selector(selector, skip_negations);
    for caps in class_token_re().captures_iter(&masked) {
        if let Some(m) = caps.get(1) {
            classes.push(unescape(m.as_str()));
        }
    }

    classes.dedup();
    classes
}

fn inside_negation(selector: &str, offset: usize) -> bool {
    let masked = mask_selector(selector, true);
    // Masked bytes became spaces; an unmasked `[` means the attribute is live.
    masked.as_bytes().get(offset) != Some(&b'[')
}

/// Blanks out attribute-selector bodies and quoted strings (and `:not(...)`
/// arguments when asked) while keeping byte offsets stable.
fn mask_selector(selector: &str, mask_negations: bool) -> String {
    let mut out = String::with_capacity(selector.len());
    let mut chars = selector.char_indices();
    let mut bracket = 0usize;
    let mut negation = 0usize;
    let mut quote: Option<char> = None;

    while let Some((i, c)) = chars.next() {
        if let Some(q) = quote {
            if c == '\\' {
                push_masked(&mut out, c, true);
                if let Some((_, next)) = chars.next() {
                    push_masked(&mut out, next, true);
                }
                continue;
            }
            if c == q {
                quote = None;
            }
            push_masked(&mut out, c, true);
            continue;
        }

        let masked = bracket > 0 || negation > 0;
        match c {
            '\\' => {
                push_masked(&mut out, c, masked);
                if let Some((_, next)) = chars.next() {
                    push_masked(&mut out, next, masked);
                }
            }
            '"' | '\'' => {
                quote = Some(c);
                push_masked(&mut out, c, true);
            }
            '[' => {
                // The opening bracket stays visible outside negations so
                // callers can tell live attribute selectors apart.
                push_masked(&mut out, c, masked);
                bracket += 1;
            }
            ']' if bracket > 0 => {
                bracket -= 1;
                push_masked(&mut out, c, true);
            }
            '(' if negation > 0 => {
                negation += 1;
                push_masked(&mut out, c, true);
            }
            ')' if negation > 0 => {
                negation -= 1;
                push_masked(&mut out, c, true);
            }
            ':' if mask_negations
                && bracket == 0
                && negation == 0
                && selector
                    .get(i..i + 5)
                    .is_some_and(|s| s.eq_ignore_ascii_case(":not(")) =>
            {
                push_masked(&mut out, c, true);
                for _ in 0..4 {
                    if let Some((_, next)) = chars.next() {
                        push_masked(&mut out, next, true);
                    }
                }
                negation = 1;
            }
            _ => push_masked(&mut out, c, masked),
        }
    }
    out
}

fn push_masked(out: &mut String, c: char, masked: bool) {
    if masked {
        out.extend(std::iter::repeat(' ').take(c.len_utf8()));
    } else {
        out.push(c);
    }
}

/// Resolves CSS escapes: `\:` → `:`, `\31 ` → `1`.
fn unescape(token: &str) -> String {
    if !token.contains('\\') {
        return token.to_string();
    }
    let mut out = String::with_capacity(token.len());
    let mut chars = token.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let mut hex = String::new();
        while hex.len() < 6 {
            match chars.peek() {
                Some(h) if h.is_ascii_hexdigit() => {
                    hex.push(*h);
                    chars.next();
                }
                _ => break,
            }
        }
        if hex.is_empty() {
            if let Some(next) = chars.next() {
                out.push(next);
            }
            continue;
        }
        let code = u32::from_str_radix(&hex, 16).unwrap_or(0xFFFD);
        out.push(char::from_u32(code).unwrap_or('\u{FFFD}'));
        if chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
    }
    out
}

/// Byte ranges of the comma-separated selectors in `list`, splitting only on
/// commas outside parentheses, brackets and strings. Ranges are untrimmed.
pub fn split_selector_list(list: &str) -> Vec<Range<usize>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0usize;

    for (i, c) in list.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, c) {
            (_, '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(' | '[') => depth += 1,
            (None, ')' | ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(start..i);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(start..list.len());
    parts
}
