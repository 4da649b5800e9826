//! Class-token rules: textual heuristics that find class names used from scripts.
//!
//! Each rule is a pure `text → [name]` function. Rules are independent and
//! additive; the extractor unions every rule's output, so a new rule never
//! needs changes anywhere else.

pub mod attribute;
pub mod class_list;
pub mod template;

use std::collections::HashSet;

pub use attribute::{ClassAttributeRule, SetAttributeRule};
pub use class_list::ClassListRule;
pub use template::{ConcatenationRule, TernaryRule};

/// A heuristic that reports class-like tokens found in script text.
///
/// # Implementation Notes
/// - Must not depend on the output of other rules.
/// - Returns raw values; the caller splits on whitespace and drops tokens
///   that cannot be class names (see [`class_tokens`]).
pub trait ClassRule: Send + Sync {
    /// Short identifier used in debug logs.
    fn name(&self) -> &'static str;

    fn extract(&self, text: &str) -> Vec<String>;
}

/// The built-in rule list, in evaluation order.
pub fn default_rules() -> Vec<Box<dyn ClassRule>> {
    vec![
        Box::new(ClassAttributeRule),
        Box::new(ClassListRule),
        Box::new(SetAttributeRule),
        Box::new(ConcatenationRule),
        Box::new(TernaryRule),
    ]
}

/// Runs every rule over `text` and unions the resulting class tokens.
pub fn extract_class_tokens(rules: &[Box<dyn ClassRule>], text: &str) -> HashSet<String> {
    let mut used = HashSet::new();
    for rule in rules {
        let values = rule.extract(text);
        if !values.is_empty() {
            tracing::trace!(rule = rule.name(), hits = values.len(), "class rule matched");
        }
        for value in values {
            used.extend(class_tokens(&value));
        }
    }
    used
}

/// Splits a raw attribute/literal value into plausible class names.
///
/// Interpolation fragments and punctuation-only tokens (`${x}`, `?`, `''`)
/// are dropped.
pub fn class_tokens(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split_whitespace()
        .filter(|t| is_class_token(t))
        .map(str::to_string)
}

fn is_class_token(token: &str) -> bool {
    const FORBIDDEN: &[char] = &['$', '{', '}', '<', '>', '"', '\'', '`', '=', ';', '(', ')', ','];
    token.chars().any(|c| c.is_alphanumeric()) && !token.contains(FORBIDDEN)
}

/// First participating group among `groups`; string-literal alternations put
/// each quote style in its own group.
pub(crate) fn first_group<'t>(caps: &regex::Captures<'t>, groups: &[usize]) -> Option<&'t str> {
    groups.iter().find_map(|&g| caps.get(g)).map(|m| m.as_str())
}
