//! String arguments of `classList` method calls.

use std::sync::OnceLock;

use regex::Regex;

use super::{first_group, ClassRule};

static CLASS_LIST_CALL: OnceLock<Regex> = OnceLock::new();
static STRING_LITERAL: OnceLock<Regex> = OnceLock::new();

/// String arguments of `classList.add/remove/toggle/contains/replace(...)`.
pub struct ClassListRule;

impl ClassRule for ClassListRule {
    fn name(&self) -> &'static str {
        "class-list"
    }

    fn extract(&self, text: &str) -> Vec<String> {
        let call = CLASS_LIST_CALL.get_or_init(|| {
            Regex::new(r"classList\s*\.\s*(?:add|remove|toggle|contains|replace)\s*\(([^)]*)\)")
                .expect("classList regex is a hardcoded literal")
        });
        let literal = STRING_LITERAL.get_or_init(|| {
            Regex::new(r#""([^"]*)"|'([^']*)'|`([^`]*)`"#)
                .expect("string literal regex is a hardcoded literal")
        });

        let mut out = Vec::new();
        for caps in call.captures_iter(text) {
            let Some(args) = caps.get(1) else {
                continue;
            };
            out.extend(
                literal
                    .captures_iter(args.as_str())
                    .filter_map(|lit| first_group(&lit, &[1, 2, 3]).map(str::to_string)),
            );
        }
        out
    }
}
