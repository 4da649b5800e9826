//! Class names assembled from string pieces.

use std::sync::OnceLock;

use regex::Regex;

use super::{first_group, ClassRule};

static LITERAL_BEFORE_PLUS: OnceLock<Regex> = OnceLock::new();
static LITERAL_AFTER_PLUS: OnceLock<Regex> = OnceLock::new();
static TEMPLATE_LITERAL: OnceLock<Regex> = OnceLock::new();
static INTERPOLATION: OnceLock<Regex> = OnceLock::new();
static TERNARY_BRANCHES: OnceLock<Regex> = OnceLock::new();

fn interpolation_re() -> &'static Regex {
    INTERPOLATION.get_or_init(|| {
        Regex::new(r"\$\{([^}]*)\}").expect("interpolation regex is a hardcoded literal")
    })
}

/// String literals on either side of `+`, and the literal parts of template
/// strings that contain `${…}`.
pub struct ConcatenationRule;

impl ClassRule for ConcatenationRule {
    fn name(&self) -> &'static str {
        "concatenation"
    }

    fn extract(&self, text: &str) -> Vec<String> {
        let before = LITERAL_BEFORE_PLUS.get_or_init(|| {
            Regex::new(r#"(?:"([^"\n]*)"|'([^'\n]*)')\s*\+"#)
                .expect("concatenation regex is a hardcoded literal")
        });
        let after = LITERAL_AFTER_PLUS.get_or_init(|| {
            Regex::new(r#"\+\s*(?:"([^"\n]*)"|'([^'\n]*)')"#)
                .expect("concatenation regex is a hardcoded literal")
        });
        let template = TEMPLATE_LITERAL.get_or_init(|| {
            Regex::new(r"`([^`]*)`").expect("template literal regex is a hardcoded literal")
        });

        let mut out: Vec<String> = before
            .captures_iter(text)
            .chain(after.captures_iter(text))
            .filter_map(|caps| first_group(&caps, &[1, 2]).map(str::to_string))
            .collect();

        for caps in template.captures_iter(text) {
            let Some(body) = caps.get(1).map(|m| m.as_str()) else {
                continue;
            };
            if !body.contains("${") {
                continue;
            }
            out.extend(
                interpolation_re()
                    .split(body)
                    .filter(|part| !part.trim().is_empty())
                    .map(str::to_string),
            );
        }
        out
    }
}

/// Both branches of `cond ? 'a' : 'b'` inside a `${…}` interpolation.
pub struct TernaryRule;

impl ClassRule for TernaryRule {
    fn name(&self) -> &'static str {
        "ternary"
    }

    fn extract(&self, text: &str) -> Vec<String> {
        let branches = TERNARY_BRANCHES.get_or_init(|| {
            Regex::new(
                r#"\?\s*(?:"([^"]*)"|'([^']*)'|`([^`]*)`)\s*:\s*(?:"([^"]*)"|'([^']*)'|`([^`]*)`)"#,
            )
            .expect("ternary regex is a hardcoded literal")
        });

        let mut out = Vec::new();
        for interp in interpolation_re().captures_iter(text) {
            let Some(expr) = interp.get(1) else {
                continue;
            };
            for caps in branches.captures_iter(expr.as_str()) {
                out.extend(first_group(&caps, &[1, 2, 3]).map(str::to_string));
                out.extend(first_group(&caps, &[4, 5, 6]).map(str::to_string));
            }
        }
        out
    }
}
