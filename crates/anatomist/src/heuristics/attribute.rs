//! Class attribute literals embedded in scripts.

use std::sync::OnceLock;

use regex::Regex;

use super::{first_group, ClassRule};

static CLASS_ATTRIBUTE: OnceLock<Regex> = OnceLock::new();
static SET_ATTRIBUTE: OnceLock<Regex> = OnceLock::new();

/// `class="…"` / `className='…'` inside markup built from script text, and
/// `el.className = "…"` assignments.
pub struct ClassAttributeRule;

impl ClassRule for ClassAttributeRule {
    fn name(&self) -> &'static str {
        "class-attribute"
    }

    fn extract(&self, text: &str) -> Vec<String> {
        let re = CLASS_ATTRIBUTE.get_or_init(|| {
            Regex::new(r#"\b(?:class|className)\s*=\s*(?:"([^"]*)"|'([^']*)'|\{\s*["'`]([^"'`]*)["'`]\s*\})"#)
                .expect("class attribute regex is a hardcoded literal")
        });
        re.captures_iter(text)
            .filter_map(|caps| first_group(&caps, &[1, 2, 3]).map(str::to_string))
            .collect()
    }
}

/// `setAttribute('class', '…')`.
pub struct SetAttributeRule;

impl ClassRule for SetAttributeRule {
    fn name(&self) -> &'static str {
        "set-attribute"
    }

    fn extract(&self, text: &str) -> Vec<String> {
        let re = SET_ATTRIBUTE.get_or_init(|| {
            Regex::new(r#"setAttribute\s*\(\s*["'](?:class|className)["']\s*,\s*(?:"([^"]*)"|'([^']*)'|`([^`]*)`)"#)
                .expect("setAttribute regex is a hardcoded literal")
        });
        re.captures_iter(text)
            .filter_map(|caps| first_group(&caps, &[1, 2, 3]).map(str::to_string))
            .collect()
    }
}
