//! Remediation advice: obsolete markup elements and lint findings.
//!
//! The tag table doubles as the enumerated list of deprecated elements the
//! usage extractor looks for.

/// Obsolete markup elements and their modern replacement.
pub const DEPRECATED_TAGS: &[(&str, &str)] = &[
    ("acronym", "Use <abbr> instead."),
    ("applet", "Use <object> or <embed>."),
    ("basefont", "Use CSS for typography."),
    ("big", "Use CSS with a larger font-size."),
    ("blink", "Use CSS animations (not recommended for accessibility)."),
    ("center", "Use CSS with text-align: center."),
    ("font", "Use CSS to set font family and size."),
    ("marquee", "Use CSS animations or a <div> with overflow + scroll."),
    ("s", "Use <del> or CSS text-decoration: line-through."),
    ("strike", "Use <del> or CSS text-decoration: line-through."),
    ("tt", "Use CSS with font-family: monospace."),
    ("u", "Use CSS text-decoration: underline."),
    ("frame", "Use <iframe> (frame support was removed)."),
    ("frameset", "Use <iframe> with a modern layout."),
    ("noframes", "Use <iframe> or redesign the layout."),
    ("isindex", "Use a <form> with an <input>."),
    ("keygen", "Use a <form> + the Web Crypto API."),
    ("listing", "Use <pre>."),
    ("xmp", "Use <pre> or <code>."),
    ("plaintext", "Use <pre> or <code>."),
    ("bgsound", "Use <audio autoplay> with controls where appropriate."),
    ("dir", "Use <ul>."),
];

/// Advice per lint rule id.
const RULE_ADVICE: &[(&str, &str)] = &[
    ("no-undef", "Define the variable before using it, import it correctly or fix the name."),
    ("no-unused-vars", "Remove the variable if unused, rename it, or comment the usage if intentional."),
    ("no-var", "Replace 'var' with 'let' or 'const' as appropriate (safer scoping)."),
    ("prefer-const", "Use `const` for variables that are never reassigned."),
    ("eqeqeq", "Use '===' or '!==' instead of '==' or '!=' to avoid implicit coercion."),
    ("no-with", "Remove the use of 'with'; it is not allowed in strict mode."),
    ("no-new-object", "Use the literal notation `{}` instead of `new Object()`."),
    ("prefer-arrow-callback", "Use arrow functions in callbacks that do not need `this`: `() => {}`."),
    ("func-names", "Name anonymous functions to ease debugging."),
    ("no-dupe-keys", "Remove or rename duplicate keys in object literals."),
    ("no-dupe-args", "Do not declare the same argument twice in one function; rename or remove it."),
    ("no-redeclare", "Do not redeclare a variable in the same scope; use let/const or regroup the logic."),
    ("duplicate-function", "Rename or remove the duplicate function; avoid declaring the same function twice in one file."),
    ("parse-error", "Syntax error: check for missing parentheses, braces, commas or semicolons. Open the file in an editor to see the highlight."),
    ("lint-error", "General lint error: read the message and run the linter on the file for details."),
    ("no-extra-semi", "Remove unnecessary extra semicolons."),
    ("no-unexpected-multiline", "Check line breaks that change behaviour (e.g. `return` on a line apart from its value)."),
    ("no-empty", "Avoid empty blocks; if intentional, document it with an `// intentional` comment."),
    ("no-duplicate-case", "Remove duplicate cases inside a switch."),
    ("no-unreachable", "Remove code after `return`, `throw`, `continue` or `break` that never runs."),
    ("no-constant-condition", "Avoid conditions that are always true/false; if intentional, leave a comment."),
    ("no-extra-parens", "Remove extra parentheses."),
    ("missing-parenthesis", "Close the missing parentheses `()`."),
    ("missing-bracket", "Close the missing brackets `[]`."),
    ("missing-brace", "Close the missing braces `{}`."),
    ("curly", "Always use braces `{}` in `if`/`else`/`for` blocks to avoid ambiguity."),
    ("brace-style", "Keep a consistent brace style for readability."),
    ("quotes", "Use quotes consistently following the project convention (single or double)."),
];

const DEFAULT_RULE_ADVICE: &str =
    "Check the linter documentation for this rule, or run the linter's autofix if it applies.";

/// Message fragments (matched case-insensitively) and their advice, in
/// priority order. The final catch-all applies to any non-empty message.
const MESSAGE_ADVICE: &[(&str, &str)] = &[
    ("unexpected token", "Check misplaced commas, parentheses or braces. For example remove an extra comma in an object/array or close a missing brace/parenthesis."),
    ("has already been declared", "There is a duplicate declaration. Remove the repeated declaration or rename the variable/function to avoid the conflict."),
    ("unexpected string", "Possibly unclosed quotes or a missing operator between strings; check the strings (`'...'` or \"...\") and operators."),
    ("unexpected number", "Probably a missing operator between values (e.g. `2 3`), or a number placed where it does not belong."),
    ("unexpected identifier", "Possibly a reserved word used as a variable, or a missing separator/comma; check the reported line."),
    ("parsing error: eof", "The file ended unexpectedly; probably a closing brace `}` or parenthesis `)` is missing at the end."),
];

const CATCH_ALL_MESSAGE_ADVICE: &str =
    "Parsing error: check the syntax (parentheses, commas, braces). Open the file in an editor to see the highlight.";

/// Replacement advice for an obsolete element, `None` if it is not tabled.
pub fn tag_suggestion(tag: &str) -> Option<&'static str> {
    let tag = tag.to_ascii_lowercase();
    DEPRECATED_TAGS
        .iter()
        .find(|(name, _)| *name == tag)
        .map(|(_, advice)| *advice)
}

pub fn is_deprecated_tag(tag: &str) -> bool {
    tag_suggestion(tag).is_some()
}

/// Advice for a lint finding.
///
/// Lookup order: rule id table, then message fragments, then the
/// `parse-error` advice when there is no rule id, else a generic default.
pub fn js_suggestion(rule_id: Option<&str>, message: &str) -> &'static str {
    if let Some(advice) = rule_id.and_then(rule_advice) {
        return advice;
    }

    if !message.is_empty() {
        let lowered = message.to_lowercase();
        return MESSAGE_ADVICE
            .iter()
            .find(|(fragment, _)| lowered.contains(fragment))
            .map(|(_, advice)| *advice)
            .unwrap_or(CATCH_ALL_MESSAGE_ADVICE);
    }

    match rule_id {
        None => rule_advice("parse-error").unwrap_or(CATCH_ALL_MESSAGE_ADVICE),
        Some(_) => DEFAULT_RULE_ADVICE,
    }
}

fn rule_advice(rule_id: &str) -> Option<&'static str> {
    RULE_ADVICE
        .iter()
        .find(|(id, _)| *id == rule_id)
        .map(|(_, advice)| *advice)
}
