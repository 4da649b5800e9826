//! Tree-sitter host for the three web grammars plus script fact extraction.
//!
//! Markup and stylesheet trees are consumed by [`crate::markup`] and
//! [`crate::stylesheet`]; this module owns the script side: named function
//! declarations (with removable spans), identifier references and the first
//! syntax error of a file.

use std::collections::HashSet;
use std::fs::File;
use std::path::Path;
use std::sync::OnceLock;

use common::{SourceSpan, Symbol};
use memmap2::MmapOptions;
use tree_sitter::{Node, Parser, Query, QueryCursor, StreamingIterator, Tree};

use crate::AnatomistError;

/// Static cache for the JavaScript function declaration query.
static JS_FUNCTION_QUERY: OnceLock<Query> = OnceLock::new();

/// Pattern 0/1: statement declarations. Pattern 2: `const f = function/arrow/generator`.
const JS_FUNCTION_S_EXPR: &str = r#"
    (function_declaration
      name: (identifier) @fn.name) @fn.def

    (generator_function_declaration
      name: (identifier) @fn.name) @fn.def

    (variable_declarator
      name: (identifier) @fn.name
      value: [
        (function_expression)
        (arrow_function)
        (generator_function)
      ]) @fn.def
"#;

/// Parents whose children are free-standing statements.
const STATEMENT_LISTS: &[&str] = &["program", "statement_block", "switch_case", "switch_default"];

/// Node kinds that count as a reference to a name.
const REFERENCE_KINDS: &[&str] = &[
    "identifier",
    "shorthand_property_identifier",
    "shorthand_property_identifier_pattern",
];

fn get_js_function_query() -> &'static Query {
    JS_FUNCTION_QUERY.get_or_init(|| {
        Query::new(&tree_sitter_javascript::LANGUAGE.into(), JS_FUNCTION_S_EXPR).expect(
            "JS function query compilation failed: this is a bug in the hardcoded S-expression",
        )
    })
}

/// First syntax error found in a script tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    /// 1-indexed line.
    pub line: u32,
    pub message: String,
}

/// Everything the usage model needs from one script.
///
/// A script with a syntax error carries no functions and no references.
#[derive(Debug, Default)]
pub struct ScriptFacts {
    pub functions: Vec<Symbol>,
    pub references: HashSet<String>,
    pub syntax_error: Option<SyntaxError>,
}

/// One parser per grammar, reused across files of a pass.
///
/// # Example
/// ```no_run
/// use anatomist::ParserHost;
///
/// let mut host = ParserHost::new().unwrap();
/// let source = "function helper() {}\n";
/// let tree = host.parse_script(source).unwrap();
/// let facts = anatomist::parser::script_facts(&tree, source, "app.js");
/// assert_eq!(facts.functions[0].name, "helper");
/// ```
pub struct ParserHost {
    script: Parser,
    markup: Parser,
    stylesheet: Parser,
}

impl ParserHost {
    /// Creates a host with the JavaScript, HTML and CSS grammars loaded.
    ///
    /// # Errors
    /// Returns `AnatomistError::ParseFailure` if a grammar fails to load
    /// (ABI mismatch between the grammar crate and the runtime).
    pub fn new() -> Result<Self, AnatomistError> {
        Ok(Self {
            script: load_parser(tree_sitter_javascript::LANGUAGE.into(), "JavaScript")?,
            markup: load_parser(tree_sitter_html::LANGUAGE.into(), "HTML")?,
            stylesheet: load_parser(tree_sitter_css::LANGUAGE.into(), "CSS")?,
        })
    }

    pub fn parse_script(&mut self, source: &str) -> Result<Tree, AnatomistError> {
        parse_with(&mut self.script, source)
    }

    pub fn parse_markup(&mut self, source: &str) -> Result<Tree, AnatomistError> {
        parse_with(&mut self.markup, source)
    }

    pub fn parse_stylesheet(&mut self, source: &str) -> Result<Tree, AnatomistError> {
        parse_with(&mut self.stylesheet, source)
    }

    /// Parses a script and extracts its facts in one step.
    pub fn dissect_script(
        &mut self,
        source: &str,
        file_path: &str,
    ) -> Result<(Tree, ScriptFacts), AnatomistError> {
        let tree = self.parse_script(source)?;
        let facts = script_facts(&tree, source, file_path);
        Ok((tree, facts))
    }
}

fn load_parser(language: tree_sitter::Language, name: &str) -> Result<Parser, AnatomistError> {
    let mut parser = Parser::new();
    parser
        .set_language(&language)
        .map_err(|e| AnatomistError::ParseFailure(format!("Failed to load {name} grammar: {e}")))?;
    Ok(parser)
}

fn parse_with(parser: &mut Parser, source: &str) -> Result<Tree, AnatomistError> {
    if source.len() > u32::MAX as usize {
        return Err(AnatomistError::ByteRangeOverflow);
    }
    parser
        .parse(source, None)
        .ok_or_else(|| AnatomistError::ParseFailure("Tree-sitter parse returned None".to_string()))
}

/// Reads a source file through a read-only memory map.
///
/// # Errors
/// - `IoError`: file not found, permission denied, mmap failure
/// - `ByteRangeOverflow`: file larger than 4GB (tree-sitter u32 limit)
/// - `InvalidUtf8`: content is not UTF-8
pub fn load_source(path: &Path) -> Result<String, AnatomistError> {
    let file = File::open(path)?;
    let file_len = file.metadata()?.len();

    if file_len > u32::MAX as u64 {
        return Err(AnatomistError::ByteRangeOverflow);
    }
    if file_len == 0 {
        return Ok(String::new());
    }

    // SAFETY: The file handle is held for the duration of the mmap lifetime.
    let mmap = unsafe { MmapOptions::new().map(&file)? };
    std::str::from_utf8(&mmap)
        .map(str::to_owned)
        .map_err(|_| AnatomistError::InvalidUtf8)
}

/// Extracts declarations, references and the first syntax error from a
/// parsed script.
pub fn script_facts(tree: &Tree, source: &str, file_path: &str) -> ScriptFacts {
    let root = tree.root_node();
    if root.has_error() {
        return ScriptFacts {
            syntax_error: first_syntax_error(root, source),
            ..Default::default()
        };
    }

    let (functions, name_ranges) = extract_functions(root, source, file_path);
    let references = collect_references(root, source, &name_ranges);
    ScriptFacts {
        functions,
        references,
        syntax_error: None,
    }
}

/// Named function declarations, plus the byte ranges of their name nodes.
fn extract_functions(
    root: Node<'_>,
    source: &str,
    file_path: &str,
) -> (Vec<Symbol>, HashSet<(usize, usize)>) {
    let query = get_js_function_query();
    let capture_names = query.capture_names();
    let bytes = source.as_bytes();

    let mut functions = Vec::new();
    let mut name_ranges = HashSet::new();
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(query, root, bytes);

    while let Some(m) = matches.next() {
        let def_node = m
            .captures
            .iter()
            .find(|c| capture_names[c.index as usize] == "fn.def")
            .map(|c| c.node);
        let name_node = m
            .captures
            .iter()
            .find(|c| capture_names[c.index as usize] == "fn.name")
            .map(|c| c.node);

        let (Some(def_node), Some(name_node)) = (def_node, name_node) else {
            continue;
        };
        let Ok(name) = name_node.utf8_text(bytes) else {
            continue;
        };

        name_ranges.insert((name_node.start_byte(), name_node.end_byte()));
        if let Some(span_node) = removable_node(def_node) {
            functions.push(Symbol::js_function(name, file_path, span_of(span_node)));
        }
    }

    functions.sort_by_key(|f| f.span.map(|s| s.start_byte));
    (functions, name_ranges)
}

/// Widens a declaration to the statement that owns it, so commenting the
/// span out never leaves `const`, `let`, `var` or `export` behind.
///
/// `None` for a declarator that shares its statement with other bindings
/// (`let a = function () {}, b = 2;`): no span of it can be commented out
/// alone, so it is not a declaration at all.
fn removable_node(def: Node<'_>) -> Option<Node<'_>> {
    let mut node = def;
    if node.kind() == "variable_declarator" {
        let decl = node.parent()?;
        if !matches!(decl.kind(), "lexical_declaration" | "variable_declaration")
            || decl.named_child_count() != 1
        {
            return None;
        }
        node = decl;
    }
    if let Some(parent) = node.parent().filter(|p| p.kind() == "export_statement") {
        node = parent;
    }
    // Only whole statements in a statement list; a `for (let f = ...;` head is not one.
    let owner = node.parent()?;
    STATEMENT_LISTS.contains(&owner.kind()).then_some(node)
}

fn span_of(node: Node<'_>) -> SourceSpan {
    SourceSpan {
        start_byte: node.start_byte() as u32,
        end_byte: node.end_byte() as u32,
        start_line: (node.start_position().row + 1) as u32,
        end_line: (node.end_position().row + 1) as u32,
    }
}

fn collect_references(
    root: Node<'_>,
    source: &str,
    declaration_names: &HashSet<(usize, usize)>,
) -> HashSet<String> {
    let bytes = source.as_bytes();
    let mut references = HashSet::new();
    for_each_node(root, |node| {
        if !REFERENCE_KINDS.contains(&node.kind()) {
            return;
        }
        if declaration_names.contains(&(node.start_byte(), node.end_byte())) {
            return;
        }
        if let Ok(text) = node.utf8_text(bytes) {
            references.insert(text.to_string());
        }
    });
    references
}

/// Locates the first `ERROR` or `MISSING` node in document order.
pub fn first_syntax_error(root: Node<'_>, source: &str) -> Option<SyntaxError> {
    let mut found: Option<SyntaxError> = None;
    for_each_node(root, |node| {
        if found.is_some() || !(node.is_error() || node.is_missing()) {
            return;
        }
        let line = (node.start_position().row + 1) as u32;
        let message = if node.is_missing() {
            format!("Parsing error: Unexpected token, expected \"{}\"", node.kind())
        } else {
            let token = node
                .utf8_text(source.as_bytes())
                .ok()
                .and_then(|t| t.split_whitespace().next())
                .map(|t| t.chars().take(20).collect::<String>());
            match token {
                Some(tok) => format!("Parsing error: Unexpected token {tok}"),
                None => "Parsing error: Unexpected end of input".to_string(),
            }
        };
        found = Some(SyntaxError { line, message });
    });
    found
}

/// Pre-order walk over every node below (and including) `root`.
pub(crate) fn for_each_node<'t>(root: Node<'t>, mut visit: impl FnMut(Node<'t>)) {
    let mut cursor = root.walk();
    loop {
        visit(cursor.node());
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}
