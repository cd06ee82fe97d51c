//! Regex-based symbol and call-reference extraction.
//!
//! Trades AST accuracy (out of scope) for a fast, dependency-light
//! per-language dispatch: one `LanguageExtractor` implementor per
//! language, each built from a small set of precompiled declaration and
//! call-site patterns. Call-site attribution is a heuristic — each call
//! is attributed to the nearest preceding declaration found at or above
//! its brace depth, not to a verified lexical scope.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::scanner::Language;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Function,
    Method,
    Struct,
    Class,
    Interface,
    Enum,
    Trait,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Struct => "struct",
            SymbolKind::Class => "class",
            SymbolKind::Interface => "interface",
            SymbolKind::Enum => "enum",
            SymbolKind::Trait => "trait",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExtractedSymbol {
    pub name: String,
    pub kind: SymbolKind,
    /// 1-indexed line number of the declaration.
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct ExtractedCall {
    /// Name of the enclosing declaration, if one was found above this call.
    pub caller: Option<String>,
    pub callee: String,
    /// 1-indexed line number of the call site.
    pub line: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ExtractionResult {
    pub symbols: Vec<ExtractedSymbol>,
    pub calls: Vec<ExtractedCall>,
}

/// A declaration pattern: regex plus the symbol kind it denotes. Capture
/// group 1 must be the symbol name.
struct DeclPattern {
    regex: Regex,
    kind: SymbolKind,
}

/// Generic line-oriented extractor driven by per-language regex tables.
/// Declarations are matched line-by-line; calls are matched against a
/// single "looks like a call" pattern and excluded when they coincide
/// with a declaration line (to avoid `fn foo(` being read as a call to
/// `foo`) or match a keyword in the language's control-flow list.
pub struct RegexExtractor {
    decls: Vec<DeclPattern>,
    call_pattern: Regex,
    keywords: &'static [&'static str],
}

static CALL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z_][A-Za-z0-9_]*)\s*\(").unwrap());

const COMMON_KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "match", "return", "catch", "fn", "def", "func", "function",
    "class", "struct", "enum", "trait", "interface", "impl", "new", "super", "this", "self",
];

impl RegexExtractor {
    fn new(decls: Vec<(&str, SymbolKind)>) -> Self {
        let decls = decls
            .into_iter()
            .map(|(pattern, kind)| DeclPattern {
                regex: Regex::new(pattern).expect("valid decl regex"),
                kind,
            })
            .collect();
        Self {
            decls,
            call_pattern: CALL_PATTERN.clone(),
            keywords: COMMON_KEYWORDS,
        }
    }

    pub fn extract(&self, content: &str) -> ExtractionResult {
        let mut symbols = Vec::new();
        let mut calls = Vec::new();
        let mut current_fn: Option<String> = None;
        let mut fn_end_depth: Option<i32> = None;
        let mut depth: i32 = 0;

        for (idx, line) in content.lines().enumerate() {
            let line_no = idx + 1;
            let mut matched_decl = false;

            for decl in &self.decls {
                if let Some(caps) = decl.regex.captures(line) {
                    if let Some(name) = caps.get(1) {
                        symbols.push(ExtractedSymbol {
                            name: name.as_str().to_string(),
                            kind: decl.kind,
                            line: line_no,
                        });
                        if matches!(decl.kind, SymbolKind::Function | SymbolKind::Method) {
                            current_fn = Some(name.as_str().to_string());
                            fn_end_depth = Some(depth);
                        }
                        matched_decl = true;
                    }
                }
            }

            if !matched_decl {
                for caps in self.call_pattern.captures_iter(line) {
                    let name = caps.get(1).unwrap().as_str();
                    if self.keywords.contains(&name) {
                        continue;
                    }
                    calls.push(ExtractedCall {
                        caller: current_fn.clone(),
                        callee: name.to_string(),
                        line: line_no,
                    });
                }
            }

            depth += line.matches('{').count() as i32;
            depth -= line.matches('}').count() as i32;

            if let Some(end_depth) = fn_end_depth {
                if depth <= end_depth && matched_decl {
                    // stay in scope for the declaration line itself
                } else if depth <= end_depth {
                    current_fn = None;
                    fn_end_depth = None;
                }
            }
        }

        ExtractionResult { symbols, calls }
    }
}

fn rust_extractor() -> RegexExtractor {
    RegexExtractor::new(vec![
        (r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:async\s+)?fn\s+([A-Za-z_][A-Za-z0-9_]*)", SymbolKind::Function),
        (r"^\s*(?:pub(?:\([^)]*\))?\s+)?struct\s+([A-Za-z_][A-Za-z0-9_]*)", SymbolKind::Struct),
        (r"^\s*(?:pub(?:\([^)]*\))?\s+)?enum\s+([A-Za-z_][A-Za-z0-9_]*)", SymbolKind::Enum),
        (r"^\s*(?:pub(?:\([^)]*\))?\s+)?trait\s+([A-Za-z_][A-Za-z0-9_]*)", SymbolKind::Trait),
    ])
}

fn python_extractor() -> RegexExtractor {
    RegexExtractor::new(vec![
        (r"^\s*(?:async\s+)?def\s+([A-Za-z_][A-Za-z0-9_]*)", SymbolKind::Function),
        (r"^\s*class\s+([A-Za-z_][A-Za-z0-9_]*)", SymbolKind::Class),
    ])
}

fn js_ts_extractor() -> RegexExtractor {
    RegexExtractor::new(vec![
        (r"^\s*(?:export\s+)?(?:async\s+)?function\s+([A-Za-z_$][A-Za-z0-9_$]*)", SymbolKind::Function),
        (r"^\s*(?:export\s+)?class\s+([A-Za-z_$][A-Za-z0-9_$]*)", SymbolKind::Class),
        (r"^\s*(?:export\s+)?interface\s+([A-Za-z_$][A-Za-z0-9_$]*)", SymbolKind::Interface),
        (r"^\s*(?:export\s+)?const\s+([A-Za-z_$][A-Za-z0-9_$]*)\s*=\s*(?:async\s*)?\([^)]*\)\s*=>", SymbolKind::Function),
    ])
}

fn go_extractor() -> RegexExtractor {
    RegexExtractor::new(vec![
        (r"^\s*func\s+(?:\([^)]*\)\s*)?([A-Za-z_][A-Za-z0-9_]*)", SymbolKind::Function),
        (r"^\s*type\s+([A-Za-z_][A-Za-z0-9_]*)\s+struct", SymbolKind::Struct),
        (r"^\s*type\s+([A-Za-z_][A-Za-z0-9_]*)\s+interface", SymbolKind::Interface),
    ])
}

fn java_cs_extractor() -> RegexExtractor {
    RegexExtractor::new(vec![
        (r"^\s*(?:public|private|protected|internal|static|\s)*\s+class\s+([A-Za-z_][A-Za-z0-9_]*)", SymbolKind::Class),
        (r"^\s*(?:public|private|protected|internal|static|\s)*\s+interface\s+([A-Za-z_][A-Za-z0-9_]*)", SymbolKind::Interface),
        (r"^\s*(?:public|private|protected|internal|static|final|async|\s)+[A-Za-z_<>\[\],. ]+\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(", SymbolKind::Method),
    ])
}

fn c_cpp_extractor() -> RegexExtractor {
    RegexExtractor::new(vec![
        (r"^\s*(?:static\s+|inline\s+)*[A-Za-z_][A-Za-z0-9_ *<>:,&]*[ *&]([A-Za-z_][A-Za-z0-9_]*)\s*\([^;]*\)\s*\{?\s*$", SymbolKind::Function),
        (r"^\s*(?:typedef\s+)?struct\s+([A-Za-z_][A-Za-z0-9_]*)", SymbolKind::Struct),
        (r"^\s*class\s+([A-Za-z_][A-Za-z0-9_]*)", SymbolKind::Class),
    ])
}

/// Dispatch by language. Returns `None` for languages with no dedicated
/// extractor (the indexer simply skips symbol extraction for that file).
pub fn get_extractor(language: Language) -> Option<RegexExtractor> {
    match language {
        Language::Rust => Some(rust_extractor()),
        Language::Python => Some(python_extractor()),
        Language::JavaScript | Language::TypeScript => Some(js_ts_extractor()),
        Language::Go => Some(go_extractor()),
        Language::Java | Language::CSharp => Some(java_cs_extractor()),
        Language::C | Language::Cpp => Some(c_cpp_extractor()),
        Language::Ruby | Language::Php | Language::Other | Language::Unknown => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rust_functions_and_calls() {
        let extractor = rust_extractor();
        let src = "fn outer() {\n    inner();\n}\n\nfn inner() {\n    println!(\"hi\");\n}\n";
        let result = extractor.extract(src);

        assert_eq!(result.symbols.len(), 2);
        assert_eq!(result.symbols[0].name, "outer");
        assert_eq!(result.symbols[1].name, "inner");

        let call = result.calls.iter().find(|c| c.callee == "inner").unwrap();
        assert_eq!(call.caller.as_deref(), Some("outer"));
    }

    #[test]
    fn test_python_class_and_def() {
        let extractor = python_extractor();
        let src = "class Foo:\n    def bar(self):\n        self.baz()\n";
        let result = extractor.extract(src);
        assert!(result.symbols.iter().any(|s| s.name == "Foo" && s.kind == SymbolKind::Class));
        assert!(result.symbols.iter().any(|s| s.name == "bar" && s.kind == SymbolKind::Function));
    }

    #[test]
    fn test_keywords_excluded_from_calls() {
        let extractor = rust_extractor();
        let src = "fn f() {\n    if (true) {\n        g();\n    }\n}\n";
        let result = extractor.extract(src);
        assert!(!result.calls.iter().any(|c| c.callee == "if"));
        assert!(result.calls.iter().any(|c| c.callee == "g"));
    }

    #[test]
    fn test_unsupported_language_returns_none() {
        assert!(get_extractor(Language::Other).is_none());
    }
}
