use std::path::Path;

/// Coarse language classification, by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Go,
    Java,
    C,
    Cpp,
    CSharp,
    Ruby,
    Php,
    Other,
    Unknown,
}

impl Language {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        match ext.as_str() {
            "rs" => Language::Rust,
            "py" | "pyw" | "pyi" => Language::Python,
            "js" | "mjs" | "cjs" | "jsx" => Language::JavaScript,
            "ts" | "mts" | "cts" | "tsx" => Language::TypeScript,
            "go" => Language::Go,
            "java" => Language::Java,
            "c" | "h" => Language::C,
            "cpp" | "cc" | "cxx" | "hpp" | "hxx" => Language::Cpp,
            "cs" | "csx" => Language::CSharp,
            "rb" | "rake" => Language::Ruby,
            "php" => Language::Php,
            "md" | "markdown" | "json" | "yaml" | "yml" | "toml" | "txt" => Language::Other,
            _ => Language::Unknown,
        }
    }

    /// Whether files of this language should be indexed at all.
    pub fn is_indexable(&self) -> bool {
        !matches!(self, Language::Unknown)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Language::Rust => "rust",
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Go => "go",
            Language::Java => "java",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::CSharp => "csharp",
            Language::Ruby => "ruby",
            Language::Php => "php",
            Language::Other => "other",
            Language::Unknown => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_from_path() {
        assert_eq!(Language::from_path(&PathBuf::from("main.rs")), Language::Rust);
        assert_eq!(Language::from_path(&PathBuf::from("app.py")), Language::Python);
        assert_eq!(
            Language::from_path(&PathBuf::from("data.bin")),
            Language::Unknown
        );
    }

    #[test]
    fn test_is_indexable() {
        assert!(Language::Rust.is_indexable());
        assert!(!Language::Unknown.is_indexable());
    }
}
