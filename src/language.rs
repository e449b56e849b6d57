//! Detección del lenguaje de un fichero a partir de su extensión.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Typescript,
    Javascript,
    Python,
    Java,
    Cpp,
    C,
    Go,
    Rust,
    Ruby,
    Php,
    Html,
    Css,
    Json,
    Plaintext,
}

const LANGUAGE_BY_EXTENSION: [(&str, Language); 15] = [
    ("ts", Language::Typescript),
    ("tsx", Language::Typescript),
    ("js", Language::Javascript),
    ("jsx", Language::Javascript),
    ("py", Language::Python),
    ("java", Language::Java),
    ("cpp", Language::Cpp),
    ("c", Language::C),
    ("go", Language::Go),
    ("rs", Language::Rust),
    ("rb", Language::Ruby),
    ("php", Language::Php),
    ("html", Language::Html),
    ("css", Language::Css),
    ("json", Language::Json),
];

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Typescript => "typescript",
            Language::Javascript => "javascript",
            Language::Python => "python",
            Language::Java => "java",
            Language::Cpp => "cpp",
            Language::C => "c",
            Language::Go => "go",
            Language::Rust => "rust",
            Language::Ruby => "ruby",
            Language::Php => "php",
            Language::Html => "html",
            Language::Css => "css",
            Language::Json => "json",
            Language::Plaintext => "plaintext",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Devuelve el lenguaje asociado a la extensión de `path`; sin extensión o
/// con una extensión desconocida se usa `Plaintext`.
pub fn detect_language(path: &str) -> Language {
    let Some(ext) = Path::new(path)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
    else {
        return Language::Plaintext;
    };

    LANGUAGE_BY_EXTENSION
        .iter()
        .find(|(e, _)| *e == ext.as_str())
        .map(|(_, lang)| *lang)
        .unwrap_or(Language::Plaintext)
}
