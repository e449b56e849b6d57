//! Colaborador de contenido de ficheros para la vista previa de código.

use anyhow::Result;
use futures::future::BoxFuture;
use serde::Serialize;

use crate::language::{detect_language, Language};

pub trait FileContentSource: Send + Sync {
    /// Devuelve el texto del fichero. El llamante ya ha comprobado que el
    /// path existe en el árbol actual.
    fn fetch_content<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<String>>;
}

/// Genera un texto de relleno hasta que exista un backend real.
#[derive(Debug, Clone, Default)]
pub struct PlaceholderContent;

impl FileContentSource for PlaceholderContent {
    fn fetch_content<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            Ok(format!(
                "// File: {path}\n// El contenido se cargará desde el backend\n\nconsole.log(\"Hello from {path}\");"
            ))
        })
    }
}

/// Lo que muestra el panel de vista previa para el fichero seleccionado.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePreview {
    pub path: String,
    pub content: String,
    pub language: Language,
    pub download_name: String,
}

impl FilePreview {
    pub fn new(path: &str, content: String) -> Self {
        let download_name = path
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or("file.txt")
            .to_string();
        Self {
            path: path.to_string(),
            content,
            language: detect_language(path),
            download_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn placeholder_mentions_path() {
        let text = PlaceholderContent.fetch_content("src/utils.ts").await.unwrap();
        assert!(text.starts_with("// File: src/utils.ts"));
    }

    #[test]
    fn preview_detects_language_and_download_name() {
        let preview = FilePreview::new("src/components/App.tsx", "x".into());
        assert_eq!(preview.language, Language::Typescript);
        assert_eq!(preview.download_name, "App.tsx");

        let preview = FilePreview::new("README", String::new());
        assert_eq!(preview.language, Language::Plaintext);
        assert_eq!(preview.download_name, "README");

        assert_eq!(FilePreview::new("docs/", String::new()).download_name, "file.txt");
    }
}
