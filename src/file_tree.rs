//! Árbol de ficheros del proyecto: filtrado, búsqueda, estado de expansión
//! del explorador y selección de ficheros de contexto.
//!
//! El árbol sólo se reemplaza entero (al terminar una subida o al crear un
//! proyecto nuevo); no hay operaciones de renombrado ni borrado parcial.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::error::{ShellError, ShellResult};
use crate::models::FileNode;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileTree {
    roots: Vec<FileNode>,
}

impl FileTree {
    /// Construye un árbol a partir de nodos ya formados, comprobando que los
    /// paths son únicos, coherentes con sus ancestros y que ningún fichero
    /// tiene hijos.
    pub fn new(roots: Vec<FileNode>) -> ShellResult<Self> {
        let mut seen = HashSet::new();
        validate_nodes(&roots, "", &mut seen)?;
        Ok(Self { roots })
    }

    /// Construye la jerarquía a partir de paths de ficheros separados por `/`,
    /// creando las carpetas intermedias. Carpetas primero, luego por nombre.
    pub fn from_entries<I, S>(entries: I) -> ShellResult<Self>
    where
        I: IntoIterator<Item = (S, Option<u64>)>,
        S: AsRef<str>,
    {
        let mut roots = Vec::new();
        for (raw_path, size) in entries {
            let path = raw_path.as_ref().trim_matches('/');
            let segments: Vec<&str> = path.split('/').collect();
            if path.is_empty() || segments.iter().any(|s| s.is_empty()) {
                return Err(ShellError::InvalidInput(format!(
                    "Ruta de fichero no válida: '{}'",
                    raw_path.as_ref()
                )));
            }
            insert_entry(&mut roots, &segments, 0, size)?;
        }
        sort_nodes(&mut roots);
        Ok(Self { roots })
    }

    pub fn roots(&self) -> &[FileNode] {
        &self.roots
    }

    pub fn into_roots(self) -> Vec<FileNode> {
        self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Sustitución atómica del árbol completo.
    pub fn replace(&mut self, other: FileTree) {
        self.roots = other.roots;
    }

    pub fn find(&self, path: &str) -> Option<&FileNode> {
        let mut nodes = &self.roots;
        let mut found = None;
        for segment in path.split('/') {
            let node = nodes.iter().find(|n| n.name == segment)?;
            nodes = &node.children;
            found = Some(node);
        }
        found.filter(|node| node.path == path)
    }

    pub fn file_count(&self) -> usize {
        count_nodes(&self.roots, false)
    }

    pub fn folder_count(&self) -> usize {
        count_nodes(&self.roots, true)
    }

    /// Copia podada del árbol con los nodos cuyo nombre contiene `query`
    /// (sin distinguir mayúsculas). Una carpeta se conserva si ella o algún
    /// descendiente coincide, y sus hijos son siempre los hijos filtrados.
    pub fn filter(&self, query: &str) -> Vec<FileNode> {
        if query.is_empty() {
            return self.roots.clone();
        }
        filter_nodes(&self.roots, &query.to_lowercase())
    }
}

fn validate_nodes(nodes: &[FileNode], parent: &str, seen: &mut HashSet<String>) -> ShellResult<()> {
    for node in nodes {
        let expected = if parent.is_empty() {
            node.name.clone()
        } else {
            format!("{parent}/{}", node.name)
        };
        if node.name.is_empty() || node.name.contains('/') || node.path != expected {
            return Err(ShellError::InvalidInput(format!(
                "El nodo '{}' no coincide con la ruta esperada '{expected}'",
                node.path
            )));
        }
        if !seen.insert(node.path.clone()) {
            return Err(ShellError::InvalidInput(format!("Ruta duplicada: {}", node.path)));
        }
        if !node.is_folder() && !node.children.is_empty() {
            return Err(ShellError::InvalidInput(format!(
                "El fichero '{}' no puede tener hijos",
                node.path
            )));
        }
        validate_nodes(&node.children, &node.path, seen)?;
    }
    Ok(())
}

fn insert_entry(
    nodes: &mut Vec<FileNode>,
    segments: &[&str],
    depth: usize,
    size: Option<u64>,
) -> ShellResult<()> {
    let name = segments[depth];
    let path = segments[..=depth].join("/");
    let existing = nodes.iter().position(|n| n.name == name);

    if depth + 1 == segments.len() {
        if existing.is_some() {
            return Err(ShellError::InvalidInput(format!("Ruta duplicada: {path}")));
        }
        nodes.push(FileNode::file(name, path, size));
        return Ok(());
    }

    let index = match existing {
        Some(i) if nodes[i].is_folder() => i,
        Some(_) => {
            return Err(ShellError::InvalidInput(format!(
                "'{path}' es un fichero y no puede contener otros"
            )))
        }
        None => {
            nodes.push(FileNode::folder(name, path, Vec::new()));
            nodes.len() - 1
        }
    };
    insert_entry(&mut nodes[index].children, segments, depth + 1, size)
}

fn sort_nodes(nodes: &mut [FileNode]) {
    nodes.sort_by(|a, b| {
        b.is_folder()
            .cmp(&a.is_folder())
            .then_with(|| a.name.cmp(&b.name))
    });
    for node in nodes.iter_mut() {
        sort_nodes(&mut node.children);
    }
}

fn count_nodes(nodes: &[FileNode], folders: bool) -> usize {
    nodes
        .iter()
        .map(|n| usize::from(n.is_folder() == folders) + count_nodes(&n.children, folders))
        .sum()
}

fn filter_nodes(nodes: &[FileNode], needle: &str) -> Vec<FileNode> {
    nodes
        .iter()
        .filter_map(|node| {
            let name_matches = node.name.to_lowercase().contains(needle);
            if node.is_folder() {
                let children = filter_nodes(&node.children, needle);
                (name_matches || !children.is_empty()).then(|| FileNode {
                    name: node.name.clone(),
                    path: node.path.clone(),
                    kind: node.kind,
                    children,
                    size: node.size,
                })
            } else {
                name_matches.then(|| node.clone())
            }
        })
        .collect()
}

/// Estado de expansión de carpetas, local al explorador. Por defecto sólo
/// las carpetas de profundidad 0 aparecen expandidas.
#[derive(Debug, Clone, Default)]
pub struct ExpandState {
    overrides: HashMap<String, bool>,
}

impl ExpandState {
    pub fn is_expanded(&self, node: &FileNode) -> bool {
        self.overrides
            .get(&node.path)
            .copied()
            .unwrap_or(node.depth() == 0)
    }

    /// Alterna una carpeta y devuelve el nuevo estado.
    pub fn toggle(&mut self, tree: &FileTree, path: &str) -> ShellResult<bool> {
        let node = tree
            .find(path)
            .ok_or_else(|| ShellError::NotFound(path.to_string()))?;
        if !node.is_folder() {
            return Err(ShellError::InvalidInput(format!(
                "'{path}' no es una carpeta"
            )));
        }
        let expanded = !self.is_expanded(node);
        self.overrides.insert(path.to_string(), expanded);
        Ok(expanded)
    }

    pub fn clear(&mut self) {
        self.overrides.clear();
    }

    /// Filas visibles en orden de pintado: `(profundidad, nodo)`.
    pub fn visible_rows<'a>(&self, nodes: &'a [FileNode]) -> Vec<(usize, &'a FileNode)> {
        let mut rows = Vec::new();
        self.collect_rows(nodes, 0, &mut rows);
        rows
    }

    fn collect_rows<'a>(&self, nodes: &'a [FileNode], depth: usize, rows: &mut Vec<(usize, &'a FileNode)>) {
        for node in nodes {
            rows.push((depth, node));
            if node.is_folder() && self.is_expanded(node) {
                self.collect_rows(&node.children, depth + 1, rows);
            }
        }
    }
}

/// Fichero abierto en la vista previa y conjunto de ficheros de contexto.
/// La existencia de los paths se comprueba al seleccionar, no de forma continua.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub selected_file: Option<String>,
    pub context_paths: BTreeSet<String>,
}

impl Selection {
    pub fn select_file(&mut self, tree: &FileTree, path: &str) -> ShellResult<()> {
        require_file(tree, path)?;
        self.selected_file = Some(path.to_string());
        Ok(())
    }

    /// Añade o quita `path` del contexto; devuelve `true` si queda incluido.
    /// Quitar siempre está permitido, añadir exige un fichero del árbol actual.
    pub fn toggle_context(&mut self, tree: &FileTree, path: &str) -> ShellResult<bool> {
        if self.context_paths.remove(path) {
            return Ok(false);
        }
        require_file(tree, path)?;
        self.context_paths.insert(path.to_string());
        Ok(true)
    }

    pub fn context_count(&self) -> usize {
        self.context_paths.len()
    }

    pub fn clear(&mut self) {
        self.selected_file = None;
        self.context_paths.clear();
    }
}

pub fn require_file<'a>(tree: &'a FileTree, path: &str) -> ShellResult<&'a FileNode> {
    let node = tree
        .find(path)
        .ok_or_else(|| ShellError::NotFound(path.to_string()))?;
    if node.is_folder() {
        return Err(ShellError::InvalidInput(format!("'{path}' es una carpeta")));
    }
    Ok(node)
}
