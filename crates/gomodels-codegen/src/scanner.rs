//! Go source scanner built on tree-sitter.

use std::fs;
use std::path::{Path, PathBuf};

use tree_sitter::{Node, Parser, Tree};

use crate::error::{Error, Result};

/// One `import` spec of a Go file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    /// Explicit local name (`pg "github.com/jackc/pgx/v5/pgtype"`), if any.
    pub name: Option<String>,
    /// Import path without quotes.
    pub path: String,
}

impl ImportSpec {
    /// The spec as written in an import block: `name "path"` or `"path"`.
    pub fn to_spec_string(&self) -> String {
        match &self.name {
            Some(name) => format!("{name} \"{}\"", self.path),
            None => format!("\"{}\"", self.path),
        }
    }

    /// Inverse of [`ImportSpec::to_spec_string`].
    pub fn from_spec_string(spec: &str) -> Option<Self> {
        let spec = spec.trim();
        let (name, path) = match spec.split_once(char::is_whitespace) {
            Some((name, path)) => (Some(name.to_string()), path.trim()),
            None => (None, spec),
        };
        let path = path.strip_prefix('"')?.strip_suffix('"')?;
        Some(Self {
            name,
            path: path.to_string(),
        })
    }

    /// Identifier the package is referred to by inside the file.
    ///
    /// A trailing major-version segment (`/v5`) is skipped.
    pub fn local_name(&self) -> &str {
        if let Some(name) = &self.name {
            return name;
        }
        let mut segments = self.path.rsplit('/');
        let last = segments.next().unwrap_or(&self.path);
        let is_version = last.len() > 1
            && last.starts_with('v')
            && last[1..].chars().all(|c| c.is_ascii_digit());
        if is_version {
            segments.next().unwrap_or(last)
        } else {
            last
        }
    }
}

/// A parsed Go source file.
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub path: PathBuf,
    pub source: String,
    pub tree: Tree,
    /// Name from the `package` clause.
    pub package: String,
    pub imports: Vec<ImportSpec>,
}

impl ParsedFile {
    /// Read and parse a Go file.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::parse(path, source)
    }

    /// Parse Go source. `path` is only used for error messages and caching.
    pub fn parse(path: impl Into<PathBuf>, source: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let source = source.into();

        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_go::LANGUAGE.into())
            .map_err(|e| Error::Parse {
                path: path.clone(),
                reason: format!("failed to load Go grammar: {e}"),
            })?;
        let tree = parser.parse(&source, None).ok_or_else(|| Error::Parse {
            path: path.clone(),
            reason: "parser returned no tree".to_string(),
        })?;

        if tree.root_node().has_error() {
            let reason = first_error(tree.root_node())
                .map(|node| {
                    let pos = node.start_position();
                    format!("syntax error at {}:{}", pos.row + 1, pos.column + 1)
                })
                .unwrap_or_else(|| "syntax error".to_string());
            return Err(Error::Parse { path, reason });
        }

        let mut package = String::new();
        let mut imports = Vec::new();
        {
            let root = tree.root_node();
            let bytes = source.as_bytes();
            let mut cursor = root.walk();
            for child in root.named_children(&mut cursor) {
                match child.kind() {
                    "package_clause" => {
                        let mut inner = child.walk();
                        if let Some(ident) = child
                            .named_children(&mut inner)
                            .find(|n| n.kind() == "package_identifier")
                        {
                            package = node_text(ident, bytes).to_string();
                        }
                    }
                    "import_declaration" => collect_imports(child, bytes, &mut imports),
                    _ => {}
                }
            }
        }

        Ok(Self {
            path,
            source,
            tree,
            package,
            imports,
        })
    }

    /// Import spec strings in declaration order.
    pub fn import_specs(&self) -> Vec<String> {
        self.imports.iter().map(ImportSpec::to_spec_string).collect()
    }

    /// Import path for a package identifier used in this file.
    pub fn import_path_for(&self, local_name: &str) -> Option<&str> {
        self.imports
            .iter()
            .find(|i| i.local_name() == local_name)
            .map(|i| i.path.as_str())
    }

    /// Directory containing the file.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    pub fn text(&self, node: Node<'_>) -> &str {
        node_text(node, self.source.as_bytes())
    }

    /// Every top-level `type_spec` / `type_alias` node, grouped forms included.
    pub fn type_specs(&self) -> Vec<Node<'_>> {
        let root = self.tree.root_node();
        let mut specs = Vec::new();
        let mut cursor = root.walk();
        for decl in root.named_children(&mut cursor) {
            if decl.kind() != "type_declaration" {
                continue;
            }
            let mut inner = decl.walk();
            specs.extend(
                decl.named_children(&mut inner)
                    .filter(|n| matches!(n.kind(), "type_spec" | "type_alias")),
            );
        }
        specs
    }

    /// The top-level type spec declaring `name`, if any.
    pub fn find_type_spec(&self, name: &str) -> Option<Node<'_>> {
        self.type_specs().into_iter().find(|spec| {
            spec.child_by_field_name("name")
                .is_some_and(|n| self.text(n) == name)
        })
    }
}

pub(crate) fn node_text<'a>(node: Node<'_>, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error()
            && let Some(found) = first_error(child)
        {
            return Some(found);
        }
    }
    None
}

fn collect_imports(decl: Node<'_>, source: &[u8], imports: &mut Vec<ImportSpec>) {
    let mut cursor = decl.walk();
    for child in decl.named_children(&mut cursor) {
        match child.kind() {
            "import_spec" => {
                if let Some(spec) = import_spec(child, source) {
                    imports.push(spec);
                }
            }
            "import_spec_list" => {
                let mut inner = child.walk();
                for spec in child.named_children(&mut inner) {
                    if spec.kind() == "import_spec"
                        && let Some(spec) = import_spec(spec, source)
                    {
                        imports.push(spec);
                    }
                }
            }
            _ => {}
        }
    }
}

fn import_spec(node: Node<'_>, source: &[u8]) -> Option<ImportSpec> {
    let path = node.child_by_field_name("path")?;
    let path = node_text(path, source).trim_matches(|c| c == '"' || c == '`');
    let name = node
        .child_by_field_name("name")
        .map(|n| node_text(n, source).to_string());
    Some(ImportSpec {
        name,
        path: path.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"
package models

import (
	"time"

	pg "github.com/jackc/pgx/v5/pgtype"
	"github.com/google/uuid"
	"github.com/jackc/pgx/v5"
)

type (
	Status int16
	User struct {
		ID int64
	}
)

type Alias = pg.Text
"#;

    #[test]
    fn test_package_and_imports() {
        let file = ParsedFile::parse("models.go", SOURCE).unwrap();
        assert_eq!(file.package, "models");
        assert_eq!(
            file.import_specs(),
            vec![
                r#""time""#,
                r#"pg "github.com/jackc/pgx/v5/pgtype""#,
                r#""github.com/google/uuid""#,
                r#""github.com/jackc/pgx/v5""#,
            ]
        );
        assert_eq!(file.import_path_for("pg"), Some("github.com/jackc/pgx/v5/pgtype"));
        assert_eq!(file.import_path_for("pgx"), Some("github.com/jackc/pgx/v5"));
        assert_eq!(file.import_path_for("uuid"), Some("github.com/google/uuid"));

        for spec in &file.imports {
            assert_eq!(ImportSpec::from_spec_string(&spec.to_spec_string()).as_ref(), Some(spec));
        }
        assert_eq!(ImportSpec::from_spec_string("time"), None);
    }

    #[test]
    fn test_type_specs_include_grouped_and_alias_forms() {
        let file = ParsedFile::parse("models.go", SOURCE).unwrap();
        let names: Vec<_> = file
            .type_specs()
            .into_iter()
            .filter_map(|s| s.child_by_field_name("name"))
            .map(|n| file.text(n).to_string())
            .collect();
        assert_eq!(names, vec!["Status", "User", "Alias"]);
        assert!(file.find_type_spec("User").is_some());
        assert!(file.find_type_spec("Missing").is_none());
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let err = ParsedFile::parse("broken.go", "package x\ntype User struct {").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }
}
