//! Struct extraction from parsed Go files.
//!
//! The extractor walks every top-level `type` declaration of a file:
//!
//! - `type User struct { ... }` becomes a [`StructEntry`], fields in
//!   declaration order, tags parsed into [`FieldTags`];
//! - `type Status int16` (or any slice/map/pointer type) becomes a scalar alias;
//! - `type Account = auth.Account` and `type Row Base` point at a declaration
//!   elsewhere and are recorded as [`ExternalCandidate`]s for the
//!   [`Resolver`](crate::resolver::Resolver);
//! - interface and func declarations are skipped.
//!
//! Extraction is a pure function of the syntax tree. Package lookups happen in
//! the resolver.

use tracing::{debug, warn};
use tree_sitter::Node;

use crate::catalog::{FieldEntry, FieldTags, StructEntry};
use crate::scanner::ParsedFile;
use crate::types;

/// A non-struct declaration whose right-hand side names another type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCandidate {
    pub local_name: String,
    /// `Some("pkg")` for `pkg.Type`, `None` for a bare identifier.
    pub selector_package: Option<String>,
    pub selector_type: String,
}

/// A field dropped because its type could not be classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFailure {
    pub struct_name: String,
    pub field_name: String,
    pub reason: String,
}

/// Everything extracted from one file.
#[derive(Debug, Clone, Default)]
pub struct FileExtraction {
    pub package: String,
    pub imports: Vec<String>,
    pub structs: Vec<StructEntry>,
    pub aliases: Vec<(String, String)>,
    pub candidates: Vec<ExternalCandidate>,
    pub failures: Vec<FieldFailure>,
}

/// What a single type declaration turned into.
#[derive(Debug, Clone)]
pub(crate) enum TypeDecl {
    Struct(StructEntry, Vec<FieldFailure>),
    Alias(String, String),
    Candidate(ExternalCandidate),
    Skipped,
}

/// Extract every top-level type declaration of a file.
pub fn extract_file(file: &ParsedFile) -> FileExtraction {
    let mut out = FileExtraction {
        package: file.package.clone(),
        imports: file.import_specs(),
        ..Default::default()
    };

    for spec in file.type_specs() {
        match extract_type_spec(file, spec) {
            TypeDecl::Struct(entry, failures) => {
                out.structs.push(entry);
                out.failures.extend(failures);
            }
            TypeDecl::Alias(name, underlying) => out.aliases.push((name, underlying)),
            TypeDecl::Candidate(candidate) => out.candidates.push(candidate),
            TypeDecl::Skipped => {}
        }
    }

    out
}

/// Extract the declaration of `name` from `file`, if the file declares it.
pub(crate) fn extract_named_type(file: &ParsedFile, name: &str) -> Option<TypeDecl> {
    file.find_type_spec(name)
        .map(|spec| extract_type_spec(file, spec))
}

pub(crate) fn extract_type_spec(file: &ParsedFile, spec: Node<'_>) -> TypeDecl {
    let Some(name_node) = spec.child_by_field_name("name") else {
        return TypeDecl::Skipped;
    };
    let name = file.text(name_node).to_string();
    let Some(ty) = spec.child_by_field_name("type") else {
        return TypeDecl::Skipped;
    };

    if spec.child_by_field_name("type_parameters").is_some() {
        warn!(type_name = %name, file = %file.path.display(), "skipping generic type declaration");
        return TypeDecl::Skipped;
    }

    match ty.kind() {
        "struct_type" => {
            let (entry, failures) = extract_struct(file, &name, ty);
            TypeDecl::Struct(entry, failures)
        }
        "type_identifier" => {
            let target = file.text(ty).to_string();
            if types::is_builtin(&target) {
                TypeDecl::Alias(name, target)
            } else {
                TypeDecl::Candidate(ExternalCandidate {
                    local_name: name,
                    selector_package: None,
                    selector_type: target,
                })
            }
        }
        "qualified_type" => match qualified_parts(file, ty) {
            Some((package, type_name)) => TypeDecl::Candidate(ExternalCandidate {
                local_name: name,
                selector_package: Some(package),
                selector_type: type_name,
            }),
            None => TypeDecl::Skipped,
        },
        "interface_type" | "function_type" => {
            debug!(type_name = %name, "skipping interface/func declaration");
            TypeDecl::Skipped
        }
        _ => match resolve_type_expr(file, ty) {
            Ok(underlying) => TypeDecl::Alias(name, underlying),
            Err(reason) => {
                warn!(type_name = %name, %reason, "skipping type declaration");
                TypeDecl::Skipped
            }
        },
    }
}

fn extract_struct(
    file: &ParsedFile,
    name: &str,
    struct_node: Node<'_>,
) -> (StructEntry, Vec<FieldFailure>) {
    let mut entry = StructEntry::new(name);
    entry.imports = file.import_specs().into_iter().collect();
    let mut failures = Vec::new();

    let mut cursor = struct_node.walk();
    let Some(list) = struct_node
        .named_children(&mut cursor)
        .find(|n| n.kind() == "field_declaration_list")
    else {
        return (entry, failures);
    };

    let mut list_cursor = list.walk();
    for decl in list.named_children(&mut list_cursor) {
        if decl.kind() != "field_declaration" {
            continue;
        }

        let mut names_cursor = decl.walk();
        let names: Vec<String> = decl
            .children_by_field_name("name", &mut names_cursor)
            .map(|n| file.text(n).to_string())
            .collect();

        let Some(ty) = decl.child_by_field_name("type") else {
            continue;
        };
        if names.is_empty() {
            debug!(struct_name = %name, embedded = %file.text(ty), "skipping embedded field");
            continue;
        }

        let tags = decl
            .child_by_field_name("tag")
            .map(|t| FieldTags::parse(file.text(t)))
            .unwrap_or_default();

        match resolve_type_expr(file, ty) {
            Ok(type_name) => {
                for field_name in names {
                    entry
                        .fields
                        .push(FieldEntry::new(field_name, type_name.clone(), tags.clone()));
                }
            }
            Err(reason) => {
                for field_name in names {
                    warn!(struct_name = %name, field_name = %field_name, %reason, "dropping field");
                    failures.push(FieldFailure {
                        struct_name: name.to_string(),
                        field_name,
                        reason: reason.clone(),
                    });
                }
            }
        }
    }

    (entry, failures)
}

/// Resolve a type expression node to its canonical Go type string.
pub(crate) fn resolve_type_expr(file: &ParsedFile, node: Node<'_>) -> Result<String, String> {
    match node.kind() {
        "type_identifier" => Ok(file.text(node).to_string()),
        "qualified_type" => qualified_parts(file, node)
            .map(|(package, name)| format!("{package}.{name}"))
            .ok_or_else(|| "undefined selector expression".to_string()),
        "pointer_type" => {
            let inner = first_type_child(node).ok_or("pointer without element type")?;
            Ok(format!("*{}", resolve_type_expr(file, inner)?))
        }
        "slice_type" | "array_type" | "implicit_length_array_type" => {
            let elem = node
                .child_by_field_name("element")
                .ok_or("array without element type")?;
            Ok(format!("[]{}", resolve_type_expr(file, elem)?))
        }
        "map_type" => {
            let key = node
                .child_by_field_name("key")
                .ok_or("map without key type")?;
            let value = node
                .child_by_field_name("value")
                .ok_or("map without value type")?;
            let key = resolve_type_expr(file, key)?;
            if is_empty_interface(value) {
                return Ok(format!("map[{key}]any"));
            }
            Ok(format!("map[{key}]{}", resolve_type_expr(file, value)?))
        }
        "parenthesized_type" => {
            let inner = first_type_child(node).ok_or("empty parenthesized type")?;
            resolve_type_expr(file, inner)
        }
        "interface_type" if is_empty_interface(node) => Ok("any".to_string()),
        "interface_type" | "function_type" => Ok(normalize(file.text(node))),
        "struct_type" => Err("inline struct types are not supported".to_string()),
        "channel_type" => Err("channel types are not supported".to_string()),
        "generic_type" => Err(format!(
            "generic instantiation `{}` is not supported",
            normalize(file.text(node))
        )),
        other => Err(format!("unavailable type expression `{other}`")),
    }
}

fn qualified_parts(file: &ParsedFile, node: Node<'_>) -> Option<(String, String)> {
    let package = node.child_by_field_name("package")?;
    let name = node.child_by_field_name("name")?;
    Some((file.text(package).to_string(), file.text(name).to_string()))
}

fn first_type_child(node: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .find(|n| n.kind() != "comment")
}

fn is_empty_interface(node: Node<'_>) -> bool {
    if node.kind() != "interface_type" {
        return false;
    }
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .all(|n| n.kind() == "comment")
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
