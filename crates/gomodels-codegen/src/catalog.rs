//! The struct catalog: extracted structs, their fields and scalar aliases.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use heck::ToUpperCamelCase;
use indexmap::{IndexMap, IndexSet};
use regex::Regex;

use crate::error::{Error, Result, Stage};
use crate::types::{self, GoType};

/// Go struct tag grammar: `key:"value"` pairs separated by spaces.
static TAG_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^\s:"]+):"((?:[^"\\]|\\.)*)""#).expect("valid tag regex")
});

/// Field tags in declaration order.
///
/// Serialization via [`FieldTags::to_go_tag`] sorts keys so generated output is
/// byte-stable regardless of how the tags were assembled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldTags(IndexMap<String, String>);

impl FieldTags {
    /// Create an empty tag set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a tag literal, with or without its surrounding back-ticks or
    /// quotes. Malformed input yields an empty map.
    pub fn parse(raw: &str) -> Self {
        let body = raw.trim().trim_matches('`');
        let mut tags = IndexMap::new();
        for caps in TAG_PAIR.captures_iter(body) {
            tags.insert(caps[1].to_string(), caps[2].to_string());
        }
        Self(tags)
    }

    /// Set a tag, replacing the value of an existing key in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Get the value of a tag key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Remove every tag.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Get the number of tags.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if there are no tags.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over tags in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Serialize as `key:"value"` pairs, keys sorted.
    pub fn to_go_tag(&self) -> String {
        let mut keys: Vec<_> = self.0.keys().collect();
        keys.sort();
        keys.iter()
            .map(|k| format!("{k}:\"{}\"", self.0[k.as_str()]))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldTags {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Metadata derived once from a field's type expression.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExprMeta {
    pub is_exported: bool,
    pub is_external_selector: bool,
    pub package_name: Option<String>,
    pub package_type_name: Option<String>,
    /// Interface, func and other types excluded from resolution and closure.
    pub is_opaque: bool,
}

impl ExprMeta {
    /// Classify a field type.
    pub fn from_type(ty: &GoType) -> Self {
        let leaf = match ty {
            GoType::Pointer(inner) | GoType::Slice(inner) => inner.base(),
            GoType::Map(_, value) => value.base(),
            other => other,
        };
        match leaf {
            GoType::Qualified { package, name } => ExprMeta {
                is_exported: types::is_exported(name),
                is_external_selector: true,
                package_name: Some(package.clone()),
                package_type_name: Some(name.clone()),
                is_opaque: false,
            },
            GoType::Named(name) => ExprMeta {
                is_exported: types::is_exported(name),
                ..Default::default()
            },
            _ => ExprMeta {
                is_opaque: ty.is_opaque(),
                ..Default::default()
            },
        }
    }
}

/// One struct field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEntry {
    pub name: String,
    /// Canonical Go type string.
    pub ty: String,
    pub tags: FieldTags,
    pub meta: ExprMeta,
}

impl FieldEntry {
    /// Create a field, classifying its type.
    pub fn new(name: impl Into<String>, ty: impl Into<String>, tags: FieldTags) -> Self {
        let ty = GoType::parse(&ty.into());
        Self {
            name: name.into(),
            meta: ExprMeta::from_type(&ty),
            ty: ty.to_string(),
            tags,
        }
    }

    /// The parsed field type.
    pub fn go_type(&self) -> GoType {
        GoType::parse(&self.ty)
    }

    /// Replace the type and recompute the expression metadata.
    pub fn set_type(&mut self, ty: &GoType) {
        self.ty = ty.to_string();
        self.meta = ExprMeta::from_type(ty);
    }

    /// Check if the field name is exported.
    pub fn is_exported(&self) -> bool {
        types::is_exported(&self.name)
    }
}

/// One extracted struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructEntry {
    pub name: String,
    pub original_name: String,
    /// Package alias the struct was pulled in from, if it lives elsewhere.
    pub external_package_alias: Option<String>,
    /// Import specs of the file(s) the struct came from.
    pub imports: IndexSet<String>,
    pub fields: Vec<FieldEntry>,
}

impl StructEntry {
    /// Create a struct with no fields.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            original_name: name.clone(),
            name,
            external_package_alias: None,
            imports: IndexSet::new(),
            fields: Vec::new(),
        }
    }

    /// Append a field, builder style.
    pub fn with_field(mut self, field: FieldEntry) -> Self {
        self.fields.push(field);
        self
    }

    /// Get the position of a field by name.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Get a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldEntry> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Field names in declaration order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Name used for generated models: `pkg.Type` becomes `PkgType`.
    pub fn model_name(&self) -> String {
        match self.name.split_once('.') {
            Some((package, name)) => format!("{}{}", package.to_upper_camel_case(), name),
            None => self.name.clone(),
        }
    }

    /// Rewrite every field type referencing struct `from` to reference `to`.
    pub fn rename_type_refs(&mut self, from: &str, to: &str) {
        for field in &mut self.fields {
            let ty = field.go_type();
            let renamed = ty.rename_refs(from, to);
            if renamed != ty {
                field.set_type(&renamed);
            }
        }
    }

    /// Drop every field whose name is not exported.
    pub fn remove_unexported_fields(&mut self) {
        self.fields.retain(FieldEntry::is_exported);
    }
}

/// Struct name → struct definition for one generation run.
///
/// The map key always equals [`StructEntry::name`]; iteration is sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructCatalog {
    entries: BTreeMap<String, StructEntry>,
}

impl StructCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry under its own name, returning the one it replaced.
    pub fn insert(&mut self, entry: StructEntry) -> Option<StructEntry> {
        self.entries.insert(entry.name.clone(), entry)
    }

    /// Get a struct by name.
    pub fn get(&self, name: &str) -> Option<&StructEntry> {
        self.entries.get(name)
    }

    /// Get a mutable struct by name.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut StructEntry> {
        self.entries.get_mut(name)
    }

    pub(crate) fn require_mut(&mut self, stage: Stage, name: &str) -> Result<&mut StructEntry> {
        self.entries
            .get_mut(name)
            .ok_or_else(|| Error::struct_not_found(stage, name))
    }

    /// Check if a struct name is in the catalog.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Remove a struct, returning it if it existed.
    pub fn remove(&mut self, name: &str) -> Option<StructEntry> {
        self.entries.remove(name)
    }

    /// Get the number of structs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Struct names in key order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterate over structs in key order.
    pub fn iter(&self) -> impl Iterator<Item = &StructEntry> {
        self.entries.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut StructEntry> {
        self.entries.values_mut()
    }

    /// Keep only the structs for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&StructEntry) -> bool) {
        self.entries.retain(|_, entry| keep(entry));
    }

    /// Merge `other` into this catalog; entries in `other` win.
    pub fn extend(&mut self, other: StructCatalog) {
        self.entries.extend(other.entries);
    }

    /// Check that no two structs project to the same model name, as a local
    /// `GeoPoint` and an external `geo.Point` would.
    pub fn check_model_names(&self) -> Result<()> {
        let mut seen: BTreeMap<String, &str> = BTreeMap::new();
        for entry in self.entries.values() {
            if let Some(other) = seen.insert(entry.model_name(), &entry.name) {
                return Err(Error::Config(format!(
                    "structs `{other}` and `{}` both generate the model `{}`",
                    entry.name,
                    entry.model_name()
                )));
            }
        }
        Ok(())
    }

    /// `original name → current name` for every renamed struct.
    pub fn renames(&self) -> Vec<(String, String)> {
        self.entries
            .values()
            .filter(|e| e.name != e.original_name && e.external_package_alias.is_none())
            .map(|e| (e.original_name.clone(), e.name.clone()))
            .collect()
    }

    /// Keep only the named structs. Every name must exist.
    pub fn include_only(&mut self, names: &[String]) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }
        if let Some(missing) = names.iter().find(|n| !self.contains(n)) {
            return Err(Error::struct_not_found(Stage::IncludeStructs, missing.as_str()));
        }
        self.entries.retain(|name, _| names.contains(name));
        Ok(())
    }

    /// Drop the named structs; names that do not exist are ignored.
    pub fn exclude(&mut self, names: &[String]) {
        for name in names {
            self.entries.remove(name);
        }
    }

    /// Filter by regular expressions: a struct is dropped when include patterns
    /// are given and none matches, or when any exclude pattern matches.
    pub fn filter_by_patterns(&mut self, include: &[String], exclude: &[String]) -> Result<()> {
        let include = compile_patterns(include)?;
        let exclude = compile_patterns(exclude)?;
        self.entries.retain(|name, _| {
            let included = include.is_empty() || include.iter().any(|re| re.is_match(name));
            let excluded = exclude.iter().any(|re| re.is_match(name));
            included && !excluded
        });
        Ok(())
    }

    /// Entries ordered with `priority` names first (in the given order), the
    /// rest alphabetically. Empty priority names are ignored.
    pub fn sorted(&self, priority: &[&str]) -> Result<Vec<&StructEntry>> {
        let priority: Vec<&str> = priority
            .iter()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .collect();
        let mut out = Vec::with_capacity(self.entries.len());
        for name in &priority {
            let entry = self
                .entries
                .get(*name)
                .ok_or_else(|| Error::struct_not_found(Stage::Sort, *name))?;
            if !out.iter().any(|e: &&StructEntry| e.name == entry.name) {
                out.push(entry);
            }
        }
        out.extend(
            self.entries
                .values()
                .filter(|e| !priority.contains(&e.name.as_str())),
        );
        Ok(out)
    }
}

impl FromIterator<StructEntry> for StructCatalog {
    fn from_iter<I: IntoIterator<Item = StructEntry>>(iter: I) -> Self {
        let mut catalog = StructCatalog::new();
        for entry in iter {
            catalog.insert(entry);
        }
        catalog
    }
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p)
                .map_err(|e| Error::Config(format!("invalid regular expression `{p}`: {e}")))
        })
        .collect()
}

/// Non-struct named types and their underlying representation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScalarAliasTable {
    aliases: BTreeMap<String, String>,
}

impl ScalarAliasTable {
    /// Create an empty alias table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `name` as an alias of `underlying`, replacing any previous entry.
    pub fn insert(&mut self, name: impl Into<String>, underlying: impl Into<String>) {
        self.aliases.insert(name.into(), underlying.into());
    }

    /// Get the underlying type of an alias.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.aliases.get(name).map(String::as_str)
    }

    /// Check if a name is a known alias.
    pub fn contains(&self, name: &str) -> bool {
        self.aliases.contains_key(name)
    }

    /// Get the number of aliases.
    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    /// Check if there are no aliases.
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// Iterate over `(alias, underlying)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Merge `other` into this table; aliases in `other` win.
    pub fn extend(&mut self, other: ScalarAliasTable) {
        self.aliases.extend(other.aliases);
    }
}
