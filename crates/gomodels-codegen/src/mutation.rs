//! The declarative mutation pipeline.
//!
//! A [`MutationSpec`] is applied in a fixed order: rename, uint widening, add
//! fields, update all fields by name, update all fields by type, update named
//! fields, delete fields. Every stage fails fast, and the catalog passed to
//! [`MutationSpec::apply`] is only replaced once all stages have succeeded.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::catalog::{FieldEntry, FieldTags, StructCatalog};
use crate::error::{Error, Result, Stage};
use crate::types::GoType;

static AFTER_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^after ([\w\.]+)$").expect("valid position regex"));

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MutationSpec {
    /// Old struct name → new struct name.
    pub rename: BTreeMap<String, String>,
    pub use_uint_for_ids: bool,
    pub use_uint_for_ids_exceptions: Vec<FieldSelection>,
    pub add_fields: Vec<AddField>,
    pub update_fields: Vec<UpdateField>,
    pub update_all_struct_fields: UpdateAllStructFields,
    pub delete_fields: Vec<FieldSelection>,
}

/// A struct and some of its fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FieldSelection {
    pub struct_name: String,
    pub field_names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AddField {
    pub struct_name: String,
    pub field_name: String,
    /// `start` (also when empty), `end` or `after <field>`.
    pub position: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UpdateField {
    pub struct_name: String,
    pub field_name: String,
    pub new_parameters: NewFieldParameters,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NewFieldParameters {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub match_with_current_tags: bool,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UpdateAllStructFields {
    pub by_field: Vec<UpdateByField>,
    pub by_type: Vec<UpdateByType>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UpdateByField {
    pub field_name: String,
    pub new_field_name: String,
    pub new_type: String,
    pub match_with_current_tags: bool,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UpdateByType {
    #[serde(rename = "type")]
    pub ty: String,
    pub new_type: String,
    pub match_with_current_tags: bool,
    pub tags: Vec<Tag>,
}

/// Where an added field goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Position {
    Start,
    End,
    After(String),
}

impl Position {
    pub fn parse(struct_name: &str, raw: &str) -> Result<Self> {
        match raw.trim() {
            "" | "start" => Ok(Position::Start),
            "end" => Ok(Position::End),
            other => AFTER_FIELD
                .captures(other)
                .map(|caps| Position::After(caps[1].to_string()))
                .ok_or_else(|| Error::Position {
                    struct_name: struct_name.to_string(),
                    position: raw.to_string(),
                    reason: "expected `start`, `end` or `after <field>`".to_string(),
                }),
        }
    }
}

impl MutationSpec {
    /// Apply every stage to `catalog`. On error the catalog is left untouched.
    pub fn apply(&self, catalog: &mut StructCatalog) -> Result<()> {
        let mut working = catalog.clone();
        self.rename_structs(&mut working)?;
        self.widen_uint_ids(&mut working);
        self.add_fields(&mut working)?;
        self.update_all_by_field(&mut working);
        self.update_all_by_type(&mut working);
        self.update_fields(&mut working)?;
        self.delete_fields(&mut working)?;
        *catalog = working;
        Ok(())
    }

    fn rename_structs(&self, catalog: &mut StructCatalog) -> Result<()> {
        for (old, new) in &self.rename {
            if old == new {
                continue;
            }
            let mut entry = catalog
                .remove(old)
                .ok_or_else(|| Error::struct_not_found(Stage::Rename, old.as_str()))?;
            if catalog.contains(new) {
                return Err(Error::Config(format!(
                    "rename: cannot rename `{old}` to `{new}`, struct `{new}` already exists"
                )));
            }
            entry.name = new.clone();
            catalog.insert(entry);
            for entry in catalog.iter_mut() {
                entry.rename_type_refs(old, new);
            }
            debug!(from = %old, to = %new, "renamed struct");
        }
        Ok(())
    }

    fn is_uint_exception(&self, struct_name: &str, field_name: &str) -> bool {
        self.use_uint_for_ids_exceptions
            .iter()
            .any(|e| e.struct_name == struct_name && e.field_names.iter().any(|f| f == field_name))
    }

    fn widen_uint_ids(&self, catalog: &mut StructCatalog) {
        if !self.use_uint_for_ids {
            return;
        }
        for entry in catalog.iter_mut() {
            for field in &mut entry.fields {
                if !field.name.ends_with("ID") || self.is_uint_exception(&entry.name, &field.name) {
                    continue;
                }
                let (pointer, base) = match field.ty.strip_prefix('*') {
                    Some(base) => ("*", base),
                    None => ("", field.ty.as_str()),
                };
                let widened = match base {
                    "int16" => "uint16",
                    "int32" => "uint32",
                    "int64" => "uint64",
                    _ => continue,
                };
                let ty = GoType::parse(&format!("{pointer}{widened}"));
                field.set_type(&ty);
            }
        }
    }

    fn add_fields(&self, catalog: &mut StructCatalog) -> Result<()> {
        for spec in &self.add_fields {
            let entry = catalog.require_mut(Stage::AddFields, &spec.struct_name)?;
            if spec.ty.trim().is_empty() {
                return Err(Error::Config(format!(
                    "add fields: field `{}` of struct `{}` has no type",
                    spec.field_name, spec.struct_name
                )));
            }
            let index = match Position::parse(&spec.struct_name, &spec.position)? {
                Position::Start => 0,
                Position::End => entry.fields.len(),
                Position::After(anchor) => {
                    entry
                        .field_index(&anchor)
                        .ok_or_else(|| Error::Position {
                            struct_name: spec.struct_name.clone(),
                            position: spec.position.clone(),
                            reason: format!("field `{anchor}` does not exist"),
                        })?
                        + 1
                }
            };
            let field = FieldEntry::new(&spec.field_name, &spec.ty, tags_of(&spec.tags));
            entry.fields.insert(index, field);
        }
        Ok(())
    }

    fn update_all_by_field(&self, catalog: &mut StructCatalog) {
        for param in &self.update_all_struct_fields.by_field {
            let mut updated = 0;
            for entry in catalog.iter_mut() {
                for field in entry.fields.iter_mut().filter(|f| f.name == param.field_name) {
                    if !param.new_field_name.is_empty() {
                        field.name = param.new_field_name.clone();
                    }
                    if !param.new_type.is_empty() {
                        field.set_type(&GoType::parse(&param.new_type));
                    }
                    retag(field, param.match_with_current_tags, &param.tags);
                    updated += 1;
                }
            }
            debug!(field_name = %param.field_name, updated, "updated fields by name");
        }
    }

    fn update_all_by_type(&self, catalog: &mut StructCatalog) {
        for param in &self.update_all_struct_fields.by_type {
            let wanted = GoType::parse(&param.ty).to_string();
            let mut updated = 0;
            for entry in catalog.iter_mut() {
                for field in entry.fields.iter_mut().filter(|f| f.ty == wanted) {
                    if !param.new_type.is_empty() {
                        field.set_type(&GoType::parse(&param.new_type));
                    }
                    retag(field, param.match_with_current_tags, &param.tags);
                    updated += 1;
                }
            }
            debug!(ty = %wanted, updated, "updated fields by type");
        }
    }

    fn update_fields(&self, catalog: &mut StructCatalog) -> Result<()> {
        for spec in &self.update_fields {
            let entry = catalog.require_mut(Stage::UpdateFields, &spec.struct_name)?;
            let index = entry.field_index(&spec.field_name).ok_or_else(|| {
                Error::field_not_found(Stage::UpdateFields, &spec.struct_name, &spec.field_name)
            })?;
            let field = &mut entry.fields[index];
            let params = &spec.new_parameters;
            if !params.name.is_empty() {
                field.name = params.name.clone();
            }
            if !params.ty.is_empty() {
                field.set_type(&GoType::parse(&params.ty));
            }
            retag(field, params.match_with_current_tags, &params.tags);
        }
        Ok(())
    }

    fn delete_fields(&self, catalog: &mut StructCatalog) -> Result<()> {
        for spec in &self.delete_fields {
            let entry = catalog.require_mut(Stage::DeleteFields, &spec.struct_name)?;
            for name in &spec.field_names {
                let index = entry.field_index(name).ok_or_else(|| {
                    Error::field_not_found(Stage::DeleteFields, &spec.struct_name, name)
                })?;
                entry.fields.remove(index);
            }
        }
        Ok(())
    }
}

fn tags_of(tags: &[Tag]) -> FieldTags {
    tags.iter()
        .map(|t| (t.name.clone(), t.value.clone()))
        .collect()
}

fn retag(field: &mut FieldEntry, match_with_current_tags: bool, tags: &[Tag]) {
    if !match_with_current_tags {
        field.tags.clear();
    }
    for tag in tags {
        field.tags.insert(&tag.name, &tag.value);
    }
}
