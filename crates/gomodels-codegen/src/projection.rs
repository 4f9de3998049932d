//! Projection of Go field types into Go, TypeScript and mobx-keystone.
//!
//! Every projection is total: a type that is neither a registered scalar, a
//! struct of the catalog, nor a scalar alias degrades to the target's unknown
//! marker (`any`, `types.unchecked()`) with a warning.

use std::collections::BTreeMap;

use indexmap::IndexSet;
use tracing::warn;

use crate::catalog::{FieldEntry, ScalarAliasTable, StructCatalog, StructEntry};
use crate::registry::{KeystoneScalar, ProjectionRegistry};
use crate::scanner::ImportSpec;
use crate::types::GoType;

/// Alias chains longer than this are treated as cycles.
const MAX_ALIAS_DEPTH: usize = 32;

/// A projected Go struct field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoField {
    pub name: String,
    pub ty: String,
    /// Sorted `key:"value"` pairs, without back-ticks.
    pub tag: String,
}

/// Imports and scalar aliases needed by projected Go fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoRequirements {
    /// Import spec strings in first-use order.
    pub imports: IndexSet<String>,
    /// Alias name → projected underlying type.
    pub aliases: BTreeMap<String, String>,
}

/// A projected TypeScript type. Nullability is reported separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsType {
    pub ty: String,
    pub nullable: bool,
}

/// A projected mobx-keystone prop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeystoneProp {
    /// Wrapper expression with a `{}` placeholder for `inner`.
    pub wrapper: String,
    pub inner: String,
    pub nullable: bool,
}

impl KeystoneProp {
    fn checked(checker: &str, default: &str, nullable: bool) -> Self {
        if nullable {
            return Self {
                wrapper: "tProp(types.maybe({}))".to_string(),
                inner: checker.to_string(),
                nullable,
            };
        }
        let inner = if default.is_empty() {
            checker.to_string()
        } else {
            format!("{checker}, {default}")
        };
        Self {
            wrapper: "tProp({})".to_string(),
            inner,
            nullable,
        }
    }

    fn plain(ts_type: &str, default: &str, nullable_default: &str, nullable: bool) -> Self {
        let wrapper = if nullable {
            format!("prop<{{}} | undefined>({nullable_default})")
        } else {
            format!("prop<{{}}>({default})")
        };
        Self {
            wrapper,
            inner: ts_type.to_string(),
            nullable,
        }
    }

    fn unchecked(nullable: bool) -> Self {
        Self::checked("types.unchecked()", "", nullable)
    }

    /// The prop expression, optionally with `.withSetter()`.
    pub fn render(&self, with_setter: bool) -> String {
        let mut out = self.wrapper.replacen("{}", &self.inner, 1);
        if with_setter {
            out.push_str(".withSetter()");
        }
        out
    }
}

/// Pointers and `Null*` types are nullable.
pub fn is_nullable(ty: &str) -> bool {
    ty.starts_with('*') || ty.contains("Null")
}

/// Projects field types against one catalog and alias table.
#[derive(Debug, Clone)]
pub struct Projector<'a> {
    registry: &'a ProjectionRegistry,
    structs: &'a StructCatalog,
    aliases: &'a ScalarAliasTable,
    model_prefix: String,
    model_suffix: String,
}

impl<'a> Projector<'a> {
    pub fn new(
        registry: &'a ProjectionRegistry,
        structs: &'a StructCatalog,
        aliases: &'a ScalarAliasTable,
    ) -> Self {
        Self {
            registry,
            structs,
            aliases,
            model_prefix: String::new(),
            model_suffix: String::new(),
        }
    }

    /// Prefix and suffix applied to referenced model names in TypeScript and
    /// keystone output.
    pub fn with_model_affixes(
        mut self,
        prefix: impl Into<String>,
        suffix: impl Into<String>,
    ) -> Self {
        self.model_prefix = prefix.into();
        self.model_suffix = suffix.into();
        self
    }

    pub fn model_ref(&self, entry: &StructEntry) -> String {
        format!("{}{}{}", self.model_prefix, entry.model_name(), self.model_suffix)
    }

    pub fn go_field(
        &self,
        entry: &StructEntry,
        field: &FieldEntry,
        needs: &mut GoRequirements,
    ) -> GoField {
        let mut trail = Vec::new();
        let ty = self.go_type(entry, &field.go_type(), needs, &mut trail);
        if field.meta.is_opaque {
            for spec in entry_imports(entry) {
                if field.ty.contains(&format!("{}.", spec.local_name())) {
                    needs.imports.insert(spec.to_spec_string());
                }
            }
        }
        GoField {
            name: field.name.clone(),
            ty: ty.to_string(),
            tag: field.tags.to_go_tag(),
        }
    }

    fn go_type(
        &self,
        entry: &StructEntry,
        ty: &GoType,
        needs: &mut GoRequirements,
        trail: &mut Vec<String>,
    ) -> GoType {
        ty.map_leaves(&mut |leaf| self.go_leaf(entry, leaf, needs, trail))
    }

    fn go_leaf(
        &self,
        entry: &StructEntry,
        leaf: &GoType,
        needs: &mut GoRequirements,
        trail: &mut Vec<String>,
    ) -> GoType {
        let Some(key) = leaf.leaf_key() else {
            return leaf.clone();
        };
        if let Some(target) = self.structs.get(&key) {
            return GoType::Named(target.model_name());
        }
        if let GoType::Qualified { package, .. } = leaf
            && let Some(spec) = entry_imports(entry).find(|s| s.local_name() == package.as_str())
        {
            needs.imports.insert(spec.to_spec_string());
            return leaf.clone();
        }
        if let Some(scalar) = self.registry.go.get(&key) {
            if let Some(path) = &scalar.import_path {
                needs.imports.insert(format!("\"{path}\""));
            }
            return leaf.clone();
        }
        if let Some(underlying) = self.enter_alias(&key, trail) {
            let projected = self.go_type(entry, &underlying, needs, trail);
            trail.pop();
            if matches!(leaf, GoType::Named(_)) {
                needs.aliases.insert(key, projected.to_string());
                return leaf.clone();
            }
            return projected;
        }
        warn!(struct_name = %entry.name, ty = %key, "undefined type, using any");
        GoType::Named("any".to_string())
    }

    pub fn typescript(&self, ty: &str) -> TsType {
        let mut trail = Vec::new();
        TsType {
            ty: self.ts_type(&GoType::parse(ty), &mut trail),
            nullable: self.nullable_through_aliases(ty),
        }
    }

    /// A type is nullable if it, or any alias it goes through, is.
    fn nullable_through_aliases(&self, ty: &str) -> bool {
        let mut trail = Vec::new();
        let mut current = GoType::parse(ty);
        loop {
            if is_nullable(&current.to_string()) {
                return true;
            }
            let key = current.base().to_string();
            if self.registry.typescript.contains(&key) || self.structs.contains(&key) {
                return false;
            }
            match self.enter_alias(&key, &mut trail) {
                Some(underlying) => current = underlying,
                None => return false,
            }
        }
    }

    fn ts_type(&self, ty: &GoType, trail: &mut Vec<String>) -> String {
        let ty = ty.base();
        let key = ty.to_string();
        if let Some(scalar) = self.registry.typescript.get(&key) {
            return scalar.ts_type.clone();
        }
        match ty {
            GoType::Slice(inner) => format!("{}[]", self.ts_type(inner, trail)),
            GoType::Map(k, v) => format!(
                "Record<{}, {}>",
                self.ts_type(k, trail),
                self.ts_type(v, trail)
            ),
            GoType::Named(_) | GoType::Qualified { .. } => {
                if let Some(entry) = self.structs.get(&key) {
                    return self.model_ref(entry);
                }
                if let Some(underlying) = self.enter_alias(&key, trail) {
                    let out = self.ts_type(&underlying, trail);
                    trail.pop();
                    return out;
                }
                warn!(ty = %key, "undefined typescript type, using any");
                "any".to_string()
            }
            _ => {
                warn!(ty = %key, "undefined typescript type, using any");
                "any".to_string()
            }
        }
    }

    pub fn keystone(&self, ty: &str) -> KeystoneProp {
        let mut trail = Vec::new();
        self.keystone_prop(&GoType::parse(ty), is_nullable(ty), &mut trail)
    }

    fn keystone_prop(&self, ty: &GoType, nullable: bool, trail: &mut Vec<String>) -> KeystoneProp {
        let ty = ty.base();
        let key = ty.to_string();
        if let Some(scalar) = self.registry.keystone.get(&key) {
            return match scalar {
                KeystoneScalar::Checked { checker, default } => {
                    KeystoneProp::checked(checker, default, nullable)
                }
                KeystoneScalar::Plain {
                    ts_type,
                    default,
                    nullable_default,
                } => KeystoneProp::plain(ts_type, default, nullable_default, nullable),
            };
        }
        match ty {
            GoType::Slice(inner) => {
                let ts_type = format!("{}[]", self.ts_type(inner, trail));
                KeystoneProp::plain(&ts_type, "() => []", "", nullable)
            }
            GoType::Map(k, v) => {
                let ts_type = format!(
                    "Record<{}, {}>",
                    self.ts_type(k, trail),
                    self.ts_type(v, trail)
                );
                KeystoneProp::plain(&ts_type, "{}", "{}", nullable)
            }
            GoType::Named(_) | GoType::Qualified { .. } => {
                if let Some(entry) = self.structs.get(&key) {
                    let model = format!("types.model({})", self.model_ref(entry));
                    return KeystoneProp::checked(&model, "", nullable);
                }
                if let Some(underlying) = self.enter_alias(&key, trail) {
                    let nullable = nullable || is_nullable(&underlying.to_string());
                    let prop = self.keystone_prop(&underlying, nullable, trail);
                    trail.pop();
                    return prop;
                }
                warn!(ty = %key, "undefined keystone type, using types.unchecked()");
                KeystoneProp::unchecked(nullable)
            }
            _ => {
                warn!(ty = %key, "undefined keystone type, using types.unchecked()");
                KeystoneProp::unchecked(nullable)
            }
        }
    }

    /// The underlying type of alias `key`, pushing it onto `trail`. `None`
    /// when `key` is not an alias or following it would loop.
    fn enter_alias(&self, key: &str, trail: &mut Vec<String>) -> Option<GoType> {
        let underlying = self.aliases.get(key)?;
        if trail.len() >= MAX_ALIAS_DEPTH || trail.iter().any(|k| k == key) {
            warn!(alias = key, depth = trail.len(), "alias cycle");
            return None;
        }
        trail.push(key.to_string());
        Some(GoType::parse(underlying))
    }
}

fn entry_imports(entry: &StructEntry) -> impl Iterator<Item = ImportSpec> + '_ {
    entry
        .imports
        .iter()
        .filter_map(|spec| ImportSpec::from_spec_string(spec))
}
