//! Per-target orchestration: load, select, mutate, close, project.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use tracing::info;

use crate::catalog::{ScalarAliasTable, StructCatalog};
use crate::closure;
use crate::config::{Config, GoModelsConfig, KeystoneConfig, TypescriptConfig};
use crate::error::{Error, Result};
use crate::extractor::FieldFailure;
use crate::projection::{GoField, GoRequirements, Projector, TsType};
use crate::registry::ProjectionRegistry;
use crate::resolver::Resolver;

/// Template data for one Go models file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoModels {
    pub package_name: String,
    pub output_dir: String,
    pub output_file_name: String,
    pub delete_original_files: bool,
    /// Import spec strings: configured imports first, then those the fields need.
    pub imports: Vec<String>,
    /// Scalar aliases referenced by the fields, name → projected type.
    pub aliases: BTreeMap<String, String>,
    pub structs: Vec<GoStruct>,
    /// Fields of the generated structs that were dropped during extraction.
    pub failures: Vec<FieldFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoStruct {
    pub name: String,
    pub fields: Vec<GoField>,
}

/// Template data for one mobx-keystone models file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeystoneModels {
    pub output_dir: String,
    pub output_file_name: String,
    pub models: Vec<KeystoneModel>,
    pub failures: Vec<FieldFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeystoneModel {
    pub name: String,
    /// `decorator_model_name_prefix` + name, for `@model(...)`.
    pub decorator_name: String,
    /// Name + `export_model_suffix`.
    pub export_name: String,
    pub has_id_field: bool,
    pub props: Vec<KeystoneField>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeystoneField {
    pub name: String,
    pub prop: String,
}

/// Template data for one TypeScript types file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypescriptTypes {
    pub output_dir: String,
    pub output_file_name: String,
    pub types: Vec<TypescriptType>,
    pub failures: Vec<FieldFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypescriptType {
    /// Prefixed and suffixed export name.
    pub name: String,
    pub fields: Vec<TypescriptField>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypescriptField {
    pub name: String,
    pub ty: TsType,
}

/// Everything produced for one configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Generated {
    pub go_models: Vec<GoModels>,
    pub keystone_models: Vec<KeystoneModels>,
    pub typescript_types: Vec<TypescriptTypes>,
}

/// Runs generation targets against a shared package cache.
///
/// The generator owns a [`Resolver`], so packages parsed for one target are
/// reused by the next, and a [`ProjectionRegistry`] that can be customized
/// before generating.
///
/// # Example
///
/// ```no_run
/// use gomodels_codegen::{Config, Generator};
///
/// let config = Config::from_path("pgxgen.yaml")?;
/// let mut generator = Generator::new();
/// let generated = generator.generate(&config)?;
/// for models in &generated.go_models {
///     println!("{}/{}", models.output_dir, models.output_file_name);
/// }
/// # Ok::<(), gomodels_codegen::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct Generator {
    resolver: Resolver,
    registry: ProjectionRegistry,
}

impl Generator {
    /// Create a generator with the built-in scalar mappings.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: ProjectionRegistry) -> Self {
        Self {
            resolver: Resolver::new(),
            registry,
        }
    }

    pub fn registry(&self) -> &ProjectionRegistry {
        &self.registry
    }

    /// Mutable access to the registry, to register or remove scalars.
    pub fn registry_mut(&mut self) -> &mut ProjectionRegistry {
        &mut self.registry
    }

    /// Validate the whole document, then run every target in order.
    pub fn generate(&mut self, config: &Config) -> Result<Generated> {
        config.validate()?;
        let mut out = Generated::default();
        for target in &config.gen_models {
            out.go_models.push(self.go_models(target)?);
        }
        for target in &config.gen_keystone_from_struct {
            out.keystone_models.push(self.keystone_models(target)?);
        }
        for target in &config.gen_typescript_from_structs {
            out.typescript_types.push(self.typescript_models(target)?);
        }
        Ok(out)
    }

    /// Go models: load the input, apply the selection and the mutation
    /// pipeline, then pull in every referenced struct of the input directory.
    pub fn go_models(&mut self, config: &GoModelsConfig) -> Result<GoModels> {
        config.validate()?;
        let (extraction, universe_dir) = match (&config.input_file_path, &config.input_dir) {
            (Some(path), _) => (self.resolver.load_file(path)?, parent_dir(path)),
            (None, Some(dir)) => (self.resolver.load_dir(dir)?, dir.clone()),
            (None, None) => {
                return Err(Error::Config(
                    "gen_models: one of input_file_path or input_dir is required".to_string(),
                ));
            }
        };

        let mut selected = extraction.structs;
        selected.include_only(&config.include_names())?;
        selected.exclude(&config.exclude_names());
        config.mutations.apply(&mut selected)?;

        let universe = self.resolver.load_dir(&universe_dir)?;
        let aliases = merge_aliases(extraction.aliases, universe.aliases);
        closure::fill_missed_types(&universe.structs, &mut selected, &aliases)?;
        selected.check_model_names()?;
        let failures = catalog_failures(&selected, extraction.failures, universe.failures);

        let projector = Projector::new(&self.registry, &selected, &aliases);
        let mut needs = GoRequirements::default();
        let structs: Vec<GoStruct> = selected
            .iter()
            .map(|entry| GoStruct {
                name: entry.model_name(),
                fields: entry
                    .fields
                    .iter()
                    .map(|field| projector.go_field(entry, field, &mut needs))
                    .collect(),
            })
            .collect();

        let mut imports: IndexSet<String> =
            config.imports.iter().map(|i| quote_import(i)).collect();
        imports.extend(needs.imports);

        let models = GoModels {
            package_name: config.package_name(),
            output_dir: config.output_dir().to_string(),
            output_file_name: config.output_file_name(),
            delete_original_files: config.delete_original_files,
            imports: imports.into_iter().collect(),
            aliases: needs.aliases,
            structs,
            failures,
        };
        info!(
            package = %models.package_name,
            output_dir = %models.output_dir,
            structs = models.structs.len(),
            "generated go models"
        );
        Ok(models)
    }

    /// mobx-keystone models for the structs of one file, closed over the
    /// structs and aliases of its directory.
    pub fn keystone_models(&mut self, config: &KeystoneConfig) -> Result<KeystoneModels> {
        config.validate()?;
        let extraction = self.resolver.load_file(&config.input_file_path)?;
        let universe = self
            .resolver
            .load_dir(parent_dir(&config.input_file_path))?;
        let aliases = merge_aliases(extraction.aliases, universe.aliases);

        let mut selected = extraction.structs;
        closure::fill_missed_types(&universe.structs, &mut selected, &aliases)?;
        selected.exclude(&config.skip_models);
        selected.check_model_names()?;
        let failures = catalog_failures(&selected, extraction.failures, universe.failures);

        let projector = Projector::new(&self.registry, &selected, &aliases)
            .with_model_affixes("", config.export_model_suffix.as_str());
        let models: Vec<KeystoneModel> = selected
            .sorted(&config.sort_names())?
            .into_iter()
            .map(|entry| {
                let name = entry.model_name();
                KeystoneModel {
                    decorator_name: format!("{}{name}", config.decorator_model_name_prefix),
                    export_name: projector.model_ref(entry),
                    has_id_field: entry.fields.iter().any(|f| f.name.eq_ignore_ascii_case("id")),
                    props: entry
                        .fields
                        .iter()
                        .map(|field| KeystoneField {
                            name: field.name.clone(),
                            prop: projector.keystone(&field.ty).render(config.with_setter),
                        })
                        .collect(),
                    name,
                }
            })
            .collect();

        info!(
            output_dir = %config.output_dir,
            models = models.len(),
            "generated keystone models"
        );
        Ok(KeystoneModels {
            output_dir: config.output_dir.clone(),
            output_file_name: config.output_file_name().to_string(),
            models,
            failures,
        })
    }

    /// TypeScript types for the exported fields of a directory's structs,
    /// filtered by name patterns and sorted alphabetically.
    pub fn typescript_models(&mut self, config: &TypescriptConfig) -> Result<TypescriptTypes> {
        config.validate()?;
        let extraction = self.resolver.load_dir(&config.path)?;
        let mut selected = extraction.structs;
        selected.filter_by_patterns(
            &config.include_struct_names_regexp,
            &config.exclude_struct_names_regexp,
        )?;
        for entry in selected.iter_mut() {
            entry.remove_unexported_fields();
        }
        selected.check_model_names()?;

        let types = typescript_types(
            &self.registry,
            &selected,
            &extraction.aliases,
            &config.export_type_prefix,
            &config.export_type_suffix,
        );
        info!(
            output_dir = %config.output_dir,
            types = types.len(),
            "generated typescript types"
        );
        Ok(TypescriptTypes {
            output_dir: config.output_dir.clone(),
            output_file_name: config.output_file_name.clone(),
            types,
            failures: catalog_failures(&selected, extraction.failures, Vec::new()),
        })
    }
}

fn typescript_types(
    registry: &ProjectionRegistry,
    structs: &StructCatalog,
    aliases: &ScalarAliasTable,
    prefix: &str,
    suffix: &str,
) -> Vec<TypescriptType> {
    let projector = Projector::new(registry, structs, aliases).with_model_affixes(prefix, suffix);
    structs
        .iter()
        .map(|entry| TypescriptType {
            name: projector.model_ref(entry),
            fields: entry
                .fields
                .iter()
                .map(|field| TypescriptField {
                    name: field.name.clone(),
                    ty: projector.typescript(&field.ty),
                })
                .collect(),
        })
        .collect()
}

/// Failures of the structs in `structs`, keyed by their current name.
fn catalog_failures(
    structs: &StructCatalog,
    primary: Vec<FieldFailure>,
    secondary: Vec<FieldFailure>,
) -> Vec<FieldFailure> {
    let mut out: Vec<FieldFailure> = Vec::new();
    for failure in primary.into_iter().chain(secondary) {
        let Some(entry) = structs
            .iter()
            .find(|e| e.original_name == failure.struct_name)
            .or_else(|| structs.get(&failure.struct_name))
        else {
            continue;
        };
        let failure = FieldFailure {
            struct_name: entry.name.clone(),
            ..failure
        };
        if !out.contains(&failure) {
            out.push(failure);
        }
    }
    out
}

/// `primary` wins over `secondary` on conflicting names.
fn merge_aliases(primary: ScalarAliasTable, secondary: ScalarAliasTable) -> ScalarAliasTable {
    let mut merged = secondary;
    merged.extend(primary);
    merged
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn quote_import(import: &str) -> String {
    let import = import.trim();
    if import.ends_with('"') {
        import.to_string()
    } else {
        format!("\"{import}\"")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use crate::error::Stage;
    use crate::mutation::{FieldSelection, MutationSpec};

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn module() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "go.mod", "module example.com/app\n\ngo 1.22\n");
        write(
            root,
            "store/models.go",
            r#"package store

import (
	"time"

	"example.com/app/geo"
)

type Status int16

type User struct {
	ID        int64  `json:"id" db:"id"`
	Name      string `json:"name"`
	Status    Status
	Home      *geo.Address
	CreatedAt time.Time
	password  string
}

type Migration struct {
	Version int64
}
"#,
        );
        write(
            root,
            "store/order.go",
            r#"package store

type Order struct {
	ID      int64
	UserID  int64
	User    *User
	Items   []Item
	Updates chan int
}

type Item struct {
	SKU string
}

type OrderDTO struct {
	OrderID int64
	Note    *string
}
"#,
        );
        write(
            root,
            "geo/geo.go",
            "package geo\n\ntype Address struct {\n\tCity string\n}\n",
        );
        dir
    }

    fn failed_fields(failures: &[FieldFailure]) -> Vec<(&str, &str)> {
        failures
            .iter()
            .map(|f| (f.struct_name.as_str(), f.field_name.as_str()))
            .collect()
    }

    fn struct_names<'a>(structs: impl IntoIterator<Item = &'a GoStruct>) -> Vec<&'a str> {
        structs.into_iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn test_go_models_from_file() {
        let dir = module();
        let config = GoModelsConfig {
            input_file_path: Some(dir.path().join("store/models.go")),
            output_dir: "internal/models/".to_string(),
            imports: vec!["github.com/google/uuid".to_string()],
            exclude_structs: vec![crate::config::StructNameItem {
                struct_name: "Migration".to_string(),
            }],
            mutations: MutationSpec {
                rename: [("User".to_string(), "Account".to_string())].into(),
                use_uint_for_ids: true,
                delete_fields: vec![FieldSelection {
                    struct_name: "Account".to_string(),
                    field_names: vec!["Name".to_string()],
                }],
                ..Default::default()
            },
            ..Default::default()
        };

        let models = Generator::new().go_models(&config).unwrap();
        assert_eq!(models.package_name, "models");
        assert_eq!(models.output_dir, "internal/models");
        assert_eq!(models.output_file_name, "models.go");
        assert_eq!(struct_names(&models.structs), vec!["Account", "GeoAddress"]);

        let account = &models.structs[0];
        let fields: Vec<_> = account
            .fields
            .iter()
            .map(|f| (f.name.as_str(), f.ty.as_str()))
            .collect();
        assert_eq!(
            fields,
            vec![
                ("ID", "uint64"),
                ("Status", "Status"),
                ("Home", "*GeoAddress"),
                ("CreatedAt", "time.Time"),
                ("password", "string"),
            ]
        );
        assert_eq!(account.fields[0].tag, r#"db:"id" json:"id""#);
        assert_eq!(
            models.imports,
            vec!["\"github.com/google/uuid\"", "\"time\""]
        );
        assert_eq!(models.aliases.get("Status").map(String::as_str), Some("int16"));
        assert!(models.failures.is_empty());
    }

    #[test]
    fn test_go_models_from_dir_fills_closure() {
        let dir = module();
        let config = GoModelsConfig {
            input_dir: Some(dir.path().join("store")),
            output_dir: "models".to_string(),
            include_structs: vec![crate::config::StructNameItem {
                struct_name: "Order".to_string(),
            }],
            ..Default::default()
        };

        let models = Generator::new().go_models(&config).unwrap();
        assert_eq!(
            struct_names(&models.structs),
            vec!["Item", "Order", "User", "GeoAddress"]
        );
        assert_eq!(failed_fields(&models.failures), vec![("Order", "Updates")]);
    }

    #[test]
    fn test_go_models_lookup_errors() {
        let dir = module();
        let config = GoModelsConfig {
            input_dir: Some(dir.path().join("store")),
            output_dir: "models".to_string(),
            mutations: MutationSpec {
                delete_fields: vec![FieldSelection {
                    struct_name: "Ghost".to_string(),
                    field_names: vec!["ID".to_string()],
                }],
                ..Default::default()
            },
            ..Default::default()
        };
        let err = Generator::new().go_models(&config).unwrap_err();
        assert!(matches!(
            err,
            Error::StructNotFound { stage: Stage::DeleteFields, .. }
        ));

        let invalid = GoModelsConfig::default();
        assert!(matches!(
            Generator::new().go_models(&invalid),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_keystone_models() {
        let dir = module();
        let config = KeystoneConfig {
            input_file_path: dir.path().join("store/order.go"),
            output_dir: "frontend/models".to_string(),
            sort: "User".to_string(),
            export_model_suffix: "Model".to_string(),
            decorator_model_name_prefix: "app/".to_string(),
            skip_models: vec!["OrderDTO".to_string()],
            ..Default::default()
        };

        let models = Generator::new().keystone_models(&config).unwrap();
        assert_eq!(models.output_file_name, "models.ts");
        let names: Vec<_> = models.models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["User", "Item", "Order", "GeoAddress"]);

        let order = &models.models[2];
        assert_eq!(order.decorator_name, "app/Order");
        assert_eq!(order.export_name, "OrderModel");
        assert!(order.has_id_field);
        let props: Vec<_> = order
            .props
            .iter()
            .map(|p| (p.name.as_str(), p.prop.as_str()))
            .collect();
        assert_eq!(
            props,
            vec![
                ("ID", "prop<bigint>(0n)"),
                ("UserID", "prop<bigint>(0n)"),
                ("User", "tProp(types.maybe(types.model(UserModel)))"),
                ("Items", "prop<ItemModel[]>(() => [])"),
            ]
        );

        let user = &models.models[0];
        let status = user.props.iter().find(|p| p.name == "Status").unwrap();
        assert_eq!(status.prop, "tProp(types.integer, 0)");
        assert!(!models.models[1].has_id_field);
        assert_eq!(failed_fields(&models.failures), vec![("Order", "Updates")]);
    }

    #[test]
    fn test_keystone_with_setter_and_unknown_sort() {
        let dir = module();
        let mut config = KeystoneConfig {
            input_file_path: dir.path().join("store/order.go"),
            output_dir: "frontend/models".to_string(),
            with_setter: true,
            ..Default::default()
        };
        let mut generator = Generator::new();
        let models = generator.keystone_models(&config).unwrap();
        let item = models.models.iter().find(|m| m.name == "Item").unwrap();
        assert_eq!(item.props[0].prop, "tProp(types.string, \"\").withSetter()");

        config.sort = "Nope".to_string();
        let err = generator.keystone_models(&config).unwrap_err();
        assert!(matches!(err, Error::StructNotFound { stage: Stage::Sort, .. }));
    }

    #[test]
    fn test_typescript_types() {
        let dir = module();
        let config = TypescriptConfig {
            path: dir.path().join("store"),
            output_dir: "frontend/types".to_string(),
            output_file_name: "types.ts".to_string(),
            export_type_prefix: "I".to_string(),
            include_struct_names_regexp: vec!["DTO$".to_string()],
            ..Default::default()
        };

        let types = Generator::new().typescript_models(&config).unwrap();
        assert_eq!(types.types.len(), 1);
        let dto = &types.types[0];
        assert_eq!(dto.name, "IOrderDTO");
        assert_eq!(
            dto.fields,
            vec![
                TypescriptField {
                    name: "OrderID".to_string(),
                    ty: TsType { ty: "number".to_string(), nullable: false },
                },
                TypescriptField {
                    name: "Note".to_string(),
                    ty: TsType { ty: "string".to_string(), nullable: true },
                },
            ]
        );
        assert!(types.failures.is_empty());
    }

    #[test]
    fn test_typescript_drops_unexported_fields() {
        let dir = module();
        let config = TypescriptConfig {
            path: dir.path().join("store"),
            output_dir: "frontend/types".to_string(),
            output_file_name: "types.ts".to_string(),
            exclude_struct_names_regexp: vec!["^Migration$".to_string()],
            ..Default::default()
        };

        let types = Generator::new().typescript_models(&config).unwrap();
        let names: Vec<_> = types.types.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Item", "Order", "OrderDTO", "User", "GeoAddress"]);

        let user = &types.types[3];
        let fields: Vec<_> = user.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(fields, vec!["ID", "Name", "Status", "Home", "CreatedAt"]);
        assert_eq!(user.fields[3].ty, TsType { ty: "GeoAddress".to_string(), nullable: true });
        assert_eq!(user.fields[4].ty.ty, "Date");
        assert_eq!(failed_fields(&types.failures), vec![("Order", "Updates")]);
    }

    #[test]
    fn test_model_name_collision_is_config_error() {
        let dir = module();
        write(
            dir.path(),
            "store/address.go",
            "package store\n\ntype GeoAddress struct {\n\tStreet string\n}\n",
        );
        let config = TypescriptConfig {
            path: dir.path().join("store"),
            output_dir: "frontend/types".to_string(),
            output_file_name: "types.ts".to_string(),
            ..Default::default()
        };
        let err = Generator::new().typescript_models(&config).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("geo.Address"));
    }

    #[test]
    fn test_generate_runs_every_target() {
        let dir = module();
        let root = dir.path().display();
        let yaml = format!(
            r#"
gen_models:
  - input_dir: {root}/store
    output_dir: out/models
gen_keystone_from_struct:
  - input_file_path: {root}/store/order.go
    output_dir: out/keystone
gen_typescript_from_structs:
  - path: {root}/store
    output_dir: out/types
    output_file_name: types.ts
"#
        );
        let config = Config::from_yaml_str(&yaml).unwrap();
        let generated = Generator::new().generate(&config).unwrap();
        assert_eq!(generated.go_models.len(), 1);
        assert_eq!(generated.keystone_models.len(), 1);
        assert_eq!(generated.typescript_types.len(), 1);
        assert_eq!(generated.go_models[0].package_name, "models");
    }

    #[test]
    fn test_quote_import() {
        assert_eq!(quote_import("time"), "\"time\"");
        let aliased = "pg \"github.com/jackc/pgx/v5/pgtype\"";
        assert_eq!(quote_import(aliased), aliased);
    }
}
