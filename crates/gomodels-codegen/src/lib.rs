//! # gomodels-codegen
//!
//! Struct catalog and cross-language type projection for Go models. The crate
//! reads Go struct declarations, resolves the types they reference across the
//! packages of a Go module, reshapes them through a declarative mutation
//! pipeline and projects every field type into Go, TypeScript and
//! mobx-keystone. Output is template-ready data; rendering and file writes
//! belong to the caller.
//!
//! ## Features
//!
//! - Go source parsing with `tree-sitter-go`, no Go toolchain required
//! - External type resolution across the packages of one Go module
//! - Closure filling: every referenced struct ends up in the catalog
//! - Rename, uint widening, add, update and delete field mutations
//! - Extensible scalar registry for all three targets
//!
//! ## Quick Start
//!
//! ### Projecting a catalog directly
//!
//! ```rust
//! use gomodels_codegen::{
//!     FieldEntry, FieldTags, Projector, ProjectionRegistry, ScalarAliasTable, StructCatalog,
//!     StructEntry,
//! };
//!
//! let user = StructEntry::new("User")
//!     .with_field(FieldEntry::new("ID", "int64", FieldTags::new()))
//!     .with_field(FieldEntry::new("Email", "*string", FieldTags::new()));
//! let structs: StructCatalog = [user].into_iter().collect();
//! let aliases = ScalarAliasTable::new();
//! let registry = ProjectionRegistry::with_builtins();
//!
//! let projector = Projector::new(&registry, &structs, &aliases);
//! let email = projector.typescript("*string");
//! assert_eq!(email.ty, "string");
//! assert!(email.nullable);
//! assert_eq!(projector.keystone("int64").render(false), "prop<bigint>(0n)");
//! ```
//!
//! ### Running configured targets
//!
//! ```no_run
//! use gomodels_codegen::{Config, Generator};
//!
//! let config = Config::from_path("pgxgen.yaml")?;
//! let generated = Generator::new().generate(&config)?;
//! for models in &generated.go_models {
//!     for model in &models.structs {
//!         println!("{}: {} fields", model.name, model.fields.len());
//!     }
//! }
//! # Ok::<(), gomodels_codegen::Error>(())
//! ```
//!
//! ## Scalar Mappings
//!
//! | Go Type | Go | TypeScript | mobx-keystone |
//! |---------|----|------------|---------------|
//! | `int`..`int32`, `uint`..`uint32` | as is | `number` | `tProp(types.integer, 0)` |
//! | `int64`, `uint64` | as is | `number` | `prop<bigint>(0n)` |
//! | `float32`, `float64` | as is | `number` | `tProp(types.number, 0)` |
//! | `string`, `[]byte` | as is | `string` | `tProp(types.string, "")` |
//! | `bool` | as is | `boolean` | `tProp(types.boolean, false)` |
//! | `time.Time` | `"time"` import | `Date` | `tProp(types.dateString, "")` |
//! | `map[string]any` | as is | `Record<string, any>` | `prop<Record<string, any>>({})` |
//! | Pointers, `Null*` | as is | nullable | `types.maybe(...)` |
//! | Unknown | `any` | `any` | `tProp(types.unchecked())` |

mod catalog;
mod closure;
mod config;
mod error;
mod extractor;
mod generator;
mod mutation;
mod projection;
pub mod registry;
mod resolver;
mod scanner;
mod types;

pub use catalog::{ExprMeta, FieldEntry, FieldTags, ScalarAliasTable, StructCatalog, StructEntry};
pub use closure::{fill_missed_types, missed_structs};
pub use config::{Config, GoModelsConfig, KeystoneConfig, StructNameItem, TypescriptConfig};
pub use error::{Error, Result, Stage};
pub use extractor::{ExternalCandidate, FieldFailure, FileExtraction, extract_file};
pub use generator::{
    Generated, Generator, GoModels, GoStruct, KeystoneField, KeystoneModel, KeystoneModels,
    TypescriptField, TypescriptType, TypescriptTypes,
};
pub use mutation::{
    AddField, FieldSelection, MutationSpec, NewFieldParameters, Position, Tag,
    UpdateAllStructFields, UpdateByField, UpdateByType, UpdateField,
};
pub use projection::{GoField, GoRequirements, KeystoneProp, Projector, TsType, is_nullable};
pub use registry::{GoScalar, KeystoneScalar, ProjectionRegistry, ScalarRegistry, TsScalar};
pub use resolver::{Extraction, GoModule, Package, PackageSet, Resolver};
pub use scanner::{ImportSpec, ParsedFile};
pub use types::{GoType, is_builtin, is_exported};
