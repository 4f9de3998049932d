//! Scalar tables for mapping Go types to Go, TypeScript and mobx-keystone.
//!
//! The registries provide a data-driven way to teach the projections how to
//! handle Go scalars, including types from the standard library and common
//! third-party packages. Built-in mappings are registered automatically, and
//! users can add or override mappings.
//!
//! # Built-in scalar families
//!
//! | Go types | TypeScript | keystone |
//! |----------|------------|----------|
//! | `int`..`int32`, `uint`..`uint32`, `sql.NullInt16/32`, `pgtype.Int2/4` | `number` | `types.integer`, `0` |
//! | `int64`, `uint64`, `sql.NullInt64`, `pgtype.Int8` | `number` | `prop<bigint>(0n)` |
//! | `float32`, `float64`, `sql.NullFloat64`, `pgtype.Float8` | `number` | `types.number`, `0` |
//! | `string`, `[]byte`, `sql.NullString`, `pgtype.Text`, `uuid.UUID`, `uuid.NullUUID`, `pgtype.UUID` | `string` | `types.string`, `""` |
//! | `bool`, `sql.NullBool`, `pgtype.Bool` | `boolean` | `types.boolean`, `false` |
//! | `time.Time`, `sql.NullTime`, `bun.NullTime`, `pgtype.Time/Date/Timestamp/Timestamptz`, `timestamppb.Timestamp` | `Date` | `types.dateString`, `""` |
//! | `map[string]any`, `pgtype.JSONB`, `json.RawMessage` | `Record<string, any>` | `prop<Record<string, any>>({})` |
//! | `any` | `any` | `types.unchecked()` |
//!
//! # Custom mappings
//!
//! ```
//! use gomodels_codegen::{ProjectionRegistry, TsScalar};
//!
//! let mut registry = ProjectionRegistry::default();
//! registry.typescript.register("decimal.Decimal", TsScalar::new("string"));
//! assert!(registry.typescript.contains("decimal.Decimal"));
//! ```

use std::collections::HashMap;

const SQL: &str = "database/sql";
const TIME: &str = "time";
const UUID: &str = "github.com/google/uuid";
const PGTYPE: &str = "github.com/jackc/pgx/v5/pgtype";
const PGTYPE_V4: &str = "github.com/jackc/pgtype";
const BUN: &str = "github.com/uptrace/bun";
const TIMESTAMPPB: &str = "google.golang.org/protobuf/types/known/timestamppb";
const JSON: &str = "encoding/json";

const INTEGERS: &[&str] = &[
    "int",
    "int8",
    "int16",
    "int32",
    "uint",
    "uint8",
    "uint16",
    "uint32",
    "byte",
    "rune",
    "sql.NullInt16",
    "sql.NullInt32",
    "pgtype.Int2",
    "pgtype.Int4",
];
const BIG_INTEGERS: &[&str] = &["int64", "uint64", "sql.NullInt64", "pgtype.Int8"];
const FLOATS: &[&str] = &["float32", "float64", "sql.NullFloat64", "pgtype.Float8"];
const STRINGS: &[&str] = &[
    "string",
    "[]byte",
    "sql.NullString",
    "pgtype.Text",
    "uuid.UUID",
    "uuid.NullUUID",
    "pgtype.UUID",
];
const BOOLEANS: &[&str] = &["bool", "sql.NullBool", "pgtype.Bool"];
const TIMES: &[&str] = &[
    "time.Time",
    "sql.NullTime",
    "bun.NullTime",
    "pgtype.Time",
    "pgtype.Date",
    "pgtype.Timestamp",
    "pgtype.Timestamptz",
    "timestamppb.Timestamp",
];
const JSON_OBJECTS: &[&str] = &["map[string]any", "pgtype.JSONB", "json.RawMessage"];
const DYNAMIC: &[&str] = &["any"];

/// Every scalar with a mapping in all three built-in tables.
pub fn declared_scalars() -> impl Iterator<Item = &'static str> {
    [
        INTEGERS,
        BIG_INTEGERS,
        FLOATS,
        STRINGS,
        BOOLEANS,
        TIMES,
        JSON_OBJECTS,
        DYNAMIC,
    ]
    .into_iter()
    .flatten()
    .copied()
}

/// Go type string → mapping for one projection target.
#[derive(Debug, Clone)]
pub struct ScalarRegistry<T> {
    mappings: HashMap<String, T>,
}

impl<T> ScalarRegistry<T> {
    /// Create an empty registry with no mappings.
    pub fn new() -> Self {
        Self {
            mappings: HashMap::new(),
        }
    }

    /// Register a mapping, replacing any existing one for `name`.
    pub fn register(&mut self, name: impl Into<String>, mapping: T) {
        self.mappings.insert(name.into(), mapping);
    }

    /// Get the mapping for a type name.
    pub fn get(&self, name: &str) -> Option<&T> {
        self.mappings.get(name)
    }

    /// Check if a type name has a mapping.
    pub fn contains(&self, name: &str) -> bool {
        self.mappings.contains_key(name)
    }

    /// Remove a mapping, returning it if it existed.
    pub fn unregister(&mut self, name: &str) -> Option<T> {
        self.mappings.remove(name)
    }

    /// Get the number of mappings.
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// Check if the registry has no mappings.
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

impl<T> Default for ScalarRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A Go scalar and the import path it needs, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoScalar {
    pub import_path: Option<String>,
}

impl GoScalar {
    /// A scalar that needs no import.
    pub fn builtin() -> Self {
        Self { import_path: None }
    }

    /// A scalar imported from `path`.
    pub fn imported(path: impl Into<String>) -> Self {
        Self {
            import_path: Some(path.into()),
        }
    }
}

impl ScalarRegistry<GoScalar> {
    /// Go scalars: every predeclared type plus the declared scalar set.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for name in crate::types::builtin_types() {
            registry.register(name, GoScalar::builtin());
        }
        for name in declared_scalars() {
            let scalar = match name.split_once('.') {
                Some(("sql", _)) => GoScalar::imported(SQL),
                Some(("time", _)) => GoScalar::imported(TIME),
                Some(("uuid", _)) => GoScalar::imported(UUID),
                Some(("pgtype", "JSONB")) => GoScalar::imported(PGTYPE_V4),
                Some(("pgtype", _)) => GoScalar::imported(PGTYPE),
                Some(("bun", _)) => GoScalar::imported(BUN),
                Some(("timestamppb", _)) => GoScalar::imported(TIMESTAMPPB),
                Some(("json", _)) => GoScalar::imported(JSON),
                _ => GoScalar::builtin(),
            };
            registry.register(name, scalar);
        }
        registry
    }
}

/// A TypeScript type for a Go scalar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsScalar {
    pub ts_type: String,
}

impl TsScalar {
    pub fn new(ts_type: impl Into<String>) -> Self {
        Self {
            ts_type: ts_type.into(),
        }
    }
}

impl ScalarRegistry<TsScalar> {
    /// Registry with the built-in TypeScript mappings.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        let families: [(&[&str], &str); 8] = [
            (INTEGERS, "number"),
            (BIG_INTEGERS, "number"),
            (FLOATS, "number"),
            (STRINGS, "string"),
            (BOOLEANS, "boolean"),
            (TIMES, "Date"),
            (JSON_OBJECTS, "Record<string, any>"),
            (DYNAMIC, "any"),
        ];
        for (names, ts_type) in families {
            for name in names {
                registry.register(*name, TsScalar::new(ts_type));
            }
        }
        registry
    }
}

/// A mobx-keystone prop shape for a Go scalar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeystoneScalar {
    /// Runtime-checked prop: `tProp(checker, default)` or
    /// `tProp(types.maybe(checker))`. An empty default is omitted.
    Checked { checker: String, default: String },
    /// Unchecked prop: `prop<T>(default)` or `prop<T | undefined>(nullable_default)`.
    Plain {
        ts_type: String,
        default: String,
        nullable_default: String,
    },
}

impl KeystoneScalar {
    /// A `tProp` backed by a runtime type checker.
    pub fn checked(checker: impl Into<String>, default: impl Into<String>) -> Self {
        KeystoneScalar::Checked {
            checker: checker.into(),
            default: default.into(),
        }
    }

    /// A `prop<T>` with explicit defaults.
    pub fn plain(
        ts_type: impl Into<String>,
        default: impl Into<String>,
        nullable_default: impl Into<String>,
    ) -> Self {
        KeystoneScalar::Plain {
            ts_type: ts_type.into(),
            default: default.into(),
            nullable_default: nullable_default.into(),
        }
    }
}

impl ScalarRegistry<KeystoneScalar> {
    /// Registry with the built-in keystone mappings.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        let families: [(&[&str], KeystoneScalar); 8] = [
            (INTEGERS, KeystoneScalar::checked("types.integer", "0")),
            // 64-bit integers lose precision as JS numbers.
            (BIG_INTEGERS, KeystoneScalar::plain("bigint", "0n", "")),
            (FLOATS, KeystoneScalar::checked("types.number", "0")),
            (STRINGS, KeystoneScalar::checked("types.string", "\"\"")),
            (BOOLEANS, KeystoneScalar::checked("types.boolean", "false")),
            (TIMES, KeystoneScalar::checked("types.dateString", "\"\"")),
            (
                JSON_OBJECTS,
                KeystoneScalar::plain("Record<string, any>", "{}", "{}"),
            ),
            (DYNAMIC, KeystoneScalar::checked("types.unchecked()", "")),
        ];
        for (names, scalar) in families {
            for name in names {
                registry.register(*name, scalar.clone());
            }
        }
        registry
    }
}

/// The three projection tables.
#[derive(Debug, Clone)]
pub struct ProjectionRegistry {
    pub go: ScalarRegistry<GoScalar>,
    pub typescript: ScalarRegistry<TsScalar>,
    pub keystone: ScalarRegistry<KeystoneScalar>,
}

impl ProjectionRegistry {
    /// All three registries with their built-in mappings.
    pub fn with_builtins() -> Self {
        Self {
            go: ScalarRegistry::<GoScalar>::with_builtins(),
            typescript: ScalarRegistry::<TsScalar>::with_builtins(),
            keystone: ScalarRegistry::<KeystoneScalar>::with_builtins(),
        }
    }
}

impl Default for ProjectionRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_scalars_are_registered_everywhere() {
        let registry = ProjectionRegistry::with_builtins();
        for name in declared_scalars() {
            assert!(registry.go.contains(name), "go: {name}");
            assert!(registry.typescript.contains(name), "typescript: {name}");
            assert!(registry.keystone.contains(name), "keystone: {name}");
        }
    }

    #[test]
    fn test_go_import_paths() {
        let registry = ScalarRegistry::<GoScalar>::with_builtins();
        let path = |name: &str| registry.get(name).and_then(|s| s.import_path.as_deref());
        assert_eq!(path("time.Time"), Some("time"));
        assert_eq!(path("uuid.UUID"), Some("github.com/google/uuid"));
        assert_eq!(path("sql.NullString"), Some("database/sql"));
        assert_eq!(path("pgtype.Text"), Some("github.com/jackc/pgx/v5/pgtype"));
        assert_eq!(path("int64"), None);
        assert!(registry.contains("error"));
    }

    #[test]
    fn test_registry_override_builtin() {
        let mut registry = ScalarRegistry::<TsScalar>::with_builtins();
        assert_eq!(registry.get("int64").unwrap().ts_type, "number");
        registry.register("int64", TsScalar::new("bigint"));
        assert_eq!(registry.get("int64").unwrap().ts_type, "bigint");
    }

    #[test]
    fn test_registry_unregister() {
        let mut registry = ScalarRegistry::<KeystoneScalar>::with_builtins();
        assert!(registry.contains("uuid.UUID"));
        registry.unregister("uuid.UUID");
        assert!(!registry.contains("uuid.UUID"));
        assert!(ScalarRegistry::<KeystoneScalar>::new().is_empty());
    }

    #[test]
    fn test_big_integers_are_plain_props() {
        let registry = ScalarRegistry::<KeystoneScalar>::with_builtins();
        assert_eq!(
            registry.get("uint64"),
            Some(&KeystoneScalar::plain("bigint", "0n", ""))
        );
    }
}
