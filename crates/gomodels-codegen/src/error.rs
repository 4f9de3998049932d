//! Error types for catalog extraction, mutation and projection.

use std::fmt;
use std::path::PathBuf;

/// Result alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The pipeline stage an error was raised from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Rename,
    UintWidening,
    AddFields,
    UpdateAllByField,
    UpdateAllByType,
    UpdateFields,
    DeleteFields,
    IncludeStructs,
    Sort,
    Closure,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Rename => "rename",
            Stage::UintWidening => "use uint for ids",
            Stage::AddFields => "add fields",
            Stage::UpdateAllByField => "update all struct fields by field",
            Stage::UpdateAllByType => "update all struct fields by type",
            Stage::UpdateFields => "update fields",
            Stage::DeleteFields => "delete fields",
            Stage::IncludeStructs => "include structs",
            Stage::Sort => "sort",
            Stage::Closure => "fill missed types",
        };
        f.write_str(name)
    }
}

/// Error type for catalog building and model generation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required option is missing or an option is invalid.
    #[error("config error: {0}")]
    Config(String),

    /// A struct referenced by configuration or by another struct does not exist.
    #[error("{stage}: struct `{struct_name}` not found (names are case sensitive)")]
    StructNotFound { stage: Stage, struct_name: String },

    /// A field referenced by configuration does not exist in its struct.
    #[error("{stage}: field `{field_name}` does not exist in struct `{struct_name}`")]
    FieldNotFound {
        stage: Stage,
        struct_name: String,
        field_name: String,
    },

    /// An `add_fields` position is malformed or its anchor is missing.
    #[error("add fields: invalid position `{position}` for struct `{struct_name}`: {reason}")]
    Position {
        struct_name: String,
        position: String,
        reason: String,
    },

    /// A type could not be classified or its declaration could not be located.
    #[error("cannot resolve type `{type_name}` (searched `{}`): {reason}", dir.display())]
    TypeResolution {
        type_name: String,
        dir: PathBuf,
        reason: String,
    },

    /// Packages could not be loaded from a directory.
    #[error("load packages from `{}`: {reason}", dir.display())]
    PackageLoad { dir: PathBuf, reason: String },

    /// A source file could not be read.
    #[error("read `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A source file is not valid Go.
    #[error("parse `{}`: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn struct_not_found(stage: Stage, struct_name: impl Into<String>) -> Self {
        Error::StructNotFound {
            stage,
            struct_name: struct_name.into(),
        }
    }

    pub(crate) fn field_not_found(
        stage: Stage,
        struct_name: impl Into<String>,
        field_name: impl Into<String>,
    ) -> Self {
        Error::FieldNotFound {
            stage,
            struct_name: struct_name.into(),
            field_name: field_name.into(),
        }
    }

    /// Whether this is a lookup error (missing struct or field).
    pub fn is_lookup(&self) -> bool {
        matches!(
            self,
            Error::StructNotFound { .. } | Error::FieldNotFound { .. }
        )
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_message_names_struct_and_stage() {
        let err = Error::field_not_found(Stage::DeleteFields, "User", "Age");
        assert_eq!(
            err.to_string(),
            "delete fields: field `Age` does not exist in struct `User`"
        );
        assert!(err.is_lookup());
    }

    #[test]
    fn test_resolution_message_names_directory() {
        let err = Error::TypeResolution {
            type_name: "Address".to_string(),
            dir: PathBuf::from("models"),
            reason: "declaration not found in any loaded package".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("`Address`"));
        assert!(msg.contains("`models`"));
        assert!(!err.is_lookup());
    }
}
