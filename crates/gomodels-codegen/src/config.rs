//! YAML configuration for the three generation targets.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::mutation::MutationSpec;

const DEFAULT_GO_FILE_NAME: &str = "models.go";
const DEFAULT_KEYSTONE_FILE_NAME: &str = "models.ts";

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gen_models: Vec<GoModelsConfig>,
    #[serde(alias = "gen_keystone_models")]
    pub gen_keystone_from_struct: Vec<KeystoneConfig>,
    pub gen_typescript_from_structs: Vec<TypescriptConfig>,
}

impl Config {
    pub fn from_yaml_str(source: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(source)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_yaml_str(&source)
    }

    /// Validate every target.
    pub fn validate(&self) -> Result<()> {
        for target in &self.gen_models {
            target.validate()?;
        }
        for target in &self.gen_keystone_from_struct {
            target.validate()?;
        }
        for target in &self.gen_typescript_from_structs {
            target.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StructNameItem {
    pub struct_name: String,
}

/// Go models target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GoModelsConfig {
    pub input_file_path: Option<PathBuf>,
    pub input_dir: Option<PathBuf>,
    /// Cleanup is left to the caller; the flag is passed through.
    pub delete_original_files: bool,
    pub output_dir: String,
    pub output_file_name: String,
    pub package_name: String,
    pub imports: Vec<String>,
    pub exclude_structs: Vec<StructNameItem>,
    pub include_structs: Vec<StructNameItem>,
    #[serde(flatten)]
    pub mutations: MutationSpec,
}

impl GoModelsConfig {
    pub fn validate(&self) -> Result<()> {
        if self.output_dir.trim().is_empty() {
            return Err(Error::Config("gen_models: undefined output_dir".to_string()));
        }
        match (&self.input_file_path, &self.input_dir) {
            (Some(_), Some(_)) => Err(Error::Config(
                "gen_models: input_file_path and input_dir are mutually exclusive".to_string(),
            )),
            (None, None) => Err(Error::Config(
                "gen_models: one of input_file_path or input_dir is required".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Output directory without a trailing slash.
    pub fn output_dir(&self) -> &str {
        let trimmed = self.output_dir.trim_end_matches('/');
        if trimmed.is_empty() {
            &self.output_dir
        } else {
            trimmed
        }
    }

    /// `models.go` by default; `.go` is appended when missing.
    pub fn output_file_name(&self) -> String {
        let name = if self.output_file_name.is_empty() {
            DEFAULT_GO_FILE_NAME
        } else {
            &self.output_file_name
        };
        if name.ends_with(".go") {
            name.to_string()
        } else {
            format!("{name}.go")
        }
    }

    /// The configured package name, else the last segment of the output dir.
    pub fn package_name(&self) -> String {
        if !self.package_name.is_empty() {
            return self.package_name.clone();
        }
        self.output_dir()
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string()
    }

    pub fn include_names(&self) -> Vec<String> {
        self.include_structs
            .iter()
            .map(|i| i.struct_name.clone())
            .collect()
    }

    pub fn exclude_names(&self) -> Vec<String> {
        self.exclude_structs
            .iter()
            .map(|i| i.struct_name.clone())
            .collect()
    }
}

/// mobx-keystone models target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct KeystoneConfig {
    pub input_file_path: PathBuf,
    pub output_dir: String,
    pub output_file_name: String,
    /// Comma separated struct names emitted first.
    pub sort: String,
    pub with_setter: bool,
    pub export_model_suffix: String,
    pub decorator_model_name_prefix: String,
    pub skip_models: Vec<String>,
}

impl KeystoneConfig {
    pub fn validate(&self) -> Result<()> {
        if self.input_file_path.as_os_str().is_empty() {
            return Err(Error::Config(
                "gen_keystone_from_struct: undefined input_file_path".to_string(),
            ));
        }
        if self.output_dir.trim().is_empty() {
            return Err(Error::Config(
                "gen_keystone_from_struct: undefined output_dir".to_string(),
            ));
        }
        Ok(())
    }

    pub fn output_file_name(&self) -> &str {
        if self.output_file_name.is_empty() {
            DEFAULT_KEYSTONE_FILE_NAME
        } else {
            &self.output_file_name
        }
    }

    pub fn sort_names(&self) -> Vec<&str> {
        self.sort
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .collect()
    }
}

/// TypeScript types target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TypescriptConfig {
    pub path: PathBuf,
    pub output_dir: String,
    pub output_file_name: String,
    pub export_type_prefix: String,
    pub export_type_suffix: String,
    pub include_struct_names_regexp: Vec<String>,
    pub exclude_struct_names_regexp: Vec<String>,
}

impl TypescriptConfig {
    pub fn validate(&self) -> Result<()> {
        let missing = [
            ("path", self.path.as_os_str().is_empty()),
            ("output_dir", self.output_dir.trim().is_empty()),
            ("output_file_name", self.output_file_name.trim().is_empty()),
        ]
        .into_iter()
        .find_map(|(key, empty)| empty.then_some(key));
        match missing {
            Some(key) => Err(Error::Config(format!(
                "gen_typescript_from_structs: undefined {key}"
            ))),
            None => Ok(()),
        }
    }
}
