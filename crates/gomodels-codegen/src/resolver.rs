//! External type resolution across Go packages.
//!
//! A [`Resolver`] loads the package of the input file (or directory) together
//! with every package of the same Go module it imports, transitively, and then
//! resolves type references that the file alone cannot answer:
//!
//! - candidates such as `type Account = auth.Account` or `type Row Base`;
//! - field types naming structs declared in sibling files or other packages.
//!
//! Resolved declarations are memoized per `(package directory, type name)`.
//! Selectors into packages that are not part of the module (the standard
//! library, third-party modules) are left alone for the projection tables.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::catalog::{ScalarAliasTable, StructCatalog, StructEntry};
use crate::error::{Error, Result};
use crate::extractor::{self, ExternalCandidate, FieldFailure, TypeDecl};
use crate::scanner::{ImportSpec, ParsedFile};
use crate::types::{self, GoType};

/// The module declared by a `go.mod` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoModule {
    /// Module path from the `module` directive.
    pub path: String,
    /// Directory holding `go.mod`.
    pub root: PathBuf,
}

impl GoModule {
    /// Find the `go.mod` enclosing `dir`, walking up the directory tree.
    pub fn find(dir: &Path) -> Result<Option<Self>> {
        for ancestor in dir.ancestors() {
            let go_mod = ancestor.join("go.mod");
            if !go_mod.is_file() {
                continue;
            }
            let content = fs::read_to_string(&go_mod).map_err(|e| Error::io(&go_mod, e))?;
            let path = content
                .lines()
                .map(|line| line.split_once("//").map_or(line, |(code, _)| code))
                .find_map(|line| line.trim().strip_prefix("module "))
                .map(|path| path.trim().trim_matches('"').to_string());
            return match path {
                Some(path) => Ok(Some(Self {
                    path,
                    root: ancestor.to_path_buf(),
                })),
                None => Err(Error::PackageLoad {
                    dir: ancestor.to_path_buf(),
                    reason: "go.mod has no module directive".to_string(),
                }),
            };
        }
        Ok(None)
    }

    /// Directory of a package of this module, `None` for foreign imports.
    pub fn dir_for(&self, import_path: &str) -> Option<PathBuf> {
        if import_path == self.path {
            return Some(self.root.clone());
        }
        import_path
            .strip_prefix(&self.path)?
            .strip_prefix('/')
            .map(|rest| self.root.join(rest))
    }

    /// Import path of a directory inside this module.
    pub fn import_path_for(&self, dir: &Path) -> Option<String> {
        let rel = dir.strip_prefix(&self.root).ok()?;
        if rel.as_os_str().is_empty() {
            return Some(self.path.clone());
        }
        let rel = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        Some(format!("{}/{rel}", self.path))
    }
}

/// One loaded Go package: the non-test files of a directory.
#[derive(Debug)]
pub struct Package {
    /// Name from the package clause.
    pub name: String,
    pub dir: PathBuf,
    pub import_path: Option<String>,
    pub files: Vec<Rc<ParsedFile>>,
}

/// The package of a directory plus every module package it reaches.
#[derive(Debug)]
pub struct PackageSet {
    pub module: Option<GoModule>,
    /// The directory's own package comes first.
    pub packages: Vec<Rc<Package>>,
}

impl PackageSet {
    pub fn root(&self) -> &Rc<Package> {
        &self.packages[0]
    }

    pub fn by_import_path(&self, import_path: &str) -> Option<&Rc<Package>> {
        self.packages
            .iter()
            .find(|p| p.import_path.as_deref() == Some(import_path))
    }

    pub fn by_name(&self, name: &str) -> Option<&Rc<Package>> {
        self.packages.iter().find(|p| p.name == name)
    }
}

/// Structs and scalar aliases resolved for one file or directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub structs: StructCatalog,
    pub aliases: ScalarAliasTable,
    /// Fields dropped because their type could not be classified.
    pub failures: Vec<FieldFailure>,
}

#[derive(Debug)]
enum Declaration {
    Struct {
        origin: Rc<Package>,
        entry: StructEntry,
        failures: Vec<FieldFailure>,
    },
    Alias {
        origin: Rc<Package>,
        underlying: String,
    },
    /// A type of a package outside the module, kept as `pkg.Type`.
    External(String),
}

enum Reference {
    Bare(String),
    Selector {
        key: String,
        package: Rc<Package>,
        type_name: String,
    },
}

type Visited = HashSet<(PathBuf, String)>;

/// Where structs lifted out of other packages came from.
///
/// Each package gets one qualifier for its bare identifiers, unique within a
/// resolution, so packages sharing a clause name never share catalog keys.
#[derive(Debug)]
struct Origins {
    /// Package directory → qualifier.
    qualifiers: HashMap<PathBuf, String>,
    /// Catalog key → declaring package.
    structs: HashMap<String, Rc<Package>>,
}

impl Origins {
    fn new(root: &Package) -> Self {
        Self {
            qualifiers: HashMap::from([(root.dir.clone(), root.name.clone())]),
            structs: HashMap::new(),
        }
    }

    fn qualifier(&mut self, package: &Package, preferred: &str) -> String {
        if let Some(qualifier) = self.qualifiers.get(&package.dir) {
            return qualifier.clone();
        }
        let imported = |name: &str| {
            package
                .files
                .iter()
                .any(|f| f.imports.iter().any(|i| i.local_name() == name))
        };
        let mut qualifier = preferred.to_string();
        let mut n = 2;
        while imported(&qualifier) || self.qualifiers.values().any(|q| *q == qualifier) {
            qualifier = format!("{preferred}{n}");
            n += 1;
        }
        self.qualifiers.insert(package.dir.clone(), qualifier.clone());
        qualifier
    }

    /// The declaring package of struct `key` when `qualifier` is its own.
    fn package_for(&self, key: &str, qualifier: &str) -> Option<Rc<Package>> {
        let origin = self.structs.get(key)?;
        let own = self.qualifiers.get(&origin.dir)?;
        (own == qualifier).then(|| Rc::clone(origin))
    }
}

/// Package loader and memoized type resolver.
///
/// Caches live as long as the resolver; tests build their own.
#[derive(Debug, Default)]
pub struct Resolver {
    package_sets: HashMap<PathBuf, Rc<PackageSet>>,
    files: HashMap<PathBuf, Rc<ParsedFile>>,
    declarations: HashMap<(PathBuf, String), Option<Rc<Declaration>>>,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract the structs of one file and resolve everything they reference.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<Extraction> {
        let path = path.as_ref();
        let path = fs::canonicalize(path).map_err(|e| Error::io(path, e))?;
        let file = self.parse_file(&path)?;
        let set = self.load_packages(file.dir())?;
        self.resolve(&set, &[file])
    }

    /// Extract the structs of every non-test file of a directory and resolve
    /// everything they reference.
    pub fn load_dir(&mut self, dir: impl AsRef<Path>) -> Result<Extraction> {
        let set = self.load_packages(dir.as_ref())?;
        let files = set.root().files.clone();
        self.resolve(&set, &files)
    }

    /// Load the package of `dir` and the module packages it imports.
    pub fn load_packages(&mut self, dir: &Path) -> Result<Rc<PackageSet>> {
        let dir = fs::canonicalize(dir).map_err(|e| Error::PackageLoad {
            dir: dir.to_path_buf(),
            reason: e.to_string(),
        })?;
        if let Some(set) = self.package_sets.get(&dir) {
            return Ok(Rc::clone(set));
        }
        if !dir.is_dir() {
            return Err(Error::PackageLoad {
                dir,
                reason: "not a directory".to_string(),
            });
        }

        let module = GoModule::find(&dir)?;
        let root = self
            .load_package(&dir, module.as_ref())?
            .ok_or_else(|| Error::PackageLoad {
                dir: dir.clone(),
                reason: "no Go source files".to_string(),
            })?;
        let mut packages = vec![Rc::new(root)];

        if let Some(module) = &module {
            let mut seen = HashSet::from([dir.clone()]);
            let mut next = 0;
            while next < packages.len() {
                let imports: Vec<String> = packages[next]
                    .files
                    .iter()
                    .flat_map(|f| f.imports.iter().map(|i| i.path.clone()))
                    .collect();
                next += 1;

                for import in imports {
                    let Some(pkg_dir) = module.dir_for(&import) else {
                        continue;
                    };
                    if !seen.insert(pkg_dir.clone()) {
                        continue;
                    }
                    if !pkg_dir.is_dir() {
                        warn!(import = %import, "module package directory not found");
                        continue;
                    }
                    match self.load_package(&pkg_dir, Some(module))? {
                        Some(package) => {
                            debug!(import = %import, files = package.files.len(), "loaded package");
                            packages.push(Rc::new(package));
                        }
                        None => warn!(import = %import, "module package has no Go source files"),
                    }
                }
            }
        }

        let set = Rc::new(PackageSet { module, packages });
        self.package_sets.insert(dir, Rc::clone(&set));
        Ok(set)
    }

    fn load_package(&mut self, dir: &Path, module: Option<&GoModule>) -> Result<Option<Package>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| Error::PackageLoad {
                dir: dir.to_path_buf(),
                reason: e.to_string(),
            })?;
            let path = entry.path();
            let is_source = entry.file_type().is_file()
                && path.extension().is_some_and(|e| e == "go")
                && !path.to_string_lossy().ends_with("_test.go");
            if !is_source {
                continue;
            }
            let file = self.parse_file(path)?;
            if file.package.ends_with("_test") {
                continue;
            }
            files.push(file);
        }

        let Some(first) = files.first() else {
            return Ok(None);
        };
        Ok(Some(Package {
            name: first.package.clone(),
            dir: dir.to_path_buf(),
            import_path: module.and_then(|m| m.import_path_for(dir)),
            files,
        }))
    }

    fn parse_file(&mut self, path: &Path) -> Result<Rc<ParsedFile>> {
        if let Some(file) = self.files.get(path) {
            return Ok(Rc::clone(file));
        }
        let file = Rc::new(ParsedFile::read(path)?);
        self.files.insert(path.to_path_buf(), Rc::clone(&file));
        Ok(file)
    }

    fn resolve(&mut self, set: &PackageSet, files: &[Rc<ParsedFile>]) -> Result<Extraction> {
        let root = Rc::clone(set.root());
        let mut out = Extraction::default();
        let mut origins = Origins::new(&root);
        let mut candidates: Vec<(Rc<ParsedFile>, ExternalCandidate)> = Vec::new();

        for file in files {
            let extraction = extractor::extract_file(file);
            for entry in extraction.structs {
                out.structs.insert(entry);
            }
            for (name, underlying) in extraction.aliases {
                out.aliases.insert(name, underlying);
            }
            out.failures.extend(extraction.failures);
            candidates.extend(
                extraction
                    .candidates
                    .into_iter()
                    .map(|c| (Rc::clone(file), c)),
            );
        }

        for (file, candidate) in &candidates {
            let mut visited = Visited::new();
            let found = self.chase(set, &root, file, candidate, &mut visited)?;
            let Some(declaration) = found else {
                let type_name = match &candidate.selector_package {
                    Some(package) => format!("{package}.{}", candidate.selector_type),
                    None => candidate.selector_type.clone(),
                };
                return Err(not_found(type_name, &root.dir));
            };
            debug!(name = %candidate.local_name, "resolved candidate");
            insert_declaration(
                &mut out,
                &mut origins,
                &candidate.local_name,
                &declaration,
                &root,
            );
        }

        loop {
            let references = unresolved_references(set, &out, &origins);
            if references.is_empty() {
                break;
            }
            for reference in references {
                let mut visited = Visited::new();
                let (key, found, dir) = match reference {
                    Reference::Bare(name) => {
                        let found = self.find_bare(set, &root, &name, &mut visited)?;
                        (name, found, root.dir.clone())
                    }
                    Reference::Selector {
                        key,
                        package,
                        type_name,
                    } => {
                        let found = self.lookup(set, &package, &type_name, &mut visited)?;
                        (key, found, package.dir.clone())
                    }
                };
                let declaration = found.ok_or_else(|| not_found(key.clone(), &dir))?;
                debug!(name = %key, "resolved reference");
                insert_declaration(&mut out, &mut origins, &key, &declaration, &root);
            }
        }

        Ok(out)
    }

    /// Follow a candidate to the declaration it names.
    fn chase(
        &mut self,
        set: &PackageSet,
        home: &Rc<Package>,
        file: &ParsedFile,
        candidate: &ExternalCandidate,
        visited: &mut Visited,
    ) -> Result<Option<Rc<Declaration>>> {
        let Some(selector) = &candidate.selector_package else {
            return self.find_bare(set, home, &candidate.selector_type, visited);
        };
        match package_for_selector(set, file.import_path_for(selector), selector) {
            Some(target) => self.lookup(set, &target, &candidate.selector_type, visited),
            None => Ok(Some(Rc::new(Declaration::External(format!(
                "{selector}.{}",
                candidate.selector_type
            ))))),
        }
    }

    /// Search `home` first, then every other loaded package.
    fn find_bare(
        &mut self,
        set: &PackageSet,
        home: &Rc<Package>,
        name: &str,
        visited: &mut Visited,
    ) -> Result<Option<Rc<Declaration>>> {
        if let Some(found) = self.lookup(set, home, name, visited)? {
            return Ok(Some(found));
        }
        for package in &set.packages {
            if package.dir == home.dir {
                continue;
            }
            if let Some(found) = self.lookup(set, package, name, visited)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    fn lookup(
        &mut self,
        set: &PackageSet,
        package: &Rc<Package>,
        name: &str,
        visited: &mut Visited,
    ) -> Result<Option<Rc<Declaration>>> {
        let key = (package.dir.clone(), name.to_string());
        if let Some(found) = self.declarations.get(&key) {
            return Ok(found.clone());
        }
        if !visited.insert(key.clone()) {
            debug!(package = %package.name, name, "declaration cycle");
            return Ok(None);
        }

        let mut found = None;
        for file in &package.files {
            let Some(decl) = extractor::extract_named_type(file, name) else {
                continue;
            };
            found = match decl {
                TypeDecl::Struct(entry, failures) => Some(Rc::new(Declaration::Struct {
                    origin: Rc::clone(package),
                    entry,
                    failures,
                })),
                TypeDecl::Alias(_, underlying) => Some(Rc::new(Declaration::Alias {
                    origin: Rc::clone(package),
                    underlying,
                })),
                TypeDecl::Candidate(candidate) => {
                    self.chase(set, package, file, &candidate, visited)?
                }
                TypeDecl::Skipped => Some(Rc::new(Declaration::Alias {
                    origin: Rc::clone(package),
                    underlying: "any".to_string(),
                })),
            };
            break;
        }

        self.declarations.insert(key, found.clone());
        Ok(found)
    }
}

fn not_found(type_name: String, dir: &Path) -> Error {
    Error::TypeResolution {
        type_name,
        dir: dir.to_path_buf(),
        reason: "declaration not found in any loaded package".to_string(),
    }
}

/// The loaded package a selector refers to. Selectors without an import are
/// matched against package clause names.
fn package_for_selector(
    set: &PackageSet,
    import_path: Option<&str>,
    selector: &str,
) -> Option<Rc<Package>> {
    match import_path {
        Some(path) => set.by_import_path(path).cloned(),
        None => set.by_name(selector).cloned(),
    }
}

fn insert_declaration(
    out: &mut Extraction,
    origins: &mut Origins,
    key: &str,
    declaration: &Declaration,
    root: &Package,
) {
    match declaration {
        Declaration::Struct {
            origin,
            entry,
            failures,
        } => {
            let mut entry = entry.clone();
            entry.name = key.to_string();
            entry.original_name = key.to_string();
            if origin.dir != root.dir {
                let qualifier = origins.qualifier(origin, preferred_qualifier(key, origin));
                for field in &mut entry.fields {
                    let qualified = field.go_type().qualify(&qualifier);
                    field.set_type(&qualified);
                }
                entry.external_package_alias = Some(qualifier);
                origins.structs.insert(key.to_string(), Rc::clone(origin));
            }
            out.failures.extend(failures.iter().map(|failure| FieldFailure {
                struct_name: key.to_string(),
                ..failure.clone()
            }));
            out.structs.insert(entry);
        }
        Declaration::Alias { origin, underlying } => {
            let ty = GoType::parse(underlying);
            let ty = if origin.dir != root.dir {
                ty.qualify(&origins.qualifier(origin, preferred_qualifier(key, origin)))
            } else {
                ty
            };
            out.aliases.insert(key, ty.to_string());
        }
        Declaration::External(target) => out.aliases.insert(key, target.as_str()),
    }
}

/// The selector a struct was reached through, else its package name.
fn preferred_qualifier<'a>(key: &'a str, origin: &'a Package) -> &'a str {
    match key.split_once('.') {
        Some((selector, _)) => selector,
        None => &origin.name,
    }
}

/// Field type references that are neither in the catalog nor aliases.
fn unresolved_references(
    set: &PackageSet,
    out: &Extraction,
    origins: &Origins,
) -> Vec<Reference> {
    let mut seen = HashSet::new();
    let mut references = Vec::new();
    let known = |key: &str| out.structs.contains(key) || out.aliases.contains(key);

    for entry in out.structs.iter() {
        for field in &entry.fields {
            if field.meta.is_opaque {
                continue;
            }
            let ty = field.go_type();
            for leaf in ty.leaves() {
                match leaf {
                    GoType::Named(name) => {
                        if types::is_builtin(name) || known(name) || !seen.insert(name.clone()) {
                            continue;
                        }
                        references.push(Reference::Bare(name.clone()));
                    }
                    GoType::Qualified { package, name } => {
                        let key = format!("{package}.{name}");
                        if known(&key) || seen.contains(&key) {
                            continue;
                        }
                        let target = origins.package_for(&entry.name, package).or_else(|| {
                            let import_path = entry
                                .imports
                                .iter()
                                .filter_map(|spec| ImportSpec::from_spec_string(spec))
                                .find(|spec| spec.local_name() == package)
                                .map(|spec| spec.path);
                            package_for_selector(set, import_path.as_deref(), package)
                        });
                        let Some(target) = target else {
                            continue;
                        };
                        seen.insert(key.clone());
                        references.push(Reference::Selector {
                            key,
                            package: target,
                            type_name: name.clone(),
                        });
                    }
                    _ => {}
                }
            }
        }
    }

    references
}

#[cfg(test)]
mod tests {
    use super::*;

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
            "models/models.go",
            r#"package models

import (
	"time"

	"example.com/app/geo"
	"github.com/shopspring/decimal"
)

type Status int16

type Location = geo.Point

type Money = decimal.Decimal

type User struct {
	ID        int64
	Status    Status
	Home      *geo.Address
	Friends   []*User
	CreatedAt time.Time
	Profile   Profile
	Balance   Money
}
"#,
        );
        write(
            root,
            "models/owner.go",
            r#"package models

import "example.com/app/geo"

type Profile struct {
	Bio string
}

type Owner struct {
	Name    string
	Address *geo.Address
}
"#,
        );
        write(
            root,
            "models/models_test.go",
            "package models\n\ntype Fixture struct {\n\tMissing Nowhere\n}\n",
        );
        write(
            root,
            "geo/geo.go",
            r#"package geo

import "example.com/app/models"

type Point struct {
	Lat float64
	Lng float64
}

type Address struct {
	Street string
	Point  Point
	Owner  *models.Owner
}
"#,
        );
        dir
    }

    #[test]
    fn test_go_module_paths() {
        let module = GoModule {
            path: "example.com/app".to_string(),
            root: PathBuf::from("/src/app"),
        };
        assert_eq!(
            module.dir_for("example.com/app/geo"),
            Some(PathBuf::from("/src/app/geo"))
        );
        assert_eq!(module.dir_for("example.com/application"), None);
        assert_eq!(module.dir_for("time"), None);
        assert_eq!(
            module.import_path_for(Path::new("/src/app/internal/db")),
            Some("example.com/app/internal/db".to_string())
        );
    }

    #[test]
    fn test_load_packages_follows_module_imports() {
        let dir = module();
        let mut resolver = Resolver::new();
        let set = resolver.load_packages(&dir.path().join("models")).unwrap();
        let names: Vec<_> = set.packages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["models", "geo"]);
        assert_eq!(set.root().files.len(), 2);
        assert_eq!(
            set.module.as_ref().map(|m| m.path.as_str()),
            Some("example.com/app")
        );
    }

    #[test]
    fn test_resolve_across_mutually_referencing_packages() {
        let dir = module();
        let mut resolver = Resolver::new();
        let extraction = resolver
            .load_file(dir.path().join("models/models.go"))
            .unwrap();

        let names: Vec<_> = extraction.structs.names().collect();
        assert_eq!(
            names,
            vec![
                "Location",
                "Profile",
                "User",
                "geo.Address",
                "geo.Point",
                "models.Owner",
            ]
        );

        let location = extraction.structs.get("Location").unwrap();
        assert_eq!(location.external_package_alias.as_deref(), Some("geo"));
        assert_eq!(location.field_names(), vec!["Lat", "Lng"]);

        let address = extraction.structs.get("geo.Address").unwrap();
        assert_eq!(address.field("Point").unwrap().ty, "geo.Point");
        assert_eq!(address.field("Owner").unwrap().ty, "*models.Owner");

        assert_eq!(extraction.aliases.get("Status"), Some("int16"));
        assert_eq!(extraction.aliases.get("Money"), Some("decimal.Decimal"));
        assert!(!extraction.structs.contains("time.Time"));
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let dir = module();
        let mut resolver = Resolver::new();
        let path = dir.path().join("models/models.go");
        let first = resolver.load_file(&path).unwrap();
        let second = resolver.load_file(&path).unwrap();
        assert_eq!(first, second);

        let fresh = Resolver::new().load_file(&path).unwrap();
        assert_eq!(first, fresh);
    }

    #[test]
    fn test_load_dir_skips_test_files() {
        let dir = module();
        let extraction = Resolver::new().load_dir(dir.path().join("models")).unwrap();
        assert!(extraction.structs.contains("Owner"));
        assert!(extraction.structs.contains("User"));
        assert!(!extraction.structs.contains("Fixture"));
    }

    #[test]
    fn test_missing_declaration_names_type_and_dir() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "models.go",
            "package models\n\ntype User struct {\n\tAddress Address\n}\n",
        );
        let err = Resolver::new()
            .load_file(dir.path().join("models.go"))
            .unwrap_err();
        match err {
            Error::TypeResolution { type_name, .. } => assert_eq!(type_name, "Address"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_alias_cycle_terminates() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "models.go",
            "package models\n\ntype A B\n\ntype B A\n",
        );
        let err = Resolver::new()
            .load_file(dir.path().join("models.go"))
            .unwrap_err();
        assert!(matches!(err, Error::TypeResolution { .. }));
    }

    #[test]
    fn test_module_directive_ignores_trailing_comment() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "go.mod", "module example.com/app // main module\n\ngo 1.22\n");
        let module = GoModule::find(dir.path()).unwrap().unwrap();
        assert_eq!(module.path, "example.com/app");
    }

    fn same_name_module(import: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "go.mod", "module example.com/app\n");
        write(
            root,
            "models/models.go",
            &format!(
                r#"package models

import {import}

type Sub struct {{
	Wrong bool
}}

type User struct {{
	Invoice {selector}.Invoice
}}
"#,
                selector = if import.starts_with("bm ") { "bm" } else { "models" },
            ),
        );
        write(
            root,
            "billing/models/models.go",
            r#"package models

type Sub struct {
	Amount int64
}

type Invoice struct {
	Line   Sub
	Notify chan int
}
"#,
        );
        dir
    }

    #[test]
    fn test_packages_sharing_a_name_resolve_in_their_own_package() {
        let dir = same_name_module(r#"bm "example.com/app/billing/models""#);
        let extraction = Resolver::new()
            .load_file(dir.path().join("models/models.go"))
            .unwrap();

        let names: Vec<_> = extraction.structs.names().collect();
        assert_eq!(names, vec!["Sub", "User", "bm.Invoice", "bm.Sub"]);

        let invoice = extraction.structs.get("bm.Invoice").unwrap();
        assert_eq!(invoice.external_package_alias.as_deref(), Some("bm"));
        assert_eq!(invoice.field("Line").unwrap().ty, "bm.Sub");
        assert_eq!(
            extraction.structs.get("bm.Sub").unwrap().field_names(),
            vec!["Amount"]
        );
        assert_eq!(extraction.structs.get("Sub").unwrap().field_names(), vec!["Wrong"]);
    }

    #[test]
    fn test_unaliased_same_name_package_gets_its_own_qualifier() {
        let dir = same_name_module(r#""example.com/app/billing/models""#);
        let extraction = Resolver::new()
            .load_file(dir.path().join("models/models.go"))
            .unwrap();

        let names: Vec<_> = extraction.structs.names().collect();
        assert_eq!(names, vec!["Sub", "User", "models.Invoice", "models2.Sub"]);
        let invoice = extraction.structs.get("models.Invoice").unwrap();
        assert_eq!(invoice.field("Line").unwrap().ty, "models2.Sub");
        assert_eq!(
            extraction.structs.get("models2.Sub").unwrap().field_names(),
            vec!["Amount"]
        );
    }

    #[test]
    fn test_unclassified_fields_are_reported() {
        let dir = same_name_module(r#"bm "example.com/app/billing/models""#);
        write(
            dir.path(),
            "models/event.go",
            "package models\n\ntype Event struct {\n\tID int64\n\tDone chan struct{}\n}\n",
        );
        let extraction = Resolver::new()
            .load_dir(dir.path().join("models"))
            .unwrap();

        let failed: Vec<_> = extraction
            .failures
            .iter()
            .map(|f| (f.struct_name.as_str(), f.field_name.as_str()))
            .collect();
        assert_eq!(failed, vec![("Event", "Done"), ("bm.Invoice", "Notify")]);
        assert_eq!(extraction.structs.get("Event").unwrap().field_names(), vec!["ID"]);
        assert_eq!(
            extraction.structs.get("bm.Invoice").unwrap().field_names(),
            vec!["Line"]
        );
    }

    #[test]
    fn test_missing_directory_is_package_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Resolver::new()
            .load_dir(dir.path().join("nope"))
            .unwrap_err();
        assert!(matches!(err, Error::PackageLoad { .. }));
    }
}
