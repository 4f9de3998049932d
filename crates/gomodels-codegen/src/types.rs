//! Canonical Go type expressions.
//!
//! Field types are stored as canonical Go type strings (`*int64`, `[]byte`,
//! `map[string]any`, `pkg.Type`). [`GoType`] is the parsed form used wherever
//! the structure matters: finding struct references for closure filling,
//! rewriting references after a rename, and projecting into target languages.

use std::fmt;

/// Predeclared Go identifiers that can appear in type position.
const BUILTIN_TYPES: &[&str] = &[
    "any",
    "bool",
    "byte",
    "comparable",
    "complex64",
    "complex128",
    "error",
    "float32",
    "float64",
    "int",
    "int8",
    "int16",
    "int32",
    "int64",
    "rune",
    "string",
    "uint",
    "uint8",
    "uint16",
    "uint32",
    "uint64",
    "uintptr",
];

/// Returns `true` for predeclared Go types such as `int64` or `string`.
pub fn is_builtin(name: &str) -> bool {
    BUILTIN_TYPES.contains(&name)
}

pub fn builtin_types() -> impl Iterator<Item = &'static str> {
    BUILTIN_TYPES.iter().copied()
}

/// Returns `true` when the identifier starts with an uppercase letter.
pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

/// A parsed Go type expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoType {
    /// Bare identifier: `int64`, `User`, `any`.
    Named(String),
    /// Package-qualified identifier: `time.Time`.
    Qualified { package: String, name: String },
    Pointer(Box<GoType>),
    /// Slices and arrays; arrays canonicalize to slices.
    Slice(Box<GoType>),
    Map(Box<GoType>, Box<GoType>),
    /// Interfaces, funcs, channels and generics, kept as written.
    Opaque(String),
}

impl GoType {
    /// Parse a canonical Go type string. Parsing is total: anything outside the
    /// supported grammar becomes [`GoType::Opaque`].
    pub fn parse(input: &str) -> GoType {
        let s = input.trim();
        if let Some(inner) = s.strip_prefix('*') {
            return GoType::Pointer(Box::new(GoType::parse(inner)));
        }
        if let Some(rest) = s.strip_prefix("map[") {
            if let Some(close) = matching_bracket(rest) {
                let key = GoType::parse(&rest[..close]);
                let value = GoType::parse(&rest[close + 1..]);
                return GoType::Map(Box::new(key), Box::new(value));
            }
            return GoType::Opaque(s.to_string());
        }
        if let Some(rest) = s.strip_prefix('[')
            && let Some(close) = rest.find(']')
        {
            let len = &rest[..close];
            if len.is_empty() || len.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return GoType::Slice(Box::new(GoType::parse(&rest[close + 1..])));
            }
        }
        if s == "interface{}" || s == "interface {}" {
            return GoType::Named("any".to_string());
        }
        if let Some((package, name)) = s.split_once('.')
            && is_identifier(package)
            && is_identifier(name)
        {
            return GoType::Qualified {
                package: package.to_string(),
                name: name.to_string(),
            };
        }
        if is_identifier(s) {
            return GoType::Named(s.to_string());
        }
        GoType::Opaque(s.to_string())
    }

    /// Strip every leading pointer.
    pub fn base(&self) -> &GoType {
        match self {
            GoType::Pointer(inner) => inner.base(),
            other => other,
        }
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, GoType::Pointer(_))
    }

    pub fn is_opaque(&self) -> bool {
        match self {
            GoType::Opaque(_) => true,
            GoType::Pointer(inner) | GoType::Slice(inner) => inner.is_opaque(),
            _ => false,
        }
    }

    /// Catalog key of a leaf type (`User`, `pkg.Type`); `None` for composites.
    pub fn leaf_key(&self) -> Option<String> {
        match self {
            GoType::Named(name) => Some(name.clone()),
            GoType::Qualified { package, name } => Some(format!("{package}.{name}")),
            _ => None,
        }
    }

    /// Every named or qualified leaf reachable through pointers, slices and
    /// map keys/values, in left-to-right order.
    pub fn leaves(&self) -> Vec<&GoType> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a GoType>) {
        match self {
            GoType::Named(_) | GoType::Qualified { .. } => out.push(self),
            GoType::Pointer(inner) | GoType::Slice(inner) => inner.collect_leaves(out),
            GoType::Map(key, value) => {
                key.collect_leaves(out);
                value.collect_leaves(out);
            }
            GoType::Opaque(_) => {}
        }
    }

    /// Rebuild the type with every named/qualified leaf passed through `f`.
    pub fn map_leaves(&self, f: &mut impl FnMut(&GoType) -> GoType) -> GoType {
        match self {
            GoType::Named(_) | GoType::Qualified { .. } => f(self),
            GoType::Pointer(inner) => GoType::Pointer(Box::new(inner.map_leaves(f))),
            GoType::Slice(inner) => GoType::Slice(Box::new(inner.map_leaves(f))),
            GoType::Map(key, value) => {
                GoType::Map(Box::new(key.map_leaves(f)), Box::new(value.map_leaves(f)))
            }
            GoType::Opaque(text) => GoType::Opaque(text.clone()),
        }
    }

    /// Replace references to the struct `from` with `to`.
    pub fn rename_refs(&self, from: &str, to: &str) -> GoType {
        self.map_leaves(&mut |leaf| match leaf.leaf_key() {
            Some(key) if key == from => GoType::parse(to),
            _ => leaf.clone(),
        })
    }

    /// Qualify bare non-builtin identifiers with `package`, for types lifted
    /// out of another package.
    pub fn qualify(&self, package: &str) -> GoType {
        self.map_leaves(&mut |leaf| match leaf {
            GoType::Named(name) if !is_builtin(name) => GoType::Qualified {
                package: package.to_string(),
                name: name.clone(),
            },
            other => other.clone(),
        })
    }
}

impl fmt::Display for GoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GoType::Named(name) => f.write_str(name),
            GoType::Qualified { package, name } => write!(f, "{package}.{name}"),
            GoType::Pointer(inner) => write!(f, "*{inner}"),
            GoType::Slice(inner) => write!(f, "[]{inner}"),
            GoType::Map(key, value) => write!(f, "map[{key}]{value}"),
            GoType::Opaque(text) => f.write_str(text),
        }
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Index of the `]` closing an already-opened bracket.
fn matching_bracket(s: &str) -> Option<usize> {
    let mut depth = 1usize;
    for (i, c) in s.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical_forms() {
        assert_eq!(GoType::parse("int64"), GoType::Named("int64".into()));
        assert_eq!(
            GoType::parse("*time.Time"),
            GoType::Pointer(Box::new(GoType::Qualified {
                package: "time".into(),
                name: "Time".into()
            }))
        );
        assert_eq!(
            GoType::parse("[4]byte"),
            GoType::Slice(Box::new(GoType::Named("byte".into())))
        );
        assert_eq!(GoType::parse("map[string]interface{}").to_string(), "map[string]any");
    }

    #[test]
    fn test_nested_map_display() {
        let ty = GoType::parse("map[string][]*map[int]Item");
        assert_eq!(ty.to_string(), "map[string][]*map[int]Item");
        let keys: Vec<_> = ty.leaves().iter().filter_map(|l| l.leaf_key()).collect();
        assert_eq!(keys, vec!["string", "int", "Item"]);
    }

    #[test]
    fn test_opaque_types() {
        assert!(GoType::parse("func(int) error").is_opaque());
        assert!(GoType::parse("chan int").is_opaque());
        assert!(GoType::parse("*List[int]").is_opaque());
        assert!(GoType::parse("interface{ Close() error }").is_opaque());
    }

    #[test]
    fn test_rename_refs_keeps_wrappers() {
        let ty = GoType::parse("[]*User");
        assert_eq!(ty.rename_refs("User", "Account").to_string(), "[]*Account");
        assert_eq!(ty.rename_refs("Other", "Account").to_string(), "[]*User");
    }

    #[test]
    fn test_qualify_skips_builtins() {
        let ty = GoType::parse("map[string]*Address");
        assert_eq!(ty.qualify("geo").to_string(), "map[string]*geo.Address");
    }

    #[test]
    fn test_exported() {
        assert!(is_exported("User"));
        assert!(!is_exported("user"));
        assert!(!is_exported("[]User"));
    }
}
