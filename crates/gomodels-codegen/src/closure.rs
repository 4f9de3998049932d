//! Transitive closure of struct references.

use std::collections::BTreeSet;

use tracing::debug;

use crate::catalog::{ScalarAliasTable, StructCatalog};
use crate::error::{Error, Result, Stage};
use crate::types::{self, GoType};

/// Copy into `selected` every struct it references, directly or transitively,
/// from the universe `all`. Returns the number of structs added.
///
/// Pulled structs have their references to structs renamed in `selected`
/// rewritten to the new names. A reference that is neither a builtin, an
/// alias, nor a struct of `all` is a lookup error.
pub fn fill_missed_types(
    all: &StructCatalog,
    selected: &mut StructCatalog,
    aliases: &ScalarAliasTable,
) -> Result<usize> {
    let renames = selected.renames();
    let mut added = 0;

    loop {
        let missed = missed_structs(all, selected, aliases);
        if missed.is_empty() {
            break;
        }
        for name in missed {
            let mut entry = all
                .get(&name)
                .cloned()
                .ok_or_else(|| Error::struct_not_found(Stage::Closure, name.as_str()))?;
            for (from, to) in &renames {
                entry.rename_type_refs(from, to);
            }
            debug!(struct_name = %name, "filled missed type");
            selected.insert(entry);
            added += 1;
        }
    }

    Ok(added)
}

/// Struct names referenced by `selected` but absent from it, sorted.
pub fn missed_structs(
    all: &StructCatalog,
    selected: &StructCatalog,
    aliases: &ScalarAliasTable,
) -> Vec<String> {
    let mut missed = BTreeSet::new();
    for entry in selected.iter() {
        for field in &entry.fields {
            if field.meta.is_opaque {
                continue;
            }
            for leaf in field.go_type().leaves() {
                let Some(key) = leaf.leaf_key() else {
                    continue;
                };
                if selected.contains(&key) || aliases.contains(&key) {
                    continue;
                }
                let wanted = match leaf {
                    GoType::Named(name) => !types::is_builtin(name) && types::is_exported(name),
                    GoType::Qualified { .. } => all.contains(&key),
                    _ => false,
                };
                if wanted {
                    missed.insert(key);
                }
            }
        }
    }
    missed.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FieldEntry, FieldTags, StructEntry};

    fn entry(name: &str, fields: &[(&str, &str)]) -> StructEntry {
        fields.iter().fold(StructEntry::new(name), |entry, (field, ty)| {
            entry.with_field(FieldEntry::new(*field, *ty, FieldTags::new()))
        })
    }

    fn universe() -> StructCatalog {
        [
            entry("A", &[("B", "*B"), ("Status", "Status")]),
            entry("B", &[("C", "[]C")]),
            entry("C", &[("Meta", "map[string]any"), ("Point", "geo.Point")]),
            entry("geo.Point", &[("Lat", "float64")]),
            entry("D", &[("ID", "int64")]),
        ]
        .into_iter()
        .collect()
    }

    fn aliases() -> ScalarAliasTable {
        let mut aliases = ScalarAliasTable::new();
        aliases.insert("Status", "int16");
        aliases
    }

    #[test]
    fn test_transitive_closure() {
        let all = universe();
        let mut selected: StructCatalog = all.get("A").cloned().into_iter().collect();
        let added = fill_missed_types(&all, &mut selected, &aliases()).unwrap();
        assert_eq!(added, 3);
        assert_eq!(
            selected.names().collect::<Vec<_>>(),
            vec!["A", "B", "C", "geo.Point"]
        );
    }

    #[test]
    fn test_closure_is_idempotent() {
        let all = universe();
        let mut selected: StructCatalog = all.get("A").cloned().into_iter().collect();
        fill_missed_types(&all, &mut selected, &aliases()).unwrap();
        let closed = selected.clone();
        assert_eq!(fill_missed_types(&all, &mut selected, &aliases()).unwrap(), 0);
        assert_eq!(selected, closed);
    }

    #[test]
    fn test_pulled_structs_follow_renames() {
        let all: StructCatalog = [
            entry("Order", &[("Customer", "*User")]),
            entry("User", &[("ID", "int64"), ("Orders", "[]Order")]),
        ]
        .into_iter()
        .collect();

        let mut account = all.get("User").cloned().unwrap();
        account.name = "Account".to_string();
        let mut selected: StructCatalog = [account].into_iter().collect();

        fill_missed_types(&all, &mut selected, &ScalarAliasTable::new()).unwrap();
        assert_eq!(selected.names().collect::<Vec<_>>(), vec!["Account", "Order"]);
        assert_eq!(
            selected.get("Order").unwrap().field("Customer").unwrap().ty,
            "*Account"
        );
    }

    #[test]
    fn test_unknown_reference_is_lookup_error() {
        let all = StructCatalog::new();
        let mut selected: StructCatalog =
            [entry("A", &[("Ghost", "Ghost")])].into_iter().collect();
        let err = fill_missed_types(&all, &mut selected, &ScalarAliasTable::new()).unwrap_err();
        assert!(matches!(
            err,
            Error::StructNotFound {
                stage: Stage::Closure,
                ..
            }
        ));
    }

    #[test]
    fn test_external_scalars_are_not_missed() {
        let all = universe();
        let selected: StructCatalog = [entry(
            "Event",
            &[("At", "time.Time"), ("Handler", "func() error"), ("cache", "lru")],
        )]
        .into_iter()
        .collect();
        assert!(missed_structs(&all, &selected, &aliases()).is_empty());
    }
}
