//! Ordinal import resolution: turning `{dll, ordinal}` pairs into symbol names using an external
//! `.def`-derived table (spec §4.6, §9; `.def` line format from `original_source/gen-e32def.py`).

use hashbrown::HashMap;

use crate::error::Error;

/// `basename → dense, ordinal-indexed symbol table` for every known DLL, as produced by
/// [`parse_def_file`] or assembled by hand.
#[derive(Debug, Default, Clone)]
pub struct OrdinalTable {
    deffiles: HashMap<String, Vec<String>>,
}

/// A small number of DLL basenames are known by a different canonical name than their own
/// filename; `obex` is the historical case (the `.def` files ship as `irobex`).
const ALIAS_MAP: &[(&str, &str)] = &[("obex", "irobex")];

impl OrdinalTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a `.def` file's lines (`symbol @ ordinal [other fields]`) into a dense,
    /// ordinal-indexed symbol list for `dll_basename`, padding missing ordinals with
    /// `_<mangled_dll>_missing_<n>`.
    pub fn parse_def_file(&mut self, dll_basename: &str, contents: &str) {
        let dll_basename = dll_basename.to_lowercase();
        let mut by_ordinal: HashMap<u32, String> = HashMap::new();

        for line in contents.lines() {
            let mut fields = line.trim().splitn(2, '@');
            let (Some(symbol), Some(rest)) = (fields.next(), fields.next()) else {
                continue;
            };
            let Some(ordinal_token) = rest.split_whitespace().next() else { continue };
            let Ok(ordinal) = ordinal_token.parse::<u32>() else { continue };
            by_ordinal.insert(ordinal, symbol.trim().to_string());
        }

        let max_ordinal = by_ordinal.keys().copied().max();
        let mangled = mangle(&dll_basename);
        let table = match max_ordinal {
            Some(max) => (0..=max)
                .map(|i| {
                    by_ordinal
                        .get(&i)
                        .cloned()
                        .unwrap_or_else(|| format!("_{mangled}_missing_{i}"))
                })
                .collect(),
            None => Vec::new(),
        };

        self.deffiles.insert(dll_basename, table);
    }

    /// Resolves `dll_name`'s raw file reference (e.g. `"EUSER.DLL"`, `"EUSER[10000079].DLL"`) down
    /// to the canonical basename used as a key into `deffiles`: strip the extension and any
    /// trailing `{uid}`/`[uid]` decoration, lowercase.
    #[must_use]
    pub fn canonical_basename(dll_name: &str) -> String {
        let stem = dll_name.rsplit_once('.').map_or(dll_name, |(stem, _)| stem);
        let stem = stem.split(['{', '[']).next().unwrap_or(stem);
        stem.to_lowercase()
    }

    /// Looks up `ordinal`'s symbol name within `dll_name`'s table, trying (in order) the exact
    /// basename, `name + "u"`, the alias map, and finally a basename prefix match against every
    /// known DLL.
    ///
    /// # Errors
    /// [`Error::UnresolvedImport`] if no matching DLL/ordinal is found.
    pub fn resolve(&self, dll_name: &str, ordinal: u32) -> Result<&str, Error> {
        let basename = Self::canonical_basename(dll_name);

        if let Some(table) = self.deffiles.get(&basename) {
            if let Some(symbol) = table.get(ordinal as usize) {
                return Ok(symbol);
            }
        }

        let with_u = format!("{basename}u");
        if let Some(table) = self.deffiles.get(&with_u) {
            if let Some(symbol) = table.get(ordinal as usize) {
                return Ok(symbol);
            }
        }

        if let Some((_, aliased)) = ALIAS_MAP.iter().find(|(from, _)| *from == basename) {
            if let Some(table) = self.deffiles.get(*aliased) {
                if let Some(symbol) = table.get(ordinal as usize) {
                    return Ok(symbol);
                }
            }
        }

        if let Some((_, table)) = self.deffiles.iter().find(|(name, _)| name.starts_with(&basename)) {
            if let Some(symbol) = table.get(ordinal as usize) {
                return Ok(symbol);
            }
        }

        Err(Error::UnresolvedImport { dll: dll_name.to_string(), ordinal })
    }
}

/// Produces a filesystem/identifier-safe stand-in for a DLL basename, used only to name
/// placeholders for ordinals absent from the `.def` table.
fn mangle(dll_basename: &str) -> String {
    dll_basename
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_basename_strips_extension_and_uid_suffix() {
        assert_eq!(OrdinalTable::canonical_basename("EUSER.DLL"), "euser");
        assert_eq!(OrdinalTable::canonical_basename("EUSER{10000079}.DLL"), "euser");
        assert_eq!(OrdinalTable::canonical_basename("EUSER[10000079].DLL"), "euser");
    }

    #[test]
    fn parse_def_file_pads_missing_ordinals() {
        let mut table = OrdinalTable::new();
        table.parse_def_file("euser", "Foo @ 1\nBar @ 3\n");
        assert_eq!(
            table.resolve("EUSER.DLL", 3).unwrap(),
            "Bar"
        );
        assert_eq!(table.resolve("EUSER.DLL", 2).unwrap(), "_euser_missing_2");
        assert_eq!(table.resolve("EUSER.DLL", 0).unwrap(), "_euser_missing_0");
    }

    #[test]
    fn resolve_falls_back_to_u_suffix_then_alias_then_prefix() {
        let mut table = OrdinalTable::new();
        table.parse_def_file("eikcoreu", "Foo @ 0\n");
        assert_eq!(table.resolve("EIKCORE.DLL", 0).unwrap(), "Foo");

        let mut table = OrdinalTable::new();
        table.parse_def_file("irobex", "Bar @ 0\n");
        assert_eq!(table.resolve("OBEX.DLL", 0).unwrap(), "Bar");

        let mut table = OrdinalTable::new();
        table.parse_def_file("euserhal", "Baz @ 0\n");
        assert_eq!(table.resolve("EUSER.DLL", 0).unwrap(), "Baz");
    }

    #[test]
    fn resolve_reports_unresolved_import() {
        let table = OrdinalTable::new();
        let err = table.resolve("UNKNOWN.DLL", 0).unwrap_err();
        assert!(matches!(err, Error::UnresolvedImport { .. }));
    }
}
