// Licensed under the Apache-2.0 license

//! Names and documentation attached to fields, registers and interrupts.
//!
//! Every documented object carries a `mnemonic` (uppercase, used in
//! diagrams and generated constants) and a `name` (identifier-style, used
//! everywhere else). Either can be derived from the other, so configs may
//! give just one. Names are unique case-insensitively within a namespace.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::MetadataConfig;
use crate::error::{Error, Result};
use crate::util;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub mnemonic: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brief: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

impl Metadata {
    /// Resolves a config record: derives the missing one of mnemonic/name,
    /// validates both, and collapses the brief to a single line.
    pub fn resolve(cfg: &MetadataConfig) -> Result<Metadata> {
        let (mnemonic, name) = match (&cfg.mnemonic, &cfg.name) {
            (Some(mnemonic), Some(name)) => (mnemonic.clone(), name.clone()),
            (Some(mnemonic), None) => (mnemonic.clone(), mnemonic.to_lowercase()),
            (None, Some(name)) => (name.to_uppercase(), name.clone()),
            (None, None) => {
                return Err(Error::config(
                    "at least one of `mnemonic` and `name` is required",
                ))
            }
        };
        if !util::is_valid_mnemonic(&mnemonic) {
            return Err(Error::config(format!(
                "mnemonic `{mnemonic}` must be uppercase letters, digits and underscores, \
                 starting with a letter"
            )));
        }
        if !util::is_valid_name(&name) {
            return Err(Error::config(format!(
                "name `{name}` must be letters, digits and underscores, starting with a letter"
            )));
        }
        Ok(Metadata {
            mnemonic,
            name,
            brief: cfg.brief.as_deref().map(util::collapse_whitespace),
            doc: cfg.doc.clone(),
        })
    }

    /// Like [`Metadata::resolve`], for descriptors repeated `repeat` times.
    /// Their mnemonic must not end in a digit, since the copies get index
    /// suffixes.
    pub fn resolve_repeated(cfg: &MetadataConfig, repeat: Option<u32>) -> Result<Metadata> {
        let meta = Metadata::resolve(cfg)?;
        if repeat.is_some() && meta.mnemonic.ends_with(|c: char| c.is_ascii_digit()) {
            return Err(Error::config(format!(
                "mnemonic `{}` of a repeated descriptor must not end in a digit",
                meta.mnemonic
            )));
        }
        Ok(meta)
    }

    /// The copy of this metadata for index `index` of a repeated
    /// descriptor.
    pub fn suffixed(&self, index: u32) -> Metadata {
        Metadata {
            mnemonic: format!("{}{}", self.mnemonic, index),
            name: format!("{}{}", self.name, index),
            brief: self.brief.clone(),
            doc: self.doc.clone(),
        }
    }

    /// One-line description, falling back to the name.
    pub fn brief(&self) -> String {
        match &self.brief {
            Some(brief) => brief.clone(),
            None => format!("{}.", self.name),
        }
    }
}

/// Case-insensitive name registry. Each entry remembers what owns the name
/// so collisions can name both parties.
#[derive(Default)]
pub struct Namespace {
    entries: BTreeMap<String, String>,
}

impl Namespace {
    pub fn new() -> Namespace {
        Namespace::default()
    }

    pub fn insert(&mut self, name: &str, owner: impl Into<String>) -> Result<()> {
        let owner = owner.into();
        let key = name.to_lowercase();
        if let Some(existing) = self.entries.get(&key) {
            return Err(Error::conflict(format!(
                "name `{name}` of {owner} collides with {existing} (names are case-insensitive)"
            )));
        }
        self.entries.insert(key, owner);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(mnemonic: Option<&str>, name: Option<&str>) -> MetadataConfig {
        MetadataConfig {
            mnemonic: mnemonic.map(String::from),
            name: name.map(String::from),
            brief: None,
            doc: None,
        }
    }

    #[test]
    fn test_derivation() {
        let meta = Metadata::resolve(&cfg(Some("CTRL"), None)).unwrap();
        assert_eq!(meta.name, "ctrl");
        let meta = Metadata::resolve(&cfg(None, Some("rx_data"))).unwrap();
        assert_eq!(meta.mnemonic, "RX_DATA");
        assert!(Metadata::resolve(&cfg(None, None)).is_err());
        assert!(Metadata::resolve(&cfg(Some("ctrl"), None)).is_err());
        assert!(Metadata::resolve(&cfg(None, Some("3com"))).is_err());
    }

    #[test]
    fn test_repeated_suffixes() {
        let err = Metadata::resolve_repeated(&cfg(Some("CTRL0"), None), Some(4)).unwrap_err();
        assert!(err.to_string().contains("must not end in a digit"), "{err}");
        let meta = Metadata::resolve_repeated(&cfg(Some("CTRL"), None), Some(4)).unwrap();
        let third = meta.suffixed(2);
        assert_eq!(third.mnemonic, "CTRL2");
        assert_eq!(third.name, "ctrl2");
    }

    #[test]
    fn test_brief_collapses() {
        let meta = Metadata::resolve(&MetadataConfig {
            mnemonic: None,
            name: Some("f".to_string()),
            brief: Some("controls  the\n thing".to_string()),
            doc: None,
        })
        .unwrap();
        assert_eq!(meta.brief(), "controls the thing");
    }

    #[test]
    fn test_namespace_case_insensitive() {
        let mut ns = Namespace::new();
        ns.insert("ctrl", "field `ctrl`").unwrap();
        let err = ns.insert("CTRL", "register `CTRL`").unwrap_err();
        assert_eq!(err.kind(), crate::error::Kind::Conflict);
        ns.insert("status", "field `status`").unwrap();
    }
}
