use crate::error::{ReferenceError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Item name that selects every item in a category.
pub const WILDCARD: &str = "*";

const REFERENCE_PATTERN: &str = r"^@(?P<domain>[A-Za-z0-9_-]+)/(?P<path>[A-Za-z0-9_-]+(?:/[A-Za-z0-9_-]+)*):(?P<item>[A-Za-z0-9_*\s-]+)(?:\[(?P<filters>[^\]]+)\])?(?P<optional>\?)?(?P<property>(?:\.[A-Za-z0-9_]+)+)?$";

fn reference_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(REFERENCE_PATTERN).expect("valid regex"))
}

/// A parsed `@domain/path/category:item[filters]?.property` reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceComponents {
    pub domain: String,
    /// Directories between the domain and the category; empty when the
    /// category follows the domain directly.
    pub path: String,
    pub category: String,
    pub item_name: String,
    /// Raw filter body without the brackets.
    pub filters: Option<String>,
    pub is_optional: bool,
    /// Dotted property path without the leading dot.
    pub property: Option<String>,
}

impl ReferenceComponents {
    pub fn is_wildcard(&self) -> bool {
        self.item_name == WILDCARD
    }

    /// Relative path of the catalog document this reference points into.
    pub fn catalog_path(&self) -> String {
        if self.path.is_empty() {
            format!("{}/catalog.json", self.domain)
        } else {
            format!("{}/{}/catalog.json", self.domain, self.path)
        }
    }

    /// Compact `category:item` (or `path/category:item`) identifier.
    pub fn resolved_id(&self) -> String {
        if self.path.is_empty() {
            format!("{}:{}", self.category, self.item_name)
        } else {
            format!("{}/{}:{}", self.path, self.category, self.item_name)
        }
    }
}

impl fmt::Display for ReferenceComponents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}/", self.domain)?;
        if !self.path.is_empty() {
            write!(f, "{}/", self.path)?;
        }
        write!(f, "{}:{}", self.category, self.item_name)?;
        if let Some(filters) = &self.filters {
            write!(f, "[{filters}]")?;
        }
        if self.is_optional {
            f.write_str("?")?;
        }
        if let Some(property) = &self.property {
            write!(f, ".{property}")?;
        }
        Ok(())
    }
}

/// Parse a reference string. Anything that does not match the grammar in
/// full is a [`ReferenceError::Syntax`].
pub fn parse_reference(reference: &str) -> Result<ReferenceComponents> {
    let syntax = || ReferenceError::Syntax(reference.to_string());
    let caps = reference_regex().captures(reference).ok_or_else(syntax)?;

    let full_path = caps.name("path").map_or("", |m| m.as_str());
    let (path, category) = match full_path.rsplit_once('/') {
        Some((path, category)) => (path.to_string(), category.to_string()),
        None => (String::new(), full_path.to_string()),
    };

    let item_name = caps.name("item").map_or("", |m| m.as_str()).trim();
    if item_name.is_empty() {
        return Err(syntax());
    }

    Ok(ReferenceComponents {
        domain: caps.name("domain").map_or("", |m| m.as_str()).to_string(),
        path,
        category,
        item_name: item_name.to_string(),
        filters: caps.name("filters").map(|m| m.as_str().to_string()),
        is_optional: caps.name("optional").is_some(),
        property: caps
            .name("property")
            .map(|m| m.as_str().trim_start_matches('.').to_string()),
    })
}

pub fn is_valid_reference(reference: &str) -> bool {
    parse_reference(reference).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_every_component() {
        let parsed =
            parse_reference("@items/weapons/swords:iron-sword[tier=2]?.stats.damage").unwrap();
        assert_eq!(
            parsed,
            ReferenceComponents {
                domain: "items".into(),
                path: "weapons".into(),
                category: "swords".into(),
                item_name: "iron-sword".into(),
                filters: Some("tier=2".into()),
                is_optional: true,
                property: Some("stats.damage".into()),
            }
        );
        assert_eq!(parsed.catalog_path(), "items/weapons/catalog.json");
        assert_eq!(parsed.resolved_id(), "weapons/swords:iron-sword");
    }

    #[test]
    fn single_segment_path_is_the_category() {
        let parsed = parse_reference("@abilities/offensive:fireball").unwrap();
        assert_eq!(parsed.path, "");
        assert_eq!(parsed.category, "offensive");
        assert_eq!(parsed.catalog_path(), "abilities/catalog.json");
        assert_eq!(parsed.resolved_id(), "offensive:fireball");
        assert!(!parsed.is_wildcard());
        assert!(!parsed.is_optional);
    }

    #[test]
    fn wildcard_with_filters() {
        let parsed = parse_reference("@materials/metals:*[rarityWeight=10]").unwrap();
        assert!(parsed.is_wildcard());
        assert_eq!(parsed.filters.as_deref(), Some("rarityWeight=10"));
    }

    #[test]
    fn item_names_may_contain_spaces() {
        let parsed = parse_reference("@npcs/occupations:town guard?.description").unwrap();
        assert_eq!(parsed.item_name, "town guard");
        assert_eq!(parsed.property.as_deref(), Some("description"));
    }

    #[test]
    fn rejects_malformed_references() {
        for bad in [
            "",
            "abilities/offensive:fireball",
            "@abilities:fireball",
            "@abilities/offensive",
            "@abilities/offensive:",
            "@abilities/offensive:   ",
            "@abilities/offensive:fire.ball!",
            "@abilities/offensive:fireball[]",
            "@abilities/offensive:fireball.",
            "@abilities//offensive:fireball",
        ] {
            assert!(
                matches!(parse_reference(bad), Err(ReferenceError::Syntax(_))),
                "{bad:?} should not parse"
            );
        }
    }

    #[test]
    fn display_renders_canonical_form() {
        for reference in [
            "@abilities/offensive:fireball",
            "@items/weapons/swords:*[tier=2&magic]?.stats.damage",
            "@npcs/occupations:merchant?",
        ] {
            assert_eq!(parse_reference(reference).unwrap().to_string(), reference);
        }
        assert!(is_valid_reference("@a/b:c"));
        assert!(!is_valid_reference("@a/b"));
    }
}
