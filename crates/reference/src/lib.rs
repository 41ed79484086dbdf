//! # Realm Reference
//!
//! Resolution of cross-document references in the content tree.
//!
//! ## Syntax
//!
//! ```text
//! @domain/path/category:item[filters]?.nested.property
//!  │      │    │        │    │       │  └─ project a value out of the item
//!  │      │    │        │    │       └─ optional: misses are not warnings
//!  │      │    │        │    └─ key, key=v, key!=v, key>n ... joined by & or ,
//!  │      │    │        └─ item name or slug, `*` for every item
//!  │      │    └─ category inside the catalog's `*_types` families
//!  │      └─ directories below the domain holding `catalog.json`
//!  └─ top-level content directory
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use realm_cache::{CacheConfig, ContentCache};
//! use realm_reference::ReferenceResolver;
//! use std::sync::Arc;
//!
//! let cache = Arc::new(ContentCache::new(CacheConfig::new("Data/Json")));
//! cache.load_all();
//!
//! let resolver = ReferenceResolver::new(cache);
//! let sword = resolver.resolve_to_object("@items/weapons/swords:*[tier>=2]");
//! let id = resolver.resolve("@abilities/offensive:fireball");
//! println!("{sword:?} {id:?}");
//! ```

mod catalog;
mod error;
mod filter;
mod parser;
mod resolver;
mod sampling;
mod validate;
mod value;

pub use catalog::{categories, collect_items, find_item, item_matches, item_names};
pub use error::{ReferenceError, Result};
pub use filter::{FilterClause, FilterExpr, FilterOp};
pub use parser::{is_valid_reference, parse_reference, ReferenceComponents, WILDCARD};
pub use resolver::ReferenceResolver;
pub use sampling::{rarity_weight, weighted_pick, RARITY_WEIGHT_KEY};
pub use validate::{find_references, ReferenceSite, Severity, ValidationIssue};
pub use value::{get_path, render};
