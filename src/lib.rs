//! # airrecord - record mapping for Airtable-style bases
//!
//! A synchronous client for tabular REST data stores following the
//! Airtable model: one base containing named tables of schema-loose
//! records. Each table gets a typed handle supporting CRUD, declarative
//! inter-table associations, automatic pagination, and partial updates,
//! while respecting the service's request-rate quota.
//!
//! ## Features
//!
//! - Per-table handles with `find` / `all` / `create` / `find_many`
//! - Dirty-field tracking: saves PATCH only the fields you changed
//! - Pagination that follows offset cursors transparently
//! - `has_many` / `belongs_to` / `has_one` associations resolved lazily
//! - Client-side request pacing against the per-second quota
//! - Structured errors distinguishing API errors from transport failures
//!
//! ## Basic Usage
//!
//! ```no_run
//! use airrecord::{Config, Select, Table};
//!
//! fn main() -> airrecord::Result<()> {
//!     let config = Config::new("your_api_key");
//!
//!     let teas = Table::new(&config, "appXXXXXXXXXXXXXX", "Teas");
//!     let brews = Table::new(&config, "appXXXXXXXXXXXXXX", "Brews");
//!     teas.has_many("brews", &brews, "Brews");
//!     brews.belongs_to("tea", &teas, "Tea");
//!
//!     let mut records = teas.all(&Select::new().view("Master"))?;
//!     if let Some(tea) = records.first_mut() {
//!         println!("{:?} brews", tea.linked_records("brews")?.len());
//!
//!         tea.set("Name", "Dong Ding")?;
//!         tea.save()?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Associations
//!
//! The backing column of an association stores foreign ids in the inverse
//! of the order the service's UI displays, so accessors reverse it:
//!
//! ```no_run
//! # use airrecord::{Config, Table};
//! # fn main() -> airrecord::Result<()> {
//! # let config = Config::new("key");
//! # let teas = Table::new(&config, "app1", "Teas");
//! # let brews = Table::new(&config, "app1", "Brews");
//! # teas.has_many("brews", &brews, "Brews");
//! let tea = teas.find("rec1")?;
//! for brew in tea.linked_records("brews")? {
//!     println!("{:?}", brew.get("Name"));
//! }
//! # Ok(())
//! # }
//! ```

pub mod association;
pub mod client;
pub mod error;
pub mod query;
pub mod rate_limit;
pub mod record;
pub mod response;
pub mod table;

// Re-export main types for convenience
pub use association::{Association, AssociationKind, LinkRef};
pub use client::{Client, Config, HttpRequest, HttpResponse, Transport};
pub use error::{Error, Result};
pub use query::Params;
pub use rate_limit::RateLimiter;
pub use record::Record;
pub use table::{Direction, Select, Table};

// Re-export serde_json for convenience
pub use serde_json::json;
