//! A small Rust client for NASA's Common Metadata Repository (CMR) search API.
//!
//! Two pieces do the work:
//! - [`token`]: resolves a bearer token by trying providers in order
//!   (literal value, configuration, token file, password manager).
//! - [`Client::search`]: a lazy iterator over search results that follows
//!   CMR's paging cursor and stops at a caller-supplied limit.
//!
//! ## Quick start
//! - Pick a deployment with the `env` setting (`ops`, `uat`, `sit`), either in
//!   code, in a `.cmrrc` file, or through `CMR_ENV`.
//! - Put a token in `~/.cmr_token` (or `~/.cmr_token.uat`, ...) if the search
//!   needs one.
//!
//! ```no_run
//! use anyhow::Result;
//! use cmr::{Client, Concept, Config, concept_id};
//! use serde_json::json;
//!
//! fn main() -> Result<()> {
//!     let client = Client::new(Config::new().with("env", "uat"))?;
//!     let params = json!({
//!         "provider": "ORNL_DAAC",
//!         "polygon": "10,10,30,10,30,20,10,20,10,10"
//!     });
//!     for item in client.search(Concept::Granules, &params, 100)? {
//!         let item = item?;
//!         println!("{}", concept_id(&item).unwrap_or("?"));
//!     }
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]

mod client;
pub mod config;
mod error;
pub mod search;
pub mod token;
pub mod transport;
mod util;

pub use client::{Client, search};
pub use config::Config;
pub use search::{Concept, SearchResults, concept_id};
pub use token::{TokenProvider, bearer, token};
