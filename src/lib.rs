//! pfSense configuration synchronization over SSH.
//!
//! `pfsync` fetches, validates, and replaces the configuration of a
//! pfSense-style firewall appliance through an authenticated SSH session.
//!
//! # Architecture
//!
//! The pipeline is layered from generic to specific:
//!
//! - [`tree`] / [`markup`] — generic ordered XML element tree and its
//!   wire parsing/writing (quick-xml).
//! - [`schema`] — the typed [`schema::ConfigDocument`] model of the fixed
//!   appliance configuration shape.
//! - [`codec`] — strict two-stage projection between the element tree and
//!   the schema, including list-forcing for `user`/`group`/`staticmap`.
//! - [`validate`] — pure semantic checks (required fields, DHCP range
//!   ordering, subnet containment) returning structured violations.
//! - [`transport`] — the [`transport::Transport`]/[`transport::Session`]
//!   traits and their SSH implementation.
//! - [`sync`] — the orchestrator: fetch, push (backup → stage → replace →
//!   cache-invalidate → reload, no rollback) and local snapshot loading.
//! - [`settings`] — explicit TOML-backed connection and path settings.
//!
//! # Example
//!
//! ```ignore
//! use pfsync::settings::Settings;
//! use pfsync::sync::Synchronizer;
//! use pfsync::transport::SshTransport;
//! use pfsync::validate::validate;
//!
//! let settings = Settings::load("pfsync.toml".as_ref())?;
//! let sync = Synchronizer::new(SshTransport::new(settings.device), settings.paths);
//!
//! let mut doc = sync.fetch()?;
//! doc.system.hostname = "edge-fw".to_string();
//! assert!(validate(&doc).is_empty());
//! sync.push(&doc)?;
//! ```

pub mod codec;
pub mod markup;
pub mod schema;
pub mod settings;
pub mod sync;
pub mod transport;
pub mod tree;
pub mod validate;

pub use codec::{decode, encode, SchemaError};
pub use schema::ConfigDocument;
pub use sync::{load_from_file, PushStep, SyncError, Synchronizer};
pub use transport::{SshTransport, TransportError};
pub use validate::{validate, Violation};
