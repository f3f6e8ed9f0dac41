//! Kernel utilities shared by the Coffer binaries.
//! Keep this crate lightweight; it wires configuration and record persistence around the vault.
//!
//! ## Config loading
//! ```rust,no_run
//! use coffer_kernel::config::load_config;
//! use coffer_kernel::domain::config::CofferConfig;
//!
//! let cfg: CofferConfig = load_config(Some("coffer.toml")).unwrap();
//! println!("vault record at {}", cfg.store.path.display());
//! ```
//!
//! ## Record persistence
//! ```rust,no_run
//! use coffer_kernel::store::{FileStore, RecordStore};
//!
//! let store = FileStore::new("coffer.vault");
//! if store.exists() {
//!     let record = store.load().unwrap();
//!     println!("{} iterations", record.iterations());
//! }
//! ```
pub mod config;
pub mod store;

pub use coffer_domain as domain;
