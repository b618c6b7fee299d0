//! Personal book-catalog core with XML persistence and remote-share
//! synchronization.
//!
//! # Examples
//!
//! In-memory usage with [`core::store::Bookcase`]:
//! ```
//! use bookcase::{book::BookDraft, core::store::Bookcase};
//!
//! let mut store = Bookcase::new();
//! let uid = store.insert(BookDraft {
//!     title: "The Cyberiad".to_string(),
//!     author: "Stanislaw Lem".to_string(),
//!     publisher: "Wydawnictwo Literackie".to_string(),
//!     year: "1965".to_string(),
//!     cover: String::new(),
//! });
//! assert_eq!(store.get(uid).map(|b| b.revision), Some(0));
//! ```
//!
//! Runtime usage with the XML catalog file and a mounted remote share:
//! ```no_run
//! use bookcase::{
//!     config::AppConfig,
//!     core::store::Bookcase,
//!     persist::xml::XmlCatalogFile,
//!     runtime::handle::{spawn_bookcase, RuntimeConfig},
//!     sync::transport::{MountedShare, RemoteShare},
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let config = AppConfig::load("config.json").expect("config");
//! let mut file = XmlCatalogFile::new("books.xml");
//! let store = Bookcase::from_records(file.load_or_empty());
//!
//! // An empty sync location leaves the remote unset, which disables sync.
//! let remote = config
//!     .sync
//!     .is_active()
//!     .then(|| Box::new(MountedShare::new(&config.sync.location)) as Box<dyn RemoteShare>);
//! let handle = spawn_bookcase(
//!     store,
//!     Some(Box::new(file)),
//!     remote,
//!     RuntimeConfig {
//!         sort_method: config.sort_method,
//!         ..RuntimeConfig::default()
//!     },
//! );
//! let _visible = handle.search("lem").await.expect("search");
//! handle.sync().await.expect("sync");
//! handle.shutdown().await.expect("shutdown");
//! # }
//! ```
#![deny(missing_docs)]

/// Book record, draft, patch, and comparators.
pub mod book;
/// Explicit application configuration.
pub mod config;
/// In-memory authoritative catalog and merge engine.
pub mod core;
/// Storage abstraction and XML catalog implementation.
pub mod persist;
/// Single-writer runtime handle and events.
pub mod runtime;
/// Remote-share synchronization.
pub mod sync;
/// Shared identifiers and enums.
pub mod types;
/// Presentation-facing filter/sort adapter.
pub mod view;
