//! Stateful core of blockpress.
//!
//! ```text
//! EditorSession
//!   ├── ImageStager ──► ImageStore      (Memory / Local)
//!   ├── PollEngine  ──► PollStore       (Memory / Sqlite)
//!   └── DocumentStore                   (Memory / Sqlite)
//! ```
//!
//! The block model lives in `blockpress-types` and rendering in
//! `blockpress-render`; this crate holds everything with state or I/O.

pub mod config;
pub mod documents;
pub mod images;
pub mod polls;
pub mod session;
pub mod staging;

pub use config::{BlockpressConfig, ConfigError, StagingConfig};
pub use documents::{
    DocumentStore, DocumentStoreError, MemoryDocumentStore, SqliteDocumentStore,
};
pub use images::{ImageMime, ImageStore, ImageStoreError, LocalImageStore, MemoryImageStore};
pub use polls::{MemoryPollStore, PollEngine, PollError, PollStore, SqlitePollStore};
pub use session::{EditorSession, PollSync, SaveReport, SessionError};
pub use staging::{
    ImageFile, ImageStager, PendingImage, StagingError, UploadFailure, contains_ephemeral,
};

pub use blockpress_types::ErrorKind;
