//! Outbound sync: locale JSON serialization of reviewed records and
//! GitHub contents-API pushes with SHA preconditions.

pub mod export;
pub use export::{ExportGate, LangRole, LocaleFile, locale_files, locale_map, suffixed_file};

#[cfg(feature = "github")]
pub mod github;
#[cfg(feature = "github")]
pub use github::{GitHubClient, RemoteFile, SyncError};
