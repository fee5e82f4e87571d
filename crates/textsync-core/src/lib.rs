pub mod batch;
pub mod key;
pub mod reconcile;
pub mod record;

pub use batch::{BatchBuilder, merge_items};
pub use key::{
    HashCase, KEY_MARKER, KeyContext, KeyStrategy, contextual_key, derive_key, embedded_key,
    hashed_key, hashed_key_with, slugify,
};
pub use reconcile::{
    Decision, ItemAction, ItemOutcome, NewRecord, ReconcileError, Reconciler, RecordPatch,
    StoreFailure, TextStore, UNCATEGORIZED, decide,
};
pub use record::{
    GitHubTarget, ImportItem, IncomingText, Project, Sources, TextRecord, TextStatus,
    UnknownStatus,
};
