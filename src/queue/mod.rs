//! Provider-side patient queue.
//!
//! - `client`: HTTP access to the triage service (listing + per-case status)
//! - `mapping`: listing entries and local captures → [`PatientCase`]
//! - `reconcile`: pure load/merge/sort rules
//! - `synchronizer`: the polling worker that owns the live case set
//!
//! [`PatientCase`]: crate::models::PatientCase

pub mod client;
pub mod mapping;
pub mod reconcile;
pub mod synchronizer;

pub use client::{ApiError, HttpTriageApi, QueueFetch, RemoteQueueItem, StatusCheck, StatusData, TriageApi};
pub use reconcile::{FallbackReason, QueueLoad, QueueSource};
pub use synchronizer::{QueueSnapshot, QueueSynchronizer, SyncHandle};
