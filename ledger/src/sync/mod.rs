//! Offline-first synchronization
//!
//! Local writes land in the store together with a queued mutation. The
//! engine replays the queue against the remote store whenever connectivity
//! allows, then refreshes the local mirror from the remote snapshot.

pub mod connectivity;
pub mod engine;
pub mod memory;
pub mod mutation;
pub mod queue;
pub mod remote;
pub mod rest;
pub mod rows;

pub use connectivity::ConnectivityMonitor;
pub use engine::{SyncEngine, SyncHandle, SyncReport, SyncState};
pub use memory::MemoryRemote;
pub use mutation::Mutation;
pub use queue::{MutationQueue, QueuedMutation};
pub use remote::{Filter, OnlineOnly, RemoteError, RemoteStore, RemoteTable};
pub use rest::RestRemote;
pub use rows::RemoteSnapshot;
