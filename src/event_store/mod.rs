//! Event Store Module
//!
//! Per-user, deduplicated storage of event records:
//! - `EventStore`: in-memory records with load/save/evict/add
//! - `StoreFile`: versioned JSONL file with backup rotation
//!
//! # Layout
//!
//! ```text
//! <data_dir>/users/<user>/events.jsonl       {"format":"event-feed","version":1,...}
//!                                            {"id":"...","createdAt":"...",...}
//!                                            ...
//! <data_dir>/users/<user>/events.jsonl.bak   previous save
//! ```

mod snapshot;
mod store;

pub use snapshot::StoreFile;
pub use store::{latest_event_date, validate_user, EventStore, EventStoreConfig, DEFAULT_RETENTION_DAYS};
