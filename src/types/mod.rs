//! Data types for the event feed
//!
//! Event records, the persisted store header and the view records
//! produced for rendering.

mod event;
mod meta;
mod view;

pub use event::{
    EventRecord, LinkSource, RawActor, RawComment, RawEvent, RawPayload, RawRepo, RawSubject,
    Subject, SubjectKind,
};
pub use meta::{StoreMeta, STORE_FORMAT, STORE_VERSION};
pub use view::{EventRow, EventView, RepoGroups};
