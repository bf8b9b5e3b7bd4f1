//! 通知服务领域模型

pub mod event_log;
pub mod event_match;
pub mod schema_version;

pub use event_log::{EventLog, EventLogMatch, NewEventLogMatch};
pub use event_match::{
    BasicAuth, EventMatch, EventMatchChanges, HeaderAuth, NewEventMatch, RuleAuth,
};
pub use schema_version::SchemaVersion;
