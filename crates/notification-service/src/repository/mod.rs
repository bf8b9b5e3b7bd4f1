//! 数据库仓储层
//!
//! - 仓储只负责数据持久化，不包含分发逻辑
//! - 定义 trait 接口，分发流水线和管理接口都依赖抽象
//! - 内存实现用于测试和无数据库的本地调试

mod event_log_repo;
mod event_match_repo;
mod memory;
mod schema_repo;
mod traits;

pub use event_log_repo::EventLogRepository;
pub use event_match_repo::EventMatchRepository;
pub use memory::{InMemoryEventLogRepository, InMemoryEventMatchRepository};
pub use schema_repo::SchemaVersionRepository;
pub use traits::*;
