//! 接入服务共享状态

use std::sync::Arc;

use notification_shared::database::Database;

use crate::dispatch::{DispatchPipeline, DispatchQueue};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<DispatchPipeline>,
    pub queue: DispatchQueue,
    pub db: Database,
}

impl AppState {
    pub fn new(pipeline: Arc<DispatchPipeline>, queue: DispatchQueue, db: Database) -> Self {
        Self { pipeline, queue, db }
    }
}
