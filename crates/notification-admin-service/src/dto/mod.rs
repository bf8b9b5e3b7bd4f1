//! 数据传输对象

pub mod request;
pub mod response;

pub use request::{CreateEventMatchRequest, UpdateEventMatchRequest};
pub use response::{ApiResponse, EventMatchDto};
