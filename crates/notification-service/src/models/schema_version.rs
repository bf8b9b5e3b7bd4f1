//! 数据库结构版本

use std::fmt;

use serde::{Deserialize, Serialize};

/// 结构版本号
///
/// 主版本相同视为兼容（可以安全运行），主次版本都相同视为一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SchemaVersion {
    pub major: i32,
    pub minor: i32,
}

impl SchemaVersion {
    /// 当前代码期望的结构版本
    pub const CURRENT: SchemaVersion = SchemaVersion { major: 1, minor: 0 };

    /// 数据库中没有版本记录时视为 0.0
    pub const ABSENT: SchemaVersion = SchemaVersion { major: 0, minor: 0 };

    pub const fn new(major: i32, minor: i32) -> Self {
        Self { major, minor }
    }

    pub fn is_safe_with(&self, expected: &SchemaVersion) -> bool {
        self.major == expected.major
    }

    pub fn is_equal_to(&self, expected: &SchemaVersion) -> bool {
        self == expected
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
