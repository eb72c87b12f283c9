//! 错误类型定义
//!
//! 提供 bud 日志操作的错误类型。

use core::fmt;

/// bud 日志操作错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    message: &'static str,
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// I/O 错误
    Io,
    /// 无效参数
    InvalidInput,
    /// 日志损坏（重复的 bud LEB、bud_bytes 偏差、head 链表不一致）
    ///
    /// 调用者必须视为不可恢复：停止挂载或转为只读。
    Corrupted,
    /// 不存在
    NotFound,
    /// 内存不足
    NoMemory,
    /// 只读
    ReadOnly,
    /// 无效状态
    InvalidState,
}

impl Error {
    /// 创建新错误
    pub const fn new(kind: ErrorKind, message: &'static str) -> Self {
        Self { kind, message }
    }

    /// 获取错误类型
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// 获取错误消息
    pub const fn message(&self) -> &'static str {
        self.message
    }

    /// 是否为日志损坏（不可恢复）
    pub const fn is_corruption(&self) -> bool {
        matches!(self.kind, ErrorKind::Corrupted)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

impl From<alloc::collections::TryReserveError> for Error {
    fn from(_: alloc::collections::TryReserveError) -> Self {
        Error::new(ErrorKind::NoMemory, "Cannot allocate bud descriptor")
    }
}

/// Result 类型别名
pub type Result<T> = core::result::Result<T, Error>;
