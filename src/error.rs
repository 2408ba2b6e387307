//! 错误类型定义
//!
//! 提供块缓存配置与块设备操作的错误类型。
//!
//! 注意：缓存内部的致命错误（违反调用约定、空闲池耗尽、设备 I/O 失败）
//! 不通过 `Result` 返回，而是直接 panic，见 [`crate::cache`]。

use core::fmt;

/// 块缓存操作错误
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
    /// 块号超出设备范围
    OutOfRange,
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
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result 类型别名
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_error_accessors() {
        let err = Error::new(ErrorKind::OutOfRange, "block beyond device end");
        assert_eq!(err.kind(), ErrorKind::OutOfRange);
        assert_eq!(err.message(), "block beyond device end");
    }

    #[test]
    fn test_error_display() {
        let err = Error::new(ErrorKind::InvalidInput, "nbuf must be non-zero");
        assert_eq!(err.to_string(), "InvalidInput: nbuf must be non-zero");
    }
}
