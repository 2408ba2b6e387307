//! bcache_core: 并发块缓冲区缓存
//!
//! 位于文件系统与块设备之间的块缓存，提供：
//! - **独占访问**：同一时刻只有一个调用者读写某个块的内存副本
//! - **请求合并**：对同一块的并发请求共享一个缓存槽
//! - **固定内存**：槽池大小在初始化时确定，之后循环复用
//! - **no_std**：只依赖 `alloc`，挂起/唤醒由宿主通过 [`Scheduler`] 提供
//!
//! # 示例
//!
//! ```rust,ignore
//! use bcache_core::{BlockCache, CacheConfig, MemDevice, StdScheduler, Result};
//!
//! fn main() -> Result<()> {
//!     let device = MemDevice::new(1024, 2000);
//!     let cache = BlockCache::new(device, StdScheduler, CacheConfig::default())?;
//!
//!     // 读取块
//!     let block = cache.fetch(1, 0);
//!     println!("First byte: {:02x}", block[0]);
//!     block.release();
//!
//!     Ok(())
//! }
//! ```
//!
//! # 模块结构
//!
//! - [`error`] - 错误类型定义
//! - [`consts`] - 默认尺寸常量
//! - [`block`] - 块设备抽象
//! - [`sync`] - 调度器接口与睡眠锁
//! - [`cache`] - 块缓存

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

extern crate alloc;

#[cfg(any(test, feature = "std"))]
extern crate std;

// ===== 核心模块 =====

/// 错误处理
pub mod error;

/// 常量定义
pub mod consts;

/// 块设备抽象
pub mod block;

/// 同步原语
pub mod sync;

/// 块缓存
pub mod cache;

// ===== 公共导出 =====

// 错误处理
pub use error::{Error, ErrorKind, Result};

// 块设备
pub use block::{BlockDevice, MemDevice};

// 同步
pub use sync::{Scheduler, SleepLock, SleepLockGuard};

#[cfg(any(test, feature = "std"))]
pub use sync::{StdScheduler, StdTask};

// Cache
pub use cache::{Block, BlockCache, CacheConfig, CacheStats, SlotFlags, SlotId, SlotInfo};
