//! 同步原语
//!
//! - [`Scheduler`] - 宿主提供的任务挂起/恢复接口
//! - [`SleepLock`] - 基于调度器的可挂起互斥锁，保护缓存槽内容
//!
//! 结构锁（桶锁、空闲池锁）直接使用 `spin::Mutex`，见 [`crate::cache`]。

mod scheduler;
mod sleep_lock;

pub use scheduler::Scheduler;
pub use sleep_lock::{SleepLock, SleepLockGuard};

#[cfg(any(test, feature = "std"))]
pub use scheduler::{StdScheduler, StdTask};
