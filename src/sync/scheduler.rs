//! 调度器接口
//!
//! 睡眠锁需要挂起和恢复调用线程，这依赖宿主提供的调度器。

/// 调度器 trait
///
/// `park`/`unpark` 必须采用令牌语义：对某个任务先调用 `unpark` 再由该任务
/// 调用 `park` 时，`park` 立即返回。`park` 允许虚假唤醒，调用者需循环检查条件。
pub trait Scheduler: Send + Sync {
    /// 任务标识，用于记录锁的持有者和等待者
    type Task: Clone + Eq + Send;

    /// 当前任务
    fn current(&self) -> Self::Task;

    /// 挂起当前任务，直到被 `unpark` 或虚假唤醒
    fn park(&self);

    /// 唤醒指定任务
    fn unpark(&self, task: &Self::Task);
}

#[cfg(any(test, feature = "std"))]
mod std_scheduler {
    use super::Scheduler;
    use std::thread::{self, Thread};

    /// 基于 std 线程的调度器
    #[derive(Debug, Default, Clone, Copy)]
    pub struct StdScheduler;

    /// std 线程句柄，按 `ThreadId` 比较
    #[derive(Debug, Clone)]
    pub struct StdTask(Thread);

    impl PartialEq for StdTask {
        fn eq(&self, other: &Self) -> bool {
            self.0.id() == other.0.id()
        }
    }

    impl Eq for StdTask {}

    impl From<Thread> for StdTask {
        fn from(thread: Thread) -> Self {
            Self(thread)
        }
    }

    impl Scheduler for StdScheduler {
        type Task = StdTask;

        fn current(&self) -> StdTask {
            StdTask(thread::current())
        }

        fn park(&self) {
            thread::park();
        }

        fn unpark(&self, task: &StdTask) {
            task.0.unpark();
        }
    }
}

#[cfg(any(test, feature = "std"))]
pub use std_scheduler::{StdScheduler, StdTask};
