//! 睡眠锁
//!
//! 长时间持有的互斥锁：争用时挂起调用者而不是自旋。持有者在临界区内可以
//! 执行设备 I/O。内部状态由一把短时自旋锁保护，该自旋锁绝不跨越挂起点持有。

use super::Scheduler;
use alloc::collections::VecDeque;
use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use spin::Mutex;

struct LockState<K> {
    holder: Option<K>,
    waiters: VecDeque<K>,
}

/// 睡眠锁
///
/// 记录持有者，以便检查"调用者是否持有此锁"；等待者按 FIFO 顺序被唤醒。
pub struct SleepLock<T, S: Scheduler> {
    state: Mutex<LockState<S::Task>>,
    name: &'static str,
    data: UnsafeCell<T>,
}

// SAFETY: 对 `data` 的访问只通过 `SleepLockGuard` 进行，而 guard 的存在
// 意味着 `state.holder` 已被设置，同一时刻至多一个 guard。
unsafe impl<T: Send, S: Scheduler> Sync for SleepLock<T, S> {}

impl<T, S: Scheduler> SleepLock<T, S> {
    /// 创建睡眠锁
    pub fn new(data: T, name: &'static str) -> Self {
        Self {
            state: Mutex::new(LockState {
                holder: None,
                waiters: VecDeque::new(),
            }),
            name,
            data: UnsafeCell::new(data),
        }
    }

    /// 锁名称
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 获取锁，必要时挂起当前任务
    pub fn lock<'a>(&'a self, sched: &'a S) -> SleepLockGuard<'a, T, S> {
        let me = sched.current();
        loop {
            let mut state = self.state.lock();
            if state.holder.is_none() {
                // 持有者不能留在等待队列中（虚假唤醒后可能仍在队列里）
                if let Some(pos) = state.waiters.iter().position(|t| *t == me) {
                    state.waiters.remove(pos);
                }
                state.holder = Some(me);
                break;
            }
            if !state.waiters.contains(&me) {
                state.waiters.push_back(me.clone());
            }
            drop(state);
            sched.park();
        }
        SleepLockGuard { lock: self, sched }
    }

    /// 尝试获取锁，不挂起
    pub fn try_lock<'a>(&'a self, sched: &'a S) -> Option<SleepLockGuard<'a, T, S>> {
        let mut state = self.state.lock();
        if state.holder.is_some() {
            return None;
        }
        state.holder = Some(sched.current());
        Some(SleepLockGuard { lock: self, sched })
    }

    /// 当前任务是否持有此锁
    pub fn holding(&self, sched: &S) -> bool {
        let me = sched.current();
        self.state.lock().holder.as_ref() == Some(&me)
    }

    /// 是否被任何任务持有
    pub fn is_locked(&self) -> bool {
        self.state.lock().holder.is_some()
    }

    fn unlock(&self, sched: &S) {
        let mut state = self.state.lock();
        state.holder = None;
        let next = state.waiters.pop_front();
        drop(state);
        if let Some(task) = next {
            sched.unpark(&task);
        }
    }
}

/// 睡眠锁 RAII guard，drop 时释放锁并唤醒一个等待者
pub struct SleepLockGuard<'a, T, S: Scheduler> {
    lock: &'a SleepLock<T, S>,
    sched: &'a S,
}

impl<T, S: Scheduler> Deref for SleepLockGuard<'_, T, S> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: guard 存在期间当前任务独占 data
        unsafe { &*self.lock.data.get() }
    }
}

impl<T, S: Scheduler> DerefMut for SleepLockGuard<'_, T, S> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: 同上
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T, S: Scheduler> Drop for SleepLockGuard<'_, T, S> {
    fn drop(&mut self) {
        self.lock.unlock(self.sched);
    }
}

impl<T, S: Scheduler> core::fmt::Debug for SleepLock<T, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("SleepLock")
            .field("name", &self.name)
            .field("locked", &state.holder.is_some())
            .field("waiters", &state.waiters.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::StdScheduler;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;
    use std::vec::Vec;

    #[test]
    fn test_lock_and_holding() {
        let sched = StdScheduler;
        let lock: SleepLock<u32, StdScheduler> = SleepLock::new(5, "test");
        assert_eq!(lock.name(), "test");
        assert!(!lock.is_locked());
        assert!(!lock.holding(&sched));

        {
            let mut guard = lock.lock(&sched);
            *guard += 1;
            assert!(lock.is_locked());
            assert!(lock.holding(&sched));
        }

        assert!(!lock.is_locked());
        assert_eq!(*lock.lock(&sched), 6);
    }

    #[test]
    fn test_try_lock_contended() {
        let sched = StdScheduler;
        let lock: SleepLock<(), StdScheduler> = SleepLock::new((), "test");
        let guard = lock.try_lock(&sched);
        assert!(guard.is_some());
        assert!(lock.try_lock(&sched).is_none());
        drop(guard);
        assert!(lock.try_lock(&sched).is_some());
    }

    #[test]
    fn test_not_holding_from_other_thread() {
        let lock: Arc<SleepLock<(), StdScheduler>> = Arc::new(SleepLock::new((), "test"));
        let _guard = lock.lock(&StdScheduler);

        let other = lock.clone();
        let held_elsewhere = thread::spawn(move || other.holding(&StdScheduler))
            .join()
            .unwrap();
        assert!(!held_elsewhere);
        assert!(lock.holding(&StdScheduler));
    }

    #[test]
    fn test_waiter_blocks_until_release() {
        let lock: Arc<SleepLock<Vec<u32>, StdScheduler>> = Arc::new(SleepLock::new(Vec::new(), "test"));
        let guard = lock.lock(&StdScheduler);

        let waiter = {
            let lock = lock.clone();
            thread::spawn(move || {
                lock.lock(&StdScheduler).push(2);
            })
        };

        // 持有期间等待者不能进入临界区
        thread::sleep(Duration::from_millis(20));
        let mut guard = guard;
        guard.push(1);
        drop(guard);

        waiter.join().unwrap();
        assert_eq!(*lock.lock(&StdScheduler), [1, 2]);
    }

    #[test]
    fn test_mutual_exclusion() {
        let lock: Arc<SleepLock<u64, StdScheduler>> = Arc::new(SleepLock::new(0, "counter"));
        let inside = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let lock = lock.clone();
                let inside = inside.clone();
                thread::spawn(move || {
                    for _ in 0..200 {
                        let mut guard = lock.lock(&StdScheduler);
                        assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                        *guard += 1;
                        inside.fetch_sub(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(*lock.lock(&StdScheduler), 1600);
    }
}
