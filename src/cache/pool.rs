//! 空闲池
//!
//! 保存不在任何桶中的槽。取用与归还都在表头进行，因此最近释放的槽最先被复用
//! （LIFO），这不是 LRU 驱逐。

use super::buffer::{Slot, SlotId};
use super::list::{Link, ListHead};
use crate::sync::Scheduler;
use spin::Mutex;

/// 空闲池
pub(crate) struct RecyclePool {
    free: Mutex<ListHead>,
}

impl RecyclePool {
    pub(crate) fn new() -> Self {
        Self {
            free: Mutex::new(ListHead::new()),
        }
    }

    /// 从表头取出一个引用计数为 0 的槽
    pub(crate) fn take_any_free<S: Scheduler>(&self, links: &[Link], slots: &[Slot<S>]) -> Option<SlotId> {
        let mut free = self.free.lock();
        let idx = free.iter(links).find(|&i| slots[i].refcnt() == 0)?;
        free.remove(links, idx);
        Some(SlotId(idx))
    }

    /// 归还到表头
    pub(crate) fn give_back(&self, links: &[Link], id: SlotId) {
        self.free.lock().push_front(links, id.0);
    }

    pub(crate) fn len(&self) -> usize {
        self.free.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::StdScheduler;
    use alloc::vec::Vec;

    #[test]
    fn test_take_is_lifo() {
        let links: Vec<Link> = (0..3).map(|_| Link::new()).collect();
        let slots: Vec<Slot<StdScheduler>> = (0..3).map(|_| Slot::new(16)).collect();
        let pool = RecyclePool::new();
        for i in 0..3 {
            pool.give_back(&links, SlotId(i));
        }
        assert_eq!(pool.len(), 3);

        assert_eq!(pool.take_any_free(&links, &slots), Some(SlotId(2)));
        assert_eq!(pool.take_any_free(&links, &slots), Some(SlotId(1)));

        pool.give_back(&links, SlotId(2));
        assert_eq!(pool.take_any_free(&links, &slots), Some(SlotId(2)));
        assert_eq!(pool.take_any_free(&links, &slots), Some(SlotId(0)));
        assert_eq!(pool.take_any_free(&links, &slots), None);
    }

    #[test]
    fn test_skips_referenced_slot() {
        let links: Vec<Link> = (0..2).map(|_| Link::new()).collect();
        let slots: Vec<Slot<StdScheduler>> = (0..2).map(|_| Slot::new(16)).collect();
        let pool = RecyclePool::new();
        pool.give_back(&links, SlotId(0));
        pool.give_back(&links, SlotId(1));

        slots[1].get();
        assert_eq!(pool.take_any_free(&links, &slots), Some(SlotId(0)));
        assert_eq!(pool.take_any_free(&links, &slots), None);
        assert_eq!(pool.len(), 1);
    }
}
