//! 哈希桶索引
//!
//! 固定数量的桶，按 `blockno % nbucket` 选择。每个桶是一条独立的链表，
//! 由自己的自旋锁保护，链表中是当前分配给该桶内块的槽。

use super::buffer::{Slot, SlotId};
use super::list::{Link, ListHead};
use crate::sync::Scheduler;
use alloc::vec::Vec;
use spin::{Mutex, MutexGuard};

/// 哈希桶索引
pub(crate) struct BucketIndex {
    buckets: Vec<Mutex<ListHead>>,
}

impl BucketIndex {
    pub(crate) fn new(nbucket: usize) -> Self {
        Self {
            buckets: (0..nbucket).map(|_| Mutex::new(ListHead::new())).collect(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.buckets.len()
    }

    pub(crate) fn hash(&self, blockno: u32) -> usize {
        blockno as usize % self.buckets.len()
    }

    /// 锁住 `blockno` 所属的桶
    pub(crate) fn lock(&self, blockno: u32) -> MutexGuard<'_, ListHead> {
        self.buckets[self.hash(blockno)].lock()
    }

    /// 在桶中查找 `(dev, blockno)`，命中时在桶锁内增加引用计数
    pub(crate) fn lookup<S: Scheduler>(
        &self,
        links: &[Link],
        slots: &[Slot<S>],
        dev: u32,
        blockno: u32,
    ) -> Option<SlotId> {
        let bucket = self.lock(blockno);
        let idx = bucket.iter(links).find(|&i| slots[i].matches(dev, blockno))?;
        slots[idx].get();
        Some(SlotId(idx))
    }

    /// 头插到 `blockno` 所属的桶
    pub(crate) fn insert(&self, links: &[Link], blockno: u32, id: SlotId) {
        self.lock(blockno).push_front(links, id.0);
    }

    /// 所有桶中的槽数（逐个加锁，结果只是近似快照）
    pub(crate) fn indexed(&self) -> usize {
        self.buckets.iter().map(|b| b.lock().len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::StdScheduler;

    fn setup(n: usize) -> (Vec<Link>, Vec<Slot<StdScheduler>>) {
        let links = (0..n).map(|_| Link::new()).collect();
        let slots = (0..n).map(|_| Slot::new(16)).collect();
        (links, slots)
    }

    #[test]
    fn test_hash_modulo() {
        let index = BucketIndex::new(13);
        assert_eq!(index.len(), 13);
        assert_eq!(index.hash(0), 0);
        assert_eq!(index.hash(13), 0);
        assert_eq!(index.hash(27), 1);
    }

    #[test]
    fn test_lookup_hit_increments_refcnt() {
        let (links, slots) = setup(2);
        let index = BucketIndex::new(13);

        slots[0].assign(1, 5);
        index.insert(&links, 5, SlotId(0));

        assert_eq!(index.lookup(&links, &slots, 1, 5), Some(SlotId(0)));
        assert_eq!(slots[0].refcnt(), 2);
    }

    #[test]
    fn test_lookup_miss() {
        let (links, slots) = setup(2);
        let index = BucketIndex::new(13);

        slots[0].assign(1, 5);
        index.insert(&links, 5, SlotId(0));

        // 同桶不同块
        assert_eq!(index.lookup(&links, &slots, 1, 18), None);
        // 同块不同设备
        assert_eq!(index.lookup(&links, &slots, 2, 5), None);
        assert_eq!(slots[0].refcnt(), 1);
    }

    #[test]
    fn test_shared_bucket() {
        let (links, slots) = setup(2);
        let index = BucketIndex::new(13);

        slots[0].assign(1, 5);
        index.insert(&links, 5, SlotId(0));
        slots[1].assign(1, 18);
        index.insert(&links, 18, SlotId(1));

        assert_eq!(index.lock(5).len(), 2);
        assert_eq!(index.indexed(), 2);
        assert_eq!(index.lookup(&links, &slots, 1, 5), Some(SlotId(0)));
        assert_eq!(index.lookup(&links, &slots, 1, 18), Some(SlotId(1)));
    }
}
