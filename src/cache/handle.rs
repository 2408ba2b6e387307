//! 块句柄 - RAII 风格的块访问
//!
//! [`Block`] 由 [`BlockCache::fetch`] 返回，持有期间调用者独占该块的内容。
//! drop 时自动释放（等价于 [`BlockCache::release`]）。

use super::block_cache::BlockCache;
use super::buffer::SlotId;
use crate::block::BlockDevice;
use crate::sync::{Scheduler, SleepLockGuard};
use alloc::boxed::Box;
use byteorder::{ByteOrder, LittleEndian};
use core::ops::{Deref, DerefMut};

/// 块句柄
///
/// 解引用为块内容 `[u8]`。同一时刻一个槽只有一个 `Block`。
///
/// # 示例
///
/// ```rust,ignore
/// let mut block = cache.fetch(1, 12);
/// let addr = block.read_u32(4 * 3);
/// block.write_u32(4 * 3, addr + 1);
/// block.flush();
/// // block 超出作用域时自动释放
/// ```
pub struct Block<'a, D: BlockDevice, S: Scheduler> {
    cache: &'a BlockCache<D, S>,
    id: SlotId,
    /// 在 drop 中，或调用者未持有锁的 `flush` 中被取走
    content: Option<SleepLockGuard<'a, Box<[u8]>, S>>,
}

impl<'a, D: BlockDevice, S: Scheduler> Block<'a, D, S> {
    pub(super) fn new(
        cache: &'a BlockCache<D, S>,
        id: SlotId,
        content: SleepLockGuard<'a, Box<[u8]>, S>,
    ) -> Self {
        Self {
            cache,
            id,
            content: Some(content),
        }
    }

    /// 取走内容锁 guard，之后 drop 不再释放槽
    pub(super) fn take_content(&mut self) -> Option<SleepLockGuard<'a, Box<[u8]>, S>> {
        self.content.take()
    }

    /// 槽 ID，用于 [`BlockCache::pin`] / [`BlockCache::unpin`]
    pub fn slot(&self) -> SlotId {
        self.id
    }

    /// 设备号
    pub fn dev(&self) -> u32 {
        self.cache.slot_info(self.id).dev
    }

    /// 块号
    pub fn blockno(&self) -> u32 {
        self.cache.slot_info(self.id).blockno
    }

    /// 写回设备，见 [`BlockCache::flush`]
    pub fn flush(&mut self) {
        let cache = self.cache;
        cache.flush(self);
    }

    /// 释放，见 [`BlockCache::release`]
    pub fn release(self) {
        drop(self);
    }

    /// 读取偏移 `offset` 处的小端 u32
    ///
    /// # Panics
    ///
    /// `offset + 4` 超出块大小时 panic。
    pub fn read_u32(&self, offset: usize) -> u32 {
        LittleEndian::read_u32(&self[offset..offset + 4])
    }

    /// 在偏移 `offset` 处写入小端 u32
    ///
    /// # Panics
    ///
    /// `offset + 4` 超出块大小时 panic。
    pub fn write_u32(&mut self, offset: usize, value: u32) {
        LittleEndian::write_u32(&mut self[offset..offset + 4], value);
    }
}

impl<D: BlockDevice, S: Scheduler> Deref for Block<'_, D, S> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match &self.content {
            Some(data) => data,
            None => &[],
        }
    }
}

impl<D: BlockDevice, S: Scheduler> DerefMut for Block<'_, D, S> {
    fn deref_mut(&mut self) -> &mut [u8] {
        match &mut self.content {
            Some(data) => data,
            None => &mut [],
        }
    }
}

impl<D: BlockDevice, S: Scheduler> Drop for Block<'_, D, S> {
    fn drop(&mut self) {
        if let Some(content) = self.content.take() {
            self.cache.release_slot(self.id, content);
        }
    }
}

impl<D: BlockDevice, S: Scheduler> core::fmt::Debug for Block<'_, D, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let info = self.cache.slot_info(self.id);
        f.debug_struct("Block")
            .field("slot", &self.id)
            .field("dev", &info.dev)
            .field("blockno", &info.blockno)
            .field("refcnt", &info.refcnt)
            .field("flags", &info.flags)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::MemDevice;
    use crate::cache::CacheConfig;
    use crate::sync::StdScheduler;

    fn new_cache() -> BlockCache<MemDevice, StdScheduler> {
        let config = CacheConfig::default().with_nbuf(4).with_block_size(64);
        BlockCache::new(MemDevice::new(64, 16), StdScheduler, config).unwrap()
    }

    #[test]
    fn test_deref_len() {
        let cache = new_cache();
        let block = cache.fetch(1, 0);
        assert_eq!(block.len(), 64);
    }

    #[test]
    fn test_u32_access_is_little_endian() {
        let cache = new_cache();
        let mut block = cache.fetch(1, 0);
        block.write_u32(8, 0x1234_5678);
        assert_eq!(&block[8..12], &[0x78, 0x56, 0x34, 0x12]);
        assert_eq!(block.read_u32(8), 0x1234_5678);
    }

    #[test]
    #[should_panic]
    fn test_u32_out_of_bounds() {
        let cache = new_cache();
        let block = cache.fetch(1, 0);
        let _ = block.read_u32(62);
    }

    #[test]
    fn test_flush_via_handle() {
        let cache = new_cache();
        let mut block = cache.fetch(2, 3);
        block.write_u32(0, 7);
        block.flush();
        block.release();

        assert_eq!(cache.device().writes(), 1);
        assert_eq!(&cache.device().peek(2, 3)[..4], &[7, 0, 0, 0]);
    }

    #[test]
    fn test_drop_releases() {
        let cache = new_cache();
        {
            let _block = cache.fetch(1, 1);
            assert_eq!(cache.free_count(), 3);
        }
        assert_eq!(cache.free_count(), 4);
    }

    #[test]
    fn test_debug_format() {
        let cache = new_cache();
        let block = cache.fetch(1, 2);
        let text = alloc::format!("{:?}", block);
        assert!(text.contains("blockno: 2"));
        assert!(text.contains("refcnt: 1"));
    }
}
