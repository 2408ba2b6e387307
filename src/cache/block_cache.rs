//! 块缓存实现
//!
//! # 结构
//!
//! ```text
//! struct BlockCache {
//!     slots: Box<[Slot]>,     // 固定数量的缓存槽，初始化后不增不减
//!     links: Box<[Link]>,     // 每个槽的 prev/next，下标与 slots 对应
//!     index: BucketIndex,     // blockno % nbucket -> 桶链表（各自一把自旋锁）
//!     pool: RecyclePool,      // 空闲池链表（一把自旋锁），LIFO
//! }
//! ```
//!
//! # 锁的层次
//!
//! - **结构锁**（桶锁、空闲池锁）：只保护链表形状和引用计数，临界区极短，
//!   任何时刻至多持有其中一把，持有期间不做设备 I/O，也不等待内容锁
//! - **内容锁**（每槽一把睡眠锁）：保护块数据和 `VALID` 标志，可能长时间挂起，
//!   只在所有结构锁释放后获取
//!
//! # 索引语义
//!
//! 槽在索引中 ⇔ 引用计数非零。最后一次 `release` 把槽移回空闲池后，
//! 即便数据仍完好，下一次 `fetch` 同一块也会重新从设备读取。
//!
//! 两个线程同时未命中同一块时可能各自占用一个槽（查找与插入之间释放了桶锁），
//! 两个槽都从设备独立加载，内容各自正确，只是暂时存在重复副本。

use super::buffer::{Slot, SlotFlags, SlotId, SlotInfo};
use super::bucket::BucketIndex;
use super::config::CacheConfig;
use super::handle::Block;
use super::list::Link;
use super::pool::RecyclePool;
use crate::block::BlockDevice;
use crate::error::{Error, ErrorKind, Result};
use crate::sync::{Scheduler, SleepLockGuard};
use alloc::boxed::Box;
use core::sync::atomic::{AtomicU64, Ordering};

/// 缓存统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// 索引命中次数
    pub hits: u64,
    /// 索引未命中次数（从空闲池取槽）
    pub misses: u64,
    /// 设备读取次数
    pub device_reads: u64,
    /// 设备写入次数
    pub device_writes: u64,
    /// 槽归还空闲池的次数
    pub recycled: u64,
}

impl CacheStats {
    /// 计算命中率
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Default)]
struct StatCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    device_reads: AtomicU64,
    device_writes: AtomicU64,
    recycled: AtomicU64,
}

impl StatCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            device_reads: self.device_reads.load(Ordering::Relaxed),
            device_writes: self.device_writes.load(Ordering::Relaxed),
            recycled: self.recycled.load(Ordering::Relaxed),
        }
    }
}

/// 块缓存
///
/// 位于文件系统与块设备之间，为调用者提供对块内存副本的独占访问。
/// 实例在 [`new`](Self::new) 中一次性构建，之后通过共享引用（如 `Arc`）在线程间使用。
///
/// # 致命错误
///
/// 以下情况直接 panic，因为继续运行会使缓存状态不一致：
/// - 空闲池耗尽（所有槽都被引用）
/// - 设备传输失败
/// - 调用者未持有内容锁就 `flush`/`release`，或引用计数下溢
///
/// # 示例
///
/// ```rust,ignore
/// use bcache_core::{BlockCache, CacheConfig, MemDevice, StdScheduler};
///
/// let cache = BlockCache::new(MemDevice::new(1024, 1000), StdScheduler, CacheConfig::default())?;
///
/// let mut block = cache.fetch(1, 33);
/// block[0] = 0x42;
/// block.flush();
/// block.release();
/// ```
pub struct BlockCache<D: BlockDevice, S: Scheduler> {
    device: D,
    scheduler: S,
    slots: Box<[Slot<S>]>,
    links: Box<[Link]>,
    index: BucketIndex,
    pool: RecyclePool,
    block_size: usize,
    stats: StatCounters,
}

impl<D: BlockDevice, S: Scheduler> BlockCache<D, S> {
    /// 创建块缓存
    ///
    /// 构建所有锁、空桶和空闲池，并把全部 `config.nbuf` 个槽放入空闲池。
    ///
    /// # 错误
    ///
    /// - 配置非法（见 [`CacheConfig::validate`]）
    /// - `config.block_size` 与设备块大小不一致
    pub fn new(device: D, scheduler: S, config: CacheConfig) -> Result<Self> {
        config.validate()?;
        if device.block_size() != config.block_size {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "Cache block size differs from device block size",
            ));
        }

        let slots: Box<[Slot<S>]> = (0..config.nbuf).map(|_| Slot::new(config.block_size)).collect();
        let links: Box<[Link]> = (0..config.nbuf).map(|_| Link::new()).collect();
        let pool = RecyclePool::new();
        for i in 0..config.nbuf {
            pool.give_back(&links, SlotId(i));
        }

        log::info!(
            "[BCACHE] init: {} slots, {} buckets, block size {}",
            config.nbuf,
            config.nbucket,
            config.block_size
        );

        Ok(Self {
            device,
            scheduler,
            slots,
            links,
            index: BucketIndex::new(config.nbucket),
            pool,
            block_size: config.block_size,
            stats: StatCounters::default(),
        })
    }

    /// 获取块并持有其内容锁
    ///
    /// 命中时共享已缓存的槽；未命中时从空闲池取槽。获取内容锁可能挂起当前任务。
    /// 内容无效时从设备读取。返回的 [`Block`] 在 drop 或 [`release`](Self::release) 时释放。
    pub fn fetch(&self, dev: u32, blockno: u32) -> Block<'_, D, S> {
        let id = self.lookup_or_reserve(dev, blockno);
        self.acquire(id)
    }

    /// 把块内容写回设备，不释放内容锁
    pub fn flush(&self, block: &mut Block<'_, D, S>) {
        let id = block.slot();
        if !self.holding(id) {
            // 句柄作废，unwind 时的 drop 不再走 release
            drop(block.take_content());
            self.not_held("flush", id);
        }
        self.device_rw(id, block, true);
    }

    /// 释放块
    ///
    /// 放开内容锁并减少引用计数；计数归零时槽离开索引、回到空闲池。
    pub fn release(&self, block: Block<'_, D, S>) {
        drop(block);
    }

    /// 增加引用计数，不需要持有内容锁
    ///
    /// 被 pin 的槽不会回到空闲池。调用者须保证 `id` 当前在索引中（引用计数非零）。
    pub fn pin(&self, id: SlotId) {
        let slot = &self.slots[id.0];
        let _bucket = self.index.lock(slot.blockno());
        let n = slot.get();
        log::trace!("[BCACHE] pin slot {} -> refcnt={}", id, n);
    }

    /// 减少引用计数，不需要持有内容锁
    ///
    /// 计数降到 0 也不会把槽放回空闲池，只有 `release` 会这样做；
    /// 这样的槽留在索引中，下一次 `fetch` 仍可命中。
    pub fn unpin(&self, id: SlotId) {
        let slot = &self.slots[id.0];
        let bucket = self.index.lock(slot.blockno());
        match slot.put() {
            Some(n) => log::trace!("[BCACHE] unpin slot {} -> refcnt={}", id, n),
            None => {
                drop(bucket);
                log::error!("[BCACHE] unpin: refcnt underflow on slot {}", id);
                panic!("unpin: reference count underflow on slot {}", id);
            }
        }
    }

    /// 缓存槽总数
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// 空闲池中的槽数
    pub fn free_count(&self) -> usize {
        self.pool.len()
    }

    /// 索引中的槽数（近似快照）
    pub fn indexed_count(&self) -> usize {
        self.index.indexed()
    }

    /// 块大小（字节）
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// 底层设备
    pub fn device(&self) -> &D {
        &self.device
    }

    /// 获取缓存统计信息
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    /// 槽状态快照（不加锁，各字段之间可能不一致）
    pub fn slot_info(&self, id: SlotId) -> SlotInfo {
        let slot = &self.slots[id.0];
        SlotInfo {
            id,
            dev: slot.dev(),
            blockno: slot.blockno(),
            refcnt: slot.refcnt(),
            flags: slot.flags(),
        }
    }

    /// 查找或预留槽
    ///
    /// 命中时增加引用计数；未命中时从空闲池取槽、重新标识后插入桶。
    /// 返回时不持有任何锁。
    fn lookup_or_reserve(&self, dev: u32, blockno: u32) -> SlotId {
        if let Some(id) = self.index.lookup(&self.links, &self.slots, dev, blockno) {
            StatCounters::bump(&self.stats.hits);
            log::trace!("[BCACHE] dev={} block={} HIT slot {}", dev, blockno, id);
            return id;
        }
        StatCounters::bump(&self.stats.misses);
        self.reserve(dev, blockno)
    }

    /// 未命中路径：桶锁已释放，依次单独持有空闲池锁和桶锁
    fn reserve(&self, dev: u32, blockno: u32) -> SlotId {
        let Some(id) = self.pool.take_any_free(&self.links, &self.slots) else {
            log::error!(
                "[BCACHE] no free buffers: all {} slots referenced (dev={} block={})",
                self.slots.len(),
                dev,
                blockno
            );
            panic!("bcache: no buffers");
        };

        self.slots[id.0].assign(dev, blockno);
        self.index.insert(&self.links, blockno, id);
        log::debug!("[BCACHE] dev={} block={} MISS -> slot {}", dev, blockno, id);
        id
    }

    /// 获取 `id` 的内容锁，必要时从设备加载
    fn acquire(&self, id: SlotId) -> Block<'_, D, S> {
        let slot = &self.slots[id.0];
        let mut content = slot.content.lock(&self.scheduler);
        if !slot.is_valid() {
            self.device_rw(id, &mut content[..], false);
            slot.insert_flags(SlotFlags::VALID);
        }
        Block::new(self, id, content)
    }

    /// `Block` drop 时调用
    pub(super) fn release_slot(&self, id: SlotId, content: SleepLockGuard<'_, Box<[u8]>, S>) {
        let held = self.holding(id);
        drop(content);
        if !held {
            self.not_held("release", id);
        }

        let slot = &self.slots[id.0];
        let mut bucket = self.index.lock(slot.blockno());
        let Some(remaining) = slot.put() else {
            drop(bucket);
            log::error!("[BCACHE] release: refcnt underflow on slot {}", id);
            panic!("release: reference count underflow on slot {}", id);
        };
        if remaining > 0 {
            return;
        }

        bucket.remove(&self.links, id.0);
        drop(bucket);
        self.pool.give_back(&self.links, id);
        StatCounters::bump(&self.stats.recycled);
        log::trace!(
            "[BCACHE] slot {} (dev={} block={}) returned to pool",
            id,
            slot.dev(),
            slot.blockno()
        );
    }

    fn holding(&self, id: SlotId) -> bool {
        self.slots[id.0].content.holding(&self.scheduler)
    }

    fn not_held(&self, op: &str, id: SlotId) -> ! {
        let lock = &self.slots[id.0].content;
        log::error!("[BCACHE] {}: slot {} ({} lock) not held by caller", op, id, lock.name());
        panic!("{}: slot {} not held by caller", op, id);
    }

    /// 同步设备传输，调用者必须持有内容锁
    fn device_rw(&self, id: SlotId, data: &mut [u8], write: bool) {
        let slot = &self.slots[id.0];
        let (dev, blockno) = (slot.dev(), slot.blockno());
        let op = if write { "write" } else { "read" };

        slot.insert_flags(SlotFlags::DISK);
        let result = self.device.transfer(dev, blockno, data, write);
        slot.remove_flags(SlotFlags::DISK);

        if let Err(e) = result {
            log::error!("[BCACHE] device {} failed: dev={} block={}: {}", op, dev, blockno, e);
            panic!("bcache: device {} failed on dev {} block {}: {}", op, dev, blockno, e);
        }

        StatCounters::bump(if write { &self.stats.device_writes } else { &self.stats.device_reads });
        log::debug!("[BCACHE] device {} dev={} block={} slot {}", op, dev, blockno, id);
    }
}

impl<D: BlockDevice, S: Scheduler> core::fmt::Debug for BlockCache<D, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BlockCache")
            .field("capacity", &self.slots.len())
            .field("buckets", &self.index.len())
            .field("free", &self.pool.len())
            .field("block_size", &self.block_size)
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}
