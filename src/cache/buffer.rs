//! 缓存槽结构
//!
//! 槽在初始化时一次性创建，之后只在空闲池与哈希桶之间移动，从不释放。

use crate::sync::{Scheduler, SleepLock};
use alloc::boxed::Box;
use alloc::vec;
use bitflags::bitflags;
use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};

/// 缓存槽 ID（槽数组下标）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotId(pub(crate) usize);

impl SlotId {
    /// 槽数组下标
    pub const fn index(self) -> usize {
        self.0
    }
}

impl core::fmt::Display for SlotId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

bitflags! {
    /// 缓存槽标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SlotFlags: u8 {
        /// 内容与设备一致（已从设备读入）
        const VALID = 0x01;
        /// 设备传输进行中
        const DISK  = 0x02;
    }
}

/// 缓存槽
///
/// # 字段保护
///
/// - `dev`、`blockno`、`refcnt`：由槽当前所在链表的锁保护（桶锁或空闲池锁）；
///   槽从空闲池取出、尚未插入桶的窗口内由取出者独占
/// - `flags`：`VALID` 由内容锁保护，只有重新分配时（槽不可达、无人持有）才在锁外清除
/// - `content`：由睡眠锁保护
///
/// 前三者使用原子类型只是为了跨锁移交时无需 `unsafe`，所有访问都在锁内进行。
pub struct Slot<S: Scheduler> {
    /// 设备号
    dev: AtomicU32,
    /// 块号
    blockno: AtomicU32,
    /// 引用计数（持有者 + pin 次数）
    refcnt: AtomicU32,
    /// 状态标志
    flags: AtomicU8,
    /// 块内容
    pub(crate) content: SleepLock<Box<[u8]>, S>,
}

impl<S: Scheduler> Slot<S> {
    /// 创建空槽
    pub(crate) fn new(block_size: usize) -> Self {
        Self {
            dev: AtomicU32::new(0),
            blockno: AtomicU32::new(0),
            refcnt: AtomicU32::new(0),
            flags: AtomicU8::new(0),
            content: SleepLock::new(vec![0u8; block_size].into_boxed_slice(), "buffer"),
        }
    }

    /// 设备号
    pub fn dev(&self) -> u32 {
        self.dev.load(Ordering::Relaxed)
    }

    /// 块号
    pub fn blockno(&self) -> u32 {
        self.blockno.load(Ordering::Relaxed)
    }

    /// 引用计数
    pub fn refcnt(&self) -> u32 {
        self.refcnt.load(Ordering::Relaxed)
    }

    /// 状态标志
    pub fn flags(&self) -> SlotFlags {
        SlotFlags::from_bits_truncate(self.flags.load(Ordering::Acquire))
    }

    /// 是否标识 `(dev, blockno)`
    pub(crate) fn matches(&self, dev: u32, blockno: u32) -> bool {
        self.dev() == dev && self.blockno() == blockno
    }

    /// 重新分配给 `(dev, blockno)`：清除 `VALID`，引用计数置 1
    ///
    /// 调用者必须刚从空闲池取出此槽。
    pub(crate) fn assign(&self, dev: u32, blockno: u32) {
        self.dev.store(dev, Ordering::Relaxed);
        self.blockno.store(blockno, Ordering::Relaxed);
        self.flags.store(SlotFlags::empty().bits(), Ordering::Release);
        self.refcnt.store(1, Ordering::Relaxed);
    }

    /// 增加引用计数，返回新值
    pub(crate) fn get(&self) -> u32 {
        let n = self.refcnt() + 1;
        self.refcnt.store(n, Ordering::Relaxed);
        n
    }

    /// 减少引用计数，返回新值；计数已为 0 时返回 `None` 且不修改
    pub(crate) fn put(&self) -> Option<u32> {
        let n = self.refcnt().checked_sub(1)?;
        self.refcnt.store(n, Ordering::Relaxed);
        Some(n)
    }

    /// 内容是否有效
    pub fn is_valid(&self) -> bool {
        self.flags().contains(SlotFlags::VALID)
    }

    pub(crate) fn insert_flags(&self, flags: SlotFlags) {
        self.flags.fetch_or(flags.bits(), Ordering::AcqRel);
    }

    pub(crate) fn remove_flags(&self, flags: SlotFlags) {
        self.flags.fetch_and(!flags.bits(), Ordering::AcqRel);
    }
}

impl<S: Scheduler> core::fmt::Debug for Slot<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Slot")
            .field("dev", &self.dev())
            .field("blockno", &self.blockno())
            .field("refcnt", &self.refcnt())
            .field("flags", &self.flags())
            .field("locked", &self.content.is_locked())
            .finish()
    }
}

/// 槽状态快照
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotInfo {
    /// 槽 ID
    pub id: SlotId,
    /// 设备号（槽在空闲池中时为过期值）
    pub dev: u32,
    /// 块号（槽在空闲池中时为过期值）
    pub blockno: u32,
    /// 引用计数
    pub refcnt: u32,
    /// 状态标志
    pub flags: SlotFlags,
}
