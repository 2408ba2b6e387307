//! 内存块设备
//!
//! 以 RAM 作为后备存储的 [`BlockDevice`] 实现，适用于宿主环境和测试。
//! 块按 `(dev, blockno)` 稀疏存储，未写过的块读出为全零。

use super::BlockDevice;
use crate::error::{Error, ErrorKind, Result};
use alloc::collections::BTreeMap;
use alloc::vec;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use spin::Mutex;

/// 内存块设备
pub struct MemDevice {
    /// 块大小（字节）
    block_size: usize,
    /// 每个设备号的块数上限
    nblocks: u32,
    /// 已写入的块
    blocks: Mutex<BTreeMap<(u32, u32), Vec<u8>>>,
    /// 读取次数
    reads: AtomicU64,
    /// 写入次数
    writes: AtomicU64,
    /// 只读时拒绝写入
    read_only: AtomicBool,
}

impl MemDevice {
    /// 创建新的内存设备
    ///
    /// # 参数
    ///
    /// * `block_size` - 块大小（字节）
    /// * `nblocks` - 每个设备号可寻址的块数
    pub fn new(block_size: usize, nblocks: u32) -> Self {
        Self {
            block_size,
            nblocks,
            blocks: Mutex::new(BTreeMap::new()),
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            read_only: AtomicBool::new(false),
        }
    }

    /// 设置只读模式，只读时 `write_block` 返回 [`ErrorKind::Io`]
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::Relaxed);
    }

    /// 读取次数
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// 写入次数
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// 直接查看存储内容（不计入读取次数）
    pub fn peek(&self, dev: u32, blockno: u32) -> Vec<u8> {
        self.blocks
            .lock()
            .get(&(dev, blockno))
            .cloned()
            .unwrap_or_else(|| vec![0u8; self.block_size])
    }

    /// 直接改写存储内容（不计入写入次数）
    ///
    /// `data` 短于块大小时剩余部分填零，长于块大小时截断。
    pub fn poke(&self, dev: u32, blockno: u32, data: &[u8]) {
        let mut block = vec![0u8; self.block_size];
        let len = data.len().min(self.block_size);
        block[..len].copy_from_slice(&data[..len]);
        self.blocks.lock().insert((dev, blockno), block);
    }

    fn check(&self, blockno: u32, len: usize) -> Result<()> {
        if blockno >= self.nblocks {
            log::warn!("[MEMDEV] block {} out of range (nblocks={})", blockno, self.nblocks);
            return Err(Error::new(ErrorKind::OutOfRange, "Block number beyond device end"));
        }
        if len != self.block_size {
            return Err(Error::new(ErrorKind::InvalidInput, "Buffer length differs from block size"));
        }
        Ok(())
    }
}

impl BlockDevice for MemDevice {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn read_block(&self, dev: u32, blockno: u32, buf: &mut [u8]) -> Result<()> {
        self.check(blockno, buf.len())?;
        match self.blocks.lock().get(&(dev, blockno)) {
            Some(block) => buf.copy_from_slice(block),
            None => buf.fill(0),
        }
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn write_block(&self, dev: u32, blockno: u32, buf: &[u8]) -> Result<()> {
        self.check(blockno, buf.len())?;
        if self.read_only.load(Ordering::Relaxed) {
            log::warn!("[MEMDEV] write to read-only device: dev={} block={}", dev, blockno);
            return Err(Error::new(ErrorKind::Io, "Device is read-only"));
        }
        self.blocks.lock().insert((dev, blockno), buf.to_vec());
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

impl core::fmt::Debug for MemDevice {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MemDevice")
            .field("block_size", &self.block_size)
            .field("nblocks", &self.nblocks)
            .field("stored", &self.blocks.lock().len())
            .field("reads", &self.reads())
            .field("writes", &self.writes())
            .field("read_only", &self.read_only.load(Ordering::Relaxed))
            .finish()
    }
}
