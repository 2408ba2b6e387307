//! 块设备核心类型

use crate::error::Result;

/// 块设备接口
///
/// 缓存通过此 trait 读写底层持久存储。实现者负责自身的并发保护：
/// 多个线程可能同时对不同的块发起传输，因此所有方法都只取 `&self`。
///
/// 传输是同步的，调用线程会阻塞直到完成。返回的错误被缓存视为致命错误。
///
/// # 示例
///
/// ```rust,ignore
/// use bcache_core::{BlockDevice, Result};
///
/// struct MyDisk {
///     // ...
/// }
///
/// impl BlockDevice for MyDisk {
///     fn block_size(&self) -> usize {
///         1024
///     }
///
///     fn read_block(&self, dev: u32, blockno: u32, buf: &mut [u8]) -> Result<()> {
///         // 从磁盘读取 blockno 到 buf
///         Ok(())
///     }
///
///     fn write_block(&self, dev: u32, blockno: u32, buf: &[u8]) -> Result<()> {
///         // 将 buf 写入磁盘 blockno
///         Ok(())
///     }
/// }
/// ```
pub trait BlockDevice: Send + Sync {
    /// 块大小（字节）
    fn block_size(&self) -> usize;

    /// 读取一个块
    ///
    /// # 参数
    ///
    /// * `dev` - 设备号
    /// * `blockno` - 块号
    /// * `buf` - 目标缓冲区，长度等于 [`block_size`](Self::block_size)
    fn read_block(&self, dev: u32, blockno: u32, buf: &mut [u8]) -> Result<()>;

    /// 写入一个块
    ///
    /// # 参数
    ///
    /// * `dev` - 设备号
    /// * `blockno` - 块号
    /// * `buf` - 源缓冲区，长度等于 [`block_size`](Self::block_size)
    fn write_block(&self, dev: u32, blockno: u32, buf: &[u8]) -> Result<()>;

    /// 按方向执行一次传输
    ///
    /// `write == false` 时从存储填充 `buf`，否则持久化 `buf`。
    fn transfer(&self, dev: u32, blockno: u32, buf: &mut [u8], write: bool) -> Result<()> {
        if write {
            self.write_block(dev, blockno, buf)
        } else {
            self.read_block(dev, blockno, buf)
        }
    }
}

impl<D: BlockDevice + ?Sized> BlockDevice for alloc::sync::Arc<D> {
    fn block_size(&self) -> usize {
        (**self).block_size()
    }

    fn read_block(&self, dev: u32, blockno: u32, buf: &mut [u8]) -> Result<()> {
        (**self).read_block(dev, blockno, buf)
    }

    fn write_block(&self, dev: u32, blockno: u32, buf: &[u8]) -> Result<()> {
        (**self).write_block(dev, blockno, buf)
    }
}
