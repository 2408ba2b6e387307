//! 块缓存模块
//!
//! 这个模块提供了一个并发的块缓冲区缓存：固定数量的缓存槽在哈希桶索引与空闲池之间循环。
//!
//! # 主要组件
//!
//! - [`BlockCache`] - 缓存门面：`fetch` / `flush` / `release` / `pin` / `unpin`
//! - [`Block`] - `fetch` 返回的 RAII 句柄，持有槽的内容锁
//! - [`SlotId`] / [`SlotInfo`] / [`SlotFlags`] - 缓存槽标识、状态快照与标志
//! - [`CacheConfig`] - 槽数量、桶数量、块大小
//! - [`CacheStats`] - 缓存统计信息
//!
//! # 设计原理
//!
//! 1. **数据结构**：槽和链接存放在固定长度的数组中，链表用下标链接，
//!    插入、摘除、在链表间移动都是 O(1)
//! 2. **两级锁**：桶锁和空闲池锁是自旋锁，只在修改链表和引用计数时短暂持有；
//!    每个槽的内容由睡眠锁保护，可以在持有期间做设备 I/O
//! 3. **回收策略**：引用计数从 1 降到 0 的 `release` 把槽从桶中摘下、压入空闲池表头；
//!    未命中时从表头取槽，因此是 LIFO 复用，而不是 LRU
//!
//! # 槽的生命周期
//!
//! ```text
//! 空闲池 --(未命中: 取出, 重新标识, 插入桶)--> 桶 (refcnt ≥ 1)
//!    ^                                          |
//!    +------(最后一次 release: 从桶摘除)---------+
//! ```
//!
//! ✅ 按 `(dev, blockno)` 的桶索引
//! ✅ 引用计数与 pin
//! ✅ LIFO 空闲池
//! ❌ 写回策略、预读、日志（由调用者决定）
//!
//! # 使用示例
//!
//! ```rust,ignore
//! use bcache_core::{BlockCache, CacheConfig, MemDevice, StdScheduler};
//!
//! let cache = BlockCache::new(MemDevice::new(1024, 2000), StdScheduler, CacheConfig::default())?;
//!
//! // 读取并修改
//! let mut block = cache.fetch(1, 46);
//! block[0] = 42;
//! block.flush();
//!
//! // 跨事务保留
//! cache.pin(block.slot());
//! block.release();
//!
//! let stats = cache.stats();
//! println!("hits={} misses={}", stats.hits, stats.misses);
//! ```
//!
//! # 内存分配要求
//!
//! 本模块依赖 `alloc` crate，需要用户提供全局分配器。

mod block_cache;
mod bucket;
mod buffer;
mod config;
mod handle;
mod list;
mod pool;

pub use block_cache::{BlockCache, CacheStats};
pub use buffer::{SlotFlags, SlotId, SlotInfo};
pub use config::CacheConfig;
pub use handle::Block;
