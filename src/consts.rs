//! 块缓存常量定义
//!
//! 这个模块包含了块缓存的默认尺寸参数：
//! - 缓存槽数量
//! - 哈希桶数量
//! - 块大小

//=============================================================================
// 缓存尺寸
//=============================================================================

/// 默认缓存槽数量
///
/// 槽池大小在初始化后固定不变，需要覆盖调用者同时持有的最大块数。
pub const NBUF: usize = 30;

/// 默认哈希桶数量（取素数，使 `blockno % NBUCKET` 分布更均匀）
pub const NBUCKET: usize = 13;

/// 默认块大小（字节）
pub const BSIZE: usize = 1024;

//=============================================================================
// 内部常量
//=============================================================================

/// 链表空链接
pub(crate) const NIL: usize = usize::MAX;
