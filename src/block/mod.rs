//! 块设备抽象
//!
//! 提供缓存所依赖的块设备接口。
//! block/device.rs 定义 `BlockDevice` trait，缓存通过它同步读写块内容
//! block/mem.rs 提供基于内存的设备实现，供宿主环境和测试使用

mod device;
mod mem;

pub use device::BlockDevice;
pub use mem::MemDevice;
