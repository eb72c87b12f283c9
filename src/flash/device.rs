//! LEB 设备核心类型

use crate::error::{Error, ErrorKind, Result};

/// LEB 设备接口
///
/// 实现此 trait 以提供底层 LEB 访问（通常是 UBI 卷）。
/// 语义：先擦除后写入，擦除后的字节为 0xFF。
///
/// # 示例
///
/// ```rust,ignore
/// use ubifs_log::{LebDevice, Result};
///
/// struct MyVolume {
///     // ...
/// }
///
/// impl LebDevice for MyVolume {
///     fn leb_size(&self) -> u32 {
///         126976
///     }
///
///     fn leb_count(&self) -> u32 {
///         1024
///     }
///
///     fn read_leb(&mut self, lnum: u32, offs: u32, buf: &mut [u8]) -> Result<usize> {
///         // 读取 LEB
///         Ok(buf.len())
///     }
///
///     fn write_leb(&mut self, lnum: u32, offs: u32, buf: &[u8]) -> Result<usize> {
///         // 写入 LEB
///         Ok(buf.len())
///     }
///
///     fn erase_leb(&mut self, lnum: u32) -> Result<()> {
///         Ok(())
///     }
/// }
/// ```
pub trait LebDevice {
    /// LEB 大小（字节）
    fn leb_size(&self) -> u32;

    /// LEB 总数
    fn leb_count(&self) -> u32;

    /// 读取 LEB
    ///
    /// # 参数
    ///
    /// * `lnum` - LEB 编号
    /// * `offs` - LEB 内偏移
    /// * `buf` - 目标缓冲区
    ///
    /// # 返回
    ///
    /// 成功返回实际读取的字节数
    fn read_leb(&mut self, lnum: u32, offs: u32, buf: &mut [u8]) -> Result<usize>;

    /// 写入 LEB
    ///
    /// # 参数
    ///
    /// * `lnum` - LEB 编号
    /// * `offs` - LEB 内偏移
    /// * `buf` - 源缓冲区
    ///
    /// # 返回
    ///
    /// 成功返回实际写入的字节数
    fn write_leb(&mut self, lnum: u32, offs: u32, buf: &[u8]) -> Result<usize>;

    /// 擦除 LEB
    fn erase_leb(&mut self, lnum: u32) -> Result<()>;

    /// 是否只读
    fn is_read_only(&self) -> bool {
        false
    }
}

/// 检查 `[offs, offs + len)` 是否落在设备的某个 LEB 内
pub fn check_leb<D: LebDevice + ?Sized>(dev: &D, lnum: u32, offs: u32, len: u32) -> Result<()> {
    if lnum >= dev.leb_count() {
        log::warn!("[FLASH] LEB {} out of range (count {})", lnum, dev.leb_count());
        return Err(Error::new(ErrorKind::InvalidInput, "LEB number out of range"));
    }

    let end = offs as u64 + len as u64;
    if end > dev.leb_size() as u64 {
        log::warn!(
            "[FLASH] LEB {}:{} len {} exceeds LEB size {}",
            lnum,
            offs,
            len,
            dev.leb_size()
        );
        return Err(Error::new(ErrorKind::InvalidInput, "Access beyond end of LEB"));
    }

    Ok(())
}
