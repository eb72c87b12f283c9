//! bud 字节计数
//!
//! 对应 UBIFS 的 `c->bud_bytes`

use crate::error::{Error, ErrorKind, Result};

/// bud 占用的 flash 字节数
///
/// 等于所有活跃 bud 的 `leb_size - start` 之和。
/// 只在持有日志锁时与注册表、head 链表一起修改。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BudBytes(u64);

impl BudBytes {
    /// 当前值
    #[inline]
    pub const fn get(&self) -> u64 {
        self.0
    }

    /// 登记新 bud：增加 `leb_size - start`
    #[inline]
    pub fn account(&mut self, leb_size: u32, start: u32) {
        self.0 += (leb_size - start) as u64;
    }

    /// 释放 `bytes` 字节
    ///
    /// 计数不足说明计数已经偏离，返回 `ErrorKind::Corrupted`，计数不变
    pub fn release(&mut self, bytes: u64) -> Result<()> {
        match self.0.checked_sub(bytes) {
            Some(left) => {
                self.0 = left;
                Ok(())
            }
            None => {
                log::error!("[BUD] bud_bytes {} < released {}", self.0, bytes);
                Err(Error::new(ErrorKind::Corrupted, "bud_bytes underflow"))
            }
        }
    }

    /// 清零（卸载）
    #[inline]
    pub fn reset(&mut self) {
        self.0 = 0;
    }
}
