//! UBIFS 日志常量定义
//!
//! 这个模块包含了 bud 日志几何校验用到的常量：
//! - 日志区中节点的大小
//! - journal head 编号

//=============================================================================
// 节点大小
//=============================================================================

/// 公共节点头大小（字节）
pub const UBIFS_CH_SZ: u32 = 24;

/// 引用节点大小（每个 bud 在日志区中对应一个引用节点）
pub const UBIFS_REF_NODE_SZ: u32 = UBIFS_CH_SZ + 40;

/// 提交开始节点大小
pub const UBIFS_CS_NODE_SZ: u32 = UBIFS_CH_SZ + 8;

/// 最小 I/O 单元下限（所有节点按 8 字节对齐）
pub const UBIFS_MIN_IO_SZ: u32 = 8;

//=============================================================================
// Journal head
//=============================================================================

/// 垃圾回收 head
pub const GCHD: usize = 0;

/// 基础 head（inode、目录项等元数据）
pub const BASEHD: usize = 1;

/// 数据 head
pub const DATAHD: usize = 2;

/// 非数据 head 数量
pub const NONDATA_JHEADS_CNT: usize = 2;

/// 默认 journal head 数量（GC + base + 一个 data）
pub const UBIFS_DEFAULT_JHEADS_CNT: usize = NONDATA_JHEADS_CNT + 1;

//=============================================================================
// 日志区
//=============================================================================

/// 日志区最少 LEB 数
pub const UBIFS_MIN_LOG_LEBS: u32 = 2;

/// 后台提交阈值系数：bg_bud_bytes = max_bud_bytes * 13 / 16
pub const UBIFS_BG_COMMIT_NUM: u64 = 13;

/// 后台提交阈值移位
pub const UBIFS_BG_COMMIT_SHIFT: u32 = 4;

/// 擦除后 flash 字节值
pub const UBIFS_ERASED_BYTE: u8 = 0xFF;

/// 对齐到 `align`（必须是 2 的幂）
#[inline]
pub const fn align_up(value: u32, align: u32) -> u32 {
    (value + align - 1) & !(align - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_sizes() {
        assert_eq!(UBIFS_REF_NODE_SZ, 64);
        assert_eq!(UBIFS_CS_NODE_SZ, 32);
        assert_eq!(UBIFS_DEFAULT_JHEADS_CNT, 3);
    }

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(64, 8), 64);
        assert_eq!(align_up(65, 8), 72);
        assert_eq!(align_up(64, 2048), 2048);
        assert_eq!(align_up(0, 512), 0);
    }
}
