//! 挂载配置与日志几何参数
//!
//! [`LogConfig`] 是挂载时由上层给出的原始参数（来自 UBI 卷信息和超级块），
//! [`LogGeometry`] 是校验并推导之后的只读参数，整个挂载期间不变。

use crate::{
    consts::*,
    error::{Error, ErrorKind, Result},
};
use bitflags::bitflags;

bitflags! {
    /// 挂载标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MountFlags: u8 {
        /// 以只读方式挂载
        const RO_MOUNT = 0x01;
        /// 介质本身只读（只读 UBI 设备或静态卷）
        const RO_MEDIA = 0x02;
    }
}

impl MountFlags {
    /// 是否不允许写入
    pub fn is_read_only(&self) -> bool {
        self.intersects(Self::RO_MOUNT | Self::RO_MEDIA)
    }
}

/// bud 日志配置
#[derive(Debug, Clone, Copy)]
pub struct LogConfig {
    /// LEB 大小（字节）
    pub leb_size: u32,
    /// 最小 I/O 单元（字节，2 的幂）
    pub min_io_size: u32,
    /// journal head 数量
    pub jhead_cnt: usize,
    /// 日志区 LEB 数
    pub log_lebs: u32,
    /// bud 最多可占用的字节数（超过后必须提交）
    pub max_bud_bytes: u64,
    /// 挂载标志
    pub flags: MountFlags,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            leb_size: 126976, // 128KiB 擦除块减去两页 UBI 头
            min_io_size: 2048,
            jhead_cnt: UBIFS_DEFAULT_JHEADS_CNT,
            log_lebs: 5,
            max_bud_bytes: 8 * 1024 * 1024,
            flags: MountFlags::empty(),
        }
    }
}

/// 日志几何参数（校验后）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogGeometry {
    /// LEB 大小
    pub leb_size: u32,
    /// 最小 I/O 单元（不小于 8）
    pub min_io_size: u32,
    /// journal head 数量
    pub jhead_cnt: usize,
    /// 日志区 LEB 数
    pub log_lebs: u32,
    /// 对齐后的引用节点大小
    pub ref_node_alsz: u32,
    /// 最多同时存在的 bud 数
    pub max_bud_cnt: u64,
    /// 达到此值时阻塞写者并提交
    pub max_bud_bytes: u64,
    /// 达到此值时启动后台提交
    pub bg_bud_bytes: u64,
}

impl LogGeometry {
    /// 校验配置并推导几何参数
    ///
    /// # 返回
    ///
    /// 配置不合法时返回 `ErrorKind::InvalidInput`
    pub fn from_config(config: &LogConfig) -> Result<Self> {
        let leb_size = config.leb_size;
        if leb_size == 0 {
            return Err(Error::new(ErrorKind::InvalidInput, "LEB size must be non-zero"));
        }

        if !config.min_io_size.is_power_of_two() {
            log::error!("[CONFIG] bad min. I/O size {}", config.min_io_size);
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "Min. I/O size must be a power of 2",
            ));
        }
        let min_io_size = config.min_io_size.max(UBIFS_MIN_IO_SZ);

        if config.jhead_cnt == 0 {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "At least one journal head is required",
            ));
        }

        let ref_node_alsz = align_up(UBIFS_REF_NODE_SZ, min_io_size);

        // 一次完整提交（CS 节点 + 每个 head 一个引用节点）必须能放进一个 LEB
        let commit_sz = (UBIFS_REF_NODE_SZ as u64)
            .saturating_mul(config.jhead_cnt as u64)
            .saturating_add(UBIFS_CS_NODE_SZ as u64);
        let io_mask = min_io_size as u64 - 1;
        let commit_sz = commit_sz.saturating_add(io_mask) & !io_mask;
        if commit_sz > leb_size as u64 {
            log::error!(
                "[CONFIG] too small LEB size {}, at least {} needed",
                leb_size,
                commit_sz
            );
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "LEB size too small to fit a full commit",
            ));
        }

        if config.log_lebs < UBIFS_MIN_LOG_LEBS {
            return Err(Error::new(ErrorKind::InvalidInput, "Log area too small"));
        }

        // 日志区要能放下所有 bud 的引用节点，外加一个保留 LEB
        let leb = leb_size as u64;
        let max_bud_cnt = config.max_bud_bytes.div_ceil(leb);
        let min_log_lebs = (ref_node_alsz as u64)
            .checked_mul(max_bud_cnt)
            .map(|refs| refs.div_ceil(leb) + 1)
            .ok_or(Error::new(ErrorKind::InvalidInput, "Bud limit too large"))?;
        if (config.log_lebs as u64) < min_log_lebs {
            log::error!(
                "[CONFIG] too small log {} LEBs, required min. {} LEBs",
                config.log_lebs,
                min_log_lebs
            );
            return Err(Error::new(ErrorKind::InvalidInput, "Log area too small"));
        }

        // head 中的字节都按已用计算，journal 过小会被视为永远是满的
        let mut max_bud_bytes = config.max_bud_bytes;
        let mut bg_bud_bytes = max_bud_bytes
            .checked_mul(UBIFS_BG_COMMIT_NUM)
            .map(|bytes| bytes >> UBIFS_BG_COMMIT_SHIFT)
            .ok_or(Error::new(ErrorKind::InvalidInput, "Bud limit too large"))?;
        let min_bytes = (config.jhead_cnt as u64 + 1) * leb + 1;
        if bg_bud_bytes < min_bytes {
            bg_bud_bytes = min_bytes;
        }
        if max_bud_bytes < min_bytes + leb {
            max_bud_bytes = min_bytes + leb;
        }

        Ok(Self {
            leb_size,
            min_io_size,
            jhead_cnt: config.jhead_cnt,
            log_lebs: config.log_lebs,
            ref_node_alsz,
            max_bud_cnt,
            max_bud_bytes,
            bg_bud_bytes,
        })
    }

    /// journal 总大小：日志区加上 bud 上限
    pub fn journal_size(&self) -> u64 {
        (self.log_lebs as u64 * self.leb_size as u64).saturating_add(self.max_bud_bytes)
    }
}
