//! bud 日志对外接口
//!
//! 对应 UBIFS `log.c` 中的 `ubifs_search_bud()` / `ubifs_add_bud()` /
//! `ubifs_get_wbuf()`，以及 `c->buds_lock` 保护的全部状态。

use super::{BudBytes, BudDescriptor, BudRegistry, HeadLists};
use crate::{
    config::{LogConfig, LogGeometry, MountFlags},
    error::{Error, ErrorKind, Result},
    jhead::jhead_name,
};
use alloc::vec::Vec;
use spin::Mutex;

/// 日志阶段
///
/// 只读挂载时回放期间不建立 head 链表（`heads: None`），
/// 这是唯一允许 bud 只在注册表中出现的状态。
#[derive(Debug)]
pub(super) enum Phase {
    /// 挂载时的回放阶段
    Replaying {
        /// 读写挂载时已建立；只读挂载时为 `None`
        heads: Option<HeadLists>,
    },
    /// 正常运行
    Active {
        /// head 链表
        heads: HeadLists,
    },
}

impl Phase {
    pub(super) fn heads(&self) -> Option<&HeadLists> {
        match self {
            Phase::Replaying { heads } => heads.as_ref(),
            Phase::Active { heads } => Some(heads),
        }
    }

    pub(super) fn heads_mut(&mut self) -> Option<&mut HeadLists> {
        match self {
            Phase::Replaying { heads } => heads.as_mut(),
            Phase::Active { heads } => Some(heads),
        }
    }
}

/// 锁保护的全部状态
#[derive(Debug)]
pub(super) struct LogInner {
    pub(super) registry: BudRegistry,
    pub(super) phase: Phase,
    pub(super) bud_bytes: BudBytes,
}

/// journal 空间压力
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalPressure {
    /// 无需提交
    Normal,
    /// 超过 `bg_bud_bytes`，应启动后台提交
    Background,
    /// 达到 `max_bud_bytes`，写者必须等待提交完成
    Full,
}

/// bud 日志
///
/// 每个挂载的卷一个实例，挂载时创建，卸载时销毁。
///
/// 注册表、head 链表和 `bud_bytes` 由同一把自旋锁保护，
/// 所有修改都在一次持锁中完成。锁内只做内存操作，
/// 任何 flash I/O 都必须在调用之前完成。
///
/// # 示例
///
/// ```rust,ignore
/// use ubifs_log::{BudDescriptor, BudLog, LogConfig, BASEHD};
///
/// let log = BudLog::new(&LogConfig::default())?;
/// log.add_bud(BudDescriptor::new(100, 0, BASEHD))?;
///
/// assert_eq!(log.search_bud(100).map(|b| b.jhead), Some(BASEHD));
/// assert_eq!(log.bud_bytes(), log.geometry().leb_size as u64);
/// ```
#[derive(Debug)]
pub struct BudLog {
    geo: LogGeometry,
    flags: MountFlags,
    pub(super) inner: Mutex<LogInner>,
}

impl BudLog {
    /// 创建已就绪的 bud 日志（新格式化的卷，无需回放）
    pub fn new(config: &LogConfig) -> Result<Self> {
        let geo = LogGeometry::from_config(config)?;
        let heads = HeadLists::new(geo.jhead_cnt);
        Ok(Self::with_phase(geo, config.flags, Phase::Active { heads }))
    }

    /// 创建处于回放阶段的 bud 日志
    ///
    /// 只读挂载时不建立 head 链表，回放登记的 bud 只进入注册表，
    /// 在 [`finish_replay`](Self::finish_replay) 时再按登记顺序挂入。
    pub fn replaying(config: &LogConfig) -> Result<Self> {
        let geo = LogGeometry::from_config(config)?;
        let heads = if config.flags.contains(MountFlags::RO_MOUNT) {
            None
        } else {
            Some(HeadLists::new(geo.jhead_cnt))
        };
        Ok(Self::with_phase(geo, config.flags, Phase::Replaying { heads }))
    }

    fn with_phase(geo: LogGeometry, flags: MountFlags, phase: Phase) -> Self {
        let journal = geo.journal_size();
        log::info!(
            "[BUD] journal size: {} bytes ({} KiB, {} MiB), {} heads",
            journal,
            journal >> 10,
            journal >> 20,
            geo.jhead_cnt
        );
        log::debug!(
            "[BUD] maximum bud bytes: {}, BG commit bud bytes: {}, max. buds: {}",
            geo.max_bud_bytes,
            geo.bg_bud_bytes,
            geo.max_bud_cnt
        );

        Self {
            geo,
            flags,
            inner: Mutex::new(LogInner {
                registry: BudRegistry::new(),
                phase,
                bud_bytes: BudBytes::default(),
            }),
        }
    }

    /// 几何参数
    pub fn geometry(&self) -> &LogGeometry {
        &self.geo
    }

    /// 挂载标志
    pub fn flags(&self) -> MountFlags {
        self.flags
    }

    /// 按 LEB 编号查找 bud
    ///
    /// 对应 UBIFS 的 `ubifs_search_bud()`
    ///
    /// # 返回
    ///
    /// 是 bud 返回描述符的副本，否则返回 `None`（这是常见情况，不是错误）
    pub fn search_bud(&self, lnum: u32) -> Option<BudDescriptor> {
        let inner = self.inner.lock();
        inner.registry.search(lnum).copied()
    }

    /// 登记新 bud
    ///
    /// 对应 UBIFS 的 `ubifs_add_bud()`
    ///
    /// # 参数
    ///
    /// * `bud` - 新 bud，LEB 必须已经在 flash 上准备好
    ///
    /// # 流程
    ///
    /// 1. 检查 head 编号和起始偏移（不持锁）
    /// 2. 持锁，检查 LEB 是否已是 bud
    /// 3. 预留 slab 槽位和 head 链表空间
    /// 4. 插入注册表，挂入 head 链表，增加 `bud_bytes`
    ///
    /// # 返回
    ///
    /// - `ErrorKind::InvalidInput` - head 或偏移越界
    /// - `ErrorKind::Corrupted` - LEB 已是 bud，日志已损坏，不可恢复
    /// - `ErrorKind::NoMemory` - 无法分配
    ///
    /// 出错时三者都不变。
    pub fn add_bud(&self, bud: BudDescriptor) -> Result<()> {
        let leb_size = self.geo.leb_size;
        if bud.jhead >= self.geo.jhead_cnt {
            log::warn!("[BUD] LEB {}: bad jhead {}", bud.lnum, bud.jhead);
            return Err(Error::new(ErrorKind::InvalidInput, "Journal head out of range"));
        }
        if bud.start >= leb_size {
            log::warn!("[BUD] LEB {}: bad start {}", bud.lnum, bud.start);
            return Err(Error::new(ErrorKind::InvalidInput, "Bud start beyond end of LEB"));
        }

        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        if let Some(old) = inner.registry.search(bud.lnum) {
            log::error!(
                "[BUD] LEB {} is already a bud (start {}, jhead {})",
                old.lnum,
                old.start,
                jhead_name(old.jhead)
            );
            return Err(Error::new(ErrorKind::Corrupted, "Duplicate bud LEB"));
        }

        inner.registry.reserve()?;
        if let Some(heads) = inner.phase.heads_mut() {
            heads.reserve(bud.jhead)?;
        }

        let id = inner.registry.insert(bud)?;
        if let Some(heads) = inner.phase.heads_mut() {
            heads.append(bud.jhead, id);
        }
        inner.bud_bytes.account(leb_size, bud.start);

        log::debug!(
            "[BUD] added bud LEB {}:{}, jhead {}, bud_bytes {}",
            bud.lnum,
            bud.start,
            jhead_name(bud.jhead),
            inner.bud_bytes.get()
        );
        Ok(())
    }

    /// bud 占用的字节数
    pub fn bud_bytes(&self) -> u64 {
        self.inner.lock().bud_bytes.get()
    }

    /// bud 数量
    pub fn bud_count(&self) -> usize {
        self.inner.lock().registry.len()
    }

    /// 是否仍在回放阶段
    pub fn is_replaying(&self) -> bool {
        matches!(self.inner.lock().phase, Phase::Replaying { .. })
    }

    /// head 当前正在写入的 bud（链表尾部）
    pub fn current_bud(&self, jhead: usize) -> Option<BudDescriptor> {
        let inner = self.inner.lock();
        let id = inner.phase.heads()?.tail(jhead)?;
        inner.registry.get(id).copied()
    }

    /// head 的所有 bud，按追加顺序
    pub fn head_buds(&self, jhead: usize) -> Vec<BudDescriptor> {
        let inner = self.inner.lock();
        match inner.phase.heads() {
            Some(heads) => heads
                .iter(jhead)
                .filter_map(|id| inner.registry.get(id).copied())
                .collect(),
            None => Vec::new(),
        }
    }

    /// LEB 属于哪个 head 的写缓冲
    ///
    /// 对应 UBIFS 的 `ubifs_get_wbuf()`：head 尚未建立或 LEB 不是 bud 时返回 `None`
    pub fn jhead_of(&self, lnum: u32) -> Option<usize> {
        let inner = self.inner.lock();
        inner.phase.heads()?;
        inner.registry.search(lnum).map(|bud| bud.jhead)
    }

    /// 结束回放
    ///
    /// 只读挂载时按登记顺序重建 head 链表。已经结束回放时返回
    /// `ErrorKind::InvalidState`。
    pub fn finish_replay(&self) -> Result<()> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let heads = match &mut inner.phase {
            Phase::Active { .. } => {
                return Err(Error::new(ErrorKind::InvalidState, "Replay already finished"));
            }
            Phase::Replaying { heads } => heads.take(),
        };

        let heads = match heads {
            Some(heads) => heads,
            None => {
                let mut heads = HeadLists::new(self.geo.jhead_cnt);
                for id in inner.registry.by_age() {
                    if let Some(bud) = inner.registry.get(id) {
                        heads.reserve(bud.jhead)?;
                        heads.append(bud.jhead, id);
                    }
                }
                log::debug!("[BUD] relinked {} buds after replay", heads.total());
                heads
            }
        };

        inner.phase = Phase::Active { heads };
        log::info!(
            "[BUD] replay finished: {} buds, bud_bytes {}",
            inner.registry.len(),
            inner.bud_bytes.get()
        );
        Ok(())
    }

    /// 当前 journal 空间压力
    pub fn pressure(&self) -> JournalPressure {
        let bud_bytes = self.bud_bytes();
        if bud_bytes >= self.geo.max_bud_bytes {
            JournalPressure::Full
        } else if bud_bytes >= self.geo.bg_bud_bytes {
            JournalPressure::Background
        } else {
            JournalPressure::Normal
        }
    }

    /// 卸载时释放所有 bud
    ///
    /// # 返回
    ///
    /// 释放的 bud 数量
    pub fn destroy(&self) -> usize {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let count = inner.registry.len();
        inner.registry.clear();
        if let Some(heads) = inner.phase.heads_mut() {
            heads.clear();
        }
        inner.bud_bytes.reset();

        log::debug!("[BUD] destroyed {} buds", count);
        count
    }
}
