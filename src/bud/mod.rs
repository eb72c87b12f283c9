//! UBIFS bud 日志
//!
//! bud 是当前作为 journal 缓冲区使用的 LEB：其中的数据已经写入 flash，
//! 但还没有被提交进索引。这个模块维护所有活跃 bud 的内存记录。
//!
//! # 架构概述
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        BudLog                             │
//! │        search_bud() / add_bud() / release_bud()           │
//! │                spin::Mutex<LogInner>                      │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐    │
//! │  │ BudRegistry  │  │  HeadLists   │  │   BudBytes   │    │
//! │  │ lnum -> id   │  │ head -> [id] │  │     u64      │    │
//! │  └──────┬───────┘  └──────┬───────┘  └──────────────┘    │
//! │         │                  │                              │
//! │         └────────┬─────────┘                              │
//! │                  ▼                                        │
//! │        slab: Vec<Option<BudDescriptor>>                   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! 每个 bud 只存储一份（slab），按 LEB 编号排序的索引和每个 head 的
//! 追加链表都只保存 [`BudId`] 句柄。三个结构由同一把锁保护，
//! 作为一个整体更新。
//!
//! # 核心组件
//!
//! - [`BudRegistry`] - 按 LEB 编号有序的 bud 集合
//! - [`HeadLists`] - 每个 journal head 的 bud 追加顺序
//! - [`BudBytes`] - bud 占用字节计数
//! - [`BudLog`] - 对外接口，组合以上三者
//!
//! # 生命周期
//!
//! ```text
//! 不存在 ──add_bud()──▶ 活跃 ──release_bud() / commit_buds()──▶ 已释放
//! ```
//!
//! # 对应 UBIFS
//!
//! | UBIFS                         | ubifs_log                 |
//! |-------------------------------|---------------------------|
//! | `struct ubifs_bud`            | [`BudDescriptor`]         |
//! | `c->buds` (rb-tree)           | [`BudRegistry`]           |
//! | `c->jheads[i].buds_list`      | [`HeadLists`]             |
//! | `c->bud_bytes`                | [`BudBytes`]              |
//! | `c->buds_lock`                | `BudLog::inner`           |
//! | `ubifs_search_bud()`          | [`BudLog::search_bud()`]  |
//! | `ubifs_add_bud()`             | [`BudLog::add_bud()`]     |
//! | `remove_buds()`               | [`BudLog::commit_buds()`] |

mod registry;
mod heads;
mod accounting;
mod bud_log;
mod commit;
mod check;

pub use registry::BudRegistry;
pub use heads::HeadLists;
pub use accounting::BudBytes;
pub use bud_log::{BudLog, JournalPressure};
pub use commit::{CommitOutcome, WbufPos};

/// bud 句柄，slab 中的槽位下标
pub type BudId = usize;

/// bud 描述符
///
/// 对应 UBIFS 的 `struct ubifs_bud`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudDescriptor {
    /// LEB 编号（唯一，排序键）
    pub lnum: u32,
    /// bud 数据在 LEB 内的起始偏移，之前的字节属于更早的提交
    pub start: u32,
    /// 所属 journal head
    pub jhead: usize,
}

impl BudDescriptor {
    /// 创建 bud 描述符
    pub const fn new(lnum: u32, start: u32, jhead: usize) -> Self {
        Self { lnum, start, jhead }
    }

    /// 该 bud 占用的字节数，`start` 超出 LEB 时为 0
    #[inline]
    pub const fn bytes(&self, leb_size: u32) -> u64 {
        leb_size.saturating_sub(self.start) as u64
    }
}
