//! bud 注册表
//!
//! 对应 UBIFS 的 `c->buds` 红黑树

use super::{BudDescriptor, BudId};
use crate::error::{Error, ErrorKind, Result};
use alloc::collections::BTreeMap;
use alloc::vec::Vec;

/// slab 槽位
#[derive(Debug, Clone, Copy)]
struct Slot {
    bud: BudDescriptor,
    /// 注册序号，用于按注册顺序重建 head 链表
    seq: u64,
}

/// bud 注册表
///
/// 对应 UBIFS 的 `c->buds`
///
/// # Rust 实现
///
/// - `RB_ROOT`: 使用 `BTreeMap<u32, BudId>` 替代（key 是 LEB 编号）
/// - `struct ubifs_bud` 节点: 存放在 `slots` 中，通过 [`BudId`] 访问
/// - 空闲槽位通过 `free_slots` 复用
///
/// 本结构不带锁，由 [`super::BudLog`] 在持锁时调用。
#[derive(Debug, Default)]
pub struct BudRegistry {
    /// bud 存储
    slots: Vec<Option<Slot>>,
    /// 空闲槽位
    free_slots: Vec<BudId>,
    /// LEB 编号索引
    by_lnum: BTreeMap<u32, BudId>,
    /// 下一个注册序号
    next_seq: u64,
}

impl BudRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 按 LEB 编号查找 bud
    ///
    /// 对应 UBIFS 的 `ubifs_search_bud()` 中的树遍历部分。
    /// 不做范围检查，不存在的编号直接返回 `None`。
    pub fn search(&self, lnum: u32) -> Option<&BudDescriptor> {
        self.id_of(lnum).and_then(|id| self.get(id))
    }

    /// LEB 编号对应的句柄
    pub fn id_of(&self, lnum: u32) -> Option<BudId> {
        self.by_lnum.get(&lnum).copied()
    }

    /// 是否包含该 LEB
    pub fn contains(&self, lnum: u32) -> bool {
        self.by_lnum.contains_key(&lnum)
    }

    /// 通过句柄获取 bud
    pub fn get(&self, id: BudId) -> Option<&BudDescriptor> {
        self.slots.get(id).and_then(|s| s.as_ref()).map(|s| &s.bud)
    }

    /// 通过句柄获取可变 bud
    ///
    /// 调用者不得修改 `lnum`，否则索引失效
    pub fn get_mut(&mut self, id: BudId) -> Option<&mut BudDescriptor> {
        self.slots
            .get_mut(id)
            .and_then(|s| s.as_mut())
            .map(|s| &mut s.bud)
    }

    /// 为下一次 [`insert`](Self::insert) 预留槽位
    ///
    /// 失败时返回 `ErrorKind::NoMemory`，注册表不变
    pub fn reserve(&mut self) -> Result<()> {
        if self.free_slots.is_empty() {
            self.slots.try_reserve(1)?;
        }
        Ok(())
    }

    /// 插入 bud
    ///
    /// # 返回
    ///
    /// 成功返回句柄；LEB 已存在返回 `ErrorKind::Corrupted`，注册表不变
    pub fn insert(&mut self, bud: BudDescriptor) -> Result<BudId> {
        if self.by_lnum.contains_key(&bud.lnum) {
            return Err(Error::new(ErrorKind::Corrupted, "Duplicate bud LEB"));
        }

        let slot = Slot {
            bud,
            seq: self.next_seq,
        };
        self.next_seq += 1;

        let id = match self.free_slots.pop() {
            Some(id) => {
                self.slots[id] = Some(slot);
                id
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        };
        self.by_lnum.insert(bud.lnum, id);
        Ok(id)
    }

    /// 移除 bud
    ///
    /// # 返回
    ///
    /// 被移除的句柄和描述符；不存在返回 `None`
    pub fn remove(&mut self, lnum: u32) -> Option<(BudId, BudDescriptor)> {
        let id = self.by_lnum.remove(&lnum)?;
        let slot = self.slots[id].take()?;
        self.free_slots.push(id);
        Some((id, slot.bud))
    }

    /// bud 数量
    pub fn len(&self) -> usize {
        self.by_lnum.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.by_lnum.is_empty()
    }

    /// 按 LEB 编号升序遍历
    pub fn iter(&self) -> impl Iterator<Item = (BudId, &BudDescriptor)> + '_ {
        self.by_lnum
            .values()
            .filter_map(move |&id| self.get(id).map(|bud| (id, bud)))
    }

    /// 按注册顺序返回所有句柄
    pub fn by_age(&self) -> Vec<BudId> {
        let mut ids: Vec<(u64, BudId)> = self
            .by_lnum
            .values()
            .filter_map(|&id| self.slots[id].as_ref().map(|s| (s.seq, id)))
            .collect();
        ids.sort_unstable();
        ids.into_iter().map(|(_, id)| id).collect()
    }

    /// 清空
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free_slots.clear();
        self.by_lnum.clear();
    }

    /// 当前被占用的槽位数（包括不在索引中的陈旧槽位）
    pub(super) fn occupied_slots(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}
