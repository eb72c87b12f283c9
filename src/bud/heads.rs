//! Journal head 的 bud 链表
//!
//! 对应 UBIFS 的 `c->jheads[i].buds_list`

use super::BudId;
use crate::error::Result;
use alloc::collections::VecDeque;
use alloc::vec::Vec;

/// 每个 journal head 的 bud 追加顺序
///
/// - `buds_list`: 使用 `VecDeque<BudId>` 替代 `list_head`
/// - 链表尾部是该 head 当前正在写入的 bud
#[derive(Debug, Clone)]
pub struct HeadLists {
    lists: Vec<VecDeque<BudId>>,
}

impl HeadLists {
    /// 为 `jhead_cnt` 个 head 创建空链表
    pub fn new(jhead_cnt: usize) -> Self {
        Self {
            lists: (0..jhead_cnt).map(|_| VecDeque::new()).collect(),
        }
    }

    /// head 数量
    pub fn jhead_cnt(&self) -> usize {
        self.lists.len()
    }

    /// 为一次 [`append`](Self::append) 预留空间
    ///
    /// `jhead` 必须小于 [`jhead_cnt`](Self::jhead_cnt)
    pub fn reserve(&mut self, jhead: usize) -> Result<()> {
        self.lists[jhead].try_reserve(1)?;
        Ok(())
    }

    /// 追加到 head 链表尾部
    pub fn append(&mut self, jhead: usize, id: BudId) {
        self.lists[jhead].push_back(id);
    }

    /// head 当前的 bud（链表尾部）
    pub fn tail(&self, jhead: usize) -> Option<BudId> {
        self.lists.get(jhead).and_then(|l| l.back().copied())
    }

    /// 从 head 链表中摘除
    ///
    /// # 返回
    ///
    /// 是否找到并摘除
    pub fn remove(&mut self, jhead: usize, id: BudId) -> bool {
        let Some(list) = self.lists.get_mut(jhead) else {
            return false;
        };
        match list.iter().position(|&x| x == id) {
            Some(pos) => {
                list.remove(pos);
                true
            }
            None => false,
        }
    }

    /// head 链表长度
    pub fn len(&self, jhead: usize) -> usize {
        self.lists.get(jhead).map_or(0, |l| l.len())
    }

    /// 所有 head 链表总长度
    pub fn total(&self) -> usize {
        self.lists.iter().map(|l| l.len()).sum()
    }

    /// 按追加顺序遍历 head 链表
    pub fn iter(&self, jhead: usize) -> impl Iterator<Item = BudId> + '_ {
        self.lists.get(jhead).into_iter().flat_map(|l| l.iter().copied())
    }

    /// 清空所有链表
    pub fn clear(&mut self) {
        for list in &mut self.lists {
            list.clear();
        }
    }
}
