//! bud 日志一致性检查
//!
//! 持锁重新计算 `bud_bytes` 并核对注册表与 head 链表。

use super::BudLog;
use crate::error::{Error, ErrorKind, Result};
use alloc::vec;

impl BudLog {
    /// 一致性检查
    ///
    /// 检查内容：
    ///
    /// 1. 每个 bud 的 `start` 不超过 LEB 大小，`bud_bytes` 等于所有 bud 的 `leb_size - start` 之和
    /// 2. 每个 bud 恰好出现在一个 head 链表中，且是它自己的 head
    /// 3. 链表中没有已释放的句柄，slab 中没有不在索引里的槽位
    ///
    /// 只读回放阶段没有 head 链表，跳过 2。
    ///
    /// # 返回
    ///
    /// 不一致时返回 `ErrorKind::Corrupted`
    pub fn check(&self) -> Result<()> {
        let leb_size = self.geometry().leb_size;
        let inner = self.inner.lock();

        let mut sum: u64 = 0;
        for (_, bud) in inner.registry.iter() {
            // 提交后写满的写缓冲 bud 允许 start == leb_size
            if bud.start > leb_size {
                log::error!("[BUD] LEB {}: start {} > LEB size", bud.lnum, bud.start);
                return Err(Error::new(ErrorKind::Corrupted, "Bud start beyond end of LEB"));
            }
            sum += bud.bytes(leb_size);
        }
        if sum != inner.bud_bytes.get() {
            log::error!(
                "[BUD] bud_bytes {} but buds occupy {}",
                inner.bud_bytes.get(),
                sum
            );
            return Err(Error::new(ErrorKind::Corrupted, "bud_bytes out of sync"));
        }

        if inner.registry.occupied_slots() != inner.registry.len() {
            log::error!("[BUD] stale bud slots");
            return Err(Error::new(ErrorKind::Corrupted, "Stale bud slots"));
        }

        let Some(heads) = inner.phase.heads() else {
            return Ok(());
        };

        if heads.total() != inner.registry.len() {
            log::error!(
                "[BUD] {} buds in heads, {} in registry",
                heads.total(),
                inner.registry.len()
            );
            return Err(Error::new(ErrorKind::Corrupted, "Head lists out of sync"));
        }

        let mut seen = vec![false; inner.registry.occupied_slots().max(1)];
        for jhead in 0..heads.jhead_cnt() {
            for id in heads.iter(jhead) {
                let Some(bud) = inner.registry.get(id) else {
                    log::error!("[BUD] jhead {} holds stale bud {}", jhead, id);
                    return Err(Error::new(ErrorKind::Corrupted, "Stale bud in journal head"));
                };
                if bud.jhead != jhead {
                    log::error!(
                        "[BUD] LEB {} of jhead {} linked to jhead {}",
                        bud.lnum,
                        bud.jhead,
                        jhead
                    );
                    return Err(Error::new(ErrorKind::Corrupted, "Bud on wrong journal head"));
                }
                if id >= seen.len() {
                    seen.resize(id + 1, false);
                }
                if seen[id] {
                    log::error!("[BUD] LEB {} linked twice", bud.lnum);
                    return Err(Error::new(ErrorKind::Corrupted, "Bud linked twice"));
                }
                seen[id] = true;
            }
        }

        Ok(())
    }
}
