//! bud 释放
//!
//! 对应 UBIFS `log.c` 中提交结束时的 `remove_buds()`。
//! 注册表移除、head 链表摘除和 `bud_bytes` 扣减在一次持锁中完成，
//! 与 [`BudLog::add_bud()`] 对称。

use super::{bud_log::Phase, BudDescriptor, BudId, BudLog};
use crate::{
    error::{Error, ErrorKind, Result},
    jhead::jhead_name,
};
use alloc::vec::Vec;

/// journal head 写缓冲的位置
///
/// 对应 UBIFS `struct ubifs_wbuf` 的 `lnum` / `offs`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WbufPos {
    /// 写缓冲所在 LEB，`None` 表示该 head 当前没有 LEB
    pub lnum: Option<u32>,
    /// 下一次写入的偏移
    pub offs: u32,
}

impl WbufPos {
    /// 写缓冲位于 `lnum:offs`
    pub const fn at(lnum: u32, offs: u32) -> Self {
        Self {
            lnum: Some(lnum),
            offs,
        }
    }

    /// 没有 LEB 的写缓冲
    pub const fn none() -> Self {
        Self { lnum: None, offs: 0 }
    }
}

/// 提交结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitOutcome {
    /// 被释放的 bud，按 LEB 编号升序，调用者负责 unmap
    pub released: Vec<BudDescriptor>,
    /// 从 `bud_bytes` 中扣减的字节数
    pub freed_bytes: u64,
}

impl BudLog {
    /// 释放单个 bud
    ///
    /// # 返回
    ///
    /// - 成功返回被释放的描述符
    /// - `ErrorKind::NotFound` - LEB 不是 bud
    /// - `ErrorKind::Corrupted` - bud 不在它的 head 链表中，或计数不足
    pub fn release_bud(&self, lnum: u32) -> Result<BudDescriptor> {
        let leb_size = self.geometry().leb_size;
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let id = inner
            .registry
            .id_of(lnum)
            .ok_or(Error::new(ErrorKind::NotFound, "LEB is not a bud"))?;
        let bud = *inner
            .registry
            .get(id)
            .ok_or(Error::new(ErrorKind::Corrupted, "Stale bud handle"))?;

        if let Some(heads) = inner.phase.heads() {
            if !heads.iter(bud.jhead).any(|x| x == id) {
                log::error!(
                    "[BUD] LEB {} missing from jhead {}",
                    lnum,
                    jhead_name(bud.jhead)
                );
                return Err(Error::new(
                    ErrorKind::Corrupted,
                    "Bud missing from its journal head",
                ));
            }
        }

        // 计数先行：失败时结构不变
        inner.bud_bytes.release(bud.bytes(leb_size))?;
        if let Some(heads) = inner.phase.heads_mut() {
            heads.remove(bud.jhead, id);
        }
        inner.registry.remove(lnum);

        log::debug!(
            "[BUD] released bud LEB {}:{}, jhead {}, bud_bytes {}",
            bud.lnum,
            bud.start,
            jhead_name(bud.jhead),
            inner.bud_bytes.get()
        );
        Ok(bud)
    }

    /// 提交完成后清理 bud
    ///
    /// 对应 UBIFS 的 `remove_buds()`
    ///
    /// # 参数
    ///
    /// * `wbufs` - 每个 head 写缓冲的位置，长度必须等于 head 数量
    ///
    /// # 规则
    ///
    /// - 写缓冲所在的 bud 保留（还要继续写），`start` 移到写缓冲偏移
    /// - 其余 bud 全部释放
    ///
    /// 所有检查在修改之前完成，出错时状态不变。
    pub fn commit_buds(&self, wbufs: &[WbufPos]) -> Result<CommitOutcome> {
        let leb_size = self.geometry().leb_size;
        if wbufs.len() != self.geometry().jhead_cnt {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "One write-buffer position per journal head required",
            ));
        }

        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        if !matches!(inner.phase, Phase::Active { .. }) {
            return Err(Error::new(ErrorKind::InvalidState, "Cannot commit during replay"));
        }

        let mut keep: Vec<(BudId, u32)> = Vec::new();
        let mut gone: Vec<(BudId, BudDescriptor)> = Vec::new();
        let mut freed: u64 = 0;

        for (id, bud) in inner.registry.iter() {
            let wbuf = wbufs[bud.jhead];
            if wbuf.lnum == Some(bud.lnum) {
                if wbuf.offs < bud.start || wbuf.offs > leb_size {
                    log::error!(
                        "[BUD] jhead {} wbuf offs {} outside bud LEB {}:{}",
                        jhead_name(bud.jhead),
                        wbuf.offs,
                        bud.lnum,
                        bud.start
                    );
                    return Err(Error::new(
                        ErrorKind::InvalidInput,
                        "Write-buffer offset outside bud",
                    ));
                }
                freed += (wbuf.offs - bud.start) as u64;
                keep.push((id, wbuf.offs));
            } else {
                freed += bud.bytes(leb_size);
                gone.push((id, *bud));
            }
        }

        inner.bud_bytes.release(freed)?;

        for (id, offs) in keep {
            if let Some(bud) = inner.registry.get_mut(id) {
                bud.start = offs;
            }
        }

        let mut released = Vec::with_capacity(gone.len());
        for (id, bud) in gone {
            if let Some(heads) = inner.phase.heads_mut() {
                heads.remove(bud.jhead, id);
            }
            inner.registry.remove(bud.lnum);
            released.push(bud);
        }

        log::info!(
            "[BUD] commit released {} buds, freed {} bytes, bud_bytes {}",
            released.len(),
            freed,
            inner.bud_bytes.get()
        );

        Ok(CommitOutcome {
            released,
            freed_bytes: freed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LogConfig, MountFlags};

    fn new_log(flags: MountFlags) -> BudLog {
        let config = LogConfig {
            leb_size: 2048,
            min_io_size: 8,
            jhead_cnt: 2,
            log_lebs: 4,
            max_bud_bytes: 16 * 2048,
            flags,
        };
        BudLog::new(&config).unwrap()
    }

    #[test]
    fn test_release_bud() {
        let log = new_log(MountFlags::empty());
        log.add_bud(BudDescriptor::new(5, 120, 0)).unwrap();
        log.add_bud(BudDescriptor::new(9, 0, 1)).unwrap();

        let bud = log.release_bud(5).unwrap();
        assert_eq!(bud, BudDescriptor::new(5, 120, 0));

        assert!(log.search_bud(5).is_none());
        assert!(log.head_buds(0).is_empty());
        assert!(log.current_bud(0).is_none());
        assert_eq!(log.bud_bytes(), 2048);
        assert!(log.search_bud(9).is_some());
        log.check().unwrap();
    }

    #[test]
    fn test_release_unknown() {
        let log = new_log(MountFlags::empty());
        let err = log.release_bud(42).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_release_then_add_again() {
        let log = new_log(MountFlags::empty());
        log.add_bud(BudDescriptor::new(5, 0, 0)).unwrap();
        log.release_bud(5).unwrap();
        log.add_bud(BudDescriptor::new(5, 256, 1)).unwrap();

        assert_eq!(log.search_bud(5).unwrap().jhead, 1);
        assert_eq!(log.bud_bytes(), 2048 - 256);
        log.check().unwrap();
    }

    #[test]
    fn test_release_during_read_only_replay() {
        let mut config = LogConfig {
            leb_size: 2048,
            min_io_size: 8,
            jhead_cnt: 2,
            log_lebs: 4,
            max_bud_bytes: 16 * 2048,
            flags: MountFlags::RO_MOUNT,
        };
        config.flags |= MountFlags::RO_MEDIA;
        let log = BudLog::replaying(&config).unwrap();
        log.add_bud(BudDescriptor::new(3, 0, 0)).unwrap();

        log.release_bud(3).unwrap();
        assert_eq!(log.bud_count(), 0);
        assert_eq!(log.bud_bytes(), 0);
    }

    #[test]
    fn test_commit_keeps_wbuf_buds() {
        let log = new_log(MountFlags::empty());
        for lnum in [1, 2, 3] {
            log.add_bud(BudDescriptor::new(lnum, 0, 0)).unwrap();
        }
        log.add_bud(BudDescriptor::new(4, 64, 1)).unwrap();
        let before = log.bud_bytes();

        let outcome = log
            .commit_buds(&[WbufPos::at(3, 512), WbufPos::none()])
            .unwrap();

        let released: Vec<u32> = outcome.released.iter().map(|b| b.lnum).collect();
        assert_eq!(released, [1, 2, 4]);
        assert_eq!(log.bud_bytes(), 2048 - 512);
        assert_eq!(outcome.freed_bytes, before - log.bud_bytes());

        assert_eq!(log.current_bud(0), Some(BudDescriptor::new(3, 512, 0)));
        assert!(log.current_bud(1).is_none());
        assert_eq!(log.bud_count(), 1);
        log.check().unwrap();
    }

    #[test]
    fn test_commit_with_full_wbuf_leb() {
        let log = new_log(MountFlags::empty());
        log.add_bud(BudDescriptor::new(3, 0, 0)).unwrap();

        let outcome = log
            .commit_buds(&[WbufPos::at(3, 2048), WbufPos::none()])
            .unwrap();
        assert!(outcome.released.is_empty());
        assert_eq!(outcome.freed_bytes, 2048);

        assert_eq!(log.search_bud(3), Some(BudDescriptor::new(3, 2048, 0)));
        assert_eq!(log.bud_bytes(), 0);
        log.check().unwrap();

        // 下一次提交时该 LEB 不再是写缓冲，正常释放
        let outcome = log
            .commit_buds(&[WbufPos::at(7, 0), WbufPos::none()])
            .unwrap();
        assert_eq!(outcome.released, [BudDescriptor::new(3, 2048, 0)]);
        assert_eq!(outcome.freed_bytes, 0);
        assert_eq!(log.bud_count(), 0);
        log.check().unwrap();
    }

    #[test]
    fn test_commit_bad_offset_changes_nothing() {
        let log = new_log(MountFlags::empty());
        log.add_bud(BudDescriptor::new(1, 0, 0)).unwrap();
        log.add_bud(BudDescriptor::new(2, 1024, 1)).unwrap();
        let before = log.bud_bytes();

        let err = log
            .commit_buds(&[WbufPos::none(), WbufPos::at(2, 512)])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        assert_eq!(log.bud_bytes(), before);
        assert_eq!(log.bud_count(), 2);
        assert_eq!(log.search_bud(2).unwrap().start, 1024);
        log.check().unwrap();
    }

    #[test]
    fn test_commit_wrong_head_count() {
        let log = new_log(MountFlags::empty());
        let err = log.commit_buds(&[WbufPos::none()]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_commit_during_replay() {
        let config = LogConfig {
            leb_size: 2048,
            min_io_size: 8,
            jhead_cnt: 2,
            log_lebs: 4,
            max_bud_bytes: 16 * 2048,
            flags: MountFlags::empty(),
        };
        let log = BudLog::replaying(&config).unwrap();
        let err = log
            .commit_buds(&[WbufPos::none(), WbufPos::none()])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn test_commit_empty_log() {
        let log = new_log(MountFlags::empty());
        let outcome = log
            .commit_buds(&[WbufPos::none(), WbufPos::none()])
            .unwrap();
        assert_eq!(outcome, CommitOutcome::default());
    }
}
