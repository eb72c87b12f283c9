//! 打开新 bud

use super::jhead_name;
use crate::{
    bud::{BudDescriptor, BudLog},
    consts::UBIFS_ERASED_BYTE,
    error::{Error, ErrorKind, Result},
    flash::{check_leb, LebDevice},
};
use alloc::vec;

/// 为 journal head 打开新的 bud
///
/// # 参数
///
/// * `log` - bud 日志
/// * `dev` - LEB 设备
/// * `jhead` - journal head
/// * `lnum` - 新 bud 的 LEB 编号
/// * `offs` - bud 数据起始偏移
///
/// # 流程
///
/// 1. 只读挂载或只读设备直接拒绝，检查 head 和 LEB 范围
/// 2. LEB 已经是 bud 时拒绝（在任何 I/O 之前）
/// 3. `offs == 0` 时擦除整个 LEB，否则确认 `[offs, leb_size)` 全为 0xFF
/// 4. 调用 [`BudLog::add_bud()`] 登记
///
/// # 并发
///
/// 查重和登记之间不持日志锁（擦除和读取不能在锁内进行）。
/// 调用者的 LEB 分配必须保证同一个 LEB 只交给一个写者；
/// 若两个写者竞争同一个 LEB，后到者的 [`BudLog::add_bud()`] 返回
/// `ErrorKind::Corrupted`，已登记的描述符不变，但它的擦除已经发生。
///
/// # 返回
///
/// 成功返回登记的描述符
pub fn open_bud<D: LebDevice>(
    log: &BudLog,
    dev: &mut D,
    jhead: usize,
    lnum: u32,
    offs: u32,
) -> Result<BudDescriptor> {
    if log.flags().is_read_only() || dev.is_read_only() {
        return Err(Error::new(ErrorKind::ReadOnly, "Cannot open bud on read-only volume"));
    }

    let leb_size = log.geometry().leb_size;
    if jhead >= log.geometry().jhead_cnt {
        return Err(Error::new(ErrorKind::InvalidInput, "Journal head out of range"));
    }
    if dev.leb_size() != leb_size {
        log::error!(
            "[JHEAD] device LEB size {} != log LEB size {}",
            dev.leb_size(),
            leb_size
        );
        return Err(Error::new(ErrorKind::InvalidInput, "Device LEB size mismatch"));
    }
    check_leb(&*dev, lnum, offs, 0)?;

    if log.search_bud(lnum).is_some() {
        log::error!("[JHEAD] LEB {} is already a bud", lnum);
        return Err(Error::new(ErrorKind::Corrupted, "Duplicate bud LEB"));
    }

    if offs == 0 {
        dev.erase_leb(lnum)?;
    } else {
        let mut buf = vec![0u8; (leb_size - offs) as usize];
        dev.read_leb(lnum, offs, &mut buf)?;
        if let Some(pos) = buf.iter().position(|&b| b != UBIFS_ERASED_BYTE) {
            log::error!(
                "[JHEAD] LEB {}:{} not empty at offset {}",
                lnum,
                offs,
                offs as usize + pos
            );
            return Err(Error::new(ErrorKind::Corrupted, "Free space of bud LEB is not empty"));
        }
    }

    let bud = BudDescriptor::new(lnum, offs, jhead);
    log.add_bud(bud)?;

    log::debug!(
        "[JHEAD] opened bud LEB {}:{} for jhead {}",
        lnum,
        offs,
        jhead_name(jhead)
    );
    Ok(bud)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LogConfig, MountFlags};
    use crate::consts::{BASEHD, DATAHD, GCHD};
    use alloc::vec::Vec;

    const LEB_SIZE: u32 = 2048;

    struct MockFlash {
        storage: Vec<Vec<u8>>,
        read_only: bool,
        erases: usize,
    }

    impl MockFlash {
        fn new(leb_count: usize) -> Self {
            Self {
                storage: vec![vec![UBIFS_ERASED_BYTE; LEB_SIZE as usize]; leb_count],
                read_only: false,
                erases: 0,
            }
        }
    }

    impl LebDevice for MockFlash {
        fn leb_size(&self) -> u32 {
            LEB_SIZE
        }

        fn leb_count(&self) -> u32 {
            self.storage.len() as u32
        }

        fn read_leb(&mut self, lnum: u32, offs: u32, buf: &mut [u8]) -> Result<usize> {
            check_leb(&*self, lnum, offs, buf.len() as u32)?;
            let start = offs as usize;
            buf.copy_from_slice(&self.storage[lnum as usize][start..start + buf.len()]);
            Ok(buf.len())
        }

        fn write_leb(&mut self, lnum: u32, offs: u32, buf: &[u8]) -> Result<usize> {
            check_leb(&*self, lnum, offs, buf.len() as u32)?;
            let start = offs as usize;
            self.storage[lnum as usize][start..start + buf.len()].copy_from_slice(buf);
            Ok(buf.len())
        }

        fn erase_leb(&mut self, lnum: u32) -> Result<()> {
            check_leb(&*self, lnum, 0, 0)?;
            self.storage[lnum as usize].fill(UBIFS_ERASED_BYTE);
            self.erases += 1;
            Ok(())
        }

        fn is_read_only(&self) -> bool {
            self.read_only
        }
    }

    fn test_config(flags: MountFlags) -> LogConfig {
        LogConfig {
            leb_size: LEB_SIZE,
            min_io_size: 8,
            jhead_cnt: 3,
            log_lebs: 4,
            max_bud_bytes: 16 * LEB_SIZE as u64,
            flags,
        }
    }

    #[test]
    fn test_open_erases_fresh_leb() {
        let log = BudLog::new(&test_config(MountFlags::empty())).unwrap();
        let mut flash = MockFlash::new(16);
        flash.write_leb(4, 0, &[0x31, 0x18, 0x10, 0x06]).unwrap();

        let bud = open_bud(&log, &mut flash, DATAHD, 4, 0).unwrap();
        assert_eq!(bud, BudDescriptor::new(4, 0, DATAHD));
        assert_eq!(flash.erases, 1);
        assert!(flash.storage[4].iter().all(|&b| b == UBIFS_ERASED_BYTE));

        assert_eq!(log.current_bud(DATAHD), Some(bud));
        assert_eq!(log.bud_bytes(), LEB_SIZE as u64);
    }

    #[test]
    fn test_open_mid_leb_checks_free_space() {
        let log = BudLog::new(&test_config(MountFlags::empty())).unwrap();
        let mut flash = MockFlash::new(16);
        flash.write_leb(6, 0, &[0u8; 512]).unwrap();

        let bud = open_bud(&log, &mut flash, BASEHD, 6, 512).unwrap();
        assert_eq!(bud.start, 512);
        assert_eq!(flash.erases, 0);
        assert_eq!(log.bud_bytes(), (LEB_SIZE - 512) as u64);
    }

    #[test]
    fn test_open_dirty_free_space_rejected() {
        let log = BudLog::new(&test_config(MountFlags::empty())).unwrap();
        let mut flash = MockFlash::new(16);
        flash.write_leb(6, 1000, &[0u8]).unwrap();

        let err = open_bud(&log, &mut flash, BASEHD, 6, 512).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corrupted);
        assert!(log.search_bud(6).is_none());
        assert_eq!(log.bud_bytes(), 0);
    }

    #[test]
    fn test_open_existing_bud_does_no_io() {
        let log = BudLog::new(&test_config(MountFlags::empty())).unwrap();
        let mut flash = MockFlash::new(16);
        open_bud(&log, &mut flash, BASEHD, 3, 0).unwrap();

        let err = open_bud(&log, &mut flash, DATAHD, 3, 0).unwrap_err();
        assert!(err.is_corruption());
        assert_eq!(flash.erases, 1);
        assert_eq!(log.bud_count(), 1);
    }

    /// 擦除时另一个写者抢先登记了同一个 LEB
    struct RacingFlash<'a> {
        inner: MockFlash,
        log: &'a BudLog,
        rival: BudDescriptor,
    }

    impl LebDevice for RacingFlash<'_> {
        fn leb_size(&self) -> u32 {
            self.inner.leb_size()
        }

        fn leb_count(&self) -> u32 {
            self.inner.leb_count()
        }

        fn read_leb(&mut self, lnum: u32, offs: u32, buf: &mut [u8]) -> Result<usize> {
            self.inner.read_leb(lnum, offs, buf)
        }

        fn write_leb(&mut self, lnum: u32, offs: u32, buf: &[u8]) -> Result<usize> {
            self.inner.write_leb(lnum, offs, buf)
        }

        fn erase_leb(&mut self, lnum: u32) -> Result<()> {
            self.log.add_bud(self.rival)?;
            self.inner.erase_leb(lnum)
        }
    }

    #[test]
    fn test_open_lost_race_is_detected() {
        let log = BudLog::new(&test_config(MountFlags::empty())).unwrap();
        let rival = BudDescriptor::new(5, 0, GCHD);
        let mut flash = RacingFlash {
            inner: MockFlash::new(16),
            log: &log,
            rival,
        };

        let err = open_bud(&log, &mut flash, BASEHD, 5, 0).unwrap_err();
        assert!(err.is_corruption());
        assert_eq!(log.search_bud(5), Some(rival));
        assert_eq!(log.bud_count(), 1);
        assert_eq!(log.bud_bytes(), LEB_SIZE as u64);
        assert!(log.head_buds(BASEHD).is_empty());
        log.check().unwrap();
    }

    #[test]
    fn test_open_read_only() {
        let log = BudLog::new(&test_config(MountFlags::RO_MOUNT)).unwrap();
        let mut flash = MockFlash::new(16);
        let err = open_bud(&log, &mut flash, BASEHD, 3, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ReadOnly);

        let log = BudLog::new(&test_config(MountFlags::empty())).unwrap();
        flash.read_only = true;
        let err = open_bud(&log, &mut flash, BASEHD, 3, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ReadOnly);
        assert_eq!(flash.erases, 0);
    }

    #[test]
    fn test_open_out_of_range() {
        let log = BudLog::new(&test_config(MountFlags::empty())).unwrap();
        let mut flash = MockFlash::new(4);

        let err = open_bud(&log, &mut flash, BASEHD, 4, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        let err = open_bud(&log, &mut flash, BASEHD, 1, LEB_SIZE + 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = open_bud(&log, &mut flash, 7, 1, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(flash.erases, 0);
        assert_eq!(log.bud_count(), 0);
    }
}
