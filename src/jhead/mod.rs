//! Journal head 写者侧操作
//!
//! 写者向某个 journal head 追加数据时，如果当前 bud 已满，需要打开新的
//! bud LEB。打开前先在 flash 上准备好 LEB（擦除或确认剩余空间为空），
//! 然后再登记到 [`BudLog`](crate::BudLog)，保证日志锁内没有 I/O。
//!
//! # 对应 UBIFS
//!
//! | UBIFS                           | ubifs_log         |
//! |---------------------------------|-------------------|
//! | `dbg_jhead()`                   | [`jhead_name()`]  |
//! | `ubifs_add_bud_to_log()` 的准备 | [`open_bud()`]    |

mod open;

pub use open::open_bud;

use crate::consts::{BASEHD, DATAHD, GCHD};

/// journal head 名称，用于日志输出
pub fn jhead_name(jhead: usize) -> &'static str {
    match jhead {
        GCHD => "0 (GC)",
        BASEHD => "1 (base)",
        DATAHD => "2 (data)",
        _ => "unknown journal head",
    }
}
