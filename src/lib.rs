//! ubifs_log: UBIFS bud 日志的纯 Rust 实现
//!
//! 这是 UBIFS journal 中 bud 记录部分的内存实现，提供：
//! - **按 LEB 编号有序**的 bud 注册表
//! - **每个 journal head** 的 bud 追加顺序
//! - 与实际 flash 状态严格同步的 **bud_bytes** 计数
//! - 单锁保护的 **原子** 登记与释放
//!
//! # 示例
//!
//! ```rust,ignore
//! use ubifs_log::{BudLog, LogConfig, LebDevice, jhead, BASEHD, Result};
//!
//! fn main() -> Result<()> {
//!     let config = LogConfig::default();
//!
//!     // 挂载：回放期间登记扫描到的 bud
//!     let log = BudLog::replaying(&config)?;
//!     // ... replay ...
//!     log.finish_replay()?;
//!
//!     // 写者打开新 bud（先做 flash I/O，再登记）
//!     let mut volume = MyVolume::open()?;
//!     jhead::open_bud(&log, &mut volume, BASEHD, 42, 0)?;
//!
//!     // 查找
//!     assert!(log.search_bud(42).is_some());
//!
//!     Ok(())
//! }
//! ```
//!
//! # 模块结构
//!
//! - [`error`] - 错误类型定义
//! - [`consts`] - 常量定义
//! - [`config`] - 挂载配置和几何参数
//! - [`flash`] - LEB 设备接口
//! - [`bud`] - bud 日志
//! - [`jhead`] - journal head 写者侧操作

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]

extern crate alloc;

#[cfg(any(test, feature = "std"))]
extern crate std;

// ===== 核心模块 =====

/// 错误处理
pub mod error;

/// 常量定义
pub mod consts;

/// 挂载配置
pub mod config;

/// LEB 设备接口
pub mod flash;

/// bud 日志
pub mod bud;

/// Journal head 操作
pub mod jhead;

// ===== 公共导出 =====

// 错误处理
pub use error::{Error, ErrorKind, Result};

// 常量
pub use consts::{BASEHD, DATAHD, GCHD};

// 配置
pub use config::{LogConfig, LogGeometry, MountFlags};

// Flash
pub use flash::LebDevice;

// bud 日志
pub use bud::{BudDescriptor, BudId, BudLog, CommitOutcome, JournalPressure, WbufPos};
