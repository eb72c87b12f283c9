//! Flash 访问接口
//!
//! bud 日志本身不做任何 flash I/O。写者在打开新 bud 之前需要擦除 LEB
//! 或确认剩余空间已擦除，这些操作通过 [`LebDevice`] 完成（见 [`crate::jhead`]）。

mod device;

pub use device::{LebDevice, check_leb};
