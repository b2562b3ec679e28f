//! Domain model (IDs, values, errors, stack snapshots).
//!
//! - **ids**: phantom-typed ULID identifiers
//! - **value**: `LocalValue` / `PortableValue`（isolate 内の値とその可搬コピー）
//! - **error**: `LocalError` / `PortableError` とスタック連結
//! - **stack**: 呼び出し時点のスタックスナップショット

pub mod error;
pub mod ids;
pub mod stack;
pub mod value;

pub use self::error::{LocalError, PortableError};
pub use self::ids::{AsyncOpId, Id, IdMarker, IsolateId, TaskId};
pub use self::stack::StackTrace;
pub use self::value::{LocalValue, PortableValue};
