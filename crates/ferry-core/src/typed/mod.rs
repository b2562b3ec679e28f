//! Typed - 型付き Operation API
//!
//! このモジュールは operation 名の typo を型で排除し、入出力の形を
//! コンパイル時に対応付けます。
//!
//! # 二層構造
//! - **表層（Typed）**: `Operation` trait - 型安全（`const NAME` + 入出力型）
//! - **内部（Dyn）**: `DynOperation` trait - object-safe, type erasure
//!
//! 呼び出し側は [`invoke_async`] / [`invoke_sync`] / [`invoke_ignored`] で
//! 名前と serde 値だけを渡し、あとは 3 フェーズプロトコルが運びます。

pub mod codec;
pub mod invoke;
pub mod registry;

// 主要な trait/型 を再エクスポート
pub use self::codec::{CodecError, PayloadCodec};
pub use self::invoke::{InvokeTask, invoke_async, invoke_ignored, invoke_sync};
pub use self::registry::{DynOperation, OpRegistry, Operation, RegistryError};
