//! ferry-core
//!
//! Cross-isolate task protocol: a caller inside one isolate asks for work
//! inside another isolate and receives the result back as a settled pending
//! result — even when the target runs on another thread, throws, or is
//! disposed mid-flight.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, value, error, stack）
//! - **ports**: 抽象化レイヤー（ExternalCopy, AsyncHooks, Clock, IdGenerator）
//! - **isolate**: 実行コンテキスト（platform, environment, holder, queue, lock）
//! - **protocol**: 3 フェーズプロトコル本体（run_async / run_ignored / run_sync）
//! - **typed**: 型付き Operation API（registry, codec, invoke）
//!
//! # 最小の使用例
//! ```ignore
//! let platform = Platform::new();
//! let caller = platform.primary().get().unwrap();
//! let worker = platform.spawn_isolate("worker")?;
//!
//! let pending = caller.enter(|scope| {
//!     run_async(
//!         FnTask::new(|_| Ok(()))
//!             .with_finish(|scope| Ok(scope.local_value(serde_json::json!(4)))),
//!         scope,
//!         &worker,
//!     )
//! })?;
//! let value = pending.wait_timeout(&caller, timeout).unwrap()?;
//! ```

pub mod domain;
pub mod isolate;
pub mod ports;
pub mod protocol;
pub mod typed;

pub use self::domain::{
    AsyncOpId, IsolateId, LocalError, LocalValue, PortableError, PortableValue, StackTrace, TaskId,
};
pub use self::isolate::{
    ContextScope, IsolateEnvironment, IsolateHolder, IsolateStats, Platform, PlatformBuilder,
    RemoteHandle, ScheduledUnit, SpawnError,
};
pub use self::protocol::{
    FnTask, PendingResult, ResultResolver, Settlement, ThreePhaseTask, pending_pair, run_async,
    run_ignored, run_sync,
};
pub use self::typed::{
    CodecError, InvokeTask, OpRegistry, Operation, PayloadCodec, RegistryError, invoke_async,
    invoke_ignored, invoke_sync,
};
