//! Isolate - 実行コンテキストのライフサイクルとスケジューリング
//!
//! このモジュールはプロトコルが依存する「context lifecycle collaborator」の
//! in-memory 実装です:
//!
//! - **platform**: isolate 群の配線（primary thread、capability 注入）
//! - **environment**: 1 isolate 分の実行環境（queue, lock, microtasks, globals）
//! - **holder**: weak で revivable な isolate 参照 + `schedule_task`
//! - **queue**: 2 レーンのタスクキューと close/drain セマンティクス
//! - **executor_lock**: 再入対応の排他ロック
//! - **remotes**: isolate に根を張る cross-thread handle
//! - **stats**: カウンタ（observability hook）
//!
//! スレッドモデル: secondary isolate は専用サービススレッド、primary は
//! platform を作ったスレッドが `pump` で回す。

pub mod environment;
pub mod executor_lock;
pub mod holder;
pub mod platform;
pub mod queue;
pub mod remotes;
pub mod stats;
mod thread;

// 主要な型を再エクスポート
pub use self::environment::{ContextScope, IsolateEnvironment, Microtask};
pub use self::holder::IsolateHolder;
pub use self::platform::{Platform, PlatformBuilder, SpawnError};
pub use self::queue::ScheduledUnit;
pub use self::remotes::RemoteHandle;
pub use self::stats::IsolateStats;
