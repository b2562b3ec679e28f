//! AsyncHooks port - async 計装の抽象化
//!
//! ホスト側の async 計装モデル（init / before / after / destroy）への
//! インターフェースです。primary isolate だけが計装に参加します。これは
//! 実行時の型チェックではなく、注入する実装で表現します:
//! primary には本物の実装、secondary には [`NoopHooks`] を配線します。
//!
//! # 実装
//! - **NoopHooks**: 何もしない（secondary isolate 用のデフォルト）
//! - **RecordingHooks**: イベントを記録（テスト・診断用）

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::AsyncOpId;
use crate::ports::clock::Clock;
use crate::ports::id_generator::{IdGenerator, UlidGenerator};

/// AsyncHooks は論理的な async 操作のブラケットを通知
///
/// - `init`: 操作の開始。計装に参加しない実装は `None` を返す
/// - `before` / `after`: 操作に属するコールバックの入退場
/// - `destroy`: 操作の終了
pub trait AsyncHooks: Send + Sync {
    fn init(&self) -> Option<AsyncOpId>;

    fn before(&self, id: AsyncOpId);

    fn after(&self, id: AsyncOpId);

    fn destroy(&self, id: AsyncOpId);
}

/// NoopHooks は計装に参加しない isolate 用
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl AsyncHooks for NoopHooks {
    fn init(&self) -> Option<AsyncOpId> {
        None
    }

    fn before(&self, _id: AsyncOpId) {}

    fn after(&self, _id: AsyncOpId) {}

    fn destroy(&self, _id: AsyncOpId) {}
}

/// 記録されるイベントの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookEventKind {
    Init,
    Before,
    After,
    Destroy,
}

/// 1 件の計装イベント
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookEvent {
    pub at: DateTime<Utc>,
    pub op: AsyncOpId,
    pub kind: HookEventKind,
}

/// RecordingHooks はイベント列を記録する実装
///
/// テストでは `events()` で記録を取り出し、init/destroy の対応や
/// before/after の入れ子を検証します。
pub struct RecordingHooks<C: Clock + Clone> {
    clock: C,
    ids: UlidGenerator<C>,
    events: Mutex<Vec<HookEvent>>,
}

impl<C: Clock + Clone> RecordingHooks<C> {
    pub fn new(clock: C) -> Self {
        Self {
            ids: UlidGenerator::new(clock.clone()),
            clock,
            events: Mutex::new(Vec::new()),
        }
    }

    /// 記録済みイベントのスナップショット
    pub fn events(&self) -> Vec<HookEvent> {
        self.events.lock().expect("hook event log poisoned").clone()
    }

    fn record(&self, op: AsyncOpId, kind: HookEventKind) {
        self.events
            .lock()
            .expect("hook event log poisoned")
            .push(HookEvent {
                at: self.clock.now(),
                op,
                kind,
            });
    }
}

impl<C: Clock + Clone> AsyncHooks for RecordingHooks<C> {
    fn init(&self) -> Option<AsyncOpId> {
        let id = self.ids.generate_async_op_id();
        self.record(id, HookEventKind::Init);
        Some(id)
    }

    fn before(&self, id: AsyncOpId) {
        self.record(id, HookEventKind::Before);
    }

    fn after(&self, id: AsyncOpId) {
        self.record(id, HookEventKind::After);
    }

    fn destroy(&self, id: AsyncOpId) {
        self.record(id, HookEventKind::Destroy);
    }
}

/// CallbackScope は 1 回のコールバック実行を before/after で囲む RAII ガード
///
/// 注意: エラー処理のセットアップより**後**に開くこと。スコープを開く側が
/// 先にエラー捕捉を構えていないと、入れ子の計装がそれを覆い隠す構図になる。
pub struct CallbackScope<'a> {
    hooks: &'a dyn AsyncHooks,
    id: Option<AsyncOpId>,
}

impl<'a> CallbackScope<'a> {
    pub fn open(hooks: &'a dyn AsyncHooks, id: Option<AsyncOpId>) -> Self {
        if let Some(id) = id {
            hooks.before(id);
        }
        Self { hooks, id }
    }
}

impl Drop for CallbackScope<'_> {
    fn drop(&mut self) {
        if let Some(id) = self.id {
            self.hooks.after(id);
        }
    }
}
