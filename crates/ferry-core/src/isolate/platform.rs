//! Platform - isolate 群の配線と primary thread の決定
//!
//! # 学習ポイント
//! - Builder パターンによる capability の注入
//! - 「primary かどうか」を実行時チェックではなく配線で表現する
//!
//! Platform を作ったスレッドが primary thread になり、primary isolate が
//! その場で作られます。primary isolate だけがホストの async 計装に参加
//! するので、builder で渡した hooks は primary に配線され、secondary には
//! 常に [`NoopHooks`] が配線されます。

use std::sync::Arc;
use std::thread::ThreadId;

use thiserror::Error;

use crate::isolate::environment::IsolateEnvironment;
use crate::isolate::holder::IsolateHolder;
use crate::isolate::thread::spawn_service_thread;
use crate::ports::{
    AsyncHooks, DeepCopy, ExternalCopy, IdGenerator, NoopHooks, SystemClock, UlidGenerator,
};
use crate::typed::registry::OpRegistry;

/// SpawnError は isolate 生成時のエラー
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("failed to spawn isolate service thread: {0}")]
    Thread(#[from] std::io::Error),
}

struct Shared {
    primary_thread: ThreadId,
    copier: Arc<dyn ExternalCopy>,
    ids: Arc<dyn IdGenerator>,
}

/// PlatformBuilder は Platform の配線を組み立てる
///
/// # 使用例
/// ```ignore
/// let platform = Platform::builder()
///     .hooks(Arc::new(RecordingHooks::new(SystemClock)))
///     .build();
/// ```
pub struct PlatformBuilder {
    hooks: Arc<dyn AsyncHooks>,
    copier: Arc<dyn ExternalCopy>,
    ids: Arc<dyn IdGenerator>,
    primary_name: String,
    primary_ops: OpRegistry,
}

impl PlatformBuilder {
    fn new() -> Self {
        Self {
            hooks: Arc::new(NoopHooks),
            copier: Arc::new(DeepCopy),
            ids: Arc::new(UlidGenerator::new(SystemClock)),
            primary_name: "default".to_string(),
            primary_ops: OpRegistry::new(),
        }
    }

    /// primary isolate に配線する async hooks
    pub fn hooks(mut self, hooks: Arc<dyn AsyncHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// 値コピーサービス（全 isolate で共有）
    pub fn copier(mut self, copier: Arc<dyn ExternalCopy>) -> Self {
        self.copier = copier;
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn primary_name(mut self, name: impl Into<String>) -> Self {
        self.primary_name = name.into();
        self
    }

    /// primary isolate に常駐させる named operations
    pub fn primary_ops(mut self, ops: OpRegistry) -> Self {
        self.primary_ops = ops;
        self
    }

    /// Platform を構築。呼び出したスレッドが primary thread になる。
    pub fn build(self) -> Platform {
        let shared = Arc::new(Shared {
            primary_thread: std::thread::current().id(),
            copier: self.copier,
            ids: self.ids,
        });
        let env = IsolateEnvironment::create(
            shared.ids.generate_isolate_id(),
            self.primary_name,
            true,
            shared.primary_thread,
            self.hooks,
            Arc::clone(&shared.copier),
            self.primary_ops,
        );
        let primary = IsolateHolder::new(env);
        Platform { shared, primary }
    }
}

/// A cluster of isolates sharing one primary thread and one set of
/// capabilities.
pub struct Platform {
    shared: Arc<Shared>,
    primary: IsolateHolder,
}

impl Platform {
    pub fn builder() -> PlatformBuilder {
        PlatformBuilder::new()
    }

    /// デフォルト配線（NoopHooks / DeepCopy / UlidGenerator）
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// The primary isolate's holder.
    pub fn primary(&self) -> &IsolateHolder {
        &self.primary
    }

    pub fn is_primary_thread(&self) -> bool {
        std::thread::current().id() == self.shared.primary_thread
    }

    /// Create a secondary isolate with its own service thread.
    pub fn spawn_isolate(&self, name: &str) -> Result<IsolateHolder, SpawnError> {
        self.spawn_isolate_with_ops(name, OpRegistry::new())
    }

    /// Create a secondary isolate with named operations pre-registered.
    pub fn spawn_isolate_with_ops(
        &self,
        name: &str,
        ops: OpRegistry,
    ) -> Result<IsolateHolder, SpawnError> {
        let env = IsolateEnvironment::create(
            self.shared.ids.generate_isolate_id(),
            name,
            false,
            self.shared.primary_thread,
            Arc::new(NoopHooks),
            Arc::clone(&self.shared.copier),
            ops,
        );
        let holder = IsolateHolder::new(Arc::clone(&env));
        spawn_service_thread(env)?;
        Ok(holder)
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creating_thread_is_the_primary_thread() {
        let platform = Platform::new();
        assert!(platform.is_primary_thread());

        let primary = platform.primary().get().unwrap();
        assert!(primary.is_primary());
        assert!(primary.is_primary_thread());
        assert_eq!(primary.name(), "default");
    }

    #[test]
    fn other_threads_are_not_primary() {
        let platform = Platform::new();
        let env = platform.primary().get().unwrap();

        std::thread::spawn(move || {
            assert!(!env.is_primary_thread());
        })
        .join()
        .unwrap();
    }

    #[test]
    fn spawned_isolates_are_secondary() {
        let platform = Platform::new();
        let worker = platform.spawn_isolate("worker").unwrap();

        let env = worker.get().unwrap();
        assert!(!env.is_primary());
        assert_eq!(env.name(), "worker");
        assert_ne!(env.id(), platform.primary().id());
    }
}
