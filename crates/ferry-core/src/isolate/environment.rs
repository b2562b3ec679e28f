//! IsolateEnvironment - 1 つの isolate の実行環境
//!
//! 各 isolate はタスクキュー、executor lock、マイクロタスクキュー、そして
//! 小さな binding table（isolate-local な状態）を持ちます。secondary
//! isolate は専用のサービススレッドがキューを回し、primary isolate は
//! platform を作ったスレッドが `pump` で回します。
//!
//! # Entering
//! isolate の中で何かを実行するには、その isolate をこのスレッドで
//! 「enter」する必要があります。`enter` は executor lock を取り、thread
//! local の entered スタックに積み、[`ContextScope`] を渡します。scope を
//! 受け取る API はすべて「その isolate が現在 active である」ことの証明と
//! して scope を使います。

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};
use std::thread::ThreadId;
use std::time::Duration;

use crate::domain::{IsolateId, LocalValue, StackTrace};
use crate::isolate::executor_lock::ExecutorLock;
use crate::isolate::holder::{HolderInner, IsolateHolder};
use crate::isolate::queue::{Step, TaskQueue};
use crate::isolate::stats::{IsolateStats, StatsCells};
use crate::ports::{AsyncHooks, ExternalCopy};
use crate::typed::registry::{DynOperation, OpRegistry};

/// A microtask: runs inside the isolate, after the unit that enqueued it.
pub type Microtask = Box<dyn FnOnce(&ContextScope<'_>) + Send + 'static>;

thread_local! {
    static ENTERED: RefCell<Vec<Arc<IsolateEnvironment>>> = RefCell::new(Vec::new());
}

/// One isolated execution environment.
pub struct IsolateEnvironment {
    id: IsolateId,
    name: String,
    primary: bool,
    primary_thread: ThreadId,
    queue: TaskQueue,
    lock: ExecutorLock,
    globals: Mutex<HashMap<String, serde_json::Value>>,
    microtasks: Mutex<VecDeque<Microtask>>,
    stats: StatsCells,
    disposed: AtomicBool,
    hooks: Arc<dyn AsyncHooks>,
    copier: Arc<dyn ExternalCopy>,
    // built before the isolate starts, immutable afterwards (no locks)
    ops: OpRegistry,
    holder: OnceLock<Weak<HolderInner>>,
    self_ref: OnceLock<Weak<IsolateEnvironment>>,
}

impl IsolateEnvironment {
    pub(crate) fn create(
        id: IsolateId,
        name: impl Into<String>,
        primary: bool,
        primary_thread: ThreadId,
        hooks: Arc<dyn AsyncHooks>,
        copier: Arc<dyn ExternalCopy>,
        ops: OpRegistry,
    ) -> Arc<Self> {
        let env = Arc::new(Self {
            id,
            name: name.into(),
            primary,
            primary_thread,
            queue: TaskQueue::new(),
            lock: ExecutorLock::new(),
            globals: Mutex::new(HashMap::new()),
            microtasks: Mutex::new(VecDeque::new()),
            stats: StatsCells::default(),
            disposed: AtomicBool::new(false),
            hooks,
            copier,
            ops,
            holder: OnceLock::new(),
            self_ref: OnceLock::new(),
        });
        let _ = env.self_ref.set(Arc::downgrade(&env));
        env
    }

    fn shared(&self) -> Arc<IsolateEnvironment> {
        self.self_ref
            .get()
            .and_then(Weak::upgrade)
            .expect("environment self reference lost")
    }

    pub fn id(&self) -> IsolateId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }

    /// Is the calling thread the platform's designated primary thread?
    pub fn is_primary_thread(&self) -> bool {
        std::thread::current().id() == self.primary_thread
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_disposed(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }

    pub fn stats(&self) -> IsolateStats {
        self.stats.snapshot()
    }

    pub(crate) fn stats_cells(&self) -> &StatsCells {
        &self.stats
    }

    pub(crate) fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    pub(crate) fn executor_lock(&self) -> &ExecutorLock {
        &self.lock
    }

    pub(crate) fn attach_holder(&self, holder: Weak<HolderInner>) {
        let _ = self.holder.set(holder);
    }

    /// The isolate currently entered on this thread, if any.
    pub fn current() -> Option<Arc<IsolateEnvironment>> {
        ENTERED.with(|stack| stack.borrow().last().cloned())
    }

    /// Enter this isolate on the calling thread: take the executor lock,
    /// make the isolate current, and run `f` with the scope as witness.
    pub fn enter<R>(&self, f: impl FnOnce(&ContextScope<'_>) -> R) -> R {
        let _lock = self.lock.lock();
        ENTERED.with(|stack| stack.borrow_mut().push(self.shared()));
        let _pop = EnterGuard;
        let scope = ContextScope { env: self };
        f(&scope)
    }

    /// Service one queue step, waiting up to `timeout`. Returns whether a
    /// unit ran or a drain made progress. Used to drive the primary isolate.
    pub fn pump(&self, timeout: Duration) -> bool {
        match self.queue.next(Some(timeout)) {
            Step::Run(unit) => {
                self.enter(|scope| unit.run(scope));
                true
            }
            Step::Drain { discards, run } => {
                self.stats
                    .discarded
                    .fetch_add(discards.len() as u64, Ordering::Relaxed);
                drop(discards);
                if let Some(unit) = run {
                    self.enter(|scope| unit.run(scope));
                }
                true
            }
            Step::Idle | Step::Terminated => false,
        }
    }

    /// Blocking service loop for secondary isolates.
    pub(crate) fn service_loop(self: Arc<Self>) {
        loop {
            match self.queue.next(None) {
                Step::Run(unit) => self.enter(|scope| unit.run(scope)),
                Step::Drain { discards, run } => {
                    self.stats
                        .discarded
                        .fetch_add(discards.len() as u64, Ordering::Relaxed);
                    drop(discards);
                    if let Some(unit) = run {
                        self.enter(|scope| unit.run(scope));
                    }
                }
                Step::Idle => {}
                Step::Terminated => break,
            }
        }
    }
}

struct EnterGuard;

impl Drop for EnterGuard {
    fn drop(&mut self) {
        ENTERED.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Witness that an isolate is entered on the current thread.
///
/// Every operation that is only valid "inside" an isolate takes a scope.
/// The scope cannot be sent anywhere (it borrows the entered environment),
/// so holding one is proof of being on the right thread with the executor
/// lock held.
pub struct ContextScope<'a> {
    env: &'a IsolateEnvironment,
}

impl ContextScope<'_> {
    pub fn isolate_id(&self) -> IsolateId {
        self.env.id
    }

    pub fn name(&self) -> &str {
        &self.env.name
    }

    pub fn is_primary(&self) -> bool {
        self.env.primary
    }

    pub fn hooks(&self) -> Arc<dyn AsyncHooks> {
        Arc::clone(&self.env.hooks)
    }

    pub fn copier(&self) -> Arc<dyn ExternalCopy> {
        Arc::clone(&self.env.copier)
    }

    /// Look up a named operation registered with this isolate.
    pub fn operation(&self, name: &str) -> Option<Arc<dyn DynOperation>> {
        self.env.ops.get(name)
    }

    /// A holder for this isolate (the revivable re-entry handle).
    pub fn holder(&self) -> IsolateHolder {
        self.env
            .holder
            .get()
            .and_then(Weak::upgrade)
            .map(IsolateHolder::from_inner)
            .expect("isolate has no live holder")
    }

    /// Wrap a JSON value as a value of this isolate.
    pub fn local_value(&self, value: serde_json::Value) -> LocalValue {
        LocalValue::new(self.env.id, value)
    }

    /// Checked access to a local value (must belong to this isolate).
    pub fn open<'v>(&self, value: &'v LocalValue) -> &'v serde_json::Value {
        value.open_in(self.env.id)
    }

    pub fn global_get(&self, key: &str) -> Option<serde_json::Value> {
        self.env
            .globals
            .lock()
            .expect("binding table poisoned")
            .get(key)
            .cloned()
    }

    pub fn global_set(&self, key: &str, value: serde_json::Value) {
        self.env
            .globals
            .lock()
            .expect("binding table poisoned")
            .insert(key.to_string(), value);
    }

    /// Snapshot the logical call stack: one frame per isolate entered on
    /// this thread, innermost first.
    pub fn capture_stack(&self) -> StackTrace {
        let frames = ENTERED.with(|stack| {
            stack
                .borrow()
                .iter()
                .rev()
                .map(|env| format!("at {} ({})", env.name, env.id))
                .collect()
        });
        StackTrace::from_frames(frames)
    }

    pub fn enqueue_microtask(&self, job: Microtask) {
        self.env
            .microtasks
            .lock()
            .expect("microtask queue poisoned")
            .push_back(job);
    }

    /// Drain the microtask queue. Microtasks enqueued while draining run in
    /// the same pass.
    pub fn run_microtasks(&self) {
        loop {
            let job = self
                .env
                .microtasks
                .lock()
                .expect("microtask queue poisoned")
                .pop_front();
            let Some(job) = job else { break };
            job(self);
            self.env.stats.microtasks.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// End-of-task bookkeeping: drain microtasks, bump the completion count.
    pub fn task_epilogue(&self) {
        self.run_microtasks();
        self.env.stats.completed.fetch_add(1, Ordering::Relaxed);
    }
}
