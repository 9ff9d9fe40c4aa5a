//! Background dispatch for [`Manager`] operations.
//!
//! [`AsyncManager`] runs each manager operation on a tokio blocking thread
//! and hands the result to a completion callback. It holds only a [`Weak`]
//! reference to its manager: once the manager is dropped, every operation
//! that runs afterwards completes with
//! [`ManagerError::NotFound`]`("manager deallocated")` instead of silently
//! doing nothing.
//!
//! # Dispatch Modes
//!
//! | Mode | Execution | Completion order |
//! |------|-----------|------------------|
//! | [`DispatchMode::Concurrent`] (default) | each call on its own blocking task | unspecified |
//! | [`DispatchMode::Serial`] | one worker, one call at a time, in call order | call order |
//!
//! In both modes every call takes the manager's lock on its own, so each one
//! is individually consistent; only the serial mode orders calls against each
//! other.
//!
//! # Completion Contexts
//!
//! Completions run wherever the configured [`CompletionContext`] puts them:
//!
//! - [`Inline`] - on the worker thread right after the operation
//! - [`RuntimeContext`] - one at a time, in delivery order, on a task of a tokio runtime
//! - [`MainQueue`] - queued until the owning thread drains its [`MainLoop`]
//!
//! All three run completions in the order they are delivered, so serial mode
//! keeps call order whichever one is configured.
//!
//! Every callback is invoked exactly once. If the operation or its delivery
//! is dropped before it runs, typically because the runtime shut down, the
//! callback is invoked on the dropping thread with
//! [`ManagerError::NotFound`]`("async operation dropped")`.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use local_storage::{AnyStorage, AsyncManager, AsyncManagerConfig, JsonDecoder, JsonEncoder, Manager};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let manager = Arc::new(Manager::new([("users", AnyStorage::memory())]));
//! let config = AsyncManagerConfig::builder().build().unwrap();
//! let async_manager = AsyncManager::new(&manager, tokio::runtime::Handle::current(), config);
//!
//! let (tx, rx) = tokio::sync::oneshot::channel();
//! async_manager.append("users", "Karl".to_owned(), JsonEncoder::new(), move |result| {
//!     let _ = tx.send(result);
//! });
//! assert_eq!(rx.await.unwrap().unwrap(), "Karl");
//!
//! let users: Vec<String> = async_manager.perform(|m| m.all("users", &JsonDecoder::new())).await.unwrap();
//! assert_eq!(users, vec!["Karl".to_owned()]);
//! # }
//! ```

use std::{
    fmt,
    sync::{Arc, Weak},
};

use parking_lot::RwLock;
use tokio::{
    runtime::Handle,
    sync::{mpsc, oneshot},
};
use tracing::{trace, warn};

use crate::{
    backend_enum::AnyStorage,
    codec::{Decoder, Element, Encoder},
    error::{ConfigError, ManagerError, ManagerResult},
    lock::ReadWriteLock,
    manager::{Manager, Registry},
    storage::Storage,
};

/// Queue label used when none is configured.
pub const DEFAULT_LABEL: &str = "queue.async.storage";

/// Identifier reported once the manager behind an [`AsyncManager`] is gone.
pub const MANAGER_DEALLOCATED: &str = "manager deallocated";

/// Identifier reported when an operation or its completion is dropped unrun.
pub const OPERATION_DROPPED: &str = "async operation dropped";

/// A unit of work handed to a worker or a completion context.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// A completion callback that fires exactly once.
///
/// Dropping it without calling [`complete`](Self::complete) invokes the
/// callback with [`OPERATION_DROPPED`].
struct Completion<R> {
    callback: Option<Box<dyn FnOnce(ManagerResult<R>) + Send + 'static>>,
    operation: &'static str,
}

impl<R> Completion<R> {
    fn new(operation: &'static str, callback: impl FnOnce(ManagerResult<R>) + Send + 'static) -> Self {
        Self { callback: Some(Box::new(callback)), operation }
    }

    fn complete(mut self, result: ManagerResult<R>) {
        if let Some(callback) = self.callback.take() {
            callback(result);
        }
    }
}

impl<R> Drop for Completion<R> {
    fn drop(&mut self) {
        if let Some(callback) = self.callback.take() {
            warn!(operation = self.operation, "storage operation dropped before completing");
            callback(Err(ManagerError::not_found(OPERATION_DROPPED)));
        }
    }
}

// ───────────────────────────────────────────────────────────────────────────
// Configuration
// ───────────────────────────────────────────────────────────────────────────

/// How an [`AsyncManager`] schedules operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DispatchMode {
    /// One operation at a time, in call order. Completions follow call order
    /// with every shipped [`CompletionContext`].
    Serial,
    /// Operations may overlap. Completion order is not guaranteed, not even
    /// for two calls on the same identifier.
    #[default]
    Concurrent,
}

/// Configuration for an [`AsyncManager`].
///
/// # Validation
///
/// - `label` must not be blank
#[derive(Debug, Clone)]
pub struct AsyncManagerConfig {
    dispatch: DispatchMode,
    label: String,
}

impl Default for AsyncManagerConfig {
    fn default() -> Self {
        Self { dispatch: DispatchMode::default(), label: DEFAULT_LABEL.to_owned() }
    }
}

#[bon::bon]
impl AsyncManagerConfig {
    /// Creates a new async manager configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `label` is blank.
    #[builder]
    pub fn new(
        #[builder(default)] dispatch: DispatchMode,
        #[builder(default = DEFAULT_LABEL.to_owned(), into)] label: String,
    ) -> Result<Self, ConfigError> {
        if label.trim().is_empty() {
            return Err(ConfigError::invalid("label", "must not be blank"));
        }
        Ok(Self { dispatch, label })
    }

    /// Returns the dispatch mode.
    pub fn dispatch(&self) -> DispatchMode {
        self.dispatch
    }

    /// Returns the queue label.
    pub fn label(&self) -> &str {
        &self.label
    }
}

// ───────────────────────────────────────────────────────────────────────────
// Completion contexts
// ───────────────────────────────────────────────────────────────────────────

/// Where completion callbacks run.
pub trait CompletionContext: Send + Sync + 'static {
    /// Schedules `completion` to run once.
    fn deliver(&self, completion: Job);
}

/// Runs completions directly on the thread that finished the operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Inline;

impl CompletionContext for Inline {
    fn deliver(&self, completion: Job) {
        completion();
    }
}

/// Runs completions on a tokio runtime, one after another in delivery order.
///
/// A single task drains the queue, so two completions never overlap and
/// never swap places. Completions still queued when the runtime shuts down
/// are dropped, which reports [`OPERATION_DROPPED`] to their callbacks.
#[derive(Debug, Clone)]
pub struct RuntimeContext {
    tx: mpsc::UnboundedSender<Job>,
}

impl RuntimeContext {
    /// Starts the draining task on `runtime`.
    #[must_use]
    pub fn new(runtime: &Handle) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let _drain = runtime.spawn(async move {
            while let Some(completion) = rx.recv().await {
                completion();
            }
        });
        Self { tx }
    }
}

impl CompletionContext for RuntimeContext {
    fn deliver(&self, completion: Job) {
        if self.tx.send(completion).is_err() {
            warn!("completion runtime stopped, completion dropped");
        }
    }
}

/// Sending half of an application-owned completion queue.
///
/// Completions delivered here wait until the matching [`MainLoop`] is
/// drained, typically by the application's main thread.
#[derive(Debug, Clone)]
pub struct MainQueue {
    tx: mpsc::UnboundedSender<Job>,
}

/// Receiving half of a [`MainQueue`]; runs queued completions on the calling thread.
pub struct MainLoop {
    rx: mpsc::UnboundedReceiver<Job>,
}

/// Creates a connected [`MainQueue`] / [`MainLoop`] pair.
#[must_use]
pub fn main_queue() -> (MainQueue, MainLoop) {
    let (tx, rx) = mpsc::unbounded_channel();
    (MainQueue { tx }, MainLoop { rx })
}

impl CompletionContext for MainQueue {
    fn deliver(&self, completion: Job) {
        if self.tx.send(completion).is_err() {
            warn!("main loop dropped, completion dropped");
        }
    }
}

impl MainLoop {
    /// Runs every completion queued so far and returns how many ran.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(completion) = self.rx.try_recv() {
            completion();
            ran += 1;
        }
        ran
    }

    /// Waits for the next completion and runs it.
    ///
    /// Returns `false` once every [`MainQueue`] is dropped and the queue is empty.
    pub async fn run_next(&mut self) -> bool {
        match self.rx.recv().await {
            Some(completion) => {
                completion();
                true
            },
            None => false,
        }
    }

    /// Blocking variant of [`run_next`](Self::run_next) for threads outside any runtime.
    ///
    /// # Panics
    ///
    /// Panics if called from within an asynchronous execution context.
    pub fn block_on_next(&mut self) -> bool {
        match self.rx.blocking_recv() {
            Some(completion) => {
                completion();
                true
            },
            None => false,
        }
    }
}

impl fmt::Debug for MainLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MainLoop").field("queued", &self.rx.len()).finish()
    }
}

// ───────────────────────────────────────────────────────────────────────────
// Dispatcher
// ───────────────────────────────────────────────────────────────────────────

enum Dispatcher {
    Concurrent(Handle),
    Serial(mpsc::UnboundedSender<Job>),
}

impl Dispatcher {
    fn new(runtime: &Handle, mode: DispatchMode, label: &Arc<str>) -> Self {
        match mode {
            DispatchMode::Concurrent => Self::Concurrent(runtime.clone()),
            DispatchMode::Serial => {
                let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
                let label = Arc::clone(label);
                let _worker = runtime.spawn(async move {
                    while let Some(job) = rx.recv().await {
                        if let Err(e) = tokio::task::spawn_blocking(job).await {
                            warn!(queue = %label, error = %e, "storage job failed to complete");
                        }
                    }
                    trace!(queue = %label, "serial storage worker stopped");
                });
                Self::Serial(tx)
            },
        }
    }

    fn submit(&self, job: Job) {
        match self {
            Self::Concurrent(runtime) => {
                let _detached = runtime.spawn_blocking(job);
            },
            Self::Serial(tx) => {
                if let Err(mpsc::error::SendError(job)) = tx.send(job) {
                    // Worker is gone with its runtime; run here so the completion still fires.
                    warn!("serial storage worker stopped, running job on caller thread");
                    job();
                }
            },
        }
    }
}

// ───────────────────────────────────────────────────────────────────────────
// AsyncManager
// ───────────────────────────────────────────────────────────────────────────

/// Runs [`Manager`] operations in the background and reports through callbacks.
///
/// With the default [`DispatchMode::Concurrent`] two calls may complete in
/// either order, even when they target the same identifier. Use
/// [`DispatchMode::Serial`] when callers depend on call order.
pub struct AsyncManager<S = AnyStorage, L = RwLock<Registry<S>>> {
    manager: Weak<Manager<S, L>>,
    dispatcher: Dispatcher,
    completion: Arc<dyn CompletionContext>,
    label: Arc<str>,
}

impl<S, L> AsyncManager<S, L>
where
    S: Storage + 'static,
    L: ReadWriteLock<Registry<S>> + Send + Sync + 'static,
{
    /// Creates an async front for `manager`, scheduling work on `runtime`.
    ///
    /// Completions run [`Inline`] until [`with_completion`](Self::with_completion)
    /// selects another context. Only a weak reference to `manager` is kept.
    pub fn new(manager: &Arc<Manager<S, L>>, runtime: Handle, config: AsyncManagerConfig) -> Self {
        let label: Arc<str> = Arc::from(config.label);
        let dispatcher = Dispatcher::new(&runtime, config.dispatch, &label);
        Self { manager: Arc::downgrade(manager), dispatcher, completion: Arc::new(Inline), label }
    }

    /// Delivers completions through `context`.
    #[must_use]
    pub fn with_completion(mut self, context: impl CompletionContext) -> Self {
        self.completion = Arc::new(context);
        self
    }

    /// Returns true while the manager is still alive.
    pub fn is_attached(&self) -> bool {
        self.manager.strong_count() > 0
    }

    fn dispatch<R, F, C>(&self, operation: &'static str, context: Arc<dyn CompletionContext>, task: F, completion: C)
    where
        R: Send + 'static,
        F: FnOnce(&Manager<S, L>) -> ManagerResult<R> + Send + 'static,
        C: FnOnce(ManagerResult<R>) + Send + 'static,
    {
        let manager = Weak::clone(&self.manager);
        let label = Arc::clone(&self.label);
        let completion = Completion::new(operation, completion);
        trace!(queue = %label, operation, "dispatching storage operation");

        self.dispatcher.submit(Box::new(move || {
            let result = match manager.upgrade() {
                Some(manager) => task(manager.as_ref()),
                None => {
                    warn!(queue = %label, operation, "storage manager released before the operation ran");
                    Err(ManagerError::not_found(MANAGER_DEALLOCATED))
                },
            };
            context.deliver(Box::new(move || completion.complete(result)));
        }));
    }

    fn submit<R, F, C>(&self, operation: &'static str, task: F, completion: C)
    where
        R: Send + 'static,
        F: FnOnce(&Manager<S, L>) -> ManagerResult<R> + Send + 'static,
        C: FnOnce(ManagerResult<R>) + Send + 'static,
    {
        self.dispatch(operation, Arc::clone(&self.completion), task, completion);
    }

    /// Runs `task` against the manager in the background and resolves with its result.
    ///
    /// The future does not go through the completion context. Operations that
    /// are dropped before they run (their runtime shut down) resolve to
    /// [`ManagerError::NotFound`].
    pub fn perform<R, F>(&self, task: F) -> impl Future<Output = ManagerResult<R>> + Send + use<S, L, R, F>
    where
        R: Send + 'static,
        F: FnOnce(&Manager<S, L>) -> ManagerResult<R> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.dispatch("perform", Arc::new(Inline), task, move |result| {
            let _ = tx.send(result);
        });
        async move { rx.await.unwrap_or_else(|_| Err(ManagerError::not_found(OPERATION_DROPPED))) }
    }

    /// Background [`Manager::append`].
    pub fn append<T, E, C>(&self, identifier: impl Into<String>, object: T, encoder: E, completion: C)
    where
        T: Element,
        E: Encoder<T> + 'static,
        C: FnOnce(ManagerResult<T>) + Send + 'static,
    {
        let identifier = identifier.into();
        self.submit("append", move |m| m.append(&identifier, object, &encoder), completion);
    }

    /// Background [`Manager::append_all`].
    pub fn append_all<T, E, C>(&self, identifier: impl Into<String>, objects: Vec<T>, encoder: E, completion: C)
    where
        T: Element,
        E: Encoder<T> + 'static,
        C: FnOnce(ManagerResult<Vec<T>>) + Send + 'static,
    {
        let identifier = identifier.into();
        self.submit("append_all", move |m| m.append_all(&identifier, objects, &encoder), completion);
    }

    /// Background [`Manager::all`].
    pub fn all<T, D, C>(&self, identifier: impl Into<String>, decoder: D, completion: C)
    where
        T: Element,
        D: Decoder<T> + 'static,
        C: FnOnce(ManagerResult<Vec<T>>) + Send + 'static,
    {
        let identifier = identifier.into();
        self.submit("all", move |m| m.all(&identifier, &decoder), completion);
    }

    /// Background [`Manager::first`].
    pub fn first<T, D, C>(&self, identifier: impl Into<String>, decoder: D, completion: C)
    where
        T: Element,
        D: Decoder<T> + 'static,
        C: FnOnce(ManagerResult<Option<T>>) + Send + 'static,
    {
        let identifier = identifier.into();
        self.submit("first", move |m| m.first(&identifier, &decoder), completion);
    }

    /// Background [`Manager::first_where`].
    pub fn first_where<T, D, P, C>(&self, identifier: impl Into<String>, decoder: D, predicate: P, completion: C)
    where
        T: Element,
        D: Decoder<T> + 'static,
        P: Fn(&T) -> bool + Send + 'static,
        C: FnOnce(ManagerResult<Option<T>>) + Send + 'static,
    {
        let identifier = identifier.into();
        self.submit("first_where", move |m| m.first_where(&identifier, &decoder, predicate), completion);
    }

    /// Background [`Manager::filter`].
    pub fn filter<T, D, P, C>(&self, identifier: impl Into<String>, decoder: D, predicate: P, completion: C)
    where
        T: Element,
        D: Decoder<T> + 'static,
        P: Fn(&T) -> bool + Send + 'static,
        C: FnOnce(ManagerResult<Vec<T>>) + Send + 'static,
    {
        let identifier = identifier.into();
        self.submit("filter", move |m| m.filter(&identifier, &decoder, predicate), completion);
    }

    /// Background [`Manager::contains`].
    pub fn contains<T, D, P, C>(&self, identifier: impl Into<String>, decoder: D, predicate: P, completion: C)
    where
        T: Element,
        D: Decoder<T> + 'static,
        P: Fn(&T) -> bool + Send + 'static,
        C: FnOnce(ManagerResult<bool>) + Send + 'static,
    {
        let identifier = identifier.into();
        self.submit("contains", move |m| m.contains(&identifier, &decoder, predicate), completion);
    }

    /// Background [`Manager::last`].
    pub fn last<T, D, C>(&self, identifier: impl Into<String>, decoder: D, completion: C)
    where
        T: Element,
        D: Decoder<T> + 'static,
        C: FnOnce(ManagerResult<Option<T>>) + Send + 'static,
    {
        let identifier = identifier.into();
        self.submit("last", move |m| m.last(&identifier, &decoder), completion);
    }

    /// Background [`Manager::count`].
    pub fn count<C>(&self, identifier: impl Into<String>, completion: C)
    where
        C: FnOnce(ManagerResult<usize>) + Send + 'static,
    {
        let identifier = identifier.into();
        self.submit("count", move |m| m.count(&identifier), completion);
    }

    /// Background [`Manager::remove`].
    pub fn remove<T, D, P, C>(&self, identifier: impl Into<String>, decoder: D, predicate: P, completion: C)
    where
        T: Element,
        D: Decoder<T> + 'static,
        P: Fn(&T) -> bool + Send + 'static,
        C: FnOnce(ManagerResult<Option<T>>) + Send + 'static,
    {
        let identifier = identifier.into();
        self.submit("remove", move |m| m.remove(&identifier, &decoder, predicate), completion);
    }

    /// Background [`Manager::replace_all`].
    pub fn replace_all<T, E, C>(&self, identifier: impl Into<String>, objects: Vec<T>, encoder: E, completion: C)
    where
        T: Element,
        E: Encoder<T> + 'static,
        C: FnOnce(ManagerResult<Vec<T>>) + Send + 'static,
    {
        let identifier = identifier.into();
        self.submit("replace_all", move |m| m.replace_all(&identifier, objects, &encoder), completion);
    }

    /// Background [`Manager::clear`].
    pub fn clear<C>(&self, identifier: impl Into<String>, completion: C)
    where
        C: FnOnce(ManagerResult<bool>) + Send + 'static,
    {
        let identifier = identifier.into();
        self.submit("clear", move |m| m.clear(&identifier), completion);
    }
}

impl<S, L> fmt::Debug for AsyncManager<S, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.dispatcher {
            Dispatcher::Concurrent(_) => DispatchMode::Concurrent,
            Dispatcher::Serial(_) => DispatchMode::Serial,
        };
        f.debug_struct("AsyncManager")
            .field("label", &self.label)
            .field("dispatch", &mode)
            .field("attached", &(self.manager.strong_count() > 0))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::thread;

    use super::*;
    use crate::{
        assert_not_found,
        testutil::{User, user_decoder, user_encoder},
    };

    fn users_manager() -> Arc<Manager> {
        Arc::new(Manager::new([("users", AnyStorage::memory())]))
    }

    fn serial() -> AsyncManagerConfig {
        AsyncManagerConfig::builder().dispatch(DispatchMode::Serial).build().unwrap()
    }

    #[test]
    fn config_defaults_and_validation() {
        let config = AsyncManagerConfig::builder().build().unwrap();
        assert_eq!(config.dispatch(), DispatchMode::Concurrent);
        assert_eq!(config.label(), DEFAULT_LABEL);

        let err = AsyncManagerConfig::builder().label("  ").build().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "label"));
    }

    #[tokio::test]
    async fn callback_receives_result() {
        let manager = users_manager();
        let async_manager = AsyncManager::new(&manager, Handle::current(), AsyncManagerConfig::default());

        let (tx, rx) = oneshot::channel();
        async_manager.append("users", User::new("Karl"), user_encoder(), move |result| {
            tx.send(result).unwrap();
        });
        assert_eq!(rx.await.unwrap().unwrap(), User::new("Karl"));
        assert_eq!(manager.count("users").unwrap(), 1);
    }

    #[tokio::test]
    async fn serial_mode_completes_in_call_order() {
        let manager = users_manager();
        let async_manager = AsyncManager::new(&manager, Handle::current(), serial());
        let (tx, mut rx) = mpsc::unbounded_channel();

        for i in 0..20 {
            let tx = tx.clone();
            async_manager.append("users", User::new(format!("user-{i}")), user_encoder(), move |result| {
                result.unwrap();
                tx.send(i).unwrap();
            });
        }
        drop(tx);

        let mut order = Vec::new();
        while let Some(i) = rx.recv().await {
            order.push(i);
        }
        assert_eq!(order, (0..20).collect::<Vec<_>>());

        let stored: Vec<User> = async_manager.perform(|m| m.all("users", &user_decoder())).await.unwrap();
        let expected: Vec<User> = (0..20).map(|i| User::new(format!("user-{i}"))).collect();
        assert_eq!(stored, expected);
    }

    #[tokio::test]
    async fn released_manager_fails_every_call_once() {
        let manager = users_manager();
        let async_manager = AsyncManager::new(&manager, Handle::current(), AsyncManagerConfig::default());
        drop(manager);
        assert!(!async_manager.is_attached());

        let (tx, mut rx) = mpsc::unbounded_channel();
        let t = tx.clone();
        async_manager.all::<User, _, _>("users", user_decoder(), move |r| t.send(r.map(|_| ())).unwrap());
        let t = tx.clone();
        async_manager.clear("users", move |r| t.send(r.map(|_| ())).unwrap());
        let t = tx.clone();
        async_manager.count("users", move |r| t.send(r.map(|_| ())).unwrap());
        drop(tx);

        let mut delivered = 0;
        while let Some(result) = rx.recv().await {
            assert_not_found!(result, MANAGER_DEALLOCATED);
            delivered += 1;
        }
        assert_eq!(delivered, 3);
    }

    #[tokio::test]
    async fn main_queue_runs_completions_on_the_draining_thread() {
        let manager = users_manager();
        let (queue, mut main_loop) = main_queue();
        let async_manager =
            AsyncManager::new(&manager, Handle::current(), serial()).with_completion(queue);

        let (tx, mut rx) = mpsc::unbounded_channel();
        async_manager.append("users", User::new("Karl"), user_encoder(), move |result| {
            tx.send((thread::current().id(), result.is_ok())).unwrap();
        });

        assert!(main_loop.run_next().await);
        let (thread_id, ok) = rx.recv().await.unwrap();
        assert!(ok);
        assert_eq!(thread_id, thread::current().id());
        assert_eq!(main_loop.run_pending(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn runtime_context_delivers() {
        let manager = users_manager();
        let async_manager = AsyncManager::new(&manager, Handle::current(), AsyncManagerConfig::default())
            .with_completion(RuntimeContext::new(&Handle::current()));

        let (tx, rx) = oneshot::channel();
        async_manager.replace_all("users", vec![User::new("A"), User::new("B")], user_encoder(), move |result| {
            tx.send(result).unwrap();
        });
        assert_eq!(rx.await.unwrap().unwrap().len(), 2);

        let removed = async_manager
            .perform(|m| m.remove("users", &user_decoder(), |u: &User| u.name == "A"))
            .await
            .unwrap();
        assert_eq!(removed, Some(User::new("A")));
    }

    #[tokio::test]
    async fn missing_identifier_is_reported_through_callback() {
        let manager = users_manager();
        let async_manager = AsyncManager::new(&manager, Handle::current(), AsyncManagerConfig::default());

        let (tx, rx) = oneshot::channel();
        async_manager.last::<User, _, _>("missing", user_decoder(), move |result| {
            tx.send(result).unwrap();
        });
        assert_not_found!(rx.await.unwrap(), "missing");
    }
}
