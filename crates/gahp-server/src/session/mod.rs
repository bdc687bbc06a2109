//! Per-server session state and the capability surface handed to handlers.
//!
//! One [`ExecutionContext`] exists per server. It is cheap to clone, and
//! every clone refers to the same result queue, object store, cleanup
//! registry and identifier generator.

mod cleanup;
mod ids;
mod results;
mod store;

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

pub use cleanup::{CleanupError, CleanupRegistry, CleanupReport};
pub use ids::UniqueIdGenerator;
pub use results::{PendingResult, ResultQueue};
pub use store::{ObjectStore, StoredObject};

use crate::dispatch::RequestId;
use crate::output::OutputChannel;

/// Tracing target for session state changes.
pub(crate) const SESSION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::session");

struct SessionInner {
    output: Arc<OutputChannel>,
    results: ResultQueue,
    objects: ObjectStore,
    cleanup: Arc<CleanupRegistry>,
    ids: UniqueIdGenerator,
    exit_requested: AtomicBool,
    version: String,
    commands: Vec<String>,
}

/// Capabilities available to command handlers and deferred tasks.
#[derive(Clone)]
pub struct ExecutionContext {
    inner: Arc<SessionInner>,
}

impl ExecutionContext {
    /// Creates a session writing notifications to `output`.
    ///
    /// `commands` is the sorted list reported by `COMMANDS`.
    #[must_use]
    pub fn new(output: Arc<OutputChannel>, version: String, commands: Vec<String>) -> Self {
        let results = ResultQueue::new(Arc::clone(&output));
        Self {
            inner: Arc::new(SessionInner {
                output,
                results,
                objects: ObjectStore::new(),
                cleanup: Arc::new(CleanupRegistry::new()),
                ids: UniqueIdGenerator::new(),
                exit_requested: AtomicBool::new(false),
                version,
                commands,
            }),
        }
    }

    /// Queues a deferred result for the controller.
    pub fn add_result(&self, request_id: RequestId, tokens: Vec<String>) {
        self.inner.results.add(request_id, tokens);
    }

    /// Removes every queued result in insertion order.
    #[must_use]
    pub fn drain_results(&self) -> Vec<PendingResult> {
        self.inner.results.drain()
    }

    /// Returns how many results are waiting for `RESULTS`.
    #[must_use]
    pub fn pending_results(&self) -> usize {
        self.inner.results.len()
    }

    /// Switches async notification mode.
    pub fn set_async_mode(&self, enabled: bool) {
        debug!(target: SESSION_TARGET, enabled, "async mode changed");
        self.inner.results.set_async_mode(enabled);
    }

    /// Returns `true` when async notification mode is on.
    #[must_use]
    pub fn async_mode(&self) -> bool {
        self.inner.results.async_mode()
    }

    /// Asks the main loop to shut down after the current response.
    pub fn request_exit(&self) {
        self.inner.exit_requested.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once an exit has been requested.
    #[must_use]
    pub fn exit_requested(&self) -> bool {
        self.inner.exit_requested.load(Ordering::SeqCst)
    }

    /// Returns a process-wide unique identifier.
    #[must_use]
    pub fn generate_unique_id(&self) -> String {
        self.inner.ids.generate()
    }

    /// Stores a session object, returning the value it replaced.
    pub fn store_object<T>(&self, key: impl Into<String>, value: T) -> Option<StoredObject>
    where
        T: Any + Send + Sync,
    {
        self.inner.objects.store(key, value)
    }

    /// Returns a session object of type `T`.
    #[must_use]
    pub fn get_object<T>(&self, key: &str) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        self.inner.objects.get(key)
    }

    /// Removes a session object.
    pub fn remove_object(&self, key: &str) -> Option<StoredObject> {
        self.inner.objects.remove(key)
    }

    /// Registers a shutdown action.
    pub fn add_cleanup_step<F>(&self, step: F)
    where
        F: FnOnce() -> Result<(), CleanupError> + Send + 'static,
    {
        self.inner.cleanup.register(step);
    }

    /// Runs every registered shutdown action once.
    pub fn run_cleanup(&self) -> CleanupReport {
        self.inner.cleanup.run_all()
    }

    /// Returns a handle to the cleanup registry.
    ///
    /// The signal watcher holds this so it can run cleanup without the rest
    /// of the session.
    #[must_use]
    pub fn cleanup_registry(&self) -> Arc<CleanupRegistry> {
        Arc::clone(&self.inner.cleanup)
    }

    /// Returns the registered command names in sorted order.
    #[must_use]
    pub fn commands(&self) -> &[String] {
        &self.inner.commands
    }

    /// Returns the advertised version string in wire form.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.inner.version
    }

    /// Returns the prefix currently applied to outbound lines.
    #[must_use]
    pub fn response_prefix(&self) -> String {
        self.inner.output.response_prefix()
    }

    pub(crate) fn output(&self) -> &OutputChannel {
        &self.inner.output
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self::new(
            Arc::new(OutputChannel::new(std::io::sink())),
            "$GahpVersion: 0.0.0 Jan 01 1970 Test\\ Gahp $".to_owned(),
            Vec::new(),
        )
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("version", &self.inner.version)
            .field("commands", &self.inner.commands)
            .field("exit_requested", &self.exit_requested())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;
    use std::thread;

    use super::*;
    use crate::builtins;
    use crate::dispatch::Dispatcher;
    use crate::tests::support::SharedBuffer;

    #[test]
    fn clones_share_state() {
        let context = ExecutionContext::for_tests();
        let clone = context.clone();

        clone.request_exit();
        clone.store_object("proxy", "/tmp/x509up".to_owned());
        clone.add_result(RequestId::new(4), vec!["0".to_owned()]);

        assert!(context.exit_requested());
        assert_eq!(
            context.get_object::<String>("proxy").as_deref().map(String::as_str),
            Some("/tmp/x509up")
        );
        assert_eq!(context.drain_results().len(), 1);
    }

    #[test]
    fn cleanup_steps_run_through_the_context() {
        let context = ExecutionContext::for_tests();
        context.add_cleanup_step(|| Ok(()));
        assert_eq!(context.cleanup_registry().len(), 1);
        assert_eq!(context.run_cleanup().executed, 1);
    }

    #[test]
    fn unique_ids_differ() {
        let context = ExecutionContext::for_tests();
        assert_ne!(context.generate_unique_id(), context.generate_unique_id());
    }

    #[test]
    fn simultaneous_results_notify_once_without_interleaving() {
        const TASKS: usize = 16;
        let buffer = SharedBuffer::default();
        let output = Arc::new(OutputChannel::new(buffer.clone()));
        let context = ExecutionContext::new(Arc::clone(&output), "test".to_owned(), Vec::new());
        context.set_async_mode(true);

        let barrier = Arc::new(Barrier::new(TASKS + 1));
        let tasks: Vec<_> = (1..=TASKS)
            .map(|id| {
                let context = context.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    let id = u64::try_from(id).expect("id fits");
                    context.add_result(RequestId::new(id), vec!["0".to_owned(), "NULL".to_owned()]);
                })
            })
            .collect();
        barrier.wait();
        let response = ["S 2".to_owned(), "first".to_owned(), "second".to_owned()];
        for _ in 0..TASKS {
            output.write_response(&response, None).expect("write response");
        }
        for task in tasks {
            task.join().expect("task thread");
        }

        let lines = buffer.lines();
        assert_eq!(lines.iter().filter(|line| *line == "R").count(), 1);
        assert_eq!(lines.len(), TASKS * response.len() + 1);
        for (index, line) in lines.iter().enumerate() {
            if line == "S 2" {
                assert_eq!(lines.get(index + 1).map(String::as_str), Some("first"));
                assert_eq!(lines.get(index + 2).map(String::as_str), Some("second"));
            }
        }

        let mut dispatcher = Dispatcher::new();
        builtins::register(&mut dispatcher);
        let results = dispatcher.dispatch(vec!["RESULTS".to_owned()], &context);
        let results = results.response().lines();
        assert_eq!(results.first().map(String::as_str), Some("S 16"));
        let mut ids: Vec<u64> = results
            .iter()
            .skip(1)
            .filter_map(|line| line.strip_suffix(" 0 NULL"))
            .map(|id| id.parse().expect("request id"))
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=16).collect::<Vec<u64>>());
    }
}
