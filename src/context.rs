//! Execution contexts.
//!
//! A [`Context`] is a serialized unit of scheduling: closures handed to
//! [`run_on_context`][Context::run_on_context] run one after another on a
//! single spawned task, in submission order. While such a closure runs,
//! [`Context::current`] returns the context it runs on, which is how the
//! dispatch layer finds the context a resolution was started from.
//!
//! Contexts are what resolution callbacks are affinitized to: no matter
//! which task or thread completes an underlying query, the callback is
//! scheduled back onto the context the request originated from, so
//! callers only ever observe single-context execution.

use std::cell::RefCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

//------------ Task ----------------------------------------------------------

/// A closure scheduled onto a context.
type Task = Box<dyn FnOnce() + Send + 'static>;

thread_local! {
    /// The context currently running a task on this thread.
    static CURRENT: RefCell<Option<Context>> = const { RefCell::new(None) };
}

/// Source of process-unique context identifiers.
static NEXT_ID: AtomicU64 = AtomicU64::new(0);

//------------ ContextId -----------------------------------------------------

/// The opaque identity of a context.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ContextId(u64);

//------------ Context -------------------------------------------------------

/// A handle to a serialized execution context.
///
/// Handles are cheap clones referring to the same context. The context's
/// drain task ends once the last handle is dropped; closures scheduled
/// after that point are dropped unrun.
#[derive(Clone)]
pub struct Context {
    /// The shared state of the context.
    inner: Arc<Inner>,
}

/// The shared state of a context.
struct Inner {
    /// The context identity.
    id: ContextId,

    /// The sending end of the context's task queue.
    tx: mpsc::UnboundedSender<Task>,
}

impl Context {
    /// Creates a new context on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called from outside a Tokio runtime.
    pub fn new() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Task>();
        let id = ContextId(NEXT_ID.fetch_add(1, Ordering::Relaxed));
        let context = Context {
            inner: Arc::new(Inner { id, tx }),
        };

        // The drain task must not keep the context alive itself or the
        // queue would never close; it re-acquires a handle per task so
        // `current` can hand it out.
        let weak = Arc::downgrade(&context.inner);
        tokio::spawn(async move {
            while let Some(task) = rx.recv().await {
                let current = weak.upgrade().map(|inner| Context { inner });
                CURRENT.with(|cell| *cell.borrow_mut() = current);
                let res = panic::catch_unwind(AssertUnwindSafe(task));
                CURRENT.with(|cell| *cell.borrow_mut() = None);
                if res.is_err() {
                    warn!(context = id.0, "context task panicked");
                }
            }
        });
        context
    }

    /// Returns the identity of this context.
    pub fn id(&self) -> ContextId {
        self.inner.id
    }

    /// Returns the context whose task is currently running, if any.
    pub fn current() -> Option<Context> {
        CURRENT.with(|cell| cell.borrow().clone())
    }

    /// Schedules a closure to run on this context.
    ///
    /// Closures run strictly in the order they were submitted. When the
    /// context is already gone the closure is dropped unrun.
    pub fn run_on_context<F: FnOnce() + Send + 'static>(&self, task: F) {
        if self.inner.tx.send(Box::new(task)).is_err() {
            warn!(
                context = self.inner.id.0,
                "dropping task for vanished context"
            );
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.inner.id)
            .finish_non_exhaustive()
    }
}

//============ Tests =========================================================
