use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Convention the process's exit code communicates to a supervisor: `Exit`
/// is a normal shutdown, `Restart` asks the supervisor to re-exec (§6.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationAction {
    Exit,
    Restart,
}

struct NamedTask {
    name: String,
    handle: JoinHandle<()>,
}

/// Owns every background task the engine spawns: per-entity monitor loops,
/// action workers, the chain forwarders' underlying subscriptions. A task
/// that panics or returns is logged and removed; it does not bring down the
/// rest of the engine (§7 "Task crash").
pub struct TaskController {
    tasks: Mutex<Vec<NamedTask>>,
    notify: Notify,
    termination_required: AtomicBool,
    action: Mutex<TerminationAction>,
}

impl Default for TaskController {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskController {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            tasks: Mutex::new(Vec::new()),
            notify: Notify::new(),
            termination_required: AtomicBool::new(false),
            action: Mutex::new(TerminationAction::Exit),
        })
    }

    /// Registers and starts `future` as a named background task.
    pub async fn create_task(
        &self,
        name: impl Into<String>,
        future: impl std::future::Future<Output = ()> + Send + 'static,
    ) {
        let name = name.into();
        let handle = tokio::spawn(future);
        self.tasks.lock().await.push(NamedTask { name, handle });
    }

    /// Schedules termination after `delay`; `action` controls the exit-code
    /// convention an embedding `main` should use.
    pub fn terminate_after(self: &Arc<Self>, delay: Duration, action: TerminationAction) {
        let this = self.clone();
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            *this.action.lock().await = action;
            this.termination_required.store(true, Ordering::SeqCst);
            this.notify.notify_waiters();
        });
    }

    /// Cancels and awaits every still-running task.
    pub async fn cancel_all_tasks(&self) {
        let mut tasks = self.tasks.lock().await;
        for task in tasks.drain(..) {
            task.handle.abort();
            match task.handle.await {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => {}
                Err(e) => warn!(task = %task.name, error = %e, "task panicked during shutdown"),
            }
        }
    }

    /// Reaps tasks that finished (or crashed) on their own, without
    /// cancelling the rest.
    async fn reap_finished(&self) {
        let mut tasks = self.tasks.lock().await;
        let mut still_running = Vec::with_capacity(tasks.len());
        for task in tasks.drain(..) {
            if task.handle.is_finished() {
                match task.handle.await {
                    Ok(()) => info!(task = %task.name, "task finished"),
                    Err(e) => warn!(task = %task.name, error = %e, "task crashed"),
                }
            } else {
                still_running.push(task);
            }
        }
        *tasks = still_running;
    }

    /// Polls task completion and waits for `terminate_after` (or an OS
    /// signal handler calling it) to flip `termination_required`, then
    /// cancels everything still running and returns the requested action.
    pub async fn run_until_termination(self: &Arc<Self>) -> TerminationAction {
        loop {
            if self.termination_required.load(Ordering::SeqCst) {
                break;
            }
            self.reap_finished().await;
            tokio::select! {
                _ = self.notify.notified() => {}
                _ = tokio::time::sleep(Duration::from_millis(200)) => {}
            }
        }
        self.cancel_all_tasks().await;
        *self.action.lock().await
    }
}
