use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Runs an action once a burst of calls has been quiet for `delay`.
///
/// Each run is spawned as its own task, so a run still in progress never
/// delays the next one. Dropping the debouncer stops further runs; a run
/// already started is left to finish.
pub struct Debouncer {
    tx: mpsc::UnboundedSender<()>,
    task: JoinHandle<()>,
}

impl Debouncer {
    pub fn new<F, Fut>(delay: Duration, action: F) -> Self
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();
        let task = tokio::spawn(async move {
            while rx.recv().await.is_some() {
                loop {
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => break,
                        call = rx.recv() => {
                            if call.is_none() {
                                return;
                            }
                        }
                    }
                }
                tokio::spawn(action());
            }
        });
        Self { tx, task }
    }

    pub fn call(&self) {
        let _ = self.tx.send(());
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
