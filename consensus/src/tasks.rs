//! Fire-and-forget background work.
//!
//! Stored-message replay and telemetry submission run detached from the controller:
//! each job is attempted at most once, nobody awaits it, and it races freely with the
//! controller moving on to the next phase. Callers must only hand over work that
//! tolerates that ordering (phase handlers discard messages for phases that are
//! already finished or not yet applicable).

use tracing::Span;

/// Run `job` in the background inside `span`.
///
/// Inside a tokio runtime the job goes to the blocking pool; otherwise a named OS
/// thread is used. A spawn failure is logged and the job is dropped.
pub fn spawn_detached<F>(name: &'static str, span: Span, job: F)
where
    F: FnOnce() + Send + 'static,
{
    let run = move || {
        let _entered = span.enter();
        job();
    };
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            drop(handle.spawn_blocking(run));
        }
        Err(_) => {
            if let Err(err) = std::thread::Builder::new()
                .name(name.to_string())
                .spawn(run)
            {
                tracing::error!(task = name, %err, "failed to spawn background task");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn runs_without_runtime() {
        let (tx, rx) = mpsc::channel();
        spawn_detached("test-job", Span::none(), move || {
            tx.send(7).unwrap();
        });
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), 7);
    }

    #[tokio::test]
    async fn runs_on_runtime_blocking_pool() {
        let (tx, rx) = mpsc::channel();
        spawn_detached("test-job", Span::none(), move || {
            tx.send(()).unwrap();
        });
        tokio::task::spawn_blocking(move || rx.recv_timeout(Duration::from_secs(2)))
            .await
            .unwrap()
            .unwrap();
    }
}
