//! Periodic task runner for the complementary fuser
//!
//! A named background thread waits on a crossbeam `tick` channel and a
//! shutdown channel with `select!`, so it sleeps between ticks and wakes
//! immediately when stopped. Stopping joins the thread, which means a tick in
//! progress always runs to completion.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Sender, after, bounded, select, tick};

use crate::error::Result;

/// Handle to a running periodic task
pub struct PeriodicTask {
    name: String,
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicTask {
    /// Spawn a thread calling `task` every `period`, starting after `delay`
    ///
    /// # Errors
    /// [`crate::FusionError::SchedulerSpawn`] if the thread cannot be created.
    pub fn spawn<F>(name: &str, delay: Duration, period: Duration, mut task: F) -> Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);
        let thread_name = name.to_string();

        let handle = thread::Builder::new().name(name.into()).spawn(move || {
            log::debug!("{}: waiting {:?} before first tick", thread_name, delay);
            select! {
                recv(shutdown_rx) -> _ => return,
                recv(after(delay)) -> _ => {}
            }

            let ticker = tick(period);
            task();
            loop {
                select! {
                    recv(shutdown_rx) -> _ => break,
                    recv(ticker) -> _ => task(),
                }
            }
            log::debug!("{}: stopped", thread_name);
        })?;

        log::info!("{}: started (period {:?})", name, period);

        Ok(Self {
            name: name.into(),
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Stop the task and wait for the current tick to finish
    ///
    /// When called from within the task itself the thread is detached
    /// instead; it exits once the current tick returns.
    pub fn stop(&mut self) {
        // Dropping the sender disconnects the channel and wakes the thread
        self.shutdown.take();

        if let Some(handle) = self.handle.take() {
            if handle.thread().id() == thread::current().id() {
                log::debug!("{}: stopped from its own tick", self.name);
                return;
            }
            if handle.join().is_err() {
                log::error!("{}: task panicked", self.name);
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    #[test]
    fn test_ticks_until_stopped() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);

        let period = Duration::from_millis(5);
        let mut task = PeriodicTask::spawn("test-ticker", Duration::ZERO, period, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        assert!(task.is_running());

        let deadline = Instant::now() + Duration::from_secs(5);
        while count.load(Ordering::SeqCst) < 3 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        task.stop();
        assert!(!task.is_running());

        let stopped_at = count.load(Ordering::SeqCst);
        assert!(stopped_at >= 3);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(count.load(Ordering::SeqCst), stopped_at);
    }

    #[test]
    fn test_stop_during_delay() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);

        let started = Instant::now();
        let delay = Duration::from_secs(60);
        let period = Duration::from_millis(5);
        let task = PeriodicTask::spawn("test-delayed", delay, period, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        drop(task);

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_stop_from_own_tick() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let slot: Arc<parking_lot::Mutex<Option<PeriodicTask>>> = Arc::default();
        let own_slot = Arc::clone(&slot);

        let delay = Duration::from_millis(50);
        let period = Duration::from_millis(5);
        let task = PeriodicTask::spawn("test-self-stop", delay, period, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            if let Some(task) = own_slot.lock().as_mut() {
                task.stop();
            }
        })
        .unwrap();
        *slot.lock() = Some(task);

        let deadline = Instant::now() + Duration::from_secs(5);
        while slot.lock().as_ref().is_some_and(PeriodicTask::is_running)
            && Instant::now() < deadline
        {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!slot.lock().as_ref().is_some_and(PeriodicTask::is_running));

        thread::sleep(Duration::from_millis(30));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
