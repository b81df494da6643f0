//! Fixed-interval queue poller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::debug;

use super::ArtifactConsumer;
use crate::queue::HandoffQueue;

/// Default delay between polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Drains the handoff queue one reference per tick.
pub struct QueuePoller {
    queue: HandoffQueue,
    interval: Duration,
    running: Arc<AtomicBool>,
}

impl QueuePoller {
    pub fn new(queue: HandoffQueue) -> Self {
        Self {
            queue,
            interval: DEFAULT_POLL_INTERVAL,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Get a handle to stop the poller.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// Run one tick: present at most one queued reference.
    ///
    /// Returns `true` if something was presented.
    pub fn poll_once<C: ArtifactConsumer + ?Sized>(&self, consumer: &mut C) -> bool {
        match self.queue.try_consume() {
            Some(reference) => {
                debug!("Presenting {}", reference.storage_path.display());
                consumer.present(&reference);
                true
            }
            None => false,
        }
    }

    /// Poll until the running flag is cleared.
    pub fn run<C: ArtifactConsumer + ?Sized>(&self, consumer: &mut C) {
        consumer.on_start();

        while self.running.load(Ordering::SeqCst) {
            self.poll_once(consumer);
            thread::sleep(self.interval);
        }

        consumer.on_stop();
    }

    /// Run the poll loop on its own thread, returning the queue when stopped.
    pub fn spawn<C>(self, mut consumer: C) -> std::io::Result<thread::JoinHandle<HandoffQueue>>
    where
        C: ArtifactConsumer + 'static,
    {
        thread::Builder::new()
            .name("artifact-poller".to_string())
            .spawn(move || {
                self.run(&mut consumer);
                self.queue
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ArtifactReference;
    use chrono::Local;
    use std::path::PathBuf;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingConsumer {
        seen: Arc<Mutex<Vec<PathBuf>>>,
        started: bool,
        stopped: bool,
    }

    impl ArtifactConsumer for RecordingConsumer {
        fn present(&mut self, reference: &ArtifactReference) {
            self.seen.lock().unwrap().push(reference.storage_path.clone());
        }

        fn on_start(&mut self) {
            self.started = true;
        }

        fn on_stop(&mut self) {
            self.stopped = true;
        }
    }

    fn reference(name: &str) -> ArtifactReference {
        ArtifactReference {
            storage_path: PathBuf::from(name),
            captured_at: Local::now(),
            size_bytes: 0,
            peer: None,
        }
    }

    #[test]
    fn test_poll_once_takes_one() {
        let queue = HandoffQueue::unbounded();
        let publisher = queue.publisher();
        publisher.publish(reference("a.jpg"));
        publisher.publish(reference("b.jpg"));

        let poller = QueuePoller::new(queue);
        let mut consumer = RecordingConsumer::default();

        assert!(poller.poll_once(&mut consumer));
        assert_eq!(*consumer.seen.lock().unwrap(), vec![PathBuf::from("a.jpg")]);
        assert!(poller.poll_once(&mut consumer));
        assert!(!poller.poll_once(&mut consumer));
    }

    #[test]
    fn test_stopped_poller_runs_hooks_only() {
        let poller = QueuePoller::new(HandoffQueue::unbounded());
        poller.running_flag().store(false, Ordering::SeqCst);

        let mut consumer = RecordingConsumer::default();
        poller.run(&mut consumer);

        assert!(consumer.started);
        assert!(consumer.stopped);
        assert!(consumer.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_spawned_poller_presents_in_order() {
        let queue = HandoffQueue::unbounded();
        let publisher = queue.publisher();
        let poller = QueuePoller::new(queue).with_interval(Duration::from_millis(5));
        let running = poller.running_flag();

        let consumer = RecordingConsumer::default();
        let seen = consumer.seen.clone();
        let handle = poller.spawn(consumer).unwrap();

        for name in ["1.jpg", "2.jpg", "3.jpg"] {
            publisher.publish(reference(name));
        }

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while seen.lock().unwrap().len() < 3 && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        running.store(false, Ordering::SeqCst);
        let queue = handle.join().unwrap();

        let names: Vec<_> = seen.lock().unwrap().clone();
        assert_eq!(
            names,
            vec![
                PathBuf::from("1.jpg"),
                PathBuf::from("2.jpg"),
                PathBuf::from("3.jpg")
            ]
        );
        assert!(queue.is_empty());
    }
}
