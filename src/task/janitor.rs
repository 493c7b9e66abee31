use crate::shard::Shard;

use std::hash::Hash;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};

/// The background sweeper owned by one shard.
///
/// It sleeps until the shard's next expiration (or the initial delay while
/// nothing is scheduled), reaps every expired head under the shard lock,
/// and re-arms. The lock is never held across a wait.
pub(crate) struct Janitor {
  handle: JoinHandle<()>,
  stop_tx: Sender<()>,
  result_rx: Receiver<u64>,
}

impl Janitor {
  pub(crate) fn spawn<K, V>(shard: Arc<Shard<K, V>>, initial_delay: Duration) -> Self
  where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
  {
    let (stop_tx, stop_rx) = bounded(1);
    let (result_tx, result_rx) = bounded(1);
    let handle = thread::spawn(move || run(shard, initial_delay, stop_rx, result_tx));
    Self {
      handle,
      stop_tx,
      result_rx,
    }
  }

  /// Requests cancellation and blocks until the final sweep has run,
  /// returning the total number of entries this janitor expired.
  pub(crate) fn stop(self) -> u64 {
    let _ = self.stop_tx.send(());
    let expired = self.result_rx.recv().unwrap_or(0);
    let _ = self.handle.join();
    expired
  }
}

fn run<K, V>(
  shard: Arc<Shard<K, V>>,
  initial_delay: Duration,
  stop_rx: Receiver<()>,
  result_tx: Sender<u64>,
) where
  K: Eq + Hash + Clone + Send + Sync,
{
  let mut expired = 0u64;
  let mut delay = initial_delay;

  loop {
    match stop_rx.recv_timeout(delay) {
      Err(RecvTimeoutError::Timeout) => {
        let (reaped, next_deadline) = shard.sweep_expired();
        expired += reaped;
        if reaped > 0 {
          log::trace!("janitor reaped {reaped} expired entries");
        }
        delay = match next_deadline {
          Some(at) => at.saturating_duration_since(shard.clock().now()),
          None => initial_delay,
        };
      }
      Ok(()) | Err(RecvTimeoutError::Disconnected) => {
        // One final sweep so stop() observes a consistent shard.
        let (reaped, _) = shard.sweep_expired();
        expired += reaped;
        log::debug!("janitor stopping after {expired} expirations");
        let _ = result_tx.send(expired);
        return;
      }
    }
  }
}
