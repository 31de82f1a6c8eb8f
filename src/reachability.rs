//! Network reachability tracking.
//!
//! A background task probes the network path on an interval. The current
//! state lives in a `watch` channel that fetchers read before every remote
//! attempt, and each transition is broadcast as a [`ConnectivityEvent`].

use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};
use url::Url;

use crate::config::ReachabilityConfig;

/// Broadcast on every connectivity transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivityEvent {
  pub is_connected: bool,
}

/// Something that can tell whether the network path is usable right now.
pub trait PathProbe: Send + Sync {
  fn probe(&self) -> BoxFuture<'_, bool>;
}

/// Probe that opens a TCP connection to the API host.
pub struct TcpProbe {
  addr: String,
  timeout: Duration,
}

impl TcpProbe {
  pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
    Self {
      addr: addr.into(),
      timeout,
    }
  }

  /// Probe the host and port of the given base URL.
  pub fn for_base_url(base_url: &str, timeout: Duration) -> Option<Self> {
    let url = Url::parse(base_url).ok()?;
    let host = url.host_str()?;
    let port = url.port_or_known_default()?;
    Some(Self::new(format!("{}:{}", host, port), timeout))
  }
}

impl PathProbe for TcpProbe {
  fn probe(&self) -> BoxFuture<'_, bool> {
    async move {
      match tokio::time::timeout(self.timeout, TcpStream::connect(self.addr.as_str())).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
          debug!(addr = %self.addr, error = %e, "Reachability probe failed");
          false
        }
        Err(_) => {
          debug!(addr = %self.addr, "Reachability probe timed out");
          false
        }
      }
    }
    .boxed()
  }
}

/// Read handle on the shared connectivity flag.
#[derive(Debug, Clone)]
pub struct Connectivity {
  rx: watch::Receiver<bool>,
}

impl Connectivity {
  /// A handle pinned to one value, not backed by any monitor.
  pub fn fixed(is_connected: bool) -> Self {
    let (_tx, rx) = watch::channel(is_connected);
    Self { rx }
  }

  pub fn is_connected(&self) -> bool {
    *self.rx.borrow()
  }
}

/// Observes network path changes and broadcasts transitions.
pub struct ReachabilityMonitor {
  probe: Arc<dyn PathProbe>,
  interval: Duration,
  state: Arc<watch::Sender<bool>>,
  /// Set once any probe has completed, across restarts
  observed: Arc<AtomicBool>,
  events: broadcast::Sender<ConnectivityEvent>,
  task: Option<JoinHandle<()>>,
}

impl ReachabilityMonitor {
  /// Create a monitor. Connectivity reads `false` until the first probe.
  pub fn new(probe: impl PathProbe + 'static, interval: Duration) -> Self {
    let (state, _) = watch::channel(false);
    let (events, _) = broadcast::channel(16);

    Self {
      probe: Arc::new(probe),
      interval,
      state: Arc::new(state),
      observed: Arc::new(AtomicBool::new(false)),
      events,
      task: None,
    }
  }

  /// Create a monitor that probes the API host.
  pub fn for_api(base_url: &str, config: &ReachabilityConfig) -> Option<Self> {
    let probe = TcpProbe::for_base_url(base_url, Duration::from_millis(config.probe_timeout_ms))?;
    Some(Self::new(
      probe,
      Duration::from_millis(config.probe_interval_ms),
    ))
  }

  /// Begin observing. A no-op if already running.
  ///
  /// The first observation ever made always broadcasts. After a restart only
  /// a change from the last observed state does.
  pub fn start(&mut self) {
    if self.task.is_some() {
      return;
    }

    let probe = Arc::clone(&self.probe);
    let state = Arc::clone(&self.state);
    let observed = Arc::clone(&self.observed);
    let events = self.events.clone();
    let period = self.interval;

    self.task = Some(tokio::spawn(async move {
      let mut ticker = tokio::time::interval(period);
      ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

      let mut last = if observed.load(Ordering::SeqCst) {
        Some(*state.borrow())
      } else {
        None
      };

      loop {
        ticker.tick().await;
        let satisfied = probe.probe().await;
        if last == Some(satisfied) {
          continue;
        }
        last = Some(satisfied);
        observed.store(true, Ordering::SeqCst);

        info!(is_connected = satisfied, "Connectivity changed");
        state.send_replace(satisfied);
        // No subscribers is fine
        let _ = events.send(ConnectivityEvent {
          is_connected: satisfied,
        });
      }
    }));
  }

  /// Stop observing. Safe to call when not started.
  pub fn stop(&mut self) {
    if let Some(task) = self.task.take() {
      task.abort();
    }
  }

  pub fn is_running(&self) -> bool {
    self.task.is_some()
  }

  pub fn is_connected(&self) -> bool {
    *self.state.borrow()
  }

  /// Read handle for consumers that check connectivity before fetching.
  pub fn connectivity(&self) -> Connectivity {
    Connectivity {
      rx: self.state.subscribe(),
    }
  }

  /// Receive an event for every subsequent transition.
  pub fn subscribe(&self) -> broadcast::Receiver<ConnectivityEvent> {
    self.events.subscribe()
  }
}

impl Drop for ReachabilityMonitor {
  fn drop(&mut self) {
    self.stop();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::AtomicUsize;
  use tokio::sync::broadcast::error::TryRecvError;

  /// Replays a fixed sequence, then repeats the last value forever.
  struct ScriptedProbe {
    script: Vec<bool>,
    calls: Arc<AtomicUsize>,
  }

  impl PathProbe for ScriptedProbe {
    fn probe(&self) -> BoxFuture<'_, bool> {
      let n = self.calls.fetch_add(1, Ordering::SeqCst);
      let value = self.script[n.min(self.script.len() - 1)];
      async move { value }.boxed()
    }
  }

  fn scripted(script: &[bool]) -> (ScriptedProbe, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let probe = ScriptedProbe {
      script: script.to_vec(),
      calls: calls.clone(),
    };
    (probe, calls)
  }

  #[tokio::test(start_paused = true)]
  async fn test_one_broadcast_per_transition() {
    let (probe, calls) = scripted(&[true, true, true, false, false, true, true]);
    let mut monitor = ReachabilityMonitor::new(probe, Duration::from_secs(1));
    let mut events = monitor.subscribe();

    monitor.start();
    tokio::time::sleep(Duration::from_secs(20)).await;

    assert!(calls.load(Ordering::SeqCst) >= 7);

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
      seen.push(event.is_connected);
    }
    assert_eq!(seen, vec![true, false, true]);
    assert!(monitor.is_connected());
  }

  #[tokio::test(start_paused = true)]
  async fn test_connectivity_handle_follows_monitor() {
    let (probe, _) = scripted(&[false, true]);
    let mut monitor = ReachabilityMonitor::new(probe, Duration::from_secs(1));
    let handle = monitor.connectivity();
    let mut events = monitor.subscribe();

    assert!(!handle.is_connected());

    monitor.start();
    assert_eq!(
      events.recv().await.unwrap(),
      ConnectivityEvent {
        is_connected: false
      }
    );
    assert!(!handle.is_connected());

    assert_eq!(
      events.recv().await.unwrap(),
      ConnectivityEvent { is_connected: true }
    );
    assert!(handle.is_connected());
  }

  #[tokio::test(start_paused = true)]
  async fn test_stop_ends_observation() {
    let (probe, calls) = scripted(&[true]);
    let mut monitor = ReachabilityMonitor::new(probe, Duration::from_secs(1));

    monitor.start();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    monitor.stop();
    assert!(!monitor.is_running());

    let after_stop = calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(calls.load(Ordering::SeqCst), after_stop);
  }

  #[tokio::test]
  async fn test_stop_without_start_is_noop() {
    let (probe, _) = scripted(&[true]);
    let mut monitor = ReachabilityMonitor::new(probe, Duration::from_secs(1));

    monitor.stop();
    monitor.stop();
    assert!(!monitor.is_running());
  }

  #[tokio::test(start_paused = true)]
  async fn test_start_twice_keeps_one_task() {
    let (probe, calls) = scripted(&[true]);
    let mut monitor = ReachabilityMonitor::new(probe, Duration::from_secs(1));
    let mut events = monitor.subscribe();

    monitor.start();
    monitor.start();
    tokio::time::sleep(Duration::from_millis(2500)).await;

    // Ticks at 0s, 1s and 2s from a single task
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(events.try_recv().is_ok());
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
  }

  fn drain(events: &mut broadcast::Receiver<ConnectivityEvent>) -> Vec<bool> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
      seen.push(event.is_connected);
    }
    seen
  }

  #[tokio::test(start_paused = true)]
  async fn test_restart_without_change_stays_quiet() {
    let (probe, calls) = scripted(&[true]);
    let mut monitor = ReachabilityMonitor::new(probe, Duration::from_secs(1));
    let mut events = monitor.subscribe();

    monitor.start();
    tokio::time::sleep(Duration::from_secs(3)).await;
    monitor.stop();
    let before_restart = calls.load(Ordering::SeqCst);

    monitor.start();
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert!(calls.load(Ordering::SeqCst) > before_restart);
    assert_eq!(drain(&mut events), vec![true]);
    assert!(monitor.is_connected());
  }

  #[tokio::test(start_paused = true)]
  async fn test_restart_broadcasts_change_made_while_stopped() {
    // Three checks before the restart, then the path drops
    let (probe, calls) = scripted(&[true, true, true, false]);
    let mut monitor = ReachabilityMonitor::new(probe, Duration::from_secs(1));
    let mut events = monitor.subscribe();

    monitor.start();
    tokio::time::sleep(Duration::from_millis(2500)).await;
    monitor.stop();
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    monitor.start();
    tokio::time::sleep(Duration::from_millis(2500)).await;

    assert_eq!(drain(&mut events), vec![true, false]);
    assert!(!monitor.is_connected());
  }

  #[test]
  fn test_fixed_connectivity() {
    assert!(Connectivity::fixed(true).is_connected());
    assert!(!Connectivity::fixed(false).is_connected());
  }

  #[test]
  fn test_tcp_probe_from_base_url() {
    let probe = TcpProbe::for_base_url("https://fakestoreapi.com", Duration::from_secs(1)).unwrap();
    assert_eq!(probe.addr, "fakestoreapi.com:443");

    let probe = TcpProbe::for_base_url("http://127.0.0.1:8080/api", Duration::from_secs(1)).unwrap();
    assert_eq!(probe.addr, "127.0.0.1:8080");

    assert!(TcpProbe::for_base_url("not a url", Duration::from_secs(1)).is_none());
  }

  #[tokio::test]
  async fn test_tcp_probe_reaches_local_listener() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let probe = TcpProbe::new(addr.to_string(), Duration::from_secs(1));
    assert!(probe.probe().await);
  }
}
