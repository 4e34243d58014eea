//! The UDP ingress task and the handle that controls it

use futures::{Stream, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::dispatcher::Dispatcher;
use crate::capture::CaptureRecorder;
use crate::config::{GridwatchConfig, IngressConfig};
use crate::events::{EventBus, TelemetryEvent};
use crate::state::StateSnapshot;
use crate::stream::ThrottleExt;
use crate::types::UpdateRate;
use crate::{Result, TelemetryError};

/// Binds the telemetry socket and spawns the ingress task.
pub struct IngressService;

impl IngressService {
    /// Bind `config.ingress` and start receiving.
    ///
    /// The returned handle owns the task; dropping it stops ingress.
    pub async fn bind(config: GridwatchConfig) -> Result<IngressHandle> {
        config.validate()?;
        let GridwatchConfig { ingress, recorder } = config;

        let addr = ingress.socket_addr();
        let socket = UdpSocket::bind(addr).await.map_err(|e| {
            TelemetryError::connection_failed_with_source(
                format!("failed to bind UDP {addr}"),
                Box::new(e),
            )
        })?;
        let local_addr = socket.local_addr().map_err(|e| {
            TelemetryError::connection_failed_with_source("bound socket has no address", Box::new(e))
        })?;
        info!(%local_addr, "Telemetry ingress bound");

        let forward_to = match ingress.forward_to {
            Some(target) if target == local_addr => {
                warn!(%target, "Forward address is the ingress socket itself, forwarding disabled");
                None
            }
            other => other,
        };

        let events = EventBus::new(ingress.event_capacity);
        let recorder = CaptureRecorder::new(recorder, events.clone());
        let dispatcher = Dispatcher::new(events.clone(), Some(recorder.clone()), Instant::now());
        let (state_tx, state_rx) = watch::channel(Arc::new(dispatcher.snapshot()));
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run(
            socket,
            forward_to,
            dispatcher,
            state_tx,
            cancel.clone(),
            ingress.clone(),
        ));

        Ok(IngressHandle {
            local_addr,
            events,
            recorder,
            snapshots: state_rx,
            cancel,
            task: Some(task),
        })
    }
}

async fn run(
    socket: UdpSocket,
    forward_to: Option<SocketAddr>,
    mut dispatcher: Dispatcher,
    state_tx: watch::Sender<Arc<StateSnapshot>>,
    cancel: CancellationToken,
    config: IngressConfig,
) {
    let period = config.statistics_interval();
    let mut ticker = interval_at(Instant::now() + period, period);
    let mut buf = vec![0u8; config.receive_buffer_bytes];
    let mut received = 0u64;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Ingress cancelled");
                break;
            }
            _ = ticker.tick() => {
                dispatcher.roll_statistics(Instant::now());
            }
            result = socket.recv_from(&mut buf) => {
                let (len, from) = match result {
                    Ok(r) => r,
                    Err(e) => {
                        // ICMP port-unreachable from a previous forward can surface here.
                        warn!(error = %e, "UDP receive error");
                        continue;
                    }
                };
                received += 1;
                let raw = &buf[..len];
                let outcome = dispatcher.dispatch(raw, crate::unix_time_ms());

                if let Some(target) = forward_to.filter(|_| outcome.is_accepted()) {
                    if let Err(e) = socket.try_send_to(raw, target) {
                        debug!(%target, %from, error = %e, "Forward dropped");
                    }
                }

                // Counters move on every datagram, so every outcome republishes.
                state_tx.send_replace(Arc::new(dispatcher.snapshot()));
            }
        }
    }

    info!(received, "Ingress task ended");
}

/// Control surface for a running ingress task.
pub struct IngressHandle {
    local_addr: SocketAddr,
    events: EventBus,
    recorder: CaptureRecorder,
    snapshots: watch::Receiver<Arc<StateSnapshot>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl IngressHandle {
    /// The bound address; useful when binding port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Event stream; slow consumers skip ahead.
    pub fn events(&self) -> impl Stream<Item = TelemetryEvent> + Send + 'static {
        self.events.stream()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<TelemetryEvent> {
        self.events.subscribe()
    }

    /// The recording state machine fed by this ingress.
    pub fn recorder(&self) -> &CaptureRecorder {
        &self.recorder
    }

    /// Latest state snapshot.
    pub fn snapshot(&self) -> Arc<StateSnapshot> {
        Arc::clone(&self.snapshots.borrow())
    }

    /// Snapshots as they change, optionally rate limited.
    pub fn snapshots(&self, rate: UpdateRate) -> impl Stream<Item = Arc<StateSnapshot>> + 'static {
        let stream = WatchStream::new(self.snapshots.clone());
        match rate.interval() {
            None => stream.boxed(),
            Some(period) => stream.throttle(period).boxed(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop receiving and wait for the task to exit. A recording in
    /// progress is left as it is.
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Ingress task panicked");
            }
        }
        info!(local_addr = %self.local_addr, "Telemetry ingress stopped");
    }
}

impl Drop for IngressHandle {
    fn drop(&mut self) {
        debug!("Dropping ingress handle");
        self.cancel.cancel();
    }
}
