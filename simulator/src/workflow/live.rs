use crate::workflow::config::{NodeConfig, Role};
use crate::workflow::transport::UdpTransport;
use crate::workflow::vehicle::SimNode;
use alertcore::telemetry::MetricsRecorder;
use alertcore::{AlertReceiver, AlertRelay, RelayOutcome};
use anyhow::Context;
use log::{debug, info, warn};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::net::UdpSocket;

const MAX_DATAGRAM: usize = 2048;
const RECV_BACKOFF_START: Duration = Duration::from_millis(10);
const RECV_BACKOFF_MAX: Duration = Duration::from_secs(1);
const RECV_FAILURE_LIMIT: u32 = 20;

/// Wall-clock seconds, the time base alert senders stamp with.
pub fn now_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or(0.0)
}

async fn bind_socket(node: &NodeConfig) -> anyhow::Result<Arc<UdpSocket>> {
    let local = SocketAddr::from(([0, 0, 0, 0], node.local_port));
    let socket = UdpSocket::bind(local)
        .await
        .with_context(|| format!("binding UDP port {}", node.local_port))?;
    socket
        .set_broadcast(true)
        .context("enabling broadcast on alert socket")?;
    if let Some(group) = node.multicast_group {
        let interface = node.multicast_interface.unwrap_or(Ipv4Addr::UNSPECIFIED);
        socket
            .join_multicast_v4(group, interface)
            .with_context(|| format!("joining multicast group {} on {}", group, interface))?;
    }
    if let Some(tos) = node.tos {
        socket
            .set_tos(tos)
            .with_context(|| format!("setting tos {} on alert socket", tos))?;
    }
    Ok(Arc::new(socket))
}

/// Paces retries after receive errors. Gives up after
/// `RECV_FAILURE_LIMIT` failures in a row.
#[derive(Debug, Default)]
struct RecvBackoff {
    failures: u32,
}

impl RecvBackoff {
    fn reset(&mut self) {
        self.failures = 0;
    }

    /// Delay before the next attempt, doubling up to `RECV_BACKOFF_MAX`.
    /// `None` once the failure limit is reached.
    fn next_delay(&mut self) -> Option<Duration> {
        self.failures += 1;
        if self.failures >= RECV_FAILURE_LIMIT {
            return None;
        }
        let factor = 1u32 << (self.failures - 1).min(16);
        Some(RECV_BACKOFF_START.saturating_mul(factor).min(RECV_BACKOFF_MAX))
    }
}

async fn recv_datagram(
    socket: &UdpSocket,
    buffer: &mut [u8],
    backoff: &mut RecvBackoff,
) -> anyhow::Result<(usize, SocketAddr)> {
    loop {
        match socket.recv_from(buffer).await {
            Ok(received) => {
                backoff.reset();
                return Ok(received);
            }
            Err(err) => match backoff.next_delay() {
                Some(delay) => {
                    warn!("receive failed, retrying in {:?}: {}", delay, err);
                    tokio::time::sleep(delay).await;
                }
                None => return Err(err).context("alert socket keeps failing"),
            },
        }
    }
}

/// Runs one node until the socket keeps failing. Datagrams are handled one at
/// a time, in arrival order.
pub async fn run_live(node: NodeConfig, metrics: Arc<MetricsRecorder>) -> anyhow::Result<()> {
    node.validate()?;
    let socket = bind_socket(&node).await?;
    let mut buffer = vec![0u8; MAX_DATAGRAM];
    let mut backoff = RecvBackoff::default();
    info!(
        "{} listening as {:?} on port {}",
        node.name, node.role, node.local_port
    );

    match node.role {
        Role::Relay => {
            let config = node.relay_config()?;
            socket
                .writable()
                .await
                .context("waiting for relay socket")?;
            let mut relay = AlertRelay::new(config, UdpTransport::new(socket.clone()), metrics)?;
            loop {
                let (len, peer) = recv_datagram(&socket, &mut buffer, &mut backoff).await?;
                let outcome = relay.handle_datagram(&buffer[..len], now_seconds());
                debug!(
                    "{} from {} -> {:?} (seen={})",
                    node.name,
                    peer,
                    outcome,
                    relay.seen_len()
                );
                if outcome == Some(RelayOutcome::SendFailed) {
                    socket
                        .writable()
                        .await
                        .context("waiting for relay socket")?;
                }
            }
        }
        Role::Receiver => {
            let platform = SimNode::from_section(&node.vehicle);
            let mut receiver = AlertReceiver::new(node.receiver.clone(), platform, metrics)?;
            loop {
                let (len, peer) = recv_datagram(&socket, &mut buffer, &mut backoff).await?;
                if let Some(outcome) = receiver.handle_datagram(&buffer[..len], now_seconds()) {
                    debug!("{} from {} -> {:?}", node.name, peer, outcome.reaction);
                    info!(
                        "{} {}, {}",
                        node.name,
                        receiver.status(),
                        receiver.platform().status()
                    );
                }
            }
        }
    }
}
