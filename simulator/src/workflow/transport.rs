use alertcore::prelude::{AlertTransport, TransportError};
use alertcore::AlertRecord;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;

/// Sends relayed alerts over the node's UDP socket without waiting.
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
}

impl UdpTransport {
    pub fn new(socket: Arc<UdpSocket>) -> Self {
        Self { socket }
    }
}

impl AlertTransport for UdpTransport {
    fn send_to(
        &mut self,
        alert: &AlertRecord,
        destination: SocketAddr,
    ) -> Result<(), TransportError> {
        let datagram = alert.encode()?;
        // `WouldBlock` is returned as an error rather than waited on. The relay
        // releases the fingerprint on any send failure, so the next copy of
        // the event retries once the live loop has waited for writability.
        self.socket.try_send_to(&datagram, destination)?;
        Ok(())
    }
}

/// Keeps relayed datagrams in memory for offline runs.
#[derive(Default)]
pub struct CollectingTransport {
    outbox: Vec<(SocketAddr, Vec<u8>)>,
}

impl CollectingTransport {
    pub fn drain(&mut self) -> Vec<(SocketAddr, Vec<u8>)> {
        std::mem::take(&mut self.outbox)
    }

    pub fn pending(&self) -> usize {
        self.outbox.len()
    }
}

impl AlertTransport for CollectingTransport {
    fn send_to(
        &mut self,
        alert: &AlertRecord,
        destination: SocketAddr,
    ) -> Result<(), TransportError> {
        self.outbox.push((destination, alert.encode()?));
        Ok(())
    }
}
