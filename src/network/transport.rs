// src/network/transport.rs
// TCP gossip transport: length-delimited JSON frames, one writer task and
// one reader task per connection. Inbound frames are decoded and pushed
// into the owning node's inbox.

use super::gossip::GossipTransport;
use super::message::GossipMessage;
use crate::error::Result;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tracing::{debug, info, warn};

/// Largest frame accepted from a peer.
pub const MAX_FRAME_BYTES: usize = 256 * 1024;

pub struct TcpTransport {
    peers: Mutex<HashMap<String, mpsc::UnboundedSender<Bytes>>>,
    inbound: mpsc::UnboundedSender<GossipMessage>,
}

impl TcpTransport {
    /// New transport plus the inbox its connections feed.
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<GossipMessage>) {
        let (inbound, inbox) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                peers: Mutex::new(HashMap::new()),
                inbound,
            }),
            inbox,
        )
    }

    pub fn peer_count(&self) -> usize {
        self.peers.lock().len()
    }

    /// Bind `addr` and accept peers in the background. Returns the bound
    /// address (useful with port 0).
    pub async fn listen(self: &Arc<Self>, addr: &str) -> Result<SocketAddr> {
        let listener = TcpListener::bind(addr).await?;
        let local = listener.local_addr()?;
        info!(%local, "gossip listener started");
        let transport = self.clone();
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => transport.attach(stream, peer.to_string()),
                    Err(e) => {
                        warn!("gossip accept failed: {}", e);
                        break;
                    }
                }
            }
        });
        Ok(local)
    }

    pub async fn connect(self: &Arc<Self>, addr: &str) -> Result<()> {
        let stream = TcpStream::connect(addr).await?;
        self.attach(stream, addr.to_string());
        Ok(())
    }

    fn attach(self: &Arc<Self>, stream: TcpStream, peer: String) {
        let codec = LengthDelimitedCodec::builder()
            .max_frame_length(MAX_FRAME_BYTES)
            .new_codec();
        let (mut sink, mut stream) = Framed::new(stream, codec).split();
        let (tx, mut rx) = mpsc::unbounded_channel::<Bytes>();
        self.peers.lock().insert(peer.clone(), tx);
        debug!(%peer, "gossip peer attached");

        let writer_peer = peer.clone();
        tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                if let Err(e) = sink.send(frame).await {
                    debug!(peer = %writer_peer, "gossip write failed: {}", e);
                    break;
                }
            }
        });

        let transport = self.clone();
        tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                let bytes = match frame {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        debug!(%peer, "gossip read failed: {}", e);
                        break;
                    }
                };
                match serde_json::from_slice::<GossipMessage>(&bytes) {
                    Ok(message) => {
                        if transport.inbound.send(message).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(%peer, "undecodable gossip frame: {}", e),
                }
            }
            transport.peers.lock().remove(&peer);
            debug!(%peer, "gossip peer detached");
        });
    }
}

impl GossipTransport for TcpTransport {
    fn broadcast(&self, _sender_id: &str, message: &GossipMessage) {
        let frame = match serde_json::to_vec(message) {
            Ok(bytes) => Bytes::from(bytes),
            Err(e) => {
                warn!("failed to encode gossip message: {}", e);
                return;
            }
        };
        self.peers
            .lock()
            .retain(|_, tx| tx.send(frame.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::gossip::GossipNode;
    use std::time::Duration;

    #[tokio::test]
    async fn test_messages_cross_tcp() {
        let (server, server_inbox) = TcpTransport::new();
        let addr = server.listen("127.0.0.1:0").await.unwrap();
        let mut server_node = GossipNode::new("server", server.clone(), server_inbox, Duration::from_secs(300));

        let (client, client_inbox) = TcpTransport::new();
        client.connect(&addr.to_string()).await.unwrap();
        let client_node = GossipNode::new("client", client.clone(), client_inbox, Duration::from_secs(300));

        assert!(client_node.broadcast_presence());
        let got = server_node
            .receive(Some(Duration::from_secs(5)))
            .await
            .expect("ping delivered");
        assert_eq!(got.type_name(), "PING");
        assert_eq!(server_node.known_peers(), vec!["client".to_string()]);
    }
}
