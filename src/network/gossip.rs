// src/network/gossip.rs
// Flood gossip with dedup and PING/PONG presence.
//
// `GossipNode` owns the inbox and is driven by one task. Its seen set and
// peer table live in `GossipShared` so background senders can broadcast
// through a cloned `GossipSender`.

use super::dedup::SeenCache;
use super::message::GossipMessage;
use crate::types::now_secs;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Anything that can deliver a message to every other participant.
pub trait GossipTransport: Send + Sync {
    fn broadcast(&self, sender_id: &str, message: &GossipMessage);
}

/// In-process broadcast bus for tests and simulations.
#[derive(Default)]
pub struct LocalGossipNetwork {
    nodes: Mutex<HashMap<String, mpsc::UnboundedSender<GossipMessage>>>,
}

impl LocalGossipNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register `node_id`, returning its inbox.
    pub fn register(&self, node_id: &str) -> mpsc::UnboundedReceiver<GossipMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.nodes.lock().insert(node_id.to_string(), tx);
        rx
    }

    pub fn unregister(&self, node_id: &str) {
        self.nodes.lock().remove(node_id);
    }

    pub fn node_count(&self) -> usize {
        self.nodes.lock().len()
    }
}

impl GossipTransport for LocalGossipNetwork {
    fn broadcast(&self, sender_id: &str, message: &GossipMessage) {
        let mut nodes = self.nodes.lock();
        // Drop nodes whose inbox has gone away.
        nodes.retain(|node_id, tx| node_id == sender_id || tx.send(message.clone()).is_ok());
    }
}

pub struct GossipShared {
    node_id: String,
    transport: Arc<dyn GossipTransport>,
    seen: Mutex<SeenCache>,
    known_peers: Mutex<BTreeSet<String>>,
}

impl GossipShared {
    /// Broadcast unless already seen. Returns true if the message went out.
    pub fn send(&self, message: &GossipMessage) -> bool {
        let id = message.message_id();
        if !self.seen.lock().check_and_mark(&id) {
            return false;
        }
        if message.is_protocol() {
            info!(node = %self.node_id, kind = message.type_name(), "broadcasting");
        }
        self.transport.broadcast(&self.node_id, message);
        true
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn known_peers(&self) -> Vec<String> {
        self.known_peers.lock().iter().cloned().collect()
    }

    pub fn add_peer(&self, peer: &str) -> bool {
        if peer.is_empty() || peer == self.node_id {
            return false;
        }
        self.known_peers.lock().insert(peer.to_string())
    }
}

/// Cloneable broadcast handle.
pub type GossipSender = Arc<GossipShared>;

pub struct GossipNode {
    shared: GossipSender,
    inbox: mpsc::UnboundedReceiver<GossipMessage>,
}

impl GossipNode {
    pub fn new(
        node_id: impl Into<String>,
        transport: Arc<dyn GossipTransport>,
        inbox: mpsc::UnboundedReceiver<GossipMessage>,
        seen_ttl: Duration,
    ) -> Self {
        Self {
            shared: Arc::new(GossipShared {
                node_id: node_id.into(),
                transport,
                seen: Mutex::new(SeenCache::new(seen_ttl)),
                known_peers: Mutex::new(BTreeSet::new()),
            }),
            inbox,
        }
    }

    /// Join an in-process network.
    pub fn join_local(node_id: &str, network: &Arc<LocalGossipNetwork>, seen_ttl: Duration) -> Self {
        let inbox = network.register(node_id);
        let transport: Arc<dyn GossipTransport> = network.clone();
        Self::new(node_id, transport, inbox, seen_ttl)
    }

    pub fn node_id(&self) -> &str {
        self.shared.node_id()
    }

    pub fn sender(&self) -> GossipSender {
        self.shared.clone()
    }

    pub fn send(&self, message: &GossipMessage) -> bool {
        self.shared.send(message)
    }

    /// Re-broadcast a message received from a peer. Same dedup as `send`.
    pub fn forward(&self, message: &GossipMessage) -> bool {
        self.shared.send(message)
    }

    pub fn known_peers(&self) -> Vec<String> {
        self.shared.known_peers()
    }

    pub fn broadcast_presence(&self) -> bool {
        self.send(&GossipMessage::Ping {
            sender: self.node_id().to_string(),
            sent_at: now_secs(),
        })
    }

    pub fn advertise_peers(&self) -> bool {
        self.send(&GossipMessage::PeerExchange {
            sender: self.node_id().to_string(),
            peers: self.known_peers(),
        })
    }

    /// Next unseen message, with presence and peer exchange handled.
    /// `None` when the timeout elapses or the inbox is closed.
    pub async fn receive(&mut self, timeout: Option<Duration>) -> Option<GossipMessage> {
        let deadline = timeout.map(|t| tokio::time::Instant::now() + t);
        loop {
            let next = match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, self.inbox.recv())
                    .await
                    .ok()
                    .flatten(),
                None => self.inbox.recv().await,
            };
            let message = next?;
            if !self.shared.seen.lock().check_and_mark(&message.message_id()) {
                continue;
            }
            self.handle_presence(&message);
            if message.is_protocol() {
                debug!(node = %self.node_id(), kind = message.type_name(), "received");
            }
            return Some(message);
        }
    }

    fn handle_presence(&self, message: &GossipMessage) {
        match message {
            GossipMessage::Ping { sender, .. } if sender != self.node_id() => {
                // Known peers already have our presence.
                if self.shared.add_peer(sender) {
                    info!(node = %self.node_id(), peer = %sender, "discovered peer");
                    self.send(&GossipMessage::Pong {
                        sender: self.node_id().to_string(),
                        in_reply_to: sender.clone(),
                    });
                }
            }
            GossipMessage::Pong { sender, .. } => {
                self.shared.add_peer(sender);
            }
            GossipMessage::PeerExchange { sender, peers } => {
                self.shared.add_peer(sender);
                for peer in peers.iter().take(50) {
                    self.shared.add_peer(peer);
                }
            }
            _ => {}
        }
    }
}
