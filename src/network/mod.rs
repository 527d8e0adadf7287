// src/network/mod.rs
// Gossip protocol: messages, dedup, in-process and TCP transports.

pub mod dedup;
pub mod gossip;
pub mod message;
pub mod recorder;
pub mod transport;

pub use dedup::{SeenCache, DEFAULT_SEEN_TTL};
pub use gossip::{GossipNode, GossipSender, GossipShared, GossipTransport, LocalGossipNetwork};
pub use message::GossipMessage;
pub use recorder::{load_recording, replay_recording, GossipRecorder, RecordedMessage};
pub use transport::TcpTransport;
