// src/network/message.rs
// Gossip wire messages. JSON objects discriminated by "type".

use crate::blockchain::BlockHeader;
use crate::event::Event;
use crate::types::{canonical_json, sha256_hex, HexBytes};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GossipMessage {
    NewStatement {
        event: Event,
    },
    MinedMicroblock {
        event_id: String,
        index: usize,
        /// Encoded seed chain (header byte + payload).
        chain: HexBytes,
        miner: String,
    },
    FinalizedBlock {
        header: BlockHeader,
        events: Vec<Event>,
    },
    Ping {
        sender: String,
        sent_at: f64,
    },
    Pong {
        sender: String,
        in_reply_to: String,
    },
    PeerExchange {
        sender: String,
        peers: Vec<String>,
    },
}

impl GossipMessage {
    pub fn type_name(&self) -> &'static str {
        match self {
            GossipMessage::NewStatement { .. } => "NEW_STATEMENT",
            GossipMessage::MinedMicroblock { .. } => "MINED_MICROBLOCK",
            GossipMessage::FinalizedBlock { .. } => "FINALIZED_BLOCK",
            GossipMessage::Ping { .. } => "PING",
            GossipMessage::Pong { .. } => "PONG",
            GossipMessage::PeerExchange { .. } => "PEER_EXCHANGE",
        }
    }

    /// Dedup identity: `TYPE:event_id[:index]` where the message names an
    /// event, otherwise the sha256 of its canonical JSON.
    pub fn message_id(&self) -> String {
        match self {
            GossipMessage::NewStatement { event } => {
                format!("{}:{}", self.type_name(), event.statement_id())
            }
            GossipMessage::MinedMicroblock { event_id, index, .. } => {
                format!("{}:{}:{}", self.type_name(), event_id, index)
            }
            _ => sha256_hex(&canonical_json(self).unwrap_or_default()),
        }
    }

    pub fn sender(&self) -> Option<&str> {
        match self {
            GossipMessage::Ping { sender, .. }
            | GossipMessage::Pong { sender, .. }
            | GossipMessage::PeerExchange { sender, .. } => Some(sender),
            _ => None,
        }
    }

    /// True for messages that carry consensus data rather than presence.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            GossipMessage::NewStatement { .. }
                | GossipMessage::MinedMicroblock { .. }
                | GossipMessage::FinalizedBlock { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GENESIS_HASH;

    #[test]
    fn test_wire_tag() {
        let msg = GossipMessage::Ping {
            sender: "a".into(),
            sent_at: 1.0,
        };
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v["type"], "PING");
        assert_eq!(v["sender"], "a");

        let raw = r#"{"type":"PEER_EXCHANGE","sender":"b","peers":["x","y"]}"#;
        let parsed: GossipMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.sender(), Some("b"));
    }

    #[test]
    fn test_message_ids() {
        let mined = GossipMessage::MinedMicroblock {
            event_id: "e1".into(),
            index: 3,
            chain: HexBytes::new(vec![0x11, 0xaa]),
            miner: "m".into(),
        };
        assert_eq!(mined.message_id(), "MINED_MICROBLOCK:e1:3");

        let event = Event::new("statement", 4, GENESIS_HASH, None).unwrap();
        let id = event.statement_id().to_string();
        let new = GossipMessage::NewStatement { event };
        assert_eq!(new.message_id(), format!("NEW_STATEMENT:{}", id));

        let a = GossipMessage::Pong {
            sender: "a".into(),
            in_reply_to: "b".into(),
        };
        let b = GossipMessage::Pong {
            sender: "a".into(),
            in_reply_to: "c".into(),
        };
        assert_eq!(a.message_id().len(), 64);
        assert_ne!(a.message_id(), b.message_id());
        assert_eq!(a.message_id(), a.clone().message_id());
    }
}
