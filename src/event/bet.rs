// src/event/bet.rs
// Signed YES/NO stakes on a statement.

use crate::crypto;
use crate::error::Result;
use crate::types::{canonical_json, HexBytes};
use ed25519_dalek::SigningKey;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BetChoice {
    Yes,
    No,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bet {
    pub event_id: String,
    pub choice: BetChoice,
    pub amount: u64,
    pub pubkey: HexBytes,
    pub signature: HexBytes,
}

#[derive(Serialize)]
struct BetPayload<'a> {
    event_id: &'a str,
    choice: BetChoice,
    amount: u64,
    pubkey: &'a HexBytes,
}

impl Bet {
    pub fn new_signed(
        event_id: impl Into<String>,
        choice: BetChoice,
        amount: u64,
        key: &SigningKey,
    ) -> Result<Self> {
        let mut bet = Bet {
            event_id: event_id.into(),
            choice,
            amount,
            pubkey: HexBytes::new(key.verifying_key().to_bytes().to_vec()),
            signature: HexBytes::default(),
        };
        let (_, sig) = crypto::sign_bytes(key, &bet.signing_payload()?);
        bet.signature = HexBytes::new(sig);
        Ok(bet)
    }

    /// Canonical JSON of every field except the signature.
    pub fn signing_payload(&self) -> Result<Vec<u8>> {
        Ok(canonical_json(&BetPayload {
            event_id: &self.event_id,
            choice: self.choice,
            amount: self.amount,
            pubkey: &self.pubkey,
        })?)
    }

    pub fn verify(&self) -> bool {
        match self.signing_payload() {
            Ok(payload) => crypto::verify_bytes(&self.pubkey, &payload, &self.signature),
            Err(_) => false,
        }
    }

    pub fn bettor(&self) -> String {
        self.pubkey.to_hex()
    }
}

/// Bets on one event, bucketed by side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bets {
    #[serde(rename = "YES", default)]
    pub yes: Vec<Bet>,
    #[serde(rename = "NO", default)]
    pub no: Vec<Bet>,
}

impl Bets {
    pub fn push(&mut self, bet: Bet) {
        match bet.choice {
            BetChoice::Yes => self.yes.push(bet),
            BetChoice::No => self.no.push(bet),
        }
    }

    /// Bets on `choice` whose signatures verify.
    pub fn valid(&self, choice: BetChoice) -> impl Iterator<Item = &Bet> {
        let side = match choice {
            BetChoice::Yes => &self.yes,
            BetChoice::No => &self.no,
        };
        side.iter().filter(move |b| b.choice == choice && b.verify())
    }

    pub fn total(&self, choice: BetChoice) -> u64 {
        self.valid(choice).map(|b| b.amount).sum()
    }
}
