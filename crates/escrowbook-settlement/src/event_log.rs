//! Append-only, hash-chained event log.
//!
//! Each record commits to its predecessor:
//!
//! ```text
//! digest[n] = SHA-256(domain || digest[n-1] || json(event[n]))      digest[0] = 0x00…00
//! ```
//!
//! Rewriting or reordering any record breaks every digest after it, which
//! [`EventLog::verify_chain`] detects.

use chrono::Utc;
use escrowbook_types::{EscrowError, EscrowEvent, EventRecord, Result, constants};
use sha2::{Digest, Sha256};

/// Ordered record of every emitted [`EscrowEvent`].
#[derive(Debug, Default)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event and return its record.
    ///
    /// # Errors
    /// `Serialization` if the event cannot be encoded for hashing.
    pub fn append(&mut self, event: EscrowEvent) -> Result<&EventRecord> {
        let digest = chain_digest(&self.head(), &event)?;
        let sequence = self.records.len() as u64 + 1;
        tracing::debug!(sequence, event = event.name(), digest = %hex::encode(digest), "Event recorded");
        self.records.push(EventRecord {
            sequence,
            recorded_at: Utc::now(),
            event,
            digest,
        });
        let last = self.records.len() - 1;
        Ok(&self.records[last])
    }

    /// Append several events in order.
    pub fn extend(&mut self, events: impl IntoIterator<Item = EscrowEvent>) -> Result<()> {
        for event in events {
            self.append(event)?;
        }
        Ok(())
    }

    /// Digest of the latest record, zeroes when empty.
    #[must_use]
    pub fn head(&self) -> [u8; 32] {
        self.records.last().map_or([0u8; 32], |r| r.digest)
    }

    #[must_use]
    pub fn head_hex(&self) -> String {
        hex::encode(self.head())
    }

    #[must_use]
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Records with `sequence > after`.
    #[must_use]
    pub fn since(&self, after: u64) -> &[EventRecord] {
        let start = usize::try_from(after).unwrap_or(usize::MAX).min(self.records.len());
        &self.records[start..]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Recompute the chain from genesis.
    ///
    /// # Errors
    /// `EventLogCorrupted` naming the first record whose sequence or digest
    /// does not match.
    pub fn verify_chain(&self) -> Result<()> {
        let mut prev = [0u8; 32];
        for (i, record) in self.records.iter().enumerate() {
            let expected_seq = i as u64 + 1;
            if record.sequence != expected_seq || chain_digest(&prev, &record.event)? != record.digest {
                tracing::error!(sequence = record.sequence, "Event log chain broken");
                return Err(EscrowError::EventLogCorrupted {
                    sequence: record.sequence,
                });
            }
            prev = record.digest;
        }
        Ok(())
    }

    #[cfg(test)]
    fn records_mut(&mut self) -> &mut [EventRecord] {
        &mut self.records
    }
}

fn chain_digest(prev: &[u8; 32], event: &EscrowEvent) -> Result<[u8; 32]> {
    let body = serde_json::to_vec(event)?;
    let mut hasher = Sha256::new();
    hasher.update(constants::EVENT_DIGEST_DOMAIN);
    hasher.update(prev);
    hasher.update(&body);
    Ok(hasher.finalize().into())
}
