//! Reassembly of responses delivered in several chunks
//!
//! Some clients cannot serialise large payloads in one go and split them.
//! The chunk with index 0 carries every response field; follow-up chunks
//! carry only `{id, totalChunks, index, data}`. Chunks may arrive in any
//! order. Each chunk is base64 encoded on its own.

use std::collections::{BTreeMap, HashMap};

use crate::decode::{decode_base64, encode_base64, DecodeError};
use crate::models::{PartialResponse, PartialResponseMessage, ResponseInfo};

/// Pending multi-part responses keyed by response id
#[derive(Debug, Clone, Default)]
pub struct PartialResponses {
    entries: BTreeMap<String, PartialResponse>,
    /// First time each entry was seen by `prune_stale`, in ms
    seen_at: HashMap<String, i64>,
}

impl PartialResponses {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore pending entries from a saved session
    pub fn from_snapshot(entries: BTreeMap<String, PartialResponse>) -> Self {
        Self {
            entries,
            seen_at: HashMap::new(),
        }
    }

    pub fn snapshot(&self) -> BTreeMap<String, PartialResponse> {
        self.entries.clone()
    }

    pub fn get(&self, id: &str) -> Option<&PartialResponse> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record one chunk. Returns the assembled response once every chunk for
    /// its id has arrived; the pending entry is removed at that point.
    pub fn accept(&mut self, message: PartialResponseMessage) -> Option<ResponseInfo> {
        let id = message.id().to_string();
        if let PartialResponseMessage::Followup(chunk) = &message {
            if chunk.index == 0 || chunk.index >= chunk.total_chunks {
                tracing::warn!(
                    response_id = %id,
                    "ignoring chunk {} outside 1..{}",
                    chunk.index,
                    chunk.total_chunks
                );
                return None;
            }
        }

        let entry = self.entries.entry(id.clone()).or_default();
        match message {
            PartialResponseMessage::Followup(chunk) => {
                entry.followup_chunks.insert(chunk.index, chunk.data);
            }
            PartialResponseMessage::Initial(response) => {
                entry.initial_response = Some(response);
            }
        }

        let assembled = assemble_if_complete(entry)?;
        self.entries.remove(&id);
        self.seen_at.remove(&id);
        tracing::debug!(response_id = %id, "assembled multi-part response");
        Some(assembled)
    }

    /// Evict entries pending for longer than `ttl_ms`. Entries are stamped the
    /// first time they are seen here. Returns the evicted ids.
    pub fn prune_stale(&mut self, now_ms: i64, ttl_ms: u64) -> Vec<String> {
        for id in self.entries.keys() {
            self.seen_at.entry(id.clone()).or_insert(now_ms);
        }
        let cutoff = now_ms.saturating_sub(ttl_ms.min(i64::MAX as u64) as i64);
        let stale: Vec<String> = self
            .seen_at
            .iter()
            .filter(|(_, seen)| **seen < cutoff)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &stale {
            self.entries.remove(id);
            self.seen_at.remove(id);
            tracing::warn!(response_id = %id, "dropping incomplete multi-part response after {}ms", ttl_ms);
        }
        stale
    }
}

/// Build the full response if the initial chunk and follow-ups
/// `1..totalChunks` are all present. Chunks outside that range are ignored.
///
/// A response without `totalChunks` counts as a single chunk.
pub fn assemble_if_complete(partial: &PartialResponse) -> Option<ResponseInfo> {
    let initial = partial.initial_response.as_ref()?;
    let total = initial.total_chunks.unwrap_or(1).max(1);
    let followups = (1..total)
        .map(|index| partial.followup_chunks.get(&index).map(String::as_str))
        .collect::<Option<Vec<_>>>()?;

    let chunks = std::iter::once(initial.data.as_deref().unwrap_or_default()).chain(followups);
    let data = match combine_base64_chunks(chunks) {
        Ok(data) => Some(data),
        Err(err) => {
            tracing::warn!(response_id = %initial.id, "failed to combine response chunks: {}", err);
            None
        }
    };
    Some(ResponseInfo {
        data,
        ..initial.clone()
    })
}

/// Decode each chunk separately, concatenate the bytes and re-encode.
pub fn combine_base64_chunks<'a>(
    chunks: impl IntoIterator<Item = &'a str>,
) -> Result<String, DecodeError> {
    let mut combined = Vec::new();
    for chunk in chunks {
        combined.extend(decode_base64(chunk)?);
    }
    Ok(encode_base64(&combined))
}
