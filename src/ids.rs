//! Identifier generation for compression results.
//!
//! Injected rather than ambient so tests can assert exact identifiers.

use crate::types::ImageId;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Source of fresh, unique result identifiers. Shared across workers.
pub trait IdGenerator: Sync {
    fn next_id(&self) -> ImageId;
}

/// Random v4 UUIDs. The production generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn next_id(&self) -> ImageId {
        ImageId(Uuid::new_v4())
    }
}

/// Deterministic counter: 1, 2, 3, ... encoded as UUIDs.
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> ImageId {
        let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        ImageId(Uuid::from_u128(n as u128))
    }
}
