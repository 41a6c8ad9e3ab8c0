//! IdGenerator port - item ID generation.

use std::sync::Arc;

use ulid::Ulid;

use crate::domain::ItemId;
use crate::ports::Clock;

pub trait IdGenerator: Send + Sync {
    fn generate_item_id(&self) -> ItemId;
}

/// ULID generator whose timestamp part comes from a `Clock`.
///
/// With a `FixedClock` every ID shares the same timestamp and differs only in
/// the random part.
pub struct UlidGenerator {
    clock: Arc<dyn Clock>,
}

impl UlidGenerator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl IdGenerator for UlidGenerator {
    fn generate_item_id(&self) -> ItemId {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        let ulid = Ulid::from_parts(timestamp_ms, rand::random());
        ItemId::from(ulid)
    }
}
