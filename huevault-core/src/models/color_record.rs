use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::hex_code::HexCode;

/// A generated color and whether it has reached the remote store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColorRecord {
    pub id: Uuid,
    pub hex_code: HexCode,
    pub created_at: DateTime<Utc>,
    pub synced: bool,
}

impl ColorRecord {
    pub fn new(hex_code: HexCode) -> Self {
        Self {
            id: Uuid::new_v4(),
            hex_code,
            // Microseconds is the precision the store keeps.
            created_at: Utc::now().trunc_subsecs(6),
            synced: false,
        }
    }
}
