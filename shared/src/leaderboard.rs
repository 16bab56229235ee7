use serde::{Deserialize, Serialize};

/// Size of the opaque detail blob attached to every entry
pub const DETAILS_LEN: usize = 8;

/// A named board as resolved by the upstream service
///
/// An id of 0 is the upstream's way of saying the board does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardHandle {
    pub id: u64,
    pub name: String,
    pub entry_count: u32,
}

impl LeaderboardHandle {
    pub fn new(id: u64, name: impl Into<String>, entry_count: u32) -> Self {
        Self {
            id,
            name: name.into(),
            entry_count,
        }
    }

    /// Handle returned for a board the upstream could not find
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::new(0, name, 0)
    }

    pub fn is_found(&self) -> bool {
        self.id != 0
    }
}

/// One ranked record on a board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub steam_id: u64,
    pub score: i32,
    pub global_rank: u32,
    pub details: [u8; DETAILS_LEN],
}

impl LeaderboardEntry {
    /// Decodes the detail blob as two little-endian u32 values
    pub fn detail_values(&self) -> (u32, u32) {
        let [a0, a1, a2, a3, b0, b1, b2, b3] = self.details;
        (
            u32::from_le_bytes([a0, a1, a2, a3]),
            u32::from_le_bytes([b0, b1, b2, b3]),
        )
    }
}
