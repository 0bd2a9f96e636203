use crate::math::geometry::Position;
use crate::prelude::WireError;
use serde::{Deserialize, Serialize};

/// Hazard notification as carried on the wire. Never mutated once sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
    /// Assigned by the originating sender; not unique across senders.
    pub sequence_number: u64,
    pub sender_position_x: f64,
    pub sender_position_y: f64,
    pub emission_timestamp: f64,
    /// Logical payload size in bytes, kept for framing statistics.
    pub payload_length: u32,
}

impl AlertRecord {
    pub fn new(
        sequence_number: u64,
        sender_position: Position,
        emission_timestamp: f64,
        payload_length: u32,
    ) -> Self {
        Self {
            sequence_number,
            sender_position_x: sender_position.x,
            sender_position_y: sender_position.y,
            emission_timestamp,
            payload_length,
        }
    }

    pub fn sender_position(&self) -> Position {
        Position::new(self.sender_position_x, self.sender_position_y)
    }

    /// Outbound copy for re-broadcast. Every field, the emission timestamp
    /// included, is carried over so delay stays end-to-end.
    pub fn relayed(&self) -> AlertRecord {
        self.clone()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        let record: AlertRecord = serde_json::from_slice(bytes)?;
        record.check_finite()?;
        Ok(record)
    }

    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        self.check_finite()?;
        Ok(serde_json::to_vec(self)?)
    }

    fn check_finite(&self) -> Result<(), WireError> {
        if !self.sender_position_x.is_finite() {
            return Err(WireError::NonFinite("senderPositionX"));
        }
        if !self.sender_position_y.is_finite() {
            return Err(WireError::NonFinite("senderPositionY"));
        }
        if !self.emission_timestamp.is_finite() {
            return Err(WireError::NonFinite("emissionTimestamp"));
        }
        Ok(())
    }
}
