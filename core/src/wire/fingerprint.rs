use crate::wire::AlertRecord;
use std::fmt;

/// Key identifying one hazard event across re-broadcasts.
///
/// Built from the sequence number and the sender position rounded to whole
/// units, so relays reporting slightly different coordinates for the same
/// event collide on the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AlertFingerprint(String);

impl AlertFingerprint {
    pub fn of(alert: &AlertRecord) -> Self {
        let xq = alert.sender_position_x.round() as i64;
        let yq = alert.sender_position_y.round() as i64;
        Self(format!("{}|{}|{}", alert.sequence_number, xq, yq))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AlertFingerprint {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for AlertFingerprint {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for AlertFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
