pub mod alert;
pub mod fingerprint;

pub use alert::AlertRecord;
pub use fingerprint::AlertFingerprint;
