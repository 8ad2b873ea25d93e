use burnish_protocol::records::{StoreKey, StoreRecord};

/// One observed store mutation: the affected key plus the value before and
/// after. `new: None` means the key was removed.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreChangeEnvelope {
    pub sequence: u64,
    pub key: StoreKey,
    pub old: Option<StoreRecord>,
    pub new: Option<StoreRecord>,
}
