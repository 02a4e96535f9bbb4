pub mod memory;
pub mod records;
pub mod r#trait;

pub use memory::MemoryStore;
pub use r#trait::ModeStore;
pub use records::{ModeRecords, KEY_CALLSIGN, KEY_CURRENT_STATE};
