pub mod cancellation;
pub mod key_id;
pub mod key_ring;
pub mod key_ring_entry;
pub mod outcome;
