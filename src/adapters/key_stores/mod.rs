pub mod file_key_ring_store;
