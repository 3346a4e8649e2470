pub mod key_server;
pub mod key_store;
pub mod progress;
