pub mod key_servers;
pub mod key_stores;
