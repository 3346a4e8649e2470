pub mod hkp_key_server;
