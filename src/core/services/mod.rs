pub mod import_export;
pub mod key_material_decoder;
pub mod key_ring_merger;
pub mod key_server_uploader;
