pub mod delete;
pub mod export;
pub mod import;
pub mod list;
pub mod scan;
pub mod upload;
