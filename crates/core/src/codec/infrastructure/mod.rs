pub mod data_uri_encoder;
pub mod disk_file;
pub mod in_memory_file;
