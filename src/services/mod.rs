pub mod atomic_file;
pub mod file_store;
pub mod local_storage;
pub mod order_service;
pub mod order_store;
