pub mod backend;
pub mod db;
pub mod errors;
pub mod helpers;
pub mod kv;
pub mod memory;
