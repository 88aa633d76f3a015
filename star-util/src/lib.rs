pub mod common_io;
pub mod parquet;
pub mod star;
