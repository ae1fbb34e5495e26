pub mod command;
pub mod compactor;
pub mod engine;
pub mod limits;
pub mod lottery;
pub mod model;
pub mod observability;
pub mod wal;
pub mod wire;
