pub mod config;
pub mod logging;

pub mod coordinator;
pub mod dispatch;
pub mod download;
pub mod entity;
pub mod fetch;
pub mod fsname;
pub mod probe;
pub mod retry;
pub mod source;
pub mod storage;
