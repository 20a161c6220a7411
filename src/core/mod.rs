pub mod config;
pub mod conversation;
pub mod dispatcher;
pub mod message;
pub mod preferences;
pub mod probe;
pub mod providers;
pub mod reply;
pub mod session;
pub mod storage;
pub mod usage;
