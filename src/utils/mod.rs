pub mod logging;
pub mod trace;
pub mod url;
