pub mod config;
pub mod logging;

pub mod entry_name;
pub mod fetch;
pub mod listing;
pub mod sync;
