pub mod countries;
pub mod exchange;
pub mod refresh;
pub mod request_log;
pub mod sources;
