pub mod chat_request;
pub mod config;
pub mod message;
pub mod notify;
pub mod routing;
pub mod search;
pub mod session;
pub mod store;
