pub mod normalizer;
pub mod poller;
pub mod store;
pub mod submitter;
pub mod timeout;
pub mod webhook;
