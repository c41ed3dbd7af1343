pub(crate) mod config;
pub(crate) mod request;
pub(crate) mod watch;
