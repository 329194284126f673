pub mod client;
pub mod migration;
pub mod record;
pub mod store;
