pub mod connection;
pub mod engine;
pub mod instance;
pub mod manager;
pub mod naming;

pub use manager::InstanceManager;
