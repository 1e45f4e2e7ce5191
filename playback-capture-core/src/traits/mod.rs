pub mod authorization_provider;
pub mod capture_provider;
pub mod session_host;
