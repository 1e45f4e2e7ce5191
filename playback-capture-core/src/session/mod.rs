pub(crate) mod capture_worker;
pub mod controller;
