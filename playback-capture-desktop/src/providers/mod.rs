#[cfg(feature = "cpal")]
pub mod device;
pub mod replay;

#[cfg(feature = "cpal")]
pub use device::CpalProvider;
pub use replay::ReplayProvider;
