pub mod audio_models;
pub mod authorization;
pub mod config;
pub mod error;
pub mod recording_result;
pub mod state;
