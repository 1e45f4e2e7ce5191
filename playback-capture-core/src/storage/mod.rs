pub mod metadata;
pub mod naming;
pub mod pcm_writer;
