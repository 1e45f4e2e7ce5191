pub mod pcm_format;
