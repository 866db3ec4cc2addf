pub mod frame_source;
