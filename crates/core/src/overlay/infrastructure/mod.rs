pub mod frame_painter;
pub mod image_file_writer;
