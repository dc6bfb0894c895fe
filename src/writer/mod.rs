// Byte sinks — destinations for downloaded data.

pub mod file_writer;
pub mod memory_writer;
pub mod traits;

pub use file_writer::FileWriter;
pub use memory_writer::MemoryWriter;
pub use traits::{ByteSink, SharedSink};
