mod offset;
mod tables;

pub use offset::{payload_locations, PayloadLocation};
pub use tables::SampleTables;
