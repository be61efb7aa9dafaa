mod header;

pub use header::AtomHeader;
