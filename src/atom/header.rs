use std::ops::Range;

use crate::{consts::{ALLOWED, CONTAINER}, FourCC};

/// Atom header.
/// 8 or 16 bytes in MP4, depending on whether
/// 32 or 64-bit sized.
///
/// ```ignore
/// | [X X X X] [Y Y Y Y] [Z Z Z Z Z Z Z Z] |
///    |         |         |
///    |         |         64bit size (optional, only if 32 bit size == 1)
///    |         FourCC
///    32bit size
/// ```
#[derive(Debug, Clone, Default)]
pub struct AtomHeader {
    /// Total atom size in bytes including 8/16 byte header.
    pub(crate) atom_size: u64,
    /// FourCC
    pub(crate) name: FourCC,
    /// Absolute byte offset for start of atom,
    /// i.e. byte offset for its header,
    /// starting with 32-bit size.
    pub(crate) offset: u64,
    /// Relative offset to next atom
    /// counting from start of data load.
    /// `0` for containers, since the next
    /// atom is the first child.
    pub(crate) next: u64,
    /// Set to `true` if atom size is specified
    /// in the 64 bit area, regardless of actual
    /// atom size, since header size can not
    /// be derived post-parse otherwise.
    pub(crate) size_64bit: bool
}

impl AtomHeader {
    /// Whether atom is a container that is
    /// descended into rather than skipped.
    pub fn is_container(&self) -> bool {
        CONTAINER.contains(&self.name.to_str())
    }

    /// Whether atom is decoded or descended into.
    pub fn is_allowed(&self) -> bool {
        ALLOWED.contains(&self.name.to_str())
    }

    pub fn atom_size(&self) -> u64 {
        self.atom_size
    }

    pub fn name(&self) -> &FourCC {
        &self.name
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Header size in bytes, 8 or 16.
    pub fn header_size(&self) -> u8 {
        match self.size_64bit {
            true => 16,
            false => 8,
        }
    }

    /// Data load absolute offset,
    /// i.e. position after header
    /// adjusted for optional 64bit size value.
    pub fn data_offset(&self) -> u64 {
        self.offset + self.header_size() as u64
    }

    /// Size of data load (excludes header size).
    pub fn data_size(&self) -> u64 {
        self.atom_size - self.header_size() as u64
    }

    /// Absolute offset to next atom.
    pub fn offset_next_abs(&self) -> u64 {
        self.offset + self.atom_size
    }

    /// Returns start, end offset range for atom.
    pub fn bounds(&self) -> Range<u64> {
        self.offset .. self.offset_next_abs()
    }
}
