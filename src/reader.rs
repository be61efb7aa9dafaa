use std::io::{Cursor, Read, Seek, SeekFrom};

use binrw::{BinRead, BinReaderExt, Endian};

use crate::{AtomHeader, FourCC, TelemetryError};

/// Sequential, byte order aware reader over a finite,
/// seekable byte source, e.g. `BufReader<File>` or
/// an in-memory `Cursor<Vec<u8>>`.
///
/// Source length is queried once on creation
/// and is used as read boundary.
#[derive(Debug)]
pub struct ByteCursor<R: Read + Seek> {
    /// Source size in bytes.
    pub(crate) len: u64,
    /// Byte order for `read_type()`.
    pub(crate) endian: Endian,
    /// Byte source.
    pub(crate) inner: R,
}

impl<R: Read + Seek> ByteCursor<R> {
    /// Creates a big endian cursor positioned at the start of `inner`.
    pub fn new(mut inner: R) -> Result<Self, TelemetryError> {
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        Ok(Self {
            len,
            endian: Endian::Big,
            inner,
        })
    }

    /// Set byte order for `read_type()`.
    pub fn with_endian(self, endian: Endian) -> Self {
        Self {
            endian,
            ..self
        }
    }

    /// Returns source size in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns current position.
    pub fn pos(&mut self) -> Result<u64, TelemetryError> {
        Ok(self.inner.stream_position()?)
    }

    /// Returns remaining number of bytes.
    pub fn remaining(&mut self) -> Result<u64, TelemetryError> {
        Ok(self.len.saturating_sub(self.pos()?))
    }

    /// Returns `true` if fewer than `n` bytes remain.
    pub fn is_closer_to_end(&mut self, n: u64) -> Result<bool, TelemetryError> {
        Ok(self.pos()? + n > self.len)
    }

    /// Seeks to absolute position `pos`.
    pub fn seek_to(&mut self, pos: u64) -> Result<u64, TelemetryError> {
        if pos > self.len {
            return Err(TelemetryError::BoundsError(pos, 0, self.len));
        }
        Ok(self.inner.seek(SeekFrom::Start(pos))?)
    }

    /// Seeks `n` bytes forward.
    /// Fails without moving if fewer than `n` bytes remain.
    pub fn skip(&mut self, n: u64) -> Result<u64, TelemetryError> {
        let rem = self.remaining()?;
        if n > rem {
            return Err(TelemetryError::ReadMismatch{got: rem, expected: n});
        }
        Ok(self.inner.seek(SeekFrom::Current(i64::try_from(n)?))?)
    }

    /// Non-failing `skip()`. Returns `false` if
    /// fewer than `n` bytes remain.
    pub fn try_skip(&mut self, n: u64) -> bool {
        self.skip(n).is_ok()
    }

    /// Checks that `n` bytes can be read at current position.
    fn check_rem(&mut self, n: u64) -> Result<(), TelemetryError> {
        let rem = self.remaining()?;
        if n > rem {
            return Err(TelemetryError::ReadMismatch{got: rem, expected: n});
        }
        Ok(())
    }

    /// Read type `T` using the cursor's byte order.
    pub fn read_type<T>(&mut self) -> Result<T, TelemetryError>
    where
        T: BinRead,
        <T as BinRead>::Args<'static>: Sized + Clone + Default,
    {
        let endian = self.endian;
        self.check_rem(std::mem::size_of::<T>() as u64)?;
        Ok(self.inner.read_type::<T>(endian)?)
    }

    /// Read big endian type `T`.
    pub fn read_be<T>(&mut self) -> Result<T, TelemetryError>
    where
        T: BinRead,
        <T as BinRead>::Args<'static>: Sized + Clone + Default,
    {
        self.check_rem(std::mem::size_of::<T>() as u64)?;
        Ok(self.inner.read_be::<T>()?)
    }

    /// Read little endian type `T`.
    pub fn read_le<T>(&mut self) -> Result<T, TelemetryError>
    where
        T: BinRead,
        <T as BinRead>::Args<'static>: Sized + Clone + Default,
    {
        self.check_rem(std::mem::size_of::<T>() as u64)?;
        Ok(self.inner.read_le::<T>()?)
    }

    /// Read `n` bytes at current position.
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>, TelemetryError> {
        self.check_rem(n as u64)?;
        let mut buf = vec![0_u8; n];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Returns `n` bytes at current position without advancing.
    pub fn peek(&mut self, n: usize) -> Result<Vec<u8>, TelemetryError> {
        let pos = self.pos()?;
        let buf = self.read_bytes(n)?;
        self.inner.seek(SeekFrom::Start(pos))?;
        Ok(buf)
    }

    /// Reads `len` bytes
    /// into `Cursor<Vec<u8>>`.
    pub fn cursor(&mut self, len: usize) -> Result<Cursor<Vec<u8>>, TelemetryError> {
        Ok(Cursor::new(self.read_bytes(len)?))
    }

    /// Reads FourCC at current position.
    pub fn fourcc(&mut self) -> Result<FourCC, TelemetryError> {
        Ok(FourCC::from_u32(self.read_be::<u32>()?))
    }

    /// Returns atom header at current position,
    /// leaving the position at the atom's data load.
    ///
    /// Does not verify that current position
    /// is at atom boundary.
    pub fn header(&mut self) -> Result<AtomHeader, TelemetryError> {
        let mut hdr = AtomHeader::default();

        hdr.offset = self.pos()?;

        // 32bit total atom size
        hdr.atom_size = self.read_be::<u32>()? as u64;

        hdr.name = self.fourcc()?;

        // Size 1: 64-bit size follows directly after FourCC
        if hdr.atom_size == 1 {
            hdr.atom_size = self.read_be::<u64>()?;
            hdr.size_64bit = true;
        }

        // Size 0: atom extends to end of source
        if hdr.atom_size == 0 {
            hdr.atom_size = self.len - hdr.offset;
        }

        if hdr.atom_size < hdr.header_size() as u64 {
            return Err(TelemetryError::UnexpectedAtomSize {
                name: hdr.name.to_string(),
                size: hdr.atom_size,
                offset: hdr.offset,
            });
        }

        hdr.next = match hdr.is_container() {
            true => 0,
            false => hdr.data_size(),
        };

        Ok(hdr)
    }
}
