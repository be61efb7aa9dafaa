//! Stepping cursor over a single GPMF payload.
//!
//! Each nesting level keeps a budget of remaining 32-bit words,
//! taken from the declared size of the nested entry that opened it.
//! Headers count as two words. If an entry can not be valid
//! within its level (corrupt key, zero size, or declared size exceeding
//! the level's budget), the rest of that level is skipped and
//! stepping resumes with the next entry in the parent level.

use log::{trace, warn};

use crate::{
    consts::{DEVC, DVID, DVNM, NEST_LIMIT},
    TelemetryError,
};

use super::{is_valid_key, Klv, KLV_HEADER_SIZE};

/// Cursor over a single GPMF payload. Iterates over
/// all entries, nested ones included, in file order.
#[derive(Debug)]
pub struct GpmfCursor<'a> {
    buf: &'a [u8],
    /// Position of the current entry's header.
    pos: usize,
    nest_level: usize,
    /// Remaining 32-bit words for each nesting level.
    nest_remaining: [i32; NEST_LIMIT],
    /// An entry has been returned.
    started: bool,
    done: bool,
    device_id: Option<u32>,
    device_name: Option<String>,
    error: Option<TelemetryError>,
}

impl<'a> Iterator for GpmfCursor<'a> {
    type Item = Klv<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None
        }

        let ready = match self.started {
            true => self.step(),
            false => {
                self.started = true;
                self.settle()
            }
        };

        if !ready {
            self.done = true;
            return None
        }

        let klv = Klv::parse(self.buf, self.pos)?;
        trace!("{} @ {}, level {}, type {}, {}x{} bytes, {} words remaining.",
            klv.key_str(),
            self.pos,
            self.nest_level,
            klv.type_code,
            klv.struct_size,
            klv.repeat,
            self.nest_remaining[self.nest_level]
        );
        Some(klv)
    }
}

impl<'a> GpmfCursor<'a> {
    /// New cursor positioned before the first entry in `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        let mut nest_remaining = [0_i32; NEST_LIMIT];
        nest_remaining[0] = i32::try_from(buf.len() / 4).unwrap_or(i32::MAX);
        Self {
            buf,
            pos: 0,
            nest_level: 0,
            nest_remaining,
            started: false,
            done: false,
            device_id: None,
            device_name: None,
            error: None,
        }
    }

    /// Position of the current entry,
    /// or end position once the cursor is exhausted.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Current nesting level. `0` is the device level.
    pub fn nest_level(&self) -> usize {
        self.nest_level
    }

    /// Remaining 32-bit words at specified nesting level.
    pub fn remaining(&self, level: usize) -> Option<i32> {
        self.nest_remaining.get(level).copied()
    }

    /// Last seen device id (`DVID`).
    pub fn device_id(&self) -> Option<u32> {
        self.device_id
    }

    /// Last seen device name (`DVNM`).
    pub fn device_name(&self) -> Option<&str> {
        self.device_name.as_deref()
    }

    /// Returns the error that ended iteration early, if any.
    /// Samples read before the error remain valid.
    pub fn take_error(&mut self) -> Option<TelemetryError> {
        self.error.take()
    }

    /// Advances until an entry with specified key is current.
    pub fn find_key(&mut self, key: &[u8; 4]) -> Option<Klv<'a>> {
        self.by_ref().find(|klv| &klv.key == key)
    }

    /// Steps past the current entry. Nested entries are
    /// stepped into, i.e. only their header is consumed.
    fn step(&mut self) -> bool {
        let Some(klv) = Klv::parse(self.buf, self.pos) else {
            return false
        };
        let words = klv.words() as i32;

        if klv.is_nested() && self.nest_level == 0 && klv.key == DEVC {
            self.pos += KLV_HEADER_SIZE;
            self.nest_remaining[0] = words;
        } else if klv.is_nested() {
            self.pos += KLV_HEADER_SIZE;
            self.nest_remaining[self.nest_level] -= words + 2;
            if self.nest_level + 1 >= NEST_LIMIT {
                warn!("GPMF nesting @ {} exceeds max depth {NEST_LIMIT}.", klv.offset);
                self.error = Some(TelemetryError::NestLimitExceeded(NEST_LIMIT));
                return false
            }
            self.nest_level += 1;
            self.nest_remaining[self.nest_level] = words;
        } else {
            self.pos += KLV_HEADER_SIZE + klv.padded_size();
            self.nest_remaining[self.nest_level] -= words + 2;
        }

        self.settle()
    }

    /// Moves to the next valid entry, popping exhausted levels,
    /// skipping padding, and abandoning corrupt levels.
    /// Returns `false` if no entry remains.
    fn settle(&mut self) -> bool {
        loop {
            self.pop_exhausted();
            self.skip_padding();
            self.pop_exhausted();

            if self.pos + KLV_HEADER_SIZE > self.buf.len() {
                return false
            }

            match self.validate() {
                Ok(klv) => {
                    self.capture_device(&klv);
                    return true
                },
                Err(reason) => {
                    warn!("GPMF entry @ {} {reason}, skipping level {}.", self.pos, self.nest_level);
                    if !self.skip_level() {
                        return false
                    }
                }
            }
        }
    }

    /// Checks that the entry at the current position
    /// is valid within the current level.
    fn validate(&self) -> Result<Klv<'a>, &'static str> {
        let key = &self.buf[self.pos .. self.pos + 4];
        if !is_valid_key(key) {
            return Err("has invalid key")
        }
        let klv = Klv::parse(self.buf, self.pos).ok_or("extends beyond payload")?;
        if klv.data_size() == 0 {
            return Err("has no data")
        }
        let opens_device = klv.is_nested() && self.nest_level == 0 && klv.key == DEVC;
        if !opens_device && klv.words() as i32 + 2 > self.nest_remaining[self.nest_level] {
            return Err("exceeds its level")
        }
        Ok(klv)
    }

    fn pop_exhausted(&mut self) {
        while self.nest_level > 0 && self.nest_remaining[self.nest_level] <= 0 {
            self.nest_level -= 1;
        }
    }

    /// Skips zero words, counting them towards the current level.
    fn skip_padding(&mut self) {
        while self.nest_remaining[self.nest_level] > 0
            && self.buf.get(self.pos .. self.pos + 4) == Some(&[0_u8; 4][..])
        {
            self.pos += 4;
            self.nest_remaining[self.nest_level] -= 1;
        }
    }

    /// Jumps past the remaining words of the current level
    /// and pops it. Returns `false` if there is nothing to skip.
    fn skip_level(&mut self) -> bool {
        let remaining = self.nest_remaining[self.nest_level];
        if remaining <= 0 {
            return false
        }
        self.pos += remaining as usize * 4;
        self.nest_remaining[self.nest_level] = 0;
        self.pop_exhausted();
        true
    }

    fn capture_device(&mut self, klv: &Klv) {
        if klv.key == DVID {
            if let Ok(id) = klv.first::<u32>() {
                self.device_id = Some(id);
            }
        } else if klv.key == DVNM {
            let name = klv.string();
            if !name.is_empty() {
                self.device_name = Some(name);
            }
        }
    }
}
