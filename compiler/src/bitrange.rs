// Licensed under the Apache-2.0 license

//! Bus word bit ranges.
//!
//! A [`BitRange`] places a field: a masked bus address, a block size (the
//! low address bits that do not participate in decoding), and the bit span
//! the field occupies counting up from bit 0 of the addressed bus word.
//! The high bit may spill past the bus width; the surplus bits land in the
//! following blocks of a multi-word register.
//!
//! Literal form: `<address-spec>[:<high>[..<low>]]`, for example
//! `0x1000:7..0`, `0x2000/3:63`, `0x3000`. Omitting the bit indices selects
//! the whole bus word; a single index selects one bit.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::address::AddressSpec;
use crate::error::{Error, Result};

/// Block-offset bits implied by a bus width: 2 for 32-bit, 3 for 64-bit.
pub(crate) fn block_size_bits(bus_width: u32) -> u32 {
    match bus_width {
        64 => 3,
        _ => 2,
    }
}

/// Mapping of one block of a spilled bit range onto bus word bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockBits {
    /// Lowest bus word bit carrying field data in this block.
    pub bus_low: u32,
    /// Field bit corresponding to `bus_low`.
    pub field_low: u32,
    /// Number of field bits in this block.
    pub width: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BitRange {
    address: AddressSpec,
    size: u32,
    high: u32,
    low: u32,
}

impl BitRange {
    /// Builds a range from parts, applying the bus defaults: a spec without
    /// low don't-care bits gets the bus block size, and an explicit block
    /// size below the bus minimum is rejected.
    pub fn new(spec: AddressSpec, high: u32, low: u32, bus_width: u32) -> Result<BitRange> {
        let min_size = block_size_bits(bus_width);
        let size = spec.low_ignore_bits();
        let (address, size) = if size == 0 {
            (spec.with_low_ignore(min_size)?, min_size)
        } else if size < min_size {
            return Err(Error::config(format!(
                "block size of address `{spec}` is below the {bus_width}-bit bus word"
            )));
        } else {
            (spec, size)
        };
        if high < low {
            return Err(Error::config(format!(
                "bit range {high}..{low} has its high bit below its low bit"
            )));
        }
        Ok(BitRange {
            address,
            size,
            high,
            low,
        })
    }

    /// Parses a bit range literal, filling in bus defaults for omitted
    /// parts.
    pub fn parse(text: &str, bus_width: u32) -> Result<BitRange> {
        let (spec, bits) = Self::split(text)?;
        let (high, low) = match bits {
            None => (bus_width - 1, 0),
            Some(bits) => bits,
        };
        BitRange::new(spec, high, low, bus_width)
    }

    /// Parses a fully explicit literal: bit indices required, block size
    /// taken from the spec as-is. This is the form [`BitRange`] displays
    /// as, which makes it the round-trip and IR form.
    pub fn parse_exact(text: &str) -> Result<BitRange> {
        let (spec, bits) = Self::split(text)?;
        let (high, low) = bits.ok_or_else(|| {
            Error::config(format!("bit range `{text}` is missing its bit indices"))
        })?;
        let size = spec.low_ignore_bits();
        if size < 2 {
            return Err(Error::config(format!(
                "bit range `{text}` carries no block size"
            )));
        }
        if high < low {
            return Err(Error::config(format!(
                "bit range {high}..{low} has its high bit below its low bit"
            )));
        }
        Ok(BitRange {
            address: spec,
            size,
            high,
            low,
        })
    }

    fn split(text: &str) -> Result<(AddressSpec, Option<(u32, u32)>)> {
        let (addr_part, bit_part) = match text.split_once(':') {
            None => (text, None),
            Some((addr, bits)) => (addr, Some(bits)),
        };
        let spec = AddressSpec::parse(addr_part)?;
        let bits = match bit_part {
            None => None,
            Some(bits) => {
                let parse_index = |s: &str| {
                    s.parse::<u32>().map_err(|_| {
                        Error::config(format!("invalid bit index `{s}` in bit range `{text}`"))
                    })
                };
                Some(match bits.split_once("..") {
                    None => {
                        let index = parse_index(bits)?;
                        (index, index)
                    }
                    Some((high, low)) => (parse_index(high)?, parse_index(low)?),
                })
            }
        };
        Ok((spec, bits))
    }

    pub fn address(&self) -> AddressSpec {
        self.address
    }

    /// Low address bits that do not participate in decoding.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn high(&self) -> u32 {
        self.high
    }

    pub fn low(&self) -> u32 {
        self.low
    }

    pub fn width(&self) -> u32 {
        self.high - self.low + 1
    }

    pub fn is_single_bit(&self) -> bool {
        self.high == self.low
    }

    /// Shifts the bit span, keeping the address. A shift below bit zero or
    /// past the 32-bit index space is a capacity error.
    pub fn shift(&self, bits: i64) -> Result<BitRange> {
        let high = self.high as i64 + bits;
        let low = self.low as i64 + bits;
        if low < 0 {
            return Err(Error::capacity(format!(
                "bit range {self} shifted by {bits} drops below bit zero"
            )));
        }
        if high > u32::MAX as i64 {
            return Err(Error::capacity(format!(
                "bit range {self} shifted by {bits} leaves the bit index space"
            )));
        }
        Ok(BitRange {
            address: self.address,
            size: self.size,
            high: high as u32,
            low: low as u32,
        })
    }

    /// Moves the range by whole blocks, skipping don't-care address bits.
    pub fn move_blocks(&self, blocks: i64) -> Result<BitRange> {
        Ok(BitRange {
            address: self.address.add(blocks)?,
            size: self.size,
            high: self.high,
            low: self.low,
        })
    }

    /// Number of bus words needed to cover bits 0 through `high`.
    pub fn block_count(&self, bus_width: u32) -> u32 {
        (self.high + bus_width) / bus_width
    }

    /// First and last block index actually carrying bits of this range.
    pub fn block_span(&self, bus_width: u32) -> (u32, u32) {
        (self.low / bus_width, self.high / bus_width)
    }

    /// Maps this range onto block `block` of its register, if the range
    /// has bits there.
    pub fn block_map(&self, block: u32, bus_width: u32) -> Option<BlockBits> {
        let word_low = block * bus_width;
        let start = self.low.max(word_low);
        let end = self.high.min(word_low + bus_width - 1);
        if start > end {
            return None;
        }
        Some(BlockBits {
            bus_low: start - word_low,
            field_low: start - self.low,
            width: end - start + 1,
        })
    }

    /// Width of the subaddress: the don't-care address bits above the bus
    /// block offset, which deferring behaviors receive alongside each
    /// access.
    pub fn subaddress_width(&self, bus_width: u32) -> u32 {
        (self.address.ignore() >> block_size_bits(bus_width)).count_ones()
    }
}

impl Display for BitRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single_bit() {
            write!(f, "{}:{}", self.address, self.high)
        } else {
            write!(f, "{}:{}..{}", self.address, self.high, self.low)
        }
    }
}

impl Serialize for BitRange {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BitRange {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        BitRange::parse_exact(&text).map_err(serde::de::Error::custom)
    }
}
