// Licensed under the Apache-2.0 license

//! Masked bus addresses.
//!
//! An [`AddressSpec`] is a base address plus a don't-care mask: a bus address
//! matches when all non-ignored bits equal the base. The don't-care bits
//! serve two purposes. The low, contiguous ones select a byte within a bus
//! word (the block size); any higher ones repeat the match across pages, for
//! paged or windowed layouts.
//!
//! Literal forms accepted by [`AddressSpec::parse`]:
//!
//! * `4096`, `0x1000` - exact address.
//! * `0x1000/6` - ignore the 6 low bits (a 64-byte window).
//! * `0x1000|0xC00` - ignore the bits set in the given mask.
//! * `0x1000&0xF000` - ignore the bits cleared in the given mask.
//! * `0x1--4` - hex digits may be `-` for a don't-care nibble.
//! * `0x1[01-0]4` - square brackets give single bits within a hex literal.
//! * `0b10--` - binary, with `-` for don't-care bits.
//! * `_` separators are ignored inside hex and binary literals.
//!
//! A base with a nonzero bit inside its don't-care mask is rejected rather
//! than silently masked, so `0x13/2` is an error.

use std::fmt::{self, Display, Write as _};

use serde::{Deserialize, Serialize};
use winnow::ascii::digit1;
use winnow::combinator::{alt, delimited, opt, preceded, repeat};
use winnow::token::one_of;
use winnow::{ModalResult, Parser};

use crate::error::{Error, Result};

/// A masked address: matches bus address `a` iff `a & !ignore == base`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AddressSpec {
    base: u32,
    ignore: u32,
}

impl AddressSpec {
    /// Creates a spec from raw parts. The base must not have bits set
    /// inside the ignore mask.
    pub fn new(base: u32, ignore: u32) -> Result<AddressSpec> {
        if base & ignore != 0 {
            return Err(Error::config(format!(
                "address {} sets bits inside its don't-care mask {}",
                crate::util::hex_const(base as u64),
                crate::util::hex_const(ignore as u64),
            )));
        }
        Ok(AddressSpec { base, ignore })
    }

    /// An exact-match spec with no don't-care bits.
    pub fn exact(base: u32) -> AddressSpec {
        AddressSpec { base, ignore: 0 }
    }

    /// Parses any of the literal forms described in the module docs.
    pub fn parse(text: &str) -> Result<AddressSpec> {
        let (base, ignore) = parse_masked(text)?;
        if base & ignore != 0 {
            return Err(Error::config(format!(
                "address `{text}` sets bits inside its don't-care mask"
            )));
        }
        Ok(AddressSpec { base, ignore })
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn ignore(&self) -> u32 {
        self.ignore
    }

    /// The number of contiguous don't-care bits at the bottom of the mask.
    pub fn low_ignore_bits(&self) -> u32 {
        self.ignore.trailing_ones()
    }

    /// Extends the don't-care mask to cover the low `size` bits. Fails when
    /// the base has a nonzero bit there, i.e. when it is not aligned.
    pub fn with_low_ignore(&self, size: u32) -> Result<AddressSpec> {
        let low = low_mask(size);
        if self.base & low != 0 {
            return Err(Error::config(format!(
                "address `{self}` is not aligned to its {}-byte block size",
                1u64 << size,
            )));
        }
        Ok(AddressSpec {
            base: self.base,
            ignore: self.ignore | low,
        })
    }

    pub fn matches(&self, address: u32) -> bool {
        address & !self.ignore == self.base
    }

    /// Two specs overlap when some concrete address matches both.
    pub fn overlaps(&self, other: &AddressSpec) -> bool {
        (self.base ^ other.base) & !self.ignore & !other.ignore == 0
    }

    /// Collects the bits of `address` at don't-care positions at or above
    /// bit `above`, packed together least significant first. This is the
    /// subaddress a deferring field sees for a matching access.
    pub fn extract_ignored(&self, address: u32, above: u32) -> u32 {
        let mut result = 0u32;
        let mut out_bit = 0;
        for bit in above..u32::BITS {
            if self.ignore >> bit & 1 == 0 {
                continue;
            }
            result |= (address >> bit & 1) << out_bit;
            out_bit += 1;
        }
        result
    }

    /// Adds `value` to the non-ignored address bits, least significant
    /// first, with carries skipping the don't-care bits. Stepping outside
    /// the 32-bit care space either way is a capacity error.
    pub fn add(&self, value: i64) -> Result<AddressSpec> {
        let mut address = self.base;
        let mut value = value;
        let mut carry = 0u32;
        for bit in 0..u32::BITS {
            let bitm = 1u32 << bit;
            if self.ignore & bitm != 0 {
                continue;
            }
            let in_bit = (value & 1) as u32;
            value >>= 1;
            let in_bits_set = in_bit + carry + u32::from(address & bitm != 0);
            if (in_bits_set & 1) ^ u32::from(address & bitm != 0) != 0 {
                address ^= bitm;
            }
            carry = in_bits_set >> 1;
        }
        match value {
            0 => {
                if carry != 0 {
                    return Err(Error::capacity(format!(
                        "address overflow while advancing {self}"
                    )));
                }
            }
            -1 => {
                if carry == 0 {
                    return Err(Error::capacity(format!(
                        "address underflow while advancing {self}"
                    )));
                }
            }
            _ => {
                return Err(Error::capacity(format!(
                    "address step out of range while advancing {self}"
                )));
            }
        }
        Ok(AddressSpec {
            base: address,
            ignore: self.ignore,
        })
    }
}

impl Display for AddressSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ignore == 0 {
            return write!(f, "0x{:x}", self.base);
        }
        let size = self.ignore.trailing_ones();
        if size == u32::BITS || self.ignore >> size == 0 {
            return write!(f, "0x{:x}/{}", self.base, size);
        }
        let significant = u32::BITS - (self.base | self.ignore).leading_zeros();
        let nibbles = significant.div_ceil(4).max(1);
        write!(f, "0x")?;
        for i in (0..nibbles).rev() {
            let value = (self.base >> (i * 4)) & 0xF;
            let ignore = (self.ignore >> (i * 4)) & 0xF;
            if ignore == 0 {
                write!(f, "{value:x}")?;
            } else if ignore == 0xF {
                f.write_char('-')?;
            } else {
                f.write_char('[')?;
                for bit in (0..4).rev() {
                    f.write_char(if ignore >> bit & 1 != 0 {
                        '-'
                    } else if value >> bit & 1 != 0 {
                        '1'
                    } else {
                        '0'
                    })?;
                }
                f.write_char(']')?;
            }
        }
        Ok(())
    }
}

impl Serialize for AddressSpec {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AddressSpec {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        AddressSpec::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// A mask covering the low `size` bits, valid for sizes up to 32.
pub(crate) fn low_mask(size: u32) -> u32 {
    if size >= u32::BITS {
        u32::MAX
    } else {
        (1u32 << size) - 1
    }
}

/// Parses a masked literal into `(value, ignore)` without the
/// base-inside-mask strictness. Conditions compare internal signals
/// against these.
pub(crate) fn parse_masked(text: &str) -> Result<(u32, u32)> {
    let raw = literal
        .parse(text)
        .map_err(|err| Error::config(format!("invalid address literal `{text}`: {err}")))?;
    let (value, digit_ignore) = assemble(text, &raw.chunks)?;
    let suffix_ignore = match &raw.suffix {
        None => 0,
        Some(RawSuffix::Size(size)) => {
            if *size > u32::BITS {
                return Err(Error::config(format!(
                    "don't-care size in `{text}` is out of range"
                )));
            }
            low_mask(*size)
        }
        Some(RawSuffix::Ignore(chunks)) | Some(RawSuffix::Care(chunks)) => {
            let (mask, mask_ignore) = assemble(text, chunks)?;
            if mask_ignore != 0 {
                return Err(Error::config(format!(
                    "don't-care digits are not allowed in the mask suffix of `{text}`"
                )));
            }
            if matches!(raw.suffix, Some(RawSuffix::Care(_))) {
                !mask
            } else {
                mask
            }
        }
    };
    Ok((value, digit_ignore | suffix_ignore))
}

/// A run of literal bits: `bits` wide, carrying `value` and `ignore`.
#[derive(Clone)]
struct Chunk {
    bits: u32,
    value: u32,
    ignore: u32,
}

enum RawSuffix {
    Size(u32),
    Ignore(Vec<Chunk>),
    Care(Vec<Chunk>),
}

struct RawLiteral {
    chunks: Vec<Chunk>,
    suffix: Option<RawSuffix>,
}

fn assemble(text: &str, chunks: &[Chunk]) -> Result<(u32, u32)> {
    let mut value: u64 = 0;
    let mut ignore: u64 = 0;
    let mut width: u32 = 0;
    for chunk in chunks {
        width += chunk.bits;
        if width > u64::BITS {
            return Err(Error::config(format!("address literal `{text}` is too long")));
        }
        value = (value << chunk.bits) | chunk.value as u64;
        ignore = (ignore << chunk.bits) | chunk.ignore as u64;
    }
    if value > u32::MAX as u64 || ignore > u32::MAX as u64 {
        return Err(Error::config(format!(
            "address literal `{text}` exceeds the 32-bit address space"
        )));
    }
    Ok((value as u32, ignore as u32))
}

fn literal(input: &mut &str) -> ModalResult<RawLiteral> {
    let chunks = masked_value.parse_next(input)?;
    let suffix = opt(suffix).parse_next(input)?;
    Ok(RawLiteral { chunks, suffix })
}

fn suffix(input: &mut &str) -> ModalResult<RawSuffix> {
    alt((
        preceded('/', dec_u32).map(RawSuffix::Size),
        preceded('|', masked_value).map(RawSuffix::Ignore),
        preceded('&', masked_value).map(RawSuffix::Care),
    ))
    .parse_next(input)
}

fn masked_value(input: &mut &str) -> ModalResult<Vec<Chunk>> {
    alt((
        preceded("0x", repeat(1.., hex_chunk)),
        preceded("0b", repeat(1.., bin_chunk)),
        dec_chunks,
    ))
    .parse_next(input)
}

fn hex_chunk(input: &mut &str) -> ModalResult<Chunk> {
    alt((
        '_'.value(Chunk {
            bits: 0,
            value: 0,
            ignore: 0,
        }),
        '-'.value(Chunk {
            bits: 4,
            value: 0,
            ignore: 0xF,
        }),
        bit_group,
        one_of(|c: char| c.is_ascii_hexdigit()).map(|c: char| Chunk {
            bits: 4,
            value: c.to_digit(16).unwrap_or(0),
            ignore: 0,
        }),
    ))
    .parse_next(input)
}

fn bit_group(input: &mut &str) -> ModalResult<Chunk> {
    delimited('[', repeat(1..=32, one_of(('0', '1', '-'))), ']')
        .map(|bits: Vec<char>| {
            let mut chunk = Chunk {
                bits: 0,
                value: 0,
                ignore: 0,
            };
            for bit in bits {
                chunk.bits += 1;
                chunk.value <<= 1;
                chunk.ignore <<= 1;
                match bit {
                    '1' => chunk.value |= 1,
                    '-' => chunk.ignore |= 1,
                    _ => {}
                }
            }
            chunk
        })
        .parse_next(input)
}

fn bin_chunk(input: &mut &str) -> ModalResult<Chunk> {
    one_of(('0', '1', '-', '_'))
        .map(|c: char| match c {
            '_' => Chunk {
                bits: 0,
                value: 0,
                ignore: 0,
            },
            '-' => Chunk {
                bits: 1,
                value: 0,
                ignore: 1,
            },
            c => Chunk {
                bits: 1,
                value: c.to_digit(2).unwrap_or(0),
                ignore: 0,
            },
        })
        .parse_next(input)
}

fn dec_chunks(input: &mut &str) -> ModalResult<Vec<Chunk>> {
    dec_u64
        .map(|value| {
            vec![
                Chunk {
                    bits: 32,
                    value: (value >> 32) as u32,
                    ignore: 0,
                },
                Chunk {
                    bits: 32,
                    value: value as u32,
                    ignore: 0,
                },
            ]
        })
        .parse_next(input)
}

fn dec_u64(input: &mut &str) -> ModalResult<u64> {
    digit1.try_map(str::parse::<u64>).parse_next(input)
}

fn dec_u32(input: &mut &str) -> ModalResult<u32> {
    digit1.try_map(str::parse::<u32>).parse_next(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Kind;

    #[test]
    fn test_parse_forms() {
        assert_eq!(AddressSpec::parse("4096").unwrap(), AddressSpec::exact(4096));
        assert_eq!(
            AddressSpec::parse("0x1000").unwrap(),
            AddressSpec::exact(0x1000)
        );
        assert_eq!(
            AddressSpec::parse("0x1000/6").unwrap(),
            AddressSpec::new(0x1000, 0x3F).unwrap()
        );
        assert_eq!(
            AddressSpec::parse("0x1000|0xC00").unwrap(),
            AddressSpec::new(0x1000, 0xC00).unwrap()
        );
        assert_eq!(
            AddressSpec::parse("0x1000&0xF0FF").unwrap(),
            AddressSpec::new(0x1000, 0x0F00).unwrap()
        );
        assert_eq!(
            AddressSpec::parse("0x1-04").unwrap(),
            AddressSpec::new(0x1004, 0x0F0).unwrap()
        );
        assert_eq!(
            AddressSpec::parse("0x1[01-0]4").unwrap(),
            AddressSpec::new(0x144, 0x020).unwrap()
        );
        assert_eq!(
            AddressSpec::parse("0b10--").unwrap(),
            AddressSpec::new(0b1000, 0b0011).unwrap()
        );
        assert_eq!(
            AddressSpec::parse("0x10_00").unwrap(),
            AddressSpec::exact(0x1000)
        );
    }

    #[test]
    fn test_parse_rejects() {
        // Base bits inside the don't-care mask are never silently dropped.
        let err = AddressSpec::parse("0x13/2").unwrap_err();
        assert_eq!(err.kind(), Kind::Config);
        assert!(AddressSpec::parse("0x1000/33").is_err());
        assert!(AddressSpec::parse("").is_err());
        assert!(AddressSpec::parse("0x").is_err());
        assert!(AddressSpec::parse("0x1000|0x-0").is_err());
        assert!(AddressSpec::parse("0x100000000").is_err());
        assert!(AddressSpec::parse("0x1000 ").is_err());
    }

    #[test]
    fn test_display_round_trip() {
        for text in [
            "0x0",
            "0x1000",
            "0x1000/6",
            "0x1000/12",
            "0x1-04",
            "0x[01-0]4",
            "0x1[1-00]0/4",
            "0x0/32",
        ] {
            let spec = AddressSpec::parse(text).unwrap();
            let shown = spec.to_string();
            let reparsed = AddressSpec::parse(&shown).unwrap();
            println!("{text} -> {shown}");
            assert_eq!(spec, reparsed, "`{text}` did not round-trip via `{shown}`");
        }
        assert_eq!(AddressSpec::parse("0x1000/6").unwrap().to_string(), "0x1000/6");
        assert_eq!(AddressSpec::parse("0x1-04").unwrap().to_string(), "0x1-04");
    }

    #[test]
    fn test_matching() {
        let spec = AddressSpec::parse("0x1000/4").unwrap();
        assert!(spec.matches(0x1000));
        assert!(spec.matches(0x100F));
        assert!(!spec.matches(0x1010));

        let paged = AddressSpec::parse("0x1000|0xC0000").unwrap();
        assert!(paged.matches(0x1000));
        assert!(paged.matches(0x41000));
        assert!(paged.matches(0xC1000));
        assert!(!paged.matches(0x11000));
    }

    #[test]
    fn test_overlap() {
        let a = AddressSpec::parse("0x1000/4").unwrap();
        let b = AddressSpec::parse("0x1008/2").unwrap();
        let c = AddressSpec::parse("0x1010/4").unwrap();
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert!(a.overlaps(&a));
    }

    #[test]
    fn test_add_skips_ignore_bits() {
        // Care bits above the 4-bit block are split by a page don't-care
        // nibble at bits 8..12; the increment carries across it.
        let spec = AddressSpec::parse("0x10f0|0xf0f").unwrap();
        let next = spec.add(1).unwrap();
        assert_eq!(next.base(), 0x2000);
        assert_eq!(next.ignore(), 0xF0F);
        let back = next.add(-1).unwrap();
        assert_eq!(back, spec);
    }

    #[test]
    fn test_add_overflow() {
        let spec = AddressSpec::parse("0xfffffffc/2").unwrap();
        let err = spec.add(1).unwrap_err();
        assert_eq!(err.kind(), Kind::Capacity);
        let err = AddressSpec::parse("0x0/2").unwrap().add(-1).unwrap_err();
        assert_eq!(err.kind(), Kind::Capacity);
    }
}
