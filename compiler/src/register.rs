// Licensed under the Apache-2.0 license

//! Logical register assembly.
//!
//! Every expanded field lands at a masked bus address. Fields that share an
//! address spec form a logical register; registers wider than the bus split
//! into blocks that are accessed in sequence. Assembly checks the rules that
//! only make sense once fields meet each other: bit overlap, co-residency of
//! volatile, blocking and deferring fields, endianness agreement, and
//! address overlap between distinct registers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::access::{check_siblings, AccessCaps, BusCaps, CombinedCaps};
use crate::address::AddressSpec;
use crate::config::{BusMode, Endianness, FeatureConfig};
use crate::error::{Error, Result};
use crate::field::{DescriptorIdx, Field, FieldDescriptor};
use crate::metadata::{Metadata, Namespace};
use crate::util;

/// Index of a logical register in the compiled register file.
pub type RegisterIdx = usize;

/// Reference to one expanded copy of a field descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FieldRef {
    pub descriptor: DescriptorIdx,
    pub field: usize,
}

/// The bits a field contributes to one block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FieldMapping {
    pub field: FieldRef,
    /// Lowest bus word bit carrying field data in this block.
    pub bus_low: u32,
    /// Field bit carried by `bus_low`.
    pub field_low: u32,
    pub width: u32,
}

/// One bus word of a logical register.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct Block {
    pub meta: Metadata,
    pub address: AddressSpec,
    /// Bit offset of this block's bus word within the register value.
    pub offset: u32,
    pub mappings: Vec<FieldMapping>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct LogicalRegister {
    pub meta: Metadata,
    /// Address of the first block.
    pub address: AddressSpec,
    pub endianness: Endianness,
    /// Member fields in LSB to MSB order.
    pub fields: Vec<FieldRef>,
    /// Combined capabilities per direction; `None` when no member field
    /// supports the direction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<CombinedCaps>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write: Option<CombinedCaps>,
    /// Whether any member field restricts the allowed `prot` codes.
    pub protected: bool,
    /// Blocks in address order.
    pub blocks: Vec<Block>,
    /// Defer tags, assigned after assembly to registers that defer the
    /// respective direction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_tag: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_tag: Option<u32>,
}

impl LogicalRegister {
    pub fn can_read(&self) -> bool {
        self.read.is_some()
    }

    pub fn can_write(&self) -> bool {
        self.write.is_some()
    }

    /// Width of the register value in bus words.
    pub fn block_count(&self) -> u32 {
        self.blocks.len() as u32
    }
}

/// Groups the expanded fields into logical registers and checks the rules
/// between them. Register and multi-block names go into `namespace`, which
/// is separate from the field namespace.
pub fn assemble(
    descriptors: &[FieldDescriptor],
    features: &FeatureConfig,
    namespace: &mut Namespace,
) -> Result<Vec<LogicalRegister>> {
    let mut buckets: BTreeMap<AddressSpec, Vec<FieldRef>> = BTreeMap::new();
    for (descriptor, desc) in descriptors.iter().enumerate() {
        for (field, copy) in desc.fields.iter().enumerate() {
            buckets
                .entry(copy.bitrange.address())
                .or_default()
                .push(FieldRef { descriptor, field });
        }
    }

    let mut registers = Vec::new();
    for (address, mut refs) in buckets {
        refs.sort_by_key(|r| {
            let range = field_of(descriptors, *r).bitrange;
            (range.low(), range.high())
        });
        registers.extend(assemble_group(
            descriptors,
            features,
            namespace,
            address,
            &refs,
        )?);
    }

    check_register_overlaps(&registers)?;
    Ok(registers)
}

fn field_of<'a>(descriptors: &'a [FieldDescriptor], r: FieldRef) -> &'a Field {
    &descriptors[r.descriptor].fields[r.field]
}

fn caps_of<'a>(descriptors: &'a [FieldDescriptor], r: FieldRef) -> &'a BusCaps {
    &descriptors[r.descriptor].behavior.bus
}

/// Builds the registers sharing one address spec: a single read-write
/// register when both directions agree on the metadata, separate read-only
/// and write-only registers otherwise.
fn assemble_group(
    descriptors: &[FieldDescriptor],
    features: &FeatureConfig,
    namespace: &mut Namespace,
    address: AddressSpec,
    refs: &[FieldRef],
) -> Result<Vec<LogicalRegister>> {
    let read_refs: Vec<FieldRef> = refs
        .iter()
        .copied()
        .filter(|r| caps_of(descriptors, *r).can_read())
        .collect();
    let write_refs: Vec<FieldRef> = refs
        .iter()
        .copied()
        .filter(|r| caps_of(descriptors, *r).can_write())
        .collect();

    // Explicit register metadata wins; a side that has none borrows the
    // other side's, and without any the metadata is derived from the fields.
    let (read_meta, write_meta) = match (
        explicit_register_meta(descriptors, &read_refs),
        explicit_register_meta(descriptors, &write_refs),
    ) {
        (Some(read), Some(write)) => (read, write),
        (Some(meta), None) | (None, Some(meta)) => (meta.clone(), meta),
        (None, None) => {
            let meta = synthesize_register_meta(descriptors, &read_refs, &write_refs, refs);
            (meta.clone(), meta)
        }
    };

    let mut registers = Vec::new();
    if read_meta.name == write_meta.name && read_meta.mnemonic == write_meta.mnemonic {
        registers.push(build_register(
            descriptors,
            features,
            namespace,
            read_meta,
            address,
            refs.to_vec(),
            BusMode::ReadWrite,
        )?);
    } else {
        // The metadata splits the group by direction. A field that supports
        // both directions joins both registers, but each register only
        // exposes its own direction.
        if !read_refs.is_empty() {
            registers.push(build_register(
                descriptors,
                features,
                namespace,
                read_meta,
                address,
                read_refs,
                BusMode::ReadOnly,
            )?);
        }
        if !write_refs.is_empty() {
            registers.push(build_register(
                descriptors,
                features,
                namespace,
                write_meta,
                address,
                write_refs,
                BusMode::WriteOnly,
            )?);
        }
    }
    Ok(registers)
}

/// Register metadata from the lowest-bitrange field that carries some,
/// suffixed with the register ordinal when its descriptor spreads over
/// several registers.
fn explicit_register_meta(
    descriptors: &[FieldDescriptor],
    refs: &[FieldRef],
) -> Option<Metadata> {
    for r in refs {
        let desc = &descriptors[r.descriptor];
        let Some(meta) = &desc.register_meta else {
            continue;
        };
        return Some(match desc.field_repeat {
            Some(field_repeat) if desc.fields.len() as u32 > field_repeat => {
                let ordinal = desc.fields[r.field].index.unwrap_or(0) / field_repeat;
                meta.suffixed(ordinal)
            }
            _ => meta.clone(),
        });
    }
    None
}

/// Fallback register metadata derived from the member fields: the lowest
/// readable field seeds the name, falling back to the lowest writable one.
fn synthesize_register_meta(
    descriptors: &[FieldDescriptor],
    read_refs: &[FieldRef],
    write_refs: &[FieldRef],
    refs: &[FieldRef],
) -> Metadata {
    let Some(seed) = read_refs.first().or_else(|| write_refs.first()) else {
        unreachable!("every field supports at least one direction");
    };
    let seed = &field_of(descriptors, *seed).meta;
    let mnemonics: Vec<&str> = refs
        .iter()
        .map(|r| field_of(descriptors, *r).meta.mnemonic.as_str())
        .collect();
    Metadata {
        mnemonic: seed.mnemonic.clone(),
        name: format!("{}_reg", seed.name),
        brief: Some(format!(
            "register for field{} {}.",
            if mnemonics.len() == 1 { "" } else { "s" },
            enumerate_names(&mnemonics),
        )),
        doc: None,
    }
}

/// Joins names as `` `a`, `b` and `c` `` for error messages and generated
/// briefs.
fn enumerate_names(names: &[&str]) -> String {
    let mut out = String::new();
    for (index, name) in names.iter().enumerate() {
        if index > 0 {
            out.push_str(if index == names.len() - 1 { " and " } else { ", " });
        }
        out.push('`');
        out.push_str(name);
        out.push('`');
    }
    out
}

fn build_register(
    descriptors: &[FieldDescriptor],
    features: &FeatureConfig,
    namespace: &mut Namespace,
    meta: Metadata,
    address: AddressSpec,
    refs: Vec<FieldRef>,
    mode: BusMode,
) -> Result<LogicalRegister> {
    let name = meta.name.clone();
    build_register_checked(descriptors, features, namespace, meta, address, refs, mode)
        .map_err(|err| err.in_register(name))
}

fn build_register_checked(
    descriptors: &[FieldDescriptor],
    features: &FeatureConfig,
    namespace: &mut Namespace,
    meta: Metadata,
    address: AddressSpec,
    refs: Vec<FieldRef>,
    mode: BusMode,
) -> Result<LogicalRegister> {
    namespace.insert(&meta.name, format!("register `{}`", meta.name))?;

    check_bit_conflicts(descriptors, &refs, mode)?;

    // Endianness comes from the register file unless a member field's
    // descriptor overrides it.
    let mut endianness = None;
    for r in &refs {
        let Some(given) = descriptors[r.descriptor].endianness else {
            continue;
        };
        match endianness {
            Some(previous) if previous != given => {
                return Err(Error::config("conflicting endianness specification"));
            }
            _ => endianness = Some(given),
        }
    }
    let endianness = endianness.unwrap_or(features.endianness);

    let read = if mode == BusMode::WriteOnly {
        None
    } else {
        let caps: Vec<&AccessCaps> = refs
            .iter()
            .filter_map(|r| caps_of(descriptors, *r).read.as_ref())
            .collect();
        check_siblings(&caps)?
    };
    let write = if mode == BusMode::ReadOnly {
        None
    } else {
        let caps: Vec<&AccessCaps> = refs
            .iter()
            .filter_map(|r| caps_of(descriptors, *r).write.as_ref())
            .collect();
        check_siblings(&caps)?
    };

    let bus_width = features.bus_width;
    let Some(msb) = refs
        .iter()
        .map(|r| field_of(descriptors, *r).bitrange.high())
        .max()
    else {
        unreachable!("registers hold at least one field");
    };
    let count = (msb + bus_width) / bus_width;
    if count > 26 {
        return Err(Error::capacity(
            "cannot have more than 26 blocks per register",
        ));
    }

    let mut blocks = Vec::with_capacity(count as usize);
    for index in 0..count {
        blocks.push(build_block(
            descriptors,
            namespace,
            &meta,
            address,
            &refs,
            index,
            count,
            endianness,
            bus_width,
        )?);
    }

    let protected = refs
        .iter()
        .any(|r| caps_of(descriptors, *r).is_protected());

    Ok(LogicalRegister {
        meta,
        address,
        endianness,
        fields: refs,
        read,
        write,
        protected,
        blocks,
        read_tag: None,
        write_tag: None,
    })
}

/// Detects member fields whose bit ranges intersect. Only fields that share
/// a direction conflict; a read-only and a write-only field may overlap.
fn check_bit_conflicts(
    descriptors: &[FieldDescriptor],
    refs: &[FieldRef],
    mode: BusMode,
) -> Result<()> {
    for read in [true, false] {
        if read && mode == BusMode::WriteOnly || !read && mode == BusMode::ReadOnly {
            continue;
        }
        let mut highest: Option<(&str, u32)> = None;
        for r in refs {
            let caps = caps_of(descriptors, *r);
            if read && !caps.can_read() || !read && !caps.can_write() {
                continue;
            }
            let field = field_of(descriptors, *r);
            let (low, high) = (field.bitrange.low(), field.bitrange.high());
            if let Some((other, other_high)) = highest {
                if low <= other_high {
                    // The highest bit both fields claim.
                    return Err(Error::conflict(format!(
                        "fields `{}` and `{other}` intersect at bit {}",
                        field.meta.name,
                        high.min(other_high),
                    )));
                }
            }
            if highest.map(|(_, h)| high > h).unwrap_or(true) {
                highest = Some((&field.meta.name, high));
            }
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn build_block(
    descriptors: &[FieldDescriptor],
    namespace: &mut Namespace,
    register: &Metadata,
    address: AddressSpec,
    refs: &[FieldRef],
    index: u32,
    count: u32,
    endianness: Endianness,
    bus_width: u32,
) -> Result<Block> {
    let little = endianness == Endianness::Little;
    let (mnemonic_suffix, name_suffix) = match count {
        1 => (String::new(), String::new()),
        2 => {
            if (index == 0) == little {
                ("L".to_string(), "_low".to_string())
            } else {
                ("H".to_string(), "_high".to_string())
            }
        }
        _ => {
            let Some(letter) = util::block_letter(index as usize) else {
                unreachable!("block count is capped at 26");
            };
            (
                letter.to_string(),
                format!("_{}", letter.to_ascii_lowercase()),
            )
        }
    };

    // Blocks are laid out in address order; endianness decides which part
    // of the register value each one carries.
    let offset = if little {
        index * bus_width
    } else {
        (count - index - 1) * bus_width
    };

    let meta = Metadata {
        mnemonic: format!("{}{mnemonic_suffix}", register.mnemonic),
        name: format!("{}{name_suffix}", register.name),
        brief: Some(format!(
            "block containing bits {}..{} of register `{}` (`{}`).",
            offset + bus_width - 1,
            offset,
            register.name,
            register.mnemonic,
        )),
        doc: None,
    };
    if count > 1 {
        namespace.insert(&meta.name, format!("block `{}`", meta.name))?;
    }

    let word = offset / bus_width;
    let mut mappings = Vec::new();
    for r in refs {
        let Some(bits) = field_of(descriptors, *r).bitrange.block_map(word, bus_width) else {
            continue;
        };
        mappings.push(FieldMapping {
            field: *r,
            bus_low: bits.bus_low,
            field_low: bits.field_low,
            width: bits.width,
        });
    }

    Ok(Block {
        meta,
        address: address.add(index as i64)?,
        offset,
        mappings,
    })
}

/// Registers whose blocks overlap in the same direction are a conflict;
/// sharing an address between a read-only and a write-only register is
/// fine.
fn check_register_overlaps(registers: &[LogicalRegister]) -> Result<()> {
    for (direction, mode) in [
        (LogicalRegister::can_read as fn(&LogicalRegister) -> bool, "read"),
        (LogicalRegister::can_write, "write"),
    ] {
        let claims: Vec<(&LogicalRegister, AddressSpec)> = registers
            .iter()
            .filter(|reg| direction(reg))
            .flat_map(|reg| reg.blocks.iter().map(move |block| (reg, block.address)))
            .collect();
        for (index, (reg_a, addr_a)) in claims.iter().enumerate() {
            for (reg_b, addr_b) in &claims[index + 1..] {
                if std::ptr::eq(*reg_a, *reg_b) || !addr_a.overlaps(addr_b) {
                    continue;
                }
                return Err(Error::conflict(format!(
                    "registers `{}` and `{}` overlap in {mode} mode",
                    reg_a.meta.name, reg_b.meta.name
                )));
            }
        }
    }
    Ok(())
}
