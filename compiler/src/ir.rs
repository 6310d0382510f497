// Licensed under the Apache-2.0 license

//! Compiled register file output.
//!
//! [`RegFileIr`] is the self-contained result of compilation: resolved
//! metadata, features, field descriptors, logical registers, internal
//! signals, interrupts and defer tags, with no references back into the
//! configuration records. It serializes to JSON for downstream tools,
//! answers address decode queries for the simulator, and renders the
//! address map for diagnostics.

use serde::{Deserialize, Serialize};

use crate::address::AddressSpec;
use crate::bitrange::block_size_bits;
use crate::config::FeatureConfig;
use crate::defer::DeferTagInfo;
use crate::error::{Error, Result};
use crate::field::{Field, FieldDescriptor};
use crate::internals::{Internal, InternalIdx, InternalPort};
use crate::interrupt::Interrupt;
use crate::metadata::Metadata;
use crate::register::{FieldRef, LogicalRegister, RegisterIdx};

/// A decode gate: bus accesses only reach the registers while the internal
/// carries a matching value. Don't-care bits of the comparison are set in
/// `ignore`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct Condition {
    pub internal: InternalIdx,
    pub value: u32,
    pub ignore: u32,
}

impl Condition {
    pub fn matches(&self, actual: u32) -> bool {
        (actual ^ self.value) & !self.ignore == 0
    }
}

/// The compiled register file.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct RegFileIr {
    pub meta: Metadata,
    pub features: FeatureConfig,
    pub descriptors: Vec<FieldDescriptor>,
    /// Logical registers in address order.
    pub registers: Vec<LogicalRegister>,
    pub internals: Vec<Internal>,
    pub ports: Vec<InternalPort>,
    pub interrupts: Vec<Interrupt>,
    /// Total width of the concatenated interrupt request vector.
    pub interrupt_vector_width: u32,
    pub conditions: Vec<Condition>,
    pub defer_tags: DeferTagInfo,
    /// Width of the read and write holding registers: the bits of the
    /// widest register beyond its first bus word. Zero when every register
    /// fits a single bus word.
    pub holding_width: u32,
}

/// Result of decoding one bus access.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decoded {
    /// The access maps onto a block of a register.
    Block(BlockHit),
    /// No register claims the address; the access fails with a decode
    /// error.
    Error,
    /// No register claims the address and the `optimize` feature lets the
    /// decoder treat it as don't-care: reads return unspecified data and
    /// writes may alias onto mapped registers.
    DontCare,
}

/// A successfully decoded access.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockHit {
    pub register: RegisterIdx,
    /// Index of the matched block within the register.
    pub block: usize,
    /// Bit offset of the block's bus word within the register value.
    pub offset: u32,
    /// Don't-care address bits above the bus word, packed LSB first.
    pub subaddress: u32,
    /// Indices into the block's mappings whose field supports the access
    /// direction and allows the `prot` code. Fields outside this set ignore
    /// the access; when the set is empty no field acknowledges it and the
    /// access is a decode miss.
    pub active: Vec<usize>,
}

impl RegFileIr {
    /// The expanded field a [`FieldRef`] points at.
    pub fn field(&self, r: FieldRef) -> &Field {
        &self.descriptors[r.descriptor].fields[r.field]
    }

    /// The descriptor a [`FieldRef`] points at.
    pub fn descriptor(&self, r: FieldRef) -> &FieldDescriptor {
        &self.descriptors[r.descriptor]
    }

    /// Decodes one bus access. `condition_values` carries the current value
    /// of each entry of `conditions`, in order; a mismatch makes the whole
    /// register file unmapped. Register overlap is rejected at compile
    /// time, so at most one block matches per direction.
    pub fn decode(
        &self,
        address: u32,
        write: bool,
        prot: u8,
        condition_values: &[u32],
    ) -> Decoded {
        let miss = if self.features.optimize {
            Decoded::DontCare
        } else {
            Decoded::Error
        };
        let conditions_hold = self
            .conditions
            .iter()
            .zip(condition_values)
            .all(|(condition, &actual)| condition.matches(actual));
        if !conditions_hold {
            return miss;
        }
        for (register_index, register) in self.registers.iter().enumerate() {
            if write && !register.can_write() || !write && !register.can_read() {
                continue;
            }
            for (block_index, block) in register.blocks.iter().enumerate() {
                if !block.address.matches(address) {
                    continue;
                }
                let active = block
                    .mappings
                    .iter()
                    .enumerate()
                    .filter(|(_, mapping)| {
                        let bus = &self.descriptor(mapping.field).behavior.bus;
                        let caps = if write { &bus.write } else { &bus.read };
                        caps.map(|caps| caps.prot.matches(prot)).unwrap_or(false)
                    })
                    .map(|(index, _)| index)
                    .collect();
                return Decoded::Block(BlockHit {
                    register: register_index,
                    block: block_index,
                    offset: block.offset,
                    subaddress: block
                        .address
                        .extract_ignored(address, block_size_bits(self.features.bus_width)),
                    active,
                });
            }
        }
        miss
    }

    /// Renders the address map as a text table: one row per block, in
    /// address order, with the fields and their bus bit positions.
    pub fn address_map(&self) -> String {
        const HEADER: [&str; 6] = ["ADDRESS", "MODE", "MNEMONIC", "NAME", "BLOCK", "FIELDS"];

        let mut rows: Vec<(AddressSpec, [String; 6])> = Vec::new();
        for register in &self.registers {
            let mode = match (register.can_read(), register.can_write()) {
                (true, true) => "R/W",
                (true, false) => "R/O",
                _ => "W/O",
            };
            let count = register.blocks.len();
            for (index, block) in register.blocks.iter().enumerate() {
                let fields = block
                    .mappings
                    .iter()
                    .map(|mapping| {
                        let name = &self.field(mapping.field).meta.name;
                        let low = mapping.bus_low;
                        let high = low + mapping.width - 1;
                        if high == low {
                            format!("{name}[{low}]")
                        } else {
                            format!("{name}[{high}..{low}]")
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                rows.push((
                    block.address,
                    [
                        block.address.to_string(),
                        mode.to_string(),
                        block.meta.mnemonic.clone(),
                        block.meta.name.clone(),
                        format!("{}/{count}", index + 1),
                        fields,
                    ],
                ));
            }
        }
        rows.sort_by_key(|(address, _)| *address);

        let mut widths = HEADER.map(str::len);
        for (_, row) in &rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.len());
            }
        }

        let header = HEADER.map(String::from);
        let mut out = String::new();
        for row in std::iter::once(&header).chain(rows.iter().map(|(_, row)| row)) {
            let mut line = String::new();
            for (index, cell) in row.iter().enumerate() {
                if index > 0 {
                    line.push_str("  ");
                }
                line.push_str(cell);
                // The last column is not padded.
                if index + 1 < row.len() {
                    for _ in cell.len()..widths[index] {
                        line.push(' ');
                    }
                }
            }
            out.push_str(line.trim_end());
            out.push('\n');
        }
        out
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|err| Error::config(format!("failed to serialize IR: {err}")))
    }

    pub fn from_json(text: &str) -> Result<RegFileIr> {
        serde_json::from_str(text)
            .map_err(|err| Error::config(format!("failed to load IR: {err}")))
    }
}

/// Size of the holding registers that buffer multi-word accesses: the widest
/// register's bits beyond its first bus word.
pub(crate) fn holding_width(registers: &[LogicalRegister], bus_width: u32) -> u32 {
    registers
        .iter()
        .map(|register| (register.block_count() - 1) * bus_width)
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile;
    use crate::config::RegFileConfig;

    fn compile_json(text: &str) -> RegFileIr {
        let cfg = RegFileConfig::from_json(text).unwrap();
        compile(&cfg).unwrap()
    }

    const DEMO: &str = r#"{
      "metadata": { "name": "demo" },
      "fields": [
        { "address": "0x0:0", "metadata": { "name": "enable" },
          "behavior": { "kind": "control" } },
        { "address": "0x0:3..1", "metadata": { "name": "mode" },
          "behavior": { "kind": "control" } },
        { "address": "0x4:7..0", "metadata": { "name": "state" },
          "behavior": { "kind": "status" } },
        { "address": "0x8:39..0", "metadata": { "name": "total" },
          "behavior": { "kind": "control" } }
      ]
    }"#;

    #[test]
    fn test_decode_hit_and_miss() {
        let ir = compile_json(DEMO);

        let decoded = ir.decode(0x0, false, 0, &[]);
        let Decoded::Block(hit) = decoded else {
            panic!("0x0 must decode to a block, got {decoded:?}");
        };
        assert_eq!(ir.registers[hit.register].meta.name, "enable_reg");
        assert_eq!(hit.block, 0);
        assert_eq!(hit.offset, 0);
        assert_eq!(hit.subaddress, 0);
        assert_eq!(hit.active, vec![0, 1]);

        let decoded = ir.decode(0xC, true, 0, &[]);
        let Decoded::Block(hit) = decoded else {
            panic!("0xC must decode to a block, got {decoded:?}");
        };
        assert_eq!(ir.registers[hit.register].meta.name, "total_reg");
        assert_eq!(hit.block, 1);
        assert_eq!(hit.offset, 32);

        // The status register has no write side, and 0x10 is a hole.
        assert_eq!(ir.decode(0x4, true, 0, &[]), Decoded::Error);
        assert_eq!(ir.decode(0x10, false, 0, &[]), Decoded::Error);
    }

    #[test]
    fn test_optimize_makes_holes_dont_care() {
        let ir = compile_json(
            r#"{
              "metadata": { "name": "demo" },
              "features": { "optimize": true },
              "fields": [
                { "address": "0x0:7..0", "metadata": { "name": "ctrl" },
                  "behavior": { "kind": "control" } }
              ]
            }"#,
        );
        assert_eq!(ir.decode(0x40, false, 0, &[]), Decoded::DontCare);
        assert!(
            matches!(ir.decode(0x0, true, 0, &[]), Decoded::Block(_)),
            "mapped accesses still decode"
        );
    }

    #[test]
    fn test_decode_prot_selects_fields() {
        let ir = compile_json(
            r#"{
              "metadata": { "name": "demo" },
              "fields": [
                { "address": "0x0:7..0", "metadata": { "name": "open" },
                  "behavior": { "kind": "control" } },
                { "address": "0x0:15..8", "metadata": { "name": "secret" },
                  "behavior": { "kind": "control" },
                  "permissions": { "user": false } }
              ]
            }"#,
        );
        assert!(ir.registers[0].protected);

        let Decoded::Block(user) = ir.decode(0x0, true, 0b000, &[]) else {
            panic!("user access must still decode");
        };
        assert_eq!(user.active, vec![0], "the protected field stays passive");

        let Decoded::Block(privileged) = ir.decode(0x0, true, 0b001, &[]) else {
            panic!("privileged access must decode");
        };
        assert_eq!(privileged.active, vec![0, 1]);
    }

    #[test]
    fn test_decode_subaddress() {
        let ir = compile_json(
            r#"{
              "metadata": { "name": "demo" },
              "fields": [
                { "address": "0x100/4:31..0", "metadata": { "name": "buf" },
                  "behavior": { "kind": "memory" } }
              ]
            }"#,
        );
        let Decoded::Block(hit) = ir.decode(0x10C, true, 0, &[]) else {
            panic!("0x10C lies inside the 16-byte window");
        };
        assert_eq!(hit.subaddress, 3, "address bits above the bus word");
        assert_eq!(ir.descriptors[0].subaddress_width, 2);
    }

    #[test]
    fn test_decode_honors_conditions() {
        let ir = compile_json(
            r#"{
              "metadata": { "name": "paged" },
              "internal-io": [
                { "direction": "input", "internal": "page:2" }
              ],
              "conditions": [
                { "internal": "page:2", "value": 1 }
              ],
              "fields": [
                { "address": "0x0:7..0", "metadata": { "name": "data" },
                  "behavior": { "kind": "control" } }
              ]
            }"#,
        );
        assert!(matches!(ir.decode(0x0, false, 0, &[1]), Decoded::Block(_)));
        assert_eq!(ir.decode(0x0, false, 0, &[2]), Decoded::Error);
    }

    #[test]
    fn test_condition_matching() {
        let condition = Condition {
            internal: 0,
            value: 0b10,
            ignore: 0b01,
        };
        assert!(condition.matches(0b10));
        assert!(condition.matches(0b11));
        assert!(!condition.matches(0b00));
    }

    #[test]
    fn test_holding_width() {
        let ir = compile_json(DEMO);
        assert_eq!(ir.holding_width, 32, "one register spills into a second block");

        let ir = compile_json(
            r#"{
              "metadata": { "name": "narrow" },
              "fields": [
                { "address": "0x0:31..0", "metadata": { "name": "word" },
                  "behavior": { "kind": "control" } }
              ]
            }"#,
        );
        assert_eq!(ir.holding_width, 0);
    }

    #[test]
    fn test_address_map() {
        let ir = compile_json(DEMO);
        let expected = "\
ADDRESS  MODE  MNEMONIC  NAME            BLOCK  FIELDS
0x0/2    R/W   ENABLE    enable_reg      1/1    enable[0], mode[3..1]
0x4/2    R/O   STATE     state_reg       1/1    state[7..0]
0x8/2    R/W   TOTALL    total_reg_low   1/2    total[31..0]
0xc/2    R/W   TOTALH    total_reg_high  2/2    total[7..0]
";
        assert_eq!(ir.address_map(), expected);
    }

    #[test]
    fn test_json_round_trip() {
        let ir = compile_json(DEMO);
        let json = ir.to_json().unwrap();
        let back = RegFileIr::from_json(&json).unwrap();
        assert_eq!(back.meta, ir.meta);
        assert_eq!(back.registers.len(), ir.registers.len());
        assert_eq!(back.defer_tags, ir.defer_tags);
        assert_eq!(back.holding_width, ir.holding_width);
        assert_eq!(
            back.decode(0xC, true, 0, &[]),
            ir.decode(0xC, true, 0, &[]),
            "the reloaded IR decodes identically"
        );

        let err = RegFileIr::from_json("{").unwrap_err();
        assert!(
            err.to_string().starts_with("configuration error: failed to load IR"),
            "{err}"
        );
    }
}
