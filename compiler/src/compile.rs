// Licensed under the Apache-2.0 license

//! The compilation pipeline.
//!
//! [`compile`] runs a parsed configuration through every stage in order:
//! feature validation, interrupt declaration, field expansion, register
//! assembly, internal I/O and condition resolution, the whole-file
//! consistency checks, and defer tag assignment. Interrupts are declared
//! before the fields so interrupt fields can bind to them regardless of
//! their order in the configuration, and the consistency checks run last
//! because only then is every producer and consumer of the internal
//! signals known.

use log::{debug, info};

use crate::address;
use crate::config::{ConditionConfig, ConditionValue, RegFileConfig};
use crate::defer;
use crate::error::{Error, Result};
use crate::field::FieldDescriptor;
use crate::internals::InternalManager;
use crate::interrupt::InterruptManager;
use crate::ir::{self, Condition, RegFileIr};
use crate::metadata::{Metadata, Namespace};
use crate::register;

/// Compiles a register file configuration into its intermediate
/// representation. The first error wins; nothing is reported beyond it.
pub fn compile(cfg: &RegFileConfig) -> Result<RegFileIr> {
    cfg.features.validate()?;
    let meta = Metadata::resolve(&cfg.metadata)?;
    info!("compiling register file `{}`", meta.name);

    let mut internals = InternalManager::new();
    let mut interrupts = InterruptManager::new();

    // Fields and interrupts both surface on the register file interface,
    // so they share one namespace. Registers have their own; a register
    // may take its name from the field it holds.
    let mut field_names = Namespace::new();
    for irq in &cfg.interrupts {
        interrupts.declare(irq, &mut internals, &mut field_names)?;
    }

    let mut descriptors = Vec::with_capacity(cfg.fields.len());
    for field in &cfg.fields {
        descriptors.push(FieldDescriptor::expand(
            field,
            &cfg.features,
            &mut internals,
            &mut interrupts,
            &mut field_names,
        )?);
    }
    debug!(
        "expanded {} field configurations into {} descriptors",
        cfg.fields.len(),
        descriptors.len()
    );

    let mut register_names = Namespace::new();
    let mut registers = register::assemble(&descriptors, &cfg.features, &mut register_names)?;
    debug!("assembled {} logical registers", registers.len());

    for io in &cfg.internal_io {
        internals.add_io(io)?;
    }
    let conditions = resolve_conditions(&cfg.conditions, &mut internals)?;

    interrupts.check_consistency(&internals)?;
    internals.verify()?;

    let defer_tags = defer::assign_tags(&mut registers);
    let holding_width = ir::holding_width(&registers, cfg.features.bus_width);

    info!(
        "compiled `{}`: {} registers, {} internal signals, {} interrupts",
        meta.name,
        registers.len(),
        internals.len(),
        interrupts.len(),
    );

    let interrupt_vector_width = interrupts.vector_width();
    let (internals, ports) = internals.into_parts();
    Ok(RegFileIr {
        meta,
        features: cfg.features,
        descriptors,
        registers,
        internals,
        ports,
        interrupts: interrupts.into_vec(),
        interrupt_vector_width,
        conditions,
        defer_tags,
        holding_width,
    })
}

/// Resolves the decode conditions against the internal signals. A condition
/// counts as a user of its internal, like a field or an output port, so a
/// signal only read by conditions passes verification.
fn resolve_conditions(
    cfgs: &[ConditionConfig],
    internals: &mut InternalManager,
) -> Result<Vec<Condition>> {
    let mut conditions = Vec::with_capacity(cfgs.len());
    for cfg in cfgs {
        let index = internals.watch("a condition", &cfg.internal, None)?;
        let internal = internals.get(index);
        let (value, ignore) = match &cfg.value {
            ConditionValue::Bool(value) => (u32::from(*value), 0),
            ConditionValue::Int(value) => (*value, 0),
            ConditionValue::Literal(text) => {
                address::parse_masked(text).map_err(|err| err.in_internal(internal.name()))?
            }
        };
        let width = internal.shape().width();
        if width < u32::BITS && (value | ignore) >> width != 0 {
            return Err(Error::config(format!(
                "condition value does not fit {}",
                internal.shape()
            ))
            .in_internal(internal.name()));
        }
        conditions.push(Condition {
            internal: index,
            value,
            ignore,
        });
    }
    Ok(conditions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IoDirection;

    fn compile_json(text: &str) -> RegFileIr {
        let cfg = RegFileConfig::from_json(text).unwrap();
        compile(&cfg).unwrap()
    }

    fn compile_err(text: &str) -> String {
        let cfg = RegFileConfig::from_json(text).unwrap();
        compile(&cfg).unwrap_err().to_string()
    }

    #[test]
    fn test_control_status_with_paging() {
        let ir = compile_json(
            r#"{
              "metadata": {
                "name": "sensor_csr",
                "brief": "control and status of the sensor block."
              },
              "fields": [
                { "address": "0x0:0", "metadata": { "name": "enable" },
                  "behavior": { "kind": "control" } },
                { "address": "0x0:10..8", "metadata": { "name": "gain" },
                  "behavior": { "kind": "control" } },
                { "address": "0x4:7..0", "metadata": { "name": "level" },
                  "behavior": { "kind": "status" } },
                { "address": "0x8:0", "metadata": { "name": "clear" },
                  "behavior": { "kind": "strobe" } }
              ],
              "internal-io": [
                { "direction": "input", "internal": "page:2" }
              ],
              "conditions": [
                { "internal": "page:2", "value": "0b0-" }
              ]
            }"#,
        );

        assert_eq!(ir.meta.mnemonic, "SENSOR_CSR");
        assert_eq!(ir.registers.len(), 3);
        let names: Vec<&str> = ir
            .registers
            .iter()
            .map(|r| r.meta.name.as_str())
            .collect();
        assert_eq!(names, ["enable_reg", "level_reg", "clear_reg"]);
        assert!(ir.registers[0].can_read() && ir.registers[0].can_write());
        assert!(ir.registers[1].can_read() && !ir.registers[1].can_write());
        assert!(!ir.registers[2].can_read() && ir.registers[2].can_write());

        // The page selector is an input port, watched only by the condition.
        assert_eq!(ir.ports.len(), 1);
        assert_eq!(ir.ports[0].direction, IoDirection::Input);
        assert_eq!(ir.internals[ir.ports[0].internal].name(), "page");
        assert_eq!(
            ir.conditions,
            vec![Condition {
                internal: ir.ports[0].internal,
                value: 0b00,
                ignore: 0b01,
            }]
        );

        assert_eq!(ir.holding_width, 0);
        assert!(!ir.defer_tags.defers_reads() && !ir.defer_tags.defers_writes());
        assert_eq!(ir.interrupt_vector_width, 0);
    }

    #[test]
    fn test_stream_pair_with_interrupts() {
        let ir = compile_json(
            r#"{
              "metadata": { "name": "packet_buf" },
              "interrupts": [
                { "metadata": { "name": "rx_underrun" }, "internal": "rx_under" },
                { "metadata": { "name": "tx_overrun" }, "internal": "tx_over" }
              ],
              "fields": [
                { "address": "0x0:7..0", "metadata": { "name": "rx" },
                  "behavior": { "kind": "stream-to-mmio",
                                "underrun-internal": "rx_under" } },
                { "address": "0x4:7..0", "metadata": { "name": "tx" },
                  "behavior": { "kind": "mmio-to-stream",
                                "overrun-internal": "tx_over" } },
                { "address": "0x8:0", "metadata": { "name": "rx_under_flag" },
                  "behavior": { "kind": "interrupt-flag",
                                "interrupt": "rx_underrun" } },
                { "address": "0x8:1", "metadata": { "name": "tx_over_flag" },
                  "behavior": { "kind": "interrupt-flag",
                                "interrupt": "tx_overrun" } }
              ]
            }"#,
        );

        assert_eq!(ir.interrupts.len(), 2);
        assert_eq!(ir.interrupt_vector_width, 2);
        assert_eq!(ir.interrupts[0].offset(), 0);
        assert_eq!(ir.interrupts[1].offset(), 1);
        for interrupt in &ir.interrupts {
            // The request strobes latch, and the flag fields clear.
            let source = interrupt.source().unwrap();
            assert!(ir.internals[source].is_strobe());
            assert!(interrupt.can_clear() && interrupt.latches());
            assert!(!interrupt.can_pend() && !interrupt.can_enable());
            assert!(interrupt.enabled_after_reset());
            assert!(interrupt.unmasked_after_reset());
        }

        let names: Vec<&str> = ir
            .registers
            .iter()
            .map(|r| r.meta.name.as_str())
            .collect();
        assert_eq!(names, ["rx_reg", "tx_reg", "rx_under_flag_reg"]);
        assert!(ir.registers[0].can_read() && !ir.registers[0].can_write());
        assert!(!ir.registers[1].can_read() && ir.registers[1].can_write());

        // Popping the stream on read and pushing on write are side effects.
        let read = ir.registers[0].read.unwrap();
        assert!(read.volatile && !read.blocking);
        let write = ir.registers[1].write.unwrap();
        assert!(write.volatile);
    }

    #[test]
    fn test_wide_counter_with_hardening() {
        let ir = compile_json(
            r#"{
              "metadata": { "name": "perf" },
              "features": { "insecure": false },
              "fields": [
                { "address": "0x0:63..0", "metadata": { "name": "cycles" },
                  "behavior": { "kind": "counter" },
                  "permissions": { "user": false } }
              ]
            }"#,
        );

        assert_eq!(ir.registers.len(), 1);
        let register = &ir.registers[0];
        assert_eq!(register.block_count(), 2);
        assert_eq!(register.blocks[0].meta.mnemonic, "CYCLESL");
        assert_eq!(register.blocks[1].meta.name, "cycles_reg_high");
        assert!(register.protected);
        assert_eq!(ir.holding_width, 32);

        // Only privileged accesses may touch the counter.
        let prot = ir.descriptors[0].behavior.bus.read.unwrap().prot;
        assert!(prot.matches(0b001));
        assert!(!prot.matches(0b000));
    }

    #[test]
    fn test_strobed_request_needs_latching_flag() {
        // The strobe port is only known once the I/O list is processed, so
        // the interrupt checks must run after it.
        let broken = r#"{
          "metadata": { "name": "t" },
          "interrupts": [
            { "metadata": { "name": "tick" }, "internal": "tick_req" }
          ],
          "fields": [
            { "address": "0x0:0", "metadata": { "name": "tick_state" },
              "behavior": { "kind": "interrupt-raw", "interrupt": "tick" } }
          ],
          "internal-io": [
            { "direction": "strobe", "internal": "tick_req" }
          ]
        }"#;
        assert_eq!(
            compile_err(broken),
            "interrupt \"tick\": configuration error: a non-latching interrupt \
             cannot be requested by strobed internal `tick_req`; add a field that \
             can clear this interrupt"
        );

        let fixed = r#"{
          "metadata": { "name": "t" },
          "interrupts": [
            { "metadata": { "name": "tick" }, "internal": "tick_req" }
          ],
          "fields": [
            { "address": "0x0:0", "metadata": { "name": "tick_state" },
              "behavior": { "kind": "interrupt-raw", "interrupt": "tick" } },
            { "address": "0x4:0", "metadata": { "name": "tick_flag" },
              "behavior": { "kind": "interrupt-flag", "interrupt": "tick" } }
          ],
          "internal-io": [
            { "direction": "strobe", "internal": "tick_req" }
          ]
        }"#;
        let ir = compile_json(fixed);
        assert!(ir.interrupts[0].can_clear());
    }

    #[test]
    fn test_unused_internal_rejected() {
        let err = compile_err(
            r#"{
              "metadata": { "name": "t" },
              "fields": [
                { "address": "0x0:0", "metadata": { "name": "knob" },
                  "behavior": { "kind": "internal-control", "internal": "tuning" } }
              ]
            }"#,
        );
        assert_eq!(
            err,
            "internal \"tuning\": configuration error: never used by any field, \
             condition, or output port"
        );
    }

    #[test]
    fn test_condition_value_must_fit() {
        let err = compile_err(
            r#"{
              "metadata": { "name": "t" },
              "fields": [
                { "address": "0x0:0", "metadata": { "name": "x" },
                  "behavior": { "kind": "control" } }
              ],
              "internal-io": [
                { "direction": "input", "internal": "page:2" }
              ],
              "conditions": [
                { "internal": "page:2", "value": 4 }
              ]
            }"#,
        );
        assert_eq!(
            err,
            "internal \"page\": configuration error: condition value does not fit \
             a vector of width 2"
        );
    }

    #[test]
    fn test_features_checked_before_fields() {
        // The field is broken too; the feature error must win.
        let err = compile_err(
            r#"{
              "metadata": { "name": "t" },
              "features": { "bus-width": 16 },
              "fields": [
                { "address": "0x0:0", "metadata": {},
                  "behavior": { "kind": "control" } }
              ]
            }"#,
        );
        assert_eq!(err, "configuration error: bus width must be 32 or 64, not 16");
    }
}
