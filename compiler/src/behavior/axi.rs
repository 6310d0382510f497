// Licensed under the Apache-2.0 license

//! Resolver for the AXI passthrough behavior.
//!
//! An AXI field turns its address range into a child bus: accesses are
//! deferred onto an AXI4-lite-style master port and complete whenever the
//! child responds. The field width sets the child data width, and the
//! subaddress maps onto the low word-address bits of the 32-bit child
//! address.

use super::{
    check_options, Action, ActionEntry, AxiDetail, Behavior, BehaviorDetail, FieldContext,
    HookPurpose, InternalHook, ResetValue, Trigger,
};
use crate::access::{AccessCaps, BusCaps, NoOpMethod};
use crate::config::{BehaviorConfig, BusMode};
use crate::error::{Error, Result};
use crate::internals::InternalManager;

const OPTIONS: &[&str] = &["bus-mode", "interrupt-internal"];

pub(super) fn resolve(
    cfg: &BehaviorConfig,
    ctx: &FieldContext,
    internals: &mut InternalManager,
) -> Result<Behavior> {
    check_options(cfg, OPTIONS)?;
    let bus_mode = cfg.bus_mode.unwrap_or(BusMode::ReadWrite);

    if ctx.width != 32 && ctx.width != 64 {
        return Err(Error::config("AXI fields must be 32 or 64 bits wide"));
    }
    let word_bits = if ctx.width == 32 { 2 } else { 3 };

    // The subaddress lands in child address bits
    // `word_bits + subaddress_width - 1 .. word_bits` and must stay within
    // the 32-bit child address.
    if ctx.subaddress_width > 0 && word_bits + ctx.subaddress_width - 1 > 31 {
        return Err(Error::config(format!(
            "subaddress is too wide for {}-bit word address",
            32 - word_bits
        )));
    }

    // The child bus carries an interrupt line; it can be routed into the
    // internal fabric. Repeated descriptors get one bit per child bus.
    let mut hooks = Vec::new();
    if let Some(reference) = cfg.interrupt_internal.as_deref() {
        let internal = internals.drive(&ctx.party(), reference, Some(ctx.shape))?;
        hooks.push(InternalHook {
            purpose: HookPurpose::Drive,
            internal,
        });
    }

    // Completion time is up to the child, so both directions block and
    // defer, and nothing about them is predictable enough to mask.
    let passthrough = || {
        let mut caps = AccessCaps::new(ctx.prot);
        caps.volatile = true;
        caps.blocking = true;
        caps.deferring = true;
        caps.no_op = NoOpMethod::Never;
        caps
    };
    let read = (bus_mode != BusMode::WriteOnly).then(passthrough);
    let write = (bus_mode != BusMode::ReadOnly).then(passthrough);
    let bus = BusCaps::new(read, write, false)?;

    let mut actions = Vec::new();
    if bus.can_read() {
        actions.push(ActionEntry::new(Trigger::BusRead, Action::Defer));
    }
    if bus.can_write() {
        actions.push(ActionEntry::new(Trigger::BusWrite, Action::Defer));
    }

    Ok(Behavior {
        kind: cfg.kind,
        bus,
        reset: ResetValue::Invalid,
        actions,
        internals: hooks,
        detail: BehaviorDetail::Axi(AxiDetail {
            bus_mode,
            word_bits,
            subaddress_width: ctx.subaddress_width,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::ProtMask;
    use crate::config::{BehaviorKind, PermissionConfig};
    use crate::internals::Shape;

    fn ctx(width: u32, subaddress_width: u32) -> FieldContext<'static> {
        FieldContext {
            name: "child",
            width,
            shape: Shape::Scalar,
            subaddress_width,
            prot: ProtMask::from_permissions(&PermissionConfig::default()).unwrap(),
        }
    }

    #[test]
    fn test_axi_passthrough_caps() {
        let mut internals = InternalManager::new();
        let cfg = BehaviorConfig::of_kind(BehaviorKind::Axi);
        let behavior = resolve(&cfg, &ctx(32, 10), &mut internals).unwrap();

        let read = behavior.bus.read.unwrap();
        assert!(read.volatile && read.blocking && read.deferring);
        assert_eq!(read.no_op, NoOpMethod::Never);
        assert!(!behavior.bus.can_read_for_rmw);
        match behavior.detail {
            BehaviorDetail::Axi(detail) => {
                assert_eq!(detail.word_bits, 2);
                assert_eq!(detail.subaddress_width, 10);
            }
            _ => panic!("expected axi detail"),
        }
    }

    #[test]
    fn test_width_and_subaddress_limits() {
        let mut internals = InternalManager::new();
        let cfg = BehaviorConfig::of_kind(BehaviorKind::Axi);

        let err = resolve(&cfg, &ctx(16, 0), &mut internals).unwrap_err();
        assert_eq!(
            err.to_string(),
            "configuration error: AXI fields must be 32 or 64 bits wide"
        );

        // word_bits 2 + subaddress 31 reaches child address bit 32.
        let err = resolve(&cfg, &ctx(32, 31), &mut internals).unwrap_err();
        assert_eq!(
            err.to_string(),
            "configuration error: subaddress is too wide for 30-bit word address"
        );
        resolve(&cfg, &ctx(32, 30), &mut internals).unwrap();
    }

    #[test]
    fn test_interrupt_internal_is_driven() {
        let mut internals = InternalManager::new();
        let cfg = BehaviorConfig {
            interrupt_internal: Some("child_irq".to_string()),
            ..BehaviorConfig::of_kind(BehaviorKind::Axi)
        };
        let repeated = FieldContext {
            shape: Shape::Vector(2),
            ..ctx(64, 0)
        };
        let behavior = resolve(&cfg, &repeated, &mut internals).unwrap();

        assert_eq!(behavior.internals.len(), 1);
        let idx = internals.lookup("child_irq").unwrap();
        assert_eq!(internals.get(idx).shape(), Shape::Vector(2));
        assert!(!internals.get(idx).is_strobe());
    }
}
