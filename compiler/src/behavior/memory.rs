// Licensed under the Apache-2.0 license

//! Resolver for the memory behavior.
//!
//! A memory field maps a block of the address space onto a word-addressed
//! RAM port on the hardware interface. Bus accesses are deferred: the
//! request is handed to the RAM port and the response comes back in order,
//! a cycle or more later. The subaddress selects the word.

use super::{
    check_options, Action, ActionEntry, Behavior, BehaviorDetail, FieldContext, MemoryDetail,
    ResetValue, Trigger,
};
use crate::access::{AccessCaps, BusCaps, NoOpMethod};
use crate::config::{BehaviorConfig, BusMode};
use crate::error::Result;

const OPTIONS: &[&str] = &["bus-mode"];

pub(super) fn resolve(cfg: &BehaviorConfig, ctx: &FieldContext) -> Result<Behavior> {
    check_options(cfg, OPTIONS)?;
    let bus_mode = cfg.bus_mode.unwrap_or(BusMode::ReadWrite);

    // Reading a memory word has no side effects and writing a word back
    // changes nothing, so both directions are maskable despite deferring.
    let read = if bus_mode != BusMode::WriteOnly {
        let mut caps = AccessCaps::new(ctx.prot);
        caps.deferring = true;
        caps.no_op = NoOpMethod::Always;
        Some(caps)
    } else {
        None
    };
    let write = if bus_mode != BusMode::ReadOnly {
        let mut caps = AccessCaps::new(ctx.prot);
        caps.deferring = true;
        caps.no_op = NoOpMethod::WriteCurrent;
        Some(caps)
    } else {
        None
    };
    let can_read_for_rmw = read.is_some();
    let bus = BusCaps::new(read, write, can_read_for_rmw)?;

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
        internals: Vec::new(),
        detail: BehaviorDetail::Memory(MemoryDetail {
            bus_mode,
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

    fn ctx(subaddress_width: u32) -> FieldContext<'static> {
        FieldContext {
            name: "buffer",
            width: 32,
            shape: Shape::Scalar,
            subaddress_width,
            prot: ProtMask::from_permissions(&PermissionConfig::default()).unwrap(),
        }
    }

    #[test]
    fn test_memory_defers_both_directions() {
        let cfg = BehaviorConfig::of_kind(BehaviorKind::Memory);
        let behavior = resolve(&cfg, &ctx(6)).unwrap();

        let read = behavior.bus.read.unwrap();
        let write = behavior.bus.write.unwrap();
        assert!(read.deferring);
        assert!(write.deferring);
        assert!(!read.volatile);
        assert!(behavior.bus.can_read_for_rmw);
        assert_eq!(
            behavior.actions,
            vec![
                ActionEntry::new(Trigger::BusRead, Action::Defer),
                ActionEntry::new(Trigger::BusWrite, Action::Defer),
            ]
        );
        match behavior.detail {
            BehaviorDetail::Memory(detail) => {
                assert_eq!(detail.bus_mode, BusMode::ReadWrite);
                assert_eq!(detail.subaddress_width, 6);
            }
            _ => panic!("expected memory detail"),
        }
    }

    #[test]
    fn test_read_only_memory() {
        let cfg = BehaviorConfig {
            bus_mode: Some(BusMode::ReadOnly),
            ..BehaviorConfig::of_kind(BehaviorKind::Memory)
        };
        let behavior = resolve(&cfg, &ctx(4)).unwrap();
        assert!(behavior.bus.can_read());
        assert!(!behavior.bus.can_write());

        let cfg = BehaviorConfig {
            bus_mode: Some(BusMode::WriteOnly),
            ..BehaviorConfig::of_kind(BehaviorKind::Memory)
        };
        let behavior = resolve(&cfg, &ctx(4)).unwrap();
        assert!(!behavior.bus.can_read());
        assert!(!behavior.bus.can_read_for_rmw);
    }
}
