// Licensed under the Apache-2.0 license

//! Resolver for the interrupt behavior family.
//!
//! Interrupt fields have no storage of their own; they give the bus access
//! to the per-interrupt flag, enable and mask registers held by the
//! interrupt logic. Resolving one binds the field to a declared interrupt
//! and records which of those registers the field can touch, so the
//! interrupt logic only instantiates what is reachable.

use super::presets::Policy;
use super::{
    check_options, Action, ActionEntry, Behavior, BehaviorDetail, FieldContext,
    InterruptDetail, ResetValue, Trigger,
};
use crate::access::{AccessCaps, BusCaps, NoOpMethod};
use crate::config::{BehaviorConfig, BehaviorKind, BusReadMode, BusWriteMode, InterruptFieldMode};
use crate::error::{Error, Result};
use crate::interrupt::InterruptManager;

const OPTIONS: &[&str] = &["interrupt", "mode", "bus-read", "bus-write"];

struct InterruptPreset {
    mode: Policy<InterruptFieldMode>,
    bus_read: Policy<BusReadMode>,
    bus_write: Policy<BusWriteMode>,
}

fn preset(kind: BehaviorKind) -> InterruptPreset {
    use BusReadMode as R;
    use BusWriteMode as W;
    use InterruptFieldMode as M;
    match kind {
        BehaviorKind::Interrupt => InterruptPreset {
            mode: Policy::Free(M::Raw),
            bus_read: Policy::Free(R::Disabled),
            bus_write: Policy::Free(W::Disabled),
        },
        BehaviorKind::InterruptFlag => InterruptPreset {
            mode: Policy::Fixed(M::Flag),
            bus_read: Policy::Free(R::Enabled),
            bus_write: Policy::Free(W::Clear),
        },
        BehaviorKind::VolatileInterruptFlag => InterruptPreset {
            mode: Policy::Fixed(M::Flag),
            bus_read: Policy::Fixed(R::Clear),
            bus_write: Policy::Fixed(W::Disabled),
        },
        BehaviorKind::InterruptPend => InterruptPreset {
            mode: Policy::Fixed(M::Flag),
            bus_read: Policy::Free(R::Enabled),
            bus_write: Policy::Fixed(W::Set),
        },
        BehaviorKind::InterruptEnable => InterruptPreset {
            mode: Policy::Fixed(M::Enable),
            bus_read: Policy::Free(R::Enabled),
            bus_write: Policy::Free(W::Enabled),
        },
        BehaviorKind::InterruptUnmask => InterruptPreset {
            mode: Policy::Fixed(M::Unmask),
            bus_read: Policy::Free(R::Enabled),
            bus_write: Policy::Free(W::Enabled),
        },
        BehaviorKind::InterruptStatus => InterruptPreset {
            mode: Policy::Fixed(M::Masked),
            bus_read: Policy::Fixed(R::Enabled),
            bus_write: Policy::Fixed(W::Disabled),
        },
        BehaviorKind::InterruptRaw => InterruptPreset {
            mode: Policy::Fixed(M::Raw),
            bus_read: Policy::Fixed(R::Enabled),
            bus_write: Policy::Fixed(W::Disabled),
        },
        _ => unreachable!("`{kind}` is not an interrupt-family behavior"),
    }
}

pub(super) fn resolve(
    cfg: &BehaviorConfig,
    ctx: &FieldContext,
    interrupts: &mut InterruptManager,
) -> Result<Behavior> {
    let kind = cfg.kind;
    check_options(cfg, OPTIONS)?;
    let preset = preset(kind);

    let mode = preset.mode.resolve(kind, "mode", cfg.mode)?;
    let bus_read = preset.bus_read.resolve(kind, "bus-read", cfg.bus_read)?;
    let bus_write = preset.bus_write.resolve(kind, "bus-write", cfg.bus_write)?;

    // Interrupt fields only support the simple and flag-style access modes.
    if !matches!(
        bus_read,
        BusReadMode::Disabled | BusReadMode::Enabled | BusReadMode::Clear
    ) {
        return Err(Error::config(format!(
            "bus read mode `{bus_read}` is not available to the interrupt behaviors"
        )));
    }
    if !matches!(
        bus_write,
        BusWriteMode::Disabled | BusWriteMode::Enabled | BusWriteMode::Clear | BusWriteMode::Set
    ) {
        return Err(Error::config(format!(
            "bus write mode `{bus_write}` is not available to the interrupt behaviors"
        )));
    }

    if bus_read == BusReadMode::Disabled && bus_write == BusWriteMode::Disabled {
        return Err(Error::config(
            "the field is a no-operation; specify a read operation or a write \
             operation",
        ));
    }
    if bus_write != BusWriteMode::Disabled
        && matches!(mode, InterruptFieldMode::Raw | InterruptFieldMode::Masked)
    {
        return Err(Error::config(format!(
            "the {mode} interrupt state cannot be written"
        )));
    }
    if bus_read == BusReadMode::Clear && mode != InterruptFieldMode::Flag {
        return Err(Error::config(
            "clear-on-read is only sensible for flag fields",
        ));
    }

    // One field bit per interrupt; multi-bit coverage comes from repetition.
    if ctx.width != 1 {
        return Err(Error::config(
            "interrupt fields cannot be vectors; use `repeat` instead",
        ));
    }

    let name = match cfg.interrupt.as_deref() {
        Some(name) => name,
        None => {
            return Err(Error::config(
                "missing name of the interrupt to connect to",
            ))
        }
    };
    let idx = interrupts
        .lookup(name)
        .ok_or_else(|| Error::config(format!("unknown interrupt `{name}`")))?;
    let interrupt = interrupts.get_mut(idx);

    if ctx.shape != interrupt.shape() {
        return Err(Error::config(format!(
            "size mismatch between the field descriptor ({}) and interrupt `{}` ({})",
            ctx.shape,
            interrupt.name(),
            interrupt.shape()
        )));
    }

    // Record which interrupt registers the field reaches, so the interrupt
    // logic instantiates them.
    if bus_write != BusWriteMode::Disabled {
        match mode {
            InterruptFieldMode::Enable => interrupt.register_enable(),
            InterruptFieldMode::Unmask => interrupt.register_unmask(),
            InterruptFieldMode::Flag => {
                if matches!(bus_write, BusWriteMode::Enabled | BusWriteMode::Clear) {
                    interrupt.register_clear();
                }
                if matches!(bus_write, BusWriteMode::Enabled | BusWriteMode::Set) {
                    interrupt.register_pend();
                }
            }
            InterruptFieldMode::Raw | InterruptFieldMode::Masked => unreachable!(),
        }
    }
    if bus_read == BusReadMode::Clear {
        interrupt.register_clear();
    }

    let read = if bus_read == BusReadMode::Disabled {
        None
    } else {
        let mut caps = AccessCaps::new(ctx.prot);
        caps.volatile = bus_read == BusReadMode::Clear;
        caps.no_op = if bus_read == BusReadMode::Clear {
            NoOpMethod::Never
        } else {
            NoOpMethod::Always
        };
        Some(caps)
    };
    let write = if bus_write == BusWriteMode::Disabled {
        None
    } else {
        let mut caps = AccessCaps::new(ctx.prot);
        caps.no_op = if bus_write == BusWriteMode::Enabled {
            // Writes respect the byte strobes, so writing the value back is
            // a no-op.
            NoOpMethod::WriteCurrentOrMask
        } else {
            NoOpMethod::WriteZero
        };
        Some(caps)
    };
    let bus = BusCaps::new(read, write, true)?;

    let mut actions = Vec::new();
    match bus_read {
        BusReadMode::Enabled => {
            actions.push(ActionEntry::new(Trigger::BusRead, Action::AssignFromSource))
        }
        BusReadMode::Clear => {
            actions.push(ActionEntry::new(Trigger::BusRead, Action::AssignFromSource));
            actions.push(ActionEntry::new(Trigger::AfterBusRead, Action::BitClear));
        }
        _ => {}
    }
    match bus_write {
        BusWriteMode::Enabled => {
            actions.push(ActionEntry::new(Trigger::BusWrite, Action::AssignFromSource))
        }
        BusWriteMode::Clear => {
            actions.push(ActionEntry::new(Trigger::BusWrite, Action::BitClear))
        }
        BusWriteMode::Set => actions.push(ActionEntry::new(Trigger::BusWrite, Action::BitSet)),
        _ => {}
    }

    // The state lives in the interrupt registers; their reset follows from
    // the capabilities registered on the interrupt.
    Ok(Behavior {
        kind,
        bus,
        reset: ResetValue::Value(0),
        actions,
        internals: Vec::new(),
        detail: BehaviorDetail::Interrupt(InterruptDetail {
            interrupt: idx,
            mode,
            bus_read,
            bus_write,
        }),
    })
}
