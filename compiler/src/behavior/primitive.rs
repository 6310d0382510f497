// Licensed under the Apache-2.0 license

//! Resolver for the primitive behavior family.
//!
//! All primitive-family presets share one option vocabulary and one
//! resolution path; the preset tables in [`presets`](super::presets) only
//! decide which options a given kind leaves open. Resolution validates the
//! option combination, registers the internal signals the field is hooked
//! up to and derives the bus capabilities and the action table.

use super::presets::{preset, InternalRole, Preset};
use super::{
    check_options, Action, ActionEntry, Behavior, BehaviorDetail, CtrlFlags, FieldContext,
    HookPurpose, InternalHook, PrimitiveDetail, ResetValue, Trigger,
};
use crate::access::{AccessCaps, BusCaps, NoOpMethod};
use crate::config::{
    AfterHwWriteAction, AfterReadAction, AfterWriteAction, BehaviorConfig, BehaviorKind,
    BusReadMode, BusWriteMode, HwReadMode, HwWriteMode, MonitorMode, ResetConfig,
    ResetKeyword,
};
use crate::error::{Error, Result};
use crate::internals::InternalManager;

/// Options shared by every primitive-family kind. `value` (constant) and
/// `internal` (the `internal-*` kinds) are added per kind.
const OPTIONS: &[&str] = &[
    "bus-read",
    "after-bus-read",
    "bus-write",
    "after-bus-write",
    "hw-read",
    "hw-write",
    "after-hw-write",
    "reset",
    "ctrl-lock",
    "ctrl-validate",
    "ctrl-invalidate",
    "ctrl-ready",
    "ctrl-clear",
    "ctrl-reset",
    "ctrl-increment",
    "ctrl-decrement",
    "ctrl-bit-set",
    "ctrl-bit-clear",
    "ctrl-bit-toggle",
    "drive-internal",
    "full-internal",
    "empty-internal",
    "overflow-internal",
    "underflow-internal",
    "bit-overflow-internal",
    "bit-underflow-internal",
    "overrun-internal",
    "underrun-internal",
    "monitor-internal",
    "monitor-mode",
];

pub(super) fn resolve(
    cfg: &BehaviorConfig,
    ctx: &FieldContext,
    internals: &mut InternalManager,
) -> Result<Behavior> {
    let kind = cfg.kind;
    let preset = preset(kind);

    let mut allowed = OPTIONS.to_vec();
    if kind == BehaviorKind::Constant {
        allowed.push("value");
    }
    if preset.internal != InternalRole::None {
        allowed.push("internal");
    }
    check_options(cfg, &allowed)?;

    // Resolve every option against the preset's policy.
    let bus_read = preset.bus_read.resolve(kind, "bus-read", cfg.bus_read)?;
    let after_bus_read = preset
        .after_bus_read
        .resolve(kind, "after-bus-read", cfg.after_bus_read)?;
    let bus_write = preset.bus_write.resolve(kind, "bus-write", cfg.bus_write)?;
    let after_bus_write =
        preset
            .after_bus_write
            .resolve(kind, "after-bus-write", cfg.after_bus_write)?;
    let hw_read = preset.hw_read.resolve(kind, "hw-read", cfg.hw_read)?;
    let hw_write = preset.hw_write.resolve(kind, "hw-write", cfg.hw_write)?;
    let after_hw_write = preset
        .after_hw_write
        .resolve(kind, "after-hw-write", cfg.after_hw_write)?;
    let ctrl = CtrlFlags {
        lock: preset.ctrl_lock.resolve(kind, "ctrl-lock", cfg.ctrl_lock)?,
        validate: preset
            .ctrl_validate
            .resolve(kind, "ctrl-validate", cfg.ctrl_validate)?,
        invalidate: preset
            .ctrl_invalidate
            .resolve(kind, "ctrl-invalidate", cfg.ctrl_invalidate)?,
        ready: preset.ctrl_ready.resolve(kind, "ctrl-ready", cfg.ctrl_ready)?,
        clear: preset.ctrl_clear.resolve(kind, "ctrl-clear", cfg.ctrl_clear)?,
        reset: preset.ctrl_reset.resolve(kind, "ctrl-reset", cfg.ctrl_reset)?,
        increment: preset
            .ctrl_increment
            .resolve(kind, "ctrl-increment", cfg.ctrl_increment)?,
        decrement: preset
            .ctrl_decrement
            .resolve(kind, "ctrl-decrement", cfg.ctrl_decrement)?,
        bit_set: preset
            .ctrl_bit_set
            .resolve(kind, "ctrl-bit-set", cfg.ctrl_bit_set)?,
        bit_clear: preset
            .ctrl_bit_clear
            .resolve(kind, "ctrl-bit-clear", cfg.ctrl_bit_clear)?,
        bit_toggle: preset
            .ctrl_bit_toggle
            .resolve(kind, "ctrl-bit-toggle", cfg.ctrl_bit_toggle)?,
    };
    let monitor_mode = preset
        .monitor_mode
        .resolve(kind, "monitor-mode", cfg.monitor_mode)?;

    // The clear/set access modes belong to the interrupt registers.
    if bus_read == BusReadMode::Clear {
        return Err(Error::config(
            "bus read mode `clear` is only available to the interrupt behaviors",
        ));
    }
    if matches!(bus_write, BusWriteMode::Clear | BusWriteMode::Set) {
        return Err(Error::config(format!(
            "bus write mode `{bus_write}` is only available to the interrupt behaviors"
        )));
    }

    let hooks = resolve_hooks(cfg, kind, &preset)?;

    // Post-access operations need the access they follow.
    let no_read = matches!(bus_read, BusReadMode::Disabled | BusReadMode::Error);
    if no_read && after_bus_read != AfterReadAction::Nothing {
        return Err(Error::config(format!(
            "bus read mode `{bus_read}` cannot be combined with a post-read operation"
        )));
    }
    let no_data_write = matches!(
        bus_write,
        BusWriteMode::Disabled | BusWriteMode::Error | BusWriteMode::Masked
    );
    if no_data_write && after_bus_write != AfterWriteAction::Nothing {
        return Err(Error::config(format!(
            "bus write mode `{bus_write}` cannot be combined with a post-write operation"
        )));
    }
    if matches!(hw_write, HwWriteMode::Disabled | HwWriteMode::Status)
        && after_hw_write != AfterHwWriteAction::Nothing
    {
        return Err(Error::config(format!(
            "hardware write mode `{hw_write}` cannot be combined with a post-write \
             operation"
        )));
    }

    // Underrun and overrun strobes report failed reads and writes.
    if no_read && hooks.underrun.is_some() {
        return Err(Error::config(format!(
            "bus read mode `{bus_read}` cannot be combined with an underrun internal"
        )));
    }
    if no_data_write && hooks.overrun.is_some() {
        return Err(Error::config(format!(
            "bus write mode `{bus_write}` cannot be combined with an overrun internal"
        )));
    }

    // The lock control signal gates bus writes.
    if matches!(bus_write, BusWriteMode::Disabled | BusWriteMode::Error) && ctrl.lock {
        return Err(Error::config(format!(
            "bus write mode `{bus_write}` cannot be combined with a lock control signal"
        )));
    }

    // Status fields have exactly one writer: the monitored internal or the
    // hardware input, never the bus or a control signal.
    let is_int_stat = hooks.monitor.is_some() && monitor_mode == MonitorMode::Status;
    let is_ext_stat = hw_write == HwWriteMode::Status;
    if is_int_stat || is_ext_stat {
        if is_int_stat && is_ext_stat {
            return Err(Error::config(
                "status field source cannot be both internal and external at the \
                 same time",
            ));
        }
        if after_bus_read != AfterReadAction::Nothing {
            return Err(Error::config(
                "status fields cannot be combined with a post-read operation",
            ));
        }
        if !matches!(bus_write, BusWriteMode::Disabled | BusWriteMode::Error) {
            return Err(Error::config(
                "status fields cannot be combined with a bus write operation",
            ));
        }
        if is_int_stat && hw_write != HwWriteMode::Disabled {
            return Err(Error::config(
                "internal status fields cannot be combined with a hardware write \
                 operation",
            ));
        }
        for (option, active) in [
            ("ctrl-validate", ctrl.validate),
            ("ctrl-invalidate", ctrl.invalidate),
            ("ctrl-ready", ctrl.ready),
            ("ctrl-clear", ctrl.clear),
            ("ctrl-reset", ctrl.reset),
            ("ctrl-increment", ctrl.increment),
            ("ctrl-decrement", ctrl.decrement),
            ("ctrl-bit-set", ctrl.bit_set),
            ("ctrl-bit-clear", ctrl.bit_clear),
            ("ctrl-bit-toggle", ctrl.bit_toggle),
        ] {
            if active {
                return Err(Error::config(format!(
                    "status fields cannot be combined with the `{option}` control \
                     signal"
                )));
            }
        }
        if is_ext_stat && hooks.monitor.is_some() {
            return Err(Error::config(
                "external status fields cannot be combined with an internal monitor \
                 signal",
            ));
        }
    }

    // The stream write mode and the full or simple read modes would both
    // produce a `data` port, and handshake reads produce the same `ready`
    // port as the ready control signal.
    if hw_write == HwWriteMode::Stream {
        if hw_read == HwReadMode::Enabled {
            return Err(Error::config(
                "cannot combine the stream hardware write mode with the full \
                 hardware read mode; both produce `data` and `valid` ports",
            ));
        }
        if hw_read == HwReadMode::Simple {
            return Err(Error::config(
                "cannot combine the stream hardware write mode with the simple \
                 hardware read mode; both produce a `data` port",
            ));
        }
    }
    if hw_read == HwReadMode::Handshake && ctrl.ready {
        return Err(Error::config(
            "cannot combine the handshake hardware read mode with the ready \
             control signal; both produce a `ready` port",
        ));
    }

    // Constants carry their value in `value`; everything else uses `reset`.
    let reset_cfg = if kind == BehaviorKind::Constant {
        match cfg.value {
            None => {
                return Err(Error::config(
                    "the `constant` behavior requires `value` to be specified",
                ))
            }
            Some(ResetConfig::Keyword(ResetKeyword::Generic)) => {
                return Err(Error::config(
                    "a generic-valued constant is spelled differently; use the \
                     `config` behavior",
                ))
            }
            value => value,
        }
    } else {
        preset.reset.resolve(kind, cfg.reset)?
    };
    let reset = resolve_reset(reset_cfg, ctx.width)?;

    let mut internal_hooks = Vec::new();
    let drive_wire = if after_bus_write == AfterWriteAction::Invalidate {
        Wire::Strobe
    } else {
        Wire::Drive
    };
    let mut register = |purpose, wire, per_repeat, reference| {
        register_hook(
            internals,
            &mut internal_hooks,
            ctx,
            purpose,
            wire,
            per_repeat,
            reference,
        )
    };
    register(HookPurpose::Drive, drive_wire, false, hooks.drive)?;
    register(HookPurpose::Full, Wire::Drive, true, hooks.full)?;
    register(HookPurpose::Empty, Wire::Drive, true, hooks.empty)?;
    register(HookPurpose::Overflow, Wire::Strobe, true, hooks.overflow)?;
    register(HookPurpose::Underflow, Wire::Strobe, true, hooks.underflow)?;
    register(
        HookPurpose::BitOverflow,
        Wire::Strobe,
        true,
        hooks.bit_overflow,
    )?;
    register(
        HookPurpose::BitUnderflow,
        Wire::Strobe,
        true,
        hooks.bit_underflow,
    )?;
    register(HookPurpose::Overrun, Wire::Strobe, true, hooks.overrun)?;
    register(HookPurpose::Underrun, Wire::Strobe, true, hooks.underrun)?;
    register(
        HookPurpose::Monitor,
        Wire::Watch,
        monitor_mode == MonitorMode::Increment,
        hooks.monitor,
    )?;

    // Bus capabilities.
    let read = if bus_read == BusReadMode::Disabled {
        None
    } else {
        let mut caps = AccessCaps::new(ctx.prot);
        caps.no_op = NoOpMethod::Always;
        caps.blocking = bus_read == BusReadMode::ValidWait;
        if after_bus_read != AfterReadAction::Nothing {
            caps.volatile = true;
            caps.no_op = NoOpMethod::Never;
        }
        Some(caps)
    };
    let can_read_for_rmw =
        !matches!(bus_read, BusReadMode::Disabled | BusReadMode::Error);

    let write = if bus_write == BusWriteMode::Disabled {
        None
    } else {
        let (volatile, no_op) = match bus_write {
            BusWriteMode::Error => (false, NoOpMethod::Never),
            BusWriteMode::Enabled
            | BusWriteMode::Invalid
            | BusWriteMode::InvalidWait
            | BusWriteMode::InvalidOnly => (false, NoOpMethod::WriteCurrent),
            BusWriteMode::Masked => (false, NoOpMethod::WriteCurrentOrMask),
            BusWriteMode::Accumulate | BusWriteMode::Subtract | BusWriteMode::BitToggle => {
                (true, NoOpMethod::WriteZero)
            }
            BusWriteMode::BitSet => (hooks.bit_overflow.is_some(), NoOpMethod::WriteZero),
            BusWriteMode::BitClear => {
                (hooks.bit_underflow.is_some(), NoOpMethod::WriteZero)
            }
            BusWriteMode::Disabled | BusWriteMode::Clear | BusWriteMode::Set => {
                unreachable!()
            }
        };
        let mut caps = AccessCaps::new(ctx.prot);
        caps.volatile = volatile;
        caps.no_op = no_op;
        caps.blocking = bus_write == BusWriteMode::InvalidWait;
        if after_bus_write != AfterWriteAction::Nothing {
            caps.volatile = true;
            caps.no_op = NoOpMethod::Never;
        }
        Some(caps)
    };
    let bus = BusCaps::new(read, write, can_read_for_rmw)?;

    let actions = action_table(
        bus_read,
        after_bus_read,
        bus_write,
        after_bus_write,
        hw_read,
        hw_write,
        after_hw_write,
        hooks.monitor.is_some(),
        monitor_mode,
        &ctrl,
        reset,
    );

    Ok(Behavior {
        kind,
        bus,
        reset,
        actions,
        internals: internal_hooks,
        detail: BehaviorDetail::Primitive(PrimitiveDetail {
            bus_read,
            after_bus_read,
            bus_write,
            after_bus_write,
            hw_read,
            hw_write,
            after_hw_write,
            ctrl,
            monitor_mode,
        }),
    })
}

/// The internal signal references a behavior configuration may carry, after
/// the per-kind hook policies and the `internal` shorthand are applied.
struct HookRefs<'a> {
    drive: Option<&'a str>,
    full: Option<&'a str>,
    empty: Option<&'a str>,
    overflow: Option<&'a str>,
    underflow: Option<&'a str>,
    bit_overflow: Option<&'a str>,
    bit_underflow: Option<&'a str>,
    overrun: Option<&'a str>,
    underrun: Option<&'a str>,
    monitor: Option<&'a str>,
}

fn resolve_hooks<'a>(
    cfg: &'a BehaviorConfig,
    kind: BehaviorKind,
    preset: &Preset,
) -> Result<HookRefs<'a>> {
    let policies = &preset.hooks;
    let mut refs = HookRefs {
        drive: policies
            .drive
            .resolve(kind, "drive-internal", &cfg.drive_internal)?,
        full: policies.full.resolve(kind, "full-internal", &cfg.full_internal)?,
        empty: policies
            .empty
            .resolve(kind, "empty-internal", &cfg.empty_internal)?,
        overflow: policies
            .overflow
            .resolve(kind, "overflow-internal", &cfg.overflow_internal)?,
        underflow: policies
            .underflow
            .resolve(kind, "underflow-internal", &cfg.underflow_internal)?,
        bit_overflow: policies.bit_overflow.resolve(
            kind,
            "bit-overflow-internal",
            &cfg.bit_overflow_internal,
        )?,
        bit_underflow: policies.bit_underflow.resolve(
            kind,
            "bit-underflow-internal",
            &cfg.bit_underflow_internal,
        )?,
        overrun: policies
            .overrun
            .resolve(kind, "overrun-internal", &cfg.overrun_internal)?,
        underrun: policies
            .underrun
            .resolve(kind, "underrun-internal", &cfg.underrun_internal)?,
        monitor: policies
            .monitor
            .resolve(kind, "monitor-internal", &cfg.monitor_internal)?,
    };

    match preset.internal {
        InternalRole::None => {}
        InternalRole::Drive => match cfg.internal.as_deref() {
            Some(internal) => refs.drive = Some(internal),
            None => {
                return Err(Error::config(format!(
                    "the `{kind}` behavior requires `internal` to name the signal \
                     it drives"
                )))
            }
        },
        InternalRole::Monitor => match cfg.internal.as_deref() {
            Some(internal) => refs.monitor = Some(internal),
            None => {
                return Err(Error::config(format!(
                    "the `{kind}` behavior requires `internal` to name the signal \
                     it monitors"
                )))
            }
        },
    }
    Ok(refs)
}

#[derive(Clone, Copy)]
enum Wire {
    Drive,
    Strobe,
    Watch,
}

/// Registers one internal signal hook. Hooks that carry the field data use
/// the bit shape and reject repeated descriptors; per-repetition hooks use
/// the descriptor shape.
fn register_hook(
    internals: &mut InternalManager,
    hooks: &mut Vec<InternalHook>,
    ctx: &FieldContext,
    purpose: HookPurpose,
    wire: Wire,
    per_repeat: bool,
    reference: Option<&str>,
) -> Result<()> {
    let Some(reference) = reference else {
        return Ok(());
    };
    let shape = if per_repeat {
        ctx.shape
    } else {
        if ctx.is_repeated() {
            let verb = match wire {
                Wire::Drive => "drive",
                Wire::Strobe => "strobe",
                Wire::Watch => "monitor",
            };
            return Err(Error::config(format!(
                "repeated fields cannot {verb} an internal signal"
            )));
        }
        ctx.bit_shape()
    };
    let party = ctx.party();
    let internal = match wire {
        Wire::Drive => internals.drive(&party, reference, Some(shape))?,
        Wire::Strobe => internals.strobe(&party, reference, Some(shape))?,
        Wire::Watch => internals.watch(&party, reference, Some(shape))?,
    };
    hooks.push(InternalHook { purpose, internal });
    Ok(())
}

fn resolve_reset(cfg: Option<ResetConfig>, width: u32) -> Result<ResetValue> {
    match cfg {
        None => Ok(ResetValue::Invalid),
        Some(ResetConfig::Keyword(ResetKeyword::Generic)) => Ok(ResetValue::Generic),
        Some(ResetConfig::Bool(b)) => Ok(ResetValue::Value(b as u64)),
        Some(ResetConfig::Int(value)) => {
            if width > 64 {
                if value != 0 {
                    return Err(Error::config(format!(
                        "reset value {value} is not representable; fields wider than \
                         64 bits can only reset to zero"
                    )));
                }
            } else if width < 64 && value >> width != 0 {
                return Err(Error::config(format!(
                    "reset value {value} does not fit in a field of width {width}"
                )));
            }
            Ok(ResetValue::Value(value))
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn action_table(
    bus_read: BusReadMode,
    after_bus_read: AfterReadAction,
    bus_write: BusWriteMode,
    after_bus_write: AfterWriteAction,
    hw_read: HwReadMode,
    hw_write: HwWriteMode,
    after_hw_write: AfterHwWriteAction,
    monitored: bool,
    monitor_mode: MonitorMode,
    ctrl: &CtrlFlags,
    reset: ResetValue,
) -> Vec<ActionEntry> {
    let mut table = Vec::new();
    let mut push = |trigger, action| table.push(ActionEntry::new(trigger, action));

    match bus_read {
        BusReadMode::Disabled => {}
        BusReadMode::Enabled => push(Trigger::BusRead, Action::AssignFromSource),
        BusReadMode::ValidWait => {
            push(Trigger::BusRead, Action::Block);
            push(Trigger::BusRead, Action::AssignFromSource);
        }
        BusReadMode::ValidOnly => {
            push(Trigger::BusRead, Action::EmitError);
            push(Trigger::BusRead, Action::AssignFromSource);
        }
        BusReadMode::Error => push(Trigger::BusRead, Action::EmitError),
        BusReadMode::Clear => unreachable!(),
    }
    match after_bus_read {
        AfterReadAction::Nothing => {}
        AfterReadAction::Invalidate => push(Trigger::AfterBusRead, Action::Invalidate),
        AfterReadAction::Clear => push(Trigger::AfterBusRead, Action::BitClear),
        AfterReadAction::Increment => push(Trigger::AfterBusRead, Action::Accumulate),
        AfterReadAction::Decrement => push(Trigger::AfterBusRead, Action::Subtract),
    }
    match bus_write {
        BusWriteMode::Disabled => {}
        BusWriteMode::Enabled | BusWriteMode::Invalid | BusWriteMode::Masked => {
            push(Trigger::BusWrite, Action::AssignFromSource)
        }
        BusWriteMode::InvalidWait => {
            push(Trigger::BusWrite, Action::Block);
            push(Trigger::BusWrite, Action::AssignFromSource);
        }
        BusWriteMode::InvalidOnly => {
            push(Trigger::BusWrite, Action::EmitError);
            push(Trigger::BusWrite, Action::AssignFromSource);
        }
        BusWriteMode::Error => push(Trigger::BusWrite, Action::EmitError),
        BusWriteMode::Accumulate => push(Trigger::BusWrite, Action::Accumulate),
        BusWriteMode::Subtract => push(Trigger::BusWrite, Action::Subtract),
        BusWriteMode::BitSet => push(Trigger::BusWrite, Action::BitSet),
        BusWriteMode::BitClear => push(Trigger::BusWrite, Action::BitClear),
        BusWriteMode::BitToggle => push(Trigger::BusWrite, Action::BitToggle),
        BusWriteMode::Clear | BusWriteMode::Set => unreachable!(),
    }
    match after_bus_write {
        AfterWriteAction::Nothing => {}
        AfterWriteAction::Validate => push(Trigger::AfterBusWrite, Action::Validate),
        AfterWriteAction::Invalidate => {
            push(Trigger::AfterBusWrite, Action::Validate);
            push(Trigger::AfterBusWrite, Action::Invalidate);
        }
    }
    if hw_read == HwReadMode::Handshake {
        push(Trigger::HwRead, Action::Invalidate);
    }
    match hw_write {
        HwWriteMode::Disabled => {}
        HwWriteMode::Status | HwWriteMode::Enabled | HwWriteMode::Stream => {
            push(Trigger::HwWrite, Action::AssignFromSource)
        }
        HwWriteMode::Accumulate => push(Trigger::HwWrite, Action::Accumulate),
        HwWriteMode::Subtract => push(Trigger::HwWrite, Action::Subtract),
        HwWriteMode::Set => push(Trigger::HwWrite, Action::BitSet),
        HwWriteMode::Reset => push(Trigger::HwWrite, Action::BitClear),
        HwWriteMode::Toggle => push(Trigger::HwWrite, Action::BitToggle),
    }
    if after_hw_write == AfterHwWriteAction::Validate {
        push(Trigger::AfterHwWrite, Action::Validate);
    }
    if monitored {
        match monitor_mode {
            MonitorMode::Status => push(Trigger::Monitor, Action::AssignFromSource),
            MonitorMode::BitSet => push(Trigger::Monitor, Action::BitSet),
            MonitorMode::Increment => push(Trigger::Monitor, Action::Accumulate),
        }
    }
    if ctrl.lock {
        push(Trigger::CtrlLock, Action::NoAction);
    }
    if ctrl.validate {
        push(Trigger::CtrlValidate, Action::Validate);
    }
    if ctrl.invalidate {
        push(Trigger::CtrlInvalidate, Action::Invalidate);
    }
    if ctrl.ready {
        push(Trigger::CtrlReady, Action::Invalidate);
    }
    if ctrl.clear {
        push(Trigger::CtrlClear, Action::BitClear);
    }
    if ctrl.reset {
        push(Trigger::CtrlReset, Action::AssignFromSource);
    }
    if ctrl.increment {
        push(Trigger::CtrlIncrement, Action::Accumulate);
    }
    if ctrl.decrement {
        push(Trigger::CtrlDecrement, Action::Subtract);
    }
    if ctrl.bit_set {
        push(Trigger::CtrlBitSet, Action::BitSet);
    }
    if ctrl.bit_clear {
        push(Trigger::CtrlBitClear, Action::BitClear);
    }
    if ctrl.bit_toggle {
        push(Trigger::CtrlBitToggle, Action::BitToggle);
    }
    match reset {
        ResetValue::Value(_) | ResetValue::Generic => {
            push(Trigger::Reset, Action::AssignFromSource)
        }
        ResetValue::Invalid => push(Trigger::Reset, Action::Invalidate),
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::ProtMask;
    use crate::config::PermissionConfig;
    use crate::internals::Shape;

    fn ctx<'a>(name: &'a str, width: u32) -> FieldContext<'a> {
        FieldContext {
            name,
            width,
            shape: Shape::Scalar,
            subaddress_width: 0,
            prot: ProtMask::from_permissions(&PermissionConfig::default()).unwrap(),
        }
    }

    fn resolve_cfg(cfg: &BehaviorConfig, ctx: &FieldContext) -> Result<Behavior> {
        let mut internals = InternalManager::new();
        resolve(cfg, ctx, &mut internals)
    }

    #[test]
    fn test_control_defaults() {
        let cfg = BehaviorConfig::of_kind(BehaviorKind::Control);
        let behavior = resolve_cfg(&cfg, &ctx("thresh", 8)).unwrap();

        assert!(behavior.bus.can_read());
        assert!(behavior.bus.can_write());
        let write = behavior.bus.write.unwrap();
        assert_eq!(write.no_op, NoOpMethod::WriteCurrentOrMask);
        assert!(!write.volatile);
        assert!(behavior.bus.can_mask_with_strobe());
        assert_eq!(behavior.reset, ResetValue::Invalid);
        assert!(behavior
            .actions
            .contains(&ActionEntry::new(Trigger::BusWrite, Action::AssignFromSource)));
        assert!(behavior
            .actions
            .contains(&ActionEntry::new(Trigger::Reset, Action::Invalidate)));
    }

    #[test]
    fn test_constant_value() {
        let cfg = BehaviorConfig::of_kind(BehaviorKind::Constant);
        let err = resolve_cfg(&cfg, &ctx("version", 8)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "configuration error: the `constant` behavior requires `value` to be \
             specified"
        );

        let cfg = BehaviorConfig {
            value: Some(ResetConfig::Int(42)),
            ..BehaviorConfig::of_kind(BehaviorKind::Constant)
        };
        let behavior = resolve_cfg(&cfg, &ctx("version", 8)).unwrap();
        assert_eq!(behavior.reset, ResetValue::Value(42));
        assert!(behavior.bus.can_read());
        assert!(!behavior.bus.can_write());

        let cfg = BehaviorConfig {
            value: Some(ResetConfig::Keyword(ResetKeyword::Generic)),
            ..BehaviorConfig::of_kind(BehaviorKind::Constant)
        };
        let err = resolve_cfg(&cfg, &ctx("version", 8)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "configuration error: a generic-valued constant is spelled differently; \
             use the `config` behavior"
        );
    }

    #[test]
    fn test_reset_must_fit_the_field() {
        let cfg = BehaviorConfig {
            reset: Some(Some(ResetConfig::Int(256))),
            ..BehaviorConfig::of_kind(BehaviorKind::Control)
        };
        let err = resolve_cfg(&cfg, &ctx("small", 8)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "configuration error: reset value 256 does not fit in a field of width 8"
        );

        // Wide fields reset to zero or not at all.
        let cfg = BehaviorConfig {
            reset: Some(Some(ResetConfig::Int(1))),
            ..BehaviorConfig::of_kind(BehaviorKind::Control)
        };
        let err = resolve_cfg(&cfg, &ctx("wide", 96)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "configuration error: reset value 1 is not representable; fields wider \
             than 64 bits can only reset to zero"
        );
        let cfg = BehaviorConfig {
            reset: Some(Some(ResetConfig::Int(0))),
            ..BehaviorConfig::of_kind(BehaviorKind::Control)
        };
        assert_eq!(
            resolve_cfg(&cfg, &ctx("wide", 96)).unwrap().reset,
            ResetValue::Value(0)
        );
    }

    #[test]
    fn test_interrupt_modes_are_rejected() {
        let cfg = BehaviorConfig {
            bus_read: Some(BusReadMode::Clear),
            ..BehaviorConfig::of_kind(BehaviorKind::Primitive)
        };
        let err = resolve_cfg(&cfg, &ctx("f", 1)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "configuration error: bus read mode `clear` is only available to the \
             interrupt behaviors"
        );

        let cfg = BehaviorConfig {
            bus_write: Some(BusWriteMode::Set),
            ..BehaviorConfig::of_kind(BehaviorKind::Primitive)
        };
        let err = resolve_cfg(&cfg, &ctx("f", 1)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "configuration error: bus write mode `set` is only available to the \
             interrupt behaviors"
        );
    }

    #[test]
    fn test_post_access_requires_the_access() {
        let cfg = BehaviorConfig {
            after_bus_read: Some(AfterReadAction::Clear),
            ..BehaviorConfig::of_kind(BehaviorKind::Primitive)
        };
        let err = resolve_cfg(&cfg, &ctx("f", 1)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "configuration error: bus read mode `disabled` cannot be combined with \
             a post-read operation"
        );

        let cfg = BehaviorConfig {
            bus_write: Some(BusWriteMode::Masked),
            after_bus_write: Some(AfterWriteAction::Validate),
            ..BehaviorConfig::of_kind(BehaviorKind::Primitive)
        };
        let err = resolve_cfg(&cfg, &ctx("f", 1)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "configuration error: bus write mode `masked` cannot be combined with \
             a post-write operation"
        );

        let cfg = BehaviorConfig {
            ctrl_lock: Some(true),
            ..BehaviorConfig::of_kind(BehaviorKind::Primitive)
        };
        let err = resolve_cfg(&cfg, &ctx("f", 1)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "configuration error: bus write mode `disabled` cannot be combined with \
             a lock control signal"
        );
    }

    #[test]
    fn test_status_field_rules() {
        // A field cannot be status-driven from two sides.
        let cfg = BehaviorConfig {
            bus_read: Some(BusReadMode::Enabled),
            hw_write: Some(HwWriteMode::Status),
            monitor_internal: Some("state".to_string()),
            ..BehaviorConfig::of_kind(BehaviorKind::Primitive)
        };
        let err = resolve_cfg(&cfg, &ctx("stat", 4)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "configuration error: status field source cannot be both internal and \
             external at the same time"
        );

        let cfg = BehaviorConfig {
            bus_read: Some(BusReadMode::Enabled),
            hw_write: Some(HwWriteMode::Status),
            ctrl_increment: Some(true),
            ..BehaviorConfig::of_kind(BehaviorKind::Primitive)
        };
        let err = resolve_cfg(&cfg, &ctx("stat", 4)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "configuration error: status fields cannot be combined with the \
             `ctrl-increment` control signal"
        );

        // The status preset itself resolves to a read-only, hw-written field.
        let cfg = BehaviorConfig::of_kind(BehaviorKind::Status);
        let behavior = resolve_cfg(&cfg, &ctx("stat", 4)).unwrap();
        assert!(behavior.bus.can_read());
        assert!(!behavior.bus.can_write());
        assert!(behavior
            .actions
            .contains(&ActionEntry::new(Trigger::HwWrite, Action::AssignFromSource)));
    }

    #[test]
    fn test_stream_port_conflicts() {
        let cfg = BehaviorConfig {
            hw_write: Some(HwWriteMode::Stream),
            hw_read: Some(HwReadMode::Simple),
            after_hw_write: Some(AfterHwWriteAction::Validate),
            ..BehaviorConfig::of_kind(BehaviorKind::Primitive)
        };
        let err = resolve_cfg(&cfg, &ctx("fifo", 8)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "configuration error: cannot combine the stream hardware write mode \
             with the simple hardware read mode; both produce a `data` port"
        );

        let cfg = BehaviorConfig {
            hw_read: Some(HwReadMode::Handshake),
            ctrl_ready: Some(true),
            ..BehaviorConfig::of_kind(BehaviorKind::Primitive)
        };
        let err = resolve_cfg(&cfg, &ctx("fifo", 8)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "configuration error: cannot combine the handshake hardware read mode \
             with the ready control signal; both produce a `ready` port"
        );
    }

    #[test]
    fn test_internal_strobe_wiring() {
        let mut internals = InternalManager::new();
        let cfg = BehaviorConfig {
            internal: Some("go".to_string()),
            ..BehaviorConfig::of_kind(BehaviorKind::InternalStrobe)
        };
        let behavior = resolve(&cfg, &ctx("go", 1), &mut internals).unwrap();

        // Self-invalidating drive hooks register as strobes.
        let idx = internals.lookup("go").unwrap();
        assert!(internals.get(idx).is_strobe());
        assert_eq!(behavior.internals.len(), 1);
        assert_eq!(behavior.internals[0].purpose, HookPurpose::Drive);
        assert!(behavior
            .actions
            .contains(&ActionEntry::new(Trigger::AfterBusWrite, Action::Invalidate)));

        // The shorthand is not optional for the internal presets.
        let cfg = BehaviorConfig::of_kind(BehaviorKind::InternalStatus);
        let err = resolve(&cfg, &ctx("stat", 1), &mut internals).unwrap_err();
        assert_eq!(
            err.to_string(),
            "configuration error: the `internal-status` behavior requires `internal` \
             to name the signal it monitors"
        );
    }

    #[test]
    fn test_repeated_fields_cannot_drive() {
        let mut internals = InternalManager::new();
        let cfg = BehaviorConfig {
            bus_write: Some(BusWriteMode::Enabled),
            drive_internal: Some("x".to_string()),
            ..BehaviorConfig::of_kind(BehaviorKind::Primitive)
        };
        let repeated = FieldContext {
            shape: Shape::Vector(2),
            ..ctx("lanes", 4)
        };
        let err = resolve(&cfg, &repeated, &mut internals).unwrap_err();
        assert_eq!(
            err.to_string(),
            "configuration error: repeated fields cannot drive an internal signal"
        );

        // Per-repetition hooks accept repeated descriptors and take the
        // descriptor shape.
        let cfg = BehaviorConfig {
            internal: Some("events".to_string()),
            ..BehaviorConfig::of_kind(BehaviorKind::InternalCounter)
        };
        let repeated = FieldContext {
            shape: Shape::Vector(4),
            ..ctx("events", 8)
        };
        resolve(&cfg, &repeated, &mut internals).unwrap();
        let idx = internals.lookup("events").unwrap();
        assert_eq!(internals.get(idx).shape(), Shape::Vector(4));
    }

    #[test]
    fn test_counter_caps() {
        let cfg = BehaviorConfig::of_kind(BehaviorKind::Counter);
        let behavior = resolve_cfg(&cfg, &ctx("events", 16)).unwrap();

        let write = behavior.bus.write.unwrap();
        assert!(write.volatile);
        assert_eq!(write.no_op, NoOpMethod::WriteZero);
        assert!(behavior.bus.can_mask_with_zero());
        assert!(behavior
            .actions
            .contains(&ActionEntry::new(Trigger::BusWrite, Action::Subtract)));
        assert!(behavior
            .actions
            .contains(&ActionEntry::new(Trigger::CtrlIncrement, Action::Accumulate)));

        // volatile-counter reads clear the count, making reads volatile.
        let cfg = BehaviorConfig::of_kind(BehaviorKind::VolatileCounter);
        let behavior = resolve_cfg(&cfg, &ctx("events", 16)).unwrap();
        let read = behavior.bus.read.unwrap();
        assert!(read.volatile);
        assert_eq!(read.no_op, NoOpMethod::Never);
        assert!(behavior
            .actions
            .contains(&ActionEntry::new(Trigger::AfterBusRead, Action::BitClear)));
    }

    #[test]
    fn test_stream_to_mmio_blocks() {
        let cfg = BehaviorConfig {
            bus_read: Some(BusReadMode::ValidWait),
            ..BehaviorConfig::of_kind(BehaviorKind::StreamToMmio)
        };
        let behavior = resolve_cfg(&cfg, &ctx("rx", 8)).unwrap();
        let read = behavior.bus.read.unwrap();
        assert!(read.blocking);
        assert!(read.volatile);
        assert!(behavior
            .actions
            .contains(&ActionEntry::new(Trigger::BusRead, Action::Block)));
        assert!(behavior
            .actions
            .contains(&ActionEntry::new(Trigger::AfterHwWrite, Action::Validate)));
        assert!(behavior
            .actions
            .contains(&ActionEntry::new(Trigger::HwRead, Action::Invalidate)));
    }
}
