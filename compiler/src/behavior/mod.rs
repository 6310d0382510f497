// Licensed under the Apache-2.0 license

//! Field behavior resolution.
//!
//! A behavior configuration names one of the preset behaviors and tweaks
//! its options. Resolution turns that into a [`Behavior`]: the fully
//! resolved option set, the bus capabilities used for register assembly,
//! the reset state, an ordered action table describing what the field does
//! on each trigger, and the internal signals and interrupts it is attached
//! to.
//!
//! The presets fall into five families with distinct option vocabularies.
//! The primitive family covers everything backed by an ordinary register
//! (controls, statuses, flags, counters, stream endpoints). The interrupt
//! family gives bus access to the interrupt registers. The memory and axi
//! families turn field accesses into deferred accesses to a RAM port or a
//! child bus. The custom family declares its capabilities explicitly.

mod axi;
mod custom;
mod interrupt;
mod memory;
mod presets;
mod primitive;

use serde::{Deserialize, Serialize};
use strum_macros::{Display as StrumDisplay, EnumString};

use crate::access::{BusCaps, ProtMask};
use crate::config::{
    AfterHwWriteAction, AfterReadAction, AfterWriteAction, BehaviorConfig, BehaviorFamily,
    BehaviorKind, BusMode, BusReadMode, BusWriteMode, HwReadMode, HwWriteMode,
    InterruptFieldMode, MonitorMode,
};
use crate::error::{Error, Result};
use crate::internals::{InternalIdx, InternalManager, Shape};
use crate::interrupt::{InterruptIdx, InterruptManager};

/// The event that causes a compiled action to run.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, StrumDisplay, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Trigger {
    BusRead,
    AfterBusRead,
    BusWrite,
    AfterBusWrite,
    HwRead,
    HwWrite,
    AfterHwWrite,
    Monitor,
    Reset,
    CtrlLock,
    CtrlValidate,
    CtrlInvalidate,
    CtrlReady,
    CtrlClear,
    CtrlReset,
    CtrlIncrement,
    CtrlDecrement,
    CtrlBitSet,
    CtrlBitClear,
    CtrlBitToggle,
}

/// What a trigger does to the field state or to the bus response.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, StrumDisplay, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Action {
    /// Load the register from the trigger's data source.
    AssignFromSource,
    Accumulate,
    Subtract,
    BitSet,
    BitClear,
    BitToggle,
    Validate,
    Invalidate,
    /// Respond with a slave error.
    EmitError,
    /// Defer the access; the response is produced later, in order.
    Defer,
    /// Stall the bus until the field can complete the access.
    Block,
    NoAction,
}

/// One row of the ordered action table of a behavior. Conditions such as
/// "only when the register is invalid" follow from the resolved modes in
/// the behavior detail; the table gives the order in which triggered
/// actions apply within a cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ActionEntry {
    pub trigger: Trigger,
    pub action: Action,
}

impl ActionEntry {
    pub fn new(trigger: Trigger, action: Action) -> ActionEntry {
        ActionEntry { trigger, action }
    }
}

/// Role of an internal signal attached to a behavior.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, StrumDisplay, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum HookPurpose {
    /// Level-driven (or strobed, for self-invalidating fields) copy of the
    /// field state.
    Drive,
    /// Asserted while the field holds valid data.
    Full,
    /// Asserted while the field holds no valid data.
    Empty,
    /// Strobed on unsigned overflow.
    Overflow,
    /// Strobed on unsigned underflow.
    Underflow,
    /// Strobed when a set bit is set again.
    BitOverflow,
    /// Strobed when a cleared bit is cleared again.
    BitUnderflow,
    /// Strobed when a bus write hits a field that already holds data.
    Overrun,
    /// Strobed when a bus read hits a field that holds no data.
    Underrun,
    /// The field state follows or accumulates the signal.
    Monitor,
}

/// An internal signal bound to a behavior.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct InternalHook {
    pub purpose: HookPurpose,
    pub internal: InternalIdx,
}

/// Resolved reset state of a field register.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResetValue {
    /// Reset to this value, marked valid. Fields wider than 64 bits can
    /// only reset to zero this way.
    Value(u64),
    /// Reset to the invalid state.
    Invalid,
    /// The reset value is provided externally per instance.
    Generic,
}

/// Everything behavior resolution needs to know about the field descriptor
/// being compiled.
#[derive(Clone, Copy, Debug)]
pub struct FieldContext<'a> {
    /// Name of the field descriptor.
    pub name: &'a str,
    /// Width in bits of a single field.
    pub width: u32,
    /// Scalar for a single field, vector of the repeat count otherwise.
    pub shape: Shape,
    /// Bits of subaddress available to the field.
    pub subaddress_width: u32,
    pub prot: ProtMask,
}

impl FieldContext<'_> {
    /// The descriptor as named in internal signal bookkeeping.
    pub fn party(&self) -> String {
        format!("field `{}`", self.name)
    }

    pub fn is_repeated(&self) -> bool {
        self.shape.is_vector()
    }

    /// Shape of a single field's data: scalar for single-bit fields.
    pub fn bit_shape(&self) -> Shape {
        if self.width == 1 {
            Shape::Scalar
        } else {
            Shape::Vector(self.width)
        }
    }
}

/// Resolved per-kind detail a behavior carries beyond the common parts.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BehaviorDetail {
    Primitive(PrimitiveDetail),
    Interrupt(InterruptDetail),
    Memory(MemoryDetail),
    Axi(AxiDetail),
    Custom(CustomDetail),
}

/// Fully resolved options of a primitive-family behavior.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct PrimitiveDetail {
    pub bus_read: BusReadMode,
    pub after_bus_read: AfterReadAction,
    pub bus_write: BusWriteMode,
    pub after_bus_write: AfterWriteAction,
    pub hw_read: HwReadMode,
    pub hw_write: HwWriteMode,
    pub after_hw_write: AfterHwWriteAction,
    pub ctrl: CtrlFlags,
    pub monitor_mode: MonitorMode,
}

/// Hardware control inputs of a primitive field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case", default)]
pub struct CtrlFlags {
    pub lock: bool,
    pub validate: bool,
    pub invalidate: bool,
    pub ready: bool,
    pub clear: bool,
    pub reset: bool,
    pub increment: bool,
    pub decrement: bool,
    pub bit_set: bool,
    pub bit_clear: bool,
    pub bit_toggle: bool,
}

/// Resolved options of an interrupt-family behavior.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct InterruptDetail {
    /// The bound interrupt.
    pub interrupt: InterruptIdx,
    pub mode: InterruptFieldMode,
    /// `disabled`, `enabled` or `clear`.
    pub bus_read: BusReadMode,
    /// `disabled`, `enabled`, `clear` or `set`.
    pub bus_write: BusWriteMode,
}

/// Resolved options of the memory behavior.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct MemoryDetail {
    pub bus_mode: BusMode,
    /// The subaddress selects one of `2^subaddress_width` memory words.
    pub subaddress_width: u32,
}

/// Resolved options of the axi passthrough behavior.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct AxiDetail {
    pub bus_mode: BusMode,
    /// Byte address bits consumed by one word of the child bus; 2 for a
    /// 32-bit field, 3 for a 64-bit field.
    pub word_bits: u32,
    /// The subaddress maps to child address bits
    /// `word_bits + subaddress_width - 1 .. word_bits`.
    pub subaddress_width: u32,
}

/// Kinds of interface a custom behavior can declare.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, StrumDisplay, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum CustomPortKind {
    /// External input port.
    Input,
    /// External output port.
    Output,
    /// Per-instance elaboration constant.
    Generic,
    /// Level-drives an internal signal.
    Drive,
    /// Strobes an internal signal.
    Strobe,
    /// Watches an internal signal.
    Monitor,
    /// Private persistent state.
    State,
}

/// One declared interface of a custom behavior.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct CustomPort {
    pub kind: CustomPortKind,
    pub name: String,
    pub shape: Shape,
    /// Backing internal signal for the internal-facing kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal: Option<InternalIdx>,
}

/// Resolved options of the custom behavior.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct CustomDetail {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interfaces: Vec<CustomPort>,
}

/// A fully resolved field behavior.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct Behavior {
    pub kind: BehaviorKind,
    pub bus: BusCaps,
    pub reset: ResetValue,
    /// Ordered action table; earlier rows apply first within a cycle.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ActionEntry>,
    /// Internal signals this behavior drives, strobes or watches.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub internals: Vec<InternalHook>,
    pub detail: BehaviorDetail,
}

impl Behavior {
    /// Resolves a behavior configuration against the field it belongs to,
    /// registering any internal signals and interrupt capabilities along
    /// the way.
    pub fn resolve(
        cfg: &BehaviorConfig,
        ctx: &FieldContext,
        internals: &mut InternalManager,
        interrupts: &mut InterruptManager,
    ) -> Result<Behavior> {
        match cfg.kind.family() {
            BehaviorFamily::Primitive => primitive::resolve(cfg, ctx, internals),
            BehaviorFamily::Interrupt => interrupt::resolve(cfg, ctx, interrupts),
            BehaviorFamily::Memory => memory::resolve(cfg, ctx),
            BehaviorFamily::Axi => axi::resolve(cfg, ctx, internals),
            BehaviorFamily::Custom => custom::resolve(cfg, ctx, internals),
        }
    }

    pub fn detail(&self) -> &BehaviorDetail {
        &self.detail
    }
}

/// Names of the options that are set in a behavior configuration.
fn given_options(cfg: &BehaviorConfig) -> Vec<&'static str> {
    let mut given = Vec::new();
    macro_rules! collect {
        ($($field:ident => $name:literal,)*) => {
            $(if cfg.$field.is_some() {
                given.push($name);
            })*
        };
    }
    collect! {
        bus_read => "bus-read",
        after_bus_read => "after-bus-read",
        bus_write => "bus-write",
        after_bus_write => "after-bus-write",
        hw_read => "hw-read",
        hw_write => "hw-write",
        after_hw_write => "after-hw-write",
        reset => "reset",
        value => "value",
        ctrl_lock => "ctrl-lock",
        ctrl_validate => "ctrl-validate",
        ctrl_invalidate => "ctrl-invalidate",
        ctrl_ready => "ctrl-ready",
        ctrl_clear => "ctrl-clear",
        ctrl_reset => "ctrl-reset",
        ctrl_increment => "ctrl-increment",
        ctrl_decrement => "ctrl-decrement",
        ctrl_bit_set => "ctrl-bit-set",
        ctrl_bit_clear => "ctrl-bit-clear",
        ctrl_bit_toggle => "ctrl-bit-toggle",
        drive_internal => "drive-internal",
        full_internal => "full-internal",
        empty_internal => "empty-internal",
        overflow_internal => "overflow-internal",
        underflow_internal => "underflow-internal",
        bit_overflow_internal => "bit-overflow-internal",
        bit_underflow_internal => "bit-underflow-internal",
        overrun_internal => "overrun-internal",
        underrun_internal => "underrun-internal",
        monitor_internal => "monitor-internal",
        monitor_mode => "monitor-mode",
        internal => "internal",
        interrupt => "interrupt",
        mode => "mode",
        bus_mode => "bus-mode",
        interrupt_internal => "interrupt-internal",
        interfaces => "interfaces",
        read => "read",
        write => "write",
    }
    given
}

/// Rejects options that do not belong to the vocabulary of the configured
/// behavior.
pub(crate) fn check_options(cfg: &BehaviorConfig, allowed: &[&str]) -> Result<()> {
    for option in given_options(cfg) {
        if !allowed.contains(&option) {
            return Err(Error::config(format!(
                "`{option}` is not an option of the `{}` behavior",
                cfg.kind
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PermissionConfig;

    fn ctx<'a>(name: &'a str, width: u32) -> FieldContext<'a> {
        FieldContext {
            name,
            width,
            shape: Shape::Scalar,
            subaddress_width: 0,
            prot: ProtMask::from_permissions(&PermissionConfig::default()).unwrap(),
        }
    }

    #[test]
    fn test_foreign_options_are_rejected() {
        let mut internals = InternalManager::new();
        let mut interrupts = InterruptManager::new();

        // An interrupt-family option on a primitive kind.
        let cfg = BehaviorConfig {
            kind: BehaviorKind::Control,
            interrupt: Some("rx".to_string()),
            ..BehaviorConfig::default()
        };
        let err = Behavior::resolve(&cfg, &ctx("ctrl", 8), &mut internals, &mut interrupts)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "configuration error: `interrupt` is not an option of the `control` behavior"
        );

        // A primitive option on the memory kind.
        let cfg = BehaviorConfig {
            kind: BehaviorKind::Memory,
            hw_read: Some(HwReadMode::Simple),
            ..BehaviorConfig::default()
        };
        let err = Behavior::resolve(&cfg, &ctx("buf", 32), &mut internals, &mut interrupts)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "configuration error: `hw-read` is not an option of the `memory` behavior"
        );
    }

    #[test]
    fn test_field_context_shapes() {
        let scalar = ctx("flag", 1);
        assert_eq!(scalar.bit_shape(), Shape::Scalar);
        assert!(!scalar.is_repeated());
        assert_eq!(scalar.party(), "field `flag`");

        let wide = FieldContext {
            shape: Shape::Vector(4),
            ..ctx("lanes", 8)
        };
        assert_eq!(wide.bit_shape(), Shape::Vector(8));
        assert!(wide.is_repeated());
    }
}
