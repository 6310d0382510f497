// Licensed under the Apache-2.0 license

//! Option policies of the primitive-family presets.
//!
//! Every primitive-family behavior kind is a view on the same underlying
//! register logic. A preset pins down some options, restricts others to a
//! meaningful subset and leaves the rest free. Restating a pinned option
//! with its pinned value is accepted, so configurations can spell out what
//! a preset implies.

use std::fmt::Display;

use crate::config::{
    AfterHwWriteAction, AfterReadAction, AfterWriteAction, BehaviorKind, BusReadMode,
    BusWriteMode, HwReadMode, HwWriteMode, MonitorMode, ResetConfig, ResetKeyword,
};
use crate::error::{Error, Result};

/// Policy of one behavior option.
#[derive(Clone, Copy, Debug)]
pub(super) enum Policy<T: 'static> {
    /// Any value; the given one is the default.
    Free(T),
    /// Pinned by the preset.
    Fixed(T),
    /// Restricted to the listed values; the first one is the default.
    Choice(&'static [T]),
}

impl<T: Copy + PartialEq + Display> Policy<T> {
    pub fn resolve(&self, kind: BehaviorKind, option: &str, given: Option<T>) -> Result<T> {
        match self {
            Policy::Free(default) => Ok(given.unwrap_or(*default)),
            Policy::Fixed(value) => match given {
                None => Ok(*value),
                Some(given) if given == *value => Ok(*value),
                Some(given) => Err(Error::config(format!(
                    "`{option}` cannot be `{given}`; it is fixed to `{value}` \
                     by the `{kind}` behavior"
                ))),
            },
            Policy::Choice(values) => match given {
                None => Ok(values[0]),
                Some(given) if values.contains(&given) => Ok(given),
                Some(given) => Err(Error::config(format!(
                    "`{given}` is not a valid `{option}` for the `{kind}` behavior; \
                     choose {}",
                    list_choices(values)
                ))),
            },
        }
    }
}

fn list_choices<T: Display>(values: &[T]) -> String {
    let mut text = String::new();
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            text.push_str(if i + 1 == values.len() { " or " } else { ", " });
        }
        text.push_str(&format!("`{value}`"));
    }
    text
}

/// Policy of the `reset` option. Reset accepts several shapes (booleans,
/// integers, null for the invalid state, `generic`), so it does not fit
/// [`Policy`].
#[derive(Clone, Copy, Debug)]
pub(super) enum ResetPolicy {
    /// Any form; the given one applies when the option is absent.
    Any(Option<ResetConfig>),
    /// The field always holds valid data, so null is rejected.
    ValueOnly(ResetConfig),
    /// Pinned by the preset.
    Fixed(Option<ResetConfig>),
}

impl ResetPolicy {
    pub fn resolve(
        &self,
        kind: BehaviorKind,
        given: Option<Option<ResetConfig>>,
    ) -> Result<Option<ResetConfig>> {
        match self {
            ResetPolicy::Any(default) => Ok(given.unwrap_or(*default)),
            ResetPolicy::ValueOnly(default) => match given {
                None => Ok(Some(*default)),
                Some(None) => Err(Error::config(format!(
                    "`reset` cannot be null; the `{kind}` behavior always holds \
                     valid data"
                ))),
                Some(given) => Ok(given),
            },
            ResetPolicy::Fixed(value) => match given {
                None => Ok(*value),
                Some(given) if reset_equal(&given, value) => Ok(*value),
                Some(_) => Err(Error::config(format!(
                    "`reset` is fixed to `{}` by the `{kind}` behavior",
                    reset_text(value)
                ))),
            },
        }
    }
}

/// Booleans and integers with the same numeric value count as the same
/// reset configuration.
fn reset_equal(a: &Option<ResetConfig>, b: &Option<ResetConfig>) -> bool {
    fn canonical(cfg: &Option<ResetConfig>) -> Option<ResetConfig> {
        match cfg {
            Some(ResetConfig::Bool(b)) => Some(ResetConfig::Int(*b as u64)),
            other => *other,
        }
    }
    canonical(a) == canonical(b)
}

pub(super) fn reset_text(cfg: &Option<ResetConfig>) -> String {
    match cfg {
        None => "null".to_string(),
        Some(ResetConfig::Bool(b)) => b.to_string(),
        Some(ResetConfig::Int(i)) => i.to_string(),
        Some(ResetConfig::Keyword(ResetKeyword::Generic)) => "generic".to_string(),
    }
}

/// Whether a preset accepts one of the internal signal hooks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum HookPolicy {
    Open,
    Off,
}

impl HookPolicy {
    pub fn resolve<'a>(
        &self,
        kind: BehaviorKind,
        option: &str,
        given: &'a Option<String>,
    ) -> Result<Option<&'a str>> {
        match (self, given) {
            (HookPolicy::Off, Some(_)) => Err(Error::config(format!(
                "`{option}` is not accepted by the `{kind}` behavior"
            ))),
            _ => Ok(given.as_deref()),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub(super) struct HookPolicies {
    pub drive: HookPolicy,
    pub full: HookPolicy,
    pub empty: HookPolicy,
    pub overflow: HookPolicy,
    pub underflow: HookPolicy,
    pub bit_overflow: HookPolicy,
    pub bit_underflow: HookPolicy,
    pub overrun: HookPolicy,
    pub underrun: HookPolicy,
    pub monitor: HookPolicy,
}

impl HookPolicies {
    const fn open() -> HookPolicies {
        HookPolicies {
            drive: HookPolicy::Open,
            full: HookPolicy::Open,
            empty: HookPolicy::Open,
            overflow: HookPolicy::Open,
            underflow: HookPolicy::Open,
            bit_overflow: HookPolicy::Open,
            bit_underflow: HookPolicy::Open,
            overrun: HookPolicy::Open,
            underrun: HookPolicy::Open,
            monitor: HookPolicy::Open,
        }
    }

    const fn none() -> HookPolicies {
        HookPolicies {
            drive: HookPolicy::Off,
            full: HookPolicy::Off,
            empty: HookPolicy::Off,
            overflow: HookPolicy::Off,
            underflow: HookPolicy::Off,
            bit_overflow: HookPolicy::Off,
            bit_underflow: HookPolicy::Off,
            overrun: HookPolicy::Off,
            underrun: HookPolicy::Off,
            monitor: HookPolicy::Off,
        }
    }
}

/// How the `internal` shorthand of the `internal-*` presets is routed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum InternalRole {
    None,
    Drive,
    Monitor,
}

/// Complete option policy table of one primitive-family behavior kind.
#[derive(Clone, Copy, Debug)]
pub(super) struct Preset {
    pub bus_read: Policy<BusReadMode>,
    pub after_bus_read: Policy<AfterReadAction>,
    pub bus_write: Policy<BusWriteMode>,
    pub after_bus_write: Policy<AfterWriteAction>,
    pub hw_read: Policy<HwReadMode>,
    pub hw_write: Policy<HwWriteMode>,
    pub after_hw_write: Policy<AfterHwWriteAction>,
    pub ctrl_lock: Policy<bool>,
    pub ctrl_validate: Policy<bool>,
    pub ctrl_invalidate: Policy<bool>,
    pub ctrl_ready: Policy<bool>,
    pub ctrl_clear: Policy<bool>,
    pub ctrl_reset: Policy<bool>,
    pub ctrl_increment: Policy<bool>,
    pub ctrl_decrement: Policy<bool>,
    pub ctrl_bit_set: Policy<bool>,
    pub ctrl_bit_clear: Policy<bool>,
    pub ctrl_bit_toggle: Policy<bool>,
    pub reset: ResetPolicy,
    pub hooks: HookPolicies,
    pub monitor_mode: Policy<MonitorMode>,
    pub internal: InternalRole,
}

impl Preset {
    /// The raw `primitive` kind: everything open.
    fn open() -> Preset {
        Preset {
            bus_read: Policy::Free(BusReadMode::Disabled),
            after_bus_read: Policy::Free(AfterReadAction::Nothing),
            bus_write: Policy::Free(BusWriteMode::Disabled),
            after_bus_write: Policy::Free(AfterWriteAction::Nothing),
            hw_read: Policy::Free(HwReadMode::Disabled),
            hw_write: Policy::Free(HwWriteMode::Disabled),
            after_hw_write: Policy::Free(AfterHwWriteAction::Nothing),
            ctrl_lock: Policy::Free(false),
            ctrl_validate: Policy::Free(false),
            ctrl_invalidate: Policy::Free(false),
            ctrl_ready: Policy::Free(false),
            ctrl_clear: Policy::Free(false),
            ctrl_reset: Policy::Free(false),
            ctrl_increment: Policy::Free(false),
            ctrl_decrement: Policy::Free(false),
            ctrl_bit_set: Policy::Free(false),
            ctrl_bit_clear: Policy::Free(false),
            ctrl_bit_toggle: Policy::Free(false),
            reset: ResetPolicy::Any(Some(ResetConfig::Bool(false))),
            hooks: HookPolicies::open(),
            monitor_mode: Policy::Free(MonitorMode::Status),
            internal: InternalRole::None,
        }
    }

    /// Common base of the named presets: no hook options, status monitor.
    fn locked() -> Preset {
        Preset {
            hooks: HookPolicies::none(),
            monitor_mode: Policy::Fixed(MonitorMode::Status),
            ..Preset::open()
        }
    }

    /// Base of the read-only presets (constant, config, status).
    fn read_only() -> Preset {
        Preset {
            bus_read: Policy::Fixed(BusReadMode::Enabled),
            after_bus_read: Policy::Fixed(AfterReadAction::Nothing),
            bus_write: Policy::Fixed(BusWriteMode::Disabled),
            after_bus_write: Policy::Fixed(AfterWriteAction::Nothing),
            hw_read: Policy::Fixed(HwReadMode::Disabled),
            hw_write: Policy::Fixed(HwWriteMode::Disabled),
            after_hw_write: Policy::Fixed(AfterHwWriteAction::Nothing),
            ctrl_lock: Policy::Fixed(false),
            ctrl_validate: Policy::Fixed(false),
            ctrl_invalidate: Policy::Fixed(false),
            ctrl_ready: Policy::Fixed(false),
            ctrl_clear: Policy::Fixed(false),
            ctrl_reset: Policy::Fixed(false),
            ctrl_increment: Policy::Fixed(false),
            ctrl_decrement: Policy::Fixed(false),
            ctrl_bit_set: Policy::Fixed(false),
            ctrl_bit_clear: Policy::Fixed(false),
            ctrl_bit_toggle: Policy::Fixed(false),
            reset: ResetPolicy::Fixed(None),
            ..Preset::locked()
        }
    }

    fn flag() -> Preset {
        Preset {
            bus_read: Policy::Fixed(BusReadMode::Enabled),
            after_bus_read: Policy::Fixed(AfterReadAction::Nothing),
            bus_write: Policy::Fixed(BusWriteMode::BitClear),
            after_bus_write: Policy::Fixed(AfterWriteAction::Nothing),
            hw_read: Policy::Choice(&[HwReadMode::Disabled, HwReadMode::Simple]),
            hw_write: Policy::Fixed(HwWriteMode::Disabled),
            after_hw_write: Policy::Fixed(AfterHwWriteAction::Nothing),
            ctrl_lock: Policy::Fixed(false),
            ctrl_validate: Policy::Fixed(false),
            ctrl_invalidate: Policy::Fixed(false),
            ctrl_ready: Policy::Fixed(false),
            ctrl_clear: Policy::Fixed(false),
            ctrl_reset: Policy::Fixed(false),
            ctrl_increment: Policy::Fixed(false),
            ctrl_decrement: Policy::Fixed(false),
            ctrl_bit_set: Policy::Fixed(true),
            ctrl_bit_clear: Policy::Fixed(false),
            ctrl_bit_toggle: Policy::Fixed(false),
            reset: ResetPolicy::ValueOnly(ResetConfig::Bool(false)),
            hooks: HookPolicies {
                bit_overflow: HookPolicy::Open,
                bit_underflow: HookPolicy::Open,
                ..HookPolicies::none()
            },
            ..Preset::locked()
        }
    }

    fn volatile_flag() -> Preset {
        Preset {
            after_bus_read: Policy::Fixed(AfterReadAction::Clear),
            bus_write: Policy::Fixed(BusWriteMode::Disabled),
            hooks: HookPolicies {
                bit_overflow: HookPolicy::Open,
                ..HookPolicies::none()
            },
            ..Preset::flag()
        }
    }

    fn control() -> Preset {
        Preset {
            bus_read: Policy::Choice(&[
                BusReadMode::Enabled,
                BusReadMode::Error,
                BusReadMode::Disabled,
            ]),
            after_bus_read: Policy::Fixed(AfterReadAction::Nothing),
            bus_write: Policy::Choice(&[
                BusWriteMode::Masked,
                BusWriteMode::Enabled,
                BusWriteMode::Invalid,
                BusWriteMode::InvalidOnly,
            ]),
            after_bus_write: Policy::Choice(&[
                AfterWriteAction::Nothing,
                AfterWriteAction::Validate,
            ]),
            hw_read: Policy::Choice(&[HwReadMode::Simple, HwReadMode::Enabled]),
            hw_write: Policy::Fixed(HwWriteMode::Disabled),
            after_hw_write: Policy::Fixed(AfterHwWriteAction::Nothing),
            ctrl_validate: Policy::Fixed(false),
            ctrl_ready: Policy::Fixed(false),
            ctrl_clear: Policy::Fixed(false),
            ctrl_increment: Policy::Fixed(false),
            ctrl_decrement: Policy::Fixed(false),
            ctrl_bit_set: Policy::Fixed(false),
            ctrl_bit_clear: Policy::Fixed(false),
            ctrl_bit_toggle: Policy::Fixed(false),
            reset: ResetPolicy::Any(None),
            ..Preset::locked()
        }
    }

    fn counter() -> Preset {
        Preset {
            bus_read: Policy::Fixed(BusReadMode::Enabled),
            after_bus_read: Policy::Fixed(AfterReadAction::Nothing),
            bus_write: Policy::Fixed(BusWriteMode::Subtract),
            after_bus_write: Policy::Fixed(AfterWriteAction::Nothing),
            hw_read: Policy::Choice(&[HwReadMode::Disabled, HwReadMode::Simple]),
            hw_write: Policy::Choice(&[
                HwWriteMode::Disabled,
                HwWriteMode::Enabled,
                HwWriteMode::Accumulate,
                HwWriteMode::Subtract,
            ]),
            after_hw_write: Policy::Fixed(AfterHwWriteAction::Nothing),
            ctrl_lock: Policy::Fixed(false),
            ctrl_validate: Policy::Fixed(false),
            ctrl_invalidate: Policy::Fixed(false),
            ctrl_ready: Policy::Fixed(false),
            ctrl_clear: Policy::Free(false),
            ctrl_reset: Policy::Free(false),
            ctrl_increment: Policy::Free(true),
            ctrl_decrement: Policy::Free(false),
            ctrl_bit_set: Policy::Fixed(false),
            ctrl_bit_clear: Policy::Fixed(false),
            ctrl_bit_toggle: Policy::Fixed(false),
            reset: ResetPolicy::ValueOnly(ResetConfig::Bool(false)),
            hooks: HookPolicies {
                overflow: HookPolicy::Open,
                underflow: HookPolicy::Open,
                ..HookPolicies::none()
            },
            monitor_mode: Policy::Fixed(MonitorMode::Increment),
            ..Preset::locked()
        }
    }

    fn volatile_counter() -> Preset {
        Preset {
            after_bus_read: Policy::Fixed(AfterReadAction::Clear),
            bus_write: Policy::Fixed(BusWriteMode::Disabled),
            hooks: HookPolicies {
                overflow: HookPolicy::Open,
                ..HookPolicies::none()
            },
            ..Preset::counter()
        }
    }

    fn strobe() -> Preset {
        Preset {
            bus_read: Policy::Fixed(BusReadMode::Disabled),
            after_bus_read: Policy::Fixed(AfterReadAction::Nothing),
            bus_write: Policy::Fixed(BusWriteMode::Enabled),
            after_bus_write: Policy::Fixed(AfterWriteAction::Invalidate),
            hw_read: Policy::Fixed(HwReadMode::Simple),
            hw_write: Policy::Fixed(HwWriteMode::Disabled),
            after_hw_write: Policy::Fixed(AfterHwWriteAction::Nothing),
            ctrl_lock: Policy::Fixed(false),
            ctrl_validate: Policy::Fixed(false),
            ctrl_invalidate: Policy::Fixed(false),
            ctrl_ready: Policy::Fixed(false),
            ctrl_clear: Policy::Fixed(false),
            ctrl_reset: Policy::Fixed(false),
            ctrl_increment: Policy::Fixed(false),
            ctrl_decrement: Policy::Fixed(false),
            ctrl_bit_set: Policy::Fixed(false),
            ctrl_bit_clear: Policy::Fixed(false),
            ctrl_bit_toggle: Policy::Fixed(false),
            reset: ResetPolicy::Fixed(Some(ResetConfig::Bool(false))),
            ..Preset::locked()
        }
    }
}

/// Returns the option policy table of a primitive-family kind.
pub(super) fn preset(kind: BehaviorKind) -> Preset {
    match kind {
        BehaviorKind::Primitive => Preset::open(),
        BehaviorKind::Constant => Preset::read_only(),
        BehaviorKind::Config => Preset {
            reset: ResetPolicy::Fixed(Some(ResetConfig::Keyword(ResetKeyword::Generic))),
            ..Preset::read_only()
        },
        BehaviorKind::Status => Preset {
            hw_write: Policy::Fixed(HwWriteMode::Status),
            ..Preset::read_only()
        },
        BehaviorKind::InternalStatus => Preset {
            internal: InternalRole::Monitor,
            ..Preset::read_only()
        },
        BehaviorKind::Latching => Preset {
            bus_read: Policy::Choice(&[
                BusReadMode::Enabled,
                BusReadMode::ValidWait,
                BusReadMode::ValidOnly,
            ]),
            after_bus_read: Policy::Choice(&[
                AfterReadAction::Nothing,
                AfterReadAction::Invalidate,
                AfterReadAction::Clear,
            ]),
            bus_write: Policy::Fixed(BusWriteMode::Disabled),
            after_bus_write: Policy::Fixed(AfterWriteAction::Nothing),
            hw_read: Policy::Fixed(HwReadMode::Disabled),
            hw_write: Policy::Fixed(HwWriteMode::Enabled),
            ctrl_lock: Policy::Fixed(false),
            ctrl_ready: Policy::Fixed(false),
            reset: ResetPolicy::Any(None),
            ..Preset::locked()
        },
        BehaviorKind::Control => Preset::control(),
        BehaviorKind::InternalControl => Preset {
            bus_write: Policy::Choice(&[BusWriteMode::Masked, BusWriteMode::Enabled]),
            after_bus_write: Policy::Fixed(AfterWriteAction::Nothing),
            hw_read: Policy::Fixed(HwReadMode::Disabled),
            ctrl_lock: Policy::Fixed(false),
            ctrl_invalidate: Policy::Fixed(false),
            ctrl_reset: Policy::Fixed(false),
            reset: ResetPolicy::ValueOnly(ResetConfig::Bool(false)),
            internal: InternalRole::Drive,
            ..Preset::control()
        },
        BehaviorKind::Flag => Preset::flag(),
        BehaviorKind::VolatileFlag => Preset::volatile_flag(),
        BehaviorKind::InternalFlag => Preset {
            ctrl_bit_set: Policy::Fixed(false),
            monitor_mode: Policy::Fixed(MonitorMode::BitSet),
            internal: InternalRole::Monitor,
            ..Preset::flag()
        },
        BehaviorKind::VolatileInternalFlag => Preset {
            ctrl_bit_set: Policy::Fixed(false),
            monitor_mode: Policy::Fixed(MonitorMode::BitSet),
            internal: InternalRole::Monitor,
            ..Preset::volatile_flag()
        },
        BehaviorKind::Strobe => Preset::strobe(),
        BehaviorKind::InternalStrobe => Preset {
            hw_read: Policy::Fixed(HwReadMode::Disabled),
            internal: InternalRole::Drive,
            ..Preset::strobe()
        },
        BehaviorKind::Request => Preset {
            bus_read: Policy::Choice(&[
                BusReadMode::Enabled,
                BusReadMode::Error,
                BusReadMode::Disabled,
            ]),
            after_bus_read: Policy::Fixed(AfterReadAction::Nothing),
            bus_write: Policy::Fixed(BusWriteMode::BitSet),
            after_bus_write: Policy::Fixed(AfterWriteAction::Nothing),
            hw_read: Policy::Fixed(HwReadMode::Simple),
            hw_write: Policy::Fixed(HwWriteMode::Disabled),
            after_hw_write: Policy::Fixed(AfterHwWriteAction::Nothing),
            ctrl_lock: Policy::Fixed(false),
            ctrl_validate: Policy::Fixed(false),
            ctrl_invalidate: Policy::Fixed(false),
            ctrl_ready: Policy::Fixed(false),
            ctrl_clear: Policy::Free(false),
            ctrl_reset: Policy::Free(false),
            ctrl_increment: Policy::Fixed(false),
            ctrl_decrement: Policy::Fixed(false),
            ctrl_bit_set: Policy::Fixed(false),
            ctrl_bit_clear: Policy::Free(true),
            ctrl_bit_toggle: Policy::Fixed(false),
            reset: ResetPolicy::ValueOnly(ResetConfig::Bool(false)),
            hooks: HookPolicies {
                bit_overflow: HookPolicy::Open,
                bit_underflow: HookPolicy::Open,
                ..HookPolicies::none()
            },
            ..Preset::locked()
        },
        BehaviorKind::MultiRequest => Preset {
            bus_read: Policy::Choice(&[
                BusReadMode::Enabled,
                BusReadMode::Error,
                BusReadMode::Disabled,
            ]),
            after_bus_read: Policy::Fixed(AfterReadAction::Nothing),
            bus_write: Policy::Fixed(BusWriteMode::Accumulate),
            after_bus_write: Policy::Fixed(AfterWriteAction::Nothing),
            hw_read: Policy::Fixed(HwReadMode::Simple),
            hw_write: Policy::Choice(&[HwWriteMode::Disabled, HwWriteMode::Subtract]),
            after_hw_write: Policy::Fixed(AfterHwWriteAction::Nothing),
            ctrl_lock: Policy::Fixed(false),
            ctrl_validate: Policy::Fixed(false),
            ctrl_invalidate: Policy::Fixed(false),
            ctrl_ready: Policy::Fixed(false),
            ctrl_clear: Policy::Free(false),
            ctrl_reset: Policy::Free(false),
            ctrl_increment: Policy::Fixed(false),
            ctrl_decrement: Policy::Free(true),
            ctrl_bit_set: Policy::Fixed(false),
            ctrl_bit_clear: Policy::Fixed(false),
            ctrl_bit_toggle: Policy::Fixed(false),
            reset: ResetPolicy::ValueOnly(ResetConfig::Bool(false)),
            hooks: HookPolicies {
                overflow: HookPolicy::Open,
                underflow: HookPolicy::Open,
                ..HookPolicies::none()
            },
            ..Preset::locked()
        },
        BehaviorKind::Counter => Preset::counter(),
        BehaviorKind::VolatileCounter => Preset::volatile_counter(),
        BehaviorKind::InternalCounter => Preset {
            ctrl_increment: Policy::Free(false),
            internal: InternalRole::Monitor,
            ..Preset::counter()
        },
        BehaviorKind::VolatileInternalCounter => Preset {
            ctrl_increment: Policy::Free(false),
            internal: InternalRole::Monitor,
            ..Preset::volatile_counter()
        },
        BehaviorKind::StreamToMmio => Preset {
            bus_read: Policy::Choice(&[
                BusReadMode::Enabled,
                BusReadMode::ValidOnly,
                BusReadMode::ValidWait,
            ]),
            after_bus_read: Policy::Fixed(AfterReadAction::Invalidate),
            bus_write: Policy::Fixed(BusWriteMode::Disabled),
            after_bus_write: Policy::Fixed(AfterWriteAction::Nothing),
            hw_read: Policy::Fixed(HwReadMode::Handshake),
            hw_write: Policy::Fixed(HwWriteMode::Stream),
            after_hw_write: Policy::Fixed(AfterHwWriteAction::Validate),
            ctrl_lock: Policy::Fixed(false),
            ctrl_validate: Policy::Fixed(false),
            ctrl_invalidate: Policy::Fixed(false),
            ctrl_ready: Policy::Fixed(false),
            ctrl_clear: Policy::Fixed(false),
            ctrl_reset: Policy::Fixed(false),
            ctrl_increment: Policy::Fixed(false),
            ctrl_decrement: Policy::Fixed(false),
            ctrl_bit_set: Policy::Fixed(false),
            ctrl_bit_clear: Policy::Fixed(false),
            ctrl_bit_toggle: Policy::Fixed(false),
            reset: ResetPolicy::Any(None),
            hooks: HookPolicies {
                full: HookPolicy::Open,
                empty: HookPolicy::Open,
                underrun: HookPolicy::Open,
                ..HookPolicies::none()
            },
            ..Preset::locked()
        },
        BehaviorKind::MmioToStream => Preset {
            bus_read: Policy::Fixed(BusReadMode::Disabled),
            after_bus_read: Policy::Fixed(AfterReadAction::Nothing),
            bus_write: Policy::Choice(&[
                BusWriteMode::Invalid,
                BusWriteMode::Enabled,
                BusWriteMode::InvalidWait,
                BusWriteMode::InvalidOnly,
            ]),
            after_bus_write: Policy::Fixed(AfterWriteAction::Validate),
            hw_read: Policy::Fixed(HwReadMode::Enabled),
            hw_write: Policy::Fixed(HwWriteMode::Disabled),
            after_hw_write: Policy::Fixed(AfterHwWriteAction::Nothing),
            ctrl_lock: Policy::Fixed(false),
            ctrl_validate: Policy::Fixed(false),
            ctrl_invalidate: Policy::Fixed(false),
            ctrl_ready: Policy::Fixed(true),
            ctrl_clear: Policy::Fixed(false),
            ctrl_reset: Policy::Fixed(false),
            ctrl_increment: Policy::Fixed(false),
            ctrl_decrement: Policy::Fixed(false),
            ctrl_bit_set: Policy::Fixed(false),
            ctrl_bit_clear: Policy::Fixed(false),
            ctrl_bit_toggle: Policy::Fixed(false),
            reset: ResetPolicy::Any(None),
            hooks: HookPolicies {
                full: HookPolicy::Open,
                empty: HookPolicy::Open,
                overrun: HookPolicy::Open,
                ..HookPolicies::none()
            },
            ..Preset::locked()
        },
        _ => unreachable!("`{kind}` is not a primitive-family behavior"),
    }
}
