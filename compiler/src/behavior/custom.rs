// Licensed under the Apache-2.0 license

//! Resolver for the custom behavior.
//!
//! Custom fields supply their own access logic outside the generated
//! register file; the configuration declares the interfaces that logic
//! needs (ports, generics, internal signals, private state) and what the
//! bus may assume about reads and writes. The compiler only checks the
//! declarations and wires up the internal signals.

use std::collections::HashSet;

use super::{
    check_options, Action, ActionEntry, Behavior, BehaviorDetail, CustomDetail, CustomPort,
    CustomPortKind, FieldContext, HookPurpose, InternalHook, ResetValue, Trigger,
};
use crate::access::{AccessCaps, BusCaps, NoOpMethod};
use crate::config::{
    BehaviorConfig, CustomAccessConfig, CustomInterfaceConfig, ResponseKind,
};
use crate::error::{Error, Result};
use crate::internals::{InternalIdx, InternalManager, Shape};
use crate::util;

const OPTIONS: &[&str] = &["interfaces", "read", "write"];

pub(super) fn resolve(
    cfg: &BehaviorConfig,
    ctx: &FieldContext,
    internals: &mut InternalManager,
) -> Result<Behavior> {
    check_options(cfg, OPTIONS)?;

    let mut ports = Vec::new();
    let mut hooks = Vec::new();
    let mut names: HashSet<String> = HashSet::new();
    for entry in cfg.interfaces.as_deref().unwrap_or(&[]) {
        let (kind, value) = select_kind(entry)?;
        let (name, explicit) = split_width(value)?;

        if !names.insert(name.to_string()) {
            return Err(Error::config(format!("duplicate interface name `{name}`")));
        }

        let is_internal = matches!(
            kind,
            CustomPortKind::Drive | CustomPortKind::Strobe | CustomPortKind::Monitor
        );
        if is_internal && ctx.is_repeated() {
            // A repeated descriptor already uses the internal's vector index
            // for its copies.
            if explicit.is_some() {
                return Err(Error::config(format!(
                    "repeated fields cannot {kind} a vector internal signal"
                )));
            }
            let internal = register(internals, ctx, kind, name, ctx.shape)?;
            hooks.push(hook(kind, internal));
            ports.push(CustomPort {
                kind,
                name: name.to_string(),
                shape: ctx.shape,
                internal: Some(internal),
            });
            continue;
        }

        let shape = match explicit {
            Some(width) => Shape::Vector(width),
            None => Shape::Scalar,
        };
        if is_internal {
            let internal = register(internals, ctx, kind, name, shape)?;
            hooks.push(hook(kind, internal));
            ports.push(CustomPort {
                kind,
                name: name.to_string(),
                shape,
                internal: Some(internal),
            });
        } else {
            ports.push(CustomPort {
                kind,
                name: name.to_string(),
                shape,
                internal: None,
            });
        }
    }

    let read = cfg.read.as_ref().map(|access| declared_caps(access, ctx));
    let write = cfg.write.as_ref().map(|access| declared_caps(access, ctx));
    let can_read_for_rmw = cfg
        .read
        .map(|access| !access.has_side_effects && !access.volatile)
        .unwrap_or(false);
    let bus = BusCaps::new(read, write, can_read_for_rmw)?;

    let mut actions = Vec::new();
    push_direction(&mut actions, Trigger::BusRead, cfg.read.as_ref());
    push_direction(&mut actions, Trigger::BusWrite, cfg.write.as_ref());

    Ok(Behavior {
        kind: cfg.kind,
        bus,
        reset: ResetValue::Invalid,
        actions,
        internals: hooks,
        detail: BehaviorDetail::Custom(CustomDetail { interfaces: ports }),
    })
}

/// Picks the one interface kind an entry declares.
fn select_kind(entry: &CustomInterfaceConfig) -> Result<(CustomPortKind, &str)> {
    let mut selected = None;
    for (kind, value) in [
        (CustomPortKind::Input, &entry.input),
        (CustomPortKind::Output, &entry.output),
        (CustomPortKind::Generic, &entry.generic),
        (CustomPortKind::Drive, &entry.drive),
        (CustomPortKind::Strobe, &entry.strobe),
        (CustomPortKind::Monitor, &entry.monitor),
        (CustomPortKind::State, &entry.state),
    ] {
        let Some(value) = value else {
            continue;
        };
        if selected.is_some() {
            return Err(Error::config(
                "each interface can only specify one of the `input`, `output`, \
                 `generic`, `drive`, `strobe`, `monitor` and `state` keys",
            ));
        }
        selected = Some((kind, value.as_str()));
    }
    selected.ok_or_else(|| {
        Error::config(
            "each interface must specify one of the `input`, `output`, `generic`, \
             `drive`, `strobe`, `monitor` and `state` keys",
        )
    })
}

/// Splits `name` or `name:width` and validates both parts.
fn split_width(value: &str) -> Result<(&str, Option<u32>)> {
    let (name, width) = match value.split_once(':') {
        Some((name, width)) => {
            let width: u32 = width
                .parse()
                .ok()
                .filter(|&width| width > 0)
                .ok_or_else(|| {
                    Error::config(format!("invalid width in interface `{value}`"))
                })?;
            (name, Some(width))
        }
        None => (value, None),
    };
    if !util::is_valid_name(name) {
        return Err(Error::config(format!(
            "`{name}` is not a valid interface name"
        )));
    }
    Ok((name, width))
}

fn register(
    internals: &mut InternalManager,
    ctx: &FieldContext,
    kind: CustomPortKind,
    name: &str,
    shape: Shape,
) -> Result<InternalIdx> {
    let party = ctx.party();
    match kind {
        CustomPortKind::Drive => internals.drive(&party, name, Some(shape)),
        CustomPortKind::Strobe => internals.strobe(&party, name, Some(shape)),
        CustomPortKind::Monitor => internals.watch(&party, name, Some(shape)),
        _ => unreachable!(),
    }
}

fn hook(kind: CustomPortKind, internal: InternalIdx) -> InternalHook {
    let purpose = match kind {
        CustomPortKind::Drive | CustomPortKind::Strobe => HookPurpose::Drive,
        CustomPortKind::Monitor => HookPurpose::Monitor,
        _ => unreachable!(),
    };
    InternalHook { purpose, internal }
}

fn declared_caps(access: &CustomAccessConfig, ctx: &FieldContext) -> AccessCaps {
    let mut caps = AccessCaps::new(ctx.prot);
    caps.volatile = access.volatile;
    caps.blocking = access.can_block;
    caps.deferring = access.response == ResponseKind::Defer;
    caps.no_op = if access.has_side_effects {
        NoOpMethod::Never
    } else {
        NoOpMethod::Always
    };
    caps
}

fn push_direction(
    actions: &mut Vec<ActionEntry>,
    trigger: Trigger,
    access: Option<&CustomAccessConfig>,
) {
    let Some(access) = access else {
        return;
    };
    if access.can_block {
        actions.push(ActionEntry::new(trigger, Action::Block));
    }
    let action = if access.response == ResponseKind::Defer {
        Action::Defer
    } else {
        Action::NoAction
    };
    actions.push(ActionEntry::new(trigger, action));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::ProtMask;
    use crate::config::{BehaviorKind, PermissionConfig};

    fn ctx(shape: Shape) -> FieldContext<'static> {
        FieldContext {
            name: "custom",
            width: 8,
            shape,
            subaddress_width: 0,
            prot: ProtMask::from_permissions(&PermissionConfig::default()).unwrap(),
        }
    }

    fn iface(set: impl FnOnce(&mut CustomInterfaceConfig)) -> CustomInterfaceConfig {
        let mut entry = CustomInterfaceConfig::default();
        set(&mut entry);
        entry
    }

    fn readable() -> Option<CustomAccessConfig> {
        Some(CustomAccessConfig {
            has_side_effects: true,
            ..CustomAccessConfig::default()
        })
    }

    #[test]
    fn test_interfaces_are_wired() {
        let mut internals = InternalManager::new();
        let cfg = BehaviorConfig {
            read: readable(),
            interfaces: Some(vec![
                iface(|e| e.input = Some("clk_en".to_string())),
                iface(|e| e.drive = Some("level:8".to_string())),
                iface(|e| e.strobe = Some("kick".to_string())),
                iface(|e| e.monitor = Some("busy".to_string())),
                iface(|e| e.state = Some("count:4".to_string())),
            ]),
            ..BehaviorConfig::of_kind(BehaviorKind::Custom)
        };
        let behavior = resolve(&cfg, &ctx(Shape::Scalar), &mut internals).unwrap();

        let detail = match behavior.detail {
            BehaviorDetail::Custom(detail) => detail,
            _ => panic!("expected custom detail"),
        };
        assert_eq!(detail.interfaces.len(), 5);
        assert_eq!(detail.interfaces[1].shape, Shape::Vector(8));
        assert!(detail.interfaces[0].internal.is_none());
        assert!(detail.interfaces[1].internal.is_some());

        let level = internals.lookup("level").unwrap();
        assert_eq!(internals.get(level).shape(), Shape::Vector(8));
        let kick = internals.lookup("kick").unwrap();
        assert!(internals.get(kick).is_strobe());
        // Three internal-facing interfaces, three hooks.
        assert_eq!(behavior.internals.len(), 3);
    }

    #[test]
    fn test_exactly_one_kind_per_entry() {
        let mut internals = InternalManager::new();
        let cfg = BehaviorConfig {
            read: readable(),
            interfaces: Some(vec![iface(|e| {
                e.input = Some("a".to_string());
                e.output = Some("b".to_string());
            })]),
            ..BehaviorConfig::of_kind(BehaviorKind::Custom)
        };
        let err = resolve(&cfg, &ctx(Shape::Scalar), &mut internals).unwrap_err();
        assert_eq!(
            err.to_string(),
            "configuration error: each interface can only specify one of the \
             `input`, `output`, `generic`, `drive`, `strobe`, `monitor` and \
             `state` keys"
        );

        let cfg = BehaviorConfig {
            read: readable(),
            interfaces: Some(vec![CustomInterfaceConfig::default()]),
            ..BehaviorConfig::of_kind(BehaviorKind::Custom)
        };
        let err = resolve(&cfg, &ctx(Shape::Scalar), &mut internals).unwrap_err();
        assert_eq!(
            err.to_string(),
            "configuration error: each interface must specify one of the `input`, \
             `output`, `generic`, `drive`, `strobe`, `monitor` and `state` keys"
        );
    }

    #[test]
    fn test_duplicate_and_invalid_names() {
        let mut internals = InternalManager::new();
        let cfg = BehaviorConfig {
            read: readable(),
            interfaces: Some(vec![
                iface(|e| e.input = Some("x".to_string())),
                iface(|e| e.output = Some("x:4".to_string())),
            ]),
            ..BehaviorConfig::of_kind(BehaviorKind::Custom)
        };
        let err = resolve(&cfg, &ctx(Shape::Scalar), &mut internals).unwrap_err();
        assert_eq!(
            err.to_string(),
            "configuration error: duplicate interface name `x`"
        );

        let cfg = BehaviorConfig {
            read: readable(),
            interfaces: Some(vec![iface(|e| e.input = Some("7seg".to_string()))]),
            ..BehaviorConfig::of_kind(BehaviorKind::Custom)
        };
        let err = resolve(&cfg, &ctx(Shape::Scalar), &mut internals).unwrap_err();
        assert_eq!(
            err.to_string(),
            "configuration error: `7seg` is not a valid interface name"
        );

        let cfg = BehaviorConfig {
            read: readable(),
            interfaces: Some(vec![iface(|e| e.input = Some("x:zero".to_string()))]),
            ..BehaviorConfig::of_kind(BehaviorKind::Custom)
        };
        let err = resolve(&cfg, &ctx(Shape::Scalar), &mut internals).unwrap_err();
        assert_eq!(
            err.to_string(),
            "configuration error: invalid width in interface `x:zero`"
        );
    }

    #[test]
    fn test_repeated_descriptors_use_the_descriptor_shape() {
        let mut internals = InternalManager::new();
        let cfg = BehaviorConfig {
            read: readable(),
            interfaces: Some(vec![iface(|e| e.drive = Some("lane_sel:4".to_string()))]),
            ..BehaviorConfig::of_kind(BehaviorKind::Custom)
        };
        let err = resolve(&cfg, &ctx(Shape::Vector(4)), &mut internals).unwrap_err();
        assert_eq!(
            err.to_string(),
            "configuration error: repeated fields cannot drive a vector internal \
             signal"
        );

        let cfg = BehaviorConfig {
            read: readable(),
            interfaces: Some(vec![iface(|e| e.drive = Some("lane_sel".to_string()))]),
            ..BehaviorConfig::of_kind(BehaviorKind::Custom)
        };
        resolve(&cfg, &ctx(Shape::Vector(4)), &mut internals).unwrap();
        let idx = internals.lookup("lane_sel").unwrap();
        assert_eq!(internals.get(idx).shape(), Shape::Vector(4));
    }

    #[test]
    fn test_declared_caps() {
        let mut internals = InternalManager::new();

        // Neither direction declared.
        let cfg = BehaviorConfig::of_kind(BehaviorKind::Custom);
        let err = resolve(&cfg, &ctx(Shape::Scalar), &mut internals).unwrap_err();
        assert_eq!(
            err.to_string(),
            "configuration error: behavior must support reads, writes, or both"
        );

        let cfg = BehaviorConfig {
            read: Some(CustomAccessConfig {
                can_block: true,
                volatile: false,
                has_side_effects: false,
                response: ResponseKind::Defer,
            }),
            write: Some(CustomAccessConfig {
                has_side_effects: true,
                ..CustomAccessConfig::default()
            }),
            ..BehaviorConfig::of_kind(BehaviorKind::Custom)
        };
        let behavior = resolve(&cfg, &ctx(Shape::Scalar), &mut internals).unwrap();

        let read = behavior.bus.read.unwrap();
        assert!(read.blocking && read.deferring && !read.volatile);
        assert_eq!(read.no_op, NoOpMethod::Always);
        assert!(behavior.bus.can_read_for_rmw);
        let write = behavior.bus.write.unwrap();
        assert_eq!(write.no_op, NoOpMethod::Never);
        assert_eq!(
            behavior.actions,
            vec![
                ActionEntry::new(Trigger::BusRead, Action::Block),
                ActionEntry::new(Trigger::BusRead, Action::Defer),
                ActionEntry::new(Trigger::BusWrite, Action::NoAction),
            ]
        );
    }
}
