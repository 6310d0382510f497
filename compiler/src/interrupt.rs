// Licensed under the Apache-2.0 license

//! Interrupt declarations.
//!
//! Each interrupt carries three conceptual registers: `enable` gates whether
//! incoming requests reach the flag, `flag` stores whether the interrupt is
//! pending, and `unmask` gates whether a pending flag asserts the outgoing
//! IRQ line. The outgoing line of the register file is the OR of all
//! unmasked flags.
//!
//! Fields with the interrupt behaviors declare what they can do to an
//! interrupt while they are being compiled; the consistency of the combined
//! capabilities is checked once all fields are known. Whether the flag
//! actually latches follows from those capabilities: without any way to
//! clear the flag it simply follows the (enabled) request input, and the
//! request must then be level-like. Edge-sensitive triggering always
//! latches, so it requires a clear path.
//!
//! Interrupt flags always reset to cleared. The enable and unmask registers
//! reset asserted when no field can control them, and deasserted otherwise.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::{ActiveLevel, InterruptConfig};
use crate::error::{Error, Result};
use crate::internals::{InternalIdx, InternalManager, Shape};
use crate::metadata::{Metadata, Namespace};

/// Index of an interrupt in the [`InterruptManager`] arena.
pub type InterruptIdx = usize;

/// A declared interrupt or vector of interrupts.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct Interrupt {
    meta: Metadata,
    shape: Shape,
    active: ActiveLevel,
    /// Internal signal requesting the interrupt; an input port when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source: Option<InternalIdx>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    group: Option<String>,
    /// Bit position of the LSB in the concatenated interrupt vector.
    offset: u32,
    can_enable: bool,
    can_clear: bool,
    can_pend: bool,
    can_unmask: bool,
}

impl Interrupt {
    pub fn meta(&self) -> &Metadata {
        &self.meta
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn width(&self) -> u32 {
        self.shape.width()
    }

    pub fn active(&self) -> ActiveLevel {
        self.active
    }

    pub fn source(&self) -> Option<InternalIdx> {
        self.source
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn can_enable(&self) -> bool {
        self.can_enable
    }

    pub fn can_clear(&self) -> bool {
        self.can_clear
    }

    pub fn can_pend(&self) -> bool {
        self.can_pend
    }

    pub fn can_unmask(&self) -> bool {
        self.can_unmask
    }

    /// Whether the request input is edge-triggered rather than level-like.
    pub fn is_edge_triggered(&self) -> bool {
        matches!(
            self.active,
            ActiveLevel::Rising | ActiveLevel::Falling | ActiveLevel::Edge
        )
    }

    /// Whether the flag register latches. Without a clear path the flag
    /// just follows the enabled request input.
    pub fn latches(&self) -> bool {
        self.can_clear
    }

    /// Reset state of the enable register. Constant-enabled when no field
    /// can control it.
    pub fn enabled_after_reset(&self) -> bool {
        !self.can_enable
    }

    /// Reset state of the unmask register. Constant-unmasked when no field
    /// can control it.
    pub fn unmasked_after_reset(&self) -> bool {
        !self.can_unmask
    }

    /// Records that a field can enable or disable this interrupt.
    pub fn register_enable(&mut self) {
        self.can_enable = true;
    }

    /// Records that a field can clear the flag of this interrupt.
    pub fn register_clear(&mut self) {
        self.can_clear = true;
    }

    /// Records that a field can pend this interrupt from software.
    pub fn register_pend(&mut self) {
        self.can_pend = true;
    }

    /// Records that a field can unmask or mask this interrupt.
    pub fn register_unmask(&mut self) {
        self.can_unmask = true;
    }
}

/// Arena of all interrupts of a register file, in declaration order. The
/// declaration order fixes each interrupt's position in the concatenated
/// interrupt vector.
#[derive(Debug, Default)]
pub struct InterruptManager {
    interrupts: Vec<Interrupt>,
    index: HashMap<String, InterruptIdx>,
    vector_width: u32,
}

impl InterruptManager {
    pub fn new() -> InterruptManager {
        InterruptManager::default()
    }

    /// Declares an interrupt. An internal request source is attached to the
    /// signal right away, so the driving field may be compiled later.
    pub fn declare(
        &mut self,
        cfg: &InterruptConfig,
        internals: &mut InternalManager,
        namespace: &mut Namespace,
    ) -> Result<InterruptIdx> {
        let label = cfg
            .metadata
            .name
            .clone()
            .or_else(|| cfg.metadata.mnemonic.as_ref().map(|m| m.to_lowercase()))
            .unwrap_or_else(|| format!("<interrupt {}>", self.interrupts.len()));
        self.declare_impl(cfg, internals, namespace)
            .map_err(|err| err.in_interrupt(label))
    }

    fn declare_impl(
        &mut self,
        cfg: &InterruptConfig,
        internals: &mut InternalManager,
        namespace: &mut Namespace,
    ) -> Result<InterruptIdx> {
        if cfg.repeat == Some(0) {
            return Err(Error::config("repeat must be at least 1"));
        }
        let meta = Metadata::resolve_repeated(&cfg.metadata, cfg.repeat)?;
        let shape = Shape::from(cfg.repeat);
        namespace.insert(&meta.name, format!("interrupt `{}`", meta.name))?;

        let source = match &cfg.internal {
            Some(reference) => Some(internals.watch(
                &format!("interrupt `{}`", meta.name),
                reference,
                Some(shape),
            )?),
            None => None,
        };

        let idx = self.interrupts.len();
        self.interrupts.push(Interrupt {
            meta,
            shape,
            active: cfg.active,
            source,
            group: cfg.group.clone(),
            offset: self.vector_width,
            can_enable: false,
            can_clear: false,
            can_pend: false,
            can_unmask: false,
        });
        self.index
            .insert(self.interrupts[idx].meta.name.to_lowercase(), idx);
        self.vector_width += shape.width();
        Ok(idx)
    }

    pub fn lookup(&self, name: &str) -> Option<InterruptIdx> {
        self.index.get(&name.to_lowercase()).copied()
    }

    pub fn get(&self, idx: InterruptIdx) -> &Interrupt {
        &self.interrupts[idx]
    }

    pub fn get_mut(&mut self, idx: InterruptIdx) -> &mut Interrupt {
        &mut self.interrupts[idx]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interrupt> {
        self.interrupts.iter()
    }

    pub fn len(&self) -> usize {
        self.interrupts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interrupts.is_empty()
    }

    /// Total width of the concatenated interrupt vector.
    pub fn vector_width(&self) -> u32 {
        self.vector_width
    }

    /// Checks the combined field capabilities of every interrupt. Must run
    /// after all fields and I/O ports have been processed, since strobed
    /// request sources are only recognizable then.
    pub fn check_consistency(&self, internals: &InternalManager) -> Result<()> {
        for interrupt in &self.interrupts {
            self.check_one(interrupt, internals)
                .map_err(|err| err.in_interrupt(&interrupt.meta.name))?;
        }
        Ok(())
    }

    fn check_one(&self, interrupt: &Interrupt, internals: &InternalManager) -> Result<()> {
        if interrupt.can_pend && !interrupt.can_clear {
            return Err(Error::config(
                "a pend field requires a way to clear the flag; \
                 add a field that can clear this interrupt",
            ));
        }
        if interrupt.is_edge_triggered() && !interrupt.can_clear {
            return Err(Error::config(format!(
                "{} triggering latches the flag, which requires a way to clear it; \
                 add a field that can clear this interrupt",
                interrupt.active
            )));
        }
        if let Some(source) = interrupt.source {
            if !interrupt.can_clear && internals.get(source).is_strobe() {
                return Err(Error::config(format!(
                    "a non-latching interrupt cannot be requested by strobed \
                     internal `{}`; add a field that can clear this interrupt",
                    internals.get(source).name()
                )));
            }
        }
        Ok(())
    }

    pub fn into_vec(self) -> Vec<Interrupt> {
        self.interrupts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MetadataConfig;

    fn irq_cfg(name: &str, repeat: Option<u32>) -> InterruptConfig {
        InterruptConfig {
            metadata: MetadataConfig {
                name: Some(name.to_string()),
                ..MetadataConfig::default()
            },
            repeat,
            active: ActiveLevel::High,
            internal: None,
            group: None,
        }
    }

    #[test]
    fn test_vector_layout() {
        let mut internals = InternalManager::new();
        let mut namespace = Namespace::new();
        let mut interrupts = InterruptManager::new();

        let a = interrupts
            .declare(&irq_cfg("rx", None), &mut internals, &mut namespace)
            .unwrap();
        let b = interrupts
            .declare(&irq_cfg("dma", Some(4)), &mut internals, &mut namespace)
            .unwrap();
        let c = interrupts
            .declare(&irq_cfg("err", None), &mut internals, &mut namespace)
            .unwrap();

        assert_eq!(interrupts.get(a).offset(), 0);
        assert_eq!(interrupts.get(b).offset(), 1);
        assert_eq!(interrupts.get(b).width(), 4);
        assert_eq!(interrupts.get(c).offset(), 5);
        assert_eq!(interrupts.vector_width(), 6);
        assert_eq!(interrupts.lookup("DMA"), Some(b));
        assert_eq!(interrupts.lookup("nope"), None);
    }

    #[test]
    fn test_duplicate_names_collide() {
        let mut internals = InternalManager::new();
        let mut namespace = Namespace::new();
        let mut interrupts = InterruptManager::new();
        interrupts
            .declare(&irq_cfg("rx", None), &mut internals, &mut namespace)
            .unwrap();
        let err = interrupts
            .declare(&irq_cfg("RX", None), &mut internals, &mut namespace)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "interrupt \"RX\": conflict: name `RX` of interrupt `RX` collides \
             with interrupt `rx` (names are case-insensitive)"
        );
    }

    #[test]
    fn test_reset_states_fold_to_constants() {
        let mut internals = InternalManager::new();
        let mut namespace = Namespace::new();
        let mut interrupts = InterruptManager::new();
        let idx = interrupts
            .declare(&irq_cfg("rx", None), &mut internals, &mut namespace)
            .unwrap();

        assert!(interrupts.get(idx).enabled_after_reset());
        assert!(interrupts.get(idx).unmasked_after_reset());
        assert!(!interrupts.get(idx).latches());

        interrupts.get_mut(idx).register_enable();
        interrupts.get_mut(idx).register_clear();
        assert!(!interrupts.get(idx).enabled_after_reset());
        assert!(interrupts.get(idx).unmasked_after_reset());
        assert!(interrupts.get(idx).latches());
    }

    #[test]
    fn test_pend_requires_clear() {
        let mut internals = InternalManager::new();
        let mut namespace = Namespace::new();
        let mut interrupts = InterruptManager::new();
        let idx = interrupts
            .declare(&irq_cfg("soft", None), &mut internals, &mut namespace)
            .unwrap();
        interrupts.get_mut(idx).register_pend();
        let err = interrupts.check_consistency(&internals).unwrap_err();
        assert_eq!(
            err.to_string(),
            "interrupt \"soft\": configuration error: a pend field requires a way \
             to clear the flag; add a field that can clear this interrupt"
        );

        interrupts.get_mut(idx).register_clear();
        interrupts.check_consistency(&internals).unwrap();
    }

    #[test]
    fn test_edge_triggering_requires_clear() {
        let mut internals = InternalManager::new();
        let mut namespace = Namespace::new();
        let mut interrupts = InterruptManager::new();
        let cfg = InterruptConfig {
            active: ActiveLevel::Rising,
            ..irq_cfg("tick", None)
        };
        let idx = interrupts
            .declare(&cfg, &mut internals, &mut namespace)
            .unwrap();
        let err = interrupts.check_consistency(&internals).unwrap_err();
        assert_eq!(
            err.to_string(),
            "interrupt \"tick\": configuration error: rising triggering latches the \
             flag, which requires a way to clear it; add a field that can clear \
             this interrupt"
        );

        interrupts.get_mut(idx).register_clear();
        interrupts.check_consistency(&internals).unwrap();
    }

    #[test]
    fn test_strobed_source_requires_latching() {
        let mut internals = InternalManager::new();
        let mut namespace = Namespace::new();
        let mut interrupts = InterruptManager::new();
        let cfg = InterruptConfig {
            internal: Some("overflow".to_string()),
            ..irq_cfg("ovf", None)
        };
        let idx = interrupts
            .declare(&cfg, &mut internals, &mut namespace)
            .unwrap();
        internals
            .strobe("field `count`", "overflow", None)
            .unwrap();

        let err = interrupts.check_consistency(&internals).unwrap_err();
        assert_eq!(
            err.to_string(),
            "interrupt \"ovf\": configuration error: a non-latching interrupt cannot \
             be requested by strobed internal `overflow`; add a field that can \
             clear this interrupt"
        );

        interrupts.get_mut(idx).register_clear();
        interrupts.check_consistency(&internals).unwrap();
    }

    #[test]
    fn test_vector_source_shape_must_match() {
        let mut internals = InternalManager::new();
        let mut namespace = Namespace::new();
        let mut interrupts = InterruptManager::new();
        let cfg = InterruptConfig {
            internal: Some("lanes".to_string()),
            ..irq_cfg("lane_err", Some(4))
        };
        interrupts
            .declare(&cfg, &mut internals, &mut namespace)
            .unwrap();

        // The signal was created with the interrupt's shape, so a scalar
        // driver must be rejected.
        let err = internals
            .drive("field `lane_err_src`", "lanes", None)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "conflict: field `lane_err_src` expects internal `lanes` to be a single \
             bit, but it is a vector of width 4"
        );
    }
}
