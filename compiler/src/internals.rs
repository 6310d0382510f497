// Licensed under the Apache-2.0 license

//! Internal signal tracking.
//!
//! Internal signals connect field behaviors to each other and to the
//! register file boundary without going through the bus: a counter field can
//! monitor an overflow strobe, a paging condition can watch a page register,
//! and so on. Signals come into existence the first time something
//! references them by name; the manager records who drives, strobes, and
//! watches each one so consistency can be verified once the whole register
//! file has been processed.
//!
//! A signal is either level-driven by exactly one party, or strobed by one
//! or more parties. Strobed signals self-clear at the end of every cycle.

use std::collections::HashMap;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::config::{InternalIoConfig, IoDirection};
use crate::error::{Error, Result};
use crate::util;

/// Index of an internal signal in the [`InternalManager`] arena.
pub type InternalIdx = usize;

/// Shape of an internal signal or repeated entity: a single bit, or a
/// vector of the given width.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<u32>", into = "Option<u32>")]
pub enum Shape {
    Scalar,
    Vector(u32),
}

impl Shape {
    pub fn width(&self) -> u32 {
        match self {
            Shape::Scalar => 1,
            Shape::Vector(width) => *width,
        }
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, Shape::Vector(_))
    }
}

impl From<Option<u32>> for Shape {
    fn from(repeat: Option<u32>) -> Shape {
        match repeat {
            None => Shape::Scalar,
            Some(width) => Shape::Vector(width),
        }
    }
}

impl From<Shape> for Option<u32> {
    fn from(shape: Shape) -> Option<u32> {
        match shape {
            Shape::Scalar => None,
            Shape::Vector(width) => Some(width),
        }
    }
}

impl Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Shape::Scalar => write!(f, "a single bit"),
            Shape::Vector(width) => write!(f, "a vector of width {width}"),
        }
    }
}

/// An internal signal and the parties connected to it.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct Internal {
    name: String,
    shape: Shape,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    driver: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    strobers: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    users: Vec<String>,
}

impl Internal {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn driver(&self) -> Option<&str> {
        self.driver.as_deref()
    }

    pub fn strobers(&self) -> &[String] {
        &self.strobers
    }

    pub fn users(&self) -> &[String] {
        &self.users
    }

    /// Whether this signal is strobed rather than level-driven.
    pub fn is_strobe(&self) -> bool {
        !self.strobers.is_empty()
    }

    fn check_shape(&self, party: &str, expected: Shape) -> Result<()> {
        if self.shape != expected {
            return Err(Error::conflict(format!(
                "{party} expects internal `{}` to be {expected}, but it is {}",
                self.name, self.shape
            )));
        }
        Ok(())
    }
}

/// An internal signal exposed on the register file boundary.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct InternalPort {
    pub name: String,
    pub direction: IoDirection,
    pub internal: InternalIdx,
}

/// Arena of all internal signals of a register file.
#[derive(Debug, Default)]
pub struct InternalManager {
    internals: Vec<Internal>,
    index: HashMap<String, InternalIdx>,
    ports: Vec<InternalPort>,
}

impl InternalManager {
    pub fn new() -> InternalManager {
        InternalManager::default()
    }

    /// Registers `party` as the level driver of the referenced signal.
    pub fn drive(
        &mut self,
        party: &str,
        reference: &str,
        shape: Option<Shape>,
    ) -> Result<InternalIdx> {
        let (name, shape) = parse_reference(party, reference, shape)?;
        let idx = self.ensure(name, shape);
        let internal = &mut self.internals[idx];
        if let Some(driver) = &internal.driver {
            return Err(Error::conflict(format!(
                "internal `{}` is driven by both {driver} and {party}",
                internal.name
            )));
        }
        if let Some(strober) = internal.strobers.first() {
            return Err(Error::conflict(format!(
                "internal `{}` cannot be both driven by {party} and strobed by {strober}",
                internal.name
            )));
        }
        internal.check_shape(party, shape)?;
        internal.driver = Some(party.to_string());
        Ok(idx)
    }

    /// Registers `party` as a strober of the referenced signal. Multiple
    /// strobers may share a signal; their pulses are ORed together.
    pub fn strobe(
        &mut self,
        party: &str,
        reference: &str,
        shape: Option<Shape>,
    ) -> Result<InternalIdx> {
        let (name, shape) = parse_reference(party, reference, shape)?;
        let idx = self.ensure(name, shape);
        let internal = &mut self.internals[idx];
        if let Some(driver) = &internal.driver {
            return Err(Error::conflict(format!(
                "internal `{}` cannot be both driven by {driver} and strobed by {party}",
                internal.name
            )));
        }
        internal.check_shape(party, shape)?;
        internal.strobers.push(party.to_string());
        Ok(idx)
    }

    /// Registers `party` as a consumer of the referenced signal.
    pub fn watch(
        &mut self,
        party: &str,
        reference: &str,
        shape: Option<Shape>,
    ) -> Result<InternalIdx> {
        let (name, shape) = parse_reference(party, reference, shape)?;
        let idx = self.ensure(name, shape);
        let internal = &mut self.internals[idx];
        internal.check_shape(party, shape)?;
        internal.users.push(party.to_string());
        Ok(idx)
    }

    /// Exposes an internal signal on the register file boundary. Input
    /// ports drive, strobe ports strobe, output ports watch.
    pub fn add_io(&mut self, cfg: &InternalIoConfig) -> Result<()> {
        let idx = match cfg.direction {
            IoDirection::Input => self.drive("an input port", &cfg.internal, None)?,
            IoDirection::Strobe => self.strobe("a strobe input port", &cfg.internal, None)?,
            IoDirection::Output => self.watch("an output port", &cfg.internal, None)?,
        };
        let name = match &cfg.port {
            Some(port) => port.clone(),
            None => self.internals[idx].name.clone(),
        };
        if !util::is_valid_name(&name) {
            return Err(Error::config(format!(
                "`{name}` is not a valid port name"
            )));
        }
        if self
            .ports
            .iter()
            .any(|port| port.name.eq_ignore_ascii_case(&name))
        {
            return Err(Error::conflict(format!(
                "multiple internal I/O ports named `{name}`"
            )));
        }
        self.ports.push(InternalPort {
            name,
            direction: cfg.direction,
            internal: idx,
        });
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<InternalIdx> {
        self.index.get(&name.to_ascii_lowercase()).copied()
    }

    pub fn get(&self, idx: InternalIdx) -> &Internal {
        &self.internals[idx]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Internal> {
        self.internals.iter()
    }

    pub fn len(&self) -> usize {
        self.internals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.internals.is_empty()
    }

    pub fn ports(&self) -> &[InternalPort] {
        &self.ports
    }

    /// Checks that every signal is driven and consumed. A signal that
    /// misses either almost certainly points at a typo in the description.
    pub fn verify(&self) -> Result<()> {
        for internal in &self.internals {
            if internal.driver.is_none() && internal.strobers.is_empty() {
                return Err(Error::config("not driven by any field or input port")
                    .in_internal(&internal.name));
            }
            if internal.users.is_empty() {
                return Err(Error::config(
                    "never used by any field, condition, or output port",
                )
                .in_internal(&internal.name));
            }
        }
        Ok(())
    }

    pub fn into_parts(self) -> (Vec<Internal>, Vec<InternalPort>) {
        (self.internals, self.ports)
    }

    fn ensure(&mut self, name: &str, shape: Shape) -> InternalIdx {
        let key = name.to_ascii_lowercase();
        if let Some(&idx) = self.index.get(&key) {
            return idx;
        }
        let idx = self.internals.len();
        self.internals.push(Internal {
            name: name.to_string(),
            shape,
            driver: None,
            strobers: Vec::new(),
            users: Vec::new(),
        });
        self.index.insert(key, idx);
        idx
    }
}

/// Splits a `name` or `name:width` reference and picks the effective shape.
/// A width suffix must agree with the shape implied by the context, if any.
fn parse_reference<'a>(
    party: &str,
    reference: &'a str,
    shape: Option<Shape>,
) -> Result<(&'a str, Shape)> {
    let (name, explicit) = match reference.split_once(':') {
        Some((name, width)) => {
            let width: u32 = width.parse().unwrap_or(0);
            if width == 0 {
                return Err(Error::config(format!(
                    "`{reference}` is not a valid internal signal reference; \
                     the width after `:` must be a positive integer"
                )));
            }
            (name, Some(Shape::Vector(width)))
        }
        None => (reference, None),
    };
    if !util::is_valid_name(name) {
        return Err(Error::config(format!(
            "`{name}` is not a valid internal signal name"
        )));
    }
    let shape = match (explicit, shape) {
        (Some(explicit), Some(context)) if explicit != context => {
            return Err(Error::config(format!(
                "internal `{name}` is referenced as {explicit} here, \
                 but {party} needs {context}"
            )));
        }
        (Some(explicit), _) => explicit,
        (None, Some(context)) => context,
        (None, None) => Shape::Scalar,
    };
    Ok((name, shape))
}
