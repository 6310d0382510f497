// Licensed under the Apache-2.0 license

//! Bus access capabilities.
//!
//! Every compiled field advertises, per access direction, how it interacts
//! with the bus: whether the access has side effects, whether it can stall
//! the bus, whether it can be deferred, how it can be masked out when a
//! sibling field in the same register is accessed, and which `prot` values
//! are allowed to touch it. Register assembly combines and cross-checks
//! these capabilities.

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum_macros::{Display as StrumDisplay, EnumString};

use crate::config::PermissionConfig;
use crate::error::{Error, Result};

/// The minimum "effort" needed to make a bus access no-op for a field. This
/// is consulted when a different field in the same register is accessed and
/// this field must be left untouched. Reads only ever use [`Always`] or
/// [`Never`].
///
/// [`Always`]: NoOpMethod::Always
/// [`Never`]: NoOpMethod::Never
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, StrumDisplay, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum NoOpMethod {
    /// The access never has side effects.
    Always,
    /// Writing zero is no-op.
    WriteZero,
    /// Only writing back the current value (read-modify-write) is no-op.
    WriteCurrent,
    /// Writing back the current value or masking out the write strobes is
    /// no-op.
    WriteCurrentOrMask,
    /// Only masking out the write strobes is no-op.
    Mask,
    /// The register cannot be accessed without touching this field.
    Never,
}

/// Match pattern for the 3-bit AXI4-lite `prot` code of an access.
///
/// Bit 2 distinguishes data (0) from instruction (1) accesses, bit 1 secure
/// (0) from nonsecure (1), and bit 0 user (0) from privileged (1). The
/// canonical text form lists the bits MSB first, with `-` for don't-care,
/// for instance `--1` for privileged-only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProtMask {
    care: u8,
    value: u8,
}

impl ProtMask {
    /// Derives the mask from a permission record. Denying both options of a
    /// pair would make the field unreachable, so that is rejected.
    pub fn from_permissions(cfg: &PermissionConfig) -> Result<ProtMask> {
        let mut mask = ProtMask::default();
        let pairs = [
            (cfg.data, cfg.instruction, "data and instruction"),
            (cfg.secure, cfg.nonsecure, "secure and nonsecure"),
            (cfg.user, cfg.privileged, "user and privileged"),
        ];
        for (bit, (low, high, what)) in (0..3).rev().zip(pairs) {
            match (low, high) {
                (true, true) => (),
                (true, false) => mask.care |= 1 << bit,
                (false, true) => {
                    mask.care |= 1 << bit;
                    mask.value |= 1 << bit;
                }
                (false, false) => {
                    return Err(Error::config(format!(
                        "permissions deny both {what} accesses"
                    )));
                }
            }
        }
        Ok(mask)
    }

    /// Whether an access with the given `prot` code is allowed.
    pub fn matches(&self, prot: u8) -> bool {
        prot & self.care == self.value
    }

    /// Whether any access types are denied.
    pub fn is_protected(&self) -> bool {
        self.care != 0
    }

    /// Whether only privileged accesses are allowed.
    pub fn requires_privileged(&self) -> bool {
        self.care & 1 != 0 && self.value & 1 != 0
    }

    /// Whether only secure accesses are allowed.
    pub fn requires_secure(&self) -> bool {
        self.care & 2 != 0 && self.value & 2 == 0
    }
}

impl Display for ProtMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for bit in (0..3).rev() {
            if self.care & (1 << bit) == 0 {
                write!(f, "-")?;
            } else {
                write!(f, "{}", (self.value >> bit) & 1)?;
            }
        }
        Ok(())
    }
}

impl FromStr for ProtMask {
    type Err = Error;

    fn from_str(s: &str) -> Result<ProtMask> {
        let mut mask = ProtMask::default();
        if s.len() != 3 {
            return Err(Error::config(format!(
                "`{s}` is not a valid prot mask; expected three characters from `-01`"
            )));
        }
        for (bit, c) in (0..3).rev().zip(s.chars()) {
            match c {
                '-' => (),
                '0' => mask.care |= 1 << bit,
                '1' => {
                    mask.care |= 1 << bit;
                    mask.value |= 1 << bit;
                }
                _ => {
                    return Err(Error::config(format!(
                        "`{s}` is not a valid prot mask; expected three characters from `-01`"
                    )));
                }
            }
        }
        Ok(mask)
    }
}

impl Serialize for ProtMask {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ProtMask {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Capabilities of one access direction (read or write) of a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct AccessCaps {
    /// Whether performing the same access once or twice makes a functional
    /// difference. Volatile fields cannot share a register with blocking
    /// fields.
    pub volatile: bool,
    /// Whether the access can stall the bus. At most one field per register
    /// may block.
    pub blocking: bool,
    /// Whether the access can be deferred, i.e. whether the response may
    /// come after further requests have been accepted. Deferring fields
    /// must be alone in their register.
    pub deferring: bool,
    pub no_op: NoOpMethod,
    pub prot: ProtMask,
}

impl AccessCaps {
    /// Capabilities of a side-effecting, non-stalling access.
    pub fn new(prot: ProtMask) -> AccessCaps {
        AccessCaps {
            volatile: false,
            blocking: false,
            deferring: false,
            no_op: NoOpMethod::Never,
            prot,
        }
    }
}

/// Read and write capabilities of a field, `None` per direction when the
/// field does not support it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct BusCaps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<AccessCaps>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write: Option<AccessCaps>,
    /// Whether a read-modify-write may use this field's read value. False
    /// for fields whose read data is unrelated to what a write stores, such
    /// as AXI passthrough fields.
    pub can_read_for_rmw: bool,
}

impl BusCaps {
    pub fn new(
        read: Option<AccessCaps>,
        write: Option<AccessCaps>,
        can_read_for_rmw: bool,
    ) -> Result<BusCaps> {
        if read.is_none() && write.is_none() {
            return Err(Error::config(
                "behavior must support reads, writes, or both",
            ));
        }
        if let Some(read) = &read {
            if !matches!(read.no_op, NoOpMethod::Always | NoOpMethod::Never) {
                return Err(Error::config(
                    "the read no-op method must be `always` or `never`",
                ));
            }
        }
        Ok(BusCaps {
            read,
            write,
            can_read_for_rmw,
        })
    }

    pub fn can_read(&self) -> bool {
        self.read.is_some()
    }

    pub fn can_write(&self) -> bool {
        self.write.is_some()
    }

    /// Whether reading the surrounding register leaves this field unchanged.
    pub fn is_read_no_op(&self) -> bool {
        match &self.read {
            None => true,
            Some(read) => read.no_op == NoOpMethod::Always,
        }
    }

    /// Whether writing the surrounding register can leave this field
    /// unchanged without any masking at all.
    pub fn is_write_no_op(&self) -> bool {
        match &self.write {
            None => true,
            Some(write) => write.no_op == NoOpMethod::Always,
        }
    }

    /// Whether the write strobes can mask this field out of a write access.
    pub fn can_mask_with_strobe(&self) -> bool {
        self.is_write_no_op()
            || matches!(
                self.write.as_ref().map(|w| w.no_op),
                Some(NoOpMethod::WriteZero)
                    | Some(NoOpMethod::WriteCurrentOrMask)
                    | Some(NoOpMethod::Mask)
            )
    }

    /// Whether writing zeros masks this field out of a write access.
    pub fn can_mask_with_zero(&self) -> bool {
        self.is_write_no_op()
            || matches!(
                self.write.as_ref().map(|w| w.no_op),
                Some(NoOpMethod::WriteZero)
            )
    }

    /// Whether a read-modify-write can mask this field out of a write
    /// access. Requires the read itself to be free of side effects.
    pub fn can_mask_with_rmw(&self) -> bool {
        if self.is_write_no_op() {
            return true;
        }
        matches!(
            self.write.as_ref().map(|w| w.no_op),
            Some(NoOpMethod::WriteCurrent) | Some(NoOpMethod::WriteCurrentOrMask)
        ) && self.can_read_for_rmw
            && self.read.map(|r| r.no_op) == Some(NoOpMethod::Always)
    }

    pub fn is_protected(&self) -> bool {
        self.read.map(|r| r.prot.is_protected()).unwrap_or(false)
            || self.write.map(|w| w.prot.is_protected()).unwrap_or(false)
    }
}

/// Combined capabilities of all fields of a register, per direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct CombinedCaps {
    pub volatile: bool,
    pub blocking: bool,
    pub deferring: bool,
}

/// Cross-checks the capabilities of the fields sharing one direction of a
/// register and combines them into the register-level capabilities. Returns
/// `None` when no field supports the direction.
pub fn check_siblings(siblings: &[&AccessCaps]) -> Result<Option<CombinedCaps>> {
    if siblings.is_empty() {
        return Ok(None);
    }
    if siblings.len() >= 2 && siblings.iter().any(|c| c.deferring) {
        return Err(Error::conflict(
            "fields that defer bus accesses cannot share a register with other fields",
        ));
    }
    if siblings.iter().filter(|c| c.blocking).count() >= 2 {
        return Err(Error::conflict(
            "fields that block bus accesses cannot share a register with each other",
        ));
    }
    if siblings.iter().any(|c| c.blocking)
        && siblings.iter().any(|c| c.volatile && !c.blocking)
    {
        return Err(Error::conflict(
            "fields that block bus accesses cannot share a register with volatile fields",
        ));
    }
    Ok(Some(CombinedCaps {
        volatile: siblings.iter().any(|c| c.volatile),
        blocking: siblings.iter().any(|c| c.blocking),
        deferring: siblings.iter().any(|c| c.deferring),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allow_all() -> PermissionConfig {
        PermissionConfig::default()
    }

    #[test]
    fn test_prot_mask_from_permissions() {
        let mask = ProtMask::from_permissions(&allow_all()).unwrap();
        assert_eq!(mask.to_string(), "---");
        assert!(!mask.is_protected());
        for prot in 0..8 {
            assert!(mask.matches(prot));
        }

        let cfg = PermissionConfig {
            user: false,
            nonsecure: false,
            ..allow_all()
        };
        let mask = ProtMask::from_permissions(&cfg).unwrap();
        assert_eq!(mask.to_string(), "-01");
        assert!(mask.is_protected());
        assert!(mask.requires_privileged());
        assert!(mask.requires_secure());
        assert!(mask.matches(0b001));
        assert!(mask.matches(0b101));
        assert!(!mask.matches(0b000), "user access must be denied");
        assert!(!mask.matches(0b011), "nonsecure access must be denied");
    }

    #[test]
    fn test_prot_mask_denying_pair_is_rejected() {
        let cfg = PermissionConfig {
            data: false,
            instruction: false,
            ..allow_all()
        };
        let err = ProtMask::from_permissions(&cfg).unwrap_err();
        assert_eq!(
            err.to_string(),
            "configuration error: permissions deny both data and instruction accesses"
        );
    }

    #[test]
    fn test_prot_mask_parse_round_trip() {
        for text in ["---", "0-1", "111", "-1-"] {
            let mask: ProtMask = text.parse().unwrap();
            assert_eq!(mask.to_string(), text);
        }
        assert!("--".parse::<ProtMask>().is_err());
        assert!("--x".parse::<ProtMask>().is_err());

        let mask: ProtMask = "0-1".parse().unwrap();
        assert!(mask.matches(0b001));
        assert!(mask.matches(0b011));
        assert!(!mask.matches(0b101));
        assert!(!mask.matches(0b000));
    }

    #[test]
    fn test_bus_caps_requires_a_direction() {
        let err = BusCaps::new(None, None, true).unwrap_err();
        assert_eq!(
            err.to_string(),
            "configuration error: behavior must support reads, writes, or both"
        );
    }

    #[test]
    fn test_read_no_op_method_is_restricted() {
        let mut read = AccessCaps::new(ProtMask::default());
        read.no_op = NoOpMethod::WriteZero;
        assert!(BusCaps::new(Some(read), None, true).is_err());
        read.no_op = NoOpMethod::Always;
        assert!(BusCaps::new(Some(read), None, true).is_ok());
    }

    #[test]
    fn test_masking_methods() {
        let prot = ProtMask::default();

        // Control-style field: plain read, write masked only by RMW.
        let mut read = AccessCaps::new(prot);
        read.no_op = NoOpMethod::Always;
        let mut write = AccessCaps::new(prot);
        write.no_op = NoOpMethod::WriteCurrent;
        let caps = BusCaps::new(Some(read), Some(write), true).unwrap();
        assert!(!caps.can_mask_with_strobe());
        assert!(!caps.can_mask_with_zero());
        assert!(caps.can_mask_with_rmw());

        // Same field, but the read value is unrelated to the write data.
        let caps = BusCaps::new(Some(read), Some(write), false).unwrap();
        assert!(!caps.can_mask_with_rmw());

        // Strobe-style field: writing zero is harmless.
        let mut write = AccessCaps::new(prot);
        write.no_op = NoOpMethod::WriteZero;
        let caps = BusCaps::new(None, Some(write), true).unwrap();
        assert!(caps.can_mask_with_strobe());
        assert!(caps.can_mask_with_zero());
        assert!(caps.is_read_no_op());
    }

    #[test]
    fn test_check_siblings_rules() {
        let prot = ProtMask::default();
        let plain = AccessCaps::new(prot);
        let mut volatile = AccessCaps::new(prot);
        volatile.volatile = true;
        let mut blocking = AccessCaps::new(prot);
        blocking.blocking = true;
        let mut deferring = AccessCaps::new(prot);
        deferring.deferring = true;
        deferring.blocking = true;
        deferring.volatile = true;

        assert_eq!(check_siblings(&[]).unwrap(), None);

        let combined = check_siblings(&[&plain, &volatile]).unwrap().unwrap();
        assert!(combined.volatile);
        assert!(!combined.blocking);

        let combined = check_siblings(&[&deferring]).unwrap().unwrap();
        assert!(combined.deferring && combined.blocking && combined.volatile);

        let err = check_siblings(&[&deferring, &plain]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "conflict: fields that defer bus accesses cannot share a register with other fields"
        );

        assert!(check_siblings(&[&blocking, &blocking]).is_err());
        assert!(check_siblings(&[&blocking, &volatile]).is_err());
        assert!(check_siblings(&[&blocking, &plain]).is_ok());
    }
}
