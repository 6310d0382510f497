// Licensed under the Apache-2.0 license

//! Typed configuration records.
//!
//! These structs are the input contract of the compiler: a register file
//! description deserialized from JSON (or built directly by tools). All
//! records reject unknown keys so typos surface as load errors rather than
//! silently ignored options.

use serde::{Deserialize, Deserializer, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::{Error, Result};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct MetadataConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mnemonic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brief: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Endianness {
    #[default]
    Little,
    Big,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FeatureConfig {
    /// Bus word width in bits; 32 or 64.
    #[serde(default = "default_bus_width")]
    pub bus_width: u32,
    #[serde(default)]
    pub endianness: Endianness,
    /// Capacity of the defer FIFOs, and thus the number of outstanding
    /// deferred accesses per direction.
    #[serde(default = "default_max_outstanding")]
    pub max_outstanding: u32,
    /// Disables the privilege-interruption hardening of multi-word
    /// accesses.
    #[serde(default)]
    pub insecure: bool,
    /// Lets the decoder treat unmapped addresses as don't-care instead of
    /// reporting decode errors.
    #[serde(default)]
    pub optimize: bool,
}

fn default_bus_width() -> u32 {
    32
}

fn default_max_outstanding() -> u32 {
    16
}

impl Default for FeatureConfig {
    fn default() -> FeatureConfig {
        FeatureConfig {
            bus_width: default_bus_width(),
            endianness: Endianness::default(),
            max_outstanding: default_max_outstanding(),
            insecure: false,
            optimize: false,
        }
    }
}

impl FeatureConfig {
    pub fn validate(&self) -> Result<()> {
        if self.bus_width != 32 && self.bus_width != 64 {
            return Err(Error::config(format!(
                "bus width must be 32 or 64, not {}",
                self.bus_width
            )));
        }
        if self.max_outstanding < 2 {
            return Err(Error::capacity(format!(
                "max-outstanding must be at least 2, not {}",
                self.max_outstanding
            )));
        }
        Ok(())
    }
}

/// Per-field access permissions. An access is allowed when its privilege,
/// security and kind bits each match an enabled side. Denying both sides
/// of a pair would deny every access, which is rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct PermissionConfig {
    #[serde(default = "default_true")]
    pub user: bool,
    #[serde(default = "default_true")]
    pub privileged: bool,
    #[serde(default = "default_true")]
    pub secure: bool,
    #[serde(default = "default_true")]
    pub nonsecure: bool,
    #[serde(default = "default_true")]
    pub data: bool,
    #[serde(default = "default_true")]
    pub instruction: bool,
}

fn default_true() -> bool {
    true
}

impl Default for PermissionConfig {
    fn default() -> PermissionConfig {
        PermissionConfig {
            user: true,
            privileged: true,
            secure: true,
            nonsecure: true,
            data: true,
            instruction: true,
        }
    }
}

/// A field address: either a plain byte address or a bit range literal
/// such as `"0x1000:15..8"`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AddressValue {
    Int(u32),
    Literal(String),
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum BehaviorKind {
    Primitive,
    Constant,
    Config,
    Status,
    InternalStatus,
    Latching,
    Control,
    InternalControl,
    Flag,
    VolatileFlag,
    InternalFlag,
    VolatileInternalFlag,
    Strobe,
    InternalStrobe,
    Request,
    MultiRequest,
    Counter,
    VolatileCounter,
    InternalCounter,
    VolatileInternalCounter,
    StreamToMmio,
    MmioToStream,
    Interrupt,
    InterruptFlag,
    VolatileInterruptFlag,
    InterruptPend,
    InterruptEnable,
    InterruptUnmask,
    InterruptStatus,
    InterruptRaw,
    Memory,
    Axi,
    Custom,
}

/// Behavior families sharing an option vocabulary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BehaviorFamily {
    Primitive,
    Interrupt,
    Memory,
    Axi,
    Custom,
}

impl BehaviorKind {
    pub fn family(&self) -> BehaviorFamily {
        use BehaviorKind::*;
        match self {
            Interrupt | InterruptFlag | VolatileInterruptFlag | InterruptPend
            | InterruptEnable | InterruptUnmask | InterruptStatus | InterruptRaw => {
                BehaviorFamily::Interrupt
            }
            Memory => BehaviorFamily::Memory,
            Axi => BehaviorFamily::Axi,
            Custom => BehaviorFamily::Custom,
            _ => BehaviorFamily::Primitive,
        }
    }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum BusReadMode {
    Disabled,
    Error,
    Enabled,
    ValidWait,
    ValidOnly,
    /// Interrupt fields only: read returns the state and clears it.
    Clear,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AfterReadAction {
    Nothing,
    Invalidate,
    Clear,
    Increment,
    Decrement,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum BusWriteMode {
    Disabled,
    Error,
    Enabled,
    Invalid,
    InvalidWait,
    InvalidOnly,
    Masked,
    Accumulate,
    Subtract,
    BitSet,
    BitClear,
    BitToggle,
    /// Interrupt fields only: writing ones clears the state.
    Clear,
    /// Interrupt fields only: writing ones sets the state.
    Set,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AfterWriteAction {
    Nothing,
    Validate,
    Invalidate,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum HwReadMode {
    Disabled,
    Simple,
    Enabled,
    Handshake,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum HwWriteMode {
    Disabled,
    Status,
    Enabled,
    Stream,
    Accumulate,
    Subtract,
    Set,
    Reset,
    Toggle,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AfterHwWriteAction {
    Nothing,
    Validate,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum MonitorMode {
    Status,
    BitSet,
    Increment,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum InterruptFieldMode {
    Raw,
    Enable,
    Flag,
    Unmask,
    Masked,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum BusMode {
    ReadWrite,
    ReadOnly,
    WriteOnly,
}

/// Reset value of a field: `false`/`true`/integer for a fixed value,
/// `"generic"` for an externally provided one. An explicit JSON `null`
/// resets to the invalid state where the behavior supports one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResetConfig {
    Bool(bool),
    Int(u64),
    Keyword(ResetKeyword),
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ResetKeyword {
    Generic,
}

/// Deserializes a present-but-possibly-null key as `Some(inner)`, so that
/// an explicit `"reset": null` is distinguishable from an absent key.
fn explicit_option<'de, T, D>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ResponseKind {
    #[default]
    Ack,
    Defer,
}

/// Declared bus access capabilities of a `custom` behavior.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct CustomAccessConfig {
    #[serde(default)]
    pub can_block: bool,
    #[serde(default)]
    pub volatile: bool,
    #[serde(default)]
    pub has_side_effects: bool,
    #[serde(default)]
    pub response: ResponseKind,
}

/// One interface of a `custom` behavior. Exactly one of the keys must be
/// given; the value is `name` or `name:width`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct CustomInterfaceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drive: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strobe: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// Behavior selection plus its options. The accepted options depend on the
/// kind; giving an option the kind fixes or does not know is an error.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct BehaviorConfig {
    pub kind: BehaviorKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bus_read: Option<BusReadMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_bus_read: Option<AfterReadAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bus_write: Option<BusWriteMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_bus_write: Option<AfterWriteAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hw_read: Option<HwReadMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hw_write: Option<HwWriteMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_hw_write: Option<AfterHwWriteAction>,
    #[serde(
        default,
        deserialize_with = "explicit_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub reset: Option<Option<ResetConfig>>,
    /// Constant behavior only: the value the field always reads as.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ResetConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctrl_lock: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctrl_validate: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctrl_invalidate: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctrl_ready: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctrl_clear: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctrl_reset: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctrl_increment: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctrl_decrement: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctrl_bit_set: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctrl_bit_clear: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctrl_bit_toggle: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drive_internal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_internal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empty_internal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overflow_internal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underflow_internal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bit_overflow_internal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bit_underflow_internal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrun_internal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underrun_internal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitor_internal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitor_mode: Option<MonitorMode>,
    /// Shorthand used by the `internal-*` presets for the internal signal
    /// they drive or monitor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal: Option<String>,
    /// Interrupt behaviors: the declared interrupt to bind to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interrupt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<InterruptFieldMode>,
    /// Memory and axi behaviors: which directions pass through.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bus_mode: Option<BusMode>,
    /// Axi behavior: internal driven by the child bus interrupt line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interrupt_internal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interfaces: Option<Vec<CustomInterfaceConfig>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<CustomAccessConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write: Option<CustomAccessConfig>,
}

impl Default for BehaviorConfig {
    fn default() -> BehaviorConfig {
        BehaviorConfig {
            kind: BehaviorKind::Primitive,
            bus_read: None,
            after_bus_read: None,
            bus_write: None,
            after_bus_write: None,
            hw_read: None,
            hw_write: None,
            after_hw_write: None,
            reset: None,
            value: None,
            ctrl_lock: None,
            ctrl_validate: None,
            ctrl_invalidate: None,
            ctrl_ready: None,
            ctrl_clear: None,
            ctrl_reset: None,
            ctrl_increment: None,
            ctrl_decrement: None,
            ctrl_bit_set: None,
            ctrl_bit_clear: None,
            ctrl_bit_toggle: None,
            drive_internal: None,
            full_internal: None,
            empty_internal: None,
            overflow_internal: None,
            underflow_internal: None,
            bit_overflow_internal: None,
            bit_underflow_internal: None,
            overrun_internal: None,
            underrun_internal: None,
            monitor_internal: None,
            monitor_mode: None,
            internal: None,
            interrupt: None,
            mode: None,
            bus_mode: None,
            interrupt_internal: None,
            interfaces: None,
            read: None,
            write: None,
        }
    }
}

impl BehaviorConfig {
    pub fn of_kind(kind: BehaviorKind) -> BehaviorConfig {
        BehaviorConfig {
            kind,
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FieldConfig {
    /// Bit range literal or plain byte address of the first copy.
    pub address: AddressValue,
    pub metadata: MetadataConfig,
    pub behavior: BehaviorConfig,
    /// Number of copies; absent for a scalar field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat: Option<u32>,
    /// Copies per logical register; defaults to all of them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_repeat: Option<u32>,
    /// Blocks between register copies; defaults to 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stride: Option<i64>,
    /// Bits between copies within a register; defaults to the field width.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_stride: Option<i64>,
    /// Metadata for the logical register this field seeds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub register: Option<MetadataConfig>,
    /// Endianness override for the register this field lands in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endianness: Option<Endianness>,
    #[serde(default)]
    pub permissions: PermissionConfig,
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ActiveLevel {
    #[default]
    High,
    Low,
    Rising,
    Falling,
    Edge,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct InterruptConfig {
    pub metadata: MetadataConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat: Option<u32>,
    #[serde(default)]
    pub active: ActiveLevel,
    /// Internal signal that raises the interrupt; an input port when
    /// absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum IoDirection {
    Input,
    Strobe,
    Output,
}

/// Exposes an internal signal on the register file boundary.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct InternalIoConfig {
    pub direction: IoDirection,
    /// `name` or `name:width`.
    pub internal: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
}

/// A condition value: the internal must match for gated registers to
/// decode. String literals accept the masked address forms.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Bool(bool),
    Int(u32),
    Literal(String),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ConditionConfig {
    pub internal: String,
    pub value: ConditionValue,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct RegFileConfig {
    pub metadata: MetadataConfig,
    #[serde(default)]
    pub features: FeatureConfig,
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
    #[serde(default)]
    pub interrupts: Vec<InterruptConfig>,
    #[serde(default)]
    pub internal_io: Vec<InternalIoConfig>,
    #[serde(default)]
    pub conditions: Vec<ConditionConfig>,
}

impl RegFileConfig {
    pub fn from_json(text: &str) -> Result<RegFileConfig> {
        serde_json::from_str(text)
            .map_err(|err| Error::config(format!("failed to load register file config: {err}")))
    }
}
