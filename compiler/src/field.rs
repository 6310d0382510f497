// Licensed under the Apache-2.0 license

//! Field descriptor expansion.
//!
//! A descriptor in the configuration places one field or a regular array of
//! them: a base bit range plus repeat counts and strides that lay the copies
//! out within and across logical registers. Expansion resolves the metadata
//! and behavior once (they are shared by all copies), checks the stride
//! rules, and produces the per-copy [`Field`] records the register assembler
//! consumes.

use serde::{Deserialize, Serialize};

use crate::access::ProtMask;
use crate::address::AddressSpec;
use crate::behavior::{Behavior, FieldContext};
use crate::bitrange::BitRange;
use crate::config::{AddressValue, Endianness, FeatureConfig, FieldConfig};
use crate::error::{Error, Result};
use crate::internals::{InternalManager, Shape};
use crate::interrupt::InterruptManager;
use crate::metadata::{Metadata, Namespace};

/// Index of a field descriptor in the compiled register file.
pub type DescriptorIdx = usize;

/// One expanded copy of a field descriptor.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct Field {
    pub meta: Metadata,
    pub bitrange: BitRange,
    /// Index within the descriptor; `None` for scalar descriptors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
}

/// A compiled field descriptor: the shared behavior plus the expanded
/// copies.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FieldDescriptor {
    pub meta: Metadata,
    pub shape: Shape,
    /// Width in bits of a single copy.
    pub width: u32,
    pub subaddress_width: u32,
    pub behavior: Behavior,
    /// Copies per logical register; `None` for scalar descriptors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_repeat: Option<u32>,
    /// Explicit metadata for the register(s) seeded by this descriptor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub register_meta: Option<Metadata>,
    /// Endianness override for the register(s) this descriptor lands in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endianness: Option<Endianness>,
    pub fields: Vec<Field>,
}

impl FieldDescriptor {
    /// Expands a field configuration. Registers the descriptor and copy
    /// names, resolves the behavior against the field's width and shape,
    /// and computes the location of every copy. Errors are reported in
    /// terms of the descriptor's name.
    pub fn expand(
        cfg: &FieldConfig,
        features: &FeatureConfig,
        internals: &mut InternalManager,
        interrupts: &mut InterruptManager,
        namespace: &mut Namespace,
    ) -> Result<FieldDescriptor> {
        let meta = Metadata::resolve_repeated(&cfg.metadata, cfg.repeat)?;
        let name = meta.name.clone();
        Self::expand_checked(meta, cfg, features, internals, interrupts, namespace)
            .map_err(|err| err.in_field(name))
    }

    fn expand_checked(
        meta: Metadata,
        cfg: &FieldConfig,
        features: &FeatureConfig,
        internals: &mut InternalManager,
        interrupts: &mut InterruptManager,
        namespace: &mut Namespace,
    ) -> Result<FieldDescriptor> {
        namespace.insert(&meta.name, format!("field `{}`", meta.name))?;

        match cfg.repeat {
            Some(0) => return Err(Error::config("repeat must be positive")),
            Some(_) => (),
            None => {
                for (given, option) in [
                    (cfg.field_repeat.is_some(), "field-repeat"),
                    (cfg.stride.is_some(), "stride"),
                    (cfg.field_stride.is_some(), "field-stride"),
                ] {
                    if given {
                        return Err(Error::config(format!("`{option}` requires `repeat`")));
                    }
                }
            }
        }

        let bus_width = features.bus_width;
        let base = match &cfg.address {
            AddressValue::Int(addr) => {
                BitRange::new(AddressSpec::new(*addr, 0)?, bus_width - 1, 0, bus_width)?
            }
            AddressValue::Literal(text) => BitRange::parse(text, bus_width)?,
        };
        let width = base.width();

        let fields = match cfg.repeat {
            None => vec![Field {
                meta: meta.clone(),
                bitrange: base,
                index: None,
            }],
            Some(repeat) => {
                let field_repeat = cfg.field_repeat.unwrap_or(repeat);
                if field_repeat == 0 {
                    return Err(Error::config("field-repeat must be positive"));
                }
                let field_stride = cfg.field_stride.unwrap_or(width as i64);
                if field_stride.unsigned_abs() < width as u64 {
                    return Err(Error::config(
                        "field-stride is smaller than the width of a single field",
                    ));
                }
                let stride = cfg.stride.unwrap_or(1);
                if stride.unsigned_abs() < base.block_count(bus_width) as u64 {
                    return Err(Error::config(
                        "stride is smaller than the number of blocks spanned by the field",
                    ));
                }
                let mut fields = Vec::with_capacity(repeat as usize);
                for index in 0..repeat {
                    let ordinal_reg = (index / field_repeat) as i64;
                    let ordinal_intra = (index % field_repeat) as i64;
                    let bitrange = base
                        .shift(ordinal_intra * field_stride)?
                        .move_blocks(ordinal_reg * stride)?;
                    let copy = meta.suffixed(index);
                    namespace.insert(&copy.name, format!("field `{}`", copy.name))?;
                    fields.push(Field {
                        meta: copy,
                        bitrange,
                        index: Some(index),
                    });
                }
                fields
            }
        };

        let shape = Shape::from(cfg.repeat);
        let ctx = FieldContext {
            name: &meta.name,
            width,
            shape,
            subaddress_width: base.subaddress_width(bus_width),
            prot: ProtMask::from_permissions(&cfg.permissions)?,
        };
        let behavior = Behavior::resolve(&cfg.behavior, &ctx, internals, interrupts)?;
        let subaddress_width = ctx.subaddress_width;

        // Register metadata gets ordinal suffixes when the copies spread
        // over more than one register, so it obeys the repeated-mnemonic
        // rule in that case.
        let register_meta = match &cfg.register {
            None => None,
            Some(register) => {
                let registers = cfg.repeat.map(|repeat| {
                    repeat.div_ceil(cfg.field_repeat.unwrap_or(repeat))
                });
                Some(Metadata::resolve_repeated(
                    register,
                    registers.filter(|&count| count > 1),
                )?)
            }
        };

        Ok(FieldDescriptor {
            meta,
            shape,
            width,
            subaddress_width,
            behavior,
            field_repeat: cfg.repeat.map(|repeat| cfg.field_repeat.unwrap_or(repeat)),
            register_meta,
            endianness: cfg.endianness,
            fields,
        })
    }

    pub fn is_repeated(&self) -> bool {
        self.shape.is_vector()
    }
}
