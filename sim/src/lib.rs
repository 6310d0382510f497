// Licensed under the Apache-2.0 license

//! Cycle-level reference interpreter for compiled register files.
//!
//! [`Simulator`] executes a [`RegFileIr`] the way the generated hardware
//! would, one bus access or hardware event at a time: address decode with
//! conditions and `prot` checks, per-field behavior semantics, multi-word
//! accesses through the holding registers (including the privilege
//! interruption hardening), deferred accesses through the defer FIFOs,
//! internal signal propagation and the interrupt flag/enable/unmask logic.
//!
//! The model is single-master and serialized: every call is one bus
//! transaction or one hardware-side event, and strobed internal signals
//! propagate to their consumers within the same call. Deferred accesses
//! complete immediately in FIFO order, as nothing else can be in flight
//! between two calls. Memory and AXI passthrough fields are backed by a
//! sparse word store standing in for the RAM port or child bus.
//!
//! Capacity: register values, holding registers and internal signals are
//! held in 128-bit words, so registers spanning more than 128 bits are
//! rejected at construction.

use std::collections::HashMap;

use log::{debug, warn};

use regfile_compiler::behavior::{BehaviorDetail, HookPurpose, InterruptDetail, PrimitiveDetail, ResetValue};
use regfile_compiler::config::{
    ActiveLevel, AfterHwWriteAction, AfterReadAction, AfterWriteAction, BusReadMode,
    BusWriteMode, HwReadMode, HwWriteMode, InterruptFieldMode, IoDirection, MonitorMode,
};
use regfile_compiler::defer::{DeferEntry, DeferFifo};
use regfile_compiler::error::{Error, Result};
use regfile_compiler::internals::InternalIdx;
use regfile_compiler::ir::{BlockHit, Decoded, RegFileIr};
use regfile_compiler::register::{FieldRef, LogicalRegister};

/// Response of one bus access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Response {
    /// The access completed; reads carry the data word, writes carry 0.
    Okay(u64),
    /// The access completed with a slave error.
    SlaveError,
    /// No register claims the address, or no field of the decoded register
    /// acknowledges the access for its `prot` code.
    DecodeError,
    /// The access cannot complete this cycle; the master retries.
    Stalled,
}

impl Response {
    /// The data word of an [`Okay`] response.
    ///
    /// [`Okay`]: Response::Okay
    pub fn data(&self) -> Option<u64> {
        match self {
            Response::Okay(data) => Some(*data),
            _ => None,
        }
    }
}

/// A hardware-side control operation on a primitive field. Each variant
/// requires the matching `ctrl-*` flag on the field's behavior.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CtrlOp {
    /// Level input; while asserted, bus writes to the field are ignored.
    Lock(bool),
    Validate,
    Invalidate,
    /// Stream-ready pulse: consumes the held value.
    Ready,
    Clear,
    /// Re-applies the reset value.
    Reset,
    Increment,
    Decrement,
    BitSet(u128),
    BitClear(u128),
    BitToggle(u128),
}

#[derive(Clone, Copy, Debug)]
struct FieldState {
    data: u128,
    valid: bool,
}

#[derive(Clone, Copy, Debug, Default)]
struct IrqState {
    /// Raw request input, before active-level conversion.
    raw: u128,
    flag: u128,
    enab: u128,
    umsk: u128,
}

/// A multi-word access in progress.
#[derive(Clone, Copy, Debug)]
struct Inflight {
    register: usize,
    next_block: usize,
    prot: u8,
}

enum Gate {
    Ok,
    Stall,
    Error,
}

/// Cycle-level interpreter of one compiled register file.
pub struct Simulator {
    ir: RegFileIr,
    hardened: bool,
    /// Field register state, indexed like `ir.descriptors[d].fields[i]`.
    fields: Vec<Vec<FieldState>>,
    /// Per-descriptor ctrl-lock level.
    locked: Vec<bool>,
    /// Backing word store of memory and AXI passthrough descriptors.
    mem: Vec<HashMap<u32, u64>>,
    /// Current value of each level-driven internal signal.
    levels: Vec<u128>,
    /// Pulses delivered per internal signal since reset.
    strobe_counts: Vec<u64>,
    irqs: Vec<IrqState>,
    /// Internal index to the descriptors monitoring it.
    monitor_watchers: Vec<Vec<usize>>,
    /// Internal index to the interrupts it requests.
    irq_watchers: Vec<Vec<usize>>,
    field_index: HashMap<String, usize>,
    internal_index: HashMap<String, InternalIdx>,
    irq_index: HashMap<String, usize>,
    /// Reset overrides of `generic` fields, by descriptor index.
    generics: HashMap<usize, u128>,
    read_fifo: DeferFifo,
    write_fifo: DeferFifo,
    read_holding: u128,
    write_holding: u128,
    write_strobe_holding: u128,
    read_slot: Option<Inflight>,
    write_slot: Option<Inflight>,
    cycle: u64,
}

fn mask(width: u32) -> u128 {
    if width >= 128 {
        u128::MAX
    } else {
        (1u128 << width) - 1
    }
}

fn copy_mask(copy: usize) -> u128 {
    1u128.checked_shl(copy as u32).unwrap_or(0)
}

/// Whether an interrupting master is less privileged or less secure than
/// the master whose multi-word access is in progress. `prot` bit 0 is
/// privileged, bit 1 is nonsecure.
fn less_trusted(ongoing: u8, interrupting: u8) -> bool {
    let less_privileged = ongoing & 0b001 != 0 && interrupting & 0b001 == 0;
    let less_secure = ongoing & 0b010 == 0 && interrupting & 0b010 != 0;
    less_privileged || less_secure
}

impl Simulator {
    /// Builds a simulator in the reset state.
    pub fn new(ir: RegFileIr) -> Result<Simulator> {
        for descriptor in &ir.descriptors {
            if descriptor.width > 128 {
                return Err(Error::capacity(format!(
                    "field `{}` is {} bits wide; the simulator holds field values \
                     in 128 bits",
                    descriptor.meta.name, descriptor.width
                )));
            }
        }
        for register in &ir.registers {
            if register.block_count() * ir.features.bus_width > 128 {
                return Err(Error::capacity(format!(
                    "register `{}` spans {} bus words; the simulator holds register \
                     values in 128 bits",
                    register.meta.name,
                    register.block_count()
                )));
            }
        }
        for internal in &ir.internals {
            if internal.shape().width() > 128 {
                return Err(Error::capacity(format!(
                    "internal `{}` is wider than 128 bits",
                    internal.name()
                )));
            }
        }
        for interrupt in &ir.interrupts {
            if interrupt.width() > 128 {
                return Err(Error::capacity(format!(
                    "interrupt `{}` is wider than 128 bits",
                    interrupt.name()
                )));
            }
        }

        let mut monitor_watchers = vec![Vec::new(); ir.internals.len()];
        for (d, descriptor) in ir.descriptors.iter().enumerate() {
            for hook in &descriptor.behavior.internals {
                if hook.purpose == HookPurpose::Monitor {
                    monitor_watchers[hook.internal].push(d);
                }
            }
        }
        let mut irq_watchers = vec![Vec::new(); ir.internals.len()];
        for (i, interrupt) in ir.interrupts.iter().enumerate() {
            if let Some(source) = interrupt.source() {
                irq_watchers[source].push(i);
            }
        }

        let field_index = ir
            .descriptors
            .iter()
            .enumerate()
            .map(|(d, descriptor)| (descriptor.meta.name.to_ascii_lowercase(), d))
            .collect();
        let internal_index = ir
            .internals
            .iter()
            .enumerate()
            .map(|(i, internal)| (internal.name().to_ascii_lowercase(), i))
            .collect();
        let irq_index = ir
            .interrupts
            .iter()
            .enumerate()
            .map(|(i, interrupt)| (interrupt.name().to_ascii_lowercase(), i))
            .collect();

        let hardened =
            !ir.features.insecure && ir.registers.iter().any(|register| register.protected);
        let max_outstanding = ir.features.max_outstanding;
        let mut sim = Simulator {
            fields: vec![Vec::new(); ir.descriptors.len()],
            locked: vec![false; ir.descriptors.len()],
            mem: vec![HashMap::new(); ir.descriptors.len()],
            levels: vec![0; ir.internals.len()],
            strobe_counts: vec![0; ir.internals.len()],
            irqs: vec![IrqState::default(); ir.interrupts.len()],
            monitor_watchers,
            irq_watchers,
            field_index,
            internal_index,
            irq_index,
            generics: HashMap::new(),
            read_fifo: DeferFifo::new(max_outstanding),
            write_fifo: DeferFifo::new(max_outstanding),
            read_holding: 0,
            write_holding: 0,
            write_strobe_holding: 0,
            read_slot: None,
            write_slot: None,
            cycle: 0,
            hardened,
            ir,
        };
        sim.reset();
        Ok(sim)
    }

    /// Returns everything to the reset state, including the cycle counter
    /// and the strobe counts. Reset overrides set with [`set_generic`] are
    /// kept.
    ///
    /// [`set_generic`]: Simulator::set_generic
    pub fn reset(&mut self) {
        for d in 0..self.ir.descriptors.len() {
            let copies = self.ir.descriptors[d].fields.len();
            let state = self.reset_state(d);
            self.fields[d] = vec![state; copies];
            self.locked[d] = false;
            self.mem[d].clear();
        }
        for level in &mut self.levels {
            *level = 0;
        }
        for count in &mut self.strobe_counts {
            *count = 0;
        }
        for (i, interrupt) in self.ir.interrupts.iter().enumerate() {
            let m = mask(interrupt.width());
            self.irqs[i] = IrqState {
                raw: 0,
                flag: 0,
                enab: if interrupt.enabled_after_reset() { m } else { 0 },
                umsk: if interrupt.unmasked_after_reset() { m } else { 0 },
            };
        }
        self.read_fifo = DeferFifo::new(self.ir.features.max_outstanding);
        self.write_fifo = DeferFifo::new(self.ir.features.max_outstanding);
        self.read_holding = 0;
        self.write_holding = 0;
        self.write_strobe_holding = 0;
        self.read_slot = None;
        self.write_slot = None;
        self.cycle = 0;
        for d in 0..self.ir.descriptors.len() {
            self.refresh_hooks(d);
        }
    }

    fn reset_state(&self, d: usize) -> FieldState {
        let descriptor = &self.ir.descriptors[d];
        let m = mask(descriptor.width);
        match descriptor.behavior.reset {
            ResetValue::Value(value) => FieldState {
                data: value as u128 & m,
                valid: true,
            },
            ResetValue::Invalid => FieldState {
                data: 0,
                valid: false,
            },
            ResetValue::Generic => FieldState {
                data: self.generics.get(&d).copied().unwrap_or(0) & m,
                valid: true,
            },
        }
    }

    /// The compiled register file being interpreted.
    pub fn ir(&self) -> &RegFileIr {
        &self.ir
    }

    /// Cycles consumed since reset. Every bus transaction takes one.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Outstanding deferred accesses per direction.
    pub fn outstanding(&self) -> (usize, usize) {
        (self.read_fifo.len(), self.write_fifo.len())
    }

    /// Current content of the read holding register.
    pub fn read_holding(&self) -> u128 {
        self.read_holding
    }

    // ------------------------------------------------------------------
    // Bus side
    // ------------------------------------------------------------------

    /// Reads one bus word with `prot` 0 (user, secure, data).
    pub fn read(&mut self, address: u32) -> Response {
        self.read_prot(address, 0)
    }

    /// Reads one bus word as a master with the given `prot` code.
    pub fn read_prot(&mut self, address: u32, prot: u8) -> Response {
        self.cycle += 1;
        let hit = match self.decode(address, false, prot) {
            Decoded::Error => {
                debug!("read 0x{address:x}: decode error");
                return Response::DecodeError;
            }
            Decoded::DontCare => {
                debug!("read 0x{address:x}: don't-care hole");
                return Response::Okay(0);
            }
            Decoded::Block(hit) => hit,
        };
        let continuation = self.is_continuation(false, &hit, prot);
        if !continuation && self.interleave_rejected(prot) {
            return Response::SlaveError;
        }
        if hit.active.is_empty() {
            debug!("read 0x{address:x}: no field acknowledges prot {prot:#05b}");
            return if self.ir.features.optimize {
                Response::Okay(0)
            } else {
                Response::DecodeError
            };
        }
        let register = self.ir.registers[hit.register].clone();
        if register.read.map(|caps| caps.deferring).unwrap_or(false) {
            return self.deferred_read(&register, &hit, prot);
        }

        let word_mask = mask(self.ir.features.bus_width);
        let blocks = register.block_count() as usize;
        if blocks > 1 && hit.block > 0 {
            // Not the first block: the data comes out of the holding
            // register, sampled when the first block was read.
            if continuation {
                let data =
                    ((self.read_holding >> register.blocks[hit.block].offset) & word_mask)
                        as u64;
                if hit.block + 1 == blocks {
                    self.read_slot = None;
                    if self.hardened {
                        self.read_holding = 0;
                    }
                } else if let Some(slot) = self.read_slot.as_mut() {
                    slot.next_block += 1;
                }
                return Response::Okay(data);
            }
            // Out-of-sequence tail access: serves whatever the holding
            // register happens to carry.
            let data =
                ((self.read_holding >> register.blocks[hit.block].offset) & word_mask) as u64;
            return Response::Okay(data);
        }

        match self.read_gate(&register, prot) {
            Gate::Stall => return Response::Stalled,
            Gate::Error => return Response::SlaveError,
            Gate::Ok => (),
        }
        let value = self.register_value(&register, prot);
        self.apply_read_effects(&register, prot);
        if blocks > 1 {
            self.read_holding = value;
            self.read_slot = Some(Inflight {
                register: hit.register,
                next_block: 1,
                prot,
            });
        }
        Response::Okay(((value >> register.blocks[0].offset) & word_mask) as u64)
    }

    /// Writes one bus word with all strobes set and `prot` 0.
    pub fn write(&mut self, address: u32, data: u64) -> Response {
        self.write_strobed(address, data, u64::MAX, 0)
    }

    /// Writes one bus word with all strobes set as a master with the given
    /// `prot` code.
    pub fn write_prot(&mut self, address: u32, data: u64, prot: u8) -> Response {
        self.write_strobed(address, data, u64::MAX, prot)
    }

    /// Writes one bus word. `strobe` is a bit mask selecting the written
    /// bits, byte strobes expanded by the caller.
    pub fn write_strobed(&mut self, address: u32, data: u64, strobe: u64, prot: u8) -> Response {
        self.cycle += 1;
        let hit = match self.decode(address, true, prot) {
            Decoded::Error => {
                debug!("write 0x{address:x}: decode error");
                return Response::DecodeError;
            }
            Decoded::DontCare => {
                debug!("write 0x{address:x}: don't-care hole, dropped");
                return Response::Okay(0);
            }
            Decoded::Block(hit) => hit,
        };
        let continuation = self.is_continuation(true, &hit, prot);
        if !continuation && self.interleave_rejected(prot) {
            return Response::SlaveError;
        }
        if hit.active.is_empty() {
            debug!("write 0x{address:x}: no field acknowledges prot {prot:#05b}");
            return if self.ir.features.optimize {
                Response::Okay(0)
            } else {
                Response::DecodeError
            };
        }
        let register = self.ir.registers[hit.register].clone();
        if register.write.map(|caps| caps.deferring).unwrap_or(false) {
            return self.deferred_write(&register, &hit, data, strobe, prot);
        }

        let word_mask = mask(self.ir.features.bus_width);
        let word = data as u128 & word_mask;
        let word_strobe = strobe as u128 & word_mask;
        let blocks = register.block_count() as usize;
        let offset = register.blocks[hit.block].offset;

        if blocks > 1 && hit.block + 1 < blocks {
            // Stage into the write holding register; the real write
            // happens with the last block.
            self.write_holding = (self.write_holding & !(word_mask << offset)) | (word << offset);
            self.write_strobe_holding = (self.write_strobe_holding & !(word_mask << offset))
                | (word_strobe << offset);
            self.write_slot = Some(Inflight {
                register: hit.register,
                next_block: hit.block + 1,
                prot,
            });
            return Response::Okay(0);
        }

        match self.write_gate(&register, prot) {
            // A stalled access has no effects; the staged words survive for
            // the retry.
            Gate::Stall => return Response::Stalled,
            Gate::Error => {
                if blocks > 1 {
                    self.write_slot = None;
                    self.write_holding = 0;
                    self.write_strobe_holding = 0;
                }
                return Response::SlaveError;
            }
            Gate::Ok => (),
        }

        let (full_data, full_strobe) = if blocks > 1 {
            self.write_slot = None;
            // Staged words from another master's sequence do not merge
            // into this write.
            let (d, s) = if continuation {
                (
                    self.write_holding | (word << offset),
                    self.write_strobe_holding | (word_strobe << offset),
                )
            } else {
                (word << offset, word_strobe << offset)
            };
            self.write_holding = 0;
            self.write_strobe_holding = 0;
            (d, s)
        } else {
            (word << offset, word_strobe << offset)
        };

        self.apply_write(&register, prot, full_data, full_strobe);
        Response::Okay(0)
    }

    fn decode(&self, address: u32, write: bool, prot: u8) -> Decoded {
        let condition_values: Vec<u32> = self
            .ir
            .conditions
            .iter()
            .map(|condition| self.levels[condition.internal] as u32)
            .collect();
        self.ir.decode(address, write, prot, &condition_values)
    }

    fn is_continuation(&self, write: bool, hit: &BlockHit, prot: u8) -> bool {
        let slot = if write { &self.write_slot } else { &self.read_slot };
        match slot {
            Some(slot) => {
                slot.register == hit.register
                    && slot.next_block == hit.block
                    && slot.prot == prot
            }
            None => false,
        }
    }

    /// Hardened register files refuse a less trusted master that interleaves
    /// a multi-word access in progress: the interloper gets a slave error
    /// and the ongoing access completes with its holding registers intact.
    fn interleave_rejected(&self, prot: u8) -> bool {
        if !self.hardened {
            return false;
        }
        let rejected = [self.read_slot, self.write_slot]
            .iter()
            .flatten()
            .any(|slot| less_trusted(slot.prot, prot));
        if rejected {
            warn!("rejecting a less trusted master interleaving a multi-word access");
        }
        rejected
    }

    fn readable(&self, field: FieldRef, prot: u8) -> bool {
        self.ir
            .descriptor(field)
            .behavior
            .bus
            .read
            .map(|caps| caps.prot.matches(prot))
            .unwrap_or(false)
    }

    fn writable(&self, field: FieldRef, prot: u8) -> bool {
        self.ir
            .descriptor(field)
            .behavior
            .bus
            .write
            .map(|caps| caps.prot.matches(prot))
            .unwrap_or(false)
    }

    /// Assembles the full register value as seen by a read with the given
    /// `prot` code. Fields the code cannot touch read as zero.
    fn register_value(&self, register: &LogicalRegister, prot: u8) -> u128 {
        let mut value = 0u128;
        for block in &register.blocks {
            for mapping in &block.mappings {
                if !self.readable(mapping.field, prot) {
                    continue;
                }
                let data = self.field_read_value(mapping.field);
                let bits = (data >> mapping.field_low) & mask(mapping.width);
                value |= bits << (block.offset + mapping.bus_low);
            }
        }
        value
    }

    fn field_read_value(&self, field: FieldRef) -> u128 {
        match &self.ir.descriptor(field).behavior.detail {
            BehaviorDetail::Primitive(_) => self.fields[field.descriptor][field.field].data,
            BehaviorDetail::Interrupt(detail) => {
                let state = &self.irqs[detail.interrupt];
                let value = match detail.mode {
                    InterruptFieldMode::Raw => state.raw,
                    InterruptFieldMode::Enable => state.enab,
                    InterruptFieldMode::Flag => state.flag,
                    InterruptFieldMode::Unmask => state.umsk,
                    InterruptFieldMode::Masked => state.flag & state.umsk,
                };
                // Copy i of an interrupt field carries interrupt bit i.
                (value >> field.field) & 1
            }
            _ => 0,
        }
    }

    /// First pass of a read: whether any active field stalls or errors the
    /// access. Blocking takes precedence; a stalled access has no effects.
    fn read_gate(&self, register: &LogicalRegister, prot: u8) -> Gate {
        let mut gate = Gate::Ok;
        for &field in &register.fields {
            if !self.readable(field, prot) {
                continue;
            }
            if let BehaviorDetail::Primitive(p) = &self.ir.descriptor(field).behavior.detail {
                let valid = self.fields[field.descriptor][field.field].valid;
                match p.bus_read {
                    BusReadMode::ValidWait if !valid => return Gate::Stall,
                    BusReadMode::Error => gate = Gate::Error,
                    BusReadMode::ValidOnly if !valid => gate = Gate::Error,
                    _ => (),
                }
            }
        }
        gate
    }

    fn write_gate(&self, register: &LogicalRegister, prot: u8) -> Gate {
        let mut gate = Gate::Ok;
        for &field in &register.fields {
            if !self.writable(field, prot) {
                continue;
            }
            if let BehaviorDetail::Primitive(p) = &self.ir.descriptor(field).behavior.detail {
                let valid = self.fields[field.descriptor][field.field].valid;
                match p.bus_write {
                    BusWriteMode::InvalidWait if valid => return Gate::Stall,
                    BusWriteMode::Error => gate = Gate::Error,
                    BusWriteMode::InvalidOnly if valid => gate = Gate::Error,
                    _ => (),
                }
            }
        }
        gate
    }

    fn apply_read_effects(&mut self, register: &LogicalRegister, prot: u8) {
        let refs = register.fields.clone();
        let mut touched = Vec::new();
        for field in refs {
            if !self.readable(field, prot) {
                continue;
            }
            let detail = self.ir.descriptor(field).behavior.detail.clone();
            match detail {
                BehaviorDetail::Primitive(p) => {
                    let width = self.ir.descriptor(field).width;
                    let m = mask(width);
                    let d = field.descriptor;
                    let i = field.field;
                    if !self.fields[d][i].valid {
                        self.emit_event(d, HookPurpose::Underrun, copy_mask(i));
                    }
                    match p.after_bus_read {
                        AfterReadAction::Nothing => (),
                        AfterReadAction::Invalidate => self.fields[d][i].valid = false,
                        AfterReadAction::Clear => self.fields[d][i].data = 0,
                        AfterReadAction::Increment => {
                            if self.fields[d][i].data == m {
                                self.fields[d][i].data = 0;
                                self.emit_event(d, HookPurpose::Overflow, copy_mask(i));
                            } else {
                                self.fields[d][i].data += 1;
                            }
                        }
                        AfterReadAction::Decrement => {
                            if self.fields[d][i].data == 0 {
                                self.fields[d][i].data = m;
                                self.emit_event(d, HookPurpose::Underflow, copy_mask(i));
                            } else {
                                self.fields[d][i].data -= 1;
                            }
                        }
                    }
                    touched.push(d);
                }
                BehaviorDetail::Interrupt(detail) => {
                    if detail.bus_read == BusReadMode::Clear {
                        let bit = copy_mask(field.field);
                        let state = &mut self.irqs[detail.interrupt];
                        let read = match detail.mode {
                            InterruptFieldMode::Flag => state.flag & bit,
                            InterruptFieldMode::Masked => state.flag & state.umsk & bit,
                            _ => 0,
                        };
                        state.flag &= !read;
                        self.recompute_irq(detail.interrupt);
                    }
                }
                _ => (),
            }
        }
        touched.sort_unstable();
        touched.dedup();
        for d in touched {
            self.refresh_hooks(d);
        }
    }

    /// The bits of `data`/`strobe` (full register values) that land in one
    /// field, shifted into field position.
    fn field_write_bits(
        &self,
        register: &LogicalRegister,
        field: FieldRef,
        data: u128,
        strobe: u128,
    ) -> (u128, u128) {
        let mut wdata = 0u128;
        let mut wstrobe = 0u128;
        for block in &register.blocks {
            for mapping in &block.mappings {
                if mapping.field != field {
                    continue;
                }
                let low = block.offset + mapping.bus_low;
                let m = mask(mapping.width);
                wdata |= ((data >> low) & m) << mapping.field_low;
                wstrobe |= ((strobe >> low) & m) << mapping.field_low;
            }
        }
        (wdata, wstrobe)
    }

    fn apply_write(&mut self, register: &LogicalRegister, prot: u8, data: u128, strobe: u128) {
        let refs = register.fields.clone();
        let mut touched = Vec::new();
        for field in refs {
            if !self.writable(field, prot) {
                continue;
            }
            let (wdata, wstrobe) = self.field_write_bits(register, field, data, strobe);
            let detail = self.ir.descriptor(field).behavior.detail.clone();
            match detail {
                BehaviorDetail::Primitive(p) => {
                    self.apply_primitive_write(field, &p, wdata, wstrobe);
                    touched.push(field.descriptor);
                }
                BehaviorDetail::Interrupt(detail) => {
                    self.apply_interrupt_write(field, &detail, wdata, wstrobe);
                }
                _ => (),
            }
        }
        touched.sort_unstable();
        touched.dedup();
        for d in touched {
            self.refresh_hooks(d);
        }
    }

    fn apply_primitive_write(
        &mut self,
        field: FieldRef,
        p: &PrimitiveDetail,
        wdata: u128,
        wstrobe: u128,
    ) {
        let d = field.descriptor;
        let i = field.field;
        if p.ctrl.lock && self.locked[d] {
            debug!(
                "write to locked field `{}` ignored",
                self.ir.descriptors[d].meta.name
            );
            return;
        }
        let m = mask(self.ir.descriptors[d].width);
        let wdata = wdata & m;
        let wstrobe = wstrobe & m;
        let had_data = self.fields[d][i].valid;
        let mut events: Vec<(HookPurpose, u128)> = Vec::new();
        let mut dropped = false;
        {
            let state = &mut self.fields[d][i];
            match p.bus_write {
                BusWriteMode::Enabled => state.data = wdata,
                BusWriteMode::Masked => {
                    state.data = (state.data & !wstrobe) | (wdata & wstrobe)
                }
                BusWriteMode::Invalid => {
                    if had_data {
                        dropped = true;
                    } else {
                        state.data = wdata;
                    }
                }
                // The stall and error cases were filtered by the gate pass.
                BusWriteMode::InvalidWait | BusWriteMode::InvalidOnly => state.data = wdata,
                BusWriteMode::Accumulate => {
                    let (sum, carry) = state.data.overflowing_add(wdata);
                    if carry || sum > m {
                        events.push((HookPurpose::Overflow, copy_mask(i)));
                    }
                    state.data = sum & m;
                }
                BusWriteMode::Subtract => {
                    if wdata > state.data {
                        events.push((HookPurpose::Underflow, copy_mask(i)));
                    }
                    state.data = state.data.wrapping_sub(wdata) & m;
                }
                BusWriteMode::BitSet => {
                    if state.data & wdata != 0 {
                        events.push((HookPurpose::BitOverflow, copy_mask(i)));
                    }
                    state.data |= wdata;
                }
                BusWriteMode::BitClear => {
                    if wdata & !state.data & m != 0 {
                        events.push((HookPurpose::BitUnderflow, copy_mask(i)));
                    }
                    state.data &= !wdata;
                }
                BusWriteMode::BitToggle => state.data ^= wdata,
                BusWriteMode::Disabled
                | BusWriteMode::Error
                | BusWriteMode::Clear
                | BusWriteMode::Set => (),
            }
        }
        if had_data {
            // A write into a field that still holds data; stream endpoints
            // report this as an overrun.
            events.push((HookPurpose::Overrun, copy_mask(i)));
        }
        if !dropped {
            match p.after_bus_write {
                AfterWriteAction::Nothing => (),
                AfterWriteAction::Validate => self.fields[d][i].valid = true,
                AfterWriteAction::Invalidate => {
                    // Self-invalidating strobe: pulse the driven internals
                    // with the written value, then fall back to zero.
                    let value = self.fields[d][i].data;
                    let hooks: Vec<InternalIdx> = self.ir.descriptors[d]
                        .behavior
                        .internals
                        .iter()
                        .filter(|hook| hook.purpose == HookPurpose::Drive)
                        .map(|hook| hook.internal)
                        .collect();
                    for internal in hooks {
                        self.deliver_strobe(internal, value);
                    }
                    self.fields[d][i].data = 0;
                }
            }
        }
        for (purpose, value) in events {
            self.emit_event(d, purpose, value);
        }
    }

    fn apply_interrupt_write(
        &mut self,
        field: FieldRef,
        detail: &InterruptDetail,
        wdata: u128,
        wstrobe: u128,
    ) {
        let bit = copy_mask(field.field);
        let wdata = wdata & 1;
        let wstrobe = wstrobe & 1;
        {
            let state = &mut self.irqs[detail.interrupt];
            let target = match detail.mode {
                InterruptFieldMode::Enable => &mut state.enab,
                InterruptFieldMode::Unmask => &mut state.umsk,
                InterruptFieldMode::Flag => &mut state.flag,
                InterruptFieldMode::Raw | InterruptFieldMode::Masked => return,
            };
            match detail.bus_write {
                BusWriteMode::Enabled => {
                    if wstrobe != 0 {
                        if wdata != 0 {
                            *target |= bit;
                        } else {
                            *target &= !bit;
                        }
                    }
                }
                BusWriteMode::Clear => {
                    if wdata != 0 {
                        *target &= !bit;
                    }
                }
                BusWriteMode::Set => {
                    if wdata != 0 {
                        *target |= bit;
                    }
                }
                _ => (),
            }
        }
        self.recompute_irq(detail.interrupt);
    }

    // ------------------------------------------------------------------
    // Deferred accesses
    // ------------------------------------------------------------------

    fn deferred_read(
        &mut self,
        register: &LogicalRegister,
        hit: &BlockHit,
        prot: u8,
    ) -> Response {
        if self.read_fifo.is_full() {
            debug!("read defer FIFO full; stalling");
            return Response::Stalled;
        }
        let entry = DeferEntry {
            tag: register.read_tag.unwrap_or(0),
            subaddress: hit.subaddress,
            prot,
        };
        if self.read_fifo.push(entry).is_err() {
            return Response::Stalled;
        }
        // Single-master model: the RAM port or child bus answers right
        // away, so the response completes immediately, in FIFO order.
        let Some(done) = self.read_fifo.pop() else {
            return Response::SlaveError;
        };
        let Some(&field) = register.fields.first() else {
            return Response::SlaveError;
        };
        let descriptor = self.ir.descriptor(field);
        let word = match descriptor.behavior.detail {
            BehaviorDetail::Memory(_) | BehaviorDetail::Axi(_) => self.mem[field.descriptor]
                .get(&done.subaddress)
                .copied()
                .unwrap_or(0),
            _ => 0,
        };
        let Some(mapping) = register.blocks[hit.block].mappings.first() else {
            return Response::SlaveError;
        };
        Response::Okay((((word as u128) & mask(descriptor.width)) << mapping.bus_low) as u64)
    }

    fn deferred_write(
        &mut self,
        register: &LogicalRegister,
        hit: &BlockHit,
        data: u64,
        strobe: u64,
        prot: u8,
    ) -> Response {
        if self.write_fifo.is_full() {
            debug!("write defer FIFO full; stalling");
            return Response::Stalled;
        }
        let entry = DeferEntry {
            tag: register.write_tag.unwrap_or(0),
            subaddress: hit.subaddress,
            prot,
        };
        if self.write_fifo.push(entry).is_err() {
            return Response::Stalled;
        }
        let Some(done) = self.write_fifo.pop() else {
            return Response::SlaveError;
        };
        let Some(&field) = register.fields.first() else {
            return Response::SlaveError;
        };
        let descriptor = self.ir.descriptor(field);
        if !matches!(
            descriptor.behavior.detail,
            BehaviorDetail::Memory(_) | BehaviorDetail::Axi(_)
        ) {
            return Response::Okay(0);
        }
        let Some(mapping) = register.blocks[hit.block].mappings.first() else {
            return Response::SlaveError;
        };
        let m = mask(descriptor.width) as u64;
        let wdata = (data >> mapping.bus_low) & m;
        let wstrobe = (strobe >> mapping.bus_low) & m;
        let store = &mut self.mem[field.descriptor];
        let old = store.get(&done.subaddress).copied().unwrap_or(0);
        store.insert(done.subaddress, (old & !wstrobe) | (wdata & wstrobe));
        Response::Okay(0)
    }

    // ------------------------------------------------------------------
    // Hardware side
    // ------------------------------------------------------------------

    fn descriptor_named(&self, name: &str) -> Result<usize> {
        self.field_index
            .get(&name.to_ascii_lowercase())
            .copied()
            .ok_or_else(|| Error::config(format!("unknown field `{name}`")))
    }

    fn primitive_named(&self, name: &str) -> Result<(usize, PrimitiveDetail)> {
        let d = self.descriptor_named(name)?;
        match &self.ir.descriptors[d].behavior.detail {
            BehaviorDetail::Primitive(p) => Ok((d, p.clone())),
            _ => Err(Error::config(format!(
                "field `{name}` has no hardware interface"
            ))),
        }
    }

    /// Writes copy 0 of a field from the hardware side. Returns whether the
    /// value was accepted; only `stream` fields can refuse.
    pub fn hw_write(&mut self, field: &str, value: u128) -> Result<bool> {
        self.hw_write_indexed(field, 0, value)
    }

    /// Writes one copy of a repeated field from the hardware side.
    pub fn hw_write_indexed(&mut self, field: &str, index: usize, value: u128) -> Result<bool> {
        let (d, p) = self.primitive_named(field)?;
        if index >= self.fields[d].len() {
            return Err(Error::config(format!(
                "field `{field}` has no copy {index}"
            )));
        }
        let m = mask(self.ir.descriptors[d].width);
        let value = value & m;
        let mut events: Vec<(HookPurpose, u128)> = Vec::new();
        {
            let state = &mut self.fields[d][index];
            match p.hw_write {
                HwWriteMode::Disabled => {
                    return Err(Error::config(format!(
                        "field `{field}` has no hardware write port"
                    )));
                }
                HwWriteMode::Status | HwWriteMode::Enabled => state.data = value,
                HwWriteMode::Stream => {
                    if state.valid {
                        return Ok(false);
                    }
                    state.data = value;
                }
                HwWriteMode::Accumulate => {
                    let (sum, carry) = state.data.overflowing_add(value);
                    if carry || sum > m {
                        events.push((HookPurpose::Overflow, copy_mask(index)));
                    }
                    state.data = sum & m;
                }
                HwWriteMode::Subtract => {
                    if value > state.data {
                        events.push((HookPurpose::Underflow, copy_mask(index)));
                    }
                    state.data = state.data.wrapping_sub(value) & m;
                }
                HwWriteMode::Set => {
                    if state.data & value != 0 {
                        events.push((HookPurpose::BitOverflow, copy_mask(index)));
                    }
                    state.data |= value;
                }
                HwWriteMode::Reset => {
                    if value & !state.data & m != 0 {
                        events.push((HookPurpose::BitUnderflow, copy_mask(index)));
                    }
                    state.data &= !value;
                }
                HwWriteMode::Toggle => state.data ^= value,
            }
            if p.hw_write == HwWriteMode::Status
                || p.after_hw_write == AfterHwWriteAction::Validate
            {
                state.valid = true;
            }
        }
        for (purpose, value) in events {
            self.emit_event(d, purpose, value);
        }
        self.refresh_hooks(d);
        Ok(true)
    }

    /// Reads copy 0 of a field from the hardware side. `handshake` ports
    /// consume the value; `enabled` ports see data only while it is valid.
    pub fn hw_read(&mut self, field: &str) -> Result<Option<u128>> {
        self.hw_read_indexed(field, 0)
    }

    pub fn hw_read_indexed(&mut self, field: &str, index: usize) -> Result<Option<u128>> {
        let (d, p) = self.primitive_named(field)?;
        if index >= self.fields[d].len() {
            return Err(Error::config(format!(
                "field `{field}` has no copy {index}"
            )));
        }
        match p.hw_read {
            HwReadMode::Disabled => Err(Error::config(format!(
                "field `{field}` has no hardware read port"
            ))),
            HwReadMode::Simple => Ok(Some(self.fields[d][index].data)),
            HwReadMode::Enabled => {
                let state = self.fields[d][index];
                Ok(if state.valid { Some(state.data) } else { None })
            }
            HwReadMode::Handshake => {
                if !self.fields[d][index].valid {
                    return Ok(None);
                }
                let data = self.fields[d][index].data;
                self.fields[d][index].valid = false;
                self.refresh_hooks(d);
                Ok(Some(data))
            }
        }
    }

    /// Applies a control operation to every copy of a field. The behavior
    /// must have the matching `ctrl-*` flag enabled.
    pub fn ctrl(&mut self, field: &str, op: CtrlOp) -> Result<()> {
        let (d, p) = self.primitive_named(field)?;
        let (enabled, option) = match op {
            CtrlOp::Lock(_) => (p.ctrl.lock, "ctrl-lock"),
            CtrlOp::Validate => (p.ctrl.validate, "ctrl-validate"),
            CtrlOp::Invalidate => (p.ctrl.invalidate, "ctrl-invalidate"),
            CtrlOp::Ready => (p.ctrl.ready, "ctrl-ready"),
            CtrlOp::Clear => (p.ctrl.clear, "ctrl-clear"),
            CtrlOp::Reset => (p.ctrl.reset, "ctrl-reset"),
            CtrlOp::Increment => (p.ctrl.increment, "ctrl-increment"),
            CtrlOp::Decrement => (p.ctrl.decrement, "ctrl-decrement"),
            CtrlOp::BitSet(_) => (p.ctrl.bit_set, "ctrl-bit-set"),
            CtrlOp::BitClear(_) => (p.ctrl.bit_clear, "ctrl-bit-clear"),
            CtrlOp::BitToggle(_) => (p.ctrl.bit_toggle, "ctrl-bit-toggle"),
        };
        if !enabled {
            return Err(Error::config(format!(
                "field `{field}` has no {option} input"
            )));
        }
        let m = mask(self.ir.descriptors[d].width);
        let copies = self.fields[d].len();
        let mut events: Vec<(HookPurpose, u128)> = Vec::new();
        match op {
            CtrlOp::Lock(level) => self.locked[d] = level,
            CtrlOp::Validate => {
                for state in &mut self.fields[d] {
                    state.valid = true;
                }
            }
            CtrlOp::Invalidate => {
                for state in &mut self.fields[d] {
                    state.valid = false;
                }
            }
            CtrlOp::Ready => {
                for state in &mut self.fields[d] {
                    state.valid = false;
                }
            }
            CtrlOp::Clear => {
                for state in &mut self.fields[d] {
                    state.data = 0;
                }
            }
            CtrlOp::Reset => {
                let state = self.reset_state(d);
                self.fields[d] = vec![state; copies];
                self.locked[d] = false;
            }
            CtrlOp::Increment => {
                for i in 0..copies {
                    if self.fields[d][i].data == m {
                        self.fields[d][i].data = 0;
                        events.push((HookPurpose::Overflow, copy_mask(i)));
                    } else {
                        self.fields[d][i].data += 1;
                    }
                }
            }
            CtrlOp::Decrement => {
                for i in 0..copies {
                    if self.fields[d][i].data == 0 {
                        self.fields[d][i].data = m;
                        events.push((HookPurpose::Underflow, copy_mask(i)));
                    } else {
                        self.fields[d][i].data -= 1;
                    }
                }
            }
            CtrlOp::BitSet(value) => {
                for i in 0..copies {
                    if self.fields[d][i].data & value & m != 0 {
                        events.push((HookPurpose::BitOverflow, copy_mask(i)));
                    }
                    self.fields[d][i].data |= value & m;
                }
            }
            CtrlOp::BitClear(value) => {
                for i in 0..copies {
                    if value & !self.fields[d][i].data & m != 0 {
                        events.push((HookPurpose::BitUnderflow, copy_mask(i)));
                    }
                    self.fields[d][i].data &= !(value & m);
                }
            }
            CtrlOp::BitToggle(value) => {
                for i in 0..copies {
                    self.fields[d][i].data ^= value & m;
                }
            }
        }
        for (purpose, value) in events {
            self.emit_event(d, purpose, value);
        }
        self.refresh_hooks(d);
        Ok(())
    }

    /// Sets the reset value of a `generic` field and applies it to the
    /// current state.
    pub fn set_generic(&mut self, field: &str, value: u128) -> Result<()> {
        let d = self.descriptor_named(field)?;
        if self.ir.descriptors[d].behavior.reset != ResetValue::Generic {
            return Err(Error::config(format!(
                "field `{field}` has no generic reset value"
            )));
        }
        self.generics.insert(d, value);
        let state = self.reset_state(d);
        let copies = self.fields[d].len();
        self.fields[d] = vec![state; copies];
        self.refresh_hooks(d);
        Ok(())
    }

    /// Current value of copy 0 of a field register.
    pub fn field_value(&self, field: &str) -> Result<u128> {
        let d = self.descriptor_named(field)?;
        Ok(self.fields[d][0].data)
    }

    /// Whether copy 0 of a field currently holds valid data.
    pub fn field_valid(&self, field: &str) -> Result<bool> {
        let d = self.descriptor_named(field)?;
        Ok(self.fields[d][0].valid)
    }

    // ------------------------------------------------------------------
    // Internal signals and I/O ports
    // ------------------------------------------------------------------

    fn port_named(&self, name: &str, direction: IoDirection) -> Result<InternalIdx> {
        let port = self
            .ir
            .ports
            .iter()
            .find(|port| port.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::config(format!("unknown I/O port `{name}`")))?;
        if port.direction != direction {
            return Err(Error::config(format!(
                "I/O port `{name}` is not a {direction} port"
            )));
        }
        Ok(port.internal)
    }

    fn internal_named(&self, name: &str) -> Result<InternalIdx> {
        self.internal_index
            .get(&name.to_ascii_lowercase())
            .copied()
            .ok_or_else(|| Error::config(format!("unknown internal `{name}`")))
    }

    /// Drives a level input port.
    pub fn set_input(&mut self, port: &str, value: u128) -> Result<()> {
        let internal = self.port_named(port, IoDirection::Input)?;
        let value = value & mask(self.ir.internals[internal].shape().width());
        self.set_level(internal, value);
        Ok(())
    }

    /// Pulses a strobe input port for one cycle.
    pub fn pulse_input(&mut self, port: &str, value: u128) -> Result<()> {
        let internal = self.port_named(port, IoDirection::Strobe)?;
        self.deliver_strobe(internal, value);
        Ok(())
    }

    /// Current value of an output port.
    pub fn output(&self, port: &str) -> Result<u128> {
        let internal = self.port_named(port, IoDirection::Output)?;
        Ok(self.levels[internal])
    }

    /// Current level of an internal signal; strobed signals read as zero
    /// between pulses.
    pub fn internal_level(&self, name: &str) -> Result<u128> {
        Ok(self.levels[self.internal_named(name)?])
    }

    /// Number of pulses delivered to an internal signal since reset.
    pub fn strobe_count(&self, name: &str) -> Result<u64> {
        Ok(self.strobe_counts[self.internal_named(name)?])
    }

    fn set_level(&mut self, internal: InternalIdx, value: u128) {
        if self.levels[internal] == value {
            return;
        }
        self.levels[internal] = value;
        for d in self.monitor_watchers[internal].clone() {
            let (monitor_mode, copies, width) = match &self.ir.descriptors[d].behavior.detail {
                BehaviorDetail::Primitive(p) => (
                    p.monitor_mode,
                    self.ir.descriptors[d].fields.len(),
                    self.ir.descriptors[d].width,
                ),
                _ => continue,
            };
            if monitor_mode != MonitorMode::Status {
                continue;
            }
            for i in 0..copies {
                let v = if copies > 1 {
                    (value >> i) & 1
                } else {
                    value & mask(width)
                };
                self.fields[d][i].data = v;
                self.fields[d][i].valid = true;
            }
        }
        for i in self.irq_watchers[internal].clone() {
            self.update_irq_raw(i, value);
        }
    }

    fn deliver_strobe(&mut self, internal: InternalIdx, value: u128) {
        let value = value & mask(self.ir.internals[internal].shape().width());
        if value == 0 {
            return;
        }
        self.strobe_counts[internal] += 1;
        for d in self.monitor_watchers[internal].clone() {
            let (monitor_mode, copies, width) = match &self.ir.descriptors[d].behavior.detail {
                BehaviorDetail::Primitive(p) => (
                    p.monitor_mode,
                    self.ir.descriptors[d].fields.len(),
                    self.ir.descriptors[d].width,
                ),
                _ => continue,
            };
            let m = mask(width);
            match monitor_mode {
                MonitorMode::Increment => {
                    let mut wrapped = 0u128;
                    for i in 0..copies {
                        let hit = if copies > 1 { (value >> i) & 1 != 0 } else { true };
                        if !hit {
                            continue;
                        }
                        if self.fields[d][i].data == m {
                            self.fields[d][i].data = 0;
                            wrapped |= copy_mask(i);
                        } else {
                            self.fields[d][i].data += 1;
                        }
                    }
                    if wrapped != 0 {
                        self.emit_event(d, HookPurpose::Overflow, wrapped);
                    }
                    self.refresh_hooks(d);
                }
                MonitorMode::BitSet => {
                    let mut collided = 0u128;
                    for i in 0..copies {
                        let incoming = if copies > 1 { (value >> i) & 1 } else { value & m };
                        if incoming == 0 {
                            continue;
                        }
                        if self.fields[d][i].data & incoming != 0 {
                            collided |= copy_mask(i);
                        }
                        self.fields[d][i].data |= incoming;
                    }
                    if collided != 0 {
                        self.emit_event(d, HookPurpose::BitOverflow, collided);
                    }
                    self.refresh_hooks(d);
                }
                // Level monitors only react to level changes.
                MonitorMode::Status => (),
            }
        }
        for i in self.irq_watchers[internal].clone() {
            // Strobed request sources always feed a latching flag.
            let enab = self.irqs[i].enab;
            self.irqs[i].flag |= value & enab;
        }
    }

    /// Pulses or levels emitted by a descriptor's hooks of one purpose.
    fn emit_event(&mut self, d: usize, purpose: HookPurpose, value: u128) {
        let hooks: Vec<InternalIdx> = self.ir.descriptors[d]
            .behavior
            .internals
            .iter()
            .filter(|hook| hook.purpose == purpose)
            .map(|hook| hook.internal)
            .collect();
        for internal in hooks {
            self.deliver_strobe(internal, value);
        }
    }

    /// Re-derives the level-driven hook signals of a descriptor from its
    /// current state: `drive` follows the data, `full`/`empty` follow the
    /// valid flags.
    fn refresh_hooks(&mut self, d: usize) {
        let hooks: Vec<(HookPurpose, InternalIdx)> = self.ir.descriptors[d]
            .behavior
            .internals
            .iter()
            .map(|hook| (hook.purpose, hook.internal))
            .collect();
        if hooks.is_empty() {
            return;
        }
        let width = self.ir.descriptors[d].width;
        let copies = self.fields[d].len();
        for (purpose, internal) in hooks {
            match purpose {
                HookPurpose::Drive => {
                    if !self.ir.internals[internal].is_strobe() {
                        let value = self.fields[d][0].data & mask(width);
                        self.set_level(internal, value);
                    }
                }
                HookPurpose::Full | HookPurpose::Empty => {
                    let mut bits = 0u128;
                    for (i, state) in self.fields[d].iter().enumerate() {
                        if state.valid {
                            bits |= copy_mask(i);
                        }
                    }
                    let m = mask(copies as u32);
                    let value = if purpose == HookPurpose::Full {
                        bits
                    } else {
                        !bits & m
                    };
                    self.set_level(internal, value);
                }
                _ => (),
            }
        }
    }

    // ------------------------------------------------------------------
    // Interrupts
    // ------------------------------------------------------------------

    fn irq_named(&self, name: &str) -> Result<usize> {
        self.irq_index
            .get(&name.to_ascii_lowercase())
            .copied()
            .ok_or_else(|| Error::config(format!("unknown interrupt `{name}`")))
    }

    /// Drives the external request input of an interrupt that has no
    /// internal source.
    pub fn set_irq_input(&mut self, interrupt: &str, value: u128) -> Result<()> {
        let i = self.irq_named(interrupt)?;
        if self.ir.interrupts[i].source().is_some() {
            return Err(Error::config(format!(
                "interrupt `{interrupt}` is requested by an internal signal"
            )));
        }
        self.update_irq_raw(i, value);
        Ok(())
    }

    /// The outgoing IRQ line: the OR of all unmasked flags.
    pub fn irq(&self) -> bool {
        self.ir
            .interrupts
            .iter()
            .zip(&self.irqs)
            .any(|(interrupt, state)| state.flag & state.umsk & mask(interrupt.width()) != 0)
    }

    /// Current flag bits of one interrupt.
    pub fn irq_flag(&self, interrupt: &str) -> Result<u128> {
        Ok(self.irqs[self.irq_named(interrupt)?].flag)
    }

    /// Whether one interrupt contributes to the IRQ line.
    pub fn irq_pending(&self, interrupt: &str) -> Result<bool> {
        let i = self.irq_named(interrupt)?;
        Ok(self.irqs[i].flag & self.irqs[i].umsk != 0)
    }

    fn update_irq_raw(&mut self, i: usize, raw: u128) {
        let interrupt = &self.ir.interrupts[i];
        let m = mask(interrupt.width());
        let active = interrupt.active();
        let latches = interrupt.latches();
        let state = &mut self.irqs[i];
        let previous = state.raw;
        state.raw = raw & m;
        let level = match active {
            ActiveLevel::High => state.raw,
            ActiveLevel::Low => !state.raw & m,
            _ => 0,
        };
        let pulse = match active {
            ActiveLevel::Rising => state.raw & !previous,
            ActiveLevel::Falling => !state.raw & previous & m,
            ActiveLevel::Edge => state.raw ^ previous,
            _ => 0,
        };
        if latches {
            state.flag |= (level | pulse) & state.enab;
        } else {
            state.flag = level & state.enab;
        }
    }

    /// Re-evaluates one interrupt after its enable or flag registers were
    /// touched: non-latching flags follow the enabled request, latching
    /// ones pick up a still-asserted level.
    fn recompute_irq(&mut self, i: usize) {
        let raw = self.irqs[i].raw;
        self.update_irq_raw(i, raw);
    }
}
