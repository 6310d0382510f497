// Licensed under the Apache-2.0 license

//! Deferral tags and the outstanding-request FIFO.
//!
//! A register that defers an access acknowledges the bus request without
//! producing the response; the response comes later, after further requests
//! may already have been accepted. Each deferring register gets a tag per
//! direction. When an access is deferred its tag is pushed into a FIFO
//! together with the request context, and responses are completed strictly
//! in FIFO order.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::register::LogicalRegister;

/// Tag usage summary for one register file, per direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct DeferTagInfo {
    pub read_count: u32,
    /// Bits needed to tell read tags apart; 0 when at most one register
    /// defers reads.
    pub read_width: u32,
    pub write_count: u32,
    pub write_width: u32,
}

impl DeferTagInfo {
    pub fn defers_reads(&self) -> bool {
        self.read_count > 0
    }

    pub fn defers_writes(&self) -> bool {
        self.write_count > 0
    }
}

/// Hands out read and write tags to the registers that defer accesses, in
/// register (address) order.
pub fn assign_tags(registers: &mut [LogicalRegister]) -> DeferTagInfo {
    let mut read_count = 0;
    let mut write_count = 0;
    for register in registers {
        if register.read.map(|caps| caps.deferring).unwrap_or(false) {
            register.read_tag = Some(read_count);
            read_count += 1;
        }
        if register.write.map(|caps| caps.deferring).unwrap_or(false) {
            register.write_tag = Some(write_count);
            write_count += 1;
        }
    }
    DeferTagInfo {
        read_count,
        read_width: tag_width(read_count),
        write_count,
        write_width: tag_width(write_count),
    }
}

/// Bits needed to represent `count` distinct tags.
fn tag_width(count: u32) -> u32 {
    match count {
        0 | 1 => 0,
        _ => u32::BITS - (count - 1).leading_zeros(),
    }
}

/// Context stored for one outstanding access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct DeferEntry {
    /// Tag of the register that deferred the access.
    pub tag: u32,
    /// Subaddress captured at request time.
    pub subaddress: u32,
    /// Protection code of the requesting master.
    pub prot: u8,
}

/// Order bookkeeping for outstanding accesses in one direction.
///
/// The bus model stalls new requests while the FIFO is full, so a push into
/// a full FIFO cannot happen on a correct bus. It is still checked; hitting
/// it means the invariant was broken, not that the configuration is wrong.
#[derive(Clone, Debug)]
pub struct DeferFifo {
    capacity: usize,
    entries: VecDeque<DeferEntry>,
}

impl DeferFifo {
    /// Creates a FIFO holding up to `max_outstanding` entries.
    pub fn new(max_outstanding: u32) -> DeferFifo {
        DeferFifo {
            capacity: max_outstanding as usize,
            entries: VecDeque::with_capacity(max_outstanding as usize),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn push(&mut self, entry: DeferEntry) -> Result<()> {
        if self.is_full() {
            return Err(Error::capacity(format!(
                "defer FIFO overflow: more than {} outstanding accesses",
                self.capacity
            )));
        }
        self.entries.push_back(entry);
        Ok(())
    }

    /// The entry whose response must be completed next.
    pub fn front(&self) -> Option<&DeferEntry> {
        self.entries.front()
    }

    pub fn pop(&mut self) -> Option<DeferEntry> {
        self.entries.pop_front()
    }
}
