// License below.
//! Provides the memory interface the core talks to, and a flat
//! RAM implementation of it for hosts and tests.
#![warn(missing_docs)]

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};

/// A memory fault reported by an accessor.
///
/// The core turns any fault into a pending data abort (or a
/// prefetch abort when it happens on an opcode fetch) and takes
/// the exception at the next step boundary.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct BusFault {
    /// The faulting address.
    pub address: u32,
}

impl fmt::Display for BusFault {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "bus fault at {:#010X}", self.address)
    }
}

/// The typed memory accessors a host wires up.
///
/// Addresses are 32-bit. `read32`/`write32` must deliver the word
/// at `addr & !3`; the core applies the ARM unaligned rotation
/// itself where the rules require it. Halfword accessors assume an
/// even address; an odd halfword access is architecturally
/// undefined.
pub trait Bus {
    /// Loads a byte.
    fn read8(&mut self, addr: u32) -> Result<u8, BusFault>;

    /// Loads a halfword from an even address.
    fn read16(&mut self, addr: u32) -> Result<u16, BusFault>;

    /// Loads the word containing `addr`.
    fn read32(&mut self, addr: u32) -> Result<u32, BusFault>;

    /// Stores a byte.
    fn write8(&mut self, addr: u32, data: u8) -> Result<(), BusFault>;

    /// Stores a halfword to an even address.
    fn write16(&mut self, addr: u32, data: u16) -> Result<(), BusFault>;

    /// Stores a word to `addr & !3`.
    fn write32(&mut self, addr: u32, data: u32) -> Result<(), BusFault>;
}

/// A flat little-endian memory block starting at address 0.
///
/// Accesses beyond the end fault, which doubles as a convenient
/// abort generator in tests.
pub struct Ram {
    bytes: Vec<u8>,
}

impl Ram {
    /// Creates a zero-filled RAM of the given byte length.
    pub fn new(len: u32) -> Ram {
        Ram { bytes: vec![0; len as usize] }
    }

    /// Copies a binary image into RAM at the given offset.
    pub fn load(&mut self, offset: u32, image: &[u8]) -> Result<(), BusFault> {
        let start = offset as usize;
        let end = start.checked_add(image.len()).ok_or(BusFault { address: offset })?;
        if end > self.bytes.len() {
            return Err(BusFault { address: offset });
        }
        self.bytes[start..end].copy_from_slice(image);
        Ok(())
    }

    /// The RAM's length in bytes.
    pub fn len(&self) -> u32 {
        self.bytes.len() as u32
    }

    /// Whether the RAM is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn check(&self, addr: u32, width: u32) -> Result<usize, BusFault> {
        let a = addr as usize;
        if a + width as usize > self.bytes.len() {
            Err(BusFault { address: addr })
        } else {
            Ok(a)
        }
    }
}

impl Bus for Ram {
    fn read8(&mut self, addr: u32) -> Result<u8, BusFault> {
        let a = self.check(addr, 1)?;
        Ok(self.bytes[a])
    }

    fn read16(&mut self, addr: u32) -> Result<u16, BusFault> {
        let a = self.check(addr & !1, 2)?;
        Ok(LittleEndian::read_u16(&self.bytes[a..a + 2]))
    }

    fn read32(&mut self, addr: u32) -> Result<u32, BusFault> {
        let a = self.check(addr & !3, 4)?;
        Ok(LittleEndian::read_u32(&self.bytes[a..a + 4]))
    }

    fn write8(&mut self, addr: u32, data: u8) -> Result<(), BusFault> {
        let a = self.check(addr, 1)?;
        self.bytes[a] = data;
        Ok(())
    }

    fn write16(&mut self, addr: u32, data: u16) -> Result<(), BusFault> {
        let a = self.check(addr & !1, 2)?;
        LittleEndian::write_u16(&mut self.bytes[a..a + 2], data);
        Ok(())
    }

    fn write32(&mut self, addr: u32, data: u32) -> Result<(), BusFault> {
        let a = self.check(addr & !3, 4)?;
        LittleEndian::write_u32(&mut self.bytes[a..a + 4], data);
        Ok(())
    }
}




/*
Licensed to the Apache Software Foundation (ASF) under one
or more contributor license agreements.  See the NOTICE file
distributed with this work for additional information
regarding copyright ownership.  The ASF licenses this file
to you under the Apache License, Version 2.0 (the
"License"); you may not use this file except in compliance
with the License.  You may obtain a copy of the License at

  http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing,
software distributed under the License is distributed on an
"AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
KIND, either express or implied.  See the License for the
specific language governing permissions and limitations
under the License.
*/
