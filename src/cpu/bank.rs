// License below.
//! Implements the banked register file of the ARM7TDMI.
//!
//! The CPU owns 37 physical machine words which the seven execution
//! modes project 16 visible registers, CPSR, and an optional SPSR
//! onto:
//!
//! ```text
//! USR/SYS  FIQ       IRQ       SVC       ABT       UND
//! R0..R7   R0..R7    R0..R7    R0..R7    R0..R7    R0..R7
//! R8..R12  R8_fiq..  R8..R12   R8..R12   R8..R12   R8..R12
//! R13,R14  R13_fiq.. R13_irq.. R13_svc.. R13_abt.. R13_und..
//! R15      R15       R15       R15       R15       R15
//! CPSR     CPSR      CPSR      CPSR      CPSR      CPSR
//! --       SPSR_fiq  SPSR_irq  SPSR_svc  SPSR_abt  SPSR_und
//! ```
//!
//! Projection is resolved on every access through a constant table,
//! so a mode switch only has to rewrite the mode bits of CPSR.
#![warn(missing_docs)]

use super::psr::{Mode, Psr};

/// Number of physical machine words backing the register file.
pub const NUM_PHYSICAL_REGISTERS: usize = 37;

// Physical slots. 0..=15 are the user-bank R0..R15.
const CPSR_SLOT: usize = 16;
// 17..=23 FIQ R8..R14, 24 SPSR_fiq, then R13/R14/SPSR triplets
// for IRQ, SVC, ABT and UND.

// Maps (mode, logical register) to a physical slot. Rows are
// indexed by the `Mode` discriminants.
const BANK: [[usize; 16]; 7] = [
    [0, 1, 2, 3, 4, 5, 6, 7,  8,  9, 10, 11, 12, 13, 14, 15], // USR
    [0, 1, 2, 3, 4, 5, 6, 7, 17, 18, 19, 20, 21, 22, 23, 15], // FIQ
    [0, 1, 2, 3, 4, 5, 6, 7,  8,  9, 10, 11, 12, 25, 26, 15], // IRQ
    [0, 1, 2, 3, 4, 5, 6, 7,  8,  9, 10, 11, 12, 28, 29, 15], // SVC
    [0, 1, 2, 3, 4, 5, 6, 7,  8,  9, 10, 11, 12, 31, 32, 15], // ABT
    [0, 1, 2, 3, 4, 5, 6, 7,  8,  9, 10, 11, 12, 34, 35, 15], // UND
    [0, 1, 2, 3, 4, 5, 6, 7,  8,  9, 10, 11, 12, 13, 14, 15], // SYS
];

// SPSR slot per mode. USR and SYS have none and alias CPSR,
// which `set_spsr_of` never writes through.
const SPSR_SLOT: [usize; 7] = [CPSR_SLOT, 24, 27, 30, 33, 36, CPSR_SLOT];

/// The physical register file and its mode projection.
#[derive(Debug, Clone)]
pub struct RegisterBank {
    r: [u32; NUM_PHYSICAL_REGISTERS],
}

impl RegisterBank {
    /// Creates a zeroed register file in the reset state.
    pub fn new() -> RegisterBank {
        let mut bank = RegisterBank { r: [0; NUM_PHYSICAL_REGISTERS] };
        bank.set_cpsr(Psr::default());
        bank
    }

    /// Reads a logical register in the current mode.
    pub fn get(&self, r: usize) -> u32 {
        self.get_banked(self.cpsr().mode(), r)
    }

    /// Writes a logical register in the current mode.
    pub fn set(&mut self, r: usize, v: u32) {
        self.set_banked(self.cpsr().mode(), r, v);
    }

    /// Reads a logical register as seen by the given mode.
    pub fn get_banked(&self, mode: Mode, r: usize) -> u32 {
        self.r[BANK[mode as usize][r]]
    }

    /// Writes a logical register as seen by the given mode.
    pub fn set_banked(&mut self, mode: Mode, r: usize, v: u32) {
        self.r[BANK[mode as usize][r]] = v;
    }

    /// Reads CPSR.
    pub fn cpsr(&self) -> Psr {
        Psr(self.r[CPSR_SLOT])
    }

    /// Replaces CPSR.
    ///
    /// Mode bits take effect immediately: the projection reads
    /// CPSR on every register access.
    pub fn set_cpsr(&mut self, psr: Psr) {
        self.r[CPSR_SLOT] = psr.0;
    }

    /// Reads the current mode's SPSR.
    ///
    /// USR and SYS have no SPSR; the read yields CPSR instead.
    pub fn spsr(&self) -> Psr {
        self.spsr_of(self.cpsr().mode())
    }

    /// Reads the given mode's SPSR, or CPSR for USR/SYS.
    pub fn spsr_of(&self, mode: Mode) -> Psr {
        Psr(self.r[SPSR_SLOT[mode as usize]])
    }

    /// Writes the current mode's SPSR.
    ///
    /// Ignored in USR and SYS mode, which have none.
    pub fn set_spsr(&mut self, psr: Psr) {
        self.set_spsr_of(self.cpsr().mode(), psr);
    }

    /// Writes the given mode's SPSR. Ignored for USR/SYS.
    pub fn set_spsr_of(&mut self, mode: Mode, psr: Psr) {
        if mode.has_spsr() {
            self.r[SPSR_SLOT[mode as usize]] = psr.0;
        }
    }

    /// Switches the current mode.
    ///
    /// Physical storage is untouched; only CPSR[4:0] is rewritten.
    pub fn switch_mode(&mut self, mode: Mode) {
        let mut cpsr = self.cpsr();
        cpsr.set_mode(mode);
        self.set_cpsr(cpsr);
    }

    /// Copies out the raw physical register array.
    pub fn raw(&self) -> [u32; NUM_PHYSICAL_REGISTERS] {
        self.r
    }

    /// Overwrites the raw physical register array.
    pub fn load_raw(&mut self, raw: &[u32; NUM_PHYSICAL_REGISTERS]) {
        self.r = *raw;
    }
}

impl Default for RegisterBank {
    fn default() -> RegisterBank { RegisterBank::new() }
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
