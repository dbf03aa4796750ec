// License below.
//! Implements the barrel shifter of the ARM7TDMI.
//!
//! The shifter sits in front of the ALU's second operand and
//! produces its own carry-out, which the logical S-bit
//! instructions consume. The edge-case rules are:
//!
//! ```text
//! LSL   0   = Result = Rm, carry = old C
//! LSL(1,31) = Result shifted, carry = last bit shifted out
//! LSL  32   = Result of 0, carry = bit 0 of Rm
//! LSL >32   = Result of 0, carry = 0
//! LSR  32   = Result of 0, carry = bit 31 of Rm
//! LSR >32   = Result of 0, carry = 0
//! ASR >=32  = Result = sign fill of Rm, carry = bit 31 of Rm
//! ROR  32   = Result = Rm, carry = bit 31 of Rm
//! ROR >32   = Reduce by 32 until the amount is in 1..=32
//! ROR   0   = RRX (immediate form only)
//! Shift by register value 0 = no-op, carry = old C
//! ```
//!
//! Immediate encodings re-purpose an amount of 0: `LSR #0` and
//! `ASR #0` mean a shift by 32, `ROR #0` means RRX. The decoder
//! in `Arm7Core::decode_shift` applies those re-encodings; the
//! functions here take the literal amount.
#![warn(missing_docs)]

use super::Arm7Core;

/// Logical shift left with carry-out.
pub fn lsl(rm: u32, amount: u32, carry: bool) -> (u32, bool) {
    match amount {
        0 => (rm, carry),
        1..=31 => (rm << amount, 0 != (rm >> (32 - amount)) & 1),
        32 => (0, 0 != rm & 1),
        _ => (0, false),
    }
}

/// Logical shift right with carry-out.
pub fn lsr(rm: u32, amount: u32, carry: bool) -> (u32, bool) {
    match amount {
        0 => (rm, carry),
        1..=31 => (rm >> amount, 0 != (rm >> (amount - 1)) & 1),
        32 => (0, 0 != rm >> 31),
        _ => (0, false),
    }
}

/// Arithmetic shift right with carry-out.
pub fn asr(rm: u32, amount: u32, carry: bool) -> (u32, bool) {
    match amount {
        0 => (rm, carry),
        1..=31 => (((rm as i32) >> amount) as u32, 0 != (rm >> (amount - 1)) & 1),
        _ => (((rm as i32) >> 31) as u32, 0 != rm >> 31),
    }
}

/// Rotate right with carry-out.
///
/// Amounts above 32 reduce modulo 32 with 32 staying 32, so a
/// full rotation returns `rm` with carry = bit 31.
pub fn ror(rm: u32, amount: u32, carry: bool) -> (u32, bool) {
    if amount == 0 { return (rm, carry); }
    let k = ((amount - 1) & 31) + 1;
    (rm.rotate_right(k & 31), 0 != (rm >> (k - 1)) & 1)
}

/// Rotate right extended: a 33-bit rotate through the carry flag.
pub fn rrx(rm: u32, carry: bool) -> (u32, bool) {
    (((carry as u32) << 31) | (rm >> 1), 0 != rm & 1)
}

impl Arm7Core {
    /// Decodes an Op2-style shifted-register field.
    ///
    /// Covers both amount sources: a 5-bit immediate, or the low
    /// byte of a register. When the amount comes from a register
    /// and `Rm` is the PC, the PC reads 12 bytes ahead instead
    /// of 8.
    ///
    /// # Params
    /// - `raw`: The raw instruction; the low 12 bits are the shift field.
    /// - `pc`: Address of the current instruction.
    ///
    /// # Returns
    /// - `.0`: The shifted operand.
    /// - `.1`: The shifter carry-out.
    pub(crate) fn decode_shift(&self, raw: u32, pc: u32) -> (u32, bool) {
        let carry = self.regs.cpsr().C();
        let by_register = 0 != (raw & 0x10);
        let rm_index = (raw & 0x0F) as usize;
        let rm = if rm_index == Arm7Core::PC {
            pc.wrapping_add(if by_register { 12 } else { 8 })
        } else {
            self.regs.get(rm_index)
        };
        let ty = (raw >> 5) & 0b11;

        if by_register {
            // Only the bottom byte of Rs takes part.
            let amount = self.regs.get(((raw >> 8) & 0x0F) as usize) & 0xFF;
            match ty {
                0 => lsl(rm, amount, carry),
                1 => lsr(rm, amount, carry),
                2 => asr(rm, amount, carry),
                _ => ror(rm, amount, carry),
            }
        } else {
            let imm = (raw >> 7) & 0b1_1111;
            match ty {
                0 => lsl(rm, imm, carry),
                1 => lsr(rm, if imm == 0 { 32 } else { imm }, carry),
                2 => asr(rm, if imm == 0 { 32 } else { imm }, carry),
                3 if imm == 0 => rrx(rm, carry),
                _ => ror(rm, imm, carry),
            }
        }
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
