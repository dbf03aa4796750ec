// License below.
//! Implements the exceptions of the ARM7TDMI and the external
//! interrupt lines that raise some of them.
#![warn(missing_docs)]

use super::psr::{Mode, State};

/// The level-triggered input signals a host may assert.
///
/// Each one only flips a pending flag; the core observes the
/// flags at the next `step()` boundary.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum IrqLine {
    #[doc = "Normal hardware interrupt request."] Irq,
    #[doc = "Fast hardware interrupt request."]   Fiq,
    #[doc = "Data abort signalled by the bus."]   DataAbort,
    #[doc = "Prefetch abort signalled by the bus."] PrefetchAbort,
    #[doc = "Undefined instruction trap."]        Undefined,
}

/// CPU exceptions.
///
/// The discriminants are laid out so that the vector address is
/// four times the discriminant; slot 5 is the reserved vector.
#[derive(Debug, PartialEq, Clone, Copy)]
#[repr(u8)]
pub enum Exception {
    #[doc = "Exception due to resetting the CPU."]                Reset = 0,
    #[doc = "Exception due to executing undefined instructions."] UndefinedInstruction = 1,
    #[doc = "Exception due to executing SWI."]                    SoftwareInterrupt = 2,
    #[doc = "Instruction prefetching aborted."]                   PrefetchAbort = 3,
    #[doc = "Data access aborted."]                               DataAbort = 4,
    #[doc = "Exception due to a normal hardware interrupt."]      NormalInterrupt = 6,
    #[doc = "Exception due to a fast hardware interrupt."]        FastInterrupt = 7,
}

impl Exception {
    /// Get the exception's priority.
    ///
    /// # Returns
    /// 1 = highest, 7 = lowest. At most one exception is taken
    /// per step, highest priority first.
    pub fn priority(self) -> u8 {
        match self {
            Exception::Reset                => 1,
            Exception::DataAbort            => 2,
            Exception::FastInterrupt        => 3,
            Exception::NormalInterrupt      => 4,
            Exception::PrefetchAbort        => 5,
            Exception::UndefinedInstruction => 6,
            Exception::SoftwareInterrupt    => 7,
        }
    }

    /// Get the exception's CPU mode on entry.
    pub fn mode_on_entry(self) -> Mode {
        match self {
            Exception::PrefetchAbort |
            Exception::DataAbort            => Mode::Abort,
            Exception::Reset |
            Exception::SoftwareInterrupt    => Mode::Supervisor,
            Exception::UndefinedInstruction => Mode::Undefined,
            Exception::NormalInterrupt      => Mode::Irq,
            Exception::FastInterrupt        => Mode::Fiq,
        }
    }

    /// Check whether fast interrupts should be masked on entry.
    #[inline(always)]
    pub fn disable_fiq_on_entry(self) -> bool {
        (self == Exception::Reset) | (self == Exception::FastInterrupt)
    }

    /// Get the exception vector address.
    ///
    /// High-vector relocation is applied by the caller, which
    /// knows the coprocessor control state.
    #[inline(always)]
    pub fn vector_address(self) -> u32 {
        (self as u8 as u32) * 4
    }

    /// The amount added to the next-fetch address to form the
    /// banked R14 on entry.
    ///
    /// At the step boundary R15 still addresses the causing
    /// instruction for prefetch aborts, undefined instructions
    /// and SWI, and the next instruction for everything else;
    /// adding 4 (2 in Thumb state for the two software-raised
    /// ones) reproduces the architectural link values.
    pub fn return_offset(self, state: State) -> u32 {
        match self {
            Exception::UndefinedInstruction |
            Exception::SoftwareInterrupt => if state == State::Thumb { 2 } else { 4 },
            _ => 4,
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
