// License below.
//! Implements the 4-bit condition field of an ARM instruction.
#![warn(missing_docs)]

use std::mem;

use super::psr::Psr;

/// The condition field of an ARM instruction.
#[derive(Debug, PartialEq, Clone, Copy)]
#[repr(u8)]
pub enum Condition {
    #[doc = "Z set. EQual."]                                       EQ = 0b0000,
    #[doc = "Z clear. Not Equal."]                                 NE = 0b0001,
    #[doc = "C set. Unsigned Higher or Same."]                     HS = 0b0010,
    #[doc = "C clear. Unsigned LOwer."]                            LO = 0b0011,
    #[doc = "N set. MInus, i.e. negative."]                        MI = 0b0100,
    #[doc = "N clear. PLus, i.e. positive or zero."]               PL = 0b0101,
    #[doc = "V Set. Overflow."]                                    VS = 0b0110,
    #[doc = "V Clear. No Overflow."]                               VC = 0b0111,
    #[doc = "C set and Z clear. Unsigned HIgher."]                 HI = 0b1000,
    #[doc = "C clear or Z set. Unsigned Lower or Same."]           LS = 0b1001,
    #[doc = "N equals V. Greater than or Equal to."]               GE = 0b1010,
    #[doc = "N distinct from V. Less Than."]                       LT = 0b1011,
    #[doc = "Z clear and N equals V. Greater Than."]               GT = 0b1100,
    #[doc = "Z set or N distinct from V. Less than or Equal to."]  LE = 0b1101,
    #[doc = "ALways execute this instruction, i.e. no condition."] AL = 0b1110,
    #[doc = "Reserved. NeVer executes on ARMv4."]                  NV = 0b1111,
}

impl Condition {
    /// Decodes a condition from the top four bits of an instruction.
    pub fn from_bits(bits: u32) -> Condition {
        let c = (bits & 0b1111) as u8;
        unsafe { mem::transmute(c) }
    }

    /// Evaluates the condition against the CPSR flags.
    ///
    /// `NV` never passes. A skipped instruction advances PC and
    /// burns budget, nothing else.
    pub fn passes(self, cpsr: Psr) -> bool {
        match self {
            Condition::EQ =>  cpsr.Z(),
            Condition::NE => !cpsr.Z(),
            Condition::HS =>  cpsr.C(),
            Condition::LO => !cpsr.C(),
            Condition::MI =>  cpsr.N(),
            Condition::PL => !cpsr.N(),
            Condition::VS =>  cpsr.V(),
            Condition::VC => !cpsr.V(),
            Condition::HI =>  cpsr.C() & !cpsr.Z(),
            Condition::LS => !cpsr.C() |  cpsr.Z(),
            Condition::GE =>  cpsr.N() == cpsr.V(),
            Condition::LT =>  cpsr.N() != cpsr.V(),
            Condition::GT => !cpsr.Z() & (cpsr.N() == cpsr.V()),
            Condition::LE =>  cpsr.Z() | (cpsr.N() != cpsr.V()),
            Condition::AL => true,
            Condition::NV => false,
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
