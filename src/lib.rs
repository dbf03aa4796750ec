// License below.
//! Arm7rs is a portable ARM7TDMI interpreter core.
//!
//! The crate emulates the 32-bit ARM instruction set of the
//! ARM7TDMI (ARMv4T): the banked register file, processor modes,
//! CPSR/SPSR flag semantics, the barrel shifter, and prioritized
//! exception entry. The surrounding system supplies memory and
//! coprocessors through the [`Bus`] and [`Coprocessor`] traits
//! and drives execution with [`Arm7Core::step`] or
//! [`Arm7Core::run`].
//!
//! ```no_run
//! use arm7rs::{Arm7Core, NoCoprocessor, Ram};
//!
//! let mut cpu = Arm7Core::new(Box::new(Ram::new(0x1_0000)), Box::new(NoCoprocessor));
//! cpu.reset();
//! cpu.run(1_000_000);
//! ```
//!
//! Thumb (16-bit) decoding is deliberately not part of this
//! crate; a surrounding system that wants it layers its own
//! decoder over the same core state.
#![warn(missing_docs)]

#[macro_use]
extern crate log;

pub use crate::bus::{Bus, BusFault, Ram};
pub use crate::coproc::{Coprocessor, CpControl, CpFault, NoCoprocessor};
pub use crate::cpu::{Arm7Core, CoreState, Exception, IrqLine, Mode, Psr, RegisterBank, State};

pub mod bus;
pub mod coproc;
pub mod cpu;
pub mod logger;


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
