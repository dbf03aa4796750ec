// License below.
//! Implements the ARM7TDMI interpreter core.
//!
//! The core is a bit-exact state machine over the banked register
//! file. One [`Arm7Core::step`] resolves pending exceptions,
//! fetches the word at PC, evaluates the condition field and
//! dispatches to a handler; the host keeps calling `step()` (or
//! [`Arm7Core::run`]) until the instruction budget runs out.
//!
//! Everything the core needs from the surrounding system comes
//! through two owned trait objects: a [`Bus`] for the typed
//! memory accessors and a [`Coprocessor`] for CDP/MRC/MCR/LDC/STC
//! and the control register the exception logic consults.
#![warn(missing_docs)]

use crate::bus::{Bus, BusFault};
use crate::coproc::Coprocessor;

pub use self::bank::{RegisterBank, NUM_PHYSICAL_REGISTERS};
pub use self::condition::Condition;
pub use self::exception::{Exception, IrqLine};
pub use self::insn::{ArmInsn, ArmOp};
pub use self::psr::{Mode, Psr, State};

pub mod alu;
pub mod bank;
pub mod condition;
pub mod exception;
pub mod insn;
pub mod psr;
pub mod shifter;

mod display;
mod exec;

/// Decides how the PC moves on after a handler ran.
pub(crate) enum Step {
    #[doc = "Advance PC to the next instruction."]          Advance,
    #[doc = "PC was written; re-read it at the next fetch."] Branched,
}

/// A snapshot of everything the core persists: the physical
/// register array and the six pending exception flags.
///
/// Hosts serialize this however they like; no wire format is
/// dictated.
#[derive(Debug, Clone)]
pub struct CoreState {
    /// The 37 physical machine words of the register file.
    pub registers: [u32; NUM_PHYSICAL_REGISTERS],
    /// Pending IRQ, FIQ, data abort, prefetch abort, undefined,
    /// SWI — in that order.
    pub pending: [bool; 6],
}

/// Implements the logic needed to emulate an ARM7TDMI CPU core.
pub struct Arm7Core {
    // Register file, including CPSR and the banked SPSRs.
    regs: RegisterBank,

    // Pending exception flags, observed at step boundaries.
    pending_irq: bool,
    pending_fiq: bool,
    pending_abt_d: bool,
    pending_abt_p: bool,
    pending_und: bool,
    pending_swi: bool,

    // Instruction budget. `run` loops until this drops to zero.
    icount: i64,

    // Connected host devices.
    bus: Box<dyn Bus>,
    coproc: Box<dyn Coprocessor>,
}

impl Arm7Core {
    /// Register index for the stack pointer.
    pub const SP: usize = 13;

    /// Register index for the link register.
    pub const LR: usize = 14;

    /// Register index for the program counter.
    ///
    /// While a handler runs, R15 holds the address of the current
    /// instruction; reading it as an operand yields that address
    /// plus 8 (plus 12 under a register-specified shift amount).
    pub const PC: usize = 15;

    /// Cycles charged for taking an exception.
    const EXCEPTION_CYCLES: i64 = 3;

    /// Creates a new core wired to the given memory interface and
    /// coprocessor, in the reset state.
    pub fn new(bus: Box<dyn Bus>, coproc: Box<dyn Coprocessor>) -> Arm7Core {
        Arm7Core {
            regs: RegisterBank::new(),

            pending_irq: false,
            pending_fiq: false,
            pending_abt_d: false,
            pending_abt_p: false,
            pending_und: false,
            pending_swi: false,

            icount: 0,

            bus,
            coproc,
        }
    }

    /// Resets the CPU.
    ///
    /// All registers are zeroed, pending exceptions dropped, and
    /// the core starts over in SVC mode with IRQ and FIQ masked,
    /// ARM state, PC at the reset vector.
    pub fn reset(&mut self) {
        self.regs = RegisterBank::new();
        self.regs.set_cpsr(Psr::default());
        self.regs.set(Arm7Core::PC, Exception::Reset.vector_address());

        self.pending_irq = false;
        self.pending_fiq = false;
        self.pending_abt_d = false;
        self.pending_abt_p = false;
        self.pending_und = false;
        self.pending_swi = false;
    }

    /// The register file.
    pub fn regs(&self) -> &RegisterBank { &self.regs }

    /// The register file, mutable.
    pub fn regs_mut(&mut self) -> &mut RegisterBank { &mut self.regs }

    /// The connected memory interface.
    pub fn bus_mut(&mut self) -> &mut dyn Bus { &mut *self.bus }

    /// The connected coprocessor.
    pub fn coproc_mut(&mut self) -> &mut dyn Coprocessor { &mut *self.coproc }

    /// The remaining instruction budget.
    pub fn budget(&self) -> i64 { self.icount }

    /// Replaces the instruction budget.
    pub fn set_budget(&mut self, cycles: i64) { self.icount = cycles; }

    /// Asserts or clears one of the level-triggered input lines.
    ///
    /// Only a pending flag is written here, so calling this from
    /// within a memory callback is safe; the core looks at the
    /// flags at the next `step()` boundary.
    pub fn set_irq_line(&mut self, line: IrqLine, state: bool) {
        match line {
            IrqLine::Irq           => self.pending_irq = state,
            IrqLine::Fiq           => self.pending_fiq = state,
            IrqLine::DataAbort     => self.pending_abt_d = state,
            IrqLine::PrefetchAbort => self.pending_abt_p = state,
            IrqLine::Undefined     => self.pending_und = state,
        }
    }

    /// Reads back one of the input lines' pending flags.
    pub fn is_pending(&self, line: IrqLine) -> bool {
        match line {
            IrqLine::Irq           => self.pending_irq,
            IrqLine::Fiq           => self.pending_fiq,
            IrqLine::DataAbort     => self.pending_abt_d,
            IrqLine::PrefetchAbort => self.pending_abt_p,
            IrqLine::Undefined     => self.pending_und,
        }
    }

    /// Captures the persistent state for host save-state code.
    pub fn capture(&self) -> CoreState {
        CoreState {
            registers: self.regs.raw(),
            pending: [
                self.pending_irq, self.pending_fiq,
                self.pending_abt_d, self.pending_abt_p,
                self.pending_und, self.pending_swi,
            ],
        }
    }

    /// Restores a previously captured state.
    pub fn restore(&mut self, state: &CoreState) {
        self.regs.load_raw(&state.registers);
        self.pending_irq = state.pending[0];
        self.pending_fiq = state.pending[1];
        self.pending_abt_d = state.pending[2];
        self.pending_abt_p = state.pending[3];
        self.pending_und = state.pending[4];
        self.pending_swi = state.pending[5];
    }

    /// Executes one step: at most one exception entry, or one
    /// instruction.
    ///
    /// # Panics
    /// Host-fatal conditions panic after logging a diagnostic:
    /// executing with the T bit set (the Thumb dispatch layer is
    /// the surrounding system's job) and 26-bit mode entry.
    pub fn step(&mut self) {
        if self.check_exceptions() {
            self.charge(Arm7Core::EXCEPTION_CYCLES);
            return;
        }

        let cpsr = self.regs.cpsr();
        let pc = self.regs.get(Arm7Core::PC);
        if cpsr.state() == State::Thumb {
            error!("PC {:#010X}: T bit set, but no Thumb dispatch layer is wired up.", pc);
            panic!("Aborting: cannot execute in Thumb state.");
        }

        // Fetch.
        let raw = match self.bus.read32(pc) {
            Ok(x) => x,
            Err(fault) => {
                debug!("Opcode fetch aborted: {}.", fault);
                self.pending_abt_p = true;
                self.charge(1);
                return;
            },
        };

        // Decode and dispatch. A failed condition skips the
        // instruction but still burns budget.
        let insn = ArmInsn::decode(raw);
        if !insn.condition().passes(cpsr) {
            self.regs.set(Arm7Core::PC, pc.wrapping_add(4));
            self.charge(1);
            return;
        }

        match self.execute(insn, pc) {
            Step::Advance  => self.regs.set(Arm7Core::PC, pc.wrapping_add(4)),
            Step::Branched => {},
        }
    }

    /// Runs until the given instruction budget is exhausted.
    ///
    /// # Returns
    /// The budget remainder, zero or negative: the last
    /// instruction always completes.
    pub fn run(&mut self, budget: i64) -> i64 {
        self.icount = budget;
        while self.icount > 0 {
            self.step();
        }
        self.icount
    }

    /// Resolves pending exceptions into at most one entry.
    ///
    /// Priority order: data abort, FIQ (unless masked), IRQ
    /// (unless masked), prefetch abort, undefined, SWI. The
    /// software-raised flags clear on entry; the interrupt lines
    /// are level-triggered and stay up until the host drops them.
    fn check_exceptions(&mut self) -> bool {
        let cpsr = self.regs.cpsr();
        if self.pending_abt_d {
            self.pending_abt_d = false;
            self.enter_exception(Exception::DataAbort);
        } else if self.pending_fiq && !cpsr.fiq_disabled() {
            self.enter_exception(Exception::FastInterrupt);
        } else if self.pending_irq && !cpsr.irq_disabled() {
            self.enter_exception(Exception::NormalInterrupt);
        } else if self.pending_abt_p {
            self.pending_abt_p = false;
            self.enter_exception(Exception::PrefetchAbort);
        } else if self.pending_und {
            self.pending_und = false;
            self.enter_exception(Exception::UndefinedInstruction);
        } else if self.pending_swi {
            self.pending_swi = false;
            self.enter_exception(Exception::SoftwareInterrupt);
        } else {
            return false;
        }
        true
    }

    /// Performs an exception entry: banks R14 and SPSR, switches
    /// mode, masks interrupts, clears T and vectors the PC.
    pub fn enter_exception(&mut self, ex: Exception) {
        let cpsr = self.regs.cpsr();
        if 0 == (cpsr.0 & 0x10) {
            error!("CPSR {:#010X}: exception entry in a 26-bit mode.", cpsr.0);
            panic!("Aborting: 26-bit compatibility mode is unsupported.");
        }

        let mode = ex.mode_on_entry();
        if ex != Exception::Reset {
            let base = self.regs.get(Arm7Core::PC);
            self.regs.set_banked(mode, Arm7Core::LR, base.wrapping_add(ex.return_offset(cpsr.state())));
            self.regs.set_spsr_of(mode, cpsr);
        }

        self.regs.switch_mode(mode);
        let mut new_cpsr = self.regs.cpsr();
        new_cpsr.disable_irq();
        if ex.disable_fiq_on_entry() {
            new_cpsr.disable_fiq();
        }
        new_cpsr.set_state(State::Arm);
        self.regs.set_cpsr(new_cpsr);

        let mut vector = ex.vector_address();
        let ctrl = self.coproc.control();
        if ctrl.mmu_enabled() && ctrl.high_vectors() {
            vector |= 0xFFFF_0000;
        }
        self.regs.set(Arm7Core::PC, vector);
    }

    /// Charges an instruction's approximate cycle cost against
    /// the budget.
    ///
    /// Only monotonic decrement and relative ordering are
    /// promised. Every charge happens through this single point;
    /// the per-class costs are:
    ///
    /// ```text
    /// ALU                1  (+1 register-specified shift, +2 PC written)
    /// MUL / MLA          1+m / 2+m    with m = 1..4 by magnitude of Rs
    /// MULL / MLAL        2+m / 3+m
    /// LDR and relatives  3  (+2 for a PC destination)
    /// STR and relatives  2
    /// LDRD / STRD        4 / 3
    /// SWP                4
    /// LDM                n+2  (+2 with PC in the list)
    /// STM                n+1
    /// B / BL / BX        3
    /// MRS / MSR          1
    /// coprocessor        2
    /// condition failed   1
    /// exception entry    3
    /// ```
    pub(crate) fn charge(&mut self, cycles: i64) {
        self.icount -= cycles;
    }

    // The memory access adapters. A faulting accessor leaves a
    // pending data abort behind; loads then yield 0 and the
    // handlers know not to commit anything.

    pub(crate) fn load8(&mut self, addr: u32) -> u32 {
        match self.bus.read8(addr) {
            Ok(x) => x as u32,
            Err(fault) => { self.data_abort(fault); 0 },
        }
    }

    pub(crate) fn load16(&mut self, addr: u32) -> u32 {
        if 0 != (addr & 1) {
            warn!("Reading misaligned halfword address {:#010X}.", addr);
        }
        match self.bus.read16(addr) {
            Ok(x) => x as u32,
            Err(fault) => { self.data_abort(fault); 0 },
        }
    }

    pub(crate) fn load32(&mut self, addr: u32) -> u32 {
        match self.bus.read32(addr) {
            Ok(x) => x,
            Err(fault) => { self.data_abort(fault); 0 },
        }
    }

    /// Word load with the ARMv4 unaligned semantics: the aligned
    /// word rotated right by 8 bits per byte of misalignment.
    pub(crate) fn load32_rotated(&mut self, addr: u32) -> u32 {
        self.load32(addr).rotate_right(8 * (addr & 3))
    }

    pub(crate) fn store8(&mut self, addr: u32, data: u8) {
        if let Err(fault) = self.bus.write8(addr, data) {
            self.data_abort(fault);
        }
    }

    pub(crate) fn store16(&mut self, addr: u32, data: u16) {
        if 0 != (addr & 1) {
            warn!("Writing misaligned halfword address {:#010X}.", addr);
        }
        if let Err(fault) = self.bus.write16(addr, data) {
            self.data_abort(fault);
        }
    }

    pub(crate) fn store32(&mut self, addr: u32, data: u32) {
        if let Err(fault) = self.bus.write32(addr, data) {
            self.data_abort(fault);
        }
    }

    fn data_abort(&mut self, fault: BusFault) {
        debug!("Data access aborted: {}.", fault);
        self.pending_abt_d = true;
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
