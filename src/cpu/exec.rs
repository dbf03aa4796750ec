// License below.
//! Implements the execution handlers for the ARM instruction
//! classes and the dispatcher that routes a decoded instruction
//! to them.
#![warn(missing_docs)]

use super::{Arm7Core, Step};
use super::alu::{add_with_carry, sub_with_carry, DpOp};
use super::insn::{ArmInsn, ArmOp, HalfwordOp};
use super::psr::{Mode, Psr, State};

impl Arm7Core {
    /// Executes a single decoded instruction whose condition
    /// already passed.
    ///
    /// # Params
    /// - `insn`: The decoded instruction.
    /// - `pc`: The address it was fetched from.
    ///
    /// # Returns
    /// Whether the PC should advance or was written.
    pub(crate) fn execute(&mut self, insn: ArmInsn, pc: u32) -> Step {
        match insn.op() {
            ArmOp::Bx                 => self.execute_bx(insn, pc),
            ArmOp::Branch             => self.execute_branch(insn, pc),
            ArmOp::Multiply           => self.execute_multiply(insn),
            ArmOp::MultiplyLong       => self.execute_multiply_long(insn),
            ArmOp::Mrs                => self.execute_mrs(insn),
            ArmOp::Msr                => self.execute_msr(insn),
            ArmOp::DataProcessing     => self.execute_data_processing(insn, pc),
            ArmOp::SingleTransfer     => self.execute_single_transfer(insn, pc),
            ArmOp::HalfwordTransfer   => self.execute_halfword_transfer(insn, pc),
            ArmOp::BlockTransfer      => self.execute_block_transfer(insn, pc),
            ArmOp::Swap               => self.execute_swap(insn),
            ArmOp::Swi                => self.execute_swi(insn),
            ArmOp::CoprocDataOp       => self.execute_coproc_data_op(insn),
            ArmOp::CoprocRegTransfer  => self.execute_coproc_reg_transfer(insn, pc),
            ArmOp::CoprocDataTransfer => self.execute_coproc_data_transfer(insn, pc),
            ArmOp::Undefined          => self.execute_undefined(insn),
        }
    }

    // Registers in operand position: the PC reads 8 bytes beyond
    // the current instruction due to pipelining, and stores of the
    // PC put it 12 bytes beyond.
    fn reg_for_op(&self, r: usize, pc: u32) -> u32 {
        if r == Arm7Core::PC { pc.wrapping_add(8) } else { self.regs.get(r) }
    }

    fn reg_for_store(&self, r: usize, pc: u32) -> u32 {
        if r == Arm7Core::PC { pc.wrapping_add(12) } else { self.regs.get(r) }
    }

    fn execute_bx(&mut self, insn: ArmInsn, pc: u32) -> Step {
        if insn.Rm() == Arm7Core::PC { warn!("Executing `bx PC`!"); }
        let addr = self.reg_for_op(insn.Rm(), pc);
        let mut cpsr = self.regs.cpsr();
        cpsr.set_state(if 0 != (addr & 1) { State::Thumb } else { State::Arm });
        self.regs.set_cpsr(cpsr);
        self.regs.set(Arm7Core::PC, addr & !1);
        self.charge(3);
        Step::Branched
    }

    fn execute_branch(&mut self, insn: ArmInsn, pc: u32) -> Step {
        if insn.is_branch_with_link() {
            self.regs.set(Arm7Core::LR, pc.wrapping_add(4));
        }
        let target = pc.wrapping_add(8).wrapping_add(insn.branch_offset() as u32);
        self.regs.set(Arm7Core::PC, target);
        self.charge(3);
        Step::Branched
    }

    fn execute_multiply(&mut self, insn: ArmInsn) -> Step {
        let rm = self.regs.get(insn.Rm());
        let rs = self.regs.get(insn.Rs());
        let mut result = rm.wrapping_mul(rs);
        let mut cycles = 1 + Arm7Core::multiplier_cycles(rs);
        if insn.is_accumulating() {
            result = result.wrapping_add(self.regs.get(insn.mul_rn()));
            cycles += 1;
        }
        self.regs.set(insn.mul_rd(), result);

        // C and V are architecturally unpredictable here; both
        // stay untouched.
        if insn.is_setting_flags() {
            let mut cpsr = self.regs.cpsr();
            cpsr.set_N(0 != (result & 0x8000_0000));
            cpsr.set_Z(result == 0);
            self.regs.set_cpsr(cpsr);
        }
        self.charge(cycles);
        Step::Advance
    }

    fn execute_multiply_long(&mut self, insn: ArmInsn) -> Step {
        let rm = self.regs.get(insn.Rm());
        let rs = self.regs.get(insn.Rs());
        let mut result: u64 = if insn.is_signed() {
            (rm as i32 as i64).wrapping_mul(rs as i32 as i64) as u64
        } else {
            (rm as u64).wrapping_mul(rs as u64)
        };
        let mut cycles = 2 + Arm7Core::multiplier_cycles(rs);
        if insn.is_accumulating() {
            let acc = ((self.regs.get(insn.rd_hi()) as u64) << 32)
                    | (self.regs.get(insn.rd_lo()) as u64);
            result = result.wrapping_add(acc);
            cycles += 1;
        }
        self.regs.set(insn.rd_hi(), (result >> 32) as u32);
        self.regs.set(insn.rd_lo(), result as u32);

        if insn.is_setting_flags() {
            let mut cpsr = self.regs.cpsr();
            cpsr.set_N(0 != (result >> 63));
            cpsr.set_Z(result == 0);
            self.regs.set_cpsr(cpsr);
        }
        self.charge(cycles);
        Step::Advance
    }

    // The booth array retires 8 multiplier bits per internal
    // cycle; small operands finish early.
    fn multiplier_cycles(rs: u32) -> i64 {
        let magnitude = if 0 != (rs >> 31) { rs.wrapping_neg() } else { rs };
        match magnitude {
            0..=0xFF          => 1,
            0x100..=0xFFFF    => 2,
            0x1_0000..=0xFF_FFFF => 3,
            _                 => 4,
        }
    }

    fn execute_mrs(&mut self, insn: ArmInsn) -> Step {
        let value = if insn.is_spsr_access() {
            self.regs.spsr().0
        } else {
            self.regs.cpsr().0
        };
        self.regs.set(insn.Rd(), value);
        self.charge(1);
        Step::Advance
    }

    fn execute_msr(&mut self, insn: ArmInsn) -> Step {
        let value = if insn.is_op2_immediate() {
            insn.rotated_immediate()
        } else {
            self.regs.get(insn.Rm())
        };
        let cpsr = self.regs.cpsr();
        let privileged = cpsr.mode() != Mode::User;

        // The control, extension and status bytes need privilege;
        // the flags byte is writable from anywhere.
        let fields = insn.psr_field_mask();
        let mut mask = 0_u32;
        if privileged {
            if 0 != (fields & 0b0001) { mask |= 0x0000_00FF; }
            if 0 != (fields & 0b0010) { mask |= 0x0000_FF00; }
            if 0 != (fields & 0b0100) { mask |= 0x00FF_0000; }
        }
        if 0 != (fields & 0b1000) { mask |= Psr::FLAGS_MASK; }

        if insn.is_spsr_access() {
            // Writes in USR/SYS land nowhere; there is no SPSR.
            let new = Psr((self.regs.spsr().0 & !mask) | (value & mask));
            self.regs.set_spsr(new);
        } else {
            let new = Psr((cpsr.0 & !mask) | (value & mask));
            if new.state() != cpsr.state() { warn!("MSR changed the T bit!"); }
            // A new mode in the low byte is live immediately: the
            // bank projection reads CPSR on every access.
            self.regs.set_cpsr(new);
        }
        self.charge(1);
        Step::Advance
    }

    fn execute_data_processing(&mut self, insn: ArmInsn, pc: u32) -> Step {
        let op = insn.dpop();
        let cpsr = self.regs.cpsr();
        let mut cycles = 1;

        let (op2, shifter_carry) = if insn.is_op2_immediate() {
            let imm = insn.rotated_immediate();
            let carry = if insn.rotate_field() != 0 { 0 != (imm >> 31) } else { cpsr.C() };
            (imm, carry)
        } else {
            cycles += 1;
            self.decode_shift(insn.raw(), pc)
        };

        // A PC operand reads 8 ahead, or 12 when a register
        // supplies the shift amount.
        let rn = if insn.Rn() == Arm7Core::PC {
            let ahead = if !insn.is_op2_immediate() && insn.is_register_shift() { 12 } else { 8 };
            pc.wrapping_add(ahead)
        } else {
            self.regs.get(insn.Rn())
        };

        let carry_in = cpsr.C();
        let mut carry = shifter_carry;
        let mut overflow = cpsr.V();
        let result = match op {
            DpOp::And | DpOp::Tst => rn & op2,
            DpOp::Eor | DpOp::Teq => rn ^ op2,
            DpOp::Sub | DpOp::Cmp => { let (r, c, v) = sub_with_carry(rn, op2, true); carry = c; overflow = v; r },
            DpOp::Rsb             => { let (r, c, v) = sub_with_carry(op2, rn, true); carry = c; overflow = v; r },
            DpOp::Add | DpOp::Cmn => { let (r, c, v) = add_with_carry(rn, op2, false); carry = c; overflow = v; r },
            DpOp::Adc             => { let (r, c, v) = add_with_carry(rn, op2, carry_in); carry = c; overflow = v; r },
            DpOp::Sbc             => { let (r, c, v) = sub_with_carry(rn, op2, carry_in); carry = c; overflow = v; r },
            DpOp::Rsc             => { let (r, c, v) = sub_with_carry(op2, rn, carry_in); carry = c; overflow = v; r },
            DpOp::Orr             => rn | op2,
            DpOp::Mov             => op2,
            DpOp::Bic             => rn & !op2,
            DpOp::Mvn             => !op2,
        };

        let rd = insn.Rd();
        if insn.is_setting_flags() {
            if rd == Arm7Core::PC && !op.is_test() {
                // Exception return: SPSR of the current mode moves
                // back into CPSR. User and system mode have no SPSR
                // to restore.
                if cpsr.mode().has_spsr() {
                    let spsr = self.regs.spsr();
                    self.regs.set_cpsr(spsr);
                } else {
                    warn!("S-bit write to PC in {} mode has no SPSR to restore.", cpsr.mode());
                }
            } else {
                let mut new_cpsr = self.regs.cpsr();
                new_cpsr.set_N(0 != (result & 0x8000_0000));
                new_cpsr.set_Z(result == 0);
                new_cpsr.set_C(carry);
                new_cpsr.set_V(overflow);
                self.regs.set_cpsr(new_cpsr);
            }
        }

        if !op.is_test() {
            if rd == Arm7Core::PC {
                self.regs.set(Arm7Core::PC, result);
                self.charge(cycles + 2);
                return Step::Branched;
            }
            self.regs.set(rd, result);
        }
        self.charge(cycles);
        Step::Advance
    }

    fn execute_single_transfer(&mut self, insn: ArmInsn, pc: u32) -> Step {
        let offset = if insn.is_offset_immediate() {
            insn.offset12()
        } else {
            // The shifter carry is discarded on the offset path.
            self.decode_shift(insn.raw(), pc).0
        };
        let rn = insn.Rn();
        let rd = insn.Rd();
        let base = self.reg_for_op(rn, pc);
        let indexed = if insn.is_offset_added() {
            base.wrapping_add(offset)
        } else {
            base.wrapping_sub(offset)
        };
        let addr = if insn.is_pre_indexed() { indexed } else { base };

        // Pre-indexed writeback commits before the access and is
        // rolled back if the bus aborts it.
        let mut rn_old = 0;
        let mut wrote_back = false;
        if insn.is_pre_indexed() && insn.is_writeback() {
            if rn == Arm7Core::PC {
                warn!("LDR/STR writeback to PC ignored.");
            } else {
                rn_old = self.regs.get(rn);
                self.regs.set(rn, indexed);
                wrote_back = true;
            }
        }

        let mut step = Step::Advance;
        let mut cycles = 2;
        if insn.is_load() {
            cycles = 3;
            let data = if insn.is_byte_transfer() {
                self.load8(addr)
            } else {
                self.load32_rotated(addr)
            };
            if !self.pending_abt_d {
                if rd == Arm7Core::PC {
                    // The loaded value becomes the new PC as-is.
                    self.regs.set(Arm7Core::PC, data);
                    step = Step::Branched;
                    cycles += 2;
                } else {
                    self.regs.set(rd, data);
                }
            }
        } else {
            let data = self.reg_for_store(rd, pc);
            if insn.is_byte_transfer() {
                self.store8(addr, data as u8);
            } else {
                self.store32(addr, data);
            }
        }

        if self.pending_abt_d {
            if wrote_back { self.regs.set(rn, rn_old); }
        } else if !insn.is_pre_indexed() {
            // Post-indexing always writes back, except that a load
            // into the base wins over the writeback.
            if !(insn.is_load() && rd == rn) && rn != Arm7Core::PC {
                self.regs.set(rn, indexed);
            }
        }
        self.charge(cycles);
        step
    }

    fn execute_halfword_transfer(&mut self, insn: ArmInsn, pc: u32) -> Step {
        // Holes in the multiply/swap space decode into this class
        // with a zero sub-opcode; they are undefined, not ours.
        if insn.halfword_op() == HalfwordOp::Swp {
            return self.execute_undefined(insn);
        }
        let offset = if insn.is_halfword_offset_immediate() {
            insn.split_offset8()
        } else {
            self.regs.get(insn.Rm())
        };
        let rn = insn.Rn();
        let rd = insn.Rd();
        let base = self.reg_for_op(rn, pc);
        let indexed = if insn.is_offset_added() {
            base.wrapping_add(offset)
        } else {
            base.wrapping_sub(offset)
        };
        let addr = if insn.is_pre_indexed() { indexed } else { base };

        let mut rn_old = 0;
        let mut wrote_back = false;
        if insn.is_pre_indexed() && insn.is_writeback() {
            if rn == Arm7Core::PC {
                warn!("Halfword writeback to PC ignored.");
            } else {
                rn_old = self.regs.get(rn);
                self.regs.set(rn, indexed);
                wrote_back = true;
            }
        }

        let mut step = Step::Advance;
        let mut cycles = 2;
        if insn.is_load() {
            cycles = 3;
            let data = match insn.halfword_op() {
                HalfwordOp::UnsignedHalf => self.load16(addr),
                HalfwordOp::SignedByte   => self.load8(addr) as u8 as i8 as i32 as u32,
                HalfwordOp::SignedHalf   => self.load16(addr) as u16 as i16 as i32 as u32,
                HalfwordOp::Swp          => unreachable!(),
            };
            if !self.pending_abt_d {
                if rd == Arm7Core::PC {
                    self.regs.set(Arm7Core::PC, data);
                    step = Step::Branched;
                    cycles += 2;
                } else {
                    self.regs.set(rd, data);
                }
            }
        } else {
            match insn.halfword_op() {
                HalfwordOp::UnsignedHalf => {
                    let data = self.reg_for_store(rd, pc);
                    self.store16(addr, data as u16);
                },
                // The L=0 encodings of the signed slots carry the
                // ARMv5 dword pair transfers.
                HalfwordOp::SignedByte => { // LDRD
                    cycles = 4;
                    if 0 != (rd & 1) { warn!("LDRD with odd Rd {}.", rd); }
                    let lo = self.load32(addr);
                    let hi = self.load32(addr.wrapping_add(4));
                    if !self.pending_abt_d {
                        self.regs.set(rd, lo);
                        self.regs.set((rd + 1) & 0xF, hi);
                    }
                },
                HalfwordOp::SignedHalf => { // STRD
                    cycles = 3;
                    if 0 != (rd & 1) { warn!("STRD with odd Rd {}.", rd); }
                    let lo = self.regs.get(rd);
                    let hi = self.regs.get((rd + 1) & 0xF);
                    self.store32(addr, lo);
                    self.store32(addr.wrapping_add(4), hi);
                },
                HalfwordOp::Swp => unreachable!(),
            }
        }

        if self.pending_abt_d {
            if wrote_back { self.regs.set(rn, rn_old); }
        } else if !insn.is_pre_indexed() {
            if !(insn.is_load() && rd == rn) && rn != Arm7Core::PC {
                self.regs.set(rn, indexed);
            }
        }
        self.charge(cycles);
        step
    }

    fn execute_swap(&mut self, insn: ArmInsn) -> Step {
        let addr = self.regs.get(insn.Rn());
        let source = self.regs.get(insn.Rm());

        // Atomic from the guest's point of view; the core is
        // single-threaded, so read-then-write suffices.
        if insn.is_byte_transfer() {
            let temp = self.load8(addr);
            self.store8(addr, source as u8);
            if !self.pending_abt_d { self.regs.set(insn.Rd(), temp); }
        } else {
            let temp = self.load32_rotated(addr);
            self.store32(addr, source);
            if !self.pending_abt_d { self.regs.set(insn.Rd(), temp); }
        }
        self.charge(4);
        Step::Advance
    }

    fn execute_block_transfer(&mut self, insn: ArmInsn, pc: u32) -> Step {
        let rb = insn.Rn();
        let list = insn.register_list();
        let n = list.count_ones();
        let base = self.regs.get(rb);
        let up = insn.is_offset_added();
        let pre = insn.is_pre_indexed();

        // Transfers always run from the lowest address upwards,
        // low register numbers first, whatever the direction bit
        // says.
        let start = if up {
            if pre { base.wrapping_add(4) } else { base }
        } else {
            if pre { base.wrapping_sub(4 * n) } else { base.wrapping_sub(4 * n).wrapping_add(4) }
        };
        let written_back = if up { base.wrapping_add(4 * n) } else { base.wrapping_sub(4 * n) };

        let load = insn.is_load();
        let pc_in_list = 0 != (list & 0x8000);
        let user_bank = insn.is_user_bank() && !(pc_in_list && load);
        let mode = if user_bank { Mode::User } else { self.regs.cpsr().mode() };
        if user_bank && insn.is_writeback() {
            // Writing the base back into a non-current bank is
            // architecturally undefined; the base stays put.
            warn!("W bit ignored on an LDM/STM user-bank transfer.");
        }

        let mut addr = start & !3;
        let mut step = Step::Advance;
        if load {
            let mut cycles = n as i64 + 2;
            for i in 0..16_usize {
                if 0 == (list & (1 << i)) { continue; }
                // Overwriting of registers stops when the abort
                // happens; earlier ones stay updated.
                if self.pending_abt_d { break; }
                let data = self.load32(addr);
                if !self.pending_abt_d {
                    self.regs.set_banked(mode, i, data);
                }
                addr = addr.wrapping_add(4);
            }
            let base_in_list = 0 != ((list >> rb) & 1);
            if insn.is_writeback() && !self.pending_abt_d && !user_bank && !base_in_list {
                // A load always overwrites the written-back base
                // when the base is in the list.
                self.regs.set(rb, written_back);
            }
            if pc_in_list && !self.pending_abt_d {
                if insn.is_user_bank() {
                    // CPSR restore comes last, after every register
                    // landed in the old mode's bank.
                    let spsr = self.regs.spsr();
                    self.regs.set_cpsr(spsr);
                }
                cycles += 2;
                step = Step::Branched;
            }
            self.charge(cycles);
        } else {
            for i in 0..16_usize {
                if 0 == (list & (1 << i)) { continue; }
                let data = if i == Arm7Core::PC {
                    pc.wrapping_add(12)
                } else {
                    self.regs.get_banked(mode, i)
                };
                self.store32(addr, data);
                addr = addr.wrapping_add(4);
            }
            if insn.is_writeback() && !self.pending_abt_d && !user_bank {
                self.regs.set(rb, written_back);
            }
            self.charge(n as i64 + 1);
        }
        step
    }

    fn execute_swi(&mut self, insn: ArmInsn) -> Step {
        debug!("swi #{:#08X}", insn.comment());
        self.pending_swi = true;
        self.charge(1);
        // PC stays on the SWI itself so the prioritizer banks the
        // next instruction's address into R14_svc.
        Step::Branched
    }

    fn execute_undefined(&mut self, insn: ArmInsn) -> Step {
        debug!("Undefined instruction {:#010X}.", insn.raw());
        self.pending_und = true;
        self.charge(1);
        Step::Branched
    }

    fn execute_coproc_data_op(&mut self, insn: ArmInsn) -> Step {
        if self.coproc.data_op(insn.raw()).is_err() {
            self.pending_und = true;
            self.charge(1);
            return Step::Branched;
        }
        self.charge(2);
        Step::Advance
    }

    fn execute_coproc_reg_transfer(&mut self, insn: ArmInsn, pc: u32) -> Step {
        if insn.is_load() { // MRC
            match self.coproc.reg_read(insn.raw()) {
                Ok(value) => {
                    self.regs.set(insn.Rd(), value);
                    self.charge(2);
                    if insn.Rd() == Arm7Core::PC { Step::Branched } else { Step::Advance }
                },
                Err(_) => {
                    self.pending_und = true;
                    self.charge(1);
                    Step::Branched
                },
            }
        } else { // MCR
            let value = self.reg_for_op(insn.Rd(), pc);
            if self.coproc.reg_write(insn.raw(), value).is_err() {
                self.pending_und = true;
                self.charge(1);
                return Step::Branched;
            }
            self.charge(2);
            Step::Advance
        }
    }

    fn execute_coproc_data_transfer(&mut self, insn: ArmInsn, pc: u32) -> Step {
        let rn = insn.Rn();
        let offset = insn.offset8();
        let mut rnv = self.reg_for_op(rn, pc);

        // Post-increment is the callback's business; it sees the
        // plain base then.
        if insn.is_pre_indexed() && offset != 0 {
            rnv = if insn.is_offset_added() {
                rnv.wrapping_add(offset)
            } else {
                rnv.wrapping_sub(offset)
            };
        }

        let result = if insn.is_load() { // LDC
            self.coproc.data_read(insn.raw(), &mut rnv, &mut *self.bus)
        } else { // STC
            self.coproc.data_write(insn.raw(), &mut rnv, &mut *self.bus)
        };
        if result.is_err() {
            self.pending_und = true;
            self.charge(1);
            return Step::Branched;
        }

        // The callback worked on a copy; only the W bit makes its
        // writeback stick.
        if insn.is_writeback() && rn != Arm7Core::PC {
            self.regs.set(rn, rnv);
        }
        self.charge(2);
        Step::Advance
    }
}


#[cfg(test)]
mod test {
    use crate::bus::{Bus, Ram};
    use crate::coproc::{Coprocessor, CpControl, CpFault, NoCoprocessor};
    use crate::cpu::{Arm7Core, IrqLine, Mode, Psr, State};

    const RAM_LEN: u32 = 0x1_0000;

    fn core() -> Arm7Core {
        let mut cpu = Arm7Core::new(Box::new(Ram::new(RAM_LEN)), Box::new(NoCoprocessor));
        cpu.reset();
        cpu.set_budget(1_000_000);
        cpu
    }

    fn put(cpu: &mut Arm7Core, addr: u32, insn: u32) {
        cpu.bus_mut().write32(addr, insn).unwrap();
    }

    #[test]
    fn mov_lsl_flags() {
        let mut cpu = core();
        put(&mut cpu, 0, 0xE3A0_04FF); // mov r0, #0xFF000000
        put(&mut cpu, 4, 0xE1B0_1400); // movs r1, r0, lsl #8
        cpu.step();
        assert_eq!(cpu.regs().get(0), 0xFF00_0000);
        cpu.step();
        let cpsr = cpu.regs().cpsr();
        assert_eq!(cpu.regs().get(1), 0);
        assert!(!cpsr.N());
        assert!( cpsr.Z());
        assert!( cpsr.C());
        assert_eq!(cpu.regs().get(Arm7Core::PC), 8);
    }

    #[test]
    fn adds_wraps_with_carry() {
        let mut cpu = core();
        put(&mut cpu, 0, 0xE3E0_0000); // mvn r0, #0
        put(&mut cpu, 4, 0xE290_1001); // adds r1, r0, #1
        cpu.step();
        cpu.step();
        let cpsr = cpu.regs().cpsr();
        assert_eq!(cpu.regs().get(1), 0);
        assert!(!cpsr.N());
        assert!( cpsr.Z());
        assert!( cpsr.C());
        assert!(!cpsr.V());
    }

    #[test]
    fn subs_overflows_at_int_min() {
        let mut cpu = core();
        put(&mut cpu, 0, 0xE3A0_0102); // mov r0, #0x80000000
        put(&mut cpu, 4, 0xE250_1001); // subs r1, r0, #1
        cpu.step();
        cpu.step();
        let cpsr = cpu.regs().cpsr();
        assert_eq!(cpu.regs().get(1), 0x7FFF_FFFF);
        assert!(!cpsr.N());
        assert!(!cpsr.Z());
        assert!( cpsr.C());
        assert!( cpsr.V());
    }

    #[test]
    fn ldr_post_indexed() {
        let mut cpu = core();
        put(&mut cpu, 0, 0xE491_0004); // ldr r0, [r1], #4
        put(&mut cpu, 0x100, 0xDEAD_BEEF);
        cpu.regs_mut().set(1, 0x100);
        cpu.step();
        assert_eq!(cpu.regs().get(0), 0xDEAD_BEEF);
        assert_eq!(cpu.regs().get(1), 0x104);
    }

    #[test]
    fn ldr_rotates_unaligned_words() {
        let mut cpu = core();
        put(&mut cpu, 0, 0xE591_0000); // ldr r0, [r1]
        put(&mut cpu, 0x100, 0x1122_3344);
        cpu.regs_mut().set(1, 0x102);
        cpu.step();
        assert_eq!(cpu.regs().get(0), 0x3344_1122);
    }

    #[test]
    fn ldrb_zero_extends() {
        let mut cpu = core();
        put(&mut cpu, 0, 0xE5D1_0000); // ldrb r0, [r1]
        put(&mut cpu, 0x100, 0x0000_00F7);
        cpu.regs_mut().set(0, 0xFFFF_FFFF);
        cpu.regs_mut().set(1, 0x100);
        cpu.step();
        assert_eq!(cpu.regs().get(0), 0xF7);
    }

    #[test]
    fn post_index_load_into_base_wins() {
        let mut cpu = core();
        put(&mut cpu, 0, 0xE490_0004); // ldr r0, [r0], #4
        put(&mut cpu, 0x50, 0x77);
        cpu.regs_mut().set(0, 0x50);
        cpu.step();
        assert_eq!(cpu.regs().get(0), 0x77);
    }

    #[test]
    fn str_stores_pc_plus_12() {
        let mut cpu = core();
        cpu.regs_mut().set(1, 0x80);
        put(&mut cpu, 0, 0xE581_F000); // str pc, [r1]
        cpu.step();
        assert_eq!(cpu.bus_mut().read32(0x80).unwrap(), 12);
    }

    #[test]
    fn pre_index_writeback_rolls_back_on_abort() {
        let mut cpu = core();
        // ldr r0, [r1, #8]! way past the end of RAM.
        put(&mut cpu, 0, 0xE5B1_0008);
        cpu.regs_mut().set(0, 0x1234);
        cpu.regs_mut().set(1, RAM_LEN);
        cpu.step();
        assert_eq!(cpu.regs().get(1), RAM_LEN); // rolled back
        assert_eq!(cpu.regs().get(0), 0x1234);  // untouched
        assert!(cpu.is_pending(IrqLine::DataAbort));
        // The next step vectors into the abort handler.
        cpu.step();
        assert_eq!(cpu.regs().cpsr().mode(), Mode::Abort);
        assert_eq!(cpu.regs().get(Arm7Core::PC), 0x10);
        assert_eq!(cpu.regs().get(Arm7Core::LR), 0x08); // aborted insn + 8
    }

    #[test]
    fn halfword_loads_sign_extend() {
        let mut cpu = core();
        put(&mut cpu, 0, 0xE1D1_00F0); // ldrsh r0, [r1]
        put(&mut cpu, 4, 0xE1D1_20D0); // ldrsb r2, [r1]
        put(&mut cpu, 0x100, 0x0000_8088);
        cpu.regs_mut().set(1, 0x100);
        cpu.step();
        assert_eq!(cpu.regs().get(0), 0xFFFF_8088);
        cpu.step();
        assert_eq!(cpu.regs().get(2), 0xFFFF_FF88);
    }

    #[test]
    fn strh_truncates_to_halfword() {
        let mut cpu = core();
        put(&mut cpu, 0, 0xE1C1_00B0); // strh r0, [r1]
        cpu.regs_mut().set(0, 0xABCD_1234);
        cpu.regs_mut().set(1, 0x100);
        cpu.step();
        assert_eq!(cpu.bus_mut().read32(0x100).unwrap(), 0x1234);
    }

    #[test]
    fn dword_pair_transfers() {
        let mut cpu = core();
        put(&mut cpu, 0, 0xE1C0_20D0); // ldrd r2, [r0]
        put(&mut cpu, 4, 0xE1C1_20F0); // strd r2, [r1]
        put(&mut cpu, 0x40, 0x1111_1111);
        put(&mut cpu, 0x44, 0x2222_2222);
        cpu.regs_mut().set(0, 0x40);
        cpu.regs_mut().set(1, 0x60);
        cpu.step();
        assert_eq!(cpu.regs().get(2), 0x1111_1111);
        assert_eq!(cpu.regs().get(3), 0x2222_2222);
        cpu.step();
        assert_eq!(cpu.bus_mut().read32(0x60).unwrap(), 0x1111_1111);
        assert_eq!(cpu.bus_mut().read32(0x64).unwrap(), 0x2222_2222);
    }

    #[test]
    fn swap_word_and_byte() {
        let mut cpu = core();
        put(&mut cpu, 0, 0xE102_0091); // swp r0, r1, [r2]
        put(&mut cpu, 4, 0xE142_3091); // swpb r3, r1, [r2]
        put(&mut cpu, 0x80, 0x0000_0055);
        cpu.regs_mut().set(1, 0x66);
        cpu.regs_mut().set(2, 0x80);
        cpu.step();
        assert_eq!(cpu.regs().get(0), 0x55);
        assert_eq!(cpu.bus_mut().read32(0x80).unwrap(), 0x66);
        cpu.step();
        assert_eq!(cpu.regs().get(3), 0x66);
    }

    #[test]
    fn stmdb_pushes_ascending() {
        let mut cpu = core();
        put(&mut cpu, 0, 0xE92D_400F); // stmdb sp!, {r0-r3, lr}
        for r in 0..4 { cpu.regs_mut().set(r, r as u32 + 1); }
        cpu.regs_mut().set(Arm7Core::LR, 5);
        cpu.regs_mut().set(Arm7Core::SP, 0x1020);
        cpu.step();
        for i in 0..5 {
            assert_eq!(cpu.bus_mut().read32(0x100C + 4 * i).unwrap(), i + 1);
        }
        assert_eq!(cpu.regs().get(Arm7Core::SP), 0x100C);
    }

    #[test]
    fn ldm_base_in_list_keeps_loaded_value() {
        let mut cpu = core();
        put(&mut cpu, 0, 0xE8B0_0003); // ldmia r0!, {r0, r1}
        put(&mut cpu, 0x100, 0xAAAA);
        put(&mut cpu, 0x104, 0xBBBB);
        cpu.regs_mut().set(0, 0x100);
        cpu.step();
        assert_eq!(cpu.regs().get(0), 0xAAAA);
        assert_eq!(cpu.regs().get(1), 0xBBBB);
    }

    #[test]
    fn ldm_aborts_partially() {
        let mut cpu = core();
        put(&mut cpu, 0, 0xE8B0_0006); // ldmia r0!, {r1, r2}
        put(&mut cpu, RAM_LEN - 4, 0x1234);
        cpu.regs_mut().set(0, RAM_LEN - 4);
        cpu.regs_mut().set(2, 0xFFFF);
        cpu.step();
        assert_eq!(cpu.regs().get(1), 0x1234);      // first transfer landed
        assert_eq!(cpu.regs().get(2), 0xFFFF);      // stopped at the abort
        assert_eq!(cpu.regs().get(0), RAM_LEN - 4); // writeback suppressed
        assert!(cpu.is_pending(IrqLine::DataAbort));
    }

    #[test]
    fn stm_user_bank_stores_user_registers() {
        let mut cpu = core();
        put(&mut cpu, 0, 0xE8C0_2000); // stmia r0, {sp}^
        cpu.regs_mut().set_banked(Mode::User, 13, 0x111);
        cpu.regs_mut().set(13, 0x999); // SVC stack pointer
        cpu.regs_mut().set(0, 0x40);
        cpu.step();
        assert_eq!(cpu.bus_mut().read32(0x40).unwrap(), 0x111);
    }

    #[test]
    fn ldm_with_pc_and_s_restores_spsr() {
        let mut cpu = core();
        put(&mut cpu, 0, 0xE8D0_8000); // ldmia r0, {pc}^
        put(&mut cpu, 0x100, 0x200);
        cpu.regs_mut().set(0, 0x100);
        cpu.regs_mut().set_spsr(Psr(0x6000_0010)); // USR, Z and C set
        cpu.step();
        assert_eq!(cpu.regs().get(Arm7Core::PC), 0x200);
        assert_eq!(cpu.regs().cpsr(), Psr(0x6000_0010));
        assert_eq!(cpu.regs().cpsr().mode(), Mode::User);
    }

    #[test]
    fn multiply_and_accumulate() {
        let mut cpu = core();
        put(&mut cpu, 0, 0xE001_2394); // mul r1, r4, r3
        put(&mut cpu, 4, 0xE021_2394); // mla r1, r4, r3, r2
        cpu.regs_mut().set(3, 7);
        cpu.regs_mut().set(4, 6);
        cpu.regs_mut().set(2, 100);
        cpu.step();
        assert_eq!(cpu.regs().get(1), 42);
        cpu.step();
        assert_eq!(cpu.regs().get(1), 142);
    }

    #[test]
    fn multiply_sets_nz_only() {
        let mut cpu = core();
        put(&mut cpu, 0, 0xE011_2394); // muls r1, r4, r3
        cpu.regs_mut().set(3, 0);
        cpu.regs_mut().set(4, 99);
        let mut cpsr = cpu.regs().cpsr();
        cpsr.set_C(true); cpsr.set_V(true);
        cpu.regs_mut().set_cpsr(cpsr);
        cpu.step();
        let cpsr = cpu.regs().cpsr();
        assert!( cpsr.Z());
        assert!(!cpsr.N());
        assert!( cpsr.C()); // untouched
        assert!( cpsr.V()); // untouched
    }

    #[test]
    fn long_multiplies() {
        let mut cpu = core();
        put(&mut cpu, 0, 0xE081_2394); // umull r2, r1, r4, r3
        put(&mut cpu, 4, 0xE0D1_2394); // smulls r2, r1, r4, r3
        cpu.regs_mut().set(4, 0xFFFF_FFFF);
        cpu.regs_mut().set(3, 2);
        cpu.step();
        assert_eq!(cpu.regs().get(1), 1);           // high
        assert_eq!(cpu.regs().get(2), 0xFFFF_FFFE); // low
        cpu.regs_mut().set(4, 0xFFFF_FFFE); // -2
        cpu.regs_mut().set(3, 3);
        cpu.step();
        assert_eq!(cpu.regs().get(1), 0xFFFF_FFFF); // -6 high
        assert_eq!(cpu.regs().get(2), 0xFFFF_FFFA); // -6 low
        assert!(cpu.regs().cpsr().N());
    }

    #[test]
    fn branch_and_link() {
        let mut cpu = core();
        put(&mut cpu, 0x10, 0xEB00_0002); // bl +8 words ahead of pc+8
        cpu.regs_mut().set(Arm7Core::PC, 0x10);
        cpu.step();
        assert_eq!(cpu.regs().get(Arm7Core::PC), 0x10 + 8 + 8);
        assert_eq!(cpu.regs().get(Arm7Core::LR), 0x14);
        put(&mut cpu, 0x20, 0xEAFF_FFFD); // b back to 0x1C
        cpu.regs_mut().set(Arm7Core::PC, 0x20);
        cpu.step();
        assert_eq!(cpu.regs().get(Arm7Core::PC), 0x1C);
    }

    #[test]
    fn pc_reads_ahead_8_or_12() {
        let mut cpu = core();
        put(&mut cpu, 0x10, 0xE1A0_000F); // mov r0, pc
        put(&mut cpu, 0x14, 0xE1A0_021F); // mov r0, pc, lsl r2
        cpu.regs_mut().set(2, 0);
        cpu.regs_mut().set(Arm7Core::PC, 0x10);
        cpu.step();
        assert_eq!(cpu.regs().get(0), 0x18); // +8
        cpu.step();
        assert_eq!(cpu.regs().get(0), 0x20); // +12 under a register shift
    }

    #[test]
    fn condition_fail_skips_without_side_effects() {
        let mut cpu = core();
        put(&mut cpu, 0, 0x059F_1000); // ldreq r1, [pc] with Z clear
        let before = cpu.regs().raw();
        let budget = cpu.budget();
        cpu.step();
        assert_eq!(cpu.regs().get(Arm7Core::PC), 4);
        assert!(cpu.budget() < budget); // still billed
        let after = cpu.regs().raw();
        // Only the PC moved.
        for i in 0..after.len() {
            if i != 15 { assert_eq!(after[i], before[i]); }
        }
    }

    #[test]
    fn swi_enters_supervisor_mode() {
        let mut cpu = core();
        put(&mut cpu, 0, 0xEF00_0042); // swi #0x42
        cpu.regs_mut().set_cpsr(Psr(0x10)); // plain USR
        cpu.step(); // raises the pending SWI
        cpu.step(); // takes the exception
        assert_eq!(cpu.regs().get_banked(Mode::Supervisor, 14), 4);
        assert_eq!(cpu.regs().spsr_of(Mode::Supervisor), Psr(0x10));
        assert_eq!(cpu.regs().cpsr(), Psr(0x93));
        assert_eq!(cpu.regs().get(Arm7Core::PC), 0x08);
    }

    #[test]
    fn data_processing_exception_return() {
        let mut cpu = core();
        put(&mut cpu, 0, 0xEF00_0000); // swi
        put(&mut cpu, 8, 0xE1B0_F00E); // movs pc, lr
        cpu.regs_mut().set_cpsr(Psr(0x10));
        cpu.step();
        cpu.step(); // in SVC now, PC = 8, LR_svc = 4
        cpu.step(); // return
        assert_eq!(cpu.regs().get(Arm7Core::PC), 4);
        assert_eq!(cpu.regs().cpsr(), Psr(0x10));
    }

    #[test]
    fn irq_respects_the_mask() {
        let mut cpu = core();
        put(&mut cpu, 0, 0xE3A0_0000); // mov r0, #0
        cpu.set_irq_line(IrqLine::Irq, true);
        cpu.step(); // I is set after reset: the mov executes
        assert_eq!(cpu.regs().get(Arm7Core::PC), 4);

        let mut cpsr = cpu.regs().cpsr();
        cpsr.enable_irq();
        cpu.regs_mut().set_cpsr(cpsr);
        let old_cpsr = cpu.regs().cpsr();
        cpu.step(); // now it is taken
        assert_eq!(cpu.regs().cpsr().mode(), Mode::Irq);
        assert_eq!(cpu.regs().get_banked(Mode::Irq, 14), 8); // interrupted pc + 4
        assert_eq!(cpu.regs().spsr_of(Mode::Irq), old_cpsr);
        assert!(cpu.regs().cpsr().irq_disabled());
        assert_eq!(cpu.regs().get(Arm7Core::PC), 0x18);
    }

    #[test]
    fn fiq_banks_and_masks() {
        let mut cpu = core();
        let mut cpsr = cpu.regs().cpsr();
        cpsr.enable_fiq();
        cpu.regs_mut().set_cpsr(cpsr);
        cpu.set_irq_line(IrqLine::Fiq, true);
        cpu.step();
        let cpsr = cpu.regs().cpsr();
        assert_eq!(cpsr.mode(), Mode::Fiq);
        assert!(cpsr.irq_disabled());
        assert!(cpsr.fiq_disabled());
        assert_eq!(cpu.regs().get(Arm7Core::PC), 0x1C);
    }

    #[test]
    fn msr_field_masks_respect_privilege() {
        let mut cpu = core();
        put(&mut cpu, 0, 0xE121_F000); // msr cpsr_c, r0
        put(&mut cpu, 4, 0xE128_F000); // msr cpsr_f, r0
        cpu.regs_mut().set_cpsr(Psr(0x10)); // USR
        cpu.regs_mut().set(0, 0xF000_00D3);
        cpu.step();
        // The control byte write is silently dropped in USR.
        assert_eq!(cpu.regs().cpsr(), Psr(0x10));
        cpu.step();
        // The flags byte always goes through.
        assert_eq!(cpu.regs().cpsr(), Psr(0xF000_0010));
    }

    #[test]
    fn msr_mode_change_rebanks_registers() {
        let mut cpu = core();
        put(&mut cpu, 0, 0xE121_F000); // msr cpsr_c, r0
        cpu.regs_mut().set_banked(Mode::Fiq, 13, 0xF1F1);
        cpu.regs_mut().set(13, 0x5C5C); // SVC bank
        cpu.regs_mut().set(0, 0xD1);    // FIQ mode, I+F set
        cpu.step();
        assert_eq!(cpu.regs().cpsr().mode(), Mode::Fiq);
        assert_eq!(cpu.regs().get(13), 0xF1F1);
    }

    #[test]
    fn mrs_reads_both_psrs() {
        let mut cpu = core();
        put(&mut cpu, 0, 0xE10F_1000); // mrs r1, cpsr
        put(&mut cpu, 4, 0xE14F_2000); // mrs r2, spsr
        cpu.regs_mut().set_spsr(Psr(0x6000_0010));
        let cpsr = cpu.regs().cpsr();
        cpu.step();
        assert_eq!(cpu.regs().get(1), cpsr.0);
        cpu.step();
        assert_eq!(cpu.regs().get(2), 0x6000_0010);
    }

    #[test]
    fn unbound_coprocessor_raises_undefined() {
        let mut cpu = core();
        put(&mut cpu, 0, 0xEE11_1F10); // mrc p15, ...
        cpu.step();
        assert!(cpu.is_pending(IrqLine::Undefined));
        cpu.step();
        assert_eq!(cpu.regs().cpsr().mode(), Mode::Undefined);
        assert_eq!(cpu.regs().get(Arm7Core::PC), 0x04);
        assert_eq!(cpu.regs().get_banked(Mode::Undefined, 14), 4); // offending insn + 4
    }

    struct HighVectorCp;
    impl Coprocessor for HighVectorCp {
        fn control(&self) -> CpControl {
            CpControl(CpControl::MMU_ENABLE | CpControl::HIGH_VECTORS)
        }
    }

    #[test]
    fn high_vectors_relocate_exception_entry() {
        let mut cpu = Arm7Core::new(Box::new(Ram::new(RAM_LEN)), Box::new(HighVectorCp));
        cpu.reset();
        cpu.set_budget(100);
        cpu.bus_mut().write32(0, 0xEF00_0000).unwrap(); // swi
        cpu.step();
        cpu.step();
        assert_eq!(cpu.regs().get(Arm7Core::PC), 0xFFFF_0008);
    }

    struct RecordingCp {
        written: Option<u32>,
    }
    impl Coprocessor for RecordingCp {
        fn reg_read(&mut self, _insn: u32) -> Result<u32, CpFault> {
            Ok(0x1234_5678)
        }
        fn reg_write(&mut self, _insn: u32, value: u32) -> Result<(), CpFault> {
            self.written = Some(value);
            Ok(())
        }
        fn data_read(&mut self, _insn: u32, rn: &mut u32, bus: &mut dyn Bus) -> Result<(), CpFault> {
            let _ = bus.read32(*rn).map_err(|_| CpFault)?;
            *rn = rn.wrapping_add(4);
            Ok(())
        }
    }

    #[test]
    fn coprocessor_register_transfers() {
        let mut cpu = Arm7Core::new(Box::new(Ram::new(RAM_LEN)), Box::new(RecordingCp { written: None }));
        cpu.reset();
        cpu.set_budget(100);
        cpu.bus_mut().write32(0, 0xEE11_1F10).unwrap(); // mrc -> r1
        cpu.bus_mut().write32(4, 0xEE01_2F10).unwrap(); // mcr <- r2
        cpu.regs_mut().set(2, 0xCAFE);
        cpu.step();
        assert_eq!(cpu.regs().get(1), 0x1234_5678);
        cpu.step();
        assert_eq!(cpu.regs().get(Arm7Core::PC), 8);
    }

    #[test]
    fn ldc_writeback_follows_the_w_bit() {
        let mut cpu = Arm7Core::new(Box::new(Ram::new(RAM_LEN)), Box::new(RecordingCp { written: None }));
        cpu.reset();
        cpu.set_budget(100);
        cpu.bus_mut().write32(0, 0xED91_2100).unwrap(); // ldc, no writeback
        cpu.bus_mut().write32(4, 0xEDB1_2100).unwrap(); // ldc with writeback
        cpu.regs_mut().set(1, 0x100);
        cpu.step();
        assert_eq!(cpu.regs().get(1), 0x100); // callback's bump discarded
        cpu.step();
        assert_eq!(cpu.regs().get(1), 0x104); // callback's bump kept
    }

    #[test]
    fn budget_run_stops_after_exhaustion() {
        let mut cpu = core();
        // An endless loop: b .
        put(&mut cpu, 0, 0xEAFF_FFFE);
        let left = cpu.run(30);
        assert!(left <= 0);
        assert_eq!(cpu.regs().get(Arm7Core::PC), 0);
    }

    #[test]
    fn capture_and_restore_round_trip() {
        let mut cpu = core();
        cpu.regs_mut().set(3, 0xABCD);
        cpu.set_irq_line(IrqLine::Irq, true);
        let snapshot = cpu.capture();
        cpu.regs_mut().set(3, 0);
        cpu.set_irq_line(IrqLine::Irq, false);
        cpu.restore(&snapshot);
        assert_eq!(cpu.regs().get(3), 0xABCD);
        assert!(cpu.is_pending(IrqLine::Irq));
    }

    #[test]
    fn bx_switches_to_thumb_state() {
        let mut cpu = core();
        put(&mut cpu, 0, 0xE12F_FF11); // bx r1
        cpu.regs_mut().set(1, 0x101);
        cpu.step();
        assert_eq!(cpu.regs().get(Arm7Core::PC), 0x100);
        assert_eq!(cpu.regs().cpsr().state(), State::Thumb);
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
