// License below.
#![allow(missing_docs)]

use std::fmt;

use super::Arm7Core;

impl fmt::Display for Arm7Core {
    /// Shows the current CPU state with all its registers and what not.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // Show CPSR and SPSR.
        write!(f, "Arm7Core\n\n- Register Set\n\tCPSR {}\tSPSR ", self.regs.cpsr())?;
        if self.regs.cpsr().mode().has_spsr() { write!(f, "{}\n", self.regs.spsr())?; }
        else { write!(f, "[none]\n")?; }

        // Show all 16 visible registers in a nice table.
        for i in 0..16 {
            if (i % 4) == 0 { write!(f, "\n\t")?; }
            write!(f, "{}[{:08X}]\t", Arm7Core::DEBUG_REGISTER_NAMES[i], self.regs.get(i))?;
        }

        // Show pending exception state and the budget.
        write!(f, "\n\n- Pending\n\t\
                   IRQ: {}  FIQ: {}  AbtD: {}  AbtP: {}  Und: {}  SWI: {}\n\
                   \n- Budget\n\t{} cycles\n",
            self.pending_irq, self.pending_fiq,
            self.pending_abt_d, self.pending_abt_p,
            self.pending_und, self.pending_swi,
            self.icount
        )
    }
}

impl Arm7Core {
    const DEBUG_REGISTER_NAMES: &'static [&'static str] = &[
        "R0:  ", "R1:  ", "R2:  ", "R3:  ", "R4:  ", "R5:  ", "R6:  ", "R7:  ",
        "R8:  ", "R9:  ", "R10: ", "R11: ", "R12: ", "SP:  ", "LR:  ", "PC:  "
    ];
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
