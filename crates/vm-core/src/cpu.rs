//! CPU state and the fetch/decode/execute loop (spec.md §4.7-4.8).

use crate::arity::ARITY;
use crate::error::VmError;
use crate::memory::{Memory, DEVICE_OUTPUT, VECTOR_ERROR, VECTOR_FRAME, VECTOR_RESET};
use crate::stacks::{ReturnStack, WorkingStack};
use crate::status::{Status, FLAG_COND, FLAG_HALT, FLAG_SHORT, FLAG_SIGN};

/// The machine: status flags, instruction counter, literal-bytes-remaining
/// counter, cached entry vectors, both stacks, and the owned 64K memory.
///
/// A `Cpu` owns everything it touches — no entity here is shared with
/// another instance, so multiple machines coexist simply by owning
/// multiple `Cpu` values (spec.md §5, §9's "global singleton" flag).
pub struct Cpu {
    literal: u8,
    status: Status,
    counter: u16,
    vreset: u16,
    vframe: u16,
    verror: u16,
    wst: WorkingStack,
    rst: ReturnStack,
    ram: Memory,
}

impl Cpu {
    pub fn new() -> Self {
        Self {
            literal: 0,
            status: Status::default(),
            counter: 0,
            vreset: 0,
            vframe: 0,
            verror: 0,
            wst: WorkingStack::new(),
            rst: ReturnStack::new(),
            ram: Memory::new(),
        }
    }

    /// Direct access to memory, for the loader to write a program image
    /// into before `boot` is called.
    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.ram
    }

    pub fn memory(&self) -> &Memory {
        &self.ram
    }

    pub fn working_stack(&self) -> &WorkingStack {
        &self.wst
    }

    pub fn return_stack(&self) -> &ReturnStack {
        &self.rst
    }

    pub fn counter(&self) -> u16 {
        self.counter
    }

    /// Cached entry vectors, read during boot. `verror` is cached but never
    /// automatically branched to (spec.md §7) — it is exposed for a future
    /// host that wants to act on it.
    pub fn reset_vector(&self) -> u16 {
        self.vreset
    }

    pub fn frame_vector(&self) -> u16 {
        self.vframe
    }

    pub fn error_vector(&self) -> u16 {
        self.verror
    }

    pub fn halted(&self) -> bool {
        self.status.halt()
    }

    /// Zero all CPU state and cache the three entry vectors, then run the
    /// reset phase to completion (HALT set) followed by the frame phase
    /// (spec.md §4.8). Memory is left untouched: it holds the program image
    /// the host loaded before calling `boot`, and spec.md §2's data flow
    /// ("the loader writes a program image into Memory; Boot reads three
    /// short vectors ...") only makes sense if boot does not erase it — see
    /// DESIGN.md for this resolved open question.
    ///
    /// Returns the errors (if any) raised by each phase, in phase order.
    /// A phase that errors stops early (spec.md §7); the next phase still
    /// runs, since HALT is unconditionally cleared before it starts.
    pub fn boot(&mut self, mut on_output: impl FnMut(u8)) -> Vec<VmError> {
        self.literal = 0;
        self.status = Status::default();
        self.counter = 0;
        self.wst = WorkingStack::new();
        self.rst = ReturnStack::new();

        self.vreset = self.ram.peek_short(VECTOR_RESET);
        self.vframe = self.ram.peek_short(VECTOR_FRAME);
        self.verror = self.ram.peek_short(VECTOR_ERROR);

        let mut errors = Vec::new();
        if let Err(e) = self.run_phase(self.vreset, &mut on_output) {
            errors.push(e);
        }
        if let Err(e) = self.run_phase(self.vframe, &mut on_output) {
            errors.push(e);
        }
        errors
    }

    fn run_phase(&mut self, entry: u16, on_output: &mut impl FnMut(u8)) -> Result<(), VmError> {
        self.ram.ptr = entry;
        self.status.set(FLAG_HALT, false);
        while !self.status.halt() {
            match self.step() {
                Ok(byte) => {
                    self.counter = self.counter.wrapping_add(1);
                    if let Some(b) = byte {
                        on_output(b);
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Executes one step of the loop (spec.md §4.7): fetch, decode,
    /// guard, dispatch, service devices. Returns the device's emitted
    /// byte, if any, on success.
    pub fn step(&mut self) -> Result<Option<u8>, VmError> {
        let instr = self.ram.fetch();
        if self.literal > 0 {
            self.do_literal(instr)?;
            return Ok(None);
        }
        self.do_opcode(instr)?;
        Ok(self.service_device())
    }

    fn do_literal(&mut self, instr: u8) -> Result<(), VmError> {
        if self.wst.depth() >= 255 {
            return Err(VmError::StackOverflow {
                opcode: instr,
                counter: self.counter,
            });
        }
        self.wst.push_byte(instr);
        self.literal -= 1;
        Ok(())
    }

    fn do_opcode(&mut self, instr: u8) -> Result<(), VmError> {
        let mut op = instr & 0x1f;
        self.status.set(FLAG_SHORT, (instr >> 5) & 1 != 0);
        self.status.set(FLAG_SIGN, (instr >> 6) & 1 != 0);
        self.status.set(FLAG_COND, (instr >> 7) & 1 != 0);
        if self.status.get(FLAG_SHORT) {
            op += 16;
        }

        let (consumed, produced) = ARITY[op as usize];
        if self.wst.depth() < consumed {
            return Err(VmError::StackUnderflow {
                opcode: op,
                counter: self.counter,
            });
        }
        let projected = self.wst.depth() as i32 + produced as i32 - consumed as i32;
        if projected >= 255 {
            return Err(VmError::StackOverflow {
                opcode: instr,
                counter: self.counter,
            });
        }

        if self.status.get(FLAG_COND) {
            if self.wst.pop_byte() != 0 {
                self.dispatch(op);
            }
        } else {
            self.dispatch(op);
        }
        Ok(())
    }

    /// After every step, if the output device register is non-zero, the
    /// byte is handed to the host and the register cleared (spec.md §6).
    fn service_device(&mut self) -> Option<u8> {
        let b = self.ram.read(DEVICE_OUTPUT);
        if b != 0 {
            self.ram.write(DEVICE_OUTPUT, 0);
            Some(b)
        } else {
            None
        }
    }

    #[rustfmt::skip]
    fn dispatch(&mut self, op: u8) {
        match op {
            0 => self.status.set(FLAG_HALT, true),                     // BRK
            1 => self.op_lit(),                                         // LIT
            2..=5 => {}                                                 // NOP (reserved)
            6 => self.op_ldr(),
            7 => self.op_str(),
            8 => self.op_jmp(),
            9 => self.op_jsr(),
            10 => {}                                                    // NOP (reserved)
            11 => self.op_rts(),
            12..=15 => {}                                               // NOP (reserved)
            16 => { self.wst.pop_byte(); }                              // POP
            17 => { let a = self.wst.peek_byte(1); self.wst.push_byte(a); } // DUP
            18 => { let b = self.wst.pop_byte(); let a = self.wst.pop_byte(); self.wst.push_byte(b); self.wst.push_byte(a); } // SWP
            19 => { let a = self.wst.peek_byte(2); self.wst.push_byte(a); } // OVR
            20 => { let c = self.wst.pop_byte(); let b = self.wst.pop_byte(); let a = self.wst.pop_byte(); self.wst.push_byte(b); self.wst.push_byte(c); self.wst.push_byte(a); } // ROT
            21 => { let a = self.wst.pop_byte(); let b = self.wst.pop_byte(); self.wst.push_byte(a & b); } // AND
            22 => { let a = self.wst.pop_byte(); let b = self.wst.pop_byte(); self.wst.push_byte(a | b); } // ORA
            23 => { let a = self.wst.pop_byte(); let b = self.wst.pop_byte(); self.wst.push_byte(a.checked_shl(b as u32).unwrap_or(0)); } // ROL (shift, not rotate — see spec.md §9)
            24 => { let a = self.wst.pop_byte(); let b = self.wst.pop_byte(); self.wst.push_byte(b.wrapping_add(a)); } // ADD
            25 => { let a = self.wst.pop_byte(); let b = self.wst.pop_byte(); self.wst.push_byte(b.wrapping_sub(a)); } // SUB
            26 => { let a = self.wst.pop_byte(); let b = self.wst.pop_byte(); self.wst.push_byte(b.wrapping_mul(a)); } // MUL
            27 => { let a = self.wst.pop_byte(); let b = self.wst.pop_byte(); self.wst.push_byte(if a == 0 { 0 } else { b.wrapping_div(a) }); } // DIV
            28 => { let a = self.wst.pop_byte(); let b = self.wst.pop_byte(); self.wst.push_byte((b == a) as u8); } // EQU
            29 => { let a = self.wst.pop_byte(); let b = self.wst.pop_byte(); self.wst.push_byte((b != a) as u8); } // NEQ
            30 => { let a = self.wst.pop_byte(); let b = self.wst.pop_byte(); self.wst.push_byte((b > a) as u8); } // GTH
            31 => { let a = self.wst.pop_byte(); let b = self.wst.pop_byte(); self.wst.push_byte((b < a) as u8); } // LTH
            32 => { self.wst.pop_short(); }                              // POP16
            33 => { let a = self.wst.peek_short(2); self.wst.push_short(a); } // DUP16
            34 => { let b = self.wst.pop_short(); let a = self.wst.pop_short(); self.wst.push_short(b); self.wst.push_short(a); } // SWP16
            35 => { let a = self.wst.peek_short(4); self.wst.push_short(a); } // OVR16
            36 => { let c = self.wst.pop_short(); let b = self.wst.pop_short(); let a = self.wst.pop_short(); self.wst.push_short(b); self.wst.push_short(c); self.wst.push_short(a); } // ROT16
            37 => { let a = self.wst.pop_short(); let b = self.wst.pop_short(); self.wst.push_short(a & b); } // AND16
            38 => { let a = self.wst.pop_short(); let b = self.wst.pop_short(); self.wst.push_short(a | b); } // ORA16
            39 => { let a = self.wst.pop_short(); let b = self.wst.pop_short(); self.wst.push_short(a.checked_shl(b as u32).unwrap_or(0)); } // ROL16
            40 => { let a = self.wst.pop_short(); let b = self.wst.pop_short(); self.wst.push_short(b.wrapping_add(a)); } // ADD16
            41 => { let a = self.wst.pop_short(); let b = self.wst.pop_short(); self.wst.push_short(b.wrapping_sub(a)); } // SUB16
            42 => { let a = self.wst.pop_short(); let b = self.wst.pop_short(); self.wst.push_short(b.wrapping_mul(a)); } // MUL16
            43 => { let a = self.wst.pop_short(); let b = self.wst.pop_short(); self.wst.push_short(if a == 0 { 0 } else { b.wrapping_div(a) }); } // DIV16
            44 => { let a = self.wst.pop_short(); let b = self.wst.pop_short(); self.wst.push_byte((b == a) as u8); } // EQU16
            45 => { let a = self.wst.pop_short(); let b = self.wst.pop_short(); self.wst.push_byte((b != a) as u8); } // NEQ16
            46 => { let a = self.wst.pop_short(); let b = self.wst.pop_short(); self.wst.push_byte((b > a) as u8); } // GTH16
            47 => { let a = self.wst.pop_short(); let b = self.wst.pop_short(); self.wst.push_byte((b < a) as u8); } // LTH16
            _ => unreachable!("opcode index is masked to 0..=47"),
        }
    }

    fn op_lit(&mut self) {
        self.literal = self.literal.wrapping_add(self.ram.fetch());
    }

    fn op_ldr(&mut self) {
        let addr = self.wst.pop_short();
        let value = self.ram.read(addr);
        self.wst.push_byte(value);
    }

    fn op_str(&mut self) {
        let addr = self.wst.pop_short();
        let value = self.wst.pop_byte();
        self.ram.write(addr, value);
    }

    fn op_jmp(&mut self) {
        self.ram.ptr = self.wst.pop_short();
    }

    fn op_jsr(&mut self) {
        self.rst.push(self.ram.ptr);
        self.ram.ptr = self.wst.pop_short();
    }

    fn op_rts(&mut self) {
        self.ram.ptr = self.rst.pop();
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}
