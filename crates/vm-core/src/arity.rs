//! The per-opcode stack-arity table (spec.md §4.4).
//!
//! Consulted only by the dispatcher's overflow/underflow guard; the
//! operation implementations in `crate::cpu` are trusted to honor it. This
//! duplicates the knowledge baked into each operation's body — see
//! DESIGN.md for why it stays a separate table rather than a single
//! declarative source, as spec.md §9 suggests a future revision could do.
//!
//! Index is the decoded opcode (0-47; SHORT already folded in by adding 16).
//! Entries are `(consumed, produced)` bytes on the working stack.
///
/// The 16-bit variants (32-47) are recorded as `(0, 0)`, which under-counts
/// their real working-stack traffic (4 bytes in, 2 or 1 out). This matches
/// `original_source/cpu.c`'s `opr[]` table exactly and is an open question
/// from spec.md §9, not a bug to silently fix here: see DESIGN.md.
pub const ARITY: [(u8, u8); 48] = [
    (0, 0), // 0  BRK
    (0, 0), // 1  LIT
    (0, 0), // 2  NOP
    (0, 0), // 3  NOP
    (0, 0), // 4  NOP
    (0, 0), // 5  NOP
    (2, 1), // 6  LDR
    (3, 0), // 7  STR
    (2, 0), // 8  JMP
    (2, 0), // 9  JSR
    (0, 0), // 10 NOP
    (0, 0), // 11 RTS
    (0, 0), // 12 NOP
    (0, 0), // 13 NOP
    (0, 0), // 14 NOP
    (0, 0), // 15 NOP
    (1, 0), // 16 POP
    (1, 2), // 17 DUP
    (2, 2), // 18 SWP
    (3, 3), // 19 OVR
    (3, 3), // 20 ROT
    (2, 1), // 21 AND
    (2, 1), // 22 ORA
    (2, 1), // 23 ROL
    (2, 1), // 24 ADD
    (2, 1), // 25 SUB
    (2, 1), // 26 MUL
    (2, 1), // 27 DIV
    (2, 1), // 28 EQU
    (2, 1), // 29 NEQ
    (2, 1), // 30 GTH
    (2, 1), // 31 LTH
    (0, 0), // 32 POP16 (see module docs: under-counted by design)
    (0, 0), // 33 DUP16
    (0, 0), // 34 SWP16
    (0, 0), // 35 OVR16
    (0, 0), // 36 ROT16
    (0, 0), // 37 AND16
    (0, 0), // 38 ORA16
    (0, 0), // 39 ROL16
    (0, 0), // 40 ADD16
    (0, 0), // 41 SUB16
    (0, 0), // 42 MUL16
    (0, 0), // 43 DIV16
    (0, 0), // 44 EQU16
    (0, 0), // 45 NEQ16
    (0, 0), // 46 GTH16
    (0, 0), // 47 LTH16
];
