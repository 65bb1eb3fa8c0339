//! Recover the memory address a faulting x86/amd64 instruction was about to
//! access.
//!
//! A crash dump records the instruction pointer and the register values at
//! the moment of failure, but not the operand address the CPU had computed
//! when the access faulted. For triage that address matters: a destination
//! operand pointing into page zero is a very different bug from a source
//! operand reading just past the end of a heap buffer. This crate
//! reconstructs the address by disassembling the faulting instruction out of
//! the dump's memory and evaluating its memory operands against the captured
//! registers.
//!
//! The pieces are small and separable:
//!
//! * [`DumpContext`] holds the captured registers for one of the two
//!   supported architectures and resolves register and segment names
//!   ([`RegisterResolver`]).
//! * [`Disassembler`] produces Intel-syntax instruction text from raw bytes;
//!   [`ObjdumpDisassembler`] does so by running GNU objdump.
//! * [`DisassembledInstruction`] splits that text into an operation and its
//!   operands.
//! * [`MemoryOperandExpression`] parses a single operand of the form
//!   `segment:[base+index*stride+0xoffset]` and evaluates it.
//! * [`AddressCalculator`] ties these together for the instruction at a
//!   given address inside a [`MemoryRegion`].
//!
//! # Examples
//!
//! ```no_run
//! use minidump_disasm::{
//!     AddressCalculator, ContextAmd64, DumpContext, DumpMemory, ObjdumpDisassembler,
//! };
//!
//! fn main() -> Result<(), minidump_disasm::Error> {
//!     // Code and registers as captured in the crash dump.
//!     let code = DumpMemory {
//!         base_address: 0x1000,
//!         bytes: &[0x48, 0x8b, 0x03], // mov rax,QWORD PTR [rbx]
//!     };
//!     let context = DumpContext::Amd64(ContextAmd64 {
//!         rip: 0x1000,
//!         rbx: 0xdead_0000,
//!         ..Default::default()
//!     });
//!
//!     let calculator = AddressCalculator::new(
//!         &ObjdumpDisassembler::new(),
//!         &code,
//!         context.instruction_pointer(),
//!         context.cpu(),
//!     );
//!     assert_eq!(calculator.src_address(&context)?, 0xdead_0000);
//!     Ok(())
//! }
//! ```
//!
//! # Limitations
//!
//! * Only full-width register names resolve; an operand addressed through
//!   `ax` or `r8d` fails with [`Error::UnsupportedRegister`].
//! * On amd64 the `fs` and `gs` segment bases live in MSRs that dumps do not
//!   capture, so operands naming them cannot be resolved.
//! * x86 segment selectors are added in as raw values; no descriptor table
//!   lookup is performed.
//! * Displacement-only operands such as `[0x1000]` are rejected, since the
//!   literal is not a resolvable register name.
//! * RIP-relative operands use the captured `rip` value as-is, with no
//!   next-instruction adjustment.

mod calculator;
mod context;
mod disassembler;
mod errors;
mod expression;
mod instruction;
mod memory;
mod registers;

pub use crate::calculator::{AddressCalculator, OperandSlot, MAX_X86_INSTRUCTION_LEN};
pub use crate::context::{ContextAmd64, ContextX86, Cpu, DumpContext};
pub use crate::disassembler::{Disassembler, ObjdumpDisassembler};
pub use crate::errors::Error;
pub use crate::expression::{MemoryOperandExpression, OffsetSign};
pub use crate::instruction::DisassembledInstruction;
pub use crate::memory::{DumpMemory, MemoryRegion};
pub use crate::registers::RegisterResolver;
