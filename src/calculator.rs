//! Recovering the memory address an instruction was about to access.
//!
//! Given the code bytes captured in a crash dump and the register state at
//! the moment of failure, an [`AddressCalculator`] reads the instruction the
//! program counter points at, has it disassembled, and evaluates its memory
//! operands against the captured registers. The resulting address tells a
//! crash analyzer which location the faulting instruction was touching, and
//! whether that location was the source or the destination of the operation.
//!
//! Construction never panics and never reads outside the supplied region.
//! If anything goes wrong while decoding, the calculator is still built but
//! inert: every address request reports the stored failure. Crash analysis
//! must keep going when one instruction cannot be decoded.

use tracing::warn;

use crate::context::Cpu;
use crate::disassembler::Disassembler;
use crate::errors::Error;
use crate::expression;
use crate::instruction::DisassembledInstruction;
use crate::memory::MemoryRegion;
use crate::registers::RegisterResolver;

/// The longest legal x86/amd64 instruction encoding, in bytes.
pub const MAX_X86_INSTRUCTION_LEN: usize = 15;

/// Which operand of an instruction to resolve an address for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperandSlot {
    /// The first operand, the one most instructions write to.
    Dest,
    /// The second operand.
    Src,
}

/// Resolves the memory operands of one instruction to concrete addresses.
///
/// A calculator is bound to a single instruction, the one at `address` in
/// the given region, and decodes it once at construction time. Addresses are
/// then resolved per request against a caller-supplied register resolver, so
/// both operand slots can be queried independently.
#[derive(Clone, Debug)]
pub struct AddressCalculator {
    instruction: Result<DisassembledInstruction, Error>,
}

impl AddressCalculator {
    /// Decodes the instruction at `address` inside `memory`.
    ///
    /// `address` must lie within the region; if it does not, or if the bytes
    /// there cannot be disassembled and tokenized, the failure is stored and
    /// returned from every subsequent request instead. At most
    /// [`MAX_X86_INSTRUCTION_LEN`] bytes are read, fewer when the region
    /// ends first.
    pub fn new<D, M>(disassembler: &D, memory: &M, address: u64, cpu: Cpu) -> AddressCalculator
    where
        D: Disassembler + ?Sized,
        M: MemoryRegion + ?Sized,
    {
        let instruction = Self::decode(disassembler, memory, address, cpu);
        if let Err(error) = &instruction {
            warn!("no instruction available at {:#x}: {}", address, error);
        }
        AddressCalculator { instruction }
    }

    fn decode<D, M>(
        disassembler: &D,
        memory: &M,
        address: u64,
        cpu: Cpu,
    ) -> Result<DisassembledInstruction, Error>
    where
        D: Disassembler + ?Sized,
        M: MemoryRegion + ?Sized,
    {
        let end = memory.base_address().checked_add(memory.size());
        if address < memory.base_address() || end.map_or(true, |end| end <= address) {
            return Err(Error::OutOfRange(address));
        }

        let mut bytes = Vec::with_capacity(MAX_X86_INSTRUCTION_LEN);
        for i in 0..MAX_X86_INSTRUCTION_LEN as u64 {
            match address.checked_add(i).and_then(|a| memory.byte_at_address(a)) {
                Some(byte) => bytes.push(byte),
                None => break,
            }
        }

        let text = disassembler.disassemble(cpu, &bytes)?;
        DisassembledInstruction::parse(&text)
    }

    /// The decoded instruction, or the failure that prevented decoding it.
    pub fn instruction(&self) -> Result<&DisassembledInstruction, Error> {
        self.instruction.as_ref().map_err(Error::clone)
    }

    /// Resolves the address accessed through the given operand slot.
    ///
    /// # Errors
    ///
    /// Reports the stored decoding failure if construction failed, or
    /// [`Error::NotAMemoryOperand`] when the slot holds a register,
    /// an immediate, or nothing at all. Register and segment names in the
    /// operand are resolved through `resolver` and fail with its errors.
    pub fn operand_address<R>(&self, resolver: &R, slot: OperandSlot) -> Result<u64, Error>
    where
        R: RegisterResolver + ?Sized,
    {
        let instruction = self.instruction()?;
        let operand = match slot {
            OperandSlot::Dest => instruction.dest(),
            OperandSlot::Src => instruction.src(),
        };
        expression::evaluate(resolver, operand)
    }

    /// Resolves the address accessed through the destination operand.
    pub fn dest_address<R>(&self, resolver: &R) -> Result<u64, Error>
    where
        R: RegisterResolver + ?Sized,
    {
        self.operand_address(resolver, OperandSlot::Dest)
    }

    /// Resolves the address accessed through the source operand.
    pub fn src_address<R>(&self, resolver: &R) -> Result<u64, Error>
    where
        R: RegisterResolver + ?Sized,
    {
        self.operand_address(resolver, OperandSlot::Src)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextX86;
    use crate::memory::DumpMemory;
    use std::cell::RefCell;

    /// Hands back fixed instruction text and records the bytes it was given.
    struct CannedDisassembler {
        text: &'static str,
        bytes_seen: RefCell<Vec<u8>>,
    }

    impl CannedDisassembler {
        fn new(text: &'static str) -> CannedDisassembler {
            CannedDisassembler {
                text,
                bytes_seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl Disassembler for CannedDisassembler {
        fn disassemble(&self, _cpu: Cpu, bytes: &[u8]) -> Result<String, Error> {
            *self.bytes_seen.borrow_mut() = bytes.to_vec();
            Ok(self.text.to_string())
        }
    }

    struct FailingDisassembler;

    impl Disassembler for FailingDisassembler {
        fn disassemble(&self, _cpu: Cpu, _bytes: &[u8]) -> Result<String, Error> {
            Err(Error::DisassemblyUnavailable)
        }
    }

    const CODE: &[u8] = &[
        0x3b, 0x46, 0x10, // cmp eax,DWORD PTR [esi+0x10]
        0xc3, // ret
    ];

    fn code_region() -> DumpMemory<'static> {
        DumpMemory {
            base_address: 0x4000,
            bytes: CODE,
        }
    }

    #[test]
    fn test_operand_selection() {
        let disassembler = CannedDisassembler::new("cmp eax,DWORD PTR [esi+0x10]");
        let calculator = AddressCalculator::new(&disassembler, &code_region(), 0x4000, Cpu::X86);
        let context = ContextX86 {
            esi: 0x1000,
            ..Default::default()
        };

        assert_eq!(calculator.src_address(&context), Ok(0x1010));
        assert_eq!(calculator.dest_address(&context), Err(Error::NotAMemoryOperand));
        assert_eq!(
            calculator.operand_address(&context, OperandSlot::Src),
            Ok(0x1010)
        );
    }

    #[test]
    fn test_instruction_accessor() {
        let disassembler = CannedDisassembler::new("cmp eax,DWORD PTR [esi+0x10]");
        let calculator = AddressCalculator::new(&disassembler, &code_region(), 0x4000, Cpu::X86);
        let instruction = calculator.instruction().unwrap();
        assert_eq!(instruction.operation(), "cmp");
        assert_eq!(instruction.to_string(), "cmp eax,[esi+0x10]");
    }

    #[test]
    fn test_window_is_capped() {
        let bytes = [0x90u8; 64];
        let memory = DumpMemory {
            base_address: 0x4000,
            bytes: &bytes,
        };
        let disassembler = CannedDisassembler::new("nop");
        AddressCalculator::new(&disassembler, &memory, 0x4000, Cpu::X86);
        assert_eq!(disassembler.bytes_seen.borrow().len(), MAX_X86_INSTRUCTION_LEN);
    }

    #[test]
    fn test_window_stops_at_region_end() {
        let disassembler = CannedDisassembler::new("ret");
        AddressCalculator::new(&disassembler, &code_region(), 0x4003, Cpu::X86);
        assert_eq!(*disassembler.bytes_seen.borrow(), vec![0xc3]);
    }

    #[test]
    fn test_out_of_range_is_inert() {
        let context = ContextX86::default();
        let disassembler = CannedDisassembler::new("ret");
        // One before the region and one past its last byte.
        for address in [0x3fff, 0x4004, 0] {
            let calculator =
                AddressCalculator::new(&disassembler, &code_region(), address, Cpu::X86);
            assert_eq!(calculator.dest_address(&context), Err(Error::OutOfRange(address)));
            assert_eq!(calculator.src_address(&context), Err(Error::OutOfRange(address)));
            // Nothing was read from the region.
            assert!(disassembler.bytes_seen.borrow().is_empty());
        }
    }

    #[test]
    fn test_decoding_failures_are_stored() {
        let context = ContextX86::default();

        let calculator =
            AddressCalculator::new(&FailingDisassembler, &code_region(), 0x4000, Cpu::X86);
        assert_eq!(
            calculator.instruction().unwrap_err(),
            Error::DisassemblyUnavailable
        );
        assert_eq!(
            calculator.src_address(&context),
            Err(Error::DisassemblyUnavailable)
        );

        let disassembler = CannedDisassembler::new("mov eax,ebx,");
        let calculator = AddressCalculator::new(&disassembler, &code_region(), 0x4000, Cpu::X86);
        let error = calculator.dest_address(&context).unwrap_err();
        assert_eq!(
            error,
            Error::MalformedOperands("found unexpected comma after last operand".to_string())
        );
        // The same stored failure comes back for the other slot.
        assert_eq!(calculator.src_address(&context), Err(error));
    }
}
