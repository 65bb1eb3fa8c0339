//! CPU contexts captured at the time of a crash.
//!
//! These are pared-down versions of the WinNT.h `CONTEXT` structures carried
//! in a minidump, keeping only the registers that matter for resolving the
//! address of a memory operand. Debug registers, floating point state and
//! vector state are not represented.

use std::fmt;

use crate::errors::Error;

/// CPU type bits of a minidump `context_flags` value.
const CONTEXT_CPU_MASK: u32 = 0xffffff00;
/// `CONTEXT_X86` from WinNT.h.
const CONTEXT_X86: u32 = 0x10000;
/// `CONTEXT_AMD64` from WinNT.h.
const CONTEXT_AMD64: u32 = 0x100000;

/// CPU architectures whose instructions this crate can analyze.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Cpu {
    /// 32-bit x86
    X86,
    /// x86-64
    Amd64,
}

impl Cpu {
    /// Maps the CPU type bits of a raw minidump `context_flags` value.
    ///
    /// # Errors
    ///
    /// Any architecture other than x86 and amd64 fails with
    /// [`Error::UnsupportedArchitecture`] carrying the raw flags.
    pub fn from_raw(context_flags: u32) -> Result<Cpu, Error> {
        match context_flags & CONTEXT_CPU_MASK {
            CONTEXT_X86 => Ok(Cpu::X86),
            CONTEXT_AMD64 => Ok(Cpu::Amd64),
            _ => Err(Error::UnsupportedArchitecture(context_flags)),
        }
    }
}

impl fmt::Display for Cpu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cpu::X86 => f.write_str("x86"),
            Cpu::Amd64 => f.write_str("amd64"),
        }
    }
}

/// The x86 registers used when evaluating a memory operand.
///
/// Field names and widths follow the `CONTEXT` structure for x86, so values
/// read out of a dump can be copied over directly. The segment fields hold
/// the selector values as captured; no descriptor table translation is
/// applied when they are used.
#[derive(Clone, Debug, Default)]
pub struct ContextX86 {
    pub gs: u32,
    pub fs: u32,
    pub es: u32,
    pub ds: u32,
    pub edi: u32,
    pub esi: u32,
    pub ebx: u32,
    pub edx: u32,
    pub ecx: u32,
    pub eax: u32,
    pub ebp: u32,
    pub eip: u32,
    pub esp: u32,
}

/// The amd64 registers used when evaluating a memory operand.
///
/// Field names and order follow the `CONTEXT` structure for amd64. Segment
/// selectors are not carried: under the 64-bit flat model `ds` and `es`
/// contribute nothing to an address, and the `fs`/`gs` base addresses live
/// in MSRs a dump does not capture.
#[derive(Clone, Debug, Default)]
pub struct ContextAmd64 {
    pub rax: u64,
    pub rcx: u64,
    pub rdx: u64,
    pub rbx: u64,
    pub rsp: u64,
    pub rbp: u64,
    pub rsi: u64,
    pub rdi: u64,
    pub r8: u64,
    pub r9: u64,
    pub r10: u64,
    pub r11: u64,
    pub r12: u64,
    pub r13: u64,
    pub r14: u64,
    pub r15: u64,
    pub rip: u64,
}

/// A captured thread context, tagged with its architecture.
#[derive(Clone, Debug)]
pub enum DumpContext {
    X86(ContextX86),
    Amd64(ContextAmd64),
}

impl DumpContext {
    /// The architecture this context was captured on.
    pub fn cpu(&self) -> Cpu {
        match self {
            DumpContext::X86(_) => Cpu::X86,
            DumpContext::Amd64(_) => Cpu::Amd64,
        }
    }

    /// The address of the instruction the thread was executing.
    pub fn instruction_pointer(&self) -> u64 {
        match self {
            DumpContext::X86(context) => u64::from(context.eip),
            DumpContext::Amd64(context) => context.rip,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_from_raw() {
        // Real context_flags carry validity bits below the CPU type bits.
        assert_eq!(Cpu::from_raw(0x1003f), Ok(Cpu::X86));
        assert_eq!(Cpu::from_raw(0x10000f), Ok(Cpu::Amd64));
        // ARM64
        assert_eq!(
            Cpu::from_raw(0x400000),
            Err(Error::UnsupportedArchitecture(0x400000))
        );
        assert_eq!(Cpu::from_raw(0), Err(Error::UnsupportedArchitecture(0)));
    }

    #[test]
    fn test_cpu_display() {
        assert_eq!(Cpu::X86.to_string(), "x86");
        assert_eq!(Cpu::Amd64.to_string(), "amd64");
    }

    #[test]
    fn test_instruction_pointer() {
        let context = DumpContext::X86(ContextX86 {
            eip: 0xffff_0000,
            ..ContextX86::default()
        });
        assert_eq!(context.cpu(), Cpu::X86);
        assert_eq!(context.instruction_pointer(), 0xffff_0000);

        let context = DumpContext::Amd64(ContextAmd64 {
            rip: 0x7fff_ffff_0000,
            ..ContextAmd64::default()
        });
        assert_eq!(context.cpu(), Cpu::Amd64);
        assert_eq!(context.instruction_pointer(), 0x7fff_ffff_0000);
    }
}
