//! Resolving register and segment names against a captured context.
//!
//! Operands come out of the disassembler as plain text, so the evaluator
//! looks registers up by name. Lookups are total over a fixed name set:
//! a name outside the set is an error, never a silent zero. Only full-width
//! registers are supported, since that is all an addressing expression can
//! name.

use crate::context::{ContextAmd64, ContextX86, DumpContext};
use crate::errors::Error;

/// Maps register and segment names to the values captured in a context.
///
/// Implemented by both raw context types and by [`DumpContext`], which
/// dispatches on its architecture once so that callers never branch on the
/// CPU themselves.
pub trait RegisterResolver {
    /// Returns the value of the named full-width general purpose register.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::UnsupportedRegister`] if the name is not one this
    /// architecture resolves.
    fn register_value(&self, name: &str) -> Result<u64, Error>;

    /// Returns the base address contribution of the named segment register.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::UnsupportedSegment`] if the name is not one this
    /// architecture resolves.
    fn segment_address(&self, name: &str) -> Result<u64, Error>;
}

impl ContextX86 {
    /// Register names accepted by [`RegisterResolver::register_value`].
    pub const REGISTERS: [&'static str; 9] = [
        "eax", "ebx", "ecx", "edx", "edi", "esi", "ebp", "esp", "eip",
    ];

    /// Segment names accepted by [`RegisterResolver::segment_address`].
    pub const SEGMENTS: [&'static str; 4] = ["ds", "es", "fs", "gs"];
}

impl RegisterResolver for ContextX86 {
    fn register_value(&self, name: &str) -> Result<u64, Error> {
        let value = match name {
            "eax" => self.eax,
            "ebx" => self.ebx,
            "ecx" => self.ecx,
            "edx" => self.edx,
            "edi" => self.edi,
            "esi" => self.esi,
            "ebp" => self.ebp,
            "esp" => self.esp,
            "eip" => self.eip,
            _ => return Err(Error::UnsupportedRegister(name.to_string())),
        };
        Ok(u64::from(value))
    }

    fn segment_address(&self, name: &str) -> Result<u64, Error> {
        // The selector value is used as-is; see the note on `ContextX86`.
        let address = match name {
            "ds" => self.ds,
            "es" => self.es,
            "fs" => self.fs,
            "gs" => self.gs,
            _ => return Err(Error::UnsupportedSegment(name.to_string())),
        };
        Ok(u64::from(address))
    }
}

impl ContextAmd64 {
    /// Register names accepted by [`RegisterResolver::register_value`].
    pub const REGISTERS: [&'static str; 17] = [
        "rax", "rbx", "rcx", "rdx", "rdi", "rsi", "rbp", "rsp", "r8", "r9", "r10", "r11", "r12",
        "r13", "r14", "r15", "rip",
    ];

    /// Segment names accepted by [`RegisterResolver::segment_address`].
    ///
    /// `fs` and `gs` are deliberately absent: their base addresses live in
    /// MSRs that a dump does not capture, so an operand naming them cannot
    /// be resolved honestly.
    pub const SEGMENTS: [&'static str; 2] = ["ds", "es"];
}

impl RegisterResolver for ContextAmd64 {
    fn register_value(&self, name: &str) -> Result<u64, Error> {
        let value = match name {
            "rax" => self.rax,
            "rbx" => self.rbx,
            "rcx" => self.rcx,
            "rdx" => self.rdx,
            "rdi" => self.rdi,
            "rsi" => self.rsi,
            "rbp" => self.rbp,
            "rsp" => self.rsp,
            "r8" => self.r8,
            "r9" => self.r9,
            "r10" => self.r10,
            "r11" => self.r11,
            "r12" => self.r12,
            "r13" => self.r13,
            "r14" => self.r14,
            "r15" => self.r15,
            "rip" => self.rip,
            _ => return Err(Error::UnsupportedRegister(name.to_string())),
        };
        Ok(value)
    }

    fn segment_address(&self, name: &str) -> Result<u64, Error> {
        // Flat memory model: ds and es contribute nothing to the address.
        match name {
            "ds" | "es" => Ok(0),
            _ => Err(Error::UnsupportedSegment(name.to_string())),
        }
    }
}

impl RegisterResolver for DumpContext {
    fn register_value(&self, name: &str) -> Result<u64, Error> {
        match self {
            DumpContext::X86(context) => context.register_value(name),
            DumpContext::Amd64(context) => context.register_value(name),
        }
    }

    fn segment_address(&self, name: &str) -> Result<u64, Error> {
        match self {
            DumpContext::X86(context) => context.segment_address(name),
            DumpContext::Amd64(context) => context.segment_address(name),
        }
    }
}
