/// Errors encountered while recovering the memory address touched by an
/// instruction.
#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    /// The raw context describes a CPU this crate cannot analyze.
    #[error("unsupported CPU architecture (context flags {0:#x})")]
    UnsupportedArchitecture(u32),
    /// No disassembly text could be produced for the instruction bytes.
    #[error("failed to disassemble instruction")]
    DisassemblyUnavailable,
    /// The disassembly text did not split into an operation and operands.
    #[error("failed to parse operands: {0}")]
    MalformedOperands(String),
    /// The operand does not address memory.
    ///
    /// This is the expected outcome for register and immediate operands,
    /// not a sign that anything went wrong.
    #[error("operand is not a memory operand")]
    NotAMemoryOperand,
    /// The operand names a register the captured context cannot resolve.
    #[error("unsupported register: {0}")]
    UnsupportedRegister(String),
    /// The operand names a segment the captured context cannot resolve.
    #[error("unsupported segment register: {0}")]
    UnsupportedSegment(String),
    /// An address fell outside the captured memory region.
    #[error("address {0:#x} is outside the memory region")]
    OutOfRange(u64),
}

impl Error {
    /// Returns just the name of the error, as a more human-friendly version of
    /// an error-code for error logging.
    pub fn name(&self) -> &'static str {
        match self {
            Error::UnsupportedArchitecture(_) => "UnsupportedArchitecture",
            Error::DisassemblyUnavailable => "DisassemblyUnavailable",
            Error::MalformedOperands(_) => "MalformedOperands",
            Error::NotAMemoryOperand => "NotAMemoryOperand",
            Error::UnsupportedRegister(_) => "UnsupportedRegister",
            Error::UnsupportedSegment(_) => "UnsupportedSegment",
            Error::OutOfRange(_) => "OutOfRange",
        }
    }
}
