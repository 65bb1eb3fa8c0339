//! Obtaining instruction text from raw bytes.
//!
//! Disassembly is delegated to an external tool. The [`Disassembler`] trait
//! separates address calculation from whatever produces the text, so that
//! calculations can be driven from canned instruction text as well.
//! [`ObjdumpDisassembler`] is the production implementation; it shells out
//! to GNU objdump and picks the first instruction out of the listing.

use std::ffi::OsString;
use std::io::Write;
use std::process::Command;

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::context::Cpu;
use crate::errors::Error;

/// Produces Intel-syntax instruction text from raw instruction bytes.
pub trait Disassembler {
    /// Decodes the first instruction in `bytes` and returns its text, e.g.
    /// `cmp eax,DWORD PTR [esi+0x10]`.
    ///
    /// Implementations may block until the text is available; no timeout is
    /// imposed here, so callers that need one must enforce it themselves.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::DisassemblyUnavailable`] if no instruction could
    /// be decoded from the bytes.
    fn disassemble(&self, cpu: Cpu, bytes: &[u8]) -> Result<String, Error>;
}

/// A [`Disassembler`] backed by the GNU objdump binary.
///
/// The bytes are written to a temporary file and disassembled with
/// `objdump -D -b binary -M intel`, with the machine selected by the
/// architecture. The temporary file is removed when the call returns.
#[derive(Clone, Debug)]
pub struct ObjdumpDisassembler {
    program: OsString,
}

impl ObjdumpDisassembler {
    /// Creates a disassembler that invokes `objdump` from the search path.
    pub fn new() -> ObjdumpDisassembler {
        ObjdumpDisassembler::with_program("objdump")
    }

    /// Creates a disassembler that invokes the given program instead, for
    /// hosts where objdump is installed under another name (llvm toolchains,
    /// cross binutils).
    pub fn with_program(program: impl Into<OsString>) -> ObjdumpDisassembler {
        ObjdumpDisassembler {
            program: program.into(),
        }
    }
}

impl Default for ObjdumpDisassembler {
    fn default() -> ObjdumpDisassembler {
        ObjdumpDisassembler::new()
    }
}

impl Disassembler for ObjdumpDisassembler {
    fn disassemble(&self, cpu: Cpu, bytes: &[u8]) -> Result<String, Error> {
        if bytes.is_empty() {
            return Err(Error::DisassemblyUnavailable);
        }
        let machine = match cpu {
            Cpu::X86 => "i386",
            Cpu::Amd64 => "i386:x86-64",
        };

        let mut file = NamedTempFile::new().map_err(|error| {
            warn!("failed to create instruction byte file: {}", error);
            Error::DisassemblyUnavailable
        })?;
        file.write_all(bytes).map_err(|error| {
            warn!("failed to write instruction bytes: {}", error);
            Error::DisassemblyUnavailable
        })?;

        let output = Command::new(&self.program)
            .args(["-D", "--no-show-raw-insn", "-b", "binary", "-M", "intel", "-m", machine])
            .arg(file.path())
            .output()
            .map_err(|error| {
                warn!("failed to run {:?}: {}", self.program, error);
                Error::DisassemblyUnavailable
            })?;
        if !output.status.success() {
            warn!("{:?} exited with {}", self.program, output.status);
            return Err(Error::DisassemblyUnavailable);
        }

        let listing = String::from_utf8_lossy(&output.stdout);
        match first_instruction(&listing) {
            Some(text) => {
                debug!("disassembled {} {} bytes to `{}`", cpu, bytes.len(), text);
                Ok(text.to_string())
            }
            None => Err(Error::DisassemblyUnavailable),
        }
    }
}

/// Returns the text of the first instruction in an objdump listing.
fn first_instruction(listing: &str) -> Option<&str> {
    listing.lines().find_map(instruction_text)
}

/// Extracts the instruction text from one listing line, such as
/// `   0:\tcmp    eax,DWORD PTR [esi+0x10]`.
///
/// Instruction lines are indented and start with a hex offset and a colon.
/// File headers and section banners start in column zero and are skipped, as
/// is the `...` marker objdump prints for elided runs of identical bytes.
fn instruction_text(line: &str) -> Option<&str> {
    if !line.starts_with(char::is_whitespace) {
        return None;
    }
    let (offset, text) = line.trim_start().split_once(':')?;
    if offset.is_empty() || !offset.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        return None;
    }
    if !text.starts_with(char::is_whitespace) {
        return None;
    }
    Some(text.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "
/tmp/insn-bytes:     file format binary


Disassembly of section .data:

00000000 <.data>:
   0:\tcmp    eax,DWORD PTR [esi+0x10]
   3:\tret
";

    #[test]
    fn test_first_instruction_skips_headers() {
        assert_eq!(
            first_instruction(LISTING),
            Some("cmp    eax,DWORD PTR [esi+0x10]")
        );
        // The scanner accepts both indented instruction lines, nothing else.
        let texts: Vec<_> = LISTING.lines().filter_map(instruction_text).collect();
        assert_eq!(texts, ["cmp    eax,DWORD PTR [esi+0x10]", "ret"]);
    }

    #[test]
    fn test_instruction_lines_are_indented() {
        assert_eq!(
            instruction_text("   1a:\tmov    eax,ebx"),
            Some("mov    eax,ebx")
        );
        // Column zero lines are headers, not instructions.
        assert_eq!(instruction_text("00000000 <.data>:"), None);
        assert_eq!(instruction_text("Disassembly of section .data:"), None);
        assert_eq!(instruction_text(""), None);
    }

    #[test]
    fn test_offset_must_be_hex() {
        assert_eq!(instruction_text("   xy:\tret"), None);
        assert_eq!(instruction_text("   :\tret"), None);
        assert_eq!(instruction_text("\t..."), None);
    }

    #[test]
    fn test_segment_colon_is_kept() {
        // Only the offset colon separates; colons in the text stay put.
        assert_eq!(
            instruction_text("   8:\tmov    eax,DWORD PTR fs:[esi]"),
            Some("mov    eax,DWORD PTR fs:[esi]")
        );
    }

    #[test]
    fn test_undecodable_bytes() {
        // objdump prints `(bad)` for bytes it cannot decode; that is still
        // a listing line, and tokenizing it yields a memoryless instruction.
        assert_eq!(instruction_text("   0:\t(bad)"), Some("(bad)"));
        assert_eq!(first_instruction(""), None);
        assert_eq!(first_instruction("no listing here\n"), None);
    }

    #[test]
    fn test_missing_program_is_unavailable() {
        let disassembler = ObjdumpDisassembler::with_program("/nonexistent/objdump");
        assert_eq!(
            disassembler.disassemble(Cpu::X86, &[0xc3]),
            Err(Error::DisassemblyUnavailable)
        );
    }
}
