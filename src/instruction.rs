//! Splitting disassembled instruction text into operation and operands.
//!
//! The disassembler hands back one line of Intel-syntax text such as
//! `cmp eax,DWORD PTR [esi+0x10]`. This module reduces that line to an
//! `(operation, dest, src)` triple, dropping tokens that carry no addressing
//! information (instruction prefixes and operand size keywords). It validates
//! operand count and separator placement only; whether an operand is a
//! meaningful memory reference is the expression evaluator's concern.

use std::fmt;

use crate::errors::Error;

/// Instruction prefixes that may precede the operation mnemonic.
const PREFIXES: [&str; 4] = ["lock", "rep", "repz", "repnz"];

/// Operand size annotations emitted by Intel-syntax disassembly.
const SIZE_KEYWORDS: [&str; 5] = ["BYTE", "WORD", "DWORD", "QWORD", "PTR"];

/// One disassembled instruction reduced to its operation and operands.
///
/// Either operand may be empty: an empty `dest` means the instruction takes
/// no operands, and an empty `src` with a non-empty `dest` means it takes
/// exactly one. A non-empty `src` never appears without a `dest`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DisassembledInstruction {
    operation: String,
    dest: String,
    src: String,
}

/// Where the tokenizer is in the `operation dest , src` sequence.
enum ParseState {
    Operation,
    Dest,
    Comma,
    Src,
    End,
}

impl DisassembledInstruction {
    /// Tokenizes one line of disassembled instruction text.
    ///
    /// Tokens are separated by whitespace or commas, with commas kept as
    /// standalone tokens so that operand separation can be checked. Exactly
    /// one comma is allowed, between `dest` and `src`.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::MalformedOperands`] if the comma placement is
    /// wrong: a missing separator between operands, a comma after the last
    /// operand (three-operand instructions are unsupported), or a comma with
    /// no operand following it.
    pub fn parse(text: &str) -> Result<DisassembledInstruction, Error> {
        let mut instruction = DisassembledInstruction::default();

        let mut state = ParseState::Operation;
        for token in tokenize(text) {
            match state {
                ParseState::Operation => {
                    if PREFIXES.contains(&token) {
                        continue;
                    }
                    instruction.operation = token.to_string();
                    state = ParseState::Dest;
                }
                ParseState::Dest => {
                    if SIZE_KEYWORDS.contains(&token) {
                        continue;
                    }
                    instruction.dest = token.to_string();
                    state = ParseState::Comma;
                }
                ParseState::Comma => {
                    if token != "," {
                        return Err(Error::MalformedOperands(format!(
                            "expected comma but found \"{}\"",
                            token
                        )));
                    }
                    state = ParseState::Src;
                }
                ParseState::Src => {
                    if SIZE_KEYWORDS.contains(&token) {
                        continue;
                    }
                    instruction.src = token.to_string();
                    state = ParseState::End;
                }
                ParseState::End => {
                    if token == "," {
                        return Err(Error::MalformedOperands(
                            "found unexpected comma after last operand".to_string(),
                        ));
                    }
                }
            }
        }

        if let ParseState::Src = state {
            // A comma was consumed but nothing followed it.
            return Err(Error::MalformedOperands(
                "found comma but no src operand".to_string(),
            ));
        }

        Ok(instruction)
    }

    /// The operation mnemonic, with any prefixes stripped.
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// The destination (first) operand, or `""` if there are no operands.
    pub fn dest(&self) -> &str {
        &self.dest
    }

    /// The source (second) operand, or `""` if there is at most one operand.
    pub fn src(&self) -> &str {
        &self.src
    }
}

impl fmt::Display for DisassembledInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.operation)?;
        if !self.dest.is_empty() {
            write!(f, " {}", self.dest)?;
        }
        if !self.src.is_empty() {
            write!(f, ",{}", self.src)?;
        }
        Ok(())
    }
}

/// Splits instruction text on whitespace and commas, keeping each comma as
/// its own token.
fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut rest = text.trim_start();
    while !rest.is_empty() {
        if let Some(tail) = rest.strip_prefix(',') {
            tokens.push(",");
            rest = tail.trim_start();
        } else {
            let len = rest
                .find(|c: char| c.is_whitespace() || c == ',')
                .unwrap_or(rest.len());
            let (token, tail) = rest.split_at(len);
            tokens.push(token);
            rest = tail.trim_start();
        }
    }
    tokens
}
