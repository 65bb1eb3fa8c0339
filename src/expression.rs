//! Parsing and evaluating memory operand addressing expressions.
//!
//! Intel-syntax memory operands have the shape
//! `segment:[base+index*stride+0xoffset]`, every piece optional except the
//! base register. The parser either matches that shape in full or reports
//! [`Error::NotAMemoryOperand`]; there is no partial matching. A matched
//! expression is then evaluated against a register resolver using wrapping
//! 64-bit arithmetic.

use crate::errors::Error;
use crate::registers::RegisterResolver;

/// The sign in front of a displacement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OffsetSign {
    Plus,
    Minus,
}

/// A memory operand decomposed into its addressing components.
///
/// Produced by [`MemoryOperandExpression::parse`] and consumed by
/// [`MemoryOperandExpression::evaluate`]; it holds register *names*, not
/// values, so one parse can be evaluated against any context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemoryOperandExpression {
    segment: Option<String>,
    base: String,
    index: Option<(String, u64)>,
    offset: Option<(OffsetSign, u64)>,
}

impl MemoryOperandExpression {
    /// Parses one operand string against the memory operand grammar:
    ///
    /// ```text
    /// expr    := (segment ":")? "[" base ("+" index "*" stride)? (sign offset)? "]"
    /// segment := word-char "s"
    /// base    := word-chars
    /// index   := word-chars
    /// stride  := decimal-digits
    /// sign    := "+" | "-"
    /// offset  := "0x" lowercase-hex-digits
    /// ```
    ///
    /// The grammar must consume the whole string. An index register is only
    /// recognized together with a stride; `[eax+0x10]` is a base plus an
    /// offset, and `[eax+ebx]` matches nothing.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::NotAMemoryOperand`] when the string is anything
    /// else, including bare registers and immediates. That outcome is benign;
    /// most operands are not memory references.
    pub fn parse(text: &str) -> Result<MemoryOperandExpression, Error> {
        let mut parser = Parser::new(text);

        let segment = parser.segment();
        if !parser.eat('[') {
            return Err(Error::NotAMemoryOperand);
        }
        let base = parser.take_while(is_word_char);
        if base.is_empty() {
            return Err(Error::NotAMemoryOperand);
        }
        let index = parser.index();
        let offset = parser.offset();
        if !parser.eat(']') || !parser.at_end() {
            return Err(Error::NotAMemoryOperand);
        }

        Ok(MemoryOperandExpression {
            segment: segment.map(str::to_string),
            base: base.to_string(),
            index: index.map(|(name, stride)| (name.to_string(), stride)),
            offset,
        })
    }

    /// Computes the address this expression denotes under `resolver`.
    ///
    /// The result is `segment + base + index * stride`, plus or minus the
    /// offset. Missing pieces contribute zero (stride defaults to one), and
    /// all arithmetic wraps at 64 bits.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::UnsupportedRegister`] or
    /// [`Error::UnsupportedSegment`] if a name in the expression is not one
    /// the resolver knows. No name ever falls back to zero.
    pub fn evaluate<R>(&self, resolver: &R) -> Result<u64, Error>
    where
        R: RegisterResolver + ?Sized,
    {
        let segment = match &self.segment {
            Some(name) => resolver.segment_address(name)?,
            None => 0,
        };
        let base = resolver.register_value(&self.base)?;
        let index = match &self.index {
            Some((name, stride)) => resolver.register_value(name)?.wrapping_mul(*stride),
            None => 0,
        };

        let address = segment.wrapping_add(base).wrapping_add(index);
        Ok(match self.offset {
            Some((OffsetSign::Plus, offset)) => address.wrapping_add(offset),
            Some((OffsetSign::Minus, offset)) => address.wrapping_sub(offset),
            None => address,
        })
    }
}

/// Parses `operand` and evaluates it against `resolver` in one step.
pub fn evaluate<R>(resolver: &R, operand: &str) -> Result<u64, Error>
where
    R: RegisterResolver + ?Sized,
{
    MemoryOperandExpression::parse(operand)?.evaluate(resolver)
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// A cursor over the operand text.
struct Parser<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Parser<'a> {
        Parser { text, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos == self.text.len()
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    /// Consumes `expected` if it is the next character.
    fn eat(&mut self, expected: char) -> bool {
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += c.len_utf8();
                true
            }
            _ => false,
        }
    }

    /// Consumes the longest (possibly empty) run of characters satisfying
    /// `pred`.
    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        &self.text[start..self.pos]
    }

    /// A two character segment register name ending in `s`, followed by `:`.
    fn segment(&mut self) -> Option<&'a str> {
        let start = self.pos;
        let mut chars = self.text[start..].chars();
        if let (Some(first), Some('s'), Some(':')) = (chars.next(), chars.next(), chars.next()) {
            if is_word_char(first) {
                let len = first.len_utf8() + 1;
                self.pos = start + len + 1;
                return Some(&self.text[start..start + len]);
            }
        }
        None
    }

    /// `+index*stride`, as a unit. A `+` that does not introduce a scaled
    /// index register is left for the offset parser.
    fn index(&mut self) -> Option<(&'a str, u64)> {
        let start = self.pos;
        if self.eat('+') {
            let register = self.take_while(is_word_char);
            if !register.is_empty() && self.eat('*') {
                let stride = self.take_while(|c| c.is_ascii_digit());
                if let Ok(stride) = stride.parse::<u64>() {
                    return Some((register, stride));
                }
            }
        }
        self.pos = start;
        None
    }

    /// `+0x…` or `-0x…` with lowercase hex digits.
    fn offset(&mut self) -> Option<(OffsetSign, u64)> {
        let start = self.pos;
        let sign = if self.eat('+') {
            OffsetSign::Plus
        } else if self.eat('-') {
            OffsetSign::Minus
        } else {
            return None;
        };
        if self.eat('0') && self.eat('x') {
            let digits = self.take_while(|c| c.is_ascii_digit() || matches!(c, 'a'..='f'));
            if !digits.is_empty() {
                if let Ok(offset) = u64::from_str_radix(digits, 16) {
                    return Some((sign, offset));
                }
            }
        }
        self.pos = start;
        None
    }
}
