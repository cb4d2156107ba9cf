//! Instruction encoding.
//!
//! Instructions are text, but the terminator is `0xFF`, which is not ASCII.
//! Text is therefore encoded one byte per character (Latin-1) so that any value
//! up to `0xFF` passes through untouched.

use crate::constants::TERMINATOR;
use crate::error::EncodeError;

/// A parameter appended to an instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    /// Integer, written in decimal.
    Int(i64),
    /// Boolean, written as `1` or `0`.
    Bool(bool),
    /// Text, written verbatim.
    Text(String),
}

impl std::fmt::Display for Param {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Param::Int(value) => write!(f, "{}", value),
            Param::Bool(value) => f.write_str(if *value { "1" } else { "0" }),
            Param::Text(text) => f.write_str(text),
        }
    }
}

impl From<i64> for Param {
    fn from(value: i64) -> Self {
        Param::Int(value)
    }
}

impl From<i32> for Param {
    fn from(value: i32) -> Self {
        Param::Int(value as i64)
    }
}

impl From<u32> for Param {
    fn from(value: u32) -> Self {
        Param::Int(value as i64)
    }
}

impl From<u8> for Param {
    fn from(value: u8) -> Self {
        Param::Int(value as i64)
    }
}

impl From<bool> for Param {
    fn from(value: bool) -> Self {
        Param::Bool(value)
    }
}

impl From<&str> for Param {
    fn from(value: &str) -> Self {
        Param::Text(value.to_string())
    }
}

impl From<String> for Param {
    fn from(value: String) -> Self {
        Param::Text(value)
    }
}

/// Encode text one byte per character.
pub fn encode_latin1(text: &str) -> Result<Vec<u8>, EncodeError> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).map_err(|_| EncodeError::Unencodable(c)))
        .collect()
}

/// Build the wire bytes for an instruction.
///
/// Parameters are joined with `,` and separated from the instruction by a
/// space. Without parameters the instruction is sent as is. The terminator is
/// always appended.
pub fn encode_instruction(instruction: &str, params: &[Param]) -> Result<Vec<u8>, EncodeError> {
    let text = if params.is_empty() {
        instruction.to_string()
    } else {
        let joined = params
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(",");
        format!("{} {}", instruction, joined)
    };

    let mut wire = encode_latin1(&text)?;
    wire.extend_from_slice(&TERMINATOR);
    Ok(wire)
}

/// Quote a text attribute value, escaping `"` and `\`.
pub fn quote_text(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for c in text.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Decode wire bytes back to text for logging, without the terminator.
pub fn display_wire(wire: &[u8]) -> String {
    let body = wire.strip_suffix(&TERMINATOR).unwrap_or(wire);
    body.iter().map(|&b| char::from(b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_without_params() {
        assert_eq!(encode_instruction("sendme", &[]).unwrap(), b"sendme\xFF\xFF\xFF");
    }

    #[test]
    fn test_encode_with_params() {
        let wire = encode_instruction("vis", &[Param::from("b0"), Param::from(true)]).unwrap();
        assert_eq!(wire, b"vis b0,1\xFF\xFF\xFF");

        let wire = encode_instruction("page", &[Param::from(0u8)]).unwrap();
        assert_eq!(wire, b"page 0\xFF\xFF\xFF");
    }

    #[test]
    fn test_encode_bool_false() {
        let wire = encode_instruction("tsw", &[Param::from("b0"), Param::from(false)]).unwrap();
        assert_eq!(wire, b"tsw b0,0\xFF\xFF\xFF");
    }

    #[test]
    fn test_set_text_is_byte_exact() {
        let text = format!("t0.txt={}", quote_text("Hi"));
        assert_eq!(
            encode_instruction(&text, &[]).unwrap(),
            b"t0.txt=\"Hi\"\xFF\xFF\xFF"
        );
    }

    #[test]
    fn test_latin1_is_eight_bit_clean() {
        assert_eq!(encode_latin1("\u{FF}é").unwrap(), vec![0xFF, 0xE9]);
        assert_eq!(encode_latin1("€"), Err(EncodeError::Unencodable('€')));
    }

    #[test]
    fn test_quote_text_escapes() {
        assert_eq!(quote_text(r#"a"b\c"#), r#""a\"b\\c""#);
    }

    #[test]
    fn test_display_wire() {
        assert_eq!(display_wire(b"get n0.val\xFF\xFF\xFF"), "get n0.val");
    }
}
