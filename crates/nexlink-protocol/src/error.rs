//! Protocol error types.

use thiserror::Error;

/// Errors raised while decoding a frame received from the panel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Frame length does not match the fixed length of its variant.
    #[error("{variant} frame must be {expected} bytes, got {actual}")]
    Length {
        /// Variant being decoded.
        variant: &'static str,
        /// Expected length including the terminator.
        expected: usize,
        /// Actual length received.
        actual: usize,
    },

    /// Leading byte does not match the variant's code.
    #[error("{variant} frame must start with 0x{expected:02X}, got 0x{actual:02X}")]
    FirstByte {
        /// Variant being decoded.
        variant: &'static str,
        /// Expected leading byte.
        expected: u8,
        /// Actual leading byte.
        actual: u8,
    },

    /// Frame does not end with `FF FF FF`.
    #[error("frame does not end with the FF FF FF terminator")]
    MissingTerminator,

    /// Touch state byte is neither press nor release.
    #[error("invalid touch state 0x{0:02X}")]
    TouchState(u8),

    /// String payload is not valid UTF-8.
    #[error("invalid UTF-8 in string frame")]
    Utf8,

    /// Leading byte is not part of the protocol.
    ///
    /// This indicates firmware/protocol drift and must not be ignored.
    #[error("unknown return code: 0x{0:02X}")]
    UnknownCode(u8),
}

impl FrameError {
    /// Whether the error means the byte stream can no longer be interpreted.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FrameError::UnknownCode(_))
    }
}

/// Errors raised while encoding an instruction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// Character cannot be represented in a single byte.
    #[error("character {0:?} cannot be encoded in a single byte")]
    Unencodable(char),
}

/// Faults reported by the panel for a failed instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultCode {
    /// Invalid instruction.
    InvalidInstruction,
    /// Invalid component ID or name.
    InvalidComponent,
    /// Invalid page ID or name.
    InvalidPage,
    /// Invalid picture ID.
    InvalidPicture,
    /// Invalid font ID.
    InvalidFont,
    /// Invalid baud rate.
    InvalidBaud,
    /// Invalid variable name or attribute.
    InvalidVariable,
    /// Invalid variable operation.
    InvalidOperation,
    /// Assignment failed.
    InvalidAssignment,
    /// EEPROM operation failed.
    InvalidEeprom,
    /// Invalid number of parameters.
    InvalidParameterCount,
    /// IO operation failed.
    InvalidIo,
    /// Undefined escape character.
    InvalidEscape,
    /// Variable name too long.
    VariableNameTooLong,
}

impl FaultCode {
    /// Map a return code to a fault, if it belongs to the fault set.
    pub fn from_code(code: u8) -> Option<Self> {
        use crate::constants::*;
        let fault = match code {
            CODE_INVALID_INSTRUCTION => FaultCode::InvalidInstruction,
            CODE_INVALID_COMPONENT => FaultCode::InvalidComponent,
            CODE_INVALID_PAGE => FaultCode::InvalidPage,
            CODE_INVALID_PICTURE => FaultCode::InvalidPicture,
            CODE_INVALID_FONT => FaultCode::InvalidFont,
            CODE_INVALID_BAUD => FaultCode::InvalidBaud,
            CODE_INVALID_VARIABLE => FaultCode::InvalidVariable,
            CODE_INVALID_OPERATION => FaultCode::InvalidOperation,
            CODE_INVALID_ASSIGNMENT => FaultCode::InvalidAssignment,
            CODE_INVALID_EEPROM => FaultCode::InvalidEeprom,
            CODE_INVALID_PARAMETER_COUNT => FaultCode::InvalidParameterCount,
            CODE_INVALID_IO => FaultCode::InvalidIo,
            CODE_INVALID_ESCAPE => FaultCode::InvalidEscape,
            CODE_VARIABLE_NAME_TOO_LONG => FaultCode::VariableNameTooLong,
            _ => return None,
        };
        Some(fault)
    }

    /// The return code byte for this fault.
    pub fn code(self) -> u8 {
        use crate::constants::*;
        match self {
            FaultCode::InvalidInstruction => CODE_INVALID_INSTRUCTION,
            FaultCode::InvalidComponent => CODE_INVALID_COMPONENT,
            FaultCode::InvalidPage => CODE_INVALID_PAGE,
            FaultCode::InvalidPicture => CODE_INVALID_PICTURE,
            FaultCode::InvalidFont => CODE_INVALID_FONT,
            FaultCode::InvalidBaud => CODE_INVALID_BAUD,
            FaultCode::InvalidVariable => CODE_INVALID_VARIABLE,
            FaultCode::InvalidOperation => CODE_INVALID_OPERATION,
            FaultCode::InvalidAssignment => CODE_INVALID_ASSIGNMENT,
            FaultCode::InvalidEeprom => CODE_INVALID_EEPROM,
            FaultCode::InvalidParameterCount => CODE_INVALID_PARAMETER_COUNT,
            FaultCode::InvalidIo => CODE_INVALID_IO,
            FaultCode::InvalidEscape => CODE_INVALID_ESCAPE,
            FaultCode::VariableNameTooLong => CODE_VARIABLE_NAME_TOO_LONG,
        }
    }
}

impl std::fmt::Display for FaultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            FaultCode::InvalidInstruction => "invalid instruction",
            FaultCode::InvalidComponent => "invalid component",
            FaultCode::InvalidPage => "invalid page",
            FaultCode::InvalidPicture => "invalid picture",
            FaultCode::InvalidFont => "invalid font",
            FaultCode::InvalidBaud => "invalid baud rate",
            FaultCode::InvalidVariable => "invalid variable",
            FaultCode::InvalidOperation => "invalid operation",
            FaultCode::InvalidAssignment => "invalid assignment",
            FaultCode::InvalidEeprom => "EEPROM operation failed",
            FaultCode::InvalidParameterCount => "invalid parameter count",
            FaultCode::InvalidIo => "IO operation failed",
            FaultCode::InvalidEscape => "invalid escape character",
            FaultCode::VariableNameTooLong => "variable name too long",
        };
        write!(f, "{} (0x{:02X})", text, self.code())
    }
}

impl From<FaultCode> for u8 {
    fn from(fault: FaultCode) -> Self {
        fault.code()
    }
}
