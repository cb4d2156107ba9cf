//! Protocol constants
//!
//! Return codes, fixed frame lengths and sentinels used on the Nextion serial
//! link. All values are bit-exact.

/// Terminator appended to every instruction and ending every frame.
pub const TERMINATOR: [u8; 3] = [0xFF, 0xFF, 0xFF];

/// Frame sent by the panel when it boots.
pub const STARTUP_SENTINEL: [u8; 6] = [0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF];

// ============================================================================
// Return codes (panel → host)
// ============================================================================

/// Invalid instruction. Also the first byte of the startup sentinel.
pub const CODE_INVALID_INSTRUCTION: u8 = 0x00;
/// Instruction finished successfully.
pub const CODE_SUCCESS: u8 = 0x01;
/// Invalid component ID or name.
pub const CODE_INVALID_COMPONENT: u8 = 0x02;
/// Invalid page ID or name.
pub const CODE_INVALID_PAGE: u8 = 0x03;
/// Invalid picture ID.
pub const CODE_INVALID_PICTURE: u8 = 0x04;
/// Invalid font ID.
pub const CODE_INVALID_FONT: u8 = 0x05;
/// Invalid baud rate setting.
pub const CODE_INVALID_BAUD: u8 = 0x11;
/// Invalid variable name or attribute.
pub const CODE_INVALID_VARIABLE: u8 = 0x1A;
/// Invalid variable operation.
pub const CODE_INVALID_OPERATION: u8 = 0x1B;
/// Assignment failed.
pub const CODE_INVALID_ASSIGNMENT: u8 = 0x1C;
/// EEPROM operation failed.
pub const CODE_INVALID_EEPROM: u8 = 0x1D;
/// Wrong number of parameters.
pub const CODE_INVALID_PARAMETER_COUNT: u8 = 0x1E;
/// IO operation failed.
pub const CODE_INVALID_IO: u8 = 0x1F;
/// Undefined escape character.
pub const CODE_INVALID_ESCAPE: u8 = 0x20;
/// Variable name too long.
pub const CODE_VARIABLE_NAME_TOO_LONG: u8 = 0x23;

/// Touch press/release on a component.
pub const CODE_TOUCH: u8 = 0x65;
/// Current page ID (response to `sendme`).
pub const CODE_CURRENT_PAGE: u8 = 0x66;
/// Touch coordinate while awake.
pub const CODE_POSITION: u8 = 0x67;
/// Touch coordinate while sleeping.
pub const CODE_SLEEP_POSITION: u8 = 0x68;
/// String value (response to `get` on a text attribute).
pub const CODE_STRING: u8 = 0x70;
/// Number value (response to `get` on a numeric attribute).
pub const CODE_NUMBER: u8 = 0x71;
/// Panel is ready after power-on or reset.
pub const CODE_LAUNCHED: u8 = 0x88;

// ============================================================================
// Fixed frame lengths (including the terminator)
// ============================================================================

/// Length of a touch frame.
pub const TOUCH_LEN: usize = 7;
/// Length of a current page frame.
pub const CURRENT_PAGE_LEN: usize = 5;
/// Length of a position or sleep position frame.
pub const POSITION_LEN: usize = 9;
/// Length of a number frame.
pub const NUMBER_LEN: usize = 8;
/// Length of a bare status frame (success, launched, faults).
pub const STATUS_LEN: usize = 4;

/// Touch state byte for a press.
pub const TOUCH_PRESS: u8 = 0x01;
/// Touch state byte for a release.
pub const TOUCH_RELEASE: u8 = 0x00;

/// Expected length of the frame starting with `code`, if the frame has a fixed shape.
///
/// Fault codes have the 4-byte status shape. String frames and unknown codes
/// return `None`. The `0x00` code is ambiguous (fault vs. startup sentinel) and
/// reports the fault length here.
pub fn fixed_frame_len(code: u8) -> Option<usize> {
    match code {
        CODE_TOUCH => Some(TOUCH_LEN),
        CODE_CURRENT_PAGE => Some(CURRENT_PAGE_LEN),
        CODE_POSITION | CODE_SLEEP_POSITION => Some(POSITION_LEN),
        CODE_NUMBER => Some(NUMBER_LEN),
        CODE_SUCCESS | CODE_LAUNCHED => Some(STATUS_LEN),
        code if crate::FaultCode::from_code(code).is_some() => Some(STATUS_LEN),
        _ => None,
    }
}

/// Value of the `bkcmd` system variable controlling which responses are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnMode {
    /// No return data at all.
    NoReturn,
    /// Only success frames.
    SuccessOnly,
    /// Only fault frames (factory default).
    FailOnly,
    /// Every instruction produces a frame. Required for correlation.
    #[default]
    Always,
}

impl ReturnMode {
    /// Numeric value written to `bkcmd`.
    pub const fn value(self) -> u8 {
        match self {
            ReturnMode::NoReturn => 0,
            ReturnMode::SuccessOnly => 1,
            ReturnMode::FailOnly => 2,
            ReturnMode::Always => 3,
        }
    }

    /// Parse a mode from its `bkcmd` value.
    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            0 => Some(ReturnMode::NoReturn),
            1 => Some(ReturnMode::SuccessOnly),
            2 => Some(ReturnMode::FailOnly),
            3 => Some(ReturnMode::Always),
            _ => None,
        }
    }
}
