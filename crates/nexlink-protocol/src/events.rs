//! Events decoded from panel frames.
//!
//! Every frame coming from the panel decodes into exactly one [`Event`]. Frames
//! with a fixed shape are checked for length, then leading byte, then
//! terminator before any field is read, so a malformed frame never produces a
//! partially populated event.

use crate::constants::*;
use crate::error::{FaultCode, FrameError};

/// Touch state carried by touch and position frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TouchState {
    /// Finger down.
    Press,
    /// Finger up.
    Release,
}

impl TouchState {
    fn from_byte(byte: u8) -> Result<Self, FrameError> {
        match byte {
            TOUCH_PRESS => Ok(TouchState::Press),
            TOUCH_RELEASE => Ok(TouchState::Release),
            other => Err(FrameError::TouchState(other)),
        }
    }
}

/// A decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A component was pressed.
    TouchPress {
        /// Page ID.
        page_id: u8,
        /// Component ID within the page.
        widget_id: u8,
    },
    /// A component was released.
    TouchRelease {
        /// Page ID.
        page_id: u8,
        /// Component ID within the page.
        widget_id: u8,
    },
    /// The currently displayed page.
    CurrentPage {
        /// Page ID.
        page_id: u8,
    },
    /// Raw touch coordinate.
    Position {
        /// X coordinate in pixels.
        x: u16,
        /// Y coordinate in pixels.
        y: u16,
        /// Press or release.
        touch: TouchState,
    },
    /// Raw touch coordinate received while the panel sleeps.
    SleepPosition {
        /// X coordinate in pixels.
        x: u16,
        /// Y coordinate in pixels.
        y: u16,
        /// Press or release.
        touch: TouchState,
    },
    /// A string attribute value.
    StringValue(String),
    /// A numeric attribute value, in both interpretations.
    NumberValue {
        /// Value as unsigned 32-bit.
        unsigned: u32,
        /// Same bits as signed 32-bit.
        signed: i32,
    },
    /// The instruction in flight finished successfully.
    CommandSucceeded,
    /// The panel is ready.
    EventLaunched,
    /// The panel just booted.
    Startup,
    /// No data was available.
    Empty,
    /// The panel rejected the instruction in flight.
    Fault(FaultCode),
}

/// Frame shapes that have a dedicated decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Touch press/release.
    Touch,
    /// Current page ID.
    CurrentPage,
    /// Touch coordinate.
    Position,
    /// Touch coordinate while sleeping.
    SleepPosition,
    /// String value.
    String,
    /// Number value.
    Number,
    /// Instruction finished.
    Success,
    /// Panel ready.
    Launched,
}

impl FrameKind {
    /// Look up the decoder for a leading byte.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            CODE_TOUCH => Some(FrameKind::Touch),
            CODE_CURRENT_PAGE => Some(FrameKind::CurrentPage),
            CODE_POSITION => Some(FrameKind::Position),
            CODE_SLEEP_POSITION => Some(FrameKind::SleepPosition),
            CODE_STRING => Some(FrameKind::String),
            CODE_NUMBER => Some(FrameKind::Number),
            CODE_SUCCESS => Some(FrameKind::Success),
            CODE_LAUNCHED => Some(FrameKind::Launched),
            _ => None,
        }
    }

    /// Canonical leading byte.
    pub fn code(self) -> u8 {
        match self {
            FrameKind::Touch => CODE_TOUCH,
            FrameKind::CurrentPage => CODE_CURRENT_PAGE,
            FrameKind::Position => CODE_POSITION,
            FrameKind::SleepPosition => CODE_SLEEP_POSITION,
            FrameKind::String => CODE_STRING,
            FrameKind::Number => CODE_NUMBER,
            FrameKind::Success => CODE_SUCCESS,
            FrameKind::Launched => CODE_LAUNCHED,
        }
    }

    /// Exact frame length, or `None` for variable-length string frames.
    pub fn expected_len(self) -> Option<usize> {
        match self {
            FrameKind::Touch => Some(TOUCH_LEN),
            FrameKind::CurrentPage => Some(CURRENT_PAGE_LEN),
            FrameKind::Position | FrameKind::SleepPosition => Some(POSITION_LEN),
            FrameKind::String => None,
            FrameKind::Number => Some(NUMBER_LEN),
            FrameKind::Success | FrameKind::Launched => Some(STATUS_LEN),
        }
    }

    /// Name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            FrameKind::Touch => "touch",
            FrameKind::CurrentPage => "current page",
            FrameKind::Position => "position",
            FrameKind::SleepPosition => "sleep position",
            FrameKind::String => "string",
            FrameKind::Number => "number",
            FrameKind::Success => "success",
            FrameKind::Launched => "launched",
        }
    }

    /// Decode `frame` as this kind.
    ///
    /// Length is checked first, then the leading byte, then the terminator.
    pub fn decode(self, frame: &[u8]) -> Result<Event, FrameError> {
        match self.expected_len() {
            Some(expected) if frame.len() != expected => {
                return Err(FrameError::Length {
                    variant: self.name(),
                    expected,
                    actual: frame.len(),
                });
            }
            None if frame.len() < STATUS_LEN => {
                return Err(FrameError::Length {
                    variant: self.name(),
                    expected: STATUS_LEN,
                    actual: frame.len(),
                });
            }
            _ => {}
        }

        if frame[0] != self.code() {
            return Err(FrameError::FirstByte {
                variant: self.name(),
                expected: self.code(),
                actual: frame[0],
            });
        }

        if !frame.ends_with(&TERMINATOR) {
            return Err(FrameError::MissingTerminator);
        }

        let event = match self {
            FrameKind::Touch => {
                let page_id = frame[1];
                let widget_id = frame[2];
                match TouchState::from_byte(frame[3])? {
                    TouchState::Press => Event::TouchPress { page_id, widget_id },
                    TouchState::Release => Event::TouchRelease { page_id, widget_id },
                }
            }
            FrameKind::CurrentPage => Event::CurrentPage { page_id: frame[1] },
            FrameKind::Position | FrameKind::SleepPosition => {
                let x = u16::from_be_bytes([frame[1], frame[2]]);
                let y = u16::from_be_bytes([frame[3], frame[4]]);
                let touch = TouchState::from_byte(frame[5])?;
                if self == FrameKind::Position {
                    Event::Position { x, y, touch }
                } else {
                    Event::SleepPosition { x, y, touch }
                }
            }
            FrameKind::String => {
                let payload = &frame[1..frame.len() - TERMINATOR.len()];
                let text = std::str::from_utf8(payload).map_err(|_| FrameError::Utf8)?;
                Event::StringValue(text.to_string())
            }
            FrameKind::Number => {
                let unsigned = u32::from_le_bytes([frame[1], frame[2], frame[3], frame[4]]);
                Event::NumberValue {
                    unsigned,
                    signed: unsigned as i32,
                }
            }
            FrameKind::Success => Event::CommandSucceeded,
            FrameKind::Launched => Event::EventLaunched,
        };
        Ok(event)
    }
}

impl Event {
    /// Decode one complete frame.
    ///
    /// An empty frame means no data was available and yields [`Event::Empty`].
    pub fn parse(frame: &[u8]) -> Result<Event, FrameError> {
        let Some(&code) = frame.first() else {
            return Ok(Event::Empty);
        };

        if let Some(kind) = FrameKind::from_code(code) {
            return kind.decode(frame);
        }

        // The boot sentinel starts like an invalid-instruction fault.
        if code == CODE_INVALID_INSTRUCTION && frame == STARTUP_SENTINEL {
            return Ok(Event::Startup);
        }

        if let Some(fault) = FaultCode::from_code(code) {
            return Ok(Event::Fault(fault));
        }

        Err(FrameError::UnknownCode(code))
    }

    /// Whether this is a touch press or release.
    pub fn is_touch(&self) -> bool {
        matches!(self, Event::TouchPress { .. } | Event::TouchRelease { .. })
    }

    /// Whether this is the success frame.
    pub fn is_success(&self) -> bool {
        matches!(self, Event::CommandSucceeded)
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Event::TouchPress { page_id, widget_id } => {
                write!(f, "touch press {}:{}", page_id, widget_id)
            }
            Event::TouchRelease { page_id, widget_id } => {
                write!(f, "touch release {}:{}", page_id, widget_id)
            }
            Event::CurrentPage { page_id } => write!(f, "current page {}", page_id),
            Event::Position { x, y, touch } => write!(f, "position ({}, {}) {:?}", x, y, touch),
            Event::SleepPosition { x, y, touch } => {
                write!(f, "sleep position ({}, {}) {:?}", x, y, touch)
            }
            Event::StringValue(text) => write!(f, "string {:?}", text),
            Event::NumberValue { unsigned, signed } => {
                write!(f, "number {} ({})", unsigned, signed)
            }
            Event::CommandSucceeded => write!(f, "success"),
            Event::EventLaunched => write!(f, "launched"),
            Event::Startup => write!(f, "startup"),
            Event::Empty => write!(f, "empty"),
            Event::Fault(fault) => write!(f, "fault: {}", fault),
        }
    }
}
