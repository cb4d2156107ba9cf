//! Commands and their lifecycle.
//!
//! A command starts `Created`, becomes `Sent` once its wire bytes are written
//! and ends `Successful` or `Error` when the panel answers. Kinds that expect a
//! value (get, sendme) keep the value frame as their data event and complete
//! on the frame that follows it.

use std::fmt;
use std::time::Instant;

use nexlink_protocol::{
    display_wire, encode_instruction, EncodeError, Event, Param, ReturnMode, TERMINATOR,
};

use crate::error::CommandError;
use crate::registry::{PageRef, WidgetRef};
use crate::transport::Transport;
use crate::widget::{PropertyValue, ValueKind};

/// Lifecycle state of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Queued, not yet written.
    Created,
    /// Written and waiting for its response.
    Sent,
    /// Completed by a success frame.
    Successful,
    /// Completed by a fault, another non-success frame or the timeout.
    Error,
}

impl Status {
    /// Whether the command has completed.
    ///
    /// ```
    /// use nexlink_device::Status;
    ///
    /// assert!(!Status::Sent.is_terminal());
    /// assert!(Status::Successful.is_terminal());
    /// assert!(Status::Error.is_terminal());
    /// ```
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Successful | Status::Error)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Created => "created",
            Status::Sent => "sent",
            Status::Successful => "successful",
            Status::Error => "error",
        };
        f.write_str(s)
    }
}

/// Target of a `page` instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageTarget {
    Id(u8),
    Name(String),
}

impl From<PageTarget> for Param {
    fn from(target: PageTarget) -> Self {
        match target {
            PageTarget::Id(id) => Param::from(id),
            PageTarget::Name(name) => Param::from(name),
        }
    }
}

/// What a command does, used to interpret its responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    /// Any instruction; completes on the first frame.
    Raw,
    /// `oid.property=value`.
    SetProperty {
        oid: String,
        property: String,
        value: PropertyValue,
    },
    /// `get oid.property`; accepts a string or number frame as data.
    GetProperty {
        oid: String,
        property: String,
        value_kind: ValueKind,
    },
    /// `sendme`; accepts a current page frame as data.
    CurrentPage,
    /// `page <id|name>`.
    Page { target: PageTarget },
    /// `bkcmd=<mode>`.
    ReturnMode(ReturnMode),
}

impl CommandKind {
    /// Whether `event` is an intermediate value for this kind.
    pub fn accepts_data(&self, event: &Event) -> bool {
        match self {
            CommandKind::GetProperty { .. } => {
                matches!(event, Event::StringValue(_) | Event::NumberValue { .. })
            }
            CommandKind::CurrentPage => matches!(event, Event::CurrentPage { .. }),
            _ => false,
        }
    }

    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            CommandKind::Raw => "raw",
            CommandKind::SetProperty { .. } => "set",
            CommandKind::GetProperty { .. } => "get",
            CommandKind::CurrentPage => "sendme",
            CommandKind::Page { .. } => "page",
            CommandKind::ReturnMode(_) => "bkcmd",
        }
    }
}

/// Who issued a command. Used to route its completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Origin {
    /// Issued directly by application code.
    #[default]
    Application,
    /// Issued on behalf of a widget.
    Widget(WidgetRef),
    /// Issued on behalf of a page.
    Page(PageRef),
    /// Issued by the session itself.
    Session,
}

/// Completion callback. Kept across [`Command::reset`], so it runs once for
/// every completion of a re-driven command.
pub type Callback = Box<dyn FnMut(&Command) + Send>;

/// An instruction and its lifecycle state.
pub struct Command {
    kind: CommandKind,
    wire: Vec<u8>,
    status: Status,
    data_event: Option<Event>,
    final_event: Option<Event>,
    result: Option<PropertyValue>,
    origin: Origin,
    timed_out: bool,
    sent_at: Option<Instant>,
    retained: bool,
    callback: Option<Callback>,
}

impl Command {
    fn new(kind: CommandKind, wire: Vec<u8>) -> Self {
        Self {
            kind,
            wire,
            status: Status::Created,
            data_event: None,
            final_event: None,
            result: None,
            origin: Origin::Application,
            timed_out: false,
            sent_at: None,
            retained: false,
            callback: None,
        }
    }

    /// An instruction given as complete text, e.g. `cls 0`.
    pub fn raw(text: &str) -> Result<Self, EncodeError> {
        Ok(Self::new(CommandKind::Raw, encode_instruction(text, &[])?))
    }

    /// An instruction with parameters, e.g. `vis b0,1`.
    pub fn instruction(instruction: &str, params: &[Param]) -> Result<Self, EncodeError> {
        Ok(Self::new(CommandKind::Raw, encode_instruction(instruction, params)?))
    }

    /// `oid.property=value`. Text values are quoted, booleans are `1`/`0`.
    pub fn set_property(oid: &str, property: &str, value: PropertyValue) -> Result<Self, EncodeError> {
        let text = format!("{}.{}={}", oid, property, value.wire_text());
        let wire = encode_instruction(&text, &[])?;
        Ok(Self::new(
            CommandKind::SetProperty {
                oid: oid.to_string(),
                property: property.to_string(),
                value,
            },
            wire,
        ))
    }

    /// `get oid.property`.
    pub fn get_property(oid: &str, property: &str, value_kind: ValueKind) -> Result<Self, EncodeError> {
        let wire = encode_instruction("get", &[Param::from(format!("{}.{}", oid, property))])?;
        Ok(Self::new(
            CommandKind::GetProperty {
                oid: oid.to_string(),
                property: property.to_string(),
                value_kind,
            },
            wire,
        ))
    }

    /// `sendme`: ask for the displayed page.
    pub fn current_page() -> Self {
        Self::new(CommandKind::CurrentPage, b"sendme\xFF\xFF\xFF".to_vec())
    }

    /// `page <id|name>`.
    pub fn page(target: PageTarget) -> Result<Self, EncodeError> {
        let wire = encode_instruction("page", &[Param::from(target.clone())])?;
        Ok(Self::new(CommandKind::Page { target }, wire))
    }

    /// `bkcmd=<mode>`.
    pub fn return_mode(mode: ReturnMode) -> Self {
        let mut wire = format!("bkcmd={}", mode.value()).into_bytes();
        wire.extend_from_slice(&TERMINATOR);
        Self::new(CommandKind::ReturnMode(mode), wire)
    }

    /// `cls colour`: fill the screen with a 16-bit RGB565 colour.
    pub fn clear_screen(colour: u16) -> Result<Self, EncodeError> {
        Self::instruction("cls", &[u32::from(colour).into()])
    }

    /// `vis oid,1|0`.
    pub fn visibility(oid: &str, visible: bool) -> Result<Self, EncodeError> {
        Self::instruction("vis", &[Param::from(oid), Param::from(visible)])
    }

    /// `rest`: reboot the panel.
    pub fn restart() -> Self {
        Self::new(CommandKind::Raw, b"rest\xFF\xFF\xFF".to_vec())
    }

    /// Set the origin used to route the completion.
    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    /// Run `f` each time the command completes.
    pub fn on_complete<F>(mut self, f: F) -> Self
    where
        F: FnMut(&Command) + Send + 'static,
    {
        self.callback = Some(Box::new(f));
        self
    }

    /// Hand the command back through [`Device::take_retained`] once it
    /// completes instead of dropping it, so it can be reset and re-queued.
    ///
    /// [`Device::take_retained`]: crate::Device::take_retained
    pub fn retained(mut self) -> Self {
        self.retained = true;
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// What the command does, for routing its completion.
    pub fn kind(&self) -> &CommandKind {
        &self.kind
    }

    /// Current lifecycle state.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Encoded bytes including the terminator.
    pub fn wire(&self) -> &[u8] {
        &self.wire
    }

    /// Instruction text without the terminator.
    pub fn text(&self) -> String {
        display_wire(&self.wire)
    }

    /// Value frame received before completion, if any.
    pub fn data_event(&self) -> Option<&Event> {
        self.data_event.as_ref()
    }

    /// Frame that completed the command.
    pub fn final_event(&self) -> Option<&Event> {
        self.final_event.as_ref()
    }

    /// Value read (get, sendme) or written (set) on success.
    pub fn result(&self) -> Option<&PropertyValue> {
        self.result.as_ref()
    }

    /// Who issued the command.
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Whether the command was failed by the response timeout.
    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    /// When the command was transmitted.
    pub fn sent_at(&self) -> Option<Instant> {
        self.sent_at
    }

    /// Whether the device hands the command back after completion.
    pub fn is_retained(&self) -> bool {
        self.retained
    }

    /// Whether the command reached `Successful` or `Error`.
    pub fn is_completed(&self) -> bool {
        self.status.is_terminal()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Write the command and move it to `Sent`.
    pub fn transmit<T: Transport + ?Sized>(&mut self, transport: &T) -> crate::Result<()> {
        if self.status != Status::Created {
            return Err(CommandError::NotCreated {
                command: self.text(),
                status: self.status,
            }
            .into());
        }
        transport.write(&self.wire)?;
        self.status = Status::Sent;
        self.sent_at = Some(Instant::now());
        Ok(())
    }

    /// Feed a response frame. Returns true when the command has completed.
    pub fn accept(&mut self, event: Event) -> bool {
        if self.kind.accepts_data(&event) {
            self.data_event = Some(event);
            return false;
        }

        self.status = if event.is_success() {
            Status::Successful
        } else {
            Status::Error
        };
        self.final_event = Some(event);
        self.complete();
        true
    }

    /// Fail a `Sent` command whose response never arrived.
    ///
    /// Returns false if the command was not waiting for a response.
    pub fn expire(&mut self) -> bool {
        if self.status != Status::Sent {
            return false;
        }
        self.status = Status::Error;
        self.timed_out = true;
        self.complete();
        true
    }

    /// Return to `Created` so the command can be driven again. The completion
    /// callback is kept.
    pub fn reset(&mut self) {
        self.status = Status::Created;
        self.data_event = None;
        self.final_event = None;
        self.result = None;
        self.timed_out = false;
        self.sent_at = None;
    }

    fn complete(&mut self) {
        self.finalize();
        if let Some(mut callback) = self.callback.take() {
            callback(self);
            self.callback = Some(callback);
        }
    }

    fn finalize(&mut self) {
        if self.status != Status::Successful {
            return;
        }
        self.result = match &self.kind {
            CommandKind::SetProperty { value, .. } => Some(value.clone()),
            CommandKind::GetProperty { value_kind, .. } => self
                .data_event
                .as_ref()
                .and_then(|event| PropertyValue::from_event(event, *value_kind)),
            CommandKind::CurrentPage => self
                .data_event
                .as_ref()
                .and_then(|event| PropertyValue::from_event(event, ValueKind::Unsigned)),
            _ => None,
        };
    }
}

impl PartialEq for Command {
    fn eq(&self, other: &Self) -> bool {
        self.status == other.status && self.wire == other.wire && self.data_event == other.data_event
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("text", &self.text())
            .field("status", &self.status)
            .field("kind", &self.kind)
            .field("data_event", &self.data_event)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Command {} - {}", self.text(), self.status)
    }
}
