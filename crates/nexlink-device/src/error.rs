//! Error types for the device layer.

use std::path::PathBuf;

use nexlink_protocol::{EncodeError, FrameError};
use thiserror::Error;

use crate::command::Status;
use crate::widget::WidgetKind;

/// Errors raised by command lifecycle operations.
#[derive(Debug, Error)]
pub enum CommandError {
    /// `transmit` was called on a command that is not in the Created state.
    #[error("command {command} cannot be sent while {status}")]
    NotCreated {
        /// Instruction text.
        command: String,
        /// Status at the time of the call.
        status: Status,
    },

    /// The instruction could not be encoded.
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// Errors raised while hooking or looking up pages and widgets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A page with this name is already hooked.
    #[error("page name {0:?} must be unique")]
    DuplicatePageName(String),

    /// A page with this ID is already hooked.
    #[error("page ID {0} must be unique")]
    DuplicatePageId(u8),

    /// A widget with this name is already hooked on the page.
    #[error("widget name {name:?} must be unique on page {page:?}")]
    DuplicateWidgetName {
        /// Page name.
        page: String,
        /// Widget name.
        name: String,
    },

    /// A widget with this ID is already hooked on the page.
    #[error("widget ID {id} must be unique on page {page:?}")]
    DuplicateWidgetId {
        /// Page name.
        page: String,
        /// Widget ID.
        id: u8,
    },

    /// No page matches the key.
    #[error("unknown page {0}")]
    UnknownPage(String),

    /// No widget on the page matches the key.
    #[error("unknown widget {key} on page {page:?}")]
    UnknownWidget {
        /// Page name.
        page: String,
        /// Name or ID that was looked up.
        key: String,
    },
}

/// A property accessor was used on a widget kind that lacks it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("widget {widget:?} ({kind}) is not {capability}")]
pub struct CapabilityError {
    /// Widget name.
    pub widget: String,
    /// Widget kind.
    pub kind: WidgetKind,
    /// Missing capability.
    pub capability: &'static str,
}

/// Errors raised while loading a panel configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Config file path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The YAML was malformed or did not match the schema.
    #[error("invalid panel configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The layout hooks a duplicate page or widget.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Top-level error for device operations.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// A received frame could not be decoded.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// An instruction could not be encoded.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// A command lifecycle operation failed.
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    /// Registry lookup or hook failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Widget capability check failed.
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    /// A parameter is outside the range the panel accepts.
    #[error("{what} {value} is outside {min}..={max}")]
    OutOfRange {
        what: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    /// The operation needs a property value that was never read or written.
    #[error("widget {widget:?} has no cached {property}")]
    NotCached { widget: String, property: String },

    /// Transport I/O failed.
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),

    /// The poller worker is no longer running.
    #[error("poller is not running")]
    Disconnected,

    /// The poller worker panicked.
    #[error("poller thread panicked")]
    PollerPanicked,
}

impl DeviceError {
    /// Whether the error should stop the poll loop.
    pub fn is_fatal(&self) -> bool {
        match self {
            DeviceError::Frame(e) => e.is_fatal(),
            DeviceError::Io(_) | DeviceError::Disconnected | DeviceError::PollerPanicked => true,
            _ => false,
        }
    }
}

/// Result type for device operations.
pub type Result<T> = std::result::Result<T, DeviceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(DeviceError::Frame(FrameError::UnknownCode(0x42)).is_fatal());
        assert!(!DeviceError::Frame(FrameError::MissingTerminator).is_fatal());
        assert!(DeviceError::Io(std::io::Error::other("gone")).is_fatal());
        assert!(!DeviceError::Registry(RegistryError::DuplicatePageId(1)).is_fatal());
    }

    #[test]
    fn test_registry_error_display() {
        let err = RegistryError::DuplicateWidgetName {
            page: "main".into(),
            name: "t0".into(),
        };
        assert_eq!(err.to_string(), "widget name \"t0\" must be unique on page \"main\"");
    }
}
