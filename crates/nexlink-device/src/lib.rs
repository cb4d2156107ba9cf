//! Session layer for Nextion HMI panels.
//!
//! Builds on `nexlink-protocol` to drive a panel over a half-duplex link:
//!
//! - [`Command`]: an instruction and its Created → Sent → Successful/Error lifecycle
//! - [`Registry`]: pages and widgets addressed by name or ID
//! - [`Widget`]: capability-gated property accessors over a property cache
//! - [`Device`]: the command queue, response correlation and initialization
//! - [`Poller`] / [`DeviceHandle`]: the background poll loop and its request channel
//! - [`Transport`]: the byte link, with a [`MockTransport`] and a serial
//!   implementation behind the `serial` feature
//!
//! # Example
//!
//! ```rust
//! use nexlink_device::{Device, DeviceConfig, MockTransport, Registry, WidgetKind};
//!
//! let transport = MockTransport::with_responder(|text| {
//!     if text.starts_with("get ") {
//!         vec![b"\x70Hi\xFF\xFF\xFF".to_vec(), b"\x01\xFF\xFF\xFF".to_vec()]
//!     } else {
//!         vec![b"\x01\xFF\xFF\xFF".to_vec()]
//!     }
//! });
//!
//! let mut registry = Registry::new();
//! let main = registry.hook_page("main", Some(0)).unwrap();
//! let t0 = registry.hook_widget(main, WidgetKind::Text, "t0", Some(1)).unwrap();
//!
//! let mut device = Device::new(transport, registry, DeviceConfig::default());
//! device.init().unwrap();
//! assert_eq!(device.registry().widget(t0).text(), Some("Hi"));
//! ```

pub mod command;
pub mod config;
pub mod device;
pub mod error;
pub mod poller;
pub mod registry;
pub mod transport;
pub mod widget;

pub use command::{Command, CommandKind, Origin, PageTarget, Status};
pub use config::{DeviceConfig, PageConfig, PanelConfig, SerialConfig, WidgetConfig};
pub use device::{Device, DeviceEvent};
pub use nexlink_protocol::{Event, FaultCode, ReturnMode, TouchState};
pub use error::{CapabilityError, CommandError, ConfigError, DeviceError, RegistryError, Result};
pub use poller::{DeviceHandle, Poller, Request};
pub use registry::{Key, Page, PageRef, Registry, WidgetRef};
#[cfg(feature = "serial")]
pub use transport::SerialTransport;
pub use transport::{MockTransport, Transport};
pub use widget::{Alignment, Capabilities, PropertyValue, ValueKind, Widget, WidgetKind};
