//! Background poll loop.
//!
//! The [`Poller`] moves a [`Device`] onto a dedicated worker thread that calls
//! [`Device::poll`] on a fixed interval. From then on the device is only
//! reachable through a [`DeviceHandle`]: callers send [`Request`]s over a
//! channel and the worker applies them between polls, so the queue and the
//! registry are only ever touched by one thread.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::RwLock;
use tracing::{error, info, warn};

use crate::command::Command;
use crate::device::{Device, DeviceEvent};
use crate::error::{DeviceError, Result};
use crate::registry::WidgetRef;
use crate::transport::Transport;
use crate::widget::PropertyValue;

// ============================================================================
// Requests (Handle → Worker)
// ============================================================================

/// Operations forwarded to the worker.
#[derive(Debug)]
pub enum Request {
    /// Queue a prepared command.
    Enqueue(Command),
    /// Show a page by name.
    SelectPage(String),
    /// Show a page by ID.
    SelectPageId(u8),
    /// Ask the panel for the displayed page.
    QueryCurrentPage,
    /// Write a widget property.
    SetProperty {
        widget: WidgetRef,
        property: String,
        value: PropertyValue,
    },
    /// Read a widget property.
    GetProperty { widget: WidgetRef, property: String },
    /// Show or hide a widget.
    SetVisible { widget: WidgetRef, visible: bool },
    /// Deliver device events to this channel.
    Subscribe(Sender<DeviceEvent>),
    /// Reboot the panel.
    Restart,
}

impl<T: Transport> Device<T> {
    /// Apply a request received from a handle.
    pub fn apply(&mut self, request: Request) -> Result<()> {
        match request {
            Request::Enqueue(command) => self.enqueue(command),
            Request::SelectPage(name) => {
                self.select_page(name.as_str())?;
            }
            Request::SelectPageId(id) => {
                self.select_page(id)?;
            }
            Request::QueryCurrentPage => self.query_current_page(),
            Request::SetProperty {
                widget,
                property,
                value,
            } => self.set_property(widget, &property, value)?,
            Request::GetProperty { widget, property } => self.get_property(widget, &property)?,
            Request::SetVisible { widget, visible } => self.set_visible(widget, visible)?,
            Request::Subscribe(tx) => self.add_subscriber(tx),
            Request::Restart => self.restart()?,
        }
        Ok(())
    }
}

/// A request paired with the channel its result is returned on, if the
/// sender waits for one.
struct Message {
    request: Request,
    reply: Option<Sender<Result<()>>>,
}

// ============================================================================
// Handle
// ============================================================================

/// Cloneable sender of requests to a running poller.
///
/// Operations that can fail on the device side (unknown page or widget, a
/// capability the widget lacks) block until the worker has applied them and
/// return its result. Do not call them from a completion callback, which
/// runs on the worker.
#[derive(Debug, Clone)]
pub struct DeviceHandle {
    tx: Sender<Message>,
}

impl DeviceHandle {
    /// Forward a request without waiting for it to be applied. A failure is
    /// only logged by the worker.
    pub fn send(&self, request: Request) -> Result<()> {
        self.tx
            .send(Message {
                request,
                reply: None,
            })
            .map_err(|_| DeviceError::Disconnected)
    }

    /// Forward a request and wait for the worker's result.
    pub fn call(&self, request: Request) -> Result<()> {
        let (reply, result) = crossbeam_channel::bounded(1);
        self.tx
            .send(Message {
                request,
                reply: Some(reply),
            })
            .map_err(|_| DeviceError::Disconnected)?;
        // dropped unanswered when the worker exits first
        result.recv().map_err(|_| DeviceError::Disconnected)?
    }

    /// Queue a prepared command without waiting.
    pub fn enqueue(&self, command: Command) -> Result<()> {
        self.send(Request::Enqueue(command))
    }

    /// Show a page by name. Fails if the page is not hooked.
    pub fn select_page(&self, name: &str) -> Result<()> {
        self.call(Request::SelectPage(name.to_string()))
    }

    /// Show a page by ID. Fails if the page is not hooked.
    pub fn select_page_id(&self, id: u8) -> Result<()> {
        self.call(Request::SelectPageId(id))
    }

    /// Ask the panel for the displayed page without waiting.
    pub fn query_current_page(&self) -> Result<()> {
        self.send(Request::QueryCurrentPage)
    }

    /// Queue a property write and wait until it is queued.
    pub fn set_property(&self, widget: WidgetRef, property: &str, value: PropertyValue) -> Result<()> {
        self.call(Request::SetProperty {
            widget,
            property: property.to_string(),
            value,
        })
    }

    /// Queue a property read and wait until it is queued.
    pub fn get_property(&self, widget: WidgetRef, property: &str) -> Result<()> {
        self.call(Request::GetProperty {
            widget,
            property: property.to_string(),
        })
    }

    /// Show or hide a widget. Fails if the widget cannot be hidden.
    pub fn set_visible(&self, widget: WidgetRef, visible: bool) -> Result<()> {
        self.call(Request::SetVisible { widget, visible })
    }

    /// Receive device events from the worker.
    pub fn subscribe(&self) -> Result<Receiver<DeviceEvent>> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.send(Request::Subscribe(tx))?;
        Ok(rx)
    }

    /// Reboot the panel.
    pub fn restart(&self) -> Result<()> {
        self.call(Request::Restart)
    }
}

// ============================================================================
// Poller
// ============================================================================

/// Worker thread running the poll loop.
pub struct Poller {
    running: Arc<RwLock<bool>>,
    handle: DeviceHandle,
    thread: Option<JoinHandle<Result<()>>>,
}

impl Poller {
    /// Move `device` onto a new worker thread and start polling.
    pub fn spawn<T: Transport + 'static>(device: Device<T>) -> std::io::Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let running = Arc::new(RwLock::new(true));
        let flag = running.clone();
        let name = format!("nexlink-{}", device.config().name);

        let thread = thread::Builder::new()
            .name(name)
            .spawn(move || poll_loop(device, rx, flag))?;

        Ok(Self {
            running,
            handle: DeviceHandle { tx },
            thread: Some(thread),
        })
    }

    /// A handle for sending requests to the worker.
    pub fn handle(&self) -> DeviceHandle {
        self.handle.clone()
    }

    /// Whether the worker is still looping.
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the loop and wait for the worker. Returns the loop's result,
    /// which is the fatal error if one ended it early.
    pub fn stop(mut self) -> Result<()> {
        self.request_stop();
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| DeviceError::PollerPanicked)?,
            None => Ok(()),
        }
    }

    fn request_stop(&self) {
        let mut running = self.running.write();
        if *running {
            info!("Stopping poller");
            *running = false;
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.request_stop();
    }
}

fn poll_loop<T: Transport>(
    mut device: Device<T>,
    requests: Receiver<Message>,
    running: Arc<RwLock<bool>>,
) -> Result<()> {
    let interval = device.config().poll_interval();
    info!(interval_ms = interval.as_millis() as u64, "Starting poller");

    loop {
        if !*running.read() {
            info!("Exiting poller loop");
            return Ok(());
        }

        for Message { request, reply } in requests.try_iter() {
            let result = device.apply(request);
            match reply {
                Some(reply) => {
                    let _ = reply.send(result);
                }
                None => {
                    if let Err(e) = result {
                        warn!(error = %e, "Request failed");
                    }
                }
            }
        }

        match device.poll() {
            Ok(_) => {}
            Err(e) if e.is_fatal() => {
                error!(error = %e, "Poller stopped on fatal error");
                return Err(e);
            }
            Err(e) => warn!(error = %e, "Poll failed"),
        }

        thread::sleep(interval);
    }
}
