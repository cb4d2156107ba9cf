//! Device session.
//!
//! [`Device`] owns the transport, the registry and the command queue. The
//! queue is a `VecDeque` where new commands are pushed at the front and the
//! back holds the oldest command, the only one ever in flight. Each call to
//! [`Device::poll`] drains the frames received since the last call,
//! attributes responses to the in-flight command and transmits the next
//! command once the previous one has resolved.

use std::collections::VecDeque;
use std::thread;

use crossbeam_channel::{Receiver, Sender};
use nexlink_metrics::{metric_defs, Metric, PanelLabels};
use nexlink_protocol::{Event, FaultCode, ReturnMode, TouchState};
use tracing::{debug, error, info, trace, warn};

use crate::command::{Command, CommandKind, Origin, PageTarget, Status};
use crate::config::DeviceConfig;
use crate::error::{DeviceError, Result};
use crate::registry::{Key, PageRef, Registry, WidgetRef};
use crate::transport::Transport;
use crate::widget::{PropertyValue, Widget};

// ============================================================================
// Device Events
// ============================================================================

/// Notifications delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// A hooked widget was pressed or released.
    Touch {
        widget: WidgetRef,
        /// Page name.
        page: String,
        /// Widget name.
        name: String,
        state: TouchState,
    },

    /// The displayed page changed.
    PageChanged {
        page: PageRef,
        name: String,
        id: Option<u8>,
    },

    /// A widget property was read or written with a new value.
    ValueChanged {
        widget: WidgetRef,
        /// Widget name.
        name: String,
        property: String,
        value: PropertyValue,
    },

    /// A command completed with an error.
    CommandFailed {
        /// Instruction text.
        command: String,
        origin: Origin,
        /// Fault reported by the panel, if the final frame was one.
        fault: Option<FaultCode>,
        /// Failed by the response timeout.
        timed_out: bool,
    },

    /// A response frame arrived with no command waiting for it.
    Unsolicited(Event),
}

// ============================================================================
// Device
// ============================================================================

/// A session with one panel.
pub struct Device<T: Transport> {
    transport: T,
    registry: Registry,
    config: DeviceConfig,
    commands: VecDeque<Command>,
    current_page: Option<PageRef>,
    initialized: bool,
    subscribers: Vec<Sender<DeviceEvent>>,
    /// Reused by `query_current_page` once it has completed.
    sendme: Option<Command>,
    retained: Vec<Command>,
    labels: PanelLabels,
}

impl<T: Transport> Device<T> {
    /// A session over `transport`. Nothing is sent until the first poll or
    /// [`Device::init`].
    pub fn new(transport: T, registry: Registry, config: DeviceConfig) -> Self {
        let labels = PanelLabels::new(config.name.clone());
        Self {
            transport,
            registry,
            config,
            commands: VecDeque::new(),
            current_page: None,
            initialized: false,
            subscribers: Vec::new(),
            sendme: None,
            retained: Vec::new(),
            labels,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Mutable registry access, for hooking pages before `init`.
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Cached displayed page.
    pub fn current_page(&self) -> Option<PageRef> {
        self.current_page
    }

    /// Whether `init` has completed since creation or the last restart.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Commands in queue order, oldest last.
    pub fn queue(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }

    pub fn queue_len(&self) -> usize {
        self.commands.len()
    }

    /// Receive device events on a new channel.
    pub fn subscribe(&mut self) -> Receiver<DeviceEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.add_subscriber(tx);
        rx
    }

    /// Deliver device events to an existing channel.
    pub fn add_subscriber(&mut self, tx: Sender<DeviceEvent>) {
        self.subscribers.push(tx);
    }

    // ========================================================================
    // Enqueueing
    // ========================================================================

    /// Queue a command behind every command already queued.
    pub fn enqueue(&mut self, command: Command) {
        trace!(command = %command.text(), "Enqueued command");
        self.commands.push_front(command);
        self.record_queue_depth();
    }

    /// Build a command from a widget and queue it on the widget's behalf.
    pub fn widget_command<F>(&mut self, widget: WidgetRef, build: F) -> Result<()>
    where
        F: FnOnce(&Widget) -> Result<Command>,
    {
        let command = build(self.registry.widget(widget))?.with_origin(Origin::Widget(widget));
        self.enqueue(command);
        Ok(())
    }

    /// Write a widget property.
    pub fn set_property(&mut self, widget: WidgetRef, property: &str, value: PropertyValue) -> Result<()> {
        self.widget_command(widget, |w| Ok(w.set(property, value)?))
    }

    /// Read a widget property into the cache.
    pub fn get_property(&mut self, widget: WidgetRef, property: &str) -> Result<()> {
        self.widget_command(widget, |w| Ok(w.get(property)?))
    }

    /// Write the numeric or boolean value.
    pub fn set_value(&mut self, widget: WidgetRef, value: PropertyValue) -> Result<()> {
        self.widget_command(widget, |w| w.set_value(value))
    }

    /// Write the text of a text-valued widget.
    pub fn set_text(&mut self, widget: WidgetRef, text: &str) -> Result<()> {
        self.widget_command(widget, |w| w.set_text(text))
    }

    /// Show or hide a widget.
    pub fn set_visible(&mut self, widget: WidgetRef, visible: bool) -> Result<()> {
        self.widget_command(widget, |w| w.set_visible(visible))
    }

    /// Raise a progress bar from its cached value.
    pub fn increase(&mut self, widget: WidgetRef, amount: u32) -> Result<()> {
        self.widget_command(widget, |w| w.increase(amount))
    }

    /// Lower a progress bar from its cached value.
    pub fn decrease(&mut self, widget: WidgetRef, amount: u32) -> Result<()> {
        self.widget_command(widget, |w| w.decrease(amount))
    }

    /// Append a sample to a waveform channel.
    pub fn waveform_add(&mut self, widget: WidgetRef, channel: u8, value: u32) -> Result<()> {
        self.widget_command(widget, |w| w.waveform_add(channel, value))
    }

    /// Fill the screen with an RGB565 colour.
    pub fn clear_screen(&mut self, colour: u16) -> Result<()> {
        self.enqueue(Command::clear_screen(colour)?);
        Ok(())
    }

    /// Ask the panel for the displayed page. Only one query is queued at a time.
    pub fn query_current_page(&mut self) {
        let queued = self
            .commands
            .iter()
            .any(|c| matches!(c.kind(), CommandKind::CurrentPage));
        if queued {
            trace!("Current page query already queued");
            return;
        }
        let command = match self.sendme.take() {
            Some(mut command) => {
                command.reset();
                command
            }
            None => Command::current_page().with_origin(Origin::Session),
        };
        self.enqueue(command);
    }

    /// Completed commands built with [`Command::retained`], oldest first.
    pub fn take_retained(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.retained)
    }

    /// Show a page by name or ID.
    pub fn select_page<'a>(&mut self, key: impl Into<Key<'a>>) -> Result<PageRef> {
        let page = self.registry.find_page(key)?;
        self.show_page(page)?;
        Ok(page)
    }

    /// Show a hooked page.
    pub fn show_page(&mut self, page: PageRef) -> Result<()> {
        let entry = self.registry.page_mut(page);
        let command = Command::page(entry.target())?.with_origin(Origin::Page(page));
        entry.set_switch_in_progress(true);
        let (name, id) = (entry.name().to_string(), entry.id());

        self.current_page = Some(page);
        self.enqueue(command);
        debug!(page = %name, ?id, "Selected page");
        self.emit(DeviceEvent::PageChanged { page, name, id });
        Ok(())
    }

    /// Reboot the panel.
    ///
    /// The instruction is written immediately, bypassing the queue, because
    /// the panel answers with its startup frames rather than a response. The
    /// panel forgets its return mode, so the session must be initialized again.
    pub fn restart(&mut self) -> Result<()> {
        info!("Restarting panel");
        self.transport.write(Command::restart().wire())?;
        self.initialized = false;
        Ok(())
    }

    // ========================================================================
    // Poll
    // ========================================================================

    /// Drain received frames, resolve the in-flight command and transmit the
    /// next one. Returns whether the queue is empty.
    ///
    /// A frame that fails to parse does not stop the remaining frames from
    /// being dispatched; the first such error is returned once the next
    /// command has been transmitted.
    pub fn poll(&mut self) -> Result<bool> {
        let mut frames = Vec::new();
        while let Some(frame) = self.transport.read_next()? {
            frames.push(frame);
        }

        let mut first_error: Option<DeviceError> = None;
        for frame in frames {
            self.count(&metric_defs::FRAMES_RECEIVED, None);
            match Event::parse(&frame) {
                Ok(event) => self.dispatch(event),
                Err(e) => {
                    self.count(&metric_defs::FRAME_ERRORS, None);
                    warn!(error = %e, ?frame, "Failed to parse frame");
                    if first_error.is_none() {
                        first_error = Some(e.into());
                    }
                }
            }
        }

        self.expire_stalled();
        self.transmit_next()?;

        if let Some(e) = first_error {
            return Err(e);
        }

        self.idle_refresh()?;
        Ok(self.commands.is_empty())
    }

    /// Poll until the queue is empty, sleeping the poll interval in between.
    ///
    /// Non-fatal errors are logged and draining continues.
    pub fn drain(&mut self) -> Result<()> {
        loop {
            match self.poll() {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!(error = %e, "Error while draining queue"),
            }
            thread::sleep(self.config.poll_interval());
        }
    }

    fn dispatch(&mut self, event: Event) {
        trace!(%event, "Received frame");
        match event {
            Event::TouchPress { page_id, widget_id } => {
                self.dispatch_touch(page_id, widget_id, TouchState::Press)
            }
            Event::TouchRelease { page_id, widget_id } => {
                self.dispatch_touch(page_id, widget_id, TouchState::Release)
            }
            other => self.dispatch_response(other),
        }
    }

    fn dispatch_touch(&mut self, page_id: u8, widget_id: u8, state: TouchState) {
        let Some(widget) = self.registry.touch_target(page_id, widget_id) else {
            self.count(&metric_defs::TOUCH_UNKNOWN, None);
            info!(page_id, widget_id, "Touch event for unknown page:widget");
            return;
        };

        self.count(&metric_defs::TOUCH_EVENTS, None);
        let page = self.registry.page(widget.page()).name().to_string();
        let name = self.registry.widget(widget).name().to_string();
        debug!(%page, widget = %name, ?state, "Touch event");
        self.emit(DeviceEvent::Touch {
            widget,
            page,
            name,
            state,
        });
    }

    /// Attribute a response to the oldest sent command, rotating past any
    /// command that cannot own it for at most one full turn of the queue.
    fn dispatch_response(&mut self, event: Event) {
        for _ in 0..self.commands.len() {
            let Some(oldest) = self.commands.back_mut() else {
                break;
            };

            match oldest.status() {
                Status::Sent => {
                    if oldest.accept(event) {
                        if let Some(done) = self.commands.pop_back() {
                            self.finish(done);
                        }
                        self.record_queue_depth();
                    }
                    return;
                }
                Status::Created => {
                    warn!(%event, command = %oldest, "Response received but oldest command was never sent");
                    self.count(&metric_defs::DESYNC_ROTATIONS, None);
                    self.commands.rotate_right(1);
                }
                Status::Successful | Status::Error => {
                    error!(%event, command = %oldest, "Response received but oldest command already completed");
                    self.count(&metric_defs::DESYNC_ROTATIONS, None);
                    self.commands.rotate_right(1);
                }
            }
        }

        debug!(%event, "Unsolicited frame");
        self.count(&metric_defs::UNSOLICITED_FRAMES, None);
        self.emit(DeviceEvent::Unsolicited(event));
    }

    fn expire_stalled(&mut self) {
        let Some(timeout) = self.config.response_timeout() else {
            return;
        };
        let stalled = self.commands.back().is_some_and(|c| {
            c.status() == Status::Sent && c.sent_at().is_some_and(|at| at.elapsed() >= timeout)
        });
        if !stalled {
            return;
        }

        if let Some(mut command) = self.commands.pop_back() {
            command.expire();
            warn!(command = %command.text(), ?timeout, "Command timed out");
            self.count(&metric_defs::COMMANDS_TIMED_OUT, Some(command.kind().label()));
            self.finish(command);
            self.record_queue_depth();
        }
    }

    fn transmit_next(&mut self) -> Result<()> {
        let Some(command) = self.commands.back_mut() else {
            return Ok(());
        };
        if command.status() != Status::Created {
            return Ok(());
        }

        debug!(command = %command.text(), "Sending command");
        command.transmit(&self.transport)?;
        let kind = command.kind().label();
        self.count(&metric_defs::COMMANDS_SENT, Some(kind));
        Ok(())
    }

    fn idle_refresh(&mut self) -> Result<()> {
        if !self.initialized || !self.commands.is_empty() {
            return Ok(());
        }
        let Some(page) = self.current_page else {
            return Ok(());
        };
        if self.registry.page(page).switch_in_progress() {
            return Ok(());
        }

        for command in self.page_refresh_commands(page, false)? {
            self.enqueue(command);
        }
        Ok(())
    }

    fn page_refresh_commands(&self, page: PageRef, onetime: bool) -> Result<Vec<Command>> {
        let mut commands = Vec::new();
        for widget_ref in self.registry.widget_refs(page) {
            let widget = self.registry.widget(widget_ref);
            let batch = if onetime {
                widget.onetime_refresh_commands()?
            } else {
                widget.refresh_commands()?
            };
            commands.extend(batch.into_iter().map(|c| c.with_origin(Origin::Widget(widget_ref))));
        }
        Ok(commands)
    }

    // ========================================================================
    // Completion routing
    // ========================================================================

    fn finish(&mut self, command: Command) {
        let kind = Some(command.kind().label());
        if let Some(sent_at) = command.sent_at() {
            let latency = &metric_defs::COMMAND_LATENCY;
            metrics::histogram!(latency.name, &self.labels.for_metric(latency, kind))
                .record(sent_at.elapsed().as_secs_f64() * 1000.0);
        }

        match command.kind() {
            CommandKind::CurrentPage => self.on_current_page(&command),
            CommandKind::Page { .. } => {
                if let Origin::Page(page) = command.origin() {
                    self.registry.page_mut(page).set_switch_in_progress(false);
                }
            }
            CommandKind::GetProperty { property, .. } | CommandKind::SetProperty { property, .. } => {
                if let (Origin::Widget(widget), Some(value)) = (command.origin(), command.result()) {
                    self.store_property(widget, property, value.clone());
                }
            }
            CommandKind::Raw | CommandKind::ReturnMode(_) => {}
        }

        if command.status() == Status::Successful {
            self.count(&metric_defs::COMMANDS_SUCCEEDED, kind);
            debug!(command = %command.text(), "Command completed");
        } else {
            self.count(&metric_defs::COMMANDS_FAILED, kind);
            let fault = match command.final_event() {
                Some(Event::Fault(code)) => Some(*code),
                _ => None,
            };
            error!(
                command = %command.text(),
                final_event = ?command.final_event(),
                data_event = ?command.data_event(),
                "Command failed"
            );
            self.emit(DeviceEvent::CommandFailed {
                command: command.text(),
                origin: command.origin(),
                fault,
                timed_out: command.timed_out(),
            });
        }

        if matches!(command.kind(), CommandKind::CurrentPage) && command.origin() == Origin::Session {
            self.sendme = Some(command);
        } else if command.is_retained() {
            self.retained.push(command);
        }
    }

    fn store_property(&mut self, widget: WidgetRef, property: &str, value: PropertyValue) {
        let entry = self.registry.widget_mut(widget);
        if !entry.store(property, value.clone()) {
            return;
        }
        let name = entry.name().to_string();
        trace!(widget = %name, property, %value, "Property changed");
        self.emit(DeviceEvent::ValueChanged {
            widget,
            name,
            property: property.to_string(),
            value,
        });
    }

    fn on_current_page(&mut self, command: &Command) {
        let page_id = match (command.status(), command.data_event()) {
            (Status::Successful, Some(Event::CurrentPage { page_id })) => *page_id,
            _ => {
                error!(data_event = ?command.data_event(), "Current page query failed");
                self.current_page = None;
                return;
            }
        };

        let page = match self.registry.find_page(page_id) {
            Ok(page) => page,
            Err(e) => {
                warn!(page_id, error = %e, "Panel shows a page that was never hooked");
                self.current_page = None;
                return;
            }
        };

        if self.current_page != Some(page) {
            self.current_page = Some(page);
            let entry = self.registry.page(page);
            let event = DeviceEvent::PageChanged {
                page,
                name: entry.name().to_string(),
                id: entry.id(),
            };
            self.emit(event);
        }
    }

    // ========================================================================
    // Initialization
    // ========================================================================

    /// Bring the panel to a known state.
    ///
    /// Switches the panel to always-respond (`bkcmd=3`), then shows every page with an ID in ascending
    /// order and reads its one-time properties, then shows the home page.
    /// Every step is drained before the next. Must run before the poller
    /// starts.
    pub fn init(&mut self) -> Result<()> {
        info!(panel = %self.config.name, "Initializing panel");
        self.transport.flush_pending()?;

        self.enqueue(Command::return_mode(ReturnMode::Always).with_origin(Origin::Session));
        self.drain()?;

        let pages: Vec<PageRef> = self.registry.pages_by_id().map(|(_, page)| page).collect();
        for page in pages {
            self.show_page(page)?;
            self.drain()?;
            self.onetime_refresh(page)?;
            self.drain()?;
        }

        let home = self.config.home_page;
        match self.registry.find_page(home) {
            Ok(page) => self.show_page(page)?,
            Err(_) => {
                warn!(page_id = home, "Home page is not hooked, selecting it by ID");
                self.current_page = None;
                self.enqueue(Command::page(PageTarget::Id(home))?.with_origin(Origin::Session));
            }
        }
        self.drain()?;

        self.initialized = true;
        info!(panel = %self.config.name, "Panel initialized");
        Ok(())
    }

    /// Queue the one-time property reads of every widget on a page.
    pub fn onetime_refresh(&mut self, page: PageRef) -> Result<()> {
        if self.registry.page(page).switch_in_progress() {
            debug!(page = %self.registry.page(page).name(), "Page switch in progress, skipping refresh");
            return Ok(());
        }
        for command in self.page_refresh_commands(page, true)? {
            self.enqueue(command);
        }
        Ok(())
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn emit(&mut self, event: DeviceEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn count(&self, metric: &Metric, kind: Option<&str>) {
        metrics::counter!(metric.name, &self.labels.for_metric(metric, kind)).increment(1);
    }

    fn record_queue_depth(&self) {
        let depth = &metric_defs::QUEUE_DEPTH;
        metrics::gauge!(depth.name, &self.labels.for_metric(depth, None)).set(self.commands.len() as f64);
    }
}
