//! Integration tests for response correlation over a mock link.
//!
//! These drive a `Device` through `poll()` with frames injected into a
//! `MockTransport` and check which command each frame is attributed to.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use nexlink_device::{
    Command, Device, DeviceConfig, DeviceEvent, MockTransport, PropertyValue, Registry, Status,
    WidgetKind, WidgetRef,
};
use nexlink_protocol::{Event, FaultCode};

const SUCCESS: &[u8] = b"\x01\xFF\xFF\xFF";

fn config() -> DeviceConfig {
    DeviceConfig {
        poll_interval_ms: 1,
        ..DeviceConfig::default()
    }
}

/// A registry with page 0 holding a slider and a number, and page 1 holding a text.
fn registry() -> (Registry, WidgetRef, WidgetRef) {
    let mut registry = Registry::new();
    let main = registry.hook_page("main", Some(0)).unwrap();
    let h0 = registry.hook_widget(main, WidgetKind::Slider, "h0", Some(1)).unwrap();
    let n0 = registry.hook_widget(main, WidgetKind::Number, "n0", Some(2)).unwrap();
    let settings = registry.hook_page("settings", Some(1)).unwrap();
    registry.hook_widget(settings, WidgetKind::Text, "t0", Some(1)).unwrap();
    (registry, h0, n0)
}

fn recording(status: &Arc<Mutex<Vec<Status>>>) -> impl FnMut(&Command) + Send + 'static {
    let status = status.clone();
    move |command: &Command| status.lock().unwrap().push(command.status())
}

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn test_commands_transmitted_in_order() {
    let transport = MockTransport::new();
    let (registry, _, _) = registry();
    let mut device = Device::new(transport.clone(), registry, config());

    device.enqueue(Command::raw("a").unwrap());
    device.poll().unwrap();
    device.enqueue(Command::raw("b").unwrap());
    device.enqueue(Command::raw("c").unwrap());

    for _ in 0..5 {
        assert!(!device.poll().unwrap());
    }
    assert_eq!(transport.written_text(), vec!["a"]);

    transport.inject(SUCCESS);
    device.poll().unwrap();
    assert_eq!(transport.written_text(), vec!["a", "b"]);

    transport.inject(SUCCESS);
    device.poll().unwrap();
    assert_eq!(transport.written_text(), vec!["a", "b", "c"]);

    transport.inject(SUCCESS);
    assert!(device.poll().unwrap());
}

#[test]
fn test_stray_frame_not_attributed_to_unsent_commands() {
    let transport = MockTransport::new();
    let (registry, _, _) = registry();
    let mut device = Device::new(transport.clone(), registry, config());
    let events = device.subscribe();

    device.enqueue(Command::raw("a").unwrap());
    device.poll().unwrap();
    device.enqueue(Command::raw("b").unwrap());
    device.enqueue(Command::raw("c").unwrap());

    // the success for "a" followed by a frame nobody asked for
    transport.inject(SUCCESS);
    transport.inject(b"\x88\xFF\xFF\xFF");
    device.poll().unwrap();

    assert_eq!(events.try_recv().unwrap(), DeviceEvent::Unsolicited(Event::EventLaunched));
    let statuses: Vec<Status> = device.queue().map(Command::status).collect();
    assert_eq!(statuses, vec![Status::Created, Status::Sent]);
    assert_eq!(transport.written_text(), vec!["a", "b"]);
}

// ============================================================================
// Property reads and writes
// ============================================================================

#[test]
fn test_get_property_updates_cache() {
    let transport = MockTransport::new();
    let (registry, h0, n0) = registry();
    let mut device = Device::new(transport.clone(), registry, config());
    let events = device.subscribe();

    device.get_property(h0, "val").unwrap();
    device.get_property(n0, "val").unwrap();
    device.poll().unwrap();
    assert_eq!(transport.written_text(), vec!["get h0.val"]);

    transport.inject(b"\x71\x2A\x00\x00\x00\xFF\xFF\xFF");
    transport.inject(SUCCESS);
    device.poll().unwrap();
    assert_eq!(device.registry().widget(h0).value(), Some(&PropertyValue::Unsigned(42)));

    // -1 in a number widget is read back signed
    transport.inject(b"\x71\xFF\xFF\xFF\xFF\xFF\xFF\xFF");
    transport.inject(SUCCESS);
    assert!(device.poll().unwrap());
    assert_eq!(device.registry().widget(n0).value(), Some(&PropertyValue::Signed(-1)));

    let changed: Vec<DeviceEvent> = events.try_iter().collect();
    assert_eq!(changed.len(), 2);
    assert!(matches!(
        &changed[0],
        DeviceEvent::ValueChanged { name, property, value: PropertyValue::Unsigned(42), .. }
            if name == "h0" && property == "val"
    ));
}

#[test]
fn test_set_property_updates_cache_once() {
    let transport = MockTransport::with_responder(|_| vec![SUCCESS.to_vec()]);
    let (registry, h0, _) = registry();
    let mut device = Device::new(transport, registry, config());
    let events = device.subscribe();

    device.set_value(h0, PropertyValue::Unsigned(7)).unwrap();
    device.drain().unwrap();
    device.set_value(h0, PropertyValue::Unsigned(7)).unwrap();
    device.drain().unwrap();

    assert_eq!(device.registry().widget(h0).value(), Some(&PropertyValue::Unsigned(7)));
    assert_eq!(events.try_iter().count(), 1);
}

#[test]
fn test_fault_completes_command_as_error() {
    let transport = MockTransport::with_responder(|text| match text {
        "get h0.val" => vec![b"\x1A\xFF\xFF\xFF".to_vec()],
        _ => vec![SUCCESS.to_vec()],
    });
    let (registry, h0, _) = registry();
    let mut device = Device::new(transport, registry, config());
    let events = device.subscribe();
    let statuses = Arc::new(Mutex::new(Vec::new()));

    let command = device
        .registry()
        .widget(h0)
        .get("val")
        .unwrap()
        .on_complete(recording(&statuses));
    device.enqueue(command);
    device.drain().unwrap();

    assert_eq!(*statuses.lock().unwrap(), vec![Status::Error]);
    assert_eq!(device.registry().widget(h0).value(), None);
    assert!(matches!(
        events.try_recv().unwrap(),
        DeviceEvent::CommandFailed {
            fault: Some(FaultCode::InvalidVariable),
            timed_out: false,
            ..
        }
    ));
}

#[test]
fn test_reset_command_requeued() {
    let transport = MockTransport::with_responder(|_| vec![SUCCESS.to_vec()]);
    let (registry, _, _) = registry();
    let mut device = Device::new(transport.clone(), registry, config());
    let statuses = Arc::new(Mutex::new(Vec::new()));

    device.enqueue(Command::raw("cls 0").unwrap().on_complete(recording(&statuses)).retained());
    device.drain().unwrap();

    let mut done = device.take_retained();
    assert_eq!(done.len(), 1);
    let mut command = done.remove(0);
    assert_eq!(command.status(), Status::Successful);
    assert!(device.take_retained().is_empty());

    command.reset();
    device.enqueue(command);
    device.drain().unwrap();

    assert_eq!(transport.written_text(), vec!["cls 0", "cls 0"]);
    assert_eq!(*statuses.lock().unwrap(), vec![Status::Successful, Status::Successful]);
    assert_eq!(device.take_retained().len(), 1);
}

#[test]
fn test_unretained_command_dropped() {
    let transport = MockTransport::with_responder(|_| vec![SUCCESS.to_vec()]);
    let (registry, _, _) = registry();
    let mut device = Device::new(transport, registry, config());

    device.enqueue(Command::raw("cls 0").unwrap());
    device.drain().unwrap();
    assert!(device.take_retained().is_empty());
}

#[test]
fn test_progress_bar_steps_follow_completed_writes() {
    let transport = MockTransport::with_responder(|text| match text {
        "get j0.val" => vec![b"\x71\x0A\x00\x00\x00\xFF\xFF\xFF".to_vec(), SUCCESS.to_vec()],
        _ => vec![SUCCESS.to_vec()],
    });
    let mut registry = Registry::new();
    let main = registry.hook_page("main", Some(0)).unwrap();
    let j0 = registry.hook_widget(main, WidgetKind::ProgressBar, "j0", Some(1)).unwrap();
    let s0 = registry.hook_widget(main, WidgetKind::Waveform, "s0", Some(2)).unwrap();
    let mut device = Device::new(transport.clone(), registry, config());

    assert!(device.increase(j0, 5).is_err());
    device.get_property(j0, "val").unwrap();
    device.drain().unwrap();

    device.increase(j0, 5).unwrap();
    device.drain().unwrap();
    device.decrease(j0, 20).unwrap();
    device.drain().unwrap();
    device.waveform_add(s0, 1, 128).unwrap();
    assert!(device.waveform_add(s0, 1, 300).is_err());
    device.clear_screen(0).unwrap();
    device.drain().unwrap();

    assert_eq!(
        transport.written_text(),
        vec!["get j0.val", "j0.val=15", "j0.val=0", "add 2,1,128", "cls 0"]
    );
    assert_eq!(device.registry().widget(j0).value(), Some(&PropertyValue::Unsigned(0)));
}

// ============================================================================
// Current page
// ============================================================================

#[test]
fn test_current_page_changes_only_when_different() {
    let transport = MockTransport::with_responder(|text| match text {
        "sendme" => vec![b"\x66\x01\xFF\xFF\xFF".to_vec(), SUCCESS.to_vec()],
        _ => vec![SUCCESS.to_vec()],
    });
    let (registry, _, _) = registry();
    let mut device = Device::new(transport, registry, config());
    let events = device.subscribe();

    device.query_current_page();
    device.drain().unwrap();
    let settings = device.registry().find_page("settings").unwrap();
    assert_eq!(device.current_page(), Some(settings));
    assert!(matches!(
        events.try_recv().unwrap(),
        DeviceEvent::PageChanged { id: Some(1), .. }
    ));

    device.query_current_page();
    device.drain().unwrap();
    assert!(events.try_recv().is_err());
}

#[test]
fn test_select_page_by_name_and_id() {
    let transport = MockTransport::with_responder(|_| vec![SUCCESS.to_vec()]);
    let (registry, _, _) = registry();
    let mut device = Device::new(transport.clone(), registry, config());

    let settings = device.select_page("settings").unwrap();
    assert!(device.registry().page(settings).switch_in_progress());
    device.drain().unwrap();
    assert!(!device.registry().page(settings).switch_in_progress());

    device.select_page(0u8).unwrap();
    device.drain().unwrap();
    assert_eq!(transport.written_text(), vec!["page 1", "page 0"]);
    assert!(device.select_page("missing").is_err());
}

// ============================================================================
// Timeout
// ============================================================================

#[test]
fn test_stalled_command_times_out() {
    let transport = MockTransport::new();
    let (registry, _, _) = registry();
    let mut device = Device::new(
        transport.clone(),
        registry,
        DeviceConfig {
            response_timeout_ms: Some(10),
            ..config()
        },
    );
    let events = device.subscribe();
    let statuses = Arc::new(Mutex::new(Vec::new()));

    device.enqueue(Command::raw("a").unwrap().on_complete(recording(&statuses)));
    device.enqueue(Command::raw("b").unwrap());
    device.poll().unwrap();
    assert!(!device.poll().unwrap());

    thread::sleep(Duration::from_millis(20));
    device.poll().unwrap();

    assert_eq!(*statuses.lock().unwrap(), vec![Status::Error]);
    assert!(matches!(
        events.try_recv().unwrap(),
        DeviceEvent::CommandFailed { timed_out: true, ref command, .. } if command == "a"
    ));
    // the next command goes out in the same poll
    assert_eq!(transport.written_text(), vec!["a", "b"]);
}

#[test]
fn test_no_timeout_by_default() {
    let transport = MockTransport::new();
    let (registry, _, _) = registry();
    let mut device = Device::new(transport.clone(), registry, config());

    device.enqueue(Command::raw("a").unwrap());
    device.poll().unwrap();
    thread::sleep(Duration::from_millis(20));
    assert!(!device.poll().unwrap());
    assert_eq!(device.queue().next().map(Command::status), Some(Status::Sent));
}
