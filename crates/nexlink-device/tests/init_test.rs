//! Integration tests for the initialization sequence.

use std::sync::{Arc, Mutex};

use nexlink_device::{
    Device, DeviceConfig, DeviceEvent, MockTransport, PanelConfig, PropertyValue, Registry,
    WidgetKind,
};

const SUCCESS: &[u8] = b"\x01\xFF\xFF\xFF";

fn config() -> DeviceConfig {
    DeviceConfig {
        poll_interval_ms: 1,
        ..DeviceConfig::default()
    }
}

/// Answers like a panel in always-respond mode.
fn panel() -> MockTransport {
    MockTransport::with_responder(|text| match text {
        "get t0.txt" => vec![b"\x70ready\xFF\xFF\xFF".to_vec(), SUCCESS.to_vec()],
        "get h0.val" => vec![b"\x71\x32\x00\x00\x00\xFF\xFF\xFF".to_vec(), SUCCESS.to_vec()],
        _ => vec![SUCCESS.to_vec()],
    })
}

#[test]
fn test_init_two_pages() {
    let transport = panel();

    let mut registry = Registry::new();
    let main = registry.hook_page("main", Some(0)).unwrap();
    let t0 = registry.hook_widget(main, WidgetKind::Text, "t0", Some(1)).unwrap();
    let settings = registry.hook_page("settings", Some(1)).unwrap();
    let h0 = registry.hook_widget(settings, WidgetKind::Slider, "h0", Some(1)).unwrap();
    // no one-time refresh for a number
    registry.hook_widget(settings, WidgetKind::Number, "n0", Some(2)).unwrap();

    let mut device = Device::new(transport.clone(), registry, config());
    assert!(!device.is_initialized());
    device.init().unwrap();

    assert_eq!(
        transport.written_text(),
        vec!["bkcmd=3", "page 0", "get t0.txt", "page 1", "get h0.val", "page 0"]
    );
    assert!(device.is_initialized());
    assert_eq!(device.queue_len(), 0);
    assert_eq!(device.current_page(), Some(main));
    assert_eq!(device.registry().widget(t0).text(), Some("ready"));
    assert_eq!(device.registry().widget(h0).value(), Some(&PropertyValue::Unsigned(50)));
}

#[test]
fn test_init_flushes_stale_input() {
    let transport = MockTransport::with_responder(|_| vec![SUCCESS.to_vec()]);
    transport.inject(b"\x65\x00\x01\x01\xFF\xFF\xFF\x01\xFF\xFF\xFF");

    let mut registry = Registry::new();
    registry.hook_page("main", Some(0)).unwrap();
    let mut device = Device::new(transport.clone(), registry, config());
    let events = device.subscribe();
    device.init().unwrap();

    // only the page changes from the sequence itself, no stale touch or response
    let seen: Vec<DeviceEvent> = events.try_iter().collect();
    assert_eq!(seen.len(), 2);
    assert!(seen.iter().all(|e| matches!(e, DeviceEvent::PageChanged { .. })));
}

#[test]
fn test_init_unhooked_home_page() {
    let transport = MockTransport::with_responder(|_| vec![SUCCESS.to_vec()]);
    let mut registry = Registry::new();
    registry.hook_page("popup", None).unwrap();

    let mut device = Device::new(transport.clone(), registry, config());
    device.init().unwrap();

    // pages without an ID are not visited
    assert_eq!(transport.written_text(), vec!["bkcmd=3", "page 0"]);
    assert_eq!(device.current_page(), None);
}

#[test]
fn test_init_from_panel_config() {
    let yaml = r#"
device:
  poll_interval_ms: 1
  home_page: 1
pages:
  - name: main
    id: 0
  - name: settings
    id: 1
    widgets:
      - { kind: button, name: b0, id: 3 }
"#;
    let config = PanelConfig::from_yaml_str(yaml).unwrap();
    let registry = config.build_registry().unwrap();
    let transport = MockTransport::with_responder(|text| match text {
        "get b0.txt" => vec![b"\x70OK\xFF\xFF\xFF".to_vec(), SUCCESS.to_vec()],
        _ => vec![SUCCESS.to_vec()],
    });

    let mut device = Device::new(transport.clone(), registry, config.device.clone());
    device.init().unwrap();

    assert_eq!(
        transport.written_text(),
        vec!["bkcmd=3", "page 0", "page 1", "get b0.txt", "page 1"]
    );
    let settings = device.registry().find_page("settings").unwrap();
    assert_eq!(device.current_page(), Some(settings));
}

#[test]
fn test_init_selects_always_respond() {
    // a panel left in fail-only mode acknowledges nothing until bkcmd=3
    let always = Arc::new(Mutex::new(false));
    let mode = always.clone();
    let transport = MockTransport::with_responder(move |text| {
        let mut always = mode.lock().unwrap();
        if let Some(value) = text.strip_prefix("bkcmd=") {
            *always = value == "3";
        }
        if *always {
            vec![SUCCESS.to_vec()]
        } else {
            Vec::new()
        }
    });

    let mut registry = Registry::new();
    registry.hook_page("main", Some(0)).unwrap();
    let mut device = Device::new(transport.clone(), registry, config());
    device.init().unwrap();

    assert_eq!(transport.written_text(), vec!["bkcmd=3", "page 0", "page 0"]);
    assert!(*always.lock().unwrap());
}
