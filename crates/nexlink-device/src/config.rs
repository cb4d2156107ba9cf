//! Panel configuration.
//!
//! A panel is described by a YAML file naming the serial port, the session
//! settings and the pages and widgets to hook:
//!
//! ```yaml
//! serial:
//!   port: /dev/ttyUSB0
//!   baud: 9600
//! device:
//!   poll_interval_ms: 20
//!   response_timeout_ms: 500
//! pages:
//!   - name: main
//!     id: 0
//!     widgets:
//!       - { kind: text, name: t0, id: 1 }
//!       - { kind: slider, name: h0, id: 2, refresh: [val] }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::registry::Registry;
use crate::widget::WidgetKind;

fn default_baud() -> u32 {
    9600
}

/// Serial port settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Port path, e.g. `/dev/ttyUSB0` or `COM3`.
    pub port: String,
    /// Baud rate.
    #[serde(default = "default_baud")]
    pub baud: u32,
}

/// Session settings.
///
/// Initialization always selects always-respond mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceConfig {
    /// Panel name used as the metrics label.
    pub name: String,
    /// Sleep between polls while draining and in the poller loop.
    pub poll_interval_ms: u64,
    /// Fail a sent command after this long without a response. Unset means
    /// wait forever.
    pub response_timeout_ms: Option<u64>,
    /// Page shown at the end of initialization.
    pub home_page: u8,
    /// Address widgets as `page.widget`.
    pub qualified_names: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: "panel".to_string(),
            poll_interval_ms: 20,
            response_timeout_ms: None,
            home_page: 0,
            qualified_names: false,
        }
    }
}

impl DeviceConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn response_timeout(&self) -> Option<Duration> {
        self.response_timeout_ms.map(Duration::from_millis)
    }
}

/// A widget to hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetConfig {
    pub kind: WidgetKind,
    pub name: String,
    #[serde(default)]
    pub id: Option<u8>,
    /// Properties read on every idle poll.
    #[serde(default)]
    pub refresh: Vec<String>,
}

/// A page to hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageConfig {
    pub name: String,
    #[serde(default)]
    pub id: Option<u8>,
    #[serde(default)]
    pub widgets: Vec<WidgetConfig>,
}

/// Complete panel description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelConfig {
    #[serde(default)]
    pub serial: Option<SerialConfig>,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub pages: Vec<PageConfig>,
}

impl PanelConfig {
    /// Parse a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read and parse a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Hook every configured page and widget.
    pub fn build_registry(&self) -> Result<Registry, ConfigError> {
        let mut registry = Registry::new().with_qualified_names(self.device.qualified_names);
        for page in &self.pages {
            let page_ref = registry.hook_page(&page.name, page.id)?;
            for widget in &page.widgets {
                let widget_ref = registry.hook_widget(page_ref, widget.kind, &widget.name, widget.id)?;
                if !widget.refresh.is_empty() {
                    registry
                        .widget_mut(widget_ref)
                        .set_refresh_properties(widget.refresh.iter().cloned());
                }
            }
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegistryError;

    const PANEL: &str = r#"
serial:
  port: /dev/ttyUSB0
device:
  name: front
  response_timeout_ms: 250
  qualified_names: true
pages:
  - name: main
    id: 0
    widgets:
      - { kind: text, name: t0, id: 1 }
      - { kind: slider, name: h0, id: 2, refresh: [val] }
  - name: settings
    id: 1
    widgets:
      - { kind: dualstatebutton, name: bt0 }
"#;

    #[test]
    fn test_parse_panel() {
        let config = PanelConfig::from_yaml_str(PANEL).unwrap();
        let serial = config.serial.as_ref().unwrap();
        assert_eq!(serial.port, "/dev/ttyUSB0");
        assert_eq!(serial.baud, 9600);
        assert_eq!(config.device.name, "front");
        assert_eq!(config.device.poll_interval(), Duration::from_millis(20));
        assert_eq!(config.device.response_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.pages.len(), 2);
        assert_eq!(config.pages[1].widgets[0].kind, WidgetKind::DualStateButton);
    }

    #[test]
    fn test_build_registry() {
        let config = PanelConfig::from_yaml_str(PANEL).unwrap();
        let registry = config.build_registry().unwrap();

        let main = registry.find_page("main").unwrap();
        let h0 = registry.find_widget(main, "h0").unwrap();
        assert_eq!(registry.widget(h0).refresh_properties(), &["val".to_string()]);
        assert_eq!(registry.widget(h0).oid(), "main.h0");
        assert_eq!(registry.touch_target(0, 1), registry.find_widget(main, "t0").ok());
    }

    #[test]
    fn test_defaults() {
        let config = PanelConfig::from_yaml_str("pages: []").unwrap();
        assert!(config.serial.is_none());
        assert_eq!(config.device, DeviceConfig::default());
        assert_eq!(config.device.response_timeout(), None);
    }

    #[test]
    fn test_duplicate_widget_rejected() {
        let yaml = r#"
pages:
  - name: main
    id: 0
    widgets:
      - { kind: text, name: t0, id: 1 }
      - { kind: button, name: b0, id: 1 }
"#;
        let config = PanelConfig::from_yaml_str(yaml).unwrap();
        let err = config.build_registry().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Registry(RegistryError::DuplicateWidgetId { id: 1, .. })
        ));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let yaml = "pages:\n  - name: main\n    widgets:\n      - { kind: lamp, name: l0 }\n";
        assert!(matches!(PanelConfig::from_yaml_str(yaml), Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn test_return_mode_not_configurable() {
        let yaml = "device:\n  return_mode: fail_only\npages: []\n";
        assert!(matches!(PanelConfig::from_yaml_str(yaml), Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let err = PanelConfig::load("/nonexistent/panel.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
