//! Widget model.
//!
//! A widget is a component hooked on a page. What it can do is described by
//! the [`Capabilities`] of its [`WidgetKind`]; every accessor shares the same
//! property cache and command builders, gated by those flags.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use nexlink_protocol::{quote_text, EncodeError, Event};
use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::error::{CapabilityError, DeviceError};

/// Property holding the numeric or boolean value of a widget.
pub const VALUE_PROPERTY: &str = "val";
/// Property holding the text of a widget.
pub const TEXT_PROPERTY: &str = "txt";

/// Highest waveform channel.
const MAX_WAVEFORM_CHANNEL: u8 = 3;
/// Waveform samples are one byte.
const MAX_WAVEFORM_VALUE: u32 = 255;

/// How a widget's value is read back from a number frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// No value property.
    None,
    /// `val` as u32.
    Unsigned,
    /// `val` as i32.
    Signed,
    /// `val` as 0/1.
    Boolean,
    /// `txt` as a string.
    Text,
}

impl ValueKind {
    /// Name of the property carrying the value, if any.
    pub const fn property(self) -> Option<&'static str> {
        match self {
            ValueKind::None => None,
            ValueKind::Text => Some(TEXT_PROPERTY),
            ValueKind::Unsigned | ValueKind::Signed | ValueKind::Boolean => Some(VALUE_PROPERTY),
        }
    }
}

/// What a widget kind supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Can be shown and hidden with `vis`.
    pub viewable: bool,
    /// Has `bco`/`pco` colours.
    pub colourable: bool,
    /// Has `font`, `xcen` and `ycen`.
    pub font_styleable: bool,
    /// Has a `pic` picture.
    pub picturable: bool,
    /// Produces touch events.
    pub touchable: bool,
    /// Kind of its value property.
    pub value: ValueKind,
}

impl Capabilities {
    const fn new(value: ValueKind) -> Self {
        Self {
            viewable: true,
            colourable: false,
            font_styleable: false,
            picturable: false,
            touchable: false,
            value,
        }
    }

    const fn colour(mut self) -> Self {
        self.colourable = true;
        self
    }

    const fn font(mut self) -> Self {
        self.font_styleable = true;
        self
    }

    const fn picture(mut self) -> Self {
        self.picturable = true;
        self
    }

    const fn touch(mut self) -> Self {
        self.touchable = true;
        self
    }

    const fn hidden(mut self) -> Self {
        self.viewable = false;
        self
    }
}

/// Component types that can be hooked on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetKind {
    Button,
    Checkbox,
    Crop,
    #[serde(alias = "dualstatebutton")]
    DualStateButton,
    Gauge,
    Hotspot,
    Number,
    Picture,
    #[serde(alias = "progressbar")]
    ProgressBar,
    #[serde(alias = "qrcode")]
    QrCode,
    Radio,
    #[serde(alias = "scrolltext")]
    ScrollText,
    Slider,
    Text,
    Waveform,
}

impl WidgetKind {
    /// All kinds.
    pub const ALL: [WidgetKind; 15] = [
        WidgetKind::Button,
        WidgetKind::Checkbox,
        WidgetKind::Crop,
        WidgetKind::DualStateButton,
        WidgetKind::Gauge,
        WidgetKind::Hotspot,
        WidgetKind::Number,
        WidgetKind::Picture,
        WidgetKind::ProgressBar,
        WidgetKind::QrCode,
        WidgetKind::Radio,
        WidgetKind::ScrollText,
        WidgetKind::Slider,
        WidgetKind::Text,
        WidgetKind::Waveform,
    ];

    /// Capability flags of this kind.
    pub const fn capabilities(self) -> Capabilities {
        match self {
            WidgetKind::Button => Capabilities::new(ValueKind::Text).font().colour().touch(),
            WidgetKind::Checkbox => Capabilities::new(ValueKind::Boolean).colour().touch(),
            WidgetKind::Crop => Capabilities::new(ValueKind::None).picture().touch(),
            WidgetKind::DualStateButton => Capabilities::new(ValueKind::Boolean).colour().touch(),
            WidgetKind::Gauge => Capabilities::new(ValueKind::Unsigned).colour().touch(),
            WidgetKind::Hotspot => Capabilities::new(ValueKind::None).hidden().touch(),
            WidgetKind::Number => Capabilities::new(ValueKind::Signed).font().colour().touch(),
            WidgetKind::Picture => Capabilities::new(ValueKind::None).picture(),
            WidgetKind::ProgressBar => Capabilities::new(ValueKind::Unsigned).colour().touch(),
            WidgetKind::QrCode => Capabilities::new(ValueKind::Text),
            WidgetKind::Radio => Capabilities::new(ValueKind::Boolean).colour().touch(),
            WidgetKind::ScrollText => Capabilities::new(ValueKind::Text).font().colour().touch(),
            WidgetKind::Slider => Capabilities::new(ValueKind::Unsigned).colour().touch(),
            WidgetKind::Text => Capabilities::new(ValueKind::Text).font().colour().touch(),
            WidgetKind::Waveform => Capabilities::new(ValueKind::None).colour().touch(),
        }
    }

    /// Properties read once when the page is first shown.
    pub const fn onetime_refresh(self) -> &'static [&'static str] {
        match self {
            WidgetKind::Button | WidgetKind::Text => &[TEXT_PROPERTY],
            WidgetKind::ProgressBar | WidgetKind::Slider => &[VALUE_PROPERTY],
            _ => &[],
        }
    }

    /// Lowercase name used in configuration files.
    pub const fn name(self) -> &'static str {
        match self {
            WidgetKind::Button => "button",
            WidgetKind::Checkbox => "checkbox",
            WidgetKind::Crop => "crop",
            WidgetKind::DualStateButton => "dual_state_button",
            WidgetKind::Gauge => "gauge",
            WidgetKind::Hotspot => "hotspot",
            WidgetKind::Number => "number",
            WidgetKind::Picture => "picture",
            WidgetKind::ProgressBar => "progress_bar",
            WidgetKind::QrCode => "qr_code",
            WidgetKind::Radio => "radio",
            WidgetKind::ScrollText => "scroll_text",
            WidgetKind::Slider => "slider",
            WidgetKind::Text => "text",
            WidgetKind::Waveform => "waveform",
        }
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WidgetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s.chars().filter(|c| *c != '_').collect::<String>().to_lowercase();
        WidgetKind::ALL
            .into_iter()
            .find(|kind| kind.name().replace('_', "") == wanted)
            .ok_or_else(|| format!("unknown widget kind: {}", s))
    }
}

/// A cached property value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Unsigned(u32),
    Signed(i32),
    Bool(bool),
    Text(String),
}

impl PropertyValue {
    /// Interpret a value frame according to the widget's value kind.
    ///
    /// Returns `None` for events that carry no value.
    pub fn from_event(event: &Event, kind: ValueKind) -> Option<Self> {
        match event {
            Event::StringValue(text) => Some(PropertyValue::Text(text.clone())),
            Event::NumberValue { unsigned, signed } => Some(match kind {
                ValueKind::Signed => PropertyValue::Signed(*signed),
                ValueKind::Boolean => PropertyValue::Bool(*unsigned != 0),
                _ => PropertyValue::Unsigned(*unsigned),
            }),
            Event::CurrentPage { page_id } => Some(PropertyValue::Unsigned(u32::from(*page_id))),
            _ => None,
        }
    }

    /// Text written after `=` in an assignment.
    pub fn wire_text(&self) -> String {
        match self {
            PropertyValue::Unsigned(v) => v.to_string(),
            PropertyValue::Signed(v) => v.to_string(),
            PropertyValue::Bool(v) => if *v { "1" } else { "0" }.to_string(),
            PropertyValue::Text(text) => quote_text(text),
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            PropertyValue::Unsigned(v) => Some(*v),
            PropertyValue::Bool(v) => Some(u32::from(*v)),
            PropertyValue::Signed(v) => u32::try_from(*v).ok(),
            PropertyValue::Text(_) => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            PropertyValue::Signed(v) => Some(*v),
            PropertyValue::Unsigned(v) => Some(*v as i32),
            PropertyValue::Bool(v) => Some(i32::from(*v)),
            PropertyValue::Text(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(v) => Some(*v),
            PropertyValue::Unsigned(v) => Some(*v != 0),
            PropertyValue::Signed(v) => Some(*v != 0),
            PropertyValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Unsigned(v) => write!(f, "{}", v),
            PropertyValue::Signed(v) => write!(f, "{}", v),
            PropertyValue::Bool(v) => write!(f, "{}", v),
            PropertyValue::Text(text) => f.write_str(text),
        }
    }
}

impl From<u32> for PropertyValue {
    fn from(value: u32) -> Self {
        PropertyValue::Unsigned(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        PropertyValue::Signed(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

/// Text alignment along one axis (`xcen`/`ycen`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    /// Left or top.
    Start,
    #[default]
    Centre,
    /// Right or bottom.
    End,
}

impl Alignment {
    pub const fn value(self) -> u32 {
        match self {
            Alignment::Start => 0,
            Alignment::Centre => 1,
            Alignment::End => 2,
        }
    }
}

/// A hooked component.
#[derive(Debug, Clone)]
pub struct Widget {
    name: String,
    id: Option<u8>,
    kind: WidgetKind,
    oid: String,
    refresh: Vec<String>,
    cache: HashMap<String, PropertyValue>,
}

impl Widget {
    pub(crate) fn new(kind: WidgetKind, name: &str, id: Option<u8>, oid: String) -> Self {
        Self {
            name: name.to_string(),
            id,
            kind,
            oid,
            refresh: Vec::new(),
            cache: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> Option<u8> {
        self.id
    }

    pub fn kind(&self) -> WidgetKind {
        self.kind
    }

    /// Object identifier used in instructions.
    pub fn oid(&self) -> &str {
        &self.oid
    }

    pub fn capabilities(&self) -> Capabilities {
        self.kind.capabilities()
    }

    // ========================================================================
    // Property cache
    // ========================================================================

    /// Last known value of a property.
    pub fn cached(&self, property: &str) -> Option<&PropertyValue> {
        self.cache.get(property)
    }

    /// Last known value of the widget's value property.
    pub fn value(&self) -> Option<&PropertyValue> {
        self.capabilities()
            .value
            .property()
            .and_then(|property| self.cache.get(property))
    }

    /// Last known text, for text-valued widgets.
    pub fn text(&self) -> Option<&str> {
        self.cache.get(TEXT_PROPERTY).and_then(PropertyValue::as_str)
    }

    pub fn back_colour(&self) -> Option<u32> {
        self.cache.get("bco").and_then(PropertyValue::as_u32)
    }

    pub fn fore_colour(&self) -> Option<u32> {
        self.cache.get("pco").and_then(PropertyValue::as_u32)
    }

    /// Store a property value, returning whether it changed.
    pub(crate) fn store(&mut self, property: &str, value: PropertyValue) -> bool {
        match self.cache.insert(property.to_string(), value.clone()) {
            Some(previous) => previous != value,
            None => true,
        }
    }

    /// Properties polled while the device is idle.
    pub fn refresh_properties(&self) -> &[String] {
        &self.refresh
    }

    pub fn set_refresh_properties<I, S>(&mut self, properties: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.refresh = properties.into_iter().map(Into::into).collect();
    }

    /// Value kind used to interpret a read of `property`.
    pub fn value_kind_of(&self, property: &str) -> ValueKind {
        let value = self.capabilities().value;
        if value.property() == Some(property) {
            value
        } else if property == TEXT_PROPERTY {
            ValueKind::Text
        } else {
            ValueKind::Unsigned
        }
    }

    // ========================================================================
    // Command builders
    // ========================================================================

    /// Read a property.
    pub fn get(&self, property: &str) -> Result<Command, EncodeError> {
        Command::get_property(&self.oid, property, self.value_kind_of(property))
    }

    /// Write a property without capability checks.
    pub fn set(&self, property: &str, value: PropertyValue) -> Result<Command, EncodeError> {
        Command::set_property(&self.oid, property, value)
    }

    /// Write the numeric or boolean value.
    pub fn set_value(&self, value: impl Into<PropertyValue>) -> crate::Result<Command> {
        let caps = self.capabilities();
        if matches!(caps.value, ValueKind::None | ValueKind::Text) {
            return Err(self.missing("numerically valued").into());
        }
        let value = match (caps.value, value.into()) {
            (ValueKind::Boolean, v) => PropertyValue::Bool(v.as_bool().unwrap_or(false)),
            (_, v) => v,
        };
        Ok(self.set(VALUE_PROPERTY, value)?)
    }

    /// Write the text.
    pub fn set_text(&self, text: &str) -> crate::Result<Command> {
        self.require(self.capabilities().value == ValueKind::Text, "text valued")?;
        Ok(self.set(TEXT_PROPERTY, PropertyValue::from(text))?)
    }

    /// Show or hide.
    pub fn set_visible(&self, visible: bool) -> crate::Result<Command> {
        self.require(self.capabilities().viewable, "viewable")?;
        Ok(Command::visibility(&self.oid, visible)?)
    }

    /// Background colour (`bco`).
    pub fn set_back_colour(&self, colour: u32) -> crate::Result<Command> {
        self.require(self.capabilities().colourable, "colourable")?;
        Ok(self.set("bco", colour.into())?)
    }

    /// Foreground colour (`pco`).
    pub fn set_fore_colour(&self, colour: u32) -> crate::Result<Command> {
        self.require(self.capabilities().colourable, "colourable")?;
        Ok(self.set("pco", colour.into())?)
    }

    /// Font resource ID (`font`).
    pub fn set_font(&self, font: u32) -> crate::Result<Command> {
        self.require(self.capabilities().font_styleable, "font styleable")?;
        Ok(self.set("font", font.into())?)
    }

    /// Horizontal alignment (`xcen`).
    pub fn set_horizontal_alignment(&self, alignment: Alignment) -> crate::Result<Command> {
        self.require(self.capabilities().font_styleable, "font styleable")?;
        Ok(self.set("xcen", alignment.value().into())?)
    }

    /// Vertical alignment (`ycen`).
    pub fn set_vertical_alignment(&self, alignment: Alignment) -> crate::Result<Command> {
        self.require(self.capabilities().font_styleable, "font styleable")?;
        Ok(self.set("ycen", alignment.value().into())?)
    }

    /// Picture resource ID (`pic`).
    pub fn set_picture(&self, picture: u32) -> crate::Result<Command> {
        self.require(self.capabilities().picturable, "picturable")?;
        Ok(self.set("pic", picture.into())?)
    }

    /// Width in pixels (`wid`).
    pub fn set_width(&self, width: u32) -> crate::Result<Command> {
        self.require(self.capabilities().viewable, "viewable")?;
        Ok(self.set("wid", width.into())?)
    }

    /// Height in pixels (`hig`).
    pub fn set_height(&self, height: u32) -> crate::Result<Command> {
        self.require(self.capabilities().viewable, "viewable")?;
        Ok(self.set("hig", height.into())?)
    }

    /// Enable or disable touch events (`tsw`).
    pub fn set_touch_enabled(&self, enabled: bool) -> crate::Result<Command> {
        self.require(self.capabilities().touchable, "touchable")?;
        let target = match self.id {
            Some(id) => id.to_string(),
            None => self.oid.clone(),
        };
        Ok(Command::instruction("tsw", &[target.into(), enabled.into()])?)
    }

    /// Raise a progress bar by `amount` from its cached value.
    ///
    /// The cache holds the last value read or written, so two steps queued
    /// before the first completes both start from the same value.
    pub fn increase(&self, amount: u32) -> crate::Result<Command> {
        let current = self.cached_progress()?;
        self.set_value(current.saturating_add(amount))
    }

    /// Lower a progress bar by `amount` from its cached value, stopping at 0.
    pub fn decrease(&self, amount: u32) -> crate::Result<Command> {
        let current = self.cached_progress()?;
        self.set_value(current.saturating_sub(amount))
    }

    /// Append a sample to a waveform channel (`add id,channel,value`).
    pub fn waveform_add(&self, channel: u8, value: u32) -> crate::Result<Command> {
        self.require(self.kind == WidgetKind::Waveform, "waveform")?;
        let Some(id) = self.id else {
            return Err(self.missing("component ID").into());
        };
        if channel > MAX_WAVEFORM_CHANNEL {
            return Err(DeviceError::OutOfRange {
                what: "waveform channel",
                value: channel.into(),
                min: 0,
                max: MAX_WAVEFORM_CHANNEL.into(),
            });
        }
        if value > MAX_WAVEFORM_VALUE {
            return Err(DeviceError::OutOfRange {
                what: "waveform value",
                value: value.into(),
                min: 0,
                max: MAX_WAVEFORM_VALUE.into(),
            });
        }
        Ok(Command::instruction("add", &[id.into(), channel.into(), value.into()])?)
    }

    fn cached_progress(&self) -> crate::Result<u32> {
        self.require(self.kind == WidgetKind::ProgressBar, "progress bar")?;
        self.value()
            .and_then(PropertyValue::as_u32)
            .ok_or_else(|| DeviceError::NotCached {
                widget: self.name.clone(),
                property: VALUE_PROPERTY.to_string(),
            })
    }

    /// Reads issued once when the page is first shown.
    pub fn onetime_refresh_commands(&self) -> Result<Vec<Command>, EncodeError> {
        self.kind
            .onetime_refresh()
            .iter()
            .map(|property| self.get(property))
            .collect()
    }

    /// Reads issued on every idle poll.
    pub fn refresh_commands(&self) -> Result<Vec<Command>, EncodeError> {
        self.refresh.iter().map(|property| self.get(property)).collect()
    }

    fn require(&self, present: bool, capability: &'static str) -> Result<(), CapabilityError> {
        if present {
            Ok(())
        } else {
            Err(self.missing(capability))
        }
    }

    fn missing(&self, capability: &'static str) -> CapabilityError {
        CapabilityError {
            widget: self.name.clone(),
            kind: self.kind,
            capability,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandKind;

    fn widget(kind: WidgetKind, name: &str) -> Widget {
        Widget::new(kind, name, Some(1), name.to_string())
    }

    #[test]
    fn test_onetime_refresh_properties() {
        assert_eq!(WidgetKind::Button.onetime_refresh(), &["txt"]);
        assert_eq!(WidgetKind::Text.onetime_refresh(), &["txt"]);
        assert_eq!(WidgetKind::Slider.onetime_refresh(), &["val"]);
        assert_eq!(WidgetKind::ProgressBar.onetime_refresh(), &["val"]);
        assert!(WidgetKind::Number.onetime_refresh().is_empty());
        assert!(WidgetKind::Hotspot.onetime_refresh().is_empty());
    }

    #[test]
    fn test_capabilities() {
        let hotspot = WidgetKind::Hotspot.capabilities();
        assert!(hotspot.touchable);
        assert!(!hotspot.viewable);
        assert_eq!(hotspot.value, ValueKind::None);

        assert_eq!(WidgetKind::Number.capabilities().value, ValueKind::Signed);
        assert_eq!(WidgetKind::Radio.capabilities().value, ValueKind::Boolean);
        assert!(WidgetKind::Picture.capabilities().picturable);
        assert!(!WidgetKind::Picture.capabilities().touchable);
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("slider".parse::<WidgetKind>().unwrap(), WidgetKind::Slider);
        assert_eq!("dualstatebutton".parse::<WidgetKind>().unwrap(), WidgetKind::DualStateButton);
        assert_eq!("progress_bar".parse::<WidgetKind>().unwrap(), WidgetKind::ProgressBar);
        assert!("page".parse::<WidgetKind>().is_err());
    }

    #[test]
    fn test_set_text_wire() {
        let t0 = widget(WidgetKind::Text, "t0");
        let cmd = t0.set_text("Hi").unwrap();
        assert_eq!(cmd.wire(), b"t0.txt=\"Hi\"\xFF\xFF\xFF");
    }

    #[test]
    fn test_set_value_boolean_widget() {
        let c0 = widget(WidgetKind::Checkbox, "c0");
        let cmd = c0.set_value(true).unwrap();
        assert_eq!(cmd.wire(), b"c0.val=1\xFF\xFF\xFF");
        match cmd.kind() {
            CommandKind::SetProperty { value, .. } => assert_eq!(value, &PropertyValue::Bool(true)),
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_capability_errors() {
        let hotspot = widget(WidgetKind::Hotspot, "m0");
        let err = hotspot.set_visible(false).unwrap_err();
        assert!(matches!(err, crate::DeviceError::Capability(_)));

        let picture = widget(WidgetKind::Picture, "p0");
        assert!(picture.set_text("x").is_err());
        assert!(picture.set_back_colour(0).is_err());
        assert_eq!(picture.set_picture(3).unwrap().wire(), b"p0.pic=3\xFF\xFF\xFF");
    }

    #[test]
    fn test_visibility_and_touch_switch() {
        let b0 = widget(WidgetKind::Button, "b0");
        assert_eq!(b0.set_visible(false).unwrap().wire(), b"vis b0,0\xFF\xFF\xFF");
        assert_eq!(b0.set_touch_enabled(true).unwrap().wire(), b"tsw 1,1\xFF\xFF\xFF");
    }

    #[test]
    fn test_progress_bar_steps_from_cache() {
        let mut j0 = widget(WidgetKind::ProgressBar, "j0");
        assert!(matches!(j0.increase(5), Err(crate::DeviceError::NotCached { .. })));

        j0.store("val", PropertyValue::Unsigned(40));
        assert_eq!(j0.increase(5).unwrap().wire(), b"j0.val=45\xFF\xFF\xFF");
        assert_eq!(j0.decrease(1).unwrap().wire(), b"j0.val=39\xFF\xFF\xFF");
        assert_eq!(j0.decrease(100).unwrap().wire(), b"j0.val=0\xFF\xFF\xFF");

        let mut h0 = widget(WidgetKind::Slider, "h0");
        h0.store("val", PropertyValue::Unsigned(40));
        assert!(matches!(h0.increase(1), Err(crate::DeviceError::Capability(_))));
    }

    #[test]
    fn test_waveform_add() {
        let s0 = widget(WidgetKind::Waveform, "s0");
        assert_eq!(s0.waveform_add(0, 255).unwrap().wire(), b"add 1,0,255\xFF\xFF\xFF");
        assert!(matches!(
            s0.waveform_add(0, 256),
            Err(crate::DeviceError::OutOfRange { value: 256, max: 255, .. })
        ));
        assert!(matches!(
            s0.waveform_add(4, 0),
            Err(crate::DeviceError::OutOfRange { value: 4, max: 3, .. })
        ));

        let unnumbered = Widget::new(WidgetKind::Waveform, "s1", None, "s1".to_string());
        assert!(unnumbered.waveform_add(0, 1).is_err());
        assert!(widget(WidgetKind::Text, "t0").waveform_add(0, 1).is_err());
    }

    #[test]
    fn test_value_kind_of() {
        let n0 = widget(WidgetKind::Number, "n0");
        assert_eq!(n0.value_kind_of("val"), ValueKind::Signed);
        assert_eq!(n0.value_kind_of("bco"), ValueKind::Unsigned);
        assert_eq!(n0.value_kind_of("txt"), ValueKind::Text);
    }

    #[test]
    fn test_property_from_event() {
        let event = Event::NumberValue {
            unsigned: 0xFFFF_FFFF,
            signed: -1,
        };
        assert_eq!(
            PropertyValue::from_event(&event, ValueKind::Signed),
            Some(PropertyValue::Signed(-1))
        );
        assert_eq!(
            PropertyValue::from_event(&event, ValueKind::Unsigned),
            Some(PropertyValue::Unsigned(u32::MAX))
        );
        assert_eq!(
            PropertyValue::from_event(&event, ValueKind::Boolean),
            Some(PropertyValue::Bool(true))
        );
        assert_eq!(PropertyValue::from_event(&Event::CommandSucceeded, ValueKind::Text), None);
    }

    #[test]
    fn test_store_reports_change() {
        let mut h0 = widget(WidgetKind::Slider, "h0");
        assert!(h0.store("val", PropertyValue::Unsigned(5)));
        assert!(!h0.store("val", PropertyValue::Unsigned(5)));
        assert!(h0.store("val", PropertyValue::Unsigned(6)));
        assert_eq!(h0.value(), Some(&PropertyValue::Unsigned(6)));
    }
}
