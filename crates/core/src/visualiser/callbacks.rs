use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::render::DrawContext;
use crate::{Result, VisualiserError};

/// Lifecycle events callbacks can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisualiserEvent {
    /// Once per frame, after the background and before foreground content.
    SetUpForeground,
    /// Once per frame, after the style has finished. Receives the frame's
    /// sample buffer.
    FrameDrawn,
}

impl VisualiserEvent {
    pub const ALL: [VisualiserEvent; 2] = [Self::SetUpForeground, Self::FrameDrawn];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SetUpForeground => "setUpForeground",
            Self::FrameDrawn => "frameDrawn",
        }
    }
}

impl FromStr for VisualiserEvent {
    type Err = VisualiserError;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "" => Err(VisualiserError::EmptyEventName),
            "setUpForeground" | "foreground-setup" => Ok(Self::SetUpForeground),
            "frameDrawn" | "frame-drawn" => Ok(Self::FrameDrawn),
            other => Err(VisualiserError::UnsupportedEvent(other.to_string())),
        }
    }
}

impl fmt::Display for VisualiserEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a registered callback within its event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CallbackKey {
    Named(String),
    Index(usize),
}

/// Drawing side effect run against the active context. The slice is the
/// frame's sample buffer for events that carry one.
pub type VisualiserCallback = Box<dyn FnMut(&mut dyn DrawContext, Option<&[u8]>)>;

/// Ordered, keyed callbacks per event.
#[derive(Default)]
pub struct CallbackRegistry {
    events: HashMap<VisualiserEvent, Vec<(CallbackKey, VisualiserCallback)>>,
}

impl CallbackRegistry {
    /// Registry accepting every [`VisualiserEvent`].
    pub fn new() -> Self {
        Self::with_events(&VisualiserEvent::ALL)
    }

    pub fn with_events(events: &[VisualiserEvent]) -> Self {
        Self {
            events: events.iter().map(|event| (*event, Vec::new())).collect(),
        }
    }

    pub fn supports(&self, event: VisualiserEvent) -> bool {
        self.events.contains_key(&event)
    }

    /// Adds `callback` under `event`.
    ///
    /// A named key replaces an existing callback with the same name in place.
    /// Without a name the callback is keyed by its position.
    pub fn register(
        &mut self,
        event: VisualiserEvent,
        key: Option<&str>,
        callback: VisualiserCallback,
    ) -> Result<CallbackKey> {
        let entries = self
            .events
            .get_mut(&event)
            .ok_or_else(|| VisualiserError::UnsupportedEvent(event.to_string()))?;

        let key = match key.filter(|name| !name.is_empty()) {
            Some(name) => CallbackKey::Named(name.to_string()),
            None => CallbackKey::Index(entries.len()),
        };

        match entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(slot) => slot.1 = callback,
            None => entries.push((key.clone(), callback)),
        }

        Ok(key)
    }

    pub fn len(&self, event: VisualiserEvent) -> usize {
        self.events.get(&event).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.events.values().all(Vec::is_empty)
    }

    pub fn keys(&self, event: VisualiserEvent) -> Vec<CallbackKey> {
        self.events
            .get(&event)
            .map(|entries| entries.iter().map(|(key, _)| key.clone()).collect())
            .unwrap_or_default()
    }

    /// Runs every callback for `event` in registration order.
    pub fn fire(
        &mut self,
        event: VisualiserEvent,
        context: &mut dyn DrawContext,
        data: Option<&[u8]>,
    ) {
        if let Some(entries) = self.events.get_mut(&event) {
            for (_, callback) in entries.iter_mut() {
                callback(&mut *context, data);
            }
        }
    }
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for event in VisualiserEvent::ALL {
            if let Some(entries) = self.events.get(&event) {
                map.entry(&event, &entries.len());
            }
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::render::RecordingSurface;

    fn recorder(log: &Rc<RefCell<Vec<&'static str>>>, tag: &'static str) -> VisualiserCallback {
        let log = log.clone();
        Box::new(move |_: &mut dyn DrawContext, _: Option<&[u8]>| {
            log.borrow_mut().push(tag)
        })
    }

    #[test]
    fn parses_event_names() {
        let parse = |name: &str| name.parse::<VisualiserEvent>();
        assert_eq!(parse("setUpForeground").unwrap(), VisualiserEvent::SetUpForeground);
        assert_eq!(parse("foreground-setup").unwrap(), VisualiserEvent::SetUpForeground);
        assert_eq!(parse("frame-drawn").unwrap(), VisualiserEvent::FrameDrawn);
        assert!(matches!("".parse::<VisualiserEvent>(), Err(VisualiserError::EmptyEventName)));
        assert!(matches!(
            "onResize".parse::<VisualiserEvent>(),
            Err(VisualiserError::UnsupportedEvent(name)) if name == "onResize"
        ));
    }

    #[test]
    fn accumulates_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut registry = CallbackRegistry::new();
        let event = VisualiserEvent::SetUpForeground;

        registry.register(event, None, recorder(&log, "first")).unwrap();
        registry.register(event, Some("glow"), recorder(&log, "second")).unwrap();
        registry.register(event, Some(""), recorder(&log, "third")).unwrap();

        let mut surface = RecordingSurface::new(1, 1);
        registry.fire(event, &mut surface, None);

        assert_eq!(*log.borrow(), vec!["first", "second", "third"]);
        assert_eq!(
            registry.keys(event),
            vec![
                CallbackKey::Index(0),
                CallbackKey::Named("glow".into()),
                CallbackKey::Index(2)
            ]
        );
    }

    #[test]
    fn named_key_replaces_in_place() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut registry = CallbackRegistry::new();
        let event = VisualiserEvent::FrameDrawn;

        registry.register(event, Some("a"), recorder(&log, "old")).unwrap();
        registry.register(event, Some("b"), recorder(&log, "b")).unwrap();
        registry.register(event, Some("a"), recorder(&log, "new")).unwrap();

        let mut surface = RecordingSurface::new(1, 1);
        registry.fire(event, &mut surface, None);

        assert_eq!(registry.len(event), 2);
        assert_eq!(*log.borrow(), vec!["new", "b"]);
    }

    #[test]
    fn restricted_registry_rejects_other_events() {
        let mut registry = CallbackRegistry::with_events(&[VisualiserEvent::SetUpForeground]);
        let noop: VisualiserCallback = Box::new(|_: &mut dyn DrawContext, _: Option<&[u8]>| {});
        let result = registry.register(VisualiserEvent::FrameDrawn, None, noop);
        assert!(matches!(result, Err(VisualiserError::UnsupportedEvent(_))));
        assert!(registry.is_empty());
    }
}
