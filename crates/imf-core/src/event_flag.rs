//! Subscription bit-set for service-side events (`imeChange`, `imeShow`,
//! `imeHide`).

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    ImeChange = 0,
    ImeShow = 1,
    ImeHide = 2,
    /// No specific event; used when replaying the whole set.
    None = 3,
}

impl EventType {
    /// Parse the event name used by the binding layer.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "imeChange" => Some(Self::ImeChange),
            "imeShow" => Some(Self::ImeShow),
            "imeHide" => Some(Self::ImeHide),
            _ => None,
        }
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }

    fn bit(self) -> u32 {
        match self {
            Self::None => 0,
            other => 1u32 << other.as_u32(),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct EventFlags(u32);

impl EventFlags {
    pub const NO_EVENT_ON: EventFlags = EventFlags(0);

    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, event: EventType) -> bool {
        let bit = event.bit();
        bit != 0 && self.0 & bit == bit
    }

    /// Return the set with `event` switched on or off.
    pub fn with(self, event: EventType, on: bool) -> Self {
        let bit = event.bit();
        if on {
            Self(self.0 | bit)
        } else {
            Self(self.0 & !bit)
        }
    }
}

impl fmt::Debug for EventFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut set = f.debug_set();
        for event in [EventType::ImeChange, EventType::ImeShow, EventType::ImeHide] {
            if self.contains(event) {
                set.entry(&event);
            }
        }
        set.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_bits() {
        let flags = EventFlags::NO_EVENT_ON
            .with(EventType::ImeShow, true)
            .with(EventType::ImeHide, true);
        assert!(flags.contains(EventType::ImeShow));
        assert!(flags.contains(EventType::ImeHide));
        assert!(!flags.contains(EventType::ImeChange));
        assert_eq!(flags.bits(), 0b110);

        let flags = flags.with(EventType::ImeShow, false);
        assert_eq!(flags.bits(), 0b100);
    }

    #[test]
    fn none_never_sets_a_bit() {
        let flags = EventFlags::NO_EVENT_ON.with(EventType::None, true);
        assert!(flags.is_empty());
        assert!(!flags.contains(EventType::None));
    }

    #[test]
    fn names() {
        assert_eq!(EventType::from_name("imeChange"), Some(EventType::ImeChange));
        assert_eq!(EventType::from_name("imeShown"), None);
    }
}
