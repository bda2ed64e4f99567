//! Value types exchanged with the input method service, with their wire
//! layout.

use crate::parcel::{Parcel, ParcelError, Parcelable};

/// Base key code added to a selection-movement direction before it reaches
/// the text listener (D-pad up is base + 1).
pub const CURSOR_DIRECTION_BASE_VALUE: i32 = 2011;

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident : $kind:literal { $($variant:ident = $value:expr),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant = $value),+
        }

        impl $name {
            pub fn from_i32(value: i32) -> Option<Self> {
                match value {
                    $(v if v == $value => Some(Self::$variant),)+
                    _ => None,
                }
            }

            pub fn as_i32(self) -> i32 {
                self as i32
            }
        }

        impl Parcelable for $name {
            fn marshal(&self, parcel: &mut Parcel) -> Result<(), ParcelError> {
                parcel.write_i32(self.as_i32())
            }

            fn unmarshal(parcel: &mut Parcel) -> Result<Self, ParcelError> {
                let value = parcel.read_i32()?;
                Self::from_i32(value).ok_or(ParcelError::InvalidEnum { kind: $kind, value })
            }
        }
    };
}

wire_enum! {
    /// Soft keyboard visibility reported by the input method.
    KeyboardStatus: "keyboard status" { None = 0, Hide = 1, Show = 2 }
}

wire_enum! {
    /// Label of the enter key requested by the editor.
    EnterKeyType: "enter key type" {
        Unspecified = 0,
        None = 1,
        Go = 2,
        Search = 3,
        Send = 4,
        Next = 5,
        Done = 6,
        Previous = 7,
    }
}

wire_enum! {
    TextInputType: "text input type" {
        None = -1,
        Text = 0,
        Multiline = 1,
        Number = 2,
        Phone = 3,
        Datetime = 4,
        EmailAddress = 5,
        Url = 6,
        VisiblePassword = 7,
    }
}

wire_enum! {
    /// Caret movement requested by the input method.
    Direction: "direction" { None = 0, Up = 1, Down = 2, Left = 3, Right = 4 }
}

wire_enum! {
    InputWindowStatus: "window status" { Show = 0, Hide = 1 }
}

wire_enum! {
    /// Filter for listing installed input methods.
    InputMethodStatus: "input method status" { Disable = 0, Enable = 1, All = 2 }
}

impl Default for EnterKeyType {
    fn default() -> Self {
        Self::Unspecified
    }
}

impl Default for TextInputType {
    fn default() -> Self {
        Self::Text
    }
}

/// Attributes of the focused input field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputAttribute {
    pub input_pattern: i32,
    pub enter_key_type: i32,
    pub input_option: i32,
}

impl InputAttribute {
    pub const PATTERN_TEXT: i32 = TextInputType::Text as i32;
    pub const PATTERN_PASSWORD: i32 = TextInputType::VisiblePassword as i32;

    pub fn is_secure(&self) -> bool {
        self.input_pattern == Self::PATTERN_PASSWORD
    }
}

impl Default for InputAttribute {
    fn default() -> Self {
        Self {
            input_pattern: Self::PATTERN_TEXT,
            enter_key_type: EnterKeyType::Unspecified.as_i32(),
            input_option: 0,
        }
    }
}

impl Parcelable for InputAttribute {
    const MIN_WIRE_SIZE: usize = 12;

    fn marshal(&self, parcel: &mut Parcel) -> Result<(), ParcelError> {
        parcel.write_i32(self.input_pattern)?;
        parcel.write_i32(self.enter_key_type)?;
        parcel.write_i32(self.input_option)
    }

    fn unmarshal(parcel: &mut Parcel) -> Result<Self, ParcelError> {
        Ok(Self {
            input_pattern: parcel.read_i32()?,
            enter_key_type: parcel.read_i32()?,
            input_option: parcel.read_i32()?,
        })
    }
}

/// Caret rectangle in window coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CursorInfo {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Editor configuration pushed by the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Configuration {
    pub enter_key_type: EnterKeyType,
    pub text_input_type: TextInputType,
}

/// Function key pressed on the soft keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FunctionKey {
    pub enter_key_type: EnterKeyType,
}

/// Hardware key event forwarded to the input method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key_code: i32,
    pub key_action: i32,
}

/// An installed input method.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Property {
    pub name: String,
    pub id: String,
    pub label: String,
    pub icon: String,
    pub icon_id: u32,
}

impl Parcelable for Property {
    const MIN_WIRE_SIZE: usize = 20;

    fn marshal(&self, parcel: &mut Parcel) -> Result<(), ParcelError> {
        parcel.write_string(&self.name)?;
        parcel.write_string(&self.id)?;
        parcel.write_string(&self.label)?;
        parcel.write_string(&self.icon)?;
        parcel.write_u32(self.icon_id)
    }

    fn unmarshal(parcel: &mut Parcel) -> Result<Self, ParcelError> {
        Ok(Self {
            name: parcel.read_string()?,
            id: parcel.read_string()?,
            label: parcel.read_string()?,
            icon: parcel.read_string()?,
            icon_id: parcel.read_u32()?,
        })
    }
}

/// A subtype (language/layout) of an input method.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubProperty {
    pub label: String,
    pub label_id: u32,
    pub name: String,
    pub id: String,
    pub mode: String,
    pub locale: String,
    pub language: String,
    pub icon: String,
    pub icon_id: u32,
}

impl Parcelable for SubProperty {
    const MIN_WIRE_SIZE: usize = 36;

    fn marshal(&self, parcel: &mut Parcel) -> Result<(), ParcelError> {
        parcel.write_string(&self.label)?;
        parcel.write_u32(self.label_id)?;
        parcel.write_string(&self.name)?;
        parcel.write_string(&self.id)?;
        parcel.write_string(&self.mode)?;
        parcel.write_string(&self.locale)?;
        parcel.write_string(&self.language)?;
        parcel.write_string(&self.icon)?;
        parcel.write_u32(self.icon_id)
    }

    fn unmarshal(parcel: &mut Parcel) -> Result<Self, ParcelError> {
        Ok(Self {
            label: parcel.read_string()?,
            label_id: parcel.read_u32()?,
            name: parcel.read_string()?,
            id: parcel.read_string()?,
            mode: parcel.read_string()?,
            locale: parcel.read_string()?,
            language: parcel.read_string()?,
            icon: parcel.read_string()?,
            icon_id: parcel.read_u32()?,
        })
    }
}

/// Geometry of one input method panel window.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InputWindowInfo {
    pub name: String,
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl Parcelable for InputWindowInfo {
    const MIN_WIRE_SIZE: usize = 20;

    fn marshal(&self, parcel: &mut Parcel) -> Result<(), ParcelError> {
        parcel.write_string(&self.name)?;
        parcel.write_i32(self.left)?;
        parcel.write_i32(self.top)?;
        parcel.write_u32(self.width)?;
        parcel.write_u32(self.height)
    }

    fn unmarshal(parcel: &mut Parcel) -> Result<Self, ParcelError> {
        Ok(Self {
            name: parcel.read_string()?,
            left: parcel.read_i32()?,
            top: parcel.read_i32()?,
            width: parcel.read_u32()?,
            height: parcel.read_u32()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_enum_value_is_a_decode_error() {
        let mut p = Parcel::new();
        p.write_i32(9).unwrap();
        let err = KeyboardStatus::unmarshal(&mut p).unwrap_err();
        assert_eq!(
            err,
            ParcelError::InvalidEnum {
                kind: "keyboard status",
                value: 9
            }
        );
    }

    #[test]
    fn text_input_type_negative_value() {
        assert_eq!(TextInputType::from_i32(-1), Some(TextInputType::None));
        assert_eq!(TextInputType::None.as_i32(), -1);
    }

    #[test]
    fn property_list_survives_the_wire() {
        let props = vec![
            Property {
                name: "com.example.kbd".into(),
                id: "default".into(),
                label: "Example".into(),
                icon: String::new(),
                icon_id: 3,
            },
            Property::default(),
        ];
        let mut p = Parcel::new();
        props.marshal(&mut p).unwrap();
        assert_eq!(Vec::<Property>::unmarshal(&mut p).unwrap(), props);
    }

    #[test]
    fn default_attribute_is_plain_text() {
        let attr = InputAttribute::default();
        assert_eq!(attr.input_pattern, InputAttribute::PATTERN_TEXT);
        assert!(!attr.is_secure());
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Arbitrary reply bodies must decode to a value or an error,
            /// never a panic or an unbounded allocation.
            #[test]
            fn garbage_never_panics(words in proptest::collection::vec(any::<i32>(), 0..64)) {
                let mut p = Parcel::new();
                for w in &words {
                    p.write_i32(*w).unwrap();
                }
                let _ = Vec::<SubProperty>::unmarshal(&mut p);
                p.rewind();
                let _ = Vec::<InputWindowInfo>::unmarshal(&mut p);
                p.rewind();
                let _ = Property::unmarshal(&mut p);
            }
        }
    }
}
