use std::fmt;
use std::sync::Arc;

use crate::event_flag::EventFlags;
use crate::parcel::{Parcel, ParcelError, Parcelable};
use crate::remote::RemoteObject;
use crate::types::InputAttribute;

/// Everything the service needs to know about this client: the field being
/// edited, which events it listens to, and the two callback objects the
/// service pushes notifications through.
#[derive(Clone)]
pub struct ClientInfo {
    pub attribute: InputAttribute,
    pub event_flag: EventFlags,
    pub is_show_keyboard: bool,
    pub client: Arc<dyn RemoteObject>,
    pub channel: Arc<dyn RemoteObject>,
}

impl ClientInfo {
    pub fn new(client: Arc<dyn RemoteObject>, channel: Arc<dyn RemoteObject>) -> Self {
        Self {
            attribute: InputAttribute::default(),
            event_flag: EventFlags::NO_EVENT_ON,
            is_show_keyboard: false,
            client,
            channel,
        }
    }

    pub fn marshal(&self, parcel: &mut Parcel) -> Result<(), ParcelError> {
        parcel.write_remote_object(Some(&self.client))?;
        parcel.write_remote_object(Some(&self.channel))?;
        self.attribute.marshal(parcel)?;
        parcel.write_bool(self.is_show_keyboard)?;
        parcel.write_u32(self.event_flag.bits())
    }
}

impl fmt::Debug for ClientInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientInfo")
            .field("attribute", &self.attribute)
            .field("event_flag", &self.event_flag)
            .field("is_show_keyboard", &self.is_show_keyboard)
            .field("client", &self.client.descriptor())
            .field("channel", &self.channel.descriptor())
            .finish()
    }
}

/// Service-side view of a decoded [`ClientInfo`].
#[derive(Clone)]
pub struct RemoteClientInfo {
    pub client: Option<Arc<dyn RemoteObject>>,
    pub channel: Option<Arc<dyn RemoteObject>>,
    pub attribute: InputAttribute,
    pub is_show_keyboard: bool,
    pub event_flag: EventFlags,
}

impl RemoteClientInfo {
    pub fn unmarshal(parcel: &mut Parcel) -> Result<Self, ParcelError> {
        Ok(Self {
            client: parcel.read_remote_object()?,
            channel: parcel.read_remote_object()?,
            attribute: InputAttribute::unmarshal(parcel)?,
            is_show_keyboard: parcel.read_bool()?,
            event_flag: EventFlags::from_bits(parcel.read_u32()?),
        })
    }
}
