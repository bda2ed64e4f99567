pub mod client_info;
pub mod error;
pub mod event_flag;
pub mod message;
pub mod parcel;
pub mod proxy;
pub mod remote;
pub mod settings;
pub mod stub;
pub mod types;

pub use error::{status_of, ImfError};
pub use parcel::{Parcel, ParcelError, Parcelable};
pub use remote::{DeathRecipient, MessageOption, RemoteObject, SystemAbilityManager, TransportError};
