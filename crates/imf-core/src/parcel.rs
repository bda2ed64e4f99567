//! In-memory parcel: the request/reply buffer exchanged with remote objects.
//!
//! Layout is little-endian with every primitive padded to 4 bytes. Remote
//! object references are not flattened into the byte stream; they live in a
//! side table and the stream carries the table index (`-1` for null).

use std::fmt;
use std::sync::Arc;

use crate::remote::RemoteObject;

/// Default upper bound on a parcel's payload size.
pub const DEFAULT_MAX_CAPACITY: usize = 200 * 1024;

const ALIGN: usize = 4;
const NULL_MARKER: i32 = -1;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParcelError {
    #[error("parcel underflow: need {needed} bytes, {available} available")]
    Underflow { needed: usize, available: usize },
    #[error("parcel overflow: need {needed} bytes, capacity {capacity}")]
    Overflow { needed: usize, capacity: usize },
    #[error("invalid UTF-8 string")]
    InvalidUtf8,
    #[error("invalid UTF-16 string")]
    InvalidUtf16,
    #[error("invalid length {0}")]
    InvalidLength(i32),
    #[error("length {len} exceeds what the parcel can hold ({limit})")]
    LengthOutOfRange { len: usize, limit: usize },
    #[error("unknown remote object index {0}")]
    UnknownObject(i32),
    #[error("invalid {kind} value {value}")]
    InvalidEnum { kind: &'static str, value: i32 },
    #[error("interface token mismatch: expected {expected}, got {actual}")]
    TokenMismatch { expected: String, actual: String },
}

#[derive(Clone)]
pub struct Parcel {
    data: Vec<u8>,
    read_pos: usize,
    objects: Vec<Arc<dyn RemoteObject>>,
    max_capacity: usize,
}

impl Default for Parcel {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Parcel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parcel")
            .field("size", &self.data.len())
            .field("read_pos", &self.read_pos)
            .field("objects", &self.objects.len())
            .finish()
    }
}

fn padded(len: usize) -> usize {
    (len + ALIGN - 1) & !(ALIGN - 1)
}

impl Parcel {
    pub fn new() -> Self {
        Self::with_max_capacity(DEFAULT_MAX_CAPACITY)
    }

    pub fn with_max_capacity(max_capacity: usize) -> Self {
        Self {
            data: Vec::new(),
            read_pos: 0,
            objects: Vec::new(),
            max_capacity,
        }
    }

    /// Total payload size in bytes.
    pub fn data_size(&self) -> usize {
        self.data.len()
    }

    /// Bytes left between the read cursor and the end of the payload.
    pub fn readable_bytes(&self) -> usize {
        self.data.len() - self.read_pos
    }

    pub fn read_position(&self) -> usize {
        self.read_pos
    }

    /// Move the read cursor back to the start.
    pub fn rewind(&mut self) {
        self.read_pos = 0;
    }

    // -----------------------------------------------------------------------
    // Writing
    // -----------------------------------------------------------------------

    fn reserve(&self, additional: usize) -> Result<(), ParcelError> {
        let needed = self.data.len() + additional;
        if needed > self.max_capacity {
            return Err(ParcelError::Overflow {
                needed,
                capacity: self.max_capacity,
            });
        }
        Ok(())
    }

    fn write_padded(&mut self, bytes: &[u8]) -> Result<(), ParcelError> {
        let total = padded(bytes.len());
        self.reserve(total)?;
        self.data.extend_from_slice(bytes);
        self.data.resize(self.data.len() + (total - bytes.len()), 0);
        Ok(())
    }

    pub fn write_i32(&mut self, value: i32) -> Result<(), ParcelError> {
        self.write_padded(&value.to_le_bytes())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<(), ParcelError> {
        self.write_padded(&value.to_le_bytes())
    }

    pub fn write_i64(&mut self, value: i64) -> Result<(), ParcelError> {
        self.write_padded(&value.to_le_bytes())
    }

    pub fn write_f64(&mut self, value: f64) -> Result<(), ParcelError> {
        self.write_padded(&value.to_le_bytes())
    }

    pub fn write_bool(&mut self, value: bool) -> Result<(), ParcelError> {
        self.write_i32(i32::from(value))
    }

    fn write_len(&mut self, len: usize) -> Result<(), ParcelError> {
        let len = i32::try_from(len).map_err(|_| ParcelError::LengthOutOfRange {
            len,
            limit: i32::MAX as usize,
        })?;
        self.write_i32(len)
    }

    /// UTF-8 string: byte length, then bytes.
    pub fn write_string(&mut self, value: &str) -> Result<(), ParcelError> {
        self.reserve(ALIGN + padded(value.len()))?;
        self.write_len(value.len())?;
        self.write_padded(value.as_bytes())
    }

    /// UTF-16 string: code-unit count, then the units.
    pub fn write_string16(&mut self, value: &str) -> Result<(), ParcelError> {
        let units: Vec<u16> = value.encode_utf16().collect();
        let mut bytes = Vec::with_capacity(units.len() * 2);
        for unit in &units {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        self.reserve(ALIGN + padded(bytes.len()))?;
        self.write_len(units.len())?;
        self.write_padded(&bytes)
    }

    /// Interface token written at the head of every request.
    pub fn write_interface_token(&mut self, descriptor: &str) -> Result<(), ParcelError> {
        self.write_string16(descriptor)
    }

    pub fn write_remote_object(
        &mut self,
        object: Option<&Arc<dyn RemoteObject>>,
    ) -> Result<(), ParcelError> {
        match object {
            Some(obj) => {
                let index = self.objects.len();
                self.write_len(index)?;
                self.objects.push(Arc::clone(obj));
                Ok(())
            }
            None => self.write_i32(NULL_MARKER),
        }
    }

    // -----------------------------------------------------------------------
    // Reading
    // -----------------------------------------------------------------------

    fn take(&mut self, len: usize) -> Result<&[u8], ParcelError> {
        let total = padded(len);
        let available = self.readable_bytes();
        if total > available {
            return Err(ParcelError::Underflow {
                needed: total,
                available,
            });
        }
        let start = self.read_pos;
        self.read_pos += total;
        Ok(&self.data[start..start + len])
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], ParcelError> {
        let bytes = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn read_i32(&mut self) -> Result<i32, ParcelError> {
        Ok(i32::from_le_bytes(self.take_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, ParcelError> {
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64, ParcelError> {
        Ok(i64::from_le_bytes(self.take_array()?))
    }

    pub fn read_f64(&mut self) -> Result<f64, ParcelError> {
        Ok(f64::from_le_bytes(self.take_array()?))
    }

    pub fn read_bool(&mut self) -> Result<bool, ParcelError> {
        Ok(self.read_i32()? != 0)
    }

    /// Read a length prefix; `-1` (null) reads as zero.
    fn read_len(&mut self) -> Result<usize, ParcelError> {
        match self.read_i32()? {
            NULL_MARKER => Ok(0),
            n if n < 0 => Err(ParcelError::InvalidLength(n)),
            n => Ok(n as usize),
        }
    }

    pub fn read_string(&mut self) -> Result<String, ParcelError> {
        let len = self.read_len()?;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| ParcelError::InvalidUtf8)
    }

    pub fn read_string16(&mut self) -> Result<String, ParcelError> {
        let units = self.read_len()?;
        let byte_len = units
            .checked_mul(2)
            .ok_or(ParcelError::LengthOutOfRange {
                len: units,
                limit: self.readable_bytes() / 2,
            })?;
        let bytes = self.take(byte_len)?;
        let utf16: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16(&utf16).map_err(|_| ParcelError::InvalidUtf16)
    }

    /// Read and verify an interface token.
    pub fn enforce_interface(&mut self, descriptor: &str) -> Result<(), ParcelError> {
        let actual = self.read_string16()?;
        if actual != descriptor {
            return Err(ParcelError::TokenMismatch {
                expected: descriptor.to_string(),
                actual,
            });
        }
        Ok(())
    }

    pub fn read_remote_object(&mut self) -> Result<Option<Arc<dyn RemoteObject>>, ParcelError> {
        let index = self.read_i32()?;
        if index == NULL_MARKER {
            return Ok(None);
        }
        usize::try_from(index)
            .ok()
            .and_then(|i| self.objects.get(i))
            .map(|obj| Some(Arc::clone(obj)))
            .ok_or(ParcelError::UnknownObject(index))
    }

    /// Read a collection length and reject it before allocating when the
    /// remaining payload cannot possibly hold that many elements.
    pub fn read_collection_len(&mut self, min_element_size: usize) -> Result<usize, ParcelError> {
        let len = self.read_u32()? as usize;
        let limit = self.readable_bytes() / min_element_size.max(1);
        if len > limit {
            return Err(ParcelError::LengthOutOfRange { len, limit });
        }
        Ok(len)
    }

    /// Copy of the unread tail (payload and object table), used when a stub
    /// hands a request body over to the worker thread.
    pub fn split_remaining(&self) -> Parcel {
        Parcel {
            data: self.data[self.read_pos..].to_vec(),
            read_pos: 0,
            objects: self.objects.clone(),
            max_capacity: self.max_capacity,
        }
    }
}

/// Types that know how to marshal themselves into a [`Parcel`].
pub trait Parcelable: Sized {
    /// Smallest number of bytes one value occupies on the wire. Used to
    /// bound collection lengths before allocating.
    const MIN_WIRE_SIZE: usize = ALIGN;

    fn marshal(&self, parcel: &mut Parcel) -> Result<(), ParcelError>;
    fn unmarshal(parcel: &mut Parcel) -> Result<Self, ParcelError>;
}

impl Parcelable for i32 {
    fn marshal(&self, parcel: &mut Parcel) -> Result<(), ParcelError> {
        parcel.write_i32(*self)
    }
    fn unmarshal(parcel: &mut Parcel) -> Result<Self, ParcelError> {
        parcel.read_i32()
    }
}

impl Parcelable for u32 {
    fn marshal(&self, parcel: &mut Parcel) -> Result<(), ParcelError> {
        parcel.write_u32(*self)
    }
    fn unmarshal(parcel: &mut Parcel) -> Result<Self, ParcelError> {
        parcel.read_u32()
    }
}

impl Parcelable for bool {
    fn marshal(&self, parcel: &mut Parcel) -> Result<(), ParcelError> {
        parcel.write_bool(*self)
    }
    fn unmarshal(parcel: &mut Parcel) -> Result<Self, ParcelError> {
        parcel.read_bool()
    }
}

impl Parcelable for String {
    fn marshal(&self, parcel: &mut Parcel) -> Result<(), ParcelError> {
        parcel.write_string(self)
    }
    fn unmarshal(parcel: &mut Parcel) -> Result<Self, ParcelError> {
        parcel.read_string()
    }
}

impl<T: Parcelable> Parcelable for Vec<T> {
    fn marshal(&self, parcel: &mut Parcel) -> Result<(), ParcelError> {
        let len = u32::try_from(self.len()).map_err(|_| ParcelError::LengthOutOfRange {
            len: self.len(),
            limit: u32::MAX as usize,
        })?;
        parcel.write_u32(len)?;
        for item in self {
            item.marshal(parcel)?;
        }
        Ok(())
    }

    fn unmarshal(parcel: &mut Parcel) -> Result<Self, ParcelError> {
        let len = parcel.read_collection_len(T::MIN_WIRE_SIZE)?;
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(T::unmarshal(parcel)?);
        }
        Ok(items)
    }
}
