use num_enum::TryFromPrimitive;
use std::convert::TryFrom;

/// Object header message types. v1 headers store the type as a `u16`, v2
/// headers as a `u8`; every defined type fits in a byte.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, TryFromPrimitive)]
pub enum MessageType {
    Nil = 0x00,
    Dataspace = 0x01,
    LinkInfo = 0x02,
    Datatype = 0x03,
    FillValueOld = 0x04,
    FillValue = 0x05,
    Link = 0x06,
    ExternalDataFiles = 0x07,
    DataLayout = 0x08,
    Bogus = 0x09,
    GroupInfo = 0x0A,
    FilterPipeline = 0x0B,
    Attribute = 0x0C,
    ObjectComment = 0x0D,
    ModificationTimeOld = 0x0E,
    SharedMessageTable = 0x0F,
    Continuation = 0x10,
    SymbolTable = 0x11,
    ModificationTime = 0x12,
    BTreeKValues = 0x13,
    DriverInfo = 0x14,
    AttributeInfo = 0x15,
    ReferenceCount = 0x16,
    FileSpaceInfo = 0x18,
}

impl MessageType {
    /// Maps a raw type to a known message, treating anything else as `Nil` so
    /// the caller skips it.
    pub fn from_raw(value: u16) -> MessageType {
        u8::try_from(value)
            .ok()
            .and_then(|value| MessageType::try_from(value).ok())
            .unwrap_or(MessageType::Nil)
    }
}

#[derive(Clone, Debug)]
pub struct MessageHeaderV1 {
    pub message_type: MessageType,
    pub size: u16,
    pub flags: u8,
    pub reserved: [u8; 3],
}

#[derive(Clone, Debug)]
pub struct MessageHeaderV2 {
    pub message_type: MessageType,
    pub size: u16,
    pub flags: u8,
}
