//! Hand-written wire records used by the session core.
//!
//! Only the constructors this core actually produces are modelled; anything
//! else travels as opaque bytes inside a `PendingRpcOperation`.

use crate::deserialize::{Buffer, Error, Result};
use crate::{Deserializable, Identifiable, Serializable};

// ─── Peer ────────────────────────────────────────────────────────────────────

/// `Peer`: who a message is addressed to.
#[cfg_attr(feature = "impl-debug", derive(Debug))]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Peer {
    /// `peerUser#9db1bc6d user_id:int`
    User(u32),
    /// `peerChat#bad0e5bb chat_id:int`
    Chat(u32),
    /// `peerChannel#bddde532 channel_id:int`
    Channel(u32),
}

impl Peer {
    const USER: u32    = 0x9db1bc6d;
    const CHAT: u32    = 0xbad0e5bb;
    const CHANNEL: u32 = 0xbddde532;
}

impl Serializable for Peer {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        let (id, value) = match *self {
            Self::User(v)    => (Self::USER, v),
            Self::Chat(v)    => (Self::CHAT, v),
            Self::Channel(v) => (Self::CHANNEL, v),
        };
        id.serialize(buf);
        value.serialize(buf);
    }
}

impl Deserializable for Peer {
    fn deserialize(buf: Buffer) -> Result<Self> {
        let id = u32::deserialize(buf)?;
        let value = u32::deserialize(buf)?;
        match id {
            Self::USER    => Ok(Self::User(value)),
            Self::CHAT    => Ok(Self::Chat(value)),
            Self::CHANNEL => Ok(Self::Channel(value)),
            id => Err(Error::UnexpectedConstructor { id }),
        }
    }
}

// ─── Message ─────────────────────────────────────────────────────────────────

/// A stored text message.
///
/// ```text
/// message#44f9b43d flags:# out:flags.1?true id:int from_id:flags.8?int
///                  to_id:Peer date:int message:string = Message;
/// ```
#[cfg_attr(feature = "impl-debug", derive(Debug))]
#[derive(Clone, PartialEq, Eq)]
pub struct Message {
    pub out:     bool,
    /// Message id; on the server this is the recipient's pts at delivery.
    pub id:      u32,
    pub from_id: Option<u32>,
    pub to_id:   Peer,
    /// Unix time, seconds.
    pub date:    u32,
    pub message: String,
}

impl Message {
    const FLAG_OUT: u32     = 1 << 1;
    const FLAG_FROM_ID: u32 = 1 << 8;

    fn flags(&self) -> u32 {
        let mut flags = 0;
        if self.out { flags |= Self::FLAG_OUT; }
        if self.from_id.is_some() { flags |= Self::FLAG_FROM_ID; }
        flags
    }
}

impl Identifiable for Message {
    const CONSTRUCTOR_ID: u32 = 0x44f9b43d;
}

impl Serializable for Message {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
        self.flags().serialize(buf);
        self.id.serialize(buf);
        self.from_id.serialize(buf);
        self.to_id.serialize(buf);
        self.date.serialize(buf);
        self.message.serialize(buf);
    }
}

impl Deserializable for Message {
    fn deserialize(buf: Buffer) -> Result<Self> {
        let id = u32::deserialize(buf)?;
        if id != Self::CONSTRUCTOR_ID {
            return Err(Error::UnexpectedConstructor { id });
        }
        let flags = u32::deserialize(buf)?;
        let id = u32::deserialize(buf)?;
        let from_id = if flags & Self::FLAG_FROM_ID != 0 {
            Some(u32::deserialize(buf)?)
        } else {
            None
        };
        Ok(Self {
            out: flags & Self::FLAG_OUT != 0,
            id,
            from_id,
            to_id:   Peer::deserialize(buf)?,
            date:    u32::deserialize(buf)?,
            message: String::deserialize(buf)?,
        })
    }
}

// ─── UpdateShortMessage ──────────────────────────────────────────────────────

/// A compact `Updates` variant carrying one private message.
///
/// ```text
/// updateShortMessage#914fbf11 flags:# out:flags.1?true id:int user_id:int
///                   message:string pts:int pts_count:int date:int = Updates;
/// ```
#[cfg_attr(feature = "impl-debug", derive(Debug))]
#[derive(Clone, PartialEq, Eq)]
pub struct UpdateShortMessage {
    pub out:       bool,
    pub id:        u32,
    pub user_id:   u32,
    pub message:   String,
    pub pts:       u32,
    pub pts_count: u32,
    pub date:      u32,
}

impl UpdateShortMessage {
    const FLAG_OUT: u32 = 1 << 1;
}

impl Identifiable for UpdateShortMessage {
    const CONSTRUCTOR_ID: u32 = 0x914fbf11;
}

impl Serializable for UpdateShortMessage {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
        let flags = if self.out { Self::FLAG_OUT } else { 0 };
        flags.serialize(buf);
        self.id.serialize(buf);
        self.user_id.serialize(buf);
        self.message.serialize(buf);
        self.pts.serialize(buf);
        self.pts_count.serialize(buf);
        self.date.serialize(buf);
    }
}

impl Deserializable for UpdateShortMessage {
    fn deserialize(buf: Buffer) -> Result<Self> {
        let id = u32::deserialize(buf)?;
        if id != Self::CONSTRUCTOR_ID {
            return Err(Error::UnexpectedConstructor { id });
        }
        let flags = u32::deserialize(buf)?;
        Ok(Self {
            out:       flags & Self::FLAG_OUT != 0,
            id:        u32::deserialize(buf)?,
            user_id:   u32::deserialize(buf)?,
            message:   String::deserialize(buf)?,
            pts:       u32::deserialize(buf)?,
            pts_count: u32::deserialize(buf)?,
            date:      u32::deserialize(buf)?,
        })
    }
}
