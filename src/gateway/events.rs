use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Opcodes for events relayed to the broker.
pub mod opcode {
    pub const PLAY: u8 = 0;
    pub const PAUSE: u8 = 1;
    pub const SEEK: u8 = 2;
    pub const NEXT: u8 = 3;
    pub const PREV: u8 = 4;
    pub const MESSAGE: u8 = 5;
}

const AVATAR_CDN: &str = "https://cdn.discordapp.com/avatars";

/// Track reference attached to NEXT/PREV. The broker only needs the shape for
/// now, so callers send [`Track::placeholder`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Track {
    pub title: String,
    pub reference_url: String,
}

impl Track {
    pub fn placeholder() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub user_id: String,
    pub username: String,
    /// Avatar hash as handed out by the OAuth provider.
    pub avatar: Option<String>,
}

impl Author {
    pub fn avatar_url(&self) -> Option<String> {
        self.avatar
            .as_ref()
            .map(|hash| format!("{AVATAR_CDN}/{}/{hash}.png?size=512", self.user_id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Play,
    Pause,
    Seek { position: i64 },
    Next { track: Track },
    Prev { track: Track },
    Message { content: String, author: Author },
}

impl EventKind {
    pub fn opcode(&self) -> u8 {
        match self {
            EventKind::Play => opcode::PLAY,
            EventKind::Pause => opcode::PAUSE,
            EventKind::Seek { .. } => opcode::SEEK,
            EventKind::Next { .. } => opcode::NEXT,
            EventKind::Prev { .. } => opcode::PREV,
            EventKind::Message { .. } => opcode::MESSAGE,
        }
    }
}

// Hand-written so `op` always leads and the op-specific fields follow it in a
// fixed order.
impl Serialize for EventKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("op", &self.opcode())?;
        match self {
            EventKind::Play | EventKind::Pause => {}
            EventKind::Seek { position } => map.serialize_entry("position", position)?,
            EventKind::Next { track } | EventKind::Prev { track } => {
                map.serialize_entry("track", track)?
            }
            EventKind::Message { content, author } => {
                map.serialize_entry("content", content)?;
                map.serialize_entry("user_id", &author.user_id)?;
                map.serialize_entry("username", &author.username)?;
                map.serialize_entry("avatar", &author.avatar_url())?;
            }
        }
        map.end()
    }
}

/// A single event destined for every viewer of a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundEvent {
    pub room_id: String,
    #[serde(rename = "message")]
    pub kind: EventKind,
}

impl OutboundEvent {
    pub fn new(room_id: impl Into<String>, kind: EventKind) -> Self {
        Self {
            room_id: room_id.into(),
            kind,
        }
    }

    pub fn play(room_id: impl Into<String>) -> Self {
        Self::new(room_id, EventKind::Play)
    }

    pub fn pause(room_id: impl Into<String>) -> Self {
        Self::new(room_id, EventKind::Pause)
    }

    pub fn seek(room_id: impl Into<String>, position: i64) -> Self {
        Self::new(room_id, EventKind::Seek { position })
    }

    pub fn next(room_id: impl Into<String>) -> Self {
        Self::new(
            room_id,
            EventKind::Next {
                track: Track::placeholder(),
            },
        )
    }

    pub fn prev(room_id: impl Into<String>) -> Self {
        Self::new(
            room_id,
            EventKind::Prev {
                track: Track::placeholder(),
            },
        )
    }

    pub fn message(room_id: impl Into<String>, content: impl Into<String>, author: Author) -> Self {
        Self::new(
            room_id,
            EventKind::Message {
                content: content.into(),
                author,
            },
        )
    }

    /// Compact JSON payload carried in one binary frame.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
