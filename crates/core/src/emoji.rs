use serde::Deserialize;
use thiserror::Error;

/// Wire shape of Slack's `emoji_changed` inner event. Which fields are present
/// depends on `subtype`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct EmojiChangedPayload {
    pub subtype: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub names: Option<Vec<String>>,
    #[serde(default)]
    pub old_name: Option<String>,
    #[serde(default)]
    pub new_name: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub event_ts: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EmojiChangeEvent {
    Add { name: String },
    Remove { names: RemovedNames },
    Rename { old_name: String, new_name: String },
    Other { subtype: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EmojiSubtype {
    Add,
    Remove,
    Rename,
    Other,
}

impl EmojiSubtype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Rename => "rename",
            Self::Other => "other",
        }
    }
}

impl EmojiChangeEvent {
    pub fn subtype(&self) -> EmojiSubtype {
        match self {
            Self::Add { .. } => EmojiSubtype::Add,
            Self::Remove { .. } => EmojiSubtype::Remove,
            Self::Rename { .. } => EmojiSubtype::Rename,
            Self::Other { .. } => EmojiSubtype::Other,
        }
    }
}

/// Names carried by a `remove` event. Never empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemovedNames {
    first: String,
    rest: Vec<String>,
}

impl RemovedNames {
    pub fn new(names: Vec<String>) -> Option<Self> {
        let mut names = names.into_iter();
        let first = names.next()?;
        Some(Self { first, rest: names.collect() })
    }

    pub fn first(&self) -> &str {
        &self.first
    }

    pub fn len(&self) -> usize {
        1 + self.rest.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.first.as_str()).chain(self.rest.iter().map(String::as_str))
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EmojiEventError {
    #[error("emoji_changed `{subtype}` event is missing field `{field}`")]
    MissingField { subtype: &'static str, field: &'static str },
    #[error("emoji_changed `remove` event carried no names")]
    EmptyRemoval,
}

impl TryFrom<EmojiChangedPayload> for EmojiChangeEvent {
    type Error = EmojiEventError;

    fn try_from(payload: EmojiChangedPayload) -> Result<Self, Self::Error> {
        match payload.subtype.as_str() {
            "add" => {
                let name = required(payload.name, "add", "name")?;
                Ok(Self::Add { name })
            }
            "remove" => {
                let names = required(payload.names, "remove", "names")?;
                let names = RemovedNames::new(names).ok_or(EmojiEventError::EmptyRemoval)?;
                Ok(Self::Remove { names })
            }
            "rename" => {
                let old_name = required(payload.old_name, "rename", "old_name")?;
                let new_name = required(payload.new_name, "rename", "new_name")?;
                Ok(Self::Rename { old_name, new_name })
            }
            _ => Ok(Self::Other { subtype: payload.subtype }),
        }
    }
}

fn required<T>(
    value: Option<T>,
    subtype: &'static str,
    field: &'static str,
) -> Result<T, EmojiEventError> {
    value.ok_or(EmojiEventError::MissingField { subtype, field })
}
