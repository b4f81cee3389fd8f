use std::fmt;

use crate::emoji::EmojiChangeEvent;

pub const NOTICE_HEADER: &str = "絵文字警察です👮";

/// Channel the relay posts into. Fixed for the life of the process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Destination(String);

impl Destination {
    pub fn new(channel_id: impl Into<String>) -> Self {
        Self(channel_id.into())
    }

    pub fn channel_id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedNotice(String);

impl RenderedNotice {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_text(self) -> String {
        self.0
    }
}

impl fmt::Display for RenderedNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Formats the channel notice for an emoji change. Subtypes without a
/// template yield `None`.
///
/// A `remove` event names every deleted emoji but only the first one is
/// rendered.
pub fn render(event: &EmojiChangeEvent) -> Option<RenderedNotice> {
    let body = match event {
        EmojiChangeEvent::Add { name } => format!(":{name}: {name} が追加されました"),
        EmojiChangeEvent::Remove { names } => format!(":{}: が消えました", names.first()),
        EmojiChangeEvent::Rename { old_name, new_name } => {
            format!(":{new_name}: の名前がかわりました\n{old_name} -> {new_name}")
        }
        EmojiChangeEvent::Other { .. } => return None,
    };

    Some(RenderedNotice(format!("{NOTICE_HEADER}\n{body}")))
}
