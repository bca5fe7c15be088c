//! Built-in Unicode emoji served when the workspace emoji list is unavailable

use crate::directory::types::{EmojiDirectory, EmojiRecord};
use std::sync::{Arc, LazyLock};

const COMMON_EMOJI: &[(&str, &str, &[&str])] = &[
    ("+1", "👍", &["thumbsup"]),
    ("-1", "👎", &["thumbsdown"]),
    ("smile", "😄", &[]),
    ("slightly_smiling_face", "🙂", &[]),
    ("joy", "😂", &[]),
    ("laughing", "😆", &["satisfied"]),
    ("wink", "😉", &[]),
    ("thinking_face", "🤔", &[]),
    ("heart", "❤️", &[]),
    ("tada", "🎉", &[]),
    ("fire", "🔥", &[]),
    ("rocket", "🚀", &[]),
    ("eyes", "👀", &[]),
    ("pray", "🙏", &[]),
    ("clap", "👏", &[]),
    ("raised_hands", "🙌", &[]),
    ("wave", "👋", &[]),
    ("ok_hand", "👌", &[]),
    ("muscle", "💪", &[]),
    ("100", "💯", &[]),
    ("white_check_mark", "✅", &[]),
    ("heavy_check_mark", "✔️", &[]),
    ("x", "❌", &[]),
    ("warning", "⚠️", &[]),
    ("question", "❓", &[]),
    ("exclamation", "❗", &["heavy_exclamation_mark"]),
    ("bulb", "💡", &[]),
    ("memo", "📝", &["pencil"]),
    ("bug", "🐛", &[]),
    ("sparkles", "✨", &[]),
    ("star", "⭐", &[]),
    ("sunglasses", "😎", &[]),
    ("cry", "😢", &[]),
    ("sob", "😭", &[]),
    ("scream", "😱", &[]),
    ("see_no_evil", "🙈", &[]),
    ("party_popper", "🎉", &[]),
    ("coffee", "☕", &[]),
    ("hourglass", "⌛", &[]),
    ("lock", "🔒", &[]),
];

static FALLBACK: LazyLock<Arc<EmojiDirectory>> = LazyLock::new(|| {
    Arc::new(EmojiDirectory::from_records(COMMON_EMOJI.iter().map(
        |(name, glyph, aliases)| {
            let mut record = EmojiRecord::unicode(name, glyph);
            record.aliases = aliases.iter().map(|a| a.to_string()).collect();
            record
        },
    )))
});

/// Shared built-in emoji directory
pub fn fallback_emoji() -> Arc<EmojiDirectory> {
    FALLBACK.clone()
}
