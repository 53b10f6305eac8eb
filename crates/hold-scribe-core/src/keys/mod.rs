mod combo;
mod matcher;
mod source;

pub use {
    combo::{KeyId, ShortcutCombo},
    matcher::{MatcherTransition, ShortcutMatcher},
    source::{KeyDirection, KeyEventSink, KeyEventSource, RawKeyEvent},
};
