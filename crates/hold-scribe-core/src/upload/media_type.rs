/// Canonical form of a client-reported MIME type.
///
/// Codec parameters after `;` are dropped, surrounding whitespace is trimmed
/// and the result is lower-cased, so `AUDIO/WEBM;codecs=opus` becomes
/// `audio/webm`.
pub fn normalize_media_type(raw: &str) -> String {
    raw.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
