use crate::upload::{UploadRequest, normalize_media_type};

use uuid::Uuid;

/// WHAT: Codec parameters, case and padding are normalized away
/// WHY: Real clients send "AUDIO/WEBM;codecs=opus"; the backend expects "audio/webm"
#[test]
fn given_client_mime_strings_when_normalized_then_canonical() {
    // Given/When/Then: Each raw value maps to its canonical form
    assert_eq!(normalize_media_type("audio/webm;codecs=opus"), "audio/webm");
    assert_eq!(normalize_media_type("AUDIO/WAV"), "audio/wav");
    assert_eq!(normalize_media_type("  audio/mp3  "), "audio/mp3");
    assert_eq!(normalize_media_type("Audio/Ogg ; codecs=\"vorbis\""), "audio/ogg");
}

/// WHAT: Requests always carry the normalized media type
/// WHY: Normalization happens before sending, not at the backend
#[test]
fn given_raw_media_type_when_building_request_then_metadata_normalized() {
    // Given: A request built with a decorated MIME string
    let request = UploadRequest::new(Uuid::new_v4(), vec![0u8; 4], "AUDIO/WEBM;codecs=opus", 1200);

    // Then: The metadata holds the canonical value
    assert_eq!(request.metadata.media_type, "audio/webm");
    assert_eq!(request.metadata.duration_ms, 1200);
}
