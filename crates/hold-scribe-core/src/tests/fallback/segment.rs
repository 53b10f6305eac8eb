use crate::fallback::{pad_to, segment_windows};

/// WHAT: Windows overlap by the configured amount and cover every sample
/// WHY: Words straddling a boundary must appear whole in at least one window
#[test]
fn given_samples_when_segmenting_then_windows_overlap_and_cover_input() {
    // Given: 10 samples, windows of 4 overlapping by 1
    let samples: Vec<f32> = (0..10).map(|i| i as f32).collect();

    // When: Segmenting
    let windows = segment_windows(&samples, 4, 1);

    // Then: Starts advance by 3 and the last window is short
    assert_eq!(windows.len(), 3);
    assert_eq!(windows[0], &[0.0, 1.0, 2.0, 3.0]);
    assert_eq!(windows[1], &[3.0, 4.0, 5.0, 6.0]);
    assert_eq!(windows[2], &[6.0, 7.0, 8.0, 9.0]);
}

/// WHAT: A trailing remainder becomes a shorter final window
/// WHY: The tail of a clip must not be dropped
#[test]
fn given_uneven_length_when_segmenting_then_last_window_is_short() {
    // Given: 11 samples
    let samples = vec![0.1; 11];

    // When: Segmenting with step 3
    let windows = segment_windows(&samples, 4, 1);

    // Then: Four windows, the last holding the remaining two samples
    assert_eq!(windows.len(), 4);
    assert_eq!(windows[3].len(), 2);
}

/// WHAT: Overlap at or above the window length still advances
/// WHY: A misconfigured overlap must not loop forever
#[test]
fn given_overlap_not_smaller_than_window_when_segmenting_then_terminates() {
    // Given: Overlap equal to the window
    let samples = vec![0.0; 5];

    // When: Segmenting
    let windows = segment_windows(&samples, 2, 2);

    // Then: One-sample steps, ending at the last sample
    assert_eq!(windows.len(), 4);
    assert_eq!(windows[3].len(), 2);
}

/// WHAT: Empty input yields no windows
/// WHY: Nothing should be uploaded for an empty clip
#[test]
fn given_empty_samples_when_segmenting_then_no_windows() {
    assert!(segment_windows(&[], 4, 1).is_empty());
}

/// WHAT: Short clips are padded with silence, long ones left alone
/// WHY: Very short clips transcribe poorly without some context
#[test]
fn given_short_and_long_clips_when_padding_then_only_short_grows() {
    // Given: A 3-sample clip and a 6-sample clip
    let short = pad_to(vec![0.5; 3], 5);
    let long = pad_to(vec![0.5; 6], 5);

    // Then: Short clip padded with zeros, long clip unchanged
    assert_eq!(short, vec![0.5, 0.5, 0.5, 0.0, 0.0]);
    assert_eq!(long.len(), 6);
}
