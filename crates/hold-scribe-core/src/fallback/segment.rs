//! Re-segmentation used when replaying a clip.

/// Append silence until `samples` holds at least `min_len` samples.
pub fn pad_to(mut samples: Vec<f32>, min_len: usize) -> Vec<f32> {
    if samples.len() < min_len {
        samples.resize(min_len, 0.0);
    }
    samples
}

/// Overlapping windows of `window` samples, each starting `window - overlap`
/// after the previous one. The last window may be shorter. An overlap at or
/// above the window length is clamped so windows always advance.
pub fn segment_windows(samples: &[f32], window: usize, overlap: usize) -> Vec<&[f32]> {
    if samples.is_empty() {
        return Vec::new();
    }
    let window = window.max(1);
    let step = window.saturating_sub(overlap).max(1);

    let mut windows = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + window).min(samples.len());
        windows.push(&samples[start..end]);
        if end == samples.len() {
            break;
        }
        start += step;
    }
    windows
}
