//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Height of the box an image is resized into, derived from the *source*
/// aspect ratio and a target width.
///
/// `floor(max_width * height / width)`, computed in 64-bit and saturating at
/// `u32::MAX`. Callers must guarantee `source.0 > 0`.
///
/// # Examples
/// ```
/// # use post_desk::imaging::target_height;
/// assert_eq!(target_height((1000, 500), 300), 150);
/// assert_eq!(target_height((1000, 333), 300), 99);
/// ```
pub fn target_height(source: (u32, u32), max_width: u32) -> u32 {
    let (src_w, src_h) = source;
    let height = max_width as u64 * src_h as u64 / src_w as u64;
    u32::try_from(height).unwrap_or(u32::MAX)
}

/// Calculate the largest size that fits inside `bound` while keeping the
/// source aspect ratio.
///
/// One side matches the bound exactly, the other is rounded and never
/// exceeds its bound. Scales up as well as down.
pub fn fit_dimensions(source: (u32, u32), bound: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (max_w, max_h) = bound;

    let src_aspect = src_w as f64 / src_h as f64;
    let max_aspect = max_w as f64 / max_h as f64;

    if src_aspect > max_aspect {
        // Source is wider: width is the binding side
        let h = (src_h as f64 * max_w as f64 / src_w as f64).round() as u32;
        (max_w, h.clamp(1, max_h))
    } else {
        let w = (src_w as f64 * max_h as f64 / src_h as f64).round() as u32;
        (w.clamp(1, max_w), max_h)
    }
}

/// Calculate dimensions needed to fill a target area (resize before crop).
///
/// Returns dimensions that completely cover the target area while maintaining
/// the source aspect ratio. One dimension will match exactly, the other may exceed.
pub fn fill_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    let src_aspect = src_w as f64 / src_h as f64;
    let tgt_aspect = tgt_w as f64 / tgt_h as f64;

    if src_aspect > tgt_aspect {
        // Source is wider: height will match, width will exceed
        let h = tgt_h;
        let w = (h as f64 * src_aspect).round() as u32;
        (w.max(tgt_w), h)
    } else {
        // Source is taller: width will match, height will exceed
        let w = tgt_w;
        let h = (w as f64 / src_aspect).round() as u32;
        (w, h.max(tgt_h))
    }
}

/// Top-left corner of a centered crop of `target` out of `filled`.
pub fn center_crop_origin(filled: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    (
        filled.0.saturating_sub(target.0) / 2,
        filled.1.saturating_sub(target.1) / 2,
    )
}
