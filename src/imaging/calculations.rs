//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Dimensions of `source` scaled to fit inside `bound`, keeping the aspect
/// ratio.
///
/// Images that already fit are returned unchanged: previews never upscale.
/// Neither output edge drops below 1.
///
/// # Examples
/// ```
/// # use wallpack::imaging::fit_within;
/// // 1920x1080 into 300x200 → width-limited
/// assert_eq!(fit_within((1920, 1080), (300, 200)), (300, 169));
///
/// // Small images are left alone
/// assert_eq!(fit_within((120, 80), (300, 200)), (120, 80));
/// ```
pub fn fit_within(source: (u32, u32), bound: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (max_w, max_h) = bound;

    if src_w == 0 || src_h == 0 || (src_w <= max_w && src_h <= max_h) {
        return source;
    }

    let scale = f64::min(max_w as f64 / src_w as f64, max_h as f64 / src_h as f64);
    let w = ((src_w as f64 * scale).round() as u32).clamp(1, max_w.max(1));
    let h = ((src_h as f64 * scale).round() as u32).clamp(1, max_h.max(1));
    (w, h)
}
