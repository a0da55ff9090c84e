//! Snapshot service - capability layer
//!
//! Captions burned into the result screenshot and sanity checks on captured
//! image bytes.

use chrono::{DateTime, Utc};
use image::ImageFormat;

use crate::error::{AppError, AppResult};

/// DOM id of the injected caption banner
pub const CAPTION_ELEMENT_ID: &str = "dv-status-caption";

/// `"<lastname> | <birth_year> | <UTC timestamp>"`
pub fn caption_text(lastname: &str, birth_year: &str, at: DateTime<Utc>) -> String {
    format!(
        "{} | {} | {}",
        lastname,
        birth_year,
        at.format("%Y-%m-%d %H:%M:%S UTC")
    )
}

/// Script that pins a caption banner to the top of the page
///
/// The next screenshot then carries the caption in its pixels. The script
/// evaluates to `true` so the caller always gets a value back.
pub fn overlay_script(caption: &str) -> String {
    // serde_json gives a correctly escaped JS string literal
    let literal = serde_json::Value::String(caption.to_string()).to_string();
    format!(
        r#"
        (() => {{
            let banner = document.getElementById("{id}");
            if (!banner) {{
                banner = document.createElement("div");
                banner.id = "{id}";
                document.body.prepend(banner);
            }}
            banner.textContent = {text};
            banner.style.cssText = "position:absolute;top:0;left:0;right:0;z-index:2147483647;" +
                "padding:6px 12px;background:#fffbe6;color:#000;border-bottom:2px solid #000;" +
                "font:bold 16px monospace;";
            return true;
        }})()
        "#,
        id = CAPTION_ELEMENT_ID,
        text = literal
    )
}

/// Reject captures that are not a recognizable image
pub fn ensure_image(bytes: &[u8], step: &'static str, locator: &str) -> AppResult<ImageFormat> {
    if bytes.is_empty() {
        return Err(AppError::target_unavailable(step, locator));
    }
    image::guess_format(bytes).map_err(|_| AppError::target_unavailable(step, locator))
}

/// MIME type for stored image bytes, PNG when unknown
pub fn mime_type(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .map(|format| format.to_mime_type())
        .unwrap_or("image/png")
}
