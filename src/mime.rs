/// Fallback when the file name gives no usable hint.
pub const FALLBACK_CONTENT_TYPE: &str = "text/plain";

/// Infers a content type from a file name's extension.
pub fn infer_content_type(file_name: &str) -> String {
    mime_guess::from_path(file_name)
        .first_raw()
        .unwrap_or(FALLBACK_CONTENT_TYPE)
        .to_string()
}
