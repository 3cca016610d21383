use axum::body::Bytes;

/// Multipart field carrying the image
pub const FILE_FIELD: &str = "data";

/// Multipart field carrying the shared secret
pub const AUTH_FIELD: &str = "auth";

/// Body returned for an accepted upload
pub const UPLOAD_SUCCESS_MESSAGE: &str = "File uploaded successfully";

/// File part pulled out of the multipart body
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Filename as sent by the client, before sanitizing; `None` for a
    /// plain form value
    pub file_name: Option<String>,
    /// Content type declared on the part, empty when absent
    pub content_type: String,
    pub data: Bytes,
}

/// An upload that passed validation, ready to be stored
#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// Single path component the file is stored under
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
    /// Peer address as `ip:port`
    pub ip_address: String,
    pub user_agent: String,
}

/// Check that a declared MIME type is an image type (`image/*`, any case)
pub fn is_image_content_type(content_type: &str) -> bool {
    content_type
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("image/"))
}

/// Reduce a client-supplied filename to its final path component.
///
/// Both `/` and `\` count as separators. Returns `None` when nothing usable
/// remains (empty, `.` or `..`).
pub fn sanitize_file_name(raw: &str) -> Option<&str> {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or("");

    match name {
        "" | "." | ".." => None,
        name if name.contains('\0') => None,
        name => Some(name),
    }
}
