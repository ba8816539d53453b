use once_cell::sync::Lazy;
use regex::Regex;

static UNSAFE_CHARS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.-]").unwrap());

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Empty filename.")]
    EmptyFilename,
    #[error("Empty file.")]
    EmptyFile,
    #[error("{0}")]
    Read(String),
}

/// An accepted upload, ready for recognition.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub filename: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl UploadedImage {
    pub fn new(filename: String, bytes: Vec<u8>) -> Result<Self, UploadError> {
        if bytes.is_empty() {
            return Err(UploadError::EmptyFile);
        }
        Ok(UploadedImage {
            mime_type: infer_mime(&filename),
            filename,
            bytes,
        })
    }
}

/// Sanitized name for the `images` field at `index`. A missing or blank
/// declared name falls back to `image_<index>.jpg`; `None` means nothing
/// usable survived sanitizing.
pub fn resolve_filename(index: usize, declared: Option<&str>) -> Option<String> {
    let filename = match declared.filter(|s| !s.is_empty()) {
        Some(name) => secure_filename(name),
        None => format!("image_{}.jpg", index),
    };
    Some(filename).filter(|f| !f.is_empty())
}

/// Reduces a client filename to a safe ASCII name with no path components.
/// May return an empty string.
pub fn secure_filename(name: &str) -> String {
    let ascii: String = name
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");
    UNSAFE_CHARS_RE
        .replace_all(&joined, "")
        .trim_matches(|c| c == '.' || c == '_')
        .to_string()
}

pub fn infer_mime(filename: &str) -> &'static str {
    let ext = match filename.rsplit_once('.') {
        Some((_, ext)) => ext.to_lowercase(),
        None => "jpg".to_string(),
    };
    match ext.as_str() {
        "png" => "image/png",
        "webp" => "image/webp",
        _ => "image/jpeg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_paths_and_spaces() {
        assert_eq!(secure_filename("../../etc/passwd"), "etc_passwd");
        assert_eq!(secure_filename("My cool movie.mov"), "My_cool_movie.mov");
        assert_eq!(secure_filename("flask\u{00e4}.png"), "flask.png");
        assert_eq!(secure_filename("a;b|c.jpg"), "abc.jpg");
    }

    #[test]
    fn sanitizes_to_empty() {
        assert_eq!(secure_filename("///"), "");
        assert_eq!(secure_filename("..."), "");
        assert_eq!(secure_filename("\u{8a66}\u{9a13}"), "");
    }

    #[test]
    fn mime_from_extension() {
        assert_eq!(infer_mime("a.png"), "image/png");
        assert_eq!(infer_mime("a.PNG"), "image/png");
        assert_eq!(infer_mime("a.webp"), "image/webp");
        assert_eq!(infer_mime("a.jpeg"), "image/jpeg");
        assert_eq!(infer_mime("a.gif"), "image/jpeg");
        assert_eq!(infer_mime("png"), "image/jpeg");
    }

    #[test]
    fn resolve_defaults_missing_name() {
        assert_eq!(resolve_filename(2, None).as_deref(), Some("image_2.jpg"));
        assert_eq!(resolve_filename(0, Some("")).as_deref(), Some("image_0.jpg"));
        assert_eq!(resolve_filename(0, Some("///")), None);
        assert_eq!(
            resolve_filename(1, Some("C:\\photos\\flask.PNG")).as_deref(),
            Some("C_photos_flask.PNG")
        );
    }

    #[test]
    fn new_rejects_empty_content() {
        let err = UploadedImage::new("tube.webp".into(), Vec::new()).unwrap_err();
        assert!(matches!(err, UploadError::EmptyFile));
        assert_eq!(err.to_string(), "Empty file.");

        let img = UploadedImage::new("tube.webp".into(), vec![0xff]).unwrap();
        assert_eq!(img.mime_type, "image/webp");
    }
}
