//! File naming for the transcription endpoint.
//!
//! The endpoint sniffs the format from the upload's filename, so every
//! upload gets a synthetic `<uuid><ext>` name whose extension is one the
//! endpoint accepts.

use llmask_core::error::MediaError;

/// Extensions the transcription endpoint accepts.
pub const ACCEPTED_EXTENSIONS: &[&str] =
    &[".m4a", ".mp3", ".webm", ".mp4", ".mpga", ".wav", ".mpeg"];

/// Preferred extension per content type, consulted before the MIME database.
const PREFERRED: &[(&str, &str)] = &[
    ("audio/mp4", ".m4a"),
    ("audio/mp3", ".mp3"),
    ("audio/webm", ".webm"),
    ("video/mp4", ".mp4"),
    ("audio/mpeg", ".mpga"),
    ("audio/wav", ".wav"),
    ("audio/x-wav", ".wav"),
    ("video/mpeg", ".mpeg"),
    ("video/webm", ".webm"),
];

/// Pick an accepted file extension for a media content type.
pub fn extension_for(content_type: &str) -> Result<&'static str, MediaError> {
    if let Some((_, ext)) = PREFERRED.iter().find(|(ct, _)| *ct == content_type) {
        return Ok(ext);
    }

    mime_guess::get_mime_extensions_str(content_type)
        .into_iter()
        .flatten()
        .find_map(|ext| {
            ACCEPTED_EXTENSIONS
                .iter()
                .copied()
                .find(|accepted| accepted[1..] == **ext)
        })
        .ok_or_else(|| MediaError::NoExtensionForContentType(content_type.to_string()))
}

/// A unique upload filename for the given content type.
pub fn synthetic_filename(content_type: &str) -> Result<String, MediaError> {
    let ext = extension_for(content_type)?;
    Ok(format!("{}{}", uuid::Uuid::new_v4(), ext))
}
