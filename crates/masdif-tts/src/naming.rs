// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Audio attachment file names.

use sha2::{Digest, Sha256};

/// Derives an unguessable file name for synthesized audio.
///
/// The name is the SHA-256 of the inputs plus a caller-supplied nonce, so the
/// same text synthesized twice still gets distinct names when the nonce
/// differs. The result is safe to use as a URL path segment.
pub fn audio_file_name(
    text: &str,
    language: &str,
    voice: &str,
    nonce: &str,
    extension: &str,
) -> String {
    let mut hasher = Sha256::new();
    for part in [text, language, voice, nonce] {
        hasher.update(part.as_bytes());
        // Separator keeps ("ab", "c") and ("a", "bc") apart.
        hasher.update([0u8]);
    }
    format!("{}.{extension}", hex::encode(hasher.finalize()))
}

/// Extension and MIME type for a provider output format. Unknown formats
/// are treated as mp3, the provider default.
fn audio_format(output_format: &str) -> (&'static str, &'static str) {
    match output_format {
        "ogg_vorbis" => ("ogg", "audio/ogg"),
        "pcm" => ("pcm", "audio/L16"),
        _ => ("mp3", "audio/mpeg"),
    }
}

/// File extension for a provider output format.
pub fn extension_for(output_format: &str) -> &'static str {
    audio_format(output_format).0
}

/// MIME type for a provider output format.
pub fn content_type_for(output_format: &str) -> &'static str {
    audio_format(output_format).1
}
