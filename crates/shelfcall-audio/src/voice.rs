//! Voice catalog entries and voice selection.

/// A voice offered by a speech synthesizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceInfo {
    pub name: String,
    /// BCP 47 language tag, e.g. "en-US".
    pub language: String,
}

impl VoiceInfo {
    pub fn new(name: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            language: language.into(),
        }
    }
}

/// Pick the voice that best matches a requested name or hint.
///
/// An exact (case-insensitive) name match wins. Otherwise the first voice
/// whose name contains the request is used, except that "male" never selects
/// a voice whose name contains "female". `None` means the synthesizer should
/// fall back to its default voice.
pub fn match_voice<'a>(voices: &'a [VoiceInfo], requested: &str) -> Option<&'a VoiceInfo> {
    let wanted = requested.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }

    if let Some(exact) = voices.iter().find(|v| v.name.to_lowercase() == wanted) {
        return Some(exact);
    }

    voices.iter().find(|v| {
        let name = v.name.to_lowercase();
        if wanted == "male" && name.contains("female") {
            return false;
        }
        name.contains(&wanted)
    })
}
