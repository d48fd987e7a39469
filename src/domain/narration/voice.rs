use serde::{Deserialize, Serialize};

/// Voice families that Google bills and renders as premium voices
const HIGH_DEFINITION_FAMILIES: &[&str] = &["Wavenet", "Neural2", "Studio", "Journey", "Polyglot"];

/// Sample rate used for every high-definition request
pub const HIGH_DEFINITION_SAMPLE_RATE: u32 = 24_000;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum VoiceError {
    #[error("voice '{0}' is not a <language>-<region>-<name> identifier")]
    Malformed(String),
    #[error("voice '{0}' is not offered")]
    NotOffered(String),
}

/// Quality tier encoded in a voice identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceTier {
    Standard,
    #[serde(rename = "hd")]
    HighDefinition,
}

/// A voice selector such as `en-US-Wavenet-F`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    name: String,
    language_code: String,
    tier: VoiceTier,
}

impl Voice {
    /// Parse a voice identifier.
    ///
    /// The locale is taken from the first two dash-separated components. The
    /// voice is high-definition when its family is a premium one or any
    /// component is tagged `HD`.
    pub fn parse(name: &str) -> Result<Self, VoiceError> {
        let name = name.trim();
        let parts: Vec<&str> = name.split('-').collect();

        if parts.len() < 3 || parts.iter().any(|p| p.is_empty()) {
            return Err(VoiceError::Malformed(name.to_string()));
        }

        let language_code = format!("{}-{}", parts[0], parts[1]);
        let is_hd = HIGH_DEFINITION_FAMILIES.contains(&parts[2])
            || parts[2..].iter().any(|p| p.eq_ignore_ascii_case("hd"));

        Ok(Self {
            name: name.to_string(),
            language_code,
            tier: if is_hd {
                VoiceTier::HighDefinition
            } else {
                VoiceTier::Standard
            },
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn language_code(&self) -> &str {
        &self.language_code
    }

    pub fn tier(&self) -> VoiceTier {
        self.tier
    }

    /// Encoding parameters for this voice's tier
    pub fn profile(&self) -> EncodingProfile {
        match self.tier {
            VoiceTier::HighDefinition => EncodingProfile {
                sample_rate_hertz: Some(HIGH_DEFINITION_SAMPLE_RATE),
                speaking_rate: Some(1.0),
                pitch: Some(0.0),
            },
            VoiceTier::Standard => EncodingProfile::default(),
        }
    }
}

impl std::fmt::Display for Voice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Synthesis tuning sent with every request. `None` leaves the service default.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EncodingProfile {
    pub sample_rate_hertz: Option<u32>,
    pub speaking_rate: Option<f32>,
    pub pitch: Option<f32>,
}

/// The set of voices this deployment accepts
#[derive(Debug, Clone)]
pub struct VoiceCatalog {
    voices: Vec<Voice>,
}

impl VoiceCatalog {
    /// Build a catalog, skipping identifiers that do not parse
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let voices = names
            .into_iter()
            .filter_map(|name| match Voice::parse(name.as_ref()) {
                Ok(voice) => Some(voice),
                Err(e) => {
                    tracing::warn!(error = %e, "Ignoring voice from catalog");
                    None
                }
            })
            .collect();

        Self { voices }
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    /// Look up an offered voice by identifier
    pub fn select(&self, name: &str) -> Result<Voice, VoiceError> {
        let voice = Voice::parse(name)?;
        if self.voices.iter().any(|v| v.name == voice.name) {
            Ok(voice)
        } else {
            Err(VoiceError::NotOffered(voice.name))
        }
    }
}
