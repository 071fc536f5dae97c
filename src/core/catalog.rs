use serde::{Deserialize, Serialize};
use std::fmt;

/// Languages offered by the TTS backend. The serialized names are the ones
/// the backend expects in `language` fields.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    #[serde(rename = "Pure English")]
    PureEnglish,
    #[serde(rename = "English (Mix)")]
    EnglishMix,
    #[default]
    Hindi,
    Tamil,
    Telugu,
}

impl Language {
    pub const ALL: [Language; 5] = [
        Language::PureEnglish,
        Language::EnglishMix,
        Language::Hindi,
        Language::Tamil,
        Language::Telugu,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::PureEnglish => "Pure English",
            Language::EnglishMix => "English (Mix)",
            Language::Hindi => "Hindi",
            Language::Tamil => "Tamil",
            Language::Telugu => "Telugu",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const ENGLISH_VOICES: &[&str] = &["Naad", "Dhwani"];

const HINDI_VOICES: &[&str] = &[
    "Naad", "Dhwani", "Vaanee", "Swara", "Taal", "Laya", "Raaga", "Geetika",
    "Swarini", "Geet", "Sangeeta", "Raagini", "Madhura", "Komal", "Sangeet",
    "Meghra", "Gandhar", "Madhyam", "Shruti", "Pancham", "Dhaivat", "Nishad",
    "Tara", "Shadja", "Komalika", "Rishabh", "Mandra", "Tarana", "Swarika",
    "Komala", "Geetini", "Teevra", "Chaitra", "Madhur", "Raagika", "Swarita",
    "Vibhaag", "Gitanjali", "Aalap", "Sangeeti", "Taan", "Meend", "Raagita",
    "Gamak", "Murki", "Khatka", "Andolan", "Sparsh", "Kampan", "Shrutika",
    "Swaranjali", "Nada", "Lahar", "Tarang", "Dhwaniya", "Shrutini", "Swar",
    "Geetanjali", "Raaginika", "Sangeetika", "Meghra2", "Swaroopa",
    "Geetimala", "Naadayana", "Swarayana", "Layakari", "Taalayana", "Raag",
    "Swaranjana", "Naadanika", "Dhwanika", "Swaraka", "Sangeetara",
    "Layabaddha",
];

const TAMIL_VOICES: &[&str] = &[
    "Vaani", "Isai", "Thalam", "Swaram", "Madhuram", "Naadham", "Ragam",
    "Pallavi", "Komalam", "Raagamalika", "Geetham", "Taalam", "Dhwani",
    "Sangeetham", "Raagaratna", "Shruti",
];

const TELUGU_VOICES: &[&str] = &[
    "Naadamu", "Dhwani", "Taalam", "Geetamu", "Raagamalika", "Sangeetamu",
    "Vaani", "Swaramu", "Layamu", "Taalabaddha", "Raagapriya", "Swarajathi",
    "Raagini", "Komala", "Naada", "Meghamalini", "Sangeetapriya",
    "Raagamala", "Dhwaniya", "Shruti", "Tara", "Komalavani", "Mandara",
    "Taana", "Swarajati", "Raagaanjali", "Raagika", "Swaranjali", "Geetika",
    "Swaramala", "Aalapana", "Raagaratnam", "Meghavani", "Swarita",
    "Geetavani", "Taala", "Layakari", "Murki", "Sangeetavani", "Geetamala",
    "Naadapriya", "Dhwanika", "Dhwanimala", "Sangeetanjali", "Gamaka",
    "Raagasudha", "Sangeetaratna", "Taalabaddha2", "Sangeetasundari",
    "Naadayana", "Raagavalli", "Swarasudha", "Sangeetaswarna",
    "Raagapriya2", "Swaravara", "Naadeshwara", "Dhwanividya",
    "Taalapala", "Dhwanipala", "Swarapala",
];

/// Ordered voice identifiers available for `language`.
pub fn voices(language: Language) -> &'static [&'static str] {
    match language {
        Language::PureEnglish | Language::EnglishMix => ENGLISH_VOICES,
        Language::Hindi => HINDI_VOICES,
        Language::Tamil => TAMIL_VOICES,
        Language::Telugu => TELUGU_VOICES,
    }
}

/// First voice of the language; every list is non-empty.
pub fn default_voice(language: Language) -> &'static str {
    voices(language)[0]
}

pub fn has_voice(language: Language, voice: &str) -> bool {
    voices(language).contains(&voice)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_language_has_voices() {
        for lang in Language::ALL {
            assert!(!voices(lang).is_empty(), "{} has no voices", lang);
            assert!(has_voice(lang, default_voice(lang)));
        }
    }

    #[test]
    fn test_language_names_round_trip_through_serde() {
        let json = serde_json::to_string(&Language::EnglishMix).unwrap();
        assert_eq!(json, "\"English (Mix)\"");
        let parsed: Language = serde_json::from_str("\"Telugu\"").unwrap();
        assert_eq!(parsed, Language::Telugu);
        assert!(serde_json::from_str::<Language>("\"Klingon\"").is_err());
    }

    #[test]
    fn test_voice_membership_is_per_language() {
        assert!(has_voice(Language::Tamil, "Isai"));
        assert!(!has_voice(Language::Hindi, "Isai"));
        assert_eq!(default_voice(Language::Telugu), "Naadamu");
    }
}
