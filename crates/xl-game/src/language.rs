use serde::{Deserialize, Serialize};

/// Game client language, numbered as the client expects it on the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientLanguage {
    Japanese,
    #[default]
    English,
    German,
    French,
}

impl ClientLanguage {
    pub fn id(self) -> u8 {
        match self {
            Self::Japanese => 0,
            Self::English => 1,
            Self::German => 2,
            Self::French => 3,
        }
    }

    /// Language code used by the launcher web pages
    pub fn lang_code(self) -> &'static str {
        match self {
            Self::Japanese => "ja",
            Self::English => "en-gb",
            Self::German => "de",
            Self::French => "fr",
        }
    }
}
