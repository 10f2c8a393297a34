//! Static language table

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Language of lexicon data
///
/// The numeric code is small enough to be packed into the low byte of
/// language-scoped cache keys, see [`uid_with_lang`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    Ar,
    Bg,
    Bs,
    Cs,
    Da,
    De,
    El,
    En,
    Es,
    Et,
    Fi,
    Fr,
    He,
    Hr,
    Hu,
    Id,
    It,
    Ja,
    Ka,
    Ko,
    Lt,
    Lv,
    Mk,
    Nl,
    No,
    Pl,
    Pt,
    Ro,
    Ru,
    Sk,
    Sl,
    Sq,
    Sr,
    Sv,
    Th,
    Tr,
    Uk,
    Vi,
    Zh,
}

const LANGS: [(Lang, &str, &str); 39] = [
    (Lang::Ar, "ar", "Arabic"),
    (Lang::Bg, "bg", "Bulgarian"),
    (Lang::Bs, "bs", "Bosnian"),
    (Lang::Cs, "cs", "Czech"),
    (Lang::Da, "da", "Danish"),
    (Lang::De, "de", "German"),
    (Lang::El, "el", "Greek"),
    (Lang::En, "en", "English"),
    (Lang::Es, "es", "Spanish"),
    (Lang::Et, "et", "Estonian"),
    (Lang::Fi, "fi", "Finnish"),
    (Lang::Fr, "fr", "French"),
    (Lang::He, "he", "Hebrew"),
    (Lang::Hr, "hr", "Croatian"),
    (Lang::Hu, "hu", "Hungarian"),
    (Lang::Id, "id", "Indonesian"),
    (Lang::It, "it", "Italian"),
    (Lang::Ja, "ja", "Japanese"),
    (Lang::Ka, "ka", "Georgian"),
    (Lang::Ko, "ko", "Korean"),
    (Lang::Lt, "lt", "Lithuanian"),
    (Lang::Lv, "lv", "Latvian"),
    (Lang::Mk, "mk", "Macedonian"),
    (Lang::Nl, "nl", "Dutch"),
    (Lang::No, "no", "Norwegian"),
    (Lang::Pl, "pl", "Polish"),
    (Lang::Pt, "pt", "Portuguese"),
    (Lang::Ro, "ro", "Romanian"),
    (Lang::Ru, "ru", "Russian"),
    (Lang::Sk, "sk", "Slovak"),
    (Lang::Sl, "sl", "Slovenian"),
    (Lang::Sq, "sq", "Albanian"),
    (Lang::Sr, "sr", "Serbian"),
    (Lang::Sv, "sv", "Swedish"),
    (Lang::Th, "th", "Thai"),
    (Lang::Tr, "tr", "Turkish"),
    (Lang::Uk, "uk", "Ukrainian"),
    (Lang::Vi, "vi", "Vietnamese"),
    (Lang::Zh, "zh", "Chinese"),
];

impl Lang {
    pub fn all() -> impl Iterator<Item = Lang> {
        LANGS.iter().map(|(lang, _, _)| *lang)
    }

    fn position(&self) -> usize {
        LANGS
            .iter()
            .position(|(lang, _, _)| lang == self)
            .unwrap_or(0)
    }

    /// Non-zero numeric code, unique per language
    pub fn code(&self) -> u8 {
        self.position() as u8 + 1
    }

    /// Two-letter code used in API paths
    pub fn as_str(&self) -> &'static str {
        LANGS[self.position()].1
    }

    pub fn name(&self) -> &'static str {
        LANGS[self.position()].2
    }

    pub fn parse(code: &str) -> Option<Lang> {
        let code = code.trim().to_ascii_lowercase();
        LANGS
            .iter()
            .find(|(_, c, _)| *c == code)
            .map(|(lang, _, _)| *lang)
    }

    /// Parse a comma separated list such as `en,de,fr`
    pub fn parse_list(list: &str) -> Result<Vec<Lang>, String> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Lang::parse(s).ok_or_else(|| format!("unknown language {:?}", s)))
            .collect()
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lang {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Lang::parse(s).ok_or_else(|| format!("unknown language {:?}", s))
    }
}

/// Language-scoped key: the id shifted left by 8 bits with the language code below
pub fn uid_with_lang(id: u64, lang: Lang) -> u64 {
    (id << 8) | lang.code() as u64
}
