//! crates/koala_core/src/voices.rs
//!
//! Static language → gender → voice table for Amazon Polly, and the
//! fallback rules used to pick a voice for any language/gender pair.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::domain::{Gender, LangCode, VoiceId};

/// Voices available for one language, grouped by gender.
/// An empty gendered list means Polly has no such voice and the neutral list is used.
#[derive(Debug)]
pub struct VoiceTable {
    pub female: &'static [VoiceId],
    pub male: &'static [VoiceId],
    pub neutral: &'static [VoiceId],
}

impl VoiceTable {
    /// Candidates for `gender`, falling back to the neutral list.
    pub fn candidates(&self, gender: Gender) -> &'static [VoiceId] {
        let list = match gender {
            Gender::Female => self.female,
            Gender::Male => self.male,
            Gender::Neutral => self.neutral,
        };
        if list.is_empty() {
            self.neutral
        } else {
            list
        }
    }
}

macro_rules! voices {
    ($($name:literal),* $(,)?) => {
        &[$(VoiceId($name)),*]
    };
}

/// Languages Polly only offers a single female voice for.
const fn single(voice: &'static [VoiceId]) -> VoiceTable {
    VoiceTable {
        female: voice,
        male: &[],
        neutral: voice,
    }
}

const ARABIC: VoiceTable = single(voices!["Zeina"]);
const HEBREW: VoiceTable = single(voices!["Ruth"]);
const SWEDISH: VoiceTable = single(voices!["Astrid"]);
const TURKISH: VoiceTable = single(voices!["Filiz"]);
const KOREAN: VoiceTable = single(voices!["Seoyeon"]);
const CATALAN: VoiceTable = single(voices!["Arlet"]);
const CZECH: VoiceTable = single(voices!["Vicki"]);
const FINNISH: VoiceTable = single(voices!["Suvi"]);
const HINDI: VoiceTable = single(voices!["Aditi"]);
const INDONESIAN: VoiceTable = single(voices!["Lea"]);
const MALAY: VoiceTable = single(voices!["Nina"]);
const NORWEGIAN: VoiceTable = single(voices!["Liv"]);
const ROMANIAN: VoiceTable = single(voices!["Carmen"]);
const VIETNAMESE: VoiceTable = single(voices!["Hiujin"]);

const ENGLISH: VoiceTable = VoiceTable {
    female: voices!["Joanna", "Kendra", "Kimberly", "Salli", "Ruth", "Ivy", "Amy"],
    male: voices!["Matthew", "Justin", "Joey", "Kevin", "Stephen"],
    neutral: voices!["Joanna", "Matthew", "Kendra", "Kimberly", "Salli", "Joey", "Justin", "Kevin"],
};

const SPANISH: VoiceTable = VoiceTable {
    female: voices!["Conchita", "Lucia", "Mia", "Lupe"],
    male: voices!["Miguel", "Enrique", "Pedro"],
    neutral: voices!["Conchita", "Miguel", "Lucia", "Enrique", "Mia", "Lupe", "Pedro"],
};

const ITALIAN: VoiceTable = VoiceTable {
    female: voices!["Carla", "Bianca"],
    male: voices!["Giorgio"],
    neutral: voices!["Carla", "Giorgio", "Bianca"],
};

const FRENCH: VoiceTable = VoiceTable {
    female: voices!["Celine", "Lea"],
    male: voices!["Mathieu"],
    neutral: voices!["Celine", "Mathieu", "Lea"],
};

const DANISH: VoiceTable = VoiceTable {
    female: voices!["Naja"],
    male: voices!["Mads"],
    neutral: voices!["Naja", "Mads"],
};

const DUTCH: VoiceTable = VoiceTable {
    female: voices!["Laura"],
    male: voices!["Ruben"],
    neutral: voices!["Laura", "Ruben"],
};

const GERMAN: VoiceTable = VoiceTable {
    female: voices!["Marlene", "Vicki"],
    male: voices!["Hans"],
    neutral: voices!["Marlene", "Hans", "Vicki"],
};

const POLISH: VoiceTable = VoiceTable {
    female: voices!["Ewa", "Maja"],
    male: voices!["Jacek", "Jan"],
    neutral: voices!["Ewa", "Jacek", "Jan", "Maja"],
};

const PORTUGUESE: VoiceTable = VoiceTable {
    female: voices!["Camila", "Vitoria", "Ines"],
    male: voices!["Ricardo", "Thiago"],
    neutral: voices!["Camila", "Ricardo", "Vitoria", "Thiago", "Ines"],
};

// Ukrainian has no Polly voice; Russian is the closest match.
const RUSSIAN: VoiceTable = VoiceTable {
    female: voices!["Tatyana"],
    male: voices!["Maxim"],
    neutral: voices!["Tatyana", "Maxim"],
};

/// The voice table for a language. Every language resolves to a table;
/// those Polly does not cover use English.
pub fn voice_table(lang: LangCode) -> &'static VoiceTable {
    match lang {
        LangCode::Ar => &ARABIC,
        LangCode::Ca => &CATALAN,
        LangCode::Cs => &CZECH,
        LangCode::Da => &DANISH,
        LangCode::De => &GERMAN,
        LangCode::En => &ENGLISH,
        LangCode::Es => &SPANISH,
        LangCode::Fi => &FINNISH,
        LangCode::Fr => &FRENCH,
        LangCode::He => &HEBREW,
        LangCode::Hi => &HINDI,
        LangCode::Id => &INDONESIAN,
        LangCode::It => &ITALIAN,
        LangCode::Ko => &KOREAN,
        LangCode::Ms => &MALAY,
        LangCode::Nb => &NORWEGIAN,
        LangCode::Nl => &DUTCH,
        LangCode::Pl => &POLISH,
        LangCode::Pt => &PORTUGUESE,
        LangCode::Ro => &ROMANIAN,
        LangCode::Ru | LangCode::Uk => &RUSSIAN,
        LangCode::Sv => &SWEDISH,
        LangCode::Tr => &TURKISH,
        LangCode::Vi => &VIETNAMESE,
        LangCode::El
        | LangCode::Gl
        | LangCode::Gu
        | LangCode::Hu
        | LangCode::Kn
        | LangCode::Lt
        | LangCode::Lv
        | LangCode::Mr
        | LangCode::Pa
        | LangCode::Sk
        | LangCode::Sr => &ENGLISH,
    }
}

/// All voices eligible for a raw language tag and gender.
/// Unrecognized tags use the English table.
pub fn voice_candidates(lang_code: &str, gender: Gender) -> &'static [VoiceId] {
    let table = LangCode::parse(lang_code)
        .map(voice_table)
        .unwrap_or(&ENGLISH);
    table.candidates(gender)
}

/// Picks one eligible voice uniformly at random.
pub fn pick_voice<R: Rng + ?Sized>(lang_code: &str, gender: Gender, rng: &mut R) -> VoiceId {
    let candidates = voice_candidates(lang_code, gender);
    // Every table has a non-empty neutral list, so `choose` only fails on a broken table.
    candidates
        .choose(rng)
        .copied()
        .unwrap_or(ENGLISH.neutral[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn unknown_language_falls_back_to_english_male_voices() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let voice = pick_voice("xx", Gender::Male, &mut rng);
            assert!(ENGLISH.male.contains(&voice), "{voice} is not an English male voice");
        }
    }

    #[test]
    fn missing_gender_falls_back_to_neutral_list() {
        assert_eq!(voice_candidates("ko", Gender::Male), KOREAN.neutral);
        assert_eq!(voice_candidates("ar", Gender::Male), &[VoiceId("Zeina")]);
    }

    #[test]
    fn regional_tags_select_the_base_language() {
        assert_eq!(voice_candidates("es-MX", Gender::Male), SPANISH.male);
        assert_eq!(voice_candidates("FR", Gender::Female), FRENCH.female);
    }

    #[test]
    fn every_language_and_gender_has_a_voice() {
        for lang in LangCode::ALL {
            for gender in [Gender::Female, Gender::Male, Gender::Neutral] {
                assert!(
                    !voice_table(lang).candidates(gender).is_empty(),
                    "no voice for {lang}/{gender:?}"
                );
            }
        }
    }

    #[test]
    fn uncovered_languages_use_english() {
        assert_eq!(voice_candidates("lv", Gender::Female), ENGLISH.female);
    }

    #[test]
    fn seeded_rng_makes_selection_reproducible() {
        let first = pick_voice("en", Gender::Neutral, &mut StdRng::seed_from_u64(42));
        let second = pick_voice("en", Gender::Neutral, &mut StdRng::seed_from_u64(42));
        assert_eq!(first, second);
    }
}
