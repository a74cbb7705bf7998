//! Writing-system classification of a text sample.
//!
//! The classifier samples the first [`SAMPLE_CHARS`] characters, counts code points
//! per Unicode block and reports every script whose share of the non-whitespace
//! characters reaches its threshold. Digits and punctuation count toward the total
//! but toward no script, which is why Latin, the script most often mixed with them,
//! gets the lower threshold.

use bitflags::bitflags;

/// Number of characters sampled from the start of the text.
pub const SAMPLE_CHARS: usize = 10_000;

/// Minimum share for Latin.
pub const LATIN_THRESHOLD: f32 = 0.20;

/// Minimum share for every other script.
pub const DEFAULT_THRESHOLD: f32 = 0.30;

bitflags! {
    /// A set of scripts.
    ///
    /// Patterns carry the set of scripts they apply to (empty = universal); the
    /// classifier returns the set detected in the document.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ScriptSet: u16 {
        /// Basic and extended Latin letters
        const LATIN = 1 << 0;
        /// Cyrillic
        const CYRILLIC = 1 << 1;
        /// Greek
        const GREEK = 1 << 2;
        /// Arabic
        const ARABIC = 1 << 3;
        /// Hebrew
        const HEBREW = 1 << 4;
        /// Devanagari
        const DEVANAGARI = 1 << 5;
        /// Thai
        const THAI = 1 << 6;
        /// CJK unified ideographs
        const HAN = 1 << 7;
        /// Japanese Hiragana
        const HIRAGANA = 1 << 8;
        /// Japanese Katakana
        const KATAKANA = 1 << 9;
        /// Korean Hangul
        const HANGUL = 1 << 10;
    }
}

/// A single script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Script {
    /// Basic and extended Latin letters
    Latin,
    /// Cyrillic
    Cyrillic,
    /// Greek
    Greek,
    /// Arabic
    Arabic,
    /// Hebrew
    Hebrew,
    /// Devanagari
    Devanagari,
    /// Thai
    Thai,
    /// CJK unified ideographs
    Han,
    /// Japanese Hiragana
    Hiragana,
    /// Japanese Katakana
    Katakana,
    /// Korean Hangul
    Hangul,
}

impl Script {
    /// All scripts in counting order.
    pub const ALL: [Script; 11] = [
        Script::Latin,
        Script::Cyrillic,
        Script::Greek,
        Script::Arabic,
        Script::Hebrew,
        Script::Devanagari,
        Script::Thai,
        Script::Han,
        Script::Hiragana,
        Script::Katakana,
        Script::Hangul,
    ];

    /// Script of a single character, by Unicode block.
    pub fn of(ch: char) -> Option<Script> {
        let code = ch as u32;
        let script = match code {
            0x41..=0x5A | 0x61..=0x7A => Script::Latin,
            0xD7 | 0xF7 => return None,
            0xC0..=0x24F | 0x1E00..=0x1EFF => Script::Latin,
            0x370..=0x3FF | 0x1F00..=0x1FFF => Script::Greek,
            0x400..=0x52F => Script::Cyrillic,
            0x590..=0x5FF | 0xFB1D..=0xFB4F => Script::Hebrew,
            0x600..=0x6FF | 0x750..=0x77F | 0x8A0..=0x8FF => Script::Arabic,
            0xFB50..=0xFDFF | 0xFE70..=0xFEFF => Script::Arabic,
            0x900..=0x97F => Script::Devanagari,
            0xE00..=0xE7F => Script::Thai,
            0x1100..=0x11FF | 0x3130..=0x318F | 0xAC00..=0xD7AF => Script::Hangul,
            0x3040..=0x309F => Script::Hiragana,
            0x30A0..=0x30FF | 0x31F0..=0x31FF | 0xFF66..=0xFF9F => Script::Katakana,
            0x3400..=0x4DBF | 0x4E00..=0x9FFF | 0xF900..=0xFAFF => Script::Han,
            0x20000..=0x2A6DF => Script::Han,
            _ => return None,
        };
        Some(script)
    }

    /// The single-member set for this script.
    pub fn flag(&self) -> ScriptSet {
        match self {
            Script::Latin => ScriptSet::LATIN,
            Script::Cyrillic => ScriptSet::CYRILLIC,
            Script::Greek => ScriptSet::GREEK,
            Script::Arabic => ScriptSet::ARABIC,
            Script::Hebrew => ScriptSet::HEBREW,
            Script::Devanagari => ScriptSet::DEVANAGARI,
            Script::Thai => ScriptSet::THAI,
            Script::Han => ScriptSet::HAN,
            Script::Hiragana => ScriptSet::HIRAGANA,
            Script::Katakana => ScriptSet::KATAKANA,
            Script::Hangul => ScriptSet::HANGUL,
        }
    }

    /// Minimum share of the sample for this script to count as present.
    pub fn threshold(&self) -> f32 {
        match self {
            Script::Latin => LATIN_THRESHOLD,
            _ => DEFAULT_THRESHOLD,
        }
    }

    fn index(&self) -> usize {
        Script::ALL.iter().position(|s| s == self).unwrap_or(0)
    }
}

/// Result of classifying a sample.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptProfile {
    /// Scripts at or above their threshold
    pub scripts: ScriptSet,
    /// Share of each script with a non-zero count
    pub shares: Vec<(Script, f32)>,
    /// Non-whitespace characters examined
    pub sampled: usize,
}

impl ScriptProfile {
    /// Whether no script reached its threshold.
    pub fn is_undetermined(&self) -> bool {
        self.scripts.is_empty()
    }
}

/// Statistical script classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptClassifier;

impl ScriptClassifier {
    /// Classify a text sample.
    ///
    /// # Examples
    ///
    /// ```
    /// use docveil::patterns::{ScriptClassifier, ScriptSet};
    ///
    /// let profile = ScriptClassifier::classify("Contact John at the office");
    /// assert_eq!(profile.scripts, ScriptSet::LATIN);
    ///
    /// let profile = ScriptClassifier::classify("联系电话号码 13812345678");
    /// assert!(profile.scripts.contains(ScriptSet::HAN));
    /// ```
    pub fn classify(text: &str) -> ScriptProfile {
        let mut counts = [0usize; Script::ALL.len()];
        let mut total = 0usize;

        for ch in text.chars().take(SAMPLE_CHARS) {
            if ch.is_whitespace() {
                continue;
            }
            total += 1;
            if let Some(script) = Script::of(ch) {
                counts[script.index()] += 1;
            }
        }

        let mut scripts = ScriptSet::empty();
        let mut shares = Vec::new();
        if total > 0 {
            for script in Script::ALL {
                let count = counts[script.index()];
                if count == 0 {
                    continue;
                }
                let share = count as f32 / total as f32;
                shares.push((script, share));
                if share >= script.threshold() {
                    scripts |= script.flag();
                }
            }
        }

        log::debug!("Script profile: {:?} (sampled {} characters)", scripts, total);

        ScriptProfile {
            scripts,
            shares,
            sampled: total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latin_document() {
        let profile = ScriptClassifier::classify("The quick brown fox jumps over the lazy dog.");
        assert_eq!(profile.scripts, ScriptSet::LATIN);
    }

    #[test]
    fn test_latin_lower_threshold_with_digits() {
        // 3 letters out of 14 non-whitespace chars
        let profile = ScriptClassifier::classify("SSN 123-45-6789");
        assert_eq!(profile.sampled, 14);
        assert!(profile.scripts.contains(ScriptSet::LATIN));
    }

    #[test]
    fn test_cyrillic_below_threshold_not_reported() {
        // 2 Cyrillic letters out of 12
        let profile = ScriptClassifier::classify("ab 12345678 юя");
        assert!(!profile.scripts.contains(ScriptSet::CYRILLIC));
    }

    #[test]
    fn test_mixed_scripts() {
        let profile = ScriptClassifier::classify("Иван Петров John Smith");
        assert!(profile.scripts.contains(ScriptSet::CYRILLIC));
        assert!(profile.scripts.contains(ScriptSet::LATIN));
    }

    #[test]
    fn test_japanese() {
        let profile = ScriptClassifier::classify("やまだたろうのでんわ");
        assert!(profile.scripts.contains(ScriptSet::HIRAGANA));
        assert!(!profile.scripts.contains(ScriptSet::LATIN));
    }

    #[test]
    fn test_hangul() {
        let profile = ScriptClassifier::classify("주민등록번호는 900101-1234567");
        // 7 Hangul of 21 non-whitespace chars
        assert!(profile.scripts.contains(ScriptSet::HANGUL));
    }

    #[test]
    fn test_digits_only_undetermined() {
        let profile = ScriptClassifier::classify("000-12-3456");
        assert!(profile.is_undetermined());
        assert!(profile.shares.is_empty());
    }

    #[test]
    fn test_empty_text() {
        let profile = ScriptClassifier::classify("");
        assert!(profile.is_undetermined());
        assert_eq!(profile.sampled, 0);
    }

    #[test]
    fn test_multiplication_sign_is_not_latin() {
        assert_eq!(Script::of('×'), None);
        assert_eq!(Script::of('é'), Some(Script::Latin));
    }

    #[test]
    fn test_sample_limit() {
        let text = format!("{}{}", "a".repeat(SAMPLE_CHARS), "ж".repeat(SAMPLE_CHARS));
        let profile = ScriptClassifier::classify(&text);
        assert_eq!(profile.sampled, SAMPLE_CHARS);
        assert_eq!(profile.scripts, ScriptSet::LATIN);
    }
}
