//! Built-in pattern definitions.

use super::script::ScriptSet;
use super::validators;
use super::PatternDefinition;
use crate::entity::EntityType;
use lazy_static::lazy_static;
use regex::Regex;

const SSN_KEYWORDS: &[&str] = &["ssn", "social security"];
const CARD_KEYWORDS: &[&str] = &["card", "visa", "mastercard", "amex", "credit", "debit"];
const PHONE_KEYWORDS: &[&str] = &["phone", "tel", "mobile", "cell", "call", "fax"];
const DOB_KEYWORDS: &[&str] = &["dob", "date of birth", "born", "birth"];
const PASSPORT_KEYWORDS: &[&str] = &["passport"];
const IP_KEYWORDS: &[&str] = &["ip", "host", "server"];
const INN_KEYWORDS: &[&str] = &["инн"];

fn keywords(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

lazy_static! {
    static ref BUILTIN: Vec<PatternDefinition> = vec![
        PatternDefinition::compiled(
            "email",
            EntityType::Email,
            Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap(),
            0.95,
        ),
        PatternDefinition::compiled(
            "us_ssn",
            EntityType::Ssn,
            Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap(),
            0.85,
        )
        .with_validator(validators::us_ssn)
        .with_context(keywords(SSN_KEYWORDS), 50, 1.15),
        PatternDefinition::compiled(
            "credit_card",
            EntityType::CreditCard,
            Regex::new(r"\b(?:\d{4}[ -]?){3}\d{4}\b").unwrap(),
            0.8,
        )
        .with_validator(validators::payment_card)
        .with_context(keywords(CARD_KEYWORDS), 50, 1.2),
        PatternDefinition::compiled(
            "credit_card_amex",
            EntityType::CreditCard,
            Regex::new(r"\b3[47]\d{2}[ -]?\d{6}[ -]?\d{5}\b").unwrap(),
            0.8,
        )
        .with_validator(validators::payment_card)
        .with_context(keywords(CARD_KEYWORDS), 50, 1.2),
        PatternDefinition::compiled(
            "us_phone",
            EntityType::Phone,
            Regex::new(r"(?:\+?1[-. ])?(?:\(\d{3}\) ?|\b\d{3}[-. ])\d{3}[-. ]\d{4}\b").unwrap(),
            0.7,
        )
        .with_scripts(ScriptSet::LATIN)
        .with_context(keywords(PHONE_KEYWORDS), 40, 1.2),
        PatternDefinition::compiled(
            "iban",
            EntityType::Iban,
            Regex::new(r"\b[A-Z]{2}\d{2}(?: ?[A-Z0-9]{4}){2,7}(?: ?[A-Z0-9]{1,4})?\b").unwrap(),
            0.85,
        )
        .with_validator(validators::iban)
        .with_scripts(ScriptSet::LATIN),
        PatternDefinition::compiled(
            "ipv4",
            EntityType::IpAddress,
            Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").unwrap(),
            0.75,
        )
        .with_validator(validators::public_ipv4)
        .with_context(keywords(IP_KEYWORDS), 30, 1.2),
        PatternDefinition::compiled(
            "uk_nino",
            EntityType::NationalId,
            Regex::new(r"\b[A-CEGHJ-PR-TW-Z]{2} ?\d{2} ?\d{2} ?\d{2} ?[A-D]\b").unwrap(),
            0.7,
        )
        .with_validator(validators::uk_nino)
        .with_scripts(ScriptSet::LATIN),
        PatternDefinition::compiled(
            "date_of_birth",
            EntityType::DateOfBirth,
            Regex::new(r"\b\d{1,2}[/.-]\d{1,2}[/.-](?:19|20)\d{2}\b").unwrap(),
            0.45,
        )
        .with_validator(validators::plausible_date)
        .with_context(keywords(DOB_KEYWORDS), 40, 1.8),
        PatternDefinition::compiled(
            "passport",
            EntityType::Passport,
            Regex::new(r"\b[A-Z]{1,2}\d{6,8}\b").unwrap(),
            0.35,
        )
        .with_context(keywords(PASSPORT_KEYWORDS), 40, 2.4),
        PatternDefinition::compiled(
            "cn_mobile",
            EntityType::Phone,
            Regex::new(r"1[3-9]\d{9}").unwrap(),
            0.8,
        )
        .with_scripts(ScriptSet::HAN)
        .with_digit_boundary(),
        PatternDefinition::compiled(
            "cn_resident_id",
            EntityType::NationalId,
            Regex::new(r"\d{17}[\dXx]").unwrap(),
            0.9,
        )
        .with_validator(validators::cn_resident_id)
        .with_scripts(ScriptSet::HAN)
        .with_digit_boundary(),
        PatternDefinition::compiled(
            "ru_phone",
            EntityType::Phone,
            Regex::new(r"(?:\+7|8)[ -]?\(?\d{3}\)?[ -]?\d{3}[ -]?\d{2}[ -]?\d{2}").unwrap(),
            0.75,
        )
        .with_scripts(ScriptSet::CYRILLIC)
        .with_digit_boundary(),
        PatternDefinition::compiled(
            "ru_inn",
            EntityType::NationalId,
            Regex::new(r"\d{12}|\d{10}").unwrap(),
            0.6,
        )
        .with_validator(validators::ru_inn)
        .with_scripts(ScriptSet::CYRILLIC)
        .with_context(keywords(INN_KEYWORDS), 30, 1.5)
        .with_digit_boundary(),
        PatternDefinition::compiled(
            "jp_phone",
            EntityType::Phone,
            Regex::new(r"0[1-9]\d{0,3}-\d{1,4}-\d{4}").unwrap(),
            0.75,
        )
        .with_validator(validators::jp_phone)
        .with_scripts(ScriptSet::HIRAGANA | ScriptSet::KATAKANA | ScriptSet::HAN)
        .with_digit_boundary(),
        PatternDefinition::compiled(
            "kr_rrn",
            EntityType::NationalId,
            Regex::new(r"\d{6}-[1-4]\d{6}").unwrap(),
            0.9,
        )
        .with_validator(validators::kr_rrn)
        .with_scripts(ScriptSet::HANGUL)
        .with_digit_boundary(),
    ];
}

/// The built-in definitions, in scan order.
pub fn builtin_patterns() -> &'static [PatternDefinition] {
    &BUILTIN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<&str> = builtin_patterns().iter().map(|p| p.name.as_str()).collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
    }

    #[test]
    fn test_confidences_in_range() {
        for pattern in builtin_patterns() {
            assert!((0.0..=1.0).contains(&pattern.base_confidence), "{}", pattern.name);
            assert!(pattern.confidence_boost >= 1.0, "{}", pattern.name);
        }
    }

    #[test]
    fn test_cn_mobile_restricted_to_han() {
        let pattern = builtin_patterns()
            .iter()
            .find(|p| p.name == "cn_mobile")
            .unwrap();
        assert!(pattern.applies_to(ScriptSet::HAN));
        assert!(!pattern.applies_to(ScriptSet::LATIN));
    }
}
