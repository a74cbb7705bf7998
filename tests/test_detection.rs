//! Tests for document-level detection: patterns, scripts, location and review.

use docveil::backend::{MemoryBackend, MemoryPage};
use docveil::classify::{ClassifierService, RawToken, TokenClassifier};
use docveil::patterns::{PatternCatalog, ScriptClassifier, ScriptSet, UserPattern};
use docveil::{
    Aggressiveness, DetectionConfig, DetectionMethod, DetectionPipeline, EntityType, ReviewSet,
};

const PAGE_H: f32 = 792.0;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn pages_of(backend: &MemoryBackend, count: usize) -> Vec<String> {
    (0..count)
        .map(|p| backend.page_text(p).unwrap_or_default().to_string())
        .collect()
}

mod pattern_pass {
    use super::*;

    #[test]
    fn test_contact_scenario() {
        init_logging();
        let text = "Contact: john@example.com, SSN 123-45-6789";
        let backend = MemoryBackend::new().with_text_page(text);
        let report = DetectionPipeline::new(DetectionConfig::default())
            .run(&backend, &pages_of(&backend, 1), None, None)
            .unwrap();

        let emails: Vec<_> = report.entities.iter().filter(|e| e.entity_type == EntityType::Email).collect();
        let ssns: Vec<_> = report.entities.iter().filter(|e| e.entity_type == EntityType::Ssn).collect();
        assert_eq!(emails.len(), 1);
        assert_eq!(ssns.len(), 1);
        assert!(ssns[0].confidence > 0.85, "keyword boost expected, got {}", ssns[0].confidence);
        assert!(ssns[0].confidence <= 1.0);
    }

    #[test]
    fn test_validator_rejection_emits_nothing() {
        init_logging();
        let backend = MemoryBackend::new().with_text_page("000-12-3456");
        let report = DetectionPipeline::new(DetectionConfig::default().with_aggressiveness(Aggressiveness::Aggressive))
            .run(&backend, &pages_of(&backend, 1), None, None)
            .unwrap();
        assert!(report.entities.is_empty());
        assert_eq!(report.stats.validator_rejections, 1);
    }

    #[test]
    fn test_payment_card_requires_luhn() {
        let mut catalog = PatternCatalog::new();
        let valid = catalog.scan("Card 4111 1111 1111 1111", ScriptSet::LATIN);
        assert!(valid.matches.iter().any(|m| m.entity_type == EntityType::CreditCard));

        let invalid = catalog.scan("Card 4111 1111 1111 1112", ScriptSet::LATIN);
        assert!(invalid.matches.iter().all(|m| m.entity_type != EntityType::CreditCard));
        assert!(invalid.rejected >= 1);
    }

    #[test]
    fn test_conservative_level_hides_medium_matches() {
        let backend = MemoryBackend::new().with_text_page("Reach me at (415) 555-0132 tomorrow");
        let pages = pages_of(&backend, 1);

        let balanced = DetectionPipeline::new(DetectionConfig::default())
            .run(&backend, &pages, None, None)
            .unwrap();
        assert_eq!(balanced.entities.len(), 1);
        assert_eq!(balanced.entities[0].entity_type, EntityType::Phone);

        let conservative = DetectionPipeline::new(
            DetectionConfig::default().with_aggressiveness(Aggressiveness::Conservative),
        )
        .run(&backend, &pages, None, None)
        .unwrap();
        assert!(conservative.entities.is_empty());
    }
}

mod scripts {
    use super::*;

    #[test]
    fn test_cn_mobile_only_in_han_documents() {
        let mut catalog = PatternCatalog::new();

        let latin = "Order number 13812345678 shipped";
        let scripts = ScriptClassifier::classify(latin).scripts;
        let outcome = catalog.scan(latin, scripts);
        assert!(outcome.matches.iter().all(|m| m.pattern_name != "cn_mobile"));

        let han = "请联系张先生，电话号码是13812345678，谢谢您";
        let scripts = ScriptClassifier::classify(han).scripts;
        assert!(scripts.contains(ScriptSet::HAN));
        let outcome = catalog.scan(han, scripts);
        let mobile: Vec<_> = outcome.matches.iter().filter(|m| m.pattern_name == "cn_mobile").collect();
        assert_eq!(mobile.len(), 1);
        assert_eq!(mobile[0].text, "13812345678");
    }

    #[test]
    fn test_digit_only_text_applies_all_patterns() {
        let profile = ScriptClassifier::classify("13812345678");
        assert!(profile.is_undetermined());
        let outcome = PatternCatalog::new().scan("13812345678", profile.scripts);
        assert!(outcome.matches.iter().any(|m| m.pattern_name == "cn_mobile"));
    }
}

mod user_patterns {
    use super::*;

    fn falcon() -> UserPattern {
        serde_json::from_str(r#"{"name": "codename", "pattern": "Project\\s+Falcon"}"#).unwrap()
    }

    #[test]
    fn test_multi_line_match_located_as_one_box() {
        init_logging();
        let backend = MemoryBackend::new().with_text_page("Code name Project\nFalcon approved");
        let mut catalog = PatternCatalog::new();
        catalog.add_user_pattern(&falcon()).unwrap();

        let report = DetectionPipeline::new(DetectionConfig::default())
            .with_catalog(catalog)
            .run(&backend, &pages_of(&backend, 1), None, None)
            .unwrap();

        assert_eq!(report.entities.len(), 1);
        let entity = &report.entities[0];
        assert_eq!(entity.entity_type, EntityType::Custom);
        assert_eq!(entity.text, "Project\nFalcon");
        let bbox = entity.position.bbox;
        assert!((bbox.height - 2.0 * MemoryBackend::LINE_HEIGHT).abs() < 1e-3);
        assert!((bbox.top() - (PAGE_H - MemoryBackend::MARGIN)).abs() < 1e-3);
    }

    #[test]
    fn test_soft_hyphenated_match_found_by_variant() {
        init_logging();
        let page = MemoryPage::new("Ref Pro-\nject Falcon").with_layout_text("Ref Project Falcon");
        let backend = MemoryBackend::new().with_page(page);
        let mut catalog = PatternCatalog::new();
        catalog
            .add_user_pattern(&UserPattern {
                name: "codename".to_string(),
                pattern: r"Pro-?\s*ject Falcon".to_string(),
                entity_type: EntityType::Custom,
                confidence: 0.9,
                context_keywords: Vec::new(),
            })
            .unwrap();

        let report = DetectionPipeline::new(DetectionConfig::default())
            .with_catalog(catalog)
            .run(&backend, &pages_of(&backend, 1), None, None)
            .unwrap();

        assert_eq!(report.entities.len(), 1);
        let expected = MemoryBackend::span_box(PAGE_H, 0, 4, 14);
        assert!(report.entities[0].position.bbox.approx_eq(&expected, 1e-3));
    }

    #[test]
    fn test_plain_occurrence_before_hyphenated_one() {
        init_logging();
        let page = MemoryPage::new("Project Falcon\n\n\n\nRef Pro-\nject Falcon")
            .with_layout_text("Project Falcon\n\n\n\nRef Project Falcon");
        let backend = MemoryBackend::new().with_page(page);
        let mut catalog = PatternCatalog::new();
        catalog
            .add_user_pattern(&UserPattern {
                name: "codename".to_string(),
                pattern: r"Pro-?\s*ject Falcon".to_string(),
                entity_type: EntityType::Custom,
                confidence: 0.9,
                context_keywords: Vec::new(),
            })
            .unwrap();

        let report = DetectionPipeline::new(DetectionConfig::default())
            .with_catalog(catalog)
            .run(&backend, &pages_of(&backend, 1), None, None)
            .unwrap();

        assert_eq!(report.entities.len(), 2);
        let plain = MemoryBackend::span_box(PAGE_H, 0, 0, 14);
        let hyphenated = MemoryBackend::span_box(PAGE_H, 4, 4, 14);
        assert!(report.entities.iter().any(|e| e.position.bbox.approx_eq(&plain, 1e-3)));
        assert!(report.entities.iter().any(|e| e.position.bbox.approx_eq(&hyphenated, 1e-3)));
    }

    #[test]
    fn test_stacked_multi_line_matches_stay_separate() {
        let backend = MemoryBackend::new().with_text_page("Project\nFalcon\nProject\nFalcon");
        let mut catalog = PatternCatalog::new();
        catalog.add_user_pattern(&falcon()).unwrap();

        let report = DetectionPipeline::new(DetectionConfig::default())
            .with_catalog(catalog)
            .run(&backend, &pages_of(&backend, 1), None, None)
            .unwrap();

        assert_eq!(report.entities.len(), 2);
        for entity in &report.entities {
            assert!((entity.position.bbox.height - 2.0 * MemoryBackend::LINE_HEIGHT).abs() < 1e-3);
        }
    }

    #[test]
    fn test_invalid_user_pattern_rejected() {
        let mut catalog = PatternCatalog::new();
        let bad = UserPattern {
            name: "broken".to_string(),
            pattern: "(unclosed".to_string(),
            entity_type: EntityType::Custom,
            confidence: 0.8,
            context_keywords: Vec::new(),
        };
        let generation = catalog.generation();
        assert!(matches!(
            catalog.add_user_pattern(&bad),
            Err(docveil::Error::InvalidPattern { .. })
        ));
        assert_eq!(catalog.generation(), generation);
    }
}

mod classifier {
    use super::*;

    struct ScriptedClassifier;

    impl TokenClassifier for ScriptedClassifier {
        fn classify(&self, text: &str) -> docveil::Result<Vec<RawToken>> {
            // Word pieces for "Johnson" wherever it occurs in the chunk
            let mut tokens = Vec::new();
            for (byte, _) in text.match_indices("Johnson") {
                let start = text[..byte].chars().count();
                tokens.push(RawToken::new("John", "B-PER", 0.97, start, start + 4));
                tokens.push(RawToken::new("##son", "I-PER", 0.55, start + 4, start + 7));
            }
            Ok(tokens)
        }
    }

    #[test]
    fn test_word_pieces_become_one_person() {
        init_logging();
        let service = ClassifierService::ready(Box::new(ScriptedClassifier));
        let backend = MemoryBackend::new().with_text_page("Referred by Dr. Johnson last week");
        let report = DetectionPipeline::new(DetectionConfig::default().with_classifier(true))
            .with_classifier(&service)
            .run(&backend, &pages_of(&backend, 1), None, None)
            .unwrap();

        assert_eq!(report.entities.len(), 1);
        let person = &report.entities[0];
        assert_eq!(person.text, "Johnson");
        assert_eq!(person.entity_type, EntityType::Person);
        assert_eq!(person.method, DetectionMethod::Classifier);
        assert_eq!(person.confidence, 0.97);
    }

    #[test]
    fn test_two_occurrences_both_kept() {
        let service = ClassifierService::ready(Box::new(ScriptedClassifier));
        let backend = MemoryBackend::new().with_text_page("Johnson called.\nLater Johnson wrote.");
        let report = DetectionPipeline::new(DetectionConfig::default().with_classifier(true))
            .with_classifier(&service)
            .run(&backend, &pages_of(&backend, 1), None, None)
            .unwrap();
        assert_eq!(report.entities.len(), 2);
        let mut offsets: Vec<i64> = report.entities.iter().map(|e| e.position.source_offset).collect();
        offsets.sort();
        assert_eq!(offsets, vec![0, 22]);
    }
}

mod review {
    use super::*;

    #[test]
    fn test_review_round_trip() {
        let backend = MemoryBackend::new()
            .with_text_page("Mail jane@example.org")
            .with_text_page("SSN 123-45-6789");
        let report = DetectionPipeline::new(DetectionConfig::default())
            .run(&backend, &pages_of(&backend, 2), None, None)
            .unwrap();
        assert_eq!(report.entities.len(), 2);

        let mut review = ReviewSet::new(report.entities);
        let email_id = review
            .iter()
            .find(|e| e.entity_type == EntityType::Email)
            .map(|e| e.id)
            .unwrap();
        review.reject(&[email_id]);
        review.confirm_all_pending();

        let confirmed = review.confirmed();
        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0].entity_type, EntityType::Ssn);
        assert_eq!(confirmed[0].page(), 1);

        let summary = review.summary();
        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.confirmed, 1);
    }
}
