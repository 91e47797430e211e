use regex::Regex;

use crate::shared::options::RedactionOptions;
use crate::shared::region::{Region, RegionSource};
use crate::text::domain::text_recognizer::RecognizedToken;

const EMAIL_PATTERN: &str = r"\S+@\S+\.\S+";
const PHONE_PATTERN: &str = r"\d{3}[-.\s]?\d{4}";
const PLATE_PATTERN: &str = r"^[A-Z0-9]{4,9}$";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextCategory {
    Email,
    Phone,
    Plate,
}

/// Pattern rules deciding which recognized tokens get redacted.
///
/// Email and phone match anywhere in the token; plate must match the whole
/// token. A token can fall in several categories.
pub struct TextClassifier {
    email: Regex,
    phone: Regex,
    plate: Regex,
}

impl TextClassifier {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            email: Regex::new(EMAIL_PATTERN)?,
            phone: Regex::new(PHONE_PATTERN)?,
            plate: Regex::new(PLATE_PATTERN)?,
        })
    }

    pub fn classify(&self, text: &str) -> Vec<TextCategory> {
        let mut categories = Vec::new();
        if self.email.is_match(text) {
            categories.push(TextCategory::Email);
        }
        if self.phone.is_match(text) {
            categories.push(TextCategory::Phone);
        }
        if self.plate.is_match(text) {
            categories.push(TextCategory::Plate);
        }
        categories
    }

    pub fn is_sensitive_text(&self, text: &str) -> bool {
        self.email.is_match(text) || self.phone.is_match(text)
    }

    pub fn is_plate(&self, text: &str) -> bool {
        self.plate.is_match(text)
    }

    /// Boxes of tokens matching a category enabled in `options`.
    pub fn regions(&self, tokens: &[RecognizedToken], options: &RedactionOptions) -> Vec<Region> {
        tokens
            .iter()
            .filter_map(|token| {
                let sensitive = options.blur_text && self.is_sensitive_text(&token.text);
                let plate = options.blur_plates && self.is_plate(&token.text);
                let source = if sensitive {
                    RegionSource::Text
                } else if plate {
                    RegionSource::Plate
                } else {
                    return None;
                };
                Some(Region {
                    source,
                    ..token.bbox.clone()
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn classifier() -> TextClassifier {
        TextClassifier::new().unwrap()
    }

    fn token(text: &str, x: f64) -> RecognizedToken {
        RecognizedToken {
            text: text.to_string(),
            bbox: Region::new(x, 10.0, 40.0, 12.0, RegionSource::Text, 0.9),
        }
    }

    fn options(blur_text: bool, blur_plates: bool) -> RedactionOptions {
        RedactionOptions {
            blur_text,
            blur_plates,
            ..Default::default()
        }
    }

    #[rstest]
    #[case::email("john@example.com", vec![TextCategory::Email])]
    #[case::phone("555-1234", vec![TextCategory::Phone])]
    #[case::phone_dotted("555.1234", vec![TextCategory::Phone])]
    #[case::phone_plain("5551234", vec![TextCategory::Phone, TextCategory::Plate])]
    #[case::plate("AB1234CD", vec![TextCategory::Plate])]
    #[case::plain_word("hello", vec![])]
    #[case::lowercase_not_plate("ab1234cd", vec![])]
    #[case::too_short_for_plate("AB1", vec![])]
    #[case::too_long_for_plate("ABCDEFGHIJ", vec![])]
    fn test_classify(#[case] text: &str, #[case] expected: Vec<TextCategory>) {
        assert_eq!(classifier().classify(text), expected);
    }

    #[test]
    fn test_email_matches_inside_token() {
        assert!(classifier().is_sensitive_text("mail:john@example.com,"));
    }

    #[test]
    fn test_plate_must_be_whole_token() {
        assert!(!classifier().is_plate("plate AB1234"));
    }

    #[test]
    fn test_regions_respect_options() {
        let tokens = vec![
            token("john@example.com", 0.0),
            token("AB1234CD", 100.0),
            token("hello", 200.0),
        ];
        let c = classifier();

        let text_only = c.regions(&tokens, &options(true, false));
        assert_eq!(text_only.len(), 1);
        assert_eq!(text_only[0].source, RegionSource::Text);
        assert_eq!(text_only[0].x, 0.0);

        let plates_only = c.regions(&tokens, &options(false, true));
        assert_eq!(plates_only.len(), 1);
        assert_eq!(plates_only[0].source, RegionSource::Plate);
        assert_eq!(plates_only[0].x, 100.0);

        assert_eq!(c.regions(&tokens, &options(true, true)).len(), 2);
        assert!(c.regions(&tokens, &options(false, false)).is_empty());
    }

    #[test]
    fn test_token_in_both_categories_is_text() {
        let tokens = vec![token("5551234", 0.0)];
        let regions = classifier().regions(&tokens, &options(true, true));
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].source, RegionSource::Text);
    }

    #[test]
    fn test_plate_only_token_needs_plate_option() {
        let tokens = vec![token("5551234", 0.0)];
        let regions = classifier().regions(&tokens, &options(false, true));
        assert_eq!(regions[0].source, RegionSource::Plate);
    }
}
