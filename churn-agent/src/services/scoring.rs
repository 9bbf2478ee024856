//! Rule-based churn scoring
//!
//! Rules, first match wins:
//! 1. (rating < 5 and negative keyword) or (rating < 3 and NEGATIVE sentiment) → High
//! 2. rating >= 8 → Low
//! 3. otherwise → Moderate
//!
//! Topics are deliberately not an input here; they are stored for analytics.

use crate::models::{ChurnRisk, SentimentLabel};

/// Keywords matched as case-insensitive substrings of the feedback text
pub const NEGATIVE_KEYWORDS: [&str; 4] = ["bad", "poor", "terrible", "unhappy"];

/// True when the text contains any negative keyword
pub fn has_negative_keyword(feedback_text: &str) -> bool {
    if feedback_text.is_empty() {
        return false;
    }
    let lowered = feedback_text.to_lowercase();
    NEGATIVE_KEYWORDS.iter().any(|keyword| lowered.contains(keyword))
}

/// Score churn risk from rating, text and sentiment
pub fn score_churn(rating: u8, feedback_text: &str, sentiment: &SentimentLabel) -> ChurnRisk {
    let keyword_hit = rating < 5 && has_negative_keyword(feedback_text);
    let sentiment_hit = rating < 3 && *sentiment == SentimentLabel::Negative;

    if keyword_hit || sentiment_hit {
        ChurnRisk::High
    } else if rating >= 8 {
        ChurnRisk::Low
    } else {
        ChurnRisk::Moderate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HIGH_REASON: &str = "Low NLS score and/or negative feedback/sentiment.";
    const MODERATE_REASON: &str = "Moderate NLS score or neutral feedback/sentiment.";
    const LOW_REASON: &str = "High NLS score.";

    #[test]
    fn test_high_nls_score() {
        let risk = score_churn(9, "Excellent product, very happy!", &SentimentLabel::Positive);
        assert_eq!(risk.probability(), 0.1);
        assert_eq!(risk.reason(), LOW_REASON);
    }

    #[test]
    fn test_low_score_negative_keywords() {
        let risk = score_churn(2, "terrible unhappy service", &SentimentLabel::Neutral);
        assert_eq!(risk.probability(), 0.8);
        assert_eq!(risk.reason(), HIGH_REASON);
    }

    #[test]
    fn test_keyword_rule_isolated_from_sentiment() {
        // 4 is below the keyword cutoff but not the sentiment cutoff
        let risk = score_churn(
            4,
            "I am very unhappy with the terrible service.",
            &SentimentLabel::Neutral,
        );
        assert_eq!(risk, ChurnRisk::High);
    }

    #[test]
    fn test_moderate_cases() {
        let risk = score_churn(6, "The service was okay.", &SentimentLabel::Neutral);
        assert_eq!(risk.probability(), 0.4);
        assert_eq!(risk.reason(), MODERATE_REASON);

        assert_eq!(
            score_churn(4, "It's just okay.", &SentimentLabel::Neutral),
            ChurnRisk::Moderate
        );
    }

    #[test]
    fn test_boundary_five_with_keyword_and_negative_sentiment() {
        let risk = score_churn(5, "I am unhappy with the product.", &SentimentLabel::Negative);
        assert_eq!(risk, ChurnRisk::Moderate);
    }

    #[test]
    fn test_empty_feedback_low_score() {
        assert_eq!(score_churn(3, "", &SentimentLabel::Neutral), ChurnRisk::Moderate);
    }

    #[test]
    fn test_negative_sentiment_without_keywords() {
        assert_eq!(score_churn(2, "meh", &SentimentLabel::Negative), ChurnRisk::High);
        // 3 is not below the sentiment cutoff
        assert_eq!(score_churn(3, "meh", &SentimentLabel::Negative), ChurnRisk::Moderate);
    }

    #[test]
    fn test_keywords_case_insensitive_substrings() {
        assert!(has_negative_keyword("BAD experience"));
        assert!(has_negative_keyword("Poorly packaged"));
        assert!(has_negative_keyword("badge"));
        assert!(!has_negative_keyword("great"));
        assert!(!has_negative_keyword(""));
    }

    #[test]
    fn test_high_rating_never_overrides_high_risk_rule() {
        // Rule 1 cannot fire at rating >= 8, so rule 2 always applies there
        for rating in 8..=10 {
            assert_eq!(
                score_churn(rating, "terrible bad poor", &SentimentLabel::Negative),
                ChurnRisk::Low
            );
        }
    }

    #[test]
    fn test_rule_table_exhaustive() {
        let texts = ["", "fine", "bad", "Terrible and UNHAPPY", "poor value", "badminton"];
        let sentiments = [
            SentimentLabel::Positive,
            SentimentLabel::Negative,
            SentimentLabel::Neutral,
            SentimentLabel::Unknown,
            SentimentLabel::Other("LABEL_0".to_string()),
        ];

        for rating in 0..=10u8 {
            for text in texts {
                for sentiment in &sentiments {
                    let risk = score_churn(rating, text, sentiment);
                    assert!(ChurnRisk::ALL.contains(&risk));
                    assert!([0.1, 0.4, 0.8].contains(&risk.probability()));

                    let keyword = has_negative_keyword(text);
                    let expected = if (rating < 5 && keyword)
                        || (rating < 3 && *sentiment == SentimentLabel::Negative)
                    {
                        ChurnRisk::High
                    } else if rating >= 8 {
                        ChurnRisk::Low
                    } else {
                        ChurnRisk::Moderate
                    };
                    assert_eq!(risk, expected, "rating={rating} text={text:?} sentiment={sentiment}");
                }
            }
        }
    }
}
