//! Question intent detection.
//!
//! An ordered rule table: sentence-initial interrogatives first, then an
//! interrogative introduced by an auxiliary or request phrase, then topical
//! keywords. First match wins.

use lazy_static::lazy_static;
use regex::Regex;

use crate::types::QuestionIntent;

struct IntentRule {
    pattern: Regex,
    intent: QuestionIntent,
}

fn rule(pattern: &str, intent: QuestionIntent) -> IntentRule {
    IntentRule {
        pattern: Regex::new(pattern).unwrap(),
        intent,
    }
}

lazy_static! {
    static ref INTENT_RULES: Vec<IntentRule> = {
        use QuestionIntent::*;
        vec![
            // Sentence-initial interrogative
            rule(r"^\s*who\b", Who),
            rule(r"^\s*(what|which)\b", What),
            rule(r"^\s*when\b", When),
            rule(r"^\s*where\b", Where),
            rule(r"^\s*why\b", Why),
            rule(r"^\s*how\b", How),
            // Interrogative after an auxiliary or request phrase
            rule(r"\b(tell me|explain|describe|know|ask|wonder(ing)?|can you|could you|do you know)\b.*\bwho\b", Who),
            rule(r"\b(tell me|explain|describe|know|ask|wonder(ing)?|can you|could you|do you know)\b.*\bwhy\b", Why),
            rule(r"\b(tell me|explain|describe|know|ask|wonder(ing)?|can you|could you|do you know)\b.*\bhow\b", How),
            rule(r"\b(tell me|explain|describe|know|ask|wonder(ing)?|can you|could you|do you know)\b.*\bwhen\b", When),
            rule(r"\b(tell me|explain|describe|know|ask|wonder(ing)?|can you|could you|do you know)\b.*\bwhere\b", Where),
            rule(r"\b(tell me|explain|describe|know|ask|wonder(ing)?|can you|could you|do you know)\b.*\b(what|which)\b", What),
            rule(r"^\s*(is|was|did|does|do|were|are|can|could|should|would)\b.*\b(reason|because|motive|cause)\b", Why),
            // Topical keywords
            rule(r"\b(reason|motive|motivation|cause|purpose)\b", Why),
            rule(r"\b(place|location|city|forest|kingdom|island|river|mountain)\b", Where),
            rule(r"\b(year|years|age|time|period|duration|date)\b", When),
            rule(r"\b(method|manner|process|way)\b", How),
            rule(r"\b(meaning|definition|significance|summary|overview)\b", What),
            rule(r"\b(identity|lineage|ancestry|parent|father|mother|son|daughter|wife|husband|brother)\b", Who),
        ]
    };
}

/// Detect the coarse intent of a question.
pub fn detect_intent(question: &str) -> QuestionIntent {
    let lowered = question.to_lowercase();
    INTENT_RULES
        .iter()
        .find(|r| r.pattern.is_match(&lowered))
        .map(|r| r.intent)
        .unwrap_or(QuestionIntent::General)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentence_initial_interrogatives() {
        let cases = [
            ("Who is Jatayu?", QuestionIntent::Who),
            ("What is the Ramayana about?", QuestionIntent::What),
            ("Which weapon killed Ravana?", QuestionIntent::What),
            ("When did Rama return to Ayodhya?", QuestionIntent::When),
            ("Where was Sita held captive?", QuestionIntent::Where),
            ("Why did Rama accept exile?", QuestionIntent::Why),
            ("How did Hanuman cross the ocean?", QuestionIntent::How),
        ];
        for (question, expected) in cases {
            assert_eq!(detect_intent(question), expected, "question: {}", question);
        }
    }

    #[test]
    fn test_initial_interrogative_beats_later_words() {
        // "who" appears later, but the sentence opens with "why"
        assert_eq!(
            detect_intent("Why did Bharata refuse the throne who was offered it?"),
            QuestionIntent::Why
        );
    }

    #[test]
    fn test_auxiliary_patterns() {
        assert_eq!(
            detect_intent("Can you tell me why Kaikeyi asked for the boons?"),
            QuestionIntent::Why
        );
        assert_eq!(
            detect_intent("Please explain how the bridge to Lanka was built"),
            QuestionIntent::How
        );
        assert_eq!(
            detect_intent("I want to know who Shabari was"),
            QuestionIntent::Who
        );
    }

    #[test]
    fn test_topical_keywords() {
        assert_eq!(detect_intent("The reason for Vali's death"), QuestionIntent::Why);
        assert_eq!(detect_intent("Meaning of the word dharma"), QuestionIntent::What);
        assert_eq!(detect_intent("Rama's age at exile"), QuestionIntent::When);
    }

    #[test]
    fn test_general_fallback() {
        assert_eq!(detect_intent("Hanuman and the sanjeevani"), QuestionIntent::General);
    }
}
