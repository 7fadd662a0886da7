//! LLM prompts for the answering pipeline.
//!
//! Each answer template has its own instruction set. They are not one
//! skeleton with a mode flag: T1 forbids hedging, T2 requires it, T3
//! forbids apology.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

use crate::registry;
use crate::traits::{Prompt, StructuredPrompt};
use crate::types::{
    CategoryGroup, InterpretiveAnswer, RefusalAnswer, RetrievedPassage, TemplateType,
    TextualAnswer,
};

/// Fewer passages than this triggers the low-evidence clause.
pub const MIN_EVIDENCE_PASSAGES: usize = 3;

/// Source text is cut to this many characters in the evidence block.
const SOURCE_TEXT_PREVIEW: usize = 200;

/// Prompt for T1 (textual) answers.
pub const T1_PROMPT: &str = r#"You are Tattva, a scholarly interpreter of Valmiki's Ramayana. Give a TEXTUAL answer grounded only in the passages below.

RULES FOR TEXTUAL ANSWERS:
1. State only what the text explicitly says. Do not infer or speculate.
2. FORBIDDEN WORDS: might, could, possibly, perhaps, probably, likely, seems, appears, suggests, implies
3. Use only the passages provided below.
4. Every claim must trace back to a cited passage.
5. If the text does not say something, write "The text does not state this".
6. Scholarly but clear. No academic padding.
7. SCOPE: Bala Kanda sargas 1-4 summarize the ENTIRE epic (the Sankshepa Ramayana). Do not mistake those forward references (exile, war, Lanka) for events that happen within the Bala Kanda itself (birth, education, marriage).
{low_evidence}
QUESTION CATEGORY: {category}
USER QUESTION: {question}

RETRIEVED PASSAGES:
{evidence}

Respond with JSON in this shape:

{
  "answer": "{answer_instruction}",
  "textualBasis": {
    "kanda": "Primary kanda name",
    "sarga": [sarga numbers],
    "shloka": [shloka numbers, if specific],
    "citations": ["Kanda Sarga.Shloka", "Kanda Sarga.Shloka"]
  },
  "explanation": "How the cited passages support the answer, quoting specific phrases. 3-5 sentences."
}

CHECKLIST:
- No speculative language
- Every citation comes from the passages above
- The answer is directly supported by the explanations
- No modern interpretation or comparison
- Specific names, places and numbers from the text are included

RESPOND WITH ONLY THE JSON."#;

/// Prompt for T2 (interpretive) answers.
pub const T2_PROMPT: &str = r#"You are Tattva, a scholarly interpreter of Valmiki's Ramayana. This question is INTERPRETIVE: keep what the text EXPLICITLY states apart from what is inferred or interpreted.

RULES FOR INTERPRETIVE ANSWERS:
1. Separate textual facts from interpretation.
2. Label every inference as one ("Commentators read this as...").
3. Draw on the scholarly commentary where it is provided.
4. MANDATORY: a limit-of-certainty section saying what cannot be known from the text.
5. Be open about ambiguity in the text.
6. Never present an interpretation as fact.
{low_evidence}
QUESTION CATEGORY: {category}
USER QUESTION: {question}

RETRIEVED PASSAGES (with scholarly commentary):
{evidence}

Respond with JSON in this shape:

{
  "answer": "Brief answer acknowledging both the textual evidence and its interpretation (2-3 sentences)",
  "whatTextStates": "What Valmiki's text EXPLICITLY says, with no inference. 3-4 sentences quoting specific phrases.",
  "traditionalInterpretations": "How commentators and scholars have read this, labelled as interpretation. 3-5 sentences.",
  "limitOfCertainty": "MANDATORY. What the text does NOT say, what remains ambiguous, and what cannot be concluded. 2-3 sentences."
}

CHECKLIST:
- whatTextStates holds only explicit textual facts
- traditionalInterpretations labels interpretations as such
- limitOfCertainty is present and specific to this question
- Scholarly commentary is used where available

RESPOND WITH ONLY THE JSON."#;

/// Prompt for T3 (refusal) answers.
pub const T3_PROMPT: &str = r#"You are Tattva, a scholarly interpreter of Valmiki's Ramayana. The question below falls outside what the text can answer. Decline it plainly and redirect the reader to questions the text does answer.

RULES FOR OUT-OF-SCOPE ANSWERS:
1. Do NOT apologize. Never use "sorry", "apologize", "unfortunately", "regret", "I'm afraid" or "cannot help".
2. State the scope boundary as a fact about Tattva, not as a failure.
3. Explain in one or two sentences why the question is outside that boundary.
4. Offer at least two specific alternative questions the text can answer, each a complete question.

OUT-OF-SCOPE TRIGGERS:
- Judging characters by modern moral standards
- Comparison with other religious texts or traditions
- Political commentary or present-day applications
- Personal advice or self-help
- Hypotheticals the text never raises
- Other Ramayanas (Kamban, Tulsidas and others)

REDIRECT TIPS:
- Turn a judgment into "What does the text say about..."
- Turn a comparison into a question about Valmiki's own account
- Turn a hypothetical into a question about what actually happens

EXAMPLE 1
Question: "Was Rama right to send Sita away by today's standards?"
{
  "outOfScopeNotice": "Tattva reports what Valmiki's text states; it does not judge characters by modern standards.",
  "why": "A modern moral verdict is outside the text. The Ramayana records the events and the reasons its characters give.",
  "alternatives": ["What reasons does the text give for Sita's exile?", "How do traditional commentators read Rama's decision?"]
}

EXAMPLE 2
Question: "How does the Ramayana compare to the Bible?"
{
  "outOfScopeNotice": "Tattva covers the Valmiki Ramayana alone and does not compare it with other scriptures.",
  "why": "Cross-text comparison requires sources outside this corpus.",
  "alternatives": ["What does the Ramayana teach about dharma?", "What is the Ramayana about?"]
}

QUESTION CATEGORY: {category}
USER QUESTION: {question}

Respond with JSON in this shape:

{
  "outOfScopeNotice": "One sentence stating the scope boundary",
  "why": "Why this question is outside it (1-2 sentences)",
  "alternatives": ["Specific in-scope question", "Specific in-scope question"]
}

RESPOND WITH ONLY THE JSON."#;

const LOW_EVIDENCE_CLAUSE: &str = "\nLOW EVIDENCE WARNING: Only {count} passage(s) were retrieved. If they do not support a complete answer, say so explicitly. Do not fill gaps with confident claims.\n";

const NARRATIVE_INSTRUCTION: &str = "A coherent narrative summary (6-8 sentences) telling the story in chronological order. Do not just list events.";
const DIRECT_INSTRUCTION: &str = "A direct answer (4-6 sentences) with the key names, numbers and places from the citations.";

/// Prompt for classifying a question into a category.
pub const CLASSIFICATION_PROMPT: &str = r#"You classify questions for Tattva, an interpreter of Valmiki's Ramayana.

Assign each question to exactly ONE of the 45 categories below.

RULES:
1. Return a category id between 1 and 45.
2. Choose the most specific category that fits.
3. Anything out of scope is category 45.
4. The category decides the answer template (T1 textual, T2 interpretive, T3 refusal).
5. When unsure, prefer the more restrictive category.

CATEGORIES:
{categories}

ALWAYS CATEGORY 45:
- Modern moral judgment ("Was Rama right by today's standards?")
- Comparison with other religions or texts ("How is this different from the Bible?")
- Political commentary
- Personal advice or self-help
- Hypotheticals not in the text
- Other Ramayanas (Kamban, Tulsidas and others)

EXAMPLES:
"Why did Rama accept exile?" -> 21 (Duty-driven decisions), confidence 0.90
"How did Rama change during his exile?" -> 25 (Character evolution), confidence 0.85
"What does dharma mean in the Ramayana?" -> 26 (Definition of dharma), confidence 0.95
"Why was Sita abducted?" -> 8 (Cause–effect relationships), confidence 0.85

Respond with JSON:
{
  "categoryId": <1-45>,
  "categoryName": "<name from the list>",
  "template": "<T1|T2|T3>",
  "confidence": <0.0-1.0>,
  "reasoning": "<one sentence>",
  "shouldAnswer": <false only for category 45>
}"#;

/// Prompt for rewriting a question to match the corpus vocabulary.
pub const EXPAND_QUERY_PROMPT: &str = r#"You are a Valmiki Ramayana retrieval expert. Rewrite the user's search query so it reads like the source text, which holds English translations and explanations.

Rules:
1. If the query names a specific passage or hymn (e.g. "Ma Nishada", "Aditya Hridayam"), say what it is and where it appears.
2. Define proper nouns (characters, places, weapons) by their relationships (e.g. "Dadhimukha: Sugriva's uncle, keeper of Madhuvana").
3. If the query is a Sanskrit phrase, give its English meaning and significance.
4. Stay under 40 words.

Example:
Input: "Ma Nishada"
Output: "Ma Nishada is the first shloka, uttered by Sage Valmiki cursing a hunter (nishada) for killing a krauncha bird. Bala Kanda."

Output only the rewritten query."#;

lazy_static! {
    static ref NARRATIVE_REQUEST: Regex =
        Regex::new(r"(?i)summary|story|narrative|describe|tell me").unwrap();
}

/// Serialize passages into the evidence block. Commentary is only
/// included for interpretive prompts.
pub fn format_evidence(passages: &[RetrievedPassage], include_commentary: bool) -> String {
    passages
        .iter()
        .map(|p| {
            let m = &p.metadata;
            let mut entry = format!("\n[{}]", m.citation());
            if let Some(translation) = &m.translation {
                entry.push_str("\nSanskrit: ");
                entry.push_str(preview(&m.text, SOURCE_TEXT_PREVIEW));
                entry.push_str("\nTranslation: ");
                entry.push_str(translation);
            }
            entry.push_str("\nExplanation: ");
            entry.push_str(&m.explanation);
            if include_commentary {
                if let Some(comments) = &m.comments {
                    entry.push_str("\nScholarly Commentary: ");
                    entry.push_str(comments);
                }
            }
            entry
        })
        .collect::<Vec<_>>()
        .join("\n---\n")
}

fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn low_evidence(passages: &[RetrievedPassage]) -> String {
    if passages.len() < MIN_EVIDENCE_PASSAGES {
        LOW_EVIDENCE_CLAUSE.replace("{count}", &passages.len().to_string())
    } else {
        String::new()
    }
}

/// Whether a question asks for a story rather than a fact.
pub fn is_narrative_request(question: &str) -> bool {
    NARRATIVE_REQUEST.is_match(question)
}

pub fn format_t1_prompt(question: &str, category: &str, passages: &[RetrievedPassage]) -> String {
    let instruction = if is_narrative_request(question) {
        NARRATIVE_INSTRUCTION
    } else {
        DIRECT_INSTRUCTION
    };
    T1_PROMPT
        .replace("{low_evidence}", &low_evidence(passages))
        .replace("{category}", category)
        .replace("{question}", question)
        .replace("{answer_instruction}", instruction)
        .replace("{evidence}", &format_evidence(passages, false))
}

pub fn format_t2_prompt(question: &str, category: &str, passages: &[RetrievedPassage]) -> String {
    T2_PROMPT
        .replace("{low_evidence}", &low_evidence(passages))
        .replace("{category}", category)
        .replace("{question}", question)
        .replace("{evidence}", &format_evidence(passages, true))
}

pub fn format_t3_prompt(question: &str, category: &str) -> String {
    T3_PROMPT
        .replace("{category}", category)
        .replace("{question}", question)
}

/// Build the prompt text for a template.
pub fn build_prompt(
    template: TemplateType,
    question: &str,
    category: &str,
    passages: &[RetrievedPassage],
) -> String {
    match template {
        TemplateType::T1 => format_t1_prompt(question, category, passages),
        TemplateType::T2 => format_t2_prompt(question, category, passages),
        TemplateType::T3 => format_t3_prompt(question, category),
    }
}

/// Structured prompt for generating an answer, with the template's schema.
pub fn answer_prompt(
    template: TemplateType,
    question: &str,
    category: &str,
    passages: &[RetrievedPassage],
) -> StructuredPrompt {
    let prompt = Prompt::new(build_prompt(template, question, category, passages));
    StructuredPrompt::new(prompt, answer_schema_name(template), answer_schema(template))
}

pub fn answer_schema_name(template: TemplateType) -> &'static str {
    match template {
        TemplateType::T1 => "textual_answer",
        TemplateType::T2 => "interpretive_answer",
        TemplateType::T3 => "refusal_answer",
    }
}

/// JSON schema for a template's answer object (without the tag).
pub fn answer_schema(template: TemplateType) -> serde_json::Value {
    let schema = match template {
        TemplateType::T1 => schemars::schema_for!(TextualAnswer),
        TemplateType::T2 => schemars::schema_for!(InterpretiveAnswer),
        TemplateType::T3 => schemars::schema_for!(RefusalAnswer),
    };
    serde_json::to_value(schema).unwrap_or_default()
}

/// Classification system prompt with the full category list.
pub fn format_classification_prompt() -> String {
    let groups = [
        (CategoryGroup::Story, "STORY & EPISODE UNDERSTANDING"),
        (CategoryGroup::Character, "CHARACTER UNDERSTANDING"),
        (CategoryGroup::Dharma, "DHARMA & ETHICS"),
        (CategoryGroup::Verse, "VERSE MEANING & LANGUAGE"),
        (CategoryGroup::Interpretation, "INTERPRETATION"),
        (CategoryGroup::Meta, "META / TRUST"),
    ];

    let mut listing = String::new();
    for (group, heading) in groups {
        listing.push_str(heading);
        listing.push_str(":\n");
        for c in registry::categories_in_group(group) {
            listing.push_str(&format!("{}. {} - {}", c.id, c.name, c.description));
            match c.template {
                TemplateType::T1 => {}
                TemplateType::T2 => listing.push_str(" (INTERPRETIVE - T2)"),
                TemplateType::T3 => listing.push_str(" (REFUSAL - T3)"),
            }
            listing.push('\n');
        }
        listing.push('\n');
    }

    CLASSIFICATION_PROMPT.replace("{categories}", listing.trim_end())
}

pub fn format_classification_user_message(question: &str) -> String {
    format!("Classify this question: \"{}\"", question)
}

pub fn expansion_prompt(question: &str) -> Prompt {
    Prompt::new(question)
        .with_system(EXPAND_QUERY_PROMPT)
        .with_temperature(0.1)
        .with_max_tokens(100)
}

/// One-line description of the evidence, for logs and stream context.
pub fn evidence_summary(template: TemplateType, passages: &[RetrievedPassage]) -> String {
    if passages.is_empty() {
        return "No context available".to_string();
    }
    match template {
        TemplateType::T2 => {
            let with_comments = passages.iter().filter(|p| p.metadata.has_comments).count();
            format!(
                "Retrieved {} passages ({} with scholarly commentary)",
                passages.len(),
                with_comments
            )
        }
        _ => {
            let kandas: BTreeSet<&str> = passages.iter().map(|p| p.metadata.kanda.as_str()).collect();
            let sargas: BTreeSet<u32> = passages.iter().map(|p| p.metadata.sarga).collect();
            format!(
                "Retrieved {} passages from {} (Sargas: {})",
                passages.len(),
                kandas.into_iter().collect::<Vec<_>>().join(", "),
                sargas
                    .into_iter()
                    .map(|s| s.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::passage;

    fn three() -> Vec<RetrievedPassage> {
        vec![
            passage("Sundara Kanda", 1, 1, "Hanuman resolved to leap."),
            passage("Sundara Kanda", 1, 2, "He rose into the sky."),
            passage("Sundara Kanda", 2, 5, "He reached Lanka."),
        ]
    }

    #[test]
    fn test_evidence_entry_format() {
        let block = format_evidence(&three()[..1], false);
        assert_eq!(
            block,
            "\n[Sundara Kanda 1.1]\nSanskrit: shloka 1.1\nTranslation: Hanuman resolved to leap.\nExplanation: Explanation of 1.1"
        );
    }

    #[test]
    fn test_commentary_only_in_interpretive_prompt() {
        let t1 = format_t1_prompt("Who leapt to Lanka?", "Character actions", &three());
        let t2 = format_t2_prompt("Why did Hanuman leap?", "Duty vs emotion", &three());
        assert!(!t1.contains("Scholarly Commentary"));
        assert!(t2.contains("Scholarly Commentary: Commentary on 1.1"));
        assert_eq!(t2.matches("\n---\n").count(), 2);
    }

    #[test]
    fn test_source_text_requires_translation() {
        let mut p = passage("Bala Kanda", 1, 1, "x");
        p.metadata.translation = None;
        let block = format_evidence(&[p], false);
        assert!(!block.contains("Sanskrit:"));
        assert!(block.contains("Explanation:"));
    }

    #[test]
    fn test_source_text_truncated_on_char_boundary() {
        let mut p = passage("Bala Kanda", 1, 1, "x");
        p.metadata.text = "राम".repeat(100);
        let block = format_evidence(&[p], false);
        let line = block.lines().find(|l| l.starts_with("Sanskrit: ")).unwrap();
        assert_eq!(line.trim_start_matches("Sanskrit: ").chars().count(), 200);
    }

    #[test]
    fn test_low_evidence_clause() {
        let few = format_t1_prompt("Who is Jatayu?", "Character identity", &three()[..2]);
        let enough = format_t1_prompt("Who is Jatayu?", "Character identity", &three());
        assert!(few.contains("Only 2 passage(s) were retrieved"));
        assert!(!enough.contains("LOW EVIDENCE"));
    }

    #[test]
    fn test_narrative_instruction() {
        let story = format_t1_prompt("Tell me the story of the leap", "Minor episodes", &three());
        let fact = format_t1_prompt("How many yojanas wide is the ocean?", "Minor episodes", &three());
        assert!(story.contains("6-8 sentences"));
        assert!(fact.contains("4-6 sentences"));
    }

    #[test]
    fn test_templates_are_structurally_distinct() {
        let t1 = build_prompt(TemplateType::T1, "q", "c", &three());
        let t2 = build_prompt(TemplateType::T2, "q", "c", &three());
        let t3 = build_prompt(TemplateType::T3, "q", "c", &three());
        assert!(t1.contains("FORBIDDEN WORDS"));
        assert!(t2.contains("limitOfCertainty"));
        assert!(t3.contains("Do NOT apologize"));
        // Refusals never see evidence
        assert!(!t3.contains("Sundara Kanda 1.1"));
        for prompt in [&t1, &t2, &t3] {
            assert!(!prompt.contains("{question}"));
            assert!(!prompt.contains("{evidence}"));
            assert!(!prompt.contains("{low_evidence}"));
        }
    }

    #[test]
    fn test_answer_schema_per_template() {
        let t2 = answer_schema(TemplateType::T2);
        let required = t2["required"].as_array().unwrap();
        assert!(required.iter().any(|f| f == "limitOfCertainty"));
        assert_eq!(answer_prompt(TemplateType::T3, "q", "c", &[]).schema_name, "refusal_answer");
    }

    #[test]
    fn test_classification_prompt_lists_every_category() {
        let prompt = format_classification_prompt();
        for c in registry::categories() {
            assert!(prompt.contains(&format!("{}. {}", c.id, c.name)), "missing {}", c.id);
        }
        assert!(prompt.contains("45. Why a question is refused"));
        assert!(!prompt.contains("{categories}"));
    }

    #[test]
    fn test_evidence_summaries() {
        let passages = three();
        assert_eq!(
            evidence_summary(TemplateType::T1, &passages),
            "Retrieved 3 passages from Sundara Kanda (Sargas: 1, 2)"
        );
        assert_eq!(
            evidence_summary(TemplateType::T2, &passages),
            "Retrieved 3 passages (3 with scholarly commentary)"
        );
        assert_eq!(evidence_summary(TemplateType::T1, &[]), "No context available");
    }
}
