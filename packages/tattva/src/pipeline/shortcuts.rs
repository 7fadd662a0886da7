//! Pre-computed answers for deterministic questions.
//!
//! Sanskrit name etymologies and structural facts about the epic have one
//! fixed answer. These are served from static tables without
//! classification, retrieval or generation.

use lazy_static::lazy_static;
use regex::Regex;

use crate::types::{Answer, ShortcutKind, TextualAnswer, TextualBasis};

/// `kanda` label on etymology answers.
pub const ETYMOLOGY_KANDA: &str = "Etymology - Structural Knowledge";

/// `kanda` label on metadata answers.
pub const METADATA_KANDA: &str = "N/A - Structural Metadata";

#[derive(Debug, Clone, PartialEq)]
pub struct EtymologyEntry {
    pub key: &'static str,
    pub term: &'static str,
    pub meaning: &'static str,
    pub breakdown: &'static str,
    pub significance: &'static str,
    pub related_terms: &'static [&'static str],
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetadataEntry {
    pub key: &'static str,
    pub answer: &'static str,
    pub source: &'static str,
    pub note: Option<&'static str>,
}

pub static ETYMOLOGIES: &[EtymologyEntry] = &[
    EtymologyEntry {
        key: "dasharatha",
        term: "Dasharatha",
        meaning: "One who has ten chariots / One who can fight in ten directions",
        breakdown: "दश (dasha = ten) + रथ (ratha = chariot)",
        significance: "Signifies his prowess as a warrior king who drove his chariot in all ten directions.",
        related_terms: &["Raghu (ancestor)", "Kosala (kingdom)"],
    },
    EtymologyEntry {
        key: "rama",
        term: "Rama",
        meaning: "One who delights / One who is pleasing",
        breakdown: "राम (rāma) from √ram (to delight, to please)",
        significance: "The name reflects his nature as one who delights all beings.",
        related_terms: &["Ramachandra", "Raghava"],
    },
    EtymologyEntry {
        key: "sita",
        term: "Sita",
        meaning: "The furrow / Born from the earth",
        breakdown: "सीता (sītā = furrow of a plough)",
        significance: "She was found in a furrow while King Janaka ploughed the field for a yajna.",
        related_terms: &["Janaki (daughter of Janaka)", "Vaidehi (from Videha)"],
    },
    EtymologyEntry {
        key: "ravana",
        term: "Ravana",
        meaning: "One who makes others cry / One whose roar is terrifying",
        breakdown: "रावण (rāvaṇa) from √ru (to roar, to cry)",
        significance: "Named for the terror his roar caused across the three worlds.",
        related_terms: &["Dashagriva (ten-headed)", "Paulastya (descendant of Pulastya)"],
    },
    EtymologyEntry {
        key: "hanuman",
        term: "Hanuman",
        meaning: "One with a (broken) jaw",
        breakdown: "हनु (hanu = jaw) + मान (mān = having)",
        significance: "Indra's thunderbolt broke his jaw when, as a child, he leapt to eat the sun.",
        related_terms: &["Maruti (son of the Wind)", "Anjaneya (son of Anjana)"],
    },
    EtymologyEntry {
        key: "ramayana",
        term: "Ramayana",
        meaning: "The journey of Rama",
        breakdown: "राम (Rama) + अयन (ayana = journey, path, going)",
        significance: "The epic follows Rama from prince to exile to victorious king.",
        related_terms: &["Adi Kavya (first poem)", "Chaturvimshati Sahasri (24,000 verses)"],
    },
    EtymologyEntry {
        key: "ikshvaku",
        term: "Ikshvaku",
        meaning: "Descendant of sugarcane / Sweet like sugarcane",
        breakdown: "इक्षु (ikṣu = sugarcane) + वाकु (vāku = origin)",
        significance: "Ikshvaku founded the Solar Dynasty (Suryavansha) to which Rama belongs.",
        related_terms: &["Suryavansha (Solar Dynasty)", "Raghuvansha (Raghu's lineage)"],
    },
    EtymologyEntry {
        key: "lakshmana",
        term: "Lakshmana",
        meaning: "One with auspicious marks / The fortunate one",
        breakdown: "लक्ष्मण (lakṣmaṇa) from लक्ष्म (lakṣma = mark, sign)",
        significance: "Named for the auspicious marks on his body at birth.",
        related_terms: &["Sumitranandana (son of Sumitra)", "Ramanuja (younger brother of Rama)"],
    },
    EtymologyEntry {
        key: "bharata",
        term: "Bharata",
        meaning: "One who supports / The sustainer",
        breakdown: "भरत (bharata) from √bhṛ (to bear, to support)",
        significance: "Named for his role as the one who would sustain the kingdom.",
        related_terms: &["Kaikeyinandana (son of Kaikeyi)"],
    },
    EtymologyEntry {
        key: "sugriva",
        term: "Sugriva",
        meaning: "One with a beautiful neck",
        breakdown: "सु (su = good, beautiful) + ग्रीवा (grīvā = neck)",
        significance: "Named for his distinctive, handsome neck.",
        related_terms: &["Kishkindha (his kingdom)", "Vali (brother)"],
    },
    EtymologyEntry {
        key: "vali",
        term: "Vali",
        meaning: "Strength / The powerful one",
        breakdown: "वाली (vālī), related to बल (bala = strength)",
        significance: "Named for his immense strength, above all the boon that gave him half of any opponent's power.",
        related_terms: &["Kishkindha", "Indra's son"],
    },
];

const STRUCTURAL_SOURCE: &str = "This is structural metadata about the epic's organization, not a claim requiring verse citations.";
const SYSTEM_SOURCE: &str = "This describes how Tattva itself is configured.";

pub static METADATA: &[MetadataEntry] = &[
    MetadataEntry {
        key: "first_kanda",
        answer: "The first Kanda of the Valmiki Ramayana is the Bala-Kanda (Book of Youth). It covers Rama's birth, early life and training under Sage Vishwamitra.",
        source: STRUCTURAL_SOURCE,
        note: Some("The seven Kandas in order are Bala-Kanda, Ayodhya-Kanda, Aranya-Kanda, Kishkindha-Kanda, Sundara-Kanda, Yuddha-Kanda and Uttara-Kanda."),
    },
    MetadataEntry {
        key: "last_kanda",
        answer: "The last Kanda of the Valmiki Ramayana is the Uttara-Kanda (The Latter Book). It describes events after Rama's coronation, including the origins of the rakshasas and Sita's exile.",
        source: STRUCTURAL_SOURCE,
        note: Some("Some scholars consider the Uttara-Kanda a later addition."),
    },
    MetadataEntry {
        key: "kanda_count",
        answer: "The Valmiki Ramayana has seven Kandas (books).",
        source: STRUCTURAL_SOURCE,
        note: Some("They are Bala, Ayodhya, Aranya, Kishkindha, Sundara, Yuddha and Uttara."),
    },
    MetadataEntry {
        key: "shloka_count",
        answer: "The Valmiki Ramayana contains about 24,000 shlokas (verses), which is why it is also called 'Chaturvimshati Sahasri', the poem of 24,000 verses.",
        source: "This is traditional metadata about the epic's composition.",
        note: Some("The exact count varies between recensions such as the Critical Edition and the Vulgate."),
    },
    MetadataEntry {
        key: "sarga_count",
        answer: "The Valmiki Ramayana contains about 500 sargas (chapters) across its seven Kandas.",
        source: STRUCTURAL_SOURCE,
        note: Some("Counts differ between versions: Bala (77), Ayodhya (119), Aranya (75), Kishkindha (67), Sundara (68), Yuddha (128), Uttara (111), about 645 in some recensions."),
    },
    MetadataEntry {
        key: "edition",
        answer: "Tattva uses the Critical Edition of the Valmiki Ramayana prepared by the Oriental Institute, Baroda, a scholarly reconstruction of the oldest recoverable text with later interpolations removed.",
        source: "This is metadata about the source text Tattva draws on.",
        note: Some("The Vulgate ('received text') includes many verses that modern scholars consider interpolations."),
    },
    MetadataEntry {
        key: "refusal_reasoning",
        answer: "Tattva answers questions grounded in the shlokas of the Valmiki Ramayana. Questions outside that scope (speculation beyond the text, claims the text does not make, comparisons with other texts) receive a refusal that explains the boundary and suggests in-scope questions.",
        source: SYSTEM_SOURCE,
        note: Some("Refusals cover anything outside the Valmiki text, anything that needs speculation beyond the textual evidence, and anything the corpus cannot reliably support."),
    },
    MetadataEntry {
        key: "source",
        answer: "Tattva draws on the Valmiki Ramayana, citing individual shlokas as [Kanda Sarga.Shloka]. The corpus covers all seven Kandas: Bala, Ayodhya, Aranya, Kishkindha, Sundara, Yuddha and Uttara.",
        source: SYSTEM_SOURCE,
        note: Some("Every generated answer is grounded in shlokas retrieved from this corpus."),
    },
];

lazy_static! {
    static ref ETYMOLOGY_PATTERNS: Vec<Regex> = [
        r#"(?i)what does ['"]?(\w+)['"]? mean"#,
        r#"(?i)meaning of ['"]?(\w+)['"]?"#,
        r#"(?i)etymology of ['"]?(\w+)['"]?"#,
        r#"(?i)what is the meaning of ['"]?(\w+)['"]?"#,
        r"(?i)why is (\w+) called",
        r#"(?i)where does the name ['"]?(\w+)['"]? come from"#,
        r#"(?i)['"]?(\w+)['"]? name meaning"#,
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect();

    static ref METADATA_DETECTORS: Vec<Regex> = [
        r"what is the (first|last|second|third|fourth|fifth|sixth|seventh) kanda",
        r"name of the first kanda",
        r"how many (kandas|sargas|shlokas|verses|chapters|books)",
        r"total (kandas|sargas|shlokas|verses)",
        r"critical edition|vulgate",
        r"what (edition|version|recension)",
        r"how long is the ramayana",
        r"structure of (the )?(valmiki )?ramayana",
        r"which source.*used|what source.*use",
        r"how.*determine.*scope",
        r"why.*refuse",
        r"meta.*refusal|refusal.*reason",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect();

    /// Lookup order matters: refusal reasoning before the generic source entry.
    static ref METADATA_LOOKUP: Vec<(Regex, &'static str)> = [
        (r"first kanda|name of the first", "first_kanda"),
        (r"last kanda", "last_kanda"),
        (r"how many kandas|total kandas|number of kandas", "kanda_count"),
        (r"how many (shlokas|verses)|total (shlokas|verses)", "shloka_count"),
        (r"how many (sargas|chapters)|total (sargas|chapters)", "sarga_count"),
        (r"critical edition|vulgate|what edition|what version", "edition"),
        (r"which source.*used|what source.*refusal|meta.*refusal", "refusal_reasoning"),
        (r"which source|what source", "source"),
    ]
    .iter()
    .map(|(p, key)| (Regex::new(p).unwrap(), *key))
    .collect();
}

/// A matched shortcut.
#[derive(Debug, Clone, PartialEq)]
pub enum Shortcut {
    Etymology(&'static EtymologyEntry),
    Metadata(&'static MetadataEntry),
}

impl Shortcut {
    pub fn kind(&self) -> ShortcutKind {
        match self {
            Self::Etymology(_) => ShortcutKind::Etymology,
            Self::Metadata(_) => ShortcutKind::Metadata,
        }
    }

    /// The synthesized T1 answer. Carries no citations.
    pub fn answer(&self) -> Answer {
        match self {
            Self::Etymology(e) => etymology_answer(e),
            Self::Metadata(m) => metadata_answer(m),
        }
    }
}

pub fn is_etymology_question(question: &str) -> bool {
    ETYMOLOGY_PATTERNS.iter().any(|p| p.is_match(question))
}

/// The term asked about, lowercased.
pub fn extract_etymology_term(question: &str) -> Option<String> {
    ETYMOLOGY_PATTERNS
        .iter()
        .find_map(|p| p.captures(question))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_lowercase())
}

pub fn etymology_entry(term: &str) -> Option<&'static EtymologyEntry> {
    let key = term.trim().to_lowercase();
    ETYMOLOGIES.iter().find(|e| e.key == key)
}

pub fn is_metadata_question(question: &str) -> bool {
    let normalized = question.trim().to_lowercase();
    METADATA_DETECTORS.iter().any(|p| p.is_match(&normalized))
}

pub fn metadata_entry(question: &str) -> Option<&'static MetadataEntry> {
    let normalized = question.trim().to_lowercase();
    let key = METADATA_LOOKUP
        .iter()
        .find(|(p, _)| p.is_match(&normalized))
        .map(|(_, key)| *key)?;
    METADATA.iter().find(|m| m.key == key)
}

/// Etymology first, then metadata. A detector hit whose lookup misses is
/// not a shortcut.
pub fn find_shortcut(question: &str) -> Option<Shortcut> {
    if is_etymology_question(question) {
        if let Some(entry) = extract_etymology_term(question).and_then(|t| etymology_entry(&t)) {
            return Some(Shortcut::Etymology(entry));
        }
    }
    if is_metadata_question(question) {
        if let Some(entry) = metadata_entry(question) {
            return Some(Shortcut::Metadata(entry));
        }
    }
    None
}

fn uncited(kanda: &str) -> TextualBasis {
    TextualBasis {
        kanda: kanda.to_string(),
        sarga: Vec::new(),
        shloka: Vec::new(),
        citations: Vec::new(),
    }
}

pub fn etymology_answer(entry: &EtymologyEntry) -> Answer {
    let related = if entry.related_terms.is_empty() {
        String::new()
    } else {
        format!(" Related terms include: {}.", entry.related_terms.join(", "))
    };
    Answer::T1(TextualAnswer {
        answer: format!(
            "The name \"{}\" means \"{}\". In Sanskrit, it breaks down as: {}. {}{}",
            entry.term, entry.meaning, entry.breakdown, entry.significance, related
        ),
        textual_basis: uncited(ETYMOLOGY_KANDA),
        explanation: format!(
            "This is a Sanskrit etymology derived from traditional sources. {} The name carries deep significance in the epic.",
            entry.significance
        ),
    })
}

pub fn metadata_answer(entry: &MetadataEntry) -> Answer {
    let explanation = match entry.note {
        Some(note) => format!("{} {}", entry.source, note),
        None => entry.source.to_string(),
    };
    Answer::T1(TextualAnswer {
        answer: entry.answer.to_string(),
        textual_basis: uncited(METADATA_KANDA),
        explanation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_etymology_shortcut() {
        let shortcut = find_shortcut("What does Dasharatha mean?").unwrap();
        assert_eq!(shortcut.kind(), ShortcutKind::Etymology);

        match shortcut.answer() {
            Answer::T1(a) => {
                assert_eq!(a.textual_basis.kanda, ETYMOLOGY_KANDA);
                assert!(a.textual_basis.citations.is_empty());
                assert!(a.answer.starts_with("The name \"Dasharatha\" means"));
                assert!(a.answer.contains("Related terms include: Raghu (ancestor), Kosala (kingdom)."));
            }
            other => panic!("unexpected answer: {:?}", other),
        }
    }

    #[test]
    fn test_etymology_phrasings() {
        for q in [
            "meaning of Hanuman",
            "Why is Ravana called that?",
            "Where does the name 'Sita' come from?",
            "Etymology of Ikshvaku",
            "Sugriva name meaning",
        ] {
            assert!(
                matches!(find_shortcut(q), Some(Shortcut::Etymology(_))),
                "no etymology shortcut for {q}"
            );
        }
    }

    #[test]
    fn test_unknown_term_falls_through() {
        assert!(is_etymology_question("What does dharma mean?"));
        assert!(find_shortcut("What does dharma mean?").is_none());
        assert!(find_shortcut("What does this verse mean?").is_none());
    }

    #[test]
    fn test_metadata_shortcuts() {
        let cases = [
            ("How many kandas are in the Ramayana?", "kanda_count"),
            ("What is the first kanda?", "first_kanda"),
            ("What is the last kanda called?", "last_kanda"),
            ("How many shlokas does the Ramayana have?", "shloka_count"),
            ("Total sargas in the epic?", "sarga_count"),
            ("Do you use the critical edition or the vulgate?", "edition"),
            ("Which source is used?", "refusal_reasoning"),
        ];
        for (q, key) in cases {
            match find_shortcut(q) {
                Some(Shortcut::Metadata(m)) => assert_eq!(m.key, key, "{q}"),
                other => panic!("{q}: {:?}", other),
            }
        }
    }

    #[test]
    fn test_metadata_answer_shape() {
        let entry = metadata_entry("how many kandas").unwrap();
        match metadata_answer(entry) {
            Answer::T1(a) => {
                assert_eq!(a.textual_basis.kanda, METADATA_KANDA);
                assert!(a.textual_basis.citations.is_empty());
                assert!(a.explanation.starts_with(STRUCTURAL_SOURCE));
                assert!(a.explanation.ends_with("Sundara, Yuddha and Uttara."));
            }
            other => panic!("unexpected answer: {:?}", other),
        }
    }

    #[test]
    fn test_detector_without_lookup_falls_through() {
        assert!(is_metadata_question("How long is the Ramayana?"));
        assert!(find_shortcut("How long is the Ramayana?").is_none());
    }

    #[test]
    fn test_ordinary_questions_are_not_shortcuts() {
        assert!(find_shortcut("Why did Rama accept exile?").is_none());
        assert!(find_shortcut("Who is Jatayu?").is_none());
    }
}
