//! The 45 categories. Template assignments are fixed here and nowhere else.

use crate::types::{Category, CategoryGroup, CategoryId, TemplateType};

use CategoryGroup::*;
use TemplateType::*;

const fn cat(
    id: u8,
    name: &'static str,
    template: TemplateType,
    description: &'static str,
    group: CategoryGroup,
) -> Category {
    Category {
        id: CategoryId::from_static(id),
        name,
        template,
        description,
        group,
    }
}

pub(crate) static CATEGORIES: [Category; 45] = [
    // Story & episode understanding
    cat(1, "Epic overview", T1, "High-level summary of the entire Ramayana", Story),
    cat(2, "Kanda overview", T1, "Summary of a specific Kanda (book)", Story),
    cat(3, "Sarga overview", T1, "Summary of a specific Sarga (chapter)", Story),
    cat(4, "Story chronology", T1, "Timeline and sequence of events", Story),
    cat(5, "Timeline sequencing", T1, "Order of events in narrative", Story),
    cat(6, "Major plot events", T1, "Key turning points in the narrative", Story),
    cat(7, "Minor episodes", T1, "Smaller narrative events", Story),
    cat(8, "Cause–effect relationships", T1, "How events lead to consequences", Story),
    cat(9, "Narrative turning points", T1, "Critical moments that change the story direction", Story),
    cat(10, "Exile episodes", T1, "Events during Rama's 14-year exile", Story),
    cat(11, "Abduction episode", T1, "Sita's abduction by Ravana", Story),
    cat(12, "Search journey episodes", T1, "Events during the search for Sita", Story),
    cat(13, "War & battle episodes", T1, "Events during the war with Ravana", Story),
    cat(14, "Return & coronation", T1, "Rama's return to Ayodhya and coronation", Story),
    cat(15, "Post-war events", T1, "Events after Ravana's defeat", Story),
    // Character understanding
    cat(16, "Character identity", T1, "Who a character is", Character),
    cat(17, "Character lineage", T1, "Family and ancestry of characters", Character),
    cat(18, "Character role in story", T1, "Character's function in the narrative", Character),
    cat(19, "Character actions", T1, "What characters do in the story", Character),
    cat(20, "Character relationships", T1, "Connections between characters", Character),
    cat(21, "Duty-driven decisions", T1, "Choices made based on dharma", Character),
    cat(22, "Loyalty-driven decisions", T1, "Choices made based on loyalty", Character),
    cat(23, "Sacrificial choices", T1, "Self-sacrificing decisions", Character),
    cat(24, "Consequences of actions", T1, "Results of character decisions", Character),
    cat(25, "Character evolution", T2, "How characters change over time (requires inference)", Character),
    // Dharma & ethics
    cat(26, "Definition of dharma", T1, "What dharma means in the text", Dharma),
    cat(27, "Personal dharma", T1, "Individual duties and responsibilities", Dharma),
    cat(28, "Familial dharma", T1, "Family duties and obligations", Dharma),
    cat(29, "Royal dharma", T1, "Duties of kings and rulers", Dharma),
    cat(30, "Duty vs desire", T2, "Conflicts between dharma and personal wishes", Dharma),
    cat(31, "Duty vs emotion", T2, "Conflicts between dharma and feelings", Dharma),
    cat(32, "Consequences of adharma", T1, "Results of violating dharma", Dharma),
    cat(33, "Moral dilemmas in text", T2, "Ethical conflicts in the narrative", Dharma),
    // Verse meaning & language
    cat(34, "Meaning of a specific shloka", T1, "What a particular verse means", Verse),
    cat(35, "Translation clarification", T1, "Explaining Sanskrit-to-English translation", Verse),
    cat(36, "Explanation of a verse", T1, "Detailed meaning of a verse", Verse),
    cat(37, "Context of a verse", T1, "Where and why a verse appears", Verse),
    cat(38, "Meaning of key Sanskrit terms", T1, "Definition of Sanskrit words in context", Verse),
    cat(39, "Narrative explanation of verses", T1, "Story-based explanation of verses", Verse),
    cat(40, "Clarifying popular confusions", T1, "Correcting common misconceptions about the text", Verse),
    // Interpretation
    cat(41, "Ambiguity in text", T2, "Where the text is unclear or ambiguous", Interpretation),
    cat(42, "Multiple interpretations", T2, "Different scholarly views on passages", Interpretation),
    cat(43, "Narrative silence", T2, "What the text does not explicitly say", Interpretation),
    // Meta / trust
    cat(44, "Source transparency", T1, "Questions about data sources and methodology", Meta),
    cat(45, "Why a question is refused", T3, "Out-of-scope questions", Meta),
];
