//! Static lookup tables: categories and their retrieval tuning.
//!
//! Both tables are compiled in and read-only for the life of the process.
//! The category → template mapping is never computed at runtime.

mod categories;
mod retrieval;

use crate::types::{Category, CategoryGroup, CategoryId, RetrievalConfig, TemplateType};

use categories::CATEGORIES;
use retrieval::RETRIEVAL_CONFIGS;

/// Look up a category by id.
pub fn category(id: CategoryId) -> &'static Category {
    &CATEGORIES[id.index()]
}

/// Look up a category by raw id, `None` outside 1..=45.
pub fn category_by_number(id: i64) -> Option<&'static Category> {
    CategoryId::new(id).ok().map(category)
}

pub fn categories() -> &'static [Category] {
    &CATEGORIES
}

pub fn refusal_category() -> &'static Category {
    category(CategoryId::REFUSAL)
}

pub fn categories_in_group(group: CategoryGroup) -> Vec<&'static Category> {
    CATEGORIES.iter().filter(|c| c.group == group).collect()
}

pub fn categories_with_template(template: TemplateType) -> Vec<&'static Category> {
    CATEGORIES.iter().filter(|c| c.template == template).collect()
}

/// Case-insensitive search over names and descriptions.
pub fn search_categories(query: &str) -> Vec<&'static Category> {
    let needle = query.to_lowercase();
    CATEGORIES
        .iter()
        .filter(|c| {
            c.name.to_lowercase().contains(&needle)
                || c.description.to_lowercase().contains(&needle)
        })
        .collect()
}

pub fn retrieval_config(id: CategoryId) -> &'static RetrievalConfig {
    &RETRIEVAL_CONFIGS[id.index()]
}

pub fn requires_translation(id: CategoryId) -> bool {
    retrieval_config(id).include_translation
}

pub fn requires_comments(id: CategoryId) -> bool {
    retrieval_config(id).include_comments
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_table_is_indexed_by_id() {
        for (i, c) in categories().iter().enumerate() {
            assert_eq!(c.id.get() as usize, i + 1, "{} is out of place", c.name);
        }
    }

    #[test]
    fn test_locked_template_assignments() {
        let t2: Vec<u8> = categories_with_template(TemplateType::T2)
            .iter()
            .map(|c| c.id.get())
            .collect();
        assert_eq!(t2, vec![25, 30, 31, 33, 41, 42, 43]);

        let t3: Vec<u8> = categories_with_template(TemplateType::T3)
            .iter()
            .map(|c| c.id.get())
            .collect();
        assert_eq!(t3, vec![45]);
        assert_eq!(categories_with_template(TemplateType::T1).len(), 37);
    }

    #[test]
    fn test_group_boundaries() {
        let ids = |g| -> Vec<u8> { categories_in_group(g).iter().map(|c| c.id.get()).collect() };
        assert_eq!(ids(CategoryGroup::Story), (1..=15).collect::<Vec<_>>());
        assert_eq!(ids(CategoryGroup::Character), (16..=25).collect::<Vec<_>>());
        assert_eq!(ids(CategoryGroup::Dharma), (26..=33).collect::<Vec<_>>());
        assert_eq!(ids(CategoryGroup::Verse), (34..=40).collect::<Vec<_>>());
        assert_eq!(ids(CategoryGroup::Interpretation), vec![41, 42, 43]);
        assert_eq!(ids(CategoryGroup::Meta), vec![44, 45]);
    }

    #[test]
    fn test_refusal_category_skips_retrieval() {
        assert_eq!(refusal_category().template, TemplateType::T3);
        assert_eq!(retrieval_config(CategoryId::REFUSAL).top_k, 0);
        assert!(CategoryId::all()
            .filter(|id| *id != CategoryId::REFUSAL)
            .all(|id| retrieval_config(id).top_k > 0));
    }

    #[test]
    fn test_required_fields() {
        let with_comments: Vec<u8> = CategoryId::all()
            .filter(|id| requires_comments(*id))
            .map(CategoryId::get)
            .collect();
        assert_eq!(with_comments, vec![25, 30, 31, 33, 41, 42, 43]);
        assert!(requires_translation(CategoryId::new(34).unwrap()));
        assert!(!requires_translation(CategoryId::new(32).unwrap()));
    }

    #[test]
    fn test_search_categories() {
        let hits = search_categories("DHARMA");
        assert!(hits.iter().any(|c| c.id.get() == 26));
        assert!(hits.iter().any(|c| c.id.get() == 32));
        assert!(search_categories("mahabharata").is_empty());
    }

    proptest! {
        #[test]
        fn prop_lookup_is_stable(id in 1i64..=45) {
            let first = category_by_number(id).unwrap();
            let second = category_by_number(id).unwrap();
            prop_assert_eq!(first.template, second.template);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_out_of_range_ids_rejected(id in prop_oneof![i64::MIN..1i64, 46i64..i64::MAX]) {
            prop_assert!(category_by_number(id).is_none());
        }
    }
}
