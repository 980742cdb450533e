//! Entity merging across providers.

use crate::types::{CombinedEntities, CombinedEntity, Entity, ExtractedEntities, ProviderId};

const MAX_PER_CATEGORY: usize = 15;

/// Merge per-provider entity lists into ranked, deduplicated categories.
///
/// Dedup key is the lowercased, trimmed name. Each unique entity counts its
/// total mentions, tracks the distinct providers that contributed it, and
/// keeps a URL if any contributing variant carried one. Categories are sorted
/// by mentions descending (first-seen tiebreak) and capped at 15.
pub fn merge_entities(by_provider: &[(ProviderId, ExtractedEntities)]) -> CombinedEntities {
    let people: Vec<(ProviderId, &Entity)> = by_provider
        .iter()
        .flat_map(|(p, e)| e.people.iter().map(move |entity| (*p, entity)))
        .collect();
    let organizations: Vec<(ProviderId, &Entity)> = by_provider
        .iter()
        .flat_map(|(p, e)| e.organizations.iter().map(move |entity| (*p, entity)))
        .collect();

    CombinedEntities {
        people: merge_category(&people),
        organizations: merge_category(&organizations),
    }
}

fn merge_category(entries: &[(ProviderId, &Entity)]) -> Vec<CombinedEntity> {
    let mut order: Vec<CombinedEntity> = Vec::new();
    let mut index: std::collections::HashMap<String, usize> = std::collections::HashMap::new();

    for (provider, entity) in entries {
        let key = entity.name.trim().to_lowercase();
        if key.is_empty() {
            continue;
        }

        match index.get(&key) {
            Some(&i) => {
                let existing = &mut order[i];
                existing.mentions += 1;
                if !existing.providers.contains(provider) {
                    existing.providers.push(*provider);
                }
                // Prefer the variant carrying a URL.
                if existing.url.is_none() && entity.url.is_some() {
                    existing.url = entity.url.clone();
                    existing.name = entity.name.trim().to_string();
                }
            }
            None => {
                index.insert(key, order.len());
                order.push(CombinedEntity {
                    name: entity.name.trim().to_string(),
                    url: entity.url.clone(),
                    mentions: 1,
                    providers: vec![*provider],
                });
            }
        }
    }

    order.sort_by(|a, b| b.mentions.cmp(&a.mentions)); // stable sort keeps first-seen tie order
    order.truncate(MAX_PER_CATEGORY);
    order
}
