//! Citation merging across providers.

use crate::types::{Citation, CombinedCitation, ProviderId};
use url::Url;

const PRIMARY_COUNT: usize = 10;
const MAX_CITATIONS: usize = 25;

/// Merge per-provider citation lists into a deduplicated, domain-grouped
/// ranking.
///
/// Citations are deduplicated by normalized URL (lowercased, trailing slashes
/// stripped); each URL is attributed to a provider at most once no matter how
/// often that provider repeats it. Uniques are ranked by (provider count
/// descending, title ascending). The first 10 are primaries; remaining
/// citations sharing a primary's domain ride along as companions, grouped so
/// domain-siblings are adjacent while primaries keep their relative order.
pub fn merge_citations(by_provider: &[(ProviderId, Vec<Citation>)]) -> Vec<CombinedCitation> {
    let mut order: Vec<CombinedCitation> = Vec::new();
    let mut index: std::collections::HashMap<String, usize> = std::collections::HashMap::new();

    for (provider, citations) in by_provider {
        for citation in citations {
            let key = normalize_url(&citation.url);
            match index.get(&key) {
                Some(&i) => {
                    let existing = &mut order[i];
                    if !existing.providers.contains(provider) {
                        existing.providers.push(*provider);
                    }
                }
                None => {
                    index.insert(key, order.len());
                    order.push(CombinedCitation {
                        title: citation.title.clone(),
                        url: citation.url.clone(),
                        domain: extract_domain(&citation.url),
                        providers: vec![*provider],
                    });
                }
            }
        }
    }

    order.sort_by(|a, b| {
        b.providers
            .len()
            .cmp(&a.providers.len())
            .then_with(|| a.title.cmp(&b.title))
    });

    group_by_domain(order)
}

/// Walk the ranked list: primaries in order, each followed by every other
/// citation from its domain (later primaries of the same domain stay adjacent,
/// then companions from beyond the primary cut).
fn group_by_domain(ranked: Vec<CombinedCitation>) -> Vec<CombinedCitation> {
    let primary_domains: Vec<String> = ranked
        .iter()
        .take(PRIMARY_COUNT)
        .map(|c| c.domain.clone())
        .collect();

    let mut grouped: Vec<CombinedCitation> = Vec::new();
    let mut emitted = vec![false; ranked.len()];

    for i in 0..ranked.len().min(PRIMARY_COUNT) {
        if emitted[i] {
            continue;
        }
        let domain = ranked[i].domain.clone();
        for (j, citation) in ranked.iter().enumerate() {
            if !emitted[j] && citation.domain == domain {
                emitted[j] = true;
                grouped.push(citation.clone());
            }
        }
    }

    // Leftover uniques whose domain matched no primary, still in rank order.
    for (j, citation) in ranked.into_iter().enumerate() {
        if !emitted[j] && !primary_domains.contains(&citation.domain) {
            grouped.push(citation);
        }
    }

    grouped.truncate(MAX_CITATIONS);
    grouped
}

fn normalize_url(url: &str) -> String {
    url.to_lowercase().trim_end_matches('/').to_string()
}

/// Hostname with any leading `www.` stripped; the raw URL string when parsing
/// fails.
fn extract_domain(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) => host.strip_prefix("www.").unwrap_or(host).to_string(),
            None => url.to_string(),
        },
        Err(_) => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn citation(title: &str, url: &str) -> Citation {
        Citation {
            title: title.into(),
            url: url.into(),
        }
    }

    #[test]
    fn dedup_normalizes_case_and_trailing_slashes() {
        let merged = merge_citations(&[
            (
                ProviderId::Claude,
                vec![citation("EPA overview", "https://epa.gov/methane/")],
            ),
            (
                ProviderId::OpenAi,
                vec![citation("EPA methane page", "https://EPA.gov/methane")],
            ),
        ]);

        assert_eq!(merged.len(), 1);
        assert_eq!(
            merged[0].providers,
            vec![ProviderId::Claude, ProviderId::OpenAi]
        );
        // First-seen title and URL survive.
        assert_eq!(merged[0].title, "EPA overview");
    }

    #[test]
    fn dedup_is_idempotent_per_provider() {
        let list = vec![
            citation("Report", "https://example.com/report"),
            citation("Report", "https://example.com/report/"),
        ];
        let merged = merge_citations(&[(ProviderId::Gemini, list)]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].providers, vec![ProviderId::Gemini]);
    }

    #[test]
    fn ranks_by_provider_count_then_title() {
        let merged = merge_citations(&[
            (
                ProviderId::Claude,
                vec![
                    citation("Beta source", "https://one.example/a"),
                    citation("Alpha source", "https://two.example/b"),
                ],
            ),
            (
                ProviderId::Grok,
                vec![citation("Beta source", "https://one.example/a")],
            ),
        ]);

        assert_eq!(merged[0].url, "https://one.example/a"); // 2 providers
        assert_eq!(merged[1].url, "https://two.example/b");
    }

    #[test]
    fn domain_strips_www_and_falls_back_to_raw_string() {
        let merged = merge_citations(&[(
            ProviderId::Claude,
            vec![
                citation("A", "https://www.nature.com/articles/1"),
                citation("B", "not a url"),
            ],
        )]);

        let domains: Vec<&str> = merged.iter().map(|c| c.domain.as_str()).collect();
        assert!(domains.contains(&"nature.com"));
        assert!(domains.contains(&"not a url"));
    }

    #[test]
    fn domain_siblings_are_adjacent_with_primary_order_preserved() {
        // Three domains; nature.com appears twice with the weaker entry last.
        let merged = merge_citations(&[
            (
                ProviderId::Claude,
                vec![
                    citation("Climate study", "https://nature.com/articles/1"),
                    citation("Agency report", "https://epa.gov/report"),
                    citation("Z follow-up study", "https://nature.com/articles/2"),
                ],
            ),
            (
                ProviderId::OpenAi,
                vec![
                    citation("Climate study", "https://nature.com/articles/1"),
                    citation("Agency report", "https://epa.gov/report"),
                ],
            ),
        ]);

        let urls: Vec<&str> = merged.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://epa.gov/report",      // 2 providers, "Agency" < "Climate"
                "https://nature.com/articles/1",
                "https://nature.com/articles/2", // pulled up beside its domain sibling
            ]
        );
    }

    #[test]
    fn caps_total_output() {
        let list: Vec<Citation> = (0..40)
            .map(|i| citation(&format!("Source {i:02}"), &format!("https://d{i}.example/p")))
            .collect();
        let merged = merge_citations(&[(ProviderId::Claude, list)]);
        assert_eq!(merged.len(), 25);
    }
}
