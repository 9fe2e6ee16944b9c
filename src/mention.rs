//! Sentence records, product mentions, and co-mention pairs.
//!
//! Records arrive from the structuring front end already split into
//! sentences with product mentions resolved. This module validates them and
//! derives the canonical `(product_a, product_b)` pairs every downstream
//! output is keyed by.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::errors::{RecordError, RecordResult};

/// One product mention inside a sentence. Offsets are character offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductMention {
    pub product_canonical: String,
    pub alias_matched: String,
    pub start_char: usize,
    pub end_char: usize,
    pub match_method: String,
}

impl ProductMention {
    pub fn new(product: &str, alias: &str, start_char: usize, end_char: usize) -> Self {
        Self {
            product_canonical: product.to_string(),
            alias_matched: alias.to_string(),
            start_char,
            end_char,
            match_method: "exact".to_string(),
        }
    }

    /// The canonical product name, trimmed and lowercased.
    pub fn product(&self) -> String {
        canonical_product(&self.product_canonical)
    }
}

/// An immutable, structured sentence as produced by the structuring pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceRecord {
    pub doc_id: String,
    pub sentence_id: String,
    #[serde(default)]
    pub section: Option<String>,
    pub text: String,
    #[serde(default)]
    pub product_mentions: Vec<ProductMention>,
}

impl SentenceRecord {
    pub fn new(doc_id: &str, sentence_id: &str, text: &str) -> Self {
        Self {
            doc_id: doc_id.to_string(),
            sentence_id: sentence_id.to_string(),
            section: None,
            text: text.to_string(),
            product_mentions: Vec::new(),
        }
    }

    pub fn with_section(mut self, section: &str) -> Self {
        self.section = Some(section.to_string());
        self
    }

    pub fn with_mention(mut self, mention: ProductMention) -> Self {
        self.product_mentions.push(mention);
        self
    }

    /// Locate `alias` in the text and record it as a mention of `product`.
    ///
    /// Convenience for fixtures and tests; the first occurrence at or after
    /// the end of the previous mention of the same alias is used. Aliases not
    /// present in the text are ignored.
    pub fn mentioning(mut self, product: &str, alias: &str) -> Self {
        let already = self
            .product_mentions
            .iter()
            .filter(|m| m.alias_matched == alias)
            .map(|m| m.end_char)
            .max()
            .unwrap_or(0);
        let byte_from = self
            .text
            .char_indices()
            .nth(already)
            .map(|(idx, _)| idx)
            .unwrap_or(self.text.len());
        if let Some(found) = self.text[byte_from..].find(alias) {
            let start = self.text[..byte_from + found].chars().count();
            let end = start + alias.chars().count();
            self.product_mentions
                .push(ProductMention::new(product, alias, start, end));
        }
        self
    }

    /// The canonical section name, if the record has a non-blank section.
    pub fn canonical_section(&self) -> Option<String> {
        self.section
            .as_deref()
            .map(canonical_section)
            .filter(|section| !section.is_empty())
    }

    /// Check required fields and mention offsets.
    pub fn validate(&self) -> RecordResult<()> {
        if self.doc_id.trim().is_empty() {
            return Err(RecordError::MissingDocId);
        }
        if self.sentence_id.trim().is_empty() {
            return Err(RecordError::MissingSentenceId {
                doc_id: self.doc_id.clone(),
            });
        }
        if self.text.trim().is_empty() {
            return Err(RecordError::EmptyText {
                sentence_id: self.sentence_id.clone(),
            });
        }
        let len = self.text.chars().count();
        for mention in &self.product_mentions {
            if mention.start_char >= mention.end_char
                || mention.end_char > len
                || mention.product().is_empty()
            {
                return Err(RecordError::InvalidMentionSpan {
                    sentence_id: self.sentence_id.clone(),
                    product: mention.product_canonical.clone(),
                    start: mention.start_char,
                    end: mention.end_char,
                });
            }
        }
        Ok(())
    }

    /// Distinct canonical products mentioned, sorted.
    pub fn distinct_products(&self) -> BTreeSet<String> {
        self.product_mentions
            .iter()
            .map(ProductMention::product)
            .filter(|p| !p.is_empty())
            .collect()
    }

    /// Mentions of one canonical product, in text order.
    pub fn mentions_of<'r>(
        &'r self,
        product: &'r str,
    ) -> impl Iterator<Item = &'r ProductMention> + 'r {
        let mut mentions: Vec<&ProductMention> = self
            .product_mentions
            .iter()
            .filter(move |m| m.product() == product)
            .collect();
        mentions.sort_by_key(|m| (m.start_char, m.end_char));
        mentions.into_iter()
    }
}

/// Trim and lowercase a product name.
pub fn canonical_product(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Canonicalize a section heading: lowercase, `_` and punctuation become
/// spaces, whitespace collapsed. `"Materials_and_Methods"` becomes
/// `"materials and methods"`.
pub fn canonical_section(raw: &str) -> String {
    let cleaned: String = raw
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Build the composite sentence identifier `{doc}:sec:{slug}:sent:{index}`.
pub fn build_sentence_id(doc_id: &str, section: &str, index: usize) -> String {
    let slug = canonical_section(section).replace(' ', "_");
    let slug = if slug.is_empty() { "section" } else { slug.as_str() };
    format!("{}:sec:{}:sent:{}", doc_id, slug, index)
}

/// Two distinct products co-mentioned in one sentence.
///
/// Construction always orders the pair so `product_a < product_b`; a pair is
/// never represented in both orders.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CoMentionPair {
    pub product_a: String,
    pub product_b: String,
    pub sentence_id: String,
    /// Disjoint A/B mention pairings in the sentence: the smaller of the two
    /// products' mention counts, never below 1.
    pub count: u32,
}

impl CoMentionPair {
    pub fn new(first: &str, second: &str, sentence_id: &str) -> Self {
        let first = canonical_product(first);
        let second = canonical_product(second);
        let (product_a, product_b) = if first <= second {
            (first, second)
        } else {
            (second, first)
        };
        Self {
            product_a,
            product_b,
            sentence_id: sentence_id.to_string(),
            count: 1,
        }
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count.max(1);
        self
    }
}

/// Every canonical pair of distinct products in the sentence.
///
/// Fails with [`RecordError::NotACoMention`] when fewer than two distinct
/// products are mentioned.
pub fn co_mention_pairs(record: &SentenceRecord) -> RecordResult<Vec<CoMentionPair>> {
    record.validate()?;
    let products: Vec<String> = record.distinct_products().into_iter().collect();
    if products.len() < 2 {
        return Err(RecordError::NotACoMention {
            sentence_id: record.sentence_id.clone(),
            found: products.len(),
        });
    }
    let mut pairs = Vec::new();
    let mention_counts: Vec<usize> = products
        .iter()
        .map(|product| record.mentions_of(product).count())
        .collect();
    for (i, a) in products.iter().enumerate() {
        for (j, b) in products.iter().enumerate().skip(i + 1) {
            let pairings = mention_counts[i].min(mention_counts[j]);
            let count = u32::try_from(pairings).unwrap_or(u32::MAX);
            pairs.push(CoMentionPair::new(a, b, &record.sentence_id).with_count(count));
        }
    }
    Ok(pairs)
}

/// Position features for a co-mentioned pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairProximity {
    /// Characters between the closest mentions of the two products; 0 when
    /// they touch or overlap.
    pub char_gap: usize,
    /// True when `product_a` is mentioned before `product_b`.
    pub a_first: bool,
}

impl PairProximity {
    pub fn measure(record: &SentenceRecord, pair: &CoMentionPair) -> Option<Self> {
        let a: Vec<&ProductMention> = record.mentions_of(&pair.product_a).collect();
        let b: Vec<&ProductMention> = record.mentions_of(&pair.product_b).collect();
        let char_gap = a
            .iter()
            .flat_map(|ma| b.iter().map(move |mb| gap(ma, mb)))
            .min()?;
        let a_first = a.first()?.start_char < b.first()?.start_char;
        Some(Self { char_gap, a_first })
    }
}

fn gap(a: &ProductMention, b: &ProductMention) -> usize {
    if a.end_char <= b.start_char {
        b.start_char - a.end_char
    } else if b.end_char <= a.start_char {
        a.start_char - b.end_char
    } else {
        0
    }
}

/// Document-level co-mention rollup row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentCoMention {
    pub doc_id: String,
    pub product_a: String,
    pub product_b: String,
    pub count: u32,
}

/// Sum sentence-level pair counts per `(doc_id, product_a, product_b)`.
///
/// Records that are invalid or not co-mentions contribute nothing.
pub fn document_co_mentions<'r, I>(records: I) -> Vec<DocumentCoMention>
where
    I: IntoIterator<Item = &'r SentenceRecord>,
{
    let mut totals: BTreeMap<(String, String, String), u32> = BTreeMap::new();
    for record in records {
        let Ok(pairs) = co_mention_pairs(record) else {
            continue;
        };
        for pair in pairs {
            *totals
                .entry((record.doc_id.clone(), pair.product_a, pair.product_b))
                .or_insert(0) += pair.count;
        }
    }
    totals
        .into_iter()
        .map(|((doc_id, product_a, product_b), count)| DocumentCoMention {
            doc_id,
            product_a,
            product_b,
            count,
        })
        .collect()
}
