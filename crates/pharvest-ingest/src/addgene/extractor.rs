// Addgene field extraction
//
// Attribute blocks on a detail page look like:
//
//   <li class="field">
//     <div class="field-label">Vector backbone</div>
//     <div class="field-content">pLKO.1 (Search Vector Database)</div>
//   </li>
//
// Extraction is token-based over a block's flattened text: match the
// label's tokens at the head, keep what follows. Absence of a label, or
// any parse step failing, resolves that one attribute to absent; nothing
// in this module fails a record.

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::models::PlasmidDraft;
use super::{AddgeneError, Result};
use crate::retry::RetryPolicy;

/// Text marking a "no such identifier" page, matched case-insensitively
/// against headings and the document title.
const NOT_FOUND_MARKER: &str = "page not found";

/// Label of the size field; parsed numerically rather than joined.
const SIZE_LABEL: &str = "Total vector size (bp)";

/// One optional attribute of the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Backbone,
    VectorType,
    Marker,
    Resistance,
    GrowthTemperature,
    GrowthStrain,
    GrowthInstructions,
    CopyNumber,
    GeneInsert,
}

/// Extraction rule for one labeled field: the label's tokens open the
/// block, `drop_last` trailing tokens are page chrome to discard.
#[derive(Debug, Clone, Copy)]
struct FieldSpec {
    field: Field,
    label: &'static str,
    drop_last: usize,
}

/// The declarative field table. Every optional attribute is one row here;
/// supporting a new vendor field means adding a row, not a method.
/// `backbone` drops the trailing vector-database link text that shares
/// its block.
const FIELD_SPECS: &[FieldSpec] = &[
    FieldSpec {
        field: Field::Backbone,
        label: "Vector backbone",
        drop_last: 3,
    },
    FieldSpec {
        field: Field::VectorType,
        label: "Vector type",
        drop_last: 0,
    },
    FieldSpec {
        field: Field::Marker,
        label: "Selectable markers",
        drop_last: 0,
    },
    FieldSpec {
        field: Field::Resistance,
        label: "Bacterial Resistance(s)",
        drop_last: 0,
    },
    FieldSpec {
        field: Field::GrowthTemperature,
        label: "Growth Temperature",
        drop_last: 0,
    },
    FieldSpec {
        field: Field::GrowthStrain,
        label: "Growth Strain(s)",
        drop_last: 0,
    },
    FieldSpec {
        field: Field::GrowthInstructions,
        label: "Growth instructions",
        drop_last: 0,
    },
    FieldSpec {
        field: Field::CopyNumber,
        label: "Copy number",
        drop_last: 0,
    },
    FieldSpec {
        field: Field::GeneInsert,
        label: "Gene/Insert name",
        drop_last: 0,
    },
];

/// Queries one detail document for the record schema.
pub struct FieldExtractor {
    field_blocks: Selector,
    name: Selector,
    headings: Selector,
}

impl FieldExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            field_blocks: parse_selector("li.field")?,
            name: parse_selector("span.material-name")?,
            headings: parse_selector("h1, title")?,
        })
    }

    /// Document-level "no such identifier" sentinel. Checked before any
    /// field extraction is attempted.
    pub fn is_not_found(&self, doc: &Html) -> bool {
        doc.select(&self.headings)
            .any(|el| block_text(el).to_lowercase().contains(NOT_FOUND_MARKER))
    }

    /// The required record name, whitespace-normalized. `None` when the
    /// name element is missing or empty: pooled libraries publish no
    /// single material name, and such identifiers are discarded upstream.
    pub fn name(&self, doc: &Html) -> Option<String> {
        let el = doc.select(&self.name).next()?;
        let text = block_text(el);
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// Extract every optional attribute into a draft, each field through
    /// the retry policy independently of its siblings.
    pub fn draft(&self, doc: &Html, policy: &RetryPolicy) -> PlasmidDraft {
        let mut draft = PlasmidDraft::default();

        for spec in FIELD_SPECS {
            let value = policy
                .run_sync(|| {
                    Ok::<_, AddgeneError>(self.labeled_field(doc, spec.label, spec.drop_last))
                })
                .ok()
                .flatten();
            draft.set(spec.field, value);
        }

        draft.size_bp = policy
            .run_sync(|| Ok::<_, AddgeneError>(self.size_field(doc)))
            .ok()
            .flatten();

        draft
    }

    /// Token-rule extraction for one labeled block. Returns `None` when
    /// no block starts with the label, or trimming leaves nothing.
    fn labeled_field(&self, doc: &Html, label: &str, drop_last: usize) -> Option<String> {
        let label_tokens: Vec<&str> = label.split_whitespace().collect();

        for block in doc.select(&self.field_blocks) {
            let text = block_text(block);
            let tokens: Vec<&str> = text.split_whitespace().collect();

            if tokens.len() < label_tokens.len() || tokens[..label_tokens.len()] != label_tokens[..]
            {
                continue;
            }

            let value = &tokens[label_tokens.len()..];
            let keep = value.len().checked_sub(drop_last)?;
            let joined = value[..keep].join(" ");

            return if joined.is_empty() { None } else { Some(joined) };
        }

        None
    }

    /// Size in base pairs: digits of whatever follows the size label.
    /// Interior punctuation (thousands separators) is stripped before
    /// parsing; a non-numeric remainder resolves to absent.
    fn size_field(&self, doc: &Html) -> Option<u32> {
        let raw = self.labeled_field(doc, SIZE_LABEL, 0)?;
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

        if digits.is_empty() {
            debug!(value = %raw, "size field is not numeric");
            return None;
        }
        digits.parse().ok()
    }
}

fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| AddgeneError::Parse(format!("bad selector {}: {}", css, e)))
}

/// Element text with markup stripped and whitespace collapsed.
fn block_text(el: ElementRef<'_>) -> String {
    el.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const DETAIL_FIXTURE: &str = r#"
        <html>
        <head><title>Addgene: pLKO.1 - TRC cloning vector</title></head>
        <body>
          <h1><span class="material-name">pLKO.1 - TRC cloning vector</span></h1>
          <ul>
            <li class="field">
              <div class="field-label">Vector backbone</div>
              <div class="field-content">pLKO.1 (Search Vector Database)</div>
            </li>
            <li class="field">Vector type Lentiviral, RNAi</li>
            <li class="field">Selectable markers Puromycin</li>
            <li class="field">Bacterial Resistance(s) Ampicillin, 100 μg/mL</li>
            <li class="field">Growth Temperature 37°C</li>
            <li class="field">Growth Strain(s) ccdB Survival</li>
            <li class="field">Growth instructions Grow at 30 degrees to avoid recombination</li>
            <li class="field">Copy number High Copy</li>
            <li class="field">Gene/Insert name none</li>
            <li class="field">Total vector size (bp) 7052</li>
          </ul>
        </body>
        </html>
    "#;

    fn extractor() -> FieldExtractor {
        FieldExtractor::new().expect("selectors")
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, std::time::Duration::from_millis(1), std::time::Duration::ZERO)
    }

    #[test]
    fn extracts_every_field() {
        let doc = Html::parse_document(DETAIL_FIXTURE);
        let ex = extractor();

        assert_eq!(ex.name(&doc).as_deref(), Some("pLKO.1 - TRC cloning vector"));

        let draft = ex.draft(&doc, &policy());
        assert_eq!(draft.backbone.as_deref(), Some("pLKO.1"));
        assert_eq!(draft.vector_type.as_deref(), Some("Lentiviral, RNAi"));
        assert_eq!(draft.marker.as_deref(), Some("Puromycin"));
        assert_eq!(draft.resistance.as_deref(), Some("Ampicillin, 100 μg/mL"));
        assert_eq!(draft.growth_temperature.as_deref(), Some("37°C"));
        assert_eq!(draft.growth_strain.as_deref(), Some("ccdB Survival"));
        assert_eq!(
            draft.growth_instructions.as_deref(),
            Some("Grow at 30 degrees to avoid recombination")
        );
        assert_eq!(draft.copy_number.as_deref(), Some("High Copy"));
        assert_eq!(draft.gene_insert.as_deref(), Some("none"));
        assert_eq!(draft.size_bp, Some(7052));
    }

    #[test]
    fn absent_labels_resolve_independently() {
        // Only two labels present; everything else must come back None
        // and the present ones must be unaffected.
        let doc = Html::parse_document(
            r#"<html><body>
              <span class="material-name">pMini</span>
              <li class="field">Copy number Low Copy</li>
              <li class="field">Vector type Bacterial expression</li>
            </body></html>"#,
        );
        let draft = extractor().draft(&doc, &policy());

        assert_eq!(draft.copy_number.as_deref(), Some("Low Copy"));
        assert_eq!(draft.vector_type.as_deref(), Some("Bacterial expression"));
        assert!(draft.backbone.is_none());
        assert!(draft.marker.is_none());
        assert!(draft.resistance.is_none());
        assert!(draft.growth_temperature.is_none());
        assert!(draft.growth_strain.is_none());
        assert!(draft.growth_instructions.is_none());
        assert!(draft.gene_insert.is_none());
        assert!(draft.size_bp.is_none());
    }

    #[test]
    fn not_found_sentinel_in_heading() {
        let doc =
            Html::parse_document("<html><body><h1>Page Not Found</h1></body></html>");
        assert!(extractor().is_not_found(&doc));
    }

    #[test]
    fn not_found_sentinel_in_title() {
        let doc = Html::parse_document(
            "<html><head><title>Addgene: page not found</title></head><body></body></html>",
        );
        assert!(extractor().is_not_found(&doc));
    }

    #[test]
    fn regular_pages_are_not_flagged_missing() {
        let doc = Html::parse_document(DETAIL_FIXTURE);
        assert!(!extractor().is_not_found(&doc));
    }

    #[test]
    fn missing_or_empty_name_is_none() {
        let doc = Html::parse_document("<html><body><p>nothing here</p></body></html>");
        assert!(extractor().name(&doc).is_none());

        let doc = Html::parse_document(
            r#"<html><body><span class="material-name">   </span></body></html>"#,
        );
        assert!(extractor().name(&doc).is_none());
    }

    #[test]
    fn name_whitespace_is_normalized() {
        let doc = Html::parse_document(
            "<html><body><span class=\"material-name\">\n    pBabe\n    puro\n</span></body></html>",
        );
        assert_eq!(extractor().name(&doc).as_deref(), Some("pBabe puro"));
    }

    #[test]
    fn non_numeric_size_is_absent_without_affecting_siblings() {
        let doc = Html::parse_document(
            r#"<html><body>
              <li class="field">Total vector size (bp) unknown</li>
              <li class="field">Copy number High Copy</li>
            </body></html>"#,
        );
        let draft = extractor().draft(&doc, &policy());
        assert!(draft.size_bp.is_none());
        assert_eq!(draft.copy_number.as_deref(), Some("High Copy"));
    }

    #[test]
    fn size_tolerates_thousands_separators() {
        let doc = Html::parse_document(
            r#"<html><body><li class="field">Total vector size (bp) 11,724</li></body></html>"#,
        );
        let draft = extractor().draft(&doc, &policy());
        assert_eq!(draft.size_bp, Some(11_724));
    }

    #[test]
    fn backbone_with_only_chrome_tokens_is_absent() {
        // The trailing trim eats the whole value: nothing real remains.
        let doc = Html::parse_document(
            r#"<html><body>
              <li class="field">Vector backbone (Search Vector Database)</li>
            </body></html>"#,
        );
        let draft = extractor().draft(&doc, &policy());
        assert!(draft.backbone.is_none());
    }
}
