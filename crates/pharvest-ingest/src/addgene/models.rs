// Plasmid record models

use serde::{Deserialize, Serialize};

use super::extractor::Field;

/// The assembled record for one identifier. Constructed exactly once per
/// successfully-resolved identifier, after all extraction, and never
/// mutated afterwards.
///
/// Optional attributes stay `None` ("absent") until a sink resolves them
/// to its own convention (empty CSV cell, JSON null, SQL NULL), never
/// earlier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plasmid {
    /// Stable external identifier; primary key for persistence.
    pub id: u32,
    /// Vendor-assigned material name. Always non-empty; identifiers
    /// without a resolvable name are discarded before assembly.
    pub name: String,
    /// URL of the vendor's detail page for this identifier.
    pub vendor_url: String,
    /// Size in base pairs, from the detail page or the sequence header.
    pub size_bp: Option<u32>,
    pub backbone: Option<String>,
    pub vector_type: Option<String>,
    pub marker: Option<String>,
    pub resistance: Option<String>,
    pub growth_temperature: Option<String>,
    pub growth_strain: Option<String>,
    pub growth_instructions: Option<String>,
    pub copy_number: Option<String>,
    pub gene_insert: Option<String>,
    /// Decoded annotated-sequence file content.
    pub sequence: Option<String>,
}

/// Attribute values accumulated during extraction, before assembly.
#[derive(Debug, Clone, Default)]
pub struct PlasmidDraft {
    pub size_bp: Option<u32>,
    pub backbone: Option<String>,
    pub vector_type: Option<String>,
    pub marker: Option<String>,
    pub resistance: Option<String>,
    pub growth_temperature: Option<String>,
    pub growth_strain: Option<String>,
    pub growth_instructions: Option<String>,
    pub copy_number: Option<String>,
    pub gene_insert: Option<String>,
}

impl PlasmidDraft {
    pub(crate) fn set(&mut self, field: Field, value: Option<String>) {
        match field {
            Field::Backbone => self.backbone = value,
            Field::VectorType => self.vector_type = value,
            Field::Marker => self.marker = value,
            Field::Resistance => self.resistance = value,
            Field::GrowthTemperature => self.growth_temperature = value,
            Field::GrowthStrain => self.growth_strain = value,
            Field::GrowthInstructions => self.growth_instructions = value,
            Field::CopyNumber => self.copy_number = value,
            Field::GeneInsert => self.gene_insert = value,
        }
    }
}

impl Plasmid {
    /// Build the final record. When the detail page carried no size, fall
    /// back to the sequence payload's LOCUS header; both may legitimately
    /// be absent.
    pub fn assemble(
        id: u32,
        name: String,
        vendor_url: String,
        draft: PlasmidDraft,
        sequence: Option<String>,
    ) -> Self {
        let size_bp = draft
            .size_bp
            .or_else(|| sequence.as_deref().and_then(locus_size));

        Self {
            id,
            name,
            vendor_url,
            size_bp,
            backbone: draft.backbone,
            vector_type: draft.vector_type,
            marker: draft.marker,
            resistance: draft.resistance,
            growth_temperature: draft.growth_temperature,
            growth_strain: draft.growth_strain,
            growth_instructions: draft.growth_instructions,
            copy_number: draft.copy_number,
            gene_insert: draft.gene_insert,
            sequence,
        }
    }
}

/// Size from a GenBank LOCUS header: the third whitespace token of the
/// first line, e.g. `LOCUS  pUC19  2686 bp DNA circular SYN ...`.
/// Best-effort; anything non-numeric resolves to absent.
fn locus_size(payload: &str) -> Option<u32> {
    payload.lines().next()?.split_whitespace().nth(2)?.parse().ok()
}
