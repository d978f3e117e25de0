//! PostgreSQL sink (enabled with the `database` feature).
//!
//! Idempotent by construction: the table is created if absent and rows
//! are upserted by primary key, so re-harvesting an identifier updates in
//! place instead of duplicating. Every value is parameter-bound; absent
//! attributes become SQL NULLs (`size_bp` is a nullable integer column,
//! never the literal string "None").

use async_trait::async_trait;
use sqlx::PgPool;

use super::{PlasmidSink, Result};
use crate::addgene::Plasmid;

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS plasmids (
    id                  INT PRIMARY KEY,
    name                TEXT NOT NULL,
    vendor_url          TEXT NOT NULL,
    size_bp             INT,
    backbone            TEXT,
    vector_type         TEXT,
    marker              TEXT,
    resistance          TEXT,
    growth_temperature  TEXT,
    growth_strain       TEXT,
    growth_instructions TEXT,
    copy_number         TEXT,
    gene_insert         TEXT,
    sequence            TEXT
)
"#;

const UPSERT: &str = r#"
INSERT INTO plasmids (
    id, name, vendor_url, size_bp, backbone, vector_type, marker,
    resistance, growth_temperature, growth_strain, growth_instructions,
    copy_number, gene_insert, sequence
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
ON CONFLICT (id) DO UPDATE SET
    name = EXCLUDED.name,
    vendor_url = EXCLUDED.vendor_url,
    size_bp = EXCLUDED.size_bp,
    backbone = EXCLUDED.backbone,
    vector_type = EXCLUDED.vector_type,
    marker = EXCLUDED.marker,
    resistance = EXCLUDED.resistance,
    growth_temperature = EXCLUDED.growth_temperature,
    growth_strain = EXCLUDED.growth_strain,
    growth_instructions = EXCLUDED.growth_instructions,
    copy_number = EXCLUDED.copy_number,
    gene_insert = EXCLUDED.gene_insert,
    sequence = EXCLUDED.sequence
"#;

/// Upserts records into the `plasmids` table.
pub struct PostgresSink {
    pool: PgPool,
}

impl PostgresSink {
    /// Connect and make sure the table exists.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        Ok(Self { pool })
    }

    /// Reuse an existing pool (tests, embedding applications).
    pub async fn with_pool(pool: PgPool) -> Result<Self> {
        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl PlasmidSink for PostgresSink {
    async fn persist(&mut self, record: &Plasmid) -> Result<()> {
        sqlx::query(UPSERT)
            .bind(record.id as i32)
            .bind(&record.name)
            .bind(&record.vendor_url)
            .bind(record.size_bp.map(|v| v as i32))
            .bind(&record.backbone)
            .bind(&record.vector_type)
            .bind(&record.marker)
            .bind(&record.resistance)
            .bind(&record.growth_temperature)
            .bind(&record.growth_strain)
            .bind(&record.growth_instructions)
            .bind(&record.copy_number)
            .bind(&record.gene_insert)
            .bind(&record.sequence)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
