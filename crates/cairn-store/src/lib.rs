//! Cairn Storage Layer
//!
//! SQLite-backed implementation of the domain store traits: claims with
//! versioned history, content-addressed evidence artifacts, validation
//! records and round state, contamination events, and the credibility
//! ledger. Every write appends to history; destructive updates never
//! happen, so the full provenance chain stays reconstructable.
//!
//! An in-memory implementation ([`MemoryStore`]) with identical
//! semantics lives in [`memory`] for tests and lightweight embedding.

#![warn(missing_docs)]

pub mod memory;
pub mod shared;

pub use memory::MemoryStore;
pub use shared::SharedStore;

use cairn_domain::traits::{
    ClaimQuery, ClaimStore, CredibilityStore, EventFilter, EventStore, EvidenceStore,
    ValidationStore,
};
use cairn_domain::{
    AdjustmentReason, AgentId, ArtifactId, Claim, ClaimId, ClaimState, ContaminationEvent,
    ContaminationKind, CredibilityEvent, CredibilityScore, EventId, Namespace, Payload, QuorumRule,
    RoundId, RoundState, Severity, ValidationRecord, Verdict,
};
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Compare-and-set failed: someone else wrote the claim first
    #[error("Version conflict on claim {claim}: expected {expected}")]
    VersionConflict {
        /// The contended claim
        claim: ClaimId,
        /// The version the caller expected
        expected: u64,
    },

    /// A claim with this id already exists
    #[error("Duplicate claim id: {0}")]
    Duplicate(ClaimId),
}

fn wall_clock() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Compute the content-addressed id for artifact bytes
pub fn artifact_checksum(bytes: &[u8]) -> ArtifactId {
    let digest = Sha256::digest(bytes);
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    // 64 lowercase hex chars by construction
    ArtifactId::from_checksum(hex).unwrap_or_else(|e| unreachable!("{}", e))
}

/// SQLite-based implementation of all Cairn store traits
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe; callers serialize access
/// (the service layer holds the store behind a mutex).
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open a store at the given database path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<(), StoreError> {
        let schema = include_str!("schema.sql");
        self.conn.execute_batch(schema)?;
        Ok(())
    }

    fn id_to_bytes(id: u128) -> Vec<u8> {
        id.to_be_bytes().to_vec()
    }

    fn bytes_to_id(bytes: &[u8]) -> Result<u128, StoreError> {
        if bytes.len() != 16 {
            return Err(StoreError::InvalidData(format!(
                "Expected 16 bytes for id, got {}",
                bytes.len()
            )));
        }
        let mut arr = [0u8; 16];
        arr.copy_from_slice(bytes);
        Ok(u128::from_be_bytes(arr))
    }

    fn conversion_err(idx: usize, e: StoreError) -> rusqlite::Error {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    }

    fn claim_from_row(row: &rusqlite::Row) -> rusqlite::Result<Claim> {
        let id_bytes: Vec<u8> = row.get(0)?;
        let id = Self::bytes_to_id(&id_bytes)
            .map(ClaimId::from_value)
            .map_err(|e| Self::conversion_err(0, e))?;

        let agent: String = row.get(1)?;
        let agent = AgentId::new(agent)
            .map_err(|e| Self::conversion_err(1, StoreError::InvalidData(e)))?;

        let namespace: String = row.get(2)?;
        let namespace = Namespace::parse(&namespace)
            .map_err(|e| Self::conversion_err(2, StoreError::InvalidData(e)))?;

        let state: String = row.get(7)?;
        let state = ClaimState::parse(&state).ok_or_else(|| {
            Self::conversion_err(7, StoreError::InvalidData(format!("bad state: {}", state)))
        })?;

        let evidence_json: String = row.get(9)?;
        let checksums: Vec<String> = serde_json::from_str(&evidence_json)
            .map_err(|e| Self::conversion_err(9, StoreError::InvalidData(e.to_string())))?;
        let evidence = checksums
            .into_iter()
            .map(ArtifactId::from_checksum)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| Self::conversion_err(9, StoreError::InvalidData(e)))?;

        let expires_at: Option<i64> = row.get(11)?;
        let last_cited_at: Option<i64> = row.get(12)?;

        Ok(Claim {
            id,
            agent,
            namespace,
            payload: Payload {
                category: row.get(3)?,
                schema_version: row.get::<_, i64>(4)? as u32,
                topic: row.get(5)?,
                body: row.get(6)?,
            },
            state,
            confidence: row.get(8)?,
            evidence,
            created_at: row.get::<_, i64>(10)? as u64,
            expires_at: expires_at.map(|t| t as u64),
            last_cited_at: last_cited_at.map(|t| t as u64),
            revalidation_flagged: row.get::<_, i64>(13)? != 0,
            version: row.get::<_, i64>(14)? as u64,
        })
    }

    fn evidence_json(claim: &Claim) -> Result<String, StoreError> {
        let checksums: Vec<&str> = claim.evidence.iter().map(|a| a.as_str()).collect();
        serde_json::to_string(&checksums).map_err(|e| StoreError::InvalidData(e.to_string()))
    }

    fn append_history(&mut self, claim: &Claim) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO claim_history (claim_id, version, namespace, state, confidence, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                Self::id_to_bytes(claim.id.value()),
                claim.version as i64,
                claim.namespace.as_path(),
                claim.state.as_str(),
                claim.confidence,
                wall_clock() as i64,
            ],
        )?;
        Ok(())
    }

    /// Number of history rows recorded for a claim (audit surface)
    pub fn history_len(&self, id: ClaimId) -> Result<usize, StoreError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM claim_history WHERE claim_id = ?1",
            params![Self::id_to_bytes(id.value())],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    const CLAIM_COLUMNS: &'static str = "id, agent, namespace, category, schema_version, topic, \
         body, state, confidence, evidence, created_at, expires_at, last_cited_at, \
         revalidation_flagged, version";
}

impl ClaimStore for SqliteStore {
    type Error = StoreError;

    fn insert_claim(&mut self, claim: &Claim) -> Result<ClaimId, Self::Error> {
        let id_bytes = Self::id_to_bytes(claim.id.value());

        let exists: bool = self
            .conn
            .query_row(
                "SELECT 1 FROM claims WHERE id = ?1",
                params![&id_bytes],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        if exists {
            return Err(StoreError::Duplicate(claim.id));
        }

        self.conn.execute(
            "INSERT INTO claims (id, agent, namespace, category, schema_version, topic, body, \
             state, confidence, evidence, created_at, expires_at, last_cited_at, \
             revalidation_flagged, version)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                &id_bytes,
                claim.agent.as_str(),
                claim.namespace.as_path(),
                &claim.payload.category,
                claim.payload.schema_version as i64,
                &claim.payload.topic,
                &claim.payload.body,
                claim.state.as_str(),
                claim.confidence,
                Self::evidence_json(claim)?,
                claim.created_at as i64,
                claim.expires_at.map(|t| t as i64),
                claim.last_cited_at.map(|t| t as i64),
                claim.revalidation_flagged as i64,
                claim.version as i64,
            ],
        )?;

        self.append_history(claim)?;
        Ok(claim.id)
    }

    fn get_claim(&self, id: ClaimId) -> Result<Option<Claim>, Self::Error> {
        let claim = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM claims WHERE id = ?1",
                    Self::CLAIM_COLUMNS
                ),
                params![Self::id_to_bytes(id.value())],
                Self::claim_from_row,
            )
            .optional()?;
        Ok(claim)
    }

    fn update_claim(&mut self, claim: &Claim, expected_version: u64) -> Result<(), Self::Error> {
        let id_bytes = Self::id_to_bytes(claim.id.value());
        let next_version = expected_version + 1;

        let updated = self.conn.execute(
            "UPDATE claims SET namespace = ?1, state = ?2, confidence = ?3, evidence = ?4, \
             expires_at = ?5, last_cited_at = ?6, revalidation_flagged = ?7, version = ?8
             WHERE id = ?9 AND version = ?10",
            params![
                claim.namespace.as_path(),
                claim.state.as_str(),
                claim.confidence,
                Self::evidence_json(claim)?,
                claim.expires_at.map(|t| t as i64),
                claim.last_cited_at.map(|t| t as i64),
                claim.revalidation_flagged as i64,
                next_version as i64,
                &id_bytes,
                expected_version as i64,
            ],
        )?;

        if updated == 0 {
            let exists: bool = self
                .conn
                .query_row(
                    "SELECT 1 FROM claims WHERE id = ?1",
                    params![&id_bytes],
                    |_| Ok(true),
                )
                .optional()?
                .unwrap_or(false);
            return if exists {
                Err(StoreError::VersionConflict {
                    claim: claim.id,
                    expected: expected_version,
                })
            } else {
                Err(StoreError::NotFound(claim.id.to_string()))
            };
        }

        let mut written = claim.clone();
        written.version = next_version;
        self.append_history(&written)?;
        Ok(())
    }

    fn query_claims(&self, query: &ClaimQuery) -> Result<Vec<Claim>, Self::Error> {
        let mut sql = format!("SELECT {} FROM claims WHERE 1=1", Self::CLAIM_COLUMNS);
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(namespace) = &query.namespace {
            sql.push_str(" AND namespace = ?");
            params.push(Box::new(namespace.as_path()));
        }
        if let Some(agent) = &query.agent {
            sql.push_str(" AND agent = ?");
            params.push(Box::new(agent.as_str().to_string()));
        }
        if let Some(category) = &query.category {
            sql.push_str(" AND category = ?");
            params.push(Box::new(category.clone()));
        }
        if let Some(topic) = &query.topic {
            sql.push_str(" AND topic = ?");
            params.push(Box::new(topic.clone()));
        }
        if let Some(state) = &query.state {
            sql.push_str(" AND state = ?");
            params.push(Box::new(state.as_str()));
        }
        if let Some(min_conf) = query.min_confidence {
            sql.push_str(" AND confidence >= ?");
            params.push(Box::new(min_conf));
        }
        sql.push_str(" ORDER BY id");
        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            params.push(Box::new(limit as i64));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let claims = stmt
            .query_map(&param_refs[..], Self::claim_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(claims)
    }

    fn record_citation(&mut self, id: ClaimId, at: u64) -> Result<(), Self::Error> {
        let updated = self.conn.execute(
            "UPDATE claims SET last_cited_at = ?1 WHERE id = ?2",
            params![at as i64, Self::id_to_bytes(id.value())],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

impl EvidenceStore for SqliteStore {
    type Error = StoreError;

    fn put_artifact(&mut self, bytes: &[u8]) -> Result<ArtifactId, Self::Error> {
        let id = artifact_checksum(bytes);
        // Same bytes, same id: re-upload is a no-op
        self.conn.execute(
            "INSERT OR IGNORE INTO artifacts (checksum, content, created_at) VALUES (?1, ?2, ?3)",
            params![id.as_str(), bytes, wall_clock() as i64],
        )?;
        Ok(id)
    }

    fn get_artifact(&self, id: &ArtifactId) -> Result<Option<Vec<u8>>, Self::Error> {
        let content = self
            .conn
            .query_row(
                "SELECT content FROM artifacts WHERE checksum = ?1",
                params![id.as_str()],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?;
        Ok(content)
    }

    fn has_artifact(&self, id: &ArtifactId) -> Result<bool, Self::Error> {
        let exists: bool = self
            .conn
            .query_row(
                "SELECT 1 FROM artifacts WHERE checksum = ?1",
                params![id.as_str()],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        Ok(exists)
    }

    fn collect_unreferenced(&mut self, live: &[ArtifactId]) -> Result<usize, Self::Error> {
        if live.is_empty() {
            let removed = self.conn.execute("DELETE FROM artifacts", [])?;
            return Ok(removed);
        }
        let placeholders = vec!["?"; live.len()].join(", ");
        let sql = format!(
            "DELETE FROM artifacts WHERE checksum NOT IN ({})",
            placeholders
        );
        let strs: Vec<&str> = live.iter().map(|a| a.as_str()).collect();
        let params: Vec<&dyn rusqlite::ToSql> = strs
            .iter()
            .map(|s| s as &dyn rusqlite::ToSql)
            .collect();
        let removed = self.conn.execute(&sql, &params[..])?;
        Ok(removed)
    }
}

impl SqliteStore {
    fn record_from_row(row: &rusqlite::Row) -> rusqlite::Result<ValidationRecord> {
        let round_bytes: Vec<u8> = row.get(0)?;
        let claim_bytes: Vec<u8> = row.get(1)?;
        let validator: String = row.get(2)?;
        let verdict: String = row.get(3)?;

        Ok(ValidationRecord {
            round: RoundId::from_value(
                Self::bytes_to_id(&round_bytes).map_err(|e| Self::conversion_err(0, e))?,
            ),
            claim: ClaimId::from_value(
                Self::bytes_to_id(&claim_bytes).map_err(|e| Self::conversion_err(1, e))?,
            ),
            validator: AgentId::new(validator)
                .map_err(|e| Self::conversion_err(2, StoreError::InvalidData(e)))?,
            verdict: Verdict::parse(&verdict).ok_or_else(|| {
                Self::conversion_err(3, StoreError::InvalidData(format!("bad verdict: {}", verdict)))
            })?,
            external: row.get::<_, i64>(4)? != 0,
            confidence: row.get(5)?,
            recorded_at: row.get::<_, i64>(6)? as u64,
        })
    }

    fn round_from_row(row: &rusqlite::Row) -> rusqlite::Result<RoundState> {
        let id_bytes: Vec<u8> = row.get(0)?;
        let claim_bytes: Vec<u8> = row.get(1)?;
        let rule_json: String = row.get(2)?;
        let assigned_json: String = row.get(3)?;

        let rule: QuorumRule = serde_json::from_str(&rule_json)
            .map_err(|e| Self::conversion_err(2, StoreError::InvalidData(e.to_string())))?;
        let assigned: Vec<String> = serde_json::from_str(&assigned_json)
            .map_err(|e| Self::conversion_err(3, StoreError::InvalidData(e.to_string())))?;
        let assigned = assigned
            .into_iter()
            .map(AgentId::new)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| Self::conversion_err(3, StoreError::InvalidData(e)))?;

        Ok(RoundState {
            id: RoundId::from_value(
                Self::bytes_to_id(&id_bytes).map_err(|e| Self::conversion_err(0, e))?,
            ),
            claim: ClaimId::from_value(
                Self::bytes_to_id(&claim_bytes).map_err(|e| Self::conversion_err(1, e))?,
            ),
            rule,
            assigned,
            opened_at: row.get::<_, i64>(4)? as u64,
            deadline: row.get::<_, i64>(5)? as u64,
        })
    }
}

impl ValidationStore for SqliteStore {
    type Error = StoreError;

    fn append_record(&mut self, record: &ValidationRecord) -> Result<(), Self::Error> {
        self.conn.execute(
            "INSERT INTO validation_records (round_id, claim_id, validator, verdict, external, \
             confidence, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                Self::id_to_bytes(record.round.value()),
                Self::id_to_bytes(record.claim.value()),
                record.validator.as_str(),
                record.verdict.as_str(),
                record.external as i64,
                record.confidence,
                record.recorded_at as i64,
            ],
        )?;
        Ok(())
    }

    fn records_for_round(&self, round: RoundId) -> Result<Vec<ValidationRecord>, Self::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT round_id, claim_id, validator, verdict, external, confidence, recorded_at
             FROM validation_records WHERE round_id = ?1 ORDER BY seq",
        )?;
        let records = stmt
            .query_map(
                params![Self::id_to_bytes(round.value())],
                Self::record_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn records_for_claim(&self, claim: ClaimId) -> Result<Vec<ValidationRecord>, Self::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT round_id, claim_id, validator, verdict, external, confidence, recorded_at
             FROM validation_records WHERE claim_id = ?1 ORDER BY seq",
        )?;
        let records = stmt
            .query_map(
                params![Self::id_to_bytes(claim.value())],
                Self::record_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn save_round(&mut self, round: &RoundState) -> Result<(), Self::Error> {
        let rule_json =
            serde_json::to_string(&round.rule).map_err(|e| StoreError::InvalidData(e.to_string()))?;
        let assigned: Vec<&str> = round.assigned.iter().map(|a| a.as_str()).collect();
        let assigned_json =
            serde_json::to_string(&assigned).map_err(|e| StoreError::InvalidData(e.to_string()))?;

        self.conn.execute(
            "INSERT INTO rounds (id, claim_id, rule, assigned, opened_at, deadline, open)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)
             ON CONFLICT(id) DO UPDATE SET rule = excluded.rule, assigned = excluded.assigned,
             deadline = excluded.deadline",
            params![
                Self::id_to_bytes(round.id.value()),
                Self::id_to_bytes(round.claim.value()),
                rule_json,
                assigned_json,
                round.opened_at as i64,
                round.deadline as i64,
            ],
        )?;
        Ok(())
    }

    fn open_round_for_claim(&self, claim: ClaimId) -> Result<Option<RoundState>, Self::Error> {
        let round = self
            .conn
            .query_row(
                "SELECT id, claim_id, rule, assigned, opened_at, deadline FROM rounds
                 WHERE claim_id = ?1 AND open = 1 LIMIT 1",
                params![Self::id_to_bytes(claim.value())],
                Self::round_from_row,
            )
            .optional()?;
        Ok(round)
    }

    fn open_rounds(&self) -> Result<Vec<RoundState>, Self::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, claim_id, rule, assigned, opened_at, deadline FROM rounds
             WHERE open = 1 ORDER BY opened_at",
        )?;
        let rounds = stmt
            .query_map([], Self::round_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rounds)
    }

    fn close_round(&mut self, round: RoundId) -> Result<(), Self::Error> {
        let updated = self.conn.execute(
            "UPDATE rounds SET open = 0 WHERE id = ?1",
            params![Self::id_to_bytes(round.value())],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(round.to_string()));
        }
        Ok(())
    }
}

impl EventStore for SqliteStore {
    type Error = StoreError;

    fn append_event(&mut self, event: &ContaminationEvent) -> Result<(), Self::Error> {
        self.conn.execute(
            "INSERT INTO contamination_events (id, claim_id, kind, severity, detected_at, resolved_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                Self::id_to_bytes(event.id.value()),
                Self::id_to_bytes(event.claim.value()),
                event.kind.as_str(),
                event.severity.as_str(),
                event.detected_at as i64,
                event.resolved_at.map(|t| t as i64),
            ],
        )?;
        Ok(())
    }

    fn query_events(&self, filter: &EventFilter) -> Result<Vec<ContaminationEvent>, Self::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, claim_id, kind, severity, detected_at, resolved_at
             FROM contamination_events ORDER BY id",
        )?;
        let events = stmt
            .query_map([], |row| {
                let id_bytes: Vec<u8> = row.get(0)?;
                let claim_bytes: Vec<u8> = row.get(1)?;
                let kind: String = row.get(2)?;
                let severity: String = row.get(3)?;
                let resolved_at: Option<i64> = row.get(5)?;

                Ok(ContaminationEvent {
                    id: EventId::from_value(
                        Self::bytes_to_id(&id_bytes).map_err(|e| Self::conversion_err(0, e))?,
                    ),
                    claim: ClaimId::from_value(
                        Self::bytes_to_id(&claim_bytes).map_err(|e| Self::conversion_err(1, e))?,
                    ),
                    kind: ContaminationKind::parse(&kind).ok_or_else(|| {
                        Self::conversion_err(
                            2,
                            StoreError::InvalidData(format!("bad kind: {}", kind)),
                        )
                    })?,
                    severity: Severity::parse(&severity).ok_or_else(|| {
                        Self::conversion_err(
                            3,
                            StoreError::InvalidData(format!("bad severity: {}", severity)),
                        )
                    })?,
                    detected_at: row.get::<_, i64>(4)? as u64,
                    resolved_at: resolved_at.map(|t| t as u64),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(events
            .into_iter()
            .filter(|e| filter.claim.is_none_or(|c| e.claim == c))
            .filter(|e| filter.kind.is_none_or(|k| e.kind == k))
            .filter(|e| filter.min_severity.is_none_or(|s| e.severity >= s))
            .filter(|e| !filter.open_only || e.is_open())
            .collect())
    }

    fn resolve_event(&mut self, id: EventId, at: u64) -> Result<(), Self::Error> {
        let updated = self.conn.execute(
            "UPDATE contamination_events SET resolved_at = ?1 WHERE id = ?2 AND resolved_at IS NULL",
            params![at as i64, Self::id_to_bytes(id.value())],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

impl CredibilityStore for SqliteStore {
    type Error = StoreError;

    fn append_adjustment(&mut self, event: &CredibilityEvent) -> Result<(), Self::Error> {
        let reason_json = serde_json::to_string(&event.reason)
            .map_err(|e| StoreError::InvalidData(e.to_string()))?;
        self.conn.execute(
            "INSERT INTO credibility_events (agent, category, reason, recorded_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                event.agent.as_str(),
                &event.category,
                reason_json,
                event.recorded_at as i64,
            ],
        )?;

        // Materialize: replay the single event onto the current value
        let mut score = self
            .score(&event.agent, &event.category)?
            .unwrap_or_else(|| {
                CredibilityScore::neutral(event.agent.clone(), &event.category, event.recorded_at)
            });
        score.apply(event);

        self.conn.execute(
            "INSERT INTO credibility_scores (agent, category, value, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(agent, category) DO UPDATE SET value = excluded.value,
             updated_at = excluded.updated_at",
            params![
                score.agent.as_str(),
                &score.category,
                score.value,
                score.updated_at as i64,
            ],
        )?;
        Ok(())
    }

    fn score(
        &self,
        agent: &AgentId,
        category: &str,
    ) -> Result<Option<CredibilityScore>, Self::Error> {
        let score = self
            .conn
            .query_row(
                "SELECT value, updated_at FROM credibility_scores WHERE agent = ?1 AND category = ?2",
                params![agent.as_str(), category],
                |row| Ok((row.get::<_, f64>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;
        Ok(score.map(|(value, updated_at)| CredibilityScore {
            agent: agent.clone(),
            category: category.to_string(),
            value,
            updated_at: updated_at as u64,
        }))
    }

    fn scores(&self) -> Result<Vec<CredibilityScore>, Self::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT agent, category, value, updated_at FROM credibility_scores ORDER BY agent, category",
        )?;
        let scores = stmt
            .query_map([], |row| {
                let agent: String = row.get(0)?;
                Ok(CredibilityScore {
                    agent: AgentId::new(agent)
                        .map_err(|e| Self::conversion_err(0, StoreError::InvalidData(e)))?,
                    category: row.get(1)?,
                    value: row.get(2)?,
                    updated_at: row.get::<_, i64>(3)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(scores)
    }
}
