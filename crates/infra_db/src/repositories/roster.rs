//! Roster repository
//!
//! Read-only view of the roster service's student table; the ledger core
//! only needs active students and the sibling flag.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use core_kernel::{ClassLevel, DomainPort, PortError, StudentId, StudentRef};
use domain_discount::SiblingPolicy;
use domain_ledger::RosterPort;

use crate::error::port_err;
use crate::rows::parse_class_level;

/// PostgreSQL-backed roster lookup
#[derive(Debug, Clone)]
pub struct PgRosterRepository {
    pool: PgPool,
}

impl PgRosterRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl DomainPort for PgRosterRepository {}

#[async_trait]
impl RosterPort for PgRosterRepository {
    async fn active_students(
        &self,
        class_levels: &[ClassLevel],
    ) -> Result<Vec<StudentRef>, PortError> {
        let codes: Vec<String> = class_levels.iter().map(|l| l.code().to_string()).collect();
        let rows = sqlx::query(
            "SELECT student_id, class_level FROM students \
             WHERE is_active AND (cardinality($1::text[]) = 0 OR class_level = ANY($1)) \
             ORDER BY student_id",
        )
        .bind(&codes)
        .fetch_all(&self.pool)
        .await
        .map_err(port_err)?;

        rows.iter()
            .map(|row| {
                let id: uuid::Uuid = row.try_get("student_id").map_err(port_err)?;
                let level = parse_class_level(row.try_get("class_level").map_err(port_err)?)?;
                Ok(StudentRef::new(id.into(), level))
            })
            .collect()
    }
}

#[async_trait]
impl SiblingPolicy for PgRosterRepository {
    async fn has_enrolled_sibling(&self, student: StudentId) -> Result<bool, PortError> {
        let has_sibling: bool = sqlx::query_scalar(
            "SELECT COALESCE((SELECT has_sibling FROM students WHERE student_id = $1), FALSE)",
        )
        .bind(student.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(port_err)?;
        Ok(has_sibling)
    }
}
