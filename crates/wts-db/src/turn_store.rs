//! The singleton turn record in `PostgreSQL`.
//!
//! One row in the `turns` table, keyed by [`TURN_ID`]. Every operation
//! runs as a single statement (or, for the first read, a short sequence on
//! one pooled connection) so no connection is held between calls.
//!
//! Control writes are compare-and-swap on every clock-owned column:
//!
//! ```text
//! UPDATE turns SET <control fields>
//!  WHERE id = $1 AND turn_number = .. AND phase = .. AND phase_end = ..
//!    AND active = .. AND defcon = ..
//! ```
//!
//! and report a conflict when no row was affected. News appends
//! concatenate onto the JSONB array and never touch the control fields.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{PgPool, Postgres};
use wts_core::TurnClock;
use wts_core::store::{
    ControlState, StoreError, TurnPatch, TurnStore, UpdateOutcome, check_write_mode,
};
use wts_types::{ApiResponse, Defcon, NewsItem, Phase, TURN_ID, Turn};

use crate::error::DbError;

const SELECT_TURN: &str = r"SELECT id, turn_number, phase, phase_end, active, breaking_news, defcon, frozen_turn
  FROM turns
  WHERE id = $1";

/// [`TurnStore`] backed by the `turns` table.
#[derive(Debug, Clone)]
pub struct PgTurnStore {
    pool: PgPool,
    clock: TurnClock,
}

impl PgTurnStore {
    /// Create a store on `pool`. `clock` builds the opening turn when the
    /// table is empty.
    pub const fn new(pool: PgPool, clock: TurnClock) -> Self {
        Self { pool, clock }
    }

    async fn load_or_init(&self) -> Result<Turn, DbError> {
        let mut conn = self.pool.acquire().await?;

        let existing = sqlx::query_as::<_, TurnRow>(SELECT_TURN)
            .bind(TURN_ID)
            .fetch_optional(&mut *conn)
            .await?;
        if let Some(row) = existing {
            return row.into_turn();
        }

        // Racing first readers all insert the same default; only one lands
        // and everyone re-reads the winner.
        let initial = TurnRow::from_turn(&self.clock.initial_turn(Utc::now()))?;
        let inserted = sqlx::query(
            r"INSERT INTO turns (id, turn_number, phase, phase_end, active, breaking_news, defcon, frozen_turn)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
              ON CONFLICT (id) DO NOTHING",
        )
        .bind(&initial.id)
        .bind(initial.turn_number)
        .bind(initial.phase)
        .bind(&initial.phase_end)
        .bind(initial.active)
        .bind(&initial.breaking_news)
        .bind(&initial.defcon)
        .bind(&initial.frozen_turn)
        .execute(&mut *conn)
        .await?;

        if inserted.rows_affected() > 0 {
            tracing::info!(id = TURN_ID, "Initialized turn record");
        }

        sqlx::query_as::<_, TurnRow>(SELECT_TURN)
            .bind(TURN_ID)
            .fetch_one(&mut *conn)
            .await?
            .into_turn()
    }

    async fn upsert(&self, turn: &Turn) -> Result<bool, DbError> {
        let row = TurnRow::from_turn(turn)?;
        let result = sqlx::query(
            r"INSERT INTO turns (id, turn_number, phase, phase_end, active, breaking_news, defcon, frozen_turn)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
              ON CONFLICT (id) DO UPDATE SET
                turn_number = EXCLUDED.turn_number,
                phase = EXCLUDED.phase,
                phase_end = EXCLUDED.phase_end,
                active = EXCLUDED.active,
                defcon = EXCLUDED.defcon,
                updated_at = now()",
        )
        .bind(TURN_ID)
        .bind(row.turn_number)
        .bind(row.phase)
        .bind(&row.phase_end)
        .bind(row.active)
        .bind(&row.breaking_news)
        .bind(&row.defcon)
        .bind(&row.frozen_turn)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_control_fields(
        &self,
        turn: &Turn,
        expected: Option<&ControlState>,
    ) -> Result<bool, DbError> {
        let row = TurnRow::from_turn(turn)?;
        let guard = Guard::new(expected)?;
        let query = sqlx::query(
            r"UPDATE turns SET
                turn_number = $8,
                phase = $9,
                phase_end = $10,
                active = $11,
                defcon = $12,
                updated_at = now()
              WHERE id = $1
                AND (NOT $2::BOOLEAN OR (
                  turn_number = $3::INTEGER AND phase = $4::SMALLINT
                  AND phase_end = $5::TEXT AND active = $6::BOOLEAN
                  AND defcon = $7::JSONB))",
        )
        .bind(TURN_ID);
        let result = guard
            .bind(query)
            .bind(row.turn_number)
            .bind(row.phase)
            .bind(&row.phase_end)
            .bind(row.active)
            .bind(&row.defcon)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn push_news(
        &self,
        item: &NewsItem,
        expected: Option<&ControlState>,
    ) -> Result<bool, DbError> {
        let item = serde_json::to_value(item)?;
        let guard = Guard::new(expected)?;
        let query = sqlx::query(
            r"UPDATE turns SET
                breaking_news = breaking_news || jsonb_build_array($8::JSONB),
                updated_at = now()
              WHERE id = $1
                AND (NOT $2::BOOLEAN OR (
                  turn_number = $3::INTEGER AND phase = $4::SMALLINT
                  AND phase_end = $5::TEXT AND active = $6::BOOLEAN
                  AND defcon = $7::JSONB))",
        )
        .bind(TURN_ID);
        let result = guard
            .bind(query)
            .bind(&item)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait::async_trait]
impl TurnStore for PgTurnStore {
    async fn get_current_turn(&self) -> Result<Turn, StoreError> {
        Ok(self.load_or_init().await?)
    }

    async fn update_turn(
        &self,
        patch: TurnPatch,
        upsert: bool,
        expected: Option<ControlState>,
    ) -> Result<UpdateOutcome, StoreError> {
        check_write_mode(upsert, expected.as_ref())?;

        let matched = match &patch {
            TurnPatch::Set(turn) if upsert => self.upsert(turn).await?,
            TurnPatch::Set(turn) => self.set_control_fields(turn, expected.as_ref()).await?,
            TurnPatch::PushNews(item) => self.push_news(item, expected.as_ref()).await?,
        };

        tracing::debug!(
            matched,
            upsert,
            expected = ?expected.map(|state| state.version()),
            news = matches!(patch, TurnPatch::PushNews(_)),
            "Turn update"
        );

        Ok(UpdateOutcome { matched })
    }
}

/// A row from the `turns` table.
///
/// Uses runtime types rather than compile-time checked types to
/// avoid requiring a live database during builds.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TurnRow {
    /// Always [`TURN_ID`].
    pub id: String,
    /// Current turn, starting at 1.
    pub turn_number: i32,
    /// Current phase, 1 through 10.
    pub phase: i16,
    /// RFC 3339 deadline of the current phase.
    pub phase_end: String,
    /// Whether the clock is running.
    pub active: bool,
    /// JSON array of news items, oldest first.
    pub breaking_news: serde_json::Value,
    /// JSON object keyed by nation name.
    pub defcon: serde_json::Value,
    /// Snapshot taken when the record was created.
    pub frozen_turn: Option<serde_json::Value>,
}

impl TurnRow {
    /// Encode a domain turn as a row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidColumn`] if the turn number does not fit
    /// the column and [`DbError::Serialization`] if a JSON column fails to
    /// encode.
    pub fn from_turn(turn: &Turn) -> Result<Self, DbError> {
        Ok(Self {
            id: turn.id.clone(),
            turn_number: turn_number_column(turn.turn_number)?,
            phase: i16::from(turn.phase),
            phase_end: phase_end_column(turn.phase_end),
            active: turn.active,
            breaking_news: serde_json::to_value(&turn.breaking_news)?,
            defcon: serde_json::to_value(turn.defcon)?,
            frozen_turn: turn
                .frozen_turn
                .as_ref()
                .map(serde_json::to_value)
                .transpose()?,
        })
    }

    /// Decode the row into a domain turn.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidColumn`] if a scalar column is out of
    /// range and [`DbError::Serialization`] if a JSON column is malformed.
    pub fn into_turn(self) -> Result<Turn, DbError> {
        let turn_number = u32::try_from(self.turn_number)
            .ok()
            .filter(|n| *n >= 1)
            .ok_or_else(|| DbError::InvalidColumn {
                column: "turn_number",
                message: format!("{} is not a positive turn number", self.turn_number),
            })?;
        let phase = Phase::try_from(i64::from(self.phase)).map_err(|e| DbError::InvalidColumn {
            column: "phase",
            message: e.to_string(),
        })?;
        let phase_end = DateTime::parse_from_rfc3339(&self.phase_end)
            .map_err(|e| DbError::InvalidColumn {
                column: "phase_end",
                message: e.to_string(),
            })?
            .with_timezone(&Utc);
        let breaking_news: Vec<NewsItem> = serde_json::from_value(self.breaking_news)?;
        let defcon: Defcon = serde_json::from_value(self.defcon)?;
        let frozen_turn: Option<ApiResponse> =
            self.frozen_turn.map(serde_json::from_value).transpose()?;

        Ok(Turn {
            id: self.id,
            turn_number,
            phase,
            phase_end,
            active: self.active,
            breaking_news,
            defcon,
            frozen_turn,
        })
    }
}

fn turn_number_column(turn_number: u32) -> Result<i32, DbError> {
    i32::try_from(turn_number).map_err(|e| DbError::InvalidColumn {
        column: "turn_number",
        message: format!("{turn_number} does not fit the column: {e}"),
    })
}

fn phase_end_column(phase_end: DateTime<Utc>) -> String {
    phase_end.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Bind values for the optional control-field precondition, `$2` through
/// `$7` in the guarded statements. An absent guard binds `false` and
/// NULLs, which makes the condition true.
#[derive(Debug, Default)]
struct Guard {
    enabled: bool,
    turn_number: Option<i32>,
    phase: Option<i16>,
    phase_end: Option<String>,
    active: Option<bool>,
    defcon: Option<serde_json::Value>,
}

impl Guard {
    fn new(expected: Option<&ControlState>) -> Result<Self, DbError> {
        let Some(state) = expected else {
            return Ok(Self::default());
        };
        Ok(Self {
            enabled: true,
            turn_number: Some(turn_number_column(state.turn_number)?),
            phase: Some(i16::from(state.phase)),
            phase_end: Some(phase_end_column(state.phase_end)),
            active: Some(state.active),
            defcon: Some(serde_json::to_value(state.defcon)?),
        })
    }

    fn bind(self, query: Query<'_, Postgres, PgArguments>) -> Query<'_, Postgres, PgArguments> {
        query
            .bind(self.enabled)
            .bind(self.turn_number)
            .bind(self.phase)
            .bind(self.phase_end)
            .bind(self.active)
            .bind(self.defcon)
    }
}
