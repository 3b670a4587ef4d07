//! PostgreSQL store — the production backend
//!
//! Thin client over a connection pool. Geographic positions cross this
//! boundary as text: POINT columns are selected as `location::text` and
//! written with a `$n::point` cast, so no geometry types leak into the
//! domain structs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::info;

use super::{Store, StoreError};
use crate::types::{
    AssetRef, AssetStatus, Connection, HealthSample, HealthStatus, MaintenanceAlert,
    MaintenanceStatus, AlertType, NewAlert, NewConnection, Position, PowerSample, Substation,
    Telemetry, Turbine, TurbineEvent,
};

/// PostgreSQL persistence backend
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect a pool to the given database URL
    pub async fn connect(
        url: &str,
        max_connections: u32,
        acquire_timeout_secs: u64,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(acquire_timeout_secs))
            .connect(url)
            .await?;

        info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Run database migrations from the migrations/ directory
    pub async fn migrate(&self) -> Result<(), StoreError> {
        info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&self.pool).await.map_err(sqlx::Error::from)?;
        info!("Migrations complete");
        Ok(())
    }
}

// ===== Row types =====
//
// Private row mirrors of the tables; parsed into domain structs so textual
// status and point values are validated in one place.

#[derive(sqlx::FromRow)]
struct TurbineRow {
    id: String,
    name: String,
    location: String,
    power: f64,
    wind_speed: f64,
    temperature: f64,
    humidity: f64,
    status: String,
}

impl TurbineRow {
    fn into_domain(self) -> Result<Turbine, StoreError> {
        let position = Position::parse_point_text(&self.location).ok_or_else(|| {
            StoreError::Corrupt(format!("turbine {}: bad location {:?}", self.id, self.location))
        })?;
        let status = AssetStatus::parse(&self.status).ok_or_else(|| {
            StoreError::Corrupt(format!("turbine {}: bad status {:?}", self.id, self.status))
        })?;
        Ok(Turbine {
            id: self.id,
            name: self.name,
            position,
            power: self.power,
            wind_speed: self.wind_speed,
            temperature: self.temperature,
            humidity: self.humidity,
            status,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SubstationRow {
    id: String,
    name: String,
    location: String,
    capacity: f64,
    load: f64,
}

impl SubstationRow {
    fn into_domain(self) -> Result<Substation, StoreError> {
        let position = Position::parse_point_text(&self.location).ok_or_else(|| {
            StoreError::Corrupt(format!(
                "substation {}: bad location {:?}",
                self.id, self.location
            ))
        })?;
        Ok(Substation {
            id: self.id,
            name: self.name,
            position,
            capacity: self.capacity,
            load: self.load,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ConnectionRow {
    id: i64,
    from_id: String,
    to_id: String,
    from_type: String,
    to_type: String,
    status: String,
    kind: String,
}

impl ConnectionRow {
    fn into_domain(self) -> Result<Connection, StoreError> {
        let from = AssetRef::from_parts(self.from_id, &self.from_type).ok_or_else(|| {
            StoreError::Corrupt(format!("connection {}: bad from_type {:?}", self.id, self.from_type))
        })?;
        let to = AssetRef::from_parts(self.to_id, &self.to_type).ok_or_else(|| {
            StoreError::Corrupt(format!("connection {}: bad to_type {:?}", self.id, self.to_type))
        })?;
        let status = AssetStatus::parse(&self.status).ok_or_else(|| {
            StoreError::Corrupt(format!("connection {}: bad status {:?}", self.id, self.status))
        })?;
        Ok(Connection {
            id: self.id,
            from,
            to,
            status,
            kind: self.kind,
        })
    }
}

#[derive(sqlx::FromRow)]
struct HealthRow {
    turbine_id: String,
    health_score: i32,
    status: String,
    issues: Vec<String>,
    recorded_at: DateTime<Utc>,
}

impl HealthRow {
    fn into_domain(self) -> Result<HealthSample, StoreError> {
        let status = HealthStatus::parse(&self.status).ok_or_else(|| {
            StoreError::Corrupt(format!(
                "health sample for {}: bad status {:?}",
                self.turbine_id, self.status
            ))
        })?;
        Ok(HealthSample {
            turbine_id: self.turbine_id,
            score: self.health_score,
            status,
            issues: self.issues,
            recorded_at: self.recorded_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AlertRow {
    id: i64,
    turbine_id: String,
    alert_type: String,
    status: String,
    description: String,
    health_score: Option<i32>,
    assigned_to: Option<String>,
    created_at: DateTime<Utc>,
}

impl AlertRow {
    fn into_domain(self) -> Result<MaintenanceAlert, StoreError> {
        let alert_type = AlertType::parse(&self.alert_type).ok_or_else(|| {
            StoreError::Corrupt(format!("alert {}: bad alert_type {:?}", self.id, self.alert_type))
        })?;
        let status = MaintenanceStatus::parse(&self.status).ok_or_else(|| {
            StoreError::Corrupt(format!("alert {}: bad status {:?}", self.id, self.status))
        })?;
        Ok(MaintenanceAlert {
            id: self.id,
            turbine_id: self.turbine_id,
            alert_type,
            status,
            description: self.description,
            health_score: self.health_score,
            assigned_to: self.assigned_to,
            created_at: self.created_at,
        })
    }
}

#[async_trait]
impl Store for PgStore {
    // ===== Turbines =====

    async fn load_turbines(&self) -> Result<Vec<Turbine>, StoreError> {
        let rows = sqlx::query_as::<_, TurbineRow>(
            r#"SELECT id, name, location::text AS location, power, wind_speed,
                      temperature, humidity, status
               FROM wind_turbines ORDER BY id"#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TurbineRow::into_domain).collect()
    }

    async fn insert_turbine(&self, turbine: &Turbine) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO wind_turbines (id, name, location, power, wind_speed,
                   temperature, humidity, status)
               VALUES ($1, $2, $3::point, $4, $5, $6, $7, $8)"#,
        )
        .bind(&turbine.id)
        .bind(&turbine.name)
        .bind(turbine.position.to_point_text())
        .bind(turbine.power)
        .bind(turbine.wind_speed)
        .bind(turbine.temperature)
        .bind(turbine.humidity)
        .bind(turbine.status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_turbine_status(&self, id: &str, status: AssetStatus) -> Result<(), StoreError> {
        sqlx::query("UPDATE wind_turbines SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_turbine_position(&self, id: &str, position: Position) -> Result<(), StoreError> {
        sqlx::query("UPDATE wind_turbines SET location = $1::point, updated_at = NOW() WHERE id = $2")
            .bind(position.to_point_text())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_turbine_telemetry(
        &self,
        id: &str,
        telemetry: &Telemetry,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"UPDATE wind_turbines
               SET power = $1, wind_speed = $2, temperature = $3, humidity = $4,
                   updated_at = NOW()
               WHERE id = $5"#,
        )
        .bind(telemetry.power)
        .bind(telemetry.wind_speed)
        .bind(telemetry.temperature)
        .bind(telemetry.humidity)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_turbine(&self, id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM wind_turbines WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ===== Substations =====

    async fn load_substations(&self) -> Result<Vec<Substation>, StoreError> {
        let rows = sqlx::query_as::<_, SubstationRow>(
            "SELECT id, name, location::text AS location, capacity, load FROM substations ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(SubstationRow::into_domain).collect()
    }

    async fn insert_substation(&self, substation: &Substation) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO substations (id, name, location, capacity, load)
               VALUES ($1, $2, $3::point, $4, $5)"#,
        )
        .bind(&substation.id)
        .bind(&substation.name)
        .bind(substation.position.to_point_text())
        .bind(substation.capacity)
        .bind(substation.load)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_substation_position(
        &self,
        id: &str,
        position: Position,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE substations SET location = $1::point, updated_at = NOW() WHERE id = $2")
            .bind(position.to_point_text())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_substation(&self, id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM substations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ===== Connections =====

    async fn load_connections(&self) -> Result<Vec<Connection>, StoreError> {
        let rows = sqlx::query_as::<_, ConnectionRow>(
            r#"SELECT id, from_id, to_id, from_type, to_type, status, "type" AS kind
               FROM connections ORDER BY id"#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ConnectionRow::into_domain).collect()
    }

    async fn insert_connection(&self, conn: &NewConnection) -> Result<Connection, StoreError> {
        let (id,): (i64,) = sqlx::query_as(
            r#"INSERT INTO connections (from_id, to_id, from_type, to_type, status, "type")
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING id"#,
        )
        .bind(conn.from.id())
        .bind(conn.to.id())
        .bind(conn.from.kind())
        .bind(conn.to.kind())
        .bind(conn.status.as_str())
        .bind(&conn.kind)
        .fetch_one(&self.pool)
        .await?;

        Ok(Connection {
            id,
            from: conn.from.clone(),
            to: conn.to.clone(),
            status: conn.status,
            kind: conn.kind.clone(),
        })
    }

    async fn update_connection_status(&self, id: i64, status: AssetStatus) -> Result<(), StoreError> {
        sqlx::query("UPDATE connections SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_connection(&self, id: i64) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM connections WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_connections_for_asset(&self, asset: &AssetRef) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"DELETE FROM connections
               WHERE (from_id = $1 AND from_type = $2)
                  OR (to_id = $1 AND to_type = $2)"#,
        )
        .bind(asset.id())
        .bind(asset.kind())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    // ===== Events =====

    async fn insert_event(
        &self,
        turbine_id: &str,
        event: &str,
        priority: i32,
    ) -> Result<TurbineEvent, StoreError> {
        let (created_at,): (DateTime<Utc>,) = sqlx::query_as(
            r#"INSERT INTO turbine_events (turbine_id, event, priority)
               VALUES ($1, $2, $3)
               RETURNING created_at"#,
        )
        .bind(turbine_id)
        .bind(event)
        .bind(priority)
        .fetch_one(&self.pool)
        .await?;

        Ok(TurbineEvent {
            turbine_id: turbine_id.to_string(),
            event: event.to_string(),
            priority,
            created_at,
        })
    }

    async fn load_events(&self, turbine_id: &str, limit: u32) -> Result<Vec<TurbineEvent>, StoreError> {
        let rows: Vec<(String, String, i32, DateTime<Utc>)> = sqlx::query_as(
            r#"SELECT turbine_id, event, priority, created_at
               FROM turbine_events WHERE turbine_id = $1
               ORDER BY created_at DESC LIMIT $2"#,
        )
        .bind(turbine_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(turbine_id, event, priority, created_at)| TurbineEvent {
                turbine_id,
                event,
                priority,
                created_at,
            })
            .collect())
    }

    async fn delete_events_for_turbine(&self, turbine_id: &str) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM turbine_events WHERE turbine_id = $1")
            .bind(turbine_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // ===== Power history =====

    async fn insert_power_sample(&self, sample: &PowerSample) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO power_history (turbine_id, power, expected_power,
                   upper_limit, lower_limit, recorded_at)
               VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(&sample.turbine_id)
        .bind(sample.power)
        .bind(sample.expected_power)
        .bind(sample.upper_limit)
        .bind(sample.lower_limit)
        .bind(sample.recorded_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_power_history(
        &self,
        turbine_id: &str,
        limit: u32,
    ) -> Result<Vec<PowerSample>, StoreError> {
        let rows: Vec<(String, f64, f64, f64, f64, DateTime<Utc>)> = sqlx::query_as(
            r#"SELECT turbine_id, power, expected_power, upper_limit, lower_limit, recorded_at
               FROM power_history WHERE turbine_id = $1
               ORDER BY recorded_at DESC LIMIT $2"#,
        )
        .bind(turbine_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(turbine_id, power, expected_power, upper_limit, lower_limit, recorded_at)| {
                    PowerSample {
                        turbine_id,
                        power,
                        expected_power,
                        upper_limit,
                        lower_limit,
                        recorded_at,
                    }
                },
            )
            .collect())
    }

    async fn delete_power_history_for_turbine(&self, turbine_id: &str) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM power_history WHERE turbine_id = $1")
            .bind(turbine_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // ===== Health history =====

    async fn insert_health_sample(&self, sample: &HealthSample) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO health_history (turbine_id, health_score, status, issues, recorded_at)
               VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(&sample.turbine_id)
        .bind(sample.score)
        .bind(sample.status.as_str())
        .bind(&sample.issues)
        .bind(sample.recorded_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_health_history(
        &self,
        turbine_id: &str,
        limit: u32,
    ) -> Result<Vec<HealthSample>, StoreError> {
        let rows = sqlx::query_as::<_, HealthRow>(
            r#"SELECT turbine_id, health_score, status, issues, recorded_at
               FROM health_history WHERE turbine_id = $1
               ORDER BY recorded_at DESC LIMIT $2"#,
        )
        .bind(turbine_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(HealthRow::into_domain).collect()
    }

    async fn delete_health_history_for_turbine(&self, turbine_id: &str) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM health_history WHERE turbine_id = $1")
            .bind(turbine_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // ===== Maintenance alerts =====

    async fn load_alerts(&self) -> Result<Vec<MaintenanceAlert>, StoreError> {
        let rows = sqlx::query_as::<_, AlertRow>(
            r#"SELECT id, turbine_id, alert_type, status, description,
                      health_score, assigned_to, created_at
               FROM maintenance_alerts ORDER BY created_at DESC"#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AlertRow::into_domain).collect()
    }

    async fn load_alerts_for_turbine(
        &self,
        turbine_id: &str,
    ) -> Result<Vec<MaintenanceAlert>, StoreError> {
        let rows = sqlx::query_as::<_, AlertRow>(
            r#"SELECT id, turbine_id, alert_type, status, description,
                      health_score, assigned_to, created_at
               FROM maintenance_alerts WHERE turbine_id = $1
               ORDER BY created_at DESC"#,
        )
        .bind(turbine_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AlertRow::into_domain).collect()
    }

    async fn insert_alert(&self, alert: &NewAlert) -> Result<MaintenanceAlert, StoreError> {
        let (id, created_at): (i64, DateTime<Utc>) = sqlx::query_as(
            r#"INSERT INTO maintenance_alerts
                   (turbine_id, alert_type, status, description, health_score, assigned_to)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING id, created_at"#,
        )
        .bind(&alert.turbine_id)
        .bind(alert.alert_type.as_str())
        .bind(alert.status.as_str())
        .bind(&alert.description)
        .bind(alert.health_score)
        .bind(&alert.assigned_to)
        .fetch_one(&self.pool)
        .await?;

        Ok(MaintenanceAlert {
            id,
            turbine_id: alert.turbine_id.clone(),
            alert_type: alert.alert_type,
            status: alert.status,
            description: alert.description.clone(),
            health_score: alert.health_score,
            assigned_to: alert.assigned_to.clone(),
            created_at,
        })
    }

    async fn get_alert(&self, id: i64) -> Result<Option<MaintenanceAlert>, StoreError> {
        let row = sqlx::query_as::<_, AlertRow>(
            r#"SELECT id, turbine_id, alert_type, status, description,
                      health_score, assigned_to, created_at
               FROM maintenance_alerts WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(AlertRow::into_domain).transpose()
    }

    async fn update_alert_status(&self, id: i64, status: MaintenanceStatus) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE maintenance_alerts SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("alert {id}")));
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "PostgreSQL"
    }
}
