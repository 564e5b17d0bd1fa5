//! SQLite-backed persistence handle.
//!
//! Schema:
//!
//! - `brands`: unique brand names
//! - `fan_models`: one row per model, unique `model_number`, brand by reference
//! - `performance_samples`: the ordered sample list of a model as JSON
//! - `performance_fits`: the single fit artifact of a model
//!
//! Both performance tables are keyed by `fan_id` and cascade on model deletion,
//! which requires `PRAGMA foreign_keys = ON` on every connection.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::domain::{FanId, FitArtifact, MediaType, PreviewImage, Sample};
use crate::store::{SampleStore, StoreError};

const SCHEMA: &str = "
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS brands (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT UNIQUE NOT NULL
    );

    CREATE TABLE IF NOT EXISTS fan_models (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        model_number TEXT UNIQUE NOT NULL,
        model_group TEXT NOT NULL,
        brand_id INTEGER NOT NULL REFERENCES brands (id) ON DELETE RESTRICT,
        speed_rpm INTEGER NOT NULL,
        blade_angle_deg INTEGER NOT NULL,
        drive_train TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS performance_samples (
        fan_id INTEGER PRIMARY KEY REFERENCES fan_models (id) ON DELETE CASCADE,
        flow_pressure_data TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS performance_fits (
        fan_id INTEGER PRIMARY KEY REFERENCES fan_models (id) ON DELETE CASCADE,
        degree INTEGER NOT NULL,
        coefficients TEXT NOT NULL,
        polynomial_function TEXT NOT NULL,
        curve_image BLOB,
        curve_image_type TEXT,
        fitted_at TEXT NOT NULL
    );
";

/// An open database. The connection is closed when this value is dropped.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database file and ensure the schema exists.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "opened database");
        Self::init(conn)
    }

    /// A private in-memory database (tests, dry runs).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Fail with `UnknownModel` unless the fan model row exists.
    pub(crate) fn ensure_model(&self, fan_id: FanId) -> Result<(), StoreError> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM fan_models WHERE id = ?1",
                params![fan_id.0],
                |row| row.get(0),
            )
            .optional()?;
        match found {
            Some(_) => Ok(()),
            None => Err(StoreError::UnknownModel(fan_id)),
        }
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        debug!("closing database");
    }
}

impl SampleStore for Database {
    fn load_samples(&self, fan_id: FanId) -> Result<Vec<Sample>, StoreError> {
        self.ensure_model(fan_id)?;
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT flow_pressure_data FROM performance_samples WHERE fan_id = ?1",
                params![fan_id.0],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    fn save_samples(&self, fan_id: FanId, samples: &[Sample]) -> Result<(), StoreError> {
        self.ensure_model(fan_id)?;
        let json = serde_json::to_string(samples)?;
        self.conn.execute(
            "INSERT INTO performance_samples (fan_id, flow_pressure_data, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (fan_id) DO UPDATE SET
                 flow_pressure_data = excluded.flow_pressure_data,
                 updated_at = excluded.updated_at",
            params![fan_id.0, json, timestamp(Utc::now())],
        )?;
        debug!(%fan_id, n = samples.len(), "saved samples");
        Ok(())
    }

    fn replace_fit(&self, fan_id: FanId, artifact: &FitArtifact) -> Result<(), StoreError> {
        self.ensure_model(fan_id)?;
        let coefficients = serde_json::to_string(&artifact.coefficients)?;
        let (image, image_type) = match &artifact.preview {
            Some(p) => (Some(p.bytes.as_slice()), Some(p.media_type.mime())),
            None => (None, None),
        };

        // One statement, so the artifact is never observed half-written.
        self.conn.execute(
            "INSERT INTO performance_fits
                 (fan_id, degree, coefficients, polynomial_function, curve_image, curve_image_type, fitted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT (fan_id) DO UPDATE SET
                 degree = excluded.degree,
                 coefficients = excluded.coefficients,
                 polynomial_function = excluded.polynomial_function,
                 curve_image = excluded.curve_image,
                 curve_image_type = excluded.curve_image_type,
                 fitted_at = excluded.fitted_at",
            params![
                fan_id.0,
                artifact.degree as i64,
                coefficients,
                artifact.equation,
                image,
                image_type,
                timestamp(artifact.fitted_at),
            ],
        )?;
        debug!(%fan_id, degree = artifact.degree, "replaced fit artifact");
        Ok(())
    }

    fn load_fit(&self, fan_id: FanId) -> Result<Option<FitArtifact>, StoreError> {
        self.ensure_model(fan_id)?;
        let row = self
            .conn
            .query_row(
                "SELECT degree, coefficients, polynomial_function, curve_image, curve_image_type, fitted_at
                 FROM performance_fits WHERE fan_id = ?1",
                params![fan_id.0],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<Vec<u8>>>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()?;

        let Some((degree, coefficients, equation, image, image_type, fitted_at)) = row else {
            return Ok(None);
        };

        let degree = usize::try_from(degree).map_err(|_| StoreError::Corrupt {
            what: "fit degree",
            message: format!("negative degree {degree}"),
        })?;
        let coefficients: Vec<f64> = serde_json::from_str(&coefficients)?;
        let fitted_at = DateTime::parse_from_rfc3339(&fitted_at)
            .map_err(|e| StoreError::Corrupt {
                what: "fit timestamp",
                message: e.to_string(),
            })?
            .with_timezone(&Utc);

        let preview = match (image, image_type) {
            (Some(bytes), Some(mime)) => {
                let media_type = MediaType::from_mime(&mime).ok_or_else(|| StoreError::Corrupt {
                    what: "preview media type",
                    message: mime.clone(),
                })?;
                Some(PreviewImage { media_type, bytes })
            }
            _ => None,
        };

        Ok(Some(FitArtifact {
            degree,
            coefficients,
            equation,
            preview,
            fitted_at,
        }))
    }
}

/// Whether `err` is a UNIQUE constraint failure.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Whether `err` is a FOREIGN KEY constraint failure.
pub(crate) fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
    )
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Insert a brand and a fan model directly, bypassing the registry.
    pub(crate) fn seed_model(db: &Database, model_number: &str) -> FanId {
        db.conn()
            .execute("INSERT OR IGNORE INTO brands (name) VALUES ('Breeze')", [])
            .unwrap();
        db.conn()
            .execute(
                "INSERT INTO fan_models
                     (model_number, model_group, brand_id, speed_rpm, blade_angle_deg, drive_train)
                 VALUES (?1, 'AXF', (SELECT id FROM brands WHERE name = 'Breeze'), 1440, 25, 'direct_drive')",
                params![model_number],
            )
            .unwrap();
        FanId(db.conn().last_insert_rowid())
    }

    fn artifact(coefficients: Vec<f64>, equation: &str) -> FitArtifact {
        FitArtifact {
            degree: coefficients.len() - 1,
            coefficients,
            equation: equation.to_string(),
            preview: Some(PreviewImage {
                media_type: MediaType::Svg,
                bytes: b"<svg/>".to_vec(),
            }),
            fitted_at: Utc::now(),
        }
    }

    fn count(db: &Database, table: &str) -> i64 {
        db.conn()
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn load_samples_is_empty_when_nothing_saved() {
        let db = Database::open_in_memory().unwrap();
        let id = seed_model(&db, "AXF-1440rpm-25°");
        assert!(db.load_samples(id).unwrap().is_empty());
        assert!(db.load_fit(id).unwrap().is_none());
    }

    #[test]
    fn samples_keep_insertion_order() {
        let db = Database::open_in_memory().unwrap();
        let id = seed_model(&db, "AXF-1440rpm-25°");
        let samples = vec![
            Sample::new(3.0, 50.0),
            Sample::new(1.0, 100.0),
            Sample::new(2.0, 80.0),
        ];
        db.save_samples(id, &samples).unwrap();
        assert_eq!(db.load_samples(id).unwrap(), samples);

        db.save_samples(id, &samples[..1]).unwrap();
        assert_eq!(db.load_samples(id).unwrap(), samples[..1].to_vec());
        assert_eq!(count(&db, "performance_samples"), 1);
    }

    #[test]
    fn replace_fit_round_trips_exact_coefficients() {
        let db = Database::open_in_memory().unwrap();
        let id = seed_model(&db, "AXF-1440rpm-25°");
        let coefficients = vec![-0.1 / 3.0, std::f64::consts::PI, 1e-17, 123456.789012345];
        let stored = artifact(coefficients.clone(), "-0.03*x^3 + 3.14*x^2 + 0.00*x + 123456.79");
        db.replace_fit(id, &stored).unwrap();

        let loaded = db.load_fit(id).unwrap().unwrap();
        let bits = |v: &[f64]| v.iter().map(|c| c.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&loaded.coefficients), bits(&coefficients));
        assert_eq!(loaded.equation, stored.equation);
        assert_eq!(loaded.degree, 3);
        assert_eq!(loaded.preview, stored.preview);
        assert_eq!(loaded.fitted_at.timestamp_micros(), stored.fitted_at.timestamp_micros());
    }

    #[test]
    fn replace_fit_overwrites_previous_artifact() {
        let db = Database::open_in_memory().unwrap();
        let id = seed_model(&db, "AXF-1440rpm-25°");
        db.replace_fit(id, &artifact(vec![1.0, 2.0, 3.0], "first")).unwrap();

        let mut second = artifact(vec![4.0, 5.0], "second");
        second.preview = None;
        db.replace_fit(id, &second).unwrap();

        let loaded = db.load_fit(id).unwrap().unwrap();
        assert_eq!(loaded.coefficients, vec![4.0, 5.0]);
        assert_eq!(loaded.equation, "second");
        assert!(loaded.preview.is_none());
        assert_eq!(count(&db, "performance_fits"), 1);
    }

    #[test]
    fn unknown_model_is_a_precondition_violation() {
        let db = Database::open_in_memory().unwrap();
        let missing = FanId(42);
        assert!(matches!(db.load_samples(missing), Err(StoreError::UnknownModel(FanId(42)))));
        assert!(matches!(db.save_samples(missing, &[]), Err(StoreError::UnknownModel(_))));
        assert!(matches!(
            db.replace_fit(missing, &artifact(vec![1.0, 0.0], "x")),
            Err(StoreError::UnknownModel(_))
        ));
        assert!(matches!(db.load_fit(missing), Err(StoreError::UnknownModel(_))));
    }

    #[test]
    fn deleting_model_cascades_to_samples_and_fit() {
        let db = Database::open_in_memory().unwrap();
        let id = seed_model(&db, "AXF-1440rpm-25°");
        db.save_samples(id, &[Sample::new(1.0, 2.0)]).unwrap();
        db.replace_fit(id, &artifact(vec![1.0, 0.0], "x")).unwrap();

        db.conn()
            .execute("DELETE FROM fan_models WHERE id = ?1", params![id.0])
            .unwrap();
        assert_eq!(count(&db, "performance_samples"), 0);
        assert_eq!(count(&db, "performance_fits"), 0);
    }

    #[test]
    fn reopening_a_file_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fans.sqlite");

        let id = {
            let db = Database::open(&path).unwrap();
            let id = seed_model(&db, "AXF-1440rpm-25°");
            db.save_samples(id, &[Sample::new(0.5, 200.0)]).unwrap();
            id
        };

        let db = Database::open(&path).unwrap();
        assert_eq!(db.load_samples(id).unwrap(), vec![Sample::new(0.5, 200.0)]);
    }

    #[test]
    fn unique_violation_is_detected() {
        let db = Database::open_in_memory().unwrap();
        db.conn().execute("INSERT INTO brands (name) VALUES ('A')", []).unwrap();
        let err = db
            .conn()
            .execute("INSERT INTO brands (name) VALUES ('A')", [])
            .unwrap_err();
        assert!(is_unique_violation(&err));
        assert!(!is_foreign_key_violation(&err));
    }
}
