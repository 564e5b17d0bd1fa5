//! Brand and fan model catalogue.
//!
//! Responsibilities:
//!
//! - resolve a model number to a stored [`FanModel`]
//! - create / update / delete fan models (deletion cascades to samples and fit)
//! - create / rename / delete brands
//!
//! Implementation choices:
//!
//! - the registry borrows the same [`Database`] the sample store uses
//! - uniqueness and in-use conflicts come back as `StoreError::Duplicate` /
//!   `StoreError::InUse`, which callers show as warnings

use rusqlite::{OptionalExtension, Row, params};
use tracing::{debug, info};

use crate::domain::{Brand, BrandId, DriveTrain, FanId, FanModel, FanSpec};
use crate::error::ErrorKind;
use crate::store::sqlite::{is_foreign_key_violation, is_unique_violation};
use crate::store::{Database, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("{entity} '{key}' not found.")]
    NotFound { entity: &'static str, key: String },

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::NotFound { .. } => ErrorKind::PreconditionViolation,
            RegistryError::Validation(_) => ErrorKind::ValidationWarning,
            RegistryError::Store(e) => e.kind(),
        }
    }
}

impl From<rusqlite::Error> for RegistryError {
    fn from(err: rusqlite::Error) -> Self {
        RegistryError::Store(StoreError::Sqlite(err))
    }
}

const MODEL_SELECT: &str = "
    SELECT m.id, m.model_number, m.model_group, b.name, m.speed_rpm, m.blade_angle_deg, m.drive_train
    FROM fan_models m
    JOIN brands b ON b.id = m.brand_id";

/// Column values of one `fan_models` row before the drive train is parsed.
struct ModelRow {
    id: i64,
    model_number: String,
    group: String,
    brand: String,
    speed_rpm: u32,
    blade_angle_deg: u32,
    drive_train: String,
}

impl ModelRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            model_number: row.get(1)?,
            group: row.get(2)?,
            brand: row.get(3)?,
            speed_rpm: row.get(4)?,
            blade_angle_deg: row.get(5)?,
            drive_train: row.get(6)?,
        })
    }

    fn into_model(self) -> Result<FanModel, StoreError> {
        let drive_train =
            DriveTrain::from_db_str(&self.drive_train).ok_or_else(|| StoreError::Corrupt {
                what: "drive train",
                message: self.drive_train.clone(),
            })?;
        Ok(FanModel {
            id: FanId(self.id),
            model_number: self.model_number,
            spec: FanSpec {
                group: self.group,
                brand: self.brand,
                speed_rpm: self.speed_rpm,
                blade_angle_deg: self.blade_angle_deg,
                drive_train,
            },
        })
    }
}

/// Catalogue operations over an open database.
pub struct ModelRegistry<'a> {
    db: &'a Database,
}

impl<'a> ModelRegistry<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Look up a fan model by its model number.
    pub fn resolve(&self, model_number: &str) -> Result<FanModel, RegistryError> {
        let key = model_number.trim();
        let row = self
            .db
            .conn()
            .query_row(
                &format!("{MODEL_SELECT} WHERE m.model_number = ?1"),
                params![key],
                ModelRow::read,
            )
            .optional()?;
        match row {
            Some(row) => Ok(row.into_model()?),
            None => Err(RegistryError::NotFound {
                entity: "Fan model",
                key: key.to_string(),
            }),
        }
    }

    pub fn get(&self, id: FanId) -> Result<FanModel, RegistryError> {
        let row = self
            .db
            .conn()
            .query_row(
                &format!("{MODEL_SELECT} WHERE m.id = ?1"),
                params![id.0],
                ModelRow::read,
            )
            .optional()?;
        match row {
            Some(row) => Ok(row.into_model()?),
            None => Err(RegistryError::NotFound {
                entity: "Fan model",
                key: id.to_string(),
            }),
        }
    }

    /// All fan models ordered by model number.
    pub fn list_models(&self) -> Result<Vec<FanModel>, RegistryError> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(&format!("{MODEL_SELECT} ORDER BY m.model_number"))?;
        let rows = stmt.query_map([], ModelRow::read)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?.into_model()?);
        }
        Ok(out)
    }

    /// Create a fan model. The model number is derived from the spec unless
    /// `model_number` overrides it.
    pub fn create_model(
        &self,
        spec: &FanSpec,
        model_number: Option<&str>,
    ) -> Result<FanModel, RegistryError> {
        let spec = normalize(spec)?;
        let model_number = choose_model_number(&spec, model_number);
        let brand_id = self.brand_id(&spec.brand)?;

        self.db
            .conn()
            .execute(
                "INSERT INTO fan_models
                     (model_number, model_group, brand_id, speed_rpm, blade_angle_deg, drive_train)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    model_number,
                    spec.group,
                    brand_id.0,
                    spec.speed_rpm,
                    spec.blade_angle_deg,
                    spec.drive_train.as_db_str(),
                ],
            )
            .map_err(|e| duplicate_model(e, &model_number))?;

        let id = FanId(self.db.conn().last_insert_rowid());
        info!(%id, model_number = %model_number, "created fan model");
        Ok(FanModel {
            id,
            model_number,
            spec,
        })
    }

    /// Edit a fan model in place; the model number is re-derived unless
    /// `model_number` overrides it.
    pub fn update_model(
        &self,
        id: FanId,
        spec: &FanSpec,
        model_number: Option<&str>,
    ) -> Result<FanModel, RegistryError> {
        self.get(id)?;
        let spec = normalize(spec)?;
        let model_number = choose_model_number(&spec, model_number);
        let brand_id = self.brand_id(&spec.brand)?;

        self.db
            .conn()
            .execute(
                "UPDATE fan_models
                 SET model_number = ?2, model_group = ?3, brand_id = ?4,
                     speed_rpm = ?5, blade_angle_deg = ?6, drive_train = ?7
                 WHERE id = ?1",
                params![
                    id.0,
                    model_number,
                    spec.group,
                    brand_id.0,
                    spec.speed_rpm,
                    spec.blade_angle_deg,
                    spec.drive_train.as_db_str(),
                ],
            )
            .map_err(|e| duplicate_model(e, &model_number))?;

        info!(%id, model_number = %model_number, "updated fan model");
        Ok(FanModel {
            id,
            model_number,
            spec,
        })
    }

    /// Delete a fan model together with its samples and fit artifact.
    pub fn delete_model(&self, id: FanId) -> Result<(), RegistryError> {
        let n = self
            .db
            .conn()
            .execute("DELETE FROM fan_models WHERE id = ?1", params![id.0])?;
        if n == 0 {
            return Err(RegistryError::NotFound {
                entity: "Fan model",
                key: id.to_string(),
            });
        }
        info!(%id, "deleted fan model");
        Ok(())
    }

    pub fn list_brands(&self) -> Result<Vec<Brand>, RegistryError> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare("SELECT id, name FROM brands ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            Ok(Brand {
                id: BrandId(row.get(0)?),
                name: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn add_brand(&self, name: &str) -> Result<Brand, RegistryError> {
        let name = required_name(name)?;
        self.db
            .conn()
            .execute("INSERT INTO brands (name) VALUES (?1)", params![name])
            .map_err(|e| duplicate_brand(e, &name))?;
        let id = BrandId(self.db.conn().last_insert_rowid());
        debug!(brand = %name, "added brand");
        Ok(Brand { id, name })
    }

    pub fn rename_brand(&self, old: &str, new: &str) -> Result<Brand, RegistryError> {
        let old = old.trim();
        let new = required_name(new)?;
        let n = self
            .db
            .conn()
            .execute(
                "UPDATE brands SET name = ?2 WHERE name = ?1",
                params![old, new],
            )
            .map_err(|e| duplicate_brand(e, &new))?;
        if n == 0 {
            return Err(RegistryError::NotFound {
                entity: "Brand",
                key: old.to_string(),
            });
        }
        let id = self.brand_id(&new)?;
        debug!(from = %old, to = %new, "renamed brand");
        Ok(Brand { id, name: new })
    }

    /// Delete an unused brand. Brands still referenced by a fan model are kept.
    pub fn delete_brand(&self, name: &str) -> Result<(), RegistryError> {
        let name = name.trim();
        let n = self
            .db
            .conn()
            .execute("DELETE FROM brands WHERE name = ?1", params![name])
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    RegistryError::Store(StoreError::InUse {
                        entity: "Brand",
                        key: name.to_string(),
                    })
                } else {
                    e.into()
                }
            })?;
        if n == 0 {
            return Err(RegistryError::NotFound {
                entity: "Brand",
                key: name.to_string(),
            });
        }
        debug!(brand = %name, "deleted brand");
        Ok(())
    }

    fn brand_id(&self, name: &str) -> Result<BrandId, RegistryError> {
        let id: Option<i64> = self
            .db
            .conn()
            .query_row(
                "SELECT id FROM brands WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        id.map(BrandId)
            .ok_or_else(|| RegistryError::Validation(format!("Brand '{name}' does not exist.")))
    }
}

fn normalize(spec: &FanSpec) -> Result<FanSpec, RegistryError> {
    spec.validate().map_err(RegistryError::Validation)?;
    Ok(FanSpec {
        group: spec.group.trim().to_string(),
        brand: spec.brand.trim().to_string(),
        ..spec.clone()
    })
}

fn choose_model_number(spec: &FanSpec, model_number: Option<&str>) -> String {
    match model_number.map(str::trim) {
        Some(m) if !m.is_empty() => m.to_string(),
        _ => spec.derived_model_number(),
    }
}

fn required_name(name: &str) -> Result<String, RegistryError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(RegistryError::Validation("Brand name is required.".to_string()));
    }
    Ok(name.to_string())
}

fn duplicate_model(err: rusqlite::Error, model_number: &str) -> RegistryError {
    if is_unique_violation(&err) {
        RegistryError::Store(StoreError::Duplicate {
            entity: "Fan model",
            key: model_number.to_string(),
        })
    } else {
        err.into()
    }
}

fn duplicate_brand(err: rusqlite::Error, name: &str) -> RegistryError {
    if is_unique_violation(&err) {
        RegistryError::Store(StoreError::Duplicate {
            entity: "Brand",
            key: name.to_string(),
        })
    } else {
        err.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Sample;
    use crate::store::SampleStore;

    fn spec(brand: &str) -> FanSpec {
        FanSpec {
            group: "AXF".to_string(),
            brand: brand.to_string(),
            speed_rpm: 1440,
            blade_angle_deg: 25,
            drive_train: DriveTrain::DirectDrive,
        }
    }

    fn setup() -> Database {
        let db = Database::open_in_memory().unwrap();
        ModelRegistry::new(&db).add_brand("Breeze").unwrap();
        db
    }

    #[test]
    fn created_model_resolves_by_derived_number() {
        let db = setup();
        let reg = ModelRegistry::new(&db);
        let created = reg.create_model(&spec("Breeze"), None).unwrap();
        assert_eq!(created.model_number, "AXF-1440rpm-25°");

        let resolved = reg.resolve("AXF-1440rpm-25°").unwrap();
        assert_eq!(resolved, created);
        assert_eq!(reg.get(created.id).unwrap(), created);
    }

    #[test]
    fn resolve_unknown_is_not_found() {
        let db = setup();
        let err = ModelRegistry::new(&db).resolve("nope").unwrap_err();
        assert!(matches!(err, RegistryError::NotFound { .. }));
        assert_eq!(err.kind(), ErrorKind::PreconditionViolation);
    }

    #[test]
    fn duplicate_model_number_is_a_warning() {
        let db = setup();
        let reg = ModelRegistry::new(&db);
        reg.create_model(&spec("Breeze"), None).unwrap();
        let err = reg.create_model(&spec("Breeze"), None).unwrap_err();
        assert!(matches!(err, RegistryError::Store(StoreError::Duplicate { .. })));
        assert_eq!(err.kind(), ErrorKind::ValidationWarning);
        assert_eq!(reg.list_models().unwrap().len(), 1);
    }

    #[test]
    fn invalid_fields_and_unknown_brand_are_rejected() {
        let db = setup();
        let reg = ModelRegistry::new(&db);

        let mut bad = spec("Breeze");
        bad.blade_angle_deg = 12;
        assert!(matches!(reg.create_model(&bad, None), Err(RegistryError::Validation(_))));

        let err = reg.create_model(&spec("Gale"), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationWarning);
    }

    #[test]
    fn update_rederives_model_number_unless_overridden() {
        let db = setup();
        let reg = ModelRegistry::new(&db);
        let m = reg.create_model(&spec("Breeze"), None).unwrap();

        let mut edited = spec("Breeze");
        edited.speed_rpm = 2880;
        let updated = reg.update_model(m.id, &edited, None).unwrap();
        assert_eq!(updated.model_number, "AXF-2880rpm-25°");
        assert!(reg.resolve("AXF-1440rpm-25°").is_err());

        let custom = reg.update_model(m.id, &edited, Some(" AXF-X ")).unwrap();
        assert_eq!(custom.model_number, "AXF-X");
        assert_eq!(reg.resolve("AXF-X").unwrap().id, m.id);
    }

    #[test]
    fn delete_model_cascades_and_missing_is_not_found() {
        let db = setup();
        let reg = ModelRegistry::new(&db);
        let m = reg.create_model(&spec("Breeze"), None).unwrap();
        db.save_samples(m.id, &[Sample::new(1.0, 2.0)]).unwrap();

        reg.delete_model(m.id).unwrap();
        assert!(matches!(db.load_samples(m.id), Err(StoreError::UnknownModel(_))));
        assert!(matches!(reg.delete_model(m.id), Err(RegistryError::NotFound { .. })));
    }

    #[test]
    fn brand_lifecycle() {
        let db = setup();
        let reg = ModelRegistry::new(&db);

        assert!(matches!(
            reg.add_brand(" Breeze "),
            Err(RegistryError::Store(StoreError::Duplicate { .. }))
        ));
        assert!(matches!(reg.add_brand("  "), Err(RegistryError::Validation(_))));

        reg.add_brand("Gale").unwrap();
        let renamed = reg.rename_brand("Gale", "Zephyr").unwrap();
        assert_eq!(renamed.name, "Zephyr");
        assert!(matches!(
            reg.rename_brand("Zephyr", "Breeze"),
            Err(RegistryError::Store(StoreError::Duplicate { .. }))
        ));

        let names: Vec<String> = reg.list_brands().unwrap().into_iter().map(|b| b.name).collect();
        assert_eq!(names, vec!["Breeze", "Zephyr"]);

        reg.delete_brand("Zephyr").unwrap();
        assert!(matches!(reg.delete_brand("Zephyr"), Err(RegistryError::NotFound { .. })));
    }

    #[test]
    fn brand_in_use_cannot_be_deleted() {
        let db = setup();
        let reg = ModelRegistry::new(&db);
        reg.create_model(&spec("Breeze"), None).unwrap();

        let err = reg.delete_brand("Breeze").unwrap_err();
        assert!(matches!(err, RegistryError::Store(StoreError::InUse { .. })));
        assert_eq!(err.kind(), ErrorKind::ValidationWarning);
        assert_eq!(reg.list_brands().unwrap().len(), 1);
    }
}
