//! measurement entity for database storage.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::NotSet, Set};

use aerolog_types::{DeviceId, LinkId, Measurement, MeasurementId, UserId};

/// measurement database model.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "measurements")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub device_id: i64,
    pub user_id: i64,
    pub link_id: i64,
    pub co2: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::device::Entity",
        from = "Column::DeviceId",
        to = "super::device::Column::Id"
    )]
    Device,
}

impl Related<super::device::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Device.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Measurement {
    fn from(model: Model) -> Self {
        Measurement {
            id: MeasurementId(model.id as u64),
            device_id: DeviceId(model.device_id as u64),
            user_id: UserId(model.user_id as u64),
            link_id: LinkId(model.link_id as u64),
            co2: model.co2,
            temperature: model.temperature,
            humidity: model.humidity,
            recorded_at: model.recorded_at,
        }
    }
}

impl From<&Measurement> for ActiveModel {
    fn from(m: &Measurement) -> Self {
        ActiveModel {
            id: if m.id.0 == 0 { NotSet } else { Set(m.id.0 as i64) },
            device_id: Set(m.device_id.0 as i64),
            user_id: Set(m.user_id.0 as i64),
            link_id: Set(m.link_id.0 as i64),
            co2: Set(m.co2),
            temperature: Set(m.temperature),
            humidity: Set(m.humidity),
            recorded_at: Set(m.recorded_at),
        }
    }
}
