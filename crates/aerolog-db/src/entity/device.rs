//! device entity for database storage.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::NotSet, Set};

use aerolog_types::{Device, DeviceId, MacAddr, UserId};

use crate::Error;

/// device database model.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "devices")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// canonical mac address, unique.
    pub mac: String,
    pub name: String,
    pub location: String,
    pub user_id: i64,
    pub registered_at: DateTime<Utc>,
    pub last_seen_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    #[sea_orm(has_many = "super::device_user::Entity")]
    DeviceUsers,
    #[sea_orm(has_many = "super::measurement::Entity")]
    Measurements,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::device_user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeviceUsers.def()
    }
}

impl Related<super::measurement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Measurements.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// the stored mac is always canonical (written through MacAddr), so a
// parse failure here means corrupted data and surfaces as InvalidData.
impl TryFrom<Model> for Device {
    type Error = Error;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let mac = MacAddr::new(&model.mac)
            .map_err(|e| Error::InvalidData(format!("device {} mac: {}", model.id, e)))?;
        Ok(Device {
            id: DeviceId(model.id as u64),
            mac,
            name: model.name,
            location: model.location,
            user_id: UserId(model.user_id as u64),
            registered_at: model.registered_at,
            last_seen_at: model.last_seen_at,
        })
    }
}

impl From<&Device> for ActiveModel {
    fn from(device: &Device) -> Self {
        ActiveModel {
            id: if device.id.0 == 0 {
                NotSet
            } else {
                Set(device.id.0 as i64)
            },
            mac: Set(device.mac.as_str().to_string()),
            name: Set(device.name.clone()),
            location: Set(device.location.clone()),
            user_id: Set(device.user_id.0 as i64),
            registered_at: Set(device.registered_at),
            last_seen_at: Set(device.last_seen_at),
        }
    }
}
