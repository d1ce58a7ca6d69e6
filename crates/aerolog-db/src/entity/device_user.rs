//! device-user link entity for database storage.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::NotSet, Set};

use aerolog_types::{DeviceId, DeviceUserLink, LinkId, UserId};

/// device-user link database model.
///
/// (device_id, user_id) is unique; `api_key_hash` holds the hex-encoded
/// sha-256 of the issued device key, or null before enrollment.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "device_users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub device_id: i64,
    pub user_id: i64,
    pub api_key_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::device::Entity",
        from = "Column::DeviceId",
        to = "super::device::Column::Id"
    )]
    Device,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::device::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Device.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for DeviceUserLink {
    fn from(model: Model) -> Self {
        DeviceUserLink {
            id: LinkId(model.id as u64),
            device_id: DeviceId(model.device_id as u64),
            user_id: UserId(model.user_id as u64),
            api_key_hash: model.api_key_hash,
            created_at: model.created_at,
        }
    }
}

impl From<&DeviceUserLink> for ActiveModel {
    fn from(link: &DeviceUserLink) -> Self {
        ActiveModel {
            id: if link.id.0 == 0 {
                NotSet
            } else {
                Set(link.id.0 as i64)
            },
            device_id: Set(link.device_id.0 as i64),
            user_id: Set(link.user_id.0 as i64),
            api_key_hash: Set(link.api_key_hash.clone()),
            created_at: Set(link.created_at),
        }
    }
}
