//! create device_users table migration.

use sea_orm_migration::prelude::*;

use super::m20260301_000001_create_users::Users;
use super::m20260301_000002_create_devices::Devices;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DeviceUsers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DeviceUsers::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(DeviceUsers::DeviceId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DeviceUsers::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DeviceUsers::ApiKeyHash).string())
                    .col(
                        ColumnDef::new(DeviceUsers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_device_users_device")
                            .from(DeviceUsers::Table, DeviceUsers::DeviceId)
                            .to(Devices::Table, Devices::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_device_users_user")
                            .from(DeviceUsers::Table, DeviceUsers::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // at most one link per (device, user) pair
        manager
            .create_index(
                Index::create()
                    .name("idx_device_users_device_user")
                    .table(DeviceUsers::Table)
                    .col(DeviceUsers::DeviceId)
                    .col(DeviceUsers::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_device_users_user_id")
                    .table(DeviceUsers::Table)
                    .col(DeviceUsers::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DeviceUsers::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum DeviceUsers {
    Table,
    Id,
    DeviceId,
    UserId,
    ApiKeyHash,
    CreatedAt,
}
