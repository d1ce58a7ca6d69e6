//! create measurements table migration.

use sea_orm_migration::prelude::*;

use super::m20260301_000002_create_devices::Devices;
use super::m20260301_000003_create_device_users::DeviceUsers;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Measurements::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Measurements::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Measurements::DeviceId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Measurements::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Measurements::LinkId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Measurements::Co2).double().not_null())
                    .col(
                        ColumnDef::new(Measurements::Temperature)
                            .double()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Measurements::Humidity).double().not_null())
                    .col(
                        ColumnDef::new(Measurements::RecordedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_measurements_device")
                            .from(Measurements::Table, Measurements::DeviceId)
                            .to(Devices::Table, Devices::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_measurements_link")
                            .from(Measurements::Table, Measurements::LinkId)
                            .to(DeviceUsers::Table, DeviceUsers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // time-ordered reads per device and per user
        manager
            .create_index(
                Index::create()
                    .name("idx_measurements_device_recorded")
                    .table(Measurements::Table)
                    .col(Measurements::DeviceId)
                    .col(Measurements::RecordedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_measurements_user_recorded")
                    .table(Measurements::Table)
                    .col(Measurements::UserId)
                    .col(Measurements::RecordedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Measurements::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Measurements {
    Table,
    Id,
    DeviceId,
    UserId,
    LinkId,
    Co2,
    Temperature,
    Humidity,
    RecordedAt,
}
