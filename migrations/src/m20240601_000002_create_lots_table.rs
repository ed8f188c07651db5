use sea_orm_migration::prelude::*;

use crate::m20240601_000001_create_catalog_tables::Products;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Lots::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Lots::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(Lots::ProductId).uuid().not_null())
                    .col(ColumnDef::new(Lots::LotCode).string().not_null())
                    .col(ColumnDef::new(Lots::ExpiresOn).date().null())
                    .col(
                        ColumnDef::new(Lots::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Lots::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_lots_product_id")
                            .from(Lots::Table, Lots::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_lots_product_lot_code")
                    .table(Lots::Table)
                    .col(Lots::ProductId)
                    .col(Lots::LotCode)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Lots::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(crate) enum Lots {
    Table,
    Id,
    ProductId,
    LotCode,
    ExpiresOn,
    CreatedAt,
    UpdatedAt,
}
