use sea_orm_migration::prelude::*;

use crate::m20240601_000001_create_catalog_tables::{Locations, Products};
use crate::m20240601_000002_create_lots_table::Lots;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Append-only ledger. Rows are never updated or deleted by the service.
        manager
            .create_table(
                Table::create()
                    .table(StockMovements::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StockMovements::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(StockMovements::ProductId).uuid().not_null())
                    .col(
                        ColumnDef::new(StockMovements::Quantity)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockMovements::MovementType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(StockMovements::LocationId).uuid().null())
                    // Nullable for rows that predate mandatory lot tracking.
                    .col(ColumnDef::new(StockMovements::LotId).uuid().null())
                    .col(ColumnDef::new(StockMovements::Reference).string().null())
                    .col(ColumnDef::new(StockMovements::Reason).text().null())
                    .col(
                        ColumnDef::new(StockMovements::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_stock_movements_product_id")
                            .from(StockMovements::Table, StockMovements::ProductId)
                            .to(Products::Table, Products::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_stock_movements_location_id")
                            .from(StockMovements::Table, StockMovements::LocationId)
                            .to(Locations::Table, Locations::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_stock_movements_lot_id")
                            .from(StockMovements::Table, StockMovements::LotId)
                            .to(Lots::Table, Lots::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_stock_movements_product_location")
                    .table(StockMovements::Table)
                    .col(StockMovements::ProductId)
                    .col(StockMovements::LocationId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_stock_movements_created_at")
                    .table(StockMovements::Table)
                    .col(StockMovements::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_stock_movements_reference")
                    .table(StockMovements::Table)
                    .col(StockMovements::Reference)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StockMovements::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum StockMovements {
    Table,
    Id,
    ProductId,
    Quantity,
    MovementType,
    LocationId,
    LotId,
    Reference,
    Reason,
    CreatedAt,
}
