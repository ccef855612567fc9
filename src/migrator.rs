use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260101_000001_create_reference_order_tables::Migration),
            Box::new(m20260101_000002_create_stock_tables::Migration),
            Box::new(m20260101_000003_create_order_target_tables::Migration),
            Box::new(m20260101_000004_create_worksheet_tables::Migration),
            Box::new(m20260101_000005_create_lookup_indexes::Migration),
        ]
    }
}

// Tables are derived from the entity definitions so the schema cannot drift
// from the models the engine reads and writes.

mod m20260101_000001_create_reference_order_tables {
    use crate::entities::{arrival_notice, delivery_order, inventory_check, release_good, vas_order};
    use sea_orm::Schema;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000001_create_reference_order_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let schema = Schema::new(manager.get_database_backend());
            manager
                .create_table(schema.create_table_from_entity(arrival_notice::Entity).if_not_exists().to_owned())
                .await?;
            manager
                .create_table(schema.create_table_from_entity(release_good::Entity).if_not_exists().to_owned())
                .await?;
            manager
                .create_table(schema.create_table_from_entity(vas_order::Entity).if_not_exists().to_owned())
                .await?;
            manager
                .create_table(schema.create_table_from_entity(inventory_check::Entity).if_not_exists().to_owned())
                .await?;
            manager
                .create_table(schema.create_table_from_entity(delivery_order::Entity).if_not_exists().to_owned())
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(delivery_order::Entity).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(inventory_check::Entity).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(vas_order::Entity).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(release_good::Entity).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(arrival_notice::Entity).to_owned())
                .await
        }
    }
}

mod m20260101_000002_create_stock_tables {
    use crate::entities::{inventory, inventory_history, location};
    use sea_orm::Schema;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000002_create_stock_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let schema = Schema::new(manager.get_database_backend());
            manager
                .create_table(schema.create_table_from_entity(location::Entity).if_not_exists().to_owned())
                .await?;
            manager
                .create_table(schema.create_table_from_entity(inventory::Entity).if_not_exists().to_owned())
                .await?;
            manager
                .create_table(schema.create_table_from_entity(inventory_history::Entity).if_not_exists().to_owned())
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(inventory_history::Entity).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(inventory::Entity).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(location::Entity).to_owned())
                .await
        }
    }
}

mod m20260101_000003_create_order_target_tables {
    use crate::entities::{order_inventory, order_product, order_vas};
    use sea_orm::Schema;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000003_create_order_target_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let schema = Schema::new(manager.get_database_backend());
            manager
                .create_table(schema.create_table_from_entity(order_product::Entity).if_not_exists().to_owned())
                .await?;
            manager
                .create_table(schema.create_table_from_entity(order_inventory::Entity).if_not_exists().to_owned())
                .await?;
            manager
                .create_table(schema.create_table_from_entity(order_vas::Entity).if_not_exists().to_owned())
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(order_vas::Entity).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(order_inventory::Entity).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(order_product::Entity).to_owned())
                .await
        }
    }
}

mod m20260101_000004_create_worksheet_tables {
    use crate::entities::{worksheet, worksheet_detail};
    use sea_orm::Schema;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000004_create_worksheet_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let schema = Schema::new(manager.get_database_backend());
            manager
                .create_table(schema.create_table_from_entity(worksheet::Entity).if_not_exists().to_owned())
                .await?;
            manager
                .create_table(schema.create_table_from_entity(worksheet_detail::Entity).if_not_exists().to_owned())
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(worksheet_detail::Entity).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(worksheet::Entity).to_owned())
                .await
        }
    }
}

mod m20260101_000005_create_lookup_indexes {
    use crate::entities::{inventory, order_inventory, worksheet, worksheet_detail};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000005_create_lookup_indexes"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_worksheets_ref_order")
                        .table(worksheet::Entity)
                        .col(worksheet::Column::RefOrderKind)
                        .col(worksheet::Column::RefOrderId)
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_worksheet_details_worksheet")
                        .table(worksheet_detail::Entity)
                        .col(worksheet_detail::Column::WorksheetId)
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_inventories_ref_order")
                        .table(order_inventory::Entity)
                        .col(order_inventory::Column::RefOrderId)
                        .col(order_inventory::Column::Status)
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventories_pallet")
                        .table(inventory::Entity)
                        .col(inventory::Column::DomainId)
                        .col(inventory::Column::PalletId)
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventories_location_status")
                        .table(inventory::Entity)
                        .col(inventory::Column::LocationId)
                        .col(inventory::Column::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_index(
                    Index::drop()
                        .name("idx_inventories_location_status")
                        .table(inventory::Entity)
                        .to_owned(),
                )
                .await?;
            manager
                .drop_index(
                    Index::drop()
                        .name("idx_inventories_pallet")
                        .table(inventory::Entity)
                        .to_owned(),
                )
                .await?;
            manager
                .drop_index(
                    Index::drop()
                        .name("idx_order_inventories_ref_order")
                        .table(order_inventory::Entity)
                        .to_owned(),
                )
                .await?;
            manager
                .drop_index(
                    Index::drop()
                        .name("idx_worksheet_details_worksheet")
                        .table(worksheet_detail::Entity)
                        .to_owned(),
                )
                .await?;
            manager
                .drop_index(
                    Index::drop()
                        .name("idx_worksheets_ref_order")
                        .table(worksheet::Entity)
                        .to_owned(),
                )
                .await
        }
    }
}
