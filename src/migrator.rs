use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_clients_table::Migration),
            Box::new(m20240101_000002_create_orders_table::Migration),
            Box::new(m20240101_000003_create_order_items_table::Migration),
            Box::new(m20240101_000004_create_routes_table::Migration),
            Box::new(m20240101_000005_create_route_orders_table::Migration),
            Box::new(m20240101_000006_create_returns_table::Migration),
            Box::new(m20240101_000007_create_export_batches_table::Migration),
            Box::new(m20240101_000008_create_number_sequences_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240101_000001_create_clients_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_clients_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Clients::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Clients::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Clients::Name).string().not_null())
                        .col(ColumnDef::new(Clients::BillingType).string().not_null())
                        .col(ColumnDef::new(Clients::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Clients::UpdatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Clients::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Clients {
        Table,
        Id,
        Name,
        BillingType,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_orders_table {

    use sea_orm_migration::prelude::*;

    use super::m20240101_000001_create_clients_table::Clients;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_orders_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Orders::OrderNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Orders::ClientId).uuid().not_null())
                        .col(ColumnDef::new(Orders::BranchId).uuid().not_null())
                        .col(ColumnDef::new(Orders::Status).string().not_null())
                        .col(
                            ColumnDef::new(Orders::ExpectedDeliveryDate)
                                .date()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::RequestedDeliveryDate)
                                .date()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::TotalValue)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Orders::IsInvoiced)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Orders::IsInvoicedFromRemision)
                                .boolean()
                                .null(),
                        )
                        .col(ColumnDef::new(Orders::InvoicedAt).timestamp().null())
                        .col(ColumnDef::new(Orders::AssignedRouteId).uuid().null())
                        .col(
                            ColumnDef::new(Orders::DeliveryEvidenceRef)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(Orders::Observations).string().null())
                        .col(ColumnDef::new(Orders::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Orders::UpdatedAt).timestamp().not_null())
                        .col(
                            ColumnDef::new(Orders::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_client_id")
                                .from(Orders::Table, Orders::ClientId)
                                .to(Clients::Table, Clients::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_status")
                        .table(Orders::Table)
                        .col(Orders::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_client_id")
                        .table(Orders::Table)
                        .col(Orders::ClientId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_assigned_route_id")
                        .table(Orders::Table)
                        .col(Orders::AssignedRouteId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Orders {
        Table,
        Id,
        OrderNumber,
        ClientId,
        BranchId,
        Status,
        ExpectedDeliveryDate,
        RequestedDeliveryDate,
        TotalValue,
        IsInvoiced,
        IsInvoicedFromRemision,
        InvoicedAt,
        AssignedRouteId,
        DeliveryEvidenceRef,
        Observations,
        CreatedAt,
        UpdatedAt,
        Version,
    }
}

mod m20240101_000003_create_order_items_table {

    use sea_orm_migration::prelude::*;

    use super::m20240101_000002_create_orders_table::Orders;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_order_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderItems::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::ProductId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::LineNumber).integer().not_null())
                        .col(
                            ColumnDef::new(OrderItems::QuantityRequested)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderItems::QuantityAvailable)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(OrderItems::QuantityDispatched)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(OrderItems::QuantityDelivered)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(OrderItems::QuantityReturned)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(OrderItems::AvailabilityStatus)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderItems::UnitPrice).decimal().not_null())
                        .col(ColumnDef::new(OrderItems::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(OrderItems::UpdatedAt).timestamp().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_order_id")
                                .from(OrderItems::Table, OrderItems::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_items_order_id")
                        .table(OrderItems::Table)
                        .col(OrderItems::OrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum OrderItems {
        Table,
        Id,
        OrderId,
        ProductId,
        LineNumber,
        QuantityRequested,
        QuantityAvailable,
        QuantityDispatched,
        QuantityDelivered,
        QuantityReturned,
        AvailabilityStatus,
        UnitPrice,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000004_create_routes_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_routes_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Routes::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Routes::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Routes::RouteNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Routes::RouteName).string().not_null())
                        .col(ColumnDef::new(Routes::RouteDate).date().not_null())
                        .col(ColumnDef::new(Routes::DriverId).uuid().not_null())
                        .col(ColumnDef::new(Routes::VehicleId).uuid().not_null())
                        .col(ColumnDef::new(Routes::Status).string().not_null())
                        .col(ColumnDef::new(Routes::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Routes::UpdatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_routes_route_date")
                        .table(Routes::Table)
                        .col(Routes::RouteDate)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Routes::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Routes {
        Table,
        Id,
        RouteNumber,
        RouteName,
        RouteDate,
        DriverId,
        VehicleId,
        Status,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000005_create_route_orders_table {

    use sea_orm_migration::prelude::*;

    use super::m20240101_000002_create_orders_table::Orders;
    use super::m20240101_000004_create_routes_table::Routes;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_route_orders_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // No unique index on (route_id, delivery_sequence): the adjacent
            // swap writes both rows inside one transaction and the invariant
            // is enforced there.
            manager
                .create_table(
                    Table::create()
                        .table(RouteOrders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(RouteOrders::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(RouteOrders::RouteId).uuid().not_null())
                        .col(
                            ColumnDef::new(RouteOrders::OrderId)
                                .uuid()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(RouteOrders::DeliverySequence)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RouteOrders::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_route_orders_route_id")
                                .from(RouteOrders::Table, RouteOrders::RouteId)
                                .to(Routes::Table, Routes::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_route_orders_order_id")
                                .from(RouteOrders::Table, RouteOrders::OrderId)
                                .to(Orders::Table, Orders::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_route_orders_route_id")
                        .table(RouteOrders::Table)
                        .col(RouteOrders::RouteId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(RouteOrders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum RouteOrders {
        Table,
        Id,
        RouteId,
        OrderId,
        DeliverySequence,
        CreatedAt,
    }
}

mod m20240101_000006_create_returns_table {

    use sea_orm_migration::prelude::*;

    use super::m20240101_000002_create_orders_table::Orders;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000006_create_returns_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Returns::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Returns::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Returns::OrderId).uuid().not_null())
                        .col(ColumnDef::new(Returns::ProductId).uuid().not_null())
                        .col(
                            ColumnDef::new(Returns::QuantityReturned)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Returns::Reason).string().not_null())
                        .col(ColumnDef::new(Returns::ReasonNote).string().null())
                        .col(ColumnDef::new(Returns::RouteId).uuid().not_null())
                        .col(ColumnDef::new(Returns::CreatedAt).timestamp().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_returns_order_id")
                                .from(Returns::Table, Returns::OrderId)
                                .to(Orders::Table, Orders::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_returns_order_id")
                        .table(Returns::Table)
                        .col(Returns::OrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Returns::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Returns {
        Table,
        Id,
        OrderId,
        ProductId,
        QuantityReturned,
        Reason,
        ReasonNote,
        RouteId,
        CreatedAt,
    }
}

mod m20240101_000007_create_export_batches_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000007_create_export_batches_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ExportBatches::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ExportBatches::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ExportBatches::Cohort).string().not_null())
                        .col(ColumnDef::new(ExportBatches::RouteIds).json().not_null())
                        .col(ColumnDef::new(ExportBatches::OrderIds).json().not_null())
                        .col(
                            ColumnDef::new(ExportBatches::InvoiceNumberStart)
                                .big_integer()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ExportBatches::InvoiceNumberEnd)
                                .big_integer()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ExportBatches::TotalOrders)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ExportBatches::TotalAmount)
                                .decimal()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ExportBatches::CreatedBy).uuid().not_null())
                        .col(ColumnDef::new(ExportBatches::DocumentRef).string().null())
                        .col(
                            ColumnDef::new(ExportBatches::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ExportBatches::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum ExportBatches {
        Table,
        Id,
        Cohort,
        RouteIds,
        OrderIds,
        InvoiceNumberStart,
        InvoiceNumberEnd,
        TotalOrders,
        TotalAmount,
        CreatedBy,
        DocumentRef,
        CreatedAt,
    }
}

mod m20240101_000008_create_number_sequences_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000008_create_number_sequences_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(NumberSequences::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(NumberSequences::Name)
                                .string()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(NumberSequences::NextNumber)
                                .big_integer()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(NumberSequences::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum NumberSequences {
        Table,
        Name,
        NextNumber,
    }
}
