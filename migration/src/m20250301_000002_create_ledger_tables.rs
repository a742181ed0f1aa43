use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Donations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Donations::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Donations::DonorId).big_integer().not_null())
                    .col(ColumnDef::new(Donations::NgoId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Donations::Amount)
                            .decimal_len(16, 6)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Donations::Currency).string_len(8).not_null())
                    .col(
                        ColumnDef::new(Donations::TransactionHash)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Donations::Status).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Donations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // A charge code may complete at most one donation. Webhook inserts
        // target this index with ON CONFLICT DO NOTHING.
        manager
            .create_index(
                Index::create()
                    .name("idx_donations_charge_status")
                    .table(Donations::Table)
                    .col(Donations::TransactionHash)
                    .col(Donations::Status)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_donations_ngo")
                    .table(Donations::Table)
                    .col(Donations::NgoId)
                    .col(Donations::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_donations_donor")
                    .table(Donations::Table)
                    .col(Donations::DonorId)
                    .col(Donations::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Withdrawals::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Withdrawals::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Withdrawals::NgoId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Withdrawals::Amount)
                            .decimal_len(16, 6)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Withdrawals::Purpose).text().not_null())
                    .col(ColumnDef::new(Withdrawals::Status).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Withdrawals::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_withdrawals_ngo")
                    .table(Withdrawals::Table)
                    .col(Withdrawals::NgoId)
                    .col(Withdrawals::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Withdrawals::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Donations::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Donations {
    Table,
    Id,
    DonorId,
    NgoId,
    Amount,
    Currency,
    TransactionHash,
    Status,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Withdrawals {
    Table,
    Id,
    NgoId,
    Amount,
    Purpose,
    Status,
    CreatedAt,
}
