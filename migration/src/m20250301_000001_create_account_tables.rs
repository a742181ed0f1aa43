use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Username).string_len(64).not_null())
                    .col(ColumnDef::new(Users::PasswordHash).text().not_null())
                    .col(ColumnDef::new(Users::Role).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_users_username")
                    .table(Users::Table)
                    .col(Users::Username)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Ngos::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Ngos::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Ngos::UserId).big_integer().not_null())
                    .col(ColumnDef::new(Ngos::Name).string_len(128).not_null())
                    .col(ColumnDef::new(Ngos::Description).text().not_null())
                    .col(
                        ColumnDef::new(Ngos::RegistrationNumber)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Ngos::Sector).string_len(64).not_null())
                    .col(ColumnDef::new(Ngos::Location).string_len(128).not_null())
                    .col(ColumnDef::new(Ngos::ContactEmail).string_len(254).not_null())
                    .col(ColumnDef::new(Ngos::ContactPhone).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Ngos::ImpactScore)
                            .decimal_len(6, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Ngos::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // One NGO per owning user
        manager
            .create_index(
                Index::create()
                    .name("idx_ngos_user_id")
                    .table(Ngos::Table)
                    .col(Ngos::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Ngos::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    PasswordHash,
    Role,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Ngos {
    Table,
    Id,
    UserId,
    Name,
    Description,
    RegistrationNumber,
    Sector,
    Location,
    ContactEmail,
    ContactPhone,
    ImpactScore,
    CreatedAt,
}
