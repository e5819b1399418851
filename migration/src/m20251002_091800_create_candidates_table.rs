use sea_orm_migration::prelude::*;

use crate::m20251002_091200_create_users_table::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Candidates::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Candidates::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Candidates::Name).string().null())
                    .col(ColumnDef::new(Candidates::Role).string().null())
                    .col(ColumnDef::new(Candidates::Email).string().null())
                    .col(ColumnDef::new(Candidates::MobileNumber).string().null())
                    // Importer truncates to SKILLS_MAX_LEN, which must stay within this width
                    .col(ColumnDef::new(Candidates::Skills).string_len(2000).null())
                    .col(
                        ColumnDef::new(Candidates::YearsOfExperience)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(ColumnDef::new(Candidates::Score1).integer().not_null().default(0))
                    .col(ColumnDef::new(Candidates::Score2).integer().not_null().default(0))
                    .col(ColumnDef::new(Candidates::Score3).integer().not_null().default(0))
                    .col(ColumnDef::new(Candidates::Score4).integer().not_null().default(0))
                    .col(ColumnDef::new(Candidates::OwnerId).integer().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_candidates_owner_id")
                            .from(Candidates::Table, Candidates::OwnerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("candidates_owner_id_idx")
                    .table(Candidates::Table)
                    .col(Candidates::OwnerId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Candidates::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Candidates {
    Table,
    Id,
    Name,
    Role,
    Email,
    MobileNumber,
    Skills,
    YearsOfExperience,
    #[sea_orm(iden = "score_1")]
    Score1,
    #[sea_orm(iden = "score_2")]
    Score2,
    #[sea_orm(iden = "score_3")]
    Score3,
    #[sea_orm(iden = "score_4")]
    Score4,
    OwnerId,
}
