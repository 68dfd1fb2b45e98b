use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PendingEmails::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PendingEmails::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PendingEmails::Sender).string().not_null())
                    .col(ColumnDef::new(PendingEmails::Recipient).string().not_null())
                    .col(ColumnDef::new(PendingEmails::Subject).string().not_null())
                    .col(ColumnDef::new(PendingEmails::Html).text().not_null())
                    .col(ColumnDef::new(PendingEmails::Text).text().not_null())
                    .col(
                        ColumnDef::new(PendingEmails::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PendingEmails::SentAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // Sender drains unsent rows oldest first.
        manager
            .create_index(
                Index::create()
                    .table(PendingEmails::Table)
                    .col(PendingEmails::SentAt)
                    .col(PendingEmails::CreatedAt)
                    .name("idx_pending_emails_unsent")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PendingEmails::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum PendingEmails {
    Table,
    Id,
    Sender,
    Recipient,
    Subject,
    Html,
    Text,
    CreatedAt,
    SentAt,
}
