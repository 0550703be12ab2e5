use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AttendanceRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AttendanceRecords::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AttendanceRecords::RegistrationId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AttendanceRecords::Present)
                            .boolean()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AttendanceRecords::MarkedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AttendanceRecords::MarkedBy)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AttendanceRecords::Notes).text())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_attendance_records_registration_id")
                            .from(
                                AttendanceRecords::Table,
                                AttendanceRecords::RegistrationId,
                            )
                            .to(Registrations::Table, Registrations::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One ledger row per registration. Concurrent first scans race on
        // this index instead of creating two rows.
        manager
            .create_index(
                Index::create()
                    .name("uidx_attendance_records_registration_id")
                    .table(AttendanceRecords::Table)
                    .col(AttendanceRecords::RegistrationId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AttendanceRecords::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Registrations {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum AttendanceRecords {
    Table,
    Id,
    RegistrationId,
    Present,
    MarkedAt,
    MarkedBy,
    Notes,
}
