use sea_orm_migration::prelude::*;

// Roster rows are only visible inside the school selected by `with_tenant`.
const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS teacher_assignments (
    id uuid PRIMARY KEY DEFAULT gen_random_uuid(),
    school_id uuid NOT NULL REFERENCES schools(id) ON DELETE CASCADE,
    teacher_id uuid NOT NULL,
    class_id uuid NOT NULL,
    subject_id uuid NULL,
    created_at timestamptz NOT NULL DEFAULT now()
);

CREATE UNIQUE INDEX IF NOT EXISTS teacher_assignments_unique
    ON teacher_assignments (school_id, teacher_id, class_id, coalesce(subject_id, '00000000-0000-0000-0000-000000000000'::uuid));
CREATE INDEX IF NOT EXISTS teacher_assignments_by_teacher
    ON teacher_assignments (school_id, teacher_id);

ALTER TABLE teacher_assignments ENABLE ROW LEVEL SECURITY;
ALTER TABLE teacher_assignments FORCE ROW LEVEL SECURITY;
CREATE POLICY school_isolation ON teacher_assignments
    USING (school_id = current_school())
    WITH CHECK (school_id = current_school());
"#;

const DOWN_SQL: &str = r#"
DROP POLICY IF EXISTS school_isolation ON teacher_assignments;
ALTER TABLE teacher_assignments DISABLE ROW LEVEL SECURITY;
DROP TABLE IF EXISTS teacher_assignments CASCADE;
"#;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(UP_SQL)
            .await
            .map(|_| ())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(DOWN_SQL)
            .await
            .map(|_| ())
    }
}
