use std::str::FromStr;

use anyhow::Context;
use chrono::NaiveDate;
use sqlx::postgres::{PgListener, PgRow};
use sqlx::{PgPool, Row};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::feed::{Change, ChangeEvent, ChangeFeed, ChangeKind, Record, Table, CHANGE_CHANNEL};
use crate::models::{
    CollaborationStatus, Company, CompanyInteraction, CompanyStatus, InteractionType, Placement,
    PlacementOfficer, PlacementProgress, PlacementStatus, Role, School, Snapshot, Student,
    StudentStatus, User,
};

const SCHOOL_COLUMNS: &str = "id, name, location, project_lead_id";
const STUDENT_COLUMNS: &str = "id, name, email, phone, course, course_specialization, school_id, \
     placement_status, student_status, interviews_attended, interview_results, created_at";
const COMPANY_COLUMNS: &str = "id, name, contact_person, contact_email, contact_phone, \
     collaboration_status, company_status, job_roles_offered, created_at";
const OFFICER_COLUMNS: &str = "id, name, email, phone, school_id";
const USER_COLUMNS: &str = "id, name, email, phone, role, school_id";
const INTERACTION_COLUMNS: &str =
    "id, company_id, placement_officer_id, interaction_type, description, interaction_date";
const PLACEMENT_SELECT: &str = "SELECT p.id, p.student_id, s.name AS student_name, \
     p.company_id, c.name AS company_name, \
     p.placement_officer_id, o.name AS placement_officer_name, \
     p.placement_date, p.started_on, p.status \
     FROM placement_admin.placements p \
     LEFT JOIN placement_admin.students s ON s.id = p.student_id \
     LEFT JOIN placement_admin.companies c ON c.id = p.company_id \
     LEFT JOIN placement_admin.placement_officers o ON o.id = p.placement_officer_id";

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn parse_column<T>(row: &PgRow, column: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.try_get(column)?;
    raw.parse()
        .with_context(|| format!("unexpected value in column {column}"))
}

fn school_from_row(row: &PgRow) -> anyhow::Result<School> {
    Ok(School {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        location: row.try_get("location")?,
        project_lead_id: row.try_get("project_lead_id")?,
    })
}

fn student_from_row(row: &PgRow) -> anyhow::Result<Student> {
    Ok(Student {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        course: row.try_get("course")?,
        course_specialization: row.try_get("course_specialization")?,
        school_id: row.try_get("school_id")?,
        placement_status: parse_column(row, "placement_status")?,
        student_status: parse_column(row, "student_status")?,
        interviews_attended: row
            .try_get::<Option<i32>, _>("interviews_attended")?
            .unwrap_or(0),
        interview_results: row.try_get("interview_results")?,
        created_at: row.try_get("created_at")?,
    })
}

fn company_from_row(row: &PgRow) -> anyhow::Result<Company> {
    Ok(Company {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        contact_person: row.try_get("contact_person")?,
        contact_email: row.try_get("contact_email")?,
        contact_phone: row.try_get("contact_phone")?,
        collaboration_status: parse_column(row, "collaboration_status")?,
        company_status: parse_column(row, "company_status")?,
        job_roles_offered: row
            .try_get::<Option<Vec<String>>, _>("job_roles_offered")?
            .unwrap_or_default(),
        created_at: row.try_get("created_at")?,
    })
}

fn officer_from_row(row: &PgRow) -> anyhow::Result<PlacementOfficer> {
    Ok(PlacementOfficer {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        school_id: row.try_get("school_id")?,
    })
}

fn user_from_row(row: &PgRow) -> anyhow::Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        role: Role::from(row.try_get::<String, _>("role")?),
        school_id: row.try_get("school_id")?,
    })
}

fn placement_from_row(row: &PgRow) -> anyhow::Result<Placement> {
    Ok(Placement {
        id: row.try_get("id")?,
        student_id: row.try_get("student_id")?,
        student_name: row.try_get("student_name")?,
        company_id: row.try_get("company_id")?,
        company_name: row.try_get("company_name")?,
        placement_officer_id: row.try_get("placement_officer_id")?,
        placement_officer_name: row.try_get("placement_officer_name")?,
        placement_date: row.try_get("placement_date")?,
        started_on: row.try_get("started_on")?,
        status: PlacementProgress::from(row.try_get::<String, _>("status")?),
    })
}

fn interaction_from_row(row: &PgRow) -> anyhow::Result<CompanyInteraction> {
    Ok(CompanyInteraction {
        id: row.try_get("id")?,
        company_id: row.try_get("company_id")?,
        placement_officer_id: row.try_get("placement_officer_id")?,
        interaction_type: parse_column(row, "interaction_type")?,
        description: row.try_get("description")?,
        interaction_date: row.try_get("interaction_date")?,
    })
}

async fn fetch_rows<T>(
    pool: &PgPool,
    query: &str,
    map: fn(&PgRow) -> anyhow::Result<T>,
) -> anyhow::Result<Vec<T>> {
    let rows = sqlx::query(query).fetch_all(pool).await?;
    rows.iter().map(map).collect()
}

async fn fetch_by_id<T>(
    pool: &PgPool,
    query: &str,
    id: Uuid,
    map: fn(&PgRow) -> anyhow::Result<T>,
) -> anyhow::Result<Option<T>> {
    let row = sqlx::query(query).bind(id).fetch_optional(pool).await?;
    row.as_ref().map(map).transpose()
}

pub async fn fetch_user_by_email(pool: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
    let row = sqlx::query(&format!(
        "SELECT {USER_COLUMNS} FROM placement_admin.users WHERE lower(email) = lower($1)"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(user_from_row).transpose()
}

pub async fn fetch_snapshot(pool: &PgPool) -> anyhow::Result<Snapshot> {
    let snapshot = Snapshot {
        schools: fetch_rows(
            pool,
            &format!("SELECT {SCHOOL_COLUMNS} FROM placement_admin.schools ORDER BY name"),
            school_from_row,
        )
        .await
        .context("failed to load schools")?,
        students: fetch_rows(
            pool,
            &format!("SELECT {STUDENT_COLUMNS} FROM placement_admin.students ORDER BY name"),
            student_from_row,
        )
        .await
        .context("failed to load students")?,
        companies: fetch_rows(
            pool,
            &format!("SELECT {COMPANY_COLUMNS} FROM placement_admin.companies ORDER BY name"),
            company_from_row,
        )
        .await
        .context("failed to load companies")?,
        placements: fetch_rows(
            pool,
            &format!("{PLACEMENT_SELECT} ORDER BY p.placement_date DESC"),
            placement_from_row,
        )
        .await
        .context("failed to load placements")?,
        placement_officers: fetch_rows(
            pool,
            &format!(
                "SELECT {OFFICER_COLUMNS} FROM placement_admin.placement_officers ORDER BY name"
            ),
            officer_from_row,
        )
        .await
        .context("failed to load placement officers")?,
        users: fetch_rows(
            pool,
            &format!("SELECT {USER_COLUMNS} FROM placement_admin.users ORDER BY name"),
            user_from_row,
        )
        .await
        .context("failed to load users")?,
        interactions: fetch_rows(
            pool,
            &format!(
                "SELECT {INTERACTION_COLUMNS} FROM placement_admin.company_interactions \
                 ORDER BY interaction_date DESC"
            ),
            interaction_from_row,
        )
        .await
        .context("failed to load company interactions")?,
    };

    debug!(
        schools = snapshot.schools.len(),
        students = snapshot.students.len(),
        placements = snapshot.placements.len(),
        "snapshot loaded"
    );
    Ok(snapshot)
}

/// Refetch the row a change notice points at. `None` when it is gone.
pub async fn fetch_record(pool: &PgPool, table: Table, id: Uuid) -> anyhow::Result<Option<Record>> {
    let record = match table {
        Table::Schools => fetch_by_id(
            pool,
            &format!("SELECT {SCHOOL_COLUMNS} FROM placement_admin.schools WHERE id = $1"),
            id,
            school_from_row,
        )
        .await?
        .map(Record::School),
        Table::Students => fetch_by_id(
            pool,
            &format!("SELECT {STUDENT_COLUMNS} FROM placement_admin.students WHERE id = $1"),
            id,
            student_from_row,
        )
        .await?
        .map(Record::Student),
        Table::Companies => fetch_by_id(
            pool,
            &format!("SELECT {COMPANY_COLUMNS} FROM placement_admin.companies WHERE id = $1"),
            id,
            company_from_row,
        )
        .await?
        .map(Record::Company),
        Table::Placements => fetch_by_id(
            pool,
            &format!("{PLACEMENT_SELECT} WHERE p.id = $1"),
            id,
            placement_from_row,
        )
        .await?
        .map(Record::Placement),
        Table::PlacementOfficers => fetch_by_id(
            pool,
            &format!(
                "SELECT {OFFICER_COLUMNS} FROM placement_admin.placement_officers WHERE id = $1"
            ),
            id,
            officer_from_row,
        )
        .await?
        .map(Record::PlacementOfficer),
        Table::CompanyInteractions => fetch_by_id(
            pool,
            &format!(
                "SELECT {INTERACTION_COLUMNS} FROM placement_admin.company_interactions \
                 WHERE id = $1"
            ),
            id,
            interaction_from_row,
        )
        .await?
        .map(Record::Interaction),
        Table::Users => fetch_by_id(
            pool,
            &format!("SELECT {USER_COLUMNS} FROM placement_admin.users WHERE id = $1"),
            id,
            user_from_row,
        )
        .await?
        .map(Record::User),
    };
    Ok(record)
}

pub async fn resolve_change(pool: &PgPool, event: ChangeEvent) -> anyhow::Result<Change> {
    if event.op == ChangeKind::Delete {
        return Ok(Change::Delete {
            table: event.table,
            id: event.id,
        });
    }
    // A row can be gone by the time its insert/update notice is read.
    Ok(match fetch_record(pool, event.table, event.id).await? {
        Some(record) => Change::Upsert(record),
        None => Change::Delete {
            table: event.table,
            id: event.id,
        },
    })
}

pub async fn subscribe_changes(pool: &PgPool) -> anyhow::Result<PgListener> {
    let mut listener = PgListener::connect_with(pool)
        .await
        .context("failed to open notification listener")?;
    listener.listen(CHANGE_CHANNEL).await?;
    info!(channel = CHANGE_CHANNEL, "listening for table changes");
    Ok(listener)
}

/// Forward backend notifications into `feed` until the connection drops.
pub async fn forward_changes(mut listener: PgListener, feed: ChangeFeed) -> anyhow::Result<()> {
    loop {
        let notification = listener.recv().await?;
        match ChangeEvent::parse(notification.payload()) {
            Ok(event) => {
                debug!(table = %event.table, op = ?event.op, id = %event.id, "change received");
                feed.publish(event);
            }
            Err(e) => warn!(payload = notification.payload(), "ignoring malformed change: {e}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewSchool {
    pub name: String,
    pub location: String,
    pub project_lead_id: Option<Uuid>,
}

pub async fn insert_school(pool: &PgPool, school: &NewSchool) -> anyhow::Result<School> {
    let row = sqlx::query(&format!(
        "INSERT INTO placement_admin.schools (id, name, location, project_lead_id) \
         VALUES ($1, $2, $3, $4) RETURNING {SCHOOL_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(&school.name)
    .bind(&school.location)
    .bind(school.project_lead_id)
    .fetch_one(pool)
    .await?;
    school_from_row(&row)
}

/// A missing `project_lead_id` keeps the current lead.
pub async fn update_school(pool: &PgPool, id: Uuid, school: &NewSchool) -> anyhow::Result<bool> {
    let result = sqlx::query(
        "UPDATE placement_admin.schools \
         SET name = $2, location = $3, project_lead_id = COALESCE($4, project_lead_id) \
         WHERE id = $1",
    )
    .bind(id)
    .bind(&school.name)
    .bind(&school.location)
    .bind(school.project_lead_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

#[derive(Debug, Clone)]
pub struct NewStudent {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub course: Option<String>,
    pub course_specialization: Option<String>,
    pub school_id: Option<Uuid>,
    pub student_status: StudentStatus,
}

pub async fn insert_student(pool: &PgPool, student: &NewStudent) -> anyhow::Result<Student> {
    let row = sqlx::query(&format!(
        "INSERT INTO placement_admin.students \
         (id, name, email, phone, course, course_specialization, school_id, student_status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {STUDENT_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(&student.name)
    .bind(&student.email)
    .bind(&student.phone)
    .bind(&student.course)
    .bind(&student.course_specialization)
    .bind(student.school_id)
    .bind(student.student_status.as_str())
    .fetch_one(pool)
    .await?;
    student_from_row(&row)
}

pub async fn update_student_status(
    pool: &PgPool,
    id: Uuid,
    placement_status: PlacementStatus,
    student_status: Option<StudentStatus>,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        "UPDATE placement_admin.students \
         SET placement_status = $2, student_status = COALESCE($3, student_status) \
         WHERE id = $1",
    )
    .bind(id)
    .bind(placement_status.as_str())
    .bind(student_status.map(StudentStatus::as_str))
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn record_interview(
    pool: &PgPool,
    id: Uuid,
    notes: Option<&str>,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        "UPDATE placement_admin.students \
         SET interviews_attended = COALESCE(interviews_attended, 0) + 1, \
             interview_results = COALESCE($2, interview_results) \
         WHERE id = $1",
    )
    .bind(id)
    .bind(notes)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

#[derive(Debug, Clone)]
pub struct NewCompany {
    pub name: String,
    pub contact_person: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub collaboration_status: CollaborationStatus,
    pub company_status: CompanyStatus,
    pub job_roles_offered: Vec<String>,
}

pub async fn insert_company(pool: &PgPool, company: &NewCompany) -> anyhow::Result<Company> {
    let row = sqlx::query(&format!(
        "INSERT INTO placement_admin.companies \
         (id, name, contact_person, contact_email, contact_phone, \
          collaboration_status, company_status, job_roles_offered) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {COMPANY_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(&company.name)
    .bind(&company.contact_person)
    .bind(&company.contact_email)
    .bind(&company.contact_phone)
    .bind(company.collaboration_status.as_str())
    .bind(company.company_status.as_str())
    .bind(&company.job_roles_offered)
    .fetch_one(pool)
    .await?;
    company_from_row(&row)
}

pub async fn update_company_status(
    pool: &PgPool,
    id: Uuid,
    collaboration_status: Option<CollaborationStatus>,
    company_status: Option<CompanyStatus>,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        "UPDATE placement_admin.companies \
         SET collaboration_status = COALESCE($2, collaboration_status), \
             company_status = COALESCE($3, company_status) \
         WHERE id = $1",
    )
    .bind(id)
    .bind(collaboration_status.map(CollaborationStatus::as_str))
    .bind(company_status.map(CompanyStatus::as_str))
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

#[derive(Debug, Clone)]
pub struct NewPlacement {
    pub student_id: Uuid,
    pub company_id: Uuid,
    pub placement_officer_id: Uuid,
    pub placement_date: NaiveDate,
    pub started_on: Option<NaiveDate>,
    pub status: PlacementProgress,
}

pub async fn insert_placement(pool: &PgPool, placement: &NewPlacement) -> anyhow::Result<Placement> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO placement_admin.placements \
         (id, student_id, company_id, placement_officer_id, placement_date, started_on, status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(id)
    .bind(placement.student_id)
    .bind(placement.company_id)
    .bind(placement.placement_officer_id)
    .bind(placement.placement_date)
    .bind(placement.started_on)
    .bind(placement.status.as_str())
    .execute(pool)
    .await?;

    let row = sqlx::query(&format!("{PLACEMENT_SELECT} WHERE p.id = $1"))
        .bind(id)
        .fetch_one(pool)
        .await?;
    placement_from_row(&row)
}

pub async fn update_placement_status(
    pool: &PgPool,
    id: Uuid,
    status: &PlacementProgress,
) -> anyhow::Result<bool> {
    let result = sqlx::query("UPDATE placement_admin.placements SET status = $2 WHERE id = $1")
        .bind(id)
        .bind(status.as_str())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[derive(Debug, Clone)]
pub struct NewInteraction {
    pub company_id: Uuid,
    pub placement_officer_id: Uuid,
    pub interaction_type: InteractionType,
    pub description: String,
}

pub async fn insert_interaction(
    pool: &PgPool,
    interaction: &NewInteraction,
) -> anyhow::Result<CompanyInteraction> {
    let row = sqlx::query(&format!(
        "INSERT INTO placement_admin.company_interactions \
         (id, company_id, placement_officer_id, interaction_type, description) \
         VALUES ($1, $2, $3, $4, $5) RETURNING {INTERACTION_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(interaction.company_id)
    .bind(interaction.placement_officer_id)
    .bind(interaction.interaction_type.as_str())
    .bind(&interaction.description)
    .fetch_one(pool)
    .await?;
    interaction_from_row(&row)
}

/// Delete one row. Interactions of a deleted company go with it; other
/// references are nulled by the schema.
pub async fn delete_row(pool: &PgPool, table: Table, id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query(&format!(
        "DELETE FROM placement_admin.{} WHERE id = $1",
        table.as_str()
    ))
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn import_students_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
    school_id: Uuid,
) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        name: String,
        email: String,
        phone: Option<String>,
        course: Option<String>,
        course_specialization: Option<String>,
        student_status: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut upserted = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("bad CSV record {}", line + 1))?;
        let student_status = match row.student_status.as_deref() {
            Some(raw) if !raw.trim().is_empty() => raw.trim().parse::<StudentStatus>()?,
            _ => StudentStatus::OngoingCourse,
        };

        let result = sqlx::query(
            r#"
            INSERT INTO placement_admin.students
            (id, name, email, phone, course, course_specialization, school_id, student_status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (email) DO UPDATE
            SET name = EXCLUDED.name,
                phone = EXCLUDED.phone,
                course = EXCLUDED.course,
                course_specialization = EXCLUDED.course_specialization,
                school_id = EXCLUDED.school_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&row.name)
        .bind(&row.email)
        .bind(&row.phone)
        .bind(&row.course)
        .bind(&row.course_specialization)
        .bind(school_id)
        .bind(student_status.as_str())
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            upserted += 1;
        }
    }

    Ok(upserted)
}
