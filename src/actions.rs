use anyhow::Context;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::access::{authorize_action, Action};
use crate::db::{self, NewCompany, NewInteraction, NewPlacement, NewSchool, NewStudent};
use crate::error::ValidationError;
use crate::feed::Table;
use crate::models::{
    CollaborationStatus, Company, CompanyInteraction, CompanyStatus, Placement,
    PlacementProgress, PlacementStatus, Role, RoleView, School, Student, StudentStatus,
};
use crate::session::Session;

fn required(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Required(field))
    } else {
        Ok(())
    }
}

fn in_scope<'a, T>(
    rows: &'a [T],
    id: Uuid,
    kind: &'static str,
    row_id: impl Fn(&T) -> Uuid,
) -> Result<&'a T, ValidationError> {
    rows.iter()
        .find(|row| row_id(row) == id)
        .ok_or(ValidationError::NotInScope { kind, id })
}

pub fn validate_school(form: &NewSchool) -> Result<(), ValidationError> {
    required(&form.name, "name")?;
    required(&form.location, "location")
}

pub fn validate_student(form: &NewStudent) -> Result<(), ValidationError> {
    required(&form.name, "name")?;
    required(&form.email, "email")
}

pub fn validate_company(form: &NewCompany) -> Result<(), ValidationError> {
    required(&form.name, "name")
}

pub fn validate_placement(view: &RoleView, form: &NewPlacement) -> Result<(), ValidationError> {
    let student = in_scope(&view.students, form.student_id, "student", |s| s.id)?;
    if student.placement_status != PlacementStatus::NotPlaced {
        return Err(ValidationError::StudentAlreadyPlaced(student.name.clone()));
    }
    let company = in_scope(&view.companies, form.company_id, "company", |c| c.id)?;
    if company.collaboration_status != CollaborationStatus::Active {
        return Err(ValidationError::CompanyInactive(company.name.clone()));
    }
    in_scope(
        &view.placement_officers,
        form.placement_officer_id,
        "placement officer",
        |o| o.id,
    )?;
    Ok(())
}

pub fn validate_interaction(
    view: &RoleView,
    form: &NewInteraction,
) -> Result<(), ValidationError> {
    required(&form.description, "description")?;
    in_scope(&view.companies, form.company_id, "company", |c| c.id)?;
    in_scope(
        &view.placement_officers,
        form.placement_officer_id,
        "placement officer",
        |o| o.id,
    )?;
    Ok(())
}

/// Leads may only name themselves as a school's lead.
pub fn resolve_project_lead(
    session: &Session,
    requested: Option<Uuid>,
) -> Result<Option<Uuid>, ValidationError> {
    match (session.role(), requested) {
        (Role::ProjectLead, Some(id)) if id != session.id() => Err(ValidationError::NotInScope {
            kind: "project lead",
            id,
        }),
        _ => Ok(requested),
    }
}

pub async fn add_school(
    pool: &PgPool,
    session: &Session,
    mut form: NewSchool,
) -> anyhow::Result<School> {
    authorize_action(Some(session), Action::ManageSchools)?;
    validate_school(&form)?;
    form.project_lead_id = resolve_project_lead(session, form.project_lead_id)?;

    let school = db::insert_school(pool, &form)
        .await
        .context("failed to add school")?;
    info!(school = %school.name, by = %session.user().email, "school added");
    Ok(school)
}

pub async fn update_school(
    pool: &PgPool,
    session: &Session,
    view: &RoleView,
    id: Uuid,
    mut form: NewSchool,
) -> anyhow::Result<bool> {
    authorize_action(Some(session), Action::ManageSchools)?;
    in_scope(&view.schools, id, "school", |s| s.id)?;
    validate_school(&form)?;
    form.project_lead_id = resolve_project_lead(session, form.project_lead_id)?;

    let updated = db::update_school(pool, id, &form)
        .await
        .context("failed to update school")?;
    info!(%id, updated, "school updated");
    Ok(updated)
}

pub async fn delete_school(
    pool: &PgPool,
    session: &Session,
    view: &RoleView,
    id: Uuid,
) -> anyhow::Result<bool> {
    authorize_action(Some(session), Action::ManageSchools)?;
    in_scope(&view.schools, id, "school", |s| s.id)?;
    delete(pool, Table::Schools, id).await
}

pub async fn add_student(
    pool: &PgPool,
    session: &Session,
    view: &RoleView,
    mut form: NewStudent,
) -> anyhow::Result<Student> {
    authorize_action(Some(session), Action::ManageStudents)?;
    validate_student(&form)?;
    // Scoped roles always add into their own school.
    if let Some(school_id) = session.school_id().filter(|_| *session.role() != Role::MasterAdmin) {
        form.school_id = Some(school_id);
    }
    if let Some(school_id) = form.school_id {
        in_scope(&view.schools, school_id, "school", |s| s.id)?;
    }

    let student = db::insert_student(pool, &form)
        .await
        .context("failed to add student")?;
    info!(student = %student.email, "student added");
    Ok(student)
}

pub async fn set_student_status(
    pool: &PgPool,
    session: &Session,
    view: &RoleView,
    id: Uuid,
    placement_status: PlacementStatus,
    student_status: Option<StudentStatus>,
) -> anyhow::Result<bool> {
    authorize_action(Some(session), Action::ManageStudents)?;
    in_scope(&view.students, id, "student", |s| s.id)?;
    let updated = db::update_student_status(pool, id, placement_status, student_status)
        .await
        .context("failed to update student")?;
    info!(%id, status = placement_status.as_str(), "student status updated");
    Ok(updated)
}

pub async fn record_interview(
    pool: &PgPool,
    session: &Session,
    view: &RoleView,
    id: Uuid,
    notes: Option<&str>,
) -> anyhow::Result<bool> {
    authorize_action(Some(session), Action::ManageStudents)?;
    in_scope(&view.students, id, "student", |s| s.id)?;
    db::record_interview(pool, id, notes)
        .await
        .context("failed to record interview")
}

pub async fn delete_student(
    pool: &PgPool,
    session: &Session,
    view: &RoleView,
    id: Uuid,
) -> anyhow::Result<bool> {
    authorize_action(Some(session), Action::ManageStudents)?;
    in_scope(&view.students, id, "student", |s| s.id)?;
    delete(pool, Table::Students, id).await
}

pub async fn add_company(
    pool: &PgPool,
    session: &Session,
    form: NewCompany,
) -> anyhow::Result<Company> {
    authorize_action(Some(session), Action::ManageCompanies)?;
    validate_company(&form)?;
    let company = db::insert_company(pool, &form)
        .await
        .context("failed to add company")?;
    info!(company = %company.name, "company added");
    Ok(company)
}

pub async fn set_company_status(
    pool: &PgPool,
    session: &Session,
    id: Uuid,
    collaboration_status: Option<CollaborationStatus>,
    company_status: Option<CompanyStatus>,
) -> anyhow::Result<bool> {
    authorize_action(Some(session), Action::ManageCompanies)?;
    db::update_company_status(pool, id, collaboration_status, company_status)
        .await
        .context("failed to update company")
}

/// The backend removes the company's interactions along with it.
pub async fn delete_company(pool: &PgPool, session: &Session, id: Uuid) -> anyhow::Result<bool> {
    authorize_action(Some(session), Action::DeleteCompany)?;
    delete(pool, Table::Companies, id).await
}

pub async fn add_placement(
    pool: &PgPool,
    session: &Session,
    view: &RoleView,
    form: NewPlacement,
) -> anyhow::Result<Placement> {
    authorize_action(Some(session), Action::ManagePlacements)?;
    validate_placement(view, &form)?;
    let placement = db::insert_placement(pool, &form)
        .await
        .context("failed to add placement")?;
    info!(
        student = placement.student_name.as_deref().unwrap_or("-"),
        company = placement.company_name.as_deref().unwrap_or("-"),
        "placement added"
    );
    Ok(placement)
}

pub async fn set_placement_status(
    pool: &PgPool,
    session: &Session,
    view: &RoleView,
    id: Uuid,
    status: PlacementProgress,
) -> anyhow::Result<bool> {
    authorize_action(Some(session), Action::ManagePlacements)?;
    in_scope(&view.placements, id, "placement", |p| p.id)?;
    db::update_placement_status(pool, id, &status)
        .await
        .context("failed to update placement")
}

pub async fn delete_placement(
    pool: &PgPool,
    session: &Session,
    view: &RoleView,
    id: Uuid,
) -> anyhow::Result<bool> {
    authorize_action(Some(session), Action::ManagePlacements)?;
    in_scope(&view.placements, id, "placement", |p| p.id)?;
    delete(pool, Table::Placements, id).await
}

pub async fn log_interaction(
    pool: &PgPool,
    session: &Session,
    view: &RoleView,
    form: NewInteraction,
) -> anyhow::Result<CompanyInteraction> {
    authorize_action(Some(session), Action::LogInteraction)?;
    validate_interaction(view, &form)?;
    let interaction = db::insert_interaction(pool, &form)
        .await
        .context("failed to log interaction")?;
    info!(
        company = %interaction.company_id,
        kind = interaction.interaction_type.as_str(),
        "interaction logged"
    );
    Ok(interaction)
}

pub async fn import_students(
    pool: &PgPool,
    session: &Session,
    view: &RoleView,
    csv: &std::path::Path,
    school_id: Uuid,
) -> anyhow::Result<usize> {
    authorize_action(Some(session), Action::ImportStudents)?;
    in_scope(&view.schools, school_id, "school", |s| s.id)?;
    db::import_students_csv(pool, csv, school_id)
        .await
        .with_context(|| format!("failed to import {}", csv.display()))
}

async fn delete(pool: &PgPool, table: Table, id: Uuid) -> anyhow::Result<bool> {
    let deleted = db::delete_row(pool, table, id)
        .await
        .with_context(|| format!("failed to delete from {table}"))?;
    info!(%table, %id, deleted, "row deleted");
    Ok(deleted)
}
