use std::collections::HashSet;

use serde::Serialize;
use uuid::Uuid;

use crate::error::AccessError;
use crate::models::{
    CollaborationStatus, Company, CompanyInteraction, DashboardStats, Placement, PlacementStatus,
    Role, RoleView, School, Snapshot, Student,
};
use crate::session::Session;

pub const RECENT_PLACEMENTS: usize = 5;

/// Cut `snapshot` down to what `session` may see.
///
/// `None` means the session has no data scope at all (unknown role, or a
/// school-scoped role without a school). Callers must not read that as an
/// empty result.
pub fn build_view(session: &Session, snapshot: &Snapshot) -> Option<RoleView> {
    match (session.role(), session.school_id()) {
        (Role::MasterAdmin, _) => Some(admin_view(snapshot)),
        (Role::ProjectLead, Some(school_id)) => Some(lead_view(school_id, snapshot)),
        (Role::PlacementOfficer, Some(school_id)) => {
            Some(officer_view(session.id(), school_id, snapshot))
        }
        _ => None,
    }
}

pub fn scoped_view(session: &Session, snapshot: &Snapshot) -> Result<RoleView, AccessError> {
    build_view(session, snapshot).ok_or_else(|| AccessError::NoScope {
        role: session.role().clone(),
    })
}

fn admin_view(snapshot: &Snapshot) -> RoleView {
    let users = snapshot
        .users
        .iter()
        .filter(|user| matches!(user.role, Role::ProjectLead | Role::PlacementOfficer))
        .cloned()
        .collect();

    RoleView {
        schools: snapshot.schools.clone(),
        students: snapshot.students.clone(),
        companies: snapshot.companies.clone(),
        placements: snapshot.placements.clone(),
        users,
        placement_officers: snapshot.placement_officers.clone(),
        stats: compute_stats(&snapshot.students, &snapshot.companies, &snapshot.placements),
    }
}

fn lead_view(school_id: Uuid, snapshot: &Snapshot) -> RoleView {
    let students = school_students(school_id, snapshot);
    let placement_officers: Vec<_> = snapshot
        .placement_officers
        .iter()
        .filter(|officer| officer.school_id == Some(school_id))
        .cloned()
        .collect();

    let student_ids: HashSet<Uuid> = students.iter().map(|student| student.id).collect();
    let officer_ids: HashSet<Uuid> = placement_officers.iter().map(|officer| officer.id).collect();

    // A placement belongs to the school through its student or its officer.
    let placements: Vec<_> = snapshot
        .placements
        .iter()
        .filter(|placement| {
            placement
                .student_id
                .is_some_and(|id| student_ids.contains(&id))
                || placement
                    .placement_officer_id
                    .is_some_and(|id| officer_ids.contains(&id))
        })
        .cloned()
        .collect();

    let users = snapshot
        .users
        .iter()
        .filter(|user| {
            matches!(user.role, Role::ProjectLead | Role::PlacementOfficer)
                && user.school_id == Some(school_id)
        })
        .cloned()
        .collect();

    let stats = compute_stats(&students, &snapshot.companies, &placements);

    RoleView {
        schools: school_only(school_id, snapshot),
        students,
        companies: snapshot.companies.clone(),
        placements,
        users,
        placement_officers,
        stats,
    }
}

fn officer_view(officer_id: Uuid, school_id: Uuid, snapshot: &Snapshot) -> RoleView {
    let students = school_students(school_id, snapshot);
    let placements: Vec<_> = snapshot
        .placements
        .iter()
        .filter(|placement| placement.placement_officer_id == Some(officer_id))
        .cloned()
        .collect();
    let placement_officers = snapshot
        .placement_officers
        .iter()
        .filter(|officer| officer.id == officer_id)
        .cloned()
        .collect();

    let stats = compute_stats(&students, &snapshot.companies, &placements);

    RoleView {
        schools: school_only(school_id, snapshot),
        students,
        companies: snapshot.companies.clone(),
        placements,
        users: Vec::new(),
        placement_officers,
        stats,
    }
}

fn school_only(school_id: Uuid, snapshot: &Snapshot) -> Vec<School> {
    snapshot
        .schools
        .iter()
        .filter(|school| school.id == school_id)
        .cloned()
        .collect()
}

fn school_students(school_id: Uuid, snapshot: &Snapshot) -> Vec<Student> {
    snapshot
        .students
        .iter()
        .filter(|student| student.school_id == Some(school_id))
        .cloned()
        .collect()
}

pub fn compute_stats(
    students: &[Student],
    companies: &[Company],
    placements: &[Placement],
) -> DashboardStats {
    let total_students = students.len();
    let placed_students = students
        .iter()
        .filter(|student| student.placement_status == PlacementStatus::Placed)
        .count();
    let active_companies = companies
        .iter()
        .filter(|company| company.collaboration_status == CollaborationStatus::Active)
        .count();

    DashboardStats {
        total_students,
        placed_students,
        active_companies,
        placement_rate: percentage(placed_students, total_students),
        recent_placements: recent_placements(placements, RECENT_PLACEMENTS),
    }
}

/// `round(part / whole * 100)`, or 0 for an empty whole.
pub fn percentage(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    (part as f64 / whole as f64 * 100.0).round() as u32
}

pub fn recent_placements(placements: &[Placement], limit: usize) -> Vec<Placement> {
    let mut sorted = placements.to_vec();
    sorted.sort_by(|a, b| b.placement_date.cmp(&a.placement_date));
    sorted.truncate(limit);
    sorted
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEntry {
    pub interaction: CompanyInteraction,
    pub officer_name: Option<String>,
}

/// Interactions logged against one company, newest first.
pub fn interactions_timeline(snapshot: &Snapshot, company_id: Uuid) -> Vec<TimelineEntry> {
    let mut entries: Vec<TimelineEntry> = snapshot
        .interactions
        .iter()
        .filter(|interaction| interaction.company_id == company_id)
        .map(|interaction| TimelineEntry {
            officer_name: snapshot
                .placement_officers
                .iter()
                .find(|officer| officer.id == interaction.placement_officer_id)
                .map(|officer| officer.name.clone()),
            interaction: interaction.clone(),
        })
        .collect();
    entries.sort_by(|a, b| {
        b.interaction
            .interaction_date
            .cmp(&a.interaction.interaction_date)
    });
    entries
}
