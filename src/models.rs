use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ParseEnumError;

/// Role attached to a login identity.
///
/// Stored as a free string by the identity store. Anything we do not know
/// about lands in `Unknown` and is denied by the guard and the view builder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    MasterAdmin,
    ProjectLead,
    PlacementOfficer,
    Unknown(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::MasterAdmin => "master_admin",
            Role::ProjectLead => "project_lead",
            Role::PlacementOfficer => "placement_officer",
            Role::Unknown(value) => value,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Role::MasterAdmin => "Master Admin",
            Role::ProjectLead => "Project Lead",
            Role::PlacementOfficer => "Placement Officer",
            Role::Unknown(value) => value,
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        match value.as_str() {
            "master_admin" => Role::MasterAdmin,
            "project_lead" => Role::ProjectLead,
            "placement_officer" => Role::PlacementOfficer,
            _ => Role::Unknown(value),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementStatus {
    NotPlaced,
    Placed,
}

impl PlacementStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PlacementStatus::NotPlaced => "not_placed",
            PlacementStatus::Placed => "placed",
        }
    }
}

impl FromStr for PlacementStatus {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "not_placed" => Ok(PlacementStatus::NotPlaced),
            "placed" => Ok(PlacementStatus::Placed),
            other => Err(ParseEnumError::new("placement status", other)),
        }
    }
}

/// Where a student is in their course, independent of placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudentStatus {
    OngoingCourse,
    OngoingAndPlaced,
    FinishedNotPlaced,
    FinishedPlaced,
    NotSeeking,
}

impl StudentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            StudentStatus::OngoingCourse => "ongoing_course",
            StudentStatus::OngoingAndPlaced => "ongoing_and_placed",
            StudentStatus::FinishedNotPlaced => "finished_not_placed",
            StudentStatus::FinishedPlaced => "finished_placed",
            StudentStatus::NotSeeking => "not_seeking",
        }
    }
}

impl FromStr for StudentStatus {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "ongoing_course" => Ok(StudentStatus::OngoingCourse),
            "ongoing_and_placed" => Ok(StudentStatus::OngoingAndPlaced),
            "finished_not_placed" => Ok(StudentStatus::FinishedNotPlaced),
            "finished_placed" => Ok(StudentStatus::FinishedPlaced),
            "not_seeking" => Ok(StudentStatus::NotSeeking),
            other => Err(ParseEnumError::new("student status", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollaborationStatus {
    Active,
    Inactive,
}

impl CollaborationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CollaborationStatus::Active => "active",
            CollaborationStatus::Inactive => "inactive",
        }
    }
}

impl FromStr for CollaborationStatus {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "active" => Ok(CollaborationStatus::Active),
            "inactive" => Ok(CollaborationStatus::Inactive),
            other => Err(ParseEnumError::new("collaboration status", other)),
        }
    }
}

/// Relationship stage with a company, finer grained than collaboration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanyStatus {
    Prospect,
    Partner,
    FormerPartner,
    Inactive,
}

impl CompanyStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CompanyStatus::Prospect => "prospect",
            CompanyStatus::Partner => "partner",
            CompanyStatus::FormerPartner => "former_partner",
            CompanyStatus::Inactive => "inactive",
        }
    }
}

impl FromStr for CompanyStatus {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "prospect" => Ok(CompanyStatus::Prospect),
            "partner" => Ok(CompanyStatus::Partner),
            "former_partner" => Ok(CompanyStatus::FormerPartner),
            "inactive" => Ok(CompanyStatus::Inactive),
            other => Err(ParseEnumError::new("company status", other)),
        }
    }
}

/// Progress of a placement. Statuses written by other tools are kept
/// verbatim in `Other` and counted in totals only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PlacementProgress {
    InProgress,
    Completed,
    Other(String),
}

impl PlacementProgress {
    pub fn as_str(&self) -> &str {
        match self {
            PlacementProgress::InProgress => "in_progress",
            PlacementProgress::Completed => "completed",
            PlacementProgress::Other(value) => value,
        }
    }
}

impl From<String> for PlacementProgress {
    fn from(value: String) -> Self {
        match value.as_str() {
            "in_progress" => PlacementProgress::InProgress,
            "completed" => PlacementProgress::Completed,
            _ => PlacementProgress::Other(value),
        }
    }
}

impl From<PlacementProgress> for String {
    fn from(progress: PlacementProgress) -> Self {
        progress.as_str().to_string()
    }
}

impl FromStr for PlacementProgress {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "in_progress" => Ok(PlacementProgress::InProgress),
            "completed" => Ok(PlacementProgress::Completed),
            other => Err(ParseEnumError::new("placement progress", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    Meeting,
    Call,
    Email,
    SiteVisit,
    JobFair,
    Other,
}

impl InteractionType {
    pub fn as_str(self) -> &'static str {
        match self {
            InteractionType::Meeting => "meeting",
            InteractionType::Call => "call",
            InteractionType::Email => "email",
            InteractionType::SiteVisit => "site_visit",
            InteractionType::JobFair => "job_fair",
            InteractionType::Other => "other",
        }
    }
}

impl FromStr for InteractionType {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "meeting" => Ok(InteractionType::Meeting),
            "call" => Ok(InteractionType::Call),
            "email" => Ok(InteractionType::Email),
            "site_visit" => Ok(InteractionType::SiteVisit),
            "job_fair" => Ok(InteractionType::JobFair),
            "other" => Ok(InteractionType::Other),
            other => Err(ParseEnumError::new("interaction type", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub school_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct School {
    pub id: Uuid,
    pub name: String,
    pub location: Option<String>,
    pub project_lead_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub course: Option<String>,
    pub course_specialization: Option<String>,
    pub school_id: Option<Uuid>,
    pub placement_status: PlacementStatus,
    pub student_status: StudentStatus,
    pub interviews_attended: i32,
    pub interview_results: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub contact_person: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub collaboration_status: CollaborationStatus,
    pub company_status: CompanyStatus,
    pub job_roles_offered: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementOfficer {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub school_id: Option<Uuid>,
}

/// A student matched to a company by an officer.
///
/// The `*_name` fields are filled in by the join at fetch time and are for
/// display only. References may be `None` once the referenced row is gone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub id: Uuid,
    pub student_id: Option<Uuid>,
    pub student_name: Option<String>,
    pub company_id: Option<Uuid>,
    pub company_name: Option<String>,
    pub placement_officer_id: Option<Uuid>,
    pub placement_officer_name: Option<String>,
    pub placement_date: NaiveDate,
    pub started_on: Option<NaiveDate>,
    pub status: PlacementProgress,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyInteraction {
    pub id: Uuid,
    pub company_id: Uuid,
    pub placement_officer_id: Uuid,
    pub interaction_type: InteractionType,
    pub description: String,
    pub interaction_date: DateTime<Utc>,
}

/// Everything the backend holds, as last fetched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub schools: Vec<School>,
    pub students: Vec<Student>,
    pub companies: Vec<Company>,
    pub placements: Vec<Placement>,
    pub placement_officers: Vec<PlacementOfficer>,
    pub users: Vec<User>,
    pub interactions: Vec<CompanyInteraction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_students: usize,
    pub placed_students: usize,
    pub active_companies: usize,
    pub placement_rate: u32,
    pub recent_placements: Vec<Placement>,
}

/// The slice of a snapshot one identity may see.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleView {
    pub schools: Vec<School>,
    pub students: Vec<Student>,
    pub companies: Vec<Company>,
    pub placements: Vec<Placement>,
    pub users: Vec<User>,
    pub placement_officers: Vec<PlacementOfficer>,
    pub stats: DashboardStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfficerMetrics {
    pub id: Uuid,
    pub name: String,
    pub total_placements: usize,
    pub completed_placements: usize,
    pub in_progress_placements: usize,
    pub companies_collaborated: usize,
    pub average_placement_days: Option<f64>,
    pub placement_success_rate: u32,
    pub last_placement_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Strong,
    Fair,
    Weak,
}

impl ScoreBand {
    pub fn for_score(score: u32) -> Self {
        if score >= 80 {
            ScoreBand::Strong
        } else if score >= 50 {
            ScoreBand::Fair
        } else {
            ScoreBand::Weak
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScoreBand::Strong => "strong",
            ScoreBand::Fair => "fair",
            ScoreBand::Weak => "weak",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfficerScore {
    pub id: Uuid,
    pub name: String,
    pub placement_score: u32,
    pub company_engagement_score: u32,
    pub time_efficiency_score: u32,
    pub overall_score: u32,
    pub band: ScoreBand,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceOverview {
    pub total_placements: usize,
    pub completed_placements: usize,
    pub active_companies: usize,
    pub average_success_rate: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyPerformance {
    pub month: u32,
    pub label: &'static str,
    pub placements: usize,
    pub completions: usize,
    pub companies: usize,
}
