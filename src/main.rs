use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::{Datelike, NaiveDate, Utc};
use clap::{ArgGroup, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{error, info, warn};
use uuid::Uuid;

mod access;
mod actions;
mod config;
mod db;
mod error;
mod feed;
mod metrics;
mod models;
mod report;
mod session;
mod view;

use access::{authorize_route, nav_items, navigate, Navigation, Route};
use config::Config;
use db::{NewCompany, NewInteraction, NewPlacement, NewSchool, NewStudent};
use error::{AccessError, ValidationError};
use feed::{Change, ChangeEvent, ChangeFeed, ChangeKind, Notice, Record, Table};
use metrics::{performance_page, MetricsFilter, PerformancePage, ScoreWeights};
use models::{
    CollaborationStatus, CompanyStatus, InteractionType, PlacementProgress, PlacementStatus, Role,
    RoleView, Snapshot, StudentStatus,
};
use session::Session;

#[derive(Parser)]
#[command(name = "placement-admin")]
#[command(about = "Role-scoped placement management console", long_about = None)]
struct Cli {
    /// Email of the identity to act as
    #[arg(long = "as", global = true)]
    identity: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Clone, Copy)]
struct PeriodArgs {
    /// Month number, 1-12
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
    month: Option<u32>,
    /// Defaults to the current year
    #[arg(long)]
    year: Option<i32>,
    #[arg(long, conflicts_with_all = ["month", "year"])]
    all_time: bool,
    #[arg(long)]
    officer: Option<Uuid>,
}

impl PeriodArgs {
    fn filter(self, today: NaiveDate) -> MetricsFilter {
        if self.all_time {
            return MetricsFilter {
                month: None,
                year: None,
                officer_id: self.officer,
            };
        }
        MetricsFilter {
            month: self.month.map(|month| month - 1),
            year: Some(self.year.unwrap_or_else(|| today.year())),
            officer_id: self.officer,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Show the signed-in identity and the pages it can open
    Whoami,
    /// Resolve a route path for the signed-in identity
    Open { path: String },
    /// Stats cards and recent placements
    Dashboard,
    Students,
    Companies,
    Placements,
    Schools,
    Users,
    /// Interaction timeline of one company
    Interactions {
        #[arg(long)]
        company: Uuid,
    },
    /// Officer metrics, scores and monthly breakdown
    Performance {
        #[command(flatten)]
        period: PeriodArgs,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        period: PeriodArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    AddSchool {
        #[arg(long)]
        name: String,
        #[arg(long)]
        location: String,
        #[arg(long)]
        lead: Option<Uuid>,
    },
    UpdateSchool {
        id: Uuid,
        #[arg(long)]
        name: String,
        #[arg(long)]
        location: String,
        #[arg(long)]
        lead: Option<Uuid>,
    },
    DeleteSchool { id: Uuid },
    AddStudent {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        course: Option<String>,
        #[arg(long)]
        specialization: Option<String>,
        #[arg(long)]
        school: Option<Uuid>,
        #[arg(long, default_value = "ongoing_course")]
        status: StudentStatus,
    },
    SetStudentStatus {
        id: Uuid,
        #[arg(long)]
        placement: PlacementStatus,
        #[arg(long)]
        status: Option<StudentStatus>,
    },
    /// Count one more interview for a student
    RecordInterview {
        id: Uuid,
        #[arg(long)]
        notes: Option<String>,
    },
    DeleteStudent { id: Uuid },
    AddCompany {
        #[arg(long)]
        name: String,
        #[arg(long)]
        contact_person: Option<String>,
        #[arg(long)]
        contact_email: Option<String>,
        #[arg(long)]
        contact_phone: Option<String>,
        #[arg(long, default_value = "active")]
        collaboration: CollaborationStatus,
        #[arg(long, default_value = "prospect")]
        status: CompanyStatus,
        /// Comma separated
        #[arg(long, value_delimiter = ',')]
        roles: Vec<String>,
    },
    #[command(group(
        ArgGroup::new("change")
            .args(["collaboration", "status"])
            .required(true)
            .multiple(true)
    ))]
    SetCompanyStatus {
        id: Uuid,
        #[arg(long)]
        collaboration: Option<CollaborationStatus>,
        #[arg(long)]
        status: Option<CompanyStatus>,
    },
    DeleteCompany { id: Uuid },
    AddPlacement {
        #[arg(long)]
        student: Uuid,
        #[arg(long)]
        company: Uuid,
        #[arg(long)]
        officer: Uuid,
        /// Defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        started_on: Option<NaiveDate>,
        #[arg(long, default_value = "in_progress")]
        status: PlacementProgress,
    },
    SetPlacementStatus {
        id: Uuid,
        #[arg(long)]
        status: PlacementProgress,
    },
    DeletePlacement { id: Uuid },
    LogInteraction {
        #[arg(long)]
        company: Uuid,
        #[arg(long)]
        officer: Uuid,
        #[arg(long = "type")]
        kind: InteractionType,
        #[arg(long)]
        description: String,
    },
    /// Import students from a CSV file into one school
    Import {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        school: Uuid,
    },
    /// Follow backend changes and keep the dashboard current
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "placement_admin=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;

    if let Err(err) = run(cli, &pool, &config).await {
        if let Some(denied) = err.downcast_ref::<AccessError>() {
            warn!(redirect = %denied.redirect(), "{denied}");
            eprintln!("Access denied: {denied}. Redirecting to {}.", denied.redirect());
            std::process::exit(2);
        }
        if let Some(invalid) = err.downcast_ref::<ValidationError>() {
            eprintln!("Rejected: {invalid}.");
            std::process::exit(2);
        }
        error!("{err:#}");
        return Err(err);
    }

    Ok(())
}

async fn sign_in(pool: &PgPool, identity: Option<&str>) -> anyhow::Result<Option<Session>> {
    let Some(email) = identity else {
        return Ok(None);
    };
    match db::fetch_user_by_email(pool, email).await? {
        Some(user) => Ok(Some(Session::new(user))),
        None => Err(AccessError::UnknownIdentity(email.to_string()).into()),
    }
}

/// Guard `route`, then fetch and scope the data behind it.
async fn open_page<'a>(
    pool: &PgPool,
    session: Option<&'a Session>,
    route: Route,
) -> anyhow::Result<(&'a Session, Snapshot, RoleView)> {
    authorize_route(session, route)?;
    let session = session.ok_or(AccessError::Unauthenticated)?;
    let snapshot = db::fetch_snapshot(pool).await?;
    let view = view::scoped_view(session, &snapshot)?;
    Ok((session, snapshot, view))
}

fn can_open(session: &Session, route: Route) -> bool {
    matches!(navigate(Some(session), route), Navigation::Allow(_))
}

fn deleted(kind: &str, id: Uuid, removed: bool) {
    if removed {
        println!("Deleted {kind} {id}.");
    } else {
        println!("No {kind} {id} to delete.");
    }
}

fn updated(kind: &str, id: Uuid, changed: bool) {
    if changed {
        println!("Updated {kind} {id}.");
    } else {
        println!("No {kind} {id} to update.");
    }
}

async fn run(cli: Cli, pool: &PgPool, config: &Config) -> anyhow::Result<()> {
    let session = sign_in(pool, cli.identity.as_deref()).await?;
    let today = Utc::now().date_naive();

    match cli.command {
        Commands::InitDb => {
            db::init_db(pool).await?;
            println!("Schema ready.");
        }
        Commands::Whoami => {
            let session = session.as_ref().ok_or(AccessError::Unauthenticated)?;
            print!("{}", report::render_session(session, &nav_items(Some(session))));
        }
        Commands::Open { path } => {
            let Some(route) = Route::from_path(&path) else {
                bail!("no page at {path}");
            };
            match navigate(session.as_ref(), route) {
                Navigation::Allow(route) => println!("Opened {route}."),
                Navigation::Redirect { to, reason } => {
                    println!("Redirected to {to} ({reason:?}).")
                }
            }
        }
        Commands::Dashboard => {
            let (_, _, view) = open_page(pool, session.as_ref(), Route::Dashboard).await?;
            print!("{}", report::render_dashboard(&view));
        }
        Commands::Students => {
            let (_, _, view) = open_page(pool, session.as_ref(), Route::Students).await?;
            print!("{}", report::render_students(&view));
        }
        Commands::Companies => {
            let (_, _, view) = open_page(pool, session.as_ref(), Route::Companies).await?;
            print!("{}", report::render_companies(&view));
        }
        Commands::Placements => {
            let (_, _, view) = open_page(pool, session.as_ref(), Route::Placements).await?;
            print!("{}", report::render_placements(&view));
        }
        Commands::Schools => {
            let (_, _, view) = open_page(pool, session.as_ref(), Route::Schools).await?;
            print!("{}", report::render_schools(&view));
        }
        Commands::Users => {
            let (session, _, view) = open_page(pool, session.as_ref(), Route::Users).await?;
            let everyone = *session.role() == Role::MasterAdmin;
            print!("{}", report::render_users(&view, everyone));
        }
        Commands::Interactions { company } => {
            let (_, snapshot, view) = open_page(pool, session.as_ref(), Route::Companies).await?;
            let Some(found) = view.companies.iter().find(|c| c.id == company) else {
                return Err(ValidationError::NotInScope {
                    kind: "company",
                    id: company,
                }
                .into());
            };
            let timeline = view::interactions_timeline(&snapshot, company);
            print!("{}", report::render_timeline(&found.name, &timeline));
        }
        Commands::Performance { period } => {
            let (_, _, view) =
                open_page(pool, session.as_ref(), Route::OfficerPerformance).await?;
            let page = performance_page(&view, &period.filter(today), &config.weights);
            print!("{}", report::render_performance(&page));
        }
        Commands::Report { period, out } => {
            let (session, _, view) = open_page(pool, session.as_ref(), Route::Dashboard).await?;
            let page = can_open(session, Route::OfficerPerformance)
                .then(|| performance_page(&view, &period.filter(today), &config.weights));
            let report = report::build_report(session, today, &view, page.as_ref());
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::AddSchool {
            name,
            location,
            lead,
        } => {
            let (session, _, _) = open_page(pool, session.as_ref(), Route::SchoolsAdd).await?;
            let form = NewSchool {
                name,
                location,
                project_lead_id: lead,
            };
            let school = actions::add_school(pool, session, form).await?;
            println!("Added school {} ({}).", school.name, school.id);
        }
        Commands::UpdateSchool {
            id,
            name,
            location,
            lead,
        } => {
            let (session, _, view) = open_page(pool, session.as_ref(), Route::Schools).await?;
            let form = NewSchool {
                name,
                location,
                project_lead_id: lead,
            };
            let changed = actions::update_school(pool, session, &view, id, form).await?;
            updated("school", id, changed);
        }
        Commands::DeleteSchool { id } => {
            let (session, _, view) = open_page(pool, session.as_ref(), Route::Schools).await?;
            let removed = actions::delete_school(pool, session, &view, id).await?;
            deleted("school", id, removed);
        }
        Commands::AddStudent {
            name,
            email,
            phone,
            course,
            specialization,
            school,
            status,
        } => {
            let (session, _, view) = open_page(pool, session.as_ref(), Route::Students).await?;
            let form = NewStudent {
                name,
                email,
                phone,
                course,
                course_specialization: specialization,
                school_id: school,
                student_status: status,
            };
            let student = actions::add_student(pool, session, &view, form).await?;
            println!("Added student {} ({}).", student.name, student.id);
        }
        Commands::SetStudentStatus {
            id,
            placement,
            status,
        } => {
            let (session, _, view) = open_page(pool, session.as_ref(), Route::Students).await?;
            let changed =
                actions::set_student_status(pool, session, &view, id, placement, status).await?;
            updated("student", id, changed);
        }
        Commands::RecordInterview { id, notes } => {
            let (session, _, view) = open_page(pool, session.as_ref(), Route::Students).await?;
            let changed =
                actions::record_interview(pool, session, &view, id, notes.as_deref()).await?;
            updated("student", id, changed);
        }
        Commands::DeleteStudent { id } => {
            let (session, _, view) = open_page(pool, session.as_ref(), Route::Students).await?;
            let removed = actions::delete_student(pool, session, &view, id).await?;
            deleted("student", id, removed);
        }
        Commands::AddCompany {
            name,
            contact_person,
            contact_email,
            contact_phone,
            collaboration,
            status,
            roles,
        } => {
            let (session, _, _) = open_page(pool, session.as_ref(), Route::Companies).await?;
            let form = NewCompany {
                name,
                contact_person,
                contact_email,
                contact_phone,
                collaboration_status: collaboration,
                company_status: status,
                job_roles_offered: roles
                    .into_iter()
                    .map(|role| role.trim().to_string())
                    .filter(|role| !role.is_empty())
                    .collect(),
            };
            let company = actions::add_company(pool, session, form).await?;
            println!("Added company {} ({}).", company.name, company.id);
        }
        Commands::SetCompanyStatus {
            id,
            collaboration,
            status,
        } => {
            let (session, _, _) = open_page(pool, session.as_ref(), Route::Companies).await?;
            let changed =
                actions::set_company_status(pool, session, id, collaboration, status).await?;
            updated("company", id, changed);
        }
        Commands::DeleteCompany { id } => {
            let (session, _, _) = open_page(pool, session.as_ref(), Route::Companies).await?;
            let removed = actions::delete_company(pool, session, id).await?;
            deleted("company", id, removed);
        }
        Commands::AddPlacement {
            student,
            company,
            officer,
            date,
            started_on,
            status,
        } => {
            let (session, _, view) = open_page(pool, session.as_ref(), Route::Placements).await?;
            let form = NewPlacement {
                student_id: student,
                company_id: company,
                placement_officer_id: officer,
                placement_date: date.unwrap_or(today),
                started_on,
                status,
            };
            let placement = actions::add_placement(pool, session, &view, form).await?;
            println!("Added placement {}.", placement.id);
        }
        Commands::SetPlacementStatus { id, status } => {
            let (session, _, view) = open_page(pool, session.as_ref(), Route::Placements).await?;
            let changed = actions::set_placement_status(pool, session, &view, id, status).await?;
            updated("placement", id, changed);
        }
        Commands::DeletePlacement { id } => {
            let (session, _, view) = open_page(pool, session.as_ref(), Route::Placements).await?;
            let removed = actions::delete_placement(pool, session, &view, id).await?;
            deleted("placement", id, removed);
        }
        Commands::LogInteraction {
            company,
            officer,
            kind,
            description,
        } => {
            let (session, _, view) = open_page(pool, session.as_ref(), Route::Companies).await?;
            let form = NewInteraction {
                company_id: company,
                placement_officer_id: officer,
                interaction_type: kind,
                description,
            };
            let interaction = actions::log_interaction(pool, session, &view, form).await?;
            println!("Logged interaction {}.", interaction.id);
        }
        Commands::Import { csv, school } => {
            let (session, _, view) = open_page(pool, session.as_ref(), Route::Students).await?;
            let imported = actions::import_students(pool, session, &view, &csv, school).await?;
            println!("Imported {imported} students from {}.", csv.display());
        }
        Commands::Watch => {
            let session = session.ok_or(AccessError::Unauthenticated)?;
            authorize_route(Some(&session), Route::Dashboard)?;
            watch(pool, session, config).await?;
        }
    }

    Ok(())
}

async fn watch(pool: &PgPool, mut session: Session, config: &Config) -> anyhow::Result<()> {
    let feed = ChangeFeed::new(config.feed_capacity);
    let mut subscription = feed.subscribe(&Table::ALL);
    info!(subscribers = feed.subscriber_count(), "watching for changes");

    // LISTEN before the first fetch so nothing committed in between is lost.
    let listener = db::subscribe_changes(pool).await?;
    let forwarder = tokio::spawn(db::forward_changes(listener, feed));

    let mut snapshot = db::fetch_snapshot(pool).await?;
    let mut stale = false;
    let filter = MetricsFilter {
        month: None,
        year: Some(Utc::now().year()),
        officer_id: None,
    };
    summarize(&session, &snapshot, &filter, &config.weights);

    loop {
        let Some(notice) = subscription.next().await else {
            break;
        };
        let update = match notice {
            Notice::Changed(event) if !stale => {
                Update::Changed(event, db::resolve_change(pool, event).await)
            }
            Notice::Changed(_) => Update::Reload(db::fetch_snapshot(pool).await),
            Notice::Missed(missed) => {
                warn!(missed, "refetching snapshot after missed changes");
                Update::Reload(db::fetch_snapshot(pool).await)
            }
        };

        match apply_update(&mut session, &mut snapshot, &mut stale, update) {
            WatchState::Continue => summarize(&session, &snapshot, &filter, &config.weights),
            WatchState::SignedOut => {
                println!("Signed-in user was removed; signing out.");
                subscription.unsubscribe();
                session.logout();
                forwarder.abort();
                return Ok(());
            }
        }
    }

    forwarder.await.context("change listener panicked")?
}

enum Update {
    Changed(ChangeEvent, anyhow::Result<Change>),
    Reload(anyhow::Result<Snapshot>),
}

#[derive(Debug, PartialEq, Eq)]
enum WatchState {
    Continue,
    SignedOut,
}

/// Fold one backend answer into the local state. A failed request keeps the
/// last known snapshot and marks it stale, so the next notice reloads
/// everything.
fn apply_update(
    session: &mut Session,
    snapshot: &mut Snapshot,
    stale: &mut bool,
    update: Update,
) -> WatchState {
    match update {
        Update::Changed(event, Ok(change)) => {
            if event.table == Table::Users && event.id == session.id() {
                if let Change::Upsert(Record::User(user)) = &change {
                    if session.refresh(user.clone()) {
                        info!(role = %session.role(), "session identity changed");
                    }
                }
                if matches!(change, Change::Delete { .. }) {
                    snapshot.apply(change);
                    return WatchState::SignedOut;
                }
            }
            if event.op == ChangeKind::Delete {
                info!(table = %event.table, id = %event.id, "row removed");
            }
            snapshot.apply(change);
        }
        Update::Reload(Ok(fresh)) => {
            if let Some(user) = fresh.users.iter().find(|user| user.id == session.id()) {
                session.refresh(user.clone());
            }
            *snapshot = fresh;
            *stale = false;
        }
        Update::Changed(_, Err(err)) | Update::Reload(Err(err)) => {
            error!("failed to refresh from backend: {err:#}");
            eprintln!("Could not refresh; showing the last known data.");
            *stale = true;
        }
    }
    WatchState::Continue
}

fn summarize(session: &Session, snapshot: &Snapshot, filter: &MetricsFilter, weights: &ScoreWeights) {
    let view = match view::scoped_view(session, snapshot) {
        Ok(view) => view,
        Err(denied) => {
            println!("{denied}");
            return;
        }
    };
    let stats = &view.stats;
    println!(
        "[{}] {} students, {} placed, {} active companies, {}% placement rate",
        Utc::now().format("%H:%M:%S"),
        stats.total_students,
        stats.placed_students,
        stats.active_companies,
        stats.placement_rate
    );

    if can_open(session, Route::OfficerPerformance) {
        let page: PerformancePage = performance_page(&view, filter, weights);
        if let Some(best) = page.scores.iter().max_by_key(|s| s.overall_score) {
            println!(
                "  {} completed this year, top score {} ({}, {})",
                page.overview.completed_placements,
                best.name,
                best.overall_score,
                best.band.as_str()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{School, User};

    fn lead() -> Session {
        Session::new(User {
            id: Uuid::new_v4(),
            name: "John Davis".to_string(),
            email: "john@techinstitute.edu".to_string(),
            phone: None,
            role: Role::ProjectLead,
            school_id: None,
        })
    }

    fn snapshot_with_school() -> (Snapshot, Uuid) {
        let id = Uuid::new_v4();
        let snapshot = Snapshot {
            schools: vec![School {
                id,
                name: "Technology Institute".to_string(),
                location: Some("San Francisco, CA".to_string()),
                project_lead_id: None,
            }],
            ..Snapshot::default()
        };
        (snapshot, id)
    }

    fn school_deleted(id: Uuid) -> ChangeEvent {
        ChangeEvent {
            table: Table::Schools,
            op: ChangeKind::Delete,
            id,
        }
    }

    #[test]
    fn failed_refresh_keeps_last_snapshot_and_goes_stale() {
        let mut session = lead();
        let (mut snapshot, school_id) = snapshot_with_school();
        let before = snapshot.clone();
        let mut stale = false;

        let state = apply_update(
            &mut session,
            &mut snapshot,
            &mut stale,
            Update::Changed(
                school_deleted(school_id),
                Err(anyhow::anyhow!("pool timed out while waiting for an open connection")),
            ),
        );
        assert_eq!(state, WatchState::Continue);
        assert_eq!(snapshot, before);
        assert!(stale);

        let state = apply_update(
            &mut session,
            &mut snapshot,
            &mut stale,
            Update::Reload(Err(anyhow::anyhow!("connection reset"))),
        );
        assert_eq!(state, WatchState::Continue);
        assert_eq!(snapshot, before);
        assert!(stale);

        apply_update(
            &mut session,
            &mut snapshot,
            &mut stale,
            Update::Reload(Ok(Snapshot::default())),
        );
        assert!(snapshot.schools.is_empty());
        assert!(!stale);
    }

    #[test]
    fn resolved_changes_apply_to_snapshot() {
        let mut session = lead();
        let (mut snapshot, school_id) = snapshot_with_school();
        let mut stale = false;

        let state = apply_update(
            &mut session,
            &mut snapshot,
            &mut stale,
            Update::Changed(
                school_deleted(school_id),
                Ok(Change::Delete {
                    table: Table::Schools,
                    id: school_id,
                }),
            ),
        );
        assert_eq!(state, WatchState::Continue);
        assert!(snapshot.schools.is_empty());
    }

    #[test]
    fn removing_the_signed_in_user_signs_out() {
        let mut session = lead();
        let mut snapshot = Snapshot {
            users: vec![session.user().clone()],
            ..Snapshot::default()
        };
        let mut stale = false;
        let id = session.id();

        let state = apply_update(
            &mut session,
            &mut snapshot,
            &mut stale,
            Update::Changed(
                ChangeEvent {
                    table: Table::Users,
                    op: ChangeKind::Delete,
                    id,
                },
                Ok(Change::Delete {
                    table: Table::Users,
                    id,
                }),
            ),
        );
        assert_eq!(state, WatchState::SignedOut);
        assert!(snapshot.users.is_empty());
    }

    #[test]
    fn month_is_one_based_on_the_command_line() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let period = PeriodArgs {
            month: Some(6),
            year: Some(2023),
            all_time: false,
            officer: None,
        };
        assert_eq!(
            period.filter(today),
            MetricsFilter {
                month: Some(5),
                year: Some(2023),
                officer_id: None,
            }
        );
    }

    #[test]
    fn year_defaults_to_current_unless_all_time() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let mut period = PeriodArgs {
            month: None,
            year: None,
            all_time: false,
            officer: None,
        };
        assert_eq!(period.filter(today).year, Some(2024));

        period.all_time = true;
        assert_eq!(period.filter(today), MetricsFilter::default());
    }

    #[test]
    fn cli_parses_global_identity_and_period() {
        let cli = Cli::try_parse_from([
            "placement-admin",
            "performance",
            "--month",
            "6",
            "--as",
            "john@techinstitute.edu",
        ])
        .unwrap();
        assert_eq!(cli.identity.as_deref(), Some("john@techinstitute.edu"));
        assert!(matches!(
            cli.command,
            Commands::Performance { period } if period.month == Some(6)
        ));

        assert!(Cli::try_parse_from(["placement-admin", "performance", "--month", "13"]).is_err());
        assert!(Cli::try_parse_from([
            "placement-admin",
            "performance",
            "--all-time",
            "--year",
            "2023"
        ])
        .is_err());
    }
}
