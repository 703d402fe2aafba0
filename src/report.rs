use std::fmt::Write;

use chrono::NaiveDate;

use crate::access::NavItem;
use crate::metrics::PerformancePage;
use crate::models::{Placement, Role, RoleView};
use crate::session::Session;
use crate::view::TimelineEntry;

fn or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or("-")
}

fn placement_line(placement: &Placement) -> String {
    format!(
        "{} -> {} via {} on {} ({})",
        or_dash(placement.student_name.as_deref()),
        or_dash(placement.company_name.as_deref()),
        or_dash(placement.placement_officer_name.as_deref()),
        placement.placement_date,
        placement.status.as_str()
    )
}

pub fn render_session(session: &Session, nav: &[NavItem]) -> String {
    let mut output = String::new();
    let user = session.user();
    let _ = writeln!(output, "{} <{}>", user.name, user.email);
    let _ = writeln!(output, "Role: {}", user.role.label());
    let _ = writeln!(output, "Signed in: {}", session.started_at().format("%Y-%m-%d %H:%M UTC"));
    if let Some(school_id) = user.school_id {
        let _ = writeln!(output, "School: {school_id}");
    }
    let _ = writeln!(output, "Pages:");
    for item in nav {
        let _ = writeln!(output, "- {} ({})", item.label, item.route);
    }
    output
}

fn write_dashboard(output: &mut String, view: &RoleView, bullet: &str) {
    let stats = &view.stats;

    let _ = writeln!(output, "{bullet}Total students: {}", stats.total_students);
    let _ = writeln!(output, "{bullet}Placed students: {}", stats.placed_students);
    let _ = writeln!(output, "{bullet}Active companies: {}", stats.active_companies);
    let _ = writeln!(output, "{bullet}Placement rate: {}%", stats.placement_rate);
    let _ = writeln!(output);
    let _ = writeln!(output, "Recent placements:");

    if stats.recent_placements.is_empty() {
        let _ = writeln!(output, "No placements yet.");
    } else {
        for placement in &stats.recent_placements {
            let _ = writeln!(output, "- {}", placement_line(placement));
        }
    }
}

pub fn render_dashboard(view: &RoleView) -> String {
    let mut output = String::new();
    write_dashboard(&mut output, view, "");
    output
}

pub fn render_students(view: &RoleView) -> String {
    let mut output = String::new();
    if view.students.is_empty() {
        let _ = writeln!(output, "No students.");
        return output;
    }
    for student in &view.students {
        let school = student
            .school_id
            .and_then(|id| view.schools.iter().find(|school| school.id == id))
            .map(|school| school.name.as_str());
        let _ = writeln!(
            output,
            "- {} <{}> {} / {} [{}, {}] interviews {} (id {})",
            student.name,
            student.email,
            or_dash(student.course.as_deref()),
            or_dash(school),
            student.placement_status.as_str(),
            student.student_status.as_str(),
            student.interviews_attended,
            student.id
        );
    }
    output
}

pub fn render_companies(view: &RoleView) -> String {
    let mut output = String::new();
    if view.companies.is_empty() {
        let _ = writeln!(output, "No companies.");
        return output;
    }
    for company in &view.companies {
        let roles = if company.job_roles_offered.is_empty() {
            "-".to_string()
        } else {
            company.job_roles_offered.join(", ")
        };
        let _ = writeln!(
            output,
            "- {} [{}, {}] contact {} roles: {} (id {})",
            company.name,
            company.collaboration_status.as_str(),
            company.company_status.as_str(),
            or_dash(company.contact_person.as_deref()),
            roles,
            company.id
        );
    }
    output
}

pub fn render_placements(view: &RoleView) -> String {
    let mut output = String::new();
    if view.placements.is_empty() {
        let _ = writeln!(output, "No placements.");
        return output;
    }
    for placement in &view.placements {
        let _ = writeln!(output, "- {} (id {})", placement_line(placement), placement.id);
    }
    output
}

pub fn render_schools(view: &RoleView) -> String {
    let mut output = String::new();
    if view.schools.is_empty() {
        let _ = writeln!(output, "No schools.");
        return output;
    }
    for school in &view.schools {
        let lead = school
            .project_lead_id
            .and_then(|id| view.users.iter().find(|user| user.id == id))
            .map(|user| user.name.as_str());
        let students = view
            .students
            .iter()
            .filter(|student| student.school_id == Some(school.id))
            .count();
        let _ = writeln!(
            output,
            "- {} ({}) lead {} students {} (id {})",
            school.name,
            or_dash(school.location.as_deref()),
            or_dash(lead),
            students,
            school.id
        );
    }
    output
}

/// Admins see every user; leads see the officers of their school.
pub fn render_users(view: &RoleView, everyone: bool) -> String {
    let mut output = String::new();
    let users: Vec<_> = view
        .users
        .iter()
        .filter(|user| everyone || user.role == Role::PlacementOfficer)
        .collect();
    if users.is_empty() {
        let _ = writeln!(output, "No users.");
        return output;
    }
    for user in users {
        let _ = writeln!(
            output,
            "- {} <{}> {} phone {}",
            user.name,
            user.email,
            user.role.label(),
            or_dash(user.phone.as_deref())
        );
    }
    output
}

pub fn render_timeline(company: &str, entries: &[TimelineEntry]) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Interactions with {company}:");
    if entries.is_empty() {
        let _ = writeln!(output, "No interactions recorded.");
        return output;
    }
    for entry in entries {
        let _ = writeln!(
            output,
            "- {} {} by {}: {}",
            entry.interaction.interaction_date.format("%Y-%m-%d %H:%M"),
            entry.interaction.interaction_type.as_str(),
            or_dash(entry.officer_name.as_deref()),
            entry.interaction.description
        );
    }
    output
}

fn write_performance(output: &mut String, page: &PerformancePage) {
    let overview = &page.overview;
    let _ = writeln!(output, "## Officer Performance ({})", page.filter_label);
    let _ = writeln!(output, "- Total placements: {}", overview.total_placements);
    let _ = writeln!(
        output,
        "- Completed placements: {}",
        overview.completed_placements
    );
    let _ = writeln!(output, "- Active companies: {}", overview.active_companies);
    let _ = writeln!(
        output,
        "- Average success rate: {}%",
        overview.average_success_rate
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Officer Metrics");
    if page.metrics.is_empty() {
        let _ = writeln!(output, "No placement officers in scope.");
    } else {
        let _ = writeln!(
            output,
            "| Officer | Total | Completed | In progress | Companies | Avg days | Success | Last placement |"
        );
        let _ = writeln!(output, "|---|---|---|---|---|---|---|---|");
        for m in &page.metrics {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} | {} | {} | {}% | {} |",
                m.name,
                m.total_placements,
                m.completed_placements,
                m.in_progress_placements,
                m.companies_collaborated,
                m.average_placement_days
                    .map(|days| format!("{days:.1}"))
                    .unwrap_or_else(|| "-".to_string()),
                m.placement_success_rate,
                m.last_placement_date
                    .map(|date| date.to_string())
                    .unwrap_or_else(|| "-".to_string())
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Performing Officers");
    if page.top.is_empty() {
        let _ = writeln!(output, "No placement officers in scope.");
    } else {
        for m in &page.top {
            let _ = writeln!(
                output,
                "- {}: {} completed across {} companies ({}% success)",
                m.name, m.completed_placements, m.companies_collaborated, m.placement_success_rate
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Performance Evaluation");
    if page.scores.is_empty() {
        let _ = writeln!(output, "No placement officers in scope.");
    } else {
        let _ = writeln!(
            output,
            "| Officer | Placement | Company engagement | Time efficiency | Overall |"
        );
        let _ = writeln!(output, "|---|---|---|---|---|");
        for s in &page.scores {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} | {} ({}) |",
                s.name,
                s.placement_score,
                s.company_engagement_score,
                s.time_efficiency_score,
                s.overall_score,
                s.band.as_str()
            );
        }
    }

    if !page.monthly.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Monthly Breakdown");
        for month in &page.monthly {
            let _ = writeln!(
                output,
                "- {}: {} placements, {} completed, {} companies",
                month.label, month.placements, month.completions, month.companies
            );
        }
    }
}

pub fn render_performance(page: &PerformancePage) -> String {
    let mut output = String::new();
    write_performance(&mut output, page);
    output
}

pub fn build_report(
    session: &Session,
    generated_on: NaiveDate,
    view: &RoleView,
    page: Option<&PerformancePage>,
) -> String {
    let mut output = String::new();
    let scope = match view.schools.as_slice() {
        [school] if session.school_id().is_some() => school.name.as_str(),
        _ => "all schools",
    };

    let _ = writeln!(output, "# Placement Report");
    let _ = writeln!(
        output,
        "Generated for {} ({}, {}) on {}",
        session.user().name,
        session.role().label(),
        scope,
        generated_on
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overview");
    write_dashboard(&mut output, view, "- ");
    if let Some(page) = page {
        let _ = writeln!(output);
        write_performance(&mut output, page);
    }

    output
}
