use std::fmt;

use serde::Serialize;

use crate::error::AccessError;
use crate::models::Role;
use crate::session::Session;

const ADMIN_AND_LEAD: &[Role] = &[Role::MasterAdmin, Role::ProjectLead];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Route {
    Login,
    Dashboard,
    Students,
    Companies,
    Placements,
    Schools,
    SchoolsAdd,
    Users,
    OfficerPerformance,
}

impl Route {
    pub const ALL: [Route; 9] = [
        Route::Login,
        Route::Dashboard,
        Route::Students,
        Route::Companies,
        Route::Placements,
        Route::Schools,
        Route::SchoolsAdd,
        Route::Users,
        Route::OfficerPerformance,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Route::Login => "/",
            Route::Dashboard => "/dashboard",
            Route::Students => "/students",
            Route::Companies => "/companies",
            Route::Placements => "/placements",
            Route::Schools => "/schools",
            Route::SchoolsAdd => "/schools/add",
            Route::Users => "/users",
            Route::OfficerPerformance => "/officer-performance",
        }
    }

    pub fn from_path(path: &str) -> Option<Route> {
        Route::ALL.into_iter().find(|route| route.path() == path)
    }

    pub fn requires_auth(self) -> bool {
        !matches!(self, Route::Login)
    }

    pub fn required_roles(self) -> Option<&'static [Role]> {
        match self {
            Route::SchoolsAdd | Route::OfficerPerformance => Some(ADMIN_AND_LEAD),
            _ => None,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ManageSchools,
    ManageStudents,
    ManageCompanies,
    DeleteCompany,
    ManagePlacements,
    LogInteraction,
    ImportStudents,
}

impl Action {
    pub fn required_roles(self) -> Option<&'static [Role]> {
        match self {
            Action::ManageSchools | Action::DeleteCompany | Action::ImportStudents => {
                Some(ADMIN_AND_LEAD)
            }
            Action::ManageStudents
            | Action::ManageCompanies
            | Action::ManagePlacements
            | Action::LogInteraction => None,
        }
    }

    pub fn route(self) -> Route {
        match self {
            Action::ManageSchools => Route::SchoolsAdd,
            Action::ManageStudents | Action::ImportStudents => Route::Students,
            Action::ManageCompanies | Action::DeleteCompany | Action::LogInteraction => {
                Route::Companies
            }
            Action::ManagePlacements => Route::Placements,
        }
    }
}

/// `None` for `role` means nobody is signed in, which is always denied.
pub fn is_allowed(role: Option<&Role>, required: Option<&[Role]>) -> bool {
    match (role, required) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(role), Some(required)) => required.contains(role),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Allow(Route),
    Redirect { to: Route, reason: Denial },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    Unauthenticated,
    Forbidden,
}

pub fn navigate(session: Option<&Session>, route: Route) -> Navigation {
    if !route.requires_auth() {
        return Navigation::Allow(route);
    }

    let role = session.map(Session::role);
    if role.is_none() {
        return Navigation::Redirect {
            to: Route::Login,
            reason: Denial::Unauthenticated,
        };
    }

    if is_allowed(role, route.required_roles()) {
        Navigation::Allow(route)
    } else {
        Navigation::Redirect {
            to: Route::Dashboard,
            reason: Denial::Forbidden,
        }
    }
}

pub fn authorize_route(session: Option<&Session>, route: Route) -> Result<(), AccessError> {
    match navigate(session, route) {
        Navigation::Allow(_) => Ok(()),
        Navigation::Redirect {
            reason: Denial::Unauthenticated,
            ..
        } => Err(AccessError::Unauthenticated),
        Navigation::Redirect {
            reason: Denial::Forbidden,
            ..
        } => Err(forbidden(session, route)),
    }
}

pub fn authorize_action(session: Option<&Session>, action: Action) -> Result<(), AccessError> {
    let role = session.map(Session::role);
    if role.is_none() {
        return Err(AccessError::Unauthenticated);
    }
    if is_allowed(role, action.required_roles()) {
        Ok(())
    } else {
        Err(forbidden(session, action.route()))
    }
}

fn forbidden(session: Option<&Session>, route: Route) -> AccessError {
    AccessError::Forbidden {
        role: session
            .map(|session| session.role().clone())
            .unwrap_or_else(|| Role::Unknown(String::new())),
        route,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub route: Route,
    pub label: &'static str,
}

const NAV_ITEMS: [NavItem; 7] = [
    NavItem {
        route: Route::Dashboard,
        label: "Dashboard",
    },
    NavItem {
        route: Route::Students,
        label: "Students",
    },
    NavItem {
        route: Route::Companies,
        label: "Companies",
    },
    NavItem {
        route: Route::Placements,
        label: "Placements",
    },
    NavItem {
        route: Route::Schools,
        label: "Schools",
    },
    NavItem {
        route: Route::Users,
        label: "Users",
    },
    NavItem {
        route: Route::OfficerPerformance,
        label: "Performance",
    },
];

// Users is listed for admins and leads only.
pub fn nav_items(session: Option<&Session>) -> Vec<NavItem> {
    let role = session.map(Session::role);
    NAV_ITEMS
        .into_iter()
        .filter(|item| {
            let required = match item.route {
                Route::Users => Some(ADMIN_AND_LEAD),
                other => other.required_roles(),
            };
            is_allowed(role, required)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;
    use uuid::Uuid;

    fn session(role: Role) -> Session {
        Session::new(User {
            id: Uuid::new_v4(),
            name: "Emily Chen".to_string(),
            email: "emily@techinstitute.edu".to_string(),
            phone: None,
            role,
            school_id: Some(Uuid::new_v4()),
        })
    }

    #[test]
    fn unauthenticated_is_always_denied() {
        assert!(!is_allowed(None, None));
        assert!(!is_allowed(None, Some(ADMIN_AND_LEAD)));
    }

    #[test]
    fn absent_allow_list_admits_any_signed_in_role() {
        assert!(is_allowed(Some(&Role::PlacementOfficer), None));
        assert!(is_allowed(Some(&Role::MasterAdmin), None));
    }

    #[test]
    fn allow_list_requires_membership() {
        assert!(is_allowed(Some(&Role::ProjectLead), Some(ADMIN_AND_LEAD)));
        assert!(!is_allowed(Some(&Role::PlacementOfficer), Some(ADMIN_AND_LEAD)));
        assert!(!is_allowed(
            Some(&Role::Unknown("auditor".to_string())),
            Some(ADMIN_AND_LEAD)
        ));
    }

    #[test]
    fn officer_is_sent_back_to_dashboard_from_performance_page() {
        let officer = session(Role::PlacementOfficer);
        assert_eq!(
            navigate(Some(&officer), Route::OfficerPerformance),
            Navigation::Redirect {
                to: Route::Dashboard,
                reason: Denial::Forbidden
            }
        );
        assert_eq!(
            navigate(Some(&officer), Route::Students),
            Navigation::Allow(Route::Students)
        );
    }

    #[test]
    fn anonymous_navigation_goes_to_login() {
        assert_eq!(
            navigate(None, Route::Dashboard),
            Navigation::Redirect {
                to: Route::Login,
                reason: Denial::Unauthenticated
            }
        );
        assert_eq!(navigate(None, Route::Login), Navigation::Allow(Route::Login));
    }

    #[test]
    fn action_denial_names_the_route() {
        let officer = session(Role::PlacementOfficer);
        let err = authorize_action(Some(&officer), Action::ManageSchools).unwrap_err();
        assert_eq!(err.redirect(), Route::Dashboard);
        assert!(matches!(
            err,
            AccessError::Forbidden {
                route: Route::SchoolsAdd,
                ..
            }
        ));
        assert!(authorize_action(Some(&officer), Action::ManagePlacements).is_ok());
        assert_eq!(
            authorize_action(None, Action::ManagePlacements),
            Err(AccessError::Unauthenticated)
        );
    }

    #[test]
    fn officers_do_not_see_users_or_performance_in_menu() {
        let officer = session(Role::PlacementOfficer);
        let labels: Vec<&str> = nav_items(Some(&officer)).iter().map(|i| i.label).collect();
        assert_eq!(
            labels,
            vec!["Dashboard", "Students", "Companies", "Placements", "Schools"]
        );

        let lead = session(Role::ProjectLead);
        assert_eq!(nav_items(Some(&lead)).len(), 7);
        assert!(nav_items(None).is_empty());
    }

    #[test]
    fn paths_round_trip_through_route_table() {
        assert_eq!(Route::from_path("/schools/add"), Some(Route::SchoolsAdd));
        assert_eq!(Route::from_path("/nowhere"), None);
    }
}
