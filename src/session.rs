use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::models::{Role, User};

/// The signed-in identity, passed explicitly to everything that scopes data.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    user: User,
    started_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user: User) -> Self {
        info!(user = %user.email, role = %user.role, "session started");
        Self {
            user,
            started_at: Utc::now(),
        }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn id(&self) -> Uuid {
        self.user.id
    }

    pub fn role(&self) -> &Role {
        &self.user.role
    }

    pub fn school_id(&self) -> Option<Uuid> {
        self.user.school_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Replace the identity if `user` is the same account. Returns whether
    /// anything changed.
    pub fn refresh(&mut self, user: User) -> bool {
        if user.id != self.user.id || user == self.user {
            return false;
        }
        info!(user = %user.email, role = %user.role, "session identity refreshed");
        self.user = user;
        true
    }

    pub fn logout(self) {
        info!(user = %self.user.email, "session ended");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lead() -> User {
        User {
            id: Uuid::new_v4(),
            name: "John Davis".to_string(),
            email: "john@techinstitute.edu".to_string(),
            phone: Some("(555) 123-4567".to_string()),
            role: Role::ProjectLead,
            school_id: Some(Uuid::new_v4()),
        }
    }

    #[test]
    fn refresh_only_applies_to_same_account() {
        let user = lead();
        let mut session = Session::new(user.clone());

        let mut other = lead();
        other.role = Role::MasterAdmin;
        assert!(!session.refresh(other));
        assert_eq!(session.role(), &Role::ProjectLead);

        let mut moved = user.clone();
        moved.school_id = None;
        assert!(session.refresh(moved));
        assert_eq!(session.school_id(), None);

        assert!(!session.refresh(session.user().clone()));
    }
}
