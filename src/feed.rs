use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{
    Company, CompanyInteraction, Placement, PlacementOfficer, School, Snapshot, Student, User,
};

pub const CHANGE_CHANNEL: &str = "placement_admin_changes";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Schools,
    Students,
    Companies,
    Placements,
    PlacementOfficers,
    CompanyInteractions,
    Users,
}

impl Table {
    pub const ALL: [Table; 7] = [
        Table::Schools,
        Table::Students,
        Table::Companies,
        Table::Placements,
        Table::PlacementOfficers,
        Table::CompanyInteractions,
        Table::Users,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Table::Schools => "schools",
            Table::Students => "students",
            Table::Companies => "companies",
            Table::Placements => "placements",
            Table::PlacementOfficers => "placement_officers",
            Table::CompanyInteractions => "company_interactions",
            Table::Users => "users",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: Table,
    pub op: ChangeKind,
    pub id: Uuid,
}

impl ChangeEvent {
    pub fn parse(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Changed(ChangeEvent),
    /// The subscriber fell behind and dropped this many notices; only a full
    /// refetch brings it back in sync.
    Missed(u64),
}

#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, event: ChangeEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!(table = %event.table, "change with no subscribers");
                0
            }
        }
    }

    pub fn subscribe(&self, tables: &[Table]) -> Subscription {
        Subscription {
            tables: tables.iter().copied().collect(),
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[derive(Debug)]
pub struct Subscription {
    tables: HashSet<Table>,
    receiver: broadcast::Receiver<ChangeEvent>,
}

impl Subscription {
    /// Next notice for one of the subscribed tables, or `None` once the feed
    /// is gone.
    pub async fn next(&mut self) -> Option<Notice> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.tables.contains(&event.table) => {
                    return Some(Notice::Changed(event))
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "change subscriber lagged");
                    return Some(Notice::Missed(missed));
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    pub fn unsubscribe(self) {}
}

#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    School(School),
    Student(Student),
    Company(Company),
    Placement(Placement),
    PlacementOfficer(PlacementOfficer),
    Interaction(CompanyInteraction),
    User(User),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Upsert(Record),
    Delete { table: Table, id: Uuid },
}

impl Snapshot {
    /// Deletes mirror the backend's foreign keys.
    pub fn apply(&mut self, change: Change) {
        match change {
            Change::Upsert(Record::School(row)) => upsert(&mut self.schools, row, |r| r.id),
            Change::Upsert(Record::Student(row)) => upsert(&mut self.students, row, |r| r.id),
            Change::Upsert(Record::Company(row)) => upsert(&mut self.companies, row, |r| r.id),
            Change::Upsert(Record::Placement(row)) => upsert(&mut self.placements, row, |r| r.id),
            Change::Upsert(Record::PlacementOfficer(row)) => {
                upsert(&mut self.placement_officers, row, |r| r.id)
            }
            Change::Upsert(Record::Interaction(row)) => {
                upsert(&mut self.interactions, row, |r| r.id)
            }
            Change::Upsert(Record::User(row)) => upsert(&mut self.users, row, |r| r.id),
            Change::Delete { table, id } => self.remove(table, id),
        }
    }

    fn remove(&mut self, table: Table, id: Uuid) {
        match table {
            Table::Schools => {
                self.schools.retain(|school| school.id != id);
                for student in &mut self.students {
                    if student.school_id == Some(id) {
                        student.school_id = None;
                    }
                }
                for officer in &mut self.placement_officers {
                    if officer.school_id == Some(id) {
                        officer.school_id = None;
                    }
                }
                for user in &mut self.users {
                    if user.school_id == Some(id) {
                        user.school_id = None;
                    }
                }
            }
            Table::Students => {
                self.students.retain(|student| student.id != id);
                for placement in &mut self.placements {
                    if placement.student_id == Some(id) {
                        placement.student_id = None;
                        placement.student_name = None;
                    }
                }
            }
            Table::Companies => {
                self.companies.retain(|company| company.id != id);
                self.interactions
                    .retain(|interaction| interaction.company_id != id);
                for placement in &mut self.placements {
                    if placement.company_id == Some(id) {
                        placement.company_id = None;
                        placement.company_name = None;
                    }
                }
            }
            Table::Placements => self.placements.retain(|placement| placement.id != id),
            Table::PlacementOfficers => {
                self.placement_officers.retain(|officer| officer.id != id);
                self.interactions
                    .retain(|interaction| interaction.placement_officer_id != id);
                for placement in &mut self.placements {
                    if placement.placement_officer_id == Some(id) {
                        placement.placement_officer_id = None;
                        placement.placement_officer_name = None;
                    }
                }
            }
            Table::CompanyInteractions => {
                self.interactions.retain(|interaction| interaction.id != id)
            }
            Table::Users => {
                self.users.retain(|user| user.id != id);
                for school in &mut self.schools {
                    if school.project_lead_id == Some(id) {
                        school.project_lead_id = None;
                    }
                }
            }
        }
    }
}

fn upsert<T>(rows: &mut Vec<T>, row: T, id: impl Fn(&T) -> Uuid) {
    let key = id(&row);
    match rows.iter_mut().find(|existing| id(existing) == key) {
        Some(existing) => *existing = row,
        None => rows.push(row),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CollaborationStatus, CompanyStatus, InteractionType};
    use crate::view::interactions_timeline;
    use chrono::{TimeZone, Utc};

    fn company() -> Company {
        Company {
            id: Uuid::new_v4(),
            name: "TechNova".to_string(),
            contact_person: Some("Alex Morgan".to_string()),
            contact_email: None,
            contact_phone: None,
            collaboration_status: CollaborationStatus::Active,
            company_status: CompanyStatus::Partner,
            job_roles_offered: Vec::new(),
            created_at: Utc.with_ymd_and_hms(2023, 2, 15, 0, 0, 0).unwrap(),
        }
    }

    fn interaction(company_id: Uuid, officer_id: Uuid, day: u32) -> CompanyInteraction {
        CompanyInteraction {
            id: Uuid::new_v4(),
            company_id,
            placement_officer_id: officer_id,
            interaction_type: InteractionType::Meeting,
            description: "Quarterly hiring sync".to_string(),
            interaction_date: Utc.with_ymd_and_hms(2023, 6, day, 10, 0, 0).unwrap(),
        }
    }

    #[test]
    fn parses_trigger_payload() {
        let id = Uuid::new_v4();
        let payload = format!(r#"{{"table":"placement_officers","op":"DELETE","id":"{id}"}}"#);
        let event = ChangeEvent::parse(&payload).expect("payload");
        assert_eq!(
            event,
            ChangeEvent {
                table: Table::PlacementOfficers,
                op: ChangeKind::Delete,
                id
            }
        );
        assert!(ChangeEvent::parse(r#"{"table":"grades","op":"INSERT","id":"x"}"#).is_err());
    }

    #[tokio::test]
    async fn subscribers_only_see_their_tables() {
        let feed = ChangeFeed::new(16);
        let mut placements = feed.subscribe(&[Table::Placements]);
        let mut everything = feed.subscribe(&Table::ALL);

        let company_change = ChangeEvent {
            table: Table::Companies,
            op: ChangeKind::Update,
            id: Uuid::new_v4(),
        };
        let placement_change = ChangeEvent {
            table: Table::Placements,
            op: ChangeKind::Insert,
            id: Uuid::new_v4(),
        };
        assert_eq!(feed.publish(company_change), 2);
        assert_eq!(feed.publish(placement_change), 2);

        assert_eq!(placements.next().await, Some(Notice::Changed(placement_change)));
        assert_eq!(everything.next().await, Some(Notice::Changed(company_change)));
        assert_eq!(everything.next().await, Some(Notice::Changed(placement_change)));
    }

    #[tokio::test]
    async fn dropping_a_subscription_unsubscribes() {
        let feed = ChangeFeed::new(4);
        let subscription = feed.subscribe(&[Table::Students]);
        assert_eq!(feed.subscriber_count(), 1);
        subscription.unsubscribe();
        assert_eq!(feed.subscriber_count(), 0);
        assert_eq!(
            feed.publish(ChangeEvent {
                table: Table::Students,
                op: ChangeKind::Insert,
                id: Uuid::new_v4(),
            }),
            0
        );
    }

    #[tokio::test]
    async fn lagging_subscriber_is_told_to_resync() {
        let feed = ChangeFeed::new(2);
        let mut subscription = feed.subscribe(&[Table::Students]);
        for _ in 0..5 {
            feed.publish(ChangeEvent {
                table: Table::Students,
                op: ChangeKind::Update,
                id: Uuid::new_v4(),
            });
        }
        assert_eq!(subscription.next().await, Some(Notice::Missed(3)));
    }

    #[tokio::test]
    async fn closed_feed_ends_subscription() {
        let feed = ChangeFeed::new(2);
        let mut subscription = feed.subscribe(&[Table::Users]);
        drop(feed);
        assert_eq!(subscription.next().await, None);
    }

    #[test]
    fn upsert_replaces_by_id() {
        let mut snapshot = Snapshot::default();
        let mut technova = company();
        snapshot.apply(Change::Upsert(Record::Company(technova.clone())));
        technova.collaboration_status = CollaborationStatus::Inactive;
        snapshot.apply(Change::Upsert(Record::Company(technova.clone())));

        assert_eq!(snapshot.companies.len(), 1);
        assert_eq!(
            snapshot.companies[0].collaboration_status,
            CollaborationStatus::Inactive
        );
    }

    #[test]
    fn deleting_a_company_clears_its_timeline() {
        let technova = company();
        let other = company();
        let officer = Uuid::new_v4();
        let mut snapshot = Snapshot {
            companies: vec![technova.clone(), other.clone()],
            interactions: vec![
                interaction(technova.id, officer, 1),
                interaction(technova.id, officer, 2),
                interaction(other.id, officer, 3),
            ],
            ..Snapshot::default()
        };
        assert_eq!(interactions_timeline(&snapshot, technova.id).len(), 2);

        snapshot.apply(Change::Delete {
            table: Table::Companies,
            id: technova.id,
        });

        assert!(interactions_timeline(&snapshot, technova.id).is_empty());
        assert_eq!(snapshot.interactions.len(), 1);
        assert_eq!(interactions_timeline(&snapshot, other.id).len(), 1);
    }

    #[test]
    fn deleting_an_officer_detaches_placements() {
        let officer_id = Uuid::new_v4();
        let mut snapshot = Snapshot {
            placements: vec![Placement {
                id: Uuid::new_v4(),
                student_id: None,
                student_name: None,
                company_id: None,
                company_name: None,
                placement_officer_id: Some(officer_id),
                placement_officer_name: Some("Emily Chen".to_string()),
                placement_date: chrono::NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
                started_on: None,
                status: crate::models::PlacementProgress::Completed,
            }],
            ..Snapshot::default()
        };

        snapshot.apply(Change::Delete {
            table: Table::PlacementOfficers,
            id: officer_id,
        });

        assert_eq!(snapshot.placements.len(), 1);
        assert_eq!(snapshot.placements[0].placement_officer_id, None);
        assert_eq!(snapshot.placements[0].placement_officer_name, None);
    }

    #[test]
    fn deleting_a_school_detaches_everyone_in_it() {
        let school_id = Uuid::new_v4();
        let lead = User {
            id: Uuid::new_v4(),
            name: "John Davis".to_string(),
            email: "john@techinstitute.edu".to_string(),
            phone: None,
            role: crate::models::Role::ProjectLead,
            school_id: Some(school_id),
        };
        let mut snapshot = Snapshot {
            schools: vec![School {
                id: school_id,
                name: "Technology Institute".to_string(),
                location: None,
                project_lead_id: Some(lead.id),
            }],
            placement_officers: vec![PlacementOfficer {
                id: Uuid::new_v4(),
                name: "Emily Chen".to_string(),
                email: "emily@techinstitute.edu".to_string(),
                phone: None,
                school_id: Some(school_id),
            }],
            users: vec![lead],
            ..Snapshot::default()
        };

        snapshot.apply(Change::Delete {
            table: Table::Schools,
            id: school_id,
        });

        assert!(snapshot.schools.is_empty());
        assert_eq!(snapshot.placement_officers[0].school_id, None);
        assert_eq!(snapshot.users[0].school_id, None);
    }
}
