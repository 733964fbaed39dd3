//! SQLite-backed ticket store implementation.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use tracing::warn;

use super::{
    CreateTicketRequest, Priority, Ticket, TicketError, TicketFilter, TicketStatus, TicketStore,
    TicketUpdate,
};

const TICKET_COLUMNS: &str = "id, title, description, created_by, status, priority, summary, \
     helpful_notes, related_skills, assigned_to, processed, created_at, updated_at";

/// SQLite-backed ticket store.
pub struct SqliteTicketStore {
    conn: Mutex<Connection>,
}

impl SqliteTicketStore {
    /// Create a new SQLite ticket store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, TicketError> {
        let conn = Connection::open(path).map_err(|e| TicketError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite ticket store (useful for testing).
    pub fn in_memory() -> Result<Self, TicketError> {
        let conn =
            Connection::open_in_memory().map_err(|e| TicketError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), TicketError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS tickets (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                created_by TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'open',
                priority TEXT NOT NULL DEFAULT 'medium',
                summary TEXT NOT NULL DEFAULT '',
                helpful_notes TEXT NOT NULL DEFAULT '',
                related_skills TEXT NOT NULL DEFAULT '[]',
                assigned_to TEXT,
                processed INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tickets_processed ON tickets(processed);
            CREATE INDEX IF NOT EXISTS idx_tickets_assigned_to ON tickets(assigned_to);
            CREATE INDEX IF NOT EXISTS idx_tickets_created_at ON tickets(created_at);
            "#,
        )
        .map_err(|e| TicketError::Database(e.to_string()))?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, TicketError> {
        self.conn
            .lock()
            .map_err(|_| TicketError::Database("connection mutex poisoned".to_string()))
    }

    fn build_where_clause(filter: &TicketFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(status) = filter.status {
            conditions.push("status = ?");
            params.push(Box::new(status.as_str()));
        }

        if let Some(processed) = filter.processed {
            conditions.push("processed = ?");
            params.push(Box::new(processed));
        }

        if let Some(ref created_by) = filter.created_by {
            conditions.push("created_by = ?");
            params.push(Box::new(created_by.clone()));
        }

        if let Some(ref assigned_to) = filter.assigned_to {
            conditions.push("assigned_to = ?");
            params.push(Box::new(assigned_to.clone()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    fn build_set_clause(
        update: &TicketUpdate,
    ) -> Result<(Vec<&'static str>, Vec<Box<dyn rusqlite::ToSql>>), TicketError> {
        let mut assignments = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(status) = update.status {
            assignments.push("status = ?");
            params.push(Box::new(status.as_str()));
        }
        if let Some(priority) = update.priority {
            assignments.push("priority = ?");
            params.push(Box::new(priority.as_str()));
        }
        if let Some(ref summary) = update.summary {
            assignments.push("summary = ?");
            params.push(Box::new(summary.clone()));
        }
        if let Some(ref notes) = update.helpful_notes {
            assignments.push("helpful_notes = ?");
            params.push(Box::new(notes.clone()));
        }
        if let Some(ref skills) = update.related_skills {
            let json =
                serde_json::to_string(skills).map_err(|e| TicketError::Database(e.to_string()))?;
            assignments.push("related_skills = ?");
            params.push(Box::new(json));
        }
        if let Some(ref assigned_to) = update.assigned_to {
            assignments.push("assigned_to = ?");
            params.push(Box::new(assigned_to.clone()));
        }
        if let Some(processed) = update.processed {
            assignments.push("processed = ?");
            params.push(Box::new(processed));
        }

        Ok((assignments, params))
    }

    fn select_by_id(conn: &Connection, id: &str) -> Result<Option<Ticket>, TicketError> {
        let result = conn.query_row(
            &format!("SELECT {} FROM tickets WHERE id = ?", TICKET_COLUMNS),
            params![id],
            Self::row_to_ticket,
        );

        match result {
            Ok(ticket) => Ok(Some(ticket)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(TicketError::Database(e.to_string())),
        }
    }

    fn row_to_ticket(row: &rusqlite::Row) -> rusqlite::Result<Ticket> {
        let status_str: String = row.get(4)?;
        let priority_str: String = row.get(5)?;
        let skills_json: String = row.get(8)?;
        let created_at_str: String = row.get(11)?;
        let updated_at_str: String = row.get(12)?;

        // Rows written by this store are always well formed; legacy labels
        // are mapped onto the canonical vocabulary.
        let status = TicketStatus::from_str(&status_str).unwrap_or_else(|e| {
            let id: String = row.get(0).unwrap_or_default();
            warn!(
                "Ticket {} has {}; reading it as {}",
                id,
                e,
                TicketStatus::default().as_str()
            );
            TicketStatus::default()
        });
        let priority = Priority::coerce(&priority_str);
        let related_skills: Vec<String> = serde_json::from_str(&skills_json).unwrap_or_default();

        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        let updated_at = DateTime::parse_from_rfc3339(&updated_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(Ticket {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            created_by: row.get(3)?,
            status,
            priority,
            summary: row.get(6)?,
            helpful_notes: row.get(7)?,
            related_skills,
            assigned_to: row.get(9)?,
            processed: row.get(10)?,
            created_at,
            updated_at,
        })
    }
}

impl TicketStore for SqliteTicketStore {
    fn create(&self, request: CreateTicketRequest) -> Result<Ticket, TicketError> {
        request.validate()?;

        let conn = self.conn()?;

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let status = TicketStatus::Open;
        let priority = Priority::default();

        conn.execute(
            "INSERT INTO tickets (id, title, description, created_by, status, priority, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                id,
                request.title,
                request.description,
                request.created_by,
                status.as_str(),
                priority.as_str(),
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )
        .map_err(|e| TicketError::Database(e.to_string()))?;

        Ok(Ticket {
            id,
            title: request.title,
            description: request.description,
            created_by: request.created_by,
            status,
            priority,
            summary: String::new(),
            helpful_notes: String::new(),
            related_skills: Vec::new(),
            assigned_to: None,
            processed: false,
            created_at: now,
            updated_at: now,
        })
    }

    fn get(&self, id: &str) -> Result<Option<Ticket>, TicketError> {
        let conn = self.conn()?;
        Self::select_by_id(&conn, id)
    }

    fn update_fields(&self, id: &str, update: &TicketUpdate) -> Result<Ticket, TicketError> {
        let conn = self.conn()?;

        let (mut assignments, mut params) = Self::build_set_clause(update)?;
        assignments.push("updated_at = ?");
        params.push(Box::new(Utc::now().to_rfc3339()));
        params.push(Box::new(id.to_string()));

        let sql = format!("UPDATE tickets SET {} WHERE id = ?", assignments.join(", "));
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let changed = conn
            .execute(&sql, param_refs.as_slice())
            .map_err(|e| TicketError::Database(e.to_string()))?;

        if changed == 0 {
            return Err(TicketError::NotFound(id.to_string()));
        }

        Self::select_by_id(&conn, id)?.ok_or_else(|| TicketError::NotFound(id.to_string()))
    }

    fn list(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, TicketError> {
        let conn = self.conn()?;

        let (where_clause, params) = Self::build_where_clause(filter);

        let sql = format!(
            "SELECT {} FROM tickets {} ORDER BY created_at ASC, rowid ASC LIMIT ? OFFSET ?",
            TICKET_COLUMNS, where_clause
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| TicketError::Database(e.to_string()))?;

        let mut all_params: Vec<Box<dyn rusqlite::ToSql>> = params;
        all_params.push(Box::new(filter.limit));
        all_params.push(Box::new(filter.offset));

        let param_refs: Vec<&dyn rusqlite::ToSql> =
            all_params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), Self::row_to_ticket)
            .map_err(|e| TicketError::Database(e.to_string()))?;

        let mut tickets = Vec::new();
        for row_result in rows {
            let ticket = row_result.map_err(|e| TicketError::Database(e.to_string()))?;
            tickets.push(ticket);
        }

        Ok(tickets)
    }

    fn count(&self, filter: &TicketFilter) -> Result<i64, TicketError> {
        let conn = self.conn()?;

        let (where_clause, params) = Self::build_where_clause(filter);

        let sql = format!("SELECT COUNT(*) FROM tickets {}", where_clause);

        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let count: i64 = conn
            .query_row(&sql, param_refs.as_slice(), |row| row.get(0))
            .map_err(|e| TicketError::Database(e.to_string()))?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_store() -> SqliteTicketStore {
        SqliteTicketStore::in_memory().unwrap()
    }

    fn create_test_request() -> CreateTicketRequest {
        CreateTicketRequest::new(
            "Login page crashes",
            "Clicking submit on the React login form throws a white screen",
            "user-1",
        )
    }

    #[test]
    fn test_create_ticket() {
        let store = create_test_store();
        let ticket = store.create(create_test_request()).unwrap();

        assert!(!ticket.id.is_empty());
        assert_eq!(ticket.title, "Login page crashes");
        assert_eq!(ticket.status, TicketStatus::Open);
        assert_eq!(ticket.priority, Priority::Medium);
        assert!(!ticket.processed);
        assert!(ticket.assigned_to.is_none());
        assert!(ticket.related_skills.is_empty());
    }

    #[test]
    fn test_create_rejects_blank_title() {
        let store = create_test_store();
        let result = store.create(CreateTicketRequest::new("", "body", "user-1"));
        assert!(matches!(result, Err(TicketError::Validation(_))));
        assert_eq!(store.count(&TicketFilter::new()).unwrap(), 0);
    }

    #[test]
    fn test_get_ticket() {
        let store = create_test_store();
        let created = store.create(create_test_request()).unwrap();

        let fetched = store.get(&created.id).unwrap().unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.description, created.description);
    }

    #[test]
    fn test_get_nonexistent_ticket() {
        let store = create_test_store();
        assert!(store.get("nonexistent-id").unwrap().is_none());
    }

    #[test]
    fn test_update_fields_partial() {
        let store = create_test_store();
        let created = store.create(create_test_request()).unwrap();

        let updated = store
            .update_fields(&created.id, &TicketUpdate::new().with_status(TicketStatus::Todo))
            .unwrap();

        assert_eq!(updated.status, TicketStatus::Todo);
        assert_eq!(updated.title, created.title);
        assert_eq!(updated.priority, Priority::Medium);
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(updated.created_at.timestamp(), created.created_at.timestamp());
    }

    #[test]
    fn test_related_skills_preserve_order() {
        let store = create_test_store();
        let created = store.create(create_test_request()).unwrap();

        let skills = vec![
            "React".to_string(),
            "Node.js".to_string(),
            "CSS".to_string(),
        ];
        store
            .update_fields(
                &created.id,
                &TicketUpdate::new().with_related_skills(skills.clone()),
            )
            .unwrap();

        let fetched = store.get(&created.id).unwrap().unwrap();
        assert_eq!(fetched.related_skills, skills);
    }

    #[test]
    fn test_update_assignee_and_clear() {
        let store = create_test_store();
        let created = store.create(create_test_request()).unwrap();

        let assigned = store
            .update_fields(
                &created.id,
                &TicketUpdate::new().with_assigned_to(Some("mod-1".to_string())),
            )
            .unwrap();
        assert_eq!(assigned.assigned_to.as_deref(), Some("mod-1"));

        let cleared = store
            .update_fields(&created.id, &TicketUpdate::new().with_assigned_to(None))
            .unwrap();
        assert!(cleared.assigned_to.is_none());
    }

    #[test]
    fn test_update_nonexistent_ticket() {
        let store = create_test_store();
        let result = store.update_fields("missing", &TicketUpdate::new().with_processed(true));
        assert!(matches!(result, Err(TicketError::NotFound(_))));
    }

    #[test]
    fn test_list_and_count_by_processed() {
        let store = create_test_store();
        let first = store.create(create_test_request()).unwrap();
        store.create(create_test_request()).unwrap();
        store.create(create_test_request()).unwrap();

        store
            .update_fields(&first.id, &TicketUpdate::new().with_processed(true))
            .unwrap();

        let unprocessed = store
            .list(&TicketFilter::new().with_processed(false))
            .unwrap();
        assert_eq!(unprocessed.len(), 2);
        assert!(unprocessed.iter().all(|t| !t.processed));

        assert_eq!(
            store.count(&TicketFilter::new().with_processed(true)).unwrap(),
            1
        );
    }

    #[test]
    fn test_list_by_creator() {
        let store = create_test_store();
        store.create(create_test_request()).unwrap();
        let other = store
            .create(CreateTicketRequest::new("Other", "Details", "user-2"))
            .unwrap();

        let mine = store
            .list(&TicketFilter::new().with_created_by("user-2"))
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, other.id);
        assert_eq!(
            store
                .count(&TicketFilter::new().with_created_by("user-1"))
                .unwrap(),
            1
        );
    }

    #[test]
    fn test_unknown_stored_status_reads_as_open() {
        let store = create_test_store();
        let ticket = store.create(create_test_request()).unwrap();
        store
            .conn()
            .unwrap()
            .execute(
                "UPDATE tickets SET status = 'waiting_on_vendor' WHERE id = ?",
                params![ticket.id],
            )
            .unwrap();

        let read = store.get(&ticket.id).unwrap().unwrap();
        assert_eq!(read.status, TicketStatus::Open);
        assert_eq!(read.title, ticket.title);
    }

    #[test]
    fn test_list_with_pagination() {
        let store = create_test_store();
        for _ in 0..5 {
            store.create(create_test_request()).unwrap();
        }

        let page = store
            .list(&TicketFilter::new().with_limit(2).with_offset(1))
            .unwrap();
        assert_eq!(page.len(), 2);
    }

    #[test]
    fn test_persists_to_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("tickets.db");

        let id = {
            let store = SqliteTicketStore::new(&path).unwrap();
            store.create(create_test_request()).unwrap().id
        };

        let store = SqliteTicketStore::new(&path).unwrap();
        assert!(store.get(&id).unwrap().is_some());
    }
}
