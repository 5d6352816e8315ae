//! SQLite-backed plan and space repositories.

use crate::{
    Error, Event, EventKind, PlanId, PlanRepository, Result, Space, SpaceId, SpaceRepository,
    WebhostingPlan,
};
use capability::{Capabilities, CapabilityRegistry};
use chrono::{DateTime, Utc};
use policy::UserId;
use rusqlite::{Connection, OptionalExtension, Params, params};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// SQLite store for plans, spaces and their event log.
///
/// Capabilities are stored as their JSON object form and rebuilt through the
/// registry the store was opened with.
pub struct Store {
    conn: Connection,
    registry: Arc<CapabilityRegistry>,
}

impl Store {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>, registry: Arc<CapabilityRegistry>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn, registry };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory(registry: Arc<CapabilityRegistry>) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn, registry };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;
            CREATE TABLE IF NOT EXISTS plans (
                id TEXT PRIMARY KEY,
                capabilities TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS spaces (
                id TEXT PRIMARY KEY,
                owner TEXT,
                plan_id TEXT REFERENCES plans(id),
                capabilities TEXT NOT NULL,
                marked_for_removal INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_spaces_plan ON spaces(plan_id);
            CREATE TABLE IF NOT EXISTS events (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                aggregate_id TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                kind TEXT NOT NULL,
                data TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_events_aggregate
                ON events(aggregate_id, seq);
            "#,
        )?;
        Ok(())
    }

    pub fn registry(&self) -> &Arc<CapabilityRegistry> {
        &self.registry
    }

    /// Plan repository backed by this store.
    pub fn plans(&self) -> Plans<'_> {
        Plans { store: self }
    }

    /// Space repository backed by this store.
    pub fn spaces(&self) -> Spaces<'_> {
        Spaces { store: self }
    }

    /// Load all events of a plan or space, oldest first.
    pub fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<Event>> {
        self.query_events(
            "SELECT id, timestamp, data FROM events WHERE aggregate_id = ?1 ORDER BY seq",
            [aggregate_id.to_string()],
        )
    }

    /// Load the complete event log, oldest first.
    pub fn all_events(&self) -> Result<Vec<Event>> {
        self.query_events("SELECT id, timestamp, data FROM events ORDER BY seq", [])
    }

    fn query_events<P: Params>(&self, sql: &str, params: P) -> Result<Vec<Event>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, |row| {
                let id: String = row.get(0)?;
                let timestamp: String = row.get(1)?;
                let data: String = row.get(2)?;
                Ok((id, timestamp, data))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(id, timestamp, data)| -> Result<Event> {
                let kind: EventKind = serde_json::from_str(&data)?;
                Ok(Event {
                    id: parse_uuid(&id)?,
                    aggregate_id: kind.aggregate_id(),
                    timestamp: timestamp
                        .parse::<DateTime<Utc>>()
                        .map_err(|e| Error::Corrupt(format!("event {id} timestamp: {e}")))?,
                    kind,
                })
            })
            .collect()
    }

    fn capabilities(&self, json: &str) -> Result<Capabilities> {
        Ok(self.registry.reconstitute_json(json)?)
    }

    /// Run `write` and append `pending` events in one transaction.
    fn commit<F>(&self, pending: Vec<EventKind>, write: F) -> Result<Vec<Event>>
    where
        F: FnOnce(&Connection) -> Result<()>,
    {
        let tx = self.conn.unchecked_transaction()?;
        write(&*tx)?;

        let events: Vec<Event> = pending.into_iter().map(Event::new).collect();
        for event in &events {
            tx.execute(
                "INSERT INTO events (id, aggregate_id, timestamp, kind, data) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    event.id.to_string(),
                    event.aggregate_id.to_string(),
                    event.timestamp.to_rfc3339(),
                    event.kind.name(),
                    serde_json::to_string(&event.kind)?,
                ],
            )?;
        }

        tx.commit()?;
        Ok(events)
    }

    fn decode_space(&self, row: SpaceRow) -> Result<Space> {
        let SpaceRow {
            id,
            owner,
            plan,
            capabilities,
            marked_for_removal,
        } = row;

        Ok(Space::reconstitute(
            SpaceId(parse_uuid(&id)?),
            owner.as_deref().map(parse_uuid).transpose()?.map(UserId),
            plan.as_deref().map(parse_uuid).transpose()?.map(PlanId),
            self.capabilities(&capabilities)?,
            marked_for_removal,
        ))
    }
}

struct SpaceRow {
    id: String,
    owner: Option<String>,
    plan: Option<String>,
    capabilities: String,
    marked_for_removal: bool,
}

impl SpaceRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner: row.get(1)?,
            plan: row.get(2)?,
            capabilities: row.get(3)?,
            marked_for_removal: row.get(4)?,
        })
    }
}

fn parse_uuid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| Error::Corrupt(format!("invalid id '{value}': {e}")))
}

/// [`PlanRepository`] over a [`Store`].
pub struct Plans<'a> {
    store: &'a Store,
}

impl PlanRepository for Plans<'_> {
    fn get(&self, id: PlanId) -> Result<WebhostingPlan> {
        let capabilities: Option<String> = self
            .store
            .conn
            .query_row(
                "SELECT capabilities FROM plans WHERE id = ?1",
                [id.0.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        let Some(capabilities) = capabilities else {
            return Err(Error::PlanNotFound(id));
        };
        Ok(WebhostingPlan::reconstitute(id, self.store.capabilities(&capabilities)?))
    }

    fn all(&self) -> Result<Vec<WebhostingPlan>> {
        let mut stmt = self
            .store
            .conn
            .prepare("SELECT id, capabilities FROM plans ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(id, capabilities)| -> Result<WebhostingPlan> {
                Ok(WebhostingPlan::reconstitute(
                    PlanId(parse_uuid(&id)?),
                    self.store.capabilities(&capabilities)?,
                ))
            })
            .collect()
    }

    fn save(&self, plan: &mut WebhostingPlan) -> Result<Vec<Event>> {
        let id = plan.id().0.to_string();
        let capabilities = serde_json::to_string(plan.capabilities())?;

        let events = self.store.commit(plan.recorded_events().to_vec(), |conn| {
            conn.execute(
                "INSERT INTO plans (id, capabilities) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET capabilities = excluded.capabilities",
                params![id, capabilities],
            )?;
            Ok(())
        })?;
        plan.take_events();

        tracing::debug!(plan = %plan.id(), events = events.len(), "saved webhosting plan");
        Ok(events)
    }

    fn remove(&self, plan: &mut WebhostingPlan) -> Result<Vec<Event>> {
        let id = plan.id();
        let spaces: i64 = self.store.conn.query_row(
            "SELECT COUNT(*) FROM spaces WHERE plan_id = ?1",
            [id.0.to_string()],
            |row| row.get(0),
        )?;
        if spaces > 0 {
            return Err(Error::PlanInUse {
                plan: id,
                spaces: spaces as usize,
            });
        }

        let mut pending = plan.recorded_events().to_vec();
        pending.push(EventKind::PlanRemoved { plan: id });

        let events = self.store.commit(pending, |conn| {
            match conn.execute("DELETE FROM plans WHERE id = ?1", [id.0.to_string()])? {
                0 => Err(Error::PlanNotFound(id)),
                _ => Ok(()),
            }
        })?;
        plan.take_events();

        tracing::info!(plan = %id, "removed webhosting plan");
        Ok(events)
    }
}

/// [`SpaceRepository`] over a [`Store`].
pub struct Spaces<'a> {
    store: &'a Store,
}

impl SpaceRepository for Spaces<'_> {
    fn get(&self, id: SpaceId) -> Result<Space> {
        let row = self
            .store
            .conn
            .query_row(
                "SELECT id, owner, plan_id, capabilities, marked_for_removal FROM spaces WHERE id = ?1",
                [id.0.to_string()],
                SpaceRow::from_row,
            )
            .optional()?;

        match row {
            Some(row) => self.store.decode_space(row),
            None => Err(Error::SpaceNotFound(id)),
        }
    }

    fn all_with_plan(&self, plan: PlanId) -> Result<Vec<Space>> {
        let mut stmt = self.store.conn.prepare(
            "SELECT id, owner, plan_id, capabilities, marked_for_removal FROM spaces
             WHERE plan_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map([plan.0.to_string()], SpaceRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|row| self.store.decode_space(row))
            .collect()
    }

    fn save(&self, space: &mut Space) -> Result<Vec<Event>> {
        let id = space.id().0.to_string();
        let owner = space.owner().map(|o| o.0.to_string());
        let plan = space.plan().map(|p| p.0.to_string());
        let capabilities = serde_json::to_string(space.capabilities())?;
        let marked = space.is_marked_for_removal();

        let events = self.store.commit(space.recorded_events().to_vec(), |conn| {
            conn.execute(
                "INSERT INTO spaces (id, owner, plan_id, capabilities, marked_for_removal)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    owner = excluded.owner,
                    plan_id = excluded.plan_id,
                    capabilities = excluded.capabilities,
                    marked_for_removal = excluded.marked_for_removal",
                params![id, owner, plan, capabilities, marked],
            )?;
            Ok(())
        })?;
        space.take_events();

        tracing::debug!(space = %space.id(), events = events.len(), "saved webhosting space");
        Ok(events)
    }

    fn remove(&self, space: &mut Space) -> Result<Vec<Event>> {
        let id = space.id();
        if !space.is_marked_for_removal() {
            return Err(Error::CannotRemoveActiveSpace(id));
        }

        let mut pending = space.recorded_events().to_vec();
        pending.push(EventKind::SpaceRemoved { space: id });

        let events = self.store.commit(pending, |conn| {
            match conn.execute("DELETE FROM spaces WHERE id = ?1", [id.0.to_string()])? {
                0 => Err(Error::SpaceNotFound(id)),
                _ => Ok(()),
            }
        })?;
        space.take_events();

        tracing::info!(space = %id, "removed webhosting space");
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capability::{FtpUserCount, MailboxCount, StorageSpaceQuota};

    fn store() -> Store {
        Store::in_memory(Arc::new(CapabilityRegistry::with_builtin())).unwrap()
    }

    fn saved_plan(store: &Store) -> WebhostingPlan {
        let mut plan = WebhostingPlan::create(
            PlanId::new(),
            Capabilities::new()
                .with(StorageSpaceQuota { limit_bytes: 1 << 30 })
                .with(MailboxCount { limit: Some(10) }),
        );
        store.plans().save(&mut plan).unwrap();
        plan
    }

    #[test]
    fn test_plan_round_trip() {
        let store = store();
        let plan = saved_plan(&store);

        let loaded = store.plans().get(plan.id()).unwrap();
        assert_eq!(loaded.capabilities(), plan.capabilities());
        assert!(loaded.recorded_events().is_empty());
        assert_eq!(store.plans().all().unwrap().len(), 1);
    }

    #[test]
    fn test_capabilities_stored_by_id() {
        let store = store();
        let plan = saved_plan(&store);

        let json: String = store
            .conn
            .query_row(
                "SELECT capabilities FROM plans WHERE id = ?1",
                [plan.id().0.to_string()],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(
            json,
            r#"{"mailbox_count":{"limit":10},"storage_space_quota":{"limit_bytes":1073741824}}"#
        );
    }

    #[test]
    fn test_save_returns_and_clears_events() {
        let store = store();
        let mut plan = WebhostingPlan::create(PlanId::new(), Capabilities::new());

        let events = store.plans().save(&mut plan).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].aggregate_id, plan.id().0);
        assert!(plan.recorded_events().is_empty());

        assert!(store.plans().save(&mut plan).unwrap().is_empty());
        assert_eq!(store.load_events(plan.id().0).unwrap(), events);
    }

    #[test]
    fn test_missing_entities() {
        let store = store();
        assert!(matches!(store.plans().get(PlanId::new()), Err(Error::PlanNotFound(_))));
        assert!(matches!(store.spaces().get(SpaceId::new()), Err(Error::SpaceNotFound(_))));
    }

    #[test]
    fn test_space_round_trip() {
        let store = store();
        let plan = saved_plan(&store);
        let owner = UserId::new();

        let mut space = Space::register(SpaceId::new(), Some(owner), &plan);
        store.spaces().save(&mut space).unwrap();

        let loaded = store.spaces().get(space.id()).unwrap();
        assert_eq!(loaded.owner(), Some(owner));
        assert_eq!(loaded.plan(), Some(plan.id()));
        assert_eq!(loaded.capabilities(), plan.capabilities());
        assert!(!loaded.is_marked_for_removal());

        let with_plan = store.spaces().all_with_plan(plan.id()).unwrap();
        assert_eq!(with_plan.len(), 1);
        assert_eq!(with_plan[0].id(), space.id());
    }

    #[test]
    fn test_remove_active_space_fails() {
        let store = store();
        let mut space = Space::register_with_capabilities(
            SpaceId::new(),
            None,
            Capabilities::new().with(FtpUserCount { limit: None }),
        );
        store.spaces().save(&mut space).unwrap();

        let err = store.spaces().remove(&mut space).unwrap_err();
        assert!(matches!(err, Error::CannotRemoveActiveSpace(id) if id == space.id()));
        assert!(store.spaces().get(space.id()).is_ok());
    }

    #[test]
    fn test_remove_marked_space() {
        let store = store();
        let mut space = Space::register_with_capabilities(SpaceId::new(), None, Capabilities::new());
        store.spaces().save(&mut space).unwrap();

        space.mark_for_removal();
        let events = store.spaces().remove(&mut space).unwrap();
        let names: Vec<_> = events.iter().map(|e| e.kind.name()).collect();
        assert_eq!(names, vec!["space_marked_for_removal", "space_removed"]);
        assert!(matches!(store.spaces().get(space.id()), Err(Error::SpaceNotFound(_))));
    }

    #[test]
    fn test_remove_plan_in_use() {
        let store = store();
        let mut plan = saved_plan(&store);
        let mut space = Space::register(SpaceId::new(), None, &plan);
        store.spaces().save(&mut space).unwrap();

        let err = store.plans().remove(&mut plan).unwrap_err();
        assert!(matches!(err, Error::PlanInUse { spaces: 1, .. }));

        space.assign_custom_capabilities(Capabilities::new());
        store.spaces().save(&mut space).unwrap();
        store.plans().remove(&mut plan).unwrap();
        assert!(matches!(store.plans().get(plan.id()), Err(Error::PlanNotFound(_))));
    }

    #[test]
    fn test_unregistered_capability_in_storage() {
        let store = store();
        let plan = saved_plan(&store);

        let empty = Store {
            conn: Connection::open_in_memory().unwrap(),
            registry: Arc::new(CapabilityRegistry::new()),
        };
        empty.init_schema().unwrap();
        empty
            .conn
            .execute(
                "INSERT INTO plans (id, capabilities) VALUES (?1, ?2)",
                params![plan.id().0.to_string(), r#"{"mailbox_count":{"limit":1}}"#],
            )
            .unwrap();

        let err = empty.plans().get(plan.id()).unwrap_err();
        assert!(matches!(err, Error::Capability(capability::Error::NotRegistered { .. })));
    }

    #[test]
    fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parkmanager.db");
        let registry = Arc::new(CapabilityRegistry::with_builtin());

        let id = {
            let store = Store::open(&path, registry.clone()).unwrap();
            saved_plan(&store).id()
        };

        let store = Store::open(&path, registry).unwrap();
        assert!(store.plans().get(id).is_ok());
        assert_eq!(store.all_events().unwrap().len(), 1);
    }
}
