//! Plan computation and application.

use std::collections::HashMap;

use tracing::trace;

use crate::error::KinsyncResult;
use crate::event::{Event, EventPatch};
use crate::feed::ExternalEventRecord;
use crate::reconcile::{EventOp, OpKind};
use crate::source::CalendarSource;
use crate::store::EventStore;

/// The writes needed to bring the store in line with one parse of a feed.
#[derive(Debug, Clone, Default)]
pub struct ReconcilePlan {
    /// Operations in the order the records were parsed
    pub ops: Vec<EventOp>,
    pub created: usize,
    pub updated: usize,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    fn push(&mut self, op: EventOp) {
        match op.kind() {
            OpKind::Create => self.created += 1,
            OpKind::Update => self.updated += 1,
        }
        self.ops.push(op);
    }
}

/// Match each record to the event previously imported under the same
/// `(source id, uid)` key.
///
/// Known keys become updates of the existing event (its id and
/// application-owned fields are kept); unknown keys become creates with an id
/// derived from the key. A UID repeated within one feed updates the event
/// created for its first occurrence.
///
/// Reads the source's events from the store once per call.
pub fn reconcile(
    source: &CalendarSource,
    records: &[ExternalEventRecord],
    store: &dyn EventStore,
) -> KinsyncResult<ReconcilePlan> {
    let category = source.category.event_category();
    let mut plan = ReconcilePlan::default();
    let mut known: HashMap<String, String> = store
        .list_by_source(&source.id)?
        .into_iter()
        .filter_map(|event| Some((event.source_event_id?, event.id)))
        .collect();

    for record in records {
        let patch = EventPatch {
            title: record.title.clone(),
            description: record.description.clone(),
            location: record.location.clone(),
            start: record.start,
            end: record.end,
            all_day: record.all_day,
            category,
        };

        let existing_id = known.get(&record.uid).cloned();

        match existing_id {
            Some(id) => plan.push(EventOp::Update { id, patch }),
            None => {
                let event = Event {
                    id: Event::imported_id(&source.id, &record.uid),
                    title: patch.title,
                    description: patch.description,
                    location: patch.location,
                    start: patch.start,
                    end: patch.end,
                    all_day: patch.all_day,
                    category,
                    source_calendar_id: Some(source.id.clone()),
                    source_event_id: Some(record.uid.clone()),
                    is_external: true,
                    assignees: Vec::new(),
                    child_id: None,
                };
                known.insert(record.uid.clone(), event.id.clone());
                plan.push(EventOp::Create(event));
            }
        }
    }

    Ok(plan)
}

/// Apply a plan's operations to the store, in order.
pub fn apply_plan(plan: &ReconcilePlan, store: &dyn EventStore) -> KinsyncResult<()> {
    for op in &plan.ops {
        trace!(id = op.event_id(), "{}", op);
        match op {
            EventOp::Create(event) => {
                store.create(event.clone())?;
            }
            EventOp::Update { id, patch } => store.update(id, patch)?,
        }
    }
    Ok(())
}
