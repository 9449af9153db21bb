use std::collections::HashSet;
use std::slice;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rand::{rngs::StdRng, SeedableRng};
use tracing::{info, info_span, warn, Instrument};

use crate::domain::models::{
    entrant::{normalize_email, Entrant, EntrantStatus, NewEntrantParams},
    event::{Event, EventCapacity},
    notification::Notification,
};
use crate::domain::ports::{EntrantRepository, EventRepository, NotificationRepository};
use crate::domain::services::event_locks::EventLocks;
use crate::domain::services::lottery::{self, DrawPolicy, DrawResult};
use crate::error::AppError;

pub struct JoinRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// Drives entrants through WAITING -> INVITED/ENROLLED -> CANCELLED.
///
/// Every mutating operation holds the owning event's lock from the first read
/// of the waiting pool until its writes are committed, and counter changes go
/// through the same atomic batch as the entrant writes.
pub struct LifecycleManager {
    entrant_repo: Arc<dyn EntrantRepository>,
    event_repo: Arc<dyn EventRepository>,
    notification_repo: Arc<dyn NotificationRepository>,
    policy: DrawPolicy,
    rng: Mutex<StdRng>,
    locks: EventLocks,
}

impl LifecycleManager {
    pub fn new(
        entrant_repo: Arc<dyn EntrantRepository>,
        event_repo: Arc<dyn EventRepository>,
        notification_repo: Arc<dyn NotificationRepository>,
        policy: DrawPolicy,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            entrant_repo,
            event_repo,
            notification_repo,
            policy,
            rng: Mutex::new(rng),
            locks: EventLocks::new(),
        }
    }

    pub fn policy(&self) -> DrawPolicy {
        self.policy
    }

    async fn require_event(&self, event_id: &str) -> Result<Event, AppError> {
        self.event_repo.find_by_id(event_id).await?
            .ok_or(AppError::NotFound("Event not found".into()))
    }

    async fn require_entrant(&self, entrant_id: &str) -> Result<Entrant, AppError> {
        self.entrant_repo.find_entrant(entrant_id).await?
            .ok_or(AppError::NotFound("Entrant not found".into()))
    }

    async fn event_name(&self, event_id: &str) -> String {
        match self.event_repo.find_by_id(event_id).await {
            Ok(Some(event)) if !event.name.trim().is_empty() => event.name,
            _ => "this event".to_string(),
        }
    }

    async fn notify(&self, notification: Notification) {
        if let Err(e) = self.notification_repo.create(&notification).await {
            warn!(entrant_id = %notification.entrant_id, "Failed to store notification: {}", e);
        }
    }

    pub async fn join_waiting_list(&self, event_id: &str, request: JoinRequest) -> Result<Entrant, AppError> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::Validation("Name is required".into()));
        }
        let email = normalize_email(&request.email);
        if !email.contains('@') {
            return Err(AppError::Validation("A valid email is required".into()));
        }

        let span = info_span!("lottery_operation", operation = "join_waiting_list", event_id = %event_id);
        async move {
            let event = self.require_event(event_id).await?;
            let _guard = self.locks.acquire(event_id).await;

            if self.entrant_repo.find_active_by_email(event_id, &email).await?.is_some() {
                return Err(AppError::AlreadyOnList);
            }

            let capacity = self.event_repo.get_event_capacity(event_id).await?;
            let waiting = self.entrant_repo.count_by_status(event_id, EntrantStatus::Waiting).await?;
            if capacity.is_waiting_list_full(waiting as usize) {
                return Err(AppError::WaitingListFull);
            }

            let entrant = Entrant::new(NewEntrantParams {
                event_id: event_id.to_string(),
                name,
                email,
                phone: request.phone.filter(|p| !p.trim().is_empty()),
            }, Utc::now());
            let saved = self.entrant_repo.save_entrant(&entrant).await?;

            info!(entrant_id = %saved.id, "Entrant joined waiting list");
            self.notify(Notification::joined(&saved, &event.name)).await;
            Ok(saved)
        }
            .instrument(span)
            .await
    }

    pub async fn run_lottery(&self, event_id: &str, count: usize) -> Result<DrawResult, AppError> {
        if count == 0 {
            return Err(AppError::Validation("count must be at least 1".into()));
        }

        let span = info_span!("lottery_operation", operation = "run_lottery", event_id = %event_id);
        async move {
            let event = self.require_event(event_id).await?;
            let guard = self.locks.acquire(event_id).await;

            let pool = self.entrant_repo.fetch_waiting_pool(event_id).await?;
            let mut capacity = self.event_repo.get_event_capacity(event_id).await?;
            let pool_size = pool.len();
            let candidates = pool.clone();

            let result = {
                let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                lottery::draw(pool, count, self.policy, Utc::now(), &mut *rng)
            }?;

            let enrolled = result.enrolled_count() as i32;
            capacity.apply_delta(enrolled)?;

            self.entrant_repo.save_entrants_batch(event_id, &result.winners, enrolled).await?;
            drop(guard);

            info!(
                pool_size,
                requested = count,
                selected = result.winners.len(),
                enrolled,
                "Lottery drawn"
            );

            let winner_ids: HashSet<&str> = result.winners.iter().map(|w| w.id.as_str()).collect();
            for winner in &result.winners {
                let notification = match winner.status {
                    EntrantStatus::Enrolled => Notification::enrolled(winner, &event.name),
                    _ => Notification::selected(winner, &event.name),
                };
                self.notify(notification).await;
            }
            for entrant in candidates.iter().filter(|e| !winner_ids.contains(e.id.as_str())) {
                self.notify(Notification::not_selected(entrant, &event.name)).await;
            }

            Ok(result)
        }
            .instrument(span)
            .await
    }

    /// Organizer cancellation. Legal from INVITED, and from ENROLLED where it also releases a spot.
    pub async fn cancel_entrant(&self, entrant_id: &str) -> Result<Entrant, AppError> {
        let event_id = self.require_entrant(entrant_id).await?.event_id;

        let span = info_span!("lottery_operation", operation = "cancel_entrant", event_id = %event_id);
        async move {
            let _guard = self.locks.acquire(&event_id).await;
            let mut entrant = self.require_entrant(entrant_id).await?;

            let enrolled_delta = match entrant.status {
                EntrantStatus::Invited => 0,
                EntrantStatus::Enrolled => {
                    let mut capacity = self.event_repo.get_event_capacity(&event_id).await?;
                    if capacity.decrement_enrolled() {
                        -1
                    } else {
                        warn!(entrant_id = %entrant.id, "Enrolled counter already at zero, nothing to release");
                        0
                    }
                }
                from => {
                    return Err(AppError::InvalidStateTransition { from, to: EntrantStatus::Cancelled });
                }
            };

            entrant.transition(EntrantStatus::Cancelled, Utc::now());
            self.entrant_repo
                .save_entrants_batch(&event_id, slice::from_ref(&entrant), enrolled_delta)
                .await?;

            info!(entrant_id = %entrant.id, released = enrolled_delta != 0, "Entrant cancelled");
            let event_name = self.event_name(&event_id).await;
            self.notify(Notification::cancelled(&entrant, &event_name)).await;
            Ok(entrant)
        }
            .instrument(span)
            .await
    }

    pub async fn draw_replacement(&self, event_id: &str) -> Result<Entrant, AppError> {
        let span = info_span!("lottery_operation", operation = "draw_replacement", event_id = %event_id);
        async move {
            let event = self.require_event(event_id).await?;
            let _guard = self.locks.acquire(event_id).await;

            let pool = self.entrant_repo.fetch_waiting_pool(event_id).await?;
            let chosen = {
                let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                lottery::draw_replacement(pool, Utc::now(), &mut *rng)
            }?;

            let saved = self.entrant_repo.save_entrant(&chosen).await?;

            info!(entrant_id = %saved.id, "Replacement drawn");
            self.notify(Notification::replacement(&saved, &event.name)).await;
            Ok(saved)
        }
            .instrument(span)
            .await
    }

    pub async fn respond_to_invitation(&self, entrant_id: &str, accept: bool) -> Result<Entrant, AppError> {
        let event_id = self.require_entrant(entrant_id).await?.event_id;

        let span = info_span!("lottery_operation", operation = "respond_to_invitation", event_id = %event_id);
        async move {
            let _guard = self.locks.acquire(&event_id).await;
            let mut entrant = self.require_entrant(entrant_id).await?;

            let to = if accept { EntrantStatus::Enrolled } else { EntrantStatus::Cancelled };
            if entrant.status != EntrantStatus::Invited {
                return Err(AppError::InvalidStateTransition { from: entrant.status, to });
            }

            let enrolled_delta = if accept {
                let mut capacity = self.event_repo.get_event_capacity(&event_id).await?;
                capacity.increment_enrolled()?;
                1
            } else {
                0
            };

            entrant.transition(to, Utc::now());
            self.entrant_repo
                .save_entrants_batch(&event_id, slice::from_ref(&entrant), enrolled_delta)
                .await?;

            info!(entrant_id = %entrant.id, accepted = accept, "Invitation answered");
            if !accept {
                let event_name = self.event_name(&event_id).await;
                self.notify(Notification::declined(&entrant, &event_name)).await;
            }
            Ok(entrant)
        }
            .instrument(span)
            .await
    }

    pub async fn leave_waiting_list(&self, entrant_id: &str) -> Result<Entrant, AppError> {
        let event_id = self.require_entrant(entrant_id).await?.event_id;

        let span = info_span!("lottery_operation", operation = "leave_waiting_list", event_id = %event_id);
        async move {
            let _guard = self.locks.acquire(&event_id).await;
            let mut entrant = self.require_entrant(entrant_id).await?;
            if entrant.status != EntrantStatus::Waiting {
                return Err(AppError::InvalidStateTransition {
                    from: entrant.status,
                    to: EntrantStatus::Cancelled,
                });
            }

            entrant.transition(EntrantStatus::Cancelled, Utc::now());
            let saved = self.entrant_repo.save_entrant(&entrant).await?;
            info!(entrant_id = %saved.id, "Entrant left waiting list");
            Ok(saved)
        }
            .instrument(span)
            .await
    }

    /// Recounts ENROLLED entrants and corrects the stored counter to match.
    pub async fn reconcile_capacity(&self, event_id: &str) -> Result<EventCapacity, AppError> {
        let span = info_span!("lottery_operation", operation = "reconcile_capacity", event_id = %event_id);
        async move {
            self.require_event(event_id).await?;
            let _guard = self.locks.acquire(event_id).await;

            let enrolled = self.entrant_repo.count_by_status(event_id, EntrantStatus::Enrolled).await? as i32;
            let capacity = self.event_repo.get_event_capacity(event_id).await?;
            let delta = enrolled - capacity.current_enrolled;

            if delta != 0 {
                warn!(stored = capacity.current_enrolled, actual = enrolled, "Enrolled counter drifted, correcting");
                self.event_repo.update_event_capacity(event_id, delta).await?;
            }

            self.event_repo.get_event_capacity(event_id).await
        }
            .instrument(span)
            .await
    }

    pub async fn list_entrants(&self, event_id: &str, status: Option<EntrantStatus>) -> Result<Vec<Entrant>, AppError> {
        self.require_event(event_id).await?;
        self.entrant_repo.list_by_event(event_id, status).await
    }

    pub async fn get_entrant(&self, entrant_id: &str) -> Result<Entrant, AppError> {
        self.require_entrant(entrant_id).await
    }

    /// Every lottery record held under `email`, across events, newest first.
    pub async fn registration_history(&self, email: &str) -> Result<Vec<Entrant>, AppError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(AppError::Validation("email is required".into()));
        }
        self.entrant_repo.list_by_email(&email).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::event::NewEventParams;
    use crate::domain::models::notification::NotificationKind;
    use crate::infra::repositories::memory_repo::InMemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tokio::sync::Semaphore;

    struct Harness {
        store: Arc<InMemoryStore>,
        manager: LifecycleManager,
    }

    fn harness_with(entrants: Arc<dyn EntrantRepository>, store: Arc<InMemoryStore>) -> Harness {
        let manager = LifecycleManager::new(
            entrants,
            store.clone(),
            store.clone(),
            DrawPolicy::default(),
            Some(1234),
        );
        Harness { store, manager }
    }

    fn harness() -> Harness {
        let store = Arc::new(InMemoryStore::new());
        harness_with(store.clone(), store)
    }

    async fn create_event(store: &InMemoryStore, max_capacity: i32, max_waiting: i32) -> Event {
        let event = Event::new(NewEventParams {
            name: "Swim Lessons".into(),
            description: "Beginner swimming".into(),
            max_capacity,
            max_waiting_list_size: max_waiting,
        });
        EventRepository::create(store, &event).await.unwrap()
    }

    async fn join_many(manager: &LifecycleManager, event_id: &str, n: usize) -> Vec<Entrant> {
        let mut out = Vec::new();
        for i in 1..=n {
            out.push(manager.join_waiting_list(event_id, JoinRequest {
                name: format!("Person {}", i),
                email: format!("person{}@email.com", i),
                phone: None,
            }).await.unwrap());
        }
        out
    }

    #[test]
    fn test_manager_reports_configured_policy() {
        let store = Arc::new(InMemoryStore::new());
        let manager = LifecycleManager::new(
            store.clone(),
            store.clone(),
            store,
            DrawPolicy { auto_enroll_divisor: 0 },
            None,
        );
        assert_eq!(manager.policy(), DrawPolicy { auto_enroll_divisor: 0 });
    }

    #[tokio::test]
    async fn test_draw_10_from_130() {
        let h = harness();
        let event = create_event(&h.store, 50, 0).await;
        join_many(&h.manager, &event.id, 130).await;

        let result = h.manager.run_lottery(&event.id, 10).await.unwrap();
        assert_eq!(result.winners.len(), 10);
        assert_eq!(result.enrolled_count(), 2);
        assert_eq!(result.invited().count(), 8);

        let waiting = h.store.fetch_waiting_pool(&event.id).await.unwrap();
        assert_eq!(waiting.len(), 120);

        let capacity = h.store.get_event_capacity(&event.id).await.unwrap();
        assert_eq!(capacity.current_enrolled, 2);

        for winner in &result.winners {
            let stored = h.store.find_entrant(&winner.id).await.unwrap().unwrap();
            assert_eq!(stored.status, winner.status);
        }
    }

    #[tokio::test]
    async fn test_lottery_notifies_winners_and_others() {
        let h = harness();
        let event = create_event(&h.store, 50, 0).await;
        join_many(&h.manager, &event.id, 6).await;

        h.manager.run_lottery(&event.id, 2).await.unwrap();

        let notes = h.store.list_for_event(&event.id).await.unwrap();
        let invited = notes.iter().filter(|n| n.kind == NotificationKind::Invited).count();
        let waiting = notes.iter().filter(|n| n.kind == NotificationKind::Waiting).count();
        assert_eq!(invited, 2);
        // 6 joins + 4 not selected
        assert_eq!(waiting, 10);
    }

    #[tokio::test]
    async fn test_lottery_on_empty_pool() {
        let h = harness();
        let event = create_event(&h.store, 5, 0).await;

        let err = h.manager.run_lottery(&event.id, 3).await.unwrap_err();
        assert!(matches!(err, AppError::EmptyPool));
    }

    #[tokio::test]
    async fn test_lottery_unknown_event() {
        let h = harness();
        let err = h.manager.run_lottery("missing", 3).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_lottery_zero_count_rejected() {
        let h = harness();
        let event = create_event(&h.store, 5, 0).await;
        join_many(&h.manager, &event.id, 3).await;

        let err = h.manager.run_lottery(&event.id, 0).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_lottery_that_overflows_capacity_writes_nothing() {
        let h = harness();
        let event = create_event(&h.store, 1, 0).await;
        join_many(&h.manager, &event.id, 12).await;

        // 12 winners -> 3 auto-enrolled, but only 1 spot
        let err = h.manager.run_lottery(&event.id, 12).await.unwrap_err();
        assert!(matches!(err, AppError::CapacityExceeded));

        assert_eq!(h.store.fetch_waiting_pool(&event.id).await.unwrap().len(), 12);
        assert_eq!(h.store.get_event_capacity(&event.id).await.unwrap().current_enrolled, 0);
    }

    struct FailingBatchRepo {
        inner: Arc<InMemoryStore>,
    }

    #[async_trait]
    impl EntrantRepository for FailingBatchRepo {
        async fn fetch_waiting_pool(&self, event_id: &str) -> Result<Vec<Entrant>, AppError> {
            self.inner.fetch_waiting_pool(event_id).await
        }
        async fn list_by_event(&self, event_id: &str, status: Option<EntrantStatus>) -> Result<Vec<Entrant>, AppError> {
            EntrantRepository::list_by_event(self.inner.as_ref(), event_id, status).await
        }
        async fn find_entrant(&self, id: &str) -> Result<Option<Entrant>, AppError> {
            self.inner.find_entrant(id).await
        }
        async fn find_active_by_email(&self, event_id: &str, email: &str) -> Result<Option<Entrant>, AppError> {
            self.inner.find_active_by_email(event_id, email).await
        }
        async fn count_by_status(&self, event_id: &str, status: EntrantStatus) -> Result<i64, AppError> {
            self.inner.count_by_status(event_id, status).await
        }
        async fn list_by_email(&self, email: &str) -> Result<Vec<Entrant>, AppError> {
            self.inner.list_by_email(email).await
        }
        async fn save_entrant(&self, entrant: &Entrant) -> Result<Entrant, AppError> {
            self.inner.save_entrant(entrant).await
        }
        async fn save_entrants_batch(&self, _event_id: &str, _entrants: &[Entrant], _delta: i32) -> Result<(), AppError> {
            Err(AppError::InternalWithMsg("storage offline".into()))
        }
    }

    #[tokio::test]
    async fn test_persistence_failure_surfaces_and_leaves_pool_intact() {
        let store = Arc::new(InMemoryStore::new());
        let h = harness_with(Arc::new(FailingBatchRepo { inner: store.clone() }), store);
        let event = create_event(&h.store, 10, 0).await;
        join_many(&h.manager, &event.id, 8).await;

        let err = h.manager.run_lottery(&event.id, 4).await.unwrap_err();
        assert!(matches!(err, AppError::InternalWithMsg(_)));
        assert!(!err.is_business());
        assert_eq!(h.store.fetch_waiting_pool(&event.id).await.unwrap().len(), 8);
    }

    /// Holds every notification write once armed, until permits are added.
    struct GatedNotifications {
        inner: Arc<InMemoryStore>,
        armed: AtomicBool,
        gate: Semaphore,
    }

    #[async_trait]
    impl NotificationRepository for GatedNotifications {
        async fn create(&self, notification: &Notification) -> Result<(), AppError> {
            if self.armed.load(Ordering::SeqCst) {
                let _permit = self.gate.acquire().await;
            }
            NotificationRepository::create(self.inner.as_ref(), notification).await
        }
        async fn list_by_recipient(&self, email: &str) -> Result<Vec<Notification>, AppError> {
            self.inner.list_by_recipient(email).await
        }
        async fn list_for_event(&self, event_id: &str) -> Result<Vec<Notification>, AppError> {
            self.inner.list_for_event(event_id).await
        }
    }

    #[tokio::test]
    async fn test_draw_notifications_do_not_hold_event_lock() {
        let store = Arc::new(InMemoryStore::new());
        let notes = Arc::new(GatedNotifications {
            inner: store.clone(),
            armed: AtomicBool::new(false),
            gate: Semaphore::new(0),
        });
        let manager = Arc::new(LifecycleManager::new(
            store.clone(),
            store.clone(),
            notes.clone(),
            DrawPolicy::default(),
            Some(7),
        ));
        let event = create_event(&store, 10, 0).await;
        join_many(&manager, &event.id, 5).await;

        notes.armed.store(true, Ordering::SeqCst);
        let draw = {
            let manager = manager.clone();
            let event_id = event.id.clone();
            tokio::spawn(async move { manager.run_lottery(&event_id, 2).await })
        };

        let committed = tokio::time::timeout(Duration::from_secs(5), async {
            while store.count_by_status(&event.id, EntrantStatus::Waiting).await.unwrap() != 3 {
                tokio::task::yield_now().await;
            }
        }).await;
        assert!(committed.is_ok(), "draw never committed");

        // The draw is now parked on its notifications; another writer must still get the lock
        let reconciled = tokio::time::timeout(Duration::from_secs(2), manager.reconcile_capacity(&event.id)).await;
        assert!(reconciled.is_ok(), "event lock still held while notifying");

        notes.gate.add_permits(100);
        let result = draw.await.unwrap().unwrap();
        assert_eq!(result.winners.len(), 2);
        assert_eq!(store.list_for_event(&event.id).await.unwrap().len(), 5 + 5);
    }

    #[tokio::test]
    async fn test_replacement_after_cancellation() {
        let h = harness();
        let event = create_event(&h.store, 10, 0).await;
        join_many(&h.manager, &event.id, 6).await;

        let result = h.manager.run_lottery(&event.id, 2).await.unwrap();
        let x = result.invited().next().unwrap().clone();

        let cancelled = h.manager.cancel_entrant(&x.id).await.unwrap();
        assert_eq!(cancelled.status, EntrantStatus::Cancelled);

        let y = h.manager.draw_replacement(&event.id).await.unwrap();
        assert_ne!(y.id, x.id);
        assert_eq!(y.status, EntrantStatus::Invited);

        let x_after = h.store.find_entrant(&x.id).await.unwrap().unwrap();
        assert_eq!(x_after.status, EntrantStatus::Cancelled);
        assert!(x_after.status_changed_at >= x_after.joined_at);
    }

    #[tokio::test]
    async fn test_replacement_on_empty_pool() {
        let h = harness();
        let event = create_event(&h.store, 10, 0).await;
        join_many(&h.manager, &event.id, 2).await;
        h.manager.run_lottery(&event.id, 5).await.unwrap();

        let err = h.manager.draw_replacement(&event.id).await.unwrap_err();
        assert!(matches!(err, AppError::EmptyPool));
    }

    #[tokio::test]
    async fn test_cancel_unknown_entrant() {
        let h = harness();
        let err = h.manager.cancel_entrant("nobody").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_cancel_waiting_entrant_is_rejected() {
        let h = harness();
        let event = create_event(&h.store, 10, 0).await;
        let entrants = join_many(&h.manager, &event.id, 1).await;

        let err = h.manager.cancel_entrant(&entrants[0].id).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidStateTransition { from: EntrantStatus::Waiting, to: EntrantStatus::Cancelled }
        ));
    }

    #[tokio::test]
    async fn test_cancel_enrolled_releases_spot() {
        let h = harness();
        let event = create_event(&h.store, 10, 0).await;
        join_many(&h.manager, &event.id, 8).await;

        let result = h.manager.run_lottery(&event.id, 4).await.unwrap();
        let enrolled = result.enrolled().next().unwrap().clone();
        assert_eq!(h.store.get_event_capacity(&event.id).await.unwrap().current_enrolled, 1);

        h.manager.cancel_entrant(&enrolled.id).await.unwrap();
        assert_eq!(h.store.get_event_capacity(&event.id).await.unwrap().current_enrolled, 0);
    }

    #[tokio::test]
    async fn test_cancel_enrolled_with_zero_counter_still_cancels() {
        let h = harness();
        let event = create_event(&h.store, 10, 0).await;
        join_many(&h.manager, &event.id, 4).await;

        let result = h.manager.run_lottery(&event.id, 4).await.unwrap();
        let enrolled = result.enrolled().next().unwrap().clone();
        h.store.update_event_capacity(&event.id, -1).await.unwrap();

        let cancelled = h.manager.cancel_entrant(&enrolled.id).await.unwrap();
        assert_eq!(cancelled.status, EntrantStatus::Cancelled);
        assert_eq!(h.store.get_event_capacity(&event.id).await.unwrap().current_enrolled, 0);

        let stored = h.store.find_entrant(&enrolled.id).await.unwrap().unwrap();
        assert_eq!(stored.status, EntrantStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_registration_history_spans_events() {
        let h = harness();
        let swim = create_event(&h.store, 10, 0).await;
        let chess = create_event(&h.store, 10, 0).await;
        join_many(&h.manager, &swim.id, 2).await;
        join_many(&h.manager, &chess.id, 1).await;

        let history = h.manager.registration_history("PERSON1@email.com ").await.unwrap();
        assert_eq!(history.len(), 2);
        let events: HashSet<&str> = history.iter().map(|e| e.event_id.as_str()).collect();
        assert!(events.contains(swim.id.as_str()) && events.contains(chess.id.as_str()));

        assert_eq!(h.manager.registration_history("person2@email.com").await.unwrap().len(), 1);
        assert!(matches!(
            h.manager.registration_history("  ").await.unwrap_err(),
            AppError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_join_list_full() {
        let h = harness();
        let event = create_event(&h.store, 10, 5).await;
        join_many(&h.manager, &event.id, 5).await;

        let err = h.manager.join_waiting_list(&event.id, JoinRequest {
            name: "Sixth".into(),
            email: "sixth@email.com".into(),
            phone: None,
        }).await.unwrap_err();
        assert!(matches!(err, AppError::WaitingListFull));
    }

    #[tokio::test]
    async fn test_duplicate_join() {
        let h = harness();
        let event = create_event(&h.store, 10, 0).await;
        join_many(&h.manager, &event.id, 1).await;

        let err = h.manager.join_waiting_list(&event.id, JoinRequest {
            name: "Person 1 again".into(),
            email: " PERSON1@email.com".into(),
            phone: None,
        }).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyOnList));

        let all = h.store.list_by_event(&event.id, None).await;
        assert_eq!(all.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rejoin_after_leaving() {
        let h = harness();
        let event = create_event(&h.store, 10, 0).await;
        let first = join_many(&h.manager, &event.id, 1).await.remove(0);

        let left = h.manager.leave_waiting_list(&first.id).await.unwrap();
        assert_eq!(left.status, EntrantStatus::Cancelled);

        let again = join_many(&h.manager, &event.id, 1).await.remove(0);
        assert_ne!(again.id, first.id);
        assert_eq!(h.store.list_by_event(&event.id, None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_accept_and_decline_invitation() {
        let h = harness();
        let event = create_event(&h.store, 10, 0).await;
        join_many(&h.manager, &event.id, 3).await;

        let result = h.manager.run_lottery(&event.id, 2).await.unwrap();
        let mut invited = result.invited();
        let a = invited.next().unwrap().clone();
        let b = invited.next().unwrap().clone();

        let accepted = h.manager.respond_to_invitation(&a.id, true).await.unwrap();
        assert_eq!(accepted.status, EntrantStatus::Enrolled);
        assert_eq!(h.store.get_event_capacity(&event.id).await.unwrap().current_enrolled, 1);

        let declined = h.manager.respond_to_invitation(&b.id, false).await.unwrap();
        assert_eq!(declined.status, EntrantStatus::Cancelled);

        let err = h.manager.respond_to_invitation(&a.id, true).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidStateTransition { .. }));
    }

    #[tokio::test]
    async fn test_accept_at_capacity_fails() {
        let h = harness();
        let event = create_event(&h.store, 1, 0).await;
        join_many(&h.manager, &event.id, 3).await;

        let result = h.manager.run_lottery(&event.id, 2).await.unwrap();
        let mut invited = result.invited();
        let a = invited.next().unwrap().clone();
        let b = invited.next().unwrap().clone();

        h.manager.respond_to_invitation(&a.id, true).await.unwrap();
        let err = h.manager.respond_to_invitation(&b.id, true).await.unwrap_err();
        assert!(matches!(err, AppError::CapacityExceeded));

        let b_after = h.store.find_entrant(&b.id).await.unwrap().unwrap();
        assert_eq!(b_after.status, EntrantStatus::Invited);
    }

    #[tokio::test]
    async fn test_reconcile_fixes_drifted_counter() {
        let h = harness();
        let event = create_event(&h.store, 10, 0).await;
        join_many(&h.manager, &event.id, 8).await;
        h.manager.run_lottery(&event.id, 8).await.unwrap();

        h.store.update_event_capacity(&event.id, 3).await.unwrap();
        assert_eq!(h.store.get_event_capacity(&event.id).await.unwrap().current_enrolled, 5);

        let fixed = h.manager.reconcile_capacity(&event.id).await.unwrap();
        assert_eq!(fixed.current_enrolled, 2);
    }

    #[tokio::test]
    async fn test_concurrent_draws_never_share_winners() {
        let h = harness();
        let event = create_event(&h.store, 100, 0).await;
        join_many(&h.manager, &event.id, 40).await;
        let manager = Arc::new(h.manager);

        let mut set = tokio::task::JoinSet::new();
        for _ in 0..8 {
            let manager = manager.clone();
            let event_id = event.id.clone();
            set.spawn(async move { manager.run_lottery(&event_id, 5).await });
        }

        let mut seen = HashSet::new();
        while let Some(res) = set.join_next().await {
            let result = res.unwrap().unwrap();
            for w in result.winners {
                assert!(seen.insert(w.id), "entrant drawn twice");
            }
        }

        assert_eq!(seen.len(), 40);
        assert!(h.store.fetch_waiting_pool(&event.id).await.unwrap().is_empty());
    }
}
