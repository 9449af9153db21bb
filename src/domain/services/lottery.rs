use chrono::{DateTime, Utc};
use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};

use crate::domain::models::entrant::{Entrant, EntrantStatus};
use crate::error::AppError;

/// How the winners of a draw are split between auto-enrolment and invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawPolicy {
    /// `selected / auto_enroll_divisor` winners (integer division) are enrolled
    /// directly, the rest invited. 0 disables auto-enrolment.
    pub auto_enroll_divisor: u32,
}

impl Default for DrawPolicy {
    fn default() -> Self {
        Self { auto_enroll_divisor: 4 }
    }
}

impl DrawPolicy {
    pub fn enrolled_quota(&self, selected: usize) -> usize {
        match self.auto_enroll_divisor {
            0 => 0,
            d => selected / d as usize,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DrawResult {
    /// In draw order; each carries its resulting status.
    pub winners: Vec<Entrant>,
}

impl DrawResult {
    pub fn enrolled(&self) -> impl Iterator<Item = &Entrant> {
        self.winners.iter().filter(|e| e.status == EntrantStatus::Enrolled)
    }

    pub fn invited(&self) -> impl Iterator<Item = &Entrant> {
        self.winners.iter().filter(|e| e.status == EntrantStatus::Invited)
    }

    pub fn enrolled_count(&self) -> usize {
        self.enrolled().count()
    }
}

fn assert_waiting_pool(pool: &[Entrant]) {
    if let Some(first) = pool.first() {
        for entrant in pool {
            assert_eq!(
                entrant.status,
                EntrantStatus::Waiting,
                "entrant {} handed to the draw is not WAITING",
                entrant.id
            );
            assert_eq!(
                entrant.event_id, first.event_id,
                "waiting pool mixes events ({} vs {})",
                entrant.event_id, first.event_id
            );
        }
    }
}

/// Draws up to `count` winners from `pool`.
///
/// The whole pool is permuted (Fisher-Yates) before taking the prefix, so every
/// entrant is equally likely to land in any position. A pool smaller than
/// `count` is a partial fill, not an error.
///
/// # Panics
/// If the pool holds a non-`WAITING` entrant or entrants from different events.
pub fn draw<R: Rng + ?Sized>(
    mut pool: Vec<Entrant>,
    count: usize,
    policy: DrawPolicy,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<DrawResult, AppError> {
    if pool.is_empty() {
        return Err(AppError::EmptyPool);
    }
    assert_waiting_pool(&pool);

    pool.shuffle(rng);
    let selected = count.min(pool.len());
    pool.truncate(selected);

    let enrolled_quota = policy.enrolled_quota(selected);
    for (position, winner) in pool.iter_mut().enumerate() {
        let status = if position < enrolled_quota {
            EntrantStatus::Enrolled
        } else {
            EntrantStatus::Invited
        };
        winner.transition(status, now);
    }

    Ok(DrawResult { winners: pool })
}

/// Picks one entrant uniformly from `pool` and invites it. Capacity is not consulted.
pub fn draw_replacement<R: Rng + ?Sized>(
    mut pool: Vec<Entrant>,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<Entrant, AppError> {
    if pool.is_empty() {
        return Err(AppError::EmptyPool);
    }
    assert_waiting_pool(&pool);

    let index = rng.gen_range(0..pool.len());
    let mut chosen = pool.swap_remove(index);
    chosen.transition(EntrantStatus::Invited, now);
    Ok(chosen)
}
