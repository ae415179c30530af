//! Property-based test generators using proptest.
//!
//! Task data generated here always passes the reference validators.

use offsync_queue::{
    MealItem, MealKind, MealSubmission, MenuRefresh, PhotoAnalysis, ProfileUpdate, SyncData,
    SyncType,
};
use proptest::prelude::*;
use std::time::Duration;

/// Strategy for task kinds.
pub fn sync_type_strategy() -> impl Strategy<Value = SyncType> {
    prop::sample::select(SyncType::ALL.to_vec())
}

/// Strategy for raw priorities, including out-of-range values.
pub fn raw_priority_strategy() -> impl Strategy<Value = u8> {
    0u8..=9
}

/// Strategy for retry budgets.
pub fn max_retries_strategy() -> impl Strategy<Value = u32> {
    0u32..=6
}

fn id_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z0-9]{1,12}").expect("Invalid regex")
}

fn meal_kind_strategy() -> impl Strategy<Value = MealKind> {
    prop::sample::select(vec![
        MealKind::Breakfast,
        MealKind::Lunch,
        MealKind::Dinner,
        MealKind::Snack,
    ])
}

/// Any finite, strictly positive quantity.
pub fn quantity_strategy() -> impl Strategy<Value = f64> {
    prop::num::f64::POSITIVE | prop::num::f64::NORMAL | prop::num::f64::SUBNORMAL
}

fn meal_item_strategy() -> impl Strategy<Value = MealItem> {
    (
        prop::string::string_regex("[a-z ]{1,20}").expect("Invalid regex"),
        0u32..2_000,
        quantity_strategy(),
    )
        .prop_map(|(name, calories, quantity)| MealItem {
            name: format!("x{name}"),
            calories,
            quantity,
        })
}

fn profile_strategy() -> impl Strategy<Value = ProfileUpdate> {
    (
        id_strategy(),
        prop::option::of(prop::string::string_regex("[A-Za-z]{1,40}").expect("Invalid regex")),
        prop::option::of(500u32..=10_000),
        prop::collection::vec("[a-z]{3,10}", 0..4),
        any::<u32>(),
    )
        .prop_map(
            |(user_id, display_name, daily_calorie_target, dietary_preferences, updated_at)| {
                ProfileUpdate {
                    user_id,
                    display_name,
                    daily_calorie_target,
                    dietary_preferences,
                    updated_at: u64::from(updated_at),
                }
            },
        )
}

fn meal_strategy() -> impl Strategy<Value = MealSubmission> {
    (
        id_strategy(),
        id_strategy(),
        meal_kind_strategy(),
        prop::collection::vec(meal_item_strategy(), 1..5),
        any::<u32>(),
        prop::option::of("[a-z ]{0,30}"),
    )
        .prop_map(
            |(local_id, user_id, meal_kind, items, eaten_at, notes)| MealSubmission {
                local_id,
                user_id,
                meal_kind,
                items,
                eaten_at: u64::from(eaten_at),
                notes,
            },
        )
}

fn menu_strategy() -> impl Strategy<Value = MenuRefresh> {
    (id_strategy(), 2020u32..2030, 1u32..=12, 1u32..=28).prop_map(
        |(venue_id, year, month, day)| MenuRefresh {
            venue_id,
            date: format!("{year:04}-{month:02}-{day:02}"),
        },
    )
}

fn photo_strategy() -> impl Strategy<Value = PhotoAnalysis> {
    (
        id_strategy(),
        id_strategy(),
        prop::sample::select(vec!["image/jpeg", "image/png", "image/heic", "image/webp"]),
        1u64..=10 * 1024 * 1024,
        prop::option::of(id_strategy()),
    )
        .prop_map(
            |(local_id, user_id, mime_type, byte_len, meal_local_id)| PhotoAnalysis {
                image_path: format!("/photos/{local_id}.img"),
                local_id,
                user_id,
                mime_type: mime_type.to_string(),
                byte_len,
                meal_local_id,
            },
        )
}

/// Strategy for task data of any kind.
pub fn sync_data_strategy() -> impl Strategy<Value = SyncData> {
    prop_oneof![
        profile_strategy().prop_map(SyncData::from),
        meal_strategy().prop_map(SyncData::from),
        menu_strategy().prop_map(SyncData::from),
        photo_strategy().prop_map(SyncData::from),
    ]
}

/// One step of a random queue workload.
#[derive(Debug, Clone)]
pub enum QueueOp {
    /// Enqueue data.
    Add {
        /// Task data.
        data: SyncData,
        /// Raw (unclamped) priority.
        priority: u8,
        /// Retry budget.
        max_retries: u32,
    },
    /// Record a failed attempt on the n-th payload (modulo length).
    Fail(usize),
    /// Record a permanent failure on the n-th payload (modulo length).
    Exhaust(usize),
    /// Remove the n-th payload (modulo length).
    Remove(usize),
    /// Reset retries of the n-th payload (modulo length).
    Reset(usize),
    /// Move the clock forward.
    Advance(Duration),
    /// Drop terminally failed payloads.
    RemoveFailed,
}

/// Strategy for one workload step.
pub fn queue_op_strategy() -> impl Strategy<Value = QueueOp> {
    prop_oneof![
        4 => (sync_data_strategy(), raw_priority_strategy(), max_retries_strategy()).prop_map(
            |(data, priority, max_retries)| QueueOp::Add {
                data,
                priority,
                max_retries,
            }
        ),
        3 => any::<usize>().prop_map(QueueOp::Fail),
        1 => any::<usize>().prop_map(QueueOp::Exhaust),
        1 => any::<usize>().prop_map(QueueOp::Remove),
        1 => any::<usize>().prop_map(QueueOp::Reset),
        2 => (0u64..90_000).prop_map(|ms| QueueOp::Advance(Duration::from_millis(ms))),
        1 => Just(QueueOp::RemoveFailed),
    ]
}

/// Strategy for a workload of `min_ops..max_ops` steps.
pub fn queue_ops_strategy(min_ops: usize, max_ops: usize) -> impl Strategy<Value = Vec<QueueOp>> {
    prop::collection::vec(queue_op_strategy(), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
