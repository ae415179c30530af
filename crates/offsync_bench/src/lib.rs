//! Benchmark utilities.

use offsync_queue::{MealItem, MealKind, MealSubmission, MenuRefresh, PhotoAnalysis, SyncData};
use rand::Rng;

/// Generate a random piece of task data.
pub fn random_data<R: Rng>(rng: &mut R) -> SyncData {
    let n: u32 = rng.gen();
    match rng.gen_range(0..3) {
        0 => MealSubmission {
            local_id: format!("meal-{n}"),
            user_id: "bench".to_string(),
            meal_kind: MealKind::Lunch,
            items: (0..rng.gen_range(1..6))
                .map(|i| MealItem {
                    name: format!("item-{i}"),
                    calories: rng.gen_range(10..900),
                    quantity: f64::from(rng.gen_range(1..5u32)),
                })
                .collect(),
            eaten_at: u64::from(n),
            notes: None,
        }
        .into(),
        1 => MenuRefresh {
            venue_id: format!("venue-{}", n % 50),
            date: "2026-01-01".to_string(),
        }
        .into(),
        _ => PhotoAnalysis {
            local_id: format!("photo-{n}"),
            user_id: "bench".to_string(),
            image_path: format!("/photos/{n}.jpg"),
            mime_type: "image/jpeg".to_string(),
            byte_len: u64::from(rng.gen_range(1_000..5_000_000u32)),
            meal_local_id: None,
        }
        .into(),
    }
}

/// Generate `count` `(data, priority)` pairs with priorities in 1..=5.
pub fn random_entries(count: usize) -> Vec<(SyncData, u8)> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|_| (random_data(&mut rng), rng.gen_range(1..=5)))
        .collect()
}
