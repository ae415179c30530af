//! Remote API boundary used by the reference strategies.

use crate::error::UploadError;
use async_trait::async_trait;
use offsync_queue::{MealSubmission, PhotoAnalysis, ProfileUpdate};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use thiserror::Error;

/// Failure reported by the remote API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct RemoteError {
    /// Human-readable description.
    pub message: String,
    /// Whether the call may succeed if repeated later.
    pub retryable: bool,
}

impl RemoteError {
    /// A failure worth retrying (network, timeout, 5xx).
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    /// A failure caused by the request itself (4xx).
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }
}

impl From<RemoteError> for UploadError {
    fn from(err: RemoteError) -> Self {
        if err.retryable {
            UploadError::Transient(err.message)
        } else {
            UploadError::Permanent(err.message)
        }
    }
}

/// Profile as confirmed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    /// Owner.
    pub user_id: String,
    /// Display name.
    pub display_name: Option<String>,
    /// Daily calorie target.
    pub daily_calorie_target: Option<u32>,
    /// Dietary preference tags.
    pub dietary_preferences: Vec<String>,
    /// Server-side revision.
    pub revision: u64,
}

/// Server acknowledgement of a meal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealReceipt {
    /// Server id of the meal.
    pub remote_id: String,
    /// Energy as computed by the server.
    pub total_calories: f64,
}

/// One dish on a menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dish {
    /// Dish name.
    pub name: String,
    /// Energy per serving in kcal.
    pub calories: u32,
}

/// A venue's menu for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Menu {
    /// Venue id.
    pub venue_id: String,
    /// Day, `YYYY-MM-DD`.
    pub date: String,
    /// Dishes on offer.
    pub dishes: Vec<Dish>,
}

/// A food recognized in a photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedFood {
    /// Food name.
    pub name: String,
    /// Estimated energy in kcal.
    pub calories: u32,
    /// Recognition confidence in `0.0..=1.0`.
    pub confidence: f32,
}

/// Result of a photo analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoResult {
    /// Recognized foods.
    pub foods: Vec<DetectedFood>,
}

impl PhotoResult {
    /// Sum of the recognized foods' energy.
    pub fn estimated_calories(&self) -> u32 {
        self.foods.iter().map(|f| f.calories).sum()
    }
}

/// The remote API the reference strategies talk to.
#[async_trait]
pub trait RemoteBackend: Send + Sync + 'static {
    /// Creates or replaces the user's profile.
    async fn upsert_profile(&self, update: &ProfileUpdate) -> Result<ProfileRecord, RemoteError>;

    /// Submits a logged meal.
    async fn submit_meal(&self, meal: &MealSubmission) -> Result<MealReceipt, RemoteError>;

    /// Fetches a venue's menu for one day.
    async fn fetch_menu(&self, venue_id: &str, date: &str) -> Result<Menu, RemoteError>;

    /// Runs food recognition on a photo.
    async fn analyze_photo(&self, photo: &PhotoAnalysis) -> Result<PhotoResult, RemoteError>;
}

/// Backend operation, for scripting and inspecting [`MockBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteCall {
    /// `upsert_profile`
    UpsertProfile,
    /// `submit_meal`
    SubmitMeal,
    /// `fetch_menu`
    FetchMenu,
    /// `analyze_photo`
    AnalyzePhoto,
}

/// In-process backend with scripted failures.
///
/// Calls succeed with deterministic responses unless a failure was queued
/// for the operation with [`MockBackend::fail_next`].
#[derive(Debug, Default)]
pub struct MockBackend {
    failures: Mutex<HashMap<RemoteCall, VecDeque<RemoteError>>>,
    menus: Mutex<HashMap<(String, String), Menu>>,
    calls: Mutex<Vec<RemoteCall>>,
    latency: Option<Duration>,
}

impl MockBackend {
    /// Creates a backend where every call succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Makes the next call of `call` fail with `error`.
    ///
    /// Failures queue up: calling this twice fails the next two calls.
    pub fn fail_next(&self, call: RemoteCall, error: RemoteError) {
        self.failures.lock().entry(call).or_default().push_back(error);
    }

    /// Sets the menu returned for a venue and day.
    pub fn set_menu(&self, menu: Menu) {
        self.menus
            .lock()
            .insert((menu.venue_id.clone(), menu.date.clone()), menu);
    }

    /// Calls made so far, in order.
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().clone()
    }

    /// Number of calls made to one operation.
    pub fn call_count(&self, call: RemoteCall) -> usize {
        self.calls.lock().iter().filter(|c| **c == call).count()
    }

    async fn enter(&self, call: RemoteCall) -> Result<(), RemoteError> {
        self.calls.lock().push(call);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let scripted = self
            .failures
            .lock()
            .get_mut(&call)
            .and_then(VecDeque::pop_front);
        match scripted {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteBackend for MockBackend {
    async fn upsert_profile(&self, update: &ProfileUpdate) -> Result<ProfileRecord, RemoteError> {
        self.enter(RemoteCall::UpsertProfile).await?;
        Ok(ProfileRecord {
            user_id: update.user_id.clone(),
            display_name: update.display_name.clone(),
            daily_calorie_target: update.daily_calorie_target,
            dietary_preferences: update.dietary_preferences.clone(),
            revision: update.updated_at,
        })
    }

    async fn submit_meal(&self, meal: &MealSubmission) -> Result<MealReceipt, RemoteError> {
        self.enter(RemoteCall::SubmitMeal).await?;
        Ok(MealReceipt {
            remote_id: format!("meal-{}", meal.local_id),
            total_calories: meal.total_calories(),
        })
    }

    async fn fetch_menu(&self, venue_id: &str, date: &str) -> Result<Menu, RemoteError> {
        self.enter(RemoteCall::FetchMenu).await?;
        let menu = self
            .menus
            .lock()
            .get(&(venue_id.to_string(), date.to_string()))
            .cloned();
        Ok(menu.unwrap_or_else(|| Menu {
            venue_id: venue_id.to_string(),
            date: date.to_string(),
            dishes: Vec::new(),
        }))
    }

    async fn analyze_photo(&self, photo: &PhotoAnalysis) -> Result<PhotoResult, RemoteError> {
        self.enter(RemoteCall::AnalyzePhoto).await?;
        // Deterministic stand-in for recognition
        Ok(PhotoResult {
            foods: vec![DetectedFood {
                name: format!("food in {}", photo.local_id),
                calories: (photo.byte_len % 900) as u32 + 100,
                confidence: 0.5,
            }],
        })
    }
}
