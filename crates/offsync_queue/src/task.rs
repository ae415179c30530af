//! Task kinds and their strongly-typed payloads.
//!
//! The set of task kinds is closed: every [`SyncType`] has exactly one
//! [`SyncData`] variant and one payload struct implementing [`TaskData`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The kind of work a payload carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncType {
    /// Profile edits.
    Profile,
    /// Meal submissions.
    Meal,
    /// Menu cache refreshes.
    Menu,
    /// Photo-analysis requests.
    Photo,
}

impl SyncType {
    /// All task kinds, in declaration order.
    pub const ALL: [SyncType; 4] = [
        SyncType::Profile,
        SyncType::Meal,
        SyncType::Menu,
        SyncType::Photo,
    ];

    /// Returns the string form used in exports and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncType::Profile => "profile",
            SyncType::Meal => "meal",
            SyncType::Menu => "menu",
            SyncType::Photo => "photo",
        }
    }
}

impl fmt::Display for SyncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown task kind.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown sync type: {0:?}")]
pub struct ParseSyncTypeError(pub String);

impl FromStr for SyncType {
    type Err = ParseSyncTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SyncType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseSyncTypeError(s.to_string()))
    }
}

/// A local edit of the user's profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    /// Owner of the profile.
    pub user_id: String,
    /// New display name, if changed.
    pub display_name: Option<String>,
    /// New daily calorie target, if changed.
    pub daily_calorie_target: Option<u32>,
    /// Dietary preference tags (e.g. "vegetarian").
    pub dietary_preferences: Vec<String>,
    /// When the edit was made locally (unix millis).
    pub updated_at: u64,
}

/// Which meal of the day a submission belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealKind {
    /// Breakfast.
    Breakfast,
    /// Lunch.
    Lunch,
    /// Dinner.
    Dinner,
    /// Anything in between.
    Snack,
}

/// One line of a meal submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealItem {
    /// Food name.
    pub name: String,
    /// Energy per serving in kcal.
    pub calories: u32,
    /// Number of servings.
    pub quantity: f64,
}

/// A meal logged on the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealSubmission {
    /// Device-local identifier of the meal record.
    pub local_id: String,
    /// Who ate it.
    pub user_id: String,
    /// Meal of the day.
    pub meal_kind: MealKind,
    /// What was eaten.
    pub items: Vec<MealItem>,
    /// When it was eaten (unix millis).
    pub eaten_at: u64,
    /// Free-form notes.
    pub notes: Option<String>,
}

impl MealSubmission {
    /// Total energy of the meal in kcal.
    pub fn total_calories(&self) -> f64 {
        self.items
            .iter()
            .map(|item| f64::from(item.calories) * item.quantity)
            .sum()
    }
}

/// A request to refresh the cached menu of a venue for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuRefresh {
    /// Venue (cafeteria, restaurant) identifier.
    pub venue_id: String,
    /// Day of the menu, `YYYY-MM-DD`.
    pub date: String,
}

/// A captured meal photo waiting for analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoAnalysis {
    /// Device-local identifier of the photo.
    pub local_id: String,
    /// Who took it.
    pub user_id: String,
    /// Path of the image on the device.
    pub image_path: String,
    /// MIME type of the image.
    pub mime_type: String,
    /// Size of the image in bytes.
    pub byte_len: u64,
    /// Meal the photo belongs to, if already linked.
    pub meal_local_id: Option<String>,
}

/// The content of a payload: one strongly-typed variant per [`SyncType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncData {
    /// Profile edit.
    Profile(ProfileUpdate),
    /// Meal submission.
    Meal(MealSubmission),
    /// Menu refresh.
    Menu(MenuRefresh),
    /// Photo analysis.
    Photo(PhotoAnalysis),
}

impl SyncData {
    /// Returns the task kind of this data.
    pub fn sync_type(&self) -> SyncType {
        match self {
            SyncData::Profile(_) => SyncType::Profile,
            SyncData::Meal(_) => SyncType::Meal,
            SyncData::Menu(_) => SyncType::Menu,
            SyncData::Photo(_) => SyncType::Photo,
        }
    }
}

/// Ties a payload struct to its task kind at compile time.
pub trait TaskData:
    Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static
{
    /// The task kind this data belongs to.
    const SYNC_TYPE: SyncType;

    /// Wraps the data into the matching [`SyncData`] variant.
    fn into_sync_data(self) -> SyncData;

    /// Borrows the data out of a [`SyncData`] if the variant matches.
    fn from_sync_data(data: &SyncData) -> Option<&Self>;
}

macro_rules! impl_task_data {
    ($ty:ty, $variant:ident) => {
        impl TaskData for $ty {
            const SYNC_TYPE: SyncType = SyncType::$variant;

            fn into_sync_data(self) -> SyncData {
                SyncData::$variant(self)
            }

            fn from_sync_data(data: &SyncData) -> Option<&Self> {
                match data {
                    SyncData::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }

        impl From<$ty> for SyncData {
            fn from(data: $ty) -> Self {
                SyncData::$variant(data)
            }
        }
    };
}

impl_task_data!(ProfileUpdate, Profile);
impl_task_data!(MealSubmission, Meal);
impl_task_data!(MenuRefresh, Menu);
impl_task_data!(PhotoAnalysis, Photo);
