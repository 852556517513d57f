//! Mission management module.
//!
//! A **mission** is a user-assigned task carrying a fixed XP reward. The
//! first time a user with no missions is observed, the engine seeds the
//! default weekly set; after that, missions only change state through
//! [`toggle_mission`](crate::Questline::toggle_mission).
//!
//! # Constraints
//!
//! - Mission text must be non-empty and at most 1 KB
//! - `xp_reward` must be positive and at most [`MAX_XP_REWARD`](crate::storage::schema::MAX_XP_REWARD)
//! - User IDs must be non-empty and at most 255 bytes

pub mod types;

pub use types::{Mission, MissionStatus, MissionToggle, NewMission};

use crate::error::{QuestlineError, ValidationError};
use crate::storage::schema::{MAX_MISSION_TEXT_SIZE, MAX_USER_ID_LENGTH, MAX_XP_REWARD};
use crate::types::UserId;

/// The default weekly mission set, seeded for every new user.
///
/// Texts and rewards mirror the portal's starter missions. Rewards are
/// fixed at creation; editing this table only affects users seeded after
/// the change.
pub(crate) const DEFAULT_MISSIONS: &[(&str, u32)] = &[
    ("Explore three new colleges", 20),
    ("Book a session with a mentor", 30),
    ("Check this week's scholarships", 10),
    ("Watch a career video", 15),
    ("Complete your profile details", 25),
];

/// Validates a [`NewMission`] before storage.
///
/// # Rules
///
/// - `user_id`: non-empty, max 255 bytes
/// - `text`: non-empty, max 1 KB
/// - `xp_reward`: 1..=MAX_XP_REWARD
pub(crate) fn validate_new_mission(mission: &NewMission) -> Result<(), QuestlineError> {
    validate_user_id(&mission.user_id)?;

    // Text: non-empty
    if mission.text.is_empty() {
        return Err(ValidationError::required_field("text").into());
    }

    // Text: max size
    if mission.text.len() > MAX_MISSION_TEXT_SIZE {
        return Err(
            ValidationError::content_too_large(mission.text.len(), MAX_MISSION_TEXT_SIZE).into(),
        );
    }

    // Reward: positive, bounded
    if mission.xp_reward == 0 {
        return Err(ValidationError::invalid_field(
            "xp_reward",
            "must be greater than 0",
        )
        .into());
    }
    if mission.xp_reward > MAX_XP_REWARD {
        return Err(ValidationError::invalid_field(
            "xp_reward",
            format!("must be at most {}, got {}", MAX_XP_REWARD, mission.xp_reward),
        )
        .into());
    }

    Ok(())
}

/// Validates a user ID at the data-access boundary.
///
/// The ID is opaque but still bounded: it becomes a storage key, so an
/// empty or oversized value would corrupt index semantics.
pub(crate) fn validate_user_id(user_id: &UserId) -> Result<(), QuestlineError> {
    if user_id.as_str().is_empty() {
        return Err(ValidationError::required_field("user_id").into());
    }

    if user_id.as_str().len() > MAX_USER_ID_LENGTH {
        return Err(ValidationError::invalid_field(
            "user_id",
            format!(
                "must be at most {} bytes, got {}",
                MAX_USER_ID_LENGTH,
                user_id.as_str().len()
            ),
        )
        .into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_new_mission() -> NewMission {
        NewMission {
            user_id: UserId::new("user-1"),
            text: "Explore three new colleges".to_string(),
            xp_reward: 20,
        }
    }

    #[test]
    fn test_valid_mission_passes() {
        assert!(validate_new_mission(&valid_new_mission()).is_ok());
    }

    #[test]
    fn test_default_missions_are_valid() {
        for (text, reward) in DEFAULT_MISSIONS {
            let mission = NewMission {
                user_id: UserId::new("user-1"),
                text: text.to_string(),
                xp_reward: *reward,
            };
            assert!(validate_new_mission(&mission).is_ok(), "bad template: {}", text);
        }
    }

    #[test]
    fn test_empty_text_rejected() {
        let mut mission = valid_new_mission();
        mission.text = String::new();
        let err = validate_new_mission(&mission).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_text_too_large_rejected() {
        let mut mission = valid_new_mission();
        mission.text = "x".repeat(MAX_MISSION_TEXT_SIZE + 1);
        let err = validate_new_mission(&mission).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_text_at_limit_passes() {
        let mut mission = valid_new_mission();
        mission.text = "x".repeat(MAX_MISSION_TEXT_SIZE);
        assert!(validate_new_mission(&mission).is_ok());
    }

    #[test]
    fn test_zero_reward_rejected() {
        let mut mission = valid_new_mission();
        mission.xp_reward = 0;
        let err = validate_new_mission(&mission).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_reward_above_cap_rejected() {
        let mut mission = valid_new_mission();
        mission.xp_reward = MAX_XP_REWARD + 1;
        let err = validate_new_mission(&mission).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_reward_at_cap_passes() {
        let mut mission = valid_new_mission();
        mission.xp_reward = MAX_XP_REWARD;
        assert!(validate_new_mission(&mission).is_ok());
    }

    #[test]
    fn test_empty_user_id_rejected() {
        let err = validate_user_id(&UserId::new("")).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_user_id_too_long_rejected() {
        let err = validate_user_id(&UserId::new("x".repeat(MAX_USER_ID_LENGTH + 1))).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_user_id_at_limit_passes() {
        assert!(validate_user_id(&UserId::new("x".repeat(MAX_USER_ID_LENGTH))).is_ok());
    }
}
