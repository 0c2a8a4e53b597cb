//! Validation helpers for DTOs.

use uuid::Uuid;
use validator::ValidationError;

/// Validates that a list of team ids contains no duplicates.
///
/// Duplicate ids would make the per-team result map ambiguous and could mask a
/// caller bug, so they are rejected up front rather than silently deduplicated.
pub fn validate_distinct_team_ids(ids: &[Uuid]) -> Result<(), ValidationError> {
    let mut seen = std::collections::HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            let mut err = ValidationError::new("duplicate_team_id");
            err.message = Some(format!("team id `{id}` appears more than once").into());
            return Err(err);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_distinct_ids() {
        let ids = vec![Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        assert!(validate_distinct_team_ids(&ids).is_ok());
    }

    #[test]
    fn accepts_empty_list() {
        assert!(validate_distinct_team_ids(&[]).is_ok());
    }

    #[test]
    fn rejects_duplicates() {
        let id = Uuid::new_v4();
        let err = validate_distinct_team_ids(&[id, Uuid::new_v4(), id]).unwrap_err();
        assert_eq!(err.code, "duplicate_team_id");
    }
}
