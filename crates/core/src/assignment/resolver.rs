//! Skill-based assignee selection.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::user::{skill_matches, Role, User, UserError, UserStore};

/// Error type for assignment operations.
#[derive(Debug, Error)]
pub enum AssignmentError {
    #[error("User store error: {0}")]
    Store(#[from] UserError),
}

/// Number of (required, held) skill pairs that match in either direction.
pub fn skill_match_score(required: &[String], skills: &[String]) -> usize {
    required
        .iter()
        .map(|want| skills.iter().filter(|have| skill_matches(want, have)).count())
        .sum()
}

/// Picks the user a triaged ticket is assigned to.
pub struct AssignmentResolver {
    users: Arc<dyn UserStore>,
}

impl AssignmentResolver {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Resolve an assignee for the given skills.
    ///
    /// The moderator with the highest [`skill_match_score`] wins; ties go to
    /// the moderator registered first. With no moderators, or when no skills
    /// were requested, the first admin is used. `None` means nobody can take
    /// the ticket, which is not an error.
    pub fn resolve(&self, required_skills: &[String]) -> Result<Option<User>, AssignmentError> {
        let moderators = self.users.find_by_role_and_skills(Role::Moderator, &[])?;

        if !moderators.is_empty() && !required_skills.is_empty() {
            let mut best: Option<(usize, User)> = None;
            for moderator in moderators {
                let score = skill_match_score(required_skills, &moderator.skills);
                debug!("Moderator {} scored {}", moderator.email, score);
                if best.as_ref().map_or(true, |(best_score, _)| score > *best_score) {
                    best = Some((score, moderator));
                }
            }

            if let Some((score, moderator)) = best {
                info!(
                    "Selected moderator {} (score {}) for skills {:?}",
                    moderator.email, score, required_skills
                );
                return Ok(Some(moderator));
            }
        }

        let admin = self.users.find_first_by_role(Role::Admin)?;
        match &admin {
            Some(admin) => info!("Falling back to admin {}", admin.email),
            None => info!("No moderator or admin available, ticket stays unassigned"),
        }
        Ok(admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::{CreateUserRequest, SqliteUserStore};

    fn skills(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn setup() -> (Arc<SqliteUserStore>, AssignmentResolver) {
        let store = Arc::new(SqliteUserStore::in_memory().unwrap());
        let resolver = AssignmentResolver::new(store.clone());
        (store, resolver)
    }

    fn add(store: &SqliteUserStore, email: &str, role: Role, user_skills: &[&str]) -> User {
        store
            .create(
                CreateUserRequest::new(email, email, role)
                    .with_skills(user_skills.iter().copied()),
            )
            .unwrap()
    }

    #[test]
    fn test_skill_match_score() {
        assert_eq!(
            skill_match_score(&skills(&["react"]), &skills(&["React.js"])),
            1
        );
        assert_eq!(
            skill_match_score(&skills(&["react", "node"]), &skills(&["Node", "React"])),
            2
        );
        assert_eq!(
            skill_match_score(&skills(&["python"]), &skills(&["React"])),
            0
        );
        assert_eq!(skill_match_score(&[], &skills(&["React"])), 0);
    }

    #[test]
    fn test_highest_score_wins() {
        let (store, resolver) = setup();
        add(&store, "m1@example.com", Role::Moderator, &["React"]);
        let m2 = add(&store, "m2@example.com", Role::Moderator, &["Node", "React"]);

        let picked = resolver
            .resolve(&skills(&["react", "node"]))
            .unwrap()
            .unwrap();
        assert_eq!(picked.id, m2.id);
    }

    #[test]
    fn test_tie_keeps_first_moderator() {
        let (store, resolver) = setup();
        let m1 = add(&store, "m1@example.com", Role::Moderator, &["React"]);
        add(&store, "m2@example.com", Role::Moderator, &["React"]);

        let picked = resolver.resolve(&skills(&["react"])).unwrap().unwrap();
        assert_eq!(picked.id, m1.id);
    }

    #[test]
    fn test_zero_score_moderator_still_selected() {
        let (store, resolver) = setup();
        let m1 = add(&store, "m1@example.com", Role::Moderator, &["Python"]);
        add(&store, "admin@example.com", Role::Admin, &[]);

        let picked = resolver.resolve(&skills(&["rust"])).unwrap().unwrap();
        assert_eq!(picked.id, m1.id);
    }

    #[test]
    fn test_no_skills_falls_back_to_admin() {
        let (store, resolver) = setup();
        add(&store, "m1@example.com", Role::Moderator, &["React"]);
        let admin = add(&store, "admin@example.com", Role::Admin, &[]);

        let picked = resolver.resolve(&[]).unwrap().unwrap();
        assert_eq!(picked.id, admin.id);
    }

    #[test]
    fn test_no_moderators_falls_back_to_admin() {
        let (store, resolver) = setup();
        add(&store, "user@example.com", Role::User, &["React"]);
        let admin = add(&store, "admin@example.com", Role::Admin, &[]);

        let picked = resolver.resolve(&skills(&["react"])).unwrap().unwrap();
        assert_eq!(picked.id, admin.id);
    }

    #[test]
    fn test_nobody_available() {
        let (store, resolver) = setup();
        add(&store, "user@example.com", Role::User, &["React"]);

        assert!(resolver.resolve(&skills(&["react"])).unwrap().is_none());
        assert!(resolver.resolve(&[]).unwrap().is_none());
    }
}
