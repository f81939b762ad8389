// Operator-side roster maintenance: availability and requested slots.

use std::sync::Arc;

use rand::seq::SliceRandom;
use thiserror::Error;
use tracing::info;

use crate::domain::errors::StoreError;
use crate::domain::ports::UserStore;
use crate::domain::user::{User, UserState};

// Slots a human can request.
pub const HUMAN_POSITIONS: [u8; 3] = [1, 2, 3];

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("position {0} is outside 1-3")]
    InvalidPosition(u8),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionAssignment {
    pub user_id: String,
    pub display_name: String,
    pub position: u8,
}

#[derive(Clone)]
pub struct RosterService {
    users: Arc<dyn UserStore>,
}

impl RosterService {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Human users in registration order.
    pub async fn list(&self) -> Result<Vec<User>, StoreError> {
        let users = self.users.all().await?;
        Ok(users.into_iter().filter(|user| !user.is_computer).collect())
    }

    /// Applies each state in order; stops at the first unknown user.
    pub async fn update_states(&self, changes: &[(String, UserState)]) -> Result<(), RosterError> {
        for (user_id, state) in changes {
            self.users.set_state(user_id, *state).await?;
        }
        info!(count = changes.len(), "user states updated");
        Ok(())
    }

    /// Validates every position before writing any of them.
    pub async fn update_positions(
        &self,
        changes: &[(String, Option<u8>)],
    ) -> Result<(), RosterError> {
        if let Some(invalid) = changes
            .iter()
            .filter_map(|(_, position)| *position)
            .find(|position| !HUMAN_POSITIONS.contains(position))
        {
            return Err(RosterError::InvalidPosition(invalid));
        }
        for (user_id, position) in changes {
            self.users.set_position(user_id, *position).await?;
        }
        info!(count = changes.len(), "user positions updated");
        Ok(())
    }

    pub async fn set_all_waiting(&self) -> Result<u64, StoreError> {
        let matched = self.users.set_all_waiting().await?;
        info!(matched, "all users set to waiting");
        Ok(matched)
    }

    /// Deals slots 1-3 in random order to the active humans.
    pub async fn shuffle_positions(&self) -> Result<Vec<PositionAssignment>, StoreError> {
        let mut order = HUMAN_POSITIONS;
        order.shuffle(&mut rand::rng());
        self.assign_positions(order).await
    }

    // Humans beyond the third keep their current slot.
    async fn assign_positions(
        &self,
        order: [u8; 3],
    ) -> Result<Vec<PositionAssignment>, StoreError> {
        let humans: Vec<User> = self
            .users
            .active()
            .await?
            .into_iter()
            .filter(|user| !user.is_computer)
            .collect();

        let mut assignments = Vec::with_capacity(order.len());
        for (user, position) in humans.into_iter().zip(order) {
            self.users.set_position(&user.id, Some(position)).await?;
            assignments.push(PositionAssignment {
                user_id: user.id,
                display_name: user.display_name,
                position,
            });
        }
        info!(assigned = assignments.len(), "positions shuffled");
        Ok(assignments)
    }
}
