//! Booking status transitions and who may perform them.
//!
//! Every route that mutates a booking runs [`authorize`] first. It touches no
//! storage: the caller loads the booking, asks whether the action is allowed,
//! and writes the returned status.

use crate::models::{Actor, Booking, BookingStatus, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Confirm,
    Cancel,
    Complete,
    Review,
    AttachImages,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Confirm => "confirm",
            Action::Cancel => "cancel",
            Action::Complete => "complete",
            Action::Review => "review",
            Action::AttachImages => "attach images to",
        }
    }

    pub fn required_role(&self) -> Role {
        match self {
            Action::Review => Role::CarOwner,
            Action::Confirm | Action::Cancel | Action::Complete | Action::AttachImages => {
                Role::ShopOwner
            }
        }
    }

    /// Status the booking ends up in, given where it starts.
    pub fn target(&self, current: BookingStatus) -> BookingStatus {
        match self {
            Action::Confirm => BookingStatus::Confirmed,
            Action::Cancel => BookingStatus::Cancelled,
            Action::Complete => BookingStatus::Completed,
            Action::Review => BookingStatus::Completed,
            Action::AttachImages => current,
        }
    }

    pub fn allowed_from(&self, current: BookingStatus) -> bool {
        use BookingStatus::*;
        match self {
            Action::Confirm => current == Pending,
            Action::Cancel => matches!(current, Pending | Confirmed),
            Action::Complete => current == Confirmed,
            Action::Review => current == Completed,
            Action::AttachImages => matches!(current, Pending | Confirmed | Completed),
        }
    }

    /// Maps a requested status onto the action that produces it.
    pub fn for_status(status: BookingStatus) -> Option<Self> {
        match status {
            BookingStatus::Confirmed => Some(Action::Confirm),
            BookingStatus::Cancelled => Some(Action::Cancel),
            BookingStatus::Completed => Some(Action::Complete),
            BookingStatus::Pending | BookingStatus::InProgress => None,
        }
    }
}

/// Profile ids recorded on the booking.
#[derive(Debug, Clone, Copy)]
pub struct Owners<'a> {
    pub car_owner_id: &'a str,
    pub shop_owner_id: &'a str,
}

impl<'a> Owners<'a> {
    pub fn of(booking: &'a Booking) -> Self {
        Self {
            car_owner_id: &booking.car_owner_id,
            shop_owner_id: &booking.shop_owner_id,
        }
    }

    fn for_role(&self, role: Role) -> &'a str {
        match role {
            Role::CarOwner => self.car_owner_id,
            Role::ShopOwner => self.shop_owner_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("only a {required} can {} a booking", .action.as_str())]
    WrongRole { action: Action, required: Role },

    #[error("booking belongs to another account")]
    NotOwner,

    #[error("cannot {} a booking that is {from} (requested {to})", .action.as_str())]
    InvalidTransition {
        action: Action,
        from: BookingStatus,
        to: BookingStatus,
    },
}

/// Checks role, then ownership, then source state. Returns the next status.
pub fn authorize(
    current: BookingStatus,
    action: Action,
    actor: &Actor,
    owners: Owners<'_>,
) -> Result<BookingStatus, LifecycleError> {
    let required = action.required_role();
    if actor.role != required {
        return Err(LifecycleError::WrongRole { action, required });
    }

    if owners.for_role(required) != actor.profile_id {
        return Err(LifecycleError::NotOwner);
    }

    if !action.allowed_from(current) {
        return Err(LifecycleError::InvalidTransition {
            action,
            from: current,
            to: action.target(current),
        });
    }

    Ok(action.target(current))
}

pub fn authorize_booking(
    booking: &Booking,
    action: Action,
    actor: &Actor,
) -> Result<BookingStatus, LifecycleError> {
    authorize(booking.status, action, actor, Owners::of(booking))
}
