//! Central role and relationship checks used by every mutating operation.

use tracing::{debug, warn};
use uuid::Uuid;

use crate::appointment::AppointmentStatus;
use crate::auth::Role;
use crate::error::AppError;

/// Role-gated operations that do not depend on a particular appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    BookAppointment,
    ManageAvailability,
    ViewAnyAvailability,
    VerifySpecialists,
    ResolveDisputes,
    ViewAllRecords,
}

impl Capability {
    fn allowed_roles(&self) -> &'static [Role] {
        match self {
            Capability::BookAppointment => &[Role::Client],
            Capability::ManageAvailability => &[Role::Specialist],
            Capability::ViewAnyAvailability
            | Capability::VerifySpecialists
            | Capability::ResolveDisputes
            | Capability::ViewAllRecords => &[Role::Admin],
        }
    }

    fn denial(&self) -> &'static str {
        match self {
            Capability::BookAppointment => "Only clients can book appointments",
            Capability::ManageAvailability => "Only specialists can manage availability",
            Capability::ViewAnyAvailability => "Only admins can view other specialists' availability",
            Capability::VerifySpecialists => "Only admins can verify specialists",
            Capability::ResolveDisputes => "Only admins can resolve disputes",
            Capability::ViewAllRecords => "Admin access required",
        }
    }
}

pub fn has_capability(role: Role, capability: Capability) -> bool {
    capability.allowed_roles().contains(&role)
}

pub fn require(role: Role, capability: Capability) -> Result<(), AppError> {
    if has_capability(role, capability) {
        Ok(())
    } else {
        warn!("Role {} denied {:?}", role, capability);
        Err(AppError::Permission(capability.denial().to_string()))
    }
}

/// How a caller relates to a specific appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Client,
    Specialist,
    Admin,
    Outsider,
}

impl Party {
    /// Relationship from ids alone; admins are outsiders here.
    pub fn participant(caller_id: Uuid, client_id: Uuid, specialist_id: Uuid) -> Self {
        if caller_id == client_id {
            Party::Client
        } else if caller_id == specialist_id {
            Party::Specialist
        } else {
            Party::Outsider
        }
    }

    pub fn resolve(caller_id: Uuid, role: Role, client_id: Uuid, specialist_id: Uuid) -> Self {
        match Self::participant(caller_id, client_id, specialist_id) {
            Party::Outsider if role == Role::Admin => Party::Admin,
            party => party,
        }
    }

    pub fn is_involved(&self) -> bool {
        *self != Party::Outsider
    }

    pub fn label(&self) -> &'static str {
        match self {
            Party::Client => "client",
            Party::Specialist => "specialist",
            Party::Admin => "admin",
            Party::Outsider => "outsider",
        }
    }
}

pub fn require_involved(party: Party) -> Result<(), AppError> {
    if party.is_involved() {
        Ok(())
    } else {
        Err(AppError::Permission("Access denied".to_string()))
    }
}

/// Statuses `party` may move an appointment to from `current`.
pub fn allowed_transitions(party: Party, current: AppointmentStatus) -> &'static [AppointmentStatus] {
    use crate::appointment::AppointmentStatus::*;

    match (party, current) {
        (Party::Client, Pending | Confirmed) => &[Cancelled],
        (Party::Specialist, Pending) => &[Confirmed, Cancelled],
        (Party::Specialist, Confirmed) => &[Completed, Cancelled],
        (Party::Admin, Pending | Confirmed) => &[Confirmed, Cancelled, Completed],
        _ => &[],
    }
}

pub fn authorize_transition(
    party: Party,
    current: AppointmentStatus,
    requested: AppointmentStatus,
) -> Result<(), AppError> {
    if allowed_transitions(party, current).contains(&requested) {
        debug!("Transition {} -> {} allowed for {}", current, requested, party.label());
        Ok(())
    } else {
        warn!("Transition {} -> {} denied for {}", current, requested, party.label());
        Err(AppError::Permission("Action not allowed".to_string()))
    }
}
