//! Scheduler error taxonomy.
//!
//! Only configuration errors exist at this layer: they are raised while the
//! robot assembly is being wired up and are fatal at startup. Runtime
//! scheduling conflicts are not errors at all; the scheduler drops the losing
//! request for that tick and reports it through telemetry.

use thiserror::Error;

use crate::mechanism::MechanismId;

/// Construction/registration-time configuration errors.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("mechanism '{0}' is already registered")]
    DuplicateMechanism(MechanismId),

    #[error("mechanism '{0}' is not registered")]
    UnknownMechanism(MechanismId),

    #[error("default action '{action}' for '{mechanism}' must require exactly that mechanism")]
    DefaultRequirements {
        mechanism: MechanismId,
        action: String,
    },

    #[error("parallel composite children both require mechanism '{0}'")]
    OverlappingRequirements(MechanismId),
}
