//! Role capabilities: which modules a staff role may open and which
//! threshold alerts it receives.
//!
//! Module gating and monitor recipient selection both read this table.
//! Default-deny: a role/module pair not listed here is refused, and an
//! inactive profile is refused everything.

use serde::Serialize;

use crate::models::{Profile, Role};

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Functional areas of the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Module {
    Dashboard,
    AthleticTraining,
    Physiotherapy,
    Physicians,
    DocumentDigitization,
    Appointments,
    Notifications,
}

impl Module {
    pub const ALL: [Module; 7] = [
        Module::Dashboard,
        Module::AthleticTraining,
        Module::Physiotherapy,
        Module::Physicians,
        Module::DocumentDigitization,
        Module::Appointments,
        Module::Notifications,
    ];

    /// Route slug as used by the web client.
    pub fn path(self) -> &'static str {
        match self {
            Self::Dashboard => "/dashboard",
            Self::AthleticTraining => "/athletiktrainer",
            Self::Physiotherapy => "/physiotherapie",
            Self::Physicians => "/aerzte",
            Self::DocumentDigitization => "/befund-digitalisierung",
            Self::Appointments => "/termine",
            Self::Notifications => "/benachrichtigungen",
        }
    }
}

/// Threshold alerts the monitor raises. Overdue appointments are not a
/// role alert: they go to the assigned staff member plus admins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertClass {
    LowRsi,
    HighPain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub modules: &'static [Module],
    pub alerts: &'static [AlertClass],
}

const ADMIN: Capabilities = Capabilities {
    modules: &Module::ALL,
    alerts: &[AlertClass::LowRsi, AlertClass::HighPain],
};

const TRAINER: Capabilities = Capabilities {
    modules: &[
        Module::Dashboard,
        Module::AthleticTraining,
        Module::DocumentDigitization,
        Module::Appointments,
        Module::Notifications,
    ],
    alerts: &[AlertClass::LowRsi],
};

const PHYSIOTHERAPIST: Capabilities = Capabilities {
    modules: &[
        Module::Dashboard,
        Module::Physiotherapy,
        Module::DocumentDigitization,
        Module::Appointments,
        Module::Notifications,
    ],
    alerts: &[AlertClass::HighPain],
};

const PHYSICIAN: Capabilities = Capabilities {
    modules: &[
        Module::Dashboard,
        Module::Physicians,
        Module::DocumentDigitization,
        Module::Appointments,
        Module::Notifications,
    ],
    alerts: &[],
};

impl Role {
    pub fn capabilities(self) -> Capabilities {
        match self {
            Role::Admin => ADMIN,
            Role::Trainer => TRAINER,
            Role::Physiotherapist => PHYSIOTHERAPIST,
            Role::Physician => PHYSICIAN,
        }
    }

    pub fn can_access(self, module: Module) -> bool {
        self.capabilities().modules.contains(&module)
    }

    pub fn receives(self, alert: AlertClass) -> bool {
        self.capabilities().alerts.contains(&alert)
    }
}

/// Roles whose members get `alert`, in `Role::ALL` order.
pub fn roles_receiving(alert: AlertClass) -> Vec<Role> {
    Role::ALL.iter().copied().filter(|r| r.receives(alert)).collect()
}

/// Modules shown in the navigation for `role`, in menu order.
pub fn visible_modules(role: Role) -> Vec<Module> {
    Module::ALL.into_iter().filter(|m| role.can_access(*m)).collect()
}

// ═══════════════════════════════════════════════════════════
// Access check
// ═══════════════════════════════════════════════════════════

/// Why access was granted or refused. Logged for audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessReason {
    RoleGrants,
    RoleLacksModule,
    InactiveProfile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: AccessReason,
}

/// Check whether `profile` may open `module`.
pub fn check_module_access(profile: &Profile, module: Module) -> AccessDecision {
    let decision = if !profile.is_active {
        AccessDecision {
            allowed: false,
            reason: AccessReason::InactiveProfile,
        }
    } else if profile.role.can_access(module) {
        AccessDecision {
            allowed: true,
            reason: AccessReason::RoleGrants,
        }
    } else {
        AccessDecision {
            allowed: false,
            reason: AccessReason::RoleLacksModule,
        }
    };
    if !decision.allowed {
        tracing::debug!(
            profile_id = %profile.id,
            role = profile.role.as_str(),
            module = ?module,
            reason = ?decision.reason,
            "Module access denied"
        );
    }
    decision
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
