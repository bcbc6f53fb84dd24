//! Authentication and role-based access
//!
//! Staff log in with a username and password, receive a signed JWT, and
//! present it as a bearer token. Every route checks the caller's role
//! against its own allow-list.

use std::fmt;

use serde::{Deserialize, Serialize};

mod password;
mod token;

pub use password::{hash_password, verify_account_password, verify_password};
pub use token::{Claims, IssuedToken, TokenService};

/// Staff role. A user has exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Doctor,
    Nurse,
    Receptionist,
    LabTechnician,
    Radiologist,
    Pharmacist,
    Accountant,
}

impl Role {
    pub const ALL: &'static [Role] = &[
        Role::Admin,
        Role::Doctor,
        Role::Nurse,
        Role::Receptionist,
        Role::LabTechnician,
        Role::Radiologist,
        Role::Pharmacist,
        Role::Accountant,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Doctor => "doctor",
            Role::Nurse => "nurse",
            Role::Receptionist => "receptionist",
            Role::LabTechnician => "lab_technician",
            Role::Radiologist => "radiologist",
            Role::Pharmacist => "pharmacist",
            Role::Accountant => "accountant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns true if `role` appears in the allow-list
pub fn is_allowed(role: Role, allowed: &[Role]) -> bool {
    allowed.contains(&role)
}
