use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub Uuid);

impl CustomerId {
    /// Parses an authenticated customer identifier. The nil UUID is rejected
    /// because the portal uses it as the "anonymous" placeholder.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let id = Uuid::parse_str(raw.trim()).map_err(|_| {
            DomainError::InvariantViolation(format!("customer id `{raw}` is not a valid uuid"))
        })?;
        if id.is_nil() {
            return Err(DomainError::InvariantViolation("customer id must not be nil".to_owned()));
        }
        Ok(Self(id))
    }
}

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub address: Option<String>,
    pub contact: Option<String>,
}
