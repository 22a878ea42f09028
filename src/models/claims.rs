use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user: UserData,
    pub exp: usize,
}

/// Authenticated caller identity. Attached to the request by the identity
/// middleware and handed to every store operation explicitly.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UserData {
    pub id: String,
}
