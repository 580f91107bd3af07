use serde::{Deserialize, Serialize};

pub const ACCESS_TOKEN_TYPE: &str = "access";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccessTokenResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenClaims {
    pub sub: String, // subject (user ID)
    pub exp: usize,  // expiration time
    pub iat: usize,  // issued at
    #[serde(default)]
    pub token_type: String,
}
