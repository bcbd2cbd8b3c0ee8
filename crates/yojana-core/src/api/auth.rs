use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::BackendClient;
use crate::error::ServiceError;
use crate::services::{AuthService, ProfileService};
use crate::session::AuthSession;
use crate::state::EligibilityProfile;

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
    user_id: String,
}

#[derive(Serialize)]
struct BasicProfile<'a> {
    name: &'a str,
    dob: &'a str,
    state: &'a str,
    income: u64,
    category: &'a str,
}

impl<'a> From<&'a EligibilityProfile> for BasicProfile<'a> {
    fn from(profile: &'a EligibilityProfile) -> Self {
        Self {
            name: &profile.name,
            dob: &profile.dob,
            state: &profile.state,
            income: profile.income,
            category: profile.category.as_str(),
        }
    }
}

impl BackendClient {
    async fn exchange(
        &self,
        path: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, ServiceError> {
        let body = Credentials { email, password };
        let response: TokenResponse = self.send_json(self.post(path).json(&body)).await?;
        tracing::info!(user_id = %response.user_id, path, "signed in");
        Ok(AuthSession {
            token: response.token,
            user_id: response.user_id,
            email: email.to_string(),
            profile_completed: false,
            profile: None,
        })
    }
}

#[async_trait]
impl AuthService for BackendClient {
    async fn login(&self, email: &str, password: &str) -> Result<AuthSession, ServiceError> {
        self.exchange("/api/login", email, password).await
    }

    async fn register(&self, email: &str, password: &str) -> Result<AuthSession, ServiceError> {
        self.exchange("/api/register", email, password).await
    }
}

#[async_trait]
impl ProfileService for BackendClient {
    async fn save_profile(&self, profile: &EligibilityProfile) -> Result<(), ServiceError> {
        let request = self
            .authorized(self.post("/api/profile/basic"))?
            .json(&BasicProfile::from(profile));
        let _: serde_json::Value = self.send_json(request).await?;
        Ok(())
    }

    async fn has_profile(&self) -> Result<bool, ServiceError> {
        let request = self.authorized(self.get("/api/profile"))?;
        match self.send_json::<serde_json::Value>(request).await {
            Ok(_) => Ok(true),
            Err(ServiceError::Status { status: 404, .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Category;

    #[test]
    fn test_basic_profile_body() {
        let profile = EligibilityProfile {
            name: "Ravi".to_string(),
            dob: "2005-11-20".to_string(),
            state: "Kerala".to_string(),
            income: 250000,
            category: Category::General,
            marks_12: Some(72.0),
        };

        let json = serde_json::to_value(BasicProfile::from(&profile)).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "name": "Ravi",
                "dob": "2005-11-20",
                "state": "Kerala",
                "income": 250000,
                "category": "GEN",
            })
        );
    }

    #[test]
    fn test_token_response_decodes() {
        let response: TokenResponse =
            serde_json::from_str(r#"{"token":"eyJ.x.y","user_id":"u-1"}"#).unwrap();
        assert_eq!(response.token, "eyJ.x.y");
        assert_eq!(response.user_id, "u-1");
    }
}
