use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::BackendClient;
use crate::error::ServiceError;
use crate::services::{Answer, ContextDescriptor, QaService};
use crate::state::{ContextKey, EligibilityProfile};

#[derive(Serialize, Debug, PartialEq)]
struct UserData {
    marks_12: Option<f32>,
    income: u64,
    state: String,
    category: String,
}

impl From<&EligibilityProfile> for UserData {
    fn from(profile: &EligibilityProfile) -> Self {
        Self {
            marks_12: profile.marks_12,
            income: profile.income,
            state: profile.state.clone(),
            category: profile.category.as_str().to_string(),
        }
    }
}

#[derive(Serialize)]
struct EligibilityRequest<'a> {
    user_data: UserData,
    question: &'a str,
}

#[derive(Serialize)]
struct AskRequest<'a> {
    question: &'a str,
    source_id: &'a str,
}

#[derive(Deserialize)]
struct QaResponse {
    response: String,
    #[serde(default)]
    sources: Vec<String>,
}

impl From<QaResponse> for Answer {
    fn from(response: QaResponse) -> Self {
        let mut citations = response.sources;
        citations.sort();
        citations.dedup();
        Answer {
            text: response.response,
            citations,
        }
    }
}

#[async_trait]
impl QaService for BackendClient {
    async fn answer(
        &self,
        question: &str,
        context: &ContextDescriptor,
    ) -> Result<Answer, ServiceError> {
        let response: QaResponse = match &context.key {
            ContextKey::Eligibility => {
                let profile = context.profile.as_ref().ok_or(ServiceError::Status {
                    status: 400,
                    body: "Profile not found".to_string(),
                })?;
                let body = EligibilityRequest {
                    user_data: profile.into(),
                    question,
                };
                self.send_json(self.post("/api/test-eligibility").json(&body))
                    .await?
            }
            ContextKey::Source(id) => {
                let body = AskRequest {
                    question,
                    source_id: id.as_str(),
                };
                let request = self.authorized(self.post("/api/ask"))?.json(&body);
                self.send_json(request).await?
            }
        };

        tracing::debug!(context = %context.key, citations = response.sources.len(), "answer received");
        Ok(response.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Category;

    #[test]
    fn test_eligibility_body_shape() {
        let profile = EligibilityProfile {
            name: "Asha".to_string(),
            dob: "2006-04-02".to_string(),
            state: "Bihar".to_string(),
            income: 180000,
            category: Category::Obc,
            marks_12: Some(86.5),
        };
        let body = EligibilityRequest {
            user_data: (&profile).into(),
            question: "Am I eligible for NSP?",
        };

        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["user_data"]["category"], "OBC");
        assert_eq!(json["user_data"]["income"], 180000);
        assert_eq!(json["user_data"]["marks_12"], 86.5);
        assert_eq!(json["question"], "Am I eligible for NSP?");
        assert!(json["user_data"].get("name").is_none());
    }

    #[test]
    fn test_response_dedups_sources() {
        let response: QaResponse = serde_json::from_str(
            r#"{"response":"Yes.","sources":["b.pdf","a.pdf","b.pdf"]}"#,
        )
        .unwrap();
        let answer: Answer = response.into();
        assert_eq!(answer.text, "Yes.");
        assert_eq!(answer.citations, vec!["a.pdf", "b.pdf"]);
    }

    #[test]
    fn test_response_without_sources() {
        let response: QaResponse = serde_json::from_str(r#"{"response":"No."}"#).unwrap();
        assert!(Answer::from(response).citations.is_empty());
    }
}
