use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;
use thiserror::Error;

use crate::database::models::{Answers, FeatureInterest};

pub const MAX_COMMENTS_LENGTH: usize = 500;
pub const MAX_PLATFORM_LENGTH: usize = 200;

/// First invalid field of a request, with a message fit for the client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Questionnaire body exactly as the client sent it. Fields stay untyped so
/// a wrong value is reported against its field instead of as a parse error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    pub account_country: Option<Value>,
    pub company_name: Option<Value>,
    pub company_size: Option<Value>,
    pub industry: Option<Value>,
    pub primary_use_case: Option<Value>,
    pub use_case_description: Option<Value>,
    pub number_of_screens: Option<Value>,
    pub screen_locations: Option<Value>,
    pub technical_proficiency: Option<Value>,
    pub current_platform: Option<Value>,
    pub feature_interests: Option<Value>,
    pub additional_comments: Option<Value>,
    pub referral_source: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSubmission {
    pub answers: Answers,
    pub referral_source: Option<String>,
}

/// Check a raw submission against the closed enumerations and length limits.
/// Fields are checked in questionnaire order; the first failure wins.
pub fn validate_submission(raw: &SubmissionRequest) -> Result<ValidatedSubmission, ValidationError> {
    let company_name = optional_text(&raw.company_name, "companyName", "Company name is required")?
        .ok_or_else(|| ValidationError::new("companyName", "Company name is required"))?;

    let company_size = choice(&raw.company_size, "companySize", "Invalid company size")?;
    let industry = choice(&raw.industry, "industry", "Invalid industry")?;
    let primary_use_case = choice(&raw.primary_use_case, "primaryUseCase", "Invalid primary use case")?;
    let number_of_screens = choice(&raw.number_of_screens, "numberOfScreens", "Invalid number of screens")?;
    let technical_proficiency = choice(
        &raw.technical_proficiency,
        "technicalProficiency",
        "Invalid technical proficiency",
    )?;

    let feature_interests = feature_interests(&raw.feature_interests)?;

    let additional_comments = optional_text(
        &raw.additional_comments,
        "additionalComments",
        "Additional comments must be text",
    )?;
    check_length(
        &additional_comments,
        MAX_COMMENTS_LENGTH,
        "additionalComments",
        "Additional comments cannot exceed 500 characters",
    )?;

    let current_platform = optional_text(
        &raw.current_platform,
        "currentPlatform",
        "Current platform description must be text",
    )?;
    check_length(
        &current_platform,
        MAX_PLATFORM_LENGTH,
        "currentPlatform",
        "Current platform description cannot exceed 200 characters",
    )?;

    Ok(ValidatedSubmission {
        answers: Answers {
            account_country: optional_text(&raw.account_country, "accountCountry", "Country must be text")?,
            company_name,
            company_size,
            industry,
            primary_use_case,
            use_case_description: optional_text(
                &raw.use_case_description,
                "useCaseDescription",
                "Use case description must be text",
            )?,
            number_of_screens,
            screen_locations: optional_text(
                &raw.screen_locations,
                "screenLocations",
                "Screen locations must be text",
            )?,
            technical_proficiency,
            current_platform,
            feature_interests,
            additional_comments,
        },
        referral_source: optional_text(&raw.referral_source, "referralSource", "Referral source must be text")?,
    })
}

/// Trimmed string, `None` when absent, null or blank.
fn optional_text(
    value: &Option<Value>,
    field: &'static str,
    message: &str,
) -> Result<Option<String>, ValidationError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
        }
        Some(_) => Err(ValidationError::new(field, message)),
    }
}

fn choice<T: FromStr>(value: &Option<Value>, field: &'static str, message: &str) -> Result<T, ValidationError> {
    match value {
        Some(Value::String(s)) => s.trim().parse().map_err(|_| ValidationError::new(field, message)),
        _ => Err(ValidationError::new(field, message)),
    }
}

fn check_length(
    value: &Option<String>,
    max: usize,
    field: &'static str,
    message: &str,
) -> Result<(), ValidationError> {
    match value {
        Some(s) if s.chars().count() > max => Err(ValidationError::new(field, message)),
        _ => Ok(()),
    }
}

/// Absent or null means no interests. Repeated tags collapse to their first
/// occurrence so one response never counts twice for a tag.
fn feature_interests(value: &Option<Value>) -> Result<Vec<FeatureInterest>, ValidationError> {
    let items = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(ValidationError::new(
                "featureInterests",
                "Feature interests must be an array",
            ))
        }
    };

    let mut tags = Vec::with_capacity(items.len());
    for item in items {
        let tag: FeatureInterest = item
            .as_str()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| ValidationError::new("featureInterests", format!("Invalid feature interest: {}", item)))?;
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    Ok(tags)
}
