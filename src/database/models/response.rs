use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::identity::OwnerSummary;

closed_enum! {
    CompanySize {
        Micro => "1-10",
        Small => "11-50",
        Medium => "51-200",
        Large => "201-500",
        Enterprise => "500+",
    }
}

closed_enum! {
    Industry {
        Retail => "retail",
        Healthcare => "healthcare",
        Education => "education",
        Hospitality => "hospitality",
        Corporate => "corporate",
        Transportation => "transportation",
        Government => "government",
        Other => "other",
    }
}

closed_enum! {
    PrimaryUseCase {
        MenuBoards => "menu-boards",
        Wayfinding => "wayfinding",
        CorporateComms => "corporate-comms",
        Advertising => "advertising",
        InformationDisplay => "information-display",
        EventSignage => "event-signage",
        Other => "other",
    }
}

closed_enum! {
    ScreenCount {
        UpToFive => "1-5",
        UpToTwenty => "6-20",
        UpToFifty => "21-50",
        UpToHundred => "51-100",
        OverHundred => "100+",
    }
}

closed_enum! {
    TechnicalProficiency {
        Beginner => "beginner",
        Intermediate => "intermediate",
        Advanced => "advanced",
    }
}

closed_enum! {
    FeatureInterest {
        Scheduling => "scheduling",
        MultiZone => "multi-zone",
        DataIntegration => "data-integration",
        MobileApp => "mobile-app",
        Analytics => "analytics",
        Collaboration => "collaboration",
        EmergencyAlerts => "emergency-alerts",
        SocialFeeds => "social-feeds",
    }
}

/// The questionnaire answers proper, already validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answers {
    pub account_country: Option<String>,
    pub company_name: String,
    pub company_size: CompanySize,
    pub industry: Industry,
    pub primary_use_case: PrimaryUseCase,
    pub use_case_description: Option<String>,
    pub number_of_screens: ScreenCount,
    pub screen_locations: Option<String>,
    pub technical_proficiency: TechnicalProficiency,
    pub current_platform: Option<String>,
    pub feature_interests: Vec<FeatureInterest>,
    pub additional_comments: Option<String>,
}

/// One stored submission. `owner_id` is unique across the collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub email: String,
    #[serde(flatten)]
    pub answers: Answers,
    pub submitted_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub referral_source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseWithOwner {
    #[serde(flatten)]
    pub response: Response,
    pub owner: OwnerSummary,
}

/// The categorical slice of a response the statistics are computed over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFacets {
    pub company_size: CompanySize,
    pub industry: Industry,
    pub feature_interests: Vec<FeatureInterest>,
}

impl From<&Response> for ResponseFacets {
    fn from(response: &Response) -> Self {
        Self {
            company_size: response.answers.company_size,
            industry: response.answers.industry,
            feature_interests: response.answers.feature_interests.clone(),
        }
    }
}

/// Admin listing filter. Empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseFilter {
    pub industry: Option<Industry>,
    pub company_size: Option<CompanySize>,
    /// Case-insensitive substring of company name or email.
    pub search: Option<String>,
}

impl ResponseFilter {
    pub fn is_empty(&self) -> bool {
        self.industry.is_none() && self.company_size.is_none() && self.search.is_none()
    }

    pub fn matches(&self, response: &Response) -> bool {
        if let Some(industry) = self.industry {
            if response.answers.industry != industry {
                return false;
            }
        }
        if let Some(size) = self.company_size {
            if response.answers.company_size != size {
                return false;
            }
        }
        if let Some(term) = &self.search {
            let term = term.to_lowercase();
            let in_name = response.answers.company_name.to_lowercase().contains(&term);
            let in_email = response.email.to_lowercase().contains(&term);
            if !in_name && !in_email {
                return false;
            }
        }
        true
    }
}
