//! The admin collections this client knows about, and the lookup tables their pages share.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use super::admin_api::{CollectionApi, HttpMethod};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum Collection {
    CardpcNews,
    CardpcExaminations,
    CardpcTraining,
    MediaPresentations,
    MediaVideos,
    MediaImages,
    MediaDocuments,
    MediaSlides,
    CourseCourses,
    CoursePresentations,
    NotificationEmails,
    NotificationAlisms,
}

impl Collection {
    pub fn domain(self) -> &'static str {
        match self {
            Collection::CardpcNews | Collection::CardpcExaminations | Collection::CardpcTraining => {
                "cardpc"
            }
            Collection::MediaPresentations
            | Collection::MediaVideos
            | Collection::MediaImages
            | Collection::MediaDocuments
            | Collection::MediaSlides => "media",
            Collection::CourseCourses | Collection::CoursePresentations => "course",
            Collection::NotificationEmails | Collection::NotificationAlisms => "notification",
        }
    }

    /// Path segment(s) under the domain.
    pub fn collection(self) -> &'static str {
        match self {
            Collection::CardpcNews => "zhixiang/news",
            Collection::CardpcExaminations => "zhixiang/examinations",
            Collection::CardpcTraining => "zhixiang/training",
            Collection::MediaPresentations | Collection::CoursePresentations => "presentations",
            Collection::MediaVideos => "videos",
            Collection::MediaImages => "images",
            Collection::MediaDocuments => "documents",
            Collection::MediaSlides => "slides",
            Collection::CourseCourses => "courses",
            Collection::NotificationEmails => "emails",
            Collection::NotificationAlisms => "alisms",
        }
    }

    pub fn api(self) -> CollectionApi {
        CollectionApi::new(self.domain(), self.collection())
    }

    /// Route name of the collection's list page; also its search cache key.
    pub fn route_name(self) -> String {
        self.to_string()
    }

    /// Sent notifications are an audit log, and training records are created by users.
    pub fn supports(self, method: HttpMethod) -> bool {
        match self {
            Collection::NotificationEmails | Collection::NotificationAlisms => {
                method == HttpMethod::Get
            }
            Collection::CardpcTraining => matches!(method, HttpMethod::Get | HttpMethod::Patch),
            _ => method != HttpMethod::Put,
        }
    }

    pub fn find(domain: &str, collection: &str) -> Option<Self> {
        Self::iter().find(|c| c.domain() == domain && c.collection() == collection)
    }
}

/// Tag colour a status is rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum StatusTag {
    Success,
    Warning,
    Danger,
}

/// Delivery status of an email or SMS record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// Queued; sending is synchronous today so records rarely stay here.
    Pending,
    /// Refused by an internal limit.
    Reject,
    Sent,
    Success,
    Failed,
    /// Sending disabled locally.
    Dryrun,
    Unknown,
}

impl DeliveryStatus {
    /// Unrecognised values map to [`DeliveryStatus::Unknown`].
    pub fn parse(value: &str) -> Self {
        Self::from_str(value).unwrap_or(DeliveryStatus::Unknown)
    }

    pub fn display(self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Reject => "rejected",
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Success => "delivered",
            DeliveryStatus::Failed => "failed",
            DeliveryStatus::Dryrun => "local test",
            DeliveryStatus::Unknown => "unknown",
        }
    }

    pub fn tag(self) -> StatusTag {
        match self {
            DeliveryStatus::Pending | DeliveryStatus::Unknown => StatusTag::Warning,
            DeliveryStatus::Reject | DeliveryStatus::Failed => StatusTag::Danger,
            DeliveryStatus::Sent | DeliveryStatus::Success | DeliveryStatus::Dryrun => {
                StatusTag::Success
            }
        }
    }
}
