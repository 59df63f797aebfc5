use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

// --- identity ---

/// Subscription level. Values outside the known set deserialize to `Unknown`
/// and are denied everything by access control.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Basic,
    Standard,
    Premium,
    #[serde(other)]
    Unknown,
}

/// Classification tag carried by gated content.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ContentClass {
    Free,
    Basic,
    StandardOnly,
    PremiumExclusive,
    #[serde(other)]
    Other,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: String,
    pub member_since: DateTime<Utc>,
    pub subscription_status: String,
    pub subscription_tier: Tier,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct UserPatch {
    pub email: Option<String>,
    pub name: Option<String>,
    pub subscription_tier: Option<Tier>,
    pub subscription_status: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RegisterReq {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoginReq {
    pub email: String,
    pub password: String,
}

// --- catalog ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Course {
    pub id: String,
    pub title: String,
    pub description: String,
    pub instructor: String,
    pub thumbnail: String,
    pub category: String,
    pub level: String,
    pub tags: Vec<String>,
    pub rating: f32,
    pub enrollments: u32,
    pub featured: bool,
    pub release_date: NaiveDate,
    pub content_class: ContentClass,
    pub certificate: bool,
    pub modules: Vec<Module>,
}

impl Course {
    pub fn total_lessons(&self) -> usize {
        self.modules.iter().map(|m| m.lessons.len()).sum()
    }

    /// Locate a lesson together with the module that owns it.
    pub fn find_lesson(&self, lesson_id: &str) -> Option<(&Module, &Lesson)> {
        self.modules.iter().find_map(|m| {
            m.lessons
                .iter()
                .find(|l| l.id == lesson_id)
                .map(|l| (m, l))
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Module {
    pub id: String,
    pub title: String,
    pub description: String,
    pub lessons: Vec<Lesson>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Lesson {
    pub id: String,
    pub title: String,
    pub duration_secs: u32,
    pub video_id: String,
    pub resources: Vec<Resource>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Pdf,
    Slides,
    Quiz,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Resource {
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub title: String,
    pub url: String,
}

/// A lesson resource flattened out of the course tree.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CourseResource {
    pub module_id: String,
    pub lesson_id: String,
    #[serde(flatten)]
    pub resource: Resource,
}

// --- progress ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct QuizResult {
    pub quiz: String,
    pub score: f64,
    pub passed: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LessonProgress {
    pub lesson_id: String,
    pub completed: bool,
    pub watch_time: f64,
    pub last_position: f64,
    pub quiz_results: Vec<QuizResult>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LessonState {
    NotStarted,
    InProgress,
    Completed,
}

impl LessonProgress {
    pub fn new(lesson_id: &str) -> Self {
        Self {
            lesson_id: lesson_id.to_string(),
            completed: false,
            watch_time: 0.0,
            last_position: 0.0,
            quiz_results: Vec::new(),
        }
    }

    pub fn state(&self) -> LessonState {
        if self.completed {
            LessonState::Completed
        } else if self.watch_time > 0.0 {
            LessonState::InProgress
        } else {
            LessonState::NotStarted
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ModuleProgress {
    pub module_id: String,
    pub completed: bool,
    pub lesson_progress: Vec<LessonProgress>,
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProgressRecord {
    pub user_id: String,
    pub course_id: String,
    pub start_date: DateTime<Utc>,
    pub last_access_date: DateTime<Utc>,
    pub completed_lessons: Vec<String>,
    pub module_progress: Vec<ModuleProgress>,
    pub overall_progress: f64,
    pub certificate_issued: bool,
    pub certificate_issued_at: Option<DateTime<Utc>>,
}

/// Fields reported by the player for one lesson. Absent fields leave the
/// stored value untouched.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct LessonEvent {
    pub watch_time: Option<f64>,
    pub last_position: Option<f64>,
    pub quiz_results: Option<Vec<QuizResult>>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Enrollment {
    pub user_id: String,
    pub course_id: String,
    pub enrollment_date: DateTime<Utc>,
    pub progress: f64,
    pub last_access_date: DateTime<Utc>,
    pub status: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EnrollReq {
    pub user_id: String,
}

// --- billing ---

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Month,
    Year,
}

/// Subscription plan. Amounts are in centavos.
#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Plan {
    pub id: String,
    pub name: String,
    pub price_cents: u64,
    pub regular_price_cents: Option<u64>,
    pub interval: Interval,
    pub features: Vec<String>,
    pub limitations: Vec<String>,
    pub most_popular: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PaymentMethod {
    pub id: String,
    pub name: String,
    pub enabled: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct PaymentDetails {
    pub method: String,
    pub card_number: Option<String>,
    pub card_expiry: Option<String>,
    pub card_cvv: Option<String>,
    pub card_holder: Option<String>,
    pub document_number: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Subscription {
    pub id: String,
    pub user_id: String,
    pub plan_id: String,
    pub plan_name: String,
    pub price_cents: u64,
    pub interval: Interval,
    pub status: SubscriptionStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub payment_method: String,
    pub last_four: Option<String>,
    pub auto_renew: bool,
    pub created_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Invoice {
    pub id: String,
    pub subscription_id: String,
    pub user_id: String,
    pub amount_cents: u64,
    pub status: String,
    pub payment_method: String,
    pub description: String,
    pub paid_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SubscriptionReceipt {
    pub subscription: Subscription,
    pub invoice: Invoice,
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Cancellation {
    pub subscription_id: String,
    pub message: String,
    pub cancellation_date: DateTime<Utc>,
    pub reason: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PlanChange {
    pub subscription_id: String,
    pub message: String,
    pub updated_at: DateTime<Utc>,
    pub new_plan_id: String,
    pub new_plan_name: String,
    pub price_cents: u64,
    pub interval: Interval,
    pub effective_date: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct InvoicePdf {
    pub invoice_id: String,
    pub pdf_url: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SubscribeReq {
    pub user_id: String,
    pub plan_id: String,
    pub payment: PaymentDetails,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct CancelReq {
    pub reason: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChangePlanReq {
    pub plan_id: String,
}
