// Tier-based content gating

use crate::models::{ContentClass, Tier, User};

/// Whether `user` may view content classified as `content`. No session means
/// no access.
pub fn has_access(user: Option<&User>, content: ContentClass) -> bool {
    match user {
        Some(u) => tier_allows(u.subscription_tier, content),
        None => false,
    }
}

pub fn tier_allows(tier: Tier, content: ContentClass) -> bool {
    match tier {
        Tier::Premium => true,
        Tier::Standard => content != ContentClass::PremiumExclusive,
        Tier::Basic => matches!(content, ContentClass::Free | ContentClass::Basic),
        Tier::Unknown => false,
    }
}
