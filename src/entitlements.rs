//! Plan and entitlement resolution.
//!
//! Everything in this module is pure: callers pass the profile, the active
//! subscription (if any) and the current instant, and get back the effective
//! plan and derived feature access. Rule changes belong here and nowhere else.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::accounts::Profile;
use crate::billing::Subscription;

/// Length of the one-shot trial window.
pub const TRIAL_PERIOD_DAYS: i64 = 3;

pub const BASIC_CONTACT_LIMIT: u32 = 3;
pub const PREMIUM_CONTACT_LIMIT: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    None,
    Basic,
    Premium,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::None => "none",
            Plan::Basic => "basic",
            Plan::Premium => "premium",
        }
    }

    /// Plans that carry paid access. `None` never does.
    pub fn is_paid(&self) -> bool {
        matches!(self, Plan::Basic | Plan::Premium)
    }

    pub fn contact_limit(&self) -> u32 {
        match self {
            Plan::None => 0,
            Plan::Basic => BASIC_CONTACT_LIMIT,
            Plan::Premium => PREMIUM_CONTACT_LIMIT,
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown plan `{0}`")]
pub struct UnknownPlan(pub String);

impl FromStr for Plan {
    type Err = UnknownPlan;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(Plan::None),
            "basic" => Ok(Plan::Basic),
            "premium" => Ok(Plan::Premium),
            other => Err(UnknownPlan(other.to_string())),
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TrialError {
    #[error("the free trial has already been used")]
    AlreadyUsedTrial,
    #[error("a trial is already active")]
    TrialAlreadyActive,
    #[error("a payment method is required before starting the trial")]
    PaymentMethodRequired,
}

impl TrialError {
    pub fn code(&self) -> &'static str {
        match self {
            TrialError::AlreadyUsedTrial => "already_used_trial",
            TrialError::TrialAlreadyActive => "trial_already_active",
            TrialError::PaymentMethodRequired => "payment_method_required",
        }
    }
}

pub fn trial_ends_at(profile: &Profile) -> Option<DateTime<Utc>> {
    profile
        .trial_started_at
        .map(|started| started + Duration::days(TRIAL_PERIOD_DAYS))
}

pub fn trial_is_open(profile: &Profile, now: DateTime<Utc>) -> bool {
    trial_ends_at(profile).map_or(false, |ends| now < ends)
}

/// Effective plan, first matching rule wins:
///
/// 1. an active subscription on a paid plan
/// 2. the free override (premium)
/// 3. an open trial window (premium)
/// 4. the legacy subscribed flag together with a paid plan tier
/// 5. `none`
pub fn resolve_plan(
    profile: &Profile,
    subscription: Option<&Subscription>,
    now: DateTime<Utc>,
) -> Plan {
    if let Some(subscription) = subscription {
        if subscription.is_active() && subscription.plan.is_paid() {
            return subscription.plan;
        }
    }
    if profile.is_free_override {
        return Plan::Premium;
    }
    if trial_is_open(profile, now) {
        return Plan::Premium;
    }
    if profile.is_subscribed && profile.plan_tier.is_paid() {
        return profile.plan_tier;
    }
    Plan::None
}

/// Trial access and plan-derived premium are checked independently so that a
/// lapsed subscription never hides an open trial, and the other way round.
pub fn has_premium_access(
    profile: &Profile,
    subscription: Option<&Subscription>,
    now: DateTime<Utc>,
) -> bool {
    resolve_plan(profile, subscription, now) == Plan::Premium || trial_is_open(profile, now)
}

pub fn contact_limit(
    profile: &Profile,
    subscription: Option<&Subscription>,
    now: DateTime<Utc>,
) -> u32 {
    resolve_plan(profile, subscription, now).contact_limit()
}

/// User-initiated trial activation. Succeeds exactly once per profile.
pub fn start_trial(profile: &mut Profile, now: DateTime<Utc>) -> Result<(), TrialError> {
    if profile.has_used_trial {
        return Err(TrialError::AlreadyUsedTrial);
    }
    if profile.trial_started_at.is_some() {
        return Err(TrialError::TrialAlreadyActive);
    }
    if !profile.payment_method_on_file {
        return Err(TrialError::PaymentMethodRequired);
    }
    profile.trial_started_at = Some(now);
    profile.has_used_trial = true;
    Ok(())
}

/// Privileged activation used by billing reconciliation. Skips the payment
/// method precondition and is a no-op when the trial was ever started.
/// Returns whether the trial was started by this call.
pub fn activate_trial_unchecked(profile: &mut Profile, now: DateTime<Utc>) -> bool {
    if profile.has_used_trial || profile.trial_started_at.is_some() {
        return false;
    }
    profile.trial_started_at = Some(now);
    profile.has_used_trial = true;
    true
}

/// Profile plus the subscription the resolver reads, loaded together.
#[derive(Debug, Clone)]
pub struct EntitlementSnapshot {
    pub profile: Profile,
    pub subscription: Option<Subscription>,
}

impl EntitlementSnapshot {
    pub fn new(profile: Profile, subscription: Option<Subscription>) -> Self {
        Self {
            profile,
            subscription,
        }
    }

    pub fn plan(&self, now: DateTime<Utc>) -> Plan {
        resolve_plan(&self.profile, self.subscription.as_ref(), now)
    }

    pub fn has_premium_access(&self, now: DateTime<Utc>) -> bool {
        has_premium_access(&self.profile, self.subscription.as_ref(), now)
    }

    pub fn contact_limit(&self, now: DateTime<Utc>) -> u32 {
        contact_limit(&self.profile, self.subscription.as_ref(), now)
    }

    pub fn summary(&self, now: DateTime<Utc>) -> EntitlementSummary {
        let plan = self.plan(now);
        EntitlementSummary {
            plan,
            premium_access: self.has_premium_access(now),
            trial_active: trial_is_open(&self.profile, now),
            trial_ends_at: trial_ends_at(&self.profile),
            has_used_trial: self.profile.has_used_trial,
            payment_method_on_file: self.profile.payment_method_on_file,
            contact_limit: plan.contact_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EntitlementSummary {
    pub plan: Plan,
    pub premium_access: bool,
    pub trial_active: bool,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub has_used_trial: bool,
    pub payment_method_on_file: bool,
    pub contact_limit: u32,
}
