#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use resq_backend::accounts::{Profile, ProfileStore};
use resq_backend::alerts::{AlertStore, EmergencyAlert, NewAlert};
use resq_backend::billing::{
    BillingProvider, ProviderLineItem, ProviderSubscription, Subscription, SubscriptionStore,
    SubscriptionUpsert, UsageReporter,
};
use resq_backend::contacts::{
    Contact, ContactInsertOutcome, ContactStore, ContactUpdateOutcome, NewContact,
};
use resq_backend::db::Stores;
use resq_backend::entitlements::Plan;
use resq_backend::notifications::{BulkSmsReport, BulkSmsSender, NotificationSender};

#[derive(Default)]
struct MemoryState {
    profiles: HashMap<i32, Profile>,
    subscriptions: Vec<Subscription>,
    contacts: Vec<Contact>,
    alerts: Vec<EmergencyAlert>,
    next_contact_id: i64,
    next_alert_id: i64,
    injected_conflicts: u32,
}

/// In-memory implementation of every store seam. Each call holds the lock for
/// its whole duration, so per-owner operations are atomic.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn stores(self: &Arc<Self>) -> Stores {
        Stores::from_store(self.clone())
    }

    pub fn insert_profile(&self, profile: Profile) {
        self.state
            .lock()
            .unwrap()
            .profiles
            .insert(profile.user_id, profile);
    }

    pub fn profile(&self, user_id: i32) -> Profile {
        self.state.lock().unwrap().profiles[&user_id].clone()
    }

    pub fn insert_subscription(&self, subscription: Subscription) {
        self.state.lock().unwrap().subscriptions.push(subscription);
    }

    pub fn replace_subscriptions(&self, subscriptions: Vec<Subscription>) {
        self.state.lock().unwrap().subscriptions = subscriptions;
    }

    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.state.lock().unwrap().subscriptions.clone()
    }

    pub fn alerts(&self, user_id: i32) -> Vec<EmergencyAlert> {
        self.state
            .lock()
            .unwrap()
            .alerts
            .iter()
            .filter(|alert| alert.user_id == user_id)
            .cloned()
            .collect()
    }

    /// The next `count` profile writes lose the version race.
    pub fn inject_conflicts(&self, count: u32) {
        self.state.lock().unwrap().injected_conflicts = count;
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn profile_for_user(&self, user_id: i32) -> sqlx::Result<Option<Profile>> {
        Ok(self.state.lock().unwrap().profiles.get(&user_id).cloned())
    }

    async fn profile_by_token(&self, token: Uuid) -> sqlx::Result<Option<Profile>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .profiles
            .values()
            .find(|profile| profile.public_token == token)
            .cloned())
    }

    async fn profile_by_customer_ref(&self, customer_ref: &str) -> sqlx::Result<Option<Profile>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .profiles
            .values()
            .find(|profile| profile.external_customer_ref.as_deref() == Some(customer_ref))
            .cloned())
    }

    async fn update_profile(&self, profile: &Profile) -> sqlx::Result<bool> {
        let mut state = self.state.lock().unwrap();
        let conflict = state.injected_conflicts > 0;
        if conflict {
            state.injected_conflicts -= 1;
        }
        let Some(stored) = state.profiles.get_mut(&profile.user_id) else {
            return Ok(false);
        };
        if conflict {
            stored.version += 1;
            return Ok(false);
        }
        if stored.version != profile.version {
            return Ok(false);
        }
        let has_used_trial = stored.has_used_trial || profile.has_used_trial;
        let public_token = stored.public_token;
        *stored = profile.clone();
        stored.has_used_trial = has_used_trial;
        stored.public_token = public_token;
        stored.version += 1;
        Ok(true)
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn active_subscription(&self, user_id: i32) -> sqlx::Result<Option<Subscription>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .subscriptions
            .iter()
            .filter(|sub| sub.user_id == Some(user_id) && sub.is_active())
            .max_by_key(|sub| sub.updated_at)
            .cloned())
    }

    async fn upsert_subscription(&self, input: &SubscriptionUpsert) -> sqlx::Result<Subscription> {
        let mut state = self.state.lock().unwrap();
        let now = Utc::now();
        if let Some(existing) = state
            .subscriptions
            .iter_mut()
            .find(|sub| sub.external_customer_ref == input.external_customer_ref)
        {
            existing.user_id = Some(input.user_id);
            if input.contact_email.is_some() {
                existing.contact_email = input.contact_email.clone();
            }
            existing.external_subscription_ref = input.external_subscription_ref.clone();
            existing.plan = input.plan;
            existing.status = input.status.clone();
            existing.licensed_line_item_ref = input.licensed_line_item_ref.clone();
            existing.metered_line_item_ref = input.metered_line_item_ref.clone();
            existing.updated_at = now;
            return Ok(existing.clone());
        }
        let subscription = Subscription {
            id: Uuid::new_v4(),
            user_id: Some(input.user_id),
            contact_email: input.contact_email.clone(),
            external_customer_ref: input.external_customer_ref.clone(),
            external_subscription_ref: input.external_subscription_ref.clone(),
            plan: input.plan,
            status: input.status.clone(),
            licensed_line_item_ref: input.licensed_line_item_ref.clone(),
            metered_line_item_ref: input.metered_line_item_ref.clone(),
            created_at: now,
            updated_at: now,
        };
        state.subscriptions.push(subscription.clone());
        Ok(subscription)
    }
}

#[async_trait]
impl ContactStore for MemoryStore {
    async fn list_contacts(&self, user_id: i32) -> sqlx::Result<Vec<Contact>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .contacts
            .iter()
            .filter(|contact| contact.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn count_contacts(&self, user_id: i32) -> sqlx::Result<i64> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .contacts
            .iter()
            .filter(|contact| contact.user_id == user_id)
            .count() as i64)
    }

    async fn insert_within_limit(
        &self,
        user_id: i32,
        contact: &NewContact,
        limit: u32,
    ) -> sqlx::Result<ContactInsertOutcome> {
        let mut state = self.state.lock().unwrap();
        let owned: Vec<&Contact> = state
            .contacts
            .iter()
            .filter(|existing| existing.user_id == user_id)
            .collect();
        if owned
            .iter()
            .any(|existing| existing.phone_number == contact.phone_number)
        {
            return Ok(ContactInsertOutcome::Duplicate);
        }
        let existing = owned.len() as i64;
        if existing >= i64::from(limit) {
            return Ok(ContactInsertOutcome::LimitReached { existing });
        }
        state.next_contact_id += 1;
        let stored = Contact {
            id: state.next_contact_id,
            user_id,
            name: contact.name.clone(),
            phone_number: contact.phone_number.clone(),
            relationship: contact.relationship.clone(),
        };
        state.contacts.push(stored.clone());
        Ok(ContactInsertOutcome::Inserted(stored))
    }

    async fn update_contact(
        &self,
        user_id: i32,
        contact_id: i64,
        contact: &NewContact,
    ) -> sqlx::Result<ContactUpdateOutcome> {
        let mut state = self.state.lock().unwrap();
        let duplicate = state.contacts.iter().any(|existing| {
            existing.user_id == user_id
                && existing.id != contact_id
                && existing.phone_number == contact.phone_number
        });
        let Some(stored) = state
            .contacts
            .iter_mut()
            .find(|existing| existing.id == contact_id && existing.user_id == user_id)
        else {
            return Ok(ContactUpdateOutcome::NotFound);
        };
        if duplicate {
            return Ok(ContactUpdateOutcome::Duplicate);
        }
        stored.name = contact.name.clone();
        stored.phone_number = contact.phone_number.clone();
        stored.relationship = contact.relationship.clone();
        Ok(ContactUpdateOutcome::Updated(stored.clone()))
    }

    async fn delete_contact(&self, user_id: i32, contact_id: i64) -> sqlx::Result<bool> {
        let mut state = self.state.lock().unwrap();
        let before = state.contacts.len();
        state
            .contacts
            .retain(|contact| !(contact.id == contact_id && contact.user_id == user_id));
        Ok(state.contacts.len() != before)
    }
}

#[async_trait]
impl AlertStore for MemoryStore {
    async fn insert_alert(&self, alert: &NewAlert) -> sqlx::Result<EmergencyAlert> {
        let mut state = self.state.lock().unwrap();
        state.next_alert_id += 1;
        let stored = EmergencyAlert {
            id: state.next_alert_id,
            user_id: alert.user_id,
            created_at: Utc::now(),
            message: alert.message.clone(),
            location: alert.location.clone(),
            is_test: alert.is_test,
        };
        state.alerts.push(stored.clone());
        Ok(stored)
    }

    async fn count_real_alerts_excluding(&self, user_id: i32, alert_id: i64) -> sqlx::Result<i64> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .alerts
            .iter()
            .filter(|alert| alert.user_id == user_id && !alert.is_test && alert.id != alert_id)
            .count() as i64)
    }
}

/// Records every per-contact send; numbers in `failing` error out.
#[derive(Default)]
pub struct RecordingNotifier {
    pub failing: HashSet<String>,
    pub sent: Mutex<Vec<(i64, String)>>,
}

impl RecordingNotifier {
    pub fn failing_for(numbers: &[&str]) -> Self {
        Self {
            failing: numbers.iter().map(|number| number.to_string()).collect(),
            sent: Mutex::default(),
        }
    }

    pub fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSender for RecordingNotifier {
    async fn send(&self, contact: &Contact, _from_user_id: i32, message: &str) -> Result<()> {
        if self.failing.contains(&contact.phone_number) {
            return Err(anyhow!("delivery to {} failed", contact.phone_number));
        }
        self.sent
            .lock()
            .unwrap()
            .push((contact.id, message.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingBulkSms {
    pub fail: bool,
    pub calls: Mutex<Vec<(i32, usize, String)>>,
}

impl RecordingBulkSms {
    pub fn calls(&self) -> Vec<(i32, usize, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BulkSmsSender for RecordingBulkSms {
    async fn send_to_all(
        &self,
        user_id: i32,
        contacts: &[Contact],
        message: &str,
    ) -> Result<BulkSmsReport> {
        self.calls
            .lock()
            .unwrap()
            .push((user_id, contacts.len(), message.to_string()));
        if self.fail {
            return Err(anyhow!("gateway unavailable"));
        }
        Ok(BulkSmsReport {
            sent: contacts.len() as u32,
            ..BulkSmsReport::default()
        })
    }
}

#[derive(Default)]
pub struct RecordingUsage {
    pub fail: bool,
    pub reports: Mutex<Vec<(i32, u32)>>,
}

impl RecordingUsage {
    pub fn reports(&self) -> Vec<(i32, u32)> {
        self.reports.lock().unwrap().clone()
    }
}

#[async_trait]
impl UsageReporter for RecordingUsage {
    async fn report_usage(&self, user_id: i32, quantity: u32) -> Result<()> {
        self.reports.lock().unwrap().push((user_id, quantity));
        if self.fail {
            return Err(anyhow!("provider down"));
        }
        Ok(())
    }
}

/// Payment provider answering from canned subscriptions.
#[derive(Default)]
pub struct FakeBillingProvider {
    pub subscriptions: HashMap<String, ProviderSubscription>,
    pub email: Option<String>,
    pub fail_email: bool,
    pub usage: Mutex<Vec<(String, u32)>>,
}

impl FakeBillingProvider {
    pub fn with_subscription(subscription: ProviderSubscription) -> Self {
        let mut subscriptions = HashMap::new();
        subscriptions.insert(subscription.id.clone(), subscription);
        Self {
            subscriptions,
            email: Some("owner@example.com".into()),
            ..Self::default()
        }
    }
}

#[async_trait]
impl BillingProvider for FakeBillingProvider {
    async fn fetch_subscription(&self, subscription_ref: &str) -> Result<ProviderSubscription> {
        self.subscriptions
            .get(subscription_ref)
            .cloned()
            .ok_or_else(|| anyhow!("no such subscription {subscription_ref}"))
    }

    async fn fetch_customer_email(&self, _customer_ref: &str) -> Result<Option<String>> {
        if self.fail_email {
            return Err(anyhow!("customer lookup failed"));
        }
        Ok(self.email.clone())
    }

    async fn report_usage(
        &self,
        line_item_ref: &str,
        quantity: u32,
        _timestamp: DateTime<Utc>,
    ) -> Result<()> {
        self.usage
            .lock()
            .unwrap()
            .push((line_item_ref.to_string(), quantity));
        Ok(())
    }
}

pub fn line_item(id: &str, price_id: &str) -> ProviderLineItem {
    ProviderLineItem {
        id: id.into(),
        price_id: price_id.into(),
    }
}

pub fn active_subscription(user_id: i32, plan: Plan) -> Subscription {
    let now = Utc::now();
    Subscription {
        id: Uuid::new_v4(),
        user_id: Some(user_id),
        contact_email: None,
        external_customer_ref: format!("cus_{user_id}"),
        external_subscription_ref: format!("sub_{user_id}"),
        plan,
        status: "active".into(),
        licensed_line_item_ref: "si_licensed".into(),
        metered_line_item_ref: Some("si_metered".into()),
        created_at: now,
        updated_at: now,
    }
}

/// Profile whose trial started `hours_ago` hours ago.
pub fn trial_profile(user_id: i32, hours_ago: i64) -> Profile {
    let mut profile = Profile::new(user_id);
    profile.trial_started_at = Some(Utc::now() - Duration::hours(hours_ago));
    profile.has_used_trial = true;
    profile
}

pub fn new_contact(name: &str, phone: &str) -> NewContact {
    NewContact {
        name: name.into(),
        phone_number: phone.into(),
        relationship: None,
    }
}
