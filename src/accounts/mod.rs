//! Account registry.
//!
//! Links brand and creator records to processor connect accounts, and runs
//! the bulk cleanup passes over the processor's paginated account listing.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;

use crate::clients::{AccountKind, ConnectProfile, PaymentProcessor};
use crate::errors::AppError;
use crate::models::{
    AccountLinkUpdate, CleanupCandidate, CleanupFailure, CleanupReport,
};
use crate::store::AccountStore;

pub struct AccountRegistry {
    store: AccountStore,
    payments: Arc<dyn PaymentProcessor>,
    /// Pause between successive external deletions, to stay under the
    /// processor's rate limits.
    cleanup_pace: Duration,
    cleanup_page_size: u32,
}

/// Result of connecting a record to the processor.
#[derive(Debug, Clone)]
pub struct ConnectedAccount {
    pub account_id: String,
    pub onboarding_url: Option<String>,
}

impl AccountRegistry {
    pub fn new(
        store: AccountStore,
        payments: Arc<dyn PaymentProcessor>,
        cleanup_pace: Duration,
        cleanup_page_size: u32,
    ) -> Self {
        Self {
            store,
            payments,
            cleanup_pace,
            cleanup_page_size,
        }
    }

    pub fn store(&self) -> &AccountStore {
        &self.store
    }

    /// Open a connect account and link it locally. Omitted email targets the
    /// brand record; otherwise the creator with that email (created on first
    /// contact).
    pub async fn connect(
        &self,
        email: Option<&str>,
        name: Option<&str>,
        refresh_url: &str,
        return_url: &str,
    ) -> Result<ConnectedAccount, AppError> {
        let profile = match email {
            None => {
                let brand = self.store.brand().await?;
                ConnectProfile {
                    email: brand.email,
                    name: Some(brand.name),
                    kind: AccountKind::Brand,
                }
            }
            Some(email) => ConnectProfile {
                email: email.to_string(),
                name: name.map(|n| n.to_string()),
                kind: AccountKind::Creator,
            },
        };

        let account = self.payments.create_connect_account(&profile).await?;
        let account_id = account["id"]
            .as_str()
            .ok_or_else(|| AppError::Upstream {
                service: "payments",
                kind: crate::errors::UpstreamKind::Transport,
                message: "Account creation returned no id".into(),
            })?
            .to_string();

        let update = AccountLinkUpdate::connected(account_id.clone());
        match email {
            None => {
                self.store.apply_brand(&update).await?;
            }
            Some(email) => {
                self.store.apply_creator(email, name, &update).await?;
            }
        }

        let link = self
            .payments
            .create_account_link(&account_id, refresh_url, return_url)
            .await?;
        let onboarding_url = link["url"].as_str().map(|s| s.to_string());

        tracing::info!("Connected account {} for {:?}", account_id, profile.kind);
        Ok(ConnectedAccount {
            account_id,
            onboarding_url,
        })
    }

    /// The processor-side account for a local record, or the bare disconnect
    /// audit when the record has no linked account.
    pub async fn account_view(&self, email: Option<&str>) -> Result<Value, AppError> {
        let (account_id, disconnected_by, disconnected_on) = match email {
            None => {
                let brand = self.store.brand().await?;
                (brand.account_id, brand.disconnected_by, brand.disconnected_on)
            }
            Some(email) => {
                let creator = self.store.find_creator(email).await?.ok_or_else(|| {
                    AppError::NotFound(format!("No account record for {}", email))
                })?;
                (
                    creator.account_id,
                    creator.disconnected_by,
                    creator.disconnected_on,
                )
            }
        };

        let Some(account_id) = account_id else {
            return Ok(serde_json::json!({
                "account": {
                    "disconnectedBy": disconnected_by,
                    "disconnectedOn": disconnected_on,
                }
            }));
        };

        let account = self.payments.get_account(&account_id).await?;
        Ok(serde_json::json!({ "account": account }))
    }

    /// Delete one connected account and unlink whichever local record held it.
    pub async fn disconnect(&self, account_id: &str, actor: &str) -> Result<Value, AppError> {
        let deleted = self.payments.delete_account(account_id).await?;
        self.unlink_local(account_id, actor).await?;
        Ok(deleted)
    }

    async fn unlink_local(&self, account_id: &str, actor: &str) -> Result<(), AppError> {
        let update =
            AccountLinkUpdate::disconnected(actor.to_string(), Utc::now().to_rfc3339());
        let touched = self.store.unlink_by_account_id(account_id, &update).await?;
        if !touched {
            tracing::debug!("No local record held account {}", account_id);
        }
        Ok(())
    }

    /// Delete every connected account the processor lists.
    pub async fn cleanup_all(&self, actor: &str) -> Result<CleanupReport, AppError> {
        self.cleanup_matching(actor, |_| true).await
    }

    /// Delete connected accounts whose email ends with `domain`.
    pub async fn cleanup_by_domain(
        &self,
        domain: &str,
        actor: &str,
    ) -> Result<CleanupReport, AppError> {
        let domain = domain.to_ascii_lowercase();
        self.cleanup_matching(actor, move |email| {
            email.is_some_and(|e| e.to_ascii_lowercase().ends_with(&domain))
        })
        .await
    }

    /// Walk the processor's paginated listing and delete matching accounts
    /// one at a time, pacing between deletions. Per-account failures are
    /// accumulated and never abort the remaining items; the local unlink is
    /// applied only for deletions the processor confirmed.
    async fn cleanup_matching<F>(&self, actor: &str, matches: F) -> Result<CleanupReport, AppError>
    where
        F: Fn(Option<&str>) -> bool + Send,
    {
        let mut report = CleanupReport::default();
        let mut cursor: Option<String> = None;
        let mut first_deletion = true;

        loop {
            let page = self
                .payments
                .list_accounts(self.cleanup_page_size, cursor.as_deref())
                .await?;
            let last_id = page.accounts.last().map(|a| a.id.clone());

            for account in page.accounts {
                if !matches(account.email.as_deref()) {
                    continue;
                }

                if !first_deletion {
                    tokio::time::sleep(self.cleanup_pace).await;
                }
                first_deletion = false;

                match self.payments.delete_account(&account.id).await {
                    Ok(_) => {
                        if let Err(e) = self.unlink_local(&account.id, actor).await {
                            tracing::warn!(
                                "Deleted account {} but failed to unlink locally: {}",
                                account.id,
                                e
                            );
                        }
                        report.deleted.push(CleanupCandidate {
                            account_id: account.id,
                            email: account.email,
                        });
                    }
                    Err(e) => {
                        tracing::warn!("Failed to delete account {}: {}", account.id, e);
                        report.failed.push(CleanupFailure {
                            account_id: account.id,
                            error: e.message(),
                        });
                    }
                }
            }

            if !page.has_more {
                break;
            }
            match last_id {
                Some(id) => cursor = Some(id),
                None => break,
            }
        }

        tracing::info!(
            "Cleanup finished: {} deleted, {} failed",
            report.deleted.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Listing pass with no deletions: what a cleanup run would look at.
    pub async fn cleanup_summary(
        &self,
        limit: u32,
        starting_after: Option<&str>,
    ) -> Result<Value, AppError> {
        let page = self.payments.list_accounts(limit, starting_after).await?;
        let accounts: Vec<Value> = page
            .accounts
            .iter()
            .map(|a| serde_json::json!({ "accountId": a.id, "email": a.email }))
            .collect();
        Ok(serde_json::json!({
            "accounts": accounts,
            "hasMore": page.has_more,
        }))
    }
}
