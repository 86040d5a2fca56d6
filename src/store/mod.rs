//! Flat-file persistence for the contract and account collections.
//!
//! Each collection is a single JSON document, read in full and rewritten in
//! full on every mutation. Writes go through a temp file and rename so a crash
//! never leaves a truncated collection, and every read-modify-write cycle runs
//! under the store's mutex so concurrent writers serialize instead of racing.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::errors::AppError;
use crate::models::{AccountLinkUpdate, BrandAccount, Contract, CreatorAccount};

/// On-disk shape of the contracts collection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractsFile {
    pub contracts: Vec<Contract>,
}

/// On-disk shape of the accounts collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountsFile {
    pub brands: Vec<BrandAccount>,
    pub creators: Vec<CreatorAccount>,
}

impl Default for AccountsFile {
    fn default() -> Self {
        Self {
            // The brand record is a singleton; the deployment fills it in.
            brands: vec![BrandAccount {
                name: String::new(),
                email: String::new(),
                account_id: None,
                disconnected_by: None,
                disconnected_on: None,
            }],
            creators: Vec::new(),
        }
    }
}

/// Read and parse a whole collection. A missing or malformed file is a
/// `Storage` error; callers never see an undefined collection.
async fn load_collection<T: DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        AppError::Storage(format!("Cannot read collection {}: {}", path.display(), e))
    })?;
    serde_json::from_slice(&bytes).map_err(|e| {
        AppError::Storage(format!(
            "Malformed collection {}: {}",
            path.display(),
            e
        ))
    })
}

/// Serialize and overwrite a whole collection atomically (temp file + rename).
async fn save_collection<T: Serialize>(path: &Path, collection: &T) -> Result<(), AppError> {
    let json = serde_json::to_vec_pretty(collection)
        .map_err(|e| AppError::Storage(format!("Cannot serialize collection: {}", e)))?;

    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, &json).await.map_err(|e| {
        AppError::Storage(format!("Cannot write collection {}: {}", tmp.display(), e))
    })?;
    tokio::fs::rename(&tmp, path).await.map_err(|e| {
        AppError::Storage(format!(
            "Cannot replace collection {}: {}",
            path.display(),
            e
        ))
    })
}

/// Write an empty collection if the file does not exist yet. After startup a
/// missing file is treated as an error, not as empty data.
async fn seed_collection<T: Serialize + Default>(path: &Path) -> Result<(), AppError> {
    if tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }
    save_collection(path, &T::default()).await
}

/// Store for the contracts collection, keyed by participant id.
pub struct ContractStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ContractStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// Create an empty collection on first boot.
    pub async fn init(&self) -> Result<(), AppError> {
        seed_collection::<ContractsFile>(&self.path).await
    }

    pub async fn load(&self) -> Result<ContractsFile, AppError> {
        load_collection(&self.path).await
    }

    /// Zero or one contract for the participant.
    pub async fn find(&self, participant_id: i64) -> Result<Option<Contract>, AppError> {
        let file = self.load().await?;
        Ok(file
            .contracts
            .into_iter()
            .find(|c| c.participant_id == participant_id))
    }

    /// Replace any existing record for the same participant, insert otherwise.
    pub async fn upsert(&self, contract: Contract) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;
        let mut file = self.load().await?;
        file.contracts
            .retain(|c| c.participant_id != contract.participant_id);
        file.contracts.push(contract);
        save_collection(&self.path, &file).await
    }

    /// Merge changes onto the record matching `participant_id` under the
    /// write lock. `apply` runs against the current record and may reject the
    /// change; no contract for the key is `NotFound`.
    pub async fn update<F>(&self, participant_id: i64, apply: F) -> Result<Contract, AppError>
    where
        F: FnOnce(&mut Contract) -> Result<(), AppError> + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut file = self.load().await?;
        let contract = file
            .contracts
            .iter_mut()
            .find(|c| c.participant_id == participant_id)
            .ok_or_else(|| {
                AppError::NotFound(format!("No contract for participant {}", participant_id))
            })?;
        apply(contract)?;
        let updated = contract.clone();
        save_collection(&self.path, &file).await?;
        Ok(updated)
    }
}

/// Store for the accounts collection: one brand record plus creators keyed
/// by email.
pub struct AccountStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl AccountStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// Seed the collection (including the singleton brand record) on first boot.
    pub async fn init(&self) -> Result<(), AppError> {
        seed_collection::<AccountsFile>(&self.path).await
    }

    pub async fn load(&self) -> Result<AccountsFile, AppError> {
        load_collection(&self.path).await
    }

    /// The singleton brand record.
    pub async fn brand(&self) -> Result<BrandAccount, AppError> {
        let file = self.load().await?;
        file.brands
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Storage("Accounts collection has no brand record".into()))
    }

    pub async fn find_creator(&self, email: &str) -> Result<Option<CreatorAccount>, AppError> {
        let file = self.load().await?;
        Ok(file.creators.into_iter().find(|c| c.email == email))
    }

    /// Apply a link/unlink update to the brand record.
    pub async fn apply_brand(&self, update: &AccountLinkUpdate) -> Result<BrandAccount, AppError> {
        let _guard = self.write_lock.lock().await;
        let mut file = self.load().await?;
        let brand = file
            .brands
            .first_mut()
            .ok_or_else(|| AppError::Storage("Accounts collection has no brand record".into()))?;
        brand.account_id = update.account_id.clone();
        brand.disconnected_by = update.disconnected_by.clone();
        brand.disconnected_on = update.disconnected_on.clone();
        let updated = brand.clone();
        save_collection(&self.path, &file).await?;
        Ok(updated)
    }

    /// Apply a link/unlink update to the creator with `email`, inserting the
    /// record on first contact.
    pub async fn apply_creator(
        &self,
        email: &str,
        name: Option<&str>,
        update: &AccountLinkUpdate,
    ) -> Result<CreatorAccount, AppError> {
        let _guard = self.write_lock.lock().await;
        let mut file = self.load().await?;

        let updated = match file.creators.iter_mut().find(|c| c.email == email) {
            Some(creator) => {
                if let Some(name) = name {
                    creator.name = Some(name.to_string());
                }
                creator.account_id = update.account_id.clone();
                creator.disconnected_by = update.disconnected_by.clone();
                creator.disconnected_on = update.disconnected_on.clone();
                creator.clone()
            }
            None => {
                let creator = CreatorAccount {
                    id: uuid::Uuid::new_v4().to_string(),
                    name: name.map(|n| n.to_string()),
                    email: email.to_string(),
                    account_id: update.account_id.clone(),
                    disconnected_by: update.disconnected_by.clone(),
                    disconnected_on: update.disconnected_on.clone(),
                };
                file.creators.push(creator.clone());
                creator
            }
        };

        save_collection(&self.path, &file).await?;
        Ok(updated)
    }

    /// Unlink whichever local record (brand or creator) carries the processor
    /// account id. Records that only exist remotely are left alone.
    pub async fn unlink_by_account_id(
        &self,
        account_id: &str,
        update: &AccountLinkUpdate,
    ) -> Result<bool, AppError> {
        let _guard = self.write_lock.lock().await;
        let mut file = self.load().await?;

        let mut touched = false;
        if let Some(brand) = file
            .brands
            .iter_mut()
            .find(|b| b.account_id.as_deref() == Some(account_id))
        {
            brand.account_id = update.account_id.clone();
            brand.disconnected_by = update.disconnected_by.clone();
            brand.disconnected_on = update.disconnected_on.clone();
            touched = true;
        } else if let Some(creator) = file
            .creators
            .iter_mut()
            .find(|c| c.account_id.as_deref() == Some(account_id))
        {
            creator.account_id = update.account_id.clone();
            creator.disconnected_by = update.disconnected_by.clone();
            creator.disconnected_on = update.disconnected_on.clone();
            touched = true;
        }

        if touched {
            save_collection(&self.path, &file).await?;
        }
        Ok(touched)
    }
}
