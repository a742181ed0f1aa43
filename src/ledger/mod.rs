//! Durable store for users, NGOs, donations and withdrawals.
//!
//! Every entity kind owns its own identifier sequence. The only
//! multi-step invariant, at-most-once recording of a confirmed charge, is
//! carried by the unique `(transaction_hash, status)` index: completed
//! donations are inserted with `ON CONFLICT DO NOTHING`, so the duplicate
//! check and the insert are a single atomic statement.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, SqlErr, TransactionTrait,
};
use tracing::debug;

use crate::entities::donation::{self, DonationStatus};
use crate::entities::user::{self, Role};
use crate::entities::withdrawal::{self, WithdrawalStatus};
use crate::entities::ngo;
use crate::error::{LedgerError, LedgerResult};

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct NewNgo {
    pub user_id: i64,
    pub name: String,
    pub description: String,
    pub registration_number: String,
    pub sector: String,
    pub location: String,
    pub contact_email: String,
    pub contact_phone: String,
}

/// A donation intent reported by a client before any processor confirmation.
#[derive(Debug, Clone)]
pub struct NewDonation {
    pub donor_id: i64,
    pub ngo_id: i64,
    pub amount: Decimal,
    pub currency: String,
    pub reference: String,
}

/// A charge the payment processor has attested as confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedCharge {
    pub charge_code: String,
    pub donor_id: i64,
    pub ngo_id: i64,
    pub amount: Decimal,
    pub currency: String,
}

#[derive(Debug, Clone)]
pub struct NewWithdrawal {
    pub ngo_id: i64,
    pub amount: Decimal,
    pub purpose: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NgoBalance {
    /// Sum of completed donations
    pub received: Decimal,
    /// Sum of pending and approved withdrawals
    pub committed: Decimal,
    pub available: Decimal,
}

#[derive(Clone)]
pub struct Ledger {
    database: DatabaseConnection,
}

impl Ledger {
    pub fn new(database: DatabaseConnection) -> Self {
        Self { database }
    }

    pub async fn ping(&self) -> LedgerResult<()> {
        self.database.ping().await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    pub async fn create_user(&self, input: NewUser) -> LedgerResult<user::Model> {
        let username = input.username.clone();
        let model = user::ActiveModel {
            id: NotSet,
            username: Set(input.username),
            password_hash: Set(input.password_hash),
            role: Set(input.role),
            created_at: Set(Utc::now().fixed_offset()),
        };

        model
            .insert(&self.database)
            .await
            .map_err(|err| unique_violation(err, || format!("username {username} is already taken")))
    }

    pub async fn find_user(&self, id: i64) -> LedgerResult<Option<user::Model>> {
        Ok(user::Entity::find_by_id(id).one(&self.database).await?)
    }

    pub async fn find_user_by_username(&self, username: &str) -> LedgerResult<Option<user::Model>> {
        let found = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.database)
            .await?;
        Ok(found)
    }

    // ------------------------------------------------------------------
    // NGOs
    // ------------------------------------------------------------------

    pub async fn create_ngo(&self, input: NewNgo) -> LedgerResult<ngo::Model> {
        let owner = input.user_id;
        let model = ngo::ActiveModel {
            id: NotSet,
            user_id: Set(input.user_id),
            name: Set(input.name),
            description: Set(input.description),
            registration_number: Set(input.registration_number),
            sector: Set(input.sector),
            location: Set(input.location),
            contact_email: Set(input.contact_email),
            contact_phone: Set(input.contact_phone),
            impact_score: Set(Decimal::ZERO),
            created_at: Set(Utc::now().fixed_offset()),
        };

        model
            .insert(&self.database)
            .await
            .map_err(|err| unique_violation(err, || format!("user {owner} already owns an NGO")))
    }

    pub async fn find_ngo(&self, id: i64) -> LedgerResult<Option<ngo::Model>> {
        Ok(ngo::Entity::find_by_id(id).one(&self.database).await?)
    }

    pub async fn require_ngo(&self, id: i64) -> LedgerResult<ngo::Model> {
        self.find_ngo(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("NGO", id))
    }

    pub async fn find_ngo_by_owner(&self, user_id: i64) -> LedgerResult<Option<ngo::Model>> {
        let found = ngo::Entity::find()
            .filter(ngo::Column::UserId.eq(user_id))
            .one(&self.database)
            .await?;
        Ok(found)
    }

    pub async fn list_ngos(&self) -> LedgerResult<Vec<ngo::Model>> {
        let ngos = ngo::Entity::find()
            .order_by_asc(ngo::Column::Id)
            .all(&self.database)
            .await?;
        Ok(ngos)
    }

    // ------------------------------------------------------------------
    // Donations
    // ------------------------------------------------------------------

    pub async fn create_pending_donation(&self, input: NewDonation) -> LedgerResult<donation::Model> {
        let reference = input.reference.clone();
        let model = donation::ActiveModel {
            id: NotSet,
            donor_id: Set(input.donor_id),
            ngo_id: Set(input.ngo_id),
            amount: Set(input.amount),
            currency: Set(input.currency),
            transaction_hash: Set(input.reference),
            status: Set(DonationStatus::Pending),
            created_at: Set(Utc::now().fixed_offset()),
        };

        model.insert(&self.database).await.map_err(|err| {
            unique_violation(err, || format!("reference {reference} is already recorded as pending"))
        })
    }

    /// Records a confirmed charge as a completed donation.
    ///
    /// Returns `None` when a completed donation already exists for the
    /// charge code; the existing row is left untouched.
    pub async fn record_completed_donation(
        &self,
        charge: &ConfirmedCharge,
    ) -> LedgerResult<Option<donation::Model>> {
        assert!(
            !charge.charge_code.is_empty(),
            "Charge code must be present before recording"
        );

        let model = donation::ActiveModel {
            id: NotSet,
            donor_id: Set(charge.donor_id),
            ngo_id: Set(charge.ngo_id),
            amount: Set(charge.amount),
            currency: Set(charge.currency.clone()),
            transaction_hash: Set(charge.charge_code.clone()),
            status: Set(DonationStatus::Completed),
            created_at: Set(Utc::now().fixed_offset()),
        };

        let inserted = donation::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([donation::Column::TransactionHash, donation::Column::Status])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.database)
            .await?;

        if inserted == 0 {
            debug!(charge_code = %charge.charge_code, "completed donation already present");
            return Ok(None);
        }

        let stored = self
            .find_completed_donation(&charge.charge_code)
            .await?
            .ok_or_else(|| {
                LedgerError::Internal(format!(
                    "donation for charge {} vanished after insert",
                    charge.charge_code
                ))
            })?;
        Ok(Some(stored))
    }

    pub async fn find_completed_donation(
        &self,
        charge_code: &str,
    ) -> LedgerResult<Option<donation::Model>> {
        let found = donation::Entity::find()
            .filter(donation::Column::TransactionHash.eq(charge_code))
            .filter(donation::Column::Status.eq(DonationStatus::Completed))
            .one(&self.database)
            .await?;
        Ok(found)
    }

    pub async fn donations_by_ngo(&self, ngo_id: i64) -> LedgerResult<Vec<donation::Model>> {
        let donations = donation::Entity::find()
            .filter(donation::Column::NgoId.eq(ngo_id))
            .order_by_desc(donation::Column::CreatedAt)
            .order_by_desc(donation::Column::Id)
            .all(&self.database)
            .await?;
        Ok(donations)
    }

    pub async fn donations_by_donor(&self, donor_id: i64) -> LedgerResult<Vec<donation::Model>> {
        let donations = donation::Entity::find()
            .filter(donation::Column::DonorId.eq(donor_id))
            .order_by_desc(donation::Column::CreatedAt)
            .order_by_desc(donation::Column::Id)
            .all(&self.database)
            .await?;
        Ok(donations)
    }

    // ------------------------------------------------------------------
    // Withdrawals
    // ------------------------------------------------------------------

    pub async fn create_withdrawal(&self, input: NewWithdrawal) -> LedgerResult<withdrawal::Model> {
        insert_withdrawal(&self.database, input).await
    }

    /// Creates a pending withdrawal only if the NGO's available balance
    /// covers it.
    ///
    /// The NGO row is locked before the balance is read, so concurrent
    /// requests for the same NGO are checked one after another.
    pub async fn create_withdrawal_within_balance(
        &self,
        input: NewWithdrawal,
    ) -> LedgerResult<withdrawal::Model> {
        let txn = self.database.begin().await?;
        ngo::Entity::find_by_id(input.ngo_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| LedgerError::not_found("NGO", input.ngo_id))?;

        let balance = balance_of(&txn, input.ngo_id).await?;
        if input.amount > balance.available {
            txn.rollback().await?;
            return Err(LedgerError::InsufficientFunds {
                requested: input.amount.to_string(),
                available: balance.available.to_string(),
            });
        }
        let created = insert_withdrawal(&txn, input).await?;
        txn.commit().await?;
        Ok(created)
    }

    pub async fn withdrawals_by_ngo(&self, ngo_id: i64) -> LedgerResult<Vec<withdrawal::Model>> {
        let withdrawals = withdrawal::Entity::find()
            .filter(withdrawal::Column::NgoId.eq(ngo_id))
            .order_by_desc(withdrawal::Column::CreatedAt)
            .order_by_desc(withdrawal::Column::Id)
            .all(&self.database)
            .await?;
        Ok(withdrawals)
    }

    pub async fn balance(&self, ngo_id: i64) -> LedgerResult<NgoBalance> {
        balance_of(&self.database, ngo_id).await
    }
}

async fn insert_withdrawal<C: ConnectionTrait>(
    conn: &C,
    input: NewWithdrawal,
) -> LedgerResult<withdrawal::Model> {
    let model = withdrawal::ActiveModel {
        id: NotSet,
        ngo_id: Set(input.ngo_id),
        amount: Set(input.amount),
        purpose: Set(input.purpose),
        status: Set(WithdrawalStatus::Pending),
        created_at: Set(Utc::now().fixed_offset()),
    };
    Ok(model.insert(conn).await?)
}

async fn balance_of<C: ConnectionTrait>(conn: &C, ngo_id: i64) -> LedgerResult<NgoBalance> {
    let received = donation::Entity::find()
        .filter(donation::Column::NgoId.eq(ngo_id))
        .filter(donation::Column::Status.eq(DonationStatus::Completed))
        .all(conn)
        .await?
        .iter()
        .map(|d| d.amount)
        .sum::<Decimal>();

    let committed = withdrawal::Entity::find()
        .filter(withdrawal::Column::NgoId.eq(ngo_id))
        .filter(withdrawal::Column::Status.ne(WithdrawalStatus::Rejected))
        .all(conn)
        .await?
        .iter()
        .map(|w| w.amount)
        .sum::<Decimal>();

    Ok(NgoBalance {
        received,
        committed,
        available: received - committed,
    })
}

fn unique_violation(err: DbErr, message: impl FnOnce() -> String) -> LedgerError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => LedgerError::Conflict(message()),
        _ => LedgerError::Database(err),
    }
}
