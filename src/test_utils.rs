//! Shared fixtures for the in-crate test modules.

use hmac::{Hmac, Mac};
use migration::MigratorTrait;
use rust_decimal::Decimal;
use sea_orm::{ConnectOptions, Database};
use sha2::Sha256;

use crate::auth::Principal;
use crate::entities::ngo;
use crate::entities::user::{self, Role};
use crate::ledger::{ConfirmedCharge, Ledger, NewNgo, NewUser};

pub(crate) const WEBHOOK_SECRET: &str = "whsec-test-0123456789abcdef";

/// In-memory SQLite ledger migrated with the production migrations.
pub(crate) async fn setup_ledger() -> Ledger {
    let mut options = ConnectOptions::new("sqlite::memory:");
    // Every pooled connection would otherwise see its own empty database
    options.max_connections(1).min_connections(1).sqlx_logging(false);
    let database = Database::connect(options).await.expect("sqlite connects");
    migration::Migrator::up(&database, None)
        .await
        .expect("migrations apply");
    Ledger::new(database)
}

pub(crate) async fn seed_user(ledger: &Ledger, username: &str, role: Role) -> user::Model {
    ledger
        .create_user(NewUser {
            username: username.to_string(),
            password_hash: "$argon2id$unused".to_string(),
            role,
        })
        .await
        .expect("user seeds")
}

pub(crate) async fn seed_ngo(ledger: &Ledger, owner: i64, name: &str) -> ngo::Model {
    ledger
        .create_ngo(NewNgo {
            user_id: owner,
            name: name.to_string(),
            description: "Quality education for rural children".to_string(),
            registration_number: "EDU123456".to_string(),
            sector: "Education".to_string(),
            location: "New Delhi, India".to_string(),
            contact_email: "contact@example.org".to_string(),
            contact_phone: "+91-9876543210".to_string(),
        })
        .await
        .expect("ngo seeds")
}

pub(crate) fn principal(user: &user::Model) -> Principal {
    Principal {
        user_id: user.id,
        role: user.role,
    }
}

pub(crate) fn confirmed_charge(code: &str, donor_id: i64, ngo_id: i64, amount: Decimal) -> ConfirmedCharge {
    ConfirmedCharge {
        charge_code: code.to_string(),
        donor_id,
        ngo_id,
        amount,
        currency: "USD".to_string(),
    }
}

pub(crate) fn sign(body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(WEBHOOK_SECRET.as_bytes()).expect("any key size");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Webhook envelope in the processor's delivery format.
pub(crate) fn charge_event(event_type: &str, code: &str, metadata: serde_json::Value, amount: &str) -> Vec<u8> {
    serde_json::json!({
        "id": "delivery-1",
        "scheduled_for": "2025-03-01T10:00:00Z",
        "event": {
            "id": format!("evt-{code}"),
            "type": event_type,
            "api_version": "2018-03-22",
            "created_at": "2025-03-01T10:00:00Z",
            "data": {
                "code": code,
                "name": "NGO Donation",
                "metadata": metadata,
                "pricing": {
                    "local": { "amount": amount, "currency": "USD" },
                    "bitcoin": { "amount": "0.00087000", "currency": "BTC" }
                }
            }
        }
    })
    .to_string()
    .into_bytes()
}
