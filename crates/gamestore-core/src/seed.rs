//! # Default Ledger Contents
//!
//! The snapshot a fresh install starts from, and what `reset_all` restores.
//!
//! ```text
//! categories   Action, Adventure, RPG, Strategy, Simulation, Sports, Indie
//! catalog      10 titles with historical sale counts
//! accounts     admin / admin123   (admin, 10 000.00, owns 2 titles)
//!              demo  / demo123    (user,     500.00, owns 2 titles, used WELCOME10)
//! discounts    WELCOME10  10%  100 uses  1 per account
//!              FLASH25    25%   20 uses  1 per account  expires in 10 days
//!              BIGSPENDER 15%   50 uses  2 per account
//! ```
//!
//! Seeded wallets are backed by seeded transactions so the balance invariant
//! holds from the first commit.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::credential::Credential;
use crate::error::LedgerResult;
use crate::money::Money;
use crate::pricing::PurchaseSummary;
use crate::snapshot::Snapshot;
use crate::types::{
    Account, CatalogItem, DiscountCode, Role, Transaction, TransactionDetails, TransactionKind,
};

const CATEGORIES: [&str; 7] = [
    "Action",
    "Adventure",
    "RPG",
    "Strategy",
    "Simulation",
    "Sports",
    "Indie",
];

/// (id, title, description, category, price cents, release y/m/d, sales)
type GameRow = (&'static str, &'static str, &'static str, &'static str, i64, (i32, u32, u32), u64);

const GAMES: [GameRow; 10] = [
    ("game_mhw", "Monster Hunter Wilds",
     "Track colossal monsters across living ecosystems and forge gear from every hunt.",
     "Action", 259_000, (2025, 2, 28), 4),
    ("game_cod6", "Call of Duty: Black Ops 6",
     "Cinematic spy-thriller campaign with fast multiplayer and round-based zombies.",
     "Action", 244_100, (2024, 10, 25), 3),
    ("game_eafc25", "EA Sports FC 25",
     "Club football with licensed leagues, squad building and career modes.",
     "Sports", 112_000, (2024, 9, 27), 5),
    ("game_dyinglight", "Dying Light: The Beast",
     "Parkour through an infected valley by day and survive the hunters at night.",
     "Adventure", 209_900, (2025, 9, 18), 2),
    ("game_lnight3", "Little Nightmares III",
     "Two friends solve eerie puzzles together in a twisted miniature world.",
     "Adventure", 118_947, (2025, 10, 10), 1),
    ("game_simcity", "SimCity Skylines",
     "Zone, budget and grow a metropolis with detailed traffic and service simulation.",
     "Simulation", 79_900, (2023, 11, 10), 8),
    ("game_starfield", "Starfield",
     "Chart a course through a thousand planets, joining factions and chasing mysteries.",
     "RPG", 229_000, (2023, 9, 6), 6),
    ("game_bal", "Baldur's Gate 3",
     "A party-driven Dungeons & Dragons story with turn-based tactics and real choices.",
     "RPG", 189_900, (2023, 8, 3), 10),
    ("game_cities", "Cities in Motion",
     "Design bus, tram and metro networks that keep famous cities moving.",
     "Strategy", 65_000, (2022, 5, 11), 7),
    ("game_stardew", "Stardew Valley",
     "Restore an overgrown farm, befriend the townsfolk and settle into country life.",
     "Indie", 45_000, (2016, 2, 26), 15),
];

pub const ADMIN_ACCOUNT_ID: &str = "admin_root";
pub const DEMO_ACCOUNT_ID: &str = "user_demo";

/// The default category set.
pub fn default_categories() -> Vec<String> {
    CATEGORIES.iter().map(|c| c.to_string()).collect()
}

fn release(date: (i32, u32, u32)) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(date.0, date.1, date.2)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .unwrap_or_default()
}

fn catalog() -> Vec<CatalogItem> {
    GAMES
        .iter()
        .map(|&(id, title, description, category, cents, date, sales)| CatalogItem {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            price: Money::from_cents(cents),
            category: category.to_string(),
            release_date: release(date),
            cover_image: None,
            total_sales: sales,
        })
        .collect()
}

fn price_of(items: &[CatalogItem], id: &str) -> Money {
    items
        .iter()
        .find(|i| i.id == id)
        .map(|i| i.price)
        .unwrap_or_default()
}

fn owned(ids: &[&str]) -> BTreeSet<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

/// Builds the default snapshot as of `now`.
///
/// Fails only if hashing the seeded credentials fails.
pub fn default_snapshot(now: DateTime<Utc>) -> LedgerResult<Snapshot> {
    let catalog_items = catalog();
    let created_at = now - Duration::days(30);

    // Demo history: top-up, Stardew with WELCOME10, then FC 25 at full price.
    let stardew = PurchaseSummary::compute(price_of(&catalog_items, "game_stardew"), 10);
    let fc25 = PurchaseSummary::compute(price_of(&catalog_items, "game_eafc25"), 0);
    let demo_balance = Money::from_major_minor(500, 0);
    let demo_top_up = demo_balance + stardew.total_after_discount + fc25.total_after_discount;
    let admin_balance = Money::from_major_minor(10_000, 0);

    let transactions = vec![
        Transaction {
            id: "tx_seed_admin_topup".to_string(),
            account_id: ADMIN_ACCOUNT_ID.to_string(),
            kind: TransactionKind::TopUp,
            amount: admin_balance,
            created_at: now - Duration::days(20),
            details: None,
        },
        Transaction {
            id: "tx_seed_demo_topup".to_string(),
            account_id: DEMO_ACCOUNT_ID.to_string(),
            kind: TransactionKind::TopUp,
            amount: demo_top_up,
            created_at: now - Duration::days(15),
            details: None,
        },
        Transaction {
            id: "tx_seed_demo_stardew".to_string(),
            account_id: DEMO_ACCOUNT_ID.to_string(),
            kind: TransactionKind::Purchase,
            amount: stardew.total_after_discount,
            created_at: now - Duration::days(14),
            details: Some(TransactionDetails {
                item_ids: vec!["game_stardew".to_string()],
                discount_code: Some("WELCOME10".to_string()),
            }),
        },
        Transaction {
            id: "tx_seed_demo_fc25".to_string(),
            account_id: DEMO_ACCOUNT_ID.to_string(),
            kind: TransactionKind::Purchase,
            amount: fc25.total_after_discount,
            created_at: now - Duration::days(7),
            details: Some(TransactionDetails {
                item_ids: vec!["game_eafc25".to_string()],
                discount_code: None,
            }),
        },
    ];

    let accounts = vec![
        Account {
            id: ADMIN_ACCOUNT_ID.to_string(),
            username: "admin".to_string(),
            email: "admin@gamestore.dev".to_string(),
            role: Role::Admin,
            credential: Credential::hash("admin123")?,
            avatar_url: None,
            wallet_balance: admin_balance,
            owned_item_ids: owned(&["game_mhw", "game_cod6"]),
            redeemed_codes: Vec::new(),
            created_at,
        },
        Account {
            id: DEMO_ACCOUNT_ID.to_string(),
            username: "demo".to_string(),
            email: "demo@gamestore.dev".to_string(),
            role: Role::User,
            credential: Credential::hash("demo123")?,
            avatar_url: None,
            wallet_balance: demo_balance,
            owned_item_ids: owned(&["game_eafc25", "game_stardew"]),
            redeemed_codes: vec!["WELCOME10".to_string()],
            created_at,
        },
    ];

    let discount_codes = vec![
        DiscountCode {
            id: "discount_welcome".to_string(),
            code: "WELCOME10".to_string(),
            description: "10% off for your first purchase".to_string(),
            percentage: 10,
            max_uses: 100,
            used_count: 1,
            per_account_limit: 1,
            expires_at: None,
        },
        DiscountCode {
            id: "discount_flash".to_string(),
            code: "FLASH25".to_string(),
            description: "Limited time 25% discount for RPG titles".to_string(),
            percentage: 25,
            max_uses: 20,
            used_count: 0,
            per_account_limit: 1,
            expires_at: Some(now + Duration::days(10)),
        },
        DiscountCode {
            id: "discount_bigspend".to_string(),
            code: "BIGSPENDER".to_string(),
            description: "15% off orders above 2000฿".to_string(),
            percentage: 15,
            max_uses: 50,
            used_count: 0,
            per_account_limit: 2,
            expires_at: None,
        },
    ];

    Ok(Snapshot {
        accounts,
        catalog_items,
        discount_codes,
        transactions,
        categories: default_categories(),
    })
}
