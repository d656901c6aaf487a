//! # Seed Data Generator
//!
//! Populates the database with development data: categories, products, a
//! customer, a supplier, one received purchase order and one demo sale, so
//! every coordinator path has rows to show.
//!
//! ## Usage
//! ```bash
//! # Default: 60 products into ./shopledger_dev.db
//! cargo run -p shopledger-db --bin seed
//!
//! # Custom amount and path
//! cargo run -p shopledger-db --bin seed -- --count 200 --db ./data/shop.db
//! ```

use chrono::Utc;
use std::env;

use shopledger_core::{
    Category, Customer, NewPurchaseOrder, NewPurchaseOrderLine, NewSale, Product, ReceiptLine,
    SaleLine, Supplier,
};
use shopledger_db::repository::catalog::{generate_category_id, generate_product_id};
use shopledger_db::repository::customer::generate_customer_id;
use shopledger_db::repository::supplier::generate_supplier_id;
use shopledger_db::{Database, DbConfig};

/// Product categories with representative names.
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Electronics",
        &[
            "Laptop",
            "Mouse",
            "Keyboard",
            "Monitor",
            "USB-C Cable",
            "Webcam",
            "Headset",
            "Power Bank",
            "Router",
            "SSD 1TB",
        ],
    ),
    (
        "Groceries",
        &[
            "Rice 5kg",
            "Cooking Oil",
            "Sugar 1kg",
            "Flour 1kg",
            "Coffee Beans",
            "Tea Box",
            "Canned Beans",
            "Pasta",
            "Honey Jar",
            "Olive Oil",
        ],
    ),
    (
        "Clothing",
        &[
            "T-Shirt",
            "Jeans",
            "Hoodie",
            "Socks 3-Pack",
            "Cap",
            "Jacket",
            "Scarf",
            "Belt",
            "Gloves",
            "Sneakers",
        ],
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 60;
    let mut db_path = String::from("./shopledger_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(60);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("shopledger Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 60)");
                println!("  -d, --db <PATH>    Database file path (default: ./shopledger_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("shopledger Seed Data Generator");
    println!("==============================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("* Connected, migrations applied");

    let existing = db.catalog().count_products().await?;
    if existing > 0 {
        println!("! Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Categories
    let now = Utc::now();
    let mut category_ids = Vec::new();
    for (name, _) in CATEGORIES {
        let category = Category {
            id: generate_category_id(),
            name: name.to_string(),
            description: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.catalog().insert_category(&category).await?;
        category_ids.push(category.id);
    }
    println!("* Created {} categories", category_ids.len());

    // Products
    let mut generated = 0;
    let mut first_product_id = None;
    'outer: for (cat_idx, (_, names)) in CATEGORIES.iter().enumerate() {
        for (idx, name) in names.iter().enumerate() {
            for variant in 0.. {
                if generated >= count {
                    break 'outer;
                }
                let seed = cat_idx * 1_000 + idx * 10 + variant;
                let product = generate_product(name, &category_ids[cat_idx], seed, variant);
                if let Err(e) = db.catalog().insert_product(&product).await {
                    eprintln!("Failed to insert {}: {}", product.code, e);
                    continue;
                }
                if first_product_id.is_none() {
                    first_product_id = Some(product.id.clone());
                }
                generated += 1;
                if variant >= count / (CATEGORIES.len() * names.len()) {
                    break;
                }
            }
        }
    }
    println!("* Generated {} products", generated);

    // Parties
    let customer = Customer {
        id: generate_customer_id(),
        name: "Alice Walker".to_string(),
        email: Some("alice@example.com".to_string()),
        phone: Some("555-0101".to_string()),
        address: None,
        credit_limit_cents: 50_000,
        loyalty_points: 0,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    db.customers().insert(&customer).await?;

    let supplier = Supplier {
        id: generate_supplier_id(),
        name: "Acme Wholesale".to_string(),
        contact_person: Some("Bob Vance".to_string()),
        email: Some("orders@acme.example".to_string()),
        phone: Some("555-0199".to_string()),
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    db.suppliers().insert(&supplier).await?;
    println!("* Created demo customer and supplier");

    // A received purchase order and a sale, so the ledger has history
    let product_id = match first_product_id {
        Some(id) => id,
        None => {
            println!("! No products generated, skipping demo transactions");
            return Ok(());
        }
    };

    let (po, items) = db
        .purchasing()
        .create_purchase_order(NewPurchaseOrder {
            supplier_id: supplier.id.clone(),
            expected_date: None,
            lines: vec![NewPurchaseOrderLine {
                product_id: product_id.clone(),
                quantity: 20,
                unit_cost_cents: 60_000,
            }],
        })
        .await?;
    db.purchasing()
        .receive_purchase_order(
            &po.id,
            vec![ReceiptLine {
                item_id: items[0].id.clone(),
                quantity: 20,
            }],
            Some("seed"),
        )
        .await?;
    println!("* Received demo purchase order {}", po.number);

    let receipt = db
        .sales()
        .create_sale(NewSale {
            customer_name: customer.name.clone(),
            customer_id: Some(customer.id.clone()),
            actor: Some("seed".to_string()),
            lines: vec![SaleLine {
                product_id,
                quantity: 2,
            }],
        })
        .await?;
    println!(
        "* Created demo sale {} ({} points accrued)",
        receipt.invoice.number, receipt.points_accrued
    );

    let summary = db.reports().inventory_summary().await?;
    println!();
    println!(
        "* Seed complete: {} products, stock value {} cents, {} low-stock",
        summary.total_products, summary.total_stock_value_cents, summary.low_stock_count
    );

    Ok(())
}

/// Generates a single product with deterministic pseudo-random fields.
fn generate_product(name: &str, category_id: &str, seed: usize, variant: usize) -> Product {
    let now = Utc::now();

    let code = format!("P{:04}", seed);
    let full_name = if variant == 0 {
        name.to_string()
    } else {
        format!("{} v{}", name, variant + 1)
    };

    // Price 9.99 - 99.99, cost 60-80% of price
    let price_cents = 999 + ((seed * 37) % 9_000) as i64;
    let cost_pct = 60 + (seed % 20) as i64;
    let cost_cents = price_cents * cost_pct / 100;

    Product {
        id: generate_product_id(),
        code,
        name: full_name,
        category_id: Some(category_id.to_string()),
        price_cents,
        cost_cents,
        stock: (seed % 40) as i64,
        min_stock: 5,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}
