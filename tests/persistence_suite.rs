mod common;

use std::fs;

use billing_core::{
    ledger::{Product, ProductKey},
    storage::{CsvCatalogStore, ProductStore},
};
use common::{date, entry, TestEnv};

fn product(name: &str, margin1: f64, wholesale: f64, margin2: f64, retail: f64) -> Product {
    let mut product = Product {
        brand: "Acme".into(),
        product_name: name.into(),
        purchase_date: date(2024, 2, 1),
        purchase_rate: 80.0,
        margin1,
        wholesale_rate: wholesale,
        margin2,
        retail_rate: retail,
        opening_stock: 12,
        purchased_stock: 8,
        sold_stock: 3,
        closing_stock: 0,
        modified_date: date(2024, 2, 2),
    };
    product.recompute_rates();
    product.recompute_closing().unwrap();
    product
}

#[test]
fn save_then_load_reproduces_the_catalog() {
    let dir = common::temp_dir();
    let store = CsvCatalogStore::new(dir.join("products.csv"));
    let products = vec![
        product("Bulb", 25.0, 0.0, 0.0, 150.0),
        product("Tube", 0.0, 55.5, 10.0, 0.0),
        product("Fan", 12.3456, 0.0, 7.1251, 0.0),
    ];
    assert_eq!(products[0].wholesale_rate, 100.0);
    assert_eq!(products[1].retail_rate, 61.05);
    assert_eq!(products[2].margin1, 12.35);
    assert_eq!(products[2].wholesale_rate, 89.88);

    assert!(store.save(&products));
    let loaded = store.load_with_today(date(2024, 6, 1)).unwrap();
    assert_eq!(loaded, products);

    assert!(store.save(&loaded));
    assert_eq!(store.load_with_today(date(2024, 6, 1)).unwrap(), products);
}

#[test]
fn unwritable_destination_reports_failure() {
    let dir = common::temp_dir();
    let blocker = dir.join("not_a_dir");
    fs::write(&blocker, "file in the way").unwrap();
    let store = CsvCatalogStore::new(blocker.join("products.csv"));
    assert!(!store.save(&[product("Bulb", 10.0, 0.0, 20.0, 0.0)]));
}

#[test]
fn every_mutation_backs_up_the_previous_catalog() {
    let env = TestEnv::new(date(2024, 4, 1));
    let mut manager = env.open();
    manager.upsert_product(entry("Acme", "Bulb", 5, 0)).unwrap();
    manager.upsert_product(entry("Acme", "Tube", 5, 0)).unwrap();
    manager
        .delete_product(&ProductKey::new("Acme", "Tube"))
        .unwrap();

    let backups = env.catalog.list_backups().unwrap();
    assert_eq!(backups.len(), 2);
    assert!(backups
        .iter()
        .all(|backup| backup.name.starts_with("products_backup_") && backup.name.ends_with(".csv")));

    let newest = &backups[0];
    let restored = env
        .catalog
        .restore_backup(&newest.name, date(2024, 4, 1))
        .unwrap();
    assert_eq!(restored.len(), 2);
    assert_eq!(manager.reload().unwrap(), 2);
}

#[test]
fn corrupted_rows_are_dropped_on_open() {
    let env = TestEnv::new(date(2024, 4, 1));
    fs::write(
        env.catalog.path(),
        "Brand,Product Name,Purchase Date,Purchase Rate,Margin1 (%),Wholesale Rate,Margin2 (%),Retail Rate,Opening Stock,Purchased Stock,Sold Stock,Closing Stock,Modified Date\n\
         Acme,Bulb,2024-01-01,100.00,10.00,110.00,20.00,132.00,50,20,5,65,2024-01-02\n\
         Acme,Tube,2024-01-01,N/A,10.00,0.00,20.00,0.00,5,0,0,5,2024-01-02\n\
         Acme,Fan,not-a-date,900,0,950,0,1000,1,0,0,1,2024-01-02\n",
    )
    .unwrap();

    let manager = env.open();
    let names: Vec<&str> = manager
        .products()
        .iter()
        .map(|product| product.product_name.as_str())
        .collect();
    assert_eq!(names, vec!["Bulb", "Fan"]);
    let fan = manager.product(&ProductKey::new("Acme", "Fan")).unwrap();
    assert_eq!(fan.wholesale_rate, 950.0);
    assert_eq!(fan.retail_rate, 1000.0);
}

#[test]
fn missing_dates_take_the_session_day() {
    let env = TestEnv::new(date(2023, 12, 31));
    fs::write(
        env.catalog.path(),
        "Brand,Product Name,Purchase Rate,Margin1 (%),Margin2 (%),Opening Stock\n\
         Acme,Bulb,100,10,20,4\n",
    )
    .unwrap();

    let mut manager = env.open();
    let bulb = manager.product(&ProductKey::new("Acme", "Bulb")).unwrap();
    assert_eq!(bulb.purchase_date, date(2023, 12, 31));
    assert_eq!(bulb.modified_date, date(2023, 12, 31));

    env.clock.set(date(2024, 1, 2));
    manager.reload().unwrap();
    assert_eq!(manager.products()[0].purchase_date, date(2024, 1, 2));
}
