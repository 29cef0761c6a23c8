//! This bench test simulates the superadmin's CSV export and the
//! role-filtered listing over a store holding a large request log.

#![allow(missing_docs)]

use checkout::storage::export;
use checkout::{Portal, Store, SubmissionForm};
use chrono::{DateTime, NaiveDate};
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use tempfile::TempDir;

/// Generates a store holding a large number of requests.
fn preseed_store(root: &std::path::Path, requests: usize) {
    let mut store = Store::open(root).unwrap();
    let employee = store
        .login(Portal::Employee, "employee1", "password")
        .unwrap()
        .clone();

    for n in 0..requests {
        let form = SubmissionForm {
            requester: employee.username().clone(),
            name: employee.name().to_string(),
            date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
                + chrono::Days::new(u64::try_from(n % 28).unwrap()),
            purpose: if n % 2 == 0 {
                checkout::Purpose::Stocking
            } else {
                checkout::Purpose::Service
            },
            warehouse: "Main".to_string(),
            project_number: None,
            po_number: Some(format!("PO-{n}")),
            approver: "approver1".parse().unwrap(),
            notes: Some("bench request, notes with, commas".to_string()),
            total_price: None,
            items: vec![
                checkout::ItemDraft {
                    part: format!("part-{n}"),
                    qty: 4,
                    price: Some(1.25),
                },
                checkout::ItemDraft {
                    part: format!("part-{n}-b"),
                    qty: 1,
                    price: None,
                },
            ],
            confirmed: true,
        };
        let at =
            DateTime::from_timestamp_millis(1_700_000_000_000 + i64::try_from(n).unwrap()).unwrap();
        store.submit(form, at).unwrap();
    }

    store.flush().unwrap();
}

fn export_csv(c: &mut Criterion) {
    c.bench_function("export 10k rows", |b| {
        b.iter_batched(
            || {
                let tmp = TempDir::new().unwrap();
                preseed_store(tmp.path(), 5_000);
                tmp
            },
            |tmp| {
                let store = Store::open(tmp.path()).unwrap();
                let csv = export::to_csv(store.requests().iter());
                assert!(csv.lines().count() > 10_000);
            },
            BatchSize::SmallInput,
        );
    });
}

fn filtered_listing(c: &mut Criterion) {
    let tmp = TempDir::new().unwrap();
    preseed_store(tmp.path(), 5_000);
    let store = Store::open(tmp.path()).unwrap();
    let approver = store.users().get("approver1").unwrap().clone();

    c.bench_function("visible_to over 5k requests", |b| {
        b.iter(|| {
            let rows = store.requests().visible_to(&approver);
            assert_eq!(rows.len(), 5_000);
        });
    });
}

criterion_group!(benches, export_csv, filtered_listing);
criterion_main!(benches);
