//! In-memory store seeding helpers

use std::sync::Arc;

use core_kernel::StudentRef;
use domain_catalog::FeeCategory;
use domain_discount::DiscountEngine;
use domain_ledger::{ChargeGenerator, InMemoryLedger};

use crate::fixtures::catalog_fixture;

/// A seeded in-memory store plus a generator wired against it
pub struct SeededLedger {
    pub store: Arc<InMemoryLedger>,
    pub generator: ChargeGenerator,
}

/// Builds an in-memory store seeded with the given catalog and roster
pub fn seeded_ledger(
    categories: Vec<FeeCategory>,
    students: impl IntoIterator<Item = StudentRef>,
) -> SeededLedger {
    let store = Arc::new(InMemoryLedger::new());
    store.seed_categories(categories);
    for student in students {
        store.add_student(student);
    }

    let discounts = DiscountEngine::new(store.clone(), store.clone());
    let generator = ChargeGenerator::new(store.clone(), store.clone(), store.clone(), discounts);

    SeededLedger { store, generator }
}

/// Builds an in-memory store seeded with the standard catalog
pub fn standard_ledger(students: impl IntoIterator<Item = StudentRef>) -> SeededLedger {
    seeded_ledger(catalog_fixture(), students)
}
