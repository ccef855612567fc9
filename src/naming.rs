//! Unique names for worksheets, details and the records the engine creates.

use crate::entities::WorksheetType;
use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use std::sync::atomic::{AtomicU64, Ordering};

/// Produces unique, opaque names. Uniqueness is the implementor's concern;
/// the engine never parses what it gets back.
pub trait NameGenerator: Send + Sync {
    fn worksheet(&self, worksheet_type: WorksheetType) -> String;
    fn worksheet_detail(&self, worksheet_type: WorksheetType) -> String;
    fn order_inventory(&self) -> String;
    fn inventory_check(&self) -> String;
    fn delivery_order(&self) -> String;
}

fn prefix(worksheet_type: WorksheetType) -> &'static str {
    match worksheet_type {
        WorksheetType::Unloading => "ULD",
        WorksheetType::Putaway => "PUTA",
        WorksheetType::Picking => "PICK",
        WorksheetType::Loading => "LOAD",
        WorksheetType::Vas => "VAS",
        WorksheetType::CycleCount => "CC",
        WorksheetType::Return => "RTN",
    }
}

/// `PREFIX-YYYYMMDD-XXXXXXXX` names with a random alphanumeric suffix.
#[derive(Debug, Default, Clone, Copy)]
pub struct DatedNameGenerator;

impl DatedNameGenerator {
    fn generate(&self, prefix: &str) -> String {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(8)
            .map(|c| char::from(c).to_ascii_uppercase())
            .collect();
        format!("{}-{}-{}", prefix, Utc::now().format("%Y%m%d"), suffix)
    }
}

impl NameGenerator for DatedNameGenerator {
    fn worksheet(&self, worksheet_type: WorksheetType) -> String {
        self.generate(prefix(worksheet_type))
    }

    fn worksheet_detail(&self, worksheet_type: WorksheetType) -> String {
        self.generate(&format!("{}-D", prefix(worksheet_type)))
    }

    fn order_inventory(&self) -> String {
        self.generate("OI")
    }

    fn inventory_check(&self) -> String {
        self.generate("IC")
    }

    fn delivery_order(&self) -> String {
        self.generate("DO")
    }
}

/// Deterministic names from a shared counter, e.g. `CC-000001`.
#[derive(Debug, Default)]
pub struct SequentialNameGenerator {
    counter: AtomicU64,
}

impl SequentialNameGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&self, prefix: &str) -> String {
        let seq = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}-{:06}", prefix, seq)
    }
}

impl NameGenerator for SequentialNameGenerator {
    fn worksheet(&self, worksheet_type: WorksheetType) -> String {
        self.next(prefix(worksheet_type))
    }

    fn worksheet_detail(&self, worksheet_type: WorksheetType) -> String {
        self.next(&format!("{}-D", prefix(worksheet_type)))
    }

    fn order_inventory(&self) -> String {
        self.next("OI")
    }

    fn inventory_check(&self) -> String {
        self.next("IC")
    }

    fn delivery_order(&self) -> String {
        self.next("DO")
    }
}
