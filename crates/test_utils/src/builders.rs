//! Test data builders
//!
//! Builder patterns for constructing test data with sensible defaults.
//! Tests specify only the fields they care about.

use chrono::NaiveDate;

use core_kernel::{Actor, CategoryId, ClassLevel, Money, StudentId, StudentRef};
use domain_catalog::{Applicability, BillingFrequency, CategoryCode, FeeCategory};
use domain_ledger::{Bill, BillItem, Fee};

use crate::fixtures::{DateFixtures, MoneyFixtures, PeriodFixtures};

/// Builder for fee categories
pub struct CategoryBuilder {
    code: CategoryCode,
    amount: Money,
    frequency: BillingFrequency,
    mandatory: bool,
    active: bool,
    applicability: Applicability,
}

impl Default for CategoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CategoryBuilder {
    pub fn new() -> Self {
        Self {
            code: CategoryCode::Tuition,
            amount: MoneyFixtures::tuition(),
            frequency: BillingFrequency::Termly,
            mandatory: true,
            active: true,
            applicability: Applicability::AllLevels,
        }
    }

    pub fn with_code(mut self, code: CategoryCode) -> Self {
        self.code = code;
        self
    }

    pub fn with_amount(mut self, amount: Money) -> Self {
        self.amount = amount;
        self
    }

    pub fn optional(mut self) -> Self {
        self.mandatory = false;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn for_levels(mut self, levels: impl IntoIterator<Item = ClassLevel>) -> Self {
        self.applicability = Applicability::levels(levels);
        self
    }

    pub fn build(self) -> FeeCategory {
        let mut category = FeeCategory::new(self.code, self.amount, self.frequency)
            .with_applicability(self.applicability);
        if !self.mandatory {
            category = category.optional();
        }
        if !self.active {
            category.set_active(false);
        }
        category
    }
}

/// Builder for students
pub struct StudentBuilder {
    id: StudentId,
    class_level: ClassLevel,
}

impl Default for StudentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StudentBuilder {
    pub fn new() -> Self {
        Self {
            id: StudentId::new(),
            class_level: ClassLevel::Primary3,
        }
    }

    pub fn with_class_level(mut self, level: ClassLevel) -> Self {
        self.class_level = level;
        self
    }

    pub fn build(self) -> StudentRef {
        StudentRef::new(self.id, self.class_level)
    }
}

/// Builder for fees
pub struct FeeBuilder {
    student_id: StudentId,
    category_id: CategoryId,
    amount: Money,
    due_date: NaiveDate,
}

impl Default for FeeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FeeBuilder {
    pub fn new() -> Self {
        Self {
            student_id: StudentId::new(),
            category_id: CategoryId::new(),
            amount: MoneyFixtures::tuition(),
            due_date: DateFixtures::future_due(),
        }
    }

    pub fn for_student(mut self, student_id: StudentId) -> Self {
        self.student_id = student_id;
        self
    }

    pub fn with_amount(mut self, amount: Money) -> Self {
        self.amount = amount;
        self
    }

    pub fn due(mut self, due_date: NaiveDate) -> Self {
        self.due_date = due_date;
        self
    }

    pub fn build(self) -> Fee {
        Fee::generate(
            self.student_id,
            self.category_id,
            PeriodFixtures::first_term(),
            self.amount,
            self.due_date,
            &Actor::system(),
        )
    }
}

/// Builder for issued bills
pub struct BillBuilder {
    bill_number: String,
    student_id: StudentId,
    due_date: NaiveDate,
    items: Vec<(CategoryId, String, Money)>,
}

impl Default for BillBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BillBuilder {
    pub fn new() -> Self {
        Self {
            bill_number: "BILL2024000001".to_string(),
            student_id: StudentId::new(),
            due_date: DateFixtures::future_due(),
            items: vec![(
                CategoryId::new(),
                "Tuition Fees - Term 1".to_string(),
                MoneyFixtures::tuition(),
            )],
        }
    }

    pub fn with_number(mut self, number: impl Into<String>) -> Self {
        self.bill_number = number.into();
        self
    }

    pub fn for_student(mut self, student_id: StudentId) -> Self {
        self.student_id = student_id;
        self
    }

    pub fn due(mut self, due_date: NaiveDate) -> Self {
        self.due_date = due_date;
        self
    }

    pub fn with_item(mut self, description: impl Into<String>, amount: Money) -> Self {
        self.items
            .push((CategoryId::new(), description.into(), amount));
        self
    }

    pub fn build(self) -> Bill {
        let mut bill = Bill::draft(
            self.bill_number,
            self.student_id,
            PeriodFixtures::first_term(),
            DateFixtures::today(),
            self.due_date,
            "",
            &Actor::system(),
        );
        for (category_id, description, amount) in self.items {
            bill.push_item(BillItem::charge(category_id, description, amount));
        }
        bill.issue();
        bill
    }
}
