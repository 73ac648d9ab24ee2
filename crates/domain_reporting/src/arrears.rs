//! Arrears reporting

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use core_kernel::{Money, StudentId};

use domain_ledger::Charge;

/// One student's arrears position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrearsLine {
    pub student_id: StudentId,
    /// Combined outstanding balance across fees and bills
    pub total_balance: Money,
    /// Days past the earliest unpaid due date; zero when nothing is due yet
    pub days_overdue: i64,
    /// Number of charges with money outstanding
    pub open_charges: usize,
}

/// Builds the arrears report from the outstanding charges
///
/// One line per student with balance > 0, sorted descending by total
/// balance; days-overdue is computed from the student's earliest unpaid
/// due date.
pub fn arrears_report(outstanding: &[Charge], today: NaiveDate) -> Vec<ArrearsLine> {
    struct Position {
        balance: Money,
        earliest_due: NaiveDate,
        charges: usize,
    }

    let mut by_student: HashMap<StudentId, Position> = HashMap::new();
    for charge in outstanding {
        if !charge.balance().is_positive() {
            continue;
        }
        let entry = by_student
            .entry(charge.student_id())
            .or_insert_with(|| Position {
                balance: Money::zero(),
                earliest_due: charge.due_date(),
                charges: 0,
            });
        entry.balance = entry.balance + charge.balance();
        entry.charges += 1;
        if charge.due_date() < entry.earliest_due {
            entry.earliest_due = charge.due_date();
        }
    }

    let mut lines: Vec<ArrearsLine> = by_student
        .into_iter()
        .map(|(student_id, position)| ArrearsLine {
            student_id,
            total_balance: position.balance,
            days_overdue: (today - position.earliest_due).num_days().max(0),
            open_charges: position.charges,
        })
        .collect();

    lines.sort_by(|a, b| {
        b.total_balance
            .cmp(&a.total_balance)
            .then_with(|| a.student_id.cmp(&b.student_id))
    });
    lines
}
