//! Row-to-entity mapping
//!
//! Decodes stored codes back into domain enums and assembles entities from
//! PostgreSQL rows. Every decode failure surfaces as
//! `DatabaseError::DecodeFailed` rather than a panic.

use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use core_kernel::{AcademicYear, ActorRole, ClassLevel, Money, Origin, Term};
use domain_audit::{AuditAction, AuditLogEntry, EntityKind};
use domain_catalog::{Applicability, BillingFrequency, CategoryCode, FeeCategory};
use domain_discount::StudentCredit;
use domain_ledger::{Bill, BillItem, BillStatus, ChargeRef, Fee, Payment, PaymentMode, PaymentStatus};

use crate::error::DatabaseError;

fn decode_err(what: &str, value: impl std::fmt::Display) -> DatabaseError {
    DatabaseError::DecodeFailed(format!("unknown {}: {}", what, value))
}

pub(crate) fn parse_payment_status(s: &str) -> Result<PaymentStatus, DatabaseError> {
    match s {
        "unpaid" => Ok(PaymentStatus::Unpaid),
        "partial" => Ok(PaymentStatus::Partial),
        "paid" => Ok(PaymentStatus::Paid),
        "overdue" => Ok(PaymentStatus::Overdue),
        other => Err(decode_err("payment status", other)),
    }
}

pub(crate) fn parse_bill_status(s: &str) -> Result<BillStatus, DatabaseError> {
    match s {
        "draft" => Ok(BillStatus::Draft),
        "issued" => Ok(BillStatus::Issued),
        "unpaid" => Ok(BillStatus::Unpaid),
        "partial" => Ok(BillStatus::Partial),
        "paid" => Ok(BillStatus::Paid),
        "overdue" => Ok(BillStatus::Overdue),
        "cancelled" => Ok(BillStatus::Cancelled),
        "refunded" => Ok(BillStatus::Refunded),
        other => Err(decode_err("bill status", other)),
    }
}

pub(crate) fn parse_payment_mode(s: &str) -> Result<PaymentMode, DatabaseError> {
    match s {
        "cash" => Ok(PaymentMode::Cash),
        "mobile_money" => Ok(PaymentMode::MobileMoney),
        "bank_transfer" => Ok(PaymentMode::BankTransfer),
        "cheque" => Ok(PaymentMode::Cheque),
        "credit_card" => Ok(PaymentMode::CreditCard),
        "debit_card" => Ok(PaymentMode::DebitCard),
        "online" => Ok(PaymentMode::Online),
        "other" => Ok(PaymentMode::Other),
        other => Err(decode_err("payment mode", other)),
    }
}

pub(crate) fn parse_category_code(s: &str) -> Result<CategoryCode, DatabaseError> {
    match s {
        "TUITION" => Ok(CategoryCode::Tuition),
        "ADMISSION" => Ok(CategoryCode::Admission),
        "TRANSPORT" => Ok(CategoryCode::Transport),
        "TECHNOLOGY" => Ok(CategoryCode::Technology),
        "EXAMINATION" => Ok(CategoryCode::Examination),
        "UNIFORM" => Ok(CategoryCode::Uniform),
        "PTA" => Ok(CategoryCode::Pta),
        "EXTRA_CLASSES" => Ok(CategoryCode::ExtraClasses),
        "LIBRARY" => Ok(CategoryCode::Library),
        "SPORTS" => Ok(CategoryCode::Sports),
        "MEDICAL" => Ok(CategoryCode::Medical),
        "DEVELOPMENT" => Ok(CategoryCode::Development),
        "OTHER" => Ok(CategoryCode::Other),
        other => Err(decode_err("category code", other)),
    }
}

pub(crate) fn frequency_code(frequency: BillingFrequency) -> &'static str {
    match frequency {
        BillingFrequency::OneTime => "one_time",
        BillingFrequency::Termly => "termly",
        BillingFrequency::Monthly => "monthly",
        BillingFrequency::Quarterly => "quarterly",
        BillingFrequency::Semester => "semester",
        BillingFrequency::Annual => "annual",
        BillingFrequency::Custom => "custom",
    }
}

pub(crate) fn parse_frequency(s: &str) -> Result<BillingFrequency, DatabaseError> {
    match s {
        "one_time" => Ok(BillingFrequency::OneTime),
        "termly" => Ok(BillingFrequency::Termly),
        "monthly" => Ok(BillingFrequency::Monthly),
        "quarterly" => Ok(BillingFrequency::Quarterly),
        "semester" => Ok(BillingFrequency::Semester),
        "annual" => Ok(BillingFrequency::Annual),
        "custom" => Ok(BillingFrequency::Custom),
        other => Err(decode_err("billing frequency", other)),
    }
}

pub(crate) fn actor_role_code(role: ActorRole) -> &'static str {
    match role {
        ActorRole::System => "system",
        ActorRole::Administrator => "administrator",
        ActorRole::Accountant => "accountant",
    }
}

pub(crate) fn parse_actor_role(s: &str) -> Result<ActorRole, DatabaseError> {
    match s {
        "system" => Ok(ActorRole::System),
        "administrator" => Ok(ActorRole::Administrator),
        "accountant" => Ok(ActorRole::Accountant),
        other => Err(decode_err("actor role", other)),
    }
}

pub(crate) fn parse_action(s: &str) -> Result<AuditAction, DatabaseError> {
    match s {
        "CREATE" => Ok(AuditAction::Create),
        "UPDATE" => Ok(AuditAction::Update),
        "DELETE" => Ok(AuditAction::Delete),
        "PAYMENT" => Ok(AuditAction::Payment),
        "REFUND" => Ok(AuditAction::Refund),
        "CANCEL" => Ok(AuditAction::Cancel),
        "CONFIRM" => Ok(AuditAction::Confirm),
        other => Err(decode_err("audit action", other)),
    }
}

pub(crate) fn parse_entity_kind(s: &str) -> Result<EntityKind, DatabaseError> {
    match s {
        "fee" => Ok(EntityKind::Fee),
        "bill" => Ok(EntityKind::Bill),
        "payment" => Ok(EntityKind::Payment),
        "fee_category" => Ok(EntityKind::FeeCategory),
        "student_credit" => Ok(EntityKind::StudentCredit),
        other => Err(decode_err("entity kind", other)),
    }
}

pub(crate) fn parse_year(s: &str) -> Result<AcademicYear, DatabaseError> {
    AcademicYear::parse(s).map_err(|e| DatabaseError::DecodeFailed(e.to_string()))
}

pub(crate) fn parse_term(n: i16) -> Result<Term, DatabaseError> {
    Term::new(n as u8).map_err(|e| DatabaseError::DecodeFailed(e.to_string()))
}

pub(crate) fn parse_class_level(s: &str) -> Result<ClassLevel, DatabaseError> {
    s.parse()
        .map_err(|_| decode_err("class level", s))
}

pub(crate) fn parse_target(kind: &str, id: Uuid) -> Result<ChargeRef, DatabaseError> {
    match kind {
        "fee" => Ok(ChargeRef::Fee(id.into())),
        "bill" => Ok(ChargeRef::Bill(id.into())),
        other => Err(decode_err("charge target kind", other)),
    }
}

pub(crate) fn fee_from_row(row: &PgRow) -> Result<Fee, DatabaseError> {
    Ok(Fee {
        id: row.try_get::<Uuid, _>("fee_id")?.into(),
        student_id: row.try_get::<Uuid, _>("student_id")?.into(),
        category_id: row.try_get::<Uuid, _>("category_id")?.into(),
        academic_year: parse_year(row.try_get("academic_year")?)?,
        term: parse_term(row.try_get("term")?)?,
        amount_payable: Money::new(row.try_get("amount_payable")?),
        amount_paid: Money::new(row.try_get("amount_paid")?),
        balance: Money::new(row.try_get("balance")?),
        status: parse_payment_status(row.try_get("status")?)?,
        due_date: row.try_get("due_date")?,
        recorded_by: row
            .try_get::<Option<Uuid>, _>("recorded_by")?
            .map(Into::into),
        date_recorded: row.try_get("date_recorded")?,
        last_updated: row.try_get("last_updated")?,
    })
}

pub(crate) fn bill_item_from_row(row: &PgRow) -> Result<BillItem, DatabaseError> {
    Ok(BillItem {
        id: row.try_get::<Uuid, _>("item_id")?.into(),
        category_id: row
            .try_get::<Option<Uuid>, _>("category_id")?
            .map(Into::into),
        description: row.try_get("description")?,
        amount: Money::new(row.try_get("amount")?),
    })
}

pub(crate) fn bill_from_row(row: &PgRow, items: Vec<BillItem>) -> Result<Bill, DatabaseError> {
    Ok(Bill {
        id: row.try_get::<Uuid, _>("bill_id")?.into(),
        bill_number: row.try_get("bill_number")?,
        student_id: row.try_get::<Uuid, _>("student_id")?.into(),
        academic_year: parse_year(row.try_get("academic_year")?)?,
        term: parse_term(row.try_get("term")?)?,
        issue_date: row.try_get("issue_date")?,
        due_date: row.try_get("due_date")?,
        status: parse_bill_status(row.try_get("status")?)?,
        items,
        total_amount: Money::new(row.try_get("total_amount")?),
        amount_paid: Money::new(row.try_get("amount_paid")?),
        balance: Money::new(row.try_get("balance")?),
        notes: row.try_get("notes")?,
        recorded_by: row
            .try_get::<Option<Uuid>, _>("recorded_by")?
            .map(Into::into),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(crate) fn payment_from_row(row: &PgRow) -> Result<Payment, DatabaseError> {
    let target = parse_target(
        row.try_get("target_kind")?,
        row.try_get::<Uuid, _>("target_id")?,
    )?;
    Ok(Payment {
        id: row.try_get::<Uuid, _>("payment_id")?.into(),
        target,
        amount: Money::new(row.try_get("amount")?),
        mode: parse_payment_mode(row.try_get("mode")?)?,
        payment_date: row.try_get("payment_date")?,
        receipt_number: row.try_get("receipt_number")?,
        recorded_by: row
            .try_get::<Option<Uuid>, _>("recorded_by")?
            .map(Into::into),
        notes: row.try_get("notes")?,
        bank_reference: row.try_get("bank_reference")?,
        is_confirmed: row.try_get("is_confirmed")?,
        confirmed_by: row
            .try_get::<Option<Uuid>, _>("confirmed_by")?
            .map(Into::into),
        confirmed_at: row.try_get("confirmed_at")?,
        created_at: row.try_get("created_at")?,
    })
}

pub(crate) fn category_from_row(row: &PgRow) -> Result<FeeCategory, DatabaseError> {
    let applies_to_all: bool = row.try_get("applies_to_all")?;
    let levels: String = row.try_get("class_levels")?;
    let applicability = if applies_to_all || levels.is_empty() {
        Applicability::AllLevels
    } else {
        let parsed: Result<Vec<ClassLevel>, DatabaseError> = levels
            .split(',')
            .map(|code| parse_class_level(code.trim()))
            .collect();
        Applicability::levels(parsed?)
    };

    Ok(FeeCategory {
        id: row.try_get::<Uuid, _>("category_id")?.into(),
        code: parse_category_code(row.try_get("code")?)?,
        description: row.try_get("description")?,
        default_amount: Money::new(row.try_get("default_amount")?),
        frequency: parse_frequency(row.try_get("frequency")?)?,
        is_mandatory: row.try_get("is_mandatory")?,
        is_active: row.try_get("is_active")?,
        applicability,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(crate) fn credit_from_row(row: &PgRow) -> Result<StudentCredit, DatabaseError> {
    Ok(StudentCredit {
        id: row.try_get::<Uuid, _>("credit_id")?.into(),
        student_id: row.try_get::<Uuid, _>("student_id")?.into(),
        amount: Money::new(row.try_get("amount")?),
        reason: row.try_get("reason")?,
        created_at: row.try_get("created_at")?,
        is_used: row.try_get("is_used")?,
        used_at: row.try_get("used_at")?,
        applied_to: row.try_get("applied_to")?,
    })
}

pub(crate) fn audit_entry_from_row(row: &PgRow) -> Result<AuditLogEntry, DatabaseError> {
    let origin_ip: Option<String> = row.try_get("origin_ip")?;
    let origin_agent: Option<String> = row.try_get("origin_agent")?;
    let origin = if origin_ip.is_some() || origin_agent.is_some() {
        Some(Origin {
            ip: origin_ip,
            user_agent: origin_agent,
        })
    } else {
        None
    };

    Ok(AuditLogEntry {
        id: row.try_get::<Uuid, _>("entry_id")?.into(),
        sequence: row.try_get::<i64, _>("seq")? as u64,
        timestamp: row.try_get("ts")?,
        actor_id: row
            .try_get::<Option<Uuid>, _>("actor_id")?
            .map(Into::into),
        actor_role: parse_actor_role(row.try_get("actor_role")?)?,
        action: parse_action(row.try_get("action")?)?,
        entity: parse_entity_kind(row.try_get("entity_type")?)?,
        entity_id: row.try_get("entity_id")?,
        detail: row.try_get("detail")?,
        origin,
    })
}
