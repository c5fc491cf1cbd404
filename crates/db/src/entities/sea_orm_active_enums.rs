//! Text-backed enums shared by several tables.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use sodalis_core::fee;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum FeeStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "paid")]
    Paid,
    #[sea_orm(string_value = "overdue")]
    Overdue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum PaymentMethod {
    #[sea_orm(string_value = "cash")]
    Cash,
    #[sea_orm(string_value = "bank_transfer")]
    BankTransfer,
    #[sea_orm(string_value = "card")]
    Card,
    #[sea_orm(string_value = "paypal")]
    Paypal,
    #[sea_orm(string_value = "other")]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum MovementType {
    #[sea_orm(string_value = "income")]
    Income,
    #[sea_orm(string_value = "expense")]
    Expense,
}

impl From<fee::FeeStatus> for FeeStatus {
    fn from(status: fee::FeeStatus) -> Self {
        match status {
            fee::FeeStatus::Pending => Self::Pending,
            fee::FeeStatus::Paid => Self::Paid,
            fee::FeeStatus::Overdue => Self::Overdue,
        }
    }
}

impl From<FeeStatus> for fee::FeeStatus {
    fn from(status: FeeStatus) -> Self {
        match status {
            FeeStatus::Pending => Self::Pending,
            FeeStatus::Paid => Self::Paid,
            FeeStatus::Overdue => Self::Overdue,
        }
    }
}

impl From<fee::PaymentMethod> for PaymentMethod {
    fn from(method: fee::PaymentMethod) -> Self {
        match method {
            fee::PaymentMethod::Cash => Self::Cash,
            fee::PaymentMethod::BankTransfer => Self::BankTransfer,
            fee::PaymentMethod::Card => Self::Card,
            fee::PaymentMethod::Paypal => Self::Paypal,
            fee::PaymentMethod::Other => Self::Other,
        }
    }
}

impl From<PaymentMethod> for fee::PaymentMethod {
    fn from(method: PaymentMethod) -> Self {
        match method {
            PaymentMethod::Cash => Self::Cash,
            PaymentMethod::BankTransfer => Self::BankTransfer,
            PaymentMethod::Card => Self::Card,
            PaymentMethod::Paypal => Self::Paypal,
            PaymentMethod::Other => Self::Other,
        }
    }
}

impl From<fee::MovementType> for MovementType {
    fn from(kind: fee::MovementType) -> Self {
        match kind {
            fee::MovementType::Income => Self::Income,
            fee::MovementType::Expense => Self::Expense,
        }
    }
}

impl From<MovementType> for fee::MovementType {
    fn from(kind: MovementType) -> Self {
        match kind {
            MovementType::Income => Self::Income,
            MovementType::Expense => Self::Expense,
        }
    }
}
