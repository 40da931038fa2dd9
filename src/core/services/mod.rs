pub mod balance_service;
pub mod settlement_service;

pub use balance_service::{BalanceService, Balances, ParticipantSummary};
pub use settlement_service::{Payment, SettlementPlan, SettlementService, SETTLEMENT_EPSILON};
